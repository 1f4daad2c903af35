use std::{path::PathBuf, sync::Arc};

use clap::{
	Parser,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};
use tracing_subscriber::EnvFilter;

use gloss_service::{
	AggregationRegistry, DefaultBackend, RequestContext, Search, SearchParams, SearchSettings,
	users,
};

#[derive(Debug, Parser)]
#[command(version, rename_all = "kebab", styles = styles())]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Search parameter; repeat for multi-valued keys such as `tag`.
	#[arg(long = "param", short = 'p', value_name = "KEY=VALUE")]
	pub params: Vec<String>,
	/// Return top-level annotations and fetch their replies in a second search.
	#[arg(long)]
	pub separate_replies: bool,
	/// Named aggregation to compute over the matches, e.g. `tags` or `users`.
	#[arg(long = "aggregation", value_name = "NAME")]
	pub aggregations: Vec<String>,
	/// Search as this user (`acct:{username}@{authority}`) instead of anonymously.
	#[arg(long, value_name = "USERID")]
	pub user: Option<String>,
	/// Authority assumed when the config does not set `auth.auth_domain`.
	#[arg(long, value_name = "DOMAIN", default_value = "localhost")]
	pub auth_domain: String,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = gloss_config::load(&args.config)?;
	init_tracing(&config)?;

	if config.auth.proxy_auth {
		tracing::warn!(
			"Proxy authentication is enabled. Only run behind a proxy that sets the user header."
		);
	}

	let auth_domain = config.auth.auth_domain_or(&args.auth_domain).to_string();
	let mut context = RequestContext::anonymous(auth_domain);

	if let Some(user) = &args.user {
		users::split_userid(user)?;
		context = context.with_user(user.clone());
	}

	let backend = Arc::new(DefaultBackend::new(&config.search.backend)?);
	let mut search = Search::new(
		backend,
		SearchSettings::from_config(&config.search),
		&context,
		args.separate_replies,
	);
	let registry = AggregationRegistry::with_builtins();

	for name in &args.aggregations {
		search.append_aggregation(registry.create(name, config.search.aggregation_limit)?);
	}

	let params = search_params(&args.params);
	let result = search.run(&params).await?;

	tracing::info!(
		total = result.total,
		returned = result.annotation_ids.len(),
		replies = result.reply_ids.len(),
		"Search finished."
	);
	println!("{}", serde_json::to_string_pretty(&result)?);

	Ok(())
}

pub fn search_params(pairs: &[String]) -> SearchParams {
	let mut params = SearchParams::new();

	for pair in pairs {
		params.push_pair(pair);
	}

	params
}

fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}

fn init_tracing(config: &gloss_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
	Ok(())
}
