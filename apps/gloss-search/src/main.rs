use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = gloss_search::Args::parse();
	gloss_search::run(args).await
}
