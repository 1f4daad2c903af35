pub mod documents;
pub mod memory;
pub mod models;
pub mod session;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
