pub mod catalog;
pub mod config;
pub mod error;
pub mod io;
pub mod merge;
pub mod paths;
pub mod reporter;
pub mod resolver;
pub mod store;
pub mod tools;

pub use config::Settings;
pub use error::{Error, Result};
pub use paths::*;
pub use reporter::{NullReporter, Phase, ProgressEvent, Reporter};

/// User Agent string for store and download requests
pub const USER_AGENT: &str = concat!("apkget/", env!("CARGO_PKG_VERSION"));
