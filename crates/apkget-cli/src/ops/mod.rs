//! Request pipeline: resolve, fetch, merge.

pub mod context;
pub mod download;
pub mod flow;
pub mod search;

pub use context::Context;
