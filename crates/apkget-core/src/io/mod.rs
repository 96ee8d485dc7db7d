//! IO modules - side effects (network, filesystem)

pub mod download;
pub mod staging;
pub mod transport;

pub use download::{FetchOptions, Fetcher};
pub use staging::{StagedSplit, StagedSplitSet, StagingArea};
pub use transport::{ReqwestTransport, TransferResponse, Transport, TransportError};
