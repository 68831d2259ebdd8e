//! Adapters for the outside world: page fetching.

pub mod http_client;

pub use http_client::{FetchedPage, PageFetcher, ReqwestFetcher};
