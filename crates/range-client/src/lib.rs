//! Ranged HTTP retrieval for rangefs: size discovery and byte-range fetches.

#[cfg(feature = "reqwest-client")]
mod backends;
mod client;
pub mod error;
mod http_client;
mod source;

#[cfg(feature = "reqwest-client")]
pub use backends::ReqwestClient;
pub use client::RangeClient;
#[cfg(feature = "reqwest-client")]
pub use client::HttpRangeClient;
pub use error::{HttpClientError, RangeError};
pub use http_client::{HttpClient, HttpRequest, HttpResponse};
pub use source::RangeSource;
