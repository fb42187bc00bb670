#![forbid(unsafe_code)]

mod client;
mod error;
mod estimate;
mod types;

pub use client::HttpClient;
pub use error::{Error, HttpTransportErrorKind, Result};
pub use types::{HttpRequest, HttpResponse};
