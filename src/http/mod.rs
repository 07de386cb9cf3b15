pub mod client;
pub mod debug;

pub use client::{ERROR_BODY_LIMIT, Exchange, HttpClient, HttpResponseData};
pub use debug::HttpDebugConfig;
