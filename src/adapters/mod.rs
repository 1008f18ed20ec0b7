pub mod http;
pub mod simulated;
pub mod storage;

pub use http::router;
