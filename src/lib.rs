//! Edge server for versioned JavaScript runtime builds.

pub mod cache;
pub mod config;
pub mod http;
pub mod inject;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod rtv;
pub mod security;
pub mod storage;
pub mod store;

pub use config::schema::EdgeConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
