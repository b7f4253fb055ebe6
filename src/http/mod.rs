//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, RequestContext)
//!     → routing layer picks the route class
//!     → handlers.rs (resolve, fetch, inject, cache)
//!     → response.rs (cache policy, content type, shared headers)
//!     → error.rs on failure
//!     → Send to client
//! ```

pub mod error;
pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use error::EdgeError;
pub use request::{MakeRequestUuid, RequestContext, X_REQUEST_ID};
pub use server::{AppState, Collaborators, HttpServer};
