//! Runtime version (RTV) selection.
//!
//! # Data Flow
//! ```text
//! Unversioned request (cookie, ?optin=, /lts/ prefix)
//!     → resolver.rs builds the candidate chain
//!     → literal 15-digit RTV short-circuits
//!     → otherwise VersionStore lookups, first hit wins
//!     → stable as terminal fallback, exhaustion is fatal
//! ```

pub mod channel;
pub mod metadata;
pub mod resolver;

pub use channel::{Channel, Rtv};
pub use metadata::{rtv_metadata, RtvMetadata};
pub use resolver::{RequestSignals, ResolveError, RtvResolver};
