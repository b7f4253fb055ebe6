//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (ordered route table)
//!     → matcher.rs (exact, prefix or pattern match)
//!     → Return: RouteKind plus captured segments
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (table order)

pub mod matcher;
pub mod router;

pub use router::{RouteKind, RouteMatch, Router};
