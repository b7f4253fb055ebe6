//! Security headers of served files.

pub mod headers;
