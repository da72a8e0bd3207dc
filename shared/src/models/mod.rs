//! Data models
//!
//! Shared between resell-server and its clients (via API).
//! Resource ids are snowflake `i64`; user ids are opaque strings from the auth token.

pub mod cart;
pub mod order;
pub mod page;
pub mod product;
pub mod review;

// Re-exports
pub use cart::*;
pub use order::*;
pub use page::*;
pub use product::*;
pub use review::*;
