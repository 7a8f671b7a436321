//! HTTP protocol layer module
//!
//! Response construction shared by all handlers, decoupled from routing
//! and business logic.

pub mod response;

pub use response::ResponseParts;
