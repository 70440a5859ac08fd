//! CLI command implementations

pub mod get;
pub mod serve;
pub mod stop;
