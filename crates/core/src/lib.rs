// crates/core/src/lib.rs
pub mod blog;
pub mod cache;
pub mod paths;

pub use blog::*;
pub use cache::*;
