// crates/db/src/queries/mod.rs
// Write-path inserts and read-side aggregation over the traffic tables.

pub mod traffic;
