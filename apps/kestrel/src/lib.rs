//! # kestrel
//!
//! Operator tooling for the Kestrel transaction log, built on `kestrel-core`.

pub mod cli;
