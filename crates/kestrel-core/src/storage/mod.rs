//! # Durable Storage
//!
//! Disk-backed collaborators of the kernel.

mod redb_tokens;

pub use redb_tokens::RedbTokenStore;
