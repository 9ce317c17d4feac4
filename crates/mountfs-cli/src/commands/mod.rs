//! Command implementations for the mountfs CLI.
//!
//! Each command module splits into a function that computes a serializable
//! result from a [`mountfs_core::FileSystem`] and a `run` function that
//! prints it in the requested format.

pub mod cat;
pub mod common;
pub mod find;
pub mod ls;
pub mod mkdir;
pub mod mounts;
pub mod rm;
pub mod stat;
pub mod tree;
pub mod write;
