//! # Command Implementations
//!
//! Each submodule handles one CLI command (index, search, parts).

pub mod index;
pub mod parts;
pub mod search;
