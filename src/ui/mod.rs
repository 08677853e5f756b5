//! # User Interface
//!
//! Colored terminal output with timestamps and clickable file links.

pub mod log;

pub use log::{debug, error, header, info, path_link, success, warn, Log};
