//! # partlens
//!
//! Visual auto-parts search: embeds catalog images with a ViT encoder (or an
//! offline grayscale descriptor) and ranks them against a photo by cosine
//! similarity.

pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod engine;
pub mod models;
pub mod processing;
pub mod runtime;
pub mod storage;
pub mod ui;
