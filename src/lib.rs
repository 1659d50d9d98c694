//! Lifelog - a personal journal with hashtags, CSV export and JSON backup.
//!
//! The binary in `main.rs` is a thin shell over these layers.

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
