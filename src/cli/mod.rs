//! Command-line interface module
//!
//! Handles argument parsing and output rendering

pub mod args;
pub mod output;

pub use args::*;
pub use output::{OutputFormat, render};
