pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod fetch;
pub mod profile;
pub mod report;
pub mod server;
pub mod stats;
pub mod store;
pub mod symbols;
pub mod tui;

pub use error::{Error, Result};
