pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod inference;
pub mod logging;
