pub mod classifier;
pub mod config;
pub mod errors;
pub mod server_utils;
pub mod trivia;
