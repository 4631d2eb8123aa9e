pub mod config;
pub mod errors;
pub mod genapi;
pub mod mirror;
pub mod models;
pub mod rss;
pub mod sources;
pub mod utils;
