pub mod cache;
pub mod config;
pub mod replace;
pub mod sim;
pub mod stats;
pub mod trace;
