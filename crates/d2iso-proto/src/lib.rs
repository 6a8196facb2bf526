pub mod archive;
pub mod client;
pub mod config;
pub mod metadata;
pub mod platform;
pub mod status;
pub mod titles;
