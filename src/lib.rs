pub mod config;
pub mod core;
pub mod ditio;
pub mod scenario;
