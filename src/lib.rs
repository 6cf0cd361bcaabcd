pub mod agent;
pub mod config;
pub mod emergence;
pub mod error;
