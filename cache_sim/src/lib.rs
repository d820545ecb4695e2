pub mod access;
pub mod addr;
pub mod cache;
pub mod config;
pub mod engine;
pub mod sim;
pub mod stat;
pub mod trace;
