//! Pagepilot Deploy Library
//!
//! Core modules for the Pagepilot deployment service.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod pages;
pub mod providers;
pub mod server;
pub mod store;
pub mod utils;
