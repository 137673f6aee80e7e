//! camstream - Camera livestream supervisor
//!
//! This library crate exposes the core functionality for integration testing.

pub mod camera;
pub mod config;
pub mod notifications;
pub mod server;
pub mod supervisor;
