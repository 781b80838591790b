//! HTTP front end for Tapgate.
//!
//! Exposes the on-demand scan endpoint and a health check. The scan
//! endpoint is self-contained: it owns its driver for the duration of one
//! request and works with or without reader hardware.

pub mod api;
pub mod config;

pub use config::ServerConfig;
