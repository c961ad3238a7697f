//! Lantern - Static File Server
//!
//! Core library: request handling over raw TCP, path resolution against a
//! document root, and the bounded connection pool.

pub mod config;
pub mod files;
pub mod http;
pub mod server;
