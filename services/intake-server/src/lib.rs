//! Work-order intake service.
//!
//! This crate primarily ships an `intake-server` binary, but we expose a small
//! library surface to enable integration testing and reuse.

pub mod api;
pub mod config;
pub mod mail;
pub mod pdf;
pub mod photos;
pub mod registry;
pub mod state;
pub mod workorder;
