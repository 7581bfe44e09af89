//! Delivery analytics service
//!
//! Scores completed deliveries against their expected duration and keeps
//! running per-driver and platform-wide aggregates in a shared store.

pub mod api;
pub mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;
