//! iotdash library
//!
//! Cached access to the dashboard data of an IoT management console backend.
//! The binary and the integration tests both build on these modules.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod refresh;
