//! Library exports for the link and QR code service
//!
//! This module exposes internal components for testing and potential library usage.

pub mod analytics;
pub mod config;
pub mod database;
pub mod document;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod password;
pub mod route;
pub mod shortcode;
pub mod state;
pub mod store;
