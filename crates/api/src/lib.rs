//! HTTP API: configuration, routing, request/response mapping and demo seeding.

pub mod app;
pub mod config;
pub mod seed;
