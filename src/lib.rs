//! Editorial - multi-tenant content moderation
//!
//! Writers and partners draft articles, expert profiles, partner profiles
//! and events; admins review them before anything is published. Published
//! markup is sanitized on the way out.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
