//! Planetarium - booking backend for astronomy shows
//!
//! This library provides the catalogue (themes, shows, domes), scheduling
//! of show sessions, seat reservations and the account layer behind the
//! REST API.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
