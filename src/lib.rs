//! Keygate - license key issuing and validation backend
//!
//! This library provides the core functionality for the Keygate licensing
//! service: HMAC-signed key generation and verification, the ordered
//! validation chain, client/license lifecycle management with audit trails,
//! and release catalog version resolution.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod id;
pub mod keys;
pub mod lifecycle;
pub mod models;
pub mod pagination;
pub mod rate_limit;
pub mod releases;
pub mod util;
pub mod version;
