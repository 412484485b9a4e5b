//! shortdigest - deterministic URL digests
//!
//! Registers URLs under a short, deterministic digest (xxh64 rendered in
//! base 62) and resolves digests back to URLs.
//!
//! # Architecture
//! - `digest`: Hashing and base-62 rendering
//! - `storage`: Durable store (SeaORM on SQLite / PostgreSQL)
//! - `cache`: Digest cache and existence filter (Redis + RedisBloom, or in-process)
//! - `services`: Registration engine
//! - `system`: Backend initialization and logging
//! - `config`: Configuration management
//! - `interfaces`: Command-line front end

pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod digest;
pub mod errors;
pub mod interfaces;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
