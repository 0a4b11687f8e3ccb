//! Prospect Data API Library
//!
//! Keeps one research document per donor prospect and lets an external agent
//! loop fill it in, one tool result at a time.
//!
//! # Modules
//!
//! - `cache_validator`: Checksummed envelopes for in-memory cache entries.
//! - `collector`: Prospect data collection, tool-result persistence, tool timeouts.
//! - `config`: Configuration management.
//! - `csv_export`: CSV rendering of cache records.
//! - `db`: Database connection and pool management.
//! - `db_storage`: Postgres-backed prospect cache.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `prospect_cache`: Cache key derivation, staleness, store trait, in-memory store.
//! - `routes`: Router and middleware assembly.
//! - `source_tracker`: Per-report source accumulation and citations.

pub mod cache_validator;
pub mod collector;
pub mod config;
pub mod csv_export;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod prospect_cache;
pub mod routes;
pub mod source_tracker;
