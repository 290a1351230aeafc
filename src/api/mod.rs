//! API Module
//!
//! HTTP handlers and routing exposing registered caches.
//!
//! # Endpoints
//! - `PUT /caches/:cache/keys/:key` - Store a value with optional TTL
//! - `GET /caches/:cache/keys/:key?age=N` - Read a fresh value
//! - `GET /caches/:cache/keys/:key/fresh?age=N` - Freshness check
//! - `DELETE /caches/:cache/keys/:key` - Clear a key
//! - `POST /caches/:cache/flush` - Flush the cache namespace
//! - `GET /caches/:cache/stats` - Per-cache counters
//! - `GET /caches` - Registered cache names
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
