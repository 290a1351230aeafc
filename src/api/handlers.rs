//! API Handlers
//!
//! HTTP request handlers exposing registered caches.

use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

use crate::cache::Cache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_key, AgeQuery, CachesResponse, ClearResponse, FlushResponse, FreshResponse,
    GetResponse, HealthResponse, SetRequest, SetResponse, StatsResponse,
};
use crate::registry::{CacheRegistry, DEFAULT_STORE};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Registry of named caches; writers only take the lock to register a cache
    pub registry: Arc<RwLock<CacheRegistry>>,
}

impl AppState {
    pub fn new(registry: CacheRegistry) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
        }
    }

    /// Creates a registry over the configured default store.
    pub fn from_config(config: &Config) -> Self {
        let registry = CacheRegistry::new(config.build_store())
            .with_global_namespace(config.global_namespace.clone())
            .with_caches_enabled(config.caches_enabled);
        Self::new(registry)
    }

    /// Returns the named cache, registering it on the default store on first use.
    async fn provide(&self, name: &str) -> Result<Arc<Cache>> {
        if let Some(error_msg) = validate_key(name) {
            return Err(CacheError::InvalidRequest(error_msg));
        }

        match self.registry.read().await.cache(name) {
            Err(CacheError::NoCache(_)) => {}
            found => return found,
        }

        self.registry.write().await.provide(name, DEFAULT_STORE)
    }
}

/// Runs a cache operation on the blocking pool; stores may do file I/O.
async fn run_blocking<T, F>(operation: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|e| CacheError::Backend(format!("Cache task failed: {}", e)))?
}

fn checked_key(key: &str) -> Result<()> {
    match validate_key(key) {
        Some(error_msg) => Err(CacheError::InvalidRequest(error_msg)),
        None => Ok(()),
    }
}

/// Handler for PUT /caches/:cache/keys/:key
pub async fn set_handler(
    State(state): State<AppState>,
    Path((cache_name, key)): Path<(String, String)>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    checked_key(&key)?;
    let cache = state.provide(&cache_name).await?;

    let ttl = req.ttl.unwrap_or(0);
    let write_key = key.clone();
    run_blocking(move || cache.set(&write_key, &req.value, ttl)).await?;

    Ok(Json(SetResponse::new(key, ttl)))
}

/// Handler for GET /caches/:cache/keys/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path((cache_name, key)): Path<(String, String)>,
    Query(query): Query<AgeQuery>,
) -> Result<Json<GetResponse>> {
    checked_key(&key)?;
    let cache = state.provide(&cache_name).await?;

    let read_key = key.clone();
    let age = query.seconds();
    match run_blocking(move || cache.get::<Value>(&read_key, age)).await? {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for GET /caches/:cache/keys/:key/fresh
pub async fn fresh_handler(
    State(state): State<AppState>,
    Path((cache_name, key)): Path<(String, String)>,
    Query(query): Query<AgeQuery>,
) -> Result<Json<FreshResponse>> {
    checked_key(&key)?;
    let cache = state.provide(&cache_name).await?;

    let read_key = key.clone();
    let age = query.seconds();
    let fresh = run_blocking(move || cache.has(&read_key, age)).await?;
    Ok(Json(FreshResponse::new(key, fresh)))
}

/// Handler for DELETE /caches/:cache/keys/:key
pub async fn clear_handler(
    State(state): State<AppState>,
    Path((cache_name, key)): Path<(String, String)>,
) -> Result<Json<ClearResponse>> {
    checked_key(&key)?;
    let cache = state.provide(&cache_name).await?;

    let clear_key = key.clone();
    run_blocking(move || cache.clear(&clear_key)).await?;
    Ok(Json(ClearResponse::new(key)))
}

/// Handler for POST /caches/:cache/flush
pub async fn flush_handler(
    State(state): State<AppState>,
    Path(cache_name): Path<String>,
) -> Result<Json<FlushResponse>> {
    let cache = state.provide(&cache_name).await?;

    let namespace = cache.namespace();
    run_blocking(move || cache.flush()).await?;
    Ok(Json(FlushResponse::new(namespace)))
}

/// Handler for GET /caches/:cache/stats
///
/// Unlike the key endpoints this never registers a cache.
pub async fn stats_handler(
    State(state): State<AppState>,
    Path(cache_name): Path<String>,
) -> Result<Json<StatsResponse>> {
    let cache = state.registry.read().await.cache(&cache_name)?;

    Ok(Json(StatsResponse::new(
        cache.namespace(),
        cache.is_enabled(),
        &cache.stats(),
    )))
}

/// Handler for GET /caches
pub async fn list_caches_handler(State(state): State<AppState>) -> Json<CachesResponse> {
    let caches = state.registry.read().await.cache_names();
    Json(CachesResponse { caches })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
