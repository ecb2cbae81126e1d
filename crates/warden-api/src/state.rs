//! Application state management

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use warden_core::config::AppConfig;
use warden_core::UserStore;

use crate::auth::{Authenticator, TokenCodec};

/// Application state shared across handlers
///
/// The authentication dispatcher is built once here and threaded through
/// the router; the token secret inside it is the only long-lived piece of
/// auth state in the process.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// User storage collaborator
    pub store: Arc<dyn UserStore>,
    /// Token issuance
    pub tokens: TokenCodec,
    /// Request authentication dispatcher
    pub authenticator: Authenticator,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
}

impl AppState {
    /// Create new application state with config and a storage backend
    pub fn new(config: AppConfig, store: Arc<dyn UserStore>) -> Self {
        let tokens = TokenCodec::new(&config.auth);
        let authenticator = Authenticator::new(store.clone(), tokens.clone());

        Self {
            config,
            store,
            tokens,
            authenticator,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }
}
