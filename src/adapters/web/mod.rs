//! JSON HTTP entrypoint over the price resolver.
//!
//! Handlers hand the synchronous engine to `spawn_blocking`, so store and
//! remote I/O never run on the async workers.

mod error;
mod handlers;

pub use error::WebError;
pub use handlers::*;

use axum::{Router, routing::get};
use std::sync::Arc;

use crate::ports::clock_port::Clock;
use crate::ports::quote_port::QuotePort;
use crate::ports::store_port::PriceStore;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";

pub struct AppState {
    pub store: Arc<dyn PriceStore>,
    pub quotes: Arc<dyn QuotePort>,
    pub clock: Arc<dyn Clock>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/prices/historical", get(handlers::historical_prices))
        .route("/prices/cached", get(handlers::cached_prices))
        .route("/prices/last", get(handlers::last_traded_prices))
        .route("/symbols", get(handlers::list_symbols))
        .fallback(handlers::not_found)
        .with_state(Arc::new(state))
}
