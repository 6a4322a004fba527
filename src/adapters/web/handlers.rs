//! HTTP request handlers for the web adapter.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::domain::error::QuoteCacheError;
use crate::domain::price::{LastTradedPrice, PricePoint, StoredRecord, SymbolInfo};
use crate::domain::resolver::PriceResolver;

use super::{AppState, WebError};

/// `?symbol=&range=&date=`. An absent parameter is `None`; `?range=` is `Some("")`.
#[derive(Debug, Deserialize)]
pub struct HistoricalParams {
    pub symbol: Option<String>,
    pub range: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CachedParams {
    pub symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LastParams {
    pub symbols: Option<String>,
}

async fn with_resolver<T, F>(state: Arc<AppState>, f: F) -> Result<T, WebError>
where
    T: Send + 'static,
    F: FnOnce(&PriceResolver<'_>) -> Result<T, QuoteCacheError> + Send + 'static,
{
    let joined = tokio::task::spawn_blocking(move || {
        let resolver = PriceResolver::new(&*state.store, &*state.quotes, &*state.clock);
        f(&resolver)
    })
    .await
    .map_err(|e| WebError::internal(e.to_string()))?;
    Ok(joined?)
}

pub async fn historical_prices(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoricalParams>,
) -> Result<Json<Vec<PricePoint>>, WebError> {
    let symbol = params.symbol.unwrap_or_default();
    let prices = with_resolver(state, move |resolver| {
        resolver.resolve(&symbol, params.range.as_deref(), params.date.as_deref())
    })
    .await?;
    Ok(Json(prices))
}

pub async fn cached_prices(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CachedParams>,
) -> Result<Json<Vec<StoredRecord>>, WebError> {
    let records = with_resolver(state, move |resolver| {
        resolver.cached_prices(params.symbol.as_deref().filter(|s| !s.is_empty()))
    })
    .await?;
    Ok(Json(records))
}

pub async fn list_symbols(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SymbolInfo>>, WebError> {
    let symbols = with_resolver(state, |resolver| resolver.list_symbols()).await?;
    Ok(Json(symbols))
}

pub async fn last_traded_prices(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LastParams>,
) -> Result<Json<Vec<LastTradedPrice>>, WebError> {
    let symbols = split_symbols(params.symbols.as_deref().unwrap_or_default());
    let prices = with_resolver(state, move |resolver| resolver.last_traded_prices(&symbols)).await?;
    Ok(Json(prices))
}

pub async fn not_found() -> WebError {
    WebError::not_found("no such route")
}

/// `"FB, AAPL,,"` -> `["FB", "AAPL"]`.
pub fn split_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
