use crate::app::{
    Entry, ListQuery, QueryRequest, SpinnerStyle, StageTag, TextField, require_non_empty,
};
use crate::domain::{Orderbook, OrderbookLevel};
use crate::infra::TraderError;
use std::sync::Arc;

pub fn orderbook_query() -> ListQuery {
    ListQuery::new(
        StageTag::Orderbook,
        "Orderbook",
        vec![
            TextField::new("market, e.g. SOLUSDC").validated(require_non_empty),
            TextField::new("depth limit (optional)").validated(optional_positive_limit),
        ],
        SpinnerStyle::LINE,
        Arc::new(run_orderbook),
    )
}

pub fn run_orderbook(request: QueryRequest) {
    match fetch_orderbook(&request) {
        Ok(items) => request.reply.loaded(items),
        Err(error) => request.reply.failed(error),
    }
}

fn fetch_orderbook(request: &QueryRequest) -> Result<Vec<Entry>, TraderError> {
    // The form validated the limit before submit.
    let limit = parse_limit(request.value(1)).unwrap_or_default();
    let client = request.connect()?;
    let orderbook = client.orderbook(request.value(0).trim(), limit, request.settings.project)?;
    Ok(orderbook_entries(&orderbook))
}

pub fn orderbook_entries(orderbook: &Orderbook) -> Vec<Entry> {
    let asks = orderbook.asks.iter().map(|level| level_entry("ASK", level));
    let bids = orderbook.bids.iter().map(|level| level_entry("BID", level));
    asks.chain(bids).collect()
}

fn level_entry(side: &str, level: &OrderbookLevel) -> Entry {
    Entry::new(format!("[{side}] {}", level.price), level.to_string())
}

fn parse_limit(value: &str) -> Result<Option<u32>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    match value.parse::<u32>() {
        Ok(limit) if limit > 0 => Ok(Some(limit)),
        _ => Err(format!("limit must be a positive integer, got {value:?}")),
    }
}

fn optional_positive_limit(value: &str) -> Result<(), String> {
    parse_limit(value).map(|_| ())
}
