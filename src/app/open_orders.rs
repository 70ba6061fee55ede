use crate::app::{
    Entry, ListQuery, QueryRequest, SpinnerStyle, StageTag, TextField, require_non_empty,
};
use crate::domain::Order;
use crate::infra::TraderError;
use std::sync::Arc;

pub fn open_orders_query() -> ListQuery {
    ListQuery::new(
        StageTag::OpenOrders,
        "Open Orders",
        vec![TextField::new("market, e.g. SOLUSDC").validated(require_non_empty)],
        SpinnerStyle::DOT,
        Arc::new(run_open_orders),
    )
}

pub fn run_open_orders(request: QueryRequest) {
    match fetch_open_orders(&request) {
        Ok(items) => request.reply.loaded(items),
        Err(error) => request.reply.failed(error),
    }
}

fn fetch_open_orders(request: &QueryRequest) -> Result<Vec<Entry>, TraderError> {
    let owner = request
        .settings
        .public_key
        .ok_or(TraderError::NotConfigured("public key"))?;
    let open_orders_address = request
        .settings
        .open_orders_address
        .ok_or(TraderError::NotConfigured("open orders address"))?;
    let client = request.connect()?;
    let orders = client.open_orders(
        request.value(0).trim(),
        owner,
        open_orders_address,
        request.settings.project,
    )?;
    Ok(orders.iter().map(order_entry).collect())
}

pub fn order_entry(order: &Order) -> Entry {
    Entry::new(order.title(), order.description()).with_filter_value(order.order_id.clone())
}
