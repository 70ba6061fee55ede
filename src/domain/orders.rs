use serde::Deserialize;
use std::fmt;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
pub enum Side {
    #[serde(rename = "S_BID")]
    Bid,
    #[serde(rename = "S_ASK")]
    Ask,
    #[default]
    #[serde(rename = "S_UNKNOWN", other)]
    Unknown,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "?",
            Self::Bid => "BID",
            Self::Ask => "ASK",
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "orderID")]
    pub order_id: String,
    #[serde(default)]
    pub side: Side,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub remaining_size: f64,
    #[serde(rename = "clientOrderID", default)]
    pub client_order_id: String,
}

impl Order {
    pub fn title(&self) -> String {
        format!(
            "[{}] {} ({})",
            self.side.label(),
            self.order_id,
            self.client_order_id
        )
    }

    pub fn description(&self) -> String {
        format!(
            "{} @ {}; types: {}",
            self.remaining_size,
            self.price,
            self.types.join(", ")
        )
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
pub struct OrderbookLevel {
    pub price: f64,
    pub size: f64,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Orderbook {
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub bids: Vec<OrderbookLevel>,
    #[serde(default)]
    pub asks: Vec<OrderbookLevel>,
}

impl fmt::Display for OrderbookLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.size, self.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_decodes_from_api_json_and_formats_rows() {
        let json = r#"{
            "orderID": "123",
            "side": "S_ASK",
            "types": ["OT_LIMIT"],
            "price": 21.5,
            "remainingSize": 3.0,
            "clientOrderID": "7"
        }"#;
        let order: Order = serde_json::from_str(json).expect("decode");
        assert_eq!(order.side, Side::Ask);
        assert_eq!(order.title(), "[ASK] 123 (7)");
        assert_eq!(order.description(), "3 @ 21.5; types: OT_LIMIT");
    }

    #[test]
    fn unrecognized_side_falls_back_to_unknown() {
        let order: Order =
            serde_json::from_str(r#"{"orderID":"1","side":"S_SIDEWAYS"}"#).expect("decode");
        assert_eq!(order.side, Side::Unknown);

        let side: Side = serde_json::from_str(r#""S_BID""#).expect("decode");
        assert_eq!(side, Side::Bid);
        let side: Side = serde_json::from_str(r#""S_UNKNOWN""#).expect("decode");
        assert_eq!(side, Side::Unknown);
    }
}
