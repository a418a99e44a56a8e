use serde::{Deserialize, Serialize};

pub const EMPTY_CART_JSON: &str = "{\"items\":[]}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: i64,
    #[serde(rename = "cartJSON")]
    pub cart_json: String,
}

impl Cart {
    pub fn empty(id: i64) -> Self {
        Cart {
            id: id,
            cart_json: String::from(EMPTY_CART_JSON),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    pub product_id: i64,
    pub qty: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StockQuantityResponse {
    pub qty: i64,
}

/// Response of a downstream service, passed back to the caller untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}
