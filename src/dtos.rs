use serde::{Deserialize, Serialize};

use crate::domain::{Cart, RemoteResponse};

pub trait Response{}

/// Wire shape of a cart; `cartJSON` stays a string-encoded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartResponse {
    pub id: Option<i64>,
    #[serde(rename = "cartJSON")]
    pub cart_json: String,
}
impl Response for CartResponse{}
impl Response for Vec<CartResponse>{}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        CartResponse {
            id: Some(cart.id),
            cart_json: cart.cart_json,
        }
    }
}

/// Serialized as the bare id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreateCartResponse(pub i64);
impl Response for CreateCartResponse{}

#[derive(Debug, Clone, PartialEq)]
pub enum CompleteOrderResponse {
    Relayed(RemoteResponse),
    NoOrderService,
}
impl Response for CompleteOrderResponse{}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String
}
impl Response for ApiError{}

impl ApiError {
    pub fn new(error: &str) -> Self {
        ApiError {
            error: error.to_string()
        }
    }
}
