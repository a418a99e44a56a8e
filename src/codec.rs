use serde_json::{json, Map, Value};

use crate::{domain::Item, errors::CartError};

const ITEMS_KEY: &str = "items";

pub fn decode(raw: &Value) -> Result<Item, CartError> {
    Ok(Item {
        product_id: required_integer(raw, "productId")?,
        qty: non_negative(required_integer(raw, "qty")?)?,
    })
}

/// Removal only needs the product reference; a missing `qty` binds to 0.
pub fn decode_product_ref(raw: &Value) -> Result<Item, CartError> {
    let product_id = required_integer(raw, "productId")?;
    let qty = match raw.get("qty") {
        None | Some(Value::Null) => 0,
        Some(_) => non_negative(required_integer(raw, "qty")?)?,
    };

    Ok(Item { product_id, qty })
}

pub fn encode(item: &Item) -> Value {
    json!({
        "productId": item.product_id,
        "qty": item.qty,
    })
}

/// Product id of an item stored in a cart. Numeric strings are accepted
/// for records written by older clients.
pub fn item_product_id(item: &Value) -> Option<i64> {
    match item.get("productId")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn parse_cart_document(cart_json: &str) -> Result<Map<String, Value>, CartError> {
    match serde_json::from_str::<Value>(cart_json) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(_) => Err(CartError::MalformedCartState(String::from(
            "cart document is not a JSON object",
        ))),
        Err(e) => Err(CartError::MalformedCartState(e.to_string())),
    }
}

pub fn parse_cart_items(cart_json: &str) -> Result<Vec<Value>, CartError> {
    let mut document = parse_cart_document(cart_json)?;

    match document.remove(ITEMS_KEY) {
        Some(Value::Array(items)) => Ok(items),
        _ => Err(CartError::MalformedCartState(String::from(
            "cart document has no items array",
        ))),
    }
}

/// Writes `items` back into the stored document, leaving every other
/// top-level key as it was.
pub fn serialize_cart_items(cart_json: &str, items: Vec<Value>) -> Result<String, CartError> {
    let mut document = parse_cart_document(cart_json)?;
    document.insert(String::from(ITEMS_KEY), Value::Array(items));

    serde_json::to_string(&Value::Object(document))
        .map_err(|e| CartError::MalformedCartState(e.to_string()))
}

fn required_integer(raw: &Value, field: &str) -> Result<i64, CartError> {
    match raw.get(field) {
        Some(value) => value
            .as_i64()
            .ok_or_else(|| CartError::MalformedPayload(format!("{} must be an integer", field))),
        None => Err(CartError::MalformedPayload(format!("{} is required", field))),
    }
}

fn non_negative(qty: i64) -> Result<i64, CartError> {
    if qty < 0 {
        return Err(CartError::MalformedPayload(String::from("qty cannot be negative")));
    }

    Ok(qty)
}
