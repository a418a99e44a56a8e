use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{event, Level};

use crate::{
    codec,
    cqrs::{AddItemToCartCommand, CommandHandler, CompleteOrderCommand, CreateCartCommand, GetCartQuery, ListCartsQuery, QueryHandler, RemoveItemFromCartCommand},
    domain::RemoteResponse,
    dtos::{ApiError, CompleteOrderResponse},
    errors::CartError,
    state::AppState,
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))

        .route("/cart", get(get_carts).post(create_cart))

        .route("/cart/{id}", get(get_cart))

        .route("/cart/addToCart/{cart_id}", post(add_item_to_cart))

        .route("/cart/removeFromCart/{cart_id}", post(remove_item_from_cart))

        .route("/cart/completeOrder/{cart_id}", post(complete_order))

        .with_state(state)

        .layer(
            ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::very_permissive().allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]))
        )
}

pub async fn index() -> &'static str {
    "Cart service is running"
}

pub async fn get_carts(State(state): State<Arc<AppState>>) -> Response {
    match state.list_carts_query_handler.handle(&ListCartsQuery{}).await {
        Ok(carts) => (StatusCode::OK, Json(json!(carts))).into_response(),
        Err(e) => e.into_response()
    }
}

pub async fn get_cart(Path(id): Path<i64>, State(state): State<Arc<AppState>>) -> Response {
    match state.get_cart_query_handler.handle(&GetCartQuery{id: id}).await {
        Ok(cart) => (StatusCode::OK, Json(json!(cart))).into_response(),
        Err(e) => e.into_response()
    }
}

pub async fn create_cart(State(state): State<Arc<AppState>>) -> Response {
    match state.create_cart_command_handler.handle(&CreateCartCommand{}).await {
        Ok(created) => (StatusCode::CREATED, Json(json!(created.0))).into_response(),
        Err(e) => e.into_response()
    }
}

pub async fn add_item_to_cart(Path(cart_id): Path<i64>, State(state): State<Arc<AppState>>, payload: Result<Json<Value>, JsonRejection>) -> Response {
    let item = match item_payload(payload).and_then(|payload| codec::decode(&payload)) {
        Ok(item) => item,
        Err(e) => return e.into_response()
    };

    match state.add_item_to_cart_command_handler.handle(&AddItemToCartCommand{cart_id: cart_id, item: item}).await {
        Ok(cart) => (StatusCode::OK, Json(json!(cart))).into_response(),
        Err(e) => e.into_response()
    }
}

pub async fn remove_item_from_cart(Path(cart_id): Path<i64>, State(state): State<Arc<AppState>>, payload: Result<Json<Value>, JsonRejection>) -> Response {
    let item = match item_payload(payload).and_then(|payload| codec::decode_product_ref(&payload)) {
        Ok(item) => item,
        Err(e) => return e.into_response()
    };

    match state.remove_item_from_cart_command_handler.handle(&RemoveItemFromCartCommand{cart_id: cart_id, product_id: item.product_id}).await {
        Ok(cart) => (StatusCode::OK, Json(json!(cart))).into_response(),
        Err(e) => e.into_response()
    }
}

pub async fn complete_order(Path(cart_id): Path<i64>, State(state): State<Arc<AppState>>) -> Response {
    match state.complete_order_command_handler.handle(&CompleteOrderCommand{cart_id: cart_id}).await {
        Ok(CompleteOrderResponse::Relayed(remote)) => relay(remote),
        Ok(CompleteOrderResponse::NoOrderService) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response()
    }
}

/// Body rejections (bad JSON, wrong content type) answer like any other malformed item.
fn item_payload(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, CartError> {
    match payload {
        Ok(Json(payload)) => Ok(payload),
        Err(rejection) => {
            event!(Level::DEBUG, "Rejected item payload: {}", rejection.body_text());
            Err(CartError::MalformedPayload(rejection.body_text()))
        }
    }
}

fn relay(remote: RemoteResponse) -> Response {
    let status = StatusCode::from_u16(remote.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, remote.body).into_response();

    let headers = response.headers_mut();
    headers.remove(CONTENT_TYPE);
    if let Some(content_type) = remote.content_type.and_then(|ct| HeaderValue::from_str(&ct).ok()) {
        headers.insert(CONTENT_TYPE, content_type);
    }

    response
}

impl IntoResponse for CartError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CartError::NotFound(_) => (StatusCode::NOT_FOUND, "Cart not found"),
            CartError::MalformedPayload(_) => (StatusCode::BAD_REQUEST, "Malformed item payload"),
            CartError::OutOfStock { .. } => (StatusCode::METHOD_NOT_ALLOWED, "Product is out of stock"),
            CartError::ItemNotInCart { .. } => (StatusCode::NOT_FOUND, "Item is not in cart"),
            CartError::Unreachable => (StatusCode::REQUEST_TIMEOUT, "Request timeout"),
            CartError::RemoteError
            | CartError::MalformedCartState(_)
            | CartError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
        };

        (status, Json(json!(ApiError::new(message)))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        clients::{CatalogClient, OrderClient},
        errors::RemoteCallError,
        repositories::InMemoryCartRepository,
        uow::CartUnitOfWork,
    };

    struct FixedCatalog(Result<i64, &'static str>);

    #[async_trait]
    impl CatalogClient for FixedCatalog {
        async fn get_available_qty(&self, _product_id: i64) -> Result<i64, RemoteCallError> {
            match self.0 {
                Ok(qty) => Ok(qty),
                Err("timeout") => Err(RemoteCallError::Unreachable(String::from("timeout"))),
                Err(other) => Err(RemoteCallError::Remote(other.to_string())),
            }
        }
    }

    struct AcceptingOrders;

    #[async_trait]
    impl OrderClient for AcceptingOrders {
        async fn submit_cart(&self, cart_payload: &Value) -> Result<RemoteResponse, RemoteCallError> {
            Ok(RemoteResponse {
                status: 201,
                content_type: Some(String::from("application/json")),
                body: json!({"submitted": cart_payload["items"]}).to_string(),
            })
        }
    }

    struct FailingOrders(bool);

    #[async_trait]
    impl OrderClient for FailingOrders {
        async fn submit_cart(&self, _cart_payload: &Value) -> Result<RemoteResponse, RemoteCallError> {
            if self.0 {
                Err(RemoteCallError::Unreachable(String::from("connection reset")))
            } else {
                Err(RemoteCallError::Remote(String::from("unreadable answer")))
            }
        }
    }

    fn app(catalog: Option<Arc<dyn CatalogClient + Send + Sync>>, orders: Option<Arc<dyn OrderClient + Send + Sync>>) -> Router {
        let uow = Arc::new(CartUnitOfWork::new(Arc::new(InMemoryCartRepository::new())));
        router(Arc::new(AppState::new(uow, catalog, orders)))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let body = match body {
            Some(json) => Body::from(json.to_string()),
            None => Body::empty(),
        };

        send_raw(app, method, uri, "application/json", body).await
    }

    async fn send_raw(app: &Router, method: &str, uri: &str, content_type: &str, body: Body) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", content_type)
            .body(body)
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, body)
    }

    fn items_of(cart: &Value) -> Value {
        let document: Value = serde_json::from_str(cart["cartJSON"].as_str().unwrap()).unwrap();
        document["items"].clone()
    }

    #[tokio::test]
    async fn cart_lifecycle_with_stock_check() {
        let app = app(Some(Arc::new(FixedCatalog(Ok(5)))), None);

        let (status, id) = send(&app, "POST", "/cart", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(id, json!(1));

        let (status, cart) = send(&app, "POST", "/cart/addToCart/1", Some(json!({"productId": 42, "qty": 2}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cart["id"], json!(1));
        assert_eq!(items_of(&cart), json!([{"productId": 42, "qty": 2}]));

        let (status, error) = send(&app, "POST", "/cart/addToCart/1", Some(json!({"productId": 42, "qty": 10}))).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(error, json!({"error": "Product is out of stock"}));

        let (_, cart) = send(&app, "GET", "/cart/1", None).await;
        assert_eq!(items_of(&cart), json!([{"productId": 42, "qty": 2}]));

        let (status, cart) = send(&app, "POST", "/cart/removeFromCart/1", Some(json!({"productId": 42}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(items_of(&cart), json!([]));
    }

    #[tokio::test]
    async fn list_and_get_carts() {
        let app = app(None, None);

        let (status, carts) = send(&app, "GET", "/cart", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(carts, json!([]));

        send(&app, "POST", "/cart", None).await;
        let (_, carts) = send(&app, "GET", "/cart", None).await;
        assert_eq!(carts, json!([{"id": 1, "cartJSON": "{\"items\":[]}"}]));

        let (status, _) = send(&app, "GET", "/cart/2", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn catalog_failures_become_timeout_or_internal_error() {
        let unreachable = app(Some(Arc::new(FixedCatalog(Err("timeout")))), None);
        send(&unreachable, "POST", "/cart", None).await;
        let (status, _) = send(&unreachable, "POST", "/cart/addToCart/1", Some(json!({"productId": 1, "qty": 1}))).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);

        let broken = app(Some(Arc::new(FixedCatalog(Err("bad body")))), None);
        send(&broken, "POST", "/cart", None).await;
        let (status, body) = send(&broken, "POST", "/cart/addToCart/1", Some(json!({"productId": 1, "qty": 1}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Internal error"}));
    }

    #[tokio::test]
    async fn malformed_item_is_bad_request() {
        let app = app(None, None);
        send(&app, "POST", "/cart", None).await;

        let (status, body) = send(&app, "POST", "/cart/addToCart/1", Some(json!({"productId": "x", "qty": 1}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Malformed item payload"}));

        let (status, body) = send_raw(&app, "POST", "/cart/addToCart/1", "application/json", Body::from("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Malformed item payload"}));

        let (status, body) = send_raw(&app, "POST", "/cart/removeFromCart/1", "text/plain", Body::from("{\"productId\": 1}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Malformed item payload"}));

        let (_, cart) = send(&app, "GET", "/cart/1", None).await;
        assert_eq!(items_of(&cart), json!([]));
    }

    #[tokio::test]
    async fn removing_absent_item_is_reported() {
        let app = app(None, None);
        send(&app, "POST", "/cart", None).await;

        let (status, body) = send(&app, "POST", "/cart/removeFromCart/1", Some(json!({"productId": 8}))).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Item is not in cart"}));
    }

    #[tokio::test]
    async fn complete_order_without_order_service_is_no_content() {
        let app = app(None, None);
        send(&app, "POST", "/cart", None).await;

        let (status, body) = send(&app, "POST", "/cart/completeOrder/1", None).await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn complete_order_relays_order_service_answer() {
        let app = app(None, Some(Arc::new(AcceptingOrders)));
        send(&app, "POST", "/cart", None).await;
        send(&app, "POST", "/cart/addToCart/1", Some(json!({"productId": 4, "qty": 1}))).await;

        let (status, body) = send(&app, "POST", "/cart/completeOrder/1", None).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"submitted": [{"productId": 4, "qty": 1}]}));

        let (status, _) = send(&app, "POST", "/cart/completeOrder/9", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn complete_order_failures_become_timeout_or_internal_error() {
        let unreachable = app(None, Some(Arc::new(FailingOrders(true))));
        send(&unreachable, "POST", "/cart", None).await;
        let (status, body) = send(&unreachable, "POST", "/cart/completeOrder/1", None).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body, json!({"error": "Request timeout"}));

        let broken = app(None, Some(Arc::new(FailingOrders(false))));
        send(&broken, "POST", "/cart", None).await;
        let (status, body) = send(&broken, "POST", "/cart/completeOrder/1", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Internal error"}));
    }

    #[test]
    fn relay_keeps_status_and_content_type() {
        let response = relay(RemoteResponse {
            status: 409,
            content_type: Some(String::from("text/plain")),
            body: String::from("declined"),
        });

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
    }
}
