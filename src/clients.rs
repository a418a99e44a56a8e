use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde_json::Value;
use tracing::{event, Level};

use crate::{
    discovery::{ServiceDiscovery, CATALOG_SERVICE, ORDER_SERVICE},
    domain::{RemoteResponse, StockQuantityResponse},
    errors::RemoteCallError,
};

#[async_trait]
pub trait CatalogClient {
    async fn get_available_qty(&self, product_id: i64) -> Result<i64, RemoteCallError>;
}

#[async_trait]
pub trait OrderClient {
    async fn submit_cart(&self, cart_payload: &Value) -> Result<RemoteResponse, RemoteCallError>;
}

#[derive(Clone)]
pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
}

impl HttpCatalogClient {
    pub fn new(client: Client, base_url: String) -> Self {
        HttpCatalogClient {
            client: client,
            base_url: base_url,
        }
    }

    /// `None` when the catalog cannot be discovered.
    pub fn discover(client: Client, discovery: &dyn ServiceDiscovery) -> Option<Self> {
        discovery
            .resolve(CATALOG_SERVICE)
            .map(|base_url| HttpCatalogClient::new(client, base_url))
    }

    fn product_qty_url(&self, product_id: i64) -> String {
        format!("{}/products/getProductQty/productId/{}", self.base_url, product_id)
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn get_available_qty(&self, product_id: i64) -> Result<i64, RemoteCallError> {
        let url = self.product_qty_url(product_id);
        event!(Level::DEBUG, "querying stock at {}", url);

        let stock = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<StockQuantityResponse>()
            .await?;

        Ok(stock.qty)
    }
}

#[derive(Clone)]
pub struct HttpOrderClient {
    client: Client,
    base_url: String,
}

impl HttpOrderClient {
    pub fn new(client: Client, base_url: String) -> Self {
        HttpOrderClient {
            client: client,
            base_url: base_url,
        }
    }

    /// `None` when the order service cannot be discovered.
    pub fn discover(client: Client, discovery: &dyn ServiceDiscovery) -> Option<Self> {
        discovery
            .resolve(ORDER_SERVICE)
            .map(|base_url| HttpOrderClient::new(client, base_url))
    }

    fn complete_order_url(&self) -> String {
        format!("{}/orders/completeOrder", self.base_url)
    }
}

#[async_trait]
impl OrderClient for HttpOrderClient {
    async fn submit_cart(&self, cart_payload: &Value) -> Result<RemoteResponse, RemoteCallError> {
        let url = self.complete_order_url();
        event!(Level::DEBUG, "submitting cart to {}", url);

        let response = self.client.post(&url).json(cart_payload).send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        let body = response.text().await?;

        Ok(RemoteResponse {
            status: status,
            content_type: content_type,
            body: body,
        })
    }
}
