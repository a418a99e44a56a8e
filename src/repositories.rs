use std::collections::BTreeMap;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{bson::doc, options::ReturnDocument, Client, Collection};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::{domain::Cart, errors::RepositoryError};

const CART_ID_SEQUENCE: &str = "cart_id";

#[derive(Debug)]
pub struct MongoDbInitializationInfo {
    pub uri: String,
    pub database: String,
    pub collection: String,
    pub counters_collection: String,
}

#[async_trait]
pub trait CartRepository {
    async fn create(&self) -> Result<Cart, RepositoryError>;
    async fn read(&self, id: i64) -> Result<Cart, RepositoryError>;
    async fn read_all(&self) -> Result<Vec<Cart>, RepositoryError>;
    async fn update(&self, cart: Cart) -> Result<Cart, RepositoryError>;
}

struct InMemoryCarts {
    next_id: i64,
    carts: BTreeMap<i64, Cart>,
}

pub struct InMemoryCartRepository {
    state: Mutex<InMemoryCarts>,
}

impl InMemoryCartRepository {
    pub fn new() -> Self {
        InMemoryCartRepository {
            state: Mutex::new(InMemoryCarts {
                next_id: 1,
                carts: BTreeMap::new(),
            }),
        }
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    async fn create(&self) -> Result<Cart, RepositoryError> {
        let mut lock = self.state.lock().await;
        let cart = Cart::empty(lock.next_id);
        lock.next_id += 1;
        lock.carts.insert(cart.id, cart.clone());

        Ok(cart)
    }

    async fn read(&self, id: i64) -> Result<Cart, RepositoryError> {
        let lock = self.state.lock().await;
        match lock.carts.get(&id) {
            Some(x) => Ok(x.clone()),
            None => Err(RepositoryError::NotFound(id)),
        }
    }

    async fn read_all(&self) -> Result<Vec<Cart>, RepositoryError> {
        let lock = self.state.lock().await;

        Ok(lock.carts.values().cloned().collect())
    }

    async fn update(&self, cart: Cart) -> Result<Cart, RepositoryError> {
        let mut lock = self.state.lock().await;
        match lock.carts.get_mut(&cart.id) {
            Some(x) => {
                x.cart_json = cart.cart_json.clone();
                Ok(x.clone())
            }
            None => Err(RepositoryError::NotFound(cart.id)),
        }
    }
}

#[derive(Deserialize)]
struct Counter {
    seq: i64,
}

#[derive(Clone)]
pub struct MongoDbCartRepository {
    cart_collection: Collection<Cart>,
    counter_collection: Collection<Counter>,
}

impl MongoDbCartRepository {
    pub async fn new(info: &MongoDbInitializationInfo) -> Result<Self, RepositoryError> {
        let client = Client::with_uri_str(&info.uri)
            .await
            .map_err(|e| RepositoryError::Persistence(format!("Failed to connect to MongoDB: {}", e)))?;
        let database = client.database(&info.database);

        Ok(MongoDbCartRepository {
            cart_collection: database.collection(&info.collection),
            counter_collection: database.collection(&info.counters_collection),
        })
    }

    async fn next_id(&self) -> Result<i64, RepositoryError> {
        let counter = self
            .counter_collection
            .find_one_and_update(doc! {"_id": CART_ID_SEQUENCE}, doc! {"$inc": {"seq": 1_i64}})
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| RepositoryError::Persistence(format!("Failed to allocate Cart id: {}", e)))?;

        match counter {
            Some(c) => Ok(c.seq),
            None => Err(RepositoryError::Persistence(String::from("Cart id sequence is missing"))),
        }
    }
}

#[async_trait]
impl CartRepository for MongoDbCartRepository {
    async fn create(&self) -> Result<Cart, RepositoryError> {
        let cart = Cart::empty(self.next_id().await?);

        match self.cart_collection.insert_one(&cart).await {
            Ok(_) => Ok(cart),
            Err(e) => Err(RepositoryError::Persistence(format!("Failed to insert Cart: {}", e))),
        }
    }

    async fn read(&self, id: i64) -> Result<Cart, RepositoryError> {
        match self.cart_collection.find_one(doc! {"id": id}).await {
            Ok(Some(c)) => Ok(c),
            Ok(None) => Err(RepositoryError::NotFound(id)),
            Err(e) => Err(RepositoryError::Persistence(format!("Failed to find Cart: {}", e))),
        }
    }

    async fn read_all(&self) -> Result<Vec<Cart>, RepositoryError> {
        let found_carts = self
            .cart_collection
            .find(doc! {})
            .await
            .map_err(|e| RepositoryError::Persistence(format!("Failed to find Carts: {}", e)))?;

        found_carts
            .try_collect()
            .await
            .map_err(|e| RepositoryError::Persistence(format!("Failed to read Carts: {}", e)))
    }

    async fn update(&self, cart: Cart) -> Result<Cart, RepositoryError> {
        match self.cart_collection.replace_one(doc! {"id": cart.id}, &cart).await {
            Ok(result) if result.matched_count == 0 => Err(RepositoryError::NotFound(cart.id)),
            Ok(_) => Ok(cart),
            Err(e) => Err(RepositoryError::Persistence(format!("Failed to update Cart: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    #[tokio::test]
    async fn created_carts_get_fresh_ids_and_no_items() {
        let repository = InMemoryCartRepository::new();

        let first = repository.create().await.unwrap();
        let second = repository.create().await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(codec::parse_cart_items(&first.cart_json).unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_unknown_id_is_not_found() {
        let repository = InMemoryCartRepository::new();

        assert!(matches!(repository.read(99).await, Err(RepositoryError::NotFound(99))));
    }

    #[tokio::test]
    async fn update_replaces_items_of_existing_cart() {
        let repository = InMemoryCartRepository::new();
        let mut cart = repository.create().await.unwrap();
        cart.cart_json = String::from("{\"items\":[{\"productId\":1,\"qty\":1}]}");

        repository.update(cart.clone()).await.unwrap();

        assert_eq!(repository.read(cart.id).await.unwrap(), cart);
    }

    #[tokio::test]
    async fn update_of_missing_cart_fails() {
        let repository = InMemoryCartRepository::new();

        let result = repository.update(Cart::empty(5)).await;

        assert!(matches!(result, Err(RepositoryError::NotFound(5))));
        assert!(repository.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_all_lists_every_cart() {
        let repository = InMemoryCartRepository::new();
        repository.create().await.unwrap();
        repository.create().await.unwrap();

        let ids: Vec<i64> = repository.read_all().await.unwrap().iter().map(|c| c.id).collect();

        assert_eq!(ids, vec![1, 2]);
    }
}
