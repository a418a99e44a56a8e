use std::{collections::HashMap, sync::Arc};

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{event, Level};

use crate::{codec, domain::Cart, errors::CartError, repositories::CartRepository};

/// Serializes load -> mutate -> write sequences per cart id.
///
/// Mutations on different carts run in parallel; two mutations of the same
/// cart are applied one after the other, so neither update is lost. The
/// mutated items are only written once the mutation succeeded, which keeps a
/// failed request from leaving partial state behind.
pub struct CartUnitOfWork {
    cart_repository: Arc<dyn CartRepository + Send + Sync>,
    cart_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl CartUnitOfWork {
    pub fn new(cart_repository: Arc<dyn CartRepository + Send + Sync>) -> CartUnitOfWork {
        CartUnitOfWork {
            cart_repository: cart_repository,
            cart_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_cart_repository(&self) -> Arc<dyn CartRepository + Send + Sync> {
        self.cart_repository.clone()
    }

    pub async fn mutate<F>(&self, cart_id: i64, mutation: F) -> Result<Cart, CartError>
    where
        F: FnOnce(&mut Vec<Value>) -> Result<(), CartError> + Send,
    {
        let cart_lock = self.lock_for(cart_id).await;
        let _guard = cart_lock.lock().await;

        let mut cart = self.cart_repository.read(cart_id).await?;
        let mut items = codec::parse_cart_items(&cart.cart_json)?;

        mutation(&mut items)?;

        cart.cart_json = codec::serialize_cart_items(&cart.cart_json, items)?;

        event!(Level::TRACE, "committing cart {}", cart_id);
        let updated_cart = self.cart_repository.update(cart).await?;
        event!(Level::TRACE, "committed cart {}", cart_id);

        Ok(updated_cart)
    }

    async fn lock_for(&self, cart_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.cart_locks.lock().await;

        // Drop entries nobody is waiting on so the map tracks only busy carts.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);

        locks
            .entry(cart_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
