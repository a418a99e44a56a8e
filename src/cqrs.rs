use std::sync::Arc;

use serde_json::Value;
use tracing::{event, Level};

use crate::{
    clients::{CatalogClient, OrderClient},
    codec,
    domain::Item,
    dtos::{CartResponse, CompleteOrderResponse, CreateCartResponse, Response},
    errors::CartError,
    uow::CartUnitOfWork,
};

// traits
pub trait Command{}
pub trait Query{}

pub trait CommandHandler<C: Command, R: Response>{
    async fn handle(&self, input: &C) -> Result<R, CartError>;
}

pub trait QueryHandler<Q: Query, R: Response>{
    async fn handle(&self, input: &Q) -> Result<R, CartError>;
}

pub struct CreateCartCommand{
}
impl Command for CreateCartCommand{}

pub struct AddItemToCartCommand {
    pub cart_id: i64,
    pub item: Item,
}
impl Command for AddItemToCartCommand{}

pub struct RemoveItemFromCartCommand {
    pub cart_id: i64,
    pub product_id: i64,
}
impl Command for RemoveItemFromCartCommand{}

pub struct CompleteOrderCommand {
    pub cart_id: i64,
}
impl Command for CompleteOrderCommand{}

pub struct GetCartQuery {
    pub id: i64,
}
impl Query for GetCartQuery{}

pub struct ListCartsQuery{
}
impl Query for ListCartsQuery{}

pub struct CreateCartCommandHandler {
    uow: Arc<CartUnitOfWork>,
}

impl CreateCartCommandHandler {
    pub fn new(uow: Arc<CartUnitOfWork>) -> Self {
        CreateCartCommandHandler {
            uow: uow
        }
    }
}

impl CommandHandler<CreateCartCommand, CreateCartResponse> for CreateCartCommandHandler {
    async fn handle(&self, _input: &CreateCartCommand) -> Result<CreateCartResponse, CartError> {
        match self.uow.get_cart_repository().create().await {
            Ok(created_cart) => {
                event!(Level::TRACE, "New cart {} created.", created_cart.id);
                Ok(CreateCartResponse(created_cart.id))
            },
            Err(e) => {
                event!(Level::ERROR, "Error occurred while creating cart: {}", e);
                Err(e.into())
            }
        }
    }
}

pub struct AddItemToCartCommandHandler {
    uow: Arc<CartUnitOfWork>,
    catalog_client: Option<Arc<dyn CatalogClient + Send + Sync>>,
}

impl AddItemToCartCommandHandler {
    pub fn new(uow: Arc<CartUnitOfWork>, catalog_client: Option<Arc<dyn CatalogClient + Send + Sync>>) -> Self {
        AddItemToCartCommandHandler {
            uow: uow,
            catalog_client: catalog_client,
        }
    }

    async fn ensure_in_stock(&self, catalog_client: &(dyn CatalogClient + Send + Sync), item: &Item) -> Result<(), CartError> {
        let available_qty = match catalog_client.get_available_qty(item.product_id).await {
            Ok(qty) => qty,
            Err(e) => {
                event!(Level::WARN, "Stock check for product {} failed: {}", item.product_id, e);
                return Err(e.into());
            }
        };

        if available_qty < item.qty {
            event!(Level::TRACE, "Product {} is out of stock", item.product_id);
            return Err(CartError::OutOfStock { product_id: item.product_id });
        }

        Ok(())
    }
}

impl CommandHandler<AddItemToCartCommand, CartResponse> for AddItemToCartCommandHandler {
    async fn handle(&self, input: &AddItemToCartCommand) -> Result<CartResponse, CartError> {
        // Without a catalog the item is accepted unchecked.
        if let Some(catalog_client) = &self.catalog_client {
            self.ensure_in_stock(catalog_client.as_ref(), &input.item).await?;
        }

        let encoded_item = codec::encode(&input.item);
        let updated_cart = self.uow.mutate(input.cart_id, move |items| {
            items.push(encoded_item);
            Ok(())
        }).await?;

        Ok(updated_cart.into())
    }
}

pub struct RemoveItemFromCartCommandHandler {
    uow: Arc<CartUnitOfWork>,
}

impl RemoveItemFromCartCommandHandler {
    pub fn new(uow: Arc<CartUnitOfWork>) -> Self {
        RemoveItemFromCartCommandHandler {
            uow: uow
        }
    }
}

impl CommandHandler<RemoveItemFromCartCommand, CartResponse> for RemoveItemFromCartCommandHandler {
    async fn handle(&self, input: &RemoveItemFromCartCommand) -> Result<CartResponse, CartError> {
        let product_id = input.product_id;

        let updated_cart = self.uow.mutate(input.cart_id, move |items| {
            match items.iter().position(|item| codec::item_product_id(item) == Some(product_id)) {
                Some(index) => {
                    items.remove(index);
                    Ok(())
                },
                None => Err(CartError::ItemNotInCart { product_id: product_id }),
            }
        }).await?;

        Ok(updated_cart.into())
    }
}

pub struct CompleteOrderCommandHandler {
    uow: Arc<CartUnitOfWork>,
    order_client: Option<Arc<dyn OrderClient + Send + Sync>>,
}

impl CompleteOrderCommandHandler {
    pub fn new(uow: Arc<CartUnitOfWork>, order_client: Option<Arc<dyn OrderClient + Send + Sync>>) -> Self {
        CompleteOrderCommandHandler {
            uow: uow,
            order_client: order_client,
        }
    }
}

impl CommandHandler<CompleteOrderCommand, CompleteOrderResponse> for CompleteOrderCommandHandler {
    async fn handle(&self, input: &CompleteOrderCommand) -> Result<CompleteOrderResponse, CartError> {
        let cart = self.uow.get_cart_repository().read(input.cart_id).await?;

        // The cart is left as it is in both branches; it has no status to close.
        match &self.order_client {
            Some(order_client) => {
                let payload = Value::Object(codec::parse_cart_document(&cart.cart_json)?);

                match order_client.submit_cart(&payload).await {
                    Ok(response) => Ok(CompleteOrderResponse::Relayed(response)),
                    Err(e) => {
                        event!(Level::WARN, "Submitting cart {} failed: {}", cart.id, e);
                        Err(e.into())
                    }
                }
            },
            None => Ok(CompleteOrderResponse::NoOrderService),
        }
    }
}

pub struct GetCartQueryHandler {
    uow: Arc<CartUnitOfWork>,
}

impl GetCartQueryHandler {
    pub fn new(uow: Arc<CartUnitOfWork>) -> Self {
        GetCartQueryHandler {
            uow: uow
        }
    }
}

impl QueryHandler<GetCartQuery, CartResponse> for GetCartQueryHandler {
    async fn handle(&self, input: &GetCartQuery) -> Result<CartResponse, CartError> {
        Ok(self.uow.get_cart_repository().read(input.id).await?.into())
    }
}

pub struct ListCartsQueryHandler {
    uow: Arc<CartUnitOfWork>,
}

impl ListCartsQueryHandler {
    pub fn new(uow: Arc<CartUnitOfWork>) -> Self {
        ListCartsQueryHandler {
            uow: uow
        }
    }
}

impl QueryHandler<ListCartsQuery, Vec<CartResponse>> for ListCartsQueryHandler {
    async fn handle(&self, _input: &ListCartsQuery) -> Result<Vec<CartResponse>, CartError> {
        match self.uow.get_cart_repository().read_all().await {
            Ok(carts) => Ok(carts.into_iter().map(CartResponse::from).collect()),
            Err(e) => {
                event!(Level::ERROR, "Error occurred while listing carts: {}", e);
                Err(e.into())
            }
        }
    }
}
