use std::sync::Arc;

use crate::{
    clients::{CatalogClient, OrderClient},
    cqrs::{AddItemToCartCommandHandler, CompleteOrderCommandHandler, CreateCartCommandHandler, GetCartQueryHandler, ListCartsQueryHandler, RemoveItemFromCartCommandHandler},
    uow::CartUnitOfWork,
};

#[derive(Clone)]
pub struct AppState {
    pub create_cart_command_handler: Arc<CreateCartCommandHandler>,
    pub add_item_to_cart_command_handler: Arc<AddItemToCartCommandHandler>,
    pub remove_item_from_cart_command_handler: Arc<RemoveItemFromCartCommandHandler>,
    pub complete_order_command_handler: Arc<CompleteOrderCommandHandler>,
    pub get_cart_query_handler: Arc<GetCartQueryHandler>,
    pub list_carts_query_handler: Arc<ListCartsQueryHandler>,
}

impl AppState {
    /// Downstream services that could not be discovered are passed as `None`.
    pub fn new(
        uow: Arc<CartUnitOfWork>,
        catalog_client: Option<Arc<dyn CatalogClient + Send + Sync>>,
        order_client: Option<Arc<dyn OrderClient + Send + Sync>>,
    ) -> Self {
        AppState {
            create_cart_command_handler: Arc::new(CreateCartCommandHandler::new(uow.clone())),
            add_item_to_cart_command_handler: Arc::new(AddItemToCartCommandHandler::new(uow.clone(), catalog_client)),
            remove_item_from_cart_command_handler: Arc::new(RemoveItemFromCartCommandHandler::new(uow.clone())),
            complete_order_command_handler: Arc::new(CompleteOrderCommandHandler::new(uow.clone(), order_client)),
            get_cart_query_handler: Arc::new(GetCartQueryHandler::new(uow.clone())),
            list_carts_query_handler: Arc::new(ListCartsQueryHandler::new(uow)),
        }
    }
}
