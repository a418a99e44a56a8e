#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Cart with id {0} did not exist")]
    NotFound(i64),
    #[error("Failed to persist Cart: {0}")]
    Persistence(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteCallError {
    #[error("service unreachable: {0}")]
    Unreachable(String),
    #[error("service error: {0}")]
    Remote(String),
}

impl From<reqwest::Error> for RemoteCallError {
    fn from(err: reqwest::Error) -> Self {
        // Anything that is not an answer we could read counts as a transport failure.
        if err.is_status() || err.is_decode() || err.is_builder() {
            RemoteCallError::Remote(err.to_string())
        } else {
            RemoteCallError::Unreachable(err.to_string())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("Cart with id {0} did not exist")]
    NotFound(i64),
    #[error("malformed item payload: {0}")]
    MalformedPayload(String),
    #[error("malformed cart state: {0}")]
    MalformedCartState(String),
    #[error("product {product_id} is out of stock")]
    OutOfStock { product_id: i64 },
    #[error("downstream service unreachable")]
    Unreachable,
    #[error("downstream service failed")]
    RemoteError,
    #[error("product {product_id} is not in cart")]
    ItemNotInCart { product_id: i64 },
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl From<RepositoryError> for CartError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => CartError::NotFound(id),
            RepositoryError::Persistence(e) => CartError::Persistence(e),
        }
    }
}

impl From<RemoteCallError> for CartError {
    fn from(err: RemoteCallError) -> Self {
        match err {
            RemoteCallError::Unreachable(_) => CartError::Unreachable,
            RemoteCallError::Remote(_) => CartError::RemoteError,
        }
    }
}
