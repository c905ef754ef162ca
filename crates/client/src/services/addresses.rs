//! Saved delivery address management.

use prepbox_core::AddressId;

use crate::endpoints;
use crate::error::ApiResult;
use crate::http::ApiClient;
use crate::models::{Address, NewAddress};

#[derive(Clone)]
pub struct AddressService {
    api: ApiClient,
}

impl AddressService {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn list(&self) -> ApiResult<Vec<Address>> {
        self.api.get(endpoints::ADDRESSES).await
    }

    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn create(&self, address: &NewAddress) -> ApiResult<Address> {
        self.api.post(endpoints::ADDRESSES, address).await
    }

    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn update(&self, id: &AddressId, address: &NewAddress) -> ApiResult<Address> {
        self.api.patch(&endpoints::address(id), address).await
    }

    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn delete(&self, id: &AddressId) -> ApiResult<()> {
        self.api.delete(&endpoints::address(id)).await
    }

    /// Make this the address new orders default to.
    ///
    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn set_default(&self, id: &AddressId) -> ApiResult<Address> {
        self.api.post_empty(&endpoints::address_default(id)).await
    }
}
