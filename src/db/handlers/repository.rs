//! The common repository trait.

use crate::db::errors::Result;

/// CRUD surface every entity repository implements.
///
/// Associated types keep the trait generic over the entity while the
/// implementations stay strongly typed. `update` takes a partial request;
/// `None` fields are left untouched.
#[async_trait::async_trait]
pub trait Repository {
    type CreateRequest;
    type UpdateRequest;
    type Response;
    type Id;
    type Filter;

    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>>;

    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest)
        -> Result<Self::Response>;

    /// Returns `true` when a row was deleted.
    async fn delete(&mut self, id: Self::Id) -> Result<bool>;
}
