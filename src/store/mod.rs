//! Storage contracts consumed by the auth and list services.
//!
//! Every operation is a single-document read or write; nothing here spans a
//! transaction, so concurrent read-modify-write sequences are last-write-wins.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Account, ListEntry, Product, ProductCategory, ShoppingListRecord};

pub mod memory;
pub mod mongo;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("encoding error: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),

    /// A unique index rejected the write.
    #[error("duplicate key")]
    Duplicate,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError>;

    async fn create(&self, account: &Account) -> Result<(), StoreError>;

    /// Returns `false` when no account has this id.
    async fn update_profile(
        &self,
        id: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<bool, StoreError>;

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn find_many(
        &self,
        category: Option<ProductCategory>,
    ) -> Result<Vec<Product>, StoreError>;

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Product>, StoreError>;
}

#[async_trait]
pub trait ListStore: Send + Sync {
    /// Lookup is scoped to the owner: another user's list is never returned.
    async fn find_owned(
        &self,
        list_id: &str,
        user_id: &str,
    ) -> Result<Option<ShoppingListRecord>, StoreError>;

    async fn find_all_for_user(&self, user_id: &str)
        -> Result<Vec<ShoppingListRecord>, StoreError>;

    async fn create(&self, list: &ShoppingListRecord) -> Result<(), StoreError>;

    /// Overwrite the items of an owned list as a structured sequence.
    async fn replace_items(
        &self,
        list_id: &str,
        user_id: &str,
        items: &[ListEntry],
    ) -> Result<bool, StoreError>;
}

/// Short-lived key/value entries with per-key expiry.
#[async_trait]
pub trait CodeStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
