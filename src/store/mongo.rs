//! MongoDB-backed stores.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::ReplaceOptions;
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};

use super::{AccountStore, CodeStore, ListStore, ProductStore, StoreError};
use crate::db;
use crate::models::{Account, ListEntry, Product, ProductCategory, ShoppingListRecord, StoredItems};

const DUPLICATE_KEY: i32 = 11000;

fn map_write_error(err: mongodb::error::Error) -> StoreError {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref write)) if write.code == DUPLICATE_KEY => {
            StoreError::Duplicate
        }
        _ => StoreError::Database(err),
    }
}

#[derive(Clone)]
pub struct MongoAccountStore {
    users: Collection<Account>,
}

impl MongoAccountStore {
    pub fn new(db: &Database) -> Self {
        MongoAccountStore {
            users: db.collection(db::USERS),
        }
    }
}

#[async_trait]
impl AccountStore for MongoAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.users.find_one(doc! { "email": email }, None).await?)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.users.find_one(doc! { "id": id }, None).await?)
    }

    async fn create(&self, account: &Account) -> Result<(), StoreError> {
        self.users
            .insert_one(account, None)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn update_profile(
        &self,
        id: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<bool, StoreError> {
        let mut set = Document::new();
        if let Some(name) = name {
            set.insert("name", name);
        }
        if let Some(email) = email {
            set.insert("email", email);
        }
        if set.is_empty() {
            return Ok(self.find_by_id(id).await?.is_some());
        }

        let result = self
            .users
            .update_one(doc! { "id": id }, doc! { "$set": set }, None)
            .await
            .map_err(map_write_error)?;
        Ok(result.matched_count == 1)
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<bool, StoreError> {
        let result = self
            .users
            .update_one(
                doc! { "id": id },
                doc! { "$set": { "passwordHash": password_hash } },
                None,
            )
            .await?;
        Ok(result.matched_count == 1)
    }
}

#[derive(Clone)]
pub struct MongoProductStore {
    products: Collection<Product>,
}

impl MongoProductStore {
    pub fn new(db: &Database) -> Self {
        MongoProductStore {
            products: db.collection(db::PRODUCTS),
        }
    }
}

#[async_trait]
impl ProductStore for MongoProductStore {
    async fn find_many(
        &self,
        category: Option<ProductCategory>,
    ) -> Result<Vec<Product>, StoreError> {
        let filter = match category {
            Some(category) => doc! { "category": category.as_str() },
            None => doc! {},
        };
        let cursor = self.products.find(filter, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Product>, StoreError> {
        let cursor = self
            .products
            .find(doc! { "id": { "$in": ids.to_vec() } }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

#[derive(Clone)]
pub struct MongoListStore {
    lists: Collection<ShoppingListRecord>,
}

impl MongoListStore {
    pub fn new(db: &Database) -> Self {
        MongoListStore {
            lists: db.collection(db::SHOPPING_LISTS),
        }
    }
}

#[async_trait]
impl ListStore for MongoListStore {
    async fn find_owned(
        &self,
        list_id: &str,
        user_id: &str,
    ) -> Result<Option<ShoppingListRecord>, StoreError> {
        Ok(self
            .lists
            .find_one(doc! { "id": list_id, "userId": user_id }, None)
            .await?)
    }

    async fn find_all_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<ShoppingListRecord>, StoreError> {
        let cursor = self.lists.find(doc! { "userId": user_id }, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn create(&self, list: &ShoppingListRecord) -> Result<(), StoreError> {
        self.lists
            .insert_one(list, None)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn replace_items(
        &self,
        list_id: &str,
        user_id: &str,
        items: &[ListEntry],
    ) -> Result<bool, StoreError> {
        let items = mongodb::bson::to_bson(&StoredItems::Sequence(items.to_vec()))?;
        let result = self
            .lists
            .update_one(
                doc! { "id": list_id, "userId": user_id },
                doc! { "$set": { "items": items } },
                None,
            )
            .await?;
        Ok(result.matched_count == 1)
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CodeDocument {
    #[serde(rename = "_id")]
    key: String,
    value: String,
    expires_at: mongodb::bson::DateTime,
}

/// Reset codes live in their own collection with a TTL index on `expiresAt`.
#[derive(Clone)]
pub struct MongoCodeStore {
    codes: Collection<CodeDocument>,
}

impl MongoCodeStore {
    pub fn new(db: &Database) -> Self {
        MongoCodeStore {
            codes: db.collection(db::RESET_CODES),
        }
    }
}

#[async_trait]
impl CodeStore for MongoCodeStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let document = CodeDocument {
            key: key.to_string(),
            value: value.to_string(),
            expires_at: mongodb::bson::DateTime::from_system_time(SystemTime::now() + ttl),
        };
        let options = ReplaceOptions::builder().upsert(true).build();
        self.codes
            .replace_one(doc! { "_id": key }, &document, options)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        // The TTL monitor only sweeps periodically, so expiry is checked here too
        let filter = doc! {
            "_id": key,
            "expiresAt": { "$gt": mongodb::bson::DateTime::now() },
        };
        Ok(self
            .codes
            .find_one(filter, None)
            .await?
            .map(|document| document.value))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.codes.delete_one(doc! { "_id": key }, None).await?;
        Ok(())
    }
}
