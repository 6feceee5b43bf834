//! In-process stores backed by mutex-guarded collections.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{AccountStore, CodeStore, ListStore, ProductStore, StoreError};
use crate::models::{Account, ListEntry, Product, ProductCategory, ShoppingListRecord, StoredItems};

#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<Vec<Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .accounts
            .lock()
            .iter()
            .find(|account| account.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .accounts
            .lock()
            .iter()
            .find(|account| account.id == id)
            .cloned())
    }

    async fn create(&self, account: &Account) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock();
        if accounts
            .iter()
            .any(|existing| existing.email == account.email || existing.id == account.id)
        {
            return Err(StoreError::Duplicate);
        }
        accounts.push(account.clone());
        Ok(())
    }

    async fn update_profile(
        &self,
        id: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.lock();
        if let Some(email) = email {
            if accounts.iter().any(|a| a.email == email && a.id != id) {
                return Err(StoreError::Duplicate);
            }
        }
        match accounts.iter_mut().find(|account| account.id == id) {
            Some(account) => {
                if let Some(name) = name {
                    account.name = name.to_string();
                }
                if let Some(email) = email {
                    account.email = email.to_string();
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.lock();
        match accounts.iter_mut().find(|account| account.id == id) {
            Some(account) => {
                account.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MemoryProductStore {
    products: Mutex<Vec<Product>>,
}

impl MemoryProductStore {
    pub fn new(products: Vec<Product>) -> Self {
        MemoryProductStore {
            products: Mutex::new(products),
        }
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn find_many(
        &self,
        category: Option<ProductCategory>,
    ) -> Result<Vec<Product>, StoreError> {
        Ok(self
            .products
            .lock()
            .iter()
            .filter(|product| category.map_or(true, |c| product.category == c))
            .cloned()
            .collect())
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Product>, StoreError> {
        Ok(self
            .products
            .lock()
            .iter()
            .filter(|product| ids.contains(&product.id))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryListStore {
    lists: Mutex<Vec<ShoppingListRecord>>,
}

impl MemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record exactly as given, whatever shape its items have.
    pub fn insert_raw(&self, record: ShoppingListRecord) {
        self.lists.lock().push(record);
    }
}

#[async_trait]
impl ListStore for MemoryListStore {
    async fn find_owned(
        &self,
        list_id: &str,
        user_id: &str,
    ) -> Result<Option<ShoppingListRecord>, StoreError> {
        Ok(self
            .lists
            .lock()
            .iter()
            .find(|list| list.id == list_id && list.user_id == user_id)
            .cloned())
    }

    async fn find_all_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<ShoppingListRecord>, StoreError> {
        Ok(self
            .lists
            .lock()
            .iter()
            .filter(|list| list.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create(&self, list: &ShoppingListRecord) -> Result<(), StoreError> {
        let mut lists = self.lists.lock();
        if lists.iter().any(|existing| existing.id == list.id) {
            return Err(StoreError::Duplicate);
        }
        lists.push(list.clone());
        Ok(())
    }

    async fn replace_items(
        &self,
        list_id: &str,
        user_id: &str,
        items: &[ListEntry],
    ) -> Result<bool, StoreError> {
        let mut lists = self.lists.lock();
        match lists
            .iter_mut()
            .find(|list| list.id == list_id && list.user_id == user_id)
        {
            Some(list) => {
                list.items = StoredItems::Sequence(items.to_vec());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MemoryCodeStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCodeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CodeStore for MemoryCodeStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
