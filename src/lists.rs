//! Shopping list reconciliation.
//!
//! Items are keyed by product id. Adding overlays the submitted items onto the
//! stored ones (quantities are replaced, never summed) and removing filters by
//! product id. Entries that carry no product id are kept where they are.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    AddItemsInput, ListEntry, ListItem, MessageResponse, Product, ProductCategory,
    RemoveItemsInput, ShoppingList, ShoppingListDetail, ShoppingListRecord, StoredItems,
};
use crate::store::{ListStore, ProductStore};

const DEFAULT_LIST_NAME: &str = "Shopping list";

/// Overlay `incoming` onto `current`.
///
/// Each product keeps the position of its first appearance and the value of
/// its last; products seen for the first time in `incoming` are appended in
/// submission order.
pub fn merge_items(current: Vec<ListEntry>, incoming: &[ListItem]) -> Vec<ListEntry> {
    let mut merged: Vec<ListEntry> = Vec::with_capacity(current.len() + incoming.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    let entries = current
        .into_iter()
        .chain(incoming.iter().cloned().map(ListEntry::Item));

    for entry in entries {
        let Some(id) = entry.product_id().map(str::to_string) else {
            merged.push(entry);
            continue;
        };
        match positions.get(&id) {
            Some(&idx) => merged[idx] = entry,
            None => {
                positions.insert(id, merged.len());
                merged.push(entry);
            }
        }
    }
    merged
}

/// Drop every entry whose product id is listed. Entries without one stay.
pub fn remove_items(current: Vec<ListEntry>, product_ids: &[String]) -> Vec<ListEntry> {
    let doomed: HashSet<&str> = product_ids.iter().map(String::as_str).collect();
    current
        .into_iter()
        .filter(|entry| match entry.product_id() {
            Some(id) => !doomed.contains(id),
            None => true,
        })
        .collect()
}

fn distinct_product_ids(items: &[ListEntry]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(ListEntry::product_id)
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

pub struct ListService {
    lists: Arc<dyn ListStore>,
    products: Arc<dyn ProductStore>,
}

impl ListService {
    pub fn new(lists: Arc<dyn ListStore>, products: Arc<dyn ProductStore>) -> Self {
        ListService { lists, products }
    }

    pub async fn add_items(
        &self,
        user_id: &str,
        input: AddItemsInput,
    ) -> Result<ShoppingList, AppError> {
        input.validate()?;

        let existing = match &input.list_id {
            Some(list_id) => Some(
                self.lists
                    .find_owned(list_id, user_id)
                    .await?
                    .ok_or_else(|| AppError::ListNotFound(list_id.clone()))?,
            ),
            None => None,
        };

        match existing {
            Some(record) => {
                let current = record.items.normalize()?;
                let items = merge_items(current, &input.items);

                if !self
                    .lists
                    .replace_items(&record.id, user_id, &items)
                    .await?
                {
                    return Err(AppError::ListNotFound(record.id));
                }

                Ok(ShoppingList {
                    id: record.id,
                    user_id: record.user_id,
                    name: record.name,
                    items,
                    created_at: record.created_at,
                })
            }
            None => {
                let items = merge_items(Vec::new(), &input.items);
                let name = input
                    .name
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_LIST_NAME.to_string());

                let record = ShoppingListRecord {
                    id: Uuid::new_v4().to_string(),
                    user_id: user_id.to_string(),
                    name,
                    items: StoredItems::Sequence(items.clone()),
                    created_at: Utc::now(),
                };
                self.lists.create(&record).await?;
                log::info!("created shopping list {} for user {}", record.id, user_id);

                Ok(ShoppingList {
                    id: record.id,
                    user_id: record.user_id,
                    name: record.name,
                    items,
                    created_at: record.created_at,
                })
            }
        }
    }

    pub async fn remove_items(
        &self,
        user_id: &str,
        input: RemoveItemsInput,
    ) -> Result<MessageResponse, AppError> {
        if input.products_ids.is_empty() {
            return Err(AppError::Validation(
                "At least one product ID must be provided for removal.".into(),
            ));
        }

        let record = self
            .lists
            .find_owned(&input.list_id, user_id)
            .await?
            .ok_or_else(|| AppError::ListNotFound(input.list_id.clone()))?;

        let items = remove_items(record.items.normalize()?, &input.products_ids);
        if !self
            .lists
            .replace_items(&record.id, user_id, &items)
            .await?
        {
            return Err(AppError::ListNotFound(record.id));
        }

        Ok(MessageResponse::new(
            "Products removed from the shopping list successfully",
        ))
    }

    /// All lists of a user with their products resolved. Lists whose stored
    /// items cannot be read are returned empty.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<ShoppingListDetail>, AppError> {
        let records = self.lists.find_all_for_user(user_id).await?;
        let mut details = Vec::with_capacity(records.len());

        for record in records {
            let items = match record.items.normalize() {
                Ok(items) => items,
                Err(_) => {
                    log::warn!("shopping list {} has unreadable items", record.id);
                    Vec::new()
                }
            };

            let ids = distinct_product_ids(&items);
            let products = if ids.is_empty() {
                Vec::new()
            } else {
                self.products.find_by_ids(&ids).await?
            };

            details.push(ShoppingListDetail {
                id: record.id,
                user_id: record.user_id,
                name: record.name,
                created_at: record.created_at,
                items,
                products,
            });
        }
        Ok(details)
    }

    pub async fn browse_products(
        &self,
        category: Option<ProductCategory>,
    ) -> Result<Vec<Product>, AppError> {
        Ok(self.products.find_many(category).await?)
    }
}
