use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

/// Stored account record. The password digest never leaves the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// What registration hands back: no digest, role or timestamp.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountView {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        AccountView {
            id: account.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for ProfileView {
    fn from(account: &Account) -> Self {
        ProfileView {
            id: account.id.clone(),
            email: account.email.clone(),
            name: account.name.clone(),
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignUpInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ForgotPasswordInput {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordInput {
    /// The six-digit code that was mailed out.
    pub token: String,
    pub new_password: String,
    pub email: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

impl SignUpInput {
    pub fn validate(&self) -> Result<(), AppError> {
        require_name(&self.name)?;
        require_email(&self.email)?;
        require_present("password", &self.password)
    }
}

impl SignInInput {
    pub fn validate(&self) -> Result<(), AppError> {
        require_email(&self.email)?;
        require_present("password", &self.password)
    }
}

impl ForgotPasswordInput {
    pub fn validate(&self) -> Result<(), AppError> {
        require_email(&self.email)
    }
}

impl ResetPasswordInput {
    pub fn validate(&self) -> Result<(), AppError> {
        require_present("token", &self.token)?;
        require_present("newPassword", &self.new_password)?;
        require_email(&self.email)
    }
}

impl ProfilePatch {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            require_name(name)?;
        }
        if let Some(email) = &self.email {
            require_email(email)?;
        }
        Ok(())
    }
}

fn require_present(field: &str, value: &str) -> Result<(), AppError> {
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn require_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }
    Ok(())
}

fn require_email(email: &str) -> Result<(), AppError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AppError::Validation("email must be a valid email address".into()));
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<Role>,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        MessageResponse {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Fruits,
    Vegetables,
    Meat,
    Dairy,
    Bakery,
    Grains,
    Beverages,
    Frozen,
    Snacks,
    Cleaning,
    Hygiene,
    Other,
}

impl ProductCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductCategory::Fruits => "fruits",
            ProductCategory::Vegetables => "vegetables",
            ProductCategory::Meat => "meat",
            ProductCategory::Dairy => "dairy",
            ProductCategory::Bakery => "bakery",
            ProductCategory::Grains => "grains",
            ProductCategory::Beverages => "beverages",
            ProductCategory::Frozen => "frozen",
            ProductCategory::Snacks => "snacks",
            ProductCategory::Cleaning => "cleaning",
            ProductCategory::Hygiene => "hygiene",
            ProductCategory::Other => "other",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: ProductCategory,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct CategoryQuery {
    pub category: Option<ProductCategory>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub id_product: String,
    pub quantity: f64,
}

/// A stored entry with a usable product id but an unreadable quantity.
/// The remaining fields are written back as they were read.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyedEntry {
    pub id_product: String,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

/// One stored entry of a list. Only a string `idProduct` decides whether an
/// entry takes part in keying; anything else is carried along untouched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ListEntry {
    Item(ListItem),
    Keyed(KeyedEntry),
    Malformed(serde_json::Value),
}

impl ListEntry {
    pub fn product_id(&self) -> Option<&str> {
        match self {
            ListEntry::Item(item) => Some(&item.id_product),
            ListEntry::Keyed(entry) => Some(&entry.id_product),
            ListEntry::Malformed(_) => None,
        }
    }
}

/// The `items` field as it comes back from storage: either a real sequence
/// or a JSON text blob written by older clients.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum StoredItems {
    Sequence(Vec<ListEntry>),
    Blob(String),
    Unknown(serde_json::Value),
}

impl Default for StoredItems {
    fn default() -> Self {
        StoredItems::Sequence(Vec::new())
    }
}

impl StoredItems {
    pub fn normalize(self) -> Result<Vec<ListEntry>, AppError> {
        match self {
            StoredItems::Sequence(entries) => Ok(entries),
            StoredItems::Blob(text) => {
                serde_json::from_str::<Vec<ListEntry>>(&text).map_err(|_| AppError::MalformedItems)
            }
            StoredItems::Unknown(_) => Err(AppError::MalformedItems),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub items: StoredItems,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub items: Vec<ListEntry>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListDetail {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<ListEntry>,
    pub products: Vec<Product>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddItemsInput {
    #[serde(default)]
    pub list_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub items: Vec<ListItem>,
}

impl AddItemsInput {
    pub fn validate(&self) -> Result<(), AppError> {
        for item in &self.items {
            if item.id_product.trim().is_empty() {
                return Err(AppError::Validation("idProduct must not be empty".into()));
            }
            if !item.quantity.is_finite() || item.quantity <= 0.0 {
                return Err(AppError::Validation(format!(
                    "quantity for product {} must be a positive number",
                    item.id_product
                )));
            }
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemsInput {
    pub list_id: String,
    #[serde(default)]
    pub products_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_serializes_uppercase() {
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), json!("ADMIN"));
        let role: Role = serde_json::from_value(json!("USER")).unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn account_view_omits_digest_role_and_timestamp() {
        let account = Account {
            id: "u1".into(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            password_hash: "$argon2id$...".into(),
            role: Role::User,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(AccountView::from(&account)).unwrap();
        assert_eq!(json, json!({"id": "u1", "name": "Ana", "email": "ana@example.com"}));
    }

    #[test]
    fn email_shape_is_checked() {
        let mut input = SignUpInput {
            name: "Ana".into(),
            email: "ana@example.com".into(),
            password: "pw".into(),
        };
        assert!(input.validate().is_ok());

        for bad in ["", "ana", "@example.com", "ana@", "a b@example.com", "a@b@c"] {
            input.email = bad.into();
            assert!(
                matches!(input.validate(), Err(AppError::Validation(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn stored_items_accept_sequence_and_blob() {
        let seq: StoredItems =
            serde_json::from_value(json!([{"idProduct": "A", "quantity": 1}])).unwrap();
        let blob: StoredItems =
            serde_json::from_value(json!("[{\"idProduct\":\"A\",\"quantity\":1}]")).unwrap();

        let expected = vec![ListEntry::Item(ListItem {
            id_product: "A".into(),
            quantity: 1.0,
        })];
        assert_eq!(seq.normalize().unwrap(), expected);
        assert_eq!(blob.normalize().unwrap(), expected);
    }

    #[test]
    fn unparsable_blob_is_malformed() {
        let blob = StoredItems::Blob("{not json".into());
        assert!(matches!(blob.normalize(), Err(AppError::MalformedItems)));

        let object = StoredItems::Blob("{\"idProduct\":\"A\"}".into());
        assert!(matches!(object.normalize(), Err(AppError::MalformedItems)));

        let number: StoredItems = serde_json::from_value(json!(42)).unwrap();
        assert!(matches!(number.normalize(), Err(AppError::MalformedItems)));
    }

    #[test]
    fn entries_without_product_id_are_kept_as_malformed() {
        let items: Vec<ListEntry> =
            serde_json::from_value(json!([{"quantity": 3}, {"idProduct": 7, "quantity": 1}]))
                .unwrap();
        assert!(items.iter().all(|entry| entry.product_id().is_none()));
    }

    #[test]
    fn entries_with_product_id_but_bad_quantity_stay_keyed() {
        let raw = json!([{"idProduct": "A", "quantity": "2"}, {"idProduct": "B"}]);
        let items: Vec<ListEntry> = serde_json::from_value(raw.clone()).unwrap();

        assert!(matches!(items[0], ListEntry::Keyed(_)));
        assert_eq!(items[0].product_id(), Some("A"));
        assert_eq!(items[1].product_id(), Some("B"));
        assert_eq!(serde_json::to_value(&items).unwrap(), raw);
    }

    #[test]
    fn record_without_items_reads_as_empty_list() {
        let record: ShoppingListRecord = serde_json::from_value(json!({
            "id": "l1",
            "userId": "u1",
            "name": "Weekly",
            "createdAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(record.items.normalize().unwrap(), vec![]);
    }

    #[test]
    fn add_items_rejects_non_positive_quantity() {
        let input = AddItemsInput {
            list_id: None,
            name: None,
            items: vec![ListItem {
                id_product: "A".into(),
                quantity: 0.0,
            }],
        };
        assert!(matches!(input.validate(), Err(AppError::Validation(_))));
    }
}
