use std::time::Duration;

use mongodb::bson::doc;
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Database, IndexModel};
use secrecy::ExposeSecret;

use crate::config::Config;

pub const USERS: &str = "users";
pub const PRODUCTS: &str = "products";
pub const SHOPPING_LISTS: &str = "shopping_lists";
pub const RESET_CODES: &str = "reset_codes";

pub async fn connect(config: &Config) -> Result<Database, mongodb::error::Error> {
    let mut client_options = ClientOptions::parse(config.database_url.expose_secret()).await?;
    client_options.app_name = Some("smart-list".to_string());

    let client = Client::with_options(client_options)?;
    Ok(client.database(&config.database_name))
}

/// Create the indexes the stores rely on. Safe to run on every start.
pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let users = db.collection::<mongodb::bson::Document>(USERS);
    users.create_index(unique_on("email"), None).await?;
    users.create_index(unique_on("id"), None).await?;

    let lists = db.collection::<mongodb::bson::Document>(SHOPPING_LISTS);
    lists.create_index(unique_on("id"), None).await?;
    lists
        .create_index(IndexModel::builder().keys(doc! { "userId": 1 }).build(), None)
        .await?;

    let products = db.collection::<mongodb::bson::Document>(PRODUCTS);
    products.create_index(unique_on("id"), None).await?;
    products
        .create_index(IndexModel::builder().keys(doc! { "category": 1 }).build(), None)
        .await?;

    // Documents are removed once `expiresAt` has passed
    let codes = db.collection::<mongodb::bson::Document>(RESET_CODES);
    codes
        .create_index(
            IndexModel::builder()
                .keys(doc! { "expiresAt": 1 })
                .options(
                    IndexOptions::builder()
                        .expire_after(Duration::from_secs(0))
                        .build(),
                )
                .build(),
            None,
        )
        .await?;

    log::info!("database indexes ensured on {}", db.name());
    Ok(())
}

fn unique_on(field: &str) -> IndexModel {
    IndexModel::builder()
        .keys(doc! { field: 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build()
}
