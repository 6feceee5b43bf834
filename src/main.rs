use std::io;
use std::sync::Arc;

use actix_web::middleware::Logger;
use actix_web::{App, HttpServer};

use smart_list::auth::AuthService;
use smart_list::config::Config;
use smart_list::db;
use smart_list::lists::ListService;
use smart_list::notifier::{Notifier, OutboxNotifier, SmtpNotifier};
use smart_list::routes::{self, AppState};
use smart_list::store::mongo::{MongoAccountStore, MongoCodeStore, MongoListStore, MongoProductStore};
use smart_list::token::TokenService;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok(); // Load environment variables from .env file
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| {
        log::error!("invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    let db = db::connect(&config).await.map_err(io::Error::other)?;
    db::ensure_indexes(&db).await.map_err(io::Error::other)?;

    let notifier: Arc<dyn Notifier> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpNotifier::new(smtp).map_err(io::Error::other)?),
        None => {
            log::warn!("SMTP_HOST not set, outgoing mail is only logged");
            Arc::new(OutboxNotifier::new())
        }
    };

    let tokens = Arc::new(TokenService::new(&config));
    let state = AppState {
        auth: Arc::new(AuthService::new(
            Arc::new(MongoAccountStore::new(&db)),
            Arc::new(MongoCodeStore::new(&db)),
            notifier,
            tokens.clone(),
            &config,
        )),
        lists: Arc::new(ListService::new(
            Arc::new(MongoListStore::new(&db)),
            Arc::new(MongoProductStore::new(&db)),
        )),
        tokens,
    };

    log::info!("listening on {}", config.bind_addr);
    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(Logger::default())
            .configure(move |cfg| routes::configure(cfg, &state))
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
