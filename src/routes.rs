use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::auth::AuthService;
use crate::error::AppError;
use crate::lists::ListService;
use crate::middleware::{AccessGuard, RequiredRoles};
use crate::models::{
    AddItemsInput, CategoryQuery, Claims, ForgotPasswordInput, ProfilePatch, RemoveItemsInput,
    ResetPasswordInput, SignInInput, SignUpInput,
};
use crate::token::TokenService;

/// Everything the handlers share. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub lists: Arc<ListService>,
    pub tokens: Arc<TokenService>,
}

async fn register(
    auth: web::Data<AuthService>,
    input: web::Json<SignUpInput>,
) -> Result<HttpResponse, AppError> {
    let account = auth.register(input.into_inner()).await?;
    Ok(HttpResponse::Created().json(account))
}

async fn login(
    auth: web::Data<AuthService>,
    input: web::Json<SignInInput>,
) -> Result<HttpResponse, AppError> {
    let token = auth.login(input.into_inner()).await?;
    Ok(HttpResponse::Ok().json(token))
}

async fn forgot_password(
    auth: web::Data<AuthService>,
    input: web::Json<ForgotPasswordInput>,
) -> Result<HttpResponse, AppError> {
    let ack = auth.request_password_reset(input.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ack))
}

async fn reset_password(
    auth: web::Data<AuthService>,
    input: web::Json<ResetPasswordInput>,
) -> Result<HttpResponse, AppError> {
    let ack = auth.complete_password_reset(input.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ack))
}

async fn user_info(
    auth: web::Data<AuthService>,
    claims: Claims,
) -> Result<HttpResponse, AppError> {
    let profile = auth.get_profile(&claims.id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

async fn update_user_info(
    auth: web::Data<AuthService>,
    claims: Claims,
    patch: web::Json<ProfilePatch>,
) -> Result<HttpResponse, AppError> {
    let ack = auth.update_profile(&claims.id, patch.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ack))
}

async fn categories(
    lists: web::Data<ListService>,
    query: web::Query<CategoryQuery>,
) -> Result<HttpResponse, AppError> {
    let products = lists.browse_products(query.into_inner().category).await?;
    Ok(HttpResponse::Ok().json(products))
}

async fn add_items(
    lists: web::Data<ListService>,
    claims: Claims,
    input: web::Json<AddItemsInput>,
) -> Result<HttpResponse, AppError> {
    let list = lists.add_items(&claims.id, input.into_inner()).await?;
    Ok(HttpResponse::Created().json(list))
}

async fn remove_product(
    lists: web::Data<ListService>,
    claims: Claims,
    input: web::Json<RemoveItemsInput>,
) -> Result<HttpResponse, AppError> {
    let ack = lists.remove_items(&claims.id, input.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ack))
}

async fn my_lists(
    lists: web::Data<ListService>,
    claims: Claims,
) -> Result<HttpResponse, AppError> {
    let lists = lists.list_for_user(&claims.id).await?;
    Ok(HttpResponse::Ok().json(lists))
}

/// Mount every route. Protected resources declare the roles they accept.
pub fn configure(cfg: &mut web::ServiceConfig, state: &AppState) {
    let guard = |roles: RequiredRoles| AccessGuard::new(state.tokens.clone(), roles);

    cfg.app_data(web::Data::from(state.auth.clone()))
        .app_data(web::Data::from(state.lists.clone()))
        .app_data(
            web::JsonConfig::default()
                .error_handler(|err, _| AppError::Validation(err.to_string()).into()),
        )
        .app_data(
            web::QueryConfig::default()
                .error_handler(|err, _| AppError::Validation(err.to_string()).into()),
        )
        .service(
            web::scope("/auth")
                .route("/register", web::post().to(register))
                .route("/login", web::post().to(login))
                .route("/forgot-password", web::post().to(forgot_password))
                .route("/reset-password", web::post().to(reset_password))
                .service(
                    web::resource("/userInfo")
                        .route(web::get().to(user_info))
                        .wrap(guard(RequiredRoles::ANY)),
                )
                .service(
                    web::resource("/updateUserInfo")
                        .route(web::patch().to(update_user_info))
                        .wrap(guard(RequiredRoles::ANY)),
                ),
        )
        .service(
            web::scope("/list")
                .wrap(guard(RequiredRoles::ANY))
                .route("/categories", web::get().to(categories))
                .route("/add", web::post().to(add_items))
                .route("/remove-product", web::post().to(remove_product))
                .route("/my-lists", web::get().to(my_lists)),
        );
}
