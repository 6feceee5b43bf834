use actix_web::dev::{Payload, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::AUTHORIZATION;
use actix_web::HttpMessage; // brings `extensions_mut` into scope
use actix_web::{Error, FromRequest, HttpRequest};
use actix_service::{forward_ready, Service};
use futures::future::{ok, ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::sync::Arc;

use crate::error::{AppError, ForbiddenReason};
use crate::models::{Claims, Role};
use crate::token::TokenService;

/// Roles an operation accepts. An empty set admits any authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredRoles(&'static [Role]);

impl RequiredRoles {
    pub const ANY: RequiredRoles = RequiredRoles(&[]);
    pub const ADMIN: RequiredRoles = RequiredRoles(&[Role::Admin]);

    pub const fn of(roles: &'static [Role]) -> Self {
        RequiredRoles(roles)
    }

    pub fn admits(&self, role: Option<Role>) -> Result<(), AppError> {
        if self.0.is_empty() {
            return Ok(());
        }
        match role {
            Some(role) if self.0.contains(&role) => Ok(()),
            _ => Err(AppError::Forbidden(ForbiddenReason::LacksPermission)),
        }
    }
}

/// Run the header, token and role checks for one request.
pub fn authorize(
    header: Option<&str>,
    tokens: &TokenService,
    roles: RequiredRoles,
) -> Result<Claims, AppError> {
    let token = header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AppError::Forbidden(ForbiddenReason::MissingAuthorization))?;

    let claims = tokens.verify(token)?;

    if let Err(err) = roles.admits(claims.role) {
        log::warn!(
            "user {} with role {:?} denied, requires {:?}",
            claims.id,
            claims.role,
            roles
        );
        return Err(err);
    }
    Ok(claims)
}

// Middleware factory
pub struct AccessGuard {
    tokens: Arc<TokenService>,
    roles: RequiredRoles,
}

impl AccessGuard {
    pub fn new(tokens: Arc<TokenService>, roles: RequiredRoles) -> Self {
        AccessGuard { tokens, roles }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AccessGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AccessGuardMiddleware<S>;
    type InitError = ();

    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AccessGuardMiddleware {
            service: Rc::new(service),
            tokens: self.tokens.clone(),
            roles: self.roles,
        })
    }
}

pub struct AccessGuardMiddleware<S> {
    service: Rc<S>,
    tokens: Arc<TokenService>,
    roles: RequiredRoles,
}

impl<S, B> Service<ServiceRequest> for AccessGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let outcome = authorize(header, &self.tokens, self.roles);
        let service = self.service.clone();

        Box::pin(async move {
            let claims = outcome?;
            req.extensions_mut().insert(claims);
            service.call(req).await
        })
    }
}

/// Handlers behind the guard take `Claims` as an argument.
impl FromRequest for Claims {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Claims>()
                .cloned()
                .ok_or(AppError::Forbidden(ForbiddenReason::MissingAuthorization)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Identity;
    use actix_web::http::StatusCode;
    use actix_web::test as atest;
    use actix_web::{web, App, HttpResponse};
    use std::time::Duration;

    fn tokens() -> Arc<TokenService> {
        Arc::new(TokenService::from_secret(
            b"guard-secret",
            Duration::from_secs(600),
        ))
    }

    fn bearer(tokens: &TokenService, role: Role) -> String {
        let token = tokens
            .issue_access(&Identity {
                id: "u1".into(),
                email: "u1@example.com".into(),
                role,
            })
            .unwrap();
        format!("Bearer {}", token)
    }

    fn forbidden_code(result: Result<Claims, AppError>) -> &'static str {
        match result {
            Err(err @ AppError::Forbidden(_)) => err.code(),
            other => panic!("expected forbidden, got {:?}", other.map(|c| c.id)),
        }
    }

    #[test]
    fn empty_role_set_admits_everyone() {
        assert!(RequiredRoles::ANY.admits(None).is_ok());
        assert!(RequiredRoles::ANY.admits(Some(Role::User)).is_ok());
    }

    #[test]
    fn role_set_requires_a_matching_role() {
        assert!(RequiredRoles::ADMIN.admits(Some(Role::Admin)).is_ok());
        assert!(RequiredRoles::ADMIN.admits(Some(Role::User)).is_err());
        assert!(RequiredRoles::ADMIN.admits(None).is_err());

        let both = RequiredRoles::of(&[Role::User, Role::Admin]);
        assert!(both.admits(Some(Role::User)).is_ok());
    }

    #[test]
    fn missing_or_foreign_scheme_is_reported_as_missing_header() {
        let tokens = tokens();
        assert_eq!(
            forbidden_code(authorize(None, &tokens, RequiredRoles::ANY)),
            "AUTHORIZATION_HEADER_NOT_FOUND"
        );
        assert_eq!(
            forbidden_code(authorize(Some("Basic abc"), &tokens, RequiredRoles::ANY)),
            "AUTHORIZATION_HEADER_NOT_FOUND"
        );
        assert_eq!(
            forbidden_code(authorize(Some("Bearer "), &tokens, RequiredRoles::ANY)),
            "AUTHORIZATION_HEADER_NOT_FOUND"
        );
    }

    #[test]
    fn bad_token_is_reported_as_invalid() {
        let tokens = tokens();
        assert_eq!(
            forbidden_code(authorize(Some("Bearer garbage"), &tokens, RequiredRoles::ANY)),
            "INVALID_TOKEN"
        );
    }

    #[test]
    fn user_role_lacks_permission_for_admin_operation() {
        let tokens = tokens();
        let header = bearer(&tokens, Role::User);
        assert_eq!(
            forbidden_code(authorize(Some(header.as_str()), &tokens, RequiredRoles::ADMIN)),
            "LACKS_PERMISSION"
        );

        let header = bearer(&tokens, Role::Admin);
        let claims = authorize(Some(header.as_str()), &tokens, RequiredRoles::ADMIN).unwrap();
        assert_eq!(claims.role, Some(Role::Admin));
    }

    async fn whoami(claims: Claims) -> HttpResponse {
        HttpResponse::Ok().body(claims.id)
    }

    #[actix_web::test]
    async fn guard_attaches_claims_and_enforces_roles() {
        let tokens = tokens();
        let app = atest::init_service(
            App::new().service(
                web::resource("/admin")
                    .route(web::get().to(whoami))
                    .wrap(AccessGuard::new(tokens.clone(), RequiredRoles::ADMIN)),
            ),
        )
        .await;

        let req = atest::TestRequest::get()
            .uri("/admin")
            .insert_header((AUTHORIZATION, bearer(&tokens, Role::Admin)))
            .to_request();
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(atest::read_body(resp).await, "u1");

        let req = atest::TestRequest::get()
            .uri("/admin")
            .insert_header((AUTHORIZATION, bearer(&tokens, Role::User)))
            .to_request();
        let err = atest::try_call_service(&app, req).await.err().unwrap();
        assert_eq!(err.as_response_error().status_code(), StatusCode::FORBIDDEN);

        let req = atest::TestRequest::get().uri("/admin").to_request();
        let err = atest::try_call_service(&app, req).await.err().unwrap();
        assert_eq!(err.as_response_error().status_code(), StatusCode::FORBIDDEN);
    }
}
