//! Registration, login, password reset and profile management.

use std::sync::Arc;
use std::time::Duration;

use argon2::{self, Config as ArgonConfig};
use chrono::Utc;
use rand::rngs::OsRng;
use rand::Rng;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{
    Account, AccountView, AuthResponse, ForgotPasswordInput, MessageResponse, ProfilePatch,
    ProfileView, ResetPasswordInput, Role, SignInInput, SignUpInput,
};
use crate::notifier::{reset_code_notification, Notifier};
use crate::store::{AccountStore, CodeStore, StoreError};
use crate::token::{Identity, TokenService};

const RESET_CODE_PREFIX: &str = "reset-password-code";

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt: [u8; 16] = rand::thread_rng().gen();
    let config = ArgonConfig::default();
    Ok(argon2::hash_encoded(password.as_bytes(), &salt, &config)?)
}

/// Constant-time check of `password` against a stored digest. A digest that
/// cannot be parsed never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    argon2::verify_encoded(hash, password.as_bytes()).unwrap_or(false)
}

/// Six decimal digits from the OS random source.
pub fn generate_reset_code() -> String {
    OsRng.gen_range(100_000..=999_999u32).to_string()
}

fn reset_code_key(code: &str) -> String {
    format!("{}:{}", RESET_CODE_PREFIX, code)
}

pub struct AuthService {
    accounts: Arc<dyn AccountStore>,
    codes: Arc<dyn CodeStore>,
    notifier: Arc<dyn Notifier>,
    tokens: Arc<TokenService>,
    reset_code_ttl: Duration,
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        codes: Arc<dyn CodeStore>,
        notifier: Arc<dyn Notifier>,
        tokens: Arc<TokenService>,
        config: &Config,
    ) -> Self {
        AuthService {
            accounts,
            codes,
            notifier,
            tokens,
            reset_code_ttl: config.reset_code_ttl,
        }
    }

    pub async fn register(&self, input: SignUpInput) -> Result<AccountView, AppError> {
        input.validate()?;

        if self.accounts.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict);
        }

        let account = Account {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            email: input.email,
            password_hash: hash_password(&input.password)?,
            role: Role::User,
            created_at: Utc::now(),
        };

        match self.accounts.create(&account).await {
            Ok(()) => {}
            // Lost a race with a concurrent registration of the same email
            Err(StoreError::Duplicate) => return Err(AppError::Conflict),
            Err(e) => return Err(e.into()),
        }

        log::info!("registered account {}", account.id);
        Ok(AccountView::from(&account))
    }

    pub async fn login(&self, input: SignInInput) -> Result<AuthResponse, AppError> {
        input.validate()?;

        let account = match self.accounts.find_by_email(&input.email).await? {
            Some(account) if verify_password(&input.password, &account.password_hash) => account,
            _ => {
                log::warn!("failed login attempt");
                return Err(AppError::Unauthorized);
            }
        };

        let access_token = self.tokens.issue_access(&Identity {
            id: account.id.clone(),
            email: account.email.clone(),
            role: account.role,
        })?;

        Ok(AuthResponse { access_token })
    }

    /// Mail a reset code to the account owner. The code is never returned.
    pub async fn request_password_reset(
        &self,
        input: ForgotPasswordInput,
    ) -> Result<MessageResponse, AppError> {
        input.validate()?;

        let account = self
            .accounts
            .find_by_email(&input.email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let code = generate_reset_code();
        self.codes
            .set(&reset_code_key(&code), &code, self.reset_code_ttl)
            .await?;

        let notification = reset_code_notification(
            &account.email,
            &account.name,
            &code,
            self.reset_code_ttl.as_secs() / 60,
        )?;
        self.notifier.send(&notification).await?;

        log::info!("password reset requested for account {}", account.id);
        Ok(MessageResponse::new("Reset password email sent"))
    }

    pub async fn complete_password_reset(
        &self,
        input: ResetPasswordInput,
    ) -> Result<MessageResponse, AppError> {
        input.validate()?;

        let key = reset_code_key(&input.token);
        match self.codes.get(&key).await? {
            Some(stored) if stored == input.token => {}
            _ => return Err(AppError::InvalidResetCode),
        }

        // Single use: the code is gone even if the rest of the reset fails
        self.codes.delete(&key).await?;

        let account = self
            .accounts
            .find_by_email(&input.email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let password_hash = hash_password(&input.new_password)?;
        if !self
            .accounts
            .update_password(&account.id, &password_hash)
            .await?
        {
            return Err(AppError::UserNotFound);
        }

        log::info!("password reset completed for account {}", account.id);
        Ok(MessageResponse::new("Password reset successfully"))
    }

    pub async fn get_profile(&self, id: &str) -> Result<ProfileView, AppError> {
        let account = self
            .accounts
            .find_by_id(id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        Ok(ProfileView::from(&account))
    }

    pub async fn update_profile(
        &self,
        id: &str,
        patch: ProfilePatch,
    ) -> Result<MessageResponse, AppError> {
        patch.validate()?;

        if self.accounts.find_by_id(id).await?.is_none() {
            return Err(AppError::UserNotFound);
        }

        if let Some(email) = &patch.email {
            if let Some(owner) = self.accounts.find_by_email(email).await? {
                if owner.id != id {
                    return Err(AppError::Conflict);
                }
            }
        }

        if !patch.is_empty() {
            let updated = self
                .accounts
                .update_profile(id, patch.name.as_deref(), patch.email.as_deref())
                .await
                .map_err(|e| match e {
                    StoreError::Duplicate => AppError::Conflict,
                    other => AppError::Store(other),
                })?;
            if !updated {
                return Err(AppError::UserNotFound);
            }
        }

        Ok(MessageResponse::new("User info updated successfully"))
    }
}
