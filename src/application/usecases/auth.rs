use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    entities::users::{InsertUserEntity, UpdateUserEntity, UserEntity},
    repositories::users::UserRepository,
    value_objects::users::{
        AuthTokenDto, LoginModel, MIN_PASSWORD_LENGTH, RegisterUserModel, UpdateProfileModel,
        UserModel, is_valid_email, normalize_email,
    },
};

/// Session lifetime when the user asked to be remembered.
pub const REMEMBER_ME_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
    pub iat: usize,
}

/// Signs and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct SessionKeys {
    secret: String,
    ttl_seconds: i64,
}

impl SessionKeys {
    pub fn new(secret: String, ttl_seconds: i64) -> Self {
        Self {
            secret,
            ttl_seconds,
        }
    }

    pub fn issue(&self, user: &UserModel, remember_me: bool) -> Result<(String, DateTime<Utc>)> {
        let ttl = if remember_me {
            REMEMBER_ME_TTL_SECONDS.max(self.ttl_seconds)
        } else {
            self.ttl_seconds
        };

        let now = Utc::now();
        let exp = now
            .checked_add_signed(Duration::seconds(ttl))
            .ok_or_else(|| anyhow!("failed to compute token expiration"))?;

        let claims = SessionClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("failed to sign session token")?;

        Ok((token, exp))
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| anyhow!("JWT validation failed: {}", e))?;

        Ok(data.claims)
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|err| anyhow!("stored password hash is malformed: {err}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("your account has been deactivated")]
    AccountDeactivated,
    #[error("current password is incorrect")]
    WrongCurrentPassword,
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            AuthError::Validation(_) | AuthError::WrongCurrentPassword => StatusCode::BAD_REQUEST,
            AuthError::EmailTaken => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthError::AccountDeactivated => StatusCode::FORBIDDEN,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, AuthError>;

fn required(value: &str, field: &str) -> UseCaseResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Like [`required`] but keeps surrounding whitespace, which is part of a password.
fn required_secret(value: &str, field: &str) -> UseCaseResult<String> {
    if value.trim().is_empty() {
        return Err(AuthError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn check_password_strength(password: &str) -> UseCaseResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn optional_secret(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub struct AuthUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    session_keys: Arc<SessionKeys>,
}

impl<U> AuthUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>, session_keys: Arc<SessionKeys>) -> Self {
        Self {
            user_repo,
            session_keys,
        }
    }

    pub async fn register(&self, model: RegisterUserModel) -> UseCaseResult<AuthTokenDto> {
        let first_name = required(&model.first_name, "first_name")?;
        let last_name = required(&model.last_name, "last_name")?;
        let email = normalize_email(&required(&model.email, "email")?);
        let password = required_secret(&model.password, "password")?;

        if !is_valid_email(&email) {
            return Err(AuthError::Validation(
                "please enter a valid email address".to_string(),
            ));
        }
        check_password_strength(&password)?;

        info!(%email, "auth: registering user");

        let existing = self
            .user_repo
            .find_by_email(email.clone())
            .await
            .map_err(|err| {
                error!(db_error = ?err, "auth: failed to look up email");
                AuthError::Internal(err)
            })?;
        if existing.is_some() {
            warn!(%email, "auth: email already registered");
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password(&password)?;
        let user = self
            .user_repo
            .create(InsertUserEntity {
                email,
                password_hash,
                first_name,
                last_name,
                phone: optional_text(model.phone),
            })
            .await
            .map_err(|err| {
                error!(db_error = ?err, "auth: failed to create user");
                AuthError::Internal(err)
            })?;

        info!(user_id = %user.id, "auth: user registered");
        self.session_for(user, false)
    }

    pub async fn login(&self, model: LoginModel) -> UseCaseResult<AuthTokenDto> {
        let email = normalize_email(&required(&model.email, "email")?);
        let password = required_secret(&model.password, "password")?;

        let user = self
            .user_repo
            .find_by_email(email.clone())
            .await
            .map_err(|err| {
                error!(db_error = ?err, "auth: failed to look up user");
                AuthError::Internal(err)
            })?
            .ok_or_else(|| {
                info!(%email, "auth: login for unknown email");
                AuthError::InvalidCredentials
            })?;

        if !verify_password(&password, &user.password_hash)? {
            info!(user_id = %user.id, "auth: wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active {
            warn!(user_id = %user.id, "auth: login to deactivated account");
            return Err(AuthError::AccountDeactivated);
        }

        info!(user_id = %user.id, remember_me = model.remember_me, "auth: user logged in");
        self.session_for(user, model.remember_me)
    }

    pub async fn profile(&self, user_id: Uuid) -> UseCaseResult<UserModel> {
        let user = self.load_user(user_id).await?;
        Ok(UserModel::from(user))
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        model: UpdateProfileModel,
    ) -> UseCaseResult<UserModel> {
        let user = self.load_user(user_id).await?;

        let mut changes = UpdateUserEntity {
            first_name: optional_text(model.first_name),
            last_name: optional_text(model.last_name),
            phone: optional_text(model.phone),
            password_hash: None,
        };

        if let Some(new_password) = optional_secret(model.new_password) {
            let current = optional_secret(model.current_password).ok_or_else(|| {
                AuthError::Validation("current_password is required to change password".to_string())
            })?;
            if !verify_password(&current, &user.password_hash)? {
                warn!(%user_id, "auth: wrong current password on profile update");
                return Err(AuthError::WrongCurrentPassword);
            }
            check_password_strength(&new_password)?;
            changes.password_hash = Some(hash_password(&new_password)?);
        }

        if changes.is_empty() {
            return Ok(UserModel::from(user));
        }

        let updated = self
            .user_repo
            .update(user_id, changes)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "auth: failed to update profile");
                AuthError::Internal(err)
            })?;

        info!(%user_id, "auth: profile updated");
        Ok(UserModel::from(updated))
    }

    async fn load_user(&self, user_id: Uuid) -> UseCaseResult<UserEntity> {
        self.user_repo
            .find_by_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "auth: failed to load user");
                AuthError::Internal(err)
            })?
            .ok_or(AuthError::UserNotFound)
    }

    fn session_for(&self, user: UserEntity, remember_me: bool) -> UseCaseResult<AuthTokenDto> {
        let user = UserModel::from(user);
        let (access_token, expires_at) = self.session_keys.issue(&user, remember_me)?;

        Ok(AuthTokenDto {
            access_token,
            token_type: "Bearer",
            expires_at,
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::users::MockUserRepository;
    use mockall::predicate::eq;

    const SECRET: &str = "supersecretjwtsecretforunittesting123";

    fn keys() -> Arc<SessionKeys> {
        Arc::new(SessionKeys::new(SECRET.to_string(), 3_600))
    }

    fn user(email: &str, password: &str, is_active: bool) -> UserEntity {
        UserEntity {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: hash_password(password).unwrap(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone: None,
            is_active,
            is_admin: false,
            created_at: Utc::now(),
        }
    }

    fn register_model() -> RegisterUserModel {
        RegisterUserModel {
            first_name: " Ada ".to_string(),
            last_name: "Lovelace".to_string(),
            email: "Ada@Example.com".to_string(),
            password: "correct horse".to_string(),
            phone: Some("  ".to_string()),
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret-pass", &hash).unwrap());
        assert!(!verify_password("other-pass", &hash).unwrap());
    }

    #[test]
    fn issued_token_verifies_and_carries_subject() {
        let keys = keys();
        let model = UserModel::from(user("ada@example.com", "password1", true));

        let (token, expires_at) = keys.issue(&model, false).unwrap();
        let claims = keys.verify(&token).unwrap();

        assert_eq!(claims.sub, model.id.to_string());
        assert_eq!(claims.email, "ada@example.com");
        assert!(expires_at > Utc::now());
    }

    #[test]
    fn remember_me_extends_session() {
        let keys = keys();
        let model = UserModel::from(user("ada@example.com", "password1", true));

        let (_, short) = keys.issue(&model, false).unwrap();
        let (_, long) = keys.issue(&model, true).unwrap();

        assert!(long - short > Duration::days(29));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = SessionKeys::new("wrongsecret".to_string(), 3_600);
        let model = UserModel::from(user("ada@example.com", "password1", true));
        let (token, _) = other.issue(&model, false).unwrap();

        assert!(keys().verify(&token).is_err());
    }

    #[tokio::test]
    async fn register_normalizes_and_issues_token() {
        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_email()
            .with(eq("ada@example.com".to_string()))
            .returning(|_| Box::pin(async { Ok(None) }));
        user_repo
            .expect_create()
            .withf(|insert| {
                insert.email == "ada@example.com"
                    && insert.first_name == "Ada"
                    && insert.phone.is_none()
                    && insert.password_hash.starts_with("$argon2")
            })
            .times(1)
            .returning(|insert| {
                let row = UserEntity {
                    id: Uuid::new_v4(),
                    email: insert.email,
                    password_hash: insert.password_hash,
                    first_name: insert.first_name,
                    last_name: insert.last_name,
                    phone: insert.phone,
                    is_active: true,
                    is_admin: false,
                    created_at: Utc::now(),
                };
                Box::pin(async move { Ok(row) })
            });

        let usecase = AuthUseCase::new(Arc::new(user_repo), keys());
        let session = usecase.register(register_model()).await.unwrap();

        assert_eq!(session.token_type, "Bearer");
        assert_eq!(session.user.full_name, "Ada Lovelace");
        assert!(keys().verify(&session.access_token).is_ok());
    }

    #[tokio::test]
    async fn register_rejects_bad_input_before_store_access() {
        let mut user_repo = MockUserRepository::new();
        user_repo.expect_find_by_email().never();
        user_repo.expect_create().never();
        let usecase = AuthUseCase::new(Arc::new(user_repo), keys());

        let mut missing = register_model();
        missing.last_name = "   ".to_string();
        assert!(matches!(
            usecase.register(missing).await,
            Err(AuthError::Validation(_))
        ));

        let mut bad_email = register_model();
        bad_email.email = "ada@example".to_string();
        assert!(matches!(
            usecase.register(bad_email).await,
            Err(AuthError::Validation(_))
        ));

        let mut short = register_model();
        short.password = "short".to_string();
        assert!(matches!(
            usecase.register(short).await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let existing = user("ada@example.com", "password1", true);
        let mut user_repo = MockUserRepository::new();
        user_repo.expect_find_by_email().returning(move |_| {
            let existing = existing.clone();
            Box::pin(async move { Ok(Some(existing)) })
        });
        user_repo.expect_create().never();

        let usecase = AuthUseCase::new(Arc::new(user_repo), keys());
        let err = usecase.register(register_model()).await.unwrap_err();

        assert!(matches!(err, AuthError::EmailTaken));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn login_hides_which_credential_was_wrong() {
        let existing = user("ada@example.com", "password1", true);
        let mut user_repo = MockUserRepository::new();
        user_repo.expect_find_by_email().returning(move |email| {
            let found = (email == "ada@example.com").then(|| existing.clone());
            Box::pin(async move { Ok(found) })
        });
        let usecase = AuthUseCase::new(Arc::new(user_repo), keys());

        let wrong_password = usecase
            .login(LoginModel {
                email: "ada@example.com".to_string(),
                password: "password2".to_string(),
                remember_me: false,
            })
            .await
            .unwrap_err();
        let unknown = usecase
            .login(LoginModel {
                email: "bob@example.com".to_string(),
                password: "password1".to_string(),
                remember_me: false,
            })
            .await
            .unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown.to_string());
        assert_eq!(
            wrong_password.status_code(),
            axum::http::StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn deactivated_account_cannot_log_in() {
        let existing = user("ada@example.com", "password1", false);
        let mut user_repo = MockUserRepository::new();
        user_repo.expect_find_by_email().returning(move |_| {
            let existing = existing.clone();
            Box::pin(async move { Ok(Some(existing)) })
        });

        let usecase = AuthUseCase::new(Arc::new(user_repo), keys());
        let err = usecase
            .login(LoginModel {
                email: "ada@example.com".to_string(),
                password: "password1".to_string(),
                remember_me: true,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::AccountDeactivated));
    }

    #[tokio::test]
    async fn login_keeps_password_whitespace() {
        let existing = user("ada@example.com", "  padded pass  ", true);
        let mut user_repo = MockUserRepository::new();
        user_repo.expect_find_by_email().returning(move |_| {
            let existing = existing.clone();
            Box::pin(async move { Ok(Some(existing)) })
        });
        let usecase = AuthUseCase::new(Arc::new(user_repo), keys());
        let login = |password: &str| LoginModel {
            email: "ada@example.com".to_string(),
            password: password.to_string(),
            remember_me: false,
        };

        assert!(usecase.login(login("  padded pass  ")).await.is_ok());
        assert!(matches!(
            usecase.login(login("padded pass")).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            usecase.login(login("   ")).await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn password_change_requires_current_password() {
        let existing = user("ada@example.com", "password1", true);
        let user_id = existing.id;
        let mut user_repo = MockUserRepository::new();
        user_repo.expect_find_by_id().with(eq(user_id)).returning(move |_| {
            let existing = existing.clone();
            Box::pin(async move { Ok(Some(existing)) })
        });
        user_repo.expect_update().never();

        let usecase = AuthUseCase::new(Arc::new(user_repo), keys());
        let err = usecase
            .update_profile(
                user_id,
                UpdateProfileModel {
                    current_password: Some("not-it-at-all".to_string()),
                    new_password: Some("brand-new-pass".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::WrongCurrentPassword));
    }

    #[tokio::test]
    async fn profile_update_only_touches_given_fields() {
        let existing = user("ada@example.com", "password1", true);
        let user_id = existing.id;
        let updated = UserEntity {
            phone: Some("+44 20 7946 0000".to_string()),
            ..existing.clone()
        };

        let mut user_repo = MockUserRepository::new();
        user_repo.expect_find_by_id().returning(move |_| {
            let existing = existing.clone();
            Box::pin(async move { Ok(Some(existing)) })
        });
        user_repo
            .expect_update()
            .with(
                eq(user_id),
                eq(UpdateUserEntity {
                    phone: Some("+44 20 7946 0000".to_string()),
                    ..Default::default()
                }),
            )
            .times(1)
            .returning(move |_, _| {
                let updated = updated.clone();
                Box::pin(async move { Ok(updated) })
            });

        let usecase = AuthUseCase::new(Arc::new(user_repo), keys());
        let profile = usecase
            .update_profile(
                user_id,
                UpdateProfileModel {
                    phone: Some("+44 20 7946 0000".to_string()),
                    first_name: Some("  ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(profile.phone.as_deref(), Some("+44 20 7946 0000"));
    }
}
