/*!
 * # Authentication and Authorization
 *
 * Bearer JWTs (HS256) issued to the three account kinds of the storefront:
 * customers, staff and admins. Passwords are stored as argon2 PHC strings.
 *
 * Handlers take an [`AuthUser`] argument to require a valid token and then
 * call one of its role guards (`require_customer`, `require_staff`,
 * `require_admin`) where the route is restricted.
 */

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Response},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::entities::{admin, customer, staff};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

mod password;

pub use password::{hash_password, verify_password};

/// Account kind carried in the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Staff,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated caller extracted from the `Authorization: Bearer` header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub role: Role,
    pub name: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
            name: claims.name,
        }
    }
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Staff members and admins both manage orders.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Staff | Role::Admin)
    }

    pub fn is_customer(&self) -> bool {
        self.role == Role::Customer
    }

    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AuthError::InsufficientPermissions.into())
        }
    }

    pub fn require_staff(&self) -> Result<(), ServiceError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AuthError::InsufficientPermissions.into())
        }
    }

    /// Returns the customer id, refusing staff and admin tokens.
    pub fn require_customer(&self) -> Result<&str, ServiceError> {
        if self.is_customer() {
            Ok(&self.user_id)
        } else {
            Err(ServiceError::Forbidden(
                "This action is only available to customers".to_string(),
            ))
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, token_expiration: Duration) -> Self {
        Self {
            jwt_secret,
            token_expiration,
        }
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid authentication token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InsufficientPermissions | AuthError::AccountDisabled => {
                ServiceError::Forbidden(err.to_string())
            }
            AuthError::TokenCreation(msg) => ServiceError::JwtError(msg),
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

/// Which table a login is checked against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Customer,
    Staff,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[serde(default)]
    pub account_type: AccountType,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 8, max = 20))]
    pub phone: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateStaffRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub phone: Option<String>,
    pub store_id: Option<String>,
}

/// Token issued by register and login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user_id: String,
    pub role: Role,
    pub name: String,
}

/// Authentication service that handles accounts, token issuance and validation
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self {
            config,
            db,
            event_sender,
        }
    }

    /// Signs a token for the given account.
    pub fn issue_token(
        &self,
        user_id: &str,
        role: Role,
        name: &str,
    ) -> Result<TokenResponse, AuthError> {
        let now = Utc::now();
        let expires_in = ChronoDuration::from_std(self.config.token_expiration)
            .map_err(|_| AuthError::TokenCreation("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user_id.to_string(),
            role,
            name: name.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: expires_in.num_seconds(),
            user_id: user_id.to_string(),
            role,
            name: name.to_string(),
        })
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    /// Creates a customer account and signs them in.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register_customer(
        &self,
        request: RegisterRequest,
    ) -> Result<TokenResponse, ServiceError> {
        request.validate()?;
        let email = request.email.trim().to_lowercase();

        let existing = customer::Entity::find()
            .filter(customer::Column::Email.eq(email.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "An account with email {} already exists",
                email
            )));
        }

        let created = customer::ActiveModel {
            name: Set(request.name.trim().to_string()),
            email: Set(email),
            phone: Set(request.phone),
            address: Set(request.address),
            password_hash: Set(hash_password(&request.password)?),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(customer_id = %created.id, "Customer registered");
        self.event_sender
            .send_or_log(Event::CustomerRegistered(created.id.clone()))
            .await;

        Ok(self.issue_token(&created.id, Role::Customer, &created.name)?)
    }

    /// Checks credentials against the table selected by `account_type`.
    #[instrument(skip(self, request), fields(email = %request.email, account_type = ?request.account_type))]
    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse, ServiceError> {
        request.validate()?;
        let email = request.email.trim().to_lowercase();

        let (user_id, name, role, hash) = match request.account_type {
            AccountType::Customer => {
                let found = customer::Entity::find()
                    .filter(customer::Column::Email.eq(email))
                    .one(&*self.db)
                    .await?
                    .ok_or(AuthError::InvalidCredentials)?;
                (found.id, found.name, Role::Customer, found.password_hash)
            }
            AccountType::Staff => {
                let found = staff::Entity::find()
                    .filter(staff::Column::Email.eq(email))
                    .one(&*self.db)
                    .await?
                    .ok_or(AuthError::InvalidCredentials)?;
                if !found.is_active {
                    return Err(AuthError::AccountDisabled.into());
                }
                (found.id, found.name, Role::Staff, found.password_hash)
            }
            AccountType::Admin => {
                let found = admin::Entity::find()
                    .filter(admin::Column::Email.eq(email))
                    .one(&*self.db)
                    .await?
                    .ok_or(AuthError::InvalidCredentials)?;
                (found.id, found.name, Role::Admin, found.password_hash)
            }
        };

        if !verify_password(&request.password, &hash) {
            warn!("Rejected login with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        Ok(self.issue_token(&user_id, role, &name)?)
    }

    /// Creates a staff account (admin only at the HTTP layer).
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create_staff(
        &self,
        request: CreateStaffRequest,
    ) -> Result<staff::Model, ServiceError> {
        request.validate()?;
        let email = request.email.trim().to_lowercase();

        let existing = staff::Entity::find()
            .filter(staff::Column::Email.eq(email.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A staff account with email {} already exists",
                email
            )));
        }

        let created = staff::ActiveModel {
            store_id: Set(request.store_id),
            name: Set(request.name.trim().to_string()),
            email: Set(email),
            phone: Set(request.phone),
            password_hash: Set(hash_password(&request.password)?),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(staff_id = %created.id, "Staff account created");
        Ok(created)
    }

    /// Makes sure an admin account with this email exists.
    #[instrument(skip(self, password))]
    pub async fn ensure_admin(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<admin::Model, ServiceError> {
        let email = email.trim().to_lowercase();
        if let Some(existing) = admin::Entity::find()
            .filter(admin::Column::Email.eq(email.clone()))
            .one(&*self.db)
            .await?
        {
            return Ok(existing);
        }

        let created = admin::ActiveModel {
            name: Set(name.to_string()),
            email: Set(email),
            password_hash: Set(hash_password(password)?),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(admin_id = %created.id, "Admin account created");
        Ok(created)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_service = Arc::<AuthService>::from_ref(state);
        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingAuth)?;
        let claims = auth_service.validate_token(token)?;
        let user = AuthUser::from(claims);
        crate::tracing::record_actor(&user.user_id, user.role.as_str());
        Ok(user)
    }
}
