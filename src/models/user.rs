//! User (member) model, roles and JWT claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::pagination::{SortKey, SortOrder};
use crate::error::AppError;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Member => "MEMBER",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "MEMBER" => Ok(Role::Member),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

super::pg_text_enum!(Role);

/// Full user row, including the password hash. Never serialized to clients.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public member profile
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub is_active: bool,
    /// Borrow requests currently approved (books in hand)
    pub active_borrows: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Self-registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Issued bearer token with the account it belongs to
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
    pub user: Member,
}

/// Admin-side member creation
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMember {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Defaults to MEMBER
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Admin-side member update
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMember {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Own profile update
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfile {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Required when `new_password` is set
    pub current_password: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: Option<String>,
}

/// Member list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct MemberQuery {
    /// Case-insensitive match on name or email
    pub search: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// name, email, created_at
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberSort {
    Name,
    Email,
    CreatedAt,
}

impl SortKey for MemberSort {
    const DEFAULT: Self = MemberSort::Name;
    const DEFAULT_ORDER: SortOrder = SortOrder::Asc;

    fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(MemberSort::Name),
            "email" => Some(MemberSort::Email),
            "created_at" => Some(MemberSort::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            MemberSort::Name => "LOWER(u.name)",
            MemberSort::Email => "LOWER(u.email)",
            MemberSort::CreatedAt => "u.created_at",
        }
    }

    fn accepted() -> &'static [&'static str] {
        &["name", "email", "created_at"]
    }
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Check the token against the stored account. Disabled accounts are
    /// refused and the role is taken from the row, not the token.
    pub fn with_account(mut self, user: &User) -> Result<Self, AppError> {
        if user.id != self.user_id {
            return Err(AppError::Authentication(
                "Token does not match the account".to_string(),
            ));
        }
        if !user.is_active {
            return Err(AppError::Authentication("Account is disabled".to_string()));
        }
        self.role = user.role;
        Ok(self)
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Administrator privileges required".to_string(),
            ))
        }
    }

    /// Allow the owner of a record or any administrator
    pub fn require_self_or_admin(&self, owner_id: i32) -> Result<(), AppError> {
        if self.user_id == owner_id || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Not allowed to access another member's records".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Role) -> UserClaims {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: "7".to_string(),
            user_id: 7,
            email: "reader@example.org".to_string(),
            role,
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn token_round_trip() {
        let token = claims(Role::Member).create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, 7);
        assert_eq!(parsed.role, Role::Member);
    }

    #[test]
    fn token_with_wrong_secret_is_rejected() {
        let token = claims(Role::Admin).create_token("secret").unwrap();
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut expired = claims(Role::Member);
        expired.exp = Utc::now().timestamp() - 3600;
        let token = expired.create_token("secret").unwrap();
        assert!(UserClaims::from_token(&token, "secret").is_err());
    }

    #[test]
    fn ownership_checks() {
        let member = claims(Role::Member);
        assert!(member.require_self_or_admin(7).is_ok());
        assert!(member.require_self_or_admin(8).is_err());
        assert!(member.require_admin().is_err());
        assert!(claims(Role::Admin).require_self_or_admin(8).is_ok());
    }

    fn account(id: i32, role: Role, is_active: bool) -> User {
        let now = Utc::now();
        User {
            id,
            email: "reader@example.org".to_string(),
            password_hash: String::new(),
            name: "Reader".to_string(),
            phone: None,
            address: None,
            role,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn disabled_account_loses_access() {
        let err = claims(Role::Member)
            .with_account(&account(7, Role::Member, false))
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[test]
    fn demoted_admin_keeps_only_member_rights() {
        let refreshed = claims(Role::Admin)
            .with_account(&account(7, Role::Member, true))
            .unwrap();
        assert_eq!(refreshed.role, Role::Member);
        assert!(refreshed.require_admin().is_err());
    }

    #[test]
    fn token_for_another_account_is_refused() {
        assert!(claims(Role::Member)
            .with_account(&account(8, Role::Member, true))
            .is_err());
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("librarian".parse::<Role>().is_err());
    }
}
