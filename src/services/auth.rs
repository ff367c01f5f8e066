//! Authentication, registration and own-profile service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::{AuthConfig, BootstrapConfig},
    error::{AppError, AppResult},
    models::user::{
        AuthResponse, LoginRequest, Member, RegisterRequest, Role, UpdateProfile, User, UserClaims,
    },
    repository::{users::NewUser, Repository},
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Self-registration: creates an active MEMBER and logs it in
    pub async fn register(&self, data: RegisterRequest) -> AppResult<AuthResponse> {
        if self.repository.users.email_exists(&data.email, None).await? {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&data.password)?;
        let member = self
            .repository
            .users
            .create(&NewUser {
                email: &data.email,
                password_hash: &password_hash,
                name: &data.name,
                phone: data.phone.as_deref(),
                address: data.address.as_deref(),
                role: Role::Member,
                is_active: true,
            })
            .await?;

        tracing::info!("Registered member id={}", member.id);
        self.issue(member)
    }

    /// Check credentials and issue a token
    pub async fn login(&self, data: LoginRequest) -> AppResult<AuthResponse> {
        let user = self
            .repository
            .users
            .get_by_email(&data.email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !verify_password(&user, &data.password)? {
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }
        if !user.is_active {
            return Err(AppError::Authentication("Account is disabled".to_string()));
        }

        let member = self.repository.users.get_member(user.id).await?;
        tracing::debug!("Login ok for user id={}", member.id);
        self.issue(member)
    }

    /// Resolve decoded token claims against the current account state
    pub async fn session(&self, claims: UserClaims) -> AppResult<UserClaims> {
        let user = match self.repository.users.get_by_id(claims.user_id).await {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Authentication(
                    "Account no longer exists".to_string(),
                ))
            }
            Err(e) => return Err(e),
        };
        claims.with_account(&user)
    }

    /// Caller's own profile
    pub async fn me(&self, user_id: i32) -> AppResult<Member> {
        self.repository.users.get_member(user_id).await
    }

    /// Update own name/phone/address, and the password when the current one matches
    pub async fn update_profile(&self, user_id: i32, data: UpdateProfile) -> AppResult<Member> {
        let password_hash = match data.new_password.as_deref() {
            Some(new_password) => {
                let current = data.current_password.as_deref().ok_or_else(|| {
                    AppError::Validation(
                        "current_password is required to change the password".to_string(),
                    )
                })?;
                let user = self.repository.users.get_by_id(user_id).await?;
                if !verify_password(&user, current)? {
                    return Err(AppError::Authentication(
                        "Current password is incorrect".to_string(),
                    ));
                }
                Some(hash_password(new_password)?)
            }
            None => None,
        };

        let member = self
            .repository
            .users
            .update_profile(user_id, &data, password_hash)
            .await?;
        tracing::info!("Profile updated for user id={}", user_id);
        Ok(member)
    }

    /// Make sure the configured administrator account exists.
    ///
    /// An existing account with that email is promoted and its password reset.
    pub async fn bootstrap_admin(&self, config: &BootstrapConfig) -> AppResult<()> {
        let (Some(email), Some(password)) = (
            config.admin_email.as_deref().filter(|e| !e.trim().is_empty()),
            config.admin_password.as_deref().filter(|p| !p.is_empty()),
        ) else {
            return Ok(());
        };

        let password_hash = hash_password(password)?;
        match self.repository.users.get_by_email(email).await? {
            Some(user) => {
                self.repository.users.promote_admin(user.id, &password_hash).await?;
                tracing::info!("Bootstrap admin {} updated (id={})", email, user.id);
            }
            None => {
                let member = self
                    .repository
                    .users
                    .create(&NewUser {
                        email,
                        password_hash: &password_hash,
                        name: "Administrator",
                        phone: None,
                        address: None,
                        role: Role::Admin,
                        is_active: true,
                    })
                    .await?;
                tracing::info!("Bootstrap admin {} created (id={})", email, member.id);
            }
        }
        Ok(())
    }

    fn issue(&self, member: Member) -> AppResult<AuthResponse> {
        let now = Utc::now().timestamp();
        let expires_in = self.config.jwt_expiration_hours as i64 * 3600;

        let claims = UserClaims {
            sub: member.id.to_string(),
            user_id: member.id,
            email: member.email.clone(),
            role: member.role,
            exp: now + expires_in,
            iat: now,
        };

        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        Ok(AuthResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in,
            user: member,
        })
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against the stored Argon2 hash
pub fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_hash(password_hash: String) -> User {
        User {
            id: 1,
            email: "reader@example.org".to_string(),
            password_hash,
            name: "Reader".to_string(),
            phone: None,
            address: None,
            role: Role::Member,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn password_hash_verifies() {
        let user = user_with_hash(hash_password("hunter22").unwrap());
        assert!(verify_password(&user, "hunter22").unwrap());
        assert!(!verify_password(&user, "hunter23").unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        assert_ne!(hash_password("hunter22").unwrap(), hash_password("hunter22").unwrap());
    }

    #[test]
    fn garbage_hash_is_an_internal_error() {
        let user = user_with_hash("plaintext".to_string());
        assert!(matches!(
            verify_password(&user, "plaintext"),
            Err(AppError::Internal(_))
        ));
    }
}
