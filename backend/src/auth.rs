use anyhow::anyhow;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::{AdminView, LoginResponse};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::rest::AppState;
use crate::storage::{AdminRecord, AdminRepository};

/// Bearer tokens expire after 24 hours.
const TOKEN_TTL_HOURS: i64 = 24;

/// Claims carried by the bearer token: admin id and email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Hash a password into a PHC string.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("Failed to hash password: {e}"))
}

/// Verify a password against a stored PHC string.
///
/// Ok(false) is a wrong password; Err means the stored hash itself is
/// unusable.
pub fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| anyhow!("Malformed password hash: {e}"))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("Password verification failed: {e}")),
    }
}

/// Service for admin login and token handling.
#[derive(Clone)]
pub struct AuthService {
    admins: AdminRepository,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(admins: AdminRepository, jwt_secret: impl Into<String>) -> Self {
        Self {
            admins,
            jwt_secret: jwt_secret.into(),
        }
    }

    /// Verify credentials and issue a signed token.
    ///
    /// Unknown email and wrong password both answer 401 with the same
    /// message, so the response does not reveal which accounts exist.
    pub async fn login(
        &self,
        email: Option<String>,
        password: Option<String>,
    ) -> Result<LoginResponse, ApiError> {
        let email = email
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ApiError::invalid("Email and password are required"))?;
        let password = password
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::invalid("Email and password are required"))?;

        info!("Login attempt: {}", email);

        let admin = self
            .admins
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

        if !verify_password(&password, &admin.password_hash)? {
            warn!("Failed login for {}", email);
            return Err(ApiError::unauthorized("Invalid credentials"));
        }

        let token = self.issue_token(&admin)?;

        Ok(LoginResponse {
            token,
            admin: AdminView {
                id: admin.id,
                email: admin.email,
                name: admin.name,
            },
        })
    }

    /// Resolve token claims back to the stored admin, for GET /auth/me.
    pub async fn current_admin(&self, admin_id: &str) -> Result<AdminView, ApiError> {
        let admin = self
            .admins
            .find_by_id(admin_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Admin not found"))?;

        Ok(AdminView {
            id: admin.id,
            email: admin.email,
            name: admin.name,
        })
    }

    pub fn issue_token(&self, admin: &AdminRecord) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: admin.id.clone(),
            email: admin.email.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(anyhow!("Failed to sign token: {e}")))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ApiError::unauthorized("Invalid or expired token"))
    }
}

/// The authenticated admin, extracted from the Authorization header.
///
/// Verification is purely cryptographic (no store read per request); the
/// admin row is only re-fetched where the handler needs fresh identity.
#[derive(Debug, Clone)]
pub struct AuthAdmin {
    pub id: String,
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        let claims = state.auth_service.verify_token(token)?;

        Ok(AuthAdmin {
            id: claims.sub,
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;

    async fn setup_test() -> AuthService {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        let admins = AdminRepository::new(db);
        let service = AuthService::new(admins.clone(), "test-secret");

        admins
            .insert(&AdminRecord {
                id: "admin-1".to_string(),
                email: "admin@school.com".to_string(),
                password_hash: hash_password("admin123").unwrap(),
                name: "School Admin".to_string(),
            })
            .await
            .expect("Failed to seed admin");

        service
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("admin123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("admin123", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(verify_password("admin123", "not-a-phc-string").is_err());
    }

    #[tokio::test]
    async fn test_login_issues_verifiable_token() {
        let service = setup_test().await;

        let response = service
            .login(Some("admin@school.com".to_string()), Some("admin123".to_string()))
            .await
            .expect("Login failed");

        assert_eq!(response.admin.email, "admin@school.com");
        assert_eq!(response.admin.name, "School Admin");

        let claims = service.verify_token(&response.token).expect("Token should verify");
        assert_eq!(claims.sub, "admin-1");
        assert_eq!(claims.email, "admin@school.com");
        // 24h expiry window
        assert!(claims.exp - claims.iat == 24 * 3600);
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let service = setup_test().await;

        let wrong_password = service
            .login(Some("admin@school.com".to_string()), Some("nope".to_string()))
            .await;
        assert!(matches!(wrong_password, Err(ApiError::Unauthorized(_))));

        let unknown_email = service
            .login(Some("ghost@school.com".to_string()), Some("admin123".to_string()))
            .await;
        assert!(matches!(unknown_email, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_login_requires_both_fields() {
        let service = setup_test().await;

        let missing_password = service.login(Some("admin@school.com".to_string()), None).await;
        assert!(matches!(missing_password, Err(ApiError::InvalidRequest(_))));

        let missing_email = service.login(None, Some("admin123".to_string())).await;
        assert!(matches!(missing_email, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_verify_rejects_garbage_and_foreign_tokens() {
        let service = setup_test().await;
        assert!(service.verify_token("not.a.token").is_err());

        // Token signed with a different secret
        let other = AuthService::new(
            AdminRepository::new(DbConnection::init_test().await.unwrap()),
            "other-secret",
        );
        let token = other
            .issue_token(&AdminRecord {
                id: "admin-1".to_string(),
                email: "admin@school.com".to_string(),
                password_hash: String::new(),
                name: "School Admin".to_string(),
            })
            .unwrap();
        assert!(service.verify_token(&token).is_err());
    }

    #[tokio::test]
    async fn test_verify_rejects_expired_token() {
        let service = setup_test().await;

        let stale = Claims {
            sub: "admin-1".to_string(),
            email: "admin@school.com".to_string(),
            iat: (Utc::now() - Duration::hours(48)).timestamp(),
            exp: (Utc::now() - Duration::hours(24)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &stale,
            &EncodingKey::from_secret("test-secret".as_bytes()),
        )
        .unwrap();

        assert!(service.verify_token(&token).is_err());
    }

    #[tokio::test]
    async fn test_current_admin_after_deletion() {
        let service = setup_test().await;

        let found = service.current_admin("admin-1").await.unwrap();
        assert_eq!(found.name, "School Admin");

        let missing = service.current_admin("deleted-admin").await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }
}
