// src/services/auth.rs

use std::sync::LazyLock;

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{user_repo::NewUser, UserRepository},
    models::auth::{Claims, Role, TokenKind, TokenResponse, User, UserProfile},
};

/// HS256 signing material plus token lifetimes.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn issue(&self, user_id: Uuid, kind: TokenKind) -> Result<String, AppError> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };

        let claims = Claims {
            sub: user_id,
            typ: kind,
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Verifies signature and expiry, and that the token is of the expected kind.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| AppError::InvalidToken)?;

        if data.claims.typ != expected {
            return Err(AppError::InvalidToken);
        }
        Ok(data.claims)
    }
}

pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("password hashing task failed: {}", e))??;
    Ok(hashed)
}

async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|e| anyhow::anyhow!("password verification task failed: {}", e))??;
    Ok(valid)
}

// Verified against when the email is unknown, so a miss costs as much as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash("unknown-account-placeholder", bcrypt::DEFAULT_COST).ok());

async fn reject_unknown_account(password: &str) -> AppError {
    if let Some(dummy) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, dummy).await;
    }
    AppError::InvalidCredentials
}

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    users: UserRepository,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(pool: PgPool, users: UserRepository, keys: JwtKeys) -> Self {
        Self { pool, users, keys }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, AppError> {
        let Some(user) = self.users.find_by_email(&self.pool, email).await? else {
            tracing::info!(email, "Login rejected: unknown account");
            return Err(reject_unknown_account(password).await);
        };

        if !verify_password(password, &user.password_hash).await? {
            tracing::info!(email, "Login rejected: wrong password");
            return Err(AppError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AppError::InactiveAccount);
        }

        self.users.touch_last_login(&self.pool, user.id).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        self.token_response(user).await
    }

    /// Exchanges a refresh token for a new token pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AppError> {
        let claims = self.keys.verify(refresh_token, TokenKind::Refresh)?;
        let user = self.active_user(claims.sub).await?;
        self.token_response(user).await
    }

    /// Resolves an access token to the user and their assigned units.
    pub async fn authenticate(&self, access_token: &str) -> Result<(User, Vec<Uuid>), AppError> {
        let claims = self.keys.verify(access_token, TokenKind::Access)?;
        let user = self.active_user(claims.sub).await?;
        let unit_ids = self.users.unit_ids(&self.pool, user.id).await?;
        Ok((user, unit_ids))
    }

    pub async fn profile(&self, user: User) -> Result<UserProfile, AppError> {
        let units = self.users.memberships(&self.pool, user.id).await?;
        Ok(UserProfile { user, units })
    }

    /// Creates the first superuser when the users table is empty.
    pub async fn bootstrap_superuser(&self, email: &str, password: &str) -> Result<(), AppError> {
        if self.users.count(&self.pool).await? > 0 {
            return Ok(());
        }

        let password_hash = hash_password(password).await?;
        let user = self
            .users
            .create(
                &self.pool,
                NewUser {
                    email,
                    password_hash: &password_hash,
                    first_name: "System",
                    last_name: "Administrator",
                    phone: None,
                    role: Role::Superuser,
                },
            )
            .await?;

        tracing::info!(user_id = %user.id, email, "Bootstrap superuser created");
        Ok(())
    }

    async fn active_user(&self, id: Uuid) -> Result<User, AppError> {
        let user = self
            .users
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::InvalidToken)?;
        if !user.is_active {
            return Err(AppError::InactiveAccount);
        }
        Ok(user)
    }

    async fn token_response(&self, user: User) -> Result<TokenResponse, AppError> {
        let units = self.users.memberships(&self.pool, user.id).await?;
        Ok(TokenResponse {
            access_token: self.keys.issue(user.id, TokenKind::Access)?,
            refresh_token: self.keys.issue(user.id, TokenKind::Refresh)?,
            token_type: "bearer",
            expires_in: self.keys.access_ttl().num_seconds(),
            user,
            units,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::new("test-secret", Duration::minutes(30), Duration::days(7))
    }

    #[test]
    fn access_token_round_trip() {
        let keys = keys();
        let user_id = Uuid::new_v4();

        let token = keys.issue(user_id, TokenKind::Access).unwrap();
        let claims = keys.verify(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.typ, TokenKind::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let keys = keys();
        let refresh = keys.issue(Uuid::new_v4(), TokenKind::Refresh).unwrap();

        assert!(matches!(keys.verify(&refresh, TokenKind::Access), Err(AppError::InvalidToken)));
        assert!(keys.verify(&refresh, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn tampered_or_foreign_tokens_are_rejected() {
        let token = keys().issue(Uuid::new_v4(), TokenKind::Access).unwrap();
        let other = JwtKeys::new("another-secret", Duration::minutes(30), Duration::days(7));

        assert!(matches!(other.verify(&token, TokenKind::Access), Err(AppError::InvalidToken)));
        assert!(matches!(keys().verify("not.a.jwt", TokenKind::Access), Err(AppError::InvalidToken)));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let expired = JwtKeys::new("test-secret", Duration::minutes(-10), Duration::days(7));
        let token = expired.issue(Uuid::new_v4(), TokenKind::Access).unwrap();
        assert!(matches!(keys().verify(&token, TokenKind::Access), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn password_hash_verifies() {
        let hashed = hash_password("correct horse").await.unwrap();
        assert!(verify_password("correct horse", &hashed).await.unwrap());
        assert!(!verify_password("wrong", &hashed).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_accounts_pay_the_full_hash_cost() {
        let dummy = DUMMY_HASH.as_deref().expect("dummy hash is computed");
        assert!(dummy.starts_with(&format!("$2b${:02}$", bcrypt::DEFAULT_COST)));
        assert!(!verify_password("anything", dummy).await.unwrap());

        assert!(matches!(reject_unknown_account("anything").await, AppError::InvalidCredentials));
    }
}
