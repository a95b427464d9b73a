//! Password hashing and bearer tokens.

use crate::config::Secrets;
use crate::error::AuthError;
use crate::models::User;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// The user a request acts for, taken from a verified token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Argon2id PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// False for a wrong password and for a stored value that is not a PHC hash.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Sign an HS256 token for `user`, valid for `secrets.jwt_expire_secs`.
pub fn sign_token(secrets: &Secrets, user: &User) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        iat: now,
        exp: now + secrets.jwt_expire_secs,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secrets.jwt.as_bytes()),
    )?;
    Ok(token)
}

pub fn verify_token(secrets: &Secrets, token: &str) -> Result<AuthUser, AuthError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secrets.jwt.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(AuthUser {
        id: data.claims.sub,
        username: data.claims.username,
    })
}

/// Verify an `Authorization: Bearer <token>` header value.
pub fn authenticate_bearer(secrets: &Secrets, header: Option<&str>) -> Result<AuthUser, AuthError> {
    let header = header.ok_or(AuthError::MissingToken)?;
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MalformedHeader)?;
    verify_token(secrets, token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn secrets(jwt: &str) -> Secrets {
        Secrets {
            jwt: jwt.into(),
            jwt_expire_secs: 3600,
        }
    }

    fn user() -> User {
        User {
            id: Uuid::now_v7(),
            username: "stu1".into(),
            password_hash: hash_password("123").unwrap(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn signed_token_authenticates_bearer_header() {
        let user = user();
        let token = sign_token(&secrets("s"), &user).unwrap();
        let auth = authenticate_bearer(&secrets("s"), Some(&format!("Bearer {token}"))).unwrap();
        assert_eq!(auth.id, user.id.to_string());
        assert_eq!(auth.username, "stu1");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = sign_token(&secrets("one"), &user()).unwrap();
        assert!(matches!(verify_token(&secrets("two"), &token), Err(AuthError::Token(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let expired = Secrets {
            jwt: "s".into(),
            jwt_expire_secs: -3600,
        };
        let token = sign_token(&expired, &user()).unwrap();
        assert!(verify_token(&secrets("s"), &token).is_err());
    }

    #[test]
    fn bearer_header_shape() {
        let s = secrets("s");
        assert!(matches!(authenticate_bearer(&s, None), Err(AuthError::MissingToken)));
        assert!(matches!(authenticate_bearer(&s, Some("Basic abc")), Err(AuthError::MalformedHeader)));
        assert!(matches!(authenticate_bearer(&s, Some("Bearer  ")), Err(AuthError::MalformedHeader)));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn equal_passwords_get_distinct_salts() {
        let first = hash_password("123").unwrap();
        let second = hash_password("123").unwrap();
        assert_ne!(first, second);
        assert!(verify_password("123", &first));
        assert!(verify_password("123", &second));
    }

    #[test]
    fn stored_value_that_is_not_a_hash_never_verifies() {
        assert!(!verify_password("123", "123"));
        assert!(!verify_password("", ""));
    }
}
