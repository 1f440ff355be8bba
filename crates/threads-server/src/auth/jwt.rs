use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Session token claims issued by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // External user id
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

pub fn verify_identity_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("Token verification failed: {}", e);
        AppError::Unauthorized
    })?;

    if token_data.claims.sub.trim().is_empty() {
        return Err(AppError::Unauthorized);
    }

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(sub: &str, secret: &str, expires_in: Duration) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.to_string(),
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_token_signed_with_shared_secret() {
        let token = token("user_2abc", "secret", Duration::minutes(5));
        let claims = verify_identity_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "user_2abc");
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = token("user_2abc", "secret", Duration::minutes(5));
        assert!(matches!(
            verify_identity_token(&token, "other"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let token = token("user_2abc", "secret", Duration::hours(-1));
        assert!(verify_identity_token(&token, "secret").is_err());
    }

    #[test]
    fn rejects_blank_subject() {
        let token = token(" ", "secret", Duration::minutes(5));
        assert!(verify_identity_token(&token, "secret").is_err());
    }
}
