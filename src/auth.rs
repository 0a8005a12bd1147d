//! 인증 협력자
//!
//! 원장은 Bearer 토큰에서 사용자 ID를 얻는 연산 하나만 사용합니다.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// 토큰 → 사용자 ID
pub trait Authenticator: Send + Sync {
    fn resolve_user_id(&self, bearer_token: &str) -> Result<String>;
}

/// JWT 클레임 (`sub` = 사용자 ID)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// HS256 JWT 인증기
pub struct JwtAuthenticator {
    secret: String,
}

impl JwtAuthenticator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// 토큰 발급 (운영 도구 및 테스트용)
    pub fn issue(&self, user_id: &str, ttl: chrono::Duration) -> Result<String> {
        let exp = (Utc::now() + ttl).timestamp().max(0) as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            exp,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| LedgerError::Validation(format!("failed to issue token: {}", e)))
    }
}

impl Authenticator for JwtAuthenticator {
    fn resolve_user_id(&self, bearer_token: &str) -> Result<String> {
        let decoded = decode::<Claims>(
            bearer_token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            debug!("토큰 검증 실패: {}", e);
            LedgerError::Unauthorized
        })?;

        if decoded.claims.sub.trim().is_empty() {
            return Err(LedgerError::Unauthorized);
        }
        Ok(decoded.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_token_resolves_to_subject() {
        let auth = JwtAuthenticator::new("test-secret");
        let token = auth.issue("user-7", chrono::Duration::hours(1)).unwrap();

        assert_eq!(auth.resolve_user_id(&token).unwrap(), "user-7");
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let issuer = JwtAuthenticator::new("secret-a");
        let verifier = JwtAuthenticator::new("secret-b");
        let token = issuer.issue("user-7", chrono::Duration::hours(1)).unwrap();

        assert!(matches!(
            verifier.resolve_user_id(&token),
            Err(LedgerError::Unauthorized)
        ));
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let auth = JwtAuthenticator::new("test-secret");
        let token = auth.issue("user-7", chrono::Duration::hours(-2)).unwrap();

        assert!(matches!(
            auth.resolve_user_id(&token),
            Err(LedgerError::Unauthorized)
        ));
    }

    #[test]
    fn test_garbage_token_is_unauthorized() {
        let auth = JwtAuthenticator::new("test-secret");
        assert!(matches!(
            auth.resolve_user_id("not-a-jwt"),
            Err(LedgerError::Unauthorized)
        ));
    }
}
