use anyhow::Result;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ISSUER: &str = "buzz2remote";
const TOKEN_TTL_HOURS: i64 = 24;

/// Data carried inside an access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub user_id: Uuid,
    pub email: String,
    pub is_admin: bool,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub jti: String,
}

/// Creates and verifies HS256 access tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtService {
    pub fn new(secret: &str, issuer: String) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }

    /// Issues a token valid for 24 hours.
    pub fn create_token(&self, user_id: Uuid, email: &str, is_admin: bool) -> Result<String> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::hours(TOKEN_TTL_HOURS);

        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            email: email.to_string(),
            is_admin,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Returns the claims if the token is well-signed, unexpired and from our issuer.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_verify_token() {
        let service = JwtService::new("test_secret_key", ISSUER.to_string());
        let user_id = Uuid::new_v4();

        let token = service
            .create_token(user_id, "ada@example.com", true)
            .unwrap();

        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.email, "ada@example.com");
        assert!(claims.is_admin);
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_HOURS * 3600);
    }

    #[test]
    fn test_invalid_token() {
        let service = JwtService::new("test_secret_key", ISSUER.to_string());
        assert!(service.verify_token("not-a-token").is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let signer = JwtService::new("secret1", ISSUER.to_string());
        let verifier = JwtService::new("secret2", ISSUER.to_string());

        let token = signer
            .create_token(Uuid::new_v4(), "ada@example.com", false)
            .unwrap();

        assert!(verifier.verify_token(&token).is_err());
    }

    #[test]
    fn test_wrong_issuer() {
        let signer = JwtService::new("secret", "someone-else".to_string());
        let verifier = JwtService::new("secret", ISSUER.to_string());

        let token = signer
            .create_token(Uuid::new_v4(), "ada@example.com", false)
            .unwrap();

        assert!(verifier.verify_token(&token).is_err());
    }
}
