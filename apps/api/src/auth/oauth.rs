//! OAuth sign-in for LinkedIn and Google.
//!
//! Both providers speak OpenID Connect: the authorization code is exchanged
//! for an access token, which is then used once to read the userinfo
//! endpoint. No refresh tokens are stored.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{Config, OAuthCredentials};
use crate::errors::AppError;
use crate::validation::normalize_email;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    LinkedIn,
    Google,
}

impl OAuthProvider {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linkedin" => Some(OAuthProvider::LinkedIn),
            "google" => Some(OAuthProvider::Google),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::LinkedIn => "linkedin",
            OAuthProvider::Google => "google",
        }
    }

    fn token_url(&self) -> &'static str {
        match self {
            OAuthProvider::LinkedIn => "https://www.linkedin.com/oauth/v2/accessToken",
            OAuthProvider::Google => "https://oauth2.googleapis.com/token",
        }
    }

    fn userinfo_url(&self) -> &'static str {
        match self {
            OAuthProvider::LinkedIn => "https://api.linkedin.com/v2/userinfo",
            OAuthProvider::Google => "https://openidconnect.googleapis.com/v1/userinfo",
        }
    }

    pub fn credentials<'a>(&self, config: &'a Config) -> Option<&'a OAuthCredentials> {
        match self {
            OAuthProvider::LinkedIn => config.linkedin.as_ref(),
            OAuthProvider::Google => config.google.as_ref(),
        }
    }
}

/// The subset of OpenID userinfo we keep.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthProfile {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
}

impl OAuthProfile {
    /// Normalized email, provided the provider shared one and did not mark
    /// it unverified. An absent claim is accepted.
    pub fn verified_email(&self, provider: OAuthProvider) -> Result<String, AppError> {
        let email = self
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                AppError::Upstream(format!("{} did not share an email address", provider.as_str()))
            })?;
        if self.email_verified == Some(false) {
            warn!(provider = provider.as_str(), "OAuth email is not verified");
            return Err(AppError::Upstream(format!(
                "{} reports the email address as unverified",
                provider.as_str()
            )));
        }
        Ok(email)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
}

/// Exchanges an authorization code and fetches the caller's profile.
pub async fn fetch_profile(
    http: &Client,
    provider: OAuthProvider,
    credentials: &OAuthCredentials,
    code: &str,
    redirect_uri: &str,
) -> Result<OAuthProfile, AppError> {
    let response = http
        .post(provider.token_url())
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ])
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("{} token request failed: {e}", provider.as_str())))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AppError::Upstream(format!("{} token response unreadable: {e}", provider.as_str())))?;

    if !status.is_success() {
        warn!(provider = provider.as_str(), %status, "OAuth code exchange rejected");
        return Err(AppError::Upstream(format!(
            "{} rejected the authorization code: {}",
            provider.as_str(),
            provider_error_message(&body)
        )));
    }

    let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
        AppError::Upstream(format!("{} token response malformed: {e}", provider.as_str()))
    })?;
    debug!(provider = provider.as_str(), "OAuth code exchanged");

    let profile = http
        .get(provider.userinfo_url())
        .bearer_auth(&token.access_token)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| AppError::Upstream(format!("{} userinfo request failed: {e}", provider.as_str())))?
        .json::<OAuthProfile>()
        .await
        .map_err(|e| AppError::Upstream(format!("{} userinfo malformed: {e}", provider.as_str())))?;

    Ok(profile)
}

/// Best-effort human-readable message from a provider error body.
fn provider_error_message(body: &str) -> String {
    match serde_json::from_str::<ProviderError>(body) {
        Ok(err) => err
            .error_description
            .or(err.message)
            .or(err.error)
            .unwrap_or_else(|| "unknown error".to_string()),
        Err(_) if body.trim().is_empty() => "empty response".to_string(),
        Err(_) => body.chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider() {
        assert_eq!(OAuthProvider::parse("LinkedIn"), Some(OAuthProvider::LinkedIn));
        assert_eq!(OAuthProvider::parse("google"), Some(OAuthProvider::Google));
        assert_eq!(OAuthProvider::parse("github"), None);
    }

    #[test]
    fn test_provider_error_prefers_description() {
        let body = r#"{"error":"invalid_grant","error_description":"code expired"}"#;
        assert_eq!(provider_error_message(body), "code expired");
    }

    #[test]
    fn test_provider_error_falls_back_to_code() {
        assert_eq!(provider_error_message(r#"{"error":"invalid_grant"}"#), "invalid_grant");
    }

    #[test]
    fn test_provider_error_non_json() {
        assert_eq!(provider_error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(provider_error_message("   "), "empty response");
    }

    #[test]
    fn test_credentials_absent_by_default() {
        let config = Config::for_tests();
        assert!(OAuthProvider::LinkedIn.credentials(&config).is_none());
    }

    #[test]
    fn test_userinfo_deserializes() {
        let json = r#"{"sub":"abc","email":"ada@example.com","name":"Ada","email_verified":true}"#;
        let profile: OAuthProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
        assert_eq!(profile.email_verified, Some(true));
        assert!(profile.picture.is_none());
    }

    fn profile(email: Option<&str>, email_verified: Option<bool>) -> OAuthProfile {
        OAuthProfile {
            sub: "abc".to_string(),
            email: email.map(str::to_string),
            name: None,
            picture: None,
            email_verified,
        }
    }

    #[test]
    fn test_unverified_email_rejected() {
        let err = profile(Some("ada@example.com"), Some(false))
            .verified_email(OAuthProvider::Google)
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[test]
    fn test_verified_or_unstated_email_accepted() {
        let verified = profile(Some(" Ada@Example.com "), Some(true));
        assert_eq!(
            verified.verified_email(OAuthProvider::Google).unwrap(),
            "ada@example.com"
        );
        let unstated = profile(Some("ada@example.com"), None);
        assert!(unstated.verified_email(OAuthProvider::LinkedIn).is_ok());
    }

    #[test]
    fn test_missing_email_rejected() {
        let err = profile(None, Some(true))
            .verified_email(OAuthProvider::LinkedIn)
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
