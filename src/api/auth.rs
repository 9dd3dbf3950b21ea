use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::collections::HashMap;
use thiserror::Error;

use crate::model::Identity;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("incorrect username/password")]
    Rejected,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Maps request credentials to the identity making the request.
#[async_trait::async_trait]
pub trait Authenticator: Send + Sync + 'static {
    async fn resolve_identity(&self, username: &str, password: &str)
        -> Result<Identity, AuthError>;
}

/// Plain functions work as authenticators
#[async_trait::async_trait]
impl<F> Authenticator for F
where
    F: Fn(&str, &str) -> Result<Identity, AuthError> + Send + Sync + 'static,
{
    async fn resolve_identity(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        self(username, password)
    }
}

/// Authenticates against a fixed username → password table.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    users: HashMap<String, String>,
}

impl StaticAuthenticator {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait::async_trait]
impl Authenticator for StaticAuthenticator {
    async fn resolve_identity(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        match self.users.get(username) {
            Some(expected) if expected == password => Ok(Identity::new(username)),
            _ => Err(AuthError::Rejected),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

/// Extract `Authorization: Basic …` credentials, if present and well formed
pub fn basic_credentials(headers: &HeaderMap) -> Option<BasicCredentials> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some(BasicCredentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_authorization(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_basic_credentials() {
        let encoded = STANDARD.encode("alice:s3cr:et");
        let creds = basic_credentials(&with_authorization(&format!("Basic {}", encoded))).unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password, "s3cr:et");
    }

    #[test]
    fn test_malformed_credentials() {
        assert_eq!(basic_credentials(&HeaderMap::new()), None);
        assert_eq!(basic_credentials(&with_authorization("Bearer abc")), None);
        assert_eq!(basic_credentials(&with_authorization("Basic !!!")), None);
        let no_colon = STANDARD.encode("alice");
        assert_eq!(
            basic_credentials(&with_authorization(&format!("Basic {}", no_colon))),
            None
        );
    }

    #[tokio::test]
    async fn test_static_authenticator() {
        let auth = StaticAuthenticator::new(
            [("alice".to_string(), "wonderland".to_string())]
                .into_iter()
                .collect(),
        );

        let identity = auth.resolve_identity("alice", "wonderland").await.unwrap();
        assert_eq!(identity.user_id, "alice");
        assert!(matches!(
            auth.resolve_identity("alice", "nope").await,
            Err(AuthError::Rejected)
        ));
        assert!(matches!(
            auth.resolve_identity("bob", "wonderland").await,
            Err(AuthError::Rejected)
        ));
    }

    #[tokio::test]
    async fn test_function_authenticator() {
        let auth = |username: &str, _password: &str| -> Result<Identity, AuthError> {
            if username == "root" {
                Ok(Identity::new("root"))
            } else {
                Err(AuthError::Rejected)
            }
        };
        assert!(auth.resolve_identity("root", "").await.is_ok());
        assert!(auth.resolve_identity("guest", "").await.is_err());
    }
}
