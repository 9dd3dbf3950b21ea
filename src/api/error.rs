use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;
use thiserror::Error;

use crate::api::auth::AuthError;
use crate::api::handlers::ErrorResponse;
use crate::logic::route_resolver::RouteError;
use crate::store::traits::CollectionError;

/// Capability call that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Get,
    List,
    Edit,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "creating entity"),
            Self::Get => write!(f, "getting entity"),
            Self::List => write!(f, "retrieving collection"),
            Self::Edit => write!(f, "editing entity"),
            Self::Delete => write!(f, "deleting entity"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("request has no basic authentication credentials")]
    MissingCredentials { realm: String },

    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthError),

    #[error("method {method} not allowed on {path}")]
    MethodNotAllowed {
        method: String,
        path: String,
        allowed: &'static str,
    },

    #[error("error reading request body: {0}")]
    Body(#[source] axum::Error),

    #[error("error {operation}: {source}")]
    Operation {
        operation: Operation,
        #[source]
        source: CollectionError,
    },

    #[error("error encoding JSON: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("collection returned an invalid entity path ({0})")]
    Location(String),
}

impl ApiError {
    pub fn operation(operation: Operation) -> impl FnOnce(CollectionError) -> ApiError {
        move |source| ApiError::Operation { operation, source }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Route(_) => StatusCode::NOT_FOUND,
            ApiError::MissingCredentials { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Authentication(AuthError::Rejected) => StatusCode::UNAUTHORIZED,
            ApiError::Authentication(AuthError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Body(_) => StatusCode::BAD_REQUEST,
            ApiError::Operation { source, .. } => match source {
                CollectionError::NotFound(_) => StatusCode::NOT_FOUND,
                _ if source.is_client_error() => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Encoding(_) | ApiError::Location(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text sent to the client; server-side details stay in the log
    fn public_message(&self) -> String {
        match self {
            ApiError::Authentication(AuthError::Backend(_)) => "error resolving identity".into(),
            ApiError::Operation {
                operation,
                source: CollectionError::Backend(_),
            } => format!("error {}", operation),
            ApiError::Encoding(_) => "error encoding JSON".into(),
            ApiError::Location(_) => "unexpected error".into(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self.to_string_with_sources());
        } else {
            log::warn!("{}", self.to_string_with_sources());
        }

        let mut response = (status, Json(ErrorResponse::new(&self.public_message()))).into_response();
        match &self {
            ApiError::MissingCredentials { realm } => {
                if let Ok(value) = HeaderValue::from_str(&format!("Basic realm=\"{}\"", realm)) {
                    response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
                }
            }
            ApiError::MethodNotAllowed { allowed, .. } => {
                response
                    .headers_mut()
                    .insert(header::ALLOW, HeaderValue::from_static(*allowed));
            }
            _ => {}
        }
        response
    }
}

impl ApiError {
    fn to_string_with_sources(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            let cause_text = cause.to_string();
            if !message.ends_with(&cause_text) {
                message.push_str(": ");
                message.push_str(&cause_text);
            }
            source = cause.source();
        }
        message
    }
}
