//! Collection traffic: everything that is not a fixed route lands here.

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::api::auth::basic_credentials;
use crate::api::error::ApiError;
use crate::api::registry::DynCollection;
use crate::api::routes::ApiState;
use crate::logic::query_filter::parse_query_string;
use crate::logic::route_resolver::{resolve_route, RouteError};
use crate::model::{Identity, PathIdentifierMap, ResolvedRoute};

const SINGULAR_METHODS: &str = "GET, PUT, DELETE, OPTIONS";
const PLURAL_METHODS: &str = "GET, POST, OPTIONS";

pub async fn dispatch_request(
    State(state): State<ApiState>,
    request: Request,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    let route = resolve_route(&*state.registry, &path)?;
    let collection = state
        .registry
        .get(route.collection_name())
        .ok_or_else(|| RouteError::NotFound(path.clone()))?;

    let requestor = authenticate(&state, &parts.headers).await?;
    log::debug!("{} {} by {}", parts.method, path, requestor.user_id);

    match route {
        ResolvedRoute::Singular { entity_id, .. } => match parts.method {
            Method::GET => get_entity(&**collection, entity_id).await,
            Method::PUT => {
                let body = read_body(body, state.max_body_bytes).await?;
                collection.edit(entity_id, &body).await?;
                Ok(StatusCode::OK.into_response())
            }
            Method::DELETE => {
                collection.delete(entity_id).await?;
                Ok(StatusCode::OK.into_response())
            }
            method => Err(not_allowed(method, path, SINGULAR_METHODS)),
        },
        ResolvedRoute::Plural {
            parent_identifiers,
            ..
        } => match parts.method {
            Method::GET => {
                list_collection(&**collection, &parent_identifiers, parts.uri.query()).await
            }
            Method::POST => {
                let body = read_body(body, state.max_body_bytes).await?;
                create_entity(&**collection, &requestor, &parent_identifiers, &body).await
            }
            method => Err(not_allowed(method, path, PLURAL_METHODS)),
        },
    }
}

async fn authenticate(state: &ApiState, headers: &HeaderMap) -> Result<Identity, ApiError> {
    let credentials = basic_credentials(headers).ok_or_else(|| ApiError::MissingCredentials {
        realm: state.realm.to_string(),
    })?;

    state
        .authenticator
        .resolve_identity(&credentials.username, &credentials.password)
        .await
        .map_err(|e| {
            log::warn!("rejected credentials for user '{}'", credentials.username);
            ApiError::from(e)
        })
}

async fn read_body(body: axum::body::Body, limit: usize) -> Result<Bytes, ApiError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(ApiError::Body)
}

async fn get_entity(collection: &dyn DynCollection, id: Uuid) -> Result<Response, ApiError> {
    let entity = collection.get(id).await?;
    Ok(Json(entity).into_response())
}

async fn list_collection(
    collection: &dyn DynCollection,
    parent_ids: &PathIdentifierMap,
    query: Option<&str>,
) -> Result<Response, ApiError> {
    let filter = parse_query_string(query);
    let listing = collection.list(parent_ids, &filter).await?;
    Ok(Json(listing).into_response())
}

async fn create_entity(
    collection: &dyn DynCollection,
    requestor: &Identity,
    parent_ids: &PathIdentifierMap,
    body: &[u8],
) -> Result<Response, ApiError> {
    let location = collection.create(requestor, parent_ids, body).await?;
    let value = HeaderValue::from_str(&location).map_err(|_| ApiError::Location(location.clone()))?;

    log::info!("{} created {}", requestor.user_id, location);
    Ok((StatusCode::CREATED, [(header::LOCATION, value)]).into_response())
}

fn not_allowed(method: Method, path: String, allowed: &'static str) -> ApiError {
    ApiError::MethodNotAllowed {
        method: method.to_string(),
        path,
        allowed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::{create_router, ApiState};
    use crate::api::{CollectionRegistry, StaticAuthenticator};
    use crate::config::CorsConfig;
    use crate::logic::path::parse_entity_path;
    use crate::seed::DemoCollections;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::Router;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    const ORIGIN: &str = "http://localhost:8090";

    struct Harness {
        app: Router,
        collections: DemoCollections,
    }

    fn harness() -> Harness {
        let collections = DemoCollections::new();
        let mut registry = CollectionRegistry::new();
        collections.register(&mut registry).unwrap();

        let authenticator = StaticAuthenticator::new(
            [("alice".to_string(), "wonderland".to_string())]
                .into_iter()
                .collect(),
        );
        let state = ApiState::new(registry, Arc::new(authenticator), "entities");
        let cors = CorsConfig {
            allowed_origin: ORIGIN.to_string(),
        };

        Harness {
            app: create_router(&cors).with_state(state),
            collections,
        }
    }

    fn auth_header() -> String {
        format!("Basic {}", STANDARD.encode("alice:wonderland"))
    }

    fn request(method: Method, uri: &str, body: Option<Value>) -> Request {
        let builder = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, auth_header());
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, request: Request) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_project(app: &Router, name: &str) -> String {
        let response = send(
            app,
            request(Method::POST, "/projects", Some(json!({ "name": name }))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        response.headers()[header::LOCATION]
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_create_then_get_through_location() {
        let Harness { app, .. } = harness();
        let location = create_project(&app, "apollo").await;

        let parsed = parse_entity_path(&location).unwrap();
        assert_eq!(parsed.collection_name, "projects");

        let response = send(&app, request(Method::GET, &location, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let project = json_body(response).await;
        assert_eq!(project["name"], "apollo");
        assert_eq!(project["created_by"], "alice");
        assert_eq!(project["id"], parsed.entity_id.to_string());
    }

    #[tokio::test]
    async fn test_nested_collection_listing() {
        let Harness { app, .. } = harness();
        let project = create_project(&app, "gemini").await;

        for (name, price) in [("gear", 12.5), ("sprocket", 3.0), ("chain", 30.0)] {
            let response = send(
                &app,
                request(
                    Method::POST,
                    &format!("{}/widgets", project),
                    Some(json!({ "name": name, "color": "black", "price": price })),
                ),
            )
            .await;
            assert_eq!(response.status(), StatusCode::CREATED);
            let location = response.headers()[header::LOCATION].to_str().unwrap();
            assert!(location.starts_with(&format!("{}/widgets/", project)));
        }

        let response = send(
            &app,
            request(
                Method::GET,
                &format!("{}/widgets?sort=asc.price&price=gt.5&count=1", project),
                None,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let listing = json_body(response).await;
        assert_eq!(listing["totalEntities"], 2);
        assert_eq!(listing["entities"].as_array().unwrap().len(), 1);
        assert_eq!(listing["entities"][0]["name"], "gear");
    }

    #[tokio::test]
    async fn test_malformed_filters_do_not_fail_listing() {
        let Harness { app, .. } = harness();
        create_project(&app, "mercury").await;

        let response = send(
            &app,
            request(Method::GET, "/projects?sort=bogus.name&page=x&name=like.m", None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["totalEntities"], 1);
    }

    #[tokio::test]
    async fn test_edit_and_delete() {
        let Harness { app, collections } = harness();
        let location = create_project(&app, "vostok").await;

        let response = send(
            &app,
            request(
                Method::PUT,
                &location,
                Some(json!({ "name": "voskhod", "description": "second" })),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let project = json_body(send(&app, request(Method::GET, &location, None)).await).await;
        assert_eq!(project["name"], "voskhod");

        let response = send(&app, request(Method::DELETE, &location, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(collections.projects.is_empty());

        let response = send(&app, request(Method::GET, &location, None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_path_errors_are_not_found() {
        let Harness { app, .. } = harness();
        for uri in ["/unknown", "/projects/42", "/foo/projects", "/"] {
            let response = send(&app, request(Method::GET, uri, None)).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
            assert!(json_body(response).await["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_invalid_body_is_bad_request() {
        let Harness { app, .. } = harness();
        let response = send(
            &app,
            request(Method::POST, "/projects", Some(json!({ "title": "no name" }))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &app,
            request(
                Method::POST,
                "/widgets",
                Some(json!({ "name": "orphan", "color": "red", "price": 1 })),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_credentials_required() {
        let Harness { app, .. } = harness();

        let anonymous = HttpRequest::builder()
            .method(Method::GET)
            .uri("/projects")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, anonymous).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));

        let wrong = HttpRequest::builder()
            .method(Method::GET)
            .uri("/projects")
            .header(
                header::AUTHORIZATION,
                format!("Basic {}", STANDARD.encode("alice:rabbit")),
            )
            .body(Body::empty())
            .unwrap();
        let response = send(&app, wrong).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let Harness { app, .. } = harness();
        let response = send(&app, request(Method::DELETE, "/projects", None)).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], PLURAL_METHODS);

        let location = create_project(&app, "soyuz").await;
        let response = send(&app, request(Method::POST, &location, None)).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], SINGULAR_METHODS);
    }

    #[tokio::test]
    async fn test_preflight_skips_authentication() {
        let Harness { app, .. } = harness();
        let preflight = HttpRequest::builder()
            .method(Method::OPTIONS)
            .uri("/projects")
            .header(header::ORIGIN, ORIGIN)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = send(&app, preflight).await;
        assert!(response.status().is_success());
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
        let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
        assert!(methods.contains("POST"));
        assert!(methods.contains("DELETE"));
        let allowed_headers = headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
            .to_str()
            .unwrap()
            .to_ascii_lowercase();
        assert!(allowed_headers.contains("authorization"));
    }

    #[tokio::test]
    async fn test_cors_headers_on_responses() {
        let Harness { app, .. } = harness();
        let mut request = request(Method::GET, "/projects", None);
        request
            .headers_mut()
            .insert(header::ORIGIN, HeaderValue::from_static(ORIGIN));

        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
        let exposed = response.headers()[header::ACCESS_CONTROL_EXPOSE_HEADERS]
            .to_str()
            .unwrap()
            .to_ascii_lowercase();
        assert!(exposed.contains("location"));
    }

    #[tokio::test]
    async fn test_health_is_open() {
        let Harness { app, .. } = harness();
        let response = send(
            &app,
            HttpRequest::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }
}
