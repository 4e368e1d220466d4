//! User handlers
//!
//! Stateless translation between HTTP and the user service: success bodies
//! carry `success: true`, failures render through `ApiError` as a flat
//! `{"error": ...}` object.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::error::ApiError;
use crate::models::{User, UserPayload};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    success: bool,
    users: Vec<User>,
    count: usize,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    success: bool,
    user: User,
}

#[derive(Debug, Serialize)]
pub struct UserMutationResponse {
    success: bool,
    message: &'static str,
    user: User,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    success: bool,
    message: &'static str,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<UserListResponse>, ApiError> {
    let users = state.users.list().await?;
    let count = users.len();

    Ok(Json(UserListResponse {
        success: true,
        users,
        count,
    }))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.get(id).await?;

    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<UserPayload>,
) -> Result<(StatusCode, Json<UserMutationResponse>), ApiError> {
    let user = state.users.create(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(UserMutationResponse {
            success: true,
            message: "User created successfully",
            user,
        }),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UserPayload>,
) -> Result<Json<UserMutationResponse>, ApiError> {
    let user = state.users.update(id, payload).await?;

    Ok(Json(UserMutationResponse {
        success: true,
        message: "User updated successfully",
        user,
    }))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.users.delete(id).await?;

    Ok(Json(DeleteResponse {
        success: true,
        message: "User deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use crate::services::UserService;
    use crate::storage::testing::FailingStore;
    use crate::storage::{MemoryStore, UserStore};
    use crate::AppState;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app_with(store: Arc<dyn UserStore>) -> Router {
        let state = AppState {
            users: Arc::new(UserService::new(store)),
        };
        Router::new()
            .nest("/api", crate::api_routes())
            .with_state(state)
    }

    fn app() -> Router {
        app_with(Arc::new(MemoryStore::new()))
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn bare_request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, body)
    }

    #[tokio::test]
    async fn test_create_returns_201_with_user() {
        let app = app();

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/api/users",
                json!({"name": "Jane Smith", "email": "jane@example.com", "age": 25}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["message"], json!("User created successfully"));
        assert!(body["user"]["id"].is_number());
        assert_eq!(body["user"]["email"], json!("jane@example.com"));
        assert_eq!(body["user"]["age"], json!(25));
        assert!(body["user"]["created_at"].is_string());
    }

    #[tokio::test]
    async fn test_create_without_email_is_400() {
        let app = app();

        let (status, body) = send(
            &app,
            json_request(Method::POST, "/api/users", json!({"name": "X"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Name and email are required"}));
    }

    #[tokio::test]
    async fn test_create_with_bad_email_is_400() {
        let app = app();

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/api/users",
                json!({"name": "X", "email": "bad-email"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid email format"}));
    }

    #[tokio::test]
    async fn test_create_duplicate_email_differing_in_case_is_400() {
        let app = app();

        send(
            &app,
            json_request(
                Method::POST,
                "/api/users",
                json!({"name": "A", "email": "a@example.com"}),
            ),
        )
        .await;
        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/api/users",
                json!({"name": "B", "email": "A@EXAMPLE.COM"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Email already exists"}));
    }

    #[tokio::test]
    async fn test_list_counts_and_orders_newest_first() {
        let app = app();

        for i in 1..=3 {
            send(
                &app,
                json_request(
                    Method::POST,
                    "/api/users",
                    json!({"name": format!("U{i}"), "email": format!("u{i}@example.com")}),
                ),
            )
            .await;
        }
        send(&app, bare_request(Method::DELETE, "/api/users/2")).await;

        let (status, body) = send(&app, bare_request(Method::GET, "/api/users")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["count"], json!(2));
        let ids: Vec<i64> = body["users"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn test_get_missing_user_is_404() {
        let app = app();

        let (status, body) = send(&app, bare_request(Method::GET, "/api/users/42")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "User not found"}));
    }

    #[tokio::test]
    async fn test_update_replaces_fields_but_not_created_at() {
        let app = app();

        let (_, created) = send(
            &app,
            json_request(
                Method::POST,
                "/api/users",
                json!({"name": "Jane", "email": "jane@example.com", "age": 25}),
            ),
        )
        .await;

        let (status, body) = send(
            &app,
            json_request(
                Method::PUT,
                "/api/users/1",
                json!({"name": "Jane Doe", "email": "jane.doe@example.com"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], json!("User updated successfully"));
        assert_eq!(body["user"]["id"], json!(1));
        assert_eq!(body["user"]["name"], json!("Jane Doe"));
        assert_eq!(body["user"]["email"], json!("jane.doe@example.com"));
        assert_eq!(body["user"]["age"], json!(null));
        assert_eq!(body["user"]["created_at"], created["user"]["created_at"]);
    }

    #[tokio::test]
    async fn test_update_to_own_email_succeeds() {
        let app = app();

        send(
            &app,
            json_request(
                Method::POST,
                "/api/users",
                json!({"name": "Jane", "email": "jane@example.com"}),
            ),
        )
        .await;

        let (status, _) = send(
            &app,
            json_request(
                Method::PUT,
                "/api/users/1",
                json!({"name": "Jane", "email": "JANE@example.com"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_update_to_other_users_email_is_400() {
        let app = app();

        for (name, email) in [("A", "a@example.com"), ("B", "b@example.com")] {
            send(
                &app,
                json_request(
                    Method::POST,
                    "/api/users",
                    json!({"name": name, "email": email}),
                ),
            )
            .await;
        }

        let (status, body) = send(
            &app,
            json_request(
                Method::PUT,
                "/api/users/2",
                json!({"name": "B", "email": "A@example.com"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Email already exists"}));
    }

    #[tokio::test]
    async fn test_update_missing_user_is_404() {
        let app = app();

        let (status, body) = send(
            &app,
            json_request(
                Method::PUT,
                "/api/users/9",
                json!({"name": "X", "email": "x@example.com"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "User not found"}));
    }

    #[tokio::test]
    async fn test_delete_then_get_is_404() {
        let app = app();

        send(
            &app,
            json_request(
                Method::POST,
                "/api/users",
                json!({"name": "Jane", "email": "jane@example.com"}),
            ),
        )
        .await;

        let (status, body) = send(&app, bare_request(Method::DELETE, "/api/users/1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"success": true, "message": "User deleted successfully"})
        );

        let (status, _) = send(&app, bare_request(Method::GET, "/api/users/1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_missing_user_is_404() {
        let app = app();

        let (status, body) = send(&app, bare_request(Method::DELETE, "/api/users/7")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "User not found"}));
    }

    #[tokio::test]
    async fn test_unmatched_api_route_is_json_404() {
        let app = app();

        let (status, body) = send(&app, bare_request(Method::GET, "/api/nope")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Route not found"}));
    }

    #[tokio::test]
    async fn test_backend_failure_is_500_with_generic_message() {
        let app = app_with(Arc::new(FailingStore));

        let (status, body) = send(&app, bare_request(Method::GET, "/api/users")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Internal server error"}));
    }

    #[tokio::test]
    async fn test_failure_bodies_have_no_success_key() {
        let app = app();

        let (_, body) = send(&app, bare_request(Method::GET, "/api/users/1")).await;

        assert!(body.get("success").is_none());
        assert!(body.get("error").is_some());
    }
}
