//! User administration handlers (admin only)

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{auth::require_admin, CurrentUser};
use crate::models::User;
use crate::services::user::{CreateUserInput, UpdateUserInput};
use crate::services::UserService;
use crate::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<User>>> {
    require_admin(&current_user.0)?;
    let service = UserService::new(state.db.clone());
    Ok(Json(service.list_users().await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    payload: Result<Json<CreateUserInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<User>)> {
    require_admin(&current_user.0)?;
    let Json(input) = payload?;
    let service = UserService::new(state.db.clone());
    let user = service.create_user(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateUserInput>, JsonRejection>,
) -> AppResult<Json<User>> {
    require_admin(&current_user.0)?;
    let Path(user_id) = path?;
    let Json(input) = payload?;
    let service = UserService::new(state.db.clone());
    let user = service
        .update_user(current_user.0.user_id, user_id, input)
        .await?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<StatusCode> {
    require_admin(&current_user.0)?;
    let Path(user_id) = path?;
    let service = UserService::new(state.db.clone());
    service.delete_user(current_user.0.user_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request},
        routing::{get, put},
        Router,
    };
    use rust_decimal::Decimal;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::config::{Config, DatabaseConfig, JwtConfig, ReportsConfig, ServerConfig};
    use crate::middleware::AuthUser;
    use crate::models::UserRole;

    // The pool never connects: every request below is answered before a query runs.
    fn state() -> AppState {
        let config = Config {
            environment: "test".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://stockroom@localhost/stockroom".to_string(),
                max_connections: 1,
                min_connections: 0,
            },
            jwt: JwtConfig {
                secret: "test-secret".to_string(),
                access_token_expiry: 60,
            },
            reports: ReportsConfig {
                usage_tolerance_percent: Decimal::from(15),
            },
        };
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database.url)
            .unwrap();
        AppState {
            db,
            config: Arc::new(config),
        }
    }

    fn caller(role: UserRole) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
            department: None,
        }
    }

    async fn call(user: AuthUser, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
        let app = Router::new()
            .route("/users", get(list_users).post(create_user))
            .route("/users/:user_id", put(update_user).delete(delete_user))
            .with_state(state());

        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        request.extensions_mut().insert(user);

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_worker_cannot_manage_users() {
        let target = format!("/users/{}", Uuid::new_v4());
        for (method, uri) in [
            (Method::GET, "/users"),
            (Method::POST, "/users"),
            (Method::PUT, target.as_str()),
            (Method::DELETE, target.as_str()),
        ] {
            let (status, body) = call(caller(UserRole::Worker), method, uri).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body["error"]["code"], "FORBIDDEN");
        }
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_own_account() {
        let admin = caller(UserRole::Admin);
        let uri = format!("/users/{}", admin.user_id);
        let (status, body) = call(admin, Method::DELETE, &uri).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
        assert_eq!(body["error"]["field"], "user");
    }

    #[tokio::test]
    async fn test_malformed_user_id_is_json_error() {
        let (status, body) = call(caller(UserRole::Admin), Method::DELETE, "/users/42").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_create_without_required_fields_is_rejected() {
        let (status, body) = call(caller(UserRole::Admin), Method::POST, "/users").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}
