use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use crate::http::handlers::rejected;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::store::{NewUser, User};

pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let Json(payload) = payload.map_err(|r| rejected(&state.events, "/users", r))?;

    let valid = payload.validate().map_err(|errors| {
        state.events.warn(
            "VALIDATION_ERROR",
            "User validation failed",
            json!({ "errors": errors, "path": "/users" }),
        );
        ApiError::Validation(errors)
    })?;

    let user = state.store.insert_user(valid);
    state.events.info(
        "USER_CREATED",
        format!("User {} created", user.username),
        json!({ "userId": user.id, "username": user.username, "email": user.email }),
    );

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(State(state): State<AppState>) -> Json<Vec<User>> {
    Json(state.store.list_users())
}

pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<User>, ApiError> {
    match state.store.get_user(&id) {
        Some(user) => Ok(Json(user)),
        None => {
            state
                .events
                .warn("USER_NOT_FOUND", format!("User {id} not found"), json!({ "userId": id }));
            Err(ApiError::NotFound("User not found".to_string()))
        }
    }
}
