use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::http::handlers::rejected;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::store::{NewPost, Post};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFilter {
    pub user_id: Option<String>,
}

pub async fn create_post(
    State(state): State<AppState>,
    payload: Result<Json<NewPost>, JsonRejection>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let Json(payload) = payload.map_err(|r| rejected(&state.events, "/posts", r))?;

    let valid = payload.validate().map_err(|errors| {
        state.events.warn(
            "VALIDATION_ERROR",
            "Post validation failed",
            json!({ "errors": errors, "path": "/posts" }),
        );
        ApiError::Validation(errors)
    })?;

    if !state.store.user_exists(&valid.user_id) {
        state.events.warn(
            "USER_NOT_FOUND",
            format!("Cannot create post: user {} not found", valid.user_id),
            json!({ "userId": valid.user_id }),
        );
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let post = state.store.insert_post(valid);
    state.events.info(
        "POST_CREATED",
        format!("Post {} created", post.id),
        json!({ "postId": post.id, "userId": post.user_id, "title": post.title }),
    );

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn list_posts(State(state): State<AppState>, Query(filter): Query<PostFilter>) -> Json<Vec<Post>> {
    Json(state.store.list_posts(filter.user_id.as_deref()))
}
