use super::host;
use crate::auth::UserId;
use crate::error::{AppError, Result};
use crate::model::UserUrl;
use crate::state::AppState;
use crate::worker::DeleteJob;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use snip_core::{Repository, Token};
use tracing::debug;

/// `GET /api/user/urls`: the caller's live links, or 204 when there are none.
pub async fn list_user_urls_handler(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    headers: HeaderMap,
) -> Result<Response> {
    let records = state
        .storage()
        .get_user_urls(&user_id)
        .await
        .map_err(AppError::internal)?;

    let host = host(&headers);
    let urls: Vec<UserUrl> = records
        .into_iter()
        .filter(|record| record.is_live())
        .map(|record| UserUrl {
            short_url: state.short_url(&record.token, host),
            original_url: record.original_url,
        })
        .collect();

    if urls.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    Ok(Json(urls).into_response())
}

/// `DELETE /api/user/urls`: queues the tombstones and answers 202 at once.
pub async fn delete_user_urls_handler(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    payload: std::result::Result<Json<Vec<String>>, JsonRejection>,
) -> Result<StatusCode> {
    let Json(raw) = payload.map_err(AppError::bad_request)?;

    // Malformed tokens cannot name a stored record.
    let tokens: Vec<Token> = raw.into_iter().filter_map(|t| Token::new(t).ok()).collect();
    debug!(user_id = %user_id, tokens = tokens.len(), "queueing delete");

    state
        .deletes()
        .submit(DeleteJob { user_id, tokens })
        .await
        .map_err(|err| AppError::Unavailable(err.to_string()))?;

    Ok(StatusCode::ACCEPTED)
}
