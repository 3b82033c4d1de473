use super::host;
use crate::auth::UserId;
use crate::error::{AppError, Result};
use crate::model::{BatchRequestItem, BatchResponseItem, ShortenRequest, ShortenResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Json};
use snip_core::Token;
use snip_shortener::ShortenerError;
use tracing::error;

/// Runs `encode`, folding "already shortened" into a 409 with the old token.
async fn encode(state: &AppState, url: &str, user_id: &str) -> Result<(StatusCode, Token)> {
    match state.shortener().encode(url, user_id).await {
        Ok(token) => Ok((StatusCode::CREATED, token)),
        Err(ShortenerError::UrlExists(token)) => Ok((StatusCode::CONFLICT, token)),
        Err(err) => Err(AppError::bad_request(err)),
    }
}

/// `POST /` with the long URL as a plain-text body.
pub async fn shorten_text_handler(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    headers: HeaderMap,
    body: String,
) -> Result<Response> {
    let url = body.trim();
    if url.is_empty() {
        return Err(AppError::bad_request("incorrect long URL"));
    }

    let (status, token) = encode(&state, url, &user_id).await?;
    let short_url = state.short_url(&token, host(&headers));

    Ok((status, [(CONTENT_TYPE, "text/plain")], short_url).into_response())
}

/// `POST /api/shorten`.
pub async fn shorten_json_handler(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    headers: HeaderMap,
    payload: std::result::Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload.map_err(AppError::bad_request)?;
    if request.url.is_empty() {
        return Err(AppError::bad_request("incorrect url"));
    }

    let (status, token) = encode(&state, &request.url, &user_id).await?;
    let result = state.short_url(&token, host(&headers));

    Ok((status, Json(ShortenResponse { result })).into_response())
}

/// `POST /api/shorten/batch`. Already-shortened URLs reuse their token.
pub async fn shorten_batch_handler(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    headers: HeaderMap,
    payload: std::result::Result<Json<Vec<BatchRequestItem>>, JsonRejection>,
) -> Result<Response> {
    let Json(items) = payload.map_err(AppError::bad_request)?;
    if items.is_empty() {
        return Err(AppError::bad_request("empty batch"));
    }

    let host = host(&headers);
    let mut responses = Vec::with_capacity(items.len());

    for item in items {
        let token = match state.shortener().encode(&item.original_url, &user_id).await {
            Ok(token) | Err(ShortenerError::UrlExists(token)) => token,
            Err(ShortenerError::InvalidInput(message)) => {
                return Err(AppError::BadRequest(format!(
                    "{}: {message}",
                    item.correlation_id
                )));
            }
            Err(err) => {
                error!(url = %item.original_url, error = %err, "failed to encode batch item");
                return Err(AppError::internal(err));
            }
        };

        responses.push(BatchResponseItem {
            correlation_id: item.correlation_id,
            short_url: state.short_url(&token, host),
        });
    }

    Ok((StatusCode::CREATED, Json(responses)).into_response())
}

/// `GET /{id}`.
pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let token = Token::new(id).map_err(AppError::bad_request)?;

    let url = state
        .shortener()
        .decode(&token)
        .await
        .map_err(AppError::from_decode)?;

    Ok(Redirect::temporary(&url))
}
