use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;

/// 200 when the database answers, 500 otherwise (including no database).
pub async fn ping_handler(State(state): State<AppState>) -> Result<StatusCode> {
    state.storage().ping().await.map_err(AppError::internal)?;
    Ok(StatusCode::OK)
}
