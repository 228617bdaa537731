pub mod health;
pub mod values;

use axum::http::Uri;

use crate::error::AppError;

pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}
