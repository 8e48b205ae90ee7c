use axum::{
    extract::{FromRequest, Request},
    Json,
};

use crate::handlers::error::ApiError;

/// JSON body extractor whose rejections use the API error body
/// (`{"message", "status"}`) with status 400.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                let message = format!("Failed to parse JSON request body: {}", rejection.body_text());
                tracing::warn!("{}", message);
                ApiError::bad_request(message)
            })?;
        Ok(AppJson(value))
    }
}
