use axum::{
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
};

use crate::error::AppError;

/// JSON request body whose rejections use the API's error envelope instead of
/// axum's plain text responses.
pub struct JsonBody<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match &rejection {
            JsonRejection::MissingJsonContentType(_) => AppError::ApiRequest {
                msg: "Expected a JSON or multipart form body".into(),
                status: StatusCode::BAD_REQUEST,
            },
            _ => AppError::ApiRequest {
                msg: rejection.body_text(),
                status: rejection.status(),
            },
        }
    }
}

impl<S, T> FromRequest<S> for JsonBody<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}
