use std::{collections::HashMap, fmt};

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use diesel::result::DatabaseErrorKind;
use diesel_async::pooled_connection::deadpool::PoolError;
use serde::Serialize;
use serde_json::Value;

use crate::storage::StorageError;

/// Failures that are the server's fault rather than the client's.
#[derive(Debug)]
pub enum ServerError {
    DatabaseError(diesel::result::Error),
    PoolError(PoolError),
    StorageError(StorageError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::DatabaseError(e) => write!(f, "database error: {e}"),
            ServerError::PoolError(e) => write!(f, "connection pool error: {e}"),
            ServerError::StorageError(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl Serialize for ServerError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("message", &self.to_string())?;
        map.end()
    }
}

/// Implemented by typed domain errors that map onto a client-facing status.
pub trait ApiRequestError: std::error::Error {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

#[derive(Debug)]
pub enum AppError {
    ServerError {
        error: ServerError,

        #[cfg(debug_assertions)]
        backtrace: Option<backtrace::Backtrace>,
    },
    /// The addressed resource does not exist. Carries the whole message,
    /// e.g. "Blog not found".
    NotFound(&'static str),
    ApiRequest {
        msg: String,
        status: StatusCode,
    },
    Unhandled(String),
}

impl AppError {
    fn server(error: ServerError) -> Self {
        AppError::ServerError {
            error,

            #[cfg(debug_assertions)]
            backtrace: Some(backtrace::Backtrace::new()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ServerError { .. } | AppError::Unhandled(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ApiRequest { status, .. } => *status,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,

    #[cfg(debug_assertions)]
    #[serde(skip_serializing_if = "Option::is_none")]
    debug_info: Option<HashMap<&'static str, Value>>,
}

impl ErrorResponse {
    fn fail(error: String) -> Self {
        ErrorResponse {
            message: "Fail".into(),
            error: Some(error),
            #[cfg(debug_assertions)]
            debug_info: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        let error_response = match self {
            AppError::ServerError {
                error,
                #[cfg(debug_assertions)]
                backtrace,
            } => {
                tracing::error!(%error, "request failed with a server error");

                #[cfg(debug_assertions)]
                {
                    let frames_info = backtrace
                        .as_ref()
                        .map(filter_backtrace)
                        .unwrap_or_default();
                    ErrorResponse {
                        debug_info: Some(HashMap::from([
                            (
                                "backtrace",
                                serde_json::to_value(&frames_info).unwrap_or_default(),
                            ),
                            ("error", serde_json::to_value(&error).unwrap_or_default()),
                        ])),
                        ..ErrorResponse::fail(error.to_string())
                    }
                }

                #[cfg(not(debug_assertions))]
                {
                    let _ = error;
                    ErrorResponse::fail("Internal server error".into())
                }
            }
            AppError::NotFound(msg) => ErrorResponse {
                message: msg.into(),
                error: None,
                #[cfg(debug_assertions)]
                debug_info: None,
            },
            AppError::ApiRequest { msg, .. } => ErrorResponse::fail(msg),
            AppError::Unhandled(e) => {
                tracing::error!(error = %e, "unhandled error");
                ErrorResponse::fail(e)
            }
        };

        (status_code, Json(error_response)).into_response()
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => AppError::NotFound("Record not found"),
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info) => {
                let msg = match info.constraint_name() {
                    Some("blogs_slug_key") => "A blog with this slug already exists",
                    Some("categories_name_key") => "A category with this name already exists",
                    Some("admins_email_key") => "An admin with this email already exists",
                    _ => "Duplicate value",
                };
                AppError::ApiRequest {
                    msg: msg.into(),
                    status: StatusCode::CONFLICT,
                }
            }
            diesel::result::Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                AppError::ApiRequest {
                    msg: "Referenced record does not exist".into(),
                    status: StatusCode::BAD_REQUEST,
                }
            }
            // only client-supplied search patterns reach a regex operator
            diesel::result::Error::DatabaseError(_, ref info)
                if info.message().starts_with("invalid regular expression") =>
            {
                AppError::ApiRequest {
                    msg: format!("Invalid search pattern: {}", info.message()),
                    status: StatusCode::BAD_REQUEST,
                }
            }
            e => AppError::server(ServerError::DatabaseError(e)),
        }
    }
}

impl From<PoolError> for AppError {
    fn from(e: PoolError) -> Self {
        AppError::server(ServerError::PoolError(e))
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::UnsupportedContentType(_) => AppError::ApiRequest {
                msg: e.to_string(),
                status: StatusCode::BAD_REQUEST,
            },
            e => AppError::server(ServerError::StorageError(e)),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        AppError::ApiRequest {
            msg: e.body_text(),
            status: e.status(),
        }
    }
}

impl<E: ApiRequestError> From<E> for AppError {
    fn from(e: E) -> Self {
        AppError::ApiRequest {
            msg: e.to_string(),
            status: e.status_code(),
        }
    }
}

impl From<&'static str> for AppError {
    fn from(e: &'static str) -> Self {
        AppError::Unhandled(e.into())
    }
}

impl From<String> for AppError {
    fn from(e: String) -> Self {
        AppError::Unhandled(e)
    }
}

impl From<(&'static str, StatusCode)> for AppError {
    fn from((msg, status): (&'static str, StatusCode)) -> Self {
        AppError::ApiRequest {
            msg: msg.into(),
            status,
        }
    }
}

impl From<(String, StatusCode)> for AppError {
    fn from((msg, status): (String, StatusCode)) -> Self {
        AppError::ApiRequest { msg, status }
    }
}

#[cfg(debug_assertions)]
#[derive(Serialize, Debug)]
struct FrameInfo {
    name: String,
    loc: String,
}

#[cfg(debug_assertions)]
fn filter_backtrace(backtrace: &backtrace::Backtrace) -> Vec<FrameInfo> {
    const MODULE_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::");
    let mut frames_info: Vec<FrameInfo> = Vec::new();

    for frame in backtrace.frames() {
        for symbol in frame.symbols() {
            if let (Some(name), Some(filename), Some(lineno)) = (
                symbol.name().map(|n| n.to_string()),
                symbol.filename().map(|f| f.to_owned()),
                symbol.lineno(),
            ) {
                if name.contains(MODULE_PREFIX) {
                    frames_info.push(FrameInfo {
                        name,
                        loc: format!("{}:{}", filename.to_string_lossy(), lineno),
                    });
                }
            }
        }
    }

    frames_info
}
