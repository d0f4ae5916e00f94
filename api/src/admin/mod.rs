use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
};

use crate::{
    App,
    error::{ApiRequestError, AppError},
};

use self::models::{admin::Admin, session::AdminSession};

pub mod models;
pub mod password;
pub mod routes;

pub const COOKIE_NAME: &str = "admin_token";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum AuthenticationError {
    #[error(
        "Authentication required, but no cookie `{COOKIE_NAME}` or bearer token found in headers."
    )]
    NoToken,

    #[error("Unauthorized, the session is invalid or has expired. Please log in again.")]
    Unauthorized,
}

impl ApiRequestError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}

/// The session token of the request: the `admin_token` cookie, or else an
/// `Authorization: Bearer` header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let jar = axum_extra::extract::cookie::CookieJar::from_headers(headers);

    if let Some(cookie) = jar.get(COOKIE_NAME) {
        return Some(cookie.value().to_owned());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_owned())
        .filter(|token| !token.is_empty())
}

pub struct MaybeAdmin(pub Result<Admin, AuthenticationError>);

impl FromRequestParts<App> for MaybeAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Ok(MaybeAdmin(Err(AuthenticationError::NoToken)));
        };

        let mut conn = state.diesel.get().await?;
        let admin = AdminSession::find_admin(&mut conn, &token).await?;

        Ok(MaybeAdmin(admin.ok_or(AuthenticationError::Unauthorized)))
    }
}

pub struct AdminUser(pub Admin);

impl FromRequestParts<App> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        let MaybeAdmin(admin) = MaybeAdmin::from_request_parts(parts, state).await?;

        Ok(AdminUser(admin?))
    }
}
