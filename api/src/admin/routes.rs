use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::{CookieJar, cookie::Cookie};
use diesel::sql_types::BigInt;
use diesel_async::{AsyncConnection, RunQueryDsl, scoped_futures::ScopedFutureExt};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    App,
    config::Env,
    error::AppError,
    json::JsonBody,
};

use super::{
    AdminUser, AuthenticationError, COOKIE_NAME, MaybeAdmin,
    models::{
        admin::{Admin, NewAdmin},
        session::AdminSession,
    },
    password::{hash_password, verify_password},
    session_token,
};

const MIN_PASSWORD_LEN: usize = 8;

pub fn route() -> Router<App> {
    // TODO rate limit login attempts per client IP
    Router::<App>::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/me", get(whoami))
}

#[derive(Serialize)]
pub struct Envelope<T: Serialize> {
    message: &'static str,
    data: T,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    name: Option<String>,
    email: String,
    password: String,
}

impl RegisterRequest {
    fn validate(&mut self) -> Result<(), &'static str> {
        self.email = self.email.trim().to_lowercase();
        if self.email.is_empty() || !self.email.contains('@') {
            return Err("Invalid email");
        }

        if self.email.len() > 254 {
            return Err("Email too long");
        }

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err("Password must be at least 8 characters");
        }

        if let Some(name) = self.name.take() {
            let name = name.trim().to_string();
            if name.len() > 100 {
                return Err("Name too long");
            }
            self.name = (!name.is_empty()).then_some(name);
        }

        Ok(())
    }
}

/// Transaction-scoped advisory lock key; registrations hold it from the
/// bootstrap check until the insert.
const REGISTRATION_LOCK: i64 = 7_264_001;

/// Whether a registration may proceed. Open while there are no admins yet,
/// afterwards only an authenticated admin can add another.
fn registration_allowed(
    admins_exist: bool,
    current: Result<Admin, AuthenticationError>,
) -> Result<Option<Admin>, AuthenticationError> {
    if admins_exist {
        current.map(Some)
    } else {
        Ok(None)
    }
}

#[axum::debug_handler]
pub async fn register(
    State(ctx): State<App>,
    MaybeAdmin(current): MaybeAdmin,
    JsonBody(mut req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate().map_err(|e| (e, StatusCode::BAD_REQUEST))?;

    let password_hash = hash_password(&req.password)?;
    let new_admin = NewAdmin {
        email: req.email,
        name: req.name,
        password_hash,
    };

    let mut conn = ctx.diesel.get().await?;

    let admin = conn
        .transaction::<_, AppError, _>(|conn| {
            async move {
                diesel::sql_query("SELECT pg_advisory_xact_lock($1)")
                    .bind::<BigInt, _>(REGISTRATION_LOCK)
                    .execute(conn)
                    .await?;

                let admins_exist = Admin::any_exists(conn).await?;
                if let Some(current) = registration_allowed(admins_exist, current)? {
                    tracing::info!(admin_id = current.id, "admin is registering another admin");
                }

                Ok(Admin::insert(conn, &new_admin).await?)
            }
            .scope_boxed()
        })
        .await?;

    tracing::info!(admin_id = admin.id, "admin registered");

    Ok((
        StatusCode::CREATED,
        Json(Envelope {
            message: "success",
            data: admin,
        }),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    admin: Admin,
    token: String,
}

#[axum::debug_handler]
pub async fn login(
    State(ctx): State<App>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    const INVALID_CREDENTIALS: (&str, StatusCode) =
        ("Invalid email or password", StatusCode::UNAUTHORIZED);

    let email = req.email.trim().to_lowercase();

    let mut conn = ctx.diesel.get().await?;

    let Some(admin) = Admin::find_by_email(&mut conn, &email).await? else {
        tracing::info!("login attempt for unknown admin email");
        return Err(INVALID_CREDENTIALS.into());
    };

    if !verify_password(&req.password, &admin.password_hash)? {
        tracing::info!(admin_id = admin.id, "login attempt with wrong password");
        return Err(INVALID_CREDENTIALS.into());
    }

    let session = AdminSession::insert(
        &mut conn,
        &AdminSession::new_for_admin(admin.id, ctx.config.session_ttl_days),
    )
    .await?;

    tracing::info!(admin_id = admin.id, session_id = session.id, "admin logged in");

    let max_age = (session.expires_at - session.issued_at).num_seconds();
    let auth_cookie = Cookie::build((COOKIE_NAME, session.token.clone()))
        .secure(ctx.config.env != Env::Dev)
        .http_only(true)
        .max_age(Duration::seconds(max_age))
        .path("/");

    Ok((
        CookieJar::new().add(auth_cookie),
        Json(Envelope {
            message: "success",
            data: LoginResponse {
                admin,
                token: session.token,
            },
        }),
    ))
}

#[axum::debug_handler]
pub async fn logout(
    State(ctx): State<App>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let token = session_token(&headers).ok_or(AuthenticationError::NoToken)?;

    let mut conn = ctx.diesel.get().await?;
    if AdminSession::deactivate(&mut conn, &token).await? == 0 {
        return Err(AuthenticationError::Unauthorized.into());
    }

    let auth_cookie = Cookie::build(COOKIE_NAME)
        .secure(ctx.config.env != Env::Dev)
        .http_only(true)
        .max_age(Duration::ZERO)
        .path("/");

    Ok((
        CookieJar::new().add(auth_cookie),
        Json(serde_json::json!({ "message": "Logged out" })),
    ))
}

pub async fn whoami(AdminUser(admin): AdminUser) -> Json<Envelope<Admin>> {
    Json(Envelope {
        message: "success",
        data: admin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, password: &str, name: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            name: name.map(str::to_owned),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn registration_normalizes_email_and_name() {
        let mut req = request("  Editor@Example.COM ", "long enough", Some("  Ed  "));
        req.validate().unwrap();
        assert_eq!(req.email, "editor@example.com");
        assert_eq!(req.name.as_deref(), Some("Ed"));

        let mut req = request("editor@example.com", "long enough", Some("   "));
        req.validate().unwrap();
        assert_eq!(req.name, None);
    }

    #[test]
    fn registration_rejects_bad_input() {
        assert_eq!(
            request("not-an-email", "long enough", None).validate(),
            Err("Invalid email")
        );
        assert_eq!(
            request("editor@example.com", "short", None).validate(),
            Err("Password must be at least 8 characters")
        );
    }

    #[test]
    fn registration_is_open_only_until_an_admin_exists() {
        let now = chrono::Utc::now().naive_utc();
        let admin = Admin {
            id: 1,
            email: "first@example.com".into(),
            name: None,
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        };

        assert_eq!(
            registration_allowed(false, Err(AuthenticationError::NoToken)).map(|a| a.is_none()),
            Ok(true)
        );
        assert_eq!(
            registration_allowed(true, Err(AuthenticationError::NoToken)).map(|_| ()),
            Err(AuthenticationError::NoToken)
        );
        assert_eq!(
            registration_allowed(true, Ok(admin)).map(|a| a.map(|a| a.id)),
            Ok(Some(1))
        );
    }
}
