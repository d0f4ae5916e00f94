use std::ops::Add;

use base64::Engine;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::schema::{admin_sessions, admins};

use super::admin::Admin;

pub const TOKEN_PREFIX: &str = "adm_";

#[derive(Queryable, Selectable, Identifiable, Debug)]
#[diesel(table_name = crate::schema::admin_sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AdminSession {
    pub id: i32,
    pub token: String,
    pub active: bool,
    pub issued_at: chrono::NaiveDateTime,
    pub expires_at: chrono::NaiveDateTime,
    pub admin_id: i32,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::admin_sessions)]
pub struct NewAdminSession {
    pub token: String,
    pub active: bool,
    pub issued_at: chrono::NaiveDateTime,
    pub expires_at: chrono::NaiveDateTime,
    pub admin_id: i32,
}

impl AdminSession {
    pub fn new_for_admin(admin_id: i32, ttl_days: i64) -> NewAdminSession {
        let session_bytes: [u8; 32] = rand::random();
        let token = TOKEN_PREFIX.to_owned()
            + &base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(session_bytes);

        let now = chrono::Utc::now().naive_utc();

        NewAdminSession {
            token,
            active: true,
            issued_at: now,
            expires_at: now.add(chrono::Duration::try_days(ttl_days).unwrap_or_else(|| {
                tracing::error!("Could not convert {ttl_days} to days, using one day");
                chrono::Duration::days(1)
            })),
            admin_id,
        }
    }

    pub async fn insert(
        conn: &mut AsyncPgConnection,
        new_session: &NewAdminSession,
    ) -> QueryResult<AdminSession> {
        diesel::insert_into(admin_sessions::table)
            .values(new_session)
            .returning(AdminSession::as_returning())
            .get_result(conn)
            .await
    }

    /// The admin owning an active, unexpired session with this token.
    pub async fn find_admin(
        conn: &mut AsyncPgConnection,
        token: &str,
    ) -> QueryResult<Option<Admin>> {
        admin_sessions::table
            .inner_join(admins::table)
            .filter(admin_sessions::token.eq(token))
            .filter(admin_sessions::active.eq(true))
            .filter(admin_sessions::expires_at.gt(diesel::dsl::now))
            .filter(admin_sessions::issued_at.le(diesel::dsl::now))
            .select(Admin::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn deactivate(conn: &mut AsyncPgConnection, token: &str) -> QueryResult<usize> {
        diesel::update(
            admin_sessions::table
                .filter(admin_sessions::token.eq(token))
                .filter(admin_sessions::active.eq(true)),
        )
            .set((
                admin_sessions::active.eq(false),
                admin_sessions::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_has_prefixed_unique_token() {
        let a = AdminSession::new_for_admin(1, 30);
        let b = AdminSession::new_for_admin(1, 30);

        assert!(a.token.starts_with(TOKEN_PREFIX));
        assert_eq!(a.token.len(), TOKEN_PREFIX.len() + 43);
        assert_ne!(a.token, b.token);
        assert!(a.active);
    }

    #[test]
    fn session_expires_after_ttl() {
        let session = AdminSession::new_for_admin(7, 30);
        assert_eq!(session.expires_at - session.issued_at, chrono::Duration::days(30));
        assert_eq!(session.admin_id, 7);
    }
}
