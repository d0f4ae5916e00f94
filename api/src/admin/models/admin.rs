use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;

use crate::schema::admins;

#[derive(Queryable, Selectable, Identifiable, Debug, Serialize, Clone)]
#[diesel(table_name = crate::schema::admins)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    #[serde(rename = "_id")]
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::admins)]
pub struct NewAdmin {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
}

impl Admin {
    pub async fn find_by_email(
        conn: &mut AsyncPgConnection,
        email: &str,
    ) -> QueryResult<Option<Admin>> {
        admins::table
            .filter(admins::email.eq(email))
            .select(Admin::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn any_exists(conn: &mut AsyncPgConnection) -> QueryResult<bool> {
        diesel::select(diesel::dsl::exists(admins::table.select(admins::id)))
            .get_result(conn)
            .await
    }

    pub async fn insert(conn: &mut AsyncPgConnection, new_admin: &NewAdmin) -> QueryResult<Admin> {
        diesel::insert_into(admins::table)
            .values(new_admin)
            .returning(Admin::as_returning())
            .get_result(conn)
            .await
    }
}
