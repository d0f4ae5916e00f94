use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;

use crate::schema::{categories, category_blogs};

#[derive(Queryable, Selectable, Identifiable, Debug, Serialize, Clone)]
#[diesel(table_name = crate::schema::categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::categories)]
pub struct NewCategory {
    pub id: String,
    pub name: String,
}

/// A category together with the set of blogs filed under it.
#[derive(Debug, Serialize)]
pub struct CategoryWithBlogs {
    #[serde(flatten)]
    pub category: Category,
    pub blogs: Vec<String>,
}

/// What a populated blog shows of its category.
#[derive(Queryable, Selectable, Debug, Serialize, Clone, PartialEq)]
#[diesel(table_name = crate::schema::categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CategorySummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

impl Category {
    pub async fn exists(conn: &mut AsyncPgConnection, id: &str) -> QueryResult<bool> {
        diesel::select(diesel::dsl::exists(categories::table.find(id)))
            .get_result(conn)
            .await
    }

    pub async fn insert(
        conn: &mut AsyncPgConnection,
        new_category: &NewCategory,
    ) -> QueryResult<Category> {
        diesel::insert_into(categories::table)
            .values(new_category)
            .returning(Category::as_returning())
            .get_result(conn)
            .await
    }

    pub async fn delete(conn: &mut AsyncPgConnection, id: &str) -> QueryResult<Option<Category>> {
        diesel::delete(categories::table.find(id))
            .returning(Category::as_returning())
            .get_result(conn)
            .await
            .optional()
    }

    /// Adds the blog to the category's set. Adding a member twice is a no-op;
    /// returns whether the blog was newly added.
    pub async fn add_blog(
        conn: &mut AsyncPgConnection,
        category_id: &str,
        blog_id: &str,
    ) -> QueryResult<bool> {
        let inserted = diesel::insert_into(category_blogs::table)
            .values((
                category_blogs::category_id.eq(category_id),
                category_blogs::blog_id.eq(blog_id),
            ))
            .on_conflict_do_nothing()
            .execute(conn)
            .await?;

        Ok(inserted > 0)
    }

    pub async fn remove_blog(
        conn: &mut AsyncPgConnection,
        category_id: &str,
        blog_id: &str,
    ) -> QueryResult<bool> {
        let removed = diesel::delete(category_blogs::table.find((category_id, blog_id)))
            .execute(conn)
            .await?;

        Ok(removed > 0)
    }

    pub async fn blog_ids(conn: &mut AsyncPgConnection, id: &str) -> QueryResult<Vec<String>> {
        category_blogs::table
            .filter(category_blogs::category_id.eq(id))
            .order(category_blogs::added_at)
            .select(category_blogs::blog_id)
            .load(conn)
            .await
    }

    pub async fn find_with_blogs(
        conn: &mut AsyncPgConnection,
        id: &str,
    ) -> QueryResult<Option<CategoryWithBlogs>> {
        let category = categories::table
            .find(id)
            .select(Category::as_select())
            .first(conn)
            .await
            .optional()?;

        match category {
            Some(category) => {
                let blogs = Category::blog_ids(conn, &category.id).await?;
                Ok(Some(CategoryWithBlogs { category, blogs }))
            }
            None => Ok(None),
        }
    }

    pub async fn all_with_blogs(
        conn: &mut AsyncPgConnection,
    ) -> QueryResult<Vec<CategoryWithBlogs>> {
        let all = categories::table
            .select(Category::as_select())
            .order(categories::name)
            .load(conn)
            .await?;

        let memberships: Vec<(String, String)> = category_blogs::table
            .order(category_blogs::added_at)
            .select((category_blogs::category_id, category_blogs::blog_id))
            .load(conn)
            .await?;

        let mut sets = HashMap::<String, Vec<String>>::new();
        for (category_id, blog_id) in memberships {
            sets.entry(category_id).or_default().push(blog_id);
        }

        Ok(all
            .into_iter()
            .map(|category| {
                let blogs = sets.remove(&category.id).unwrap_or_default();
                CategoryWithBlogs { category, blogs }
            })
            .collect())
    }

    /// Fetches the summaries of the given categories keyed by id, the way a
    /// populate step resolves references.
    pub async fn summaries(
        conn: &mut AsyncPgConnection,
        ids: Vec<String>,
    ) -> QueryResult<HashMap<String, CategorySummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let found: Vec<CategorySummary> = categories::table
            .filter(categories::id.eq_any(ids))
            .select(CategorySummary::as_select())
            .load(conn)
            .await?;

        Ok(found.into_iter().map(|c| (c.id.clone(), c)).collect())
    }
}
