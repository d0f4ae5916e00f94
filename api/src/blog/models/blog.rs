use chrono::NaiveDateTime;
use diesel::{dsl::AsExprOf, expression::IntoSql, pg::Pg, prelude::*, sql_types::Text};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::{schema::blogs, utils::is_object_id};

use super::category::CategorySummary;

#[derive(Queryable, Selectable, Identifiable, Debug, Serialize, Clone, PartialEq)]
#[diesel(table_name = crate::schema::blogs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub heading: String,
    pub excerpt: String,
    pub content: String,
    pub focus_keyword: String,
    pub image_cover: Option<String>,
    pub faqs: JsonValue,
    pub slug: String,
    #[serde(rename = "category", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::blogs)]
pub struct NewBlog {
    pub id: String,
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub heading: String,
    pub excerpt: String,
    pub content: String,
    pub focus_keyword: String,
    pub image_cover: Option<String>,
    pub faqs: JsonValue,
    pub slug: String,
    pub category_id: Option<String>,
}

// No `slug`: it is immutable once the blog exists.
#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::schema::blogs)]
pub struct UpdateBlog {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub heading: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub focus_keyword: Option<String>,
    pub image_cover: Option<String>,
    pub faqs: Option<JsonValue>,
    /// `Some(None)` clears the category.
    pub category_id: Option<Option<String>>,
    pub updated_at: Option<NaiveDateTime>,
}

/// A blog whose category reference has been replaced by the category itself.
#[derive(Debug, Serialize)]
pub struct PopulatedBlog {
    #[serde(flatten)]
    pub blog: Blog,
    pub category: Option<CategorySummary>,
}

impl PopulatedBlog {
    pub fn new(mut blog: Blog, category: Option<CategorySummary>) -> Self {
        // the reference is rendered through `category` below
        blog.category_id = None;
        PopulatedBlog { blog, category }
    }
}

// Postgres case-insensitive POSIX regex match
diesel::infix_operator!(MatchesRegexCi, " ~* ", backend: Pg);

fn matches_ci<C>(column: C, pattern: &str) -> MatchesRegexCi<C, AsExprOf<String, Text>>
where
    C: Expression<SqlType = Text>,
{
    MatchesRegexCi::new(column, pattern.to_owned().into_sql::<Text>())
}

/// Conditions for the blog listing. Every condition is optional.
#[derive(Debug, Default, Clone)]
pub struct BlogFilter {
    pub search: Option<String>,
    pub category: Option<String>,
}

impl BlogFilter {
    fn apply(&self, mut query: blogs::BoxedQuery<'static, Pg>) -> blogs::BoxedQuery<'static, Pg> {
        // `search` is a regular expression, matched anywhere in any of the fields
        if let Some(search) = &self.search {
            query = query.filter(
                matches_ci(blogs::title, search)
                    .or(matches_ci(blogs::description, search))
                    .or(matches_ci(blogs::keywords, search))
                    .or(matches_ci(blogs::heading, search))
                    .or(matches_ci(blogs::excerpt, search))
                    .or(matches_ci(blogs::content, search))
                    .or(matches_ci(blogs::focus_keyword, search)),
            );
        }

        if let Some(category) = &self.category {
            query = query.filter(blogs::category_id.eq(category.clone()));
        }

        query
    }
}

impl Blog {
    /// Looks a blog up by id when the key has the shape of one, by slug
    /// otherwise.
    pub async fn find_by_key(
        conn: &mut AsyncPgConnection,
        key: &str,
    ) -> QueryResult<Option<Blog>> {
        let query = blogs::table.select(Blog::as_select()).into_boxed();

        let query = if is_object_id(key) {
            query.filter(blogs::id.eq(key.to_ascii_lowercase()))
        } else {
            query.filter(blogs::slug.eq(key.to_owned()))
        };

        query.first(conn).await.optional()
    }

    pub async fn page(
        conn: &mut AsyncPgConnection,
        filter: &BlogFilter,
        offset: i64,
        limit: i64,
    ) -> QueryResult<Vec<Blog>> {
        filter
            .apply(blogs::table.into_boxed())
            .select(Blog::as_select())
            .order((blogs::created_at.desc(), blogs::id.desc()))
            .offset(offset)
            .limit(limit)
            .load(conn)
            .await
    }

    pub async fn count(conn: &mut AsyncPgConnection, filter: &BlogFilter) -> QueryResult<i64> {
        filter
            .apply(blogs::table.into_boxed())
            .count()
            .get_result(conn)
            .await
    }

    pub async fn insert(conn: &mut AsyncPgConnection, new_blog: &NewBlog) -> QueryResult<Blog> {
        diesel::insert_into(blogs::table)
            .values(new_blog)
            .returning(Blog::as_returning())
            .get_result(conn)
            .await
    }

    pub async fn update(
        conn: &mut AsyncPgConnection,
        id: &str,
        changes: &UpdateBlog,
    ) -> QueryResult<Blog> {
        diesel::update(blogs::table.find(id))
            .set(changes)
            .returning(Blog::as_returning())
            .get_result(conn)
            .await
    }

    pub async fn delete(conn: &mut AsyncPgConnection, id: &str) -> QueryResult<Option<Blog>> {
        diesel::delete(blogs::table.find(id))
            .returning(Blog::as_returning())
            .get_result(conn)
            .await
            .optional()
    }
}
