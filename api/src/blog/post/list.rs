use std::collections::{HashMap, HashSet};

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::{
    App,
    blog::models::{
        blog::{Blog, BlogFilter, PopulatedBlog},
        category::{Category, CategorySummary, CategoryWithBlogs},
    },
    error::AppError,
};

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 100;

/// Raw listing parameters. They are kept as strings so that a malformed
/// number falls back to its default instead of rejecting the request.
#[derive(Deserialize, Debug, Default)]
pub struct Queries {
    page: Option<String>,
    limit: Option<String>,
    search: Option<String>,
    category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        Pagination {
            page: coerce_positive(page).unwrap_or(DEFAULT_PAGE),
            limit: coerce_positive(limit).unwrap_or(DEFAULT_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, count: i64) -> i64 {
        if count <= 0 {
            return 0;
        }
        (count - 1) / self.limit + 1
    }
}

/// Numeric coercion of a query value: anything that is not a number of at
/// least one is rejected, fractions are truncated.
fn coerce_positive(raw: Option<&str>) -> Option<i64> {
    raw.map(str::trim)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .map(f64::trunc)
        .filter(|n| *n >= 1.0)
        .map(|n| n as i64)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BlogPage {
    pub data: Vec<PopulatedBlog>,
    pub categories: Vec<CategoryWithBlogs>,
    pub total_pages: i64,
}

pub async fn list_blogs(
    State(ctx): State<App>,
    Query(q): Query<Queries>,
) -> Result<Json<BlogPage>, AppError> {
    let pagination = Pagination::from_raw(q.page.as_deref(), q.limit.as_deref());
    let filter = BlogFilter {
        search: non_blank(q.search),
        category: non_blank(q.category),
    };

    let mut conn = ctx.diesel.get().await?;

    let blogs = Blog::page(&mut conn, &filter, pagination.offset(), pagination.limit).await?;

    let category_ids: HashSet<String> = blogs
        .iter()
        .filter_map(|blog| blog.category_id.clone())
        .collect();
    let summaries: HashMap<String, CategorySummary> =
        Category::summaries(&mut conn, category_ids.into_iter().collect()).await?;

    let data = blogs
        .into_iter()
        .map(|blog| {
            let category = blog
                .category_id
                .as_ref()
                .and_then(|id| summaries.get(id).cloned());
            PopulatedBlog::new(blog, category)
        })
        .collect();

    let categories = Category::all_with_blogs(&mut conn).await?;
    let count = Blog::count(&mut conn, &filter).await?;

    tracing::debug!(
        page = pagination.page,
        limit = pagination.limit,
        search = ?filter.search,
        category = ?filter.category,
        count,
        "listed blogs"
    );

    Ok(Json(BlogPage {
        data,
        categories,
        total_pages: pagination.total_pages(count),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_absent_or_malformed() {
        let defaults = Pagination { page: 1, limit: 100 };
        assert_eq!(Pagination::from_raw(None, None), defaults);
        assert_eq!(Pagination::from_raw(Some("abc"), Some("")), defaults);
        assert_eq!(Pagination::from_raw(Some("0"), Some("0")), defaults);
        assert_eq!(Pagination::from_raw(Some("-3"), Some("NaN")), defaults);
    }

    #[test]
    fn numbers_are_coerced() {
        assert_eq!(
            Pagination::from_raw(Some(" 3 "), Some("20")),
            Pagination { page: 3, limit: 20 }
        );
        assert_eq!(
            Pagination::from_raw(Some("2.9"), Some("1e1")),
            Pagination { page: 2, limit: 10 }
        );
    }

    #[test]
    fn offset_skips_previous_pages() {
        assert_eq!(Pagination { page: 1, limit: 100 }.offset(), 0);
        assert_eq!(Pagination { page: 3, limit: 20 }.offset(), 40);
        assert_eq!(
            Pagination { page: i64::MAX, limit: i64::MAX }.offset(),
            i64::MAX
        );
    }

    #[test]
    fn total_pages_rounds_up() {
        let p = Pagination { page: 1, limit: 10 };
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(1), 1);
        assert_eq!(p.total_pages(10), 1);
        assert_eq!(p.total_pages(11), 2);
        assert_eq!(Pagination { page: 1, limit: 2 }.total_pages(5), 3);
        assert_eq!(Pagination { page: 1, limit: 100 }.total_pages(100), 1);
    }

    #[test]
    fn blank_filters_are_dropped() {
        assert_eq!(non_blank(Some("".into())), None);
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some("rust".into())).as_deref(), Some("rust"));
    }
}
