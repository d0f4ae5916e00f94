use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    App,
    admin::AdminUser,
    blog::models::category::{Category, CategoryWithBlogs, NewCategory},
    error::AppError,
    json::JsonBody,
    utils::new_object_id,
};

#[derive(Serialize, Debug)]
pub struct CategoryList {
    data: Vec<CategoryWithBlogs>,
}

pub async fn list_categories(State(ctx): State<App>) -> Result<Json<CategoryList>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    Ok(Json(CategoryList {
        data: Category::all_with_blogs(&mut conn).await?,
    }))
}

#[derive(Serialize, Debug)]
pub struct CategoryResponse<T: Serialize> {
    message: String,
    data: T,
}

pub async fn get_category(
    State(ctx): State<App>,
    Path(id): Path<String>,
) -> Result<Json<CategoryResponse<CategoryWithBlogs>>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let category = Category::find_with_blogs(&mut conn, &id)
        .await?
        .ok_or(AppError::NotFound("Category not found"))?;

    Ok(Json(CategoryResponse {
        message: format!("get category by id {id}"),
        data: category,
    }))
}

#[derive(Deserialize)]
pub struct CategorySubmission {
    name: String,
}

impl CategorySubmission {
    fn validate(&mut self) -> Result<(), &'static str> {
        self.name = self.name.trim().to_string();

        if self.name.is_empty() {
            return Err("No category name provided");
        }

        if self.name.len() > 100 {
            return Err("Category name too long");
        }

        Ok(())
    }
}

#[debug_handler]
pub async fn create_category(
    State(ctx): State<App>,
    AdminUser(admin): AdminUser,
    JsonBody(mut submission): JsonBody<CategorySubmission>,
) -> Result<(StatusCode, Json<CategoryResponse<CategoryWithBlogs>>), AppError> {
    submission
        .validate()
        .map_err(|e| (e, StatusCode::BAD_REQUEST))?;

    let mut conn = ctx.diesel.get().await?;

    let category = Category::insert(
        &mut conn,
        &NewCategory {
            id: new_object_id(),
            name: submission.name,
        },
    )
    .await?;

    tracing::info!(category_id = %category.id, admin_id = admin.id, "category created");

    Ok((
        StatusCode::CREATED,
        Json(CategoryResponse {
            message: "success".into(),
            data: CategoryWithBlogs {
                category,
                blogs: vec![],
            },
        }),
    ))
}

/// Deletes a category. Its blogs stay, with their category cleared.
#[debug_handler]
pub async fn delete_category(
    State(ctx): State<App>,
    Path(id): Path<String>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Value>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let deleted = Category::delete(&mut conn, &id)
        .await?
        .ok_or(AppError::NotFound("Category not found"))?;

    tracing::info!(category_id = %deleted.id, admin_id = admin.id, "category deleted");

    Ok(Json(json!({ "message": format!("Category deleted {id}") })))
}
