use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
};
use diesel_async::{AsyncConnection, scoped_futures::ScopedFutureExt};
use serde_json::{Value, json};

use crate::{
    App,
    admin::AdminUser,
    blog::models::{blog::Blog, category::Category},
    error::AppError,
};

use super::{BlogForm, discard_upload, resolve_image_cover};

/// Partially updates a blog found by id or slug. Only a confirmation is
/// returned, not the updated record.
#[debug_handler]
pub async fn update_blog(
    State(ctx): State<App>,
    Path(key): Path<String>,
    AdminUser(admin): AdminUser,
    mut form: BlogForm,
) -> Result<Json<Value>, AppError> {
    let upload = form.upload.take();
    let submitted_cover = form.image_cover.take();
    let mut changes = form.into_changes()?;

    let mut conn = ctx.diesel.get().await?;

    let blog = Blog::find_by_key(&mut conn, &key)
        .await?
        .ok_or(AppError::NotFound("Blog not found"))?;

    let uploaded = match upload {
        Some(upload) => Some(upload.store(ctx.storage.as_ref()).await?),
        None => None,
    };
    changes.image_cover = resolve_image_cover(
        uploaded.clone(),
        submitted_cover.as_ref(),
        blog.image_cover.clone(),
    );

    // `Some(None)` when the category is cleared
    let category_change = changes
        .category_id
        .clone()
        .filter(|new| *new != blog.category_id);

    let result = conn
        .transaction::<_, AppError, _>(|conn| {
            async move {
                if let Some(new_category) = &category_change {
                    if let Some(new_category) = new_category {
                        if !Category::exists(conn, new_category).await? {
                            return Err(("Category not found", StatusCode::BAD_REQUEST).into());
                        }
                    }

                    if let Some(old_category) = &blog.category_id {
                        Category::remove_blog(conn, old_category, &blog.id).await?;
                    }
                    if let Some(new_category) = new_category {
                        Category::add_blog(conn, new_category, &blog.id).await?;
                    }
                }

                Ok(Blog::update(conn, &blog.id, &changes).await?)
            }
            .scope_boxed()
        })
        .await;

    let updated = match result {
        Ok(updated) => updated,
        Err(e) => {
            if let Some(location) = &uploaded {
                discard_upload(ctx.storage.as_ref(), location).await;
            }
            return Err(e);
        }
    };

    tracing::info!(
        blog_id = %updated.id,
        slug = %updated.slug,
        admin_id = admin.id,
        "blog updated"
    );

    Ok(Json(json!({ "message": format!("Blog updated {key}") })))
}
