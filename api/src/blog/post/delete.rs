use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde_json::{Value, json};

use crate::{
    App, admin::AdminUser, blog::models::blog::Blog, error::AppError, utils::is_object_id,
};

#[debug_handler]
pub async fn delete_blog(
    State(ctx): State<App>,
    Path(id): Path<String>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Value>, AppError> {
    // deletion is by id only, a slug never matches
    if !is_object_id(&id) {
        return Err(AppError::NotFound("Blog not found"));
    }

    let mut conn = ctx.diesel.get().await?;

    let deleted = Blog::delete(&mut conn, &id.to_ascii_lowercase())
        .await?
        .ok_or(AppError::NotFound("Blog not found"))?;

    tracing::info!(
        blog_id = %deleted.id,
        slug = %deleted.slug,
        admin_id = admin.id,
        "blog deleted"
    );

    Ok(Json(json!({ "message": format!("Blog deleted {id}") })))
}
