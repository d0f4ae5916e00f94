use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::{App, blog::models::blog::Blog, error::AppError};

#[derive(Serialize, Debug)]
pub struct BlogResponse {
    pub message: String,
    pub data: Blog,
}

pub async fn get_blog(
    State(ctx): State<App>,
    Path(key): Path<String>,
) -> Result<Json<BlogResponse>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let blog = Blog::find_by_key(&mut conn, &key)
        .await?
        .ok_or(AppError::NotFound("Blog not found"))?;

    Ok(Json(BlogResponse {
        message: format!("get blog by id {key}"),
        data: blog,
    }))
}
