use axum::{
    Json, debug_handler,
    extract::State,
    http::StatusCode,
};
use diesel_async::{AsyncConnection, scoped_futures::ScopedFutureExt};

use crate::{
    App,
    admin::AdminUser,
    blog::models::{blog::Blog, category::Category},
    error::AppError,
};

use super::{BlogForm, discard_upload, get::BlogResponse};

#[debug_handler]
pub async fn create_blog(
    State(ctx): State<App>,
    AdminUser(admin): AdminUser,
    mut form: BlogForm,
) -> Result<(StatusCode, Json<BlogResponse>), AppError> {
    let upload = form.upload.take();
    let mut new_blog = form.into_new_blog()?;

    let mut conn = ctx.diesel.get().await?;

    if let Some(upload) = upload {
        new_blog.image_cover = Some(upload.store(ctx.storage.as_ref()).await?);
    }
    let stored_cover = new_blog.image_cover.clone();

    // the blog and its category membership are written together or not at all
    let result = conn
        .transaction::<_, AppError, _>(|conn| {
            async move {
                if let Some(category_id) = &new_blog.category_id {
                    if !Category::exists(conn, category_id).await? {
                        return Err(("Category not found", StatusCode::BAD_REQUEST).into());
                    }
                }

                let blog = Blog::insert(conn, &new_blog).await?;

                if let Some(category_id) = &blog.category_id {
                    Category::add_blog(conn, category_id, &blog.id).await?;
                }

                Ok(blog)
            }
            .scope_boxed()
        })
        .await;

    let blog = match result {
        Ok(blog) => blog,
        Err(e) => {
            if let Some(location) = &stored_cover {
                discard_upload(ctx.storage.as_ref(), location).await;
            }
            return Err(e);
        }
    };

    tracing::info!(
        blog_id = %blog.id,
        slug = %blog.slug,
        category_id = ?blog.category_id,
        admin_id = admin.id,
        "blog created"
    );

    Ok((
        StatusCode::CREATED,
        Json(BlogResponse {
            message: "success".into(),
            data: blog,
        }),
    ))
}
