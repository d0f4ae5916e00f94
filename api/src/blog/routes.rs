use axum::{
    Router,
    routing::{get, post},
};

use crate::App;

use super::{
    category::{create_category, delete_category, get_category, list_categories},
    post::{
        create::create_blog, delete::delete_blog, get::get_blog, list::list_blogs,
        patch::update_blog,
    },
};

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/", get(list_blogs).post(create_blog))
        .route(
            "/{key}",
            get(get_blog)
                .patch(update_blog)
                .put(update_blog)
                .delete(delete_blog),
        )
}

pub fn category_route() -> Router<App> {
    Router::<App>::new()
        .route("/", get(list_categories))
        .route("/", post(create_category))
        .route("/{id}", get(get_category).delete(delete_category))
}
