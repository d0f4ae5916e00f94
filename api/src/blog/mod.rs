pub mod category;
pub mod models;
pub mod post;
pub mod routes;
