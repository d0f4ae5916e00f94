pub mod blog;
pub mod category;
