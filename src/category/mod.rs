//! Categories: the model, database queries and JSON endpoints.

mod core;
mod endpoints;

pub use core::{
    Category, CategoryId, CategoryKind, create_category, create_category_table, get_category,
    list_categories,
};
pub use endpoints::{create_category_endpoint, list_categories_endpoint};
