pub mod catalog;
pub mod column;
pub mod schema;

pub use catalog::Catalog;
pub use column::Column;
pub use schema::Schema;
