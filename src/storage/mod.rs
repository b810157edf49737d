pub mod db;
pub(crate) mod documents;
pub mod error;
pub mod operations;
pub(crate) mod schema;
