pub mod context;
pub mod query;
