pub mod db_document;
pub mod db_relational;
pub mod llm;
pub mod utils;
