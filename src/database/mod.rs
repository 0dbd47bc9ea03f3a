pub mod identifier;
pub mod manager;
pub mod models;
pub mod query_builder;
pub mod repository;
pub mod schema;
