pub mod analyzer;
pub mod api;
pub mod cache;
pub mod config;
pub mod crawl_client;
pub mod data_models;
pub mod error;
pub mod extractor;
pub mod search_client;
pub mod tools;
