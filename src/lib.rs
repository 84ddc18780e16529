pub mod cache;
pub mod config;
pub mod crawler;
pub mod extractor;
pub mod fetcher;
pub mod images;
pub mod models;
pub mod parser;
pub mod storage;
pub mod trigger;
pub mod tui;
