#![forbid(unsafe_code)]

pub mod progress_table;
pub mod repository;
pub mod sqlite;
