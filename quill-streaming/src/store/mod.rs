// File: quill-streaming/src/store/mod.rs

mod sqlite;

pub use sqlite::SqliteStatusStore;
