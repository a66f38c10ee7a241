//! nimydb - embeddable, schema-validated JSON document store engine.

pub mod blob;
pub mod constants;
pub mod convert;
pub mod db_map;
pub mod disk;
pub mod engine;
pub mod error;
pub mod filter;
pub mod format;
pub mod fs;
pub mod maps;
pub mod operation;
pub mod query;
pub mod system;

pub use engine::{Config, Engine};
pub use error::{DbError, Result};
pub use query::{Query, QueryResult};
