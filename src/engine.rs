//! Top-level handle wiring the database map, system managers, and query
//! dispatch together from a single data directory.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::fs::{FileSystem, OsFileSystem};
use crate::operation::OperationManager;
use crate::query::constants::{ON_CONNECTION, ON_LOGS, ON_USERS};
use crate::query::{Query, QueryManager, QueryResult, SystemQueryManager};
use crate::system::constants::is_system_name;
use crate::system::{bootstrap, LogManager, UserManager};

/// Tunables for a single engine instance. `search_thread_count` documents
/// the page-search batch size (`constants::SEARCH_THREAD_COUNT`); it is
/// not yet threaded through the page-search path itself.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub data_caching: bool,
    pub search_thread_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            data_caching: true,
            search_thread_count: crate::constants::SEARCH_THREAD_COUNT,
        }
    }
}

pub struct Engine {
    query_manager: QueryManager,
    system_query_manager: SystemQueryManager,
    log_manager: Arc<LogManager>,
    user_manager: Arc<UserManager>,
}

impl Engine {
    pub fn new(config: Config) -> Result<Self> {
        Self::with_fs(config, Arc::new(OsFileSystem))
    }

    pub fn with_fs(config: Config, fs: Arc<dyn FileSystem>) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let operation = Arc::new(OperationManager::new(config.data_dir, fs, config.data_caching));
        bootstrap::init_db(&operation)?;

        let log_manager = Arc::new(LogManager::new(operation.clone()));
        let user_manager = Arc::new(UserManager::new(operation.clone()));
        let query_manager = QueryManager::new(operation.clone());
        let system_query_manager = SystemQueryManager::new(log_manager.clone(), user_manager.clone());

        Ok(Self {
            query_manager,
            system_query_manager,
            log_manager,
            user_manager,
        })
    }

    /// Creates the `root` superuser account if it doesn't already exist.
    /// Callers typically run this once, on first launch.
    pub fn init_root(&self, password: &str) -> Result<()> {
        self.user_manager.init_root(password)?;
        Ok(())
    }

    /// Routes `query` to the system or ordinary dispatch table based on
    /// the database it targets, then audits mutating queries that
    /// succeeded against a non-system database.
    pub fn run(&self, query: Query) -> QueryResult {
        let is_system_query = matches!(query.on.as_str(), ON_LOGS | ON_USERS | ON_CONNECTION);
        let result = if is_system_query {
            self.system_query_manager.query(&query)
        } else {
            self.query_manager.query(&query)
        };

        if result.is_ok() && !is_system_query && is_mutating(&query.action) && !is_system_name(&query.name) {
            let _ = self.log_manager.add_log(&query);
        }
        result
    }
}

fn is_mutating(action: &str) -> bool {
    matches!(
        action,
        crate::query::constants::ACTION_CREATE | crate::query::constants::ACTION_UPDATE | crate::query::constants::ACTION_DELETE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::constants as qc;
    use crate::query::With;
    use crate::system::user::UserConnection;
    use serde_json::json;
    use std::collections::HashMap;

    fn new_engine(root: &std::path::Path) -> Engine {
        Engine::new(Config {
            data_dir: root.to_path_buf(),
            data_caching: true,
            search_thread_count: 4,
        })
        .unwrap()
    }

    #[test]
    fn create_db_blob_and_insert_round_trip_via_queries() {
        let dir = tempfile::tempdir().unwrap();
        let engine = new_engine(dir.path());

        let create_db = engine.run(Query {
            action: qc::ACTION_CREATE.to_string(),
            on: qc::ON_DB.to_string(),
            name: "shop".to_string(),
            with: With::default(),
        });
        assert!(create_db.is_ok());

        let mut format = HashMap::new();
        format.insert("name".to_string(), "string".to_string());
        let create_blob = engine.run(Query {
            action: qc::ACTION_CREATE.to_string(),
            on: qc::ON_BLOB.to_string(),
            name: "shop.customers".to_string(),
            with: With {
                format: Some(format),
                ..With::default()
            },
        });
        assert!(create_blob.is_ok());

        let mut record = serde_json::Map::new();
        record.insert("name".to_string(), json!("Ada"));
        let insert = engine.run(Query {
            action: qc::ACTION_CREATE.to_string(),
            on: qc::ON_DATA.to_string(),
            name: "shop.customers".to_string(),
            with: With {
                records: Some(vec![record]),
                ..With::default()
            },
        });
        assert!(insert.is_ok());
        assert_eq!(insert.records.unwrap().len(), 1);

        let logs = engine.run(Query {
            action: qc::ACTION_GET.to_string(),
            on: qc::ON_LOGS.to_string(),
            name: String::new(),
            with: With::default(),
        });
        assert!(logs.is_ok());
        assert!(!logs.records.unwrap().is_empty());
    }

    #[test]
    fn system_database_is_rejected_for_ordinary_blob_creation() {
        let dir = tempfile::tempdir().unwrap();
        let engine = new_engine(dir.path());
        let result = engine.run(Query {
            action: qc::ACTION_CREATE.to_string(),
            on: qc::ON_BLOB.to_string(),
            name: "sys.whatever".to_string(),
            with: With::default(),
        });
        assert_eq!(result.error_message.as_deref(), Some("cannot use system database"));
    }

    #[test]
    fn connection_query_authenticates_root() {
        let dir = tempfile::tempdir().unwrap();
        let engine = new_engine(dir.path());
        engine.init_root("hunter2").unwrap();

        let good = engine.run(Query {
            action: qc::ACTION_CREATE.to_string(),
            on: qc::ON_CONNECTION.to_string(),
            name: String::new(),
            with: With {
                user_connection: Some(UserConnection {
                    user: "root".to_string(),
                    password: "hunter2".to_string(),
                }),
                ..With::default()
            },
        });
        assert!(good.is_ok());

        let bad = engine.run(Query {
            action: qc::ACTION_CREATE.to_string(),
            on: qc::ON_CONNECTION.to_string(),
            name: String::new(),
            with: With {
                user_connection: Some(UserConnection {
                    user: "root".to_string(),
                    password: "wrong".to_string(),
                }),
                ..With::default()
            },
        });
        assert!(!bad.is_ok());
    }
}
