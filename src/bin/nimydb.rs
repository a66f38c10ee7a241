//! Line-oriented CLI: reads one JSON query per line from stdin, writes one
//! JSON result per line to stdout. Intended for embedding behind a thin
//! wire protocol, not as the engine's only interface.

use std::io::{self, BufRead, Write};

use nimydb::query::Query;
use nimydb::{Config, Engine};
use tracing::{error, info};

fn main() -> nimydb::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = Config::default();
    info!(data_dir = %config.data_dir.display(), "starting nimydb");
    let engine = Engine::new(config)?;
    let root_password = std::env::var("NIMYDB_ROOT_PASSWORD").unwrap_or_else(|_| "root".to_string());
    engine.init_root(&root_password)?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let query: Query = match serde_json::from_str(&line) {
            Ok(query) => query,
            Err(err) => {
                error!(%err, "failed to parse query");
                writeln!(out, "{{\"error_message\":\"invalid query: {err}\"}}")?;
                continue;
            }
        };
        let result = engine.run(query);
        serde_json::to_writer(&mut out, &result).map_err(|err| nimydb::DbError::Corruption(err.to_string()))?;
        writeln!(out)?;
    }

    Ok(())
}
