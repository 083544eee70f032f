use std::time::Instant;

use anyhow::Context;
use metrics::{counter, histogram};
use parking_lot::Mutex;
use rusqlite::OptionalExtension;
use serde::de::DeserializeOwned;
use serde::Serialize;
use strata_core::{ConfigurationProperties, DataSourceMap, RuleConfiguration};
use tracing::debug;

use crate::{keys, MetaDataPersistService, PersistError, PersistResult};

/// SQLite-backed key/value repository. Values are JSON; keys mirror registry paths.
pub struct SqliteMetaDataStore {
    db: Mutex<rusqlite::Connection>,
}

impl SqliteMetaDataStore {
    pub fn open_default() -> PersistResult<Self> {
        let path = std::env::var("STRATA_DB_PATH").unwrap_or_else(|_| default_db_path());
        Self::open(&path)
    }

    pub fn open(path: &str) -> PersistResult<Self> {
        let started = Instant::now();
        let db = rusqlite::Connection::open(path).with_context(|| format!("opening sqlite db at {}", path))?;
        db.pragma_update(None, "journal_mode", "WAL").ok();
        db.pragma_update(None, "synchronous", "NORMAL").ok();
        db.execute(
            "CREATE TABLE IF NOT EXISTS metadata (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .context("creating metadata table")?;
        histogram!("persist_open_ms", started.elapsed().as_secs_f64() * 1000.0);
        Ok(Self { db: Mutex::new(db) })
    }

    fn get_raw(&self, key: &str) -> PersistResult<Option<String>> {
        let db = self.db.lock();
        let v = db
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| row.get::<_, String>(0))
            .optional()
            .with_context(|| format!("reading {}", key))?;
        Ok(v)
    }

    fn get<T: DeserializeOwned + Default>(&self, key: &str) -> PersistResult<T> {
        let started = Instant::now();
        let out = match self.get_raw(key)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| PersistError::Decode { key: key.to_string(), reason: e.to_string() })?,
            None => T::default(),
        };
        histogram!("persist_load_ms", started.elapsed().as_secs_f64() * 1000.0);
        Ok(out)
    }

    fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> PersistResult<()> {
        let started = Instant::now();
        let raw = serde_json::to_string(value).map_err(|e| PersistError::Decode { key: key.to_string(), reason: e.to_string() })?;
        let db = self.db.lock();
        db.execute(
            "INSERT INTO metadata(key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, &raw),
        )
        .with_context(|| format!("writing {}", key))?;
        histogram!("persist_put_ms", started.elapsed().as_secs_f64() * 1000.0);
        counter!("persist_put_total", 1u64);
        debug!(key = %key, bytes = raw.len(), "persist: put");
        Ok(())
    }
}

impl MetaDataPersistService for SqliteMetaDataStore {
    fn load_schema_names(&self) -> PersistResult<Vec<String>> {
        let db = self.db.lock();
        let mut stmt = db
            .prepare("SELECT key FROM metadata WHERE key LIKE '/metadata/%' AND key NOT LIKE '/metadata/%/%' ORDER BY key")
            .context("preparing schema listing")?;
        let mut rows = stmt.query([]).context("listing schemas")?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().context("listing schemas")? {
            let key: String = row.get(0).context("reading schema key")?;
            if let Some(name) = key.strip_prefix("/metadata/") {
                out.push(name.to_string());
            }
        }
        Ok(out)
    }

    fn load_data_sources(&self, schema: &str) -> PersistResult<DataSourceMap> { self.get(&keys::data_sources(schema)) }

    fn load_schema_rules(&self, schema: &str) -> PersistResult<Vec<RuleConfiguration>> { self.get(&keys::rules(schema)) }

    fn load_global_rules(&self) -> PersistResult<Vec<RuleConfiguration>> { self.get(keys::GLOBAL_RULES) }

    fn load_properties(&self) -> PersistResult<ConfigurationProperties> { self.get(keys::PROPS) }

    fn persist_data_sources(&self, schema: &str, data_sources: &DataSourceMap) -> PersistResult<()> {
        self.put(&keys::schema(schema), &true)?;
        self.put(&keys::data_sources(schema), data_sources)
    }

    fn persist_schema_rules(&self, schema: &str, rules: &[RuleConfiguration]) -> PersistResult<()> {
        self.put(&keys::schema(schema), &true)?;
        self.put(&keys::rules(schema), rules)
    }

    fn persist_global_rules(&self, rules: &[RuleConfiguration]) -> PersistResult<()> { self.put(keys::GLOBAL_RULES, rules) }

    fn persist_properties(&self, props: &ConfigurationProperties) -> PersistResult<()> { self.put(keys::PROPS, props) }

    fn drop_schema(&self, schema: &str) -> PersistResult<()> {
        let mut db = self.db.lock();
        let tx = db.transaction().context("starting drop transaction")?;
        tx.execute("DELETE FROM metadata WHERE key = ?1", [keys::schema(schema)]).context("dropping schema key")?;
        tx.execute("DELETE FROM metadata WHERE substr(key, 1, length(?1)) = ?1", [format!("{}/", keys::schema(schema))])
            .context("dropping schema children")?;
        tx.commit().context("committing drop")?;
        Ok(())
    }
}

fn default_db_path() -> String {
    if let Some(home) = std::env::var_os("HOME") {
        let mut p = std::path::PathBuf::from(home);
        p.push(".strata");
        let _ = std::fs::create_dir_all(&p);
        p.push("strata.db");
        return p.to_string_lossy().to_string();
    }
    // Fallback to current directory
    "strata.db".to_string()
}
