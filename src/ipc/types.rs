use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::Deserialize;

use crate::catalog::Catalog;
use crate::db;
use crate::error::AssistError;
use crate::roster::{self, MemoryRosterStore, Roster, RosterStore, SqliteRosterStore};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub catalog: Catalog,
    pub memory_roster: MemoryRosterStore,
}

impl AppState {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            workspace: None,
            db: None,
            catalog,
            memory_roster: MemoryRosterStore::default(),
        }
    }

    pub fn select_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        let conn = db::open_db(path)?;
        self.workspace = Some(path.to_path_buf());
        self.db = Some(conn);
        tracing::info!(workspace = %path.to_string_lossy(), "workspace selected");
        Ok(())
    }

    /// Workspace roster when a workspace is open, otherwise the session one.
    pub fn load_roster(&self) -> Roster {
        match self.db.as_ref() {
            Some(conn) => roster::load_or_default(&SqliteRosterStore::new(conn)),
            None => roster::load_or_default(&self.memory_roster),
        }
    }

    /// Roster for a load, mutate, save cycle. A failed load is an error here
    /// so the save can never replace rows that were not read.
    pub fn load_roster_for_update(&self) -> Result<Roster, AssistError> {
        let res = match self.db.as_ref() {
            Some(conn) => SqliteRosterStore::new(conn).load(),
            None => self.memory_roster.load(),
        };
        res.map_err(|e| {
            tracing::warn!("roster not loaded for update: {e}");
            e
        })
    }

    /// Returns whether the roster reached storage. Failures are logged only.
    pub fn save_roster(&mut self, roster: &Roster) -> bool {
        let res = match self.db.as_ref() {
            Some(conn) => SqliteRosterStore::new(conn).save(roster),
            None => self.memory_roster.save(roster),
        };
        match res {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("roster not saved: {e}");
                false
            }
        }
    }
}
