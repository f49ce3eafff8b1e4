use crate::error::{EsgError, EsgResult};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Per-workspace context handed to every command.
///
/// Holds the single store connection, opened (and migrated) on first use.
#[derive(Debug)]
pub struct EsgState {
    workspace_path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl EsgState {
    pub fn new(workspace_path: impl Into<PathBuf>) -> Self {
        Self {
            workspace_path: workspace_path.into(),
            conn: Mutex::new(None),
        }
    }

    pub fn workspace_path(&self) -> &Path {
        &self.workspace_path
    }

    pub fn workspace_str(&self) -> String {
        self.workspace_path.to_string_lossy().to_string()
    }

    /// Run `f` against the shared connection, opening it if needed.
    pub fn with_store<T, F>(&self, f: F) -> EsgResult<T>
    where
        F: FnOnce(&Connection) -> EsgResult<T>,
    {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| EsgError::Lock)?;

        if guard.is_none() {
            log::debug!("opening metric store for {}", self.workspace_path.display());
            *guard = Some(crate::commands::db::open_store(&self.workspace_path)?);
        }

        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(EsgError::NotFound("metric store".to_string())),
        }
    }

    pub fn is_open(&self) -> bool {
        self.conn.lock().map(|g| g.is_some()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_opens_lazily_and_is_reused() {
        let dir = tempfile::tempdir().expect("temp dir");
        let state = EsgState::new(dir.path());
        assert!(!state.is_open());

        state
            .with_store(|conn| {
                conn.execute("CREATE TEMP TABLE marker (x INTEGER)", [])?;
                Ok(())
            })
            .expect("first use");
        assert!(state.is_open());

        // The temp table only exists on the same connection.
        let count: i64 = state
            .with_store(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM marker", [], |r| r.get(0))?))
            .expect("second use");
        assert_eq!(count, 0);
    }
}
