/*!
 * SQLite connection for the persistent term cache.
 *
 * One connection per cache store, shared behind a mutex. Every query runs on
 * tokio's blocking pool so cache lookups never stall the routing tasks.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::schema;

const APP_DIR: &str = "termroute";
const CACHE_FILE: &str = "term_cache.db";

/// How long a writer waits on another process holding the database lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle to the term cache database
#[derive(Clone, Debug)]
pub struct DatabaseConnection {
    location: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl DatabaseConnection {
    /// Open the cache database in the user data directory
    pub fn new_default() -> Result<Self> {
        Self::new(Self::default_database_path()?)
    }

    /// Open or create the cache database at `db_path`, migrating it if needed
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let location = db_path.as_ref().to_path_buf();
        if let Some(dir) = location.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).with_context(|| format!("Cannot create cache directory {:?}", dir))?;
        }

        let conn = Connection::open(&location).with_context(|| format!("Cannot open term cache at {:?}", location))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        info!("Term cache database: {:?}", location);

        Self::prepare(conn, location)
    }

    /// Private database that lives as long as the handle
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Cannot open in-memory term cache")?;
        debug!("Opened in-memory term cache database");
        Self::prepare(conn, PathBuf::from(":memory:"))
    }

    fn prepare(conn: Connection, location: PathBuf) -> Result<Self> {
        schema::initialize_schema(&conn)?;
        Ok(Self {
            location,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// `<data dir>/termroute/term_cache.db`
    pub fn default_database_path() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .context("No user data directory on this platform")?;
        Ok(data_dir.join(APP_DIR).join(CACHE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.location
    }

    /// Run `f` against the connection on the blocking pool
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || f(&connection.lock()))
            .await
            .context("Term cache query was aborted")?
    }
}
