//! Shared remote state contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the narrow get/upsert/subscribe/poll contract the sync layer needs.
//! - Provide a SQLite-backed store with one row per collection key.
//!
//! # Invariants
//! - `upsert` is insert-or-replace: a key never maps to more than one row.
//! - Every successful write notifies every live subscriber of the writing
//!   handle, the writer included.
//! - Writes committed through other connections to the same database file
//!   are announced by the next `poll`, once per changed key.
//! - Notifications carry no diff; receivers must reload.

use crate::db::{open_db, open_db_in_memory, DbError};
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Logical record names in the shared table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKey {
    Children,
    Dates,
}

impl CollectionKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Children => "children",
            Self::Dates => "dates",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "children" => Some(Self::Children),
            "dates" => Some(Self::Dates),
            _ => None,
        }
    }
}

impl Display for CollectionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal that some client wrote `key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeNotice {
    pub key: CollectionKey,
}

#[derive(Debug)]
pub enum RemoteError {
    Db(DbError),
    /// Store cannot serve requests (lock poisoned, backend offline, ...).
    Unavailable(String),
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Unavailable(message) => write!(f, "remote store unavailable: {message}"),
        }
    }
}

impl Error for RemoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for RemoteError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RemoteError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence collaborator shared by every client.
pub trait RemoteStore: Send + Sync {
    /// Returns the JSON text stored under `key`, if any.
    fn get(&self, key: CollectionKey) -> RemoteResult<Option<String>>;

    /// Inserts or replaces the JSON text stored under `key`.
    fn upsert(&self, key: CollectionKey, value: &str) -> RemoteResult<()>;

    /// Registers for change notifications on any key.
    fn subscribe(&self) -> Receiver<ChangeNotice>;

    /// Picks up writes made outside this handle and notifies subscribers.
    ///
    /// Backends that push every write on their own keep the default no-op.
    fn poll(&self) -> RemoteResult<()> {
        Ok(())
    }
}

/// Last observed state of the shared table on this handle's connection.
#[derive(Debug)]
struct Watermark {
    /// `PRAGMA data_version`; moves only when another connection commits.
    data_version: i64,
    revisions: HashMap<CollectionKey, i64>,
}

/// `shared_state` table store.
///
/// Lock order: `conn` before `watermark`.
pub struct SqliteRemoteStore {
    conn: Mutex<Connection>,
    watermark: Mutex<Watermark>,
    subscribers: Mutex<Vec<Sender<ChangeNotice>>>,
}

impl SqliteRemoteStore {
    /// Wraps an already migrated connection.
    ///
    /// Rows present at this point count as seen; only later writes are announced.
    pub fn new(conn: Connection) -> RemoteResult<Self> {
        let watermark = Watermark {
            data_version: data_version(&conn)?,
            revisions: read_revisions(&conn)?,
        };
        Ok(Self {
            conn: Mutex::new(conn),
            watermark: Mutex::new(watermark),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    pub fn open(path: impl AsRef<Path>) -> RemoteResult<Self> {
        Self::new(open_db(path)?)
    }

    pub fn open_in_memory() -> RemoteResult<Self> {
        Self::new(open_db_in_memory()?)
    }

    fn notify(&self, key: CollectionKey) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            error!("event=remote_notify module=sync status=error key={key} error=lock_poisoned");
            return;
        };
        // Dropped receivers are pruned here.
        subscribers.retain(|sender| sender.send(ChangeNotice { key }).is_ok());
        debug!(
            "event=remote_notify module=sync status=ok key={key} subscribers={}",
            subscribers.len()
        );
    }
}

impl RemoteStore for SqliteRemoteStore {
    fn get(&self, key: CollectionKey) -> RemoteResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| RemoteError::Unavailable("connection lock poisoned".to_string()))?;
        let value = conn
            .query_row(
                "SELECT value FROM shared_state WHERE key = ?1;",
                [key.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn upsert(&self, key: CollectionKey, value: &str) -> RemoteResult<()> {
        {
            let conn = self
                .conn
                .lock()
                .map_err(|_| RemoteError::Unavailable("connection lock poisoned".to_string()))?;
            let revision = conn.query_row(
                "INSERT INTO shared_state (key, value, updated_at)
                 VALUES (?1, ?2, strftime('%s', 'now') * 1000)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at,
                    revision = shared_state.revision + 1
                 RETURNING revision;",
                params![key.as_str(), value],
                |row| row.get::<_, i64>(0),
            )?;
            // Own commits do not move `data_version`; record the revision so
            // the next poll does not announce this write a second time.
            let mut watermark = self
                .watermark
                .lock()
                .map_err(|_| RemoteError::Unavailable("watermark lock poisoned".to_string()))?;
            watermark.revisions.insert(key, revision);
        }

        self.notify(key);
        Ok(())
    }

    fn subscribe(&self) -> Receiver<ChangeNotice> {
        let (sender, receiver) = channel();
        match self.subscribers.lock() {
            Ok(mut subscribers) => subscribers.push(sender),
            Err(_) => {
                error!("event=remote_subscribe module=sync status=error error=lock_poisoned")
            }
        }
        receiver
    }

    fn poll(&self) -> RemoteResult<()> {
        let changed = {
            let conn = self
                .conn
                .lock()
                .map_err(|_| RemoteError::Unavailable("connection lock poisoned".to_string()))?;
            let mut watermark = self
                .watermark
                .lock()
                .map_err(|_| RemoteError::Unavailable("watermark lock poisoned".to_string()))?;

            let version = data_version(&conn)?;
            if version == watermark.data_version {
                return Ok(());
            }
            let revisions = read_revisions(&conn)?;
            let changed = revisions
                .iter()
                .filter(|(key, revision)| watermark.revisions.get(*key) != Some(*revision))
                .map(|(key, _)| *key)
                .collect::<Vec<_>>();
            watermark.data_version = version;
            watermark.revisions = revisions;
            changed
        };

        debug!(
            "event=remote_poll module=sync status=ok changed_keys={}",
            changed.len()
        );
        for key in changed {
            self.notify(key);
        }
        Ok(())
    }
}

fn data_version(conn: &Connection) -> RemoteResult<i64> {
    Ok(conn.query_row("PRAGMA data_version;", [], |row| row.get(0))?)
}

fn read_revisions(conn: &Connection) -> RemoteResult<HashMap<CollectionKey, i64>> {
    let mut stmt = conn.prepare("SELECT key, revision FROM shared_state;")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut revisions = HashMap::new();
    for row in rows {
        let (raw_key, revision) = row?;
        if let Some(key) = CollectionKey::parse(&raw_key) {
            revisions.insert(key, revision);
        }
    }
    Ok(revisions)
}

#[cfg(test)]
mod tests {
    use super::{ChangeNotice, CollectionKey, RemoteStore, SqliteRemoteStore};

    fn notice(key: CollectionKey) -> ChangeNotice {
        ChangeNotice { key }
    }

    #[test]
    fn get_returns_none_before_first_write() {
        let store = SqliteRemoteStore::open_in_memory().unwrap();
        assert_eq!(store.get(CollectionKey::Children).unwrap(), None);
    }

    #[test]
    fn upsert_replaces_single_row_per_key() {
        let store = SqliteRemoteStore::open_in_memory().unwrap();
        store.upsert(CollectionKey::Dates, "[\"2026-10-19\"]").unwrap();
        store.upsert(CollectionKey::Dates, "[\"2026-10-20\"]").unwrap();

        assert_eq!(
            store.get(CollectionKey::Dates).unwrap().as_deref(),
            Some("[\"2026-10-20\"]")
        );
        assert_eq!(store.get(CollectionKey::Children).unwrap(), None);

        let conn = store.conn.lock().unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM shared_state;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn writes_notify_every_subscriber_and_prune_dropped_ones() {
        let store = SqliteRemoteStore::open_in_memory().unwrap();
        let first = store.subscribe();
        let second = store.subscribe();
        drop(second);

        store.upsert(CollectionKey::Children, "[]").unwrap();
        assert_eq!(
            first.try_recv().unwrap(),
            ChangeNotice {
                key: CollectionKey::Children
            }
        );
        assert!(first.try_recv().is_err());
        assert_eq!(store.subscribers.lock().unwrap().len(), 1);
    }

    #[test]
    fn poll_announces_commits_from_another_connection_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.sqlite3");
        let writer = SqliteRemoteStore::open(&path).unwrap();
        let reader = SqliteRemoteStore::open(&path).unwrap();
        let changes = reader.subscribe();

        reader.poll().unwrap();
        assert!(changes.try_recv().is_err());

        writer.upsert(CollectionKey::Children, "[]").unwrap();
        writer.upsert(CollectionKey::Children, "[{}]").unwrap();
        assert!(changes.try_recv().is_err());

        reader.poll().unwrap();
        assert_eq!(changes.try_recv().unwrap(), notice(CollectionKey::Children));
        assert!(changes.try_recv().is_err());

        reader.poll().unwrap();
        assert!(changes.try_recv().is_err());
        assert_eq!(
            reader.get(CollectionKey::Children).unwrap().as_deref(),
            Some("[{}]")
        );
    }

    #[test]
    fn poll_does_not_repeat_own_writes_or_preexisting_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.sqlite3");
        let first = SqliteRemoteStore::open(&path).unwrap();
        first.upsert(CollectionKey::Dates, "[\"2026-10-19\"]").unwrap();

        let second = SqliteRemoteStore::open(&path).unwrap();
        let second_changes = second.subscribe();
        second.upsert(CollectionKey::Children, "[]").unwrap();
        assert_eq!(
            second_changes.try_recv().unwrap(),
            notice(CollectionKey::Children)
        );

        first.upsert(CollectionKey::Dates, "[\"2026-10-20\"]").unwrap();
        second.poll().unwrap();
        assert_eq!(
            second_changes.try_iter().collect::<Vec<_>>(),
            vec![notice(CollectionKey::Dates)]
        );
    }
}
