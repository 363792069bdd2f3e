//! Mirrors session state to the shared remote store.
//!
//! # Responsibility
//! - Push whole-record snapshots and expose a save-status signal.
//! - Load the remote snapshot, seeding the default date window on first run.
//! - React to remote change notifications by reloading everything.
//!
//! # Invariants
//! - Status machine: `Idle -> Saving -> Saved -> (display window) Idle`, and
//!   `Saving -> Idle` on failure.
//! - A failed save never rolls back local state; nothing is retried or queued.
//! - Writes are blind overwrites per collection key (last writer wins).
//! - A remote notification always reloads, discarding unsaved local edits,
//!   including notices raised by this coordinator's own saves.

use crate::model::date_window::DateWindow;
use crate::model::participant::Participant;
use crate::session::Session;
use crate::sync::remote_store::{ChangeNotice, CollectionKey, RemoteError, RemoteStore};
use crate::sync::wire::{
    decode_dates, decode_participants, encode_dates, encode_participants, WireError,
};
use chrono::{Local, NaiveDate};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved,
}

impl SaveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Saving => "saving",
            Self::Saved => "saved",
        }
    }
}

#[derive(Debug)]
pub enum SyncError {
    /// Remote read or write failed; local state stays authoritative.
    Persistence(RemoteError),
    /// Remote value could not be decoded; local state was not replaced.
    InvalidData(WireError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Persistence(err) => write!(f, "changes not saved: {err}"),
            Self::InvalidData(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
            Self::InvalidData(err) => Some(err),
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(value: RemoteError) -> Self {
        Self::Persistence(value)
    }
}

impl From<WireError> for SyncError {
    fn from(value: WireError) -> Self {
        Self::InvalidData(value)
    }
}

#[derive(Debug, Clone, Copy)]
struct SaveState {
    status: SaveStatus,
    since: Instant,
}

pub struct SyncCoordinator {
    remote: Arc<dyn RemoteStore>,
    changes: Receiver<ChangeNotice>,
    state: SaveState,
    saved_display: Duration,
    status_listeners: Vec<Sender<SaveStatus>>,
}

impl SyncCoordinator {
    /// Subscribes to `remote` and starts in `Idle`.
    pub fn new(remote: Arc<dyn RemoteStore>, saved_display: Duration) -> Self {
        let changes = remote.subscribe();
        Self {
            remote,
            changes,
            state: SaveState {
                status: SaveStatus::Idle,
                since: Instant::now(),
            },
            saved_display,
            status_listeners: Vec::new(),
        }
    }

    /// Coordinator using the session's configured `Saved` display window.
    pub fn for_session(remote: Arc<dyn RemoteStore>, session: &Session) -> Self {
        Self::new(remote, session.config().saved_display())
    }

    /// Current status; `Saved` reads as `Idle` once the display window elapsed.
    pub fn status(&self) -> SaveStatus {
        self.status_at(Instant::now())
    }

    pub fn status_at(&self, now: Instant) -> SaveStatus {
        match self.state.status {
            SaveStatus::Saved if now.duration_since(self.state.since) >= self.saved_display => {
                SaveStatus::Idle
            }
            status => status,
        }
    }

    /// Streams every explicit status transition (`Saving`, `Saved`, failure `Idle`).
    ///
    /// The timed `Saved -> Idle` fallback is not streamed; poll `status()` for it.
    pub fn watch_status(&mut self) -> Receiver<SaveStatus> {
        let (sender, receiver) = std::sync::mpsc::channel();
        self.status_listeners.push(sender);
        receiver
    }

    /// Persists the participant snapshot. Clears the dirty flag on success.
    pub fn save_participants(&mut self, session: &mut Session) -> SyncResult<()> {
        let json = encode_participants(session.participants().as_slice())?;
        self.save(CollectionKey::Children, &json)?;
        session.participants_mut().mark_clean();
        Ok(())
    }

    /// Persists the date window.
    pub fn save_date_window(&mut self, session: &Session) -> SyncResult<()> {
        let json = encode_dates(session.window())?;
        self.save(CollectionKey::Dates, &json)
    }

    /// Upserts one record while driving the status machine.
    pub fn save(&mut self, key: CollectionKey, json: &str) -> SyncResult<()> {
        let started_at = Instant::now();
        self.transition(SaveStatus::Saving);

        match self.remote.upsert(key, json) {
            Ok(()) => {
                self.transition(SaveStatus::Saved);
                info!(
                    "event=sync_save module=sync status=ok key={key} bytes={} duration_ms={}",
                    json.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                self.transition(SaveStatus::Idle);
                error!(
                    "event=sync_save module=sync status=error key={key} duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }

    /// Loads the remote snapshot using the local calendar date for first-run seeding.
    pub fn load_all(&mut self, session: &mut Session) -> SyncResult<()> {
        self.load_all_on(session, Local::now().date_naive())
    }

    /// Loads the remote snapshot and replaces local state wholesale.
    ///
    /// When no `dates` record exists yet, the default window starting at
    /// `today` is computed and persisted.
    pub fn load_all_on(&mut self, session: &mut Session, today: NaiveDate) -> SyncResult<()> {
        let started_at = Instant::now();
        let result = self.fetch_snapshot(session, today);
        match result {
            Ok((participants, window)) => {
                let count = participants.len();
                session.replace_remote_state(participants, window);
                info!(
                    "event=sync_load module=sync status=ok participants={count} window_days={} duration_ms={}",
                    session.window().len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=sync_load module=sync status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Polls the store for foreign writes, drains pending notifications and
    /// reloads once if any arrived.
    ///
    /// Returns whether a reload happened. Unsaved local edits are lost when it
    /// does. That includes this client's own saves: each save queues a notice
    /// for its writer, so edits made after a save and before the next pump are
    /// replaced by the saved snapshot unless they were saved too.
    pub fn pump_remote_changes(&mut self, session: &mut Session) -> SyncResult<bool> {
        self.pump_remote_changes_on(session, Local::now().date_naive())
    }

    pub fn pump_remote_changes_on(
        &mut self,
        session: &mut Session,
        today: NaiveDate,
    ) -> SyncResult<bool> {
        if let Err(err) = self.remote.poll() {
            error!("event=sync_poll module=sync status=error error={err}");
            return Err(err.into());
        }

        let mut received = 0usize;
        loop {
            match self.changes.try_recv() {
                Ok(_) => received += 1,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("event=sync_subscription module=sync status=error error=disconnected");
                    break;
                }
            }
        }
        if received == 0 {
            return Ok(false);
        }

        if session.participants().is_dirty() {
            warn!(
                "event=sync_reload module=sync status=ok notices={received} discarded_unsaved=true"
            );
        }
        self.load_all_on(session, today)?;
        Ok(true)
    }

    fn fetch_snapshot(
        &self,
        session: &Session,
        today: NaiveDate,
    ) -> SyncResult<(Vec<Participant>, DateWindow)> {
        let participants = match self.remote.get(CollectionKey::Children)? {
            Some(json) => decode_participants(&json)?,
            None => Vec::new(),
        };

        let window = match self.remote.get(CollectionKey::Dates)? {
            Some(json) => decode_dates(&json)?,
            None => {
                let window = DateWindow::starting_at(today, session.config().default_window_days);
                self.remote
                    .upsert(CollectionKey::Dates, &encode_dates(&window)?)?;
                info!(
                    "event=sync_seed_dates module=sync status=ok start={} days={}",
                    window.start(),
                    window.len()
                );
                window
            }
        };

        Ok((participants, window))
    }

    fn transition(&mut self, status: SaveStatus) {
        self.state = SaveState {
            status,
            since: Instant::now(),
        };
        self.status_listeners
            .retain(|listener| listener.send(status).is_ok());
    }
}
