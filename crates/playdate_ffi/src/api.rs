//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose scheduler use cases to Dart via FRB.
//! - Own the single process-wide client (session + sync coordinator).
//! - Persist every participant mutation right away, like the UI expects.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Dates cross the boundary as `YYYY-MM-DD`, times as `HH:MM`.

use playdate_core::db::migrations::latest_version;
use playdate_core::model::slot::{format_date, parse_date, parse_time};
use playdate_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    ConfigError, DateWindow, MeetingRange, ParticipantId, RemoteStore, SchedulerConfig, Session,
    SqliteRemoteStore, SyncCoordinator,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

const DB_FILE_NAME: &str = "playdate_shared.sqlite3";
const DB_PATH_ENV: &str = "PLAYDATE_DB_PATH";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static CLIENT: OnceLock<Mutex<Option<Client>>> = OnceLock::new();

struct Client {
    session: Session,
    sync: SyncCoordinator,
}

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Core crate version and schema version, e.g. `0.1.0 (schema 2)`.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    format!("{} (schema {})", core_version_inner(), latest_version())
}

/// Initializes Rust core logging once per process.
///
/// Returns an empty string on success and the error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Participant affected by the action, when there is one.
    pub participant_id: Option<String>,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, participant_id: Option<String>) -> Self {
        Self {
            ok: true,
            participant_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            participant_id: None,
            message: message.into(),
        }
    }
}

/// One row of the "top available times" panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopSlotItem {
    pub date: String,
    pub time: String,
    pub display: String,
    pub names: String,
    pub count: u32,
}

/// Proposed meeting window with contact details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeItem {
    pub date: String,
    pub start_display: String,
    pub end_display: String,
    pub names: Vec<String>,
    pub phones: Vec<String>,
}

impl From<MeetingRange> for RangeItem {
    fn from(range: MeetingRange) -> Self {
        Self {
            date: format_date(range.date),
            phones: range.phones().into_iter().map(str::to_string).collect(),
            names: range
                .participants
                .iter()
                .map(|participant| participant.name.clone())
                .collect(),
            start_display: range.start_display,
            end_display: range.end_display,
        }
    }
}

/// Opens the shared database and loads the remote snapshot.
///
/// `config_json` is a `SchedulerConfig` object; missing or blank input and
/// missing fields use the defaults. Re-opening replaces the previous client;
/// a failed open leaves the previous client in place.
#[flutter_rust_bridge::frb(sync)]
pub fn scheduler_open(config_json: Option<String>) -> ActionResponse {
    let config = match parse_config(config_json.as_deref()) {
        Ok(config) => config,
        Err(err) => return ActionResponse::failure(format!("scheduler_open failed: {err}")),
    };
    let db_path = resolve_db_path();
    let remote = match SqliteRemoteStore::open(&db_path) {
        Ok(remote) => remote,
        Err(err) => return ActionResponse::failure(format!("scheduler_open failed: {err}")),
    };
    let remote: Arc<dyn RemoteStore> = Arc::new(remote);

    let mut session = Session::init(config, chrono::Local::now().date_naive());
    let mut sync = SyncCoordinator::for_session(remote, &session);
    if let Err(err) = sync.load_all(&mut session) {
        return ActionResponse::failure(format!("scheduler_open failed: {err}"));
    }

    let Ok(mut slot) = client_cell().lock() else {
        return ActionResponse::failure("scheduler_open failed: client lock poisoned");
    };
    if let Some(previous) = slot.take() {
        previous.session.teardown();
    }
    *slot = Some(Client { session, sync });
    ActionResponse::success("Scheduler ready.", None)
}

/// Ends the current session, if any.
#[flutter_rust_bridge::frb(sync)]
pub fn scheduler_close() -> ActionResponse {
    let Ok(mut slot) = client_cell().lock() else {
        return ActionResponse::failure("scheduler_close failed: client lock poisoned");
    };
    if let Some(client) = slot.take() {
        client.session.teardown();
    }
    ActionResponse::success("Scheduler closed.", None)
}

#[flutter_rust_bridge::frb(sync)]
pub fn participant_add(name: String, phone: Option<String>) -> ActionResponse {
    mutate("participant_add", |client| {
        let participant = client
            .session
            .participants_mut()
            .add(&name, phone.as_deref())
            .map_err(|err| err.to_string())?;
        Ok(("Participant added.", Some(participant.id.to_string())))
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn participant_update(id: String, name: String, phone: Option<String>) -> ActionResponse {
    mutate("participant_update", |client| {
        let participant = client
            .session
            .participants_mut()
            .update(&ParticipantId::from(id), &name, phone.as_deref())
            .map_err(|err| err.to_string())?;
        Ok(("Participant updated.", Some(participant.id.to_string())))
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn participant_remove(id: String) -> ActionResponse {
    mutate("participant_remove", |client| {
        client
            .session
            .participants_mut()
            .remove(&ParticipantId::from(id));
        Ok(("Participant removed.", None))
    })
}

/// Makes `id` the participant whose slots are being edited.
#[flutter_rust_bridge::frb(sync)]
pub fn participant_select(id: String) -> ActionResponse {
    with_client("participant_select", |client| {
        let id = ParticipantId::from(id);
        client
            .session
            .participants_mut()
            .select(&id)
            .map_err(|err| err.to_string())?;
        Ok(ActionResponse::success(
            "Participant selected.",
            Some(id.to_string()),
        ))
    })
}

/// Toggles one cell for the selected participant.
#[flutter_rust_bridge::frb(sync)]
pub fn slot_toggle(date: String, time: String) -> ActionResponse {
    mutate("slot_toggle", |client| {
        let date = parse_date(&date).ok_or_else(|| format!("invalid date `{date}`"))?;
        let time = parse_time(&time).ok_or_else(|| format!("invalid time `{time}`"))?;
        let id = selected_id(&client.session)?;
        client
            .session
            .participants_mut()
            .toggle_slot(&id, date, time)
            .map_err(|err| err.to_string())?;
        Ok(("Slot toggled.", Some(id.to_string())))
    })
}

/// Fills or clears a whole day for the selected participant.
#[flutter_rust_bridge::frb(sync)]
pub fn day_toggle(date: String) -> ActionResponse {
    mutate("day_toggle", |client| {
        let date = parse_date(&date).ok_or_else(|| format!("invalid date `{date}`"))?;
        let id = selected_id(&client.session)?;
        let filled = client
            .session
            .participants_mut()
            .toggle_all_slots_for_date(&id, date)
            .map_err(|err| err.to_string())?;
        let message = if filled { "Day filled." } else { "Day cleared." };
        Ok((message, Some(id.to_string())))
    })
}

/// Replaces the displayed dates and saves them.
#[flutter_rust_bridge::frb(sync)]
pub fn window_set(start: String, end: String) -> ActionResponse {
    with_client("window_set", |client| {
        let start = parse_date(&start).ok_or_else(|| format!("invalid date `{start}`"))?;
        let end = parse_date(&end).ok_or_else(|| format!("invalid date `{end}`"))?;
        let window = DateWindow::new(start, end).map_err(|err| err.to_string())?;
        client.session.set_window(window);
        client
            .sync
            .save_date_window(&client.session)
            .map_err(|err| err.to_string())?;
        Ok(ActionResponse::success("Dates saved.", None))
    })
}

/// Displayed dates as `YYYY-MM-DD` strings.
#[flutter_rust_bridge::frb(sync)]
pub fn window_dates() -> Vec<String> {
    read_client(|client| {
        client
            .session
            .window()
            .dates()
            .iter()
            .map(|date| format_date(*date))
            .collect()
    })
    .unwrap_or_default()
}

#[flutter_rust_bridge::frb(sync)]
pub fn top_slots(limit: Option<u32>) -> Vec<TopSlotItem> {
    read_client(|client| {
        let limit = limit.map(|value| value as usize);
        client
            .session
            .top_slots(limit)
            .iter()
            .map(|ranked| TopSlotItem {
                date: format_date(ranked.date),
                time: ranked.slot.key.clone(),
                display: ranked.slot.display.clone(),
                names: ranked.names(),
                count: u32::try_from(ranked.count()).unwrap_or(u32::MAX),
            })
            .collect()
    })
    .unwrap_or_default()
}

/// Meeting window around a cell for the selected participant.
#[flutter_rust_bridge::frb(sync)]
pub fn range_propose(date: String, time: String) -> Option<RangeItem> {
    let date = parse_date(&date)?;
    let time = parse_time(&time)?;
    read_client(|client| client.session.propose_range(date, time))
        .flatten()
        .map(RangeItem::from)
}

/// `idle`, `saving` or `saved`.
#[flutter_rust_bridge::frb(sync)]
pub fn save_status() -> String {
    read_client(|client| client.sync.status().as_str().to_string())
        .unwrap_or_else(|| "idle".to_string())
}

/// Applies pending remote change notifications by reloading.
#[flutter_rust_bridge::frb(sync)]
pub fn remote_changes_pump() -> ActionResponse {
    with_client("remote_changes_pump", |client| {
        let reloaded = client
            .sync
            .pump_remote_changes(&mut client.session)
            .map_err(|err| err.to_string())?;
        let message = if reloaded {
            "Reloaded remote changes."
        } else {
            "No remote changes."
        };
        Ok(ActionResponse::success(message, None))
    })
}

fn parse_config(raw: Option<&str>) -> Result<SchedulerConfig, ConfigError> {
    match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => SchedulerConfig::from_json(raw),
        _ => Ok(SchedulerConfig::default()),
    }
}

fn client_cell() -> &'static Mutex<Option<Client>> {
    CLIENT.get_or_init(|| Mutex::new(None))
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn selected_id(session: &Session) -> Result<ParticipantId, String> {
    session
        .participants()
        .selected_id()
        .cloned()
        .ok_or_else(|| "no participant selected".to_string())
}

fn with_client(
    action: &str,
    f: impl FnOnce(&mut Client) -> Result<ActionResponse, String>,
) -> ActionResponse {
    let Ok(mut slot) = client_cell().lock() else {
        return ActionResponse::failure(format!("{action} failed: client lock poisoned"));
    };
    let Some(client) = slot.as_mut() else {
        return ActionResponse::failure(format!("{action} failed: scheduler not opened"));
    };
    f(client).unwrap_or_else(|err| ActionResponse::failure(format!("{action} failed: {err}")))
}

/// Runs a participant mutation, then saves the participant snapshot.
///
/// A failed save keeps the local change and reports it as unsaved.
fn mutate(
    action: &str,
    f: impl FnOnce(&mut Client) -> Result<(&'static str, Option<String>), String>,
) -> ActionResponse {
    with_client(action, |client| {
        let (message, participant_id) = f(client)?;
        match client.sync.save_participants(&mut client.session) {
            Ok(()) => Ok(ActionResponse::success(message, participant_id)),
            Err(err) => Ok(ActionResponse {
                ok: false,
                participant_id,
                message: format!("{message} {err}"),
            }),
        }
    })
}

fn read_client<T>(f: impl FnOnce(&Client) -> T) -> Option<T> {
    let slot = client_cell().lock().ok()?;
    slot.as_ref().map(f)
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, day_toggle, participant_add, participant_select, ping, range_propose,
        resolve_db_path, save_status, scheduler_close, scheduler_open, slot_toggle, top_slots,
        window_dates, window_set, RangeItem, DB_PATH_ENV,
    };
    use playdate_core::db::open_db;
    use playdate_core::{CollectionKey, RemoteStore, SqliteRemoteStore};
    use std::path::{Path, PathBuf};
    use std::sync::{Mutex, MutexGuard, OnceLock};

    // Exported calls share one process-wide client and database path.
    static SERIAL: Mutex<()> = Mutex::new(());
    static DB_DIR: OnceLock<tempfile::TempDir> = OnceLock::new();

    fn serial() -> MutexGuard<'static, ()> {
        SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn db_path() -> PathBuf {
        let dir = DB_DIR.get_or_init(|| {
            let dir = tempfile::tempdir().unwrap();
            std::env::set_var(DB_PATH_ENV, dir.path().join("ffi.sqlite3"));
            dir
        });
        let path = resolve_db_path();
        assert_eq!(path, dir.path().join("ffi.sqlite3"));
        path
    }

    fn open_fresh(config_json: Option<&str>) -> PathBuf {
        scheduler_close();
        let path = db_path();
        open_db(&path)
            .unwrap()
            .execute_batch("DELETE FROM shared_state;")
            .unwrap();
        let response = scheduler_open(config_json.map(str::to_string));
        assert!(response.ok, "{}", response.message);
        path
    }

    fn set_writes_rejected(path: &Path, rejected: bool) {
        let sql = if rejected {
            "CREATE TRIGGER reject_insert BEFORE INSERT ON shared_state
                BEGIN SELECT RAISE(ABORT, 'writes disabled'); END;
             CREATE TRIGGER reject_update BEFORE UPDATE ON shared_state
                BEGIN SELECT RAISE(ABORT, 'writes disabled'); END;"
        } else {
            "DROP TRIGGER IF EXISTS reject_insert;
             DROP TRIGGER IF EXISTS reject_update;"
        };
        open_db(path).unwrap().execute_batch(sql).unwrap();
    }

    fn first_date() -> String {
        window_dates().first().cloned().unwrap()
    }

    #[test]
    fn ping_and_version_are_stable() {
        assert_eq!(ping(), "pong");
        assert!(core_version().contains("schema"));
    }

    #[test]
    fn queries_without_open_scheduler_are_empty() {
        let _guard = serial();
        scheduler_close();

        assert!(top_slots(Some(5)).is_empty());
        assert!(window_dates().is_empty());
        assert_eq!(save_status(), "idle");
        let response = participant_add("Ann".to_string(), Some("555-1".to_string()));
        assert!(!response.ok);
        assert!(response.message.contains("scheduler not opened"));
    }

    #[test]
    fn mutations_are_saved_and_visible_through_queries() {
        let _guard = serial();
        let path = open_fresh(None);
        let date = first_date();

        let ann = participant_add("Ann".to_string(), Some("555-1".to_string()));
        assert!(ann.ok, "{}", ann.message);
        assert!(ann.participant_id.is_some());
        assert!(slot_toggle(date.clone(), "14:00".to_string()).ok);
        assert_eq!(save_status(), "saved");

        assert!(participant_add("Bo".to_string(), Some("555-2".to_string())).ok);
        assert!(slot_toggle(date.clone(), "14:00".to_string()).ok);

        let top = top_slots(Some(1));
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].date, date);
        assert_eq!(top[0].time, "14:00");
        assert_eq!(top[0].display, "2:00 PM");
        assert_eq!(top[0].names, "Ann, Bo");
        assert_eq!(top[0].count, 2);

        assert_eq!(
            range_propose(date.clone(), "14:00".to_string()),
            Some(RangeItem {
                date: date.clone(),
                start_display: "2:00 PM".to_string(),
                end_display: "2:30 PM".to_string(),
                names: vec!["Ann".to_string()],
                phones: vec!["555-1".to_string()],
            })
        );
        assert_eq!(range_propose(date.clone(), "15:00".to_string()), None);

        let off_grid = slot_toggle(date.clone(), "09:15".to_string());
        assert!(!off_grid.ok);
        assert!(off_grid.message.contains("not a slot start"));

        assert!(day_toggle(date).ok);
        let stored = SqliteRemoteStore::open(&path)
            .unwrap()
            .get(CollectionKey::Children)
            .unwrap()
            .unwrap();
        assert!(stored.contains("\"Ann\"") && stored.contains("\"Bo\""));
    }

    #[test]
    fn failed_save_reports_unsaved_change_and_keeps_it_locally() {
        let _guard = serial();
        let path = open_fresh(None);
        set_writes_rejected(&path, true);

        let response = participant_add("Ann".to_string(), Some("555-1".to_string()));
        set_writes_rejected(&path, false);

        assert!(!response.ok);
        assert!(response.message.starts_with("Participant added."));
        assert!(response.message.contains("not saved"));
        assert_eq!(save_status(), "idle");
        let id = response.participant_id.unwrap();
        assert!(participant_select(id).ok);
    }

    #[test]
    fn window_set_persists_across_reopen() {
        let _guard = serial();
        open_fresh(None);

        assert!(window_set("2026-11-02".to_string(), "2026-11-04".to_string()).ok);
        let expected = vec!["2026-11-02", "2026-11-03", "2026-11-04"];
        assert_eq!(window_dates(), expected);

        assert!(scheduler_open(None).ok);
        assert_eq!(window_dates(), expected);

        let reversed = window_set("2026-11-04".to_string(), "2026-11-02".to_string());
        assert!(!reversed.ok);
        assert_eq!(window_dates(), expected);
    }

    #[test]
    fn open_applies_config_and_rejects_invalid_config() {
        let _guard = serial();
        open_fresh(Some(r#"{"require_phone": false, "top_slot_limit": 1}"#));
        let date = first_date();

        assert!(participant_add("Ann".to_string(), None).ok);
        assert!(slot_toggle(date.clone(), "10:00".to_string()).ok);
        assert!(slot_toggle(date, "11:00".to_string()).ok);
        assert_eq!(top_slots(None).len(), 1);

        let invalid = scheduler_open(Some(r#"{"top_slot_limit": 0}"#.to_string()));
        assert!(!invalid.ok);
        assert!(invalid.message.contains("top_slot_limit"));
        let malformed = scheduler_open(Some("not json".to_string()));
        assert!(!malformed.ok);
        assert!(malformed.message.contains("invalid scheduler config"));
        // The client opened above survives failed opens.
        assert_eq!(top_slots(None).len(), 1);

        open_fresh(Some("  "));
        assert!(!participant_add("Bo".to_string(), None).ok);
    }
}
