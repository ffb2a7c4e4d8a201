use crate::application::bootstrap::bootstrap_workspace;
use crate::application::reconcile::ReconcileService;
use crate::application::recorder::SessionRecorder;
use crate::application::timer::{JsonFileTimerState, TimerService};
use crate::domain::models::{TaskRecord, normalize_task_name};
use crate::domain::ranks::rank_for_level;
use crate::domain::time_format::format_elapsed;
use crate::infrastructure::auth::{AuthManager, ReqwestIdentityClient};
use crate::infrastructure::config::{AppConfig, load_config};
use crate::infrastructure::credential_store::KeyringCredentialStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::remote_store::ReqwestRtdbClient;
use crate::infrastructure::task_store::{JsonFileTaskStore, TaskStoreRepository};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Everything the mobile shell needs, wired once from a workspace root. The
/// shell renders whatever these commands return and serializes session-stop
/// against sync itself (the sync action is disabled while a timer runs).
pub struct AppState {
    task_store: Arc<JsonFileTaskStore>,
    remote: Arc<ReqwestRtdbClient>,
    recorder: SessionRecorder<JsonFileTaskStore>,
    reconciler: ReconcileService<ReqwestRtdbClient, JsonFileTaskStore>,
    timer: TimerService<JsonFileTimerState>,
    auth: AuthManager<KeyringCredentialStore, ReqwestIdentityClient>,
    logs_dir: PathBuf,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let config: AppConfig = load_config(&bootstrap.config_dir)?;
        let timezone = config.display_timezone()?;

        let task_store = Arc::new(JsonFileTaskStore::new(&bootstrap.tasks_path));
        let remote = Arc::new(ReqwestRtdbClient::new(&config.database_url));
        let timer_state = Arc::new(JsonFileTimerState::new(&bootstrap.timer_path));
        let credential_store = Arc::new(KeyringCredentialStore::default());
        let auth_client = Arc::new(ReqwestIdentityClient::new(&config.api_key));

        Ok(Self {
            recorder: SessionRecorder::new(Arc::clone(&task_store)),
            reconciler: ReconcileService::new(Arc::clone(&remote), Arc::clone(&task_store)),
            timer: TimerService::new(timer_state, timezone),
            auth: AuthManager::new(credential_store, auth_client),
            task_store,
            remote,
            logs_dir: bootstrap.logs_dir,
            log_guard: Mutex::new(()),
        })
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimerStateResponse {
    pub running: bool,
    pub seconds: Option<u64>,
    pub display: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionSavedResponse {
    pub task: String,
    pub record: TaskRecord,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SyncTasksResponse {
    pub pushed: Vec<String>,
    pub reset: Vec<String>,
    pub unchanged: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RankResponse {
    pub name: String,
    pub min_level: i64,
}

pub async fn sign_in_impl(
    state: &AppState,
    email: String,
    password: String,
    remember: bool,
) -> Result<String, InfraError> {
    let session = state.auth.sign_in(&email, &password, remember).await?;
    state.remote.set_auth_token(Some(session.id_token.clone()))?;
    state.log_info("sign_in", &format!("signed in as {}", session.uid));
    Ok(session.uid)
}

pub fn sign_out_impl(state: &AppState) -> Result<(), InfraError> {
    state.auth.sign_out()?;
    state.remote.set_auth_token(None)?;
    state.log_info("sign_out", "signed out");
    Ok(())
}

pub fn current_uid_impl(state: &AppState) -> Result<Option<String>, InfraError> {
    state.auth.current_uid()
}

pub fn start_timer_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    state.timer.start()?;
    timer_state_impl(state)
}

pub fn timer_state_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    let seconds = state.timer.elapsed_seconds()?;
    Ok(TimerStateResponse {
        running: seconds.is_some(),
        display: seconds.map(format_elapsed),
        seconds,
    })
}

/// Stops the running timer and records the completed session against the
/// given task in one step.
pub fn stop_timer_impl(
    state: &AppState,
    task_name: String,
) -> Result<SessionSavedResponse, InfraError> {
    let session = state.timer.stop()?;
    let record = state.recorder.record_session(
        &task_name,
        session.duration_seconds,
        &session.start_display,
        &session.end_display,
    )?;
    let task = normalize_task_name(&task_name);
    state.log_info("stop_timer", &format!("session saved for {task}"));
    Ok(SessionSavedResponse { task, record })
}

pub fn record_session_impl(
    state: &AppState,
    task_name: String,
    duration_seconds: i64,
    start_display: String,
    end_display: String,
) -> Result<TaskRecord, InfraError> {
    state
        .recorder
        .record_session(&task_name, duration_seconds, &start_display, &end_display)
}

pub fn list_tasks_impl(state: &AppState) -> Result<BTreeMap<String, TaskRecord>, InfraError> {
    state.task_store.load_all()
}

/// User-initiated sync. Aborts with `Unauthenticated` before any network
/// call when nobody is signed in and no saved credentials can restore a
/// session.
pub async fn sync_tasks_impl(state: &AppState) -> Result<SyncTasksResponse, InfraError> {
    let session = state
        .auth
        .ensure_session()
        .await?
        .ok_or(InfraError::Unauthenticated)?;
    state.remote.set_auth_token(Some(session.id_token.clone()))?;

    let report = state.reconciler.reconcile(&session.uid).await?;
    state.log_info(
        "sync_tasks",
        &format!(
            "reconciled {} tasks ({} pushed, {} reset)",
            report.total(),
            report.pushed.len(),
            report.reset.len()
        ),
    );
    Ok(SyncTasksResponse {
        pushed: report.pushed,
        reset: report.reset,
        unchanged: report.unchanged,
    })
}

/// Pretty-printed JSON of the whole local map, for the clipboard/backup
/// collaborator.
pub fn export_snapshot_impl(state: &AppState) -> Result<String, InfraError> {
    let records = state.task_store.load_all()?;
    Ok(serde_json::to_string_pretty(&records)?)
}

pub fn export_record_impl(state: &AppState, task_name: String) -> Result<String, InfraError> {
    let key = normalize_task_name(&task_name);
    let records = state.task_store.load_all()?;
    let record = records
        .get(&key)
        .ok_or_else(|| InfraError::InvalidRecord(format!("unknown task '{key}'")))?;
    Ok(serde_json::to_string_pretty(record)?)
}

/// Replaces the whole local document from raw JSON (the editor screen's raw
/// mode). Input is validated as typed records and keys are normalized; two
/// keys collapsing to the same normalized name is an error rather than a
/// silent merge.
pub fn replace_snapshot_impl(state: &AppState, raw_json: &str) -> Result<usize, InfraError> {
    let parsed: BTreeMap<String, TaskRecord> = serde_json::from_str(raw_json)?;

    let mut normalized = BTreeMap::new();
    for (name, record) in parsed {
        record.validate().map_err(InfraError::InvalidRecord)?;
        let key = normalize_task_name(&name);
        if key.is_empty() {
            return Err(InfraError::InvalidRecord(
                "task name must not be empty".to_string(),
            ));
        }
        if normalized.insert(key.clone(), record).is_some() {
            return Err(InfraError::InvalidRecord(format!(
                "duplicate task key '{key}' after normalization"
            )));
        }
    }

    let count = normalized.len();
    state.task_store.save_all(&normalized)?;
    state.log_info("replace_snapshot", &format!("replaced {count} records"));
    Ok(count)
}

/// Overwrites a single record (the editor screen's visual mode).
pub fn update_record_impl(
    state: &AppState,
    task_name: String,
    record: TaskRecord,
) -> Result<TaskRecord, InfraError> {
    record.validate().map_err(InfraError::InvalidRecord)?;
    let key = normalize_task_name(&task_name);
    if key.is_empty() {
        return Err(InfraError::InvalidRecord(
            "task name must not be empty".to_string(),
        ));
    }

    let mut records = state.task_store.load_all()?;
    records.insert(key, record.clone());
    state.task_store.save_all(&records)?;
    Ok(record)
}

pub fn current_rank_impl(level: Option<i64>) -> RankResponse {
    let rank = rank_for_level(level);
    RankResponse {
        name: rank.name.to_string(),
        min_level: rank.min_level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("temp dir");
        let state = AppState::new(dir.path().to_path_buf()).expect("app state");
        (state, dir)
    }

    #[test]
    fn record_session_persists_to_workspace_document() {
        let (state, dir) = app_state();
        let record = record_session_impl(
            &state,
            "Exercícios".to_string(),
            125,
            "10:00:00".to_string(),
            "10:02:05".to_string(),
        )
        .expect("record");
        assert_eq!(record.total_time_tracked, "000:02");

        let tasks_path = dir.path().join("state").join("tasks.json");
        assert!(tasks_path.is_file());
        let listed = list_tasks_impl(&state).expect("list");
        assert_eq!(listed.get("exercícios"), Some(&record));
    }

    #[test]
    fn timer_flow_stops_into_a_saved_session() {
        let (state, _dir) = app_state();

        let started = start_timer_impl(&state).expect("start");
        assert!(started.running);

        let saved = stop_timer_impl(&state, "Grind".to_string()).expect("stop");
        assert_eq!(saved.task, "grind");
        assert_eq!(saved.record.timeline.len(), 1);

        let idle = timer_state_impl(&state).expect("state");
        assert_eq!(
            idle,
            TimerStateResponse {
                running: false,
                seconds: None,
                display: None,
            }
        );
    }

    #[test]
    fn stop_without_timer_is_an_error() {
        let (state, _dir) = app_state();
        assert!(matches!(
            stop_timer_impl(&state, "Grind".to_string()),
            Err(InfraError::TimerNotRunning)
        ));
    }

    #[test]
    fn snapshot_export_and_replace_roundtrip() {
        let (state, _dir) = app_state();
        record_session_impl(
            &state,
            "Grind".to_string(),
            3600,
            "09:00:00".to_string(),
            "10:00:00".to_string(),
        )
        .expect("record");

        let snapshot = export_snapshot_impl(&state).expect("export");
        assert!(snapshot.contains("\"totalTimeTracked\": \"001:00\""));

        let count = replace_snapshot_impl(&state, &snapshot).expect("replace");
        assert_eq!(count, 1);
        assert_eq!(
            export_record_impl(&state, "GRIND".to_string()).expect("export record"),
            serde_json::to_string_pretty(
                list_tasks_impl(&state).expect("list").get("grind").expect("record")
            )
            .expect("serialize")
        );
    }

    #[test]
    fn replace_normalizes_legacy_keys_and_rejects_collisions() {
        let (state, _dir) = app_state();

        // Un-normalized keys from older documents collapse on import.
        let legacy = r#"{"Exercícios (focado)": {"count":0,"timeline":[],"totalTimeTracked":"000:10","lastTimeSynced":"","timeWasUsed":false}}"#;
        replace_snapshot_impl(&state, legacy).expect("replace legacy");
        assert!(
            list_tasks_impl(&state)
                .expect("list")
                .contains_key("exercícios(focado)")
        );

        let colliding = r#"{
            "Grind": {"count":0,"timeline":[],"totalTimeTracked":"000:10","lastTimeSynced":"","timeWasUsed":false},
            "grind": {"count":0,"timeline":[],"totalTimeTracked":"000:20","lastTimeSynced":"","timeWasUsed":false}
        }"#;
        assert!(matches!(
            replace_snapshot_impl(&state, colliding),
            Err(InfraError::InvalidRecord(_))
        ));
    }

    #[test]
    fn replace_rejects_malformed_json_and_invalid_records() {
        let (state, _dir) = app_state();
        assert!(matches!(
            replace_snapshot_impl(&state, "{not json"),
            Err(InfraError::Json(_))
        ));
        let invalid_total = r#"{"grind": {"count":0,"timeline":[],"totalTimeTracked":"2h","lastTimeSynced":"","timeWasUsed":false}}"#;
        assert!(matches!(
            replace_snapshot_impl(&state, invalid_total),
            Err(InfraError::InvalidRecord(_))
        ));
    }

    #[test]
    fn update_record_stores_under_normalized_key() {
        let (state, _dir) = app_state();
        let record = TaskRecord {
            total_time_tracked: "000:05".to_string(),
            ..TaskRecord::default()
        };
        update_record_impl(&state, "Caminhada ".to_string(), record.clone()).expect("update");
        assert_eq!(
            list_tasks_impl(&state).expect("list").get("caminhada"),
            Some(&record)
        );
    }

    #[test]
    fn export_of_unknown_task_is_an_error() {
        let (state, _dir) = app_state();
        assert!(matches!(
            export_record_impl(&state, "missing".to_string()),
            Err(InfraError::InvalidRecord(_))
        ));
    }

    #[test]
    fn rank_command_maps_levels() {
        assert_eq!(current_rank_impl(None).name, "Novice");
        assert_eq!(current_rank_impl(Some(817_000)).name, "Diamond Dog");
    }
}
