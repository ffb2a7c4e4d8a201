use crate::domain::models::{TaskRecord, ZERO_DURATION};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::remote_store::RemoteTaskStore;
use crate::infrastructure::task_store::TaskStoreRepository;
use std::sync::Arc;

/// Outcome of one sync pass, keyed by normalized task name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Pushed to the remote store (local was newer, or remote had nothing).
    pub pushed: Vec<String>,
    /// Reset locally because a remote consumer drained the tracked time.
    pub reset: Vec<String>,
    /// Left untouched on both sides.
    pub unchanged: Vec<String>,
}

impl ReconcileReport {
    pub fn total(&self) -> usize {
        self.pushed.len() + self.reset.len() + self.unchanged.len()
    }
}

/// Per-task merge between the local document and the remote store.
///
/// Two writers share each record without a transaction log: this device, and
/// a remote consumer that drains accumulated time by setting `timeWasUsed`.
/// The flag is a one-shot consumption token; a local session recorded after
/// the consumption instant must win and clear it rather than be discarded.
/// Timestamps are the only tie-break, and an exact tie counts as remote-newer
/// so a repeated sync with no new activity is a no-op.
pub struct ReconcileService<R, L>
where
    R: RemoteTaskStore,
    L: TaskStoreRepository,
{
    remote: Arc<R>,
    local: Arc<L>,
}

impl<R, L> ReconcileService<R, L>
where
    R: RemoteTaskStore,
    L: TaskStoreRepository,
{
    pub fn new(remote: Arc<R>, local: Arc<L>) -> Self {
        Self { remote, local }
    }

    /// Runs the merge for every locally known task, sequentially. Remote
    /// failures abort the remaining loop; the local document is only written
    /// once, after every task has been decided, so an aborted sync leaves it
    /// exactly as it was.
    pub async fn reconcile(&self, uid: &str) -> Result<ReconcileReport, InfraError> {
        let uid = uid.trim();
        if uid.is_empty() {
            return Err(InfraError::Unauthenticated);
        }

        let mut records = self.local.load_all()?;
        let mut report = ReconcileReport::default();

        for (task_name, local) in records.iter_mut() {
            let remote = self
                .remote
                .fetch(uid, task_name)
                .await?
                .unwrap_or_default();

            if remote.time_was_used {
                if local_strictly_newer(local, &remote) {
                    // Activity after the consumption instant supersedes the
                    // stale marker: push local up and un-consume.
                    let mut pushed = local.clone();
                    pushed.time_was_used = false;
                    self.remote.put(uid, task_name, &pushed).await?;
                    report.pushed.push(task_name.clone());
                } else {
                    // The consumption is authoritative: drain the local
                    // accumulation and remember that it was drained.
                    local.timeline.clear();
                    local.total_time_tracked = ZERO_DURATION.to_string();
                    local.time_was_used = true;
                    report.reset.push(task_name.clone());
                }
                continue;
            }

            if remote.last_time_synced.trim().is_empty() || local_strictly_newer(local, &remote) {
                self.remote.put(uid, task_name, local).await?;
                report.pushed.push(task_name.clone());
            } else {
                report.unchanged.push(task_name.clone());
            }
        }

        self.local.save_all(&records)?;
        Ok(report)
    }
}

/// Strict comparison of the two sync stamps. A side that is empty or
/// unparsable never counts as newer.
fn local_strictly_newer(local: &TaskRecord, remote: &TaskRecord) -> bool {
    match (local.last_synced_instant(), remote.last_synced_instant()) {
        (Some(local_at), Some(remote_at)) => local_at > remote_at,
        _ => false,
    }
}
