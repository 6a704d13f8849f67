use super::TaskStore;
use crate::constants::STORE_FORMAT_VERSION;
use crate::core::Task;
use crate::errors::Error;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Work items for the persistence writer, processed strictly in order
#[derive(Debug)]
enum PersistCommand {
    /// Replace the stable file with this snapshot
    Write(Vec<Task>),
    /// Acknowledge once every earlier command has been handled
    Flush(oneshot::Sender<()>),
}

#[derive(Serialize)]
struct StoreDocument<'a> {
    version: u32,
    tasks: &'a [Task],
}

/// Task store backed by a single JSON document.
///
/// Reads are served from memory. Every mutation enqueues a full snapshot to a
/// single writer task, so at most one write is in flight and snapshots reach
/// the disk in mutation order. Each write goes to `<path>.tmp` first and is
/// then renamed over the stable file.
#[derive(Debug)]
pub struct FileTaskStore {
    path: PathBuf,
    tasks: Mutex<HashMap<String, Task>>,
    writer_tx: UnboundedSender<PersistCommand>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl FileTaskStore {
    /// Loads the stable file (if any) and starts the writer task.
    ///
    /// Never fails: an unreadable or corrupt file leaves the store empty, and a
    /// corrupt one is first copied to a `<name>.corrupt.<millis>.json` side file.
    /// Must be called from within a tokio runtime.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tasks = match load_tasks(&path) {
            Ok(tasks) => {
                info!("Loaded {} task(s) from {}", tasks.len(), path.display());
                tasks
            }
            Err(e) => {
                error!("Starting with an empty task table: {}", e);
                HashMap::new()
            }
        };

        let (writer_tx, writer_rx) = unbounded_channel();
        let last_error = Arc::new(Mutex::new(None));
        tokio::spawn(run_writer(path.clone(), writer_rx, Arc::clone(&last_error)));

        Self {
            path,
            tasks: Mutex::new(tasks),
            writer_tx,
            last_error,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Task>> {
        match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Called with the table lock held so snapshots are queued in mutation order
    fn schedule_write(&self, tasks: &HashMap<String, Task>) {
        let mut snapshot: Vec<Task> = tasks.values().cloned().collect();
        snapshot.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        if self.writer_tx.send(PersistCommand::Write(snapshot)).is_err() {
            warn!("Persistence writer is gone, change kept in memory only");
        }
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    fn get(&self, id: &str) -> Option<Task> {
        self.lock().get(id).cloned()
    }

    fn set(&self, task: Task) {
        let mut tasks = self.lock();
        tasks.insert(task.id.clone(), task);
        self.schedule_write(&tasks);
    }

    fn delete(&self, id: &str) -> bool {
        let mut tasks = self.lock();
        let removed = tasks.remove(id).is_some();
        if removed {
            self.schedule_write(&tasks);
        }
        removed
    }

    fn list(&self) -> Vec<Task> {
        self.lock().values().cloned().collect()
    }

    async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.writer_tx.send(PersistCommand::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    fn persistence_error(&self) -> Option<String> {
        match self.last_error.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

async fn run_writer(
    path: PathBuf,
    mut rx: UnboundedReceiver<PersistCommand>,
    last_error: Arc<Mutex<Option<String>>>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            PersistCommand::Write(snapshot) => {
                let outcome = write_snapshot(&path, &snapshot).await;
                let mut slot = match last_error.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                match outcome {
                    Ok(()) => {
                        debug!("Persisted {} task(s) to {}", snapshot.len(), path.display());
                        *slot = None;
                    }
                    Err(e) => {
                        error!("Failed to persist tasks: {}", e);
                        *slot = Some(e.to_string());
                    }
                }
            }
            PersistCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!("Persistence writer for {} stopped", path.display());
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

async fn write_snapshot(path: &Path, tasks: &[Task]) -> Result<(), Error> {
    let persist_err = |e: std::io::Error| Error::Persistence(format!("{}: {}", path.display(), e));

    let document = StoreDocument {
        version: STORE_FORMAT_VERSION,
        tasks,
    };
    let data = serde_json::to_vec_pretty(&document)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(persist_err)?;
    }

    let tmp = temp_path(path);
    let mut file = tokio::fs::File::create(&tmp).await.map_err(persist_err)?;
    file.write_all(&data).await.map_err(persist_err)?;
    file.sync_all().await.map_err(persist_err)?;
    drop(file);

    tokio::fs::rename(&tmp, path).await.map_err(persist_err)?;
    Ok(())
}

/// Reads the stable file. A structurally invalid file is quarantined and
/// yields an empty table; only IO failures are returned as errors.
fn load_tasks(path: &Path) -> Result<HashMap<String, Task>, Error> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(Error::Io(e)),
    };

    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(HashMap::new());
    }

    match parse_document(&raw) {
        Ok(tasks) => Ok(tasks),
        Err(e) => {
            warn!("{}", e);
            quarantine(path);
            Ok(HashMap::new())
        }
    }
}

fn parse_document(raw: &[u8]) -> Result<HashMap<String, Task>, Error> {
    let document: Value = serde_json::from_slice(raw)
        .map_err(|e| Error::CorruptState(format!("not valid JSON: {}", e)))?;

    let entries = document
        .get("tasks")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::CorruptState("missing `tasks` array".to_string()))?;

    if let Some(version) = document.get("version").and_then(Value::as_u64) {
        if version > u64::from(STORE_FORMAT_VERSION) {
            warn!(
                "Task file version {} is newer than supported version {}",
                version, STORE_FORMAT_VERSION
            );
        }
    }

    let mut tasks = HashMap::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<Task>(entry.clone()) {
            Ok(task) if !task.id.is_empty() => {
                tasks.insert(task.id.clone(), task);
            }
            Ok(_) => warn!("Skipping stored task without id"),
            Err(e) => warn!("Skipping unreadable stored task: {}", e),
        }
    }
    Ok(tasks)
}

/// Moves the bad file aside for inspection, next to the stable path
fn quarantine(path: &Path) {
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tasks".to_string());
    let backup = dir.join(format!(
        "{}.corrupt.{}.json",
        stem,
        Utc::now().timestamp_millis()
    ));

    // A failed rename leaves the original in place
    match std::fs::rename(path, &backup) {
        Ok(()) => warn!("Corrupt task file preserved at {}", backup.display()),
        Err(e) => error!(
            "Failed to move corrupt task file {} aside: {}",
            path.display(),
            e
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaskStatus;

    fn task(id: &str) -> Task {
        Task::new(
            id.to_string(),
            "超市".to_string(),
            "快乐购物".to_string(),
            format!("prompt for {}", id),
            Some("https://example.com/hook".to_string()),
            15,
        )
    }

    fn corrupt_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("tasks.corrupt.") && n.ends_with(".json"))
                    .unwrap_or(false)
            })
            .collect()
    }

    #[tokio::test]
    async fn reload_returns_identical_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("tasks.json");

        let mut written = Vec::new();
        {
            let store = FileTaskStore::open(&path);
            for i in 0..5 {
                let mut t = task(&format!("task-{}", i));
                if i % 2 == 0 {
                    t.mark_generating();
                    t.provider_job_id = Some(format!("job-{}", i));
                    t.complete(format!("https://img/{}.png", i), None);
                    t.cost_time_ms = Some(1200);
                } else if i == 3 {
                    t.fail("quota exceeded");
                }
                store.set(t.clone());
                written.push(t);
            }
            store.flush().await;
            assert!(store.persistence_error().is_none());
        }

        let reloaded = FileTaskStore::open(&path);
        assert_eq!(reloaded.list().len(), written.len());
        for t in &written {
            assert_eq!(reloaded.get(&t.id).as_ref(), Some(t));
        }
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn document_has_version_and_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let store = FileTaskStore::open(&path);
        store.set(task("a"));
        store.flush().await;

        let doc: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(doc["version"], 1);
        assert_eq!(doc["tasks"][0]["id"], "a");
        assert_eq!(doc["tasks"][0]["status"], "processing");
    }

    #[tokio::test]
    async fn delete_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        {
            let store = FileTaskStore::open(&path);
            store.set(task("a"));
            store.set(task("b"));
            assert!(store.delete("a"));
            store.flush().await;
        }
        let reloaded = FileTaskStore::open(&path);
        assert!(reloaded.get("a").is_none());
        assert!(reloaded.get("b").is_some());
    }

    #[tokio::test]
    async fn last_write_wins_under_many_concurrent_sets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let store = Arc::new(FileTaskStore::open(&path));

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let mut t = task(&format!("t{}", i));
                store.set(t.clone());
                t.mark_generating();
                store.set(t.clone());
                t.complete(format!("https://img/{}.png", i), None);
                store.set(t);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        store.flush().await;

        let reloaded = FileTaskStore::open(&path);
        let tasks = reloaded.list();
        assert_eq!(tasks.len(), 20);
        assert!(tasks.iter().all(|t| t.status == TaskStatus::Completed));
    }

    #[tokio::test]
    async fn corrupt_file_is_quarantined_and_store_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let garbage = b"{\"version\": 1, \"tasks\": [ {\"id\": \"x\" ".to_vec();
        std::fs::write(&path, &garbage).unwrap();

        let store = FileTaskStore::open(&path);
        assert!(store.list().is_empty());
        assert!(!path.exists());

        let side_files = corrupt_files(dir.path());
        assert_eq!(side_files.len(), 1);
        assert_eq!(std::fs::read(&side_files[0]).unwrap(), garbage);
    }

    #[tokio::test]
    async fn wrong_shape_is_treated_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, br#"{"version": 1, "tasks": {"a": 1}}"#).unwrap();

        let store = FileTaskStore::open(&path);
        assert!(store.list().is_empty());
        assert_eq!(corrupt_files(dir.path()).len(), 1);
    }

    #[tokio::test]
    async fn unreadable_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let good = serde_json::to_value(task("good")).unwrap();
        let doc = serde_json::json!({"version": 1, "tasks": [good, {"title": "no id"}]});
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        let store = FileTaskStore::open(&path);
        assert_eq!(store.list().len(), 1);
        assert!(store.get("good").is_some());
        assert!(corrupt_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn empty_file_loads_as_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, b"  \n").unwrap();

        let store = FileTaskStore::open(&path);
        assert!(store.list().is_empty());
        assert!(corrupt_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn write_failure_is_reported_and_memory_stays_correct() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the parent directory should be makes every write fail.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let path = blocker.join("tasks.json");

        let store = FileTaskStore::open(&path);
        store.set(task("a"));
        store.flush().await;

        assert!(store.get("a").is_some());
        let message = store.persistence_error().expect("write should have failed");
        assert!(message.contains("tasks.json"));
    }
}
