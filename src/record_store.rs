//! JSON-Lines record files with a per-file FIFO write queue.
//!
//! Every mutating call on a [`RecordStore`] is turned into a job and pushed to
//! the worker task owned by that store, so two read-modify-write cycles on the
//! same file never interleave. Clones share the same worker. [`RecordStore::read`]
//! bypasses the queue and may observe a file concurrently being replaced;
//! callers that need a consistent view use [`RecordStore::snapshot`].

use std::{
    ffi::OsString,
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Write},
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    sync::{mpsc, oneshot},
    task,
};
use tracing::{debug, warn};

use crate::error::{Error, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct RecordStore<T> {
    path: Arc<PathBuf>,
    queue_tx: mpsc::UnboundedSender<Job>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for RecordStore<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            queue_tx: self.queue_tx.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for RecordStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("path", &self.path)
            .finish()
    }
}

impl<T> RecordStore<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// Must be called from within a Tokio runtime: the queue worker is spawned here.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = Arc::new(path.into());
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        spawn_queue_worker(path.clone(), queue_rx);
        Self {
            path,
            queue_tx,
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file outside the write queue.
    pub async fn read(&self) -> Result<Vec<T>> {
        let path = self.path.clone();
        task::spawn_blocking(move || read_records(&path)).await?
    }

    /// Reads the file from inside the write queue.
    pub async fn snapshot(&self) -> Result<Vec<T>> {
        self.enqueue(|path| read_records(path)).await
    }

    pub async fn rewrite(&self, records: Vec<T>) -> Result<()> {
        self.enqueue(move |path| write_records(path, &records)).await
    }

    pub async fn append(&self, record: T) -> Result<()> {
        self.enqueue(move |path| append_record(path, &record)).await
    }

    /// Runs `f` over the full record list and writes the result back, as one
    /// queued unit.
    pub async fn mutate<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<T>) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.enqueue(move |path| {
            let mut records = read_records(path)?;
            let out = f(&mut records);
            write_records(path, &records)?;
            Ok(out)
        })
        .await
    }

    async fn enqueue<R, F>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&Path) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let path = self.path.clone();
        let job: Job = Box::new(move || {
            let _ = done_tx.send(op(&path));
        });

        self.queue_tx
            .send(job)
            .map_err(|_| Error::StoreClosed(self.path.to_path_buf()))?;

        done_rx
            .await
            .map_err(|_| Error::StoreClosed(self.path.to_path_buf()))?
    }
}

fn spawn_queue_worker(path: Arc<PathBuf>, mut queue_rx: mpsc::UnboundedReceiver<Job>) {
    tokio::spawn(async move {
        while let Some(job) = queue_rx.recv().await {
            if let Err(err) = task::spawn_blocking(job).await {
                warn!(path = %path.display(), "Record store job aborted: {err}");
            }
        }
        debug!(path = %path.display(), "Record store queue closed");
    });
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(parse_records(path, &text)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(Error::io(path, err)),
    }
}

fn parse_records<T: DeserializeOwned>(path: &Path, text: &str) -> Vec<T> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => out.push(record),
            Err(err) => warn!(
                path = %path.display(),
                line = idx + 1,
                "Skipping malformed record: {err}"
            ),
        }
    }
    out
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
        }
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut raw = OsString::from(path.as_os_str());
    raw.push(".tmp");
    PathBuf::from(raw)
}

fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    ensure_parent(path)?;

    let mut buf = String::new();
    for record in records {
        buf.push_str(&serde_json::to_string(record)?);
        buf.push('\n');
    }

    let tmp_path = temp_path_for(path);
    {
        let mut file = File::create(&tmp_path).map_err(|err| Error::io(&tmp_path, err))?;
        file.write_all(buf.as_bytes())
            .map_err(|err| Error::io(&tmp_path, err))?;
        file.sync_all().map_err(|err| Error::io(&tmp_path, err))?;
    }
    fs::rename(&tmp_path, path).map_err(|err| Error::io(path, err))
}

fn append_record<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    ensure_parent(path)?;
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| Error::io(path, err))?;
    file.write_all(line.as_bytes())
        .map_err(|err| Error::io(path, err))
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store: RecordStore<Value> = RecordStore::open(dir.path().join("absent.jsonl"));
        assert!(store.read().await.expect("read").is_empty());
        assert!(store.snapshot().await.expect("snapshot").is_empty());
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("items.jsonl");
        fs::write(&path, "{\"n\":1}\nnot json\n\n{\"n\":2}\n").expect("seed");

        let store: RecordStore<Value> = RecordStore::open(&path);
        let records = store.read().await.expect("read");
        assert_eq!(records, vec![json!({"n": 1}), json!({"n": 2})]);
    }

    #[tokio::test]
    async fn concurrent_mutations_do_not_lose_writes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store: RecordStore<Value> = RecordStore::open(dir.path().join("steps.jsonl"));

        let mut handles = Vec::new();
        for n in 0..40 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .mutate(move |records| records.push(json!({ "n": n })))
                    .await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("mutate");
        }

        let records = store.snapshot().await.expect("snapshot");
        assert_eq!(records.len(), 40);
    }

    #[tokio::test]
    async fn rewrite_replaces_content_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("graph.jsonl");
        let store: RecordStore<Value> = RecordStore::open(&path);

        store.append(json!({"a": 1})).await.expect("append");
        store.append(json!({"a": 2})).await.expect("append");
        store
            .rewrite(vec![json!({"b": true})])
            .await
            .expect("rewrite");

        let text = fs::read_to_string(&path).expect("read back");
        assert_eq!(text, "{\"b\":true}\n");
        assert!(!temp_path_for(&path).exists());
    }
}
