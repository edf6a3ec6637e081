use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use rusqlite::Connection;
use tokio::{sync::Semaphore, task};
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    mirror,
};

/// Bounded pool of connections to the relational mirror.
///
/// Connections are opened lazily up to `size`. Each call borrows one
/// connection on a blocking thread and returns it to the idle list afterwards.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    path: PathBuf,
    size: usize,
    idle: Mutex<Vec<Connection>>,
    permits: Semaphore,
    closed: AtomicBool,
}

impl ConnectionPool {
    /// Opens the pool and makes sure the mirror schema exists.
    pub async fn open(path: impl Into<PathBuf>, size: usize) -> Result<Self> {
        let path = path.into();
        let size = size.max(1);

        let first = {
            let path = path.clone();
            task::spawn_blocking(move || -> Result<Connection> {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
                    }
                }
                let conn = open_connection(&path)?;
                mirror::ensure_schema(&conn)?;
                Ok(conn)
            })
            .await??
        };

        info!(path = %path.display(), size, "Mirror connection pool opened");
        Ok(Self {
            inner: Arc::new(PoolInner {
                path,
                size,
                idle: Mutex::new(vec![first]),
                permits: Semaphore::new(size),
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn size(&self) -> usize {
        self.inner.size
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Runs `f` with a pooled connection.
    pub async fn with_conn<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        if self.is_closed() {
            return Err(Error::PoolClosed);
        }
        let _permit = self
            .inner
            .permits
            .acquire()
            .await
            .map_err(|_| Error::PoolClosed)?;

        let inner = self.inner.clone();
        task::spawn_blocking(move || {
            let pooled = inner.idle.lock().ok().and_then(|mut idle| idle.pop());
            let mut conn = match pooled {
                Some(conn) => conn,
                None => open_connection(&inner.path)?,
            };
            let out = f(&mut conn);
            if !inner.closed.load(Ordering::SeqCst) {
                if let Ok(mut idle) = inner.idle.lock() {
                    idle.push(conn);
                }
            }
            out
        })
        .await?
    }

    /// Rejects new work and drops idle connections. In-flight calls finish
    /// and their connections are dropped instead of returned.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.permits.close();
        let dropped = self
            .inner
            .idle
            .lock()
            .map(|mut idle| idle.drain(..).count())
            .unwrap_or(0);
        debug!(path = %self.inner.path.display(), dropped, "Mirror connection pool closed");
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        ",
    )?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pool_runs_queries_and_rejects_after_close() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = ConnectionPool::open(dir.path().join("mirror.sqlite"), 2)
            .await
            .expect("open pool");

        let mut handles = Vec::new();
        for _ in 0..6 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                pool.with_conn(|conn| {
                    Ok(conn.query_row("SELECT COUNT(*) FROM items", [], |row| {
                        row.get::<_, i64>(0)
                    })?)
                })
                .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.expect("join").expect("query"), 0);
        }

        pool.close();
        assert!(pool.is_closed());
        let after = pool.with_conn(|_| Ok(())).await;
        assert!(matches!(after, Err(Error::PoolClosed)));
    }
}
