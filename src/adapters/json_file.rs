use crate::adapters::tables::Tables;
use crate::domain::model::{
    Binding, Guard, GuardId, GuardStatus, NewServiceRequest, RequestId, RequestState,
    ServiceRequest, Transition,
};
use crate::domain::ports::DispatchStore;
use crate::utils::error::{DispatchError, Result};
use async_trait::async_trait;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Store backed by a single JSON snapshot file.
///
/// An open store holds an exclusive OS lock on `<snapshot>.lock` until it is
/// dropped, so at most one process reads and writes the snapshot at a time and
/// the tables loaded in `open` are never stale.
///
/// Mutations run against a copy of the tables. The copy is written to a
/// temporary file that is renamed over the snapshot, and only then replaces the
/// in-memory tables. A failed write therefore leaves both untouched.
pub struct JsonFileStore {
    path: PathBuf,
    tables: Mutex<Tables>,
    _lock: File,
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

fn acquire_lock(lock_path: &Path, wait: bool) -> Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?;

    if wait {
        file.lock_exclusive()?;
    } else if let Err(e) = file.try_lock_exclusive() {
        if e.kind() == std::io::ErrorKind::WouldBlock {
            return Err(DispatchError::persistence(format!(
                "state is locked by another process ({})",
                lock_path.display()
            )));
        }
        return Err(e.into());
    }
    Ok(file)
}

impl JsonFileStore {
    /// Opens the snapshot at `path`, waiting for any other holder of the lock
    /// to finish. Starts empty when the file does not exist yet.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path.as_ref(), true).await
    }

    /// Like [`JsonFileStore::open`] but fails with `PersistenceFailure` instead
    /// of waiting when the snapshot is held elsewhere.
    pub async fn try_open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path.as_ref(), false).await
    }

    async fn open_with(path: &Path, wait: bool) -> Result<Self> {
        let path = path.to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let lock_path = sibling(&path, ".lock");
        let lock = tokio::task::spawn_blocking(move || acquire_lock(&lock_path, wait))
            .await
            .map_err(|e| DispatchError::persistence(format!("lock task failed: {}", e)))??;

        // 取得鎖之後才讀取，確保看到其他程序最後寫入的狀態
        let tables = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Tables::default(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!("Opened state snapshot {}", path.display());
        Ok(Self {
            path,
            tables: Mutex::new(tables),
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, tables: &Tables) -> Result<()> {
        let data = serde_json::to_vec_pretty(tables)?;
        let tmp_path = sibling(&self.path, ".tmp");

        tokio::fs::write(&tmp_path, &data).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    async fn mutate<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut Tables) -> Result<T> + Send,
        T: Send,
    {
        let mut tables = self.tables.lock().await;
        let mut next = tables.clone();
        let out = change(&mut next)?;

        if let Err(e) = self.persist(&next).await {
            tracing::error!("Snapshot write to {} failed: {}", self.path.display(), e);
            return Err(e);
        }

        *tables = next;
        Ok(out)
    }
}

#[async_trait]
impl DispatchStore for JsonFileStore {
    async fn get_request(&self, id: RequestId) -> Result<ServiceRequest> {
        self.tables.lock().await.get_request(id)
    }

    async fn insert_request(&self, request: NewServiceRequest) -> Result<ServiceRequest> {
        self.mutate(|t| Ok(t.insert_request(request))).await
    }

    async fn save_request(&self, request: &ServiceRequest) -> Result<()> {
        self.mutate(|t| t.save_request(request)).await
    }

    async fn list_requests(&self, filter: Option<RequestState>) -> Result<Vec<ServiceRequest>> {
        Ok(self.tables.lock().await.list_requests(filter))
    }

    async fn get_guard(&self, id: GuardId) -> Result<Guard> {
        self.tables.lock().await.get_guard(id)
    }

    async fn insert_guard(&self, label: &str) -> Result<Guard> {
        self.mutate(|t| Ok(t.insert_guard(label))).await
    }

    async fn save_guard(&self, guard: &Guard) -> Result<()> {
        self.mutate(|t| {
            t.save_guard(guard);
            Ok(())
        })
        .await
    }

    async fn list_guards(&self, filter: Option<GuardStatus>) -> Result<Vec<Guard>> {
        Ok(self.tables.lock().await.list_guards(filter))
    }

    async fn create_binding(&self, request_id: RequestId, guard_id: GuardId) -> Result<Binding> {
        self.mutate(|t| t.create_binding(request_id, guard_id)).await
    }

    async fn list_bindings(&self) -> Result<Vec<Binding>> {
        Ok(self.tables.lock().await.list_bindings())
    }

    async fn bindings_for_request(&self, request_id: RequestId) -> Result<Vec<Binding>> {
        Ok(self.tables.lock().await.bindings_for_request(request_id))
    }

    async fn commit(&self, transition: Transition) -> Result<Option<Binding>> {
        self.mutate(|t| t.apply(transition)).await
    }
}
