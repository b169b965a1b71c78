use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use log::info;
#[cfg(test)]
use mockall::automock;

use crate::time_entry::{NewTimeEntry, TimeEntry};

/// タイムエントリーの保存先を表すtrait。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// IDを採番してエントリーを保存する。
    async fn create(&self, entry: NewTimeEntry) -> Result<TimeEntry>;

    /// 保存されたエントリーを新しい順に取得する。
    async fn list(&self) -> Result<Vec<TimeEntry>>;

    /// 既存のエントリーを置き換える。存在しないIDの場合はエラーを返す。
    async fn update(&self, entry: TimeEntry) -> Result<()>;
}

/// プロセス内でのみエントリーを保持する保存先。
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    next_id: u64,
    entries: Vec<TimeEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryStoreInner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("Entry store lock is poisoned"))
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn create(&self, entry: NewTimeEntry) -> Result<TimeEntry> {
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let entry = TimeEntry::from_new(inner.next_id, entry);
        inner.entries.push(entry.clone());
        info!("Stored time entry {}", entry.id);

        Ok(entry)
    }

    async fn list(&self) -> Result<Vec<TimeEntry>> {
        let inner = self.lock()?;
        let mut entries = inner.entries.clone();
        // 同時刻の場合は後から作成したものを先にする
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));

        Ok(entries)
    }

    async fn update(&self, entry: TimeEntry) -> Result<()> {
        let mut inner = self.lock()?;
        let Some(stored) = inner.entries.iter_mut().find(|e| e.id == entry.id) else {
            bail!("Time entry {} does not exist", entry.id);
        };
        *stored = entry;
        info!("Updated time entry {}", stored.id);

        Ok(())
    }
}
