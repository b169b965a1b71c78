use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::{debug, info};
#[cfg(test)]
use mockall::automock;

use crate::store::EntryStore;
use crate::time_entry::{Activity, Tags, TimeEntry};

/// 履歴一覧で行われた操作を受け取るためのtrait。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HistoryListener: Send + Sync {
    /// エントリーを元に新しい計測を始めるよう通知する。
    fn start_again(&self, entry: &TimeEntry);

    /// エントリーが編集されたので一覧を再取得するよう依頼する。
    async fn entry_updated(&self) -> Result<()>;
}

/// 編集中のエントリーの下書き。
#[derive(Clone, Debug, PartialEq)]
pub struct EntryDraft {
    entry: TimeEntry,
}

impl EntryDraft {
    pub fn entry(&self) -> &TimeEntry {
        &self.entry
    }

    pub fn set_activity(&mut self, activity: &str) -> Result<()> {
        self.entry.activity = Activity::parse(activity).context("Activity must not be empty")?;
        Ok(())
    }

    pub fn set_description(&mut self, description: Option<&str>) {
        self.entry.description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
    }

    pub fn set_elapsed(&mut self, elapsed: u64) {
        self.entry.elapsed = elapsed;
    }

    pub fn set_tags<'a, I: IntoIterator<Item = &'a str>>(&mut self, tags: I) {
        self.entry.tags = tags.into_iter().collect::<Tags>();
    }
}

/// 保存済みエントリーの一覧。
///
/// 一覧自体は外部から与えられ、このコンポーネントがエントリーを直接変更することはない。
/// 編集は同時に1件までで、保存は`EntryStore`を通して行う。
#[derive(Debug, Default)]
pub struct HistoryList {
    entries: Vec<TimeEntry>,
    editing: Option<EntryDraft>,
}

impl HistoryList {
    pub fn new(entries: Vec<TimeEntry>) -> Self {
        Self {
            entries,
            editing: None,
        }
    }

    /// 再取得した一覧に置き換える。
    pub fn set_entries(&mut self, entries: Vec<TimeEntry>) {
        debug!("History refreshed with {} entries", entries.len());
        self.entries = entries;
    }

    pub fn entries(&self) -> &[TimeEntry] {
        &self.entries
    }

    fn entry_at(&self, index: usize) -> Result<&TimeEntry> {
        self.entries
            .get(index)
            .with_context(|| format!("No time entry at position {}", index + 1))
    }

    /// 指定したエントリーで計測をやり直すよう通知する。
    ///
    /// # Arguments
    ///
    /// * `index` - 一覧上の位置(0始まり)
    /// * `listener` - 通知先
    pub fn start_again<L: HistoryListener + ?Sized>(&self, index: usize, listener: &L) -> Result<()> {
        let entry = self.entry_at(index)?;
        info!("Starting again from time entry {}", entry.id);
        listener.start_again(entry);
        Ok(())
    }

    /// 指定したエントリーの編集を始める。
    ///
    /// 既に編集中のエントリーがある場合、その下書きは破棄される。
    pub fn open_edit(&mut self, index: usize) -> Result<&mut EntryDraft> {
        let entry = self.entry_at(index)?.clone();
        if let Some(previous) = &self.editing {
            debug!("Discarding draft of time entry {}", previous.entry.id);
        }
        info!("Editing time entry {}", entry.id);

        Ok(self.editing.insert(EntryDraft { entry }))
    }

    #[cfg(test)]
    pub fn draft(&self) -> Option<&EntryDraft> {
        self.editing.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut EntryDraft> {
        self.editing.as_mut()
    }

    /// 編集を取りやめる。
    pub fn cancel_edit(&mut self) -> bool {
        self.editing.take().is_some()
    }

    /// 編集中の下書きを保存し、一覧の再取得を依頼する。
    ///
    /// 保存に失敗した場合は下書きを残したままエラーを返す。
    pub async fn save_edit<E, L>(&mut self, store: &E, listener: &L) -> Result<()>
    where
        E: EntryStore + ?Sized,
        L: HistoryListener + ?Sized,
    {
        let Some(draft) = self.editing.take() else {
            bail!("No time entry is being edited");
        };

        if let Err(err) = store.update(draft.entry.clone()).await {
            self.editing = Some(draft);
            return Err(err.context("Failed to update time entry"));
        }

        listener
            .entry_updated()
            .await
            .context("Failed to refresh time entries")
    }
}
