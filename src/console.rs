use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::datetime::format_distance;
use crate::history::EntryDraft;
use crate::profile::ProfileView;
use crate::time_entry::{format_elapsed, TimeEntry};
use crate::tracker::TrackerView;

/// Consoleに各ウィジェットを表示するためのtrait。
pub trait ConsolePresenter {
    /// 計測中の状態を表示する。
    fn show_tracker(&mut self, view: &TrackerView) -> Result<()>;

    /// 計測中の経過時間を同じ行に上書きして表示する。
    fn show_elapsed(&mut self, elapsed: &str) -> Result<()>;

    /// タイムエントリーの一覧を表示する。
    ///
    /// # Arguments
    ///
    /// * `time_entries` - 表示するタイムエントリー。与えられた順に表示する
    /// * `now` - 相対時間の基準となる現在時刻
    fn show_history(&mut self, time_entries: &[TimeEntry], now: DateTime<Utc>) -> Result<()>;

    /// 編集中の下書きを表示する。
    fn show_draft(&mut self, draft: &EntryDraft) -> Result<()>;

    /// プロフィールダイアログを表示する。
    fn show_profile(&mut self, view: &ProfileView) -> Result<()>;

    /// 1行のメッセージを表示する。
    fn show_message(&mut self, message: &str) -> Result<()>;
}

/// 各ウィジェットをプレーンテキストで表示する。
pub struct ConsoleText<W: Write> {
    writer: W,
    /// 経過時間の行が改行されずに残っている
    ticking: bool,
}

impl<W: Write> ConsoleText<W> {
    /// 新しい`ConsoleText`を返す。
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            ticking: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn end_ticking_line(&mut self) -> Result<()> {
        if self.ticking {
            writeln!(self.writer).context("Failed to write elapsed time")?;
            self.ticking = false;
        }
        Ok(())
    }
}

impl<W: Write> ConsolePresenter for ConsoleText<W> {
    fn show_tracker(&mut self, view: &TrackerView) -> Result<()> {
        self.end_ticking_line()?;
        let state = match (view.running, view.can_stop) {
            (true, _) => "running",
            (false, true) => "paused",
            (false, false) => "idle",
        };
        writeln!(self.writer, "{} [{}] {}", view.elapsed, state, view.activity)
            .context("Failed to write tracker")?;
        if !view.description.is_empty() {
            writeln!(self.writer, "  {}", view.description).context("Failed to write tracker")?;
        }
        if !view.tags.is_empty() {
            writeln!(self.writer, "  tags: {}", view.tags.join(", "))
                .context("Failed to write tracker")?;
        }

        Ok(())
    }

    fn show_elapsed(&mut self, elapsed: &str) -> Result<()> {
        write!(self.writer, "\r{}", elapsed).context("Failed to write elapsed time")?;
        self.writer.flush().context("Failed to write elapsed time")?;
        self.ticking = true;
        Ok(())
    }

    fn show_history(&mut self, time_entries: &[TimeEntry], now: DateTime<Utc>) -> Result<()> {
        self.end_ticking_line()?;
        writeln!(self.writer, "Recent Time Entries").context("Failed to write history")?;
        if time_entries.is_empty() {
            writeln!(self.writer, "No time entries recorded yet")
                .context("Failed to write history")?;
            return Ok(());
        }

        for (position, entry) in time_entries.iter().enumerate() {
            writeln!(
                self.writer,
                "{}. {} {} ({})",
                position + 1,
                format_elapsed(entry.elapsed),
                entry.activity,
                format_distance(entry.timestamp, now)
            )
            .with_context(|| format!("Failed to write time entry: {:?}", entry))?;
            if let Some(description) = &entry.description {
                writeln!(self.writer, "   {}", description)
                    .with_context(|| format!("Failed to write time entry: {:?}", entry))?;
            }
            if !entry.tags.is_empty() {
                let tags = entry.tags.iter().collect::<Vec<_>>().join(", ");
                writeln!(self.writer, "   tags: {}", tags)
                    .with_context(|| format!("Failed to write time entry: {:?}", entry))?;
            }
        }

        Ok(())
    }

    fn show_draft(&mut self, draft: &EntryDraft) -> Result<()> {
        self.end_ticking_line()?;
        let entry = draft.entry();
        let tags = entry.tags.iter().collect::<Vec<_>>().join(", ");
        writeln!(
            self.writer,
            "Editing #{}: {} {} desc=\"{}\" tags=[{}]",
            entry.id,
            format_elapsed(entry.elapsed),
            entry.activity,
            entry.description.as_deref().unwrap_or_default(),
            tags
        )
        .context("Failed to write draft")?;

        Ok(())
    }

    fn show_profile(&mut self, view: &ProfileView) -> Result<()> {
        self.end_ticking_line()?;
        writeln!(self.writer, "{}", view.title()).context("Failed to write profile")?;
        writeln!(self.writer, "{}", view.description()).context("Failed to write profile")?;
        match view {
            ProfileView::Account { name, email } => {
                writeln!(self.writer, "  {} <{}>", name, email)
                    .context("Failed to write profile")?;
                writeln!(self.writer, "  signout").context("Failed to write profile")?;
            }
            ProfileView::SignIn => {
                writeln!(self.writer, "  signin <email> <password>")
                    .context("Failed to write profile")?;
                writeln!(self.writer, "  signup <name> <email> <password>")
                    .context("Failed to write profile")?;
            }
        }

        Ok(())
    }

    fn show_message(&mut self, message: &str) -> Result<()> {
        self.end_ticking_line()?;
        writeln!(self.writer, "{}", message).context("Failed to write message")?;
        Ok(())
    }
}
