use log::debug;

use crate::datetime;
use crate::time_entry::{Activity, NewTimeEntry, Tags, TimeEntry};

/// タイマーの実行状態。
///
/// 一時停止中は`Idle`のまま経過秒数を保持する。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
}

/// 計測中のセッションを表す状態機械。
///
/// I/Oを持たない純粋な状態遷移のみを扱い、秒の刻みは呼び出し側が`tick`で与える。
/// 実行中はアクティビティ、説明、タグの編集ができない。
#[derive(Clone, Debug, PartialEq)]
pub struct Timer {
    state: TimerState,
    elapsed: u64,
    activity: Activity,
    description: String,
    tags: Tags,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// 既定のアクティビティで新しい`Timer`を返す。
    pub fn new() -> Self {
        Self {
            state: TimerState::Idle,
            elapsed: 0,
            activity: Activity::default(),
            description: String::new(),
            tags: Tags::new(),
        }
    }

    /// 過去のエントリーのアクティビティ、説明、タグを引き継いだ`Timer`を返す。
    ///
    /// 経過秒数は引き継がず0から始める。
    pub fn seeded_from(entry: &TimeEntry) -> Self {
        Self {
            activity: entry.activity.clone(),
            description: entry.description.clone().unwrap_or_default(),
            tags: entry.tags.clone(),
            ..Self::new()
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// 計測を開始する。既に実行中であれば何もしない。
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        self.state = TimerState::Running;
        true
    }

    /// 経過秒数を保持したまま計測を止める。
    pub fn pause(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.state = TimerState::Idle;
        true
    }

    /// 1秒分の刻みを反映する。実行中でなければ無視する。
    pub fn tick(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.elapsed += 1;
        true
    }

    /// 計測を終了し、保存するエントリーを確定する。
    ///
    /// 経過秒数が0の場合は何もせず`None`を返す。
    /// 確定後は経過秒数のみを0に戻し、アクティビティ、説明、タグは保持する。
    pub fn stop(&mut self) -> Option<NewTimeEntry> {
        if self.elapsed == 0 {
            return None;
        }

        let description = Some(self.description.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        let entry = NewTimeEntry {
            activity: self.activity.clone(),
            elapsed: self.elapsed,
            description,
            tags: self.tags.clone(),
            timestamp: datetime::now(),
        };
        debug!("Finalized entry: {:?}", entry);

        self.state = TimerState::Idle;
        self.elapsed = 0;
        Some(entry)
    }

    pub fn set_activity(&mut self, activity: Activity) -> bool {
        if self.is_running() {
            return false;
        }
        self.activity = activity;
        true
    }

    pub fn set_description(&mut self, description: &str) -> bool {
        if self.is_running() {
            return false;
        }
        self.description = description.to_string();
        true
    }

    pub fn add_tag(&mut self, tag: &str) -> bool {
        !self.is_running() && self.tags.insert(tag)
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        !self.is_running() && self.tags.remove(tag)
    }
}
