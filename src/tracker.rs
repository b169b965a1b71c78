use std::future;
use std::time::Duration;

use log::{debug, info, warn};
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc::UnboundedSender;

use crate::ticker::Ticker;
use crate::time_entry::{format_elapsed, Activity, NewTimeEntry, TimeEntry};
use crate::timer::{Timer, TimerState};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// 計測終了時に確定したエントリーを受け取るためのtrait。
///
/// 呼び出し側は結果を待たない。
#[cfg_attr(test, automock)]
pub trait SaveHandler {
    /// 確定したエントリーを保存先へ渡す。
    ///
    /// # Arguments
    ///
    /// * `entry` - 経過秒数が1以上の確定済みエントリー
    fn save(&self, entry: NewTimeEntry);
}

impl SaveHandler for UnboundedSender<NewTimeEntry> {
    fn save(&self, entry: NewTimeEntry) {
        if self.send(entry).is_err() {
            warn!("Entry receiver is closed, finished entry was dropped");
        }
    }
}

/// 描画用のトラッカーの状態。
#[derive(Clone, Debug, PartialEq)]
pub struct TrackerView {
    pub running: bool,
    pub elapsed: String,
    pub activity: String,
    pub description: String,
    pub tags: Vec<String>,
    pub can_stop: bool,
}

/// タイマーの状態機械と刻みのタイマーを束ねる計測ウィジェット。
///
/// 刻みのタイマーは実行中のみ保持し、一時停止、停止、破棄の時点で必ず手放す。
pub struct Tracker<S: SaveHandler> {
    timer: Timer,
    ticker: Option<Ticker>,
    save_handler: S,
}

impl<S: SaveHandler> Tracker<S> {
    /// 新しい`Tracker`を返す。
    ///
    /// # Arguments
    ///
    /// * `save_handler` - 計測終了時にエントリーを受け取るハンドラー
    pub fn new(save_handler: S) -> Self {
        Self::with_timer(Timer::new(), save_handler)
    }

    /// 過去のエントリーを元にした`Tracker`を返す。経過秒数は0から始まる。
    pub fn seeded_from(entry: &TimeEntry, save_handler: S) -> Self {
        Self::with_timer(Timer::seeded_from(entry), save_handler)
    }

    fn with_timer(timer: Timer, save_handler: S) -> Self {
        Self {
            timer,
            ticker: None,
            save_handler,
        }
    }

    pub fn elapsed(&self) -> u64 {
        self.timer.elapsed()
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn start(&mut self) -> bool {
        if !self.timer.start() {
            return false;
        }
        self.ticker = Some(Ticker::every(TICK_PERIOD));
        info!("Timer started at {}", format_elapsed(self.timer.elapsed()));
        true
    }

    pub fn pause(&mut self) -> bool {
        if !self.timer.pause() {
            return false;
        }
        self.ticker = None;
        info!("Timer paused at {}", format_elapsed(self.timer.elapsed()));
        true
    }

    /// 計測を終了し、確定したエントリーを保存ハンドラーへ渡す。
    ///
    /// 経過秒数が0の場合は何もしない。
    pub fn stop(&mut self) -> bool {
        let Some(entry) = self.timer.stop() else {
            debug!("Stop ignored, nothing tracked yet");
            return false;
        };
        self.ticker = None;
        info!(
            "Timer stopped, saving {} of {}",
            format_elapsed(entry.elapsed),
            entry.activity
        );
        self.save_handler.save(entry);
        true
    }

    /// 次の刻みを待ち、反映後の経過秒数を返す。
    ///
    /// 実行中でない間は完了しない。
    pub async fn next_tick(&mut self) -> u64 {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
                self.timer.tick();
                self.timer.elapsed()
            }
            None => future::pending().await,
        }
    }

    pub fn set_activity(&mut self, activity: Activity) -> bool {
        self.timer.set_activity(activity)
    }

    pub fn set_description(&mut self, description: &str) -> bool {
        self.timer.set_description(description)
    }

    pub fn add_tag(&mut self, tag: &str) -> bool {
        self.timer.add_tag(tag)
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.timer.remove_tag(tag)
    }

    #[cfg(test)]
    pub fn tags(&self) -> &crate::time_entry::Tags {
        self.timer.tags()
    }

    pub fn view(&self) -> TrackerView {
        let running = self.timer.state() == TimerState::Running;
        TrackerView {
            running,
            elapsed: format_elapsed(self.timer.elapsed()),
            activity: self.timer.activity().to_string(),
            description: self.timer.description().to_string(),
            tags: self.timer.tags().iter().map(str::to_string).collect(),
            can_stop: self.timer.elapsed() > 0,
        }
    }
}
