use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// 計測中に1秒ごとの刻みを発生させる、所有者専用のタイマー。
///
/// 最初の刻みは作成から1周期後に発生する。ハンドルを破棄すると刻みも止まる。
#[derive(Debug)]
pub struct Ticker {
    interval: Interval,
}

impl Ticker {
    pub fn every(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        // 遅れた刻みは取りこぼさずまとめて発生させる
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
        Self { interval }
    }

    /// 次の刻みまで待つ。
    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::{timeout, Instant};

    use super::Ticker;

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let started = Instant::now();
        let mut ticker = Ticker::every(Duration::from_secs(1));

        ticker.tick().await;
        ticker.tick().await;

        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_before_period() {
        let mut ticker = Ticker::every(Duration::from_secs(1));

        let result = timeout(Duration::from_millis(999), ticker.tick()).await;

        assert!(result.is_err());
    }
}
