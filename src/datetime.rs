use chrono::{DateTime, Utc};

#[cfg(not(test))]
/// 現在のUTC時間を取得する。
pub fn now() -> DateTime<Utc> {
    Utc::now()
}


#[cfg(test)]
pub use mock_datetime::now;

/// `time`が`now`からどれだけ離れているかを英語の相対表現で返す。
///
/// 過去であれば`"5 minutes ago"`、未来であれば`"in 5 minutes"`の形式になる。
pub fn format_distance(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(time).num_seconds();
    let distance = describe_seconds(diff.unsigned_abs());

    if diff >= 0 {
        format!("{} ago", distance)
    } else {
        format!("in {}", distance)
    }
}

fn describe_seconds(seconds: u64) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;

    // 分単位は四捨五入で扱う
    let minutes = (seconds + MINUTE / 2) / MINUTE;
    match seconds {
        s if s < 30 => "less than a minute".to_string(),
        s if s < 90 => "1 minute".to_string(),
        s if s < 44 * MINUTE + 30 => format!("{} minutes", minutes),
        s if s < 89 * MINUTE + 30 => "about 1 hour".to_string(),
        s if s < DAY => format!("about {} hours", (s + HOUR / 2) / HOUR),
        s if s < 42 * HOUR => "1 day".to_string(),
        s if s < 30 * DAY => format!("{} days", (s + DAY / 2) / DAY),
        s if s < 45 * DAY => "about 1 month".to_string(),
        s if s < 60 * DAY => "about 2 months".to_string(),
        s if s < 365 * DAY => format!("{} months", s / (30 * DAY)),
        s => format!("about {} years", s / (365 * DAY)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
    use rstest::rstest;

    use super::format_distance;
    use super::mock_datetime;

    /// 何も設定しない場合は、現在時間が取得できることを確認する。
    ///
    ///  - 現在時刻での比較を行なっているため、ミリ秒単位まで比較するとテストが失敗する可能性があり、秒単位で比較している。
    #[test]
    fn test_now() {
        assert_eq!(
            mock_datetime::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }

    /// モック時間を設定した時に、その時間が取得できることを確認する。
    #[test]
    fn test_now_specific_datetime() {
        let datetime = String::from("2024-01-01T00:00:00+00:00");
        mock_datetime::set_mock_time(
            DateTime::parse_from_rfc3339(datetime.as_str())
                .unwrap()
                .to_utc(),
        );

        assert_eq!(mock_datetime::now().to_rfc3339(), datetime);
        mock_datetime::clear_mock_time();
    }

    #[rstest]
    #[case::just_now(Duration::seconds(10), "less than a minute ago")]
    #[case::one_minute(Duration::seconds(75), "1 minute ago")]
    #[case::minutes(Duration::minutes(5), "5 minutes ago")]
    #[case::about_an_hour(Duration::minutes(60), "about 1 hour ago")]
    #[case::hours(Duration::hours(3), "about 3 hours ago")]
    #[case::one_day(Duration::hours(30), "1 day ago")]
    #[case::days(Duration::days(4), "4 days ago")]
    #[case::about_a_month(Duration::days(35), "about 1 month ago")]
    #[case::months(Duration::days(200), "6 months ago")]
    #[case::years(Duration::days(800), "about 2 years ago")]
    #[case::future(Duration::minutes(-5), "in 5 minutes")]
    fn test_format_distance(#[case] age: Duration, #[case] expected: &str) {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        assert_eq!(format_distance(now - age, now), expected);
    }
}
