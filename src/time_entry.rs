use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 記録対象の作業種別。
///
/// 既定の選択肢のほかに自由入力も受け付けるが、空文字列は許容しない。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Activity {
    #[default]
    RemoteWork,
    Meeting,
    Development,
    Research,
    Planning,
    Other(String),
}

impl Activity {
    /// 選択肢として提示する既定のアクティビティ。
    pub const PRESETS: [Activity; 5] = [
        Activity::RemoteWork,
        Activity::Meeting,
        Activity::Development,
        Activity::Research,
        Activity::Planning,
    ];

    /// 文字列からアクティビティを作成する。
    ///
    /// 前後の空白は取り除き、既定の選択肢とは大文字小文字を区別せずに照合する。
    /// 空白のみの場合は`None`を返す。
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        let preset = Self::PRESETS
            .into_iter()
            .find(|preset| preset.as_str().eq_ignore_ascii_case(s));
        Some(preset.unwrap_or_else(|| Activity::Other(s.to_string())))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Activity::RemoteWork => "Remote Work",
            Activity::Meeting => "Meeting",
            Activity::Development => "Development",
            Activity::Research => "Research",
            Activity::Planning => "Planning",
            Activity::Other(name) => name,
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Activity {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        Activity::parse(&s).context("Activity must not be empty")
    }
}

impl From<Activity> for String {
    fn from(activity: Activity) -> Self {
        activity.as_str().to_string()
    }
}

/// 重複のないタグの集合。挿入順を保持する。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Tags(Vec<String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// タグを追加する。
    ///
    /// 前後の空白を取り除いた結果が空、または既に存在する場合は何もせず`false`を返す。
    pub fn insert(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.contains(tag) {
            return false;
        }
        self.0.push(tag.to_string());
        true
    }

    /// 完全一致するタグを削除する。
    pub fn remove(&mut self, tag: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|t| t != tag);
        self.0.len() != before
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for Tags {
    fn from(tags: Vec<String>) -> Self {
        tags.iter().map(String::as_str).collect()
    }
}

impl From<Tags> for Vec<String> {
    fn from(tags: Tags) -> Self {
        tags.0
    }
}

impl<'a> FromIterator<&'a str> for Tags {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for tag in iter {
            tags.insert(tag);
        }
        tags
    }
}

/// 計測を停止した時点で確定した、保存前のタイムエントリー。
///
/// 保存先に渡され、IDが採番されて`TimeEntry`になる。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewTimeEntry {
    pub activity: Activity,
    pub elapsed: u64,
    pub description: Option<String>,
    pub tags: Tags,
    pub timestamp: DateTime<Utc>,
}

/// 保存済みのタイムエントリー。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: u64,
    pub activity: Activity,
    pub elapsed: u64,
    pub description: Option<String>,
    pub tags: Tags,
    pub timestamp: DateTime<Utc>,
}

impl TimeEntry {
    /// 採番したIDを付与して`TimeEntry`を作成する。
    pub fn from_new(id: u64, entry: NewTimeEntry) -> Self {
        Self {
            id,
            activity: entry.activity,
            elapsed: entry.elapsed,
            description: entry.description,
            tags: entry.tags,
            timestamp: entry.timestamp,
        }
    }
}

/// 経過秒数を`HH:MM:SS`形式に変換する。
///
/// 時間は24で折り返さない。
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}
