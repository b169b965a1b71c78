use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use tokio::io::AsyncBufRead;

use crate::app::App;
use crate::auth_client::AuthClient;
use crate::console::ConsoleText;
use crate::store::EntryStore;
use crate::time_entry::Activity;

/// 対話的に計測を行うためのサブコマンド。
#[derive(Debug, clap::Args)]
pub struct TrackArgs {
    #[clap(
        short = 'a',
        long = "activity",
        help = "Sets the initial activity",
        parse(try_from_str = parse_activity),
    )]
    activity: Option<Activity>,

    #[clap(short = 'd', long = "description", help = "Sets the initial description")]
    description: Option<String>,

    #[clap(
        short = 't',
        long = "tag",
        help = "Adds an initial tag, can be repeated",
        multiple_occurrences = true
    )]
    tags: Vec<String>,
}

pub struct TrackCommand<A: AuthClient + 'static, E: EntryStore> {
    auth: Arc<A>,
    store: Arc<E>,
}

impl<A: AuthClient + 'static, E: EntryStore> TrackCommand<A, E> {
    /// 新しい`TrackCommand`を返す。
    ///
    /// # Arguments
    /// * `auth` - 認証サーバーと通信するクライアント
    /// * `store` - タイムエントリーの保存先
    pub fn new(auth: Arc<A>, store: Arc<E>) -> Self {
        Self { auth, store }
    }

    /// `track`サブコマンドの処理を行う。
    ///
    /// 引数で指定された値を初期値としてトラッカーを用意し、入力が尽きるまで対話セッションを続ける。
    ///
    /// # Arguments
    ///
    /// * `track` - `track`サブコマンドの引数
    /// * `input` - コマンドを読み込む入力
    /// * `output` - 画面の出力先
    pub async fn run<R, W>(&self, track: TrackArgs, input: R, output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut app = App::new(
            Arc::clone(&self.auth),
            Arc::clone(&self.store),
            ConsoleText::new(output),
        );

        let tracker = app.tracker_mut();
        if let Some(activity) = track.activity {
            tracker.set_activity(activity);
        }
        if let Some(description) = &track.description {
            tracker.set_description(description);
        }
        for tag in &track.tags {
            tracker.add_tag(tag);
        }

        info!("Tracking session started");
        app.run(input).await.context("Tracking session failed")?;
        info!("Tracking session finished");

        Ok(())
    }
}

/// アクティビティをパースする。
fn parse_activity(s: &str) -> Result<Activity> {
    Activity::parse(s).with_context(|| format!("Invalid activity: {:?}", s))
}
