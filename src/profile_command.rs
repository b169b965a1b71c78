use std::sync::Arc;

use anyhow::Result;

use crate::auth_client::AuthClient;
use crate::console::ConsolePresenter;
use crate::profile::ProfileDialog;

/// アカウント情報を表示するためのサブコマンド。
#[derive(Debug, clap::Args)]
pub struct ProfileArgs {}

pub struct ProfileCommand<A: AuthClient + 'static> {
    auth: Arc<A>,
}

impl<A: AuthClient + 'static> ProfileCommand<A> {
    /// 新しい`ProfileCommand`を返す。
    pub fn new(auth: Arc<A>) -> Self {
        Self { auth }
    }

    /// `profile`サブコマンドの処理を行う。
    ///
    /// セッションを1度だけ取得して表示する。取得に失敗した場合もログインフォームを表示する。
    pub async fn run<P: ConsolePresenter>(&self, _profile: ProfileArgs, presenter: &mut P) -> Result<()> {
        let mut dialog = ProfileDialog::mount(Arc::clone(&self.auth));
        dialog.settle().await;
        presenter.show_profile(&dialog.view())
    }
}
