use std::future;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info};
#[cfg(test)]
use mockall::automock;
use tokio::task::JoinHandle;

use crate::auth_client::{AuthClient, Session};

/// ログイン状態に依存する画面の再読み込みを依頼するためのtrait。
#[cfg_attr(test, automock)]
pub trait RouteRefresher {
    fn refresh(&self);
}

/// プロフィールダイアログの表示内容。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfileView {
    /// ログイン済みのアカウント情報とログアウト操作。
    Account { name: String, email: String },
    /// ログイン、アカウント作成フォーム。
    SignIn,
}

impl ProfileView {
    pub fn title(&self) -> &'static str {
        match self {
            ProfileView::Account { .. } => "Account",
            ProfileView::SignIn => "Sign in or create account",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ProfileView::Account { .. } => "Manage your account settings",
            ProfileView::SignIn => "Sign in to your account or create a new one",
        }
    }
}

/// アカウント情報を表示するダイアログ。
///
/// 作成時にセッションの取得を1度だけ非同期に開始する。
/// 取得結果はダイアログ自身が`fetched`で取り込むため、破棄後に届いた結果が書き込まれることはない。
/// 取得に失敗した場合はログに残し、未ログインとして扱う。
pub struct ProfileDialog<A: AuthClient + 'static> {
    auth: Arc<A>,
    session: Option<Session>,
    pending: Option<JoinHandle<Result<Option<Session>>>>,
}

impl<A: AuthClient + 'static> ProfileDialog<A> {
    /// ダイアログを作成し、セッションの取得を開始する。
    pub fn mount(auth: Arc<A>) -> Self {
        let fetch = {
            let auth = Arc::clone(&auth);
            tokio::spawn(async move { auth.get_session().await })
        };

        Self {
            auth,
            session: None,
            pending: Some(fetch),
        }
    }

    /// 取得中のセッションがあれば完了を待って取り込む。
    pub async fn settle(&mut self) {
        if self.pending.is_some() {
            self.fetched().await;
        }
    }

    /// セッションの取得が完了するまで待って取り込む。
    ///
    /// 取得中でなければ完了しない。キャンセルしても取得は続くため、`select!`の分岐として使える。
    pub async fn fetched(&mut self) {
        let Some(fetch) = self.pending.as_mut() else {
            return future::pending().await;
        };

        let result = fetch.await;
        self.pending = None;
        match result {
            Ok(Ok(session)) => self.session = session,
            Ok(Err(err)) => error!("Error getting session: {:#}", err),
            Err(err) => error!("Session fetch task failed: {}", err),
        }
    }

    /// セッションを取得中かどうかを返す。
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn view(&self) -> ProfileView {
        match &self.session {
            Some(session) => ProfileView::Account {
                name: session.user.name.clone(),
                email: session.user.email.clone(),
            },
            None => ProfileView::SignIn,
        }
    }

    /// ログアウトし、画面の再読み込みを依頼する。
    ///
    /// 失敗した場合はログに残し、セッションはそのまま残す。
    pub async fn sign_out<R: RouteRefresher + ?Sized>(&mut self, router: &R) {
        self.abort_pending();
        match self.auth.sign_out().await {
            Ok(()) => {
                self.session = None;
                info!("Signed out");
                router.refresh();
            }
            Err(err) => error!("Error signing out: {:#}", err),
        }
    }

    /// メールアドレスとパスワードでログインする。
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<()> {
        let session = self
            .auth
            .sign_in_email(email, password)
            .await
            .context("Could not sign in")?;
        self.replace_session(session);
        Ok(())
    }

    /// アカウントを作成してログインする。
    pub async fn sign_up(&mut self, name: &str, email: &str, password: &str) -> Result<()> {
        let session = self
            .auth
            .sign_up_email(name, email, password)
            .await
            .context("Could not create account")?;
        self.replace_session(session);
        Ok(())
    }

    fn replace_session(&mut self, session: Session) {
        // 取得中の古いセッションで上書きされないようにする
        self.abort_pending();
        info!("Signed in as {}", session.user.email);
        self.session = Some(session);
    }

    fn abort_pending(&mut self) {
        if let Some(fetch) = self.pending.take() {
            fetch.abort();
        }
    }
}

impl<A: AuthClient + 'static> Drop for ProfileDialog<A> {
    fn drop(&mut self) {
        self.abort_pending();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::anyhow;
    use mockall::predicate::eq;

    use super::{MockRouteRefresher, ProfileDialog, ProfileView};
    use crate::auth_client::{MockAuthClient, Session, User};

    fn session(name: &str) -> Session {
        Session {
            user: User {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
            },
        }
    }

    #[tokio::test]
    async fn test_mount_fetches_session_once() {
        let mut auth = MockAuthClient::new();
        auth.expect_get_session()
            .times(1)
            .returning(|| Ok(Some(session("Ada"))));
        let mut dialog = ProfileDialog::mount(Arc::new(auth));

        dialog.settle().await;
        dialog.settle().await;

        assert_eq!(
            dialog.view(),
            ProfileView::Account {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            }
        );
        assert_eq!(dialog.view().title(), "Account");
    }

    /// セッション取得に失敗した場合、エラーではなくログインフォームを表示することを確認する。
    #[tokio::test]
    async fn test_fetch_error_shows_sign_in() {
        let mut auth = MockAuthClient::new();
        auth.expect_get_session()
            .times(1)
            .returning(|| Err(anyhow!("connection refused")));
        let mut dialog = ProfileDialog::mount(Arc::new(auth));

        dialog.settle().await;

        assert_eq!(dialog.view(), ProfileView::SignIn);
        assert_eq!(dialog.view().title(), "Sign in or create account");
    }

    #[tokio::test]
    async fn test_signed_out_session_shows_sign_in() {
        let mut auth = MockAuthClient::new();
        auth.expect_get_session().times(1).returning(|| Ok(None));
        let mut dialog = ProfileDialog::mount(Arc::new(auth));

        dialog.settle().await;

        assert!(dialog.session().is_none());
        assert_eq!(dialog.view(), ProfileView::SignIn);
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_and_refreshes() {
        let mut auth = MockAuthClient::new();
        auth.expect_get_session()
            .returning(|| Ok(Some(session("Ada"))));
        auth.expect_sign_out().times(1).returning(|| Ok(()));
        let mut router = MockRouteRefresher::new();
        router.expect_refresh().times(1).return_const(());
        let mut dialog = ProfileDialog::mount(Arc::new(auth));
        dialog.settle().await;

        dialog.sign_out(&router).await;

        assert_eq!(dialog.view(), ProfileView::SignIn);
    }

    #[tokio::test]
    async fn test_sign_out_failure_keeps_session() {
        let mut auth = MockAuthClient::new();
        auth.expect_get_session()
            .returning(|| Ok(Some(session("Ada"))));
        auth.expect_sign_out()
            .times(1)
            .returning(|| Err(anyhow!("server error")));
        let mut router = MockRouteRefresher::new();
        router.expect_refresh().never();
        let mut dialog = ProfileDialog::mount(Arc::new(auth));
        dialog.settle().await;

        dialog.sign_out(&router).await;

        assert!(dialog.session().is_some());
    }

    #[tokio::test]
    async fn test_sign_in_replaces_session() {
        let mut auth = MockAuthClient::new();
        auth.expect_get_session().returning(|| Ok(None));
        auth.expect_sign_in_email()
            .with(eq("grace@example.com"), eq("pw"))
            .times(1)
            .returning(|_, _| Ok(session("Grace")));
        let mut dialog = ProfileDialog::mount(Arc::new(auth));
        dialog.settle().await;

        dialog.sign_in("grace@example.com", "pw").await.unwrap();

        assert_eq!(dialog.session().unwrap().user.name, "Grace");
    }

    #[tokio::test]
    async fn test_sign_in_failure_keeps_signed_out() {
        let mut auth = MockAuthClient::new();
        auth.expect_get_session().returning(|| Ok(None));
        auth.expect_sign_in_email()
            .returning(|_, _| Err(anyhow!("invalid credentials")));
        let mut dialog = ProfileDialog::mount(Arc::new(auth));
        dialog.settle().await;

        assert!(dialog.sign_in("a@b.c", "x").await.is_err());
        assert_eq!(dialog.view(), ProfileView::SignIn);
    }

    #[tokio::test]
    async fn test_sign_up() {
        let mut auth = MockAuthClient::new();
        auth.expect_get_session().returning(|| Ok(None));
        auth.expect_sign_up_email()
            .with(eq("Lin"), eq("lin@example.com"), eq("pw"))
            .times(1)
            .returning(|_, _, _| Ok(session("Lin")));
        let mut dialog = ProfileDialog::mount(Arc::new(auth));

        dialog.sign_up("Lin", "lin@example.com", "pw").await.unwrap();
        dialog.settle().await;

        assert_eq!(dialog.session().unwrap().user.name, "Lin");
    }

    /// 取得待ちを打ち切っても、後から結果を取り込めることを確認する。
    #[tokio::test(start_paused = true)]
    async fn test_fetched_survives_cancellation() {
        let auth = Arc::new(SlowAuth);
        let mut dialog = ProfileDialog::mount(Arc::clone(&auth));

        let waited = tokio::time::timeout(Duration::from_secs(1), dialog.fetched()).await;

        assert!(waited.is_err());
        assert!(dialog.is_loading());
        assert_eq!(dialog.view(), ProfileView::SignIn);

        dialog.fetched().await;

        assert!(!dialog.is_loading());
        assert_eq!(dialog.session().unwrap().user.name, "Late");
    }

    /// ダイアログ破棄後に取得処理が打ち切られることを確認する。
    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_pending_fetch() {
        let auth = Arc::new(SlowAuth);
        let dialog = ProfileDialog::mount(Arc::clone(&auth));
        tokio::task::yield_now().await;

        drop(dialog);
        tokio::time::sleep(Duration::from_secs(10)).await;

        // 取得タスクが保持していた参照が解放されている
        assert_eq!(Arc::strong_count(&auth), 1);
    }

    /// 応答に時間のかかる認証クライアント。
    struct SlowAuth;

    #[async_trait::async_trait]
    impl crate::auth_client::AuthClient for SlowAuth {
        async fn get_session(&self) -> anyhow::Result<Option<Session>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Some(session("Late")))
        }

        async fn sign_out(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn sign_in_email(&self, _email: &str, _password: &str) -> anyhow::Result<Session> {
            Ok(session("Late"))
        }

        async fn sign_up_email(
            &self,
            _name: &str,
            _email: &str,
            _password: &str,
        ) -> anyhow::Result<Session> {
            Ok(session("Late"))
        }
    }
}
