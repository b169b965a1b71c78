use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
#[cfg(test)]
use mockall::automock;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{Deserialize, Serialize};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// ログイン中のユーザー情報。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
}

/// 認証サーバーが返すセッション。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Session {
    pub user: User,
}

/// 認証サーバーとやり取りするためのtrait。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// 現在のセッションを取得する。ログインしていない場合は`None`を返す。
    async fn get_session(&self) -> Result<Option<Session>>;

    /// ログアウトする。
    async fn sign_out(&self) -> Result<()>;

    /// メールアドレスとパスワードでログインする。
    async fn sign_in_email(&self, email: &str, password: &str) -> Result<Session>;

    /// アカウントを作成してログインする。
    async fn sign_up_email(&self, name: &str, email: &str, password: &str) -> Result<Session>;
}

#[derive(Debug, Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SignUpRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

/// ログイン、アカウント作成時のレスポンス。
#[derive(Debug, Deserialize)]
struct AuthResponse {
    user: User,
}

/// HTTPで認証サーバーと通信するクライアント。
///
/// セッションはcookieで維持する。
///
/// # Examples
///
/// ```
/// let client = HttpAuthClient::new("http://localhost:3000").unwrap();
/// let session = client.get_session().await.unwrap();
/// ```
pub struct HttpAuthClient {
    client: Client,
    api_url: String,
}

impl HttpAuthClient {
    /// 新しい`HttpAuthClient`を返す。
    ///
    /// # Arguments
    ///
    /// * `base_url` - 認証サーバーのURL
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: format!("{}/api/auth", base_url.trim_end_matches('/')),
        })
    }

    async fn post_auth<T: Serialize + Sync + ?Sized>(&self, path: &str, body: &T) -> Result<Session> {
        let response = self
            .client
            .post(format!("{}/{}", self.api_url, path))
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to auth server at {}", self.api_url))?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<AuthResponse>()
            .await
            .context("Failed to deserialize response")?;

        Ok(Session {
            user: response.user,
        })
    }
}

#[async_trait]
impl AuthClient for HttpAuthClient {
    async fn get_session(&self) -> Result<Option<Session>> {
        let session = self
            .client
            .get(format!("{}/get-session", self.api_url))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to send request to auth server at {}", self.api_url))?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<Option<Session>>()
            .await
            .context("Failed to deserialize response")?;
        info!("Session present: {}", session.is_some());

        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        self.client
            .post(format!("{}/sign-out", self.api_url))
            .header(CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await
            .with_context(|| format!("Failed to send request to auth server at {}", self.api_url))?
            .error_for_status()
            .context("Request returned an error status")?;

        Ok(())
    }

    async fn sign_in_email(&self, email: &str, password: &str) -> Result<Session> {
        self.post_auth("sign-in/email", &SignInRequest { email, password })
            .await
            .context("Failed to sign in")
    }

    async fn sign_up_email(&self, name: &str, email: &str, password: &str) -> Result<Session> {
        self.post_auth(
            "sign-up/email",
            &SignUpRequest {
                name,
                email,
                password,
            },
        )
        .await
        .context("Failed to sign up")
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::{AuthClient, HttpAuthClient};

    const SESSION_BODY: &str =
        r#"{"session":{"id":"s1","token":"t"},"user":{"id":"u1","name":"Ada","email":"ada@example.com"}}"#;

    #[tokio::test]
    async fn test_get_session() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/auth/get-session")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SESSION_BODY)
            .create_async()
            .await;
        let client = HttpAuthClient::new(&server.url()).unwrap();

        let session = client.get_session().await.unwrap().unwrap();

        mock.assert_async().await;
        assert_eq!(session.user.name, "Ada");
        assert_eq!(session.user.email, "ada@example.com");
    }

    /// ログインしていない場合は`null`が返り、`None`になることを確認する。
    #[tokio::test]
    async fn test_get_session_signed_out() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/auth/get-session")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("null")
            .create_async()
            .await;
        let client = HttpAuthClient::new(&format!("{}/", server.url())).unwrap();

        assert!(client.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_session_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/auth/get-session")
            .with_status(500)
            .create_async()
            .await;
        let client = HttpAuthClient::new(&server.url()).unwrap();

        assert!(client.get_session().await.is_err());
    }

    #[tokio::test]
    async fn test_sign_in_email() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/auth/sign-in/email")
            .match_body(Matcher::Json(json!({
                "email": "ada@example.com",
                "password": "secret",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SESSION_BODY)
            .create_async()
            .await;
        let client = HttpAuthClient::new(&server.url()).unwrap();

        let session = client
            .sign_in_email("ada@example.com", "secret")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(session.user.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_sign_up_email() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/auth/sign-up/email")
            .match_body(Matcher::Json(json!({
                "name": "Ada",
                "email": "ada@example.com",
                "password": "secret",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SESSION_BODY)
            .create_async()
            .await;
        let client = HttpAuthClient::new(&server.url()).unwrap();

        client
            .sign_up_email("Ada", "ada@example.com", "secret")
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_sign_in_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/auth/sign-in/email")
            .with_status(401)
            .create_async()
            .await;
        let client = HttpAuthClient::new(&server.url()).unwrap();

        assert!(client.sign_in_email("a@b.c", "wrong").await.is_err());
    }

    #[tokio::test]
    async fn test_sign_out() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/auth/sign-out")
            .with_status(200)
            .create_async()
            .await;
        let client = HttpAuthClient::new(&server.url()).unwrap();

        client.sign_out().await.unwrap();

        mock.assert_async().await;
    }
}
