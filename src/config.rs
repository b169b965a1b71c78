use std::env;

use anyhow::{bail, Context, Result};

/// 認証サーバーのURLを指定する環境変数。
pub const AUTH_URL_ENV: &str = "TRACKTIME_AUTH_URL";

/// 実行時の設定。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub auth_url: String,
}

impl Config {
    /// 設定を読み込む。
    ///
    /// 引数で指定されたURLを優先し、指定がなければ環境変数`TRACKTIME_AUTH_URL`を利用する。
    /// どちらも設定されていない場合はエラーを返す。
    pub fn load(auth_url: Option<String>) -> Result<Self> {
        let auth_url = match auth_url {
            Some(url) => url,
            None => env::var(AUTH_URL_ENV)
                .with_context(|| format!("{} must be set", AUTH_URL_ENV))?,
        };
        if auth_url.trim().is_empty() {
            bail!("Auth server URL must not be empty");
        }

        Ok(Self {
            auth_url: auth_url.trim().to_string(),
        })
    }
}
