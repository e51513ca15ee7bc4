//! WeChat mini-program login support
//!
//! Exchanges a client-side `wx.login()` code for the user's openid via the
//! jscode2session endpoint. Only constructed when both app id and secret are
//! configured.

use serde::Deserialize;
use tracing::debug;

use crate::types::{Result, RollcallError};

const JSCODE2SESSION_URL: &str = "https://api.weixin.qq.com/sns/jscode2session";

#[derive(Clone)]
pub struct WxClient {
    http: reqwest::Client,
    app_id: String,
    secret: String,
}

#[derive(Deserialize)]
struct SessionResponse {
    #[serde(default)]
    openid: Option<String>,
    #[serde(default)]
    errcode: Option<i64>,
    #[serde(default)]
    errmsg: Option<String>,
}

impl WxClient {
    pub fn new(app_id: String, secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            app_id,
            secret,
        }
    }

    /// Exchange a login code for the openid it belongs to.
    pub async fn code_to_open_id(&self, code: &str) -> Result<String> {
        let response = self
            .http
            .get(JSCODE2SESSION_URL)
            .query(&[
                ("appid", self.app_id.as_str()),
                ("secret", self.secret.as_str()),
                ("js_code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| RollcallError::Http(format!("wx session request: {e}")))?;

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| RollcallError::Http(format!("wx session response: {e}")))?;

        if let Some(errcode) = session.errcode.filter(|c| *c != 0) {
            let msg = session.errmsg.unwrap_or_default();
            debug!("wx session exchange failed: {} {}", errcode, msg);
            return Err(RollcallError::Auth(format!(
                "wx session exchange failed: {errcode} {msg}"
            )));
        }

        session
            .openid
            .ok_or_else(|| RollcallError::Auth("wx session response missing openid".to_string()))
    }
}
