// Refresh-token grant. Optional: the session controller only gets a
// refresher when a client secret is configured, otherwise expired
// sessions go through the browser flow again.

use crate::config::Config;
use crate::error::AuthError;
use crate::store::{
    CredentialRecord, ACCESS_TOKEN, ACCOUNT_ID, ACCOUNT_USERNAME, EXPIRES_IN, EXPIRE_DATE,
    REFRESH_TOKEN,
};
use crate::token::{compute_expire_date, format_expire_date};
use chrono::Utc;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};

/// Renews an expired access token without user interaction.
pub trait TokenRefresher {
    /// Return an updated copy of `record` carrying fresh tokens.
    fn refresh(&self, record: &CredentialRecord) -> Result<CredentialRecord, AuthError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u32,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    account_username: Option<String>,
    #[serde(default)]
    account_id: Option<serde_json::Value>,
}

/// Refresh-token grant against the host's OAuth token endpoint.
pub struct ImgurRefresher {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl ImgurRefresher {
    /// `None` when no client secret is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, AuthError> {
        let Some(secret) = config.client_secret.clone() else {
            return Ok(None);
        };
        let client = Client::builder().timeout(config.upload_timeout).build()?;
        Ok(Some(ImgurRefresher {
            client,
            token_url: config.token_url(),
            client_id: config.client_id.clone(),
            client_secret: secret,
        }))
    }
}

impl TokenRefresher for ImgurRefresher {
    fn refresh(&self, record: &CredentialRecord) -> Result<CredentialRecord, AuthError> {
        let refresh_token = record.get(REFRESH_TOKEN).unwrap_or_default();
        debug!(url = %self.token_url, "refreshing access token");

        let res = self
            .client
            .post(&self.token_url)
            .form(&[
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()?;

        let status = res.status().as_u16();
        if status != 200 {
            return Err(AuthError::Refresh {
                status,
                body: res.text().unwrap_or_default(),
            });
        }

        let token: TokenResponse = res.json()?;
        let mut updated = record.clone();
        updated.insert(ACCESS_TOKEN, token.access_token);
        updated.insert(EXPIRES_IN, token.expires_in.to_string());
        updated.insert(
            EXPIRE_DATE,
            format_expire_date(compute_expire_date(Utc::now(), token.expires_in)),
        );
        if let Some(refresh_token) = token.refresh_token {
            updated.insert(REFRESH_TOKEN, refresh_token);
        }
        if let Some(username) = token.account_username {
            updated.insert(ACCOUNT_USERNAME, username);
        }
        match token.account_id {
            Some(serde_json::Value::String(id)) => updated.insert(ACCOUNT_ID, id),
            Some(serde_json::Value::Number(id)) => updated.insert(ACCOUNT_ID, id.to_string()),
            _ => {}
        }
        info!("access token refreshed");
        Ok(updated)
    }
}
