// Runtime configuration. Everything the core needs to know about its
// environment (where credentials live, which endpoints to talk to) is
// carried in `Config` and passed explicitly, so tests can point the
// whole stack at a temp dir and a local stub server.

use crate::error::{Error, Result};
use crate::format::LinkFormat;
use std::path::PathBuf;
use std::time::Duration;

/// Public client id registered for this application.
pub const DEFAULT_CLIENT_ID: &str = "95b05e2e3ac5624";

const DEFAULT_API_URL: &str = "https://api.imgur.com";

/// Where the browser lands after the user grants access.
const DEFAULT_REDIRECT_PREFIX: &str = "https://imgur.com/";

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(10);

const APP_NAME: &str = "clip2imgur";
const CREDENTIAL_FILE: &str = "credentials.json";

#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the persisted credential record.
    pub storage_path: PathBuf,
    pub client_id: String,
    /// Needed for the refresh-token grant; without it expired sessions
    /// go through the browser flow again.
    pub client_secret: Option<String>,
    /// Base URL of the image host API, without trailing slash.
    pub api_url: String,
    /// Prefix a pasted callback URL must start with to be considered.
    pub redirect_prefix: String,
    pub upload_timeout: Duration,
    pub link_format: LinkFormat,
}

impl Config {
    /// Defaults for everything except the credential file location.
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Config {
            storage_path: storage_path.into(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            client_secret: None,
            api_url: DEFAULT_API_URL.to_string(),
            redirect_prefix: DEFAULT_REDIRECT_PREFIX.to_string(),
            upload_timeout: UPLOAD_TIMEOUT,
            link_format: LinkFormat::default(),
        }
    }

    /// Build a config from `CLIP2IMGUR_*` environment variables, falling
    /// back to the public defaults.
    pub fn from_env() -> Result<Self> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let storage_path = match lookup("CLIP2IMGUR_CONFIG") {
            Some(path) => PathBuf::from(path),
            None => default_storage_path(),
        };
        let mut config = Config::new(storage_path);

        if let Some(client_id) = lookup("CLIP2IMGUR_CLIENT_ID") {
            config.client_id = client_id;
        }
        config.client_secret = lookup("CLIP2IMGUR_CLIENT_SECRET").filter(|s| !s.is_empty());
        if let Some(api_url) = lookup("CLIP2IMGUR_API_URL") {
            config = config.with_api_url(api_url);
        }
        if let Some(format) = lookup("CLIP2IMGUR_FORMAT") {
            config.link_format = format.parse().map_err(Error::Config)?;
        }
        Ok(config)
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_redirect_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.redirect_prefix = prefix.into();
        self
    }

    /// Browser page where the user grants access (implicit grant).
    pub fn authorize_url(&self) -> String {
        format!(
            "{}/oauth2/authorize?client_id={}&response_type=token&state=copy-url",
            self.api_url, self.client_id
        )
    }

    pub fn upload_url(&self) -> String {
        format!("{}/3/image", self.api_url)
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.api_url)
    }
}

fn default_storage_path() -> PathBuf {
    let dir = dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    dir.join(APP_NAME).join(CREDENTIAL_FILE)
}
