// Implicit-grant authorization driven by a human in the loop: we open the
// authorize page, the user grants access, and pastes back the URL the
// browser was redirected to. The token rides in that URL's fragment.

use crate::config::Config;
use crate::error::AuthError;
use crate::store::{CredentialRecord, CredentialStore, ACCOUNT_USERNAME, EXPIRES_IN, EXPIRE_DATE};
use crate::token::{compute_expire_date, format_expire_date, is_authorized, REQUIRED_KEYS};
use chrono::{DateTime, Utc};
use std::io;
use tracing::{debug, info, warn};

/// Everything the flow needs from the person at the keyboard.
pub trait Interaction {
    /// Offered when no stored authorization exists: `true` to authorize,
    /// `false` to post anonymously.
    fn confirm_authorize(&mut self) -> io::Result<bool>;

    /// Explain the steps and wait until the user is ready to open the browser.
    fn begin_authorization(&mut self, authorize_url: &str) -> io::Result<()>;

    /// Block until the user pastes the redirected URL.
    fn paste_callback_url(&mut self) -> io::Result<String>;

    fn notify(&mut self, message: &str);
}

/// Launches URLs in the user's browser.
pub trait Browser {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Default browser of the desktop session.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        open::that(url)
    }
}

/// Merge the `key=value` pairs from the callback URL fragment into a copy
/// of `record`. `expires_in` also yields a derived `expire_date`.
///
/// Any pair without `=` rejects the whole URL; `record` is never touched.
pub fn parse_callback(
    record: &CredentialRecord,
    callback_url: &str,
    now: DateTime<Utc>,
) -> Result<CredentialRecord, AuthError> {
    let (_, fragment) = callback_url
        .split_once('#')
        .ok_or(AuthError::MissingFragment)?;

    let mut updated = record.clone();
    for pair in fragment.split('&') {
        let (key, value) = pair
            .split_once('=')
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| AuthError::MalformedPair(pair.to_string()))?;

        if key == EXPIRES_IN {
            let secs: u32 = value
                .parse()
                .map_err(|_| AuthError::InvalidExpiry(value.to_string()))?;
            updated.insert(EXPIRE_DATE, format_expire_date(compute_expire_date(now, secs)));
        }
        updated.insert(key, value);
    }
    Ok(updated)
}

pub struct AuthFlow<'a> {
    config: &'a Config,
    store: &'a CredentialStore,
    browser: &'a dyn Browser,
}

impl<'a> AuthFlow<'a> {
    pub fn new(config: &'a Config, store: &'a CredentialStore, browser: &'a dyn Browser) -> Self {
        AuthFlow {
            config,
            store,
            browser,
        }
    }

    /// Run the browser round-trip until the user supplies a callback URL
    /// that yields a fully authorized record, persist it and return it.
    ///
    /// There is no retry limit; the user ends the loop by complying or by
    /// aborting input, which surfaces as [`AuthError::Interaction`].
    pub fn run(
        &self,
        record: &CredentialRecord,
        ui: &mut dyn Interaction,
    ) -> Result<CredentialRecord, AuthError> {
        let authorize_url = self.config.authorize_url();
        ui.begin_authorization(&authorize_url)?;

        if let Err(e) = self.browser.open(&authorize_url) {
            warn!(error = %e, "failed to launch browser");
            ui.notify(&format!(
                "Failed to launch the browser ({}). Open this page manually:\n  {}",
                e, authorize_url
            ));
        }

        loop {
            let pasted = ui.paste_callback_url()?;
            let pasted = pasted.trim();

            if !pasted.starts_with(&self.config.redirect_prefix) {
                ui.notify(&format!(
                    "Make sure you copy the full URL, it starts with {}",
                    self.config.redirect_prefix
                ));
                continue;
            }

            match parse_callback(record, pasted, Utc::now()) {
                Ok(updated) if is_authorized(&updated) => {
                    self.store.save(&updated)?;
                    info!(
                        account = updated.get(ACCOUNT_USERNAME).unwrap_or_default(),
                        "authorization stored"
                    );
                    return Ok(updated);
                }
                Ok(updated) => {
                    let missing: Vec<&str> = REQUIRED_KEYS
                        .iter()
                        .copied()
                        .filter(|key| !updated.contains(key))
                        .collect();
                    debug!(?missing, "callback URL lacks required keys");
                    ui.notify(&format!(
                        "That URL is missing {}. Make sure you copy the full URL.",
                        missing.join(", ")
                    ));
                }
                Err(e) => {
                    debug!(error = %e, "rejected callback URL");
                    ui.notify(&format!("{}. Please paste the URL again.", e));
                }
            }
        }
    }
}
