// Session controller: one entry point that looks at the stored
// credentials, decides between anonymous upload, direct upload, token
// refresh or a fresh authorization, and then performs the upload.

use crate::api::{Credential, ImagePayload, Transport, UploadClient};
use crate::auth::{AuthFlow, Browser, Interaction};
use crate::config::Config;
use crate::error::{AuthError, Result};
use crate::refresh::TokenRefresher;
use crate::store::{CredentialRecord, CredentialStore};
use crate::token::{deauthorize, is_authorized, is_expired};
use tracing::{info, warn};

pub struct SessionController<T: Transport> {
    config: Config,
    store: CredentialStore,
    uploader: UploadClient<T>,
    browser: Box<dyn Browser>,
    refresher: Option<Box<dyn TokenRefresher>>,
}

impl<T: Transport> SessionController<T> {
    pub fn new(config: Config, uploader: UploadClient<T>, browser: Box<dyn Browser>) -> Self {
        let store = CredentialStore::new(&config.storage_path, &config.client_id);
        SessionController {
            config,
            store,
            uploader,
            browser,
            refresher: None,
        }
    }

    /// Install the optional silent-refresh capability.
    pub fn with_refresher(mut self, refresher: Option<Box<dyn TokenRefresher>>) -> Self {
        self.refresher = refresher;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Upload `payload`, authorizing or renewing the session first when
    /// needed, and return the hosted image URL.
    pub fn upload(&self, payload: &ImagePayload, ui: &mut dyn Interaction) -> Result<String> {
        let record = self.store.load()?;

        let record = if !is_authorized(&record) {
            if !ui.confirm_authorize().map_err(AuthError::from)? {
                info!("uploading anonymously");
                let client_id = record.client_id().unwrap_or(self.config.client_id.as_str());
                return Ok(self
                    .uploader
                    .upload(payload, &Credential::Anonymous { client_id })?);
            }
            self.authorize(&record, ui)?
        } else if is_expired(&record) {
            self.renew(&record, ui)?
        } else {
            record
        };

        let access_token = record.access_token().unwrap_or_default();
        Ok(self
            .uploader
            .upload(payload, &Credential::Bearer { access_token })?)
    }

    /// Forget the stored authorization, keeping only the client id.
    pub fn deauthorize(&self) -> Result<()> {
        let record = self.store.load()?;
        self.store.save(&deauthorize(&record))?;
        info!("authorization removed");
        Ok(())
    }

    fn authorize(
        &self,
        record: &CredentialRecord,
        ui: &mut dyn Interaction,
    ) -> Result<CredentialRecord> {
        let flow = AuthFlow::new(&self.config, &self.store, self.browser.as_ref());
        Ok(flow.run(record, ui)?)
    }

    /// Expired session: refresh silently when possible, otherwise (or when
    /// the refresh is refused) authorize again through the browser.
    ///
    /// Re-authorization starts from the record stripped to its client id,
    /// so the stale tokens never satisfy the new callback's checks.
    fn renew(
        &self,
        record: &CredentialRecord,
        ui: &mut dyn Interaction,
    ) -> Result<CredentialRecord> {
        if let Some(refresher) = &self.refresher {
            match refresher.refresh(record) {
                Ok(updated) if is_authorized(&updated) => {
                    self.store.save(&updated)?;
                    return Ok(updated);
                }
                Ok(_) => warn!("refresh response incomplete, falling back to authorization"),
                Err(e) => warn!(error = %e, "token refresh failed, falling back to authorization"),
            }
        }
        ui.notify("Your authorization has expired, please authorize again.");
        self.authorize(&deauthorize(record), ui)
    }
}
