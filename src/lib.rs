// Library root
// -----------
// Uploads an image to Imgur and returns the hosted link. The binary
// (`main.rs`) wires these modules to the terminal.
//
// Module responsibilities:
// - `store`: the persisted credential record (single writer).
// - `token`: authorization / expiry status derived from that record.
// - `auth`: browser-based implicit-grant authorization and callback parsing.
// - `refresh`: optional refresh-token grant.
// - `api`: the multipart upload itself.
// - `session`: decides which of the above a given invocation needs.
// - `ui`: dialoguer prompts and the upload spinner.
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod format;
pub mod refresh;
pub mod session;
pub mod store;
pub mod token;
pub mod ui;

#[cfg(test)]
mod testing;

pub use api::{Credential, ImagePayload, ReqwestTransport, Transport, UploadClient};
pub use auth::{AuthFlow, Browser, Interaction, SystemBrowser};
pub use config::Config;
pub use error::{AuthError, Error, StorageError, UploadError};
pub use format::LinkFormat;
pub use refresh::{ImgurRefresher, TokenRefresher};
pub use session::SessionController;
pub use store::{CredentialRecord, CredentialStore};
