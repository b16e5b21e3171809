// Test doubles shared by the unit tests.

use crate::api::{MultipartRequest, Transport, TransportResponse};
use crate::auth::{Browser, Interaction};
use crate::error::{AuthError, UploadError};
use crate::refresh::TokenRefresher;
use crate::store::{CredentialRecord, ACCESS_TOKEN, EXPIRE_DATE};
use crate::token::{format_expire_date, REQUIRED_KEYS};
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;

/// Fully authorized record with the given token and expiry.
pub fn authorized_record(access_token: &str, expire_date: DateTime<Utc>) -> CredentialRecord {
    let mut record = CredentialRecord::anonymous("95b05e2e3ac5624");
    for key in REQUIRED_KEYS {
        record.insert(key, "x");
    }
    record.insert(ACCESS_TOKEN, access_token);
    record.insert(EXPIRE_DATE, format_expire_date(expire_date));
    record
}

/// Replays canned answers; running out of answers behaves like the user
/// closing stdin.
pub struct ScriptedUi {
    answers: VecDeque<String>,
    authorize: bool,
    pub begun: Vec<String>,
    pub notices: Vec<String>,
}

impl ScriptedUi {
    pub fn new<I: IntoIterator<Item = String>>(answers: I) -> Self {
        ScriptedUi {
            answers: answers.into_iter().collect(),
            authorize: true,
            begun: Vec::new(),
            notices: Vec::new(),
        }
    }

    /// Choose "post anonymously" when asked.
    pub fn declining(mut self) -> Self {
        self.authorize = false;
        self
    }
}

impl Interaction for ScriptedUi {
    fn confirm_authorize(&mut self) -> io::Result<bool> {
        Ok(self.authorize)
    }

    fn begin_authorization(&mut self, authorize_url: &str) -> io::Result<()> {
        self.begun.push(authorize_url.to_string());
        Ok(())
    }

    fn paste_callback_url(&mut self) -> io::Result<String> {
        self.answers
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more input"))
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

#[derive(Default)]
pub struct RecordingBrowser {
    fail: bool,
    opened: RefCell<Vec<String>>,
}

impl RecordingBrowser {
    pub fn failing() -> Self {
        RecordingBrowser {
            fail: true,
            ..Default::default()
        }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }
}

impl Browser for RecordingBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        self.opened.borrow_mut().push(url.to_string());
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no browser"));
        }
        Ok(())
    }
}

/// Returns one canned outcome for every request and records what was sent.
pub struct StubTransport {
    outcome: Result<TransportResponse, UploadError>,
    sent: RefCell<Vec<MultipartRequest>>,
}

impl StubTransport {
    pub fn reply(status: u16, body: &str) -> Self {
        StubTransport {
            outcome: Ok(TransportResponse {
                status,
                body: body.to_string(),
            }),
            sent: RefCell::new(Vec::new()),
        }
    }

    pub fn fail(details: &str) -> Self {
        StubTransport {
            outcome: Err(UploadError::Transport(details.to_string())),
            sent: RefCell::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<MultipartRequest> {
        self.sent.borrow().clone()
    }
}

impl Transport for StubTransport {
    fn send(&self, request: MultipartRequest) -> Result<TransportResponse, UploadError> {
        self.sent.borrow_mut().push(request);
        self.outcome.clone()
    }
}

pub struct StubRefresher {
    access_token: Option<String>,
}

impl StubRefresher {
    pub fn succeeding(access_token: &str) -> Self {
        StubRefresher {
            access_token: Some(access_token.to_string()),
        }
    }

    pub fn failing() -> Self {
        StubRefresher { access_token: None }
    }
}

impl TokenRefresher for StubRefresher {
    fn refresh(&self, record: &CredentialRecord) -> Result<CredentialRecord, AuthError> {
        let token = self.access_token.as_ref().ok_or(AuthError::Refresh {
            status: 400,
            body: r#"{"error":"invalid_grant"}"#.to_string(),
        })?;
        let mut updated = record.clone();
        updated.insert(ACCESS_TOKEN, token.as_str());
        updated.insert(
            EXPIRE_DATE,
            format_expire_date(Utc::now() + chrono::Duration::hours(1)),
        );
        Ok(updated)
    }
}
