// API client module: a small blocking client that posts one image to the
// host's upload endpoint and hands back the hosted link. The HTTP call sits
// behind the `Transport` trait so the response handling can be exercised
// without a network.

use crate::config::Config;
use crate::error::UploadError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::blocking::{multipart, Client};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use std::borrow::Cow;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Value of the `type` form field: the image is always sent base64 encoded.
pub const PAYLOAD_TYPE: &str = "base64";

/// Image bytes to upload, either raw or already base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    Binary(Vec<u8>),
    Base64(String),
}

impl ImagePayload {
    pub fn to_base64(&self) -> Cow<'_, str> {
        match self {
            ImagePayload::Binary(bytes) => Cow::Owned(STANDARD.encode(bytes)),
            ImagePayload::Base64(text) => Cow::Borrowed(text),
        }
    }
}

/// Who the upload is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential<'a> {
    /// Anonymous upload identified only by the application.
    Anonymous { client_id: &'a str },
    /// Upload into the user's account.
    Bearer { access_token: &'a str },
}

impl Credential<'_> {
    /// `Authorization` header value for this credential.
    pub fn authorization(&self) -> String {
        match self {
            Credential::Anonymous { client_id } => format!("Client-ID {}", client_id),
            Credential::Bearer { access_token } => format!("Bearer {}", access_token),
        }
    }
}

/// One multipart/form-data POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartRequest {
    pub url: String,
    pub authorization: String,
    pub fields: Vec<(&'static str, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Sends a request and blocks until the response (or a transport failure)
/// is known. Implementations must not retry.
pub trait Transport {
    fn send(&self, request: MultipartRequest) -> Result<TransportResponse, UploadError>;
}

/// `reqwest` blocking transport with a fixed request timeout.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UploadError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(ReqwestTransport { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: MultipartRequest) -> Result<TransportResponse, UploadError> {
        // The form picks one boundary and uses it for both the
        // Content-Type header and the body delimiters.
        let form = request
            .fields
            .into_iter()
            .fold(multipart::Form::new(), |form, (name, value)| form.text(name, value));

        let res = self
            .client
            .post(&request.url)
            .header(AUTHORIZATION, request.authorization)
            .multipart(form)
            .send()
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = res.status().as_u16();
        let body = res
            .text()
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        Ok(TransportResponse { status, body })
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    data: UploadData,
}

#[derive(Deserialize)]
struct UploadData {
    link: Option<String>,
}

/// Uploads images and extracts the hosted link.
pub struct UploadClient<T = ReqwestTransport> {
    transport: T,
    upload_url: String,
}

impl UploadClient<ReqwestTransport> {
    /// Client talking to the configured endpoint over HTTP.
    pub fn from_config(config: &Config) -> Result<Self, UploadError> {
        Ok(UploadClient::new(
            ReqwestTransport::new(config.upload_timeout)?,
            config.upload_url(),
        ))
    }
}

impl<T: Transport> UploadClient<T> {
    pub fn new(transport: T, upload_url: impl Into<String>) -> Self {
        UploadClient {
            transport,
            upload_url: upload_url.into(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Upload `payload` and return the URL of the hosted image.
    pub fn upload(
        &self,
        payload: &ImagePayload,
        credential: &Credential<'_>,
    ) -> Result<String, UploadError> {
        let request = MultipartRequest {
            url: self.upload_url.clone(),
            authorization: credential.authorization(),
            fields: vec![
                ("image", payload.to_base64().into_owned()),
                ("type", PAYLOAD_TYPE.to_string()),
            ],
        };
        let anonymous = matches!(credential, Credential::Anonymous { .. });
        debug!(url = %request.url, anonymous, "uploading image");

        let response = self.transport.send(request)?;
        if response.status != 200 {
            warn!(status = response.status, "upload rejected");
            return Err(UploadError::HttpStatus(response.status));
        }

        let link = parse_link(&response.body)?;
        info!(%link, "image uploaded");
        Ok(link)
    }
}

fn parse_link(body: &str) -> Result<String, UploadError> {
    let parsed: UploadResponse = serde_json::from_str(body)
        .map_err(|e| UploadError::MalformedResponse(e.to_string()))?;
    parsed
        .data
        .link
        .ok_or_else(|| UploadError::MalformedResponse("response has no data.link".to_string()))
}
