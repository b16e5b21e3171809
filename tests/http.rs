// Drives the real reqwest-backed upload and refresh paths against a local
// tiny_http stub server.

use chrono::{Duration, Utc};
use clip2imgur::store::{ACCESS_TOKEN, ACCOUNT_ID, EXPIRE_DATE, REFRESH_TOKEN};
use clip2imgur::token::{format_expire_date, is_authorized, is_expired, REQUIRED_KEYS};
use clip2imgur::{
    AuthError, Browser, Config, Credential, CredentialRecord, ImagePayload, ImgurRefresher,
    Interaction, SessionController, TokenRefresher, UploadClient, UploadError,
};
use std::io::{self, Read};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use tempfile::TempDir;
use tiny_http::{Response, Server};

/// What the stub server saw.
#[derive(Debug)]
struct Captured {
    method: String,
    url: String,
    authorization: Option<String>,
    content_type: Option<String>,
    body: String,
}

/// Serve exactly one request with the given reply.
fn serve_once(status: u16, reply: &'static str) -> (String, JoinHandle<Captured>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();

    let handle = thread::spawn(move || {
        let mut request = server.recv().unwrap();
        let header = |name: &str| {
            request
                .headers()
                .iter()
                .find(|h| h.field.to_string().eq_ignore_ascii_case(name))
                .map(|h| h.value.to_string())
        };
        let authorization = header("Authorization");
        let content_type = header("Content-Type");
        let method = request.method().to_string();
        let url = request.url().to_string();

        let mut body = String::new();
        request.as_reader().read_to_string(&mut body).unwrap();
        request
            .respond(Response::from_string(reply).with_status_code(status))
            .unwrap();

        Captured {
            method,
            url,
            authorization,
            content_type,
            body,
        }
    });

    (format!("http://{}", addr), handle)
}

fn config(dir: &TempDir, api_url: &str) -> Config {
    Config::new(dir.path().join("credentials.json")).with_api_url(api_url)
}

#[test]
fn uploads_multipart_form_and_returns_link() {
    let dir = TempDir::new().unwrap();
    let (api_url, server) = serve_once(
        200,
        r#"{"data":{"link":"https://img.host/abc.png"},"success":true}"#,
    );
    let client = UploadClient::from_config(&config(&dir, &api_url)).unwrap();

    let link = client
        .upload(
            &ImagePayload::Binary(b"ABC".to_vec()),
            &Credential::Anonymous { client_id: "cid" },
        )
        .unwrap();
    assert_eq!(link, "https://img.host/abc.png");

    let seen = server.join().unwrap();
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.url, "/3/image");
    assert_eq!(seen.authorization.as_deref(), Some("Client-ID cid"));

    let content_type = seen.content_type.unwrap();
    let boundary = content_type
        .strip_prefix("multipart/form-data; boundary=")
        .expect("multipart content type");
    assert!(seen.body.contains(&format!("--{}", boundary)));
    assert!(seen.body.contains(&format!("--{}--", boundary)));
    assert!(seen.body.contains("name=\"image\"\r\n\r\nQUJD\r\n"));
    assert!(seen.body.contains("name=\"type\"\r\n\r\nbase64\r\n"));
}

#[test]
fn bearer_credential_is_sent_as_bearer() {
    let dir = TempDir::new().unwrap();
    let (api_url, server) = serve_once(200, r#"{"data":{"link":"l"}}"#);
    let client = UploadClient::from_config(&config(&dir, &api_url)).unwrap();

    client
        .upload(
            &ImagePayload::Base64("QUJD".into()),
            &Credential::Bearer { access_token: "tok" },
        )
        .unwrap();

    assert_eq!(server.join().unwrap().authorization.as_deref(), Some("Bearer tok"));
}

#[test]
fn server_error_maps_to_http_status() {
    let dir = TempDir::new().unwrap();
    let (api_url, server) = serve_once(500, r#"{"data":{"error":"boom"}}"#);
    let client = UploadClient::from_config(&config(&dir, &api_url)).unwrap();

    let err = client
        .upload(
            &ImagePayload::Base64("QUJD".into()),
            &Credential::Anonymous { client_id: "cid" },
        )
        .unwrap_err();

    assert_eq!(err, UploadError::HttpStatus(500));
    server.join().unwrap();
}

#[test]
fn missing_link_maps_to_malformed_response() {
    let dir = TempDir::new().unwrap();
    let (api_url, server) = serve_once(200, r#"{"data":{"id":"abc"}}"#);
    let client = UploadClient::from_config(&config(&dir, &api_url)).unwrap();

    let err = client
        .upload(
            &ImagePayload::Base64("QUJD".into()),
            &Credential::Anonymous { client_id: "cid" },
        )
        .unwrap_err();

    assert!(matches!(err, UploadError::MalformedResponse(_)), "{err:?}");
    server.join().unwrap();
}

#[test]
fn refused_connection_maps_to_transport_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let dir = TempDir::new().unwrap();
    let client =
        UploadClient::from_config(&config(&dir, &format!("http://127.0.0.1:{}", port))).unwrap();

    let err = client
        .upload(
            &ImagePayload::Base64("QUJD".into()),
            &Credential::Anonymous { client_id: "cid" },
        )
        .unwrap_err();

    assert!(matches!(err, UploadError::Transport(_)), "{err:?}");
}

fn authorized_record() -> CredentialRecord {
    let mut record = CredentialRecord::anonymous("cid");
    for key in REQUIRED_KEYS {
        record.insert(key, "x");
    }
    record.insert(REFRESH_TOKEN, "OLD-REFRESH");
    record.insert(EXPIRE_DATE, format_expire_date(Utc::now() - Duration::minutes(5)));
    record
}

#[test]
fn refresh_grant_updates_tokens_and_expiry() {
    let dir = TempDir::new().unwrap();
    let (api_url, server) = serve_once(
        200,
        concat!(
            r#"{"access_token":"NEW","expires_in":3600,"token_type":"bearer","#,
            r#""refresh_token":"NEW-REFRESH","account_username":"u","account_id":42}"#,
        ),
    );
    let config = config(&dir, &api_url).with_client_secret("shh");
    let refresher = ImgurRefresher::from_config(&config).unwrap().unwrap();

    let record = authorized_record();
    assert!(is_expired(&record));
    let updated = refresher.refresh(&record).unwrap();

    assert_eq!(updated.get(ACCESS_TOKEN), Some("NEW"));
    assert_eq!(updated.get(REFRESH_TOKEN), Some("NEW-REFRESH"));
    assert_eq!(updated.get(ACCOUNT_ID), Some("42"));
    assert!(is_authorized(&updated));
    assert!(!is_expired(&updated));

    let seen = server.join().unwrap();
    assert_eq!(seen.url, "/oauth2/token");
    assert!(seen.body.contains("grant_type=refresh_token"));
    assert!(seen.body.contains("refresh_token=OLD-REFRESH"));
    assert!(seen.body.contains("client_secret=shh"));
}

#[test]
fn rejected_refresh_is_reported() {
    let dir = TempDir::new().unwrap();
    let (api_url, server) = serve_once(400, r#"{"error":"invalid_grant"}"#);
    let config = config(&dir, &api_url).with_client_secret("shh");
    let refresher = ImgurRefresher::from_config(&config).unwrap().unwrap();

    let err = refresher.refresh(&authorized_record()).unwrap_err();

    assert!(matches!(err, AuthError::Refresh { status: 400, .. }), "{err:?}");
    server.join().unwrap();
}

struct NoBrowser;

impl Browser for NoBrowser {
    fn open(&self, _url: &str) -> io::Result<()> {
        panic!("browser must not be opened for a valid session");
    }
}

struct NoPrompts;

impl Interaction for NoPrompts {
    fn confirm_authorize(&mut self) -> io::Result<bool> {
        panic!("unexpected prompt");
    }

    fn begin_authorization(&mut self, _authorize_url: &str) -> io::Result<()> {
        panic!("unexpected prompt");
    }

    fn paste_callback_url(&mut self) -> io::Result<String> {
        panic!("unexpected prompt");
    }

    fn notify(&mut self, _message: &str) {}
}

#[test]
fn session_with_valid_token_uploads_over_http() {
    let dir = TempDir::new().unwrap();
    let (api_url, server) = serve_once(200, r#"{"data":{"link":"https://img.host/xyz.png"}}"#);
    let config = config(&dir, &api_url);

    let mut record = authorized_record();
    record.insert(ACCESS_TOKEN, "VALID");
    record.insert(EXPIRE_DATE, format_expire_date(Utc::now() + Duration::hours(1)));

    let uploader = UploadClient::from_config(&config).unwrap();
    let session = SessionController::new(config, uploader, Box::new(NoBrowser));
    session.store().save(&record).unwrap();

    let link = session
        .upload(&ImagePayload::Base64("QUJD".into()), &mut NoPrompts)
        .unwrap();

    assert_eq!(link, "https://img.host/xyz.png");
    assert_eq!(server.join().unwrap().authorization.as_deref(), Some("Bearer VALID"));
}
