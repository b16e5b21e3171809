// UI layer: terminal prompts built on `dialoguer` plus a spinner while the
// upload is in flight. Prompts and notices go to stderr so stdout carries
// nothing but the link.

use crate::api::{ImagePayload, MultipartRequest, Transport, TransportResponse};
use crate::auth::Interaction;
use crate::error::UploadError;
use anyhow::{Context, Result};
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::Path;
use std::time::Duration;

pub const USAGE: &str = "\
Usage: clip2imgur [IMAGE]
       clip2imgur --deauthorize

Uploads IMAGE (or prompts for a path) to Imgur and prints the link.

Options:
  --deauthorize   Forget the stored account; later uploads ask again
  -h, --help      Show this help

Environment:
  CLIP2IMGUR_CONFIG         credential file location
  CLIP2IMGUR_CLIENT_ID      application client id
  CLIP2IMGUR_CLIENT_SECRET  enables silent token refresh
  CLIP2IMGUR_API_URL        API base URL
  CLIP2IMGUR_FORMAT         plain, markdown or html
  RUST_LOG                  log level (default warn)
";

/// What a single invocation was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Deauthorize,
    /// Upload the given file, or prompt for one.
    Upload(Option<String>),
}

impl Command {
    /// Interpret the arguments following the program name.
    pub fn from_args(args: &[String]) -> Command {
        match args.first().map(String::as_str) {
            Some("-h" | "--help") => Command::Help,
            Some("--deauthorize") => Command::Deauthorize,
            Some(path) => Command::Upload(Some(path.to_string())),
            None => Command::Upload(None),
        }
    }
}

/// Interactive terminal implementation of the authorization prompts.
#[derive(Debug, Default)]
pub struct TerminalUi;

impl Interaction for TerminalUi {
    fn confirm_authorize(&mut self) -> io::Result<bool> {
        eprintln!(
            "In order to upload images to your collection, you need to authorize this app."
        );
        let items = ["Authorize now", "Post anonymously"];
        // `Select` shows a keyboard-navigable list in the terminal.
        let selection = Select::new().items(&items).default(0).interact()?;
        Ok(selection == 0)
    }

    fn begin_authorization(&mut self, authorize_url: &str) -> io::Result<()> {
        eprintln!("\nTo authorize this app, please follow these steps:\n");
        eprintln!("(1) The authorization page opens in your default browser:");
        eprintln!("    {}", authorize_url);
        eprintln!("(2) Authorize this app.");
        eprintln!(
            "(3) You are redirected to the Imgur main page; \
             copy the new URL from the address bar.\n"
        );
        Input::<String>::new()
            .with_prompt("Press [return] to start step (1)")
            .allow_empty(true)
            .interact_text()?;
        Ok(())
    }

    fn paste_callback_url(&mut self) -> io::Result<String> {
        eprintln!("The new URL looks like https://imgur.com/?state=copy-url#access_token=...");
        Input::<String>::new()
            .with_prompt("(4) Paste the full URL here")
            .interact_text()
    }

    fn notify(&mut self, message: &str) {
        eprintln!("{}", message);
    }
}

/// Ask for the image to upload when none was given on the command line.
pub fn prompt_image_path() -> Result<String> {
    let path: String = Input::new().with_prompt("Image file path").interact_text()?;
    Ok(path)
}

/// Read an image file into an upload payload.
pub fn read_image(path: impl AsRef<Path>) -> Result<ImagePayload> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image file {}", path.display()))?;
    if bytes.is_empty() {
        anyhow::bail!("Image file {} is empty", path.display());
    }
    Ok(ImagePayload::Binary(bytes))
}

/// Wraps a transport and shows a spinner for the duration of each request.
pub struct SpinnerTransport<T> {
    inner: T,
}

impl<T> SpinnerTransport<T> {
    pub fn new(inner: T) -> Self {
        SpinnerTransport { inner }
    }
}

impl<T: Transport> Transport for SpinnerTransport<T> {
    fn send(&self, request: MultipartRequest) -> Result<TransportResponse, UploadError> {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Uploading...");
        spinner.enable_steady_tick(Duration::from_millis(100));

        let result = self.inner.send(request);
        spinner.finish_and_clear();
        result
    }
}
