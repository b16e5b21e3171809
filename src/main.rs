// Entrypoint for the CLI application.
// - Reads configuration from the environment and wires the session
//   controller to the terminal UI.
// - `clip2imgur [IMAGE]` uploads IMAGE (or prompts for a path) and prints
//   the link; `clip2imgur --deauthorize` forgets the stored account;
//   `--help` prints usage.

use clip2imgur::ui::{
    prompt_image_path, read_image, Command, SpinnerTransport, TerminalUi, USAGE,
};
use clip2imgur::{
    Config, ImgurRefresher, ReqwestTransport, SessionController, SystemBrowser, TokenRefresher,
    UploadClient,
};
use std::io;
use std::process;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logs go to stderr; `RUST_LOG` controls the level (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() {
    init_tracing();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::from_args(&args);
    if command == Command::Help {
        print!("{}", USAGE);
        return Ok(());
    }

    let config = Config::from_env()?;
    info!(path = %config.storage_path.display(), "using credential file");

    let transport = SpinnerTransport::new(ReqwestTransport::new(config.upload_timeout)?);
    let uploader = UploadClient::new(transport, config.upload_url());
    let refresher = ImgurRefresher::from_config(&config)?
        .map(|r| Box::new(r) as Box<dyn TokenRefresher>);
    let link_format = config.link_format;

    let session = SessionController::new(config, uploader, Box::new(SystemBrowser))
        .with_refresher(refresher);

    let path = match command {
        Command::Deauthorize => {
            session.deauthorize()?;
            eprintln!("Authorization removed.");
            return Ok(());
        }
        Command::Upload(Some(path)) => path,
        Command::Upload(None) | Command::Help => prompt_image_path()?,
    };
    let payload = read_image(&path)?;

    let link = session.upload(&payload, &mut TerminalUi)?;
    println!("{}", link_format.render(&link));
    Ok(())
}
