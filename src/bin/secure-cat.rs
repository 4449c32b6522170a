//! TLS netcat: dial a host, pump stdin into the secure channel and
//! decrypted data to stdout. Lifecycle goes to stderr via tracing.

use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use secure_stream::config::{load_options, SessionOptions};
use secure_stream::observability::logging;
use secure_stream::{SecureStream, SessionEvent};

#[derive(Parser)]
#[command(name = "secure-cat")]
#[command(about = "Pipe stdin/stdout through a TLS connection", long_about = None)]
struct Cli {
    /// Destination host.
    host: String,

    /// Destination port.
    #[arg(default_value_t = 443)]
    port: u16,

    /// Expected server hostname (defaults to the host).
    #[arg(short, long)]
    servername: Option<String>,

    /// Skip certificate verification.
    #[arg(long)]
    insecure: bool,

    /// Per-record diagnostics.
    #[arg(short, long)]
    debug: bool,

    /// Load option defaults from a TOML file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.debug);

    let mut options = match &cli.config {
        Some(path) => load_options(path)?,
        None => SessionOptions::default(),
    };
    if cli.insecure {
        options.reject_unauthorized = false;
    }
    options.debug |= cli.debug;
    options.servername = cli
        .servername
        .clone()
        .or(options.servername)
        .or_else(|| Some(cli.host.clone()));

    let mut stream = SecureStream::connect(&cli.host, cli.port, options);

    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut buf = vec![0u8; 16 * 1024];
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = stream.next_event() => match event {
                Some(SessionEvent::Connect) => tracing::info!("connected"),
                Some(SessionEvent::Secure) => tracing::info!("secure channel established"),
                Some(SessionEvent::Data(bytes)) => {
                    stdout.write_all(&bytes).await?;
                    stdout.flush().await?;
                }
                Some(SessionEvent::Close) | None => break,
                Some(SessionEvent::Error(e)) => return Err(e.into()),
            },
            read = stdin.read(&mut buf), if stdin_open => match read? {
                0 => {
                    // EOF on stdin: wind the session down, keep draining
                    // whatever the server still sends.
                    stdin_open = false;
                    stream.close();
                }
                n => {
                    let _ = stream.write(buf[..n].to_vec());
                }
            },
        }
    }

    Ok(())
}
