//! Interactive bidder client.
//!
//! Usage:
//!   bidder <host> <port> <name>
//!
//! Commands read from stdin: `bid <amount>`, `i_am_interested`,
//! `list_high_bid`, `list_description`, `quit`. Logging goes to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use house::client::{BidderClient, Command, Reaction};
use house::protocol::{FrameDecoder, Notice};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Connect to an auction house as a bidder
#[derive(Parser, Debug)]
#[command(name = "bidder")]
#[command(author, version, about, long_about = None)]
struct Cli {
    host: String,
    port: u16,
    name: String,
}

fn init_logging_stderr() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Print the reaction and send its frame. Returns the exit status, if any.
async fn apply(
    reaction: Reaction,
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
) -> Result<Option<i32>> {
    for line in &reaction.lines {
        println!("{line}");
    }
    if let Some(frame) = &reaction.send {
        writer
            .write_all(frame.encode().as_bytes())
            .await
            .context("Lost connection to the auction house")?;
    }
    Ok(reaction.exit)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging_stderr();
    let cli = Cli::parse();

    let stream = TcpStream::connect((cli.host.as_str(), cli.port))
        .await
        .with_context(|| format!("Failed to connect to {}:{}", cli.host, cli.port))?;
    let (mut reader, mut writer) = stream.into_split();

    let mut client = BidderClient::new(cli.name);
    writer
        .write_all(client.connect_frame().encode().as_bytes())
        .await?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut decoder = FrameDecoder::new();
    let mut buf = vec![0u8; house::config::READ_CHUNK_SIZE];

    let status = loop {
        tokio::select! {
            read = reader.read(&mut buf) => {
                let n = read.context("Read from the auction house failed")?;
                if n == 0 {
                    println!("The auction house closed the connection.");
                    break 0;
                }
                let mut exit = None;
                for frame in decoder.decode(&buf[..n]) {
                    debug!("Got message: {}", frame);
                    let notice = match Notice::try_from(&frame) {
                        Ok(notice) => notice,
                        Err(e) => {
                            warn!("Ignoring message from the server: {}", e);
                            continue;
                        }
                    };
                    if let Some(code) = apply(client.on_notice(notice), &mut writer).await? {
                        exit = Some(code);
                        break;
                    }
                }
                if let Some(code) = exit {
                    break code;
                }
            }
            line = stdin.next_line() => {
                let Some(line) = line? else {
                    debug!("Reached end of input, exiting");
                    break 0;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let reaction = match line.parse::<Command>() {
                    Ok(command) => client.on_command(command),
                    Err(e) => {
                        eprintln!("{e}");
                        continue;
                    }
                };
                if let Some(code) = apply(reaction, &mut writer).await? {
                    break code;
                }
            }
        }
    };

    let _ = writer.shutdown().await;
    std::process::exit(status);
}
