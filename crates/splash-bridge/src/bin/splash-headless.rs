//! Minimal display peer: acknowledges every status line it receives.
//!
//! Usage: `splash-headless <window-handle>`. Prints a ready line, then one
//! `received: <message>` line per status message, and exits when its input closes.

use anyhow::{Context, Result};
use splash_bridge_core::{WindowHandle, decode_line, encode_line};
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

async fn reply(stdout: &mut tokio::io::Stdout, text: &str) -> Result<()> {
    let mut line = encode_line(text);
    line.push('\n');
    stdout
        .write_all(line.as_bytes())
        .await
        .context("Failed to write reply")?;
    stdout.flush().await.context("Failed to flush reply")
}

async fn run(window: WindowHandle) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    reply(&mut stdout, &format!("splash-headless ready for window {window}")).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read status line")?
    {
        let message = decode_line(&line);
        reply(&mut stdout, &format!("received: {message}")).await?;
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let Some(raw) = std::env::args().nth(1) else {
        eprintln!("usage: splash-headless <window-handle>");
        return ExitCode::from(2);
    };
    let window = match raw.parse::<WindowHandle>() {
        Ok(window) => window,
        Err(e) => {
            eprintln!("invalid window handle '{raw}': {e}");
            return ExitCode::from(2);
        }
    };

    match run(window).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("splash-headless: {e:#}");
            ExitCode::FAILURE
        }
    }
}
