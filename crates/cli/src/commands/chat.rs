//! Interactive conversation driver.
//!
//! Reads one utterance per line, hands it to a [`TurnProcessor`] and prints
//! the reply. The driver knows nothing about routing; it only owns the
//! terminal protocol (banner, prompt, reply prefix, exit keyword).

use anyhow::Context;
use supportdesk_agent::runtime::TurnProcessor;
use supportdesk_core::config::LoadOptions;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::info;

use crate::commands::{build_router, build_runtime, load_config, CommandResult};

pub const WELCOME_BANNER: &str = "Welcome to ACME Corp Customer Support! Type 'exit' to quit.";
pub const INPUT_PROMPT: &str = "You: ";
pub const REPLY_PREFIX: &str = "SupportBot: ";
pub const FAREWELL: &str = "Thank you for contacting ACME Corp. Have a great day!";
const EXIT_KEYWORD: &str = "exit";

pub fn run(options: LoadOptions) -> CommandResult {
    let config = match load_config("chat", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    crate::init_logging(&config);

    let router = match build_router("chat", &config) {
        Ok(router) => router,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("chat") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let session = runtime.block_on(async {
        let mut stdout = tokio::io::stdout();
        drive(BufReader::new(tokio::io::stdin()), &mut stdout, &router)
            .await
            .context("chat session lost its terminal")
    });

    match session {
        Ok(turns) => {
            info!(event_name = "chat.session_closed", turns, "chat session closed");
            CommandResult { exit_code: 0, output: String::new() }
        }
        Err(error) => CommandResult::failure("chat", "terminal_io", format!("{error:#}"), 5),
    }
}

pub fn is_exit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(EXIT_KEYWORD)
}

/// Undecodable bytes become U+FFFD; the line terminator is dropped.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Runs the conversation until the exit keyword or end of input and
/// returns how many turns were processed.
pub async fn drive<R, W, P>(mut reader: R, writer: &mut W, processor: &P) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    P: TurnProcessor + ?Sized,
{
    writer.write_all(format!("{WELCOME_BANNER}\n").as_bytes()).await?;

    let mut buffer = Vec::new();
    let mut turns = 0;
    loop {
        writer.write_all(INPUT_PROMPT.as_bytes()).await?;
        writer.flush().await?;

        buffer.clear();
        if reader.read_until(b'\n', &mut buffer).await? == 0 {
            writer.write_all(b"\n").await?;
            break;
        }
        let line = decode_line(&buffer);
        if is_exit_command(&line) {
            break;
        }

        let reply = processor.process_turn(&line).await;
        writer.write_all(format!("{REPLY_PREFIX}{reply}\n\n").as_bytes()).await?;
        turns += 1;
    }

    writer.write_all(format!("{FAREWELL}\n").as_bytes()).await?;
    writer.flush().await?;
    Ok(turns)
}
