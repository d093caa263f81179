use crate::commands::{Command, CommandError, Commands};
use colored::Colorize;
use econdb_warehouse::AppState;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const PROMPT: &str = "econdb > ";

#[derive(Debug, PartialEq, Eq)]
pub enum Line {
    Blank,
    Exit,
    Command(Command),
}

pub fn parse_line(input: &str) -> Line {
    let mut parts = input.split_whitespace();
    match parts.next() {
        None => Line::Blank,
        Some("exit" | "quit") => Line::Exit,
        Some(name) => Line::Command(Command::new(name, parts.map(str::to_string).collect())),
    }
}

fn prompt() {
    print!("{PROMPT}");
    std::io::stdout().flush().ok();
}

/// Read commands from `input` until `exit`, `quit`, end of input, or `cancel`.
///
/// A failing command is reported and the loop carries on. Cancellation only ends a
/// pending read; a command already running is allowed to finish.
pub async fn run<R>(
    mut input: R,
    commands: &Commands,
    state: &AppState,
    cancel: CancellationToken,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    info!("interactive shell started; type 'help' for commands, 'exit' or 'quit' to stop");
    let mut buf = String::new();

    loop {
        prompt();
        buf.clear();
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("shell cancelled");
                break;
            }
            read = input.read_line(&mut buf) => read?,
        };
        if read == 0 {
            println!();
            info!("end of input, leaving shell");
            break;
        }

        let cmd = match parse_line(&buf) {
            Line::Blank => continue,
            Line::Exit => {
                info!("exit requested");
                break;
            }
            Line::Command(cmd) => cmd,
        };

        if let Err(e) = commands.run(state, &cmd).await {
            match e.downcast_ref::<CommandError>() {
                Some(err) => eprintln!("{} {err}", "Error:".red().bold()),
                None => eprintln!("{} {e:#}", "Error:".red().bold()),
            }
        }
    }

    Ok(())
}
