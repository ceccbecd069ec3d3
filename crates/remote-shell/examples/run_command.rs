//! Run one command on a remote host.
//!
//! Connection parameters come from `REMOTE_SHELL_HOST`, `REMOTE_SHELL_PORT`,
//! `REMOTE_SHELL_USERNAME` and `REMOTE_SHELL_PASSWORD`. The first argument is
//! the command; the rest are passed as quoted arguments.
//!
//! Run with: `cargo run --example run_command -- ls -la "/var/log"`

use std::process::ExitCode;

use remote_shell::init_console_logging;
use remote_shell::prelude::*;

#[tokio::main]
async fn main() -> ExitCode {
    init_console_logging("remote_shell=info");

    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let mut argv = std::env::args().skip(1);
    let command = argv.next().unwrap_or_else(|| "uname".to_string());
    let args: Vec<String> = argv.collect();

    let config = SessionConfig::from_env()?;
    let mut session = RemoteSession::ssh(config);
    session.connect().await?;

    let result = if args.is_empty() {
        session.execute(&command, None::<Vec<String>>).await
    } else {
        session.execute(&command, Some(&args)).await
    };
    // Close even when the command failed.
    let closed = session.close().await;
    let result = result?;
    closed?;

    print!("{}", result.text());
    if let Some(signal) = &result.signal {
        eprintln!("terminated by signal {signal}");
    }

    Ok(match result.exit_code {
        Some(0) => ExitCode::SUCCESS,
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX)),
        None => ExitCode::FAILURE,
    })
}
