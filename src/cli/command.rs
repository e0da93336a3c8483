use std::{convert::Infallible, str::FromStr};

use tracing::debug;

use crate::{
    storage::{error::StorageError, repository::TimestampRepository},
    timer::service::TimerService,
};

/// What the user can type at the prompt. Anything unrecognized is [Command::Unknown] and does
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Clear,
    Quit,
    Unknown,
}

impl FromStr for Command {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "start" => Command::Start,
            "stop" => Command::Stop,
            "clear" => Command::Clear,
            "quit" => Command::Quit,
            _ => Command::Unknown,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFlow {
    Continue,
    Exit,
}

/// Applies a command to the service and tells the shell whether to keep going.
pub async fn handle<R: TimestampRepository>(
    command: Command,
    service: &mut TimerService<R>,
) -> Result<ShellFlow, StorageError> {
    debug!("Handling {command:?}");
    match command {
        Command::Start => service.start().await?,
        Command::Stop => service.stop().await?,
        Command::Clear => service.clear().await?,
        Command::Quit => return Ok(ShellFlow::Exit),
        Command::Unknown => {}
    }
    Ok(ShellFlow::Continue)
}
