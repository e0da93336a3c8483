use std::{io::Write, time::Duration};

use ansi_term::{Colour, Style};
use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    storage::repository::TimestampRepository,
    timer::service::TimerService,
    utils::{clock::Clock, time::format_elapsed},
};

use super::command::{handle, Command, ShellFlow};

pub const DEFAULT_TICK: Duration = Duration::from_millis(500);

/// Line based prompt in front of a [TimerService].
///
/// On every tick the elapsed time is redrawn and a running timer is checkpointed. Commands are
/// read a line at a time; end of input counts as `quit`. Bytes that aren't UTF-8 are decoded
/// lossily and end up as an unknown command.
pub struct Shell<I, W> {
    input: I,
    // Partial line survives a tick interrupting the read.
    line: Vec<u8>,
    output: W,
    clock: Box<dyn Clock>,
    tick: Duration,
    shutdown: CancellationToken,
    colored: bool,
}

impl<I: AsyncBufRead + Unpin, W: Write> Shell<I, W> {
    pub fn new(
        input: I,
        output: W,
        clock: Box<dyn Clock>,
        tick: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            input,
            line: Vec::new(),
            output,
            clock,
            tick,
            shutdown,
            colored: false,
        }
    }

    pub fn with_color(self, colored: bool) -> Self {
        Self { colored, ..self }
    }

    /// Runs until `quit`, end of input or cancellation. Persistence errors are shown to the user
    /// and the loop carries on; only failures of the terminal itself end it early.
    pub async fn run<R: TimestampRepository>(
        mut self,
        service: &mut TimerService<R>,
    ) -> Result<()> {
        writeln!(self.output, "Commands: start, stop, clear, quit\n")?;

        let mut next_tick = self.clock.instant();
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Shell cancelled");
                    break;
                }
                read = self.input.read_until(b'\n', &mut self.line) => {
                    let command = match read? {
                        0 => Command::Quit,
                        _ => String::from_utf8_lossy(&self.line).parse::<Command>()?,
                    };
                    self.line.clear();
                    writeln!(self.output)?;
                    match handle(command, service).await {
                        Ok(ShellFlow::Continue) => {}
                        Ok(ShellFlow::Exit) => break,
                        Err(e) => {
                            error!("Command {command:?} failed: {e}");
                            writeln!(self.output, "Failed to save: {e}")?;
                        }
                    }
                    self.render(service)?;
                }
                _ = self.clock.sleep_until(next_tick) => {
                    if let Err(e) = service.checkpoint().await {
                        warn!("Checkpoint failed: {e}");
                    }
                    self.render(service)?;
                    // Scheduled from now so a stall doesn't replay every missed tick.
                    next_tick = self.clock.instant() + self.tick;
                }
            }
        }

        writeln!(self.output)?;
        self.output.flush()?;
        Ok(())
    }

    fn render<R: TimestampRepository>(&mut self, service: &TimerService<R>) -> Result<()> {
        let elapsed = format_elapsed(service.elapsed());
        let elapsed = match (self.colored, service.is_running()) {
            (false, _) => Style::new().paint(elapsed),
            (true, true) => Colour::Green.bold().paint(elapsed),
            (true, false) => Style::new().dimmed().paint(elapsed),
        };
        write!(self.output, "\r{elapsed}  > ")?;
        self.output.flush()?;
        Ok(())
    }
}
