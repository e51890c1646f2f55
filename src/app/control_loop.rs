//! Serial control loop.
//!
//! Prints the banner, then reads protocol lines forever and writes one
//! reply per handled line.  A failing command is just an `ERR` reply; a
//! failing read is reported as `ERR EXCEPTION` followed by a short pause.
//! Only a failing *write* ends the loop, because nobody would see the
//! replies anymore.
//!
//! Empty reads (EOF on a console that was never opened, `WouldBlock` on a
//! non-blocking UART) sleep `idle_poll_ms` instead of spinning.

use std::io::{self, BufRead, ErrorKind, Write};

use embedded_hal::digital::{InputPin, OutputPin};
use log::{info, warn};

use crate::app::dispatcher::CommandDispatcher;
use crate::app::events::PumpEvent;
use crate::app::ports::{Clock, EventSink};
use crate::app::replies::render;
use crate::config::LoopConfig;
use crate::error::CommandError;

/// Run until a write fails, or until end of input when
/// [`LoopConfig::exit_on_eof`] is set.
pub fn run<O: OutputPin, I: InputPin>(
    reader: &mut impl BufRead,
    writer: &mut impl Write,
    dispatcher: &mut CommandDispatcher<'_, O, I>,
    clock: &mut impl Clock,
    sink: &mut impl EventSink,
    config: &LoopConfig,
) -> io::Result<()> {
    for line in dispatcher.banner() {
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    sink.emit(&PumpEvent::Ready {
        channels: dispatcher.channel_names(),
    });
    info!("Serial control ready ({} channels)", dispatcher.registry().len());

    let mut line = String::new();
    loop {
        match reader.read_line(&mut line) {
            Ok(0) if line.is_empty() => {
                if config.exit_on_eof {
                    info!("Serial control: end of input");
                    return Ok(());
                }
                clock.delay_ms(config.idle_poll_ms);
                continue;
            }
            Ok(_) => {}
            // A partial line stays buffered until the rest arrives.
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                clock.delay_ms(config.idle_poll_ms);
                continue;
            }
            Err(e) => {
                warn!("Serial control: read failed: {e}");
                line.clear();
                writeln!(writer, "{}", CommandError::Exception(e.to_string()))?;
                writer.flush()?;
                clock.delay_ms(config.error_backoff_ms);
                continue;
            }
        }

        if let Some(result) = dispatcher.dispatch(&line, clock, sink) {
            writeln!(writer, "{}", render(&result))?;
            writer.flush()?;
        }
        line.clear();
    }
}
