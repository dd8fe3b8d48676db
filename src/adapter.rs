//! # AT transaction engine
//!
//! Every operation of the [Adapter] is a single transaction: The command line is written, then
//! response lines are collected until either the command specific match token was received or
//! the deadline elapsed. The generic `OK` sentinel marks the transaction successful but does not
//! end it, unless it is the match token itself.
//!
//! Timeouts are no errors. A transaction running out of time just returns the lines collected so
//! far with `success == false`. [Error] is reserved for invalid arguments and faults of the
//! transport or timer.
use crate::args::Quoting;
use crate::commands::AtCommand;
use crate::http::HttpState;
use crate::responses::{Response, OK};
use alloc::string::String;
use alloc::vec::Vec;
use embedded_io::{Error as IoError, ErrorKind, Read, ReadReady, Write};
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;
use log::debug;

/// Line terminator of outbound commands
pub(crate) const TERMINATOR: &[u8] = b"\r\n";

/// Polling granularity of the transaction engine
pub(crate) const POLL_INTERVAL_MS: u32 = 100;

/// Max. time for reading a single line
pub(crate) const LINE_TIMEOUT_MS: u32 = 100;

/// Wait time between checks of the line reader if no data is available
pub(crate) const LINE_POLL_INTERVAL_MS: u32 = 1;

/// A raw read is considered complete if no more data arrived in this time
pub(crate) const IDLE_GAP_MS: u32 = 50;

/// Default command timeout
pub(crate) const DEFAULT_TIMEOUT_MS: u32 = 2_000;

/// Driver of an ESP-AT modem attached to a serial transport
///
/// TIMER_HZ: Tick rate of the timer. Deadlines of up to 15 seconds must fit in 32 bit ticks, so
/// a rate of 1 kHz is recommended.
pub struct Adapter<S, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> {
    /// Serial transport
    pub(crate) transport: S,

    /// Timer used for deadlines and sleeping
    pub(crate) timer: T,

    /// Default of the per call debug flag
    debug: bool,

    /// Quoting of text arguments
    pub(crate) quoting: Quoting,

    /// Progress of the current HTTP request
    pub(crate) http_state: HttpState,

    /// State in which the last HTTP request stopped without a response
    pub(crate) http_stopped_in: Option<HttpState>,
}

/// Driver errors
///
/// Failed or timed out transactions are reported as data, not by this type.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Reading or writing the serial transport failed
    TransportError(ErrorKind),

    /// Upstream timer error
    TimerError,

    /// Given SSID is longer then the max. size of 32 chars
    InvalidSsidLength,

    /// Given password is longer then the max. size of 63 chars
    InvalidPasswordLength,

    /// WIFI channel out of range 1-14
    InvalidChannel,

    /// Max. connection count out of the allowed range
    InvalidMaxConnections,

    /// Server timeout is longer than 7200 seconds
    InvalidServerTimeout,

    /// Transport type is neither TCP, UDP or SSL
    UnsupportedTransport,

    /// HTTP method is not supported
    UnsupportedMethod,

    /// URL scheme is neither http nor https
    UnsupportedProtocol,

    /// URL could not be parsed
    InvalidUrl,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::TransportError(kind) => defmt::write!(f, "Error::TransportError({})", defmt::Debug2Format(kind)),
            Error::TimerError => defmt::write!(f, "Error::TimerError"),
            Error::InvalidSsidLength => defmt::write!(f, "Error::InvalidSsidLength"),
            Error::InvalidPasswordLength => defmt::write!(f, "Error::InvalidPasswordLength"),
            Error::InvalidChannel => defmt::write!(f, "Error::InvalidChannel"),
            Error::InvalidMaxConnections => defmt::write!(f, "Error::InvalidMaxConnections"),
            Error::InvalidServerTimeout => defmt::write!(f, "Error::InvalidServerTimeout"),
            Error::UnsupportedTransport => defmt::write!(f, "Error::UnsupportedTransport"),
            Error::UnsupportedMethod => defmt::write!(f, "Error::UnsupportedMethod"),
            Error::UnsupportedProtocol => defmt::write!(f, "Error::UnsupportedProtocol"),
            Error::InvalidUrl => defmt::write!(f, "Error::InvalidUrl"),
        }
    }
}

fn transport_error<E: IoError>(error: E) -> Error {
    Error::TransportError(error.kind())
}

impl<S: Read + Write + ReadReady, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> Adapter<S, T, TIMER_HZ> {
    /// Longest timeout in ms. Deadlines must stay less than half of the tick range ahead, otherwise
    /// the wrap-aware comparison sees them as elapsed. Longer timeouts are clamped.
    pub const MAX_DEADLINE_MS: u32 = {
        let max_ms = i32::MAX as u64 * 1_000 / TIMER_HZ as u64;
        if max_ms > u32::MAX as u64 {
            u32::MAX
        } else {
            max_ms as u32
        }
    };

    /// Creates a new adapter. Debug tracing is disabled by default.
    pub fn new(transport: S, timer: T) -> Self {
        Self {
            transport,
            timer,
            debug: false,
            quoting: Quoting::Raw,
            http_state: HttpState::Idle,
            http_stopped_in: None,
        }
    }

    /// Sets the default debug flag, used by all operations called with `debug = None`
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Returns the default debug flag
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Changes the quoting of text arguments. [Quoting::Raw] is wire compatible with older
    /// firmware, but does not support quotes, commas or backslashes inside SSIDs or passwords.
    pub fn set_argument_quoting(&mut self, quoting: Quoting) {
        self.quoting = quoting;
    }

    /// Releases the transport and timer
    pub fn release(self) -> (S, T) {
        (self.transport, self.timer)
    }

    /// Writes the command line (terminated by CR LF) and collects the response lines
    ///
    /// Without `match_token` the transaction always runs to the deadline.
    pub fn transact(
        &mut self,
        command: &str,
        match_token: Option<&[u8]>,
        timeout_ms: u32,
        debug: Option<bool>,
    ) -> Result<Response, Error> {
        let debug = debug.unwrap_or(self.debug);
        if debug {
            debug!("< {}", command);
        }

        let mut frame = Vec::with_capacity(command.len() + TERMINATOR.len());
        frame.extend_from_slice(command.as_bytes());
        frame.extend_from_slice(TERMINATOR);

        self.exchange(&frame, match_token, timeout_ms, debug)
    }

    /// Writes the given bytes as they are (without terminator) and collects the response lines
    pub fn transmit(
        &mut self,
        data: &[u8],
        match_token: Option<&[u8]>,
        timeout_ms: u32,
        debug: Option<bool>,
    ) -> Result<Response, Error> {
        let debug = debug.unwrap_or(self.debug);
        if debug {
            debug!("< {}", String::from_utf8_lossy(data));
        }

        self.exchange(data, match_token, timeout_ms, debug)
    }

    /// Executes the command and decodes the response
    pub(crate) fn execute<C: AtCommand>(&mut self, command: &C, debug: Option<bool>) -> Result<C::Output, Error> {
        let line = command.encode(self.quoting);
        let response = self.transact(&line, command.match_token(), command.timeout_ms(), debug)?;
        Ok(command.parse(&response))
    }

    fn exchange(
        &mut self,
        frame: &[u8],
        match_token: Option<&[u8]>,
        timeout_ms: u32,
        debug: bool,
    ) -> Result<Response, Error> {
        self.write(frame)?;

        // Deadline is rounded up to the polling granularity, at least one attempt is made
        let attempts = timeout_ms.div_ceil(POLL_INTERVAL_MS).max(1);
        let deadline = self.deadline(attempts.saturating_mul(POLL_INTERVAL_MS));
        let mut response = Response::default();

        while let Some(remaining) = self.remaining_ms(deadline) {
            if !self.transport.read_ready().map_err(transport_error)? {
                self.sleep_ms(remaining.min(POLL_INTERVAL_MS))?;
                continue;
            }

            let line_deadline = self.deadline(remaining.min(LINE_TIMEOUT_MS));
            let line = self.read_line(line_deadline)?;
            if line.is_empty() {
                continue;
            }

            if debug {
                debug!("> {:?}", String::from_utf8_lossy(&line));
            }

            let trimmed = line.trim_ascii();
            if trimmed == OK {
                response.success = true;
            }

            if match_token.is_some_and(|token| token == trimmed) {
                response.success = true;
                return Ok(response);
            }

            if trimmed != OK {
                response.lines.push(line);
            }
        }

        Ok(response)
    }

    /// Reads a single line including the trailing line feed
    ///
    /// On deadline expiry, the bytes read so far are returned, which may be empty or an
    /// incomplete line.
    pub(crate) fn read_line(&mut self, deadline: TimerInstantU32<TIMER_HZ>) -> Result<Vec<u8>, Error> {
        let mut line = Vec::new();

        while self.remaining_ms(deadline).is_some() {
            if !self.transport.read_ready().map_err(transport_error)? {
                self.sleep_ms(LINE_POLL_INTERVAL_MS)?;
                continue;
            }

            let mut byte = [0x0; 1];
            if self.transport.read(&mut byte).map_err(transport_error)? == 0 {
                continue;
            }

            line.push(byte[0]);
            if byte[0] == b'\n' {
                break;
            }
        }

        Ok(line)
    }

    /// Reads raw data which is not the response of a command
    ///
    /// Waits up to `timeout_ms` for the first byte. Reading stops once no further data arrived
    /// for a short time or the deadline elapsed.
    pub(crate) fn read_raw(&mut self, timeout_ms: u32) -> Result<Vec<u8>, Error> {
        let deadline = self.deadline(timeout_ms);
        let mut data = Vec::new();
        let mut idle_deadline = None;
        let mut buffer = [0x0; 64];

        loop {
            if self.transport.read_ready().map_err(transport_error)? {
                let length = self.transport.read(&mut buffer).map_err(transport_error)?;
                data.extend_from_slice(&buffer[..length]);

                if self.remaining_ms(deadline).is_none() {
                    return Ok(data);
                }

                idle_deadline = Some(self.deadline(IDLE_GAP_MS));
                continue;
            }

            let limit = match idle_deadline {
                Some(idle) => idle.min(deadline),
                None => deadline,
            };

            if self.remaining_ms(limit).is_none() {
                return Ok(data);
            }

            self.sleep_ms(LINE_POLL_INTERVAL_MS)?;
        }
    }

    /// Writes the data to the transport
    pub(crate) fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        self.transport.write_all(data).map_err(transport_error)?;
        self.transport.flush().map_err(transport_error)
    }

    /// Returns the deadline for the given duration starting now
    ///
    /// Durations are capped at [Self::MAX_DEADLINE_MS].
    fn deadline(&mut self, duration_ms: u32) -> TimerInstantU32<TIMER_HZ> {
        let duration_ms = duration_ms.min(Self::MAX_DEADLINE_MS);
        self.timer.now() + TimerDurationU32::<TIMER_HZ>::millis(duration_ms)
    }

    /// Returns the remaining time in ms, or None if the deadline has elapsed
    fn remaining_ms(&mut self, deadline: TimerInstantU32<TIMER_HZ>) -> Option<u32> {
        let now = self.timer.now();
        if now >= deadline {
            return None;
        }

        deadline.checked_duration_since(now).map(|remaining| remaining.to_millis().max(1))
    }

    fn sleep_ms(&mut self, duration_ms: u32) -> Result<(), Error> {
        self.timer
            .start(TimerDurationU32::<TIMER_HZ>::millis(duration_ms))
            .map_err(|_| Error::TimerError)?;
        nb::block!(self.timer.wait()).map_err(|_| Error::TimerError)
    }
}
