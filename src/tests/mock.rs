use alloc::collections::VecDeque;
use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;
use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write};
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer as FugitTimer;
use log::{LevelFilter, Log, Metadata, Record};
use mockall::mock;
use std::sync::Mutex;
use std::thread::{self, ThreadId};

/// Scripted reply to a single flushed write
pub struct MockedCommand {
    /// Expected command (including terminator). Not checked if None.
    expected: Option<&'static [u8]>,

    /// Data made available for reading once the command was written
    reply: Vec<u8>,
}

impl MockedCommand {
    pub fn new(expected: Option<&'static [u8]>, reply: &[u8]) -> Self {
        Self {
            expected,
            reply: reply.to_vec(),
        }
    }

    /// Optional payload lines followed by `OK`
    pub fn ok(expected: Option<&'static [u8]>, payload: Option<&'static [u8]>) -> Self {
        let mut reply = payload.unwrap_or_default().to_vec();
        reply.extend_from_slice(b"\r\nOK\r\n");
        Self { expected, reply }
    }

    /// Optional payload lines followed by `ERROR`
    pub fn error(expected: Option<&'static [u8]>, payload: Option<&'static [u8]>) -> Self {
        let mut reply = payload.unwrap_or_default().to_vec();
        reply.extend_from_slice(b"\r\nERROR\r\n");
        Self { expected, reply }
    }

    /// Command is not answered at all
    pub fn silent(expected: Option<&'static [u8]>) -> Self {
        Self { expected, reply: vec![] }
    }
}

/// Custom serial mock, replying to written commands in the same order as inserted
///
/// Every flush completes a command. Reading returns the replies of all commands written so far.
#[derive(Default)]
pub struct MockTransport {
    /// Mocked replies
    responses: VecDeque<MockedCommand>,

    /// Sent commands
    commands: Vec<Vec<u8>>,

    /// Data written since the last flush
    outbound: Vec<u8>,

    /// Data available for reading
    inbound: VecDeque<u8>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mock reply
    pub fn add_response(&mut self, command: MockedCommand) {
        self.responses.push_back(command);
    }

    /// Makes data available without any command written, e.g. inbound socket data
    pub fn add_inbound(&mut self, data: &[u8]) {
        self.inbound.extend(data.iter().copied());
    }

    /// Returns a copy of the sent commands
    pub fn get_commands_as_strings(&self) -> Vec<String> {
        self.commands
            .iter()
            .map(|command| String::from_utf8(command.clone()).unwrap())
            .collect()
    }

    /// Asserts that all mocked replies were consumed
    pub fn assert_all_cmds_sent(&self) {
        assert!(self.responses.is_empty(), "{} mocked commands not sent", self.responses.len());
    }
}

impl ErrorType for MockTransport {
    type Error = Infallible;
}

impl Read for MockTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut count = 0;
        while count < buf.len() {
            match self.inbound.pop_front() {
                Some(byte) => buf[count] = byte,
                None => break,
            }
            count += 1;
        }

        Ok(count)
    }
}

impl ReadReady for MockTransport {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.inbound.is_empty())
    }
}

impl Write for MockTransport {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        let command = core::mem::take(&mut self.outbound);
        let response = self.responses.pop_front().expect("Unexpected command");

        if let Some(expected) = response.expected {
            assert_eq!(String::from_utf8_lossy(expected), String::from_utf8_lossy(&command));
        }

        self.inbound.extend(response.reply);
        self.commands.push(command);
        Ok(())
    }
}

/// Simulated 1 kHz clock, time just advances while waiting
#[derive(Default)]
pub struct MockTimer {
    start: u32,
    now: u32,
    until: u32,
}

impl MockTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock starting at the given tick count
    pub fn starting_at(ticks: u32) -> Self {
        Self {
            start: ticks,
            now: ticks,
            until: ticks,
        }
    }

    /// Total time spent waiting
    pub fn elapsed_ms(&self) -> u32 {
        self.now.wrapping_sub(self.start)
    }
}

impl FugitTimer<1_000> for MockTimer {
    type Error = Infallible;

    fn now(&mut self) -> TimerInstantU32<1_000> {
        TimerInstantU32::from_ticks(self.now)
    }

    fn start(&mut self, duration: TimerDurationU32<1_000>) -> Result<(), Self::Error> {
        self.until = self.now.wrapping_add(duration.ticks());
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), Self::Error> {
        self.until = self.now;
        Ok(())
    }

    fn wait(&mut self) -> nb::Result<(), Self::Error> {
        self.now = self.until;
        Ok(())
    }
}

mock! {
    pub Clock{}

    impl FugitTimer<1_000> for Clock {
        type Error = u32;

        fn now(&mut self) -> TimerInstantU32<1_000>;
        fn start(&mut self, duration: TimerDurationU32<1_000>) -> Result<(), u32>;
        fn cancel(&mut self) -> Result<(), u32>;
        fn wait(&mut self) -> nb::Result<(), u32>;
    }
}

mock! {
    pub Serial{}

    impl ErrorType for Serial {
        type Error = ErrorKind;
    }

    impl Read for Serial {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind>;
    }

    impl ReadReady for Serial {
        fn read_ready(&mut self) -> Result<bool, ErrorKind>;
    }

    impl Write for Serial {
        fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind>;
        fn flush(&mut self) -> Result<(), ErrorKind>;
    }
}

/// Messages logged so far, tagged by the logging thread
static LOG_RECORDS: Mutex<Vec<(ThreadId, String)>> = Mutex::new(Vec::new());

static LOG_RECORDER: LogRecorder = LogRecorder;

/// Logger keeping all messages in memory
///
/// Tests run in parallel, so messages are kept per thread.
pub struct LogRecorder;

impl LogRecorder {
    /// Installs the recorder as global logger, if not done yet
    pub fn install() {
        let _ = log::set_logger(&LOG_RECORDER);
        log::set_max_level(LevelFilter::Debug);
    }

    /// Removes and returns the messages logged by the current thread
    pub fn take() -> Vec<String> {
        let current = thread::current().id();
        let mut records = LOG_RECORDS.lock().unwrap();

        let (own, others): (Vec<_>, Vec<_>) =
            core::mem::take(&mut *records).into_iter().partition(|(id, _)| *id == current);
        *records = others;
        own.into_iter().map(|(_, message)| message).collect()
    }
}

impl Log for LogRecorder {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        let message = format!("{}", record.args());
        LOG_RECORDS.lock().unwrap().push((thread::current().id(), message));
    }

    fn flush(&self) {}
}
