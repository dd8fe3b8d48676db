//! # TCP/IP stack
//!
//! Connection handling, a minimal TCP server and reception of inbound socket data.
//!
//! The modem delivers socket data as unsolicited `+IPD` notification. Reading it via
//! [Adapter::receive_data] must not be interleaved with a running command, as both consume the
//! same transport.
use crate::adapter::{Adapter, Error};
use crate::commands::{CloseSocketCommand, ConnectCommand, NumericCommand, PingCommand, ServerCommand};
use crate::urc::InboundFrame;
use core::str::FromStr;
use embedded_io::{Read, ReadReady, Write};
use fugit_timer::Timer;
use log::debug;

/// Max. server timeout in seconds
const MAX_SERVER_TIMEOUT: u16 = 7_200;

/// Connection type of `AT+CIPSTART`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransportType {
    Tcp,
    Udp,
    Ssl,
}

impl TransportType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportType::Tcp => "TCP",
            TransportType::Udp => "UDP",
            TransportType::Ssl => "SSL",
        }
    }
}

impl FromStr for TransportType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TCP" => Ok(TransportType::Tcp),
            "UDP" => Ok(TransportType::Udp),
            "SSL" => Ok(TransportType::Ssl),
            _ => Err(Error::UnsupportedTransport),
        }
    }
}

impl<S: Read + Write + ReadReady, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> Adapter<S, T, TIMER_HZ> {
    /// Pings the given address or hostname. Returns the response time in ms.
    pub fn ping(&mut self, destination: &str, debug: Option<bool>) -> Result<Option<u32>, Error> {
        self.execute(&PingCommand::new(destination), debug)
    }

    /// Establishes a TCP/UDP/SSL connection. Returns true if the connection is established.
    ///
    /// `link_id` is required if multiple connections are enabled (e.g. after [Adapter::start_server]).
    /// An already existing connection is treated as success.
    pub fn start_connection(
        &mut self,
        transport: TransportType,
        host: &str,
        port: u16,
        link_id: Option<u8>,
        debug: Option<bool>,
    ) -> Result<bool, Error> {
        self.execute(&ConnectCommand::new(link_id, transport, host, port), debug)
    }

    /// Closes the given connection, or the single connection if no link ID is given
    pub fn close_connection(&mut self, link_id: Option<u8>, debug: Option<bool>) -> Result<bool, Error> {
        self.execute(&CloseSocketCommand::new(link_id), debug)
    }

    /// Starts a TCP server on the given port
    ///
    /// Multiple connections get enabled first. `max_connections` (1-5) limits the number of clients,
    /// idle connections are closed after `timeout_s` (0-7200) seconds. Returns true if the server
    /// was started.
    pub fn start_server(
        &mut self,
        port: u16,
        max_connections: u8,
        timeout_s: u16,
        debug: Option<bool>,
    ) -> Result<bool, Error> {
        if !(1..=5).contains(&max_connections) {
            return Err(Error::InvalidMaxConnections);
        }

        if timeout_s > MAX_SERVER_TIMEOUT {
            return Err(Error::InvalidServerTimeout);
        }

        self.execute(&NumericCommand::multiple_connections(true), debug)?;
        self.execute(&NumericCommand::server_max_connections(max_connections), debug)?;
        let started = self.execute(&ServerCommand::start(port), debug)?;
        self.execute(&NumericCommand::server_timeout(timeout_s), debug)?;

        Ok(started)
    }

    /// Deletes the TCP server
    pub fn stop_server(&mut self, debug: Option<bool>) -> Result<bool, Error> {
        self.execute(&ServerCommand::stop(), debug)
    }

    /// Reads pending data from the transport and extracts the first `+IPD` frame
    ///
    /// Waits up to `timeout_ms` for data to arrive. This is no AT transaction, as no command is sent.
    pub fn receive_data(&mut self, timeout_ms: u32, debug: Option<bool>) -> Result<Option<InboundFrame>, Error> {
        let data = self.read_raw(timeout_ms)?;

        if debug.unwrap_or(self.debug()) && !data.is_empty() {
            debug!("> {:?}", alloc::string::String::from_utf8_lossy(&data));
        }

        Ok(InboundFrame::parse(&data))
    }
}
