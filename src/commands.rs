use crate::adapter::DEFAULT_TIMEOUT_MS;
use crate::args::{encode_with, Arg, Quoting};
use crate::responses::{
    parse_access_points, parse_connection, parse_connection_established, parse_mac, parse_mode,
    parse_network_config, parse_ping, parse_sleep_mode, parse_soft_ap_config, parse_version, AccessPoint,
    Association, NetworkConfig, Response, SleepMode, SoftApConfig, VersionInfo, WifiMode, OK,
};
use crate::stack::TransportType;
use alloc::string::String;
use alloc::vec::Vec;
use alloc::{format, vec};

/// AT command together with its response decoder
pub(crate) trait AtCommand {
    /// Decoded response
    type Output;

    /// Command name including `AT` prefix, e.g. `AT+CWMODE_CUR`
    fn name(&self) -> &'static str;

    /// Arguments, appended after `=` unless all of them are absent
    fn args(&self) -> Vec<Arg<'_>> {
        vec![]
    }

    /// Terminal line ending the transaction early
    fn match_token(&self) -> Option<&'static [u8]> {
        Some(OK)
    }

    fn timeout_ms(&self) -> u32 {
        DEFAULT_TIMEOUT_MS
    }

    fn parse(&self, response: &Response) -> Self::Output;

    /// Encodes the command line without terminator
    fn encode(&self, quoting: Quoting) -> String {
        let args = encode_with(&self.args(), quoting);
        if args.is_empty() {
            return String::from(self.name());
        }

        format!("{}={}", self.name(), args)
    }
}

/// Selects between the current configuration and the one stored in flash
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Storage {
    /// Current configuration, not saved in flash (`_CUR` commands)
    #[default]
    Current,

    /// Configuration stored in flash (`_DEF` commands)
    Default,
}

impl Storage {
    fn pick(self, current: &'static str, default: &'static str) -> &'static str {
        match self {
            Storage::Current => current,
            Storage::Default => default,
        }
    }
}

/// Network interface of the modem
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Interface {
    Station,
    SoftAp,
}

/// Command without arguments just responded by OK (or a custom token)
pub(crate) struct SimpleCommand {
    name: &'static str,
    match_token: Option<&'static [u8]>,
    timeout_ms: u32,
}

impl SimpleCommand {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            match_token: Some(OK),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Restarts the module, finished when `ready` is received
    pub fn restart() -> Self {
        Self::new("AT+RST").awaiting(b"ready", 10_000)
    }

    /// Restores factory settings, followed by a restart
    pub fn factory_reset() -> Self {
        Self::new("AT+RESTORE").awaiting(b"ready", 10_000)
    }

    /// Disconnects from the access point
    pub fn disconnect() -> Self {
        Self::new("AT+CWQAP").awaiting(b"WIFI DISCONNECT", 1_000)
    }

    fn awaiting(mut self, match_token: &'static [u8], timeout_ms: u32) -> Self {
        self.match_token = Some(match_token);
        self.timeout_ms = timeout_ms;
        self
    }
}

impl AtCommand for SimpleCommand {
    type Output = bool;

    fn name(&self) -> &'static str {
        self.name
    }

    fn match_token(&self) -> Option<&'static [u8]> {
        self.match_token
    }

    fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    fn parse(&self, response: &Response) -> bool {
        response.success
    }
}

/// Firmware version query (`AT+GMR`)
pub(crate) struct VersionCommand;

impl AtCommand for VersionCommand {
    type Output = Option<VersionInfo>;

    fn name(&self) -> &'static str {
        "AT+GMR"
    }

    fn parse(&self, response: &Response) -> Self::Output {
        parse_version(response)
    }
}

/// Sleep mode query
pub(crate) struct SleepModeQuery;

impl AtCommand for SleepModeQuery {
    type Output = Option<SleepMode>;

    fn name(&self) -> &'static str {
        "AT+SLEEP?"
    }

    fn parse(&self, response: &Response) -> Self::Output {
        parse_sleep_mode(response)
    }
}

/// Sets the sleep mode, just supported in station mode
pub(crate) struct SetSleepModeCommand {
    mode: SleepMode,
}

impl SetSleepModeCommand {
    pub fn new(mode: SleepMode) -> Self {
        Self { mode }
    }
}

impl AtCommand for SetSleepModeCommand {
    type Output = bool;

    fn name(&self) -> &'static str {
        "AT+SLEEP"
    }

    fn args(&self) -> Vec<Arg<'_>> {
        vec![self.mode.id().into()]
    }

    fn parse(&self, response: &Response) -> bool {
        response.success
    }
}

/// WIFI mode query
pub(crate) struct WifiModeQuery {
    storage: Storage,
}

impl WifiModeQuery {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

impl AtCommand for WifiModeQuery {
    type Output = Option<WifiMode>;

    fn name(&self) -> &'static str {
        self.storage.pick("AT+CWMODE_CUR?", "AT+CWMODE_DEF?")
    }

    fn parse(&self, response: &Response) -> Self::Output {
        parse_mode(response, self.storage.pick("+CWMODE_CUR:", "+CWMODE_DEF:"))
    }
}

/// Sets the WIFI mode
pub(crate) struct WifiModeCommand {
    storage: Storage,
    mode: WifiMode,
}

impl WifiModeCommand {
    pub fn new(storage: Storage, mode: WifiMode) -> Self {
        Self { storage, mode }
    }
}

impl AtCommand for WifiModeCommand {
    type Output = bool;

    fn name(&self) -> &'static str {
        self.storage.pick("AT+CWMODE_CUR", "AT+CWMODE_DEF")
    }

    fn args(&self) -> Vec<Arg<'_>> {
        vec![self.mode.id().into()]
    }

    fn parse(&self, response: &Response) -> bool {
        response.success
    }
}

/// Command for connecting to an access point
pub(crate) struct AccessPointConnectCommand<'a> {
    storage: Storage,
    ssid: &'a str,
    password: &'a str,
    bssid: Option<&'a str>,
    timeout_ms: u32,
}

impl<'a> AccessPointConnectCommand<'a> {
    pub fn new(storage: Storage, ssid: &'a str, password: &'a str, bssid: Option<&'a str>, timeout_ms: u32) -> Self {
        Self {
            storage,
            ssid,
            password,
            bssid,
            timeout_ms,
        }
    }
}

impl AtCommand for AccessPointConnectCommand<'_> {
    type Output = bool;

    fn name(&self) -> &'static str {
        self.storage.pick("AT+CWJAP_CUR", "AT+CWJAP_DEF")
    }

    fn args(&self) -> Vec<Arg<'_>> {
        vec![self.ssid.into(), self.password.into(), self.bssid.into()]
    }

    fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    fn parse(&self, response: &Response) -> bool {
        response.success
    }
}

/// Query of the current access point association
pub(crate) struct ConnectionQuery {
    storage: Storage,
}

impl ConnectionQuery {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

impl AtCommand for ConnectionQuery {
    type Output = Option<Association>;

    fn name(&self) -> &'static str {
        self.storage.pick("AT+CWJAP_CUR?", "AT+CWJAP_DEF?")
    }

    fn parse(&self, response: &Response) -> Self::Output {
        parse_connection(response, self.storage.pick("+CWJAP_CUR:", "+CWJAP_DEF:"))
    }
}

/// Lists the available access points
pub(crate) struct ListAccessPointsCommand {
    timeout_ms: u32,
}

impl ListAccessPointsCommand {
    pub fn new(timeout_ms: u32) -> Self {
        Self { timeout_ms }
    }
}

impl AtCommand for ListAccessPointsCommand {
    type Output = Option<Vec<AccessPoint>>;

    fn name(&self) -> &'static str {
        "AT+CWLAP"
    }

    fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    fn parse(&self, response: &Response) -> Self::Output {
        parse_access_points(response)
    }
}

/// MAC address query of station or SoftAP
pub(crate) struct MacQuery {
    interface: Interface,
}

impl MacQuery {
    pub fn new(interface: Interface) -> Self {
        Self { interface }
    }

    fn prefix(&self) -> &'static str {
        match self.interface {
            Interface::Station => "+CIPSTAMAC_CUR:",
            Interface::SoftAp => "+CIPAPMAC_CUR:",
        }
    }
}

impl AtCommand for MacQuery {
    type Output = Option<heapless::String<17>>;

    fn name(&self) -> &'static str {
        match self.interface {
            Interface::Station => "AT+CIPSTAMAC_CUR?",
            Interface::SoftAp => "AT+CIPAPMAC_CUR?",
        }
    }

    fn parse(&self, response: &Response) -> Self::Output {
        parse_mac(response, self.prefix())
    }
}

/// IP, gateway and netmask query of station or SoftAP
pub(crate) struct NetworkConfigQuery {
    interface: Interface,
}

impl NetworkConfigQuery {
    pub fn new(interface: Interface) -> Self {
        Self { interface }
    }

    fn prefix(&self) -> &'static str {
        match self.interface {
            Interface::Station => "+CIPSTA_CUR:",
            Interface::SoftAp => "+CIPAP_CUR:",
        }
    }
}

impl AtCommand for NetworkConfigQuery {
    type Output = Option<NetworkConfig>;

    fn name(&self) -> &'static str {
        match self.interface {
            Interface::Station => "AT+CIPSTA_CUR?",
            Interface::SoftAp => "AT+CIPAP_CUR?",
        }
    }

    fn parse(&self, response: &Response) -> Self::Output {
        parse_network_config(response, self.prefix())
    }
}

/// SoftAP configuration query
pub(crate) struct SoftApConfigQuery {
    storage: Storage,
}

impl SoftApConfigQuery {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

impl AtCommand for SoftApConfigQuery {
    type Output = Option<SoftApConfig>;

    fn name(&self) -> &'static str {
        self.storage.pick("AT+CWSAP_CUR?", "AT+CWSAP_DEF?")
    }

    fn parse(&self, response: &Response) -> Self::Output {
        let prefix = self.storage.pick("+CWSAP_CUR:", "+CWSAP_DEF:");
        parse_soft_ap_config(response, prefix, self.storage == Storage::Default)
    }
}

/// Configures the SoftAP
///
/// No match token is used, so the transaction always runs to its deadline.
pub(crate) struct SetSoftApConfigCommand<'a> {
    storage: Storage,
    config: &'a SoftApConfig,
}

impl<'a> SetSoftApConfigCommand<'a> {
    pub fn new(storage: Storage, config: &'a SoftApConfig) -> Self {
        Self { storage, config }
    }
}

impl AtCommand for SetSoftApConfigCommand<'_> {
    type Output = bool;

    fn name(&self) -> &'static str {
        self.storage.pick("AT+CWSAP_CUR", "AT+CWSAP_DEF")
    }

    fn args(&self) -> Vec<Arg<'_>> {
        vec![
            self.config.ssid.as_str().into(),
            self.config.password.as_str().into(),
            self.config.channel.into(),
            self.config.ecn.into(),
            self.config.max_connections.into(),
            self.config.hidden.into(),
        ]
    }

    fn match_token(&self) -> Option<&'static [u8]> {
        None
    }

    fn parse(&self, response: &Response) -> bool {
        response.success
    }
}

/// Pings the given host
pub(crate) struct PingCommand<'a> {
    host: &'a str,
}

impl<'a> PingCommand<'a> {
    pub fn new(host: &'a str) -> Self {
        Self { host }
    }
}

impl AtCommand for PingCommand<'_> {
    type Output = Option<u32>;

    fn name(&self) -> &'static str {
        "AT+PING"
    }

    fn args(&self) -> Vec<Arg<'_>> {
        vec![self.host.into()]
    }

    fn parse(&self, response: &Response) -> Self::Output {
        parse_ping(response)
    }
}

/// Establish TCP Connection, UDP Transmission, or SSL Connection
pub(crate) struct ConnectCommand<'a> {
    /// Required in multiple connection mode only
    link_id: Option<u8>,
    transport: TransportType,
    host: &'a str,
    port: u16,
}

impl<'a> ConnectCommand<'a> {
    pub fn new(link_id: Option<u8>, transport: TransportType, host: &'a str, port: u16) -> Self {
        Self {
            link_id,
            transport,
            host,
            port,
        }
    }
}

impl AtCommand for ConnectCommand<'_> {
    type Output = bool;

    fn name(&self) -> &'static str {
        "AT+CIPSTART"
    }

    fn args(&self) -> Vec<Arg<'_>> {
        vec![
            self.link_id.into(),
            self.transport.as_str().into(),
            self.host.into(),
            self.port.into(),
        ]
    }

    fn timeout_ms(&self) -> u32 {
        5_000
    }

    fn parse(&self, response: &Response) -> bool {
        parse_connection_established(response)
    }
}

/// Closes the given connection, or the single connection if no link ID is given
pub(crate) struct CloseSocketCommand {
    link_id: Option<u8>,
}

impl CloseSocketCommand {
    pub fn new(link_id: Option<u8>) -> Self {
        Self { link_id }
    }
}

impl AtCommand for CloseSocketCommand {
    type Output = bool;

    fn name(&self) -> &'static str {
        "AT+CIPCLOSE"
    }

    fn args(&self) -> Vec<Arg<'_>> {
        vec![self.link_id.into()]
    }

    fn parse(&self, response: &Response) -> bool {
        response.success
    }
}

/// Announces the length of the data to send (`AT+CIPSEND`)
pub(crate) struct TransmissionPrepareCommand {
    link_id: Option<u8>,
    length: usize,
}

impl TransmissionPrepareCommand {
    pub fn new(link_id: Option<u8>, length: usize) -> Self {
        Self { link_id, length }
    }
}

impl AtCommand for TransmissionPrepareCommand {
    type Output = bool;

    fn name(&self) -> &'static str {
        "AT+CIPSEND"
    }

    fn args(&self) -> Vec<Arg<'_>> {
        vec![self.link_id.into(), Arg::Number(self.length as i64)]
    }

    fn parse(&self, response: &Response) -> bool {
        response.success
    }
}

/// Command with a single numeric argument just responded by OK
pub(crate) struct NumericCommand {
    name: &'static str,
    value: u32,
}

impl NumericCommand {
    /// Enables (1) or disables (0) multiple connections
    pub fn multiple_connections(enabled: bool) -> Self {
        Self {
            name: "AT+CIPMUX",
            value: enabled as u32,
        }
    }

    /// Max. connections accepted by the server
    pub fn server_max_connections(count: u8) -> Self {
        Self {
            name: "AT+CIPSERVERMAXCONN",
            value: count as u32,
        }
    }

    /// Timeout in seconds after which idle server connections get closed
    pub fn server_timeout(seconds: u16) -> Self {
        Self {
            name: "AT+CIPSTO",
            value: seconds as u32,
        }
    }
}

impl AtCommand for NumericCommand {
    type Output = bool;

    fn name(&self) -> &'static str {
        self.name
    }

    fn args(&self) -> Vec<Arg<'_>> {
        vec![self.value.into()]
    }

    fn parse(&self, response: &Response) -> bool {
        response.success
    }
}

/// Creates or deletes the TCP server
pub(crate) struct ServerCommand {
    port: Option<u16>,
}

impl ServerCommand {
    pub fn start(port: u16) -> Self {
        Self { port: Some(port) }
    }

    pub fn stop() -> Self {
        Self { port: None }
    }
}

impl AtCommand for ServerCommand {
    type Output = bool;

    fn name(&self) -> &'static str {
        "AT+CIPSERVER"
    }

    fn args(&self) -> Vec<Arg<'_>> {
        vec![self.port.is_some().into(), self.port.into()]
    }

    fn parse(&self, response: &Response) -> bool {
        response.success
    }
}
