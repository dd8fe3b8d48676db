//! # Response decoding
//!
//! Every decoder is a pure function of a [Response]. A failed transaction (`success == false`)
//! is never inspected and decodes to `None`, the same as a response without any matching line.
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::net::Ipv4Addr;
use core::str::FromStr;
use log::warn;
use nom::branch::alt;
use nom::bytes::complete::{escaped_transform, is_not, tag};
use nom::character::complete::{char, i64 as integer, multispace0};
use nom::combinator::{all_consuming, map, opt, value};
use nom::multi::{separated_list0, separated_list1};
use nom::sequence::delimited;
use nom::IResult;

/// Generic success sentinel
pub const OK: &[u8] = b"OK";

/// Result of a single AT transaction
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Response {
    /// True if either `OK` or the command specific match token was received before the deadline
    pub success: bool,

    /// Raw payload lines in arrival order. Never contains the sentinel or match token line.
    pub lines: Vec<Vec<u8>>,
}

impl Response {
    pub fn new(success: bool, lines: Vec<Vec<u8>>) -> Self {
        Self { success, lines }
    }

    /// Returns the decoded lines with CR/LF removed, or None if the transaction failed
    pub(crate) fn payload(&self) -> Option<impl Iterator<Item = String> + '_> {
        if !self.success {
            return None;
        }

        Some(self.lines.iter().map(|line| {
            String::from_utf8_lossy(line)
                .chars()
                .filter(|c| *c != '\r' && *c != '\n')
                .collect()
        }))
    }

    /// Returns the remainder of the first line starting with the given prefix
    pub(crate) fn find(&self, prefix: &str) -> Option<String> {
        self.payload()?
            .find(|line| line.starts_with(prefix))
            .map(|line| line[prefix.len()..].to_string())
    }
}

/// WIFI mode
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WifiMode {
    /// RF disabled, supported by newer firmware only
    Null,
    Station,
    SoftAp,
    StationSoftAp,
}

impl WifiMode {
    pub(crate) fn id(self) -> u8 {
        match self {
            WifiMode::Null => 0,
            WifiMode::Station => 1,
            WifiMode::SoftAp => 2,
            WifiMode::StationSoftAp => 3,
        }
    }
}

impl TryFrom<i64> for WifiMode {
    type Error = ();

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(WifiMode::Null),
            1 => Ok(WifiMode::Station),
            2 => Ok(WifiMode::SoftAp),
            3 => Ok(WifiMode::StationSoftAp),
            _ => Err(()),
        }
    }
}

/// Sleep mode of the modem
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SleepMode {
    Disabled,
    Light,
    /// Default sleep mode
    Modem,
}

impl SleepMode {
    pub(crate) fn id(self) -> u8 {
        match self {
            SleepMode::Disabled => 0,
            SleepMode::Light => 1,
            SleepMode::Modem => 2,
        }
    }
}

impl TryFrom<i64> for SleepMode {
    type Error = ();

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(SleepMode::Disabled),
            1 => Ok(SleepMode::Light),
            2 => Ok(SleepMode::Modem),
            _ => Err(()),
        }
    }
}

/// Authentication mode reported by scans (`ecn` field)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AuthMode {
    Open,
    Wep,
    WpaPsk,
    Wpa2Psk,
    WpaWpa2Psk,
}

impl AuthMode {
    pub fn id(self) -> u8 {
        match self {
            AuthMode::Open => 0,
            AuthMode::Wep => 1,
            AuthMode::WpaPsk => 2,
            AuthMode::Wpa2Psk => 3,
            AuthMode::WpaWpa2Psk => 4,
        }
    }
}

impl TryFrom<i64> for AuthMode {
    type Error = ();

    fn try_from(ecn: i64) -> Result<Self, Self::Error> {
        match ecn {
            0 => Ok(AuthMode::Open),
            1 => Ok(AuthMode::Wep),
            2 => Ok(AuthMode::WpaPsk),
            3 => Ok(AuthMode::Wpa2Psk),
            4 => Ok(AuthMode::WpaWpa2Psk),
            _ => Err(()),
        }
    }
}

/// Access point found by a scan
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessPoint {
    pub auth_mode: AuthMode,
    pub ssid: String,
    /// Signal strength in dBm
    pub rssi: i32,
    /// Only present if reported by the firmware
    pub mac: Option<heapless::String<17>>,
    /// Only present if reported by the firmware
    pub channel: Option<u8>,
}

/// Details of the current access point association
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub ssid: String,
    pub bssid: heapless::String<17>,
    pub channel: u8,
    pub rssi: i32,
}

/// Outcome of a connection query
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Association {
    Connected(ConnectionInfo),
    /// Modem reported `No AP`
    NotAssociated,
}

/// IPv4 configuration of the station or SoftAP interface
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkConfig {
    pub ip: Ipv4Addr,
    pub gateway: Option<Ipv4Addr>,
    pub netmask: Option<Ipv4Addr>,
}

/// Firmware version information. Fields not reported by the modem are None.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VersionInfo {
    pub at_version: Option<String>,
    pub sdk_version: Option<String>,
    pub compile_time: Option<String>,
}

/// SoftAP configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoftApConfig {
    pub ssid: String,
    pub password: String,
    pub channel: u8,
    /// Encryption, s. [AuthMode::id]. WEP is not supported by the SoftAP.
    pub ecn: u8,
    pub max_connections: u8,
    pub hidden: bool,
}

impl SoftApConfig {
    /// Creates a WPA/WPA2 configuration accepting up to four stations
    pub fn new(ssid: &str, password: &str, channel: u8) -> Self {
        Self {
            ssid: ssid.to_string(),
            password: password.to_string(),
            channel,
            ecn: AuthMode::WpaWpa2Psk.id(),
            max_connections: 4,
            hidden: false,
        }
    }
}

/// Literal of a tuple or field list as printed by the firmware
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Literal {
    Int(i64),
    Text(String),
}

impl Literal {
    fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int(value) => Some(*value),
            Literal::Text(_) => None,
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Literal::Text(text) => Some(text.as_str()),
            Literal::Int(_) => None,
        }
    }
}

fn text_literal(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((value("\\", tag("\\")), value("\"", tag("\"")))),
            )),
            |text: Option<String>| text.unwrap_or_default(),
        ),
        char('"'),
    )(input)
}

fn literal(input: &str) -> IResult<&str, Literal> {
    delimited(
        multispace0,
        alt((map(text_literal, Literal::Text), map(integer, Literal::Int))),
        multispace0,
    )(input)
}

/// Parses a parenthesized tuple, e.g. `(4,"one",-82,"22:11:33:44:55:66",1)`
pub(crate) fn parse_tuple(input: &str) -> Option<Vec<Literal>> {
    let result: IResult<&str, Vec<Literal>> = all_consuming(delimited(
        multispace0,
        delimited(char('('), separated_list0(char(','), literal), char(')')),
        multispace0,
    ))(input);
    result.ok().map(|(_, literals)| literals)
}

/// Parses a plain field list, e.g. `"MySSID","aa:bb:cc:dd:ee:ff",6,-42`
pub(crate) fn parse_fields(input: &str) -> Option<Vec<Literal>> {
    let result: IResult<&str, Vec<Literal>> = all_consuming(separated_list1(char(','), literal))(input);
    result.ok().map(|(_, literals)| literals)
}

fn mac_address(text: &str) -> Option<heapless::String<17>> {
    let mut mac = heapless::String::new();
    mac.push_str(text).ok()?;
    Some(mac)
}

fn unquote(text: &str) -> &str {
    text.trim().trim_matches('"')
}

/// Decodes the integer after the last colon, e.g. `+CWMODE_CUR:1`
pub fn parse_mode(response: &Response, prefix: &str) -> Option<WifiMode> {
    WifiMode::try_from(parse_trailing_integer(response, prefix)?).ok()
}

/// Decodes `+SLEEP:<mode>`
pub fn parse_sleep_mode(response: &Response) -> Option<SleepMode> {
    SleepMode::try_from(parse_trailing_integer(response, "+SLEEP:")?).ok()
}

fn parse_trailing_integer(response: &Response, prefix: &str) -> Option<i64> {
    let line = response.payload()?.find(|line| line.starts_with(prefix))?;
    line.rsplit(':').next()?.trim().parse().ok()
}

/// Decodes the current access point association, e.g. `+CWJAP_CUR:"MySSID","aa:bb:cc:dd:ee:ff",6,-42`
pub fn parse_connection(response: &Response, prefix: &str) -> Option<Association> {
    for line in response.payload()? {
        if line.contains("No AP") {
            return Some(Association::NotAssociated);
        }

        if let Some(remainder) = line.strip_prefix(prefix) {
            let fields = parse_fields(remainder)?;
            if fields.len() < 4 {
                return None;
            }

            return Some(Association::Connected(ConnectionInfo {
                ssid: fields[0].as_text()?.to_string(),
                bssid: mac_address(fields[1].as_text()?)?,
                channel: u8::try_from(fields[2].as_int()?).ok()?,
                rssi: i32::try_from(fields[3].as_int()?).ok()?,
            }));
        }
    }

    None
}

/// Decodes all `+CWLAP:(...)` lines. Malformed lines are skipped.
///
/// The list is returned in arrival order, sorting is left to the caller.
pub fn parse_access_points(response: &Response) -> Option<Vec<AccessPoint>> {
    let mut access_points = Vec::new();

    for line in response.payload()? {
        let Some(position) = line.find("+CWLAP:") else {
            continue;
        };

        match parse_access_point(&line[position + 7..]) {
            Some(access_point) => access_points.push(access_point),
            None => warn!("Skipping malformed access point line: {}", line),
        }
    }

    Some(access_points)
}

fn parse_access_point(tuple: &str) -> Option<AccessPoint> {
    let literals = parse_tuple(tuple)?;
    if literals.len() < 3 {
        return None;
    }

    let mut access_point = AccessPoint {
        auth_mode: AuthMode::try_from(literals[0].as_int()?).ok()?,
        ssid: literals[1].as_text()?.to_string(),
        rssi: i32::try_from(literals[2].as_int()?).ok()?,
        mac: None,
        channel: None,
    };

    if let Some(mac) = literals.get(3) {
        access_point.mac = Some(mac_address(mac.as_text()?)?);
    }

    if let Some(channel) = literals.get(4) {
        access_point.channel = Some(u8::try_from(channel.as_int()?).ok()?);
    }

    Some(access_point)
}

/// Decodes the `ip`, `gateway` and `netmask` lines of the given prefix, e.g. `+CIPSTA_CUR:`
///
/// Returns None if no valid IP line was found, even if gateway or netmask are present.
pub fn parse_network_config(response: &Response, prefix: &str) -> Option<NetworkConfig> {
    let mut ip = None;
    let mut gateway = None;
    let mut netmask = None;

    for line in response.payload()? {
        let Some(remainder) = line.strip_prefix(prefix) else {
            continue;
        };

        let Some((key, address)) = remainder.split_once(':') else {
            continue;
        };

        let target = match key {
            "ip" => &mut ip,
            "gateway" => &mut gateway,
            "netmask" => &mut netmask,
            _ => continue,
        };

        if target.is_none() {
            *target = Ipv4Addr::from_str(unquote(address)).ok();
        }
    }

    Some(NetworkConfig {
        ip: ip?,
        gateway,
        netmask,
    })
}

/// Decodes the `AT+GMR` output
pub fn parse_version(response: &Response) -> Option<VersionInfo> {
    let mut version = VersionInfo::default();

    for line in response.payload()? {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        let target = match key {
            "AT version" => &mut version.at_version,
            "SDK version" => &mut version.sdk_version,
            "compile time" => &mut version.compile_time,
            _ => continue,
        };

        if target.is_none() {
            *target = Some(value.to_string());
        }
    }

    Some(version)
}

/// Decodes a quoted MAC address, e.g. `+CIPSTAMAC_CUR:"18:fe:34:a1:b2:c3"`
pub fn parse_mac(response: &Response, prefix: &str) -> Option<heapless::String<17>> {
    mac_address(unquote(&response.find(prefix)?))
}

/// Decodes the SoftAP configuration, e.g. `+CWSAP_CUR:"ssid","password",1,4,4,0`
///
/// `inverted_hidden` reverses the polarity of the hidden flag. The firmware query of the stored
/// configuration is decoded this way, while the current configuration is taken as is.
pub fn parse_soft_ap_config(response: &Response, prefix: &str, inverted_hidden: bool) -> Option<SoftApConfig> {
    let fields = parse_fields(&response.find(prefix)?)?;
    if fields.len() < 6 {
        return None;
    }

    let hidden = fields[5].as_int()? != 0;

    Some(SoftApConfig {
        ssid: fields[0].as_text()?.to_string(),
        password: fields[1].as_text()?.to_string(),
        channel: u8::try_from(fields[2].as_int()?).ok()?,
        ecn: u8::try_from(fields[3].as_int()?).ok()?,
        max_connections: u8::try_from(fields[4].as_int()?).ok()?,
        hidden: hidden != inverted_hidden,
    })
}

/// Decodes the ping round trip time in ms, e.g. `+32`
pub fn parse_ping(response: &Response) -> Option<u32> {
    for line in response.payload()? {
        if line.contains("ERR") || line.contains("+timeout") {
            return None;
        }

        if let Some(time) = line.strip_prefix('+') {
            return time.trim().parse().ok();
        }
    }

    None
}

/// Decides if a `AT+CIPSTART` transaction established a connection
///
/// A failed transaction does not necessarily mean that no connection exists, so the lines are
/// inspected even if `success` is false.
pub fn parse_connection_established(response: &Response) -> bool {
    for line in &response.lines {
        let line = String::from_utf8_lossy(line);
        if line.contains("ERR") {
            return false;
        }

        if line.contains("CONN") || line.contains("OK") {
            return true;
        }
    }

    response.success
}
