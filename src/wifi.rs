//! # WIFI client
//!
//! Basic modem control, joining networks, scanning and SoftAP configuration.
//!
//! Every operation accepts an optional debug flag. If set to None, the default of the adapter is used
//! (s. [Adapter::set_debug]).
//!
//! ## Example
//!
//! ````
//! # use esp_at_serial::example::{ExampleTimer, ExampleTransport};
//! # use esp_at_serial::wifi::{Adapter, Association, Storage};
//! #
//! let mut adapter: Adapter<_, _, 1_000> = Adapter::new(ExampleTransport::default(), ExampleTimer::default());
//!
//! // Joining the target WIFI access point
//! assert!(adapter.join(Storage::Current, "test_wifi", "secret", None, None, None).unwrap());
//!
//! match adapter.get_connection(Storage::Current, None).unwrap() {
//!     Some(Association::Connected(info)) => assert_eq!(-42, info.rssi),
//!     _ => panic!("Not associated"),
//! }
//!
//! let config = adapter.get_station_ip(None).unwrap().unwrap();
//! assert_eq!("10.0.0.181", config.ip.to_string());
//! ````
use crate::commands::{
    AccessPointConnectCommand, ConnectionQuery, Interface, ListAccessPointsCommand, MacQuery, NetworkConfigQuery,
    SetSleepModeCommand, SetSoftApConfigCommand, SimpleCommand, SleepModeQuery, SoftApConfigQuery, VersionCommand,
    WifiModeCommand, WifiModeQuery,
};
use alloc::vec::Vec;
use embedded_io::{Read, ReadReady, Write};
use fugit_timer::Timer;

pub use crate::adapter::{Adapter, Error};
pub use crate::commands::Storage;
pub use crate::responses::{
    AccessPoint, Association, AuthMode, ConnectionInfo, NetworkConfig, SleepMode, SoftApConfig, VersionInfo,
    WifiMode,
};

/// Default timeout for joining an access point
const JOIN_TIMEOUT_MS: u32 = 10_000;

/// Default timeout for scanning access points
const SCAN_TIMEOUT_MS: u32 = 15_000;

impl<S: Read + Write + ReadReady, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> Adapter<S, T, TIMER_HZ> {
    /// Tests the AT command interface
    pub fn test(&mut self, debug: Option<bool>) -> Result<bool, Error> {
        self.execute(&SimpleCommand::new("AT"), debug)
    }

    /// Disables echoing of commands
    pub fn echo_off(&mut self, debug: Option<bool>) -> Result<bool, Error> {
        self.execute(&SimpleCommand::new("ATE0"), debug)
    }

    /// Enables echoing of commands
    pub fn echo_on(&mut self, debug: Option<bool>) -> Result<bool, Error> {
        self.execute(&SimpleCommand::new("ATE1"), debug)
    }

    /// Restarts the module and waits up to 10 seconds until it is ready
    pub fn restart(&mut self, debug: Option<bool>) -> Result<bool, Error> {
        self.execute(&SimpleCommand::restart(), debug)
    }

    /// Restores the factory default settings
    pub fn factory_reset(&mut self, debug: Option<bool>) -> Result<bool, Error> {
        self.execute(&SimpleCommand::factory_reset(), debug)
    }

    /// Returns AT version, SDK version and compile time
    pub fn version(&mut self, debug: Option<bool>) -> Result<Option<VersionInfo>, Error> {
        self.execute(&VersionCommand, debug)
    }

    pub fn get_sleep_mode(&mut self, debug: Option<bool>) -> Result<Option<SleepMode>, Error> {
        self.execute(&SleepModeQuery, debug)
    }

    /// Configures the sleep mode. Only supported in station mode.
    pub fn set_sleep_mode(&mut self, mode: SleepMode, debug: Option<bool>) -> Result<bool, Error> {
        self.execute(&SetSleepModeCommand::new(mode), debug)
    }

    /// Returns the WIFI mode (Station/SoftAP/Station+SoftAP)
    pub fn get_mode(&mut self, storage: Storage, debug: Option<bool>) -> Result<Option<WifiMode>, Error> {
        self.execute(&WifiModeQuery::new(storage), debug)
    }

    /// Sets the WIFI mode (Station/SoftAP/Station+SoftAP)
    pub fn set_mode(&mut self, storage: Storage, mode: WifiMode, debug: Option<bool>) -> Result<bool, Error> {
        self.execute(&WifiModeCommand::new(storage, mode), debug)
    }

    /// Connects to an WIFI access point. Returns true if the connection was established.
    ///
    /// `bssid` is used to select a specific access point if multiple ones share the SSID.
    /// The default timeout is 10 seconds.
    pub fn join(
        &mut self,
        storage: Storage,
        ssid: &str,
        password: &str,
        bssid: Option<&str>,
        timeout_ms: Option<u32>,
        debug: Option<bool>,
    ) -> Result<bool, Error> {
        if ssid.len() > 32 {
            return Err(Error::InvalidSsidLength);
        }

        if password.len() > 63 {
            return Err(Error::InvalidPasswordLength);
        }

        let timeout = timeout_ms.unwrap_or(JOIN_TIMEOUT_MS);
        let command = AccessPointConnectCommand::new(storage, ssid, password, bssid, timeout);
        self.execute(&command, debug)
    }

    /// Disconnects from the current access point
    pub fn disconnect(&mut self, debug: Option<bool>) -> Result<bool, Error> {
        self.execute(&SimpleCommand::disconnect(), debug)
    }

    /// Queries the access point association
    ///
    /// Returns [Association::NotAssociated] if not connected to any access point. None is returned
    /// if the modem did not respond as expected.
    pub fn get_connection(&mut self, storage: Storage, debug: Option<bool>) -> Result<Option<Association>, Error> {
        self.execute(&ConnectionQuery::new(storage), debug)
    }

    /// Lists the available access points, strongest signal first
    pub fn scan(&mut self, timeout_ms: Option<u32>, debug: Option<bool>) -> Result<Option<Vec<AccessPoint>>, Error> {
        let command = ListAccessPointsCommand::new(timeout_ms.unwrap_or(SCAN_TIMEOUT_MS));
        let mut access_points = self.execute(&command, debug)?;

        if let Some(list) = access_points.as_mut() {
            list.sort_by(|a, b| b.rssi.cmp(&a.rssi));
        }

        Ok(access_points)
    }

    /// Returns the MAC address of the SoftAP
    pub fn get_ap_mac(&mut self, debug: Option<bool>) -> Result<Option<heapless::String<17>>, Error> {
        self.execute(&MacQuery::new(Interface::SoftAp), debug)
    }

    /// Returns the MAC address of the station
    pub fn get_station_mac(&mut self, debug: Option<bool>) -> Result<Option<heapless::String<17>>, Error> {
        self.execute(&MacQuery::new(Interface::Station), debug)
    }

    /// Returns IP, gateway and netmask of the SoftAP
    pub fn get_ap_ip(&mut self, debug: Option<bool>) -> Result<Option<NetworkConfig>, Error> {
        self.execute(&NetworkConfigQuery::new(Interface::SoftAp), debug)
    }

    /// Returns IP, gateway and netmask of the station
    pub fn get_station_ip(&mut self, debug: Option<bool>) -> Result<Option<NetworkConfig>, Error> {
        self.execute(&NetworkConfigQuery::new(Interface::Station), debug)
    }

    /// Returns the SoftAP configuration
    ///
    /// The hidden flag is decoded from the numeric value of its field (non-zero means hidden for
    /// [Storage::Current]), so a non-numeric field yields None instead of being taken as set.
    ///
    /// Note: The hidden flag of [Storage::Default] is decoded with reversed polarity.
    pub fn get_ap_config(&mut self, storage: Storage, debug: Option<bool>) -> Result<Option<SoftApConfig>, Error> {
        self.execute(&SoftApConfigQuery::new(storage), debug)
    }

    /// Configures the SoftAP
    ///
    /// The modem does not confirm this command by a dedicated token, so this call always blocks
    /// for the full command timeout of two seconds.
    pub fn set_ap_config(&mut self, storage: Storage, config: &SoftApConfig, debug: Option<bool>) -> Result<bool, Error> {
        if config.ssid.len() > 32 {
            return Err(Error::InvalidSsidLength);
        }

        if config.password.len() > 63 {
            return Err(Error::InvalidPasswordLength);
        }

        if !(1..=14).contains(&config.channel) {
            return Err(Error::InvalidChannel);
        }

        if !(1..=4).contains(&config.max_connections) {
            return Err(Error::InvalidMaxConnections);
        }

        self.execute(&SetSoftApConfigCommand::new(storage, config), debug)
    }
}
