//! # Blocking driver for ESP-AT modems
//!
//! Controls ESP8266 modems running the AT firmware via a serial connection ([embedded_io]).
//! Each call sends one AT command and blocks until the response was received or the command
//! timeout elapsed. A [fugit_timer::Timer] is used for deadlines and sleeping.
//!
//! * [wifi]: Modem control, joining networks, scanning and SoftAP configuration
//! * [stack]: Connections, ping and a minimal TCP server
//! * [http]: Minimal HTTP client and server responses
//! * [adapter]: The underlying transaction engine
#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

extern crate alloc;

pub mod adapter;
pub mod args;
pub(crate) mod commands;
pub mod http;
pub mod responses;
pub mod stack;
pub mod urc;
pub mod wifi;

#[cfg(feature = "examples")]
pub mod example;

#[cfg(test)]
mod tests;
