//! # Unsolicited inbound data
//!
//! Socket data is delivered by the modem as `+IPD` notification, which is not a response to any
//! pending command. It may be preceded by arbitrary noise, e.g. trailing lines of a previous command.
use alloc::vec::Vec;

/// Marker of inbound data notifications
const MARKER: &[u8] = b"+IPD,";

/// Notification sent after the remote side closed the connection
const CLOSED: &[u8] = b"CLOSED";

/// Socket data received by `+IPD` notification
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundFrame {
    /// Connection ID, s. `+IPD,<link_id>[,<length>]:<data>`
    pub link_id: u32,

    /// Received data without any trailing `CLOSED` notification
    pub payload: Vec<u8>,
}

impl InboundFrame {
    /// Extracts the first frame of the given raw read. Returns None if no (valid) notification is contained.
    pub fn parse(chunk: &[u8]) -> Option<Self> {
        let start = find(chunk, MARKER)? + MARKER.len();
        let descriptor_length = find(&chunk[start..], b":")?;
        let descriptor = core::str::from_utf8(&chunk[start..start + descriptor_length]).ok()?;

        let (link_id, length) = match descriptor.split_once(',') {
            Some((link_id, length)) => (link_id, Some(length.trim().parse::<usize>().ok()?)),
            None => (descriptor, None),
        };
        let link_id = link_id.trim().parse().ok()?;

        let mut payload = &chunk[start + descriptor_length + 1..];
        if let Some(length) = length {
            payload = &payload[..length.min(payload.len())];
        }

        Some(Self {
            link_id,
            payload: strip_closed(payload).to_vec(),
        })
    }
}

/// Strips a trailing `CLOSED` notification (with or without line terminator)
fn strip_closed(payload: &[u8]) -> &[u8] {
    let trimmed = payload.strip_suffix(b"\r\n").unwrap_or(payload);

    match trimmed.strip_suffix(CLOSED) {
        Some(data) => data,
        None => payload,
    }
}

/// Returns the position of the first occurrence of needle
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }

    haystack.windows(needle.len()).position(|window| window == needle)
}
