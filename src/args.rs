//! # Argument encoding
//!
//! Serializes heterogeneous AT command arguments into the comma separated wire format.
//!
//! ````
//! # use esp_at_serial::args::{encode, Arg};
//! let encoded = encode(&[Arg::from("MySSID"), Arg::from("pwd"), Arg::Absent, Arg::from(true)]);
//! assert_eq!("\"MySSID\",\"pwd\",1", encoded);
//! ````
use alloc::string::String;
use numtoa::NumToA;

/// Single AT command argument
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Arg<'a> {
    /// Text wrapped in double quotes
    Text(&'a str),

    /// Raw bytes, written as they are (without quotes)
    Bytes(&'a [u8]),

    /// Encoded as `1` or `0`
    Bool(bool),

    /// Decimal number
    Number(i64),

    /// Omitted argument. Contributes nothing, not even an empty field.
    Absent,
}

/// Handling of special characters inside [Arg::Text]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Quoting {
    /// Text is quoted as is. Embedded quotes or backslashes are not escaped.
    #[default]
    Raw,

    /// Backslash, double quote and comma get escaped by a backslash
    Escaped,
}

/// Encodes the arguments using [Quoting::Raw]
pub fn encode(args: &[Arg<'_>]) -> String {
    encode_with(args, Quoting::Raw)
}

/// Encodes the arguments using the given quoting rule
pub fn encode_with(args: &[Arg<'_>], quoting: Quoting) -> String {
    let mut encoded = String::new();

    for arg in args.iter().filter(|arg| **arg != Arg::Absent) {
        if !encoded.is_empty() {
            encoded.push(',');
        }

        arg.write(&mut encoded, quoting);
    }

    encoded
}

impl Arg<'_> {
    fn write(&self, target: &mut String, quoting: Quoting) {
        match self {
            Arg::Text(text) => {
                target.push('"');
                match quoting {
                    Quoting::Raw => target.push_str(text),
                    Quoting::Escaped => {
                        for c in text.chars() {
                            if matches!(c, '\\' | '"' | ',') {
                                target.push('\\');
                            }
                            target.push(c);
                        }
                    }
                }
                target.push('"');
            }
            Arg::Bytes(bytes) => target.push_str(&String::from_utf8_lossy(bytes)),
            Arg::Bool(value) => target.push(if *value { '1' } else { '0' }),
            Arg::Number(value) => {
                let mut buffer = [0x0; 24];
                for digit in (*value).numtoa(10, &mut buffer) {
                    target.push(*digit as char);
                }
            }
            Arg::Absent => {}
        }
    }
}

impl<'a> From<&'a str> for Arg<'a> {
    fn from(text: &'a str) -> Self {
        Arg::Text(text)
    }
}

impl<'a> From<&'a [u8]> for Arg<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Arg::Bytes(bytes)
    }
}

impl From<bool> for Arg<'_> {
    fn from(value: bool) -> Self {
        Arg::Bool(value)
    }
}

macro_rules! number_arg {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Arg<'_> {
                fn from(value: $ty) -> Self {
                    Arg::Number(value as i64)
                }
            }
        )*
    };
}

number_arg!(u8, u16, u32, i8, i16, i32, i64);

impl<'a, T: Into<Arg<'a>>> From<Option<T>> for Arg<'a> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Arg::Absent,
        }
    }
}
