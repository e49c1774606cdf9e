use std::error::Error;
use std::fmt;

use super::{DeserializeError, InvalidText, SerializeError};

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotEnoughSpace => write!(f, "not enough space in buffer"),
            Self::LengthOverflow => write!(f, "field length overflowed its wire representation"),
        }
    }
}

impl Error for SerializeError {}

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWireBytes => write!(f, "invalid byte representation of object"),
            Self::UnexpectedEnd => write!(f, "unexpected end of buffer when deserializing object"),
            Self::VersionMismatch => write!(
                f,
                "mismatch in protocol version & authentication protocol specified"
            ),
            Self::PacketTypeMismatch { expected, actual } => write!(
                f,
                "packet type mismatch: expected {expected:?}, got {actual:#04x}"
            ),
            Self::IncorrectUnencryptedFlag => {
                write!(f, "unencrypted flag did not match the requested deserialization")
            }
            Self::InvalidStatus(status) => write!(f, "invalid reply status {status:#04x}"),
        }
    }
}

impl Error for DeserializeError {}

impl fmt::Display for InvalidText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "text contained non-printable ASCII characters")
    }
}

impl Error for InvalidText {}
