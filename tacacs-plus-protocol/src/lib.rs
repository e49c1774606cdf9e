//! TACACS+ ([RFC8907]) protocol packet <-> binary format conversions.
//!
//! Bodies for every packet a client sends or receives are provided, along with
//! the 12-byte header and the MD5-based body obfuscation from [RFC8907 section 4.5].
//!
//! [RFC8907]: https://www.rfc-editor.org/rfc/rfc8907.html
//! [RFC8907 section 4.5]: https://www.rfc-editor.org/rfc/rfc8907.html#name-data-obfuscation

use core::array::TryFromSliceError;

use num_enum::{TryFromPrimitive, TryFromPrimitiveError};

pub mod accounting;
pub mod authentication;
pub mod authorization;

mod arguments;
pub use arguments::{Argument, Arguments, InvalidArgument};

mod fields;
pub use fields::*;

mod packet;
pub use packet::{HeaderInfo, MajorVersion, MinorVersion, Packet, PacketFlags, PacketType, Version};

mod obfuscation;

mod text;
pub use text::{FieldText, InvalidText};

mod error_impls;

/// An error that occurred when serializing a packet or any of its components into their binary format.
#[non_exhaustive]
#[derive(Debug, PartialEq, Eq)]
pub enum SerializeError {
    /// The provided buffer did not have enough space to serialize the object.
    NotEnoughSpace,

    /// The length of a field exceeded the maximum value encodeable on the wire.
    LengthOverflow,
}

/// An error that occurred during deserialization of a full/partial packet.
#[non_exhaustive]
#[derive(Debug, PartialEq, Eq)]
pub enum DeserializeError {
    /// Invalid byte representation of an object.
    InvalidWireBytes,

    /// Object representation was cut off in some way.
    UnexpectedEnd,

    /// Mismatch between expected/actual protocol versions, if relevant.
    VersionMismatch,

    /// The packet type in a header didn't match the type of body being deserialized.
    PacketTypeMismatch {
        /// The packet type the body corresponds to.
        expected: PacketType,

        /// The raw packet type byte found in the header.
        actual: u8,
    },

    /// The unencrypted header flag didn't match the kind of deserialization requested.
    IncorrectUnencryptedFlag,

    /// A status byte in a reply wasn't one of the values defined for its packet type.
    InvalidStatus(u8),
}

// Used in &[u8] -> &[u8; N] -> uNN conversions in body deserialization
impl From<TryFromSliceError> for DeserializeError {
    fn from(_value: TryFromSliceError) -> Self {
        // slice conversion error means there was a length mismatch, which probably means we were expecting more data
        Self::UnexpectedEnd
    }
}

#[doc(hidden)]
impl<Enum: TryFromPrimitive<Primitive = u8>> From<TryFromPrimitiveError<Enum>>
    for DeserializeError
{
    fn from(_value: TryFromPrimitiveError<Enum>) -> Self {
        Self::InvalidWireBytes
    }
}

/// A type that can be treated as a TACACS+ protocol packet body.
pub trait PacketBody {
    /// Type of the packet (one of authentication, authorization, or accounting).
    const TYPE: PacketType;

    /// Length of body just including required fields.
    const REQUIRED_FIELDS_LENGTH: usize;

    /// Required protocol minor version based on the contents of the packet body.
    /// This really only exists since certain authentication methods are supposed to be gated by minor version.
    fn required_minor_version(&self) -> Option<MinorVersion> {
        None
    }
}

/// Something that can be serialized into a binary format.
pub trait Serialize {
    /// Returns the current size of the object as represented on the wire.
    fn wire_size(&self) -> usize;

    /// Serializes data into a buffer, returning the resulting length on success.
    fn serialize_into_buffer(&self, buffer: &mut [u8]) -> Result<usize, SerializeError>;
}

/// Something that can be deserialized from a binary format.
pub trait Deserialize<'raw>: Sized {
    /// Attempts to deserialize an object from a buffer holding exactly its wire representation.
    fn deserialize_from_buffer(buffer: &'raw [u8]) -> Result<Self, DeserializeError>;
}

/// Reads a network-order `u16` length field from a two-byte slice.
fn read_length(buffer: &[u8]) -> Result<usize, DeserializeError> {
    let bytes: [u8; 2] = buffer.try_into()?;
    Ok(u16::from_be_bytes(bytes) as usize)
}
