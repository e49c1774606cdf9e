use bitflags::bitflags;
use byteorder::{ByteOrder, NetworkEndian};
use getset::{CopyGetters, Getters};
use num_enum::TryFromPrimitive;

use super::obfuscation::xor_pseudo_pad;
use super::{Deserialize, DeserializeError, PacketBody, Serialize, SerializeError};

#[cfg(test)]
mod tests;

/// The major version of the TACACS+ protocol.
#[repr(u8)]
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MajorVersion {
    /// The only current major version specified in RFC8907.
    RFC8907 = 0xc,
}

/// The minor version of the TACACS+ protocol in use, which specifies choices for authentication methods.
#[repr(u8)]
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive)]
pub enum MinorVersion {
    /// Default minor version, used for ASCII authentication and for authorization/accounting.
    Default = 0x0,

    /// Minor version 1, which is used for (MS)CHAP and PAP authentication.
    V1 = 0x1,
}

/// The full protocol version.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Version(MajorVersion, MinorVersion);

impl Version {
    /// Bundles together a TACACS+ protocol major and minor version.
    pub fn new(major: MajorVersion, minor: MinorVersion) -> Self {
        Self(major, minor)
    }

    /// Gets the major TACACS+ version.
    pub fn major(&self) -> MajorVersion {
        self.0
    }

    /// Gets the minor TACACS+ version.
    pub fn minor(&self) -> MinorVersion {
        self.1
    }
}

impl TryFrom<u8> for Version {
    type Error = DeserializeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        // only major version is 0xc currently
        if value >> 4 == MajorVersion::RFC8907 as u8 {
            let minor_version = MinorVersion::try_from(value & 0xf)
                .map_err(|_| DeserializeError::VersionMismatch)?;
            Ok(Self(MajorVersion::RFC8907, minor_version))
        } else {
            Err(DeserializeError::VersionMismatch)
        }
    }
}

impl From<Version> for u8 {
    fn from(value: Version) -> Self {
        ((value.0 as u8) << 4) | (value.1 as u8 & 0xf)
    }
}

bitflags! {
    /// Flags to indicate information about packets or the client/server.
    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    pub struct PacketFlags: u8 {
        /// Indicates the body of the packet is unobfuscated.
        const UNENCRYPTED       = 0b00000001;

        /// Signals to the server that the client would like to reuse a TCP connection across multiple sessions.
        const SINGLE_CONNECTION = 0b00000100;
    }
}

/// The type of a protocol packet.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive)]
pub enum PacketType {
    /// Authentication packet.
    Authentication = 0x1,

    /// Authorization packet.
    Authorization = 0x2,

    /// Accounting packet.
    Accounting = 0x3,
}

/// Information included in a TACACS+ packet header.
#[derive(PartialEq, Eq, Debug, Clone, Copy, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct HeaderInfo {
    /// The protocol version of the packet.
    version: Version,

    /// The sequence number of the packet. This should be odd for client packets, and even for server packets.
    sequence_number: u8,

    /// Session/packet flags.
    flags: PacketFlags,

    /// ID of the current session.
    session_id: u32,
}

impl HeaderInfo {
    /// Size of a full TACACS+ packet header.
    pub const HEADER_SIZE_BYTES: usize = 12;

    /// Bundles some information to be put in the header of a TACACS+ packet.
    pub fn new(version: Version, sequence_number: u8, flags: PacketFlags, session_id: u32) -> Self {
        Self {
            version,
            sequence_number,
            flags,
            session_id,
        }
    }

    /// Writes this header into a buffer, with the wire flags and body length filled in separately.
    fn serialize(
        &self,
        buffer: &mut [u8],
        packet_type: PacketType,
        flags: PacketFlags,
        body_length: u32,
    ) -> Result<usize, SerializeError> {
        if buffer.len() >= Self::HEADER_SIZE_BYTES {
            buffer[0] = self.version.into();
            buffer[1] = packet_type as u8;
            buffer[2] = self.sequence_number;
            buffer[3] = flags.bits();

            NetworkEndian::write_u32(&mut buffer[4..8], self.session_id);
            NetworkEndian::write_u32(&mut buffer[8..12], body_length);

            Ok(Self::HEADER_SIZE_BYTES)
        } else {
            Err(SerializeError::NotEnoughSpace)
        }
    }
}

impl TryFrom<&[u8]> for HeaderInfo {
    type Error = DeserializeError;

    fn try_from(buffer: &[u8]) -> Result<Self, Self::Error> {
        if buffer.len() < Self::HEADER_SIZE_BYTES {
            return Err(DeserializeError::UnexpectedEnd);
        }

        Ok(Self {
            version: buffer[0].try_into()?,
            sequence_number: buffer[2],
            flags: PacketFlags::from_bits(buffer[3]).ok_or(DeserializeError::InvalidWireBytes)?,
            session_id: NetworkEndian::read_u32(&buffer[4..8]),
        })
    }
}

/// A full TACACS+ protocol packet.
#[derive(PartialEq, Eq, Debug, Getters)]
pub struct Packet<B> {
    /// Some of the header information associated with a packet.
    #[getset(get = "pub")]
    header: HeaderInfo,

    /// The body of the packet.
    #[getset(get = "pub")]
    body: B,
}

impl<B: PacketBody> Packet<B> {
    /// Assembles a header and body into a packet, barring minor version incompatibility.
    pub fn new(header: HeaderInfo, body: B) -> Option<Self> {
        match body.required_minor_version() {
            Some(required_version) if header.version.minor() != required_version => None,
            _ => Some(Self { header, body }),
        }
    }

    /// Consumes this packet, returning its body.
    pub fn into_body(self) -> B {
        self.body
    }
}

impl<B: PacketBody + Serialize> Packet<B> {
    /// Returns the size of this packet on the wire, header included.
    pub fn wire_size(&self) -> usize {
        HeaderInfo::HEADER_SIZE_BYTES + self.body.wire_size()
    }

    fn serialize_with_flags(
        &self,
        buffer: &mut [u8],
        flags: PacketFlags,
    ) -> Result<usize, SerializeError> {
        if buffer.len() < self.wire_size() {
            return Err(SerializeError::NotEnoughSpace);
        }

        let body_length = self
            .body
            .serialize_into_buffer(&mut buffer[HeaderInfo::HEADER_SIZE_BYTES..])?;
        let wire_body_length =
            u32::try_from(body_length).map_err(|_| SerializeError::LengthOverflow)?;

        self.header
            .serialize(buffer, B::TYPE, flags, wire_body_length)?;

        Ok(HeaderInfo::HEADER_SIZE_BYTES + body_length)
    }

    /// Serializes a packet with its body obfuscated by `secret`, as specified in [RFC8907 section 4.5].
    ///
    /// The unencrypted flag is always cleared in the serialized header, regardless of the header information
    /// the packet was constructed with.
    ///
    /// [RFC8907 section 4.5]: https://www.rfc-editor.org/rfc/rfc8907.html#name-data-obfuscation
    pub fn serialize<K: AsRef<[u8]>>(
        &self,
        secret: K,
        buffer: &mut [u8],
    ) -> Result<usize, SerializeError> {
        let flags = self.header.flags.difference(PacketFlags::UNENCRYPTED);
        let packet_length = self.serialize_with_flags(buffer, flags)?;

        xor_pseudo_pad(
            &self.header,
            secret.as_ref(),
            &mut buffer[HeaderInfo::HEADER_SIZE_BYTES..packet_length],
        );

        Ok(packet_length)
    }

    /// Serializes a packet without obfuscating its body, setting the unencrypted flag in the process.
    ///
    /// Per [RFC8907 section 4.5], this MUST NOT be used in production.
    ///
    /// [RFC8907 section 4.5]: https://www.rfc-editor.org/rfc/rfc8907.html#section-4.5-16
    pub fn serialize_unobfuscated(&self, buffer: &mut [u8]) -> Result<usize, SerializeError> {
        let flags = self.header.flags.union(PacketFlags::UNENCRYPTED);
        self.serialize_with_flags(buffer, flags)
    }
}

impl<'raw, B: PacketBody + Deserialize<'raw>> Packet<B> {
    /// Checks the header of a raw packet against the expected body type, returning it along with the body length.
    fn check_header(buffer: &[u8]) -> Result<(HeaderInfo, usize), DeserializeError> {
        let header = HeaderInfo::try_from(buffer)?;

        let actual_type = buffer[1];
        match PacketType::try_from(actual_type) {
            Ok(packet_type) if packet_type == B::TYPE => {}
            _ => {
                return Err(DeserializeError::PacketTypeMismatch {
                    expected: B::TYPE,
                    actual: actual_type,
                })
            }
        }

        let body_length = NetworkEndian::read_u32(&buffer[8..12]) as usize;
        if buffer.len() - HeaderInfo::HEADER_SIZE_BYTES < body_length {
            return Err(DeserializeError::UnexpectedEnd);
        }

        Ok((header, body_length))
    }

    fn from_parts(header: HeaderInfo, body: &'raw [u8]) -> Result<Self, DeserializeError> {
        let body = B::deserialize_from_buffer(body)?;
        Self::new(header, body).ok_or(DeserializeError::VersionMismatch)
    }

    /// Deserializes an obfuscated packet, unobfuscating its body in place with `secret`.
    pub fn deserialize<K: AsRef<[u8]>>(
        secret: K,
        buffer: &'raw mut [u8],
    ) -> Result<Self, DeserializeError> {
        let (header, body_length) = Self::check_header(buffer)?;

        if header.flags.contains(PacketFlags::UNENCRYPTED) {
            return Err(DeserializeError::IncorrectUnencryptedFlag);
        }

        let body: &'raw mut [u8] = &mut buffer
            [HeaderInfo::HEADER_SIZE_BYTES..HeaderInfo::HEADER_SIZE_BYTES + body_length];
        xor_pseudo_pad(&header, secret.as_ref(), body);

        Self::from_parts(header, body)
    }

    /// Deserializes a packet whose body was sent without obfuscation.
    pub fn deserialize_unobfuscated(buffer: &'raw [u8]) -> Result<Self, DeserializeError> {
        let (header, body_length) = Self::check_header(buffer)?;

        if !header.flags.contains(PacketFlags::UNENCRYPTED) {
            return Err(DeserializeError::IncorrectUnencryptedFlag);
        }

        Self::from_parts(
            header,
            &buffer[HeaderInfo::HEADER_SIZE_BYTES..HeaderInfo::HEADER_SIZE_BYTES + body_length],
        )
    }
}
