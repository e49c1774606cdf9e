//! Accounting protocol packet (de)serialization.

use bitflags::bitflags;
use byteorder::{ByteOrder, NetworkEndian};
use num_enum::TryFromPrimitive;

use super::{
    read_length, Arguments, AuthenticationContext, AuthenticationMethod, Deserialize,
    DeserializeError, FieldText, PacketBody, PacketType, Serialize, SerializeError,
    UserInformation,
};


bitflags! {
    /// Raw bitflags for accounting request packet.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct RawFlags: u8 {
        const START    = 0b00000010;
        const STOP     = 0b00000100;
        const WATCHDOG = 0b00001000;
    }
}

/// Valid flags for an accounting request packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flags {
    /// Start of a task.
    StartRecord,

    /// Task complete.
    StopRecord,

    /// Indication that task is still running, with no extra arguments.
    WatchdogNoUpdate,

    /// Update on long-running task, including updated/new argument values.
    WatchdogUpdate,
}

impl From<Flags> for RawFlags {
    fn from(value: Flags) -> Self {
        match value {
            Flags::StartRecord => RawFlags::START,
            Flags::StopRecord => RawFlags::STOP,
            Flags::WatchdogNoUpdate => RawFlags::WATCHDOG,
            Flags::WatchdogUpdate => RawFlags::WATCHDOG | RawFlags::START,
        }
    }
}

impl TryFrom<u8> for Flags {
    type Error = DeserializeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let raw = RawFlags::from_bits(value).ok_or(DeserializeError::InvalidWireBytes)?;

        if raw == RawFlags::START {
            Ok(Self::StartRecord)
        } else if raw == RawFlags::STOP {
            Ok(Self::StopRecord)
        } else if raw == RawFlags::WATCHDOG {
            Ok(Self::WatchdogNoUpdate)
        } else if raw == RawFlags::WATCHDOG | RawFlags::START {
            Ok(Self::WatchdogUpdate)
        } else {
            Err(DeserializeError::InvalidWireBytes)
        }
    }
}

impl Flags {
    /// The number of bytes occupied by a flag set on the wire.
    pub const WIRE_SIZE: usize = 1;
}

/// An accounting request packet, used to start, stop, or provide progress on a running job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request<'packet> {
    /// Flags to indicate what kind of accounting record this packet includes.
    pub flags: Flags,

    /// Method used to authenticate to TACACS+ client.
    pub authentication_method: AuthenticationMethod,

    /// Other information about authentication to TACACS+ client.
    pub authentication: AuthenticationContext,

    /// Information about the user connected to the client.
    pub user_information: UserInformation<'packet>,

    /// Arguments to provide additional information to the server.
    pub arguments: Arguments<'packet>,
}

impl PacketBody for Request<'_> {
    const TYPE: PacketType = PacketType::Accounting;

    // flags, method, authentication context, user information lengths & argument count
    const REQUIRED_FIELDS_LENGTH: usize = Flags::WIRE_SIZE
        + AuthenticationMethod::WIRE_SIZE
        + AuthenticationContext::WIRE_SIZE
        + UserInformation::HEADER_INFORMATION_SIZE
        + 1;
}

impl Serialize for Request<'_> {
    fn wire_size(&self) -> usize {
        Flags::WIRE_SIZE
            + AuthenticationMethod::WIRE_SIZE
            + AuthenticationContext::WIRE_SIZE
            + self.user_information.wire_size()
            + self.arguments.wire_size()
    }

    fn serialize_into_buffer(&self, buffer: &mut [u8]) -> Result<usize, SerializeError> {
        let wire_size = self.wire_size();
        if buffer.len() < wire_size {
            return Err(SerializeError::NotEnoughSpace);
        }

        buffer[0] = RawFlags::from(self.flags).bits();
        buffer[1] = self.authentication_method as u8;
        self.authentication.serialize(&mut buffer[2..5]);
        self.user_information.serialize_header(&mut buffer[5..8]);

        let argument_header_len = self
            .arguments
            .serialize_count_and_lengths(&mut buffer[8..])?;
        let body_start = 8 + argument_header_len;

        let user_information_len = self
            .user_information
            .serialize_body(&mut buffer[body_start..])?;
        let arguments_start = body_start + user_information_len;

        let arguments_len = self
            .arguments
            .serialize_encoded_values(&mut buffer[arguments_start..])?;

        Ok(arguments_start + arguments_len)
    }
}

impl<'raw> Deserialize<'raw> for Request<'raw> {
    fn deserialize_from_buffer(buffer: &'raw [u8]) -> Result<Self, DeserializeError> {
        if buffer.len() < Self::REQUIRED_FIELDS_LENGTH {
            return Err(DeserializeError::UnexpectedEnd);
        }

        let flags = Flags::try_from(buffer[0])?;
        let authentication_method = AuthenticationMethod::try_from(buffer[1])?;
        let authentication = AuthenticationContext::deserialize(&buffer[2..5])?;

        let argument_count = buffer[8] as usize;
        let body_start = Self::REQUIRED_FIELDS_LENGTH + argument_count;
        let argument_lengths = buffer
            .get(Self::REQUIRED_FIELDS_LENGTH..body_start)
            .ok_or(DeserializeError::UnexpectedEnd)?;

        let (user_information, user_information_len) =
            UserInformation::deserialize(&buffer[5..8], &buffer[body_start..])?;
        let (arguments, _) = Arguments::deserialize(
            argument_lengths,
            &buffer[body_start + user_information_len..],
        )?;

        Ok(Self {
            flags,
            authentication_method,
            authentication,
            user_information,
            arguments,
        })
    }
}

/// The server's reply status in an accounting session.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
pub enum Status {
    /// Task logging succeeded.
    Success = 0x01,

    /// Something went wrong when logging the task.
    Error = 0x02,

    /// Forward accounting request to an alternative daemon. Deprecated in RFC8907.
    Follow = 0x21,
}

/// An accounting reply packet received from a TACACS+ server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply<'packet> {
    /// The status returned by the server.
    pub status: Status,

    /// The message to display to the user.
    pub server_message: FieldText<'packet>,

    /// The console/administrative message from the server.
    pub data: &'packet [u8],
}

impl PacketBody for Reply<'_> {
    const TYPE: PacketType = PacketType::Accounting;

    // server message length, data length, status
    const REQUIRED_FIELDS_LENGTH: usize = 5;
}

impl Serialize for Reply<'_> {
    fn wire_size(&self) -> usize {
        Self::REQUIRED_FIELDS_LENGTH + self.server_message.len() + self.data.len()
    }

    fn serialize_into_buffer(&self, buffer: &mut [u8]) -> Result<usize, SerializeError> {
        let wire_size = self.wire_size();
        if buffer.len() < wire_size {
            return Err(SerializeError::NotEnoughSpace);
        }

        let server_message_len =
            u16::try_from(self.server_message.len()).map_err(|_| SerializeError::LengthOverflow)?;
        let data_len = u16::try_from(self.data.len()).map_err(|_| SerializeError::LengthOverflow)?;

        NetworkEndian::write_u16(&mut buffer[..2], server_message_len);
        NetworkEndian::write_u16(&mut buffer[2..4], data_len);
        buffer[4] = self.status as u8;

        let data_start = Self::REQUIRED_FIELDS_LENGTH + self.server_message.len();
        buffer[Self::REQUIRED_FIELDS_LENGTH..data_start]
            .copy_from_slice(self.server_message.as_bytes());
        buffer[data_start..wire_size].copy_from_slice(self.data);

        Ok(wire_size)
    }
}

impl<'raw> Deserialize<'raw> for Reply<'raw> {
    fn deserialize_from_buffer(buffer: &'raw [u8]) -> Result<Self, DeserializeError> {
        if buffer.len() < Self::REQUIRED_FIELDS_LENGTH {
            return Err(DeserializeError::UnexpectedEnd);
        }

        let server_message_len = read_length(&buffer[..2])?;
        let data_len = read_length(&buffer[2..4])?;
        let status =
            Status::try_from(buffer[4]).map_err(|error| DeserializeError::InvalidStatus(error.number))?;

        let data_start = Self::REQUIRED_FIELDS_LENGTH + server_message_len;
        let data_end = data_start + data_len;
        if buffer.len() < data_end {
            return Err(DeserializeError::UnexpectedEnd);
        }

        Ok(Self {
            status,
            server_message: FieldText::from_bytes(&buffer[Self::REQUIRED_FIELDS_LENGTH..data_start])
                .map_err(|_| DeserializeError::InvalidWireBytes)?,
            data: &buffer[data_start..data_end],
        })
    }
}
