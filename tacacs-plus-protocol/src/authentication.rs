//! Authentication-related protocol packets.

use bitflags::bitflags;
use byteorder::{ByteOrder, NetworkEndian};
use getset::{CopyGetters, Getters};
use num_enum::TryFromPrimitive;

use super::{
    read_length, AuthenticationContext, AuthenticationType, Deserialize, DeserializeError,
    FieldText, MinorVersion, PacketBody, PacketType, Serialize, SerializeError, UserInformation,
};


/// The authentication action, as indicated upon initiation of an authentication session.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive)]
pub enum Action {
    /// Login request.
    Login = 0x01,

    /// Password change request.
    ChangePassword = 0x02,

    /// Outbound authentication request.
    SendAuth = 0x04,
}

impl Action {
    /// The number of bytes an `Action` occupies on the wire.
    pub const WIRE_SIZE: usize = 1;
}

/// The authentication status, as returned by a TACACS+ server.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
pub enum Status {
    /// Authentication succeeded.
    Pass = 0x01,

    /// Authentication failed.
    Fail = 0x02,

    /// Request for more domain-specific data.
    GetData = 0x03,

    /// Request for username.
    GetUser = 0x04,

    /// Request for password.
    GetPassword = 0x05,

    /// Restart session, discarding current one.
    Restart = 0x06,

    /// Server-side error while authenticating.
    Error = 0x07,

    /// Forward authentication request to an alternative daemon. Deprecated in RFC8907.
    Follow = 0x21,
}

/// Reasons an authentication start packet could not be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadStart {
    /// The data field was longer than 255 bytes.
    DataTooLong,

    /// The authentication type was [`AuthenticationType::NotSet`], which is only valid for authorization/accounting.
    AuthTypeNotSet,
}

/// An authentication start packet, used to initiate an authentication session.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct Start<'packet> {
    /// The action requested of the server.
    #[getset(get_copy = "pub")]
    action: Action,

    /// Privilege level, type and service of the authentication.
    #[getset(get_copy = "pub")]
    authentication: AuthenticationContext,

    /// Information about the user being authenticated.
    #[getset(get = "pub")]
    user_information: UserInformation<'packet>,

    /// Type-specific data, such as the password in PAP.
    #[getset(get_copy = "pub")]
    data: Option<&'packet [u8]>,
}

impl<'packet> Start<'packet> {
    /// Initializes a new start packet with the provided fields.
    pub fn new(
        action: Action,
        authentication: AuthenticationContext,
        user_information: UserInformation<'packet>,
        data: Option<&'packet [u8]>,
    ) -> Result<Self, BadStart> {
        if authentication.authentication_type == AuthenticationType::NotSet {
            Err(BadStart::AuthTypeNotSet)
        } else if data.is_some_and(|slice| u8::try_from(slice.len()).is_err()) {
            Err(BadStart::DataTooLong)
        } else {
            Ok(Self {
                action,
                authentication,
                user_information,
                data,
            })
        }
    }
}

impl PacketBody for Start<'_> {
    const TYPE: PacketType = PacketType::Authentication;

    // action, authentication context, user information lengths & data length
    const REQUIRED_FIELDS_LENGTH: usize =
        Action::WIRE_SIZE + AuthenticationContext::WIRE_SIZE + UserInformation::HEADER_INFORMATION_SIZE + 1;

    fn required_minor_version(&self) -> Option<MinorVersion> {
        self.authentication
            .authentication_type
            .required_minor_version()
    }
}

impl Serialize for Start<'_> {
    fn wire_size(&self) -> usize {
        Action::WIRE_SIZE
            + AuthenticationContext::WIRE_SIZE
            + self.user_information.wire_size()
            + 1 // extra byte to include length of data
            + self.data.map_or(0, <[u8]>::len)
    }

    fn serialize_into_buffer(&self, buffer: &mut [u8]) -> Result<usize, SerializeError> {
        let wire_size = self.wire_size();
        if buffer.len() < wire_size {
            return Err(SerializeError::NotEnoughSpace);
        }

        buffer[0] = self.action as u8;
        self.authentication.serialize(&mut buffer[1..4]);
        self.user_information.serialize_header(&mut buffer[4..7]);

        let user_information_len = self
            .user_information
            .serialize_body(&mut buffer[Self::REQUIRED_FIELDS_LENGTH..])?;

        let data = self.data.unwrap_or_default();
        let data_start = Self::REQUIRED_FIELDS_LENGTH + user_information_len;

        // length is verified in new(), so this cast won't truncate
        buffer[7] = data.len() as u8;
        buffer[data_start..data_start + data.len()].copy_from_slice(data);

        Ok(wire_size)
    }
}

impl<'raw> Deserialize<'raw> for Start<'raw> {
    fn deserialize_from_buffer(buffer: &'raw [u8]) -> Result<Self, DeserializeError> {
        if buffer.len() < Self::REQUIRED_FIELDS_LENGTH {
            return Err(DeserializeError::UnexpectedEnd);
        }

        let action = Action::try_from(buffer[0])?;
        let authentication = AuthenticationContext::deserialize(&buffer[1..4])?;
        let (user_information, user_information_len) = UserInformation::deserialize(
            &buffer[4..7],
            &buffer[Self::REQUIRED_FIELDS_LENGTH..],
        )?;

        let data_start = Self::REQUIRED_FIELDS_LENGTH + user_information_len;
        let data_end = data_start + buffer[7] as usize;
        let data = buffer
            .get(data_start..data_end)
            .ok_or(DeserializeError::UnexpectedEnd)?;

        Self::new(
            action,
            authentication,
            user_information,
            (!data.is_empty()).then_some(data),
        )
        .map_err(|_| DeserializeError::InvalidWireBytes)
    }
}

bitflags! {
    /// Flags received in an authentication reply packet.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ReplyFlags: u8 {
        /// Indicates the client MUST NOT display user input.
        const NO_ECHO = 0b00000001;
    }
}

/// An authentication reply packet received from a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply<'packet> {
    /// Status of the server reply.
    pub status: Status,

    /// Message received from the server, potentially to display to the user.
    pub server_message: FieldText<'packet>,

    /// Domain-specific data received from the server.
    pub data: &'packet [u8],

    /// Flags received from the server.
    pub flags: ReplyFlags,
}

impl Reply<'_> {
    /// Attempts to extract the claimed reply packet body length from a buffer.
    pub fn claimed_length(buffer: &[u8]) -> Option<usize> {
        if buffer.len() >= Self::REQUIRED_FIELDS_LENGTH {
            let server_message_length = read_length(&buffer[2..4]).ok()?;
            let data_length = read_length(&buffer[4..6]).ok()?;
            Some(Self::REQUIRED_FIELDS_LENGTH + server_message_length + data_length)
        } else {
            None
        }
    }
}

impl PacketBody for Reply<'_> {
    const TYPE: PacketType = PacketType::Authentication;

    // status, flags, server message length, data length
    const REQUIRED_FIELDS_LENGTH: usize = 6;
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

        buffer[0] = self.status as u8;
        buffer[1] = self.flags.bits();
        NetworkEndian::write_u16(&mut buffer[2..4], server_message_len);
        NetworkEndian::write_u16(&mut buffer[4..6], data_len);

        let data_start = Self::REQUIRED_FIELDS_LENGTH + self.server_message.len();
        buffer[Self::REQUIRED_FIELDS_LENGTH..data_start]
            .copy_from_slice(self.server_message.as_bytes());
        buffer[data_start..wire_size].copy_from_slice(self.data);

        Ok(wire_size)
    }
}

impl<'raw> Deserialize<'raw> for Reply<'raw> {
    fn deserialize_from_buffer(buffer: &'raw [u8]) -> Result<Self, DeserializeError> {
        let claimed_length = Self::claimed_length(buffer).ok_or(DeserializeError::UnexpectedEnd)?;
        if buffer.len() < claimed_length {
            return Err(DeserializeError::UnexpectedEnd);
        }

        let status =
            Status::try_from(buffer[0]).map_err(|error| DeserializeError::InvalidStatus(error.number))?;
        let flags = ReplyFlags::from_bits(buffer[1]).ok_or(DeserializeError::InvalidWireBytes)?;

        let server_message_length = read_length(&buffer[2..4])?;
        let body_begin = Self::REQUIRED_FIELDS_LENGTH;
        let data_begin = body_begin + server_message_length;

        Ok(Reply {
            status,
            server_message: FieldText::from_bytes(&buffer[body_begin..data_begin])
                .map_err(|_| DeserializeError::InvalidWireBytes)?,
            data: &buffer[data_begin..claimed_length],
            flags,
        })
    }
}

bitflags! {
    /// Flags sent by a client in an authentication continue packet.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ContinueFlags: u8 {
        /// Indicates the client is prematurely aborting the authentication session.
        const ABORT = 0b00000001;
    }
}

/// A continue packet potentially sent as part of an authentication session.
#[derive(Debug, Clone, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Continue<'packet> {
    /// The message typed by the user in response to a server prompt.
    user_message: Option<&'packet [u8]>,

    /// Domain-specific data.
    data: Option<&'packet [u8]>,

    /// Flags sent with the packet.
    flags: ContinueFlags,
}

impl<'packet> Continue<'packet> {
    /// Constructs a continue packet, checking that the user message and data fields have encodable lengths.
    pub fn new(
        user_message: Option<&'packet [u8]>,
        data: Option<&'packet [u8]>,
        flags: ContinueFlags,
    ) -> Option<Self> {
        if user_message.map_or(true, |message| u16::try_from(message.len()).is_ok())
            && data.map_or(true, |data_slice| u16::try_from(data_slice.len()).is_ok())
        {
            Some(Continue {
                user_message,
                data,
                flags,
            })
        } else {
            None
        }
    }
}

impl PacketBody for Continue<'_> {
    const TYPE: PacketType = PacketType::Authentication;

    // user message length, data length, flags
    const REQUIRED_FIELDS_LENGTH: usize = 5;
}

impl Serialize for Continue<'_> {
    fn wire_size(&self) -> usize {
        Self::REQUIRED_FIELDS_LENGTH
            + self.user_message.map_or(0, <[u8]>::len)
            + self.data.map_or(0, <[u8]>::len)
    }

    fn serialize_into_buffer(&self, buffer: &mut [u8]) -> Result<usize, SerializeError> {
        let wire_size = self.wire_size();
        if buffer.len() < wire_size {
            return Err(SerializeError::NotEnoughSpace);
        }

        let user_message = self.user_message.unwrap_or_default();
        let data = self.data.unwrap_or_default();

        // lengths are checked in new()
        NetworkEndian::write_u16(&mut buffer[..2], user_message.len() as u16);
        NetworkEndian::write_u16(&mut buffer[2..4], data.len() as u16);
        buffer[4] = self.flags.bits();

        let data_start = Self::REQUIRED_FIELDS_LENGTH + user_message.len();
        buffer[Self::REQUIRED_FIELDS_LENGTH..data_start].copy_from_slice(user_message);
        buffer[data_start..wire_size].copy_from_slice(data);

        Ok(wire_size)
    }
}

impl<'raw> Deserialize<'raw> for Continue<'raw> {
    fn deserialize_from_buffer(buffer: &'raw [u8]) -> Result<Self, DeserializeError> {
        if buffer.len() < Self::REQUIRED_FIELDS_LENGTH {
            return Err(DeserializeError::UnexpectedEnd);
        }

        let user_message_len = read_length(&buffer[..2])?;
        let data_len = read_length(&buffer[2..4])?;
        let flags = ContinueFlags::from_bits(buffer[4]).ok_or(DeserializeError::InvalidWireBytes)?;

        let data_start = Self::REQUIRED_FIELDS_LENGTH + user_message_len;
        let data_end = data_start + data_len;
        if buffer.len() < data_end {
            return Err(DeserializeError::UnexpectedEnd);
        }

        let user_message = &buffer[Self::REQUIRED_FIELDS_LENGTH..data_start];
        let data = &buffer[data_start..data_end];

        Ok(Self {
            user_message: (!user_message.is_empty()).then_some(user_message),
            data: (!data.is_empty()).then_some(data),
            flags,
        })
    }
}
