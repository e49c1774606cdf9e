//! Authorization features/packets of the TACACS+ protocol.

use byteorder::{ByteOrder, NetworkEndian};
use num_enum::TryFromPrimitive;

use super::{
    read_length, Arguments, AuthenticationContext, AuthenticationMethod, Deserialize,
    DeserializeError, FieldText, PacketBody, PacketType, Serialize, SerializeError,
    UserInformation,
};


/// An authorization request packet body, including arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request<'packet> {
    /// Method used to authenticate to TACACS+ client.
    pub method: AuthenticationMethod,

    /// Other client authentication information.
    pub authentication_context: AuthenticationContext,

    /// Information about the user connected to the TACACS+ client.
    pub user_information: UserInformation<'packet>,

    /// Additional arguments to provide as part of an authorization request.
    pub arguments: Arguments<'packet>,
}

impl PacketBody for Request<'_> {
    const TYPE: PacketType = PacketType::Authorization;

    // method, authentication context, user information lengths & argument count
    const REQUIRED_FIELDS_LENGTH: usize = AuthenticationMethod::WIRE_SIZE
        + AuthenticationContext::WIRE_SIZE
        + UserInformation::HEADER_INFORMATION_SIZE
        + 1;
}

impl Serialize for Request<'_> {
    fn wire_size(&self) -> usize {
        AuthenticationMethod::WIRE_SIZE
            + AuthenticationContext::WIRE_SIZE
            + self.user_information.wire_size()
            + self.arguments.wire_size()
    }

    fn serialize_into_buffer(&self, buffer: &mut [u8]) -> Result<usize, SerializeError> {
        let wire_size = self.wire_size();
        if buffer.len() < wire_size {
            return Err(SerializeError::NotEnoughSpace);
        }

        buffer[0] = self.method as u8;
        self.authentication_context.serialize(&mut buffer[1..4]);
        self.user_information.serialize_header(&mut buffer[4..7]);

        // argument count & lengths start right after user information lengths
        let argument_header_len = self
            .arguments
            .serialize_count_and_lengths(&mut buffer[7..])?;
        let body_start = 7 + argument_header_len;

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

        let method = AuthenticationMethod::try_from(buffer[0])?;
        let authentication_context = AuthenticationContext::deserialize(&buffer[1..4])?;

        let argument_count = buffer[7] as usize;
        let body_start = Self::REQUIRED_FIELDS_LENGTH + argument_count;
        let argument_lengths = buffer
            .get(Self::REQUIRED_FIELDS_LENGTH..body_start)
            .ok_or(DeserializeError::UnexpectedEnd)?;

        let (user_information, user_information_len) =
            UserInformation::deserialize(&buffer[4..7], &buffer[body_start..])?;
        let (arguments, _) = Arguments::deserialize(
            argument_lengths,
            &buffer[body_start + user_information_len..],
        )?;

        Ok(Self {
            method,
            authentication_context,
            user_information,
            arguments,
        })
    }
}

/// The status of an authorization operation, as returned by the server.
#[repr(u8)]
#[derive(PartialEq, Eq, Debug, Clone, Copy, TryFromPrimitive)]
pub enum Status {
    /// Authorization passed; server may have additional arguments for the client.
    PassAdd = 0x01,

    /// Authorization passed; server provides argument values to override those provided in the request.
    PassReplace = 0x02,

    /// Authorization request was denied.
    Fail = 0x10,

    /// An error occurred on the server.
    Error = 0x11,

    /// Forward authorization request to an alternative daemon. Deprecated in RFC8907.
    Follow = 0x21,
}

/// Contents of an authorization reply packet from a TACACS+ server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply<'packet> {
    /// The status returned by the TACACS+ server.
    pub status: Status,

    /// The message to present to the user connected to this client.
    pub server_message: FieldText<'packet>,

    /// Administrative/console log data.
    pub data: &'packet [u8],

    /// Arguments sent by the server.
    pub arguments: Arguments<'packet>,
}

impl PacketBody for Reply<'_> {
    const TYPE: PacketType = PacketType::Authorization;

    // status, argument count, server message length, data length
    const REQUIRED_FIELDS_LENGTH: usize = 6;
}

impl Serialize for Reply<'_> {
    fn wire_size(&self) -> usize {
        // argument count is part of the required fields
        Self::REQUIRED_FIELDS_LENGTH - 1
            + self.server_message.len()
            + self.data.len()
            + self.arguments.wire_size()
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
        NetworkEndian::write_u16(&mut buffer[2..4], server_message_len);
        NetworkEndian::write_u16(&mut buffer[4..6], data_len);

        // argument count lives at index 1, but lengths come after the other length fields
        buffer[1] = self.arguments.argument_count();
        let lengths_end = Self::REQUIRED_FIELDS_LENGTH
            + self
                .arguments
                .serialize_lengths(&mut buffer[Self::REQUIRED_FIELDS_LENGTH..])?;

        let data_start = lengths_end + self.server_message.len();
        buffer[lengths_end..data_start].copy_from_slice(self.server_message.as_bytes());

        let arguments_start = data_start + self.data.len();
        buffer[data_start..arguments_start].copy_from_slice(self.data);

        let arguments_len = self
            .arguments
            .serialize_encoded_values(&mut buffer[arguments_start..])?;

        Ok(arguments_start + arguments_len)
    }
}

impl<'raw> Deserialize<'raw> for Reply<'raw> {
    fn deserialize_from_buffer(buffer: &'raw [u8]) -> Result<Self, DeserializeError> {
        if buffer.len() < Self::REQUIRED_FIELDS_LENGTH {
            return Err(DeserializeError::UnexpectedEnd);
        }

        let status =
            Status::try_from(buffer[0]).map_err(|error| DeserializeError::InvalidStatus(error.number))?;
        let argument_count = buffer[1] as usize;
        let server_message_len = read_length(&buffer[2..4])?;
        let data_len = read_length(&buffer[4..6])?;

        let lengths_end = Self::REQUIRED_FIELDS_LENGTH + argument_count;
        let data_start = lengths_end + server_message_len;
        let arguments_start = data_start + data_len;

        if buffer.len() < arguments_start {
            return Err(DeserializeError::UnexpectedEnd);
        }

        let server_message = FieldText::from_bytes(&buffer[lengths_end..data_start])
            .map_err(|_| DeserializeError::InvalidWireBytes)?;
        let (arguments, _) = Arguments::deserialize(
            &buffer[Self::REQUIRED_FIELDS_LENGTH..lengths_end],
            &buffer[arguments_start..],
        )?;

        Ok(Self {
            status,
            server_message,
            data: &buffer[data_start..arguments_start],
            arguments,
        })
    }
}
