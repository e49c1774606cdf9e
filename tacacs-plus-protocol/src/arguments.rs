use std::fmt;
use std::ops::Deref;

use getset::{CopyGetters, Getters};

use super::{DeserializeError, FieldText, SerializeError};


/// An argument in the TACACS+ protocol, which exchanges information about sessions between clients and servers.
#[derive(Clone, Default, PartialEq, Eq, Debug, Getters, CopyGetters)]
pub struct Argument<'data> {
    /// The name of the argument.
    #[getset(get = "pub")]
    name: FieldText<'data>,

    /// The value of the argument.
    #[getset(get = "pub")]
    value: FieldText<'data>,

    /// Whether processing this argument is mandatory.
    #[getset(get_copy = "pub")]
    required: bool,
}

/// Error to determine why [`Argument::new()`] failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidArgument {
    /// Argument had empty name.
    EmptyName,

    /// Argument name contained a delimiter (= or *).
    NameContainsDelimiter,

    /// Argument's encoded length was too large to fit in a single byte.
    TooLong,
}

impl fmt::Display for InvalidArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "arguments cannot have empty names"),
            Self::NameContainsDelimiter => write!(
                f,
                "names cannot contain value delimiter characters (= or *)"
            ),
            Self::TooLong => write!(
                f,
                "the total length of an argument (name + length + delimiter) must not exceed 255 bytes"
            ),
        }
    }
}

impl std::error::Error for InvalidArgument {}

impl<'data> Argument<'data> {
    /// The delimiter used for a required argument.
    const REQUIRED_DELIMITER: char = '=';

    /// The delimiter used for an optional argument.
    const OPTIONAL_DELIMITER: char = '*';

    /// Constructs an argument, enforcing a maximum combined name + value + delimiter length of `u8::MAX` (as it must fit in a single byte).
    pub fn new(
        name: FieldText<'data>,
        value: FieldText<'data>,
        required: bool,
    ) -> Result<Self, InvalidArgument> {
        // NOTE: since both name/value are FieldText, they are already guaranteed to be printable ASCII

        if name.is_empty() {
            Err(InvalidArgument::EmptyName)
        } else if name.contains([Self::REQUIRED_DELIMITER, Self::OPTIONAL_DELIMITER]) {
            // "An argument name MUST NOT contain either of the separators." [RFC 8907]
            Err(InvalidArgument::NameContainsDelimiter)
        } else if name.len() + 1 + value.len() > u8::MAX as usize {
            // length of argument (including delimiter) must also fit in a u8 to be encodeable
            Err(InvalidArgument::TooLong)
        } else {
            Ok(Argument {
                name,
                value,
                required,
            })
        }
    }

    /// Converts this argument into one that owns its name and value.
    pub fn into_owned<'out>(self) -> Argument<'out> {
        Argument {
            name: self.name.into_owned(),
            value: self.value.into_owned(),
            required: self.required,
        }
    }

    /// The encoded length of an argument, including the name/value/delimiter but not the byte holding its length earlier on in a packet.
    fn encoded_length(&self) -> usize {
        // length includes delimiter
        self.name.len() + 1 + self.value.len()
    }

    /// Serializes an argument's name-value encoding, as done in the body of a packet.
    fn serialize(&self, buffer: &mut [u8]) -> Result<usize, SerializeError> {
        let name_len = self.name.len();
        let value_len = self.value.len();
        let total_len = self.encoded_length();

        if buffer.len() < total_len {
            return Err(SerializeError::NotEnoughSpace);
        }

        buffer[..name_len].copy_from_slice(self.name.as_bytes());

        buffer[name_len] = if self.required {
            Self::REQUIRED_DELIMITER
        } else {
            Self::OPTIONAL_DELIMITER
        } as u8;

        buffer[name_len + 1..total_len].copy_from_slice(self.value.as_bytes());

        Ok(total_len)
    }

    /// Attempts to deserialize an argument from its name-value encoding on the wire.
    pub(crate) fn deserialize(buffer: &'data [u8]) -> Result<Self, DeserializeError> {
        // the first delimiter that appears is the actual delimiter, as names MUST NOT (RFC 8907) contain either
        let delimiter_index = buffer
            .iter()
            .position(|&c| c == Self::REQUIRED_DELIMITER as u8 || c == Self::OPTIONAL_DELIMITER as u8)
            .ok_or(DeserializeError::InvalidWireBytes)?;

        let required = buffer[delimiter_index] == Self::REQUIRED_DELIMITER as u8;

        let name = FieldText::from_bytes(&buffer[..delimiter_index])
            .map_err(|_| DeserializeError::InvalidWireBytes)?;
        let value = FieldText::from_bytes(&buffer[delimiter_index + 1..])
            .map_err(|_| DeserializeError::InvalidWireBytes)?;

        Self::new(name, value, required).map_err(|_| DeserializeError::InvalidWireBytes)
    }
}

impl fmt::Display for Argument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let delimiter = if self.required {
            Self::REQUIRED_DELIMITER
        } else {
            Self::OPTIONAL_DELIMITER
        };
        write!(f, "{}{}{}", self.name, delimiter, self.value)
    }
}

/// A set of arguments known to be of valid length for use in a TACACS+ packet.
///
/// Duplicate arguments are passed through as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments<'args>(Vec<Argument<'args>>);

impl<'args> Arguments<'args> {
    /// Constructs a new `Arguments`, returning `None` if there are more than `u8::MAX` arguments.
    pub fn new(arguments: Vec<Argument<'args>>) -> Option<Self> {
        if arguments.len() <= u8::MAX as usize {
            Some(Self(arguments))
        } else {
            None
        }
    }

    /// Returns the number of arguments an `Arguments` object contains.
    pub fn argument_count(&self) -> u8 {
        // length is guaranteed to fit in a u8 by construction
        self.0.len() as u8
    }

    /// Returns the size of the argument count and lengths in a packet "header".
    pub fn wire_size_header(&self) -> usize {
        1 + self.0.len()
    }

    /// Returns the combined size of the encoded name-value pairs.
    pub fn wire_size_values(&self) -> usize {
        self.0.iter().map(Argument::encoded_length).sum()
    }

    /// Returns the total size the arguments occupy in a packet body, count and lengths included.
    pub fn wire_size(&self) -> usize {
        self.wire_size_header() + self.wire_size_values()
    }

    /// Serializes the argument count and lengths, as stored in the "header" of a packet body.
    pub(crate) fn serialize_count_and_lengths(
        &self,
        buffer: &mut [u8],
    ) -> Result<usize, SerializeError> {
        let header_len = self.wire_size_header();

        if buffer.len() < header_len {
            return Err(SerializeError::NotEnoughSpace);
        }

        buffer[0] = self.argument_count();
        self.serialize_lengths(&mut buffer[1..])?;

        Ok(header_len)
    }

    /// Serializes just the argument lengths, for packets that separate them from the argument count.
    pub(crate) fn serialize_lengths(&self, buffer: &mut [u8]) -> Result<usize, SerializeError> {
        if buffer.len() < self.0.len() {
            return Err(SerializeError::NotEnoughSpace);
        }

        for (length_byte, argument) in buffer.iter_mut().zip(self.0.iter()) {
            // length is guaranteed to fit in a u8 by Argument::new()
            *length_byte = argument.encoded_length() as u8;
        }

        Ok(self.0.len())
    }

    /// Serializes the name-value encodings of the stored arguments to a buffer.
    pub(crate) fn serialize_encoded_values(
        &self,
        buffer: &mut [u8],
    ) -> Result<usize, SerializeError> {
        if buffer.len() < self.wire_size_values() {
            return Err(SerializeError::NotEnoughSpace);
        }

        let mut argument_start = 0;
        for argument in self.0.iter() {
            argument_start += argument.serialize(&mut buffer[argument_start..])?;
        }

        Ok(argument_start)
    }

    /// Deserializes arguments from their lengths and concatenated name-value encodings on the wire.
    ///
    /// Returns the arguments along with the number of value bytes consumed.
    pub(crate) fn deserialize(
        lengths: &[u8],
        values: &'args [u8],
    ) -> Result<(Self, usize), DeserializeError> {
        let mut arguments = Vec::with_capacity(lengths.len());

        let mut argument_start = 0;
        for &length in lengths {
            let next_argument_start = argument_start + length as usize;

            let raw_argument = values
                .get(argument_start..next_argument_start)
                .ok_or(DeserializeError::UnexpectedEnd)?;
            arguments.push(Argument::deserialize(raw_argument)?);

            argument_start = next_argument_start;
        }

        Ok((Self(arguments), argument_start))
    }

    /// Consumes this set of arguments, returning the underlying list.
    pub fn into_inner(self) -> Vec<Argument<'args>> {
        self.0
    }
}

impl<'args> Deref for Arguments<'args> {
    type Target = [Argument<'args>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
