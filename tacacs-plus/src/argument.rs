use tacacs_plus_protocol::{self as protocol, FieldText};

use crate::ClientError;

/// An owned TACACS+ argument, as sent in authorization & accounting requests or received in authorization replies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Argument {
    /// The name of the argument.
    pub name: String,

    /// The value of the argument.
    pub value: String,

    /// Whether the argument is required.
    pub required: bool,
}

impl Argument {
    /// Creates a required argument.
    pub fn required<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            required: true,
        }
    }

    /// Creates an optional argument.
    pub fn optional<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            required: false,
        }
    }

    /// Converts this argument to its borrowed wire form, validating it along the way.
    pub(crate) fn borrowed(&self) -> Result<protocol::Argument<'_>, ClientError> {
        let name =
            FieldText::try_from(self.name.as_str()).map_err(|_| ClientError::InvalidArgumentText)?;
        let value =
            FieldText::try_from(self.value.as_str()).map_err(|_| ClientError::InvalidArgumentText)?;

        protocol::Argument::new(name, value, self.required).map_err(Into::into)
    }
}

impl From<&protocol::Argument<'_>> for Argument {
    fn from(argument: &protocol::Argument<'_>) -> Self {
        Self {
            name: argument.name().to_string(),
            value: argument.value().to_string(),
            required: argument.required(),
        }
    }
}
