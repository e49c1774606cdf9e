use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;


/// A wrapper for `&str` that is checked to be printable ASCII, which is
/// required for the port, remote address and argument fields of a packet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldText<'string>(Cow<'string, str>);

/// Error returned when text passed to [`FieldText`] contains non-printable-ASCII characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidText(pub(crate) ());

fn is_printable_ascii(string: &str) -> bool {
    string.chars().all(|c| c.is_ascii() && !c.is_ascii_control())
}

impl<'string> FieldText<'string> {
    /// Gets the length of the underlying text, in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the underlying text is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the underlying text as a borrowed `str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Converts this text into one that owns its contents.
    pub fn into_owned<'out>(self) -> FieldText<'out> {
        FieldText(Cow::Owned(self.0.into_owned()))
    }

    /// Checks raw bytes off the wire for printable ASCII and wraps them without copying.
    pub fn from_bytes(bytes: &'string [u8]) -> Result<Self, InvalidText> {
        let string = std::str::from_utf8(bytes).map_err(|_| InvalidText(()))?;
        Self::try_from(string)
    }
}

impl<'string> TryFrom<&'string str> for FieldText<'string> {
    type Error = InvalidText;

    fn try_from(value: &'string str) -> Result<Self, Self::Error> {
        if is_printable_ascii(value) {
            Ok(Self(Cow::Borrowed(value)))
        } else {
            Err(InvalidText(()))
        }
    }
}

impl TryFrom<String> for FieldText<'_> {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_printable_ascii(&value) {
            Ok(Self(Cow::Owned(value)))
        } else {
            Err(value)
        }
    }
}

impl Deref for FieldText<'_> {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for FieldText<'_> {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for FieldText<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for FieldText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <str as fmt::Display>::fmt(&self.0, f)
    }
}
