use tacacs_plus_protocol::{AuthenticationMethod, FieldText, PrivilegeLevel, UserInformation};

use super::ClientError;

/// Some information associated with all sessions, regardless of the action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionContext {
    user: String,
    port: String,
    remote_address: String,
    privilege_level: PrivilegeLevel,
    authentication_method: AuthenticationMethod,
}

impl SessionContext {
    /// The user the session is performed on behalf of.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The client port (terminal) the user is connected to.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// The address the user is connected from.
    pub fn remote_address(&self) -> &str {
        &self.remote_address
    }

    /// The privilege level requested for the session.
    pub fn privilege_level(&self) -> PrivilegeLevel {
        self.privilege_level
    }

    /// The method used to authenticate the user, for authorization & accounting requests.
    pub fn authentication_method(&self) -> AuthenticationMethod {
        self.authentication_method
    }

    /// Checks the context fields against protocol field requirements, borrowing them for a packet body.
    pub(super) fn as_user_information(&self) -> Result<UserInformation<'_>, ClientError> {
        UserInformation::new(
            &self.user,
            FieldText::try_from(self.port.as_str()).map_err(|_| ClientError::InvalidContext)?,
            FieldText::try_from(self.remote_address.as_str())
                .map_err(|_| ClientError::InvalidContext)?,
        )
        .ok_or(ClientError::InvalidContext)
    }
}

/// Builder for [`SessionContext`] objects.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    user: String,
    port: String,
    remote_address: String,
    privilege_level: PrivilegeLevel,
    authentication_method: AuthenticationMethod,
}

impl ContextBuilder {
    /// Creates a new builder for the given user, with default values for the other fields.
    pub fn new<U: Into<String>>(user: U) -> Self {
        Self {
            user: user.into(),
            port: String::from("rust_client"),
            remote_address: String::from("tacacs_plus_rs"),
            privilege_level: PrivilegeLevel::default(),
            authentication_method: AuthenticationMethod::TacacsPlus,
        }
    }

    /// Sets the port of the resulting context.
    pub fn port<P: Into<String>>(mut self, port: P) -> Self {
        self.port = port.into();
        self
    }

    /// Sets the remote address of the resulting context.
    pub fn remote_address<A: Into<String>>(mut self, remote_address: A) -> Self {
        self.remote_address = remote_address.into();
        self
    }

    /// Sets the privilege level of the resulting context.
    pub fn privilege_level(mut self, privilege_level: PrivilegeLevel) -> Self {
        self.privilege_level = privilege_level;
        self
    }

    /// Sets the authentication method reported in authorization & accounting requests.
    pub fn authentication_method(mut self, method: AuthenticationMethod) -> Self {
        self.authentication_method = method;
        self
    }

    /// Consumes this builder and turns it into a [`SessionContext`].
    pub fn build(self) -> SessionContext {
        SessionContext {
            user: self.user,
            port: self.port,
            remote_address: self.remote_address,
            privilege_level: self.privilege_level,
            authentication_method: self.authentication_method,
        }
    }
}
