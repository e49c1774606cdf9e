use std::fmt;
use std::time::SystemTime;

use tacacs_plus::Task;

/// A password taken from call credentials.
///
/// The `Debug` impl never prints the password itself, so contexts can be logged freely.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn new<P: Into<String>>(password: P) -> Self {
        Self(password.into())
    }

    /// The plaintext password, for sending to the TACACS+ server.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

/// State tracked for a single inbound call from credential extraction until it completes.
#[derive(Debug, Clone)]
pub struct CallContext {
    username: String,
    password: Password,
    remote_address: String,
    method_name: String,

    /// The accounting task opened for this call, if accounting has started.
    pub(crate) task: Option<Task>,

    /// Set once connecting to the TACACS+ server has failed during this call.
    pub(crate) connect_failure: bool,
}

impl CallContext {
    pub fn new<U, A>(username: U, password: Password, remote_address: A) -> Self
    where
        U: Into<String>,
        A: Into<String>,
    {
        Self {
            username: username.into(),
            password,
            remote_address: remote_address.into(),
            method_name: String::new(),
            task: None,
            connect_failure: false,
        }
    }

    /// The username from the call credentials; empty if none were supplied.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &Password {
        &self.password
    }

    /// The address of the peer that made the call.
    pub fn remote_address(&self) -> &str {
        &self.remote_address
    }

    /// The lowercase name of the invoked operation, sent as the `cmd` attribute.
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn set_method_name<M: Into<String>>(&mut self, method_name: M) {
        self.method_name = method_name.into();
    }

    /// Whether the call supplied usable credentials.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }

    /// The id of the accounting task, once accounting has started.
    pub fn task_id(&self) -> Option<u32> {
        self.task.as_ref().map(Task::id)
    }

    /// When accounting started for this call.
    pub fn start_time(&self) -> Option<SystemTime> {
        self.task.as_ref().map(Task::start_time)
    }

    /// Whether a TACACS+ connection attempt has already failed for this call.
    pub fn connect_failed(&self) -> bool {
        self.connect_failure
    }
}
