//! User-visible messages, keyed by their localization ids

use std::fmt;

/// Fallback tab project name while the tab has no title yet.
pub const TAB_LOADING_NAME: &str = "Loading…";

/// Localization ids of the errors the app manager reports to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKey {
    CantConnectToApp,
    CantInstallNotFullyConnected,
    CantInstallValidationErrors,
}

impl ErrorKey {
    pub fn id(&self) -> &'static str {
        match self {
            ErrorKey::CantConnectToApp => "error_cantConnectToApp",
            ErrorKey::CantInstallNotFullyConnected => "error_cantInstallNotFullyConnected",
            ErrorKey::CantInstallValidationErrors => "error_cantInstallValidationErrors",
        }
    }

    fn template(&self) -> &'static str {
        match self {
            ErrorKey::CantConnectToApp => "Can't connect to app: {}",
            ErrorKey::CantInstallNotFullyConnected => {
                "Can't install project. Not fully connected."
            }
            ErrorKey::CantInstallValidationErrors => {
                "Can't install project. Validation errors."
            }
        }
    }
}

impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// An error reported to the user: a message key plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub key: ErrorKey,
    pub args: Vec<String>,
}

impl ErrorReport {
    pub fn new(key: ErrorKey) -> Self {
        Self {
            key,
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Render the message, substituting `{}` placeholders in order.
    pub fn message(&self) -> String {
        let mut args = self.args.iter();
        let mut out = String::new();
        let mut rest = self.key.template();
        while let Some(pos) = rest.find("{}") {
            out.push_str(&rest[..pos]);
            out.push_str(args.next().map(String::as_str).unwrap_or(""));
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);
        out
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}
