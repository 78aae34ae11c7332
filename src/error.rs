use crate::platform::BackendKind;

/// Errors returned by credential store operations.
///
/// No variant ever carries the secret value, only the item name and,
/// where the OS provides one, the native error code.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The host OS has no supported credential store.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// No credential with this name exists in the selected backend.
    #[error("credential not found: {name}")]
    NotFound { name: String },

    /// A concurrent writer created the credential between our delete and add.
    #[error("credential already exists: {name}")]
    AlreadyExists { name: String },

    /// The value exceeds the backend's maximum credential size.
    #[error("value for {name} is {len} bytes, the backend accepts at most {max}")]
    ValueTooLarge {
        name: String,
        len: usize,
        max: usize,
    },

    /// A name or scope cannot be represented at the native boundary.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The native store reported a failure.
    #[error("{backend} failed on {name}{}: {message}", code_suffix(.code))]
    Backend {
        backend: BackendKind,
        name: String,
        code: Option<i64>,
        message: String,
    },
}

impl Error {
    pub(crate) fn not_found(name: &str) -> Self {
        Self::NotFound {
            name: name.to_owned(),
        }
    }

    pub(crate) fn backend(
        backend: BackendKind,
        name: &str,
        code: Option<i64>,
        message: impl Into<String>,
    ) -> Self {
        Self::Backend {
            backend,
            name: name.to_owned(),
            code,
            message: message.into(),
        }
    }

    /// Returns `true` when the credential does not exist, as opposed to the
    /// store failing to answer.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Native error code, if the backend reported one.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Backend { code, .. } => *code,
            _ => None,
        }
    }
}

fn code_suffix(code: &Option<i64>) -> String {
    code.map(|code| format!(" (code {code})")).unwrap_or_default()
}

pub type Result<T> = core::result::Result<T, Error>;
