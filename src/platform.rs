use core::fmt;

use crate::error::{Error, Result};

/// Host operating system, as far as credential storage is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Linux,
    Windows,
    Other(String),
}

impl Platform {
    /// The platform this process is running on.
    #[inline]
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Maps an OS identifier as reported by `std::env::consts::OS`.
    pub fn from_os(os: &str) -> Self {
        match os {
            "macos" => Self::MacOs,
            "linux" => Self::Linux,
            "windows" => Self::Windows,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MacOs => f.write_str("macos"),
            Self::Linux => f.write_str("linux"),
            Self::Windows => f.write_str("windows"),
            Self::Other(os) => f.write_str(os),
        }
    }
}

/// The native secret store backing a [`Store`](crate::Store).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// macOS Keychain Services.
    Keychain,
    /// freedesktop.org Secret Service over the session bus.
    SecretService,
    /// Windows Credential Manager.
    CredentialManager,
}

impl BackendKind {
    /// Selects the backend for `platform`.
    ///
    /// # Errors
    /// `UnsupportedPlatform` when the platform has no native store.
    pub fn for_platform(platform: &Platform) -> Result<Self> {
        match platform {
            Platform::MacOs => Ok(Self::Keychain),
            Platform::Linux => Ok(Self::SecretService),
            Platform::Windows => Ok(Self::CredentialManager),
            Platform::Other(os) => Err(Error::UnsupportedPlatform(os.clone())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Keychain => "Keychain",
            Self::SecretService => "Secret Service",
            Self::CredentialManager => "Windows Credential Manager",
        })
    }
}
