use core::fmt;

use tracing::debug;

use crate::{
    config::StoreConfig,
    error::{Error, Result},
    platform::{BackendKind, Platform},
    secret::Secret,
};

pub mod ffi;
pub mod linux;
pub mod macos;
pub mod windows;

/// Named secrets in one scope of a native credential store.
///
/// Implementations perform a fresh round trip to the OS store on every call
/// and hold no state besides their configuration.
pub trait CredentialStore {
    /// Stores `value` under `name`, replacing any previous value.
    fn write(&self, name: &str, value: &[u8]) -> Result<()>;

    /// Returns the value stored under `name`.
    ///
    /// # Errors
    /// `NotFound` if there is no such credential.
    fn read(&self, name: &str) -> Result<Secret>;

    /// Removes the credential stored under `name`.
    ///
    /// # Errors
    /// `NotFound` if there is no such credential.
    fn delete(&self, name: &str) -> Result<()>;
}

/// The adapters available on this host.
enum Backend {
    #[cfg(target_os = "macos")]
    Keychain(macos::Keychain<ffi::macos::SystemKeychain>),
    #[cfg(target_os = "linux")]
    SecretService(linux::SecretService<ffi::linux::SessionBus>),
    #[cfg(target_family = "windows")]
    CredentialManager(windows::CredentialManager<&'static ffi::windows::Advapi32>),
}

impl Backend {
    #[cfg_attr(
        not(any(target_os = "linux", target_family = "windows")),
        allow(unused_variables)
    )]
    fn open(kind: BackendKind, scope: &str, config: &StoreConfig) -> Result<Self> {
        match kind {
            #[cfg(target_os = "macos")]
            BackendKind::Keychain => Ok(Self::Keychain(macos::Keychain::new(scope))),
            #[cfg(target_os = "linux")]
            BackendKind::SecretService => Ok(Self::SecretService(linux::SecretService::new(
                scope, config,
            ))),
            #[cfg(target_family = "windows")]
            BackendKind::CredentialManager => {
                windows::CredentialManager::new(scope, config).map(Self::CredentialManager)
            }
            kind => Err(Error::UnsupportedPlatform(format!(
                "{kind} is not available on {}",
                std::env::consts::OS
            ))),
        }
    }

    fn as_store(&self) -> &dyn CredentialStore {
        match *self {
            #[cfg(target_os = "macos")]
            Self::Keychain(ref store) => store,
            #[cfg(target_os = "linux")]
            Self::SecretService(ref store) => store,
            #[cfg(target_family = "windows")]
            Self::CredentialManager(ref store) => store,
        }
    }
}

/// The credential store of a platform, bound to one scope.
///
/// The scope namespaces items: it is the keychain service on macOS, the
/// `service` attribute on Linux and the target name prefix on Windows.
pub struct Store {
    kind: BackendKind,
    scope: String,
    backend: Backend,
}

impl Store {
    /// Opens the store of `platform` with the default configuration.
    ///
    /// # Errors
    /// `UnsupportedPlatform` if `platform` has no supported store or is not
    /// the host this crate was built for. No native call is made in that case.
    pub fn open(platform: &Platform, scope: &str) -> Result<Self> {
        Self::with_config(platform, scope, &StoreConfig::default())
    }

    pub fn with_config(platform: &Platform, scope: &str, config: &StoreConfig) -> Result<Self> {
        let kind = BackendKind::for_platform(platform)?;
        let backend = Backend::open(kind, scope, config)?;
        debug!(backend = %kind, scope, "opened credential store");

        Ok(Self {
            kind,
            scope: scope.to_owned(),
            backend,
        })
    }

    /// The backend selected for this store.
    #[inline]
    pub fn backend(&self) -> BackendKind {
        self.kind
    }

    #[inline]
    pub fn scope(&self) -> &str {
        &self.scope
    }
}

impl CredentialStore for Store {
    fn write(&self, name: &str, value: &[u8]) -> Result<()> {
        self.backend.as_store().write(name, value)
    }

    fn read(&self, name: &str) -> Result<Secret> {
        self.backend.as_store().read(name)
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.backend.as_store().delete(name)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("backend", &self.kind)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Opens a store for `platform` and runs `op` on it.
pub(crate) fn with_store<T>(
    platform: &Platform,
    scope: &str,
    op: impl FnOnce(&Store) -> Result<T>,
) -> Result<T> {
    let store = Store::open(platform, scope)?;
    op(&store)
}

// Tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_platform_makes_no_call() {
        let platform = Platform::Other("haiku".into());
        let mut calls = 0;

        let results = [
            with_store(&platform, "app", |store| {
                calls += 1;
                store.write("token", b"value")
            }),
            with_store(&platform, "app", |store| {
                calls += 1;
                store.read("token").map(drop)
            }),
            with_store(&platform, "app", |store| {
                calls += 1;
                store.delete("token")
            }),
        ];

        for result in results {
            match result {
                Err(Error::UnsupportedPlatform(os)) => assert_eq!(os, "haiku"),
                other => panic!("unexpected result: {other:?}"),
            }
        }
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_foreign_platform_is_unsupported() {
        let current = Platform::current();
        for platform in [Platform::MacOs, Platform::Linux, Platform::Windows] {
            if platform == current {
                continue;
            }
            assert!(matches!(
                Store::open(&platform, "app"),
                Err(Error::UnsupportedPlatform(_))
            ));
        }
    }

    #[test]
    #[cfg(any(target_os = "macos", target_os = "linux", target_family = "windows"))]
    fn test_open_current_platform() {
        let store = Store::open(&Platform::current(), "app").expect("Failed to open store");
        assert_eq!(
            store.backend(),
            BackendKind::for_platform(&Platform::current()).unwrap()
        );
        assert_eq!(store.scope(), "app");
        assert_eq!(
            format!("{store:?}"),
            format!("Store {{ backend: {:?}, scope: \"app\" }}", store.backend())
        );
    }
}
