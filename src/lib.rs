//! Named secrets in the operating system's credential store.
//!
//! | platform | backend                                     |
//! |----------|---------------------------------------------|
//! | macOS    | Keychain Services, generic passwords        |
//! | Linux    | Secret Service, `login` collection          |
//! | Windows  | Credential Manager, generic credentials     |
//!
//! Writes replace any existing value on every backend. The crate holds no
//! state between calls and never logs secret values.

mod config;
mod error;
mod platform;
mod secret;
pub mod store;
mod util;

pub use config::{Persistence, StoreConfig, DEFAULT_COLLECTION};
pub use error::{Error, Result};
pub use platform::{BackendKind, Platform};
pub use secret::Secret;
pub use store::{CredentialStore, Store};

/// Stores `value` under `name` in the native store of this host, scoped to
/// the application `scope`.
///
/// # Errors
/// `UnsupportedPlatform` on hosts without a supported store, `ValueTooLarge`
/// when the value exceeds the backend limit, `Backend` on native failures.
pub fn write(name: &str, value: &[u8], scope: &str) -> Result<()> {
    store::with_store(&Platform::current(), scope, |store| store.write(name, value))
}

/// Reads the value stored under `name` in `scope`.
///
/// # Errors
/// `NotFound` if no such credential exists.
pub fn read(name: &str, scope: &str) -> Result<Secret> {
    store::with_store(&Platform::current(), scope, |store| store.read(name))
}

/// Deletes the credential stored under `name` in `scope`.
///
/// # Errors
/// `NotFound` if no such credential exists.
pub fn delete(name: &str, scope: &str) -> Result<()> {
    store::with_store(&Platform::current(), scope, |store| store.delete(name))
}
