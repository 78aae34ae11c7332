use std::io;

use tracing::{debug, trace};

use super::{
    ffi::windows::{
        CredentialApi, CredentialBlob, CredentialGuard, NativeCredential, CRED_PERSIST_ENTERPRISE,
        CRED_PERSIST_LOCAL_MACHINE, CRED_PERSIST_SESSION, CRED_TYPE_GENERIC, ERROR_NOT_FOUND,
    },
    CredentialStore,
};
use crate::{
    config::{Persistence, StoreConfig},
    error::{Error, Result},
    platform::BackendKind,
    secret::Secret,
    util::wide::WideCString,
};

/// Generic credentials in the Windows Credential Manager.
///
/// Items are stored under the target name `"{scope}{separator}{name}"`, or
/// just `name` when the scope is empty. Writes replace an existing
/// credential with the same target.
pub struct CredentialManager<A> {
    api: A,
    scope: String,
    separator: char,
    persist: u32,
}

#[cfg(target_family = "windows")]
impl CredentialManager<&'static super::ffi::windows::Advapi32> {
    /// Binds to the system `advapi32.dll`.
    pub fn new(scope: &str, config: &StoreConfig) -> Result<Self> {
        let api = super::ffi::windows::Advapi32::get().map_err(|err| {
            Error::backend(
                BackendKind::CredentialManager,
                "advapi32.dll",
                err.raw_os_error().map(i64::from),
                err.to_string(),
            )
        })?;
        Ok(Self::with_api(api, scope, config))
    }
}

impl<A: CredentialApi> CredentialManager<A> {
    /// Uses `api` for the native calls.
    pub fn with_api(api: A, scope: &str, config: &StoreConfig) -> Self {
        let persist = match config.persistence {
            Persistence::Session => CRED_PERSIST_SESSION,
            Persistence::LocalMachine => CRED_PERSIST_LOCAL_MACHINE,
            Persistence::Enterprise => CRED_PERSIST_ENTERPRISE,
        };

        Self {
            api,
            scope: scope.to_owned(),
            separator: config.target_separator,
            persist,
        }
    }

    /// The native target name of `name`.
    pub fn target_name(&self, name: &str) -> String {
        match self.scope.is_empty() {
            true => name.to_owned(),
            false => format!("{}{}{}", self.scope, self.separator, name),
        }
    }

    fn encode_target(&self, name: &str) -> Result<WideCString> {
        WideCString::new(&self.target_name(name))
    }

    fn map_error(name: &str, err: io::Error) -> Error {
        match err.raw_os_error() {
            Some(ERROR_NOT_FOUND) => Error::not_found(name),
            code => Error::backend(
                BackendKind::CredentialManager,
                name,
                code.map(i64::from),
                err.to_string(),
            ),
        }
    }
}

impl<A: CredentialApi> CredentialStore for CredentialManager<A> {
    fn write(&self, name: &str, value: &[u8]) -> Result<()> {
        let blob = CredentialBlob::new(value).ok_or_else(|| Error::ValueTooLarge {
            name: name.to_owned(),
            len: value.len(),
            max: CredentialBlob::MAX_SIZE,
        })?;
        let target = self.encode_target(name)?;
        let user_name = WideCString::new(name)?;

        debug!(target_name = ?target, len = value.len(), "writing credential");
        let credential = NativeCredential::generic(&target, &user_name, &blob, self.persist);
        let result = unsafe { self.api.cred_write(&credential) };
        trace!(target_name = ?target, ok = result.is_ok(), "CredWriteW");

        result.map_err(|err| Self::map_error(name, err))
    }

    fn read(&self, name: &str) -> Result<Secret> {
        let target = self.encode_target(name)?;

        debug!(target_name = ?target, "reading credential");
        let credential =
            CredentialGuard::read(&self.api, &target).map_err(|err| Self::map_error(name, err))?;
        let secret = credential
            .blob()
            .map(Secret::copy_from)
            .map_err(|err| Self::map_error(name, err))?;
        trace!(target_name = ?target, len = secret.len(), "CredReadW");

        Ok(secret)
    }

    fn delete(&self, name: &str) -> Result<()> {
        let target = self.encode_target(name)?;

        debug!(target_name = ?target, "deleting credential");
        let result = unsafe { self.api.cred_delete(target.as_ptr(), CRED_TYPE_GENERIC) };
        trace!(target_name = ?target, ok = result.is_ok(), "CredDeleteW");

        result.map_err(|err| Self::map_error(name, err))
    }
}
