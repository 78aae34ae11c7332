use std::collections::HashMap;

use tracing::{debug, trace, warn};

use super::CredentialStore;
use crate::{
    config::StoreConfig,
    error::{Error, Result},
    platform::BackendKind,
    secret::Secret,
};

/// Content type of every item this crate writes.
pub const CONTENT_TYPE: &str = "text/plain";

/// Attribute holding the scope of an item.
pub const SERVICE_ATTRIBUTE: &str = "service";
/// Attribute holding the item name.
pub const ACCOUNT_ATTRIBUTE: &str = "account";

/// Failure reported by a Secret Service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The object does not exist.
    NoResult,
    /// The object is locked and could not be unlocked.
    Locked,
    /// Any other daemon or bus failure.
    Failed(String),
}

impl ServiceError {
    fn into_error(self, name: &str) -> Error {
        match self {
            Self::NoResult => Error::not_found(name),
            Self::Locked => Error::backend(BackendKind::SecretService, name, None, "item is locked"),
            Self::Failed(message) => Error::backend(BackendKind::SecretService, name, None, message),
        }
    }
}

pub type ServiceResult<T> = core::result::Result<T, ServiceError>;

/// Opens sessions with the Secret Service daemon.
pub trait SecretServiceClient {
    type Session: SecretSession;

    /// Connects to the session bus and negotiates a session.
    fn connect(&self) -> ServiceResult<Self::Session>;
}

/// An open session with the daemon.
pub trait SecretSession {
    type Collection<'a>: SecretCollection
    where
        Self: 'a;

    fn collections(&self) -> ServiceResult<Vec<Self::Collection<'_>>>;

    /// Resolves a collection alias such as `login` or `default`.
    fn collection_by_alias(&self, alias: &str) -> ServiceResult<Option<Self::Collection<'_>>>;

    fn create_collection(&self, label: &str) -> ServiceResult<Self::Collection<'_>>;
}

/// A named, lockable container of items.
pub trait SecretCollection {
    type Item<'a>: SecretItem
    where
        Self: 'a;

    fn label(&self) -> ServiceResult<String>;

    fn unlock(&self) -> ServiceResult<()>;

    fn create_item(
        &self,
        label: &str,
        attributes: HashMap<&str, &str>,
        secret: &[u8],
        replace: bool,
        content_type: &str,
    ) -> ServiceResult<()>;

    fn search_items(&self, attributes: HashMap<&str, &str>) -> ServiceResult<Vec<Self::Item<'_>>>;
}

/// A single stored secret.
pub trait SecretItem {
    fn unlock(&self) -> ServiceResult<()>;

    fn secret(&self) -> ServiceResult<Secret>;

    fn delete(&self) -> ServiceResult<()>;
}

/// Items in a Secret Service collection, labelled with the item name and
/// looked up by the `service` and `account` attributes.
///
/// The collection (`"login"` unless configured otherwise) is created on the
/// first write. Writes replace an existing item with the same attributes.
pub struct SecretService<C> {
    client: C,
    scope: String,
    collection: String,
}

#[cfg(target_os = "linux")]
impl SecretService<super::ffi::linux::SessionBus> {
    /// Talks to the daemon on the user's session bus.
    pub fn new(scope: &str, config: &StoreConfig) -> Self {
        Self::with_client(super::ffi::linux::SessionBus, scope, config)
    }
}

impl<C: SecretServiceClient> SecretService<C> {
    pub fn with_client(client: C, scope: &str, config: &StoreConfig) -> Self {
        Self {
            client,
            scope: scope.to_owned(),
            collection: config.collection.clone(),
        }
    }

    fn attributes<'a>(&'a self, name: &'a str) -> HashMap<&'a str, &'a str> {
        HashMap::from([
            (SERVICE_ATTRIBUTE, self.scope.as_str()),
            (ACCOUNT_ATTRIBUTE, name),
        ])
    }

    fn connect(&self, name: &str) -> Result<C::Session> {
        self.client.connect().map_err(|err| err.into_error(name))
    }

    fn find_collection<'s>(
        &self,
        session: &'s C::Session,
    ) -> ServiceResult<Option<<C::Session as SecretSession>::Collection<'s>>> {
        // GNOME labels its login keyring "Login" and exposes it as alias `login`
        if let Some(collection) = session.collection_by_alias(&self.collection)? {
            return Ok(Some(collection));
        }
        for collection in session.collections()? {
            if collection.label()? == self.collection {
                return Ok(Some(collection));
            }
        }
        Ok(None)
    }

    /// Fetches the collection, creating it when absent.
    ///
    /// A failed create is followed by a second lookup, so that a collection
    /// created concurrently by another process is used instead of failing.
    fn find_or_create_collection<'s>(
        &self,
        session: &'s C::Session,
    ) -> ServiceResult<<C::Session as SecretSession>::Collection<'s>> {
        if let Some(collection) = self.find_collection(session)? {
            return Ok(collection);
        }

        debug!(collection = %self.collection, "creating collection");
        match session.create_collection(&self.collection) {
            Ok(collection) => Ok(collection),
            Err(err) => {
                trace!(collection = %self.collection, error = ?err, "create failed, looking up again");
                self.find_collection(session)?.ok_or(err)
            }
        }
    }
}

impl<C: SecretServiceClient> CredentialStore for SecretService<C> {
    fn write(&self, name: &str, value: &[u8]) -> Result<()> {
        debug!(service = %self.scope, name, len = value.len(), "writing secret service item");
        let session = self.connect(name)?;
        let collection = self
            .find_or_create_collection(&session)
            .map_err(|err| err.into_error(name))?;

        if let Err(err) = collection.unlock() {
            warn!(collection = %self.collection, error = ?err, "failed to unlock collection");
        }

        collection
            .create_item(name, self.attributes(name), value, true, CONTENT_TYPE)
            .map_err(|err| err.into_error(name))
    }

    fn read(&self, name: &str) -> Result<Secret> {
        debug!(service = %self.scope, name, "reading secret service item");
        let session = self.connect(name)?;
        let collection = self
            .find_collection(&session)
            .map_err(|err| err.into_error(name))?
            .ok_or_else(|| Error::not_found(name))?;

        let items = collection
            .search_items(self.attributes(name))
            .map_err(|err| err.into_error(name))?;
        let item = items.first().ok_or_else(|| Error::not_found(name))?;

        let unlocked = item.unlock();
        if let Err(err) = &unlocked {
            warn!(name, error = ?err, "failed to unlock item, fetching anyway");
        }

        item.secret().map_err(|err| match unlocked {
            Err(ServiceError::NoResult) | Ok(()) => err.into_error(name),
            Err(unlock_err) => unlock_err.into_error(name),
        })
    }

    fn delete(&self, name: &str) -> Result<()> {
        debug!(service = %self.scope, name, "deleting secret service item");
        let session = self.connect(name)?;
        let collection = self
            .find_collection(&session)
            .map_err(|err| err.into_error(name))?
            .ok_or_else(|| Error::not_found(name))?;

        let items = collection
            .search_items(self.attributes(name))
            .map_err(|err| err.into_error(name))?;
        if items.is_empty() {
            return Err(Error::not_found(name));
        }

        for item in &items {
            if let Err(err) = item.unlock() {
                warn!(name, error = ?err, "failed to unlock item, deleting anyway");
            }
            item.delete().map_err(|err| err.into_error(name))?;
        }
        Ok(())
    }
}
