//! Secret Service over the blocking client of the `secret-service` crate.

use std::collections::HashMap;

use secret_service::{
    blocking::{Collection, Item, SecretService},
    EncryptionType,
};

use crate::{
    secret::Secret,
    store::linux::{
        SecretCollection, SecretItem, SecretServiceClient, SecretSession, ServiceError,
        ServiceResult,
    },
};

fn map_error(err: secret_service::Error) -> ServiceError {
    match err {
        secret_service::Error::NoResult => ServiceError::NoResult,
        secret_service::Error::Locked => ServiceError::Locked,
        err => ServiceError::Failed(err.to_string()),
    }
}

/// The Secret Service provider on the user's D-Bus session bus.
///
/// Every [`connect`](SecretServiceClient::connect) opens a new connection
/// and a DH-encrypted session, dropped once the operation returns.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionBus;

impl SecretServiceClient for SessionBus {
    type Session = SecretService<'static>;

    fn connect(&self) -> ServiceResult<Self::Session> {
        SecretService::connect(EncryptionType::Dh).map_err(map_error)
    }
}

impl<'s> SecretSession for SecretService<'s> {
    type Collection<'a> = Collection<'a> where Self: 'a;

    fn collections(&self) -> ServiceResult<Vec<Self::Collection<'_>>> {
        self.get_all_collections().map_err(map_error)
    }

    fn collection_by_alias(&self, alias: &str) -> ServiceResult<Option<Self::Collection<'_>>> {
        match self.get_collection_by_alias(alias) {
            Ok(collection) => Ok(Some(collection)),
            Err(secret_service::Error::NoResult) => Ok(None),
            Err(err) => Err(map_error(err)),
        }
    }

    fn create_collection(&self, label: &str) -> ServiceResult<Self::Collection<'_>> {
        SecretService::create_collection(self, label, "").map_err(map_error)
    }
}

impl<'c> SecretCollection for Collection<'c> {
    type Item<'a> = Item<'a> where Self: 'a;

    fn label(&self) -> ServiceResult<String> {
        self.get_label().map_err(map_error)
    }

    fn unlock(&self) -> ServiceResult<()> {
        Collection::unlock(self).map_err(map_error)
    }

    fn create_item(
        &self,
        label: &str,
        attributes: HashMap<&str, &str>,
        secret: &[u8],
        replace: bool,
        content_type: &str,
    ) -> ServiceResult<()> {
        Collection::create_item(self, label, attributes, secret, replace, content_type)
            .map(drop)
            .map_err(map_error)
    }

    fn search_items(&self, attributes: HashMap<&str, &str>) -> ServiceResult<Vec<Self::Item<'_>>> {
        Collection::search_items(self, attributes).map_err(map_error)
    }
}

impl<'i> SecretItem for Item<'i> {
    fn unlock(&self) -> ServiceResult<()> {
        Item::unlock(self).map_err(map_error)
    }

    fn secret(&self) -> ServiceResult<Secret> {
        self.get_secret().map(Secret::from).map_err(map_error)
    }

    fn delete(&self) -> ServiceResult<()> {
        Item::delete(self).map_err(map_error)
    }
}
