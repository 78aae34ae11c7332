use tracing::{debug, trace};

use super::CredentialStore;
use crate::{
    error::{Error, Result},
    platform::BackendKind,
    secret::Secret,
};

/// Result code of a Security framework call.
pub type OsStatus = i32;

pub const ERR_SEC_SUCCESS: OsStatus = 0;
pub const ERR_SEC_DUPLICATE_ITEM: OsStatus = -25299;
pub const ERR_SEC_ITEM_NOT_FOUND: OsStatus = -25300;

/// Identity of a generic-password keychain item.
///
/// Queries match on `service` and `account`; the label is only attached
/// when the item is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericPassword<'a> {
    pub service: &'a str,
    pub account: &'a str,
    pub label: &'a str,
}

/// Generic-password operations of the keychain.
///
/// Implementations return the raw `OSStatus` on failure.
pub trait KeychainClient {
    /// Adds a non-synchronizable item, accessible while the device is
    /// unlocked. Fails with `errSecDuplicateItem` if it already exists.
    fn add(&self, item: &GenericPassword<'_>, data: &[u8]) -> core::result::Result<(), OsStatus>;

    /// Returns the data of the single item matching `item`.
    fn copy_data(&self, item: &GenericPassword<'_>) -> core::result::Result<Secret, OsStatus>;

    /// Deletes the items matching `item`.
    fn delete(&self, item: &GenericPassword<'_>) -> core::result::Result<(), OsStatus>;

    /// Human readable description of `status`.
    fn message(&self, status: OsStatus) -> String {
        format!("OSStatus {status}")
    }
}

/// Generic passwords in the macOS keychain, with `service = scope` and
/// `account = label = name`.
///
/// Writes upsert: when the item already exists it is deleted and added
/// again, so its attributes are reset along with its value.
pub struct Keychain<C> {
    client: C,
    scope: String,
}

#[cfg(target_os = "macos")]
impl Keychain<super::ffi::macos::SystemKeychain> {
    /// Uses the login keychain of the current user.
    pub fn new(scope: &str) -> Self {
        Self::with_client(super::ffi::macos::SystemKeychain, scope)
    }
}

impl<C: KeychainClient> Keychain<C> {
    pub fn with_client(client: C, scope: &str) -> Self {
        Self {
            client,
            scope: scope.to_owned(),
        }
    }

    fn item<'a>(&'a self, name: &'a str) -> GenericPassword<'a> {
        GenericPassword {
            service: &self.scope,
            account: name,
            label: name,
        }
    }

    fn map_error(&self, name: &str, status: OsStatus) -> Error {
        match status {
            ERR_SEC_ITEM_NOT_FOUND => Error::not_found(name),
            ERR_SEC_DUPLICATE_ITEM => Error::AlreadyExists {
                name: name.to_owned(),
            },
            status => Error::backend(
                BackendKind::Keychain,
                name,
                Some(i64::from(status)),
                self.client.message(status),
            ),
        }
    }
}

impl<C: KeychainClient> CredentialStore for Keychain<C> {
    fn write(&self, name: &str, value: &[u8]) -> Result<()> {
        let item = self.item(name);
        debug!(service = %self.scope, account = name, len = value.len(), "writing keychain item");

        match self.client.add(&item, value) {
            Err(ERR_SEC_DUPLICATE_ITEM) => {
                trace!(account = name, "keychain item exists, replacing");
                match self.client.delete(&item) {
                    Ok(()) | Err(ERR_SEC_ITEM_NOT_FOUND) => {}
                    Err(status) => return Err(self.map_error(name, status)),
                }
                self.client
                    .add(&item, value)
                    .map_err(|status| self.map_error(name, status))
            }
            result => result.map_err(|status| self.map_error(name, status)),
        }
    }

    fn read(&self, name: &str) -> Result<Secret> {
        debug!(service = %self.scope, account = name, "reading keychain item");
        self.client
            .copy_data(&self.item(name))
            .map_err(|status| self.map_error(name, status))
    }

    fn delete(&self, name: &str) -> Result<()> {
        debug!(service = %self.scope, account = name, "deleting keychain item");
        self.client
            .delete(&self.item(name))
            .map_err(|status| self.map_error(name, status))
    }
}

// Tests
#[cfg(test)]
mod tests {
    use core::cell::{Cell, RefCell};
    use std::collections::HashMap;

    use super::*;

    const ERR_SEC_INTERACTION_NOT_ALLOWED: OsStatus = -25308;

    /// Keychain keyed by (service, account), rejecting duplicate adds like
    /// `SecItemAdd`.
    #[derive(Default)]
    struct FakeKeychain {
        items: RefCell<HashMap<(String, String), (String, Vec<u8>)>>,
        adds: Cell<usize>,
        deletes: Cell<usize>,
        fail_with: Cell<Option<OsStatus>>,
        // Simulates another writer re-creating the item after our delete
        racing_writer: Cell<bool>,
    }

    impl FakeKeychain {
        fn key(item: &GenericPassword<'_>) -> (String, String) {
            (item.service.to_owned(), item.account.to_owned())
        }

        fn check(&self) -> core::result::Result<(), OsStatus> {
            match self.fail_with.get() {
                Some(status) => Err(status),
                None => Ok(()),
            }
        }
    }

    impl KeychainClient for FakeKeychain {
        fn add(&self, item: &GenericPassword<'_>, data: &[u8]) -> core::result::Result<(), OsStatus> {
            self.check()?;
            self.adds.set(self.adds.get() + 1);

            let mut items = self.items.borrow_mut();
            if items.contains_key(&Self::key(item)) {
                return Err(ERR_SEC_DUPLICATE_ITEM);
            }
            items.insert(Self::key(item), (item.label.to_owned(), data.to_vec()));
            Ok(())
        }

        fn copy_data(&self, item: &GenericPassword<'_>) -> core::result::Result<Secret, OsStatus> {
            self.check()?;
            self.items
                .borrow()
                .get(&Self::key(item))
                .map(|(_, data)| Secret::copy_from(data))
                .ok_or(ERR_SEC_ITEM_NOT_FOUND)
        }

        fn delete(&self, item: &GenericPassword<'_>) -> core::result::Result<(), OsStatus> {
            self.check()?;
            self.deletes.set(self.deletes.get() + 1);

            let removed = self.items.borrow_mut().remove(&Self::key(item));
            if self.racing_writer.get() {
                self.items
                    .borrow_mut()
                    .insert(Self::key(item), (item.label.to_owned(), b"theirs".to_vec()));
            }
            removed.map(drop).ok_or(ERR_SEC_ITEM_NOT_FOUND)
        }
    }

    fn keychain() -> Keychain<FakeKeychain> {
        Keychain::with_client(FakeKeychain::default(), "app")
    }

    #[test]
    fn test_write_read_delete() {
        let store = keychain();

        store.write("token", b"s3cr3t").unwrap();
        assert_eq!(store.read("token").unwrap().as_bytes(), b"s3cr3t");

        let items = store.client.items.borrow();
        let (label, _) = &items[&("app".to_owned(), "token".to_owned())];
        assert_eq!(label, "token");
        drop(items);

        store.delete("token").unwrap();
        assert!(store.read("token").unwrap_err().is_not_found());
        assert!(store.delete("token").unwrap_err().is_not_found());
    }

    #[test]
    fn test_write_upserts() {
        let store = keychain();

        store.write("token", b"first").unwrap();
        store.write("token", b"second").unwrap();

        assert_eq!(store.read("token").unwrap().as_bytes(), b"second");
        assert_eq!(store.client.adds.get(), 3);
        assert_eq!(store.client.deletes.get(), 1);
        assert_eq!(store.client.items.borrow().len(), 1);
    }

    #[test]
    fn test_lost_race_reports_already_exists() {
        let store = keychain();
        store.write("token", b"ours").unwrap();

        store.client.racing_writer.set(true);
        match store.write("token", b"ours again") {
            Err(Error::AlreadyExists { name }) => assert_eq!(name, "token"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(store.read("token").unwrap().as_bytes(), b"theirs");
    }

    #[test]
    fn test_services_are_isolated() {
        let store = keychain();
        store.write("token", b"app").unwrap();

        let other = Keychain::with_client(&store.client, "other");
        assert!(other.read("token").unwrap_err().is_not_found());
    }

    #[test]
    fn test_empty_value() {
        let store = keychain();
        store.write("token", b"").unwrap();
        assert!(store.read("token").unwrap().is_empty());
    }

    #[test]
    fn test_large_value() {
        let store = keychain();
        let large: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();

        store.write("token", &large).unwrap();
        let read = store.read("token").unwrap();
        assert_eq!(read.as_bytes(), large.as_slice());
    }

    #[test]
    fn test_backend_error_keeps_status() {
        let store = keychain();
        store.client.fail_with.set(Some(ERR_SEC_INTERACTION_NOT_ALLOWED));

        match store.read("token") {
            Err(Error::Backend { backend, code, message, .. }) => {
                assert_eq!(backend, BackendKind::Keychain);
                assert_eq!(code, Some(-25308));
                assert_eq!(message, "OSStatus -25308");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            store.write("token", b"x"),
            Err(Error::Backend { .. })
        ));
    }

    impl<C: KeychainClient> KeychainClient for &C {
        fn add(&self, item: &GenericPassword<'_>, data: &[u8]) -> core::result::Result<(), OsStatus> {
            (**self).add(item, data)
        }

        fn copy_data(&self, item: &GenericPassword<'_>) -> core::result::Result<Secret, OsStatus> {
            (**self).copy_data(item)
        }

        fn delete(&self, item: &GenericPassword<'_>) -> core::result::Result<(), OsStatus> {
            (**self).delete(item)
        }
    }
}
