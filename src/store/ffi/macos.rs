//! Keychain Services generic-password calls through `security-framework`.

use core::ptr;

use core_foundation::{
    base::{CFType, TCFType},
    data::CFData,
    dictionary::CFDictionary,
    string::{CFString, CFStringRef},
};
use security_framework::{
    item::{ItemClass, ItemSearchOptions, Limit, SearchResult},
    passwords,
};
use security_framework_sys::{
    item::{
        kSecAttrAccount, kSecAttrLabel, kSecAttrService, kSecClass, kSecClassGenericPassword,
        kSecValueData,
    },
    keychain_item::SecItemAdd,
};

use crate::{
    secret::Secret,
    store::macos::{GenericPassword, KeychainClient, OsStatus, ERR_SEC_SUCCESS},
};

/// `errSecInternalComponent`
const ERR_SEC_INTERNAL_COMPONENT: OsStatus = -2070;

/// Wraps one of the framework's constant strings.
#[inline]
fn constant(key: CFStringRef) -> CFString {
    unsafe { CFString::wrap_under_get_rule(key) }
}

/// The keychain search list of the current user.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemKeychain;

impl KeychainClient for SystemKeychain {
    fn add(&self, item: &GenericPassword<'_>, data: &[u8]) -> Result<(), OsStatus> {
        // Synchronizable and accessibility are left at the `SecItemAdd`
        // defaults: not synchronized, accessible while unlocked.
        let attributes: [(CFString, CFType); 5] = unsafe {
            [
                (
                    constant(kSecClass),
                    constant(kSecClassGenericPassword).as_CFType(),
                ),
                (
                    constant(kSecAttrService),
                    CFString::new(item.service).as_CFType(),
                ),
                (
                    constant(kSecAttrAccount),
                    CFString::new(item.account).as_CFType(),
                ),
                (constant(kSecAttrLabel), CFString::new(item.label).as_CFType()),
                (constant(kSecValueData), CFData::from_buffer(data).as_CFType()),
            ]
        };
        let attributes = CFDictionary::from_CFType_pairs(&attributes);

        match unsafe { SecItemAdd(attributes.as_concrete_TypeRef(), ptr::null_mut()) } {
            ERR_SEC_SUCCESS => Ok(()),
            status => Err(status),
        }
    }

    fn copy_data(&self, item: &GenericPassword<'_>) -> Result<Secret, OsStatus> {
        let results = ItemSearchOptions::new()
            .class(ItemClass::generic_password())
            .service(item.service)
            .account(item.account)
            .load_data(true)
            .limit(Limit::Max(1))
            .search()
            .map_err(|err| err.code())?;

        match results.into_iter().next() {
            Some(SearchResult::Data(data)) => Ok(Secret::from(data)),
            _ => Err(ERR_SEC_INTERNAL_COMPONENT),
        }
    }

    fn delete(&self, item: &GenericPassword<'_>) -> Result<(), OsStatus> {
        passwords::delete_generic_password(item.service, item.account).map_err(|err| err.code())
    }

    fn message(&self, status: OsStatus) -> String {
        security_framework::base::Error::from_code(status).to_string()
    }
}
