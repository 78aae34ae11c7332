//! Round trips against the credential store of the host.
//!
//! These touch the real keychain / Secret Service / Credential Manager and
//! may prompt for access, so they only run with `--features native-tests`.
#![cfg(feature = "native-tests")]

use credstore::{BackendKind, CredentialStore, Error, Platform, Store, StoreConfig};

const SCOPE: &str = "credstore-native-tests";

fn unique(name: &str) -> String {
    format!("{name}-{}", std::process::id())
}

#[test]
fn test_roundtrip_sizes() {
    let store = Store::open(&Platform::current(), SCOPE).unwrap();
    let name = unique("sizes");
    let large = match store.backend() {
        BackendKind::CredentialManager => 2560,
        _ => 16 * 1024,
    };

    for len in [0, 1, large] {
        let value: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        store.write(&name, &value).unwrap();
        assert_eq!(store.read(&name).unwrap().as_bytes(), value.as_slice());
    }

    store.delete(&name).unwrap();
    assert!(store.read(&name).unwrap_err().is_not_found());
}

#[test]
fn test_overwrite() {
    let name = unique("overwrite");

    credstore::write(&name, b"first", SCOPE).unwrap();
    credstore::write(&name, b"second", SCOPE).unwrap();
    assert_eq!(credstore::read(&name, SCOPE).unwrap().as_bytes(), b"second");

    credstore::delete(&name, SCOPE).unwrap();
}

#[test]
fn test_delete_missing() {
    let name = unique("missing");
    assert!(credstore::delete(&name, SCOPE).unwrap_err().is_not_found());
    assert!(credstore::read(&name, SCOPE).unwrap_err().is_not_found());
}

#[test]
fn test_over_limit_on_windows() {
    let store = Store::open(&Platform::current(), SCOPE).unwrap();
    if store.backend() != BackendKind::CredentialManager {
        return;
    }

    let name = unique("over");
    match store.write(&name, &[0; 2561]) {
        Err(Error::ValueTooLarge { max, .. }) => assert_eq!(max, 2560),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(store.read(&name).unwrap_err().is_not_found());
}

#[test]
fn test_fresh_collection() {
    if Platform::current() != Platform::Linux {
        return;
    }

    let config = StoreConfig::default().with_collection(unique("credstore"));
    let store = Store::with_config(&Platform::current(), SCOPE, &config).unwrap();
    let name = unique("fresh");

    store.write(&name, b"value").unwrap();
    assert_eq!(store.read(&name).unwrap().as_bytes(), b"value");
    store.delete(&name).unwrap();
}
