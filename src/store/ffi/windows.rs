//! Credential Manager record layout and entry points.
//!
//! The record and constants are declared here instead of being taken from
//! `windows-sys` so that the marshalling code builds and is tested on every
//! host; on Windows the tests check them against the SDK definitions.

use core::{
    ffi::c_void,
    ptr::{self, NonNull},
    slice,
};
use std::io;

pub use crate::util::wide::WideCString;

/// `CRED_TYPE_GENERIC`
pub const CRED_TYPE_GENERIC: u32 = 1;
/// `CRED_PERSIST_SESSION`
pub const CRED_PERSIST_SESSION: u32 = 1;
/// `CRED_PERSIST_LOCAL_MACHINE`
pub const CRED_PERSIST_LOCAL_MACHINE: u32 = 2;
/// `CRED_PERSIST_ENTERPRISE`
pub const CRED_PERSIST_ENTERPRISE: u32 = 3;
/// `CRED_MAX_CREDENTIAL_BLOB_SIZE`, in bytes.
pub const CRED_MAX_CREDENTIAL_BLOB_SIZE: u32 = 5 * 512;
/// `ERROR_NOT_FOUND`
pub const ERROR_NOT_FOUND: i32 = 1168;

/// `FILETIME`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FileTime {
    pub low_date_time: u32,
    pub high_date_time: u32,
}

/// `CREDENTIALW`, field for field.
///
/// | field             | native type              |
/// |-------------------|--------------------------|
/// | `flags`           | `DWORD`                  |
/// | `kind`            | `DWORD`                  |
/// | `target_name`     | `LPWSTR`                 |
/// | `comment`         | `LPWSTR`                 |
/// | `last_written`    | `FILETIME`               |
/// | `blob_size`       | `DWORD`                  |
/// | `blob`            | `LPBYTE`                 |
/// | `persist`         | `DWORD`                  |
/// | `attribute_count` | `DWORD`                  |
/// | `attributes`      | `PCREDENTIAL_ATTRIBUTEW` |
/// | `target_alias`    | `LPWSTR`                 |
/// | `user_name`       | `LPWSTR`                 |
///
/// `blob_size` must always equal the number of readable bytes at `blob`.
#[repr(C)]
#[derive(Debug)]
pub struct NativeCredential {
    pub flags: u32,
    pub kind: u32,
    pub target_name: *mut u16,
    pub comment: *mut u16,
    pub last_written: FileTime,
    pub blob_size: u32,
    pub blob: *mut u8,
    pub persist: u32,
    pub attribute_count: u32,
    pub attributes: *mut c_void,
    pub target_alias: *mut u16,
    pub user_name: *mut u16,
}

impl NativeCredential {
    /// Builds a generic credential record borrowing `target`, `user_name`
    /// and `blob`.
    ///
    /// The record holds raw pointers into its arguments, so it must not be
    /// passed to the native side after any of them is dropped.
    ///
    /// # Arguments
    ///
    /// * `target` - The target name the credential is stored under.
    /// * `user_name` - The `UserName` field of the record.
    /// * `blob` - The credential value.
    /// * `persist` - One of the `CRED_PERSIST_*` values.
    pub fn generic(
        target: &WideCString,
        user_name: &WideCString,
        blob: &CredentialBlob<'_>,
        persist: u32,
    ) -> Self {
        Self {
            flags: 0,
            kind: CRED_TYPE_GENERIC,
            // `CredWriteW` takes mutable pointers but never writes through them
            target_name: target.as_ptr().cast_mut(),
            comment: ptr::null_mut(),
            last_written: FileTime::default(),
            blob_size: blob.size(),
            blob: blob.as_ptr().cast_mut(),
            persist,
            attribute_count: 0,
            attributes: ptr::null_mut(),
            target_alias: ptr::null_mut(),
            user_name: user_name.as_ptr().cast_mut(),
        }
    }

    /// Views the blob as a byte slice of exactly `blob_size` bytes.
    ///
    /// # Safety
    /// The record must come from the native store (or [`Self::generic`]) and
    /// still be alive, so that `blob` is readable for `blob_size` bytes.
    ///
    /// # Returns
    ///
    /// * A result containing the blob on success, or an `InvalidData` error
    ///   if a non-empty blob has a null pointer.
    pub unsafe fn blob(&self) -> io::Result<&[u8]> {
        match (self.blob_size, self.blob.is_null()) {
            (0, _) => Ok(&[]),
            (_, true) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "credential blob pointer is null",
            )),
            (len, false) => Ok(slice::from_raw_parts(self.blob, len as usize)),
        }
    }
}

/// A credential value checked against the native size limit.
#[derive(Debug, Clone, Copy)]
pub struct CredentialBlob<'a> {
    bytes: &'a [u8],
}

impl<'a> CredentialBlob<'a> {
    pub const MAX_SIZE: usize = CRED_MAX_CREDENTIAL_BLOB_SIZE as usize;

    /// Wraps a credential value.
    ///
    /// # Arguments
    ///
    /// * `bytes` - The value to store.
    ///
    /// # Returns
    ///
    /// * The blob, or `None` if `bytes` exceeds [`Self::MAX_SIZE`].
    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        (bytes.len() <= Self::MAX_SIZE).then_some(Self { bytes })
    }

    /// Length as the record's `DWORD` field.
    #[inline]
    pub fn size(&self) -> u32 {
        // MAX_SIZE fits in a u32, checked in `new`
        self.bytes.len() as u32
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        match self.bytes.is_empty() {
            true => ptr::null(),
            false => self.bytes.as_ptr(),
        }
    }
}

/// The four `advapi32` credential entry points.
///
/// Each method mirrors one native call, mapping a `FALSE` return to the
/// thread's last OS error.
pub trait CredentialApi {
    /// Reads a credential from the user's store.
    ///
    /// Wraps the `CredReadW` call. The returned record must be released
    /// with [`CredentialApi::cred_free`], see [`CredentialGuard`].
    ///
    /// # Arguments
    ///
    /// * `target` - The null-terminated UTF-16 target name.
    /// * `kind` - The credential type, `CRED_TYPE_GENERIC` here.
    ///
    /// # Returns
    ///
    /// * A result containing a non-null pointer to the native record on
    ///   success, or an I/O error carrying the OS code on failure.
    ///
    /// # Safety
    /// `target` must point to a null-terminated UTF-16 string.
    unsafe fn cred_read(&self, target: *const u16, kind: u32)
        -> io::Result<NonNull<NativeCredential>>;

    /// Creates or replaces a credential.
    ///
    /// Wraps the `CredWriteW` call.
    ///
    /// # Arguments
    ///
    /// * `credential` - The record to write, see [`NativeCredential::generic`].
    ///
    /// # Returns
    ///
    /// * A result indicating success or an I/O error on failure.
    ///
    /// # Safety
    /// Every pointer in `credential` must be valid for its documented length.
    unsafe fn cred_write(&self, credential: &NativeCredential) -> io::Result<()>;

    /// Deletes a credential.
    ///
    /// Wraps the `CredDeleteW` call.
    ///
    /// # Arguments
    ///
    /// * `target` - The null-terminated UTF-16 target name.
    /// * `kind` - The credential type, `CRED_TYPE_GENERIC` here.
    ///
    /// # Returns
    ///
    /// * A result indicating success or an I/O error on failure.
    ///   `ERROR_NOT_FOUND` when no such credential exists.
    ///
    /// # Safety
    /// `target` must point to a null-terminated UTF-16 string.
    unsafe fn cred_delete(&self, target: *const u16, kind: u32) -> io::Result<()>;

    /// Releases a record returned by [`CredentialApi::cred_read`].
    ///
    /// Wraps the `CredFree` call.
    ///
    /// # Arguments
    ///
    /// * `credential` - The record to release.
    ///
    /// # Safety
    /// `credential` must come from [`CredentialApi::cred_read`] on the same
    /// API and must not be used afterwards.
    unsafe fn cred_free(&self, credential: NonNull<NativeCredential>);
}

impl<A: CredentialApi + ?Sized> CredentialApi for &A {
    unsafe fn cred_read(
        &self,
        target: *const u16,
        kind: u32,
    ) -> io::Result<NonNull<NativeCredential>> {
        (**self).cred_read(target, kind)
    }

    unsafe fn cred_write(&self, credential: &NativeCredential) -> io::Result<()> {
        (**self).cred_write(credential)
    }

    unsafe fn cred_delete(&self, target: *const u16, kind: u32) -> io::Result<()> {
        (**self).cred_delete(target, kind)
    }

    unsafe fn cred_free(&self, credential: NonNull<NativeCredential>) {
        (**self).cred_free(credential)
    }
}

/// A record returned by `CredReadW`, freed on drop.
pub struct CredentialGuard<'a, A: CredentialApi + ?Sized> {
    api: &'a A,
    credential: NonNull<NativeCredential>,
}

impl<'a, A: CredentialApi + ?Sized> CredentialGuard<'a, A> {
    /// Reads the generic credential named `target`.
    ///
    /// # Arguments
    ///
    /// * `api` - The entry points used for the read and the final free.
    /// * `target` - The target name.
    ///
    /// # Returns
    ///
    /// * A result containing the guarded record on success, or an I/O error
    ///   on failure. Nothing needs freeing on failure.
    pub fn read(api: &'a A, target: &WideCString) -> io::Result<Self> {
        let credential = unsafe { api.cred_read(target.as_ptr(), CRED_TYPE_GENERIC)? };
        Ok(Self { api, credential })
    }

    /// Borrows the blob; the slice cannot outlive the guard.
    ///
    /// # Returns
    ///
    /// * A result containing exactly `blob_size` bytes, or an `InvalidData`
    ///   error if the record has a null blob pointer.
    pub fn blob(&self) -> io::Result<&[u8]> {
        unsafe { self.credential.as_ref().blob() }
    }
}

impl<A: CredentialApi + ?Sized> Drop for CredentialGuard<'_, A> {
    fn drop(&mut self) {
        unsafe { self.api.cred_free(self.credential) };
    }
}

#[cfg(target_family = "windows")]
pub use self::advapi32::Advapi32;

#[cfg(target_family = "windows")]
mod advapi32 {
    use core::{
        mem,
        ptr::{self, NonNull},
    };
    use std::{io, sync::OnceLock};

    use windows_sys::Win32::{
        Foundation::HMODULE,
        System::LibraryLoader::{GetProcAddress, LoadLibraryW},
    };

    use super::{CredentialApi, NativeCredential};

    type CredReadW =
        unsafe extern "system" fn(*const u16, u32, u32, *mut *mut NativeCredential) -> i32;
    type CredWriteW = unsafe extern "system" fn(*const NativeCredential, u32) -> i32;
    type CredDeleteW = unsafe extern "system" fn(*const u16, u32, u32) -> i32;
    type CredFree = unsafe extern "system" fn(*const core::ffi::c_void);

    /// Entry points resolved by name from `advapi32.dll`.
    ///
    /// The library is loaded on first use and stays mapped for the lifetime
    /// of the process.
    pub struct Advapi32 {
        read: CredReadW,
        write: CredWriteW,
        delete: CredDeleteW,
        free: CredFree,
    }

    impl Advapi32 {
        /// Returns the process-wide binding, loading it if needed.
        ///
        /// A failed load is remembered and reported on every call.
        pub fn get() -> io::Result<&'static Self> {
            static ADVAPI32: OnceLock<Result<Advapi32, i32>> = OnceLock::new();

            match ADVAPI32.get_or_init(Self::load) {
                Ok(advapi32) => Ok(advapi32),
                Err(code) => Err(io::Error::from_raw_os_error(*code)),
            }
        }

        fn load() -> Result<Self, i32> {
            let name: Vec<u16> = "advapi32.dll\0".encode_utf16().collect();
            let module = unsafe { LoadLibraryW(name.as_ptr()) };
            if module.is_null() {
                return Err(last_error_code());
            }

            unsafe {
                Ok(Self {
                    read: mem::transmute(symbol(module, b"CredReadW\0")?),
                    write: mem::transmute(symbol(module, b"CredWriteW\0")?),
                    delete: mem::transmute(symbol(module, b"CredDeleteW\0")?),
                    free: mem::transmute(symbol(module, b"CredFree\0")?),
                })
            }
        }
    }

    /// Wraps `GetProcAddress`. `name` must be null-terminated.
    unsafe fn symbol(
        module: HMODULE,
        name: &[u8],
    ) -> Result<unsafe extern "system" fn() -> isize, i32> {
        GetProcAddress(module, name.as_ptr()).ok_or_else(last_error_code)
    }

    fn last_error_code() -> i32 {
        io::Error::last_os_error().raw_os_error().unwrap_or_default()
    }

    impl CredentialApi for Advapi32 {
        unsafe fn cred_read(
            &self,
            target: *const u16,
            kind: u32,
        ) -> io::Result<NonNull<NativeCredential>> {
            let mut credential = ptr::null_mut();
            match (self.read)(target, kind, 0, &mut credential) {
                0 => Err(io::Error::last_os_error()),
                _ => NonNull::new(credential).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidData, "CredReadW returned no record")
                }),
            }
        }

        unsafe fn cred_write(&self, credential: &NativeCredential) -> io::Result<()> {
            match (self.write)(credential, 0) {
                0 => Err(io::Error::last_os_error()),
                _ => Ok(()),
            }
        }

        unsafe fn cred_delete(&self, target: *const u16, kind: u32) -> io::Result<()> {
            match (self.delete)(target, kind, 0) {
                0 => Err(io::Error::last_os_error()),
                _ => Ok(()),
            }
        }

        unsafe fn cred_free(&self, credential: NonNull<NativeCredential>) {
            (self.free)(credential.as_ptr() as *const _);
        }
    }
}
