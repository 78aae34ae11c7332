//! Raw bindings to the native credential stores.
//!
//! Every pointer dereference and length computation crossing an OS boundary
//! lives in this module; the adapters in `store` only see safe wrappers.

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "macos")]
pub mod macos;
pub mod windows;
