use core::fmt;

use crate::error::{Error, Result};

/// An owned, null-terminated UTF-16 string for the Windows wide-char APIs.
///
/// The buffer always ends with exactly one `0` unit and never contains an
/// interior one, so a pointer obtained from [`WideCString::as_ptr`] is a valid
/// `LPCWSTR` for as long as the value lives.
#[derive(Clone, PartialEq, Eq)]
pub struct WideCString {
    units: Vec<u16>,
}

impl WideCString {
    /// Encodes `value` as UTF-16 and appends the terminator.
    ///
    /// # Errors
    /// `InvalidInput` if `value` contains a NUL character, which the native
    /// side would read as the end of the string.
    pub fn new(value: &str) -> Result<Self> {
        if value.contains('\0') {
            return Err(Error::InvalidInput(format!(
                "{value:?} contains an embedded NUL character"
            )));
        }

        let mut units = Vec::with_capacity(value.len() + 1);
        units.extend(value.encode_utf16());
        units.push(0);
        Ok(Self { units })
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u16 {
        self.units.as_ptr()
    }

    /// Units without the terminator.
    #[inline]
    pub fn as_units(&self) -> &[u16] {
        &self.units[..self.units.len() - 1]
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(self.as_units())
    }
}

impl fmt::Debug for WideCString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_string_lossy(), f)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_terminated() {
        let wide = WideCString::new("app:token").unwrap();
        assert_eq!(wide.as_units().len(), 9);
        assert_eq!(unsafe { *wide.as_ptr().add(9) }, 0);
        assert_eq!(wide.to_string_lossy(), "app:token");
    }

    #[test]
    fn test_empty() {
        let wide = WideCString::new("").unwrap();
        assert!(wide.as_units().is_empty());
        assert_eq!(unsafe { *wide.as_ptr() }, 0);
    }

    #[test]
    fn test_surrogate_pairs() {
        let wide = WideCString::new("key-\u{1F511}").unwrap();
        assert_eq!(wide.as_units().len(), 6);
        assert_eq!(wide.to_string_lossy(), "key-\u{1F511}");
    }

    #[test]
    fn test_rejects_embedded_nul() {
        for value in ["\0", "to\0ken", "token\0"] {
            assert!(matches!(
                WideCString::new(value),
                Err(Error::InvalidInput(_))
            ));
        }
    }

    proptest! {
        #[test]
        fn prop_encoding_is_lossless(value in "[^\\x00]*") {
            let wide = WideCString::new(&value).unwrap();
            prop_assert!(!wide.as_units().contains(&0));
            prop_assert_eq!(unsafe { *wide.as_ptr().add(wide.as_units().len()) }, 0);
            prop_assert_eq!(wide.to_string_lossy(), value);
        }
    }
}
