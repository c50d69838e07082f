//! Identifier management using string interning for efficient storage and comparison
//!
//! This module provides the [`Id`] type with an efficient string-interner based approach.

use std::{
    fmt,
    sync::{Mutex, OnceLock},
};

use serde::{Serialize, Serializer};
use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Global string interner for efficient identifier storage.
///
/// # Thread Safety
///
/// This uses `Mutex` for thread-safe access to the string interner.
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn interner() -> &'static Mutex<DefaultStringInterner> {
    INTERNER.get_or_init(|| Mutex::new(DefaultStringInterner::new()))
}

/// Efficient identifier type using string interning
///
/// Identifiers are the currency of the layout core: every node and edge is
/// referenced by one, and change detection works on whole sets of them.
/// Interning makes them `Copy` with cheap equality and hashing.
///
/// # Examples
///
/// ```
/// use gimbal_core::identifier::Id;
///
/// let web = Id::new("web_app");
/// let same = Id::new("web_app");
/// assert_eq!(web, same);
/// assert_eq!(web.resolve(), "web_app");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Creates an `Id` from &str.
    pub fn new(name: &str) -> Self {
        let mut interner = interner().lock().expect("Failed to acquire interner lock");
        Self(interner.get_or_intern(name))
    }

    /// Returns the string this identifier was created from.
    pub fn resolve(&self) -> String {
        let interner = interner().lock().expect("Failed to acquire interner lock");
        interner
            .resolve(self.0)
            .expect("Interned symbol must resolve")
            .to_string()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resolve())
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self.resolve() == *other
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.resolve())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_interns_to_same_id() {
        let a = Id::new("payment_service");
        let b = Id::new("payment_service");
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_names_differ() {
        assert_ne!(Id::new("alpha"), Id::new("beta"));
    }

    #[test]
    fn test_resolve_round_trips() {
        let id = Id::new("api_gateway");
        assert_eq!(id.resolve(), "api_gateway");
        assert_eq!(id, "api_gateway");
    }

    #[test]
    fn test_display_matches_source_string() {
        let id = Id::from("browser");
        assert_eq!(format!("{id}"), "browser");
    }
}
