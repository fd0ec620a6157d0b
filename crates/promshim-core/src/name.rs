//! Free-form metric name -> exposition identifier.
//!
//! Call sites use human-friendly names (`audit.service`, `response-sizes`,
//! `Test.timer#a`); the exposition format only accepts `[a-zA-Z0-9_]` (plus
//! `:` which is reserved for recording rules and never produced here).
//!
//! Rules, applied per character:
//! - ASCII letters, digits and `_` are kept as-is (case preserved).
//! - Every other character becomes one `_`. Runs are not collapsed.
//!
//! The mapping is total: empty input yields an empty identifier and a leading
//! digit is left alone. Whether such an identifier is acceptable is decided by
//! the registry when the collector is registered.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

/// Identifier produced by [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NormalizedName(String);

impl NormalizedName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Join `prefix` and `self` with an underscore. Both sides are already
    /// normalized so the result is too.
    pub fn prefixed(&self, prefix: &NormalizedName) -> NormalizedName {
        let mut out = String::with_capacity(prefix.0.len() + 1 + self.0.len());
        out.push_str(&prefix.0);
        out.push('_');
        out.push_str(&self.0);
        NormalizedName(out)
    }
}

impl Deref for NormalizedName {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NormalizedName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NormalizedName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for NormalizedName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NormalizedName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<NormalizedName> for String {
    fn from(n: NormalizedName) -> Self {
        n.0
    }
}

/// Map a free-form name to an exposition identifier. Never fails.
pub fn normalize(raw: &str) -> NormalizedName {
    let out = raw
        .chars()
        .map(|c| if is_ident_char(c) { c } else { '_' })
        .collect();
    NormalizedName(out)
}

#[inline]
fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
