//! Core types: Symbol, Timestamp, trading-pair naming.

use std::fmt;

/// Wall-clock instant of a price observation (exchange local time, no zone).
pub type Timestamp = chrono::NaiveDateTime;

/// Asset code stored inline (max 8 bytes), e.g. `THB`, `BTC`, `SAND`.
///
/// `Copy` and hashable so it can key hot-path maps without allocation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Symbol {
    len: u8,
    bytes: [u8; Symbol::MAX_LEN],
}

impl Symbol {
    /// Maximum encoded length in bytes.
    pub const MAX_LEN: usize = 8;

    /// Create a symbol, returning `None` if `s` is empty or longer than 8 bytes.
    pub fn try_new(s: &str) -> Option<Self> {
        let raw = s.as_bytes();
        if raw.is_empty() || raw.len() > Self::MAX_LEN {
            return None;
        }
        let mut bytes = [0u8; Self::MAX_LEN];
        bytes[..raw.len()].copy_from_slice(raw);
        Some(Self {
            len: raw.len() as u8,
            bytes,
        })
    }

    /// Create a symbol from a literal.
    ///
    /// # Panics
    ///
    /// Panics if `s` is empty or longer than 8 bytes. Use [`Symbol::try_new`]
    /// for untrusted input.
    #[track_caller]
    pub fn new(s: &str) -> Self {
        match Self::try_new(s) {
            Some(sym) => sym,
            None => panic!("invalid symbol {s:?}: must be 1..=8 bytes"),
        }
    }

    /// The symbol as a string slice.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.as_str())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Symbol {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Symbol::try_new(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid symbol {s:?}")))
    }
}

/// Exchange pair name for an asset quoted in `cash`, e.g. `THB_BTC`.
pub fn pair_name(cash: Symbol, asset: Symbol) -> String {
    format!("{cash}_{asset}")
}

/// Split a `<CASH>_<ASSET>` pair name. Returns `None` for anything else.
pub fn parse_pair(name: &str) -> Option<(Symbol, Symbol)> {
    let (cash, asset) = name.split_once('_')?;
    Some((Symbol::try_new(cash)?, Symbol::try_new(asset)?))
}
