use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Interned `"page:serial"` strings. Entries are never released, so the table
/// grows by one string per object created in the process.
static IDS: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Identifier of a host-native object (`"0:12"` style, like the design tool's
/// own node IDs). Internally a `Spur` index: 4 bytes, Copy, O(1) Eq and Hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostId(Spur);

impl HostId {
    pub fn intern(s: &str) -> Self {
        HostId(IDS.get_or_intern(s))
    }

    pub fn as_str(&self) -> &str {
        IDS.resolve(&self.0)
    }

    /// Allocate a fresh ID under `page` (e.g. `0:17`). Serials are shared by
    /// every host in the process.
    pub fn next(page: u32) -> Self {
        static SERIAL: AtomicU64 = AtomicU64::new(1);
        let serial = SERIAL.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{page}:{serial}"))
    }
}

impl fmt::Debug for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for HostId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HostId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(HostId::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = HostId::intern("0:1");
        let b = HostId::intern("0:1");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "0:1");
    }

    #[test]
    fn fresh_ids_are_unique() {
        let a = HostId::next(3);
        let b = HostId::next(3);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("3:"));
        assert_eq!(HostId::intern(a.as_str()), a);
    }
}
