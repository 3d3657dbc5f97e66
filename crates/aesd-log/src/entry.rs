//! A single stored record

use bytes::Bytes;

/// One resident record: its bytes and their length.
///
/// The bytes are immutable once written. Cloning an `Entry` shares the
/// underlying buffer rather than copying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    data: Bytes,
}

impl Entry {
    /// Wrap a complete record
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }

    /// Size of the record in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Refcounted view of `[offset, offset + max)` clipped to the record end.
    pub fn slice_from(&self, offset: usize, max: usize) -> Bytes {
        let start = offset.min(self.data.len());
        let end = start.saturating_add(max).min(self.data.len());
        self.data.slice(start..end)
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl From<&'static [u8]> for Entry {
    fn from(data: &'static [u8]) -> Self {
        Self::new(Bytes::from_static(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_matches_data() {
        let entry = Entry::from(&b"hello\n"[..]);
        assert_eq!(entry.size(), 6);
        assert_eq!(entry.as_slice(), b"hello\n");
    }

    #[test]
    fn test_slice_from_clips_to_end() {
        let entry = Entry::from(&b"abcdef\n"[..]);
        assert_eq!(&entry.slice_from(2, 3)[..], b"cde");
        assert_eq!(&entry.slice_from(4, 100)[..], b"ef\n");
        assert!(entry.slice_from(50, 4).is_empty());
    }
}
