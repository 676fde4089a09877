//! Raw transaction chunking.
//!
//! Raw bytes are stored as segments of at most [`TX_SEGMENT_SIZE`] bytes
//! and reassembled in index order.

use shared_types::TX_SEGMENT_SIZE;

/// Split `raw` into storage segments.
pub fn split(raw: &[u8]) -> Vec<&[u8]> {
    raw.chunks(TX_SEGMENT_SIZE).collect()
}

/// Concatenate segments read back in index order.
pub fn assemble<I, B>(segments: I) -> Vec<u8>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut raw = Vec::new();
    for segment in segments {
        raw.extend_from_slice(segment.as_ref());
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_at_segment_size() {
        let raw = vec![9u8; TX_SEGMENT_SIZE * 2 + 5];
        let segments = split(&raw);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].len(), TX_SEGMENT_SIZE);
        assert_eq!(segments[2].len(), 5);
        assert_eq!(assemble(segments), raw);
    }

    #[test]
    fn test_small_and_empty() {
        assert_eq!(split(b"abc").len(), 1);
        assert!(split(&[]).is_empty());
    }
}
