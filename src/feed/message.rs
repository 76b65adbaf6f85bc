//! Feed message type
//!
//! A message is one line read from the feed. The relay never looks inside it.

use bytes::Bytes;

/// One opaque line from the feed
///
/// Cheap to clone: every subscriber queue holding the message shares the same
/// `Bytes` allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Position of this line in the feed, starting at 1
    pub seq: u64,
    /// Line bytes, including the trailing newline when the feed supplied one
    pub data: Bytes,
}

impl Message {
    /// Create a message
    pub fn new(seq: u64, data: impl Into<Bytes>) -> Self {
        Self {
            seq,
            data: data.into(),
        }
    }

    /// Number of bytes in the line
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the line is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Line bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_shares_allocation() {
        let msg = Message::new(1, Bytes::from_static(b"!AIVDM,1,1,,A,13u?etPv2;0n:dDPwUM1U1Cb069D,0*23\n"));
        let copy = msg.clone();

        assert_eq!(msg.as_bytes().as_ptr(), copy.as_bytes().as_ptr());
        assert_eq!(copy.seq, 1);
    }

    #[test]
    fn test_message_len() {
        assert_eq!(Message::new(1, "A\n").len(), 2);
        assert!(Message::new(2, "").is_empty());
    }
}
