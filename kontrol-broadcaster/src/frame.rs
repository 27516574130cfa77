//! Fixed-capacity outbound packets
//!
//! Sizes are protocol limits: a frame never grows past
//! [`MAX_OSC_MESSAGE_SIZE`] and one event never produces more than
//! [`MAX_N_OSC_MSGS`] frames. Exceeding either is an [`EncodeError`].

use crate::error::EncodeError;
use std::fmt;

/// Maximum encoded size of one OSC message, in bytes
pub const MAX_OSC_MESSAGE_SIZE: usize = 512;

/// Maximum number of messages produced by a single event
pub const MAX_N_OSC_MSGS: usize = 128;

/// One wire packet ready for transmission
#[derive(Clone)]
pub struct Frame {
    len: usize,
    bytes: [u8; MAX_OSC_MESSAGE_SIZE],
}

impl Frame {
    pub fn new() -> Self {
        Self {
            len: 0,
            bytes: [0; MAX_OSC_MESSAGE_SIZE],
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Append `data`, or fail without writing anything if it does not fit
    pub fn extend(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        let end = self.len + data.len();
        if end > MAX_OSC_MESSAGE_SIZE {
            return Err(EncodeError::FrameOverflow {
                needed: end,
                capacity: MAX_OSC_MESSAGE_SIZE,
            });
        }
        self.bytes[self.len..end].copy_from_slice(data);
        self.len = end;
        Ok(())
    }

    /// Append `count` zero bytes
    pub fn pad(&mut self, count: usize) -> Result<(), EncodeError> {
        const ZEROS: [u8; 4] = [0; 4];
        let mut left = count;
        while left > 0 {
            let n = left.min(ZEROS.len());
            self.extend(&ZEROS[..n])?;
            left -= n;
        }
        Ok(())
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Frame {}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame").field("len", &self.len).finish()
    }
}

/// Ordered frames produced by one event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameBatch {
    frames: Vec<Frame>,
}

impl FrameBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(frame: Frame) -> Self {
        Self { frames: vec![frame] }
    }

    pub fn push(&mut self, frame: Frame) -> Result<(), EncodeError> {
        if self.frames.len() >= MAX_N_OSC_MSGS {
            return Err(EncodeError::BatchOverflow {
                needed: self.frames.len() + 1,
                capacity: MAX_N_OSC_MSGS,
            });
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

impl IntoIterator for FrameBatch {
    type Item = Frame;
    type IntoIter = std::vec::IntoIter<Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_up_to_capacity() {
        let mut frame = Frame::new();
        frame.extend(&[1u8; MAX_OSC_MESSAGE_SIZE - 4]).unwrap();
        frame.extend(&[2u8; 4]).unwrap();
        assert_eq!(frame.len(), MAX_OSC_MESSAGE_SIZE);
    }

    #[test]
    fn test_overflow_leaves_frame_untouched() {
        let mut frame = Frame::new();
        frame.extend(&[7u8; 500]).unwrap();

        let err = frame.extend(&[9u8; 13]).unwrap_err();
        assert_eq!(
            err,
            EncodeError::FrameOverflow {
                needed: 513,
                capacity: MAX_OSC_MESSAGE_SIZE
            }
        );
        assert_eq!(frame.len(), 500);
        assert!(frame.as_bytes().iter().all(|b| *b == 7));
    }

    #[test]
    fn test_batch_capacity() {
        let mut batch = FrameBatch::new();
        for _ in 0..MAX_N_OSC_MSGS {
            batch.push(Frame::new()).unwrap();
        }
        assert!(matches!(
            batch.push(Frame::new()),
            Err(EncodeError::BatchOverflow { needed: 129, capacity: 128 })
        ));
        assert_eq!(batch.len(), MAX_N_OSC_MSGS);
    }
}
