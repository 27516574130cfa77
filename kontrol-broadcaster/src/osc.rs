//! OSC 1.0 message writer and reader
//!
//! Messages are written straight into a [`Frame`]: address, type tag string,
//! then big-endian arguments, every field zero padded to a 4-byte boundary.

use crate::error::{DecodeError, EncodeError};
use crate::frame::Frame;

/// Argument for an outgoing message
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arg<'a> {
    Int(i32),
    Float(f32),
    Str(&'a str),
    Bool(bool),
}

impl Arg<'_> {
    fn tag(&self) -> u8 {
        match self {
            Arg::Int(_) => b'i',
            Arg::Float(_) => b'f',
            Arg::Str(_) => b's',
            Arg::Bool(true) => b'T',
            Arg::Bool(false) => b'F',
        }
    }
}

/// Argument of a decoded message
#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    Int(i32),
    Float(f32),
    Str(String),
    Bool(bool),
}

impl OscArg {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            OscArg::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            OscArg::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OscArg::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OscArg::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

/// Padding needed to bring `len` to a 4-byte boundary
fn pad_len(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// Encoded size of `s` as an OSC string (NUL terminated, padded)
fn osc_str_len(s: &str) -> usize {
    let n = s.len() + 1;
    n + pad_len(n)
}

/// Exact encoded size of a message
pub fn encoded_len(address: &str, args: &[Arg<'_>]) -> usize {
    let tags = 1 + args.len();
    let tag_len = tags + 1 + pad_len(tags + 1);
    let payload: usize = args
        .iter()
        .map(|arg| match arg {
            Arg::Int(_) | Arg::Float(_) => 4,
            Arg::Str(s) => osc_str_len(s),
            Arg::Bool(_) => 0,
        })
        .sum();
    osc_str_len(address) + tag_len + payload
}

fn write_str(frame: &mut Frame, s: &str) -> Result<(), EncodeError> {
    if s.as_bytes().contains(&0) {
        return Err(EncodeError::InvalidString(s.to_string()));
    }
    frame.extend(s.as_bytes())?;
    let n = s.len() + 1;
    frame.pad(1 + pad_len(n))
}

/// Encode one message into a fresh frame.
///
/// The full size is checked before anything is written, so an oversized
/// message fails with [`EncodeError::FrameOverflow`] rather than being cut.
pub fn encode_message(address: &str, args: &[Arg<'_>]) -> Result<Frame, EncodeError> {
    let needed = encoded_len(address, args);
    if needed > crate::frame::MAX_OSC_MESSAGE_SIZE {
        return Err(EncodeError::FrameOverflow {
            needed,
            capacity: crate::frame::MAX_OSC_MESSAGE_SIZE,
        });
    }

    let mut frame = Frame::new();
    write_str(&mut frame, address)?;

    let mut tags = Vec::with_capacity(args.len() + 1);
    tags.push(b',');
    tags.extend(args.iter().map(Arg::tag));
    frame.extend(&tags)?;
    frame.pad(1 + pad_len(tags.len() + 1))?;

    for arg in args {
        match arg {
            Arg::Int(v) => frame.extend(&v.to_be_bytes())?,
            Arg::Float(v) => frame.extend(&v.to_be_bytes())?,
            Arg::Str(s) => write_str(&mut frame, s)?,
            Arg::Bool(_) => {}
        }
    }
    Ok(frame)
}

/// A decoded OSC message
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    pub address: String,
    pub args: Vec<OscArg>,
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn read_str(&mut self) -> Result<&'a str, DecodeError> {
        let data: &'a [u8] = self.data;
        let rest = &data[self.pos..];
        let nul = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(DecodeError::Truncated(self.data.len()))?;
        let s = std::str::from_utf8(&rest[..nul])
            .map_err(|e| DecodeError::Malformed(format!("invalid utf-8 at {}: {}", self.pos, e)))?;
        let advance = nul + 1 + pad_len(nul + 1);
        if self.pos + advance > self.data.len() {
            return Err(DecodeError::Truncated(self.data.len()));
        }
        self.pos += advance;
        Ok(s)
    }

    fn read_word(&mut self) -> Result<[u8; 4], DecodeError> {
        let end = self.pos + 4;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or(DecodeError::Truncated(self.pos))?;
        self.pos = end;
        let mut word = [0u8; 4];
        word.copy_from_slice(bytes);
        Ok(word)
    }
}

impl OscMessage {
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader { data, pos: 0 };

        let address = reader.read_str()?;
        if !address.starts_with('/') {
            return Err(DecodeError::Malformed(format!("bad address {:?}", address)));
        }

        let tags = reader.read_str()?;
        let tags = tags
            .strip_prefix(',')
            .ok_or_else(|| DecodeError::Malformed("missing type tag string".to_string()))?;

        let mut args = Vec::with_capacity(tags.len());
        for tag in tags.chars() {
            let arg = match tag {
                'i' => OscArg::Int(i32::from_be_bytes(reader.read_word()?)),
                'f' => OscArg::Float(f32::from_be_bytes(reader.read_word()?)),
                's' => OscArg::Str(reader.read_str()?.to_string()),
                'T' => OscArg::Bool(true),
                'F' => OscArg::Bool(false),
                other => return Err(DecodeError::UnsupportedTag(other)),
            };
            args.push(arg);
        }

        Ok(Self {
            address: address.to_string(),
            args,
        })
    }
}
