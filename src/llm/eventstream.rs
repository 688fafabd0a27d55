//! Decoder for the `application/vnd.amazon.eventstream` framing used by
//! Bedrock's streaming responses.
//!
//! Frame layout (all integers big-endian):
//!
//! ```text
//! total_len:u32 | headers_len:u32 | prelude_crc:u32 | headers | payload | message_crc:u32
//! ```

use std::collections::BTreeMap;
use thiserror::Error;

const PRELUDE_LEN: usize = 12;
const TRAILER_LEN: usize = 4;
const MIN_FRAME_LEN: usize = PRELUDE_LEN + TRAILER_LEN;
const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

const HEADER_STRING: u8 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame length {0} is out of range")]
    InvalidLength(usize),
    #[error("prelude checksum mismatch")]
    PreludeChecksum,
    #[error("message checksum mismatch")]
    MessageChecksum,
    #[error("malformed headers: {0}")]
    Headers(&'static str),
    #[error("stream ended inside a frame ({0} bytes left over)")]
    Truncated(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    headers: BTreeMap<String, String>,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Incremental decoder: feed raw body bytes as they arrive and drain
/// complete frames.
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    buffer: Vec<u8>,
}

impl EventStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        if self.buffer.len() < PRELUDE_LEN {
            return Ok(None);
        }

        let total_len = read_u32(&self.buffer[0..4]) as usize;
        let headers_len = read_u32(&self.buffer[4..8]) as usize;
        let prelude_crc = read_u32(&self.buffer[8..12]);

        if !(MIN_FRAME_LEN..=MAX_FRAME_LEN).contains(&total_len)
            || headers_len > total_len - MIN_FRAME_LEN
        {
            return Err(FrameError::InvalidLength(total_len));
        }
        if crc32(&self.buffer[0..8]) != prelude_crc {
            return Err(FrameError::PreludeChecksum);
        }
        if self.buffer.len() < total_len {
            return Ok(None);
        }

        let frame_bytes = self.buffer.drain(..total_len).collect::<Vec<_>>();
        let message_crc = read_u32(&frame_bytes[total_len - TRAILER_LEN..]);
        if crc32(&frame_bytes[..total_len - TRAILER_LEN]) != message_crc {
            return Err(FrameError::MessageChecksum);
        }

        let headers_end = PRELUDE_LEN + headers_len;
        let headers = parse_headers(&frame_bytes[PRELUDE_LEN..headers_end])?;
        let payload = frame_bytes[headers_end..total_len - TRAILER_LEN].to_vec();

        Ok(Some(Frame { headers, payload }))
    }

    /// Call once the body is exhausted; leftover bytes mean the stream was cut.
    pub fn finish(&self) -> Result<(), FrameError> {
        if self.buffer.is_empty() {
            Ok(())
        } else {
            Err(FrameError::Truncated(self.buffer.len()))
        }
    }
}

fn parse_headers(mut bytes: &[u8]) -> Result<BTreeMap<String, String>, FrameError> {
    let mut headers = BTreeMap::new();

    while !bytes.is_empty() {
        let name_len = usize::from(bytes[0]);
        let name = take(&mut bytes, 1, name_len)?;
        let name = String::from_utf8_lossy(name).into_owned();
        let value_type = *take(&mut bytes, 0, 1)?
            .first()
            .ok_or(FrameError::Headers("missing value type"))?;

        match value_type {
            0 | 1 => {}
            2 => skip(&mut bytes, 1)?,
            3 => skip(&mut bytes, 2)?,
            4 => skip(&mut bytes, 4)?,
            5 | 8 => skip(&mut bytes, 8)?,
            9 => skip(&mut bytes, 16)?,
            6 | HEADER_STRING => {
                let len_bytes = take(&mut bytes, 0, 2)?;
                let len = usize::from(u16::from_be_bytes([len_bytes[0], len_bytes[1]]));
                let value = take(&mut bytes, 0, len)?;
                if value_type == HEADER_STRING {
                    headers.insert(name, String::from_utf8_lossy(value).into_owned());
                }
            }
            _ => return Err(FrameError::Headers("unknown value type")),
        }
    }

    Ok(headers)
}

fn take<'a>(bytes: &mut &'a [u8], offset: usize, len: usize) -> Result<&'a [u8], FrameError> {
    let end = offset + len;
    if bytes.len() < end {
        return Err(FrameError::Headers("header runs past end of block"));
    }
    let (head, rest) = bytes.split_at(end);
    *bytes = rest;
    Ok(&head[offset..])
}

fn skip(bytes: &mut &[u8], len: usize) -> Result<(), FrameError> {
    take(bytes, 0, len).map(|_| ())
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

const CRC32_TABLE: [u32; 256] = crc32_table();

const fn crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 == 1 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

fn crc32(data: &[u8]) -> u32 {
    !data.iter().fold(!0u32, |crc, &byte| {
        CRC32_TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize] ^ (crc >> 8)
    })
}

/// Builds a single frame with string headers. Used to fake Bedrock bodies.
#[cfg(any(test, feature = "test-support"))]
pub fn encode_frame(headers: &[(&str, &str)], payload: &[u8]) -> Vec<u8> {
    let mut header_block = Vec::new();
    for (name, value) in headers {
        header_block.push(name.len() as u8);
        header_block.extend_from_slice(name.as_bytes());
        header_block.push(HEADER_STRING);
        header_block.extend_from_slice(&(value.len() as u16).to_be_bytes());
        header_block.extend_from_slice(value.as_bytes());
    }

    let total_len = MIN_FRAME_LEN + header_block.len() + payload.len();
    let mut frame = Vec::with_capacity(total_len);
    frame.extend_from_slice(&(total_len as u32).to_be_bytes());
    frame.extend_from_slice(&(header_block.len() as u32).to_be_bytes());
    let prelude_crc = crc32(&frame);
    frame.extend_from_slice(&prelude_crc.to_be_bytes());
    frame.extend_from_slice(&header_block);
    frame.extend_from_slice(payload);
    let message_crc = crc32(&frame);
    frame.extend_from_slice(&message_crc.to_be_bytes());
    frame
}
