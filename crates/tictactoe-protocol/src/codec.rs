//! Tokio codec for the tic-tac-toe line protocol.
//!
//! This module provides a Tokio-compatible codec that frames the server's
//! newline-terminated lines and writes the client's `|`-terminated commands,
//! for use with `FramedRead`/`FramedWrite`.
//!
//! # Overview
//!
//! ```text
//! TCP Stream -> Decoder -> InboundFrame (one line, or an oversized marker)
//! Command -> Encoder -> TCP Stream (wire text as is, `|` included)
//! ```
//!
//! The two directions are framed differently because the server splits its
//! input on `|` while terminating its own output with `\n`.
//!
//! # Oversized Lines
//!
//! A line longer than [`MAX_LINE_LENGTH`] characters is not an error: the
//! decoder discards it up to the next newline and yields
//! [`InboundFrame::Oversized`]. At most four bytes per allowed character are
//! buffered while waiting for a newline. Returning an error instead would end
//! the `FramedRead` stream, and the listener must keep reading after a bad
//! line.
//!
//! # Usage with Tokio Framed
//!
//! ```rust,no_run
//! use tokio::net::TcpStream;
//! use tokio_util::codec::FramedRead;
//! use tictactoe_protocol::{InboundFrame, LineCodec};
//! use futures::StreamExt;
//!
//! # async fn example() -> tictactoe_core::Result<()> {
//! let stream = TcpStream::connect("127.0.0.1:10000").await?;
//! let mut lines = FramedRead::new(stream, LineCodec::new());
//!
//! while let Some(frame) = lines.next().await {
//!     match frame? {
//!         InboundFrame::Line(line) => println!("line: {line}"),
//!         InboundFrame::Oversized { length } => println!("dropped {length} bytes"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::Command;
use tictactoe_core::{
    Error, Result,
    constants::{LINE_END, MAX_LINE_LENGTH},
};

/// Longest UTF-8 encoding of a single character.
const MAX_CHAR_BYTES: usize = 4;

/// One decoded unit of the inbound stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// A complete line without its terminator (`\n` or `\r\n`).
    ///
    /// Invalid UTF-8 is replaced rather than rejected; such lines fail
    /// decoding later and are counted like any other malformed line.
    Line(String),

    /// A line that exceeded the maximum length and was discarded.
    Oversized {
        /// Length of the discarded line in bytes.
        length: usize,
    },
}

/// Line framing codec.
///
/// # Example
///
/// ```
/// use bytes::BytesMut;
/// use tokio_util::codec::Decoder;
/// use tictactoe_protocol::{InboundFrame, LineCodec};
///
/// let mut codec = LineCodec::new();
/// let mut buffer = BytesMut::from(&b"PING;\nSTATUS;"[..]);
///
/// assert_eq!(
///     codec.decode(&mut buffer).unwrap(),
///     Some(InboundFrame::Line("PING;".to_string()))
/// );
/// assert_eq!(codec.decode(&mut buffer).unwrap(), None);
/// ```
#[derive(Debug)]
pub struct LineCodec {
    /// Maximum accepted line length in characters, terminator excluded.
    max_length: usize,

    /// Index up to which the buffer was already scanned for a newline.
    next_index: usize,

    /// Bytes dropped so far from an oversized line still being discarded.
    discarding: Option<usize>,
}

impl LineCodec {
    /// Create a codec with the protocol's 300 character limit.
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LENGTH)
    }

    /// Create a codec with a custom line length limit.
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: None,
        }
    }

    /// Get the current maximum line length.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Bytes a line within the limit can occupy.
    fn byte_budget(&self) -> usize {
        self.max_length.saturating_mul(MAX_CHAR_BYTES)
    }

    fn finish_line(&self, raw: &[u8]) -> InboundFrame {
        let line = raw.strip_suffix(b"\r").unwrap_or(raw);
        if line.len() <= self.max_length {
            return InboundFrame::Line(String::from_utf8_lossy(line).into_owned());
        }

        let text = String::from_utf8_lossy(line);
        if text.chars().count() > self.max_length {
            InboundFrame::Oversized { length: line.len() }
        } else {
            InboundFrame::Line(text.into_owned())
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = InboundFrame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(discarded) = self.discarding {
            return match src.iter().position(|b| *b == LINE_END) {
                Some(offset) => {
                    src.advance(offset + 1);
                    self.discarding = None;
                    Ok(Some(InboundFrame::Oversized {
                        length: discarded + offset,
                    }))
                }
                None => {
                    self.discarding = Some(discarded + src.len());
                    src.clear();
                    Ok(None)
                }
            };
        }

        let scan_from = self.next_index.min(src.len());
        match src[scan_from..].iter().position(|b| *b == LINE_END) {
            Some(offset) => {
                let end = scan_from + offset;
                let raw = src.split_to(end + 1);
                self.next_index = 0;
                Ok(Some(self.finish_line(&raw[..end])))
            }
            // One extra byte of slack for a trailing '\r'
            None if src.len() > self.byte_budget() + 1 => {
                self.discarding = Some(src.len());
                self.next_index = 0;
                src.clear();
                Ok(None)
            }
            None => {
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }

        if let Some(discarded) = self.discarding.take() {
            return Ok(Some(InboundFrame::Oversized { length: discarded }));
        }

        if src.is_empty() {
            return Ok(None);
        }

        // Unterminated final line
        let raw = src.split_to(src.len());
        self.next_index = 0;
        Ok(Some(self.finish_line(&raw)))
    }
}

impl Encoder<Command> for LineCodec {
    type Error = Error;

    /// Write the command's wire text. No newline is appended.
    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<()> {
        dst.extend_from_slice(item.encode().as_bytes());
        Ok(())
    }
}
