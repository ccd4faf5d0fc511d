//! Frame codec
//!
//! Length-delimited JSON frames for use with `tokio_util::codec::Framed`.
//!
//! ```text
//! ┌──────────────┬─────────────────────────────┐
//! │ len: u32 BE  │ JSON-encoded WireFrame      │
//! └──────────────┴─────────────────────────────┘
//! ```
//!
//! A frame whose JSON does not decode is logged and skipped; the length
//! prefix keeps the stream aligned so the connection survives it.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};
use tracing::warn;

use super::error::ProtocolError;
use super::WireFrame;

/// Largest accepted frame body
pub const MAX_FRAME_LENGTH: usize = 64 * 1024;

/// Codec for [`WireFrame`]s
#[derive(Debug)]
pub struct WireCodec {
    inner: LengthDelimitedCodec,
    skipped: u64,
}

impl WireCodec {
    /// Create a codec with the default frame limit
    pub fn new() -> Self {
        Self {
            inner: LengthDelimitedCodec::builder()
                .max_frame_length(MAX_FRAME_LENGTH)
                .new_codec(),
            skipped: 0,
        }
    }

    /// Frames dropped because their JSON did not decode
    pub fn skipped_frames(&self) -> u64 {
        self.skipped
    }
}

impl Default for WireCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for WireCodec {
    type Item = WireFrame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(body) = self.inner.decode(src)? else {
                return Ok(None);
            };

            match serde_json::from_slice::<WireFrame>(&body) {
                Ok(frame) => return Ok(Some(frame)),
                Err(e) => {
                    self.skipped += 1;
                    warn!(
                        "Skipping undecodable frame ({} bytes): {} ({} skipped total)",
                        body.len(),
                        e,
                        self.skipped
                    );
                }
            }
        }
    }
}

impl Encoder<WireFrame> for WireCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: WireFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = serde_json::to_vec(&frame)?;
        self.inner.encode(Bytes::from(body), dst)?;
        Ok(())
    }
}
