//! Fixed-length framing for TCP streams.
//!
//! Every message on the wire is exactly [`FRAME_LEN`] bytes:
//!
//! ```text
//! +--------+-----------------------+
//! | type   |   payload             |
//! | 1 byte |   4 bytes             |
//! +--------+-----------------------+
//! ```
//!
//! There is no length prefix or delimiter. A reader that sees EOF before the
//! first byte of a frame reports an orderly close; EOF partway through a
//! frame is reported as truncation.

use std::fmt::Write as _;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Size of every message on the wire.
pub const FRAME_LEN: usize = 5;

/// One raw wire message.
pub type Frame = [u8; FRAME_LEN];

/// Errors that can occur during framing operations.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The peer closed the connection on a frame boundary.
    #[error("connection closed")]
    ConnectionClosed,

    /// The peer closed the connection partway through a frame.
    #[error("connection closed after {received} of {} frame bytes", FRAME_LEN)]
    Truncated {
        /// Bytes of the incomplete frame that did arrive.
        received: usize,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read exactly one frame from the stream.
pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Frame, FrameError> {
    let mut frame = [0u8; FRAME_LEN];
    let mut filled = 0;

    while filled < FRAME_LEN {
        let n = reader.read(&mut frame[filled..]).await?;
        if n == 0 {
            return Err(if filled == 0 {
                FrameError::ConnectionClosed
            } else {
                FrameError::Truncated { received: filled }
            });
        }
        filled += n;
    }

    Ok(frame)
}

/// Write one frame and flush it.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    frame: &Frame,
) -> Result<(), FrameError> {
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Space-separated lowercase hex, e.g. `"02 00 01 03 03"`.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out
}
