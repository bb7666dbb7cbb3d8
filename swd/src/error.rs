//! Errors that can terminate the decode loop outright.
//!
//! Per the core's error-handling design (spec §7), protocol-level
//! misframing, parity failures, invalid ACKs and unknown registers are
//! never fatal and never reach this type — they surface only as
//! [`FrameKind::Error`](crate::context::FrameKind::Error) /
//! [`FrameKind::Ignored`](crate::context::FrameKind::Ignored) frames.
//! `DecoderError` exists for the one condition that really does unwind
//! the worker: the channel readers running out of stream.

/// Set of errors that can occur during decode.
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    /// A channel reader could not advance to the next edge or to an
    /// absolute sample position; the underlying capture is exhausted.
    #[error("channel reader exhausted before completing a bit")]
    ChannelExhausted,

    /// The settings archive could not be parsed.
    #[error("malformed settings archive: {0}")]
    MalformedSettings(String),
}
