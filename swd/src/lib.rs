//! # `swd`
//!
//! A decoder for the ARM Serial Wire Debug (SWD) bit-serial protocol,
//! per the ARM Debug Interface v5.2 (ARM IHI 0031C) and v6 (ARM IHI
//! 0074D) architecture specifications. Any references in this code base
//! refer to one of these two documents.
//!
//! The crate is sans-I/O: it never owns sample storage. A host supplies
//! two [`ChannelReader`]s (one for SWCLK, one for SWDIO) and drives a
//! [`Decoder`] to pull out [`DecodedFrame`]s, one per recognized
//! framing — a line reset, a protocol-switch sequence, a dormant-state
//! selection handshake, or a complete SWD read/write transaction.
//!
//! Usage is simple:
//! ```
//! use swd::{Decoder, Settings};
//! use swd::sim::bit_trace;
//!
//! let bits = [true; 60]; // a line reset
//! let (clk, dio) = bit_trace(&bits, 4);
//! let settings = Settings::default();
//! let mut decoder = Decoder::new(clk, dio, settings.initial_context()).unwrap();
//! while let Some(frame) = decoder.next_frame().unwrap() {
//!     let _ = frame;
//! }
//! ```
#![deny(rustdoc::broken_intra_doc_links)]

mod bit;
mod buffer;
mod channel;
mod context;
mod decoder;
mod error;
mod frame;
mod iter;
mod pattern;
mod register;
mod sequence;
mod settings;
pub mod sim;

pub use bit::{BitLevel, SwdBit};
pub use buffer::BitBuffer;
pub use channel::{ChannelReader, Sampler};
pub use context::{Ack, AdiContext, CswAddrInc, CswSize, DpVersion, FrameKind, Protocol};
pub use decoder::{DecodedFrame, Decoder};
pub use error::DecoderError;
pub use frame::{Frame, FrameV2, Marker, MarkerKind, FLAG_DEPRECATED, FLAG_IS_ACCESS_PORT, FLAG_IS_READ};
pub use iter::Frames;
pub use pattern::CmpState;
pub use register::{describe_fields, ApRegister, DpRegister, Register};
pub use settings::Settings;
