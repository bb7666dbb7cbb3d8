//! The sans-I/O seam between the decoder core and a host logic-analyzer
//! framework.
//!
//! A [`ChannelReader`] models one edge-scanning channel (clock or data)
//! the way the host supplies it; the core never touches sample storage
//! directly. This mirrors the generic `R: Read` seam the teacher crate
//! uses to stay independent of where bytes come from, except here the
//! unit of work is an edge, not a byte.

use crate::bit::{BitLevel, SwdBit};
use crate::error::DecoderError;

/// A single logic-analyzer channel, advancing monotonically over
/// sample indices.
///
/// Implementors back this with real captured data; [`crate::sim`]
/// supplies a deterministic in-memory implementation for tests.
pub trait ChannelReader {
    /// The level currently under the read head.
    fn current_bit_state(&self) -> BitLevel;

    /// The sample index the read head currently sits at.
    fn sample_number(&self) -> u64;

    /// The sample index of the next edge (transition), without moving
    /// the read head.
    fn sample_of_next_edge(&self) -> Option<u64>;

    /// Move the read head to the next edge.
    fn advance_to_next_edge(&mut self) -> Result<(), DecoderError>;

    /// Move the read head to an absolute sample index (never backward).
    fn advance_to_abs_position(&mut self, sample: u64) -> Result<(), DecoderError>;
}

/// Pulls [`SwdBit`]s off a clock/data channel pair per the bit-sampler
/// contract of the core: seek past an initial clock-high, then for each
/// bit record `low_start`, sample the data line one tick before the
/// rising edge and again at the falling edge, and record the sample
/// index of the next clock-low.
pub struct Sampler<CLK, DIO> {
    clk: CLK,
    dio: DIO,
}

impl<CLK, DIO> Sampler<CLK, DIO>
where
    CLK: ChannelReader,
    DIO: ChannelReader,
{
    pub fn new(mut clk: CLK, mut dio: DIO) -> Result<Self, DecoderError> {
        if clk.current_bit_state().is_high() {
            clk.advance_to_next_edge()?;
            dio.advance_to_abs_position(clk.sample_number())?;
        }
        Ok(Sampler { clk, dio })
    }

    /// Read one SWD bit, advancing both channels past it.
    pub fn next_bit(&mut self) -> Result<SwdBit, DecoderError> {
        let low_start = self.clk.sample_number();

        let next_edge = self
            .clk
            .sample_of_next_edge()
            .ok_or(DecoderError::ChannelExhausted)?;
        self.clk.advance_to_abs_position(next_edge - 1)?;
        self.dio.advance_to_abs_position(self.clk.sample_number())?;
        let rising = self.clk.sample_number();
        let state_rising = self.dio.current_bit_state();

        self.clk.advance_to_next_edge()?;
        self.dio.advance_to_abs_position(self.clk.sample_number())?;

        self.clk.advance_to_next_edge()?;
        self.dio.advance_to_abs_position(self.clk.sample_number())?;
        let falling = self.clk.sample_number();
        let state_falling = self.dio.current_bit_state();

        let low_end = self
            .clk
            .sample_of_next_edge()
            .ok_or(DecoderError::ChannelExhausted)?;

        Ok(SwdBit {
            low_start,
            rising,
            falling,
            low_end,
            state_rising,
            state_falling,
        })
    }
}
