//! Deterministic in-memory [`ChannelReader`] for building test fixtures
//! without a real capture.
//!
//! A [`SimChannel`] is just a sorted list of "the level becomes `L`
//! starting at sample `S`" changes; [`bit_trace`] turns a slice of
//! logical bit values into a matching clock/data channel pair that
//! satisfies the sampling contract [`crate::channel::Sampler`] expects.

use crate::bit::BitLevel;
use crate::channel::ChannelReader;
use crate::error::DecoderError;

#[derive(Debug, Clone)]
pub struct SimChannel {
    initial: BitLevel,
    changes: Vec<(u64, BitLevel)>,
    pos: u64,
}

impl SimChannel {
    pub fn new(initial: BitLevel, changes: Vec<(u64, BitLevel)>) -> Self {
        SimChannel {
            initial,
            changes,
            pos: 0,
        }
    }

    fn level_at(&self, sample: u64) -> BitLevel {
        let mut level = self.initial;
        for &(s, l) in &self.changes {
            if s <= sample {
                level = l;
            } else {
                break;
            }
        }
        level
    }
}

impl ChannelReader for SimChannel {
    fn current_bit_state(&self) -> BitLevel {
        self.level_at(self.pos)
    }

    fn sample_number(&self) -> u64 {
        self.pos
    }

    fn sample_of_next_edge(&self) -> Option<u64> {
        self.changes.iter().map(|&(s, _)| s).find(|&s| s > self.pos)
    }

    fn advance_to_next_edge(&mut self) -> Result<(), DecoderError> {
        match self.sample_of_next_edge() {
            Some(s) => {
                self.pos = s;
                Ok(())
            }
            None => Err(DecoderError::ChannelExhausted),
        }
    }

    fn advance_to_abs_position(&mut self, sample: u64) -> Result<(), DecoderError> {
        self.pos = sample;
        Ok(())
    }
}

/// Build a clock/data channel pair encoding `bits` at `period` samples
/// per clock half-cycle (CLK starts low, as the sampler requires no
/// initial skip).
pub fn bit_trace(bits: &[bool], period: u64) -> (SimChannel, SimChannel) {
    assert!(period >= 2, "period must leave room for the dio settling offset");

    // One extra trailing edge beyond the last bit's falling edge: the
    // sampler peeks at `sample_of_next_edge` to record `low_end` even
    // for the final bit in the trace.
    let mut clk_changes = Vec::with_capacity(bits.len() * 2 + 1);
    for k in 1..=(bits.len() as u64 * 2 + 1) {
        let level = if k % 2 == 1 { BitLevel::High } else { BitLevel::Low };
        clk_changes.push((k * period, level));
    }
    let clk = SimChannel::new(BitLevel::Low, clk_changes);

    let initial_dio = BitLevel::from_high(bits.first().copied().unwrap_or(false));
    let mut dio_changes = Vec::with_capacity(bits.len());
    for (i, &b) in bits.iter().enumerate().skip(1) {
        dio_changes.push(((2 * i as u64) * period + 1, BitLevel::from_high(b)));
    }
    let dio = SimChannel::new(initial_dio, dio_changes);

    (clk, dio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Sampler;

    #[test]
    fn bit_trace_round_trips_through_sampler() {
        let bits = [true, false, true, true, false];
        let (clk, dio) = bit_trace(&bits, 4);
        let mut sampler = Sampler::new(clk, dio).unwrap();
        for &expected in &bits {
            let bit = sampler.next_bit().unwrap();
            assert_eq!(bit.is_high(), expected);
        }
    }
}
