//! A single sampled SWD bit and the sample-index arithmetic used to turn
//! a run of them into frame boundaries.

/// The level sampled on the data line at one of the two edges of a bit
/// cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BitLevel {
    Low,
    High,
}

impl BitLevel {
    pub fn is_high(self) -> bool {
        self == BitLevel::High
    }

    pub fn from_high(high: bool) -> Self {
        if high {
            BitLevel::High
        } else {
            BitLevel::Low
        }
    }
}

/// One bit pulled off the wire by the [bit sampler](crate::channel::Sampler).
///
/// Carries the four sample indices named in the sampling contract
/// (clock-low start, rising edge, falling edge, the next clock-low
/// start) plus the data-line level observed at each of the two edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwdBit {
    pub low_start: u64,
    pub rising: u64,
    pub falling: u64,
    pub low_end: u64,
    pub state_rising: BitLevel,
    pub state_falling: BitLevel,
}

impl SwdBit {
    /// The bit's logical value, sampled on the rising edge.
    pub fn is_high(&self) -> bool {
        self.state_rising.is_high()
    }

    /// The bit's logical value sampled on the edge the caller asks for;
    /// used by the transaction matcher when reading the falling-edge
    /// value of a write-direction bit.
    pub fn is_high_on(&self, rising: bool) -> bool {
        if rising {
            self.state_rising.is_high()
        } else {
            self.state_falling.is_high()
        }
    }

    /// Half of the narrower of the two surrounding low intervals; both
    /// the start and end sample are padded inward by this amount so
    /// that adjacent frames never overlap.
    fn min_start_end(&self) -> u64 {
        let s = (self.rising - self.low_start) / 2;
        let e = (self.low_end - self.falling) / 2;
        s.min(e)
    }

    pub fn start_sample(&self) -> u64 {
        self.rising - self.min_start_end() + 1
    }

    pub fn end_sample(&self) -> u64 {
        self.falling + self.min_start_end() - 1
    }
}
