//! The two frame shapes committed to the result sink (spec §4.8/§6),
//! plus the per-bit clock markers.

use crate::context::FrameKind;
use crate::register::Register;

/// Legacy frame: packs a type-specific pair of integers the way the
/// original bubble-text renderer expects. Kept as an explicit struct
/// rather than a `{data1, data2}` blob — the fields still carry exactly
/// the per-type layout documented in spec §6, but each construction
/// site names what it is packing instead of reaching into a union.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    pub kind: FrameKind,
    pub start_sample: u64,
    pub end_sample: u64,
    pub flags: u8,
    pub data1: u64,
    pub data2: u64,
}

/// `REQUEST` frame flags (spec §6).
pub const FLAG_IS_READ: u8 = 1 << 0;
pub const FLAG_IS_ACCESS_PORT: u8 = 1 << 1;
/// `JTAG_TO_SWD`/`SWD_TO_JTAG` frame flag: the deprecated pattern matched.
pub const FLAG_DEPRECATED: u8 = 1 << 0;

/// Pack `{memaddr, prevReg, currReg}` into the 64-bit `data2` of a
/// RDATA/WDATA frame, the one place the legacy blob layout is
/// materialized (spec §9: "only the frame-emission step materializes
/// the 64-bit packing").
pub fn pack_data2(memaddr: u32, prev_reg: Register, curr_reg: Register) -> u64 {
    let prev = register_legacy_tag(prev_reg) as u64;
    let curr = register_legacy_tag(curr_reg) as u64;
    (memaddr as u64) | (prev << 32) | (curr << 48)
}

fn register_legacy_tag(reg: Register) -> u16 {
    // A stable small tag good enough for the legacy blob; the FrameV2
    // record below carries the real `Register` value for anything that
    // needs it.
    match reg {
        Register::Undefined => 0,
        Register::RazWi => 1,
        Register::Dp(r) => 0x1000 + r as u16,
        Register::Ap(_) => 0x2000,
    }
}

/// Semantic, named-attribute record (spec §4.8/§6 `FrameV2`).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameV2 {
    pub kind: FrameKind,
    pub start_sample: u64,
    pub end_sample: u64,
    pub ty: &'static str,
    pub cycles: Option<u32>,
    pub data: Option<u32>,
    pub rnw: Option<bool>,
    pub apndp: Option<bool>,
    pub reg: Option<Register>,
    pub ack: Option<u8>,
    pub apreg: Option<Register>,
    pub memaddr: Option<u32>,
}

impl FrameV2 {
    pub fn new(kind: FrameKind, ty: &'static str, start_sample: u64, end_sample: u64) -> Self {
        FrameV2 {
            kind,
            start_sample,
            end_sample,
            ty,
            cycles: None,
            data: None,
            rnw: None,
            apndp: None,
            reg: None,
            ack: None,
            apreg: None,
            memaddr: None,
        }
    }
}

/// The level a per-bit marker should render as, mirroring the
/// logic-analyzer host's `One`/`Zero`/`X` marker kinds (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MarkerKind {
    Zero,
    One,
    /// Turnaround: neither side drives the line.
    X,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Marker {
    pub sample: u64,
    pub kind: MarkerKind,
}
