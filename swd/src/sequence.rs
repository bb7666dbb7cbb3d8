//! The tagged `Sequence` union: one variant per SWD framing (spec §4.3,
//! §9 "replace deep inheritance with virtual dispatch … with a tagged-
//! union `Sequence`").
//!
//! Every variant exposes the same shape — `step` consumes whatever new
//! bits have appeared at the head of the shared [`BitBuffer`] since it
//! was last polled and returns the resulting [`CmpState`]; `reset`
//! clears it back to `Unknown` — so the decode loop in [`crate::decoder`]
//! can drive all twelve of them uniformly without a vtable.

use crate::bit::SwdBit;
use crate::buffer::BitBuffer;
use crate::context::{Ack, AdiContext, CswAddrInc, DpVersion, FrameKind, Protocol};
use crate::frame::{
    pack_data2, Frame, FrameV2, Marker, MarkerKind, FLAG_DEPRECATED, FLAG_IS_ACCESS_PORT, FLAG_IS_READ,
};
use crate::pattern::{CmpState, PlainBitSequence, UintSequence};
use crate::register::{self, ApRegister, DpRegister, Register};

/// Output of a winning matcher's commit step. Most matchers commit a
/// single frame; the transaction matcher commits the ordered run of
/// sub-frames the original renderer split a transaction into (request,
/// turnaround, ack, data, parity — spec §4.8/§5 "sub-frames of a
/// transaction … emitted in their natural left-to-right order").
/// Markers are per-bit, not per-sub-frame, so they ride along once.
pub struct Commit {
    pub frames: Vec<(Frame, FrameV2)>,
    pub markers: Vec<Marker>,
    pub new_frame_kind: FrameKind,
}

/// A literal pattern with an optional deprecated alternate (JTAG_TO_SWD,
/// SWD_TO_JTAG).
#[derive(Debug, Clone)]
struct AltFixed {
    primary: UintSequence,
    deprecated: Option<UintSequence>,
    matched_deprecated: bool,
    checked: usize,
    state: CmpState,
}

impl AltFixed {
    fn new(primary: u64, length: usize, deprecated: Option<u64>) -> Self {
        AltFixed {
            primary: UintSequence::new(primary, length),
            deprecated: deprecated.map(|p| UintSequence::new(p, length)),
            matched_deprecated: false,
            checked: 0,
            state: CmpState::Unknown,
        }
    }

    fn reset(&mut self) {
        self.primary.reset();
        if let Some(d) = &mut self.deprecated {
            d.reset();
        }
        self.matched_deprecated = false;
        self.checked = 0;
        self.state = CmpState::Unknown;
    }

    fn step(&mut self, buf: &BitBuffer) -> CmpState {
        while self.checked < buf.len() {
            if self.state.is_complete() || self.state.is_mismatch() {
                break;
            }
            let bit = buf.get(self.checked).unwrap();
            let p = self.primary.feed(bit);
            let d = self.deprecated.as_mut().map(|d| d.feed(bit));
            self.checked += 1;
            if p.is_complete() {
                self.matched_deprecated = false;
                self.state = CmpState::Complete;
            } else if d == Some(CmpState::Complete) {
                self.matched_deprecated = true;
                self.state = CmpState::Complete;
            } else if p.is_mismatch() && d.map(|d| d.is_mismatch()).unwrap_or(true) {
                self.state = CmpState::Mismatch;
            } else {
                self.state = CmpState::Partial;
            }
        }
        self.state
    }
}

/// The ≥50-high-bit line-reset matcher with the TARGETSEL boundary
/// disambiguation of spec §4.4.
#[derive(Debug, Clone)]
struct LineReset {
    high_count: usize,
    speculating: bool,
    suffix: UintSequence,
    checked: usize,
    state: CmpState,
    claimed: usize,
}

impl LineReset {
    /// Minimum consecutive high bits before a line reset is recognized.
    const MIN_HIGHS: usize = 50;
    /// `0x99 >> 1`: the 7 bits of a TARGETSEL request byte that follow
    /// its Start bit (APnDP, RnW, A2, A3, Parity, Stop, Park).
    const TARGETSEL_SUFFIX: u64 = 0x4C;

    fn new() -> Self {
        LineReset {
            high_count: 0,
            speculating: false,
            suffix: UintSequence::new(Self::TARGETSEL_SUFFIX, 7),
            checked: 0,
            state: CmpState::Unknown,
            claimed: 0,
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    fn step(&mut self, buf: &BitBuffer) -> CmpState {
        while self.checked < buf.len() {
            if self.state.is_complete() || self.state.is_mismatch() {
                break;
            }
            let bit = buf.get(self.checked).unwrap();
            self.checked += 1;

            if !self.speculating {
                if bit.is_high() {
                    self.high_count += 1;
                    self.state = CmpState::Partial;
                    continue;
                }
                if self.high_count < Self::MIN_HIGHS {
                    self.state = CmpState::Mismatch;
                    continue;
                }
                // First non-extending bit after the minimum run: this
                // bit (low) might be the second bit (APnDP=0) of a
                // TARGETSEL request byte whose Start bit was the last
                // high bit we counted.
                self.speculating = true;
                match self.suffix.feed(bit) {
                    CmpState::Mismatch => {
                        self.claimed = self.high_count;
                        self.state = CmpState::Complete;
                    }
                    _ => self.state = CmpState::Partial,
                }
                continue;
            }

            match self.suffix.feed(bit) {
                CmpState::Complete => {
                    // The whole 8-bit TARGETSEL request — its Start bit
                    // (the last high bit counted) plus the 7-bit suffix
                    // just matched — goes back to the buffer for
                    // `Operation` to parse fresh, not just the Start bit.
                    self.claimed = self.high_count - 8;
                    self.state = CmpState::Complete;
                }
                CmpState::Mismatch => {
                    self.claimed = self.high_count;
                    self.state = CmpState::Complete;
                }
                _ => self.state = CmpState::Partial,
            }
        }
        self.state
    }

    fn claimed_bits(&self) -> usize {
        if self.state.is_complete() {
            self.claimed
        } else {
            self.high_count
        }
    }
}

/// Two 64-bit words matched back to back (DS_SEL_ALERT's 128-bit
/// pattern).
#[derive(Debug, Clone)]
struct Words128 {
    low: UintSequence,
    high: UintSequence,
    in_high: bool,
    checked: usize,
    state: CmpState,
}

impl Words128 {
    fn new(low: u64, high: u64) -> Self {
        Words128 {
            low: UintSequence::new(low, 64),
            high: UintSequence::new(high, 64),
            in_high: false,
            checked: 0,
            state: CmpState::Unknown,
        }
    }

    fn reset(&mut self) {
        self.low.reset();
        self.high.reset();
        self.in_high = false;
        self.checked = 0;
        self.state = CmpState::Unknown;
    }

    fn step(&mut self, buf: &BitBuffer) -> CmpState {
        while self.checked < buf.len() {
            if self.state.is_complete() || self.state.is_mismatch() {
                break;
            }
            let bit = buf.get(self.checked).unwrap();
            self.checked += 1;
            if !self.in_high {
                match self.low.feed(bit) {
                    CmpState::Complete => {
                        self.in_high = true;
                        self.state = CmpState::Partial;
                    }
                    CmpState::Mismatch => self.state = CmpState::Mismatch,
                    _ => self.state = CmpState::Partial,
                }
            } else {
                self.state = self.high.feed(bit);
            }
        }
        self.state
    }
}

/// DS_ACT_CODE: three candidate patterns of two different widths
/// (JTAG-Serial 12 bits, SWD-DP/JTAG-DP 8 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActivationTarget {
    JtagSerial,
    SwdDp,
    JtagDp,
}

#[derive(Debug, Clone)]
struct ActivationCode {
    candidates: [(UintSequence, ActivationTarget); 3],
    matched: Option<ActivationTarget>,
    checked: usize,
    state: CmpState,
}

impl ActivationCode {
    fn new() -> Self {
        ActivationCode {
            candidates: [
                (UintSequence::new(0x000, 12), ActivationTarget::JtagSerial),
                (UintSequence::new(0x1A, 8), ActivationTarget::SwdDp),
                (UintSequence::new(0x0A, 8), ActivationTarget::JtagDp),
            ],
            matched: None,
            checked: 0,
            state: CmpState::Unknown,
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    fn step(&mut self, buf: &BitBuffer) -> CmpState {
        while self.checked < buf.len() {
            if self.state.is_complete() || self.state.is_mismatch() {
                break;
            }
            let bit = buf.get(self.checked).unwrap();
            self.checked += 1;
            let mut any_partial = false;
            let mut complete = None;
            for (seq, tag) in self.candidates.iter_mut() {
                match seq.feed(bit) {
                    CmpState::Complete => complete = Some(*tag),
                    CmpState::Partial => any_partial = true,
                    _ => {}
                }
            }
            self.state = if let Some(tag) = complete {
                self.matched = Some(tag);
                CmpState::Complete
            } else if any_partial {
                CmpState::Partial
            } else {
                CmpState::Mismatch
            };
        }
        self.state
    }
}

/// The transaction matcher (spec §4.5): request byte, turnaround, ACK,
/// and — depending on direction and ACK — a data phase.
#[derive(Debug, Clone, Default)]
pub struct Operation {
    checked: usize,
    state: CmpState,
    request_byte: u8,
    apndp: bool,
    rnw: bool,
    addr: u8,
    ack: u8,
    data: u32,
    reg: Option<Register>,
    ack_only: bool,
    /// An invalid ack doesn't abort the data phase when overrun detection
    /// is enabled, or for a TARGETSEL write (the target never drives ack
    /// for it) — spec §4.5 rule 7.
    ignore_ack: bool,
}

impl Operation {
    fn new() -> Self {
        Operation::default()
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn total_length(&self, turnaround: usize) -> usize {
        let ack_end = 8 + turnaround + 3;
        if self.rnw {
            ack_end + 33
        } else {
            ack_end + turnaround + 33
        }
    }

    fn step(&mut self, buf: &BitBuffer, ctx: &AdiContext) -> CmpState {
        if self.state.is_complete() || self.state.is_mismatch() {
            return self.state;
        }

        // Request byte (8 bits).
        while self.checked < 8 && self.checked < buf.len() {
            let bit = buf.get(self.checked).unwrap();
            self.request_byte >>= 1;
            if bit.is_high() {
                self.request_byte |= 0x80;
            }
            self.checked += 1;
        }
        if self.checked < 8 {
            self.state = CmpState::Partial;
            return self.state;
        }
        if self.checked == 8 {
            if (self.request_byte & 0xC1) != 0x81 {
                self.state = CmpState::Mismatch;
                return self.state;
            }
            self.apndp = self.request_byte & 0x02 != 0;
            self.rnw = self.request_byte & 0x04 != 0;
            self.addr = (self.request_byte & 0x18) >> 1;
            let parity_bit = (self.request_byte & 0x20) != 0;
            let expected_parity = ((self.request_byte & 0x02 != 0) as u8)
                ^ ((self.request_byte & 0x04 != 0) as u8)
                ^ ((self.request_byte & 0x08 != 0) as u8)
                ^ ((self.request_byte & 0x10 != 0) as u8);
            if parity_bit != (expected_parity != 0) {
                self.state = CmpState::Mismatch;
                return self.state;
            }
            let reg = if self.apndp {
                register::resolve_ap(self.addr, ctx.select, ctx.dp_version)
            } else {
                register::resolve_dp(self.addr, self.rnw, ctx.select, ctx.dp_version)
            };
            self.ignore_ack = ctx.overrun_detect
                || (!self.rnw && reg == Register::Dp(DpRegister::TargetSel));
            self.reg = Some(reg);
        }

        let turnaround = ctx.turnaround_cycles as usize;
        let ack_start = 8 + turnaround;
        let ack_end = ack_start + 3;

        while self.checked < ack_end && self.checked < buf.len() {
            self.checked += 1;
        }
        if self.checked < ack_end {
            self.state = CmpState::Partial;
            return self.state;
        }
        if self.checked == ack_end {
            let mut ack = 0u8;
            for i in 0..3 {
                let bit = buf.get(ack_start + i).unwrap();
                if bit.is_high() {
                    ack |= 1 << i;
                }
            }
            self.ack = ack;
            let ack_ok = Ack::from_bits(ack).is_ok() || self.ignore_ack;
            if !ack_ok {
                self.ack_only = true;
                self.state = CmpState::Complete;
                return self.state;
            }
        }

        let total = self.total_length(turnaround);
        let data_start = if self.rnw { ack_end } else { ack_end + turnaround };

        while self.checked < total && self.checked < buf.len() {
            self.checked += 1;
        }
        if self.checked < total {
            self.state = CmpState::Partial;
            return self.state;
        }

        let mut data = 0u32;
        let mut ones = 0u32;
        for i in 0..32 {
            let bit = buf.get(data_start + i).unwrap();
            if bit.is_high() {
                data |= 1 << i;
                ones += 1;
            }
        }
        let parity_bit = buf.get(data_start + 32).unwrap().is_high();
        self.data = data;
        if parity_bit != (ones % 2 == 1) {
            self.state = CmpState::Mismatch;
            return self.state;
        }
        self.state = CmpState::Complete;
        self.state
    }

    fn claimed_bits(&self) -> usize {
        self.checked
    }

    /// Commits the ordered sub-frame run of a transaction, grounded on
    /// `SWDOperation::AddFrames` in the original implementation: request,
    /// a single turnaround, ack, and — only once ack is ok — a second
    /// turnaround ahead of a write's data (none ahead of a read's,
    /// which directly follows ack), the 32-bit data, then its parity.
    /// An invalid (and not ignored) ack stops after the ack sub-frame,
    /// exactly as the original's early return does.
    fn commit(&self, prefix: &[SwdBit], ctx: &mut AdiContext) -> Commit {
        let reg = self.reg.unwrap_or(Register::Undefined);
        let ack = Ack::from_bits(self.ack);
        let turnaround = ctx.turnaround_cycles as usize;

        let outcome_kind = if !(ack.is_ok() || self.ignore_ack) {
            FrameKind::Error
        } else if self.rnw {
            FrameKind::RData
        } else {
            FrameKind::WData
        };

        self.update_adi_state(reg, ack, ctx);

        let flags = (if self.rnw { FLAG_IS_READ } else { 0 })
            | (if self.apndp { FLAG_IS_ACCESS_PORT } else { 0 });

        let mut frames = Vec::new();

        let req_frame = Frame {
            kind: FrameKind::Request,
            start_sample: prefix[0].start_sample(),
            end_sample: prefix[7].end_sample(),
            flags,
            data1: self.request_byte as u64,
            data2: pack_data2(ctx.tar, ctx.last_read_reg, reg),
        };
        let mut req_v2 = FrameV2::new(FrameKind::Request, "REQUEST", req_frame.start_sample, req_frame.end_sample);
        req_v2.rnw = Some(self.rnw);
        req_v2.apndp = Some(self.apndp);
        req_v2.reg = Some(reg);
        req_v2.apreg = Some(reg);
        req_v2.memaddr = Some(ctx.tar);
        frames.push((req_frame, req_v2));

        frames.push(turnaround_frame(&prefix[8..8 + turnaround]));

        let ack_start = 8 + turnaround;
        let ack_end = ack_start + 3;
        let ack_frame = Frame {
            kind: FrameKind::Ack,
            start_sample: prefix[ack_start].start_sample(),
            end_sample: prefix[ack_end - 1].end_sample(),
            flags: 0,
            data1: self.ack as u64,
            data2: 0,
        };
        let mut ack_v2 = FrameV2::new(FrameKind::Ack, "ACK", ack_frame.start_sample, ack_frame.end_sample);
        ack_v2.ack = Some(self.ack);
        frames.push((ack_frame, ack_v2));

        if self.ack_only {
            return Commit {
                frames,
                markers: self.markers(prefix, turnaround),
                new_frame_kind: outcome_kind,
            };
        }

        let data_start = if self.rnw { ack_end } else { ack_end + turnaround };
        if !self.rnw {
            frames.push(turnaround_frame(&prefix[ack_end..data_start]));
        }

        let data_kind = if self.rnw { FrameKind::RData } else { FrameKind::WData };
        let data_ty = if self.rnw { "RDATA" } else { "WDATA" };
        let data_frame = Frame {
            kind: data_kind,
            start_sample: prefix[data_start].start_sample(),
            end_sample: prefix[data_start + 31].end_sample(),
            flags,
            data1: self.data as u64,
            data2: pack_data2(ctx.tar, ctx.last_read_reg, reg),
        };
        let mut data_v2 = FrameV2::new(data_kind, data_ty, data_frame.start_sample, data_frame.end_sample);
        data_v2.rnw = Some(self.rnw);
        data_v2.apndp = Some(self.apndp);
        data_v2.reg = Some(reg);
        data_v2.apreg = Some(reg);
        data_v2.memaddr = Some(ctx.tar);
        data_v2.data = Some(self.data);
        frames.push((data_frame, data_v2));

        let parity_idx = data_start + 32;
        let parity_bit = prefix[parity_idx].is_high();
        let parity_frame = Frame {
            kind: FrameKind::DataParity,
            start_sample: prefix[parity_idx].start_sample(),
            end_sample: prefix[parity_idx].end_sample(),
            flags: 0,
            // Parity mismatches drive the matcher to `Mismatch` before a
            // commit is ever reached, so the parity committed here is
            // always the one that checked out.
            data1: (parity_bit as u64) | (1 << 1),
            data2: 0,
        };
        let mut parity_v2 = FrameV2::new(FrameKind::DataParity, "DATA_PARITY", parity_frame.start_sample, parity_frame.end_sample);
        parity_v2.data = Some(parity_bit as u32);
        frames.push((parity_frame, parity_v2));

        Commit {
            frames,
            markers: self.markers(prefix, turnaround),
            new_frame_kind: outcome_kind,
        }
    }

    fn markers(&self, prefix: &[SwdBit], turnaround: usize) -> Vec<Marker> {
        let read_turn = 8..8 + turnaround;
        let ack_end = 8 + turnaround + 3;
        let write_turn = ack_end..ack_end + turnaround;
        prefix
            .iter()
            .enumerate()
            .map(|(i, bit)| {
                let is_turn = read_turn.contains(&i) || (!self.rnw && write_turn.contains(&i));
                Marker {
                    sample: (bit.rising + bit.falling) / 2,
                    kind: if is_turn {
                        MarkerKind::X
                    } else if bit.is_high() {
                        MarkerKind::One
                    } else {
                        MarkerKind::Zero
                    },
                }
            })
            .collect()
    }

    /// Spec §4.5 "On successful commit … `UpdateAdiState`"; applied in
    /// the documented order.
    fn update_adi_state(&self, reg: Register, ack: Ack, ctx: &mut AdiContext) {
        if reg == Register::Dp(DpRegister::Dpidr) && self.rnw {
            ctx.dp_version = DpVersion::from_dpidr(self.data);
        }
        if reg == Register::Dp(DpRegister::CtrlStat) && !self.rnw {
            ctx.overrun_detect = self.data & 1 != 0;
        }
        if reg == Register::Dp(DpRegister::Select) && !self.rnw {
            ctx.select = self.data;
        }
        if reg == Register::Dp(DpRegister::Dlcr) && !self.rnw {
            ctx.on_dlcr_write(self.data);
        }

        let is_ap_read = matches!(reg, Register::Ap(_)) && self.rnw;
        let is_rdbuff_read = reg == Register::Dp(DpRegister::Rdbuff) && self.rnw;
        let prior_ap_read_count = ctx.ap_read_count;
        if is_ap_read && ack.is_ok() {
            ctx.ap_read_count += 1;
            ctx.last_read_reg = reg;
        } else if is_rdbuff_read {
            ctx.ap_read_count = 0;
            // prevReg is only defined on an RDBUFF read when an AP read
            // actually preceded it; otherwise there is nothing to report.
            if prior_ap_read_count == 0 {
                ctx.last_read_reg = Register::Undefined;
            }
        } else if !self.rnw || matches!(reg, Register::Dp(_)) {
            ctx.ap_read_count = 0;
            ctx.last_read_reg = Register::Undefined;
        }

        let is_ap_data_reg = matches!(
            reg,
            Register::Ap(ApRegister::Drw)
                | Register::Ap(ApRegister::Bd0)
                | Register::Ap(ApRegister::Bd1)
                | Register::Ap(ApRegister::Bd2)
                | Register::Ap(ApRegister::Bd3)
                | Register::Ap(ApRegister::Dar(_))
        );
        if is_ap_data_reg && !self.rnw && ack.is_ok() {
            match ctx.csw_addr_inc {
                CswAddrInc::Single => {
                    ctx.tar = ctx.tar.wrapping_add(ctx.csw_size.single_increment_bytes())
                }
                CswAddrInc::Packed => ctx.tar = ctx.tar.wrapping_add(4),
                _ => {}
            }
        }
        if reg == Register::Ap(ApRegister::Csw) && !self.rnw {
            ctx.on_csw_write(self.data);
        }
        if reg == Register::Ap(ApRegister::Tar) && !self.rnw {
            ctx.tar = self.data;
        }

        ctx.current_protocol = Protocol::Swd;
    }
}

/// One of the twelve SWD framings (spec §4.3 table + the transaction
/// matcher of §4.5).
#[derive(Debug, Clone)]
pub enum Sequence {
    LineReset(LineReset),
    JtagToSwd(AltFixed),
    SwdToJtag(AltFixed),
    JtagToDs(AltFixed),
    SwdToDs(AltFixed),
    JtagTlr(PlainBitSequence),
    IdleCycle(PlainBitSequence),
    DsSelectAlertPreamble(PlainBitSequence),
    DsSelectAlert(Words128),
    DsActivationCodePreamble(UintSequence),
    DsActivationCode(ActivationCode),
    Operation(Operation),
}

impl Sequence {
    pub fn all() -> Vec<Sequence> {
        vec![
            Sequence::LineReset(LineReset::new()),
            Sequence::JtagToSwd(AltFixed::new(0xE79E, 16, Some(0xEDB6))),
            Sequence::SwdToJtag(AltFixed::new(0xE73C, 16, Some(0xAEAE))),
            Sequence::JtagToDs(AltFixed::new(0x33BB_BBBA, 31, None)),
            Sequence::SwdToDs(AltFixed::new(0xE3BC, 16, None)),
            Sequence::JtagTlr(PlainBitSequence::new(true, 5)),
            Sequence::IdleCycle(PlainBitSequence::new(false, 1)),
            Sequence::DsSelectAlertPreamble(PlainBitSequence::new(true, 8)),
            Sequence::DsSelectAlert(Words128::new(0x86852D95_6209F392, 0x19BC0EA2_E3DDAFE9)),
            Sequence::DsActivationCodePreamble(UintSequence::new(0b0000, 4)),
            Sequence::DsActivationCode(ActivationCode::new()),
            Sequence::Operation(Operation::new()),
        ]
    }

    pub fn reset(&mut self) {
        match self {
            Sequence::LineReset(s) => s.reset(),
            Sequence::JtagToSwd(s) | Sequence::SwdToJtag(s) | Sequence::JtagToDs(s) | Sequence::SwdToDs(s) => {
                s.reset()
            }
            Sequence::JtagTlr(s) | Sequence::IdleCycle(s) | Sequence::DsSelectAlertPreamble(s) => s.reset(),
            Sequence::DsSelectAlert(s) => s.reset(),
            Sequence::DsActivationCodePreamble(s) => s.reset(),
            Sequence::DsActivationCode(s) => s.reset(),
            Sequence::Operation(s) => s.reset(),
        }
    }

    /// Whether this matcher is variable-length (spec §4.6 best-match
    /// arbitration distinguishes fixed vs. variable).
    pub fn is_variable_length(&self) -> bool {
        matches!(
            self,
            Sequence::LineReset(_)
                | Sequence::JtagTlr(_)
                | Sequence::IdleCycle(_)
                | Sequence::DsSelectAlertPreamble(_)
                | Sequence::Operation(_)
        )
    }

    /// Eligibility: which protocols and which preceding frame this
    /// matcher may run under (spec §4.3 "Eligibility").
    pub fn eligible(&self, protocol: Protocol, last: FrameKind) -> bool {
        use FrameKind::*;
        match self {
            Sequence::LineReset(_) => true,
            Sequence::JtagToSwd(_) => matches!(protocol, Protocol::Jtag | Protocol::Unknown),
            Sequence::SwdToJtag(_) => matches!(protocol, Protocol::Swd | Protocol::Unknown),
            Sequence::JtagToDs(_) | Sequence::SwdToDs(_) => true,
            Sequence::JtagTlr(_) => matches!(protocol, Protocol::Jtag | Protocol::Unknown),
            Sequence::IdleCycle(_) => true,
            Sequence::DsSelectAlertPreamble(_) => matches!(protocol, Protocol::Dormant | Protocol::Unknown),
            Sequence::DsSelectAlert(_) => last == DsSelectAlertPreamble,
            Sequence::DsActivationCodePreamble(_) => last == DsSelectAlert,
            Sequence::DsActivationCode(_) => last == DsActivationCodePreamble,
            Sequence::Operation(_) => matches!(protocol, Protocol::Swd | Protocol::Unknown),
        }
    }

    pub fn step(&mut self, buf: &BitBuffer, ctx: &AdiContext) -> CmpState {
        match self {
            Sequence::LineReset(s) => s.step(buf),
            Sequence::JtagToSwd(s) | Sequence::SwdToJtag(s) | Sequence::JtagToDs(s) | Sequence::SwdToDs(s) => {
                s.step(buf)
            }
            Sequence::JtagTlr(s) | Sequence::IdleCycle(s) | Sequence::DsSelectAlertPreamble(s) => {
                while s.checked_bits() < buf.len() && !s.state().is_complete() && !s.state().is_mismatch() {
                    let bit = buf.get(s.checked_bits()).unwrap();
                    s.feed(bit);
                }
                s.state()
            }
            Sequence::DsSelectAlert(s) => s.step(buf),
            Sequence::DsActivationCodePreamble(s) => {
                while s.checked_bits() < buf.len() && !s.state().is_complete() && !s.state().is_mismatch() {
                    let bit = buf.get(s.checked_bits()).unwrap();
                    s.feed(bit);
                }
                s.state()
            }
            Sequence::DsActivationCode(s) => s.step(buf),
            Sequence::Operation(s) => s.step(buf, ctx),
        }
    }

    pub fn checked_bits(&self) -> usize {
        match self {
            Sequence::LineReset(s) => s.claimed_bits(),
            Sequence::JtagToSwd(s) | Sequence::SwdToJtag(s) | Sequence::JtagToDs(s) | Sequence::SwdToDs(s) => {
                s.checked
            }
            Sequence::JtagTlr(s) | Sequence::IdleCycle(s) | Sequence::DsSelectAlertPreamble(s) => s.checked_bits(),
            Sequence::DsSelectAlert(s) => s.checked,
            Sequence::DsActivationCodePreamble(s) => s.checked_bits(),
            Sequence::DsActivationCode(s) => s.checked,
            Sequence::Operation(s) => s.claimed_bits(),
        }
    }

    pub fn state(&self) -> CmpState {
        match self {
            Sequence::LineReset(s) => s.state,
            Sequence::JtagToSwd(s) | Sequence::SwdToJtag(s) | Sequence::JtagToDs(s) | Sequence::SwdToDs(s) => {
                s.state
            }
            Sequence::JtagTlr(s) | Sequence::IdleCycle(s) | Sequence::DsSelectAlertPreamble(s) => s.state(),
            Sequence::DsSelectAlert(s) => s.state,
            Sequence::DsActivationCodePreamble(s) => s.state(),
            Sequence::DsActivationCode(s) => s.state,
            Sequence::Operation(s) => s.state,
        }
    }

    /// Called once this matcher has won; consumes the buffer prefix it
    /// claimed and produces the committed frames, updating `ctx`.
    pub fn commit(&self, prefix: &[SwdBit], ctx: &mut AdiContext) -> Commit {
        match self {
            Sequence::LineReset(_) => {
                let frame = Frame {
                    kind: FrameKind::LineReset,
                    start_sample: prefix[0].start_sample(),
                    end_sample: prefix.last().unwrap().end_sample(),
                    flags: 0,
                    data1: prefix.len() as u64,
                    data2: 0,
                };
                let mut v2 = FrameV2::new(
                    FrameKind::LineReset,
                    "LINE_RESET",
                    frame.start_sample,
                    frame.end_sample,
                );
                v2.cycles = Some(prefix.len() as u32);
                ctx.on_line_reset();
                Commit {
                    frames: vec![(frame, v2)],
                    markers: bit_level_markers(prefix),
                    new_frame_kind: FrameKind::LineReset,
                }
            }
            Sequence::JtagToSwd(s) => {
                ctx.current_protocol = Protocol::Swd;
                fixed_pattern_commit(prefix, FrameKind::JtagToSwd, "JTAG_TO_SWD", s.matched_deprecated)
            }
            Sequence::SwdToJtag(s) => {
                ctx.current_protocol = Protocol::Jtag;
                fixed_pattern_commit(prefix, FrameKind::SwdToJtag, "SWD_TO_JTAG", s.matched_deprecated)
            }
            Sequence::JtagToDs(_) => {
                ctx.current_protocol = Protocol::Dormant;
                fixed_pattern_commit(prefix, FrameKind::JtagToDs, "JTAG_TO_DS", false)
            }
            Sequence::SwdToDs(_) => {
                ctx.current_protocol = Protocol::Dormant;
                fixed_pattern_commit(prefix, FrameKind::SwdToDs, "SWD_TO_DS", false)
            }
            Sequence::JtagTlr(_) => run_length_commit(prefix, FrameKind::JtagTlr, "JTAG_TLR"),
            Sequence::IdleCycle(_) => run_length_commit(prefix, FrameKind::IdleCycle, "IDLE_CYCLE"),
            Sequence::DsSelectAlertPreamble(_) => {
                run_length_commit(prefix, FrameKind::DsSelectAlertPreamble, "DS_SEL_ALERT_PREAMBLE")
            }
            Sequence::DsSelectAlert(_) => {
                let low = bits_to_u64(&prefix[0..64]);
                let high = bits_to_u64(&prefix[64..128]);
                let frame = Frame {
                    kind: FrameKind::DsSelectAlert,
                    start_sample: prefix[0].start_sample(),
                    end_sample: prefix.last().unwrap().end_sample(),
                    flags: 0,
                    data1: low,
                    data2: high,
                };
                let v2 = FrameV2::new(
                    FrameKind::DsSelectAlert,
                    "DS_SEL_ALERT",
                    frame.start_sample,
                    frame.end_sample,
                );
                Commit {
                    frames: vec![(frame, v2)],
                    markers: bit_level_markers(prefix),
                    new_frame_kind: FrameKind::DsSelectAlert,
                }
            }
            Sequence::DsActivationCodePreamble(_) => {
                run_length_commit(prefix, FrameKind::DsActivationCodePreamble, "DS_ACT_CODE_PREAMBLE")
            }
            Sequence::DsActivationCode(s) => {
                match s.matched {
                    Some(ActivationTarget::SwdDp) => ctx.current_protocol = Protocol::Swd,
                    Some(ActivationTarget::JtagDp) | Some(ActivationTarget::JtagSerial) => {
                        ctx.current_protocol = Protocol::Jtag
                    }
                    None => {}
                }
                fixed_pattern_commit(prefix, FrameKind::DsActivationCode, "DS_ACT_CODE", false)
            }
            Sequence::Operation(op) => op.commit(prefix, ctx),
        }
    }
}

/// A turnaround sub-frame spanning `bits` (spec §4.5 items 2/5/6).
fn turnaround_frame(bits: &[SwdBit]) -> (Frame, FrameV2) {
    let frame = Frame {
        kind: FrameKind::Turnaround,
        start_sample: bits[0].start_sample(),
        end_sample: bits.last().unwrap().end_sample(),
        flags: 0,
        data1: bits.len() as u64,
        data2: 0,
    };
    let mut v2 = FrameV2::new(FrameKind::Turnaround, "TURNAROUND", frame.start_sample, frame.end_sample);
    v2.cycles = Some(bits.len() as u32);
    (frame, v2)
}

fn bits_to_u64(bits: &[SwdBit]) -> u64 {
    let mut v = 0u64;
    for (i, b) in bits.iter().enumerate() {
        if b.is_high() {
            v |= 1 << i;
        }
    }
    v
}

fn fixed_pattern_commit(prefix: &[SwdBit], kind: FrameKind, ty: &'static str, deprecated: bool) -> Commit {
    let value = bits_to_u64(prefix);
    let frame = Frame {
        kind,
        start_sample: prefix[0].start_sample(),
        end_sample: prefix.last().unwrap().end_sample(),
        flags: if deprecated { FLAG_DEPRECATED } else { 0 },
        data1: value,
        data2: 0,
    };
    let v2 = FrameV2::new(kind, ty, frame.start_sample, frame.end_sample);
    Commit {
        frames: vec![(frame, v2)],
        markers: bit_level_markers(prefix),
        new_frame_kind: kind,
    }
}

fn run_length_commit(prefix: &[SwdBit], kind: FrameKind, ty: &'static str) -> Commit {
    let frame = Frame {
        kind,
        start_sample: prefix[0].start_sample(),
        end_sample: prefix.last().unwrap().end_sample(),
        flags: 0,
        data1: prefix.len() as u64,
        data2: 0,
    };
    let mut v2 = FrameV2::new(kind, ty, frame.start_sample, frame.end_sample);
    v2.cycles = Some(prefix.len() as u32);
    Commit {
        frames: vec![(frame, v2)],
        markers: bit_level_markers(prefix),
        new_frame_kind: kind,
    }
}

fn bit_level_markers(prefix: &[SwdBit]) -> Vec<Marker> {
    prefix
        .iter()
        .map(|bit| Marker {
            sample: bit.rising,
            kind: if bit.is_high() { MarkerKind::One } else { MarkerKind::Zero },
        })
        .collect()
}
