//! The ADI context: the single mutable record of "what the line is
//! doing right now", updated only by a winning matcher's commit step.

use crate::register::Register;

/// Which protocol the line is currently believed to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Protocol {
    Unknown,
    Dormant,
    Jtag,
    Swd,
}

/// DPIDR-reported Debug Port architecture version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DpVersion {
    V0,
    V1,
    V2,
    V3,
}

impl DpVersion {
    /// Decode DPIDR bits [15:12] (spec §4.5).
    pub fn from_dpidr(dpidr: u32) -> DpVersion {
        match (dpidr >> 12) & 0xF {
            1 => DpVersion::V1,
            2 => DpVersion::V2,
            3 => DpVersion::V3,
            _ => DpVersion::V0,
        }
    }
}

/// CSW.AddrInc: whether and how TAR auto-increments after a data access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CswAddrInc {
    Off,
    Single,
    Packed,
    Reserved,
}

impl CswAddrInc {
    fn from_bits(bits: u32) -> CswAddrInc {
        match bits & 0b11 {
            0b00 => CswAddrInc::Off,
            0b01 => CswAddrInc::Single,
            0b10 => CswAddrInc::Packed,
            _ => CswAddrInc::Reserved,
        }
    }
}

/// CSW.Size: the access width of the MEM-AP's data registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CswSize {
    Byte,
    Half,
    Word,
    Double,
    Bits128,
    Bits256,
    Reserved,
}

impl CswSize {
    fn from_bits(bits: u32) -> CswSize {
        match bits & 0b111 {
            0b000 => CswSize::Byte,
            0b001 => CswSize::Half,
            0b010 => CswSize::Word,
            0b011 => CswSize::Double,
            0b100 => CswSize::Bits128,
            0b101 => CswSize::Bits256,
            _ => CswSize::Reserved,
        }
    }

    /// Number of bytes a SINGLE auto-increment advances TAR by.
    pub fn single_increment_bytes(self) -> u32 {
        match self {
            CswSize::Byte => 1,
            CswSize::Half => 2,
            CswSize::Word => 4,
            CswSize::Double => 8,
            CswSize::Bits128 => 16,
            CswSize::Bits256 => 32,
            CswSize::Reserved => 4,
        }
    }
}

/// The 3-bit SWD ACK response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Ack {
    Ok,
    Wait,
    Fault,
    /// Zero or more than one bit set; not a valid one-hot response.
    Invalid(u8),
}

impl Ack {
    pub fn from_bits(bits: u8) -> Ack {
        match bits {
            0b001 => Ack::Ok,
            0b010 => Ack::Wait,
            0b100 => Ack::Fault,
            other => Ack::Invalid(other),
        }
    }

    pub fn is_ok(self) -> bool {
        matches!(self, Ack::Ok)
    }

    pub fn raw(self) -> u8 {
        match self {
            Ack::Ok => 1,
            Ack::Wait => 2,
            Ack::Fault => 4,
            Ack::Invalid(v) => v,
        }
    }
}

/// Identity of the most recently committed frame; restricts which
/// matchers are eligible to run next (spec §4.3 eligibility rule).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FrameKind {
    LineReset,
    JtagToSwd,
    SwdToJtag,
    JtagToDs,
    SwdToDs,
    JtagTlr,
    IdleCycle,
    DsSelectAlertPreamble,
    DsSelectAlert,
    DsActivationCodePreamble,
    DsActivationCode,
    Request,
    Turnaround,
    Ack,
    RData,
    WData,
    DataParity,
    Error,
    Ignored,
}

/// Process-wide mutable protocol state (spec §3 "ADI context").
#[derive(Debug, Clone)]
pub struct AdiContext {
    pub current_protocol: Protocol,
    pub last_frame: FrameKind,
    pub dp_version: DpVersion,
    pub turnaround_cycles: u8,
    pub overrun_detect: bool,
    pub select: u32,
    pub tar: u32,
    pub csw_addr_inc: CswAddrInc,
    pub csw_size: CswSize,
    pub ap_read_count: u32,
    pub last_read_reg: Register,
}

impl Default for AdiContext {
    fn default() -> Self {
        AdiContext {
            current_protocol: Protocol::Unknown,
            last_frame: FrameKind::LineReset,
            dp_version: DpVersion::V0,
            turnaround_cycles: 1,
            overrun_detect: false,
            select: 0,
            tar: 0,
            csw_addr_inc: CswAddrInc::Off,
            csw_size: CswSize::Word,
            ap_read_count: 0,
            last_read_reg: Register::Undefined,
        }
    }
}

impl AdiContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// DP bank select, SELECT[3:0].
    pub fn dp_bank(&self) -> u8 {
        (self.select & 0xF) as u8
    }

    /// AP bank select, SELECT[7:4] (ADIv5/v6 classic addressing).
    pub fn ap_bank_classic(&self) -> u8 {
        ((self.select >> 4) & 0xF) as u8
    }

    /// AP bank select, SELECT[11:4] widened for DPv3 4 KiB AP windows.
    pub fn ap_bank_dpv3(&self) -> u16 {
        ((self.select >> 4) & 0xFF) as u16
    }

    /// Effects of a successful LINE_RESET commit (spec §4.3).
    pub fn on_line_reset(&mut self) {
        self.current_protocol = Protocol::Unknown;
        self.turnaround_cycles = 1;
        self.select &= !0xF;
    }

    pub fn on_csw_write(&mut self, data: u32) {
        self.csw_addr_inc = CswAddrInc::from_bits(data >> 4);
        self.csw_size = CswSize::from_bits(data);
    }

    pub fn on_dlcr_write(&mut self, data: u32) {
        self.turnaround_cycles = (((data >> 8) & 0b11) + 1) as u8;
    }
}
