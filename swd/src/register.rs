//! Translates `(AP/DP, R/W, A[3:2], SELECT, dpVersion)` into a named
//! register, and formats a register's value into named fields.
//!
//! The tables below are immutable compile-time data (spec §9: "Define
//! the register tables as immutable compile-time constants") walked by
//! [`resolve_dp`] / [`resolve_ap`] in declaration order, exactly the
//! "first candidate whose bank/access/version match" algorithm of
//! spec §4.7.

use bitflags::bitflags;

use crate::context::DpVersion;

bitflags! {
    /// Which access direction(s) a register candidate is valid for.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Access: u8 {
        const READ = 0b01;
        const WRITE = 0b10;
        const RW = Self::READ.bits() | Self::WRITE.bits();
    }
}

bitflags! {
    /// Which DP versions a register candidate is valid under.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Versions: u8 {
        const V0 = 0b0001;
        const V1 = 0b0010;
        const V2 = 0b0100;
        const V3 = 0b1000;
        const V1_PLUS = Self::V1.bits() | Self::V2.bits() | Self::V3.bits();
        const ANY = Self::V0.bits() | Self::V1.bits() | Self::V2.bits() | Self::V3.bits();
    }
}

impl Versions {
    fn matches(self, version: DpVersion) -> bool {
        let bit = match version {
            DpVersion::V0 => Versions::V0,
            DpVersion::V1 => Versions::V1,
            DpVersion::V2 => Versions::V2,
            DpVersion::V3 => Versions::V3,
        };
        self.intersects(bit)
    }
}

/// Debug Port registers. Names follow ARM ADI v5.2/v6 (`DPIDR`,
/// `DLCR`, …); `Wcr` is kept as the pre-ADIv5.2 alias of `Dlcr` some
/// tooling still prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DpRegister {
    Dpidr,
    Abort,
    CtrlStat,
    Dlcr,
    TargetId,
    Dlpidr,
    EventStat,
    Resend,
    Select,
    Rdbuff,
    TargetSel,
    BasePtr0,
    BasePtr1,
}

/// Access Port registers: the classic ADIv5/v6 MEM-AP map, plus the
/// DPv3/ADIv6 wide addressing extensions (`TarMsw`, `BaseMsw`, `Mbt`,
/// the `Dar` mirror, and the CoreSight component identification block).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ApRegister {
    Csw,
    Tar,
    TarMsw,
    Drw,
    Bd0,
    Bd1,
    Bd2,
    Bd3,
    Mbt,
    BaseMsw,
    Cfg,
    Base,
    Idr,
    /// Dense data-access mirror, DAR0..DAR255 (DPv3 only).
    Dar(u8),
    Pidr(u8),
    Cidr(u8),
}

/// A resolved register identity, or the two "nothing lives here"
/// outcomes the two paths can yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Register {
    Dp(DpRegister),
    Ap(ApRegister),
    /// DP path miss.
    Undefined,
    /// AP path miss: reads as zero, writes are ignored.
    RazWi,
}

impl Register {
    pub fn name(&self) -> String {
        match self {
            Register::Dp(r) => format!("{:?}", r),
            Register::Ap(ApRegister::Dar(n)) => format!("DAR{}", n),
            Register::Ap(ApRegister::Pidr(n)) => format!("PIDR{}", n),
            Register::Ap(ApRegister::Cidr(n)) => format!("CIDR{}", n),
            Register::Ap(r) => format!("{:?}", r),
            Register::Undefined => "UNDEFINED".to_string(),
            Register::RazWi => "RAZ_WI".to_string(),
        }
    }
}

struct DpCandidate {
    addr: u8,
    bank: Option<&'static [u8]>,
    access: Access,
    versions: Versions,
    reg: DpRegister,
}

/// Declaration order matters: for addr 0x0/read, the bank-0-restricted
/// `Dpidr` entry is listed before the bank-unrestricted one so that a
/// DPv3 line resolves `BasePtr0`/`BasePtr1` at non-zero banks instead of
/// `Dpidr`, while v0-v2 lines (no bank restriction applies to them)
/// fall through to the unrestricted entry regardless of bank (open
/// question in spec §9, resolved this way).
const DP_TABLE: &[DpCandidate] = &[
    DpCandidate { addr: 0x0, bank: Some(&[0]), access: Access::READ, versions: Versions::V3, reg: DpRegister::Dpidr },
    DpCandidate { addr: 0x0, bank: None, access: Access::READ, versions: Versions::V0.union(Versions::V1).union(Versions::V2), reg: DpRegister::Dpidr },
    DpCandidate { addr: 0x0, bank: Some(&[2]), access: Access::READ, versions: Versions::V3, reg: DpRegister::BasePtr0 },
    DpCandidate { addr: 0x0, bank: Some(&[3]), access: Access::READ, versions: Versions::V3, reg: DpRegister::BasePtr1 },
    DpCandidate { addr: 0x0, bank: None, access: Access::WRITE, versions: Versions::ANY, reg: DpRegister::Abort },
    DpCandidate { addr: 0x4, bank: Some(&[0]), access: Access::RW, versions: Versions::ANY, reg: DpRegister::CtrlStat },
    DpCandidate { addr: 0x4, bank: Some(&[1]), access: Access::RW, versions: Versions::V1_PLUS, reg: DpRegister::Dlcr },
    DpCandidate { addr: 0x4, bank: Some(&[2]), access: Access::READ, versions: Versions::V1_PLUS, reg: DpRegister::TargetId },
    DpCandidate { addr: 0x4, bank: Some(&[3]), access: Access::READ, versions: Versions::V1_PLUS, reg: DpRegister::Dlpidr },
    DpCandidate { addr: 0x4, bank: Some(&[4]), access: Access::READ, versions: Versions::V2.union(Versions::V3), reg: DpRegister::EventStat },
    DpCandidate { addr: 0x8, bank: None, access: Access::READ, versions: Versions::ANY, reg: DpRegister::Resend },
    DpCandidate { addr: 0x8, bank: None, access: Access::WRITE, versions: Versions::ANY, reg: DpRegister::Select },
    DpCandidate { addr: 0xC, bank: None, access: Access::READ, versions: Versions::ANY, reg: DpRegister::Rdbuff },
    DpCandidate { addr: 0xC, bank: None, access: Access::WRITE, versions: Versions::V1_PLUS, reg: DpRegister::TargetSel },
];

/// Resolve a DP register. `a32` is `A[3:2]` shifted into the low two
/// bits already multiplied by 4 (i.e. the raw register offset 0x0/0x4/
/// 0x8/0xC), `read` is the request's RnW bit.
pub fn resolve_dp(a32: u8, read: bool, select: u32, dp_version: DpVersion) -> Register {
    let bank = (select & 0xF) as u8;
    let access = if read { Access::READ } else { Access::WRITE };
    for candidate in DP_TABLE {
        if candidate.addr != a32 {
            continue;
        }
        if !candidate.access.intersects(access) {
            continue;
        }
        if !candidate.versions.matches(dp_version) {
            continue;
        }
        if let Some(banks) = candidate.bank {
            if !banks.contains(&bank) {
                continue;
            }
        }
        return Register::Dp(candidate.reg);
    }
    Register::Undefined
}

/// Resolve an AP register for the classic ADIv5/ADIv6 256-byte-window
/// addressing (`dpVersion < V3`): keyed by `SELECT[7:4] | A[3:2]`.
fn resolve_ap_classic(apreg: u8) -> Register {
    match apreg {
        0x00 => Register::Ap(ApRegister::Csw),
        0x04 => Register::Ap(ApRegister::Tar),
        0x0C => Register::Ap(ApRegister::Drw),
        0x10 => Register::Ap(ApRegister::Bd0),
        0x14 => Register::Ap(ApRegister::Bd1),
        0x18 => Register::Ap(ApRegister::Bd2),
        0x1C => Register::Ap(ApRegister::Bd3),
        0xF4 => Register::Ap(ApRegister::Cfg),
        0xF8 => Register::Ap(ApRegister::Base),
        0xFC => Register::Ap(ApRegister::Idr),
        _ => Register::RazWi,
    }
}

/// Resolve an AP register for the DPv3/ADIv6 4 KiB window: the low
/// 1 KiB (`addr < 0x400`) is the dense `DAR0..DAR255` mirror, and the
/// CoreSight component-identification block sits at the top of the
/// window (`0xFD0..0xFFC`) with the classic registers mirrored at
/// `0xD00..0xD1C`/`0xDF4..0xDFC`; everything else reads as zero.
fn resolve_ap_dpv3(addr: u16) -> Register {
    if addr < 0x400 {
        return Register::Ap(ApRegister::Dar((addr / 4) as u8));
    }
    match addr {
        0xD00 => Register::Ap(ApRegister::Csw),
        0xD04 => Register::Ap(ApRegister::Tar),
        0xD08 => Register::Ap(ApRegister::TarMsw),
        0xD0C => Register::Ap(ApRegister::Drw),
        0xD20 => Register::Ap(ApRegister::Mbt),
        0xDF0 => Register::Ap(ApRegister::BaseMsw),
        0xDF4 => Register::Ap(ApRegister::Cfg),
        0xDF8 => Register::Ap(ApRegister::Base),
        0xDFC => Register::Ap(ApRegister::Idr),
        0xFD0..=0xFDC => Register::Ap(ApRegister::Pidr(((addr - 0xFD0) / 4) as u8)),
        0xFE0..=0xFEC => Register::Ap(ApRegister::Pidr((4 + (addr - 0xFE0) / 4) as u8)),
        0xFF0..=0xFFC => Register::Ap(ApRegister::Cidr(((addr - 0xFF0) / 4) as u8)),
        _ => Register::RazWi,
    }
}

/// Resolve an AP register. `select` supplies the bank bits; `a32` is
/// the raw register offset within the bank (`0x0`/`0x4`/`0x8`/`0xC`).
pub fn resolve_ap(a32: u8, select: u32, dp_version: DpVersion) -> Register {
    if dp_version == DpVersion::V3 {
        let bank = ((select >> 4) & 0xFF) as u16;
        resolve_ap_dpv3((bank << 4) | a32 as u16)
    } else {
        let bank = (select & 0xF0) as u8;
        resolve_ap_classic(bank | a32)
    }
}

struct Field {
    name: &'static str,
    shift: u32,
    mask: u32,
    access: Access,
}

fn format_fields(value: u32, fields: &[Field], read: bool) -> String {
    let access = if read { Access::READ } else { Access::WRITE };
    fields
        .iter()
        .filter(|f| f.access.intersects(access))
        .map(|f| format!("{}={:#x}", f.name, (value >> f.shift) & f.mask))
        .collect::<Vec<_>>()
        .join(",")
}

/// Produce the comma-separated `name=value` field description for a
/// resolved register's 32-bit value (spec §4.7 "Field formatter").
pub fn describe_fields(reg: Register, value: u32, read: bool) -> String {
    const DPIDR: &[Field] = &[
        Field { name: "REVISION", shift: 28, mask: 0xF, access: Access::READ },
        Field { name: "PARTNO", shift: 20, mask: 0xFF, access: Access::READ },
        Field { name: "VERSION", shift: 12, mask: 0xF, access: Access::READ },
        Field { name: "MIN", shift: 16, mask: 0x1, access: Access::READ },
        Field { name: "DESIGNER", shift: 1, mask: 0x7FF, access: Access::READ },
    ];
    const ABORT: &[Field] = &[
        Field { name: "ORUNERRCLR", shift: 4, mask: 0x1, access: Access::WRITE },
        Field { name: "WDERRCLR", shift: 3, mask: 0x1, access: Access::WRITE },
        Field { name: "STKERRCLR", shift: 2, mask: 0x1, access: Access::WRITE },
        Field { name: "STKCMPCLR", shift: 1, mask: 0x1, access: Access::WRITE },
        Field { name: "DAPABORT", shift: 0, mask: 0x1, access: Access::WRITE },
    ];
    const CTRL_STAT: &[Field] = &[
        Field { name: "CSYSPWRUPACK", shift: 31, mask: 0x1, access: Access::RW },
        Field { name: "CSYSPWRUPREQ", shift: 30, mask: 0x1, access: Access::RW },
        Field { name: "CDBGPWRUPACK", shift: 29, mask: 0x1, access: Access::RW },
        Field { name: "CDBGPWRUPREQ", shift: 28, mask: 0x1, access: Access::RW },
        Field { name: "CDBGRSTACK", shift: 27, mask: 0x1, access: Access::RW },
        Field { name: "CDBGRSTREQ", shift: 26, mask: 0x1, access: Access::RW },
        Field { name: "ORUNDETECT", shift: 0, mask: 0x1, access: Access::RW },
    ];
    const SELECT: &[Field] = &[
        Field { name: "APSEL", shift: 24, mask: 0xFF, access: Access::WRITE },
        Field { name: "APBANKSEL", shift: 4, mask: 0xF, access: Access::WRITE },
        Field { name: "DPBANKSEL", shift: 0, mask: 0xF, access: Access::WRITE },
    ];
    const AP_IDR: &[Field] = &[
        Field { name: "REVISION", shift: 28, mask: 0xF, access: Access::READ },
        Field { name: "DESIGNER", shift: 17, mask: 0x7FF, access: Access::READ },
        Field { name: "CLASS", shift: 13, mask: 0xF, access: Access::READ },
        Field { name: "TYPE", shift: 0, mask: 0xF, access: Access::READ },
    ];
    const AP_CSW: &[Field] = &[
        Field { name: "DBGSWENABLE", shift: 31, mask: 0x1, access: Access::RW },
        Field { name: "PROT", shift: 24, mask: 0x7F, access: Access::RW },
        Field { name: "ADDRINC", shift: 4, mask: 0x3, access: Access::RW },
        Field { name: "SIZE", shift: 0, mask: 0x7, access: Access::RW },
    ];
    const AP_CFG: &[Field] = &[
        Field { name: "LD", shift: 2, mask: 0x1, access: Access::READ },
        Field { name: "LA", shift: 1, mask: 0x1, access: Access::READ },
        Field { name: "BE", shift: 0, mask: 0x1, access: Access::READ },
    ];

    let fields: &[Field] = match reg {
        Register::Dp(DpRegister::Dpidr) => DPIDR,
        Register::Dp(DpRegister::Abort) => ABORT,
        Register::Dp(DpRegister::CtrlStat) => CTRL_STAT,
        Register::Dp(DpRegister::Select) => SELECT,
        Register::Ap(ApRegister::Idr) => AP_IDR,
        Register::Ap(ApRegister::Csw) => AP_CSW,
        Register::Ap(ApRegister::Cfg) => AP_CFG,
        _ => &[],
    };
    format_fields(value, fields, read)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dpidr_resolves_for_v1_regardless_of_bank() {
        let reg = resolve_dp(0x0, true, 0x0000_0005, DpVersion::V1);
        assert_eq!(reg, Register::Dp(DpRegister::Dpidr));
    }

    #[test]
    fn dpidr_only_resolves_at_bank_zero_for_v3() {
        assert_eq!(resolve_dp(0x0, true, 0x0000_0000, DpVersion::V3), Register::Dp(DpRegister::Dpidr));
        assert_eq!(resolve_dp(0x0, true, 0x0000_0002, DpVersion::V3), Register::Dp(DpRegister::BasePtr0));
    }

    #[test]
    fn abort_is_write_only() {
        assert_eq!(resolve_dp(0x0, false, 0, DpVersion::V0), Register::Dp(DpRegister::Abort));
    }

    #[test]
    fn select_write_picks_ap_bank() {
        // SELECT's APBANKSEL nibble lands at bits [7:4]; bank 0xF0 | A[3:2]=0xC
        // keys the classic AP table's IDR slot.
        let reg = resolve_ap(0xC, 0x0000_00F0, DpVersion::V1);
        assert_eq!(reg, Register::Ap(ApRegister::Idr));
    }

    #[test]
    fn ap_miss_is_raz_wi() {
        assert_eq!(resolve_ap(0x8, 0, DpVersion::V1), Register::RazWi);
    }

    #[test]
    fn dar_mirror_resolves_for_dpv3() {
        let reg = resolve_ap(0x4, 0, DpVersion::V3);
        assert_eq!(reg, Register::Ap(ApRegister::Dar(1)));
    }

    #[test]
    fn describe_dpidr_fields() {
        let s = describe_fields(Register::Dp(DpRegister::Dpidr), 0x2BA0_1477, true);
        assert!(s.contains("VERSION=0x1"));
    }
}
