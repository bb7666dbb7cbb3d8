//! End-to-end decode-loop tests driving [`Decoder`] over hand-built bit
//! traces, exercising the arbitration rule of spec §4.6 and a full
//! multi-sub-frame SWD transaction.

use swd::sim::bit_trace;
use swd::{ApRegister, Decoder, DpRegister, DpVersion, FrameKind, Protocol, Register, Settings};

fn decode_all(bits: &[bool]) -> Vec<swd::DecodedFrame> {
    decode_all_with(bits, Settings::default())
}

fn decode_all_with(bits: &[bool], settings: Settings) -> Vec<swd::DecodedFrame> {
    let (clk, dio) = bit_trace(bits, 4);
    let mut decoder = Decoder::new(clk, dio, settings.initial_context()).unwrap();
    let mut out = Vec::new();
    while let Some(frame) = decoder.next_frame().unwrap() {
        out.push(frame);
    }
    out
}

/// Exactly 50 high bits followed by a low/high pair: the low bit starts
/// the TARGETSEL-suffix speculation, and the immediately following high
/// bit mismatches that speculation, so `LineReset` claims exactly the
/// 50-bit run. `JtagTlr` and `DsSelectAlertPreamble` complete on the
/// same bit with the same bit count, so this also exercises the
/// stable first-registered tie-break among variable-length matchers.
#[test]
fn line_reset_wins_tie_against_jtag_tlr_and_idle_cycle() {
    let mut bits = vec![true; 50];
    bits.push(false);
    bits.push(true);

    let frames = decode_all(&bits);
    assert_eq!(frames.len(), 1, "expected a single LINE_RESET frame, got {frames:?}");
    let f = &frames[0];
    assert_eq!(f.frame.kind, FrameKind::LineReset);
    assert_eq!(f.frame_v2.ty, "LINE_RESET");
    assert_eq!(f.frame_v2.cycles, Some(50));
}

/// The 16-bit `JTAG_TO_SWD` pattern starts with a low bit, which is
/// exactly the shape `IDLE_CYCLE` (minimum one low bit) completes on
/// after just two bits. Before the decode-loop fix this test's arrangement
/// would have let `IDLE_CYCLE` win prematurely; with the fix a
/// still-partial fixed-length matcher blocks any variable-length
/// completion, so the full pattern is recognized intact.
#[test]
fn jtag_to_swd_recognized_despite_leading_idle_shaped_bits() {
    let pattern: u16 = 0xE79E;
    let bits: Vec<bool> = (0..16).map(|i| (pattern >> i) & 1 == 1).collect();

    let settings = Settings {
        initial_protocol: Protocol::Jtag,
        ..Settings::default()
    };
    let frames = decode_all_with(&bits, settings);

    assert_eq!(frames.len(), 1, "expected a single JTAG_TO_SWD frame, got {frames:?}");
    let f = &frames[0];
    assert_eq!(f.frame.kind, FrameKind::JtagToSwd);
    assert_eq!(f.frame_v2.ty, "JTAG_TO_SWD");
    assert_eq!(f.frame.data1, 0xE79E);
    assert_eq!(f.frame.flags, 0, "primary pattern matched, not the deprecated alternate");
}

/// A full AP IDR read transaction (SELECT picks AP bank 0xF0, A[3:2] =
/// 0xC resolves to IDR — spec §4.7), ack OK, committed as the ordered
/// REQUEST/TURNAROUND/ACK/RDATA/DATA_PARITY sub-frame run (spec §4.8).
#[test]
fn ap_idr_read_emits_ordered_subframes() {
    #[rustfmt::skip]
    let bits: Vec<bool> = vec![
        // REQUEST: Start, APnDP, RnW, A2, A3, Parity, Stop, Park
        true, true, true, true, true, false, false, true,
        // TURNAROUND (1 cycle, undriven)
        false,
        // ACK = 0b001 (Ok), LSB-first
        true, false, false,
        // RDATA = 0x0000_0001, LSB-first
        true, false, false, false, false, false, false, false,
        false, false, false, false, false, false, false, false,
        false, false, false, false, false, false, false, false,
        false, false, false, false, false, false, false, false,
        // DATA_PARITY (odd parity: one set bit)
        true,
    ];
    assert_eq!(bits.len(), 45);

    let settings = Settings {
        initial_protocol: Protocol::Swd,
        initial_dp_version: DpVersion::V1,
        initial_select: 0x0000_00F0,
        ..Settings::default()
    };
    let frames = decode_all_with(&bits, settings);

    let kinds: Vec<FrameKind> = frames.iter().map(|f| f.frame.kind).collect();
    assert_eq!(
        kinds,
        vec![
            FrameKind::Request,
            FrameKind::Turnaround,
            FrameKind::Ack,
            FrameKind::RData,
            FrameKind::DataParity,
        ]
    );

    let request = &frames[0].frame_v2;
    assert_eq!(request.rnw, Some(true));
    assert_eq!(request.apndp, Some(true));
    assert_eq!(request.reg, Some(Register::Ap(ApRegister::Idr)));

    let ack = &frames[2].frame_v2;
    assert_eq!(ack.ack, Some(1));

    let data = &frames[3].frame_v2;
    assert_eq!(data.data, Some(1));
}

/// A TARGETSEL write: the target never drives ACK for it, so an
/// invalid ACK must not abort the data phase (spec §4.5 rule 7). Before
/// this was wired up, `ctx.ignore_ack` was permanently false and this
/// transaction would have stopped after the ACK sub-frame with an
/// `Error` outcome instead of completing as a `WDATA` write.
#[test]
fn targetsel_write_ignores_invalid_ack() {
    #[rustfmt::skip]
    let bits: Vec<bool> = vec![
        // REQUEST: Start, APnDP=0 (DP), RnW=0 (write), A2, A3, Parity, Stop, Park
        true, false, false, true, true, false, false, true,
        // TURNAROUND (1 cycle)
        false,
        // ACK = 0b000 (Invalid) — never driven by the target for TARGETSEL
        false, false, false,
        // TURNAROUND before write data
        false,
        // WDATA = 0xFFFF_FFFF
        true, true, true, true, true, true, true, true,
        true, true, true, true, true, true, true, true,
        true, true, true, true, true, true, true, true,
        true, true, true, true, true, true, true, true,
        // DATA_PARITY (even parity: 32 set bits)
        false,
    ];
    assert_eq!(bits.len(), 46);

    let settings = Settings {
        initial_protocol: Protocol::Swd,
        initial_dp_version: DpVersion::V1,
        ..Settings::default()
    };
    let frames = decode_all_with(&bits, settings);

    let kinds: Vec<FrameKind> = frames.iter().map(|f| f.frame.kind).collect();
    assert_eq!(
        kinds,
        vec![
            FrameKind::Request,
            FrameKind::Turnaround,
            FrameKind::Ack,
            FrameKind::Turnaround,
            FrameKind::WData,
            FrameKind::DataParity,
        ]
    );

    let request = &frames[0].frame_v2;
    assert_eq!(request.rnw, Some(false));
    assert_eq!(request.reg, Some(Register::Dp(DpRegister::TargetSel)));

    let data = &frames[4].frame_v2;
    assert_eq!(data.data, Some(0xFFFF_FFFF));
}
