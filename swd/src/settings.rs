//! Persisted decoder settings (spec §6 "Persisted state") and their
//! length-prefixed text archive encoding, ported field-for-field from
//! the original `SWDAnalyzerSettings::LoadSettings`/`SaveSettings`.

use crate::context::{AdiContext, DpVersion, FrameKind, Protocol};
use crate::error::DecoderError;

/// Initial assumptions the decoder starts from, plus which two channels
/// carry SWDIO/SWCLK. Channel identity is left to the host embedding
/// (spec §5); `swdio`/`swclk` are opaque small integers here.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Settings {
    pub swdio: u32,
    pub swclk: u32,
    pub initial_protocol: Protocol,
    pub initial_last_frame: FrameKind,
    pub initial_dp_version: DpVersion,
    pub initial_turnaround_cycles: u8,
    pub initial_overrun_detect: bool,
    pub initial_select: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            swdio: 0,
            swclk: 1,
            initial_protocol: Protocol::Unknown,
            initial_last_frame: FrameKind::LineReset,
            initial_dp_version: DpVersion::V0,
            initial_turnaround_cycles: 1,
            initial_overrun_detect: false,
            initial_select: 0,
        }
    }
}

impl Settings {
    /// Build the initial [`AdiContext`] these settings describe.
    pub fn initial_context(&self) -> AdiContext {
        AdiContext {
            current_protocol: self.initial_protocol,
            last_frame: self.initial_last_frame,
            dp_version: self.initial_dp_version,
            turnaround_cycles: self.initial_turnaround_cycles,
            overrun_detect: self.initial_overrun_detect,
            select: self.initial_select,
            ..AdiContext::new()
        }
    }

    /// Serialize in the field order of the original archive: swdio,
    /// swclk, protocol, last-frame, dp-version, turnarounds, overrun
    /// detect, select — one whitespace-separated token per field.
    pub fn save(&self) -> String {
        format!(
            "{} {} {} {} {} {} {} {:x}",
            self.swdio,
            self.swclk,
            protocol_tag(self.initial_protocol),
            frame_kind_tag(self.initial_last_frame),
            dp_version_tag(self.initial_dp_version),
            self.initial_turnaround_cycles,
            self.initial_overrun_detect as u8,
            self.initial_select,
        )
    }

    pub fn load(archive: &str) -> Result<Settings, DecoderError> {
        let mut tokens = archive.split_whitespace();
        let mut next = |field: &str| -> Result<&str, DecoderError> {
            tokens
                .next()
                .ok_or_else(|| DecoderError::MalformedSettings(format!("missing field: {field}")))
        };
        let parse_u32 = |s: &str, field: &str| -> Result<u32, DecoderError> {
            s.parse()
                .map_err(|_| DecoderError::MalformedSettings(format!("bad {field}: {s}")))
        };

        let swdio = parse_u32(next("swdio")?, "swdio")?;
        let swclk = parse_u32(next("swclk")?, "swclk")?;
        let protocol = protocol_from_tag(parse_u32(next("protocol")?, "protocol")?)?;
        let last_frame = frame_kind_from_tag(parse_u32(next("lastFrame")?, "lastFrame")?)?;
        let dp_version = dp_version_from_tag(parse_u32(next("dpVersion")?, "dpVersion")?)?;
        let turnaround_cycles = parse_u32(next("turnarounds")?, "turnarounds")? as u8;
        let overrun_detect = parse_u32(next("overrunDetect")?, "overrunDetect")? != 0;
        let select_raw = next("select")?;
        let select = u32::from_str_radix(select_raw, 16)
            .map_err(|_| DecoderError::MalformedSettings(format!("bad select: {select_raw}")))?;

        Ok(Settings {
            swdio,
            swclk,
            initial_protocol: protocol,
            initial_last_frame: last_frame,
            initial_dp_version: dp_version,
            initial_turnaround_cycles: turnaround_cycles,
            initial_overrun_detect: overrun_detect,
            initial_select: select,
        })
    }
}

fn protocol_tag(p: Protocol) -> u32 {
    match p {
        Protocol::Unknown => 0,
        Protocol::Dormant => 1,
        Protocol::Jtag => 2,
        Protocol::Swd => 3,
    }
}

fn protocol_from_tag(tag: u32) -> Result<Protocol, DecoderError> {
    Ok(match tag {
        0 => Protocol::Unknown,
        1 => Protocol::Dormant,
        2 => Protocol::Jtag,
        3 => Protocol::Swd,
        other => return Err(DecoderError::MalformedSettings(format!("bad protocol tag: {other}"))),
    })
}

fn dp_version_tag(v: DpVersion) -> u32 {
    match v {
        DpVersion::V0 => 0,
        DpVersion::V1 => 1,
        DpVersion::V2 => 2,
        DpVersion::V3 => 3,
    }
}

fn dp_version_from_tag(tag: u32) -> Result<DpVersion, DecoderError> {
    Ok(match tag {
        0 => DpVersion::V0,
        1 => DpVersion::V1,
        2 => DpVersion::V2,
        3 => DpVersion::V3,
        other => return Err(DecoderError::MalformedSettings(format!("bad dp version tag: {other}"))),
    })
}

fn frame_kind_tag(k: FrameKind) -> u32 {
    use FrameKind::*;
    match k {
        LineReset => 0,
        JtagToSwd => 1,
        SwdToJtag => 2,
        JtagToDs => 3,
        SwdToDs => 4,
        JtagTlr => 5,
        IdleCycle => 6,
        DsSelectAlertPreamble => 7,
        DsSelectAlert => 8,
        DsActivationCodePreamble => 9,
        DsActivationCode => 10,
        Request => 11,
        Turnaround => 12,
        Ack => 13,
        RData => 14,
        WData => 15,
        DataParity => 16,
        Error => 17,
        Ignored => 18,
    }
}

fn frame_kind_from_tag(tag: u32) -> Result<FrameKind, DecoderError> {
    use FrameKind::*;
    Ok(match tag {
        0 => LineReset,
        1 => JtagToSwd,
        2 => SwdToJtag,
        3 => JtagToDs,
        4 => SwdToDs,
        5 => JtagTlr,
        6 => IdleCycle,
        7 => DsSelectAlertPreamble,
        8 => DsSelectAlert,
        9 => DsActivationCodePreamble,
        10 => DsActivationCode,
        11 => Request,
        12 => Turnaround,
        13 => Ack,
        14 => RData,
        15 => WData,
        16 => DataParity,
        17 => Error,
        18 => Ignored,
        other => return Err(DecoderError::MalformedSettings(format!("bad frame kind tag: {other}"))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_save_and_load() {
        let settings = Settings {
            swdio: 3,
            swclk: 7,
            initial_protocol: Protocol::Swd,
            initial_last_frame: FrameKind::Request,
            initial_dp_version: DpVersion::V2,
            initial_turnaround_cycles: 2,
            initial_overrun_detect: true,
            initial_select: 0x0000_00F0,
        };
        let archive = settings.save();
        let parsed = Settings::load(&archive).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn rejects_truncated_archive() {
        assert!(Settings::load("3 7").is_err());
    }
}
