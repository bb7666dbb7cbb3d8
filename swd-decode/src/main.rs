use anyhow::{bail, Context, Result};
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use structopt::StructOpt;
use swd::sim::SimChannel;
use swd::{BitLevel, Decoder, DpVersion, FrameKind, Protocol, Settings};

#[derive(StructOpt, Debug)]
#[structopt(
    about = "An ARM Serial Wire Debug (SWD) bit-serial protocol decoder, as specified in the ARM Debug Interface v5.2/v6 architecture specifications. Report bugs and request features at <https://github.com/swd-rs/swd>."
)]
struct Opt {
    #[structopt(long, parse(from_os_str), help = "Capture file of '<sample> <clk> <dio>' rows.")]
    input: PathBuf,

    #[structopt(long, default_value = "unknown")]
    initial_protocol: String,

    #[structopt(long, default_value = "line-reset")]
    initial_last_frame: String,

    #[structopt(long, default_value = "v0")]
    initial_dp_version: String,

    #[structopt(long, default_value = "1")]
    initial_turnaround: u8,

    #[structopt(long)]
    initial_overrun_detect: bool,

    #[structopt(long, default_value = "0", parse(try_from_str = parse_hex_u32))]
    initial_select: u32,

    #[structopt(long, parse(from_os_str), help = "Write the nine-column tab-separated record export here.")]
    export: Option<PathBuf>,
}

fn parse_hex_u32(s: &str) -> Result<u32, std::num::ParseIntError> {
    u32::from_str_radix(s.trim_start_matches("0x"), 16)
}

fn parse_protocol(s: &str) -> Result<Protocol> {
    Ok(match s {
        "unknown" => Protocol::Unknown,
        "dormant" => Protocol::Dormant,
        "jtag" => Protocol::Jtag,
        "swd" => Protocol::Swd,
        other => bail!("unrecognized protocol: {other}"),
    })
}

fn parse_dp_version(s: &str) -> Result<DpVersion> {
    Ok(match s {
        "v0" => DpVersion::V0,
        "v1" => DpVersion::V1,
        "v2" => DpVersion::V2,
        "v3" => DpVersion::V3,
        other => bail!("unrecognized DP version: {other}"),
    })
}

fn parse_last_frame(s: &str) -> Result<FrameKind> {
    Ok(match s {
        "line-reset" => FrameKind::LineReset,
        "jtag-to-swd" => FrameKind::JtagToSwd,
        "swd-to-jtag" => FrameKind::SwdToJtag,
        "idle-cycle" => FrameKind::IdleCycle,
        other => bail!("unrecognized last-frame kind: {other}"),
    })
}

/// Turn a `<sample> <clk> <dio>` capture file into a clock/data channel
/// pair, collapsing repeated samples into level-change events the way
/// `swd::sim::SimChannel` expects.
fn load_channels(path: &PathBuf) -> Result<(SimChannel, SimChannel)> {
    let text = fs::read_to_string(path).context("failed to read capture file")?;
    let mut rows = text.lines().filter(|l| !l.trim().is_empty());

    let first = rows.next().context("capture file is empty")?;
    let (_, mut clk_level, mut dio_level) = parse_row(first)?;
    let mut clk_changes = Vec::new();
    let mut dio_changes = Vec::new();

    for line in rows {
        let (sample, clk, dio) = parse_row(line)?;
        if clk != clk_level {
            clk_changes.push((sample, clk));
            clk_level = clk;
        }
        if dio != dio_level {
            dio_changes.push((sample, dio));
            dio_level = dio;
        }
    }

    let (_, initial_clk, initial_dio) = parse_row(first)?;
    Ok((
        SimChannel::new(initial_clk, clk_changes),
        SimChannel::new(initial_dio, dio_changes),
    ))
}

fn parse_row(line: &str) -> Result<(u64, BitLevel, BitLevel)> {
    let mut cols = line.split_whitespace();
    let sample: u64 = cols
        .next()
        .context("missing sample column")?
        .parse()
        .context("bad sample column")?;
    let clk: u8 = cols.next().context("missing clk column")?.parse().context("bad clk column")?;
    let dio: u8 = cols.next().context("missing dio column")?.parse().context("bad dio column")?;
    Ok((sample, BitLevel::from_high(clk != 0), BitLevel::from_high(dio != 0)))
}

fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let settings = Settings {
        initial_protocol: parse_protocol(&opt.initial_protocol)?,
        initial_last_frame: parse_last_frame(&opt.initial_last_frame)?,
        initial_dp_version: parse_dp_version(&opt.initial_dp_version)?,
        initial_turnaround_cycles: opt.initial_turnaround,
        initial_overrun_detect: opt.initial_overrun_detect,
        initial_select: opt.initial_select,
        ..Settings::default()
    };

    let (clk, dio) = load_channels(&opt.input)?;
    let mut decoder = Decoder::new(clk, dio, settings.initial_context()).context("failed to start decoder")?;

    let mut export = match &opt.export {
        Some(path) => Some(File::create(path).context("failed to create export file")?),
        None => None,
    };
    if let Some(file) = export.as_mut() {
        writeln!(
            file,
            "Time\tType\tR/W\tAP/DP\tRegister\tRequest byte\tACK\tData\tData details"
        )?;
    }

    for frame in decoder.frames() {
        let frame = frame.context("decoder error")?;
        match export.as_mut() {
            Some(file) => write_export_row(file, &frame)?,
            None => println!("{frame:#?}"),
        }
    }

    Ok(())
}

fn write_export_row(file: &mut File, frame: &swd::DecodedFrame) -> Result<()> {
    let v2 = &frame.frame_v2;
    let rw = match v2.rnw {
        Some(true) => "R",
        Some(false) => "W",
        None => "",
    };
    let apdp = match v2.apndp {
        Some(true) => "AP",
        Some(false) => "DP",
        None => "",
    };
    let register = v2
        .reg
        .map(|r| format!("{r:?}"))
        .unwrap_or_default();
    let request_byte = frame.frame.data1 & 0xFF;
    let ack = v2.ack.map(|a| a.to_string()).unwrap_or_default();
    let data = v2.data.map(|d| format!("{d:#010x}")).unwrap_or_default();
    let details = match (v2.reg, v2.data, v2.rnw) {
        (Some(reg), Some(data), Some(rnw)) => swd::describe_fields(reg, data, rnw),
        _ => String::new(),
    };
    writeln!(
        file,
        "{}\t{}\t{rw}\t{apdp}\t{register}\t{request_byte:#04x}\t{ack}\t{data}\t{details}",
        v2.start_sample, v2.ty,
    )?;
    Ok(())
}
