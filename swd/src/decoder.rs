//! The decode loop (spec §4.6): feeds sampled bits to every eligible
//! matcher concurrently, arbitrates the best match once one completes,
//! and falls back to a one-bit error/ignored frame when none ever will.

use std::collections::VecDeque;

use log::{debug, trace};

use crate::bit::SwdBit;
use crate::buffer::BitBuffer;
use crate::channel::ChannelReader;
use crate::context::{AdiContext, FrameKind, Protocol};
use crate::error::DecoderError;
use crate::frame::{Frame, FrameV2, Marker, MarkerKind};
use crate::sequence::Sequence;
use crate::pattern::CmpState;

/// One committed result: the legacy and v2 frame plus any per-bit
/// markers the matcher produced.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub frame: Frame,
    pub frame_v2: FrameV2,
    pub markers: Vec<Marker>,
}

/// Drives a clock/data [`ChannelReader`] pair through the SWD decode
/// loop, yielding one [`DecodedFrame`] per call to [`Decoder::next_frame`].
pub struct Decoder<CLK: ChannelReader, DIO: ChannelReader> {
    sampler: crate::channel::Sampler<CLK, DIO>,
    buffer: BitBuffer,
    matchers: Vec<Sequence>,
    ctx: AdiContext,
    exhausted: bool,
    /// Sub-frames of a winning commit beyond the first, queued up so
    /// `next_frame` still yields one frame per call (spec §4.8/§5: a
    /// transaction commits several sub-frames in left-to-right order).
    pending: VecDeque<DecodedFrame>,
}

impl<CLK: ChannelReader, DIO: ChannelReader> Decoder<CLK, DIO> {
    pub fn new(clk: CLK, dio: DIO, ctx: AdiContext) -> Result<Self, DecoderError> {
        Ok(Decoder {
            sampler: crate::channel::Sampler::new(clk, dio)?,
            buffer: BitBuffer::new(),
            matchers: Sequence::all(),
            ctx,
            exhausted: false,
            pending: VecDeque::new(),
        })
    }

    pub fn context(&self) -> &AdiContext {
        &self.ctx
    }

    /// A borrowing iterator, for callers that want to keep the `Decoder`
    /// (and its context) around after iteration finishes instead of
    /// consuming it as `IntoIterator` would.
    pub fn frames(&mut self) -> crate::iter::Frames<'_, CLK, DIO> {
        crate::iter::Frames::new(self)
    }

    fn reset_matchers(&mut self) {
        for m in &mut self.matchers {
            m.reset();
        }
    }

    /// Run the matchers over however much of the buffer they haven't yet
    /// seen and decide whether any of them has won (spec §4.6 steps 2-4):
    /// a fixed-length `Complete` always wins immediately; a
    /// variable-length `Complete` only wins once no matcher at all —
    /// fixed or variable — is still `Partial`, since any of them might
    /// still turn into a longer, more specific match (a still-building
    /// `JTAG_TO_SWD` must not be preempted by the leading idle bits its
    /// own pattern happens to start with; the LINE_RESET/TARGETSEL race
    /// of spec §4.4 is the variable/variable case of the same rule).
    fn poll_matchers(&mut self) -> Option<usize> {
        let mut steps = Vec::with_capacity(self.matchers.len());
        for m in &mut self.matchers {
            if !m.eligible(self.ctx.current_protocol, self.ctx.last_frame) {
                steps.push(None);
                continue;
            }
            let state = m.step(&self.buffer, &self.ctx);
            steps.push(Some((state, m.is_variable_length(), m.checked_bits())));
        }

        let mut fixed_complete: Option<(usize, usize)> = None;
        let mut variable_complete: Option<(usize, usize)> = None;
        let mut any_partial = false;

        for (i, step) in steps.iter().enumerate() {
            let (state, variable, bits) = match step {
                Some(s) => *s,
                None => continue,
            };
            match (state, variable) {
                (CmpState::Complete, false) => {
                    if fixed_complete.map_or(true, |(_, best_bits)| bits > best_bits) {
                        fixed_complete = Some((i, bits));
                    }
                }
                (CmpState::Complete, true) => {
                    if variable_complete.map_or(true, |(_, best_bits)| bits > best_bits) {
                        variable_complete = Some((i, bits));
                    }
                }
                (CmpState::Partial, _) => any_partial = true,
                _ => {}
            }
        }

        fixed_complete
            .or_else(|| if any_partial { None } else { variable_complete })
            .map(|(i, _)| i)
    }

    /// Pull one decoded frame out of the stream, running the sampler as
    /// needed to grow the bit buffer.
    pub fn next_frame(&mut self) -> Result<Option<DecodedFrame>, DecoderError> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(Some(frame));
            }

            if let Some(winner) = self.poll_matchers() {
                let claimed = self.matchers[winner].checked_bits();
                let prefix = self.buffer.drain_front(claimed);
                let protocol_before = self.ctx.current_protocol;
                let commit = self.matchers[winner].commit(&prefix, &mut self.ctx);
                trace!("matcher {winner} committed {claimed} bits as {:?}", commit.new_frame_kind);
                self.ctx.last_frame = commit.new_frame_kind;
                if self.ctx.current_protocol != protocol_before {
                    debug!(
                        "protocol transition: {protocol_before:?} -> {:?}",
                        self.ctx.current_protocol
                    );
                }
                self.reset_matchers();

                let mut sub_frames = commit.frames.into_iter();
                let (frame, frame_v2) = sub_frames
                    .next()
                    .expect("a commit always produces at least one frame");
                self.pending.extend(sub_frames.map(|(frame, frame_v2)| DecodedFrame {
                    frame,
                    frame_v2,
                    markers: Vec::new(),
                }));
                return Ok(Some(DecodedFrame {
                    frame,
                    frame_v2,
                    markers: commit.markers,
                }));
            }

            if self.all_mismatched() {
                if let Some(bit) = self.buffer.pop_front() {
                    debug!("no eligible matcher recognized bit {}, flushing as error/ignored", bit.is_high() as u8);
                    self.reset_matchers();
                    return Ok(Some(Self::error_frame(bit, self.ctx.last_frame)));
                }
            }

            if self.exhausted {
                return Ok(None);
            }

            match self.sampler.next_bit() {
                Ok(bit) => self.buffer.push(bit),
                Err(DecoderError::ChannelExhausted) => {
                    self.exhausted = true;
                    if self.buffer.is_empty() {
                        return Ok(None);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn all_mismatched(&self) -> bool {
        self.matchers
            .iter()
            .filter(|m| m.eligible(self.ctx.current_protocol, self.ctx.last_frame))
            .all(|m| m.state() == CmpState::Mismatch)
    }

    /// A single stray bit that no eligible matcher could ever claim:
    /// reported as `IGNORED` once the line is known to be an unrelated
    /// protocol, `ERROR` otherwise (spec §4.6).
    fn error_frame(bit: SwdBit, last: FrameKind) -> DecodedFrame {
        let kind = if last == FrameKind::JtagToSwd || last == FrameKind::SwdToJtag {
            FrameKind::Ignored
        } else {
            FrameKind::Error
        };
        let frame = Frame {
            kind,
            start_sample: bit.start_sample(),
            end_sample: bit.end_sample(),
            flags: 0,
            data1: bit.is_high() as u64,
            data2: 0,
        };
        let frame_v2 = FrameV2::new(kind, "ERROR", frame.start_sample, frame.end_sample);
        let marker = Marker {
            sample: bit.rising,
            kind: if bit.is_high() { MarkerKind::One } else { MarkerKind::Zero },
        };
        DecodedFrame {
            frame,
            frame_v2,
            markers: vec![marker],
        }
    }
}

impl<CLK: ChannelReader, DIO: ChannelReader> Iterator for Decoder<CLK, DIO> {
    type Item = Result<DecodedFrame, DecoderError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_frame() {
            Ok(Some(f)) => Some(Ok(f)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
