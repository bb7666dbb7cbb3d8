//! Borrowing iterator adapter over a [`Decoder`], mirroring the
//! teacher crate's `Singles` — a thin wrapper so callers can hold on to
//! the `Decoder` (and its [`AdiContext`](crate::context::AdiContext))
//! while iterating, instead of `Decoder` itself being consumed.

use crate::channel::ChannelReader;
use crate::decoder::{DecodedFrame, Decoder};
use crate::error::DecoderError;

/// Iterator that yields [`DecodedFrame`]s from a borrowed [`Decoder`].
pub struct Frames<'a, CLK, DIO>
where
    CLK: ChannelReader,
    DIO: ChannelReader,
{
    decoder: &'a mut Decoder<CLK, DIO>,
}

impl<'a, CLK, DIO> Frames<'a, CLK, DIO>
where
    CLK: ChannelReader,
    DIO: ChannelReader,
{
    pub(super) fn new(decoder: &'a mut Decoder<CLK, DIO>) -> Self {
        Self { decoder }
    }
}

impl<'a, CLK, DIO> Iterator for Frames<'a, CLK, DIO>
where
    CLK: ChannelReader,
    DIO: ChannelReader,
{
    type Item = Result<DecodedFrame, DecoderError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.next_frame().transpose()
    }
}
