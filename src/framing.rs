//! Locating frames in a continuous byte stream
//!
//! A `FrameReceiver` is fed one byte at a time. It scans for the two
//! `0xAA` bytes of `VALID_HEADER`, buffers the rest of the frame and hands
//! the complete frame to `codec::decode`. A rejected frame only costs its
//! first byte: the remaining buffered bytes are scanned again, so a frame
//! that started inside the rejected one is not lost.

use core::marker::PhantomData;
use core::slice;

use heapless::Vec;

use crate::codec::{self, Frame, MAX_FRAME_SIZE};
use crate::{Config, Error};

// Both bytes of VALID_HEADER
const SYNC_BYTE: u8 = 0xAA;

/// Receiver state between two bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Looking for the header
    Seeking,
    /// Header found, buffering the rest of the frame
    Accumulating,
}

/// Reassembles frames of type `F` from single bytes
pub struct FrameReceiver<F> {
    buffer: Vec<u8, MAX_FRAME_SIZE>,
    stall_limit: u16,
    idle_polls: u16,
    _frame: PhantomData<F>,
}

impl<F: Frame> Default for FrameReceiver<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Frame> FrameReceiver<F> {
    /// Creates a receiver using the default stall limit
    pub fn new() -> Self {
        Self::with_stall_limit(Config::default().stall_limit)
    }

    /// Creates a receiver that gives up on a partial frame after `stall_limit`
    /// consecutive calls to `idle`. `0` never gives up.
    pub fn with_stall_limit(stall_limit: u16) -> Self {
        FrameReceiver {
            buffer: Vec::new(),
            stall_limit,
            idle_polls: 0,
            _frame: PhantomData,
        }
    }

    /// Current state
    pub fn state(&self) -> State {
        if self.buffer.len() >= 2 {
            State::Accumulating
        } else {
            State::Seeking
        }
    }

    /// Number of bytes buffered for the frame in progress
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drops any partial frame and starts seeking again
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.idle_polls = 0;
    }

    /// Feeds one byte
    ///
    /// Returns `WouldBlock` until a complete frame has been buffered, then
    /// either the verified frame or the reason it was rejected.
    pub fn push(&mut self, byte: u8) -> nb::Result<F, Error> {
        self.idle_polls = 0;

        if self.state() == State::Seeking {
            if byte == SYNC_BYTE {
                self.store(byte)?;
            } else {
                self.buffer.clear();
            }
            return Err(nb::Error::WouldBlock);
        }

        self.store(byte)?;
        if self.buffer.len() < F::SIZE {
            return Err(nb::Error::WouldBlock);
        }

        match codec::decode::<F>(&self.buffer) {
            Ok(frame) => {
                trace!("frame delivered");
                self.buffer.clear();
                Ok(frame)
            }
            Err(e) => {
                if e.is_link_reset() {
                    debug!("link reset frame skipped");
                } else {
                    warn!("frame rejected: {}", e);
                }
                self.resync();
                Err(nb::Error::Other(e))
            }
        }
    }

    /// Reports that the transport had no byte to give
    ///
    /// A partial frame is abandoned with `TransportStall` once the stall
    /// limit is reached.
    pub fn idle(&mut self) -> Result<(), Error> {
        if self.state() != State::Accumulating || self.stall_limit == 0 {
            return Ok(());
        }

        self.idle_polls = self.idle_polls.saturating_add(1);
        if self.idle_polls >= self.stall_limit {
            warn!(
                "transport stalled with {} of {} bytes buffered",
                self.buffer.len(),
                F::SIZE
            );
            self.reset();
            return Err(Error::TransportStall);
        }

        Ok(())
    }

    /// Feeds a slice, yielding every verdict it produces
    pub fn frames<'r, 'b>(&'r mut self, bytes: &'b [u8]) -> Frames<'r, 'b, F> {
        Frames {
            receiver: self,
            bytes: bytes.iter(),
        }
    }

    fn store(&mut self, byte: u8) -> Result<(), Error> {
        if self.buffer.push(byte).is_err() {
            // F::SIZE larger than MAX_FRAME_SIZE
            self.buffer.clear();
            return Err(Error::ParseError);
        }

        Ok(())
    }

    // Drop the first byte and restart from the next header candidate
    fn resync(&mut self) {
        let len = self.buffer.len();
        let rest = &self.buffer[1.min(len)..];

        let skip = match rest
            .windows(2)
            .position(|w| w[0] == SYNC_BYTE && w[1] == SYNC_BYTE)
        {
            Some(i) => i,
            None if rest.last() == Some(&SYNC_BYTE) => rest.len() - 1,
            None => rest.len(),
        } + 1;

        let skip = skip.min(len);
        debug!("resync skipped {} bytes", skip);
        self.buffer.copy_within(skip.., 0);
        self.buffer.truncate(len - skip);
    }
}

/// Iterator returned by `FrameReceiver::frames`
pub struct Frames<'r, 'b, F> {
    receiver: &'r mut FrameReceiver<F>,
    bytes: slice::Iter<'b, u8>,
}

impl<'r, 'b, F: Frame> Iterator for Frames<'r, 'b, F> {
    type Item = Result<F, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        for &byte in &mut self.bytes {
            match self.receiver.push(byte) {
                Ok(frame) => return Some(Ok(frame)),
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(e)) => return Some(Err(e)),
            }
        }

        None
    }
}
