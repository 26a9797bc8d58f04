//! Hoverboard serial protocol library
//!
//! Host side of the UART link to a dual-motor hoverboard driver board.
//! Every frame is a fixed-size, little endian record that starts with
//! `VALID_HEADER` and ends with an XOR checksum over its fields.

#![no_std]
#![deny(missing_docs)]

#[macro_use(block)]
extern crate nb;

// Must come first, the logging macros are textually scoped
mod fmt;

use embedded_hal::serial::{Read, Write};
use failure::Fail;

pub mod checksum;
pub mod codec;
pub mod commands;
pub mod framing;
pub mod responses;

pub use crate::checksum::Checksum;
pub use crate::codec::{decode, verify, Frame, COMMAND_SIZE, FEEDBACK_SIZE};
pub use crate::commands::{BuzzerState, Command, ControlMode, ControlType, MotorState};
pub use crate::framing::{FrameReceiver, State};
pub use crate::responses::{Feedback, MotorFeedback};

/// Header of every usable frame
pub const VALID_HEADER: u16 = 0xAAAA;
/// Header sent on purpose to signal "no data" or a link reset
pub const INVALID_HEADER: u16 = 0xFFFF;

/// Link settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Consecutive empty reads tolerated in the middle of a frame before it
    /// is abandoned with `Error::TransportStall`. `0` waits forever.
    pub stall_limit: u16,
    /// Refuse to send commands pairing `Speed`/`Torque` with a non-FOC control type
    pub strict_modes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            stall_limit: 64,
            strict_modes: true,
        }
    }
}

/// Connection to a hoverboard
pub struct HoverboardConnection<R, W> {
    r: R,
    w: W,
    config: Config,
    receiver: FrameReceiver<Feedback>,
    last_feedback: Option<Feedback>,
}

impl<R: Read<u8>, W: Write<u8>> HoverboardConnection<R, W> {
    /// Open a new connection with a hoverboard using the default `Config`
    pub fn new(r: R, w: W) -> Self {
        Self::with_config(r, w, Config::default())
    }

    /// Open a new connection with a hoverboard
    pub fn with_config(r: R, w: W, config: Config) -> Self {
        HoverboardConnection {
            r,
            w,
            config,
            receiver: FrameReceiver::with_stall_limit(config.stall_limit),
            last_feedback: None,
        }
    }

    /// Settings in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sends a command to the board
    ///
    /// The header and checksum are filled in, whatever `command` carries.
    pub fn send_command(&mut self, command: &Command) -> nb::Result<(), Error> {
        if self.config.strict_modes {
            command.validate()?;
        }

        write_frame(&command.sealed(), &mut self.w)
    }

    /// Tells the board there is no data, by sending a frame with `INVALID_HEADER`
    pub fn send_link_reset(&mut self) -> nb::Result<(), Error> {
        debug!("sending link reset");
        write_frame(&Command::link_reset(), &mut self.w)
    }

    /// Reads the next feedback frame
    ///
    /// Consumes bytes until a frame is complete or the reader runs dry, in
    /// which case `WouldBlock` is returned and the partial frame is kept for
    /// the next call. Rejected frames are reported as errors; calling again
    /// resumes from the byte after the rejected header.
    pub fn read_feedback(&mut self) -> nb::Result<Feedback, Error> {
        loop {
            let byte = match self.r.read() {
                Ok(byte) => byte,
                Err(nb::Error::WouldBlock) => {
                    self.receiver.idle()?;
                    return Err(nb::Error::WouldBlock);
                }
                Err(nb::Error::Other(_)) => {
                    error!("serial read failed");
                    return Err(nb::Error::Other(Error::IoError));
                }
            };

            match self.receiver.push(byte) {
                Ok(feedback) => {
                    self.last_feedback = Some(feedback);
                    return Ok(feedback);
                }
                Err(nb::Error::WouldBlock) => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// The last feedback that passed verification
    pub fn last_feedback(&self) -> Option<&Feedback> {
        self.last_feedback.as_ref()
    }

    /// Closes the connection, handing back the serial halves
    pub fn release(self) -> (R, W) {
        (self.r, self.w)
    }
}

// Encodes a frame and writes it out byte by byte
fn write_frame<F: Frame, W: Write<u8>>(frame: &F, w: &mut W) -> nb::Result<(), Error> {
    let mut buf = [0u8; codec::MAX_FRAME_SIZE];
    let len = frame.encode(&mut buf)?;

    for byte in &buf[..len] {
        block!(w.write(*byte)).map_err(|_| Error::IoError)?;
    }
    block!(w.flush()).map_err(|_| Error::IoError)?;

    trace!("sent {} byte frame", len);
    Ok(())
}

/// Errors returned by the codec and the connection
#[derive(Fail, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Error occured during IO
    #[fail(display = "Error occured during IO")]
    IoError,
    /// Frame does not start with `VALID_HEADER`
    #[fail(display = "Header mismatch, found {:#06x}", found)]
    HeaderMismatch {
        /// Header that was received
        found: u16,
    },
    /// Checksum mismatch
    #[fail(
        display = "Checksum mismatch, expected {:#06x}, found {:#06x}",
        expected, found
    )]
    ChecksumMismatch {
        /// Checksum computed over the received fields
        expected: u16,
        /// Checksum stored in the frame
        found: u16,
    },
    /// No byte arrived for too long in the middle of a frame
    #[fail(display = "Transport stalled in the middle of a frame")]
    TransportStall,
    /// `Speed` or `Torque` requested without `FieldOrientedControl`
    #[fail(display = "{:?} is not available with {:?}", ctrl_mod, ctrl_typ)]
    IncompatibleMode {
        /// Requested control type
        ctrl_typ: ControlType,
        /// Requested control mode
        ctrl_mod: ControlMode,
    },
    /// Error occured during parsing
    #[fail(display = "Error occured during parsing")]
    ParseError,
}

impl Error {
    /// Whether this is a deliberate `INVALID_HEADER` frame rather than corruption
    pub fn is_link_reset(&self) -> bool {
        matches!(
            self,
            Error::HeaderMismatch {
                found: INVALID_HEADER
            }
        )
    }
}
