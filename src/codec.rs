//! Wire layout of the frames
//!
//! Fields are written in declaration order at their natural width with no
//! padding: one byte for `bool`, `u8` and the control enums, two little
//! endian bytes for `i16` and `u16`.

use byteorder::{ByteOrder, LittleEndian};

use crate::checksum::Checksum;
use crate::commands::{BuzzerState, Command, ControlMode, ControlType, MotorState};
use crate::responses::{Feedback, MotorFeedback};
use crate::{Error, INVALID_HEADER, VALID_HEADER};

/// Encoded size of a `MotorState`
pub const MOTOR_STATE_SIZE: usize = 14;
/// Encoded size of a `MotorFeedback`
pub const MOTOR_FEEDBACK_SIZE: usize = 22;
/// Encoded size of a `Command` frame
pub const COMMAND_SIZE: usize = 2 + 2 * MOTOR_STATE_SIZE + 2 + 5 + 2;
/// Encoded size of a `Feedback` frame
pub const FEEDBACK_SIZE: usize = 2 + 2 * MOTOR_FEEDBACK_SIZE + 6 + 3 + 2;
/// Size of the largest frame, used to size receive buffers
pub const MAX_FRAME_SIZE: usize = if COMMAND_SIZE > FEEDBACK_SIZE {
    COMMAND_SIZE
} else {
    FEEDBACK_SIZE
};

/// A fixed-size frame that can travel over the link
pub trait Frame: Checksum + Sized {
    /// Encoded size in bytes
    const SIZE: usize;

    /// The `start` field
    fn header(&self) -> u16;

    /// The `checksum` field as stored in the frame
    fn stored_checksum(&self) -> u16;

    /// Writes the frame into `buf`, returns the number of bytes written
    fn encode(&self, buf: &mut [u8]) -> Result<usize, Error>;

    /// Reads the fields of a frame from `buf` without checking header or checksum
    fn parse(buf: &[u8]) -> Result<Self, Error>;
}

/// Checks header and checksum of a frame
///
/// The header is checked first, a frame with a foreign header is always a
/// `HeaderMismatch`.
pub fn verify<F: Frame>(frame: &F) -> Result<(), Error> {
    check_header(frame.header())?;

    let expected = frame.calculate_checksum();
    let found = frame.stored_checksum();
    if expected != found {
        return Err(Error::ChecksumMismatch { expected, found });
    }

    Ok(())
}

/// Parses a frame from `buf` and verifies it
pub fn decode<F: Frame>(buf: &[u8]) -> Result<F, Error> {
    if buf.len() < F::SIZE {
        return Err(Error::ParseError);
    }
    check_header(LittleEndian::read_u16(&buf[0..2]))?;

    let frame = F::parse(buf)?;
    verify(&frame)?;

    Ok(frame)
}

fn check_header(found: u16) -> Result<(), Error> {
    if found == INVALID_HEADER {
        debug!("link reset frame");
    }
    if found != VALID_HEADER {
        return Err(Error::HeaderMismatch { found });
    }

    Ok(())
}

struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    fn new(buf: &'a mut [u8], len: usize) -> Result<Self, Error> {
        if buf.len() < len {
            return Err(Error::ParseError);
        }
        Ok(Writer { buf, pos: 0 })
    }

    fn u8(&mut self, value: u8) {
        self.buf[self.pos] = value;
        self.pos += 1;
    }

    fn bool(&mut self, value: bool) {
        self.u8(value as u8);
    }

    fn u16(&mut self, value: u16) {
        LittleEndian::write_u16(&mut self.buf[self.pos..self.pos + 2], value);
        self.pos += 2;
    }

    fn i16(&mut self, value: i16) {
        LittleEndian::write_i16(&mut self.buf[self.pos..self.pos + 2], value);
        self.pos += 2;
    }

    fn motor_state(&mut self, state: &MotorState) {
        self.bool(state.enable);
        self.i16(state.pwm);
        self.u8(state.ctrl_typ.value());
        self.u8(state.ctrl_mod.value());
        self.u8(state.i_mot_max);
        self.u8(state.i_dc_max);
        self.u16(state.n_mot_max);
        self.u8(state.field_weak_max);
        self.u8(state.phase_adv_max);
        self.bool(state.cruise_ctrl_ena);
        self.i16(state.n_cruise_mot_tgt);
    }

    fn motor_feedback(&mut self, feedback: &MotorFeedback) {
        self.i16(feedback.angle);
        self.i16(feedback.speed);
        self.u8(feedback.error);
        self.i16(feedback.dc_link);
        self.i16(feedback.dc_pha_a);
        self.i16(feedback.dc_pha_b);
        self.i16(feedback.dc_pha_c);
        self.u16(feedback.chops);
        self.i16(feedback.id);
        self.i16(feedback.iq);
        self.bool(feedback.hall_a);
        self.bool(feedback.hall_b);
        self.bool(feedback.hall_c);
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8], len: usize) -> Result<Self, Error> {
        if buf.len() < len {
            return Err(Error::ParseError);
        }
        Ok(Reader { buf, pos: 0 })
    }

    fn u8(&mut self) -> u8 {
        let value = self.buf[self.pos];
        self.pos += 1;
        value
    }

    // Anything but 0 or 1 is a corrupted byte, not a truthy one
    fn bool(&mut self) -> Result<bool, Error> {
        match self.u8() {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(Error::ParseError),
        }
    }

    fn u16(&mut self) -> u16 {
        let value = LittleEndian::read_u16(&self.buf[self.pos..self.pos + 2]);
        self.pos += 2;
        value
    }

    fn i16(&mut self) -> i16 {
        let value = LittleEndian::read_i16(&self.buf[self.pos..self.pos + 2]);
        self.pos += 2;
        value
    }

    fn motor_state(&mut self) -> Result<MotorState, Error> {
        Ok(MotorState {
            enable: self.bool()?,
            pwm: self.i16(),
            ctrl_typ: ControlType::from_u8(self.u8())?,
            ctrl_mod: ControlMode::from_u8(self.u8())?,
            i_mot_max: self.u8(),
            i_dc_max: self.u8(),
            n_mot_max: self.u16(),
            field_weak_max: self.u8(),
            phase_adv_max: self.u8(),
            cruise_ctrl_ena: self.bool()?,
            n_cruise_mot_tgt: self.i16(),
        })
    }

    fn motor_feedback(&mut self) -> Result<MotorFeedback, Error> {
        Ok(MotorFeedback {
            angle: self.i16(),
            speed: self.i16(),
            error: self.u8(),
            dc_link: self.i16(),
            dc_pha_a: self.i16(),
            dc_pha_b: self.i16(),
            dc_pha_c: self.i16(),
            chops: self.u16(),
            id: self.i16(),
            iq: self.i16(),
            hall_a: self.bool()?,
            hall_b: self.bool()?,
            hall_c: self.bool()?,
        })
    }
}

impl Frame for Command {
    const SIZE: usize = COMMAND_SIZE;

    fn header(&self) -> u16 {
        self.start
    }

    fn stored_checksum(&self) -> u16 {
        self.checksum
    }

    fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut w = Writer::new(buf, Self::SIZE)?;
        w.u16(self.start);
        w.motor_state(&self.left);
        w.motor_state(&self.right);
        w.u8(self.buzzer.freq);
        w.u8(self.buzzer.pattern);
        w.bool(self.poweroff);
        w.bool(self.led);
        w.bool(self.cruise_ctrl_acv);
        w.bool(self.standstill_acv);
        w.u8(self.electric_brake_amount);
        w.u16(self.checksum);

        Ok(w.pos)
    }

    fn parse(buf: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(buf, Self::SIZE)?;
        Ok(Command {
            start: r.u16(),
            left: r.motor_state()?,
            right: r.motor_state()?,
            buzzer: BuzzerState {
                freq: r.u8(),
                pattern: r.u8(),
            },
            poweroff: r.bool()?,
            led: r.bool()?,
            cruise_ctrl_acv: r.bool()?,
            standstill_acv: r.bool()?,
            electric_brake_amount: r.u8(),
            checksum: r.u16(),
        })
    }
}

impl Frame for Feedback {
    const SIZE: usize = FEEDBACK_SIZE;

    fn header(&self) -> u16 {
        self.start
    }

    fn stored_checksum(&self) -> u16 {
        self.checksum
    }

    fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut w = Writer::new(buf, Self::SIZE)?;
        w.u16(self.start);
        w.motor_feedback(&self.left);
        w.motor_feedback(&self.right);
        w.i16(self.bat_voltage);
        w.i16(self.board_temp);
        w.i16(self.timeout_cnt_serial);
        w.bool(self.cruise_ctrl_acv);
        w.bool(self.standstill_acv);
        w.u8(self.electric_brake_amount);
        w.u16(self.checksum);

        Ok(w.pos)
    }

    fn parse(buf: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(buf, Self::SIZE)?;
        Ok(Feedback {
            start: r.u16(),
            left: r.motor_feedback()?,
            right: r.motor_feedback()?,
            bat_voltage: r.i16(),
            board_temp: r.i16(),
            timeout_cnt_serial: r.i16(),
            cruise_ctrl_acv: r.bool()?,
            standstill_acv: r.bool()?,
            electric_brake_amount: r.u8(),
            checksum: r.u16(),
        })
    }
}

impl Command {
    /// Encodes the frame as is, checksum included
    pub fn to_bytes(&self) -> [u8; COMMAND_SIZE] {
        let mut buf = [0u8; COMMAND_SIZE];
        // Cannot fail, the buffer is exactly one frame long
        self.encode(&mut buf).ok();
        buf
    }

    /// Decodes and verifies a frame
    pub fn from_bytes(bytes: &[u8; COMMAND_SIZE]) -> Result<Self, Error> {
        decode(bytes)
    }
}

impl Feedback {
    /// Encodes the frame as is, checksum included
    pub fn to_bytes(&self) -> [u8; FEEDBACK_SIZE] {
        let mut buf = [0u8; FEEDBACK_SIZE];
        // Cannot fail, the buffer is exactly one frame long
        self.encode(&mut buf).ok();
        buf
    }

    /// Decodes and verifies a frame
    pub fn from_bytes(bytes: &[u8; FEEDBACK_SIZE]) -> Result<Self, Error> {
        decode(bytes)
    }
}
