//! XOR checksum over frame fields
//!
//! Every field is widened to 16 bits (zero extension for unsigned values,
//! two's complement bits for signed ones) and folded with XOR, in
//! declaration order. The checksum field itself is never folded.
//!
//! A single corrupted field is always detected. Two corrupted fields can
//! cancel each other out, so this is not a guarantee against multi-bit
//! corruption.

use crate::commands::{BuzzerState, Command, MotorState};
use crate::responses::{Feedback, MotorFeedback};

/// Types carrying a 16 bit XOR checksum
pub trait Checksum {
    /// Computes the checksum over the fields of `self`
    fn calculate_checksum(&self) -> u16;
}

fn fold(fields: &[u16]) -> u16 {
    fields.iter().fold(0, |acc, field| acc ^ field)
}

impl Checksum for MotorState {
    fn calculate_checksum(&self) -> u16 {
        fold(&[
            u16::from(self.enable),
            self.pwm as u16,
            u16::from(self.ctrl_typ.value()),
            u16::from(self.ctrl_mod.value()),
            u16::from(self.i_mot_max),
            u16::from(self.i_dc_max),
            self.n_mot_max,
            u16::from(self.field_weak_max),
            u16::from(self.phase_adv_max),
            u16::from(self.cruise_ctrl_ena),
            self.n_cruise_mot_tgt as u16,
        ])
    }
}

impl Checksum for BuzzerState {
    fn calculate_checksum(&self) -> u16 {
        u16::from(self.freq) ^ u16::from(self.pattern)
    }
}

impl Checksum for Command {
    fn calculate_checksum(&self) -> u16 {
        fold(&[
            self.start,
            self.left.calculate_checksum(),
            self.right.calculate_checksum(),
            self.buzzer.calculate_checksum(),
            u16::from(self.poweroff),
            u16::from(self.led),
            u16::from(self.cruise_ctrl_acv),
            u16::from(self.standstill_acv),
            u16::from(self.electric_brake_amount),
        ])
    }
}

// `id` and `iq` are left out, the board firmware does not fold them either.
impl Checksum for MotorFeedback {
    fn calculate_checksum(&self) -> u16 {
        fold(&[
            self.angle as u16,
            self.speed as u16,
            u16::from(self.error),
            self.dc_link as u16,
            self.dc_pha_a as u16,
            self.dc_pha_b as u16,
            self.dc_pha_c as u16,
            self.chops,
            u16::from(self.hall_a),
            u16::from(self.hall_b),
            u16::from(self.hall_c),
        ])
    }
}

impl Checksum for Feedback {
    fn calculate_checksum(&self) -> u16 {
        fold(&[
            self.start,
            self.left.calculate_checksum(),
            self.right.calculate_checksum(),
            self.bat_voltage as u16,
            self.board_temp as u16,
            self.timeout_cnt_serial as u16,
            u16::from(self.cruise_ctrl_acv),
            u16::from(self.standstill_acv),
            u16::from(self.electric_brake_amount),
        ])
    }
}
