//! Feedback sent from the board to the host

use crate::checksum::Checksum;
use crate::{INVALID_HEADER, VALID_HEADER};

/// Telemetry of a single motor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorFeedback {
    /// Rotor angle
    pub angle: i16,
    /// Motor speed
    pub speed: i16,
    /// Fault code, 0 when healthy
    pub error: u8,
    /// DC link current
    pub dc_link: i16,
    /// Phase A current
    pub dc_pha_a: i16,
    /// Phase B current
    pub dc_pha_b: i16,
    /// Phase C current
    pub dc_pha_c: i16,
    /// Chopper event counter
    pub chops: u16,
    /// D axis current. Not covered by the checksum
    pub id: i16,
    /// Q axis current. Not covered by the checksum
    pub iq: i16,
    /// Hall sensor A
    pub hall_a: bool,
    /// Hall sensor B
    pub hall_b: bool,
    /// Hall sensor C
    pub hall_c: bool,
}

/// Feedback frame, board to host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Feedback {
    /// Frame header, `VALID_HEADER` for a usable frame
    pub start: u16,
    /// Left motor
    pub left: MotorFeedback,
    /// Right motor
    pub right: MotorFeedback,
    /// Battery voltage in V * 100
    pub bat_voltage: i16,
    /// Board temperature in C * 10
    pub board_temp: i16,
    /// Control cycles since the board last received a valid command
    pub timeout_cnt_serial: i16,
    /// Cruise control active
    pub cruise_ctrl_acv: bool,
    /// Standstill hold active
    pub standstill_acv: bool,
    /// Electric brake amount
    pub electric_brake_amount: u8,
    /// Checksum over every other field
    pub checksum: u16,
}

impl Default for Feedback {
    fn default() -> Self {
        Feedback {
            start: VALID_HEADER,
            left: MotorFeedback::default(),
            right: MotorFeedback::default(),
            bat_voltage: 0,
            board_temp: 0,
            timeout_cnt_serial: 0,
            cruise_ctrl_acv: false,
            standstill_acv: false,
            electric_brake_amount: 0,
            checksum: 0,
        }
        .sealed()
    }
}

impl Feedback {
    /// Returns a copy with a valid header and an up to date checksum
    pub fn sealed(mut self) -> Self {
        self.start = VALID_HEADER;
        self.checksum = self.calculate_checksum();
        self
    }

    /// An empty feedback carrying `INVALID_HEADER`, tells the host there is no data
    pub fn link_reset() -> Self {
        let mut feedback = Feedback::default();
        feedback.start = INVALID_HEADER;
        feedback.checksum = feedback.calculate_checksum();
        feedback
    }

    /// Battery voltage in V
    pub fn battery_voltage(&self) -> f32 {
        f32::from(self.bat_voltage) / 100.0
    }

    /// Board temperature in C
    pub fn board_temperature(&self) -> f32 {
        f32::from(self.board_temp) / 10.0
    }
}
