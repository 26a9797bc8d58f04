//! Commands sent from the host to the board

use crate::checksum::Checksum;
use crate::{Error, INVALID_HEADER, VALID_HEADER};

/// Low-level commutation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlType {
    /// Block commutation
    Commutation,
    /// Sinusoidal commutation
    Sinusoidal,
    /// Field Oriented Control
    FieldOrientedControl,
}

impl ControlType {
    /// Wire ordinal
    pub fn value(self) -> u8 {
        match self {
            ControlType::Commutation => 0,
            ControlType::Sinusoidal => 1,
            ControlType::FieldOrientedControl => 2,
        }
    }

    /// Parses a wire ordinal
    pub fn from_u8(n: u8) -> Result<Self, Error> {
        match n {
            0 => Ok(ControlType::Commutation),
            1 => Ok(ControlType::Sinusoidal),
            2 => Ok(ControlType::FieldOrientedControl),
            _ => Err(Error::ParseError),
        }
    }
}

/// Setpoint type of the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlMode {
    /// Open loop
    OpenMode,
    /// Voltage setpoint
    Voltage,
    /// Speed setpoint, only with `FieldOrientedControl`
    Speed,
    /// Torque setpoint, only with `FieldOrientedControl`
    Torque,
}

impl ControlMode {
    /// Wire ordinal
    pub fn value(self) -> u8 {
        match self {
            ControlMode::OpenMode => 0,
            ControlMode::Voltage => 1,
            ControlMode::Speed => 2,
            ControlMode::Torque => 3,
        }
    }

    /// Parses a wire ordinal
    pub fn from_u8(n: u8) -> Result<Self, Error> {
        match n {
            0 => Ok(ControlMode::OpenMode),
            1 => Ok(ControlMode::Voltage),
            2 => Ok(ControlMode::Speed),
            3 => Ok(ControlMode::Torque),
            _ => Err(Error::ParseError),
        }
    }

    /// Whether this mode is only valid together with `FieldOrientedControl`
    pub fn requires_foc(self) -> bool {
        matches!(self, ControlMode::Speed | ControlMode::Torque)
    }
}

/// Command for a single motor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorState {
    /// Motor enabled
    pub enable: bool,
    /// Duty cycle / override value
    pub pwm: i16,
    /// Commutation strategy
    pub ctrl_typ: ControlType,
    /// Control loop setpoint type
    pub ctrl_mod: ControlMode,
    /// Maximum motor current in A
    pub i_mot_max: u8,
    /// Maximum DC link current in A, current chopping is applied above this
    pub i_dc_max: u8,
    /// Maximum motor speed in rpm
    pub n_mot_max: u16,
    /// Maximum field weakening D axis current in A (FOC only)
    pub field_weak_max: u8,
    /// Maximum phase advance angle in degrees (sinusoidal only)
    pub phase_adv_max: u8,
    /// Cruise control enabled
    pub cruise_ctrl_ena: bool,
    /// Cruise control target speed, only read while `cruise_ctrl_ena` is set
    pub n_cruise_mot_tgt: i16,
}

impl Default for MotorState {
    fn default() -> Self {
        MotorState {
            enable: false,
            pwm: 0,
            ctrl_typ: ControlType::FieldOrientedControl,
            ctrl_mod: ControlMode::OpenMode,
            i_mot_max: 15,
            i_dc_max: 17,
            n_mot_max: 1000,
            field_weak_max: 10,
            phase_adv_max: 40,
            cruise_ctrl_ena: false,
            n_cruise_mot_tgt: 0,
        }
    }
}

impl MotorState {
    /// Checks that `ctrl_mod` is usable with `ctrl_typ`
    ///
    /// `Speed` and `Torque` need `FieldOrientedControl`. The codec itself
    /// will happily encode any combination.
    pub fn validate(&self) -> Result<(), Error> {
        if self.ctrl_mod.requires_foc() && self.ctrl_typ != ControlType::FieldOrientedControl {
            return Err(Error::IncompatibleMode {
                ctrl_typ: self.ctrl_typ,
                ctrl_mod: self.ctrl_mod,
            });
        }

        Ok(())
    }
}

/// Buzzer control
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BuzzerState {
    /// Tone frequency
    pub freq: u8,
    /// Beep pattern
    pub pattern: u8,
}

/// Command frame, host to board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Command {
    /// Frame header, `VALID_HEADER` for a usable frame
    pub start: u16,
    /// Left motor
    pub left: MotorState,
    /// Right motor
    pub right: MotorState,
    /// Buzzer
    pub buzzer: BuzzerState,
    /// Power the board off
    pub poweroff: bool,
    /// Board LED
    pub led: bool,
    /// Cruise control active
    pub cruise_ctrl_acv: bool,
    /// Standstill hold active
    pub standstill_acv: bool,
    /// Electric brake amount
    pub electric_brake_amount: u8,
    /// Checksum over every other field
    pub checksum: u16,
}

impl Default for Command {
    fn default() -> Self {
        Command {
            start: VALID_HEADER,
            left: MotorState::default(),
            right: MotorState::default(),
            buzzer: BuzzerState::default(),
            poweroff: false,
            led: false,
            cruise_ctrl_acv: false,
            standstill_acv: false,
            electric_brake_amount: 0,
            checksum: 0,
        }
        .sealed()
    }
}

impl Command {
    /// Returns a copy with a valid header and an up to date checksum
    pub fn sealed(mut self) -> Self {
        self.start = VALID_HEADER;
        self.checksum = self.calculate_checksum();
        self
    }

    /// An inert command carrying `INVALID_HEADER`, tells the board there is no data
    pub fn link_reset() -> Self {
        let mut command = Command::default();
        command.start = INVALID_HEADER;
        command.checksum = command.calculate_checksum();
        command
    }

    /// Runs `MotorState::validate` on both motors
    pub fn validate(&self) -> Result<(), Error> {
        self.left.validate()?;
        self.right.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_ordinals() {
        for n in 0..3 {
            assert_eq!(ControlType::from_u8(n).unwrap().value(), n);
        }
        for n in 0..4 {
            assert_eq!(ControlMode::from_u8(n).unwrap().value(), n);
        }
        assert_eq!(ControlType::from_u8(3), Err(Error::ParseError));
        assert_eq!(ControlMode::from_u8(4), Err(Error::ParseError));
    }

    #[test]
    fn defaults_are_inert() {
        let command = Command::default();
        assert_eq!(command.start, VALID_HEADER);
        assert!(!command.left.enable);
        assert!(!command.right.enable);
        assert_eq!(command.left.pwm, 0);
        assert!(!command.poweroff);
        assert_eq!(command.checksum, command.calculate_checksum());
    }

    #[test]
    fn speed_requires_foc() {
        let mut state = MotorState {
            ctrl_mod: ControlMode::Speed,
            ..MotorState::default()
        };
        assert_eq!(state.validate(), Ok(()));

        state.ctrl_typ = ControlType::Sinusoidal;
        assert_eq!(
            state.validate(),
            Err(Error::IncompatibleMode {
                ctrl_typ: ControlType::Sinusoidal,
                ctrl_mod: ControlMode::Speed,
            })
        );

        state.ctrl_mod = ControlMode::Voltage;
        assert_eq!(state.validate(), Ok(()));
    }

    #[test]
    fn command_validates_both_motors() {
        let mut command = Command::default();
        command.right.ctrl_typ = ControlType::Commutation;
        command.right.ctrl_mod = ControlMode::Torque;
        assert!(matches!(
            command.validate(),
            Err(Error::IncompatibleMode { .. })
        ));
    }

    #[test]
    fn link_reset_header() {
        let command = Command::link_reset();
        assert_eq!(command.start, INVALID_HEADER);
        assert_eq!(command.checksum, command.calculate_checksum());
    }
}
