use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::serial::{Read, Write};
use hoverboard_comm::{
    Command, Config, ControlMode, ControlType, Error, Feedback, FrameReceiver,
    HoverboardConnection, MotorFeedback, COMMAND_SIZE, INVALID_HEADER, VALID_HEADER,
};

/// One direction of an in-memory serial line
#[derive(Clone, Default)]
struct Wire {
    bytes: Rc<RefCell<VecDeque<u8>>>,
    broken: Rc<RefCell<bool>>,
}

impl Wire {
    fn feed(&self, bytes: &[u8]) {
        self.bytes.borrow_mut().extend(bytes.iter().copied());
    }

    fn drain(&self) -> Vec<u8> {
        self.bytes.borrow_mut().drain(..).collect()
    }

    fn break_line(&self) {
        *self.broken.borrow_mut() = true;
    }
}

impl Read<u8> for Wire {
    type Error = ();

    fn read(&mut self) -> nb::Result<u8, ()> {
        if *self.broken.borrow() {
            return Err(nb::Error::Other(()));
        }
        self.bytes.borrow_mut().pop_front().ok_or(nb::Error::WouldBlock)
    }
}

impl Write<u8> for Wire {
    type Error = ();

    fn write(&mut self, word: u8) -> nb::Result<(), ()> {
        if *self.broken.borrow() {
            return Err(nb::Error::Other(()));
        }
        self.bytes.borrow_mut().push_back(word);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), ()> {
        Ok(())
    }
}

fn connect(config: Config) -> (HoverboardConnection<Wire, Wire>, Wire, Wire) {
    let from_board = Wire::default();
    let to_board = Wire::default();
    let conn = HoverboardConnection::with_config(from_board.clone(), to_board.clone(), config);
    (conn, from_board, to_board)
}

fn telemetry(speed: i16) -> Feedback {
    Feedback {
        left: MotorFeedback {
            speed,
            angle: 90,
            hall_a: true,
            ..MotorFeedback::default()
        },
        right: MotorFeedback {
            speed: -speed,
            chops: 2,
            ..MotorFeedback::default()
        },
        bat_voltage: 4010,
        board_temp: 301,
        timeout_cnt_serial: 1,
        ..Feedback::default()
    }
    .sealed()
}

fn drive(pwm: i16) -> Command {
    let mut command = Command::default();
    command.left.enable = true;
    command.left.pwm = pwm;
    command.right.enable = true;
    command.right.pwm = pwm;
    command
}

#[test]
fn command_reaches_the_board() {
    let (mut conn, _, to_board) = connect(Config::default());
    let mut command = drive(300);
    command.checksum = 0;

    conn.send_command(&command).unwrap();

    let sent = to_board.drain();
    assert_eq!(sent.len(), COMMAND_SIZE);
    assert_eq!(&sent[..2], &VALID_HEADER.to_le_bytes());

    let mut board = FrameReceiver::<Command>::new();
    let received: Vec<_> = board.frames(&sent).collect();
    assert_eq!(received, vec![Ok(command.sealed())]);
}

#[test]
fn strict_modes_refuse_invalid_pairs() {
    let mut command = drive(100);
    command.left.ctrl_typ = ControlType::Sinusoidal;
    command.left.ctrl_mod = ControlMode::Speed;

    let (mut conn, _, to_board) = connect(Config::default());
    match conn.send_command(&command) {
        Err(nb::Error::Other(Error::IncompatibleMode { ctrl_typ, ctrl_mod })) => {
            assert_eq!(ctrl_typ, ControlType::Sinusoidal);
            assert_eq!(ctrl_mod, ControlMode::Speed);
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert!(to_board.drain().is_empty());

    let lenient = Config {
        strict_modes: false,
        ..Config::default()
    };
    let (mut conn, _, to_board) = connect(lenient);
    conn.send_command(&command).unwrap();
    assert_eq!(to_board.drain().len(), COMMAND_SIZE);
}

#[test]
fn feedback_after_garbage() {
    let (mut conn, from_board, _) = connect(Config::default());
    let feedback = telemetry(120);
    from_board.feed(&[0x00, 0x13, 0xAA, 0x37]);
    from_board.feed(&feedback.to_bytes());

    assert_eq!(conn.read_feedback(), Ok(feedback));
    assert_eq!(conn.last_feedback(), Some(&feedback));
    assert_eq!(conn.read_feedback(), Err(nb::Error::WouldBlock));
}

#[test]
fn partial_frames_are_kept_between_reads() {
    let (mut conn, from_board, _) = connect(Config::default());
    let bytes = telemetry(-40).to_bytes();

    from_board.feed(&bytes[..30]);
    assert_eq!(conn.read_feedback(), Err(nb::Error::WouldBlock));
    assert!(conn.last_feedback().is_none());

    from_board.feed(&bytes[30..]);
    assert_eq!(conn.read_feedback(), Ok(telemetry(-40)));
}

#[test]
fn stalled_board_is_reported() {
    let config = Config {
        stall_limit: 4,
        ..Config::default()
    };
    let (mut conn, from_board, _) = connect(config);
    let bytes = telemetry(5).to_bytes();
    from_board.feed(&bytes[..12]);

    for _ in 0..3 {
        assert_eq!(conn.read_feedback(), Err(nb::Error::WouldBlock));
    }
    assert_eq!(
        conn.read_feedback(),
        Err(nb::Error::Other(Error::TransportStall))
    );

    from_board.feed(&bytes);
    assert_eq!(conn.read_feedback(), Ok(telemetry(5)));
}

#[test]
fn corrupted_feedback_keeps_last_good_value() {
    let (mut conn, from_board, _) = connect(Config::default());
    let good = telemetry(10);
    from_board.feed(&good.to_bytes());
    assert_eq!(conn.read_feedback(), Ok(good));

    let mut corrupted = telemetry(20).to_bytes();
    corrupted[4] ^= 0x08;
    from_board.feed(&corrupted);
    from_board.feed(&telemetry(30).to_bytes());

    match conn.read_feedback() {
        Err(nb::Error::Other(Error::ChecksumMismatch { .. })) => {}
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(conn.last_feedback(), Some(&good));

    let mut next = conn.read_feedback();
    while let Err(nb::Error::Other(_)) = next {
        next = conn.read_feedback();
    }
    assert_eq!(next, Ok(telemetry(30)));
    assert_eq!(conn.last_feedback(), Some(&telemetry(30)));
}

#[test]
fn link_reset_is_ignored_by_the_board() {
    let (mut conn, _, to_board) = connect(Config::default());
    conn.send_link_reset().unwrap();

    let sent = to_board.drain();
    assert_eq!(&sent[..2], &INVALID_HEADER.to_le_bytes());

    let mut board = FrameReceiver::<Command>::new();
    assert_eq!(board.frames(&sent).count(), 0);
}

#[test]
fn broken_line_is_an_io_error() {
    let (mut conn, from_board, to_board) = connect(Config::default());
    from_board.break_line();
    to_board.break_line();

    assert_eq!(conn.read_feedback(), Err(nb::Error::Other(Error::IoError)));
    assert_eq!(
        conn.send_command(&Command::default()),
        Err(nb::Error::Other(Error::IoError))
    );
}

#[test]
fn release_hands_back_the_halves() {
    let (conn, from_board, _) = connect(Config::default());
    let (mut r, _w) = conn.release();
    from_board.feed(&[7]);
    assert_eq!(r.read(), Ok(7));
}
