use std::io;
use std::thread;
use std::time::Duration;

use embedded_hal::serial::{Read, Write};
use hoverboard_comm::{Command, HoverboardConnection};
use serialport::SerialPort;

fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyUSB0".into());

    let (port1, port2) = {
        let port = serialport::new(path, 115_200)
            .timeout(Duration::from_millis(5))
            .open()
            .unwrap();
        (Port::new(port.try_clone().unwrap()), Port::new(port))
    };

    let mut conn = HoverboardConnection::new(port1, port2);

    let mut command = Command::default();
    command.left.enable = true;
    command.right.enable = true;

    for step in 0..200i16 {
        // Ramp up then back down
        let pwm = if step < 100 { step * 3 } else { (200 - step) * 3 };
        command.left.pwm = pwm;
        command.right.pwm = -pwm;
        dbg!(conn.send_command(&command)).ok();

        match conn.read_feedback() {
            Ok(feedback) => println!(
                "speed {:>5} {:>5}  battery {:.2} V  temp {:.1} C",
                feedback.left.speed,
                feedback.right.speed,
                feedback.battery_voltage(),
                feedback.board_temperature()
            ),
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(e)) => eprintln!("feedback: {}", e),
        }

        thread::sleep(Duration::from_millis(20));
    }

    dbg!(conn.send_link_reset()).ok();
}

struct Port {
    inner: Box<dyn SerialPort>,
}

impl Port {
    fn new(inner: Box<dyn SerialPort>) -> Self {
        Port { inner }
    }
}

impl Read<u8> for Port {
    type Error = io::Error;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        let mut buf = [0u8];
        match io::Read::read(&mut self.inner, &mut buf) {
            Ok(1) => Ok(buf[0]),
            Ok(_) => Err(nb::Error::WouldBlock),
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => Err(nb::Error::WouldBlock),
            Err(e) => Err(nb::Error::Other(e)),
        }
    }
}

impl Write<u8> for Port {
    type Error = io::Error;

    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        match io::Write::write(&mut self.inner, &[word]) {
            Ok(1) => Ok(()),
            Ok(_) => Err(nb::Error::Other(io::Error::new(
                io::ErrorKind::Other,
                "wrote wrong number of bytes",
            ))),
            Err(e) => Err(nb::Error::Other(e)),
        }
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        io::Write::flush(&mut self.inner).map_err(nb::Error::Other)
    }
}
