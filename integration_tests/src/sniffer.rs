//! Serial client for the LoRa sniffer.
//!
//! The sniffer forwards every received radio frame over USB serial verbatim,
//! so the byte stream is a sequence of COBS frames separated by zero bytes.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serialport::SerialPort;

use sensor_node_rust_firmware::telemetry::{decode, Message};

const FRAME_DELIMITER: u8 = 0x00;
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Everything seen on air during one capture window.
pub struct Capture {
    /// Decoded messages with their arrival offset from the capture start.
    pub messages: Vec<(Duration, Message)>,
    /// Frames that failed to decode.
    pub decode_errors: usize,
}

/// Serial connection to the sniffer.
pub struct Sniffer {
    port: Box<dyn SerialPort>,
}

impl Sniffer {
    /// Open the sniffer's serial port.
    pub fn open(port_name: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud)
            .timeout(READ_TIMEOUT)
            .open()
            .with_context(|| format!("Failed to open serial port {}", port_name))?;

        Ok(Self { port })
    }

    /// Read frames for the given duration and decode them.
    pub fn capture(&mut self, window: Duration) -> Result<Capture> {
        let start = Instant::now();
        let mut capture = Capture {
            messages: Vec::new(),
            decode_errors: 0,
        };

        let mut frame = Vec::new();
        let mut buf = [0u8; 256];

        while start.elapsed() < window {
            let n = match self.port.read(&mut buf) {
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e).context("Serial read failed"),
            };

            for &byte in &buf[..n] {
                frame.push(byte);
                if byte != FRAME_DELIMITER {
                    continue;
                }

                // A lone delimiter between frames is idle line noise
                if frame.len() > 1 {
                    match decode(&frame) {
                        Ok(message) => capture.messages.push((start.elapsed(), message)),
                        Err(e) => {
                            eprintln!("  undecodable frame ({:?}, {} bytes)", e, frame.len());
                            capture.decode_errors += 1;
                        }
                    }
                }
                frame.clear();
            }
        }

        Ok(capture)
    }
}
