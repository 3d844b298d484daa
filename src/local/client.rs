use colored::Colorize;
use std::io::{self, Read};
use std::net::TcpStream;

use crate::processing::detectors::pulse::{PulseDetector, PulseDetectorConfig};

const SAMPLE_PERIOD_MS: u32 = 20;
const TRACE_WIDTH: usize = 60;
const FULL_SCALE_VOLTS: f64 = 1.2;

// Consumes the sample stream, runs the beat detector and renders a live
// trace in the terminal. Each row is one sample; the bar turns red while
// the detector is inside a beat and the BPM readout prints on each edge.
pub fn run() -> io::Result<()> {
    let mut stream = TcpStream::connect("127.0.0.1:8080")?;
    let mut buffer = [0u8; 4];

    let mut detector = PulseDetector::new(PulseDetectorConfig {
        id: "pulse".to_string(),
        threshold: 0.65,
    });

    loop {
        match stream.read_exact(&mut buffer) {
            Ok(_) => {
                let voltage = f32::from_be_bytes(buffer) as f64;
                detector.process_sample(voltage, SAMPLE_PERIOD_MS);

                let bar_len = ((voltage / FULL_SCALE_VOLTS) * TRACE_WIDTH as f64)
                    .clamp(0.0, TRACE_WIDTH as f64) as usize;
                let bar = "|".repeat(bar_len);

                let trace = if detector.is_inside_beat() {
                    bar.red()
                } else {
                    bar.white()
                };

                let readout = if detector.saw_start_of_beat() {
                    format!("{:3} bpm ", detector.beats_per_minute()).green()
                } else {
                    "        ".normal()
                };

                println!("{}{}", readout, trace);
            }
            Err(e) => {
                eprintln!("Failed to receive data: {}", e);
                return Ok(());
            }
        }
    }
}
