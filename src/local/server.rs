use rand::Rng;
use std::error::Error;
use std::fs::File;
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::thread;

// Streams voltage samples over TCP the way the acquisition hardware would,
// either replayed from a CSV recording or synthesized. Each frame is one
// f32 in big-endian byte order, one frame per sample period.

const USE_DATA: bool = false;

const SAMPLE_PERIOD_MS: u64 = 20;
const BASELINE_VOLTS: f64 = 0.55;

// -----------------------------------------------------------------------------
// SETUP FOR IMPORTING SIGNALS FROM CSV
// -----------------------------------------------------------------------------

fn read_signal_from_csv(file_path: &str) -> Result<Vec<f32>, Box<dyn Error>> {
    let mut rdr = csv::Reader::from_reader(File::open(file_path)?);
    let mut data: Vec<f32> = Vec::new();

    for result in rdr.records() {
        let record = result?;
        if let Some(value) = record.get(0) {
            data.push(value.parse()?);
        }
    }

    Ok(data)
}

// -----------------------------------------------------------------------------
// RUN CODE
// -----------------------------------------------------------------------------

pub fn run() -> std::io::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:8080")?;

    for stream in listener.incoming() {
        let stream = stream?;

        if USE_DATA {
            thread::spawn(move || {
                let data = read_signal_from_csv("./data/pulse_samples.csv").unwrap();
                send_csv_data(stream, data).unwrap();
            });
        } else {
            thread::spawn(move || {
                simulated_loop(stream).unwrap();
            });
        }
    }

    Ok(())
}

// -----------------------------------------------------------------------------
// SENDING DATA FROM CSV
// -----------------------------------------------------------------------------

fn send_csv_data(mut stream: TcpStream, data: Vec<f32>) -> std::io::Result<()> {
    for &voltage in &data {
        stream.write_all(&voltage.to_be_bytes())?;
        thread::sleep(std::time::Duration::from_millis(SAMPLE_PERIOD_MS));
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// SIMULATING A PPG WAVEFORM
// -----------------------------------------------------------------------------

#[derive(Debug)]
struct BeatShape {
    amplitude: f64,
    period_ms: u64,
    notch_depth: f64,
}

impl BeatShape {
    fn new(amplitude: f64, period_ms: u64, notch_depth: f64) -> Self {
        Self {
            amplitude,
            period_ms,
            notch_depth,
        }
    }
}

// One cycle of the synthesized wave: a sharp systolic upstroke, a decay back
// to baseline and a small dichrotic bump that stays under any sane threshold.
fn waveform_value(shape: &BeatShape, phase_ms: u64) -> f64 {
    let p = phase_ms as f64 / shape.period_ms as f64;

    if p < 0.12 {
        BASELINE_VOLTS + shape.amplitude * (p / 0.12 * std::f64::consts::FRAC_PI_2).sin()
    } else if p < 0.40 {
        BASELINE_VOLTS + shape.amplitude * ((p - 0.12) / 0.28 * std::f64::consts::FRAC_PI_2).cos()
    } else if p < 0.55 {
        BASELINE_VOLTS
            + shape.amplitude * shape.notch_depth * ((p - 0.40) / 0.15 * std::f64::consts::PI).sin()
    } else {
        BASELINE_VOLTS
    }
}

fn simulated_loop(mut stream: TcpStream) -> std::io::Result<()> {
    let mut rng = rand::thread_rng();

    let mut shape = BeatShape::new(0.35, 800, 0.25);
    let mut phase_ms = 0;

    loop {
        let noise = rng.gen_range(-0.01..0.01);
        let voltage = (waveform_value(&shape, phase_ms) + noise) as f32;

        stream.write_all(&voltage.to_be_bytes())?;

        phase_ms += SAMPLE_PERIOD_MS;
        if phase_ms >= shape.period_ms {
            phase_ms = 0;
            // Jitter the next interval so the stream is not metronomic.
            shape = BeatShape::new(0.35, 800 + rng.gen_range(0..80) - 40, 0.25);
        }

        thread::sleep(std::time::Duration::from_millis(SAMPLE_PERIOD_MS));
    }
}
