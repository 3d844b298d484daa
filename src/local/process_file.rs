use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::time::Instant;

use crate::config::{self, Config};
use crate::processing::detectors::pulse::PulseDetectorConfig;
use crate::processing::sample_processor::{SampleProcessor, SampleProcessorConfig};

fn count_lines<P>(filename: P) -> io::Result<usize>
where
    P: AsRef<Path>,
{
    let file = File::open(filename)?;
    let reader = BufReader::new(file);
    Ok(reader.lines().filter(|line| line.is_ok()).count())
}

// Runs the detector over a recorded waveform, one voltage per line, and
// writes the per-sample outputs next to it.
pub fn run() -> io::Result<()> {
    let data_file_path = "./data/pulse_samples.csv";
    if !Path::new(data_file_path).exists() {
        eprintln!("Error: Data file not found at path: {}", data_file_path);
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "Data file not found",
        ));
    }

    let config = if Path::new("config.yaml").exists() {
        config::load_config("config.yaml").unwrap_or_else(|e| {
            eprintln!("{}", e);
            Config::default()
        })
    } else {
        Config::default()
    };

    let chunk_size = 5000;
    let mut samples = Vec::with_capacity(chunk_size);
    let mut counter = 0;
    let mut global_counter = 0usize;
    let mut chunk_count = 0;
    let mut detected_beats = 0;

    let total_lines = count_lines(data_file_path)?;
    let total_chunks = (total_lines + chunk_size - 1) / chunk_size;

    let bpm_key = format!("detectors:{}:bpm", config.detector.id);
    let ibi_key = format!("detectors:{}:ibi", config.detector.id);
    let start_key = format!("detectors:{}:start_of_beat", config.detector.id);

    let mut processor = SampleProcessor::new(
        SampleProcessorConfig {
            verbose: config.processor.verbose,
            sample_interval_ms: config.processor.sample_interval_ms,
            enable_debug_logging: config.processor.enable_debug_logging,
        },
        PulseDetectorConfig {
            id: config.detector.id.clone(),
            threshold: config.detector.threshold,
        },
    );

    let mut output_file = File::create("output.csv")?;
    writeln!(output_file, "index,sample,bpm,ibi,start_of_beat")?;

    let file = File::open(data_file_path)?;
    let reader = BufReader::new(file);

    for line in reader.lines() {
        let line = line?;
        let sample: f64 = line.parse().unwrap_or(0.0);

        samples.push(sample);
        counter += 1;

        if counter >= chunk_size {
            counter = 0;
            chunk_count += 1;

            let start_time = Instant::now();
            let output = processor.run_chunk(samples.clone());
            let duration = start_time.elapsed();

            println!(
                "Processed chunk {:?} / {:?} in {:?}",
                chunk_count, total_chunks, duration
            );

            for results in output {
                let start_of_beat = results.get(start_key.as_str()).cloned().unwrap_or(0.0);
                if start_of_beat == 1.0 {
                    detected_beats += 1;
                }

                writeln!(
                    output_file,
                    "{},{},{},{},{}",
                    global_counter,
                    results.get("global:raw_sample").cloned().unwrap_or(0.0),
                    results.get(bpm_key.as_str()).cloned().unwrap_or(0.0),
                    results.get(ibi_key.as_str()).cloned().unwrap_or(0.0),
                    start_of_beat,
                )?;
                global_counter += 1;
            }

            samples.clear();
        }
    }

    // Flush whatever is left after the last full chunk.
    if !samples.is_empty() {
        let output = processor.run_chunk(samples.clone());
        for results in output {
            let start_of_beat = results.get(start_key.as_str()).cloned().unwrap_or(0.0);
            if start_of_beat == 1.0 {
                detected_beats += 1;
            }

            writeln!(
                output_file,
                "{},{},{},{},{}",
                global_counter,
                results.get("global:raw_sample").cloned().unwrap_or(0.0),
                results.get(bpm_key.as_str()).cloned().unwrap_or(0.0),
                results.get(ibi_key.as_str()).cloned().unwrap_or(0.0),
                start_of_beat,
            )?;
            global_counter += 1;
        }
    }

    println!(
        "Detected {} beats across {} samples",
        detected_beats, global_counter
    );

    Ok(())
}
