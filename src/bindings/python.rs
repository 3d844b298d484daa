use crate::processing::detectors::pulse::PulseDetectorConfig;
use crate::processing::sample_processor::{SampleProcessor, SampleProcessorConfig};

use std::collections::HashMap;

use pyo3::prelude::*;

#[pyclass]
pub struct PyPulseSensor {
    processor: SampleProcessor,
}

#[pymethods]
impl PyPulseSensor {
    #[new]
    pub fn new(verbose: bool, sample_interval_ms: u32, threshold: f64) -> Self {
        let config = SampleProcessorConfig {
            verbose,
            sample_interval_ms,
            enable_debug_logging: false,
        };
        let detector_config = PulseDetectorConfig {
            id: "pulse".to_string(),
            threshold,
        };
        PyPulseSensor {
            processor: SampleProcessor::new(config, detector_config),
        }
    }

    pub fn reset(&mut self) {
        self.processor.reset();
    }

    pub fn reset_index(&mut self) {
        self.processor.reset_index();
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.processor.set_threshold(threshold);
    }

    pub fn process_sample(&mut self, sample: f64) -> HashMap<String, f64> {
        self.processor
            .process_sample(sample)
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }

    pub fn run_chunk(&mut self, data: Vec<f64>) -> Vec<HashMap<String, f64>> {
        self.processor
            .run_chunk(data)
            .into_iter()
            .map(|results| {
                results
                    .into_iter()
                    .map(|(key, value)| (key.to_string(), value))
                    .collect()
            })
            .collect()
    }

    pub fn beats_per_minute(&self) -> u8 {
        self.processor.detector().beats_per_minute()
    }

    pub fn inter_beat_interval(&self) -> u32 {
        self.processor.detector().inter_beat_interval()
    }

    pub fn pulse_amplitude(&self) -> f64 {
        self.processor.detector().pulse_amplitude()
    }

    pub fn latest_sample(&self) -> f64 {
        self.processor.detector().latest_sample()
    }

    pub fn is_inside_beat(&self) -> bool {
        self.processor.detector().is_inside_beat()
    }

    pub fn last_beat_time(&self) -> u64 {
        self.processor.detector().last_beat_time()
    }
}

/// A Python module implemented in Rust.
#[pymodule]
pub fn pulse_detector(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyPulseSensor>()?;
    Ok(())
}
