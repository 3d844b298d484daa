use super::detectors::pulse::{PulseDetector, PulseDetectorConfig};
use crate::utils::log::log_to_file;

use std::collections::HashMap;

// -----------------------------------------------------------------------------
// SAMPLE PROCESSOR COMPONENT
// -----------------------------------------------------------------------------

pub struct SampleProcessorConfig {
    pub verbose: bool,
    pub sample_interval_ms: u32,
    pub enable_debug_logging: bool,
}

// Result keys are interned once at construction so the per-sample map can be
// built without formatting.
struct Keys {
    raw_sample: &'static str,
    bpm: &'static str,
    ibi: &'static str,
    pulse: &'static str,
    start_of_beat: &'static str,
    amplitude: &'static str,
    threshold: &'static str,
    peak: &'static str,
    trough: &'static str,
    time_since_last_beat: &'static str,
}

/// Host-side wrapper around a [`PulseDetector`] for offline analysis and the
/// language bindings. Drives the detector on a fixed sampling cadence and
/// snapshots its outputs into a `component:id:field` keyed map per sample.
///
/// The embedded core is the detector itself; this wrapper allocates and is
/// meant for recordings, bindings and bench work on a host machine.
pub struct SampleProcessor {
    pub index: usize,
    config: SampleProcessorConfig,
    detector: PulseDetector,
    keys: Keys,
}

impl SampleProcessor {
    pub fn new(config: SampleProcessorConfig, detector_config: PulseDetectorConfig) -> Self {
        let keys = Keys {
            raw_sample: "global:raw_sample",
            bpm: Box::leak(format!("detectors:{}:bpm", detector_config.id).into_boxed_str()),
            ibi: Box::leak(format!("detectors:{}:ibi", detector_config.id).into_boxed_str()),
            pulse: Box::leak(format!("detectors:{}:pulse", detector_config.id).into_boxed_str()),
            start_of_beat: Box::leak(
                format!("detectors:{}:start_of_beat", detector_config.id).into_boxed_str(),
            ),
            amplitude: Box::leak(
                format!("detectors:{}:amplitude", detector_config.id).into_boxed_str(),
            ),
            threshold: Box::leak(
                format!("detectors:{}:threshold", detector_config.id).into_boxed_str(),
            ),
            peak: Box::leak(format!("detectors:{}:peak", detector_config.id).into_boxed_str()),
            trough: Box::leak(format!("detectors:{}:trough", detector_config.id).into_boxed_str()),
            time_since_last_beat: Box::leak(
                format!("detectors:{}:time_since_last_beat", detector_config.id).into_boxed_str(),
            ),
        };

        SampleProcessor {
            index: 0,
            config,
            detector: PulseDetector::new(detector_config),
            keys,
        }
    }

    pub fn process_sample(&mut self, sample: f64) -> HashMap<&'static str, f64> {
        self.detector
            .process_sample(sample, self.config.sample_interval_ms);

        let start_of_beat = self.detector.saw_start_of_beat();

        let mut results = HashMap::new();
        results.insert(self.keys.raw_sample, sample);
        results.insert(self.keys.bpm, self.detector.beats_per_minute() as f64);
        results.insert(self.keys.ibi, self.detector.inter_beat_interval() as f64);
        results.insert(
            self.keys.pulse,
            if self.detector.is_inside_beat() { 1.0 } else { 0.0 },
        );
        results.insert(
            self.keys.start_of_beat,
            if start_of_beat { 1.0 } else { 0.0 },
        );
        results.insert(self.keys.amplitude, self.detector.pulse_amplitude());

        // If verbose, add the detector internals to the results
        if self.config.verbose {
            results.insert(self.keys.threshold, self.detector.threshold());
            results.insert(self.keys.peak, self.detector.peak());
            results.insert(self.keys.trough, self.detector.trough());
            results.insert(
                self.keys.time_since_last_beat,
                self.detector.time_since_last_beat() as f64,
            );
        }

        if self.config.enable_debug_logging {
            let formatted_message = format!(
                "detector: {}, index: {}, sample: {:.4}, threshold: {:.4}, pulse: {}",
                self.detector.id(),
                self.index,
                sample,
                self.detector.threshold(),
                self.detector.is_inside_beat()
            );
            log_to_file("pulse_processor.log", &formatted_message)
                .expect("Failed to write to log file");

            if start_of_beat {
                let log_message = format!(
                    "beat detected - bpm: {}, ibi: {} ms",
                    self.detector.beats_per_minute(),
                    self.detector.inter_beat_interval()
                );
                log_to_file("pulse_processor.log", &log_message)
                    .expect("Failed to write detection to log file");
            }
        }

        self.index += 1;
        results
    }

    pub fn run_chunk(&mut self, data: Vec<f64>) -> Vec<HashMap<&'static str, f64>> {
        data.into_iter()
            .map(|sample| self.process_sample(sample))
            .collect()
    }

    pub fn reset(&mut self) {
        self.detector.reset();
    }

    pub fn reset_index(&mut self) {
        self.index = 0;
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.detector.set_threshold(threshold);
    }

    pub fn detector(&self) -> &PulseDetector {
        &self.detector
    }

    pub fn detector_mut(&mut self) -> &mut PulseDetector {
        &mut self.detector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor(verbose: bool) -> SampleProcessor {
        SampleProcessor::new(
            SampleProcessorConfig {
                verbose,
                sample_interval_ms: 20,
                enable_debug_logging: false,
            },
            PulseDetectorConfig {
                id: "pulse".to_string(),
                threshold: 0.65,
            },
        )
    }

    #[test]
    fn result_map_carries_detector_outputs() {
        let mut p = processor(false);
        let results = p.process_sample(0.9);

        assert_eq!(results["global:raw_sample"], 0.9);
        assert_eq!(results["detectors:pulse:bpm"], 0.0);
        assert_eq!(results["detectors:pulse:ibi"], 750.0);
        assert_eq!(results["detectors:pulse:pulse"], 0.0);
        assert_eq!(results["detectors:pulse:start_of_beat"], 0.0);
        assert!(results.contains_key("detectors:pulse:amplitude"));
        assert!(!results.contains_key("detectors:pulse:threshold"));
        assert_eq!(p.index, 1);
    }

    #[test]
    fn verbose_adds_internals() {
        let mut p = processor(true);
        let results = p.process_sample(0.9);

        assert_eq!(results["detectors:pulse:threshold"], 0.65);
        assert!(results.contains_key("detectors:pulse:peak"));
        assert!(results.contains_key("detectors:pulse:trough"));
        assert_eq!(results["detectors:pulse:time_since_last_beat"], 20.0);
    }

    #[test]
    fn one_start_of_beat_per_cycle() {
        let mut p = processor(false);
        let data: Vec<f64> = (1..=500)
            .map(|i| if (i * 20) % 800 < 400 { 0.9 } else { 0.5 })
            .collect();

        let output = p.run_chunk(data);
        let starts = output
            .iter()
            .filter(|r| r["detectors:pulse:start_of_beat"] == 1.0)
            .count();

        assert_eq!(starts, 11);
        assert_eq!(output.last().unwrap()["detectors:pulse:bpm"], 75.0);
    }
}
