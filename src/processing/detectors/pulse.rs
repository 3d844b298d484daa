// PULSE DETECTOR COMPONENT ----------------------------------------------------

/// Number of inter-beat intervals kept for the running BPM average.
const RATE_HISTORY_LEN: usize = 10;

/// Hard refractory floor in ms. Nothing faster than this is a beat.
const REFRACTORY_FLOOR_MS: u64 = 250;

/// Time without a qualifying beat edge after which the signal is considered
/// lost and the detector re-enters acquisition.
const SIGNAL_TIMEOUT_MS: u64 = 2500;

/// IBI seed at init, 750 ms between beats (80 bpm).
const IBI_SEED_MS: u32 = 750;

/// IBI seed after a signal timeout, 600 ms between beats (100 bpm).
const IBI_TIMEOUT_SEED_MS: u32 = 600;

/// Envelope seed at half of the expected 0-1.2 V input range.
const ENVELOPE_SEED_VOLTS: f64 = 0.6;

/// Amplitude seed at a tenth of the expected input range.
const AMPLITUDE_SEED_VOLTS: f64 = 0.12;

pub struct PulseDetectorConfig {
    pub id: String,
    pub threshold: f64,
}

/// Adaptive beat detector for a PPG voltage waveform.
///
/// Tracks the peak/trough envelope of each pulse cycle, recenters the
/// detection threshold to 50% of the last cycle's amplitude, and keeps a
/// running history of inter-beat intervals to average into a BPM figure.
/// The per-sample cost is constant and the struct owns no heap state
/// beyond its construction-time id, so a single instance can live in a
/// sampling ISR or a tight acquisition loop.
///
/// Not safe for concurrent mutation. One instance per channel, driven by
/// exactly one caller.
pub struct PulseDetector {
    config: PulseDetectorConfig,
    signal: f64,
    bpm: u8,
    ibi: u32,
    pulse: bool,
    start_of_beat: bool,
    threshold_setting: f64,
    amplitude: f64,
    last_beat_time: u64,
    rate_history: [u32; RATE_HISTORY_LEN],
    sample_counter: u64,
    time_since_last_beat: u64,
    peak: f64,
    trough: f64,
    threshold: f64,
    awaiting_first_beat: bool,
    awaiting_second_beat: bool,
}

impl PulseDetector {
    pub fn new(config: PulseDetectorConfig) -> Self {
        let threshold = config.threshold;
        PulseDetector {
            config,
            signal: 0.0,
            bpm: 0,
            ibi: IBI_SEED_MS,
            pulse: false,
            start_of_beat: false,
            threshold_setting: threshold,
            amplitude: AMPLITUDE_SEED_VOLTS,
            last_beat_time: 0,
            rate_history: [0; RATE_HISTORY_LEN],
            sample_counter: 0,
            time_since_last_beat: 0,
            peak: ENVELOPE_SEED_VOLTS,
            trough: ENVELOPE_SEED_VOLTS,
            threshold,
            awaiting_first_beat: true,
            awaiting_second_beat: false,
        }
    }

    /// Forces re-acquisition, e.g. after the sensor has been reattached.
    /// The last seen sample value is left in place.
    pub fn reset(&mut self) {
        self.bpm = 0;
        self.ibi = IBI_SEED_MS;
        self.pulse = false;
        self.start_of_beat = false;
        self.amplitude = AMPLITUDE_SEED_VOLTS;
        self.last_beat_time = 0;
        self.rate_history = [0; RATE_HISTORY_LEN];
        self.sample_counter = 0;
        self.time_since_last_beat = 0;
        self.peak = ENVELOPE_SEED_VOLTS;
        self.trough = ENVELOPE_SEED_VOLTS;
        self.threshold = self.threshold_setting;
        self.awaiting_first_beat = true;
        self.awaiting_second_beat = false;
    }

    /// Updates both the live threshold and the value it is reseeded from on
    /// reset or timeout. The value is taken as-is; anything outside the
    /// expected input range degrades detection but never faults.
    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold_setting = threshold;
        self.threshold = threshold;
    }

    /// Advances the detector by one sample. `elapsed_ms` is the time since
    /// the previous call on whatever cadence the caller's sampling loop
    /// enforces. All outputs are read back through the accessors.
    pub fn process_sample(&mut self, voltage: f64, elapsed_ms: u32) {
        self.signal = voltage;
        self.sample_counter += elapsed_ms as u64;
        self.time_since_last_beat = self.sample_counter - self.last_beat_time;

        // Track the trough of the wave. Waiting out 3/5 of the last interval
        // keeps the dichrotic notch from being read as the cycle minimum.
        if self.signal < self.threshold
            && self.past_notch_window()
            && self.signal < self.trough
        {
            self.trough = self.signal;
        }

        // Track the peak of the wave. The threshold condition keeps baseline
        // noise out of the envelope.
        if self.signal > self.threshold && self.signal > self.peak {
            self.peak = self.signal;
        }

        // Look for the beat edge, the surge of the signal over the threshold.
        // Anything inside the refractory floor is high frequency noise.
        if self.time_since_last_beat > REFRACTORY_FLOOR_MS {
            if self.signal > self.threshold && !self.pulse && self.past_notch_window() {
                self.pulse = true;
                self.ibi = (self.sample_counter - self.last_beat_time) as u32;
                self.last_beat_time = self.sample_counter;

                if self.awaiting_second_beat {
                    self.awaiting_second_beat = false;
                    // Seed the whole history with this interval so the first
                    // reported BPM is a plausible figure rather than an
                    // average over startup values.
                    self.rate_history = [self.ibi; RATE_HISTORY_LEN];
                }

                if self.awaiting_first_beat {
                    self.awaiting_first_beat = false;
                    self.awaiting_second_beat = true;
                    // The first interval has no valid reference point,
                    // discard it.
                    return;
                }

                // Shift the oldest interval out and average the last ten.
                let mut running_total: u32 = 0;
                for i in 0..RATE_HISTORY_LEN - 1 {
                    self.rate_history[i] = self.rate_history[i + 1];
                    running_total += self.rate_history[i];
                }
                self.rate_history[RATE_HISTORY_LEN - 1] = self.ibi;
                running_total += self.ibi;
                running_total /= RATE_HISTORY_LEN as u32;
                self.bpm = (60_000 / running_total) as u8;
                self.start_of_beat = true;
            }
        }

        // The signal dropping back under the threshold ends the beat. Take
        // the amplitude of the finished cycle and recenter the threshold at
        // 50% of it for the next one.
        if self.signal < self.threshold && self.pulse {
            self.pulse = false;
            self.amplitude = self.peak - self.trough;
            self.threshold = self.amplitude / 2.0 + self.trough;
            self.peak = self.threshold;
            self.trough = self.threshold;
        }

        // No beat for 2.5 seconds means the signal is gone or the sensor is
        // off the skin. Reseed everything and wait for two fresh beats.
        if self.time_since_last_beat > SIGNAL_TIMEOUT_MS {
            self.threshold = self.threshold_setting;
            self.peak = ENVELOPE_SEED_VOLTS;
            self.trough = ENVELOPE_SEED_VOLTS;
            self.last_beat_time = self.sample_counter;
            self.awaiting_first_beat = true;
            self.awaiting_second_beat = false;
            self.start_of_beat = false;
            self.bpm = 0;
            self.ibi = IBI_TIMEOUT_SEED_MS;
            self.pulse = false;
            self.amplitude = AMPLITUDE_SEED_VOLTS;
        }
    }

    // True once 3/5 of the previous inter-beat interval has elapsed.
    fn past_notch_window(&self) -> bool {
        self.time_since_last_beat > ((self.ibi / 5) * 3) as u64
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn latest_sample(&self) -> f64 {
        self.signal
    }

    pub fn beats_per_minute(&self) -> u8 {
        self.bpm
    }

    pub fn inter_beat_interval(&self) -> u32 {
        self.ibi
    }

    /// Reads and clears the beat edge flag, so each detected beat is
    /// reported exactly once regardless of how often the caller polls.
    pub fn saw_start_of_beat(&mut self) -> bool {
        let seen = self.start_of_beat;
        self.start_of_beat = false;
        seen
    }

    pub fn is_inside_beat(&self) -> bool {
        self.pulse
    }

    pub fn pulse_amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn last_beat_time(&self) -> u64 {
        self.last_beat_time
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn peak(&self) -> f64 {
        self.peak
    }

    pub fn trough(&self) -> f64 {
        self.trough
    }

    pub fn time_since_last_beat(&self) -> u64 {
        self.time_since_last_beat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(threshold: f64) -> PulseDetector {
        PulseDetector::new(PulseDetectorConfig {
            id: "pulse".to_string(),
            threshold,
        })
    }

    // Square-ish test wave, high for the first half of each period.
    fn square_wave(t: u64, period: u64, high: f64, low: f64) -> f64 {
        if t % period < period / 2 {
            high
        } else {
            low
        }
    }

    fn snapshot(
        d: &PulseDetector,
    ) -> (
        (f64, u8, u32, bool, bool),
        (f64, f64, u64),
        ([u32; RATE_HISTORY_LEN], u64, u64),
        (f64, f64, f64, bool, bool),
    ) {
        (
            (d.signal, d.bpm, d.ibi, d.pulse, d.start_of_beat),
            (d.threshold_setting, d.amplitude, d.last_beat_time),
            (d.rate_history, d.sample_counter, d.time_since_last_beat),
            (
                d.peak,
                d.trough,
                d.threshold,
                d.awaiting_first_beat,
                d.awaiting_second_beat,
            ),
        )
    }

    #[test]
    fn reset_is_idempotent() {
        let mut d = detector(0.65);
        let mut t = 0;
        while t < 3_000 {
            t += 20;
            d.process_sample(square_wave(t, 800, 0.9, 0.5), 20);
        }

        d.reset();
        let once = snapshot(&d);
        d.reset();
        assert_eq!(once, snapshot(&d));
    }

    #[test]
    fn reset_keeps_configured_threshold() {
        let mut d = detector(0.65);
        d.set_threshold(0.7);
        assert_eq!(d.threshold, 0.7);
        d.reset();
        assert_eq!(d.threshold, 0.7);
        assert_eq!(d.threshold_setting, 0.7);
    }

    #[test]
    fn sample_counter_is_prefix_sum_of_elapsed_ms() {
        let mut d = detector(0.65);
        let steps = [0u32, 5, 20, 975, 1000];
        for &ms in &steps {
            d.process_sample(0.0, ms);
        }
        assert_eq!(d.sample_counter, 2_000);
        assert_eq!(d.time_since_last_beat, 2_000);
    }

    #[test]
    fn first_beat_is_discarded() {
        let mut d = detector(0.65);
        let mut t = 0;
        while t < 800 {
            t += 20;
            d.process_sample(square_wave(t, 800, 0.9, 0.5), 20);
        }

        // The edge at t=800 was taken as the first beat and its interval
        // discarded as unreliable.
        assert!(d.is_inside_beat());
        assert_eq!(d.last_beat_time, 800);
        assert_eq!(d.ibi, 800);
        assert_eq!(d.beats_per_minute(), 0);
        assert_eq!(d.rate_history, [0; RATE_HISTORY_LEN]);
        assert!(!d.saw_start_of_beat());
    }

    #[test]
    fn second_beat_seeds_history_and_bpm() {
        let mut d = detector(0.65);
        let mut t = 0;
        while t < 1_600 {
            t += 20;
            d.process_sample(square_wave(t, 800, 0.9, 0.5), 20);
        }

        assert_eq!(d.rate_history, [800; RATE_HISTORY_LEN]);
        assert_eq!(d.beats_per_minute(), 75); // 60000 / 800
        assert!(d.saw_start_of_beat());
        // The edge flag is consumed by the read above.
        assert!(!d.saw_start_of_beat());
    }

    #[test]
    fn bpm_truncates_the_average_before_dividing() {
        let mut d = detector(0.65);

        // First edge at t=460, interval discarded.
        d.process_sample(0.9, 460);
        assert!(d.is_inside_beat());
        d.process_sample(0.5, 20);
        assert!(!d.is_inside_beat());

        // Second edge 442 ms later seeds the whole history.
        d.process_sample(0.9, 422);
        assert_eq!(d.rate_history, [442; RATE_HISTORY_LEN]);
        assert_eq!(d.beats_per_minute(), 135); // 60000 / 442
        d.process_sample(0.5, 20);

        // Third edge 441 ms later. The history sums to 4419, which truncates
        // to an average of 441 before the division into 60000. A single
        // division of the raw sum would give 135 instead.
        d.process_sample(0.9, 421);
        assert_eq!(d.rate_history[8], 442);
        assert_eq!(d.rate_history[9], 441);
        assert_eq!(d.beats_per_minute(), 136);
    }

    #[test]
    fn edges_inside_the_noise_floors_are_rejected() {
        let mut d = detector(0.65);

        // Inside the 250 ms refractory floor.
        d.process_sample(0.9, 240);
        assert!(!d.is_inside_beat());
        assert_eq!(d.last_beat_time, 0);

        // Past 250 ms but short of 3/5 of the seeded 750 ms interval.
        d.process_sample(0.9, 200);
        assert!(!d.is_inside_beat());
        assert_eq!(d.last_beat_time, 0);

        // 460 ms clears both floors.
        d.process_sample(0.9, 20);
        assert!(d.is_inside_beat());
        assert_eq!(d.last_beat_time, 460);
        assert_eq!(d.ibi, 460);

        // End the beat, then retry inside 3/5 of the measured 460 ms.
        d.process_sample(0.5, 20);
        assert!(!d.is_inside_beat());
        d.process_sample(0.9, 240);
        assert!(!d.is_inside_beat());
        assert_eq!(d.last_beat_time, 460);

        // 300 ms since the last beat clears the 276 ms window.
        d.process_sample(0.9, 40);
        assert!(d.is_inside_beat());
        assert_eq!(d.last_beat_time, 760);
        assert_eq!(d.ibi, 300);
    }

    #[test]
    fn stale_signal_forces_reacquisition() {
        let mut d = detector(0.65);
        for _ in 0..26 {
            d.process_sample(0.4, 100);
        }

        // 2600 ms without an edge tripped the timeout.
        assert_eq!(d.beats_per_minute(), 0);
        assert_eq!(d.inter_beat_interval(), 600);
        assert!(!d.is_inside_beat());
        assert_eq!(d.peak, 0.6);
        assert_eq!(d.trough, 0.6);
        assert_eq!(d.threshold, 0.65);
        assert_eq!(d.pulse_amplitude(), AMPLITUDE_SEED_VOLTS);
        assert_eq!(d.last_beat_time, 2_600);
        assert!(d.awaiting_first_beat);

        // The first fresh edge is discarded again.
        for _ in 0..4 {
            d.process_sample(0.9, 100);
        }
        assert!(d.is_inside_beat());
        assert_eq!(d.beats_per_minute(), 0);
        assert!(!d.saw_start_of_beat());

        // Beat ends, trough settles, and the second fresh edge restores
        // BPM output.
        for _ in 0..3 {
            d.process_sample(0.4, 100);
        }
        d.process_sample(0.9, 100);
        assert_eq!(d.inter_beat_interval(), 400);
        assert_eq!(d.beats_per_minute(), 150); // 60000 / 400
        assert!(d.saw_start_of_beat());
    }

    #[test]
    fn square_wave_converges_to_75_bpm() {
        let mut d = detector(0.65);
        let mut starts = 0;
        let mut t = 0;
        while t < 10_000 {
            t += 20;
            d.process_sample(square_wave(t, 800, 0.9, 0.5), 20);
            if d.saw_start_of_beat() {
                starts += 1;
            }
        }

        // Edges land at t = 800, 1600, ..., 9600. The first is the warm-up
        // discard, each of the remaining 11 reports exactly once.
        assert_eq!(starts, 11);
        assert_eq!(d.beats_per_minute(), 75);
        assert_eq!(d.inter_beat_interval(), 800);
        assert!((d.pulse_amplitude() - 0.4).abs() < 1e-12);
    }
}
