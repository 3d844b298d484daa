pub mod pulse;

pub use pulse::{PulseDetector, PulseDetectorConfig};
