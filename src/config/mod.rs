use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub processor: ProcessorConfig,
    pub detector: DetectorConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProcessorConfig {
    pub verbose: bool,
    pub sample_interval_ms: u32,
    pub enable_debug_logging: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectorConfig {
    pub id: String,
    pub threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            processor: ProcessorConfig {
                verbose: false,
                sample_interval_ms: 20,
                enable_debug_logging: false,
            },
            detector: DetectorConfig {
                id: "pulse".to_string(),
                threshold: 0.65,
            },
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, String> {
    let config_str =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config file: {}", e))?;

    serde_yaml::from_str(&config_str).map_err(|e| format!("Failed to parse config file: {}", e))
}

pub fn save_config<P: AsRef<Path>>(config: &Config, path: P) -> Result<(), String> {
    let yaml =
        serde_yaml::to_string(config).map_err(|e| format!("Failed to serialize config: {}", e))?;

    fs::write(path, yaml).map_err(|e| format!("Failed to write config file: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_round_trip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed.detector.id, "pulse");
        assert_eq!(parsed.detector.threshold, 0.65);
        assert_eq!(parsed.processor.sample_interval_ms, 20);
        assert!(!parsed.processor.enable_debug_logging);
    }
}
