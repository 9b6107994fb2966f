use crate::models::landmarks::FaceMeshOptions;
use crate::models::report::AttemptId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `api_base_url`
pub const ENV_API_URL: &str = "PROCTOR_API_URL";
/// Environment variable overriding `api_token`
pub const ENV_API_TOKEN: &str = "PROCTOR_API_TOKEN";

/// Proctoring configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProctorConfig {
    /// Seconds between session-report submissions
    pub report_interval_secs: u64,
    /// Minimum milliseconds between restricted-object scans
    pub object_scan_interval_ms: u64,
    /// Transform size for microphone analysis
    pub fft_size: usize,
    /// Sample rate assumed when the microphone does not report one
    pub fallback_sample_rate: u32,
    /// Maximum faces the landmark model reports per frame
    pub max_faces: u32,
    /// Request iris landmarks (478 points)
    pub refine_landmarks: bool,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    /// Requested camera resolution
    pub capture_width: u32,
    pub capture_height: u32,
    /// Object detector class treated as a restricted device
    pub restricted_object_label: String,
    /// Backend origin, e.g. "https://exams.example.edu"
    pub api_base_url: String,
    /// Report endpoint path; `{attempt_id}` is substituted
    pub report_path: String,
    /// Bearer token for the backend
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
    /// Emit JSON log lines instead of pretty output
    pub json_logs: bool,
}

impl Default for ProctorConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 30,
            object_scan_interval_ms: 500,
            fft_size: 1024,
            fallback_sample_rate: 48_000,
            max_faces: 4,
            refine_landmarks: true,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            capture_width: 640,
            capture_height: 480,
            restricted_object_label: "cell phone".to_string(),
            api_base_url: "http://localhost:8080".to_string(),
            report_path: "/api/attempts/{attempt_id}/session-report".to_string(),
            api_token: None,
            request_timeout_secs: 10,
            json_logs: false,
        }
    }
}

impl ProctorConfig {
    /// Load configuration from the default location, creating it with defaults if missing
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path()?;

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            config
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: ProctorConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::get_config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.report_interval_secs == 0 || self.report_interval_secs > 3600 {
            return Err(format!(
                "Invalid report interval: {}. Must be between 1 and 3600 seconds",
                self.report_interval_secs
            )
            .into());
        }

        if self.object_scan_interval_ms == 0 {
            return Err("Object scan interval must be greater than 0".into());
        }

        if !self.fft_size.is_power_of_two() || !(32..=32_768).contains(&self.fft_size) {
            return Err(format!(
                "Invalid FFT size: {}. Must be a power of two between 32 and 32768",
                self.fft_size
            )
            .into());
        }

        if self.fallback_sample_rate == 0 {
            return Err("Fallback sample rate must be greater than 0".into());
        }

        if self.max_faces == 0 {
            return Err("Max faces must be at least 1".into());
        }

        for (name, value) in [
            ("detection", self.min_detection_confidence),
            ("tracking", self.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!(
                    "Invalid minimum {} confidence: {}. Must be between 0.0 and 1.0",
                    name, value
                )
                .into());
            }
        }

        if self.capture_width == 0 || self.capture_height == 0 {
            return Err(format!(
                "Invalid capture size: {}x{}",
                self.capture_width, self.capture_height
            )
            .into());
        }

        if self.restricted_object_label.trim().is_empty() {
            return Err("Restricted object label cannot be empty".into());
        }

        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://")) {
            return Err(format!(
                "Invalid API base URL: {}. Must start with http:// or https://",
                self.api_base_url
            )
            .into());
        }

        if !self.report_path.starts_with('/') || !self.report_path.contains("{attempt_id}") {
            return Err(format!(
                "Invalid report path: {}. Must start with / and contain {{attempt_id}}",
                self.report_path
            )
            .into());
        }

        if self.request_timeout_secs == 0 {
            return Err("Request timeout must be greater than 0".into());
        }

        Ok(())
    }

    /// Reset to default configuration
    pub fn reset() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Self::default();
        config.save()?;
        Ok(config)
    }

    /// Apply `PROCTOR_API_URL` / `PROCTOR_API_TOKEN` when set
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            if !url.is_empty() {
                self.api_base_url = url;
            }
        }
        if let Ok(token) = std::env::var(ENV_API_TOKEN) {
            if !token.is_empty() {
                self.api_token = Some(token);
            }
        }
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    pub fn object_scan_interval(&self) -> Duration {
        Duration::from_millis(self.object_scan_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn face_mesh_options(&self) -> FaceMeshOptions {
        FaceMeshOptions {
            max_num_faces: self.max_faces,
            refine_landmarks: self.refine_landmarks,
            min_detection_confidence: self.min_detection_confidence,
            min_tracking_confidence: self.min_tracking_confidence,
        }
    }

    /// Full report URL for an attempt
    pub fn report_url(&self, attempt_id: AttemptId) -> String {
        format!(
            "{}{}",
            self.api_base_url.trim_end_matches('/'),
            self.report_path
                .replace("{attempt_id}", &attempt_id.to_string())
        )
    }

    /// Get the configuration file path
    fn get_config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| "Could not determine home directory")?;

        let mut path = PathBuf::from(home);
        path.push(".proctor");
        path.push("config");
        path.push("settings.json");

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ProctorConfig::default();
        assert_eq!(config.report_interval_secs, 30);
        assert_eq!(config.object_scan_interval_ms, 500);
        assert_eq!(config.fft_size, 1024);
        assert_eq!(config.fallback_sample_rate, 48_000);
        assert_eq!(config.max_faces, 4);
        assert!(config.refine_landmarks);
        assert_eq!(config.restricted_object_label, "cell phone");
        assert_eq!(config.api_token, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ProctorConfig::default();

        config.report_interval_secs = 0;
        assert!(config.validate().is_err());
        config.report_interval_secs = 30;

        config.fft_size = 1000;
        assert!(config.validate().is_err());
        config.fft_size = 2048;
        assert!(config.validate().is_ok());

        config.min_tracking_confidence = 1.5;
        assert!(config.validate().is_err());
        config.min_tracking_confidence = 0.5;

        config.api_base_url = "exams.example.edu".to_string();
        assert!(config.validate().is_err());
        config.api_base_url = "https://exams.example.edu".to_string();

        config.report_path = "/api/session-report".to_string();
        assert!(config.validate().is_err());
        config.report_path = "/api/attempts/{attempt_id}/session-report".to_string();

        config.restricted_object_label = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut config = ProctorConfig::default();
        config.api_token = Some("secret".to_string());
        config.report_interval_secs = 15;
        config.save_to(&path).unwrap();

        let loaded = ProctorConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"api_base_url": "https://exams.example.edu"}"#).unwrap();

        let loaded = ProctorConfig::load_from(&path).unwrap();
        assert_eq!(loaded.api_base_url, "https://exams.example.edu");
        assert_eq!(loaded.report_interval_secs, 30);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"fft_size": 3}"#).unwrap();
        assert!(ProctorConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_report_url() {
        let mut config = ProctorConfig::default();
        config.api_base_url = "https://exams.example.edu/".to_string();
        assert_eq!(
            config.report_url(AttemptId(981)),
            "https://exams.example.edu/api/attempts/981/session-report"
        );
    }

    #[test]
    fn test_face_mesh_options_follow_config() {
        let mut config = ProctorConfig::default();
        config.max_faces = 2;
        config.refine_landmarks = false;
        let options = config.face_mesh_options();
        assert_eq!(options.max_num_faces, 2);
        assert!(!options.refine_landmarks);
    }
}
