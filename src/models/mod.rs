// Data models for face landmarks, camera frames, audio spectra, violations, and session reports

pub mod audio;
pub mod capture;
pub mod error;
pub mod landmarks;
pub mod report;
pub mod violation;
