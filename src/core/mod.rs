pub mod config;
pub mod logging;

// Signal classifiers
pub mod landmark_classifier;
pub mod object_detector;
pub mod audio_activity;
pub mod spectrum;

// Counting, scheduling and reporting
pub mod violation_aggregator;
pub mod frame_scheduler;
pub mod reporter;
pub mod session;
