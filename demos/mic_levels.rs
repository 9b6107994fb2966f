// Live microphone check: prints voice-band energy and speech state for ten seconds
//
// Usage: cargo run --example mic_levels --features mic-cpal -- [device]

use proctor_lib::core::audio_activity::{AudioActivityDetector, SPEECH_ENERGY_THRESHOLD};
use proctor_lib::core::config::ProctorConfig;
use proctor_lib::core::logging::init_logging;
use proctor_lib::platform::audio::MicrophoneTrack;
use proctor_lib::platform::media::AudioTrack;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::main]
async fn main() {
    let config = ProctorConfig::default();
    init_logging(config.json_logs);
    let device = std::env::args().nth(1).unwrap_or_else(|| "default".to_string());

    println!("=== Microphone Level Test ===\n");

    println!("Input devices:");
    match MicrophoneTrack::enumerate_devices() {
        Ok(devices) => {
            for d in &devices {
                println!(
                    "  {} {} ({} Hz, {} ch)",
                    if d.is_default { "*" } else { " " },
                    d.name,
                    d.sample_rate,
                    d.channels
                );
            }
        }
        Err(e) => println!("✗ Failed to enumerate devices: {}", e),
    }

    let mic = match MicrophoneTrack::open(&device, config.fft_size) {
        Ok(mic) => mic,
        Err(e) => {
            println!("✗ Failed to open {}: {}", device, e);
            return;
        }
    };
    println!("\n✓ Capturing from {} at {} Hz", mic.device_name(), mic.sample_rate());
    println!("  Speech threshold: {}\n", SPEECH_ENERGY_THRESHOLD);

    let mut detector = AudioActivityDetector::new(config.fallback_sample_rate);
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    let end = Instant::now() + Duration::from_secs(10);

    while Instant::now() < end {
        let now = ticker.tick().await;
        let spectrum = mic.spectrum();
        let energy = spectrum
            .as_ref()
            .and_then(|s| detector.voice_band_energy(s))
            .unwrap_or(0.0);
        let raised = detector.update(spectrum.as_ref(), now);

        let bar = "#".repeat((energy / 4.0) as usize);
        println!(
            "{:>6.1} {:<64} {}",
            energy,
            bar,
            if raised { "AUDIO DETECTED" } else { "" }
        );
    }

    mic.stop();
    println!("\nBursts in window: {}", detector.burst_count());
}
