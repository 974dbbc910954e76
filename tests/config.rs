use std::time::Duration;

use muso::{Error, InitialParams, SessionConfig};

#[test]
fn defaults_are_valid() {
    let config = SessionConfig::default();
    config.validate().unwrap();

    assert_eq!(config.sample_rate, 48_000);
    assert_eq!(config.quantum, 128);
    assert_eq!(config.lookahead, 3);
    assert_eq!(config.poll_interval(), Duration::from_millis(1));
    assert_eq!(config.fft_size, 2048);
    assert_eq!(config.smoothing, 0.8);
    assert!(config.filter);
    assert_eq!(config.params, InitialParams::default());
}

#[test]
fn empty_yaml_gives_defaults() {
    let config = SessionConfig::from_yaml_str("{}").unwrap();
    assert_eq!(config, SessionConfig::default());
}

#[test]
fn yaml_overrides_selected_fields() {
    let yaml = "
quantum: 256
lookahead: 5
filter: false
params:
  cutoff: 800
  volume: 0.5
";
    let config = SessionConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.quantum, 256);
    assert_eq!(config.lookahead, 5);
    assert!(!config.filter);
    assert_eq!(config.params.cutoff, 800.0);
    assert_eq!(config.params.volume, 0.5);
    assert_eq!(config.params.wet, 0.55);
}

#[test]
fn unknown_fields_are_errors() {
    assert!(matches!(
        SessionConfig::from_yaml_str("quantumm: 128"),
        Err(Error::ConfigParse(_))
    ));
}

#[test]
fn out_of_range_values_name_the_field() {
    let cases = [
        ("quantum: 8", "quantum"),
        ("lookahead: 0", "lookahead"),
        ("lookahead: 9", "lookahead"),
        ("fft_size: 1000", "fft_size"),
        ("smoothing: 1.0", "smoothing"),
        ("poll_interval_ms: 0", "poll_interval_ms"),
        ("params: { cutoff: 10 }", "cutoff"),
        ("params: { resonance: 30 }", "resonance"),
        ("params: { wet: -0.1 }", "wet"),
    ];
    for (yaml, expected) in cases {
        match SessionConfig::from_yaml_str(yaml) {
            Err(Error::InvalidConfig { field, .. }) => assert_eq!(field, expected, "{yaml}"),
            other => panic!("{yaml}: expected InvalidConfig, got {other:?}"),
        }
    }
}

#[test]
fn builder_values_are_validated_on_demand() {
    let config = SessionConfig::default()
        .with_quantum(64)
        .with_lookahead(2)
        .with_poll_interval(Duration::from_millis(5));
    config.validate().unwrap();
    assert_eq!(config.poll_interval(), Duration::from_millis(5));

    let bad = config.with_lookahead(20);
    assert!(bad.validate().is_err());
}

#[test]
fn loads_from_file() {
    let path = std::env::temp_dir().join(format!("muso-config-{}.yaml", std::process::id()));
    std::fs::write(&path, "sample_rate: 44100\nfft_size: 4096\n").unwrap();

    let config = SessionConfig::from_yaml_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.sample_rate, 44_100);
    assert_eq!(config.fft_size, 4096);
}

#[test]
fn missing_file_is_an_io_error() {
    let result = SessionConfig::from_yaml_file("/definitely/not/here/muso.yaml");
    assert!(matches!(result, Err(Error::ConfigIo { .. })));
}
