// tests/integration_tests.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use flight_replay::camera::{AutoCamera, ViewportSize};
use flight_replay::config::parse_from;
use flight_replay::export::export_csv_to;
use flight_replay::map::MapView;
use flight_replay::model::{Criterion, FilterCriteria};
use flight_replay::replay::{PlaybackState, TickOutcome};
use flight_replay::selection::{AnalyticsContext, StatsScope};
use flight_replay::storage::load_inputs;

const DATASET: &str = r#"{
    "paths": [
        { "id": 1, "year": 2024, "aircraftRegistration": "D-EABC", "startAirport": "EDDF", "endAirport": "EDDM" },
        { "id": "2", "year": "2023", "aircraftRegistration": "N123AB" }
    ],
    "segments": [
        { "pathId": 1, "coords": [[0.0, 0.0], [0.0, 0.1]], "altitudeFt": 3000, "groundspeedKnots": 100, "time": 60 },
        { "pathId": 1, "coords": [[0.0, 0.1], [0.0, 0.2]], "altitudeFt": 3500, "groundspeedKnots": 110, "time": 120 },
        { "pathId": 1, "coords": [[0.0, 0.2], [0.0, 0.3]], "altitudeFt": 3500, "groundspeedKnots": 110, "time": 180 },
        { "pathId": 2, "coords": [[0.0, 1.0], [0.0, 1.1]], "altitudeFt": 1500, "groundspeedKnots": 90, "time": 30 }
    ],
    "aircraft": [{ "registration": "D-EABC", "type": "C172", "model": "Skyhawk" }]
}"#;

/// 0.1 degree of longitude on the equator.
const LEG_KM: f64 = 11.1195;

fn temp_dir(tag: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let dir = std::env::temp_dir().join(format!("flight-replay-it-{tag}-{suffix}"));
    fs::create_dir_all(&dir).expect("Failed to create temp dir");
    dir
}

fn load_context(tag: &str) -> (AnalyticsContext, PathBuf) {
    let dir = temp_dir(tag);
    let data = dir.join("flights.json");
    fs::write(&data, DATASET).expect("Failed to write dataset");
    let dataset = load_inputs(data.to_str().unwrap(), "").expect("dataset loads");
    (AnalyticsContext::new(dataset, FilterCriteria::all()), dir)
}

#[test]
fn test_statistics_follow_filters_and_selection() {
    let (mut ctx, dir) = load_context("stats");
    assert_eq!(ctx.stats().num_paths, 2);
    assert!((ctx.stats().total_distance_km - 4.0 * LEG_KM).abs() < 0.01);
    assert_eq!(ctx.stats().airports, vec!["EDDF".to_string(), "EDDM".to_string()]);

    ctx.set_year(Criterion::parse("2024"));
    assert_eq!(ctx.stats().num_paths, 1);
    assert!((ctx.stats().longest_flight_km - 3.0 * LEG_KM).abs() < 0.01);
    assert_eq!(ctx.stats().total_flight_time, "0h 2m");

    ctx.toggle_selection(2);
    assert_eq!(ctx.scope(), &StatsScope::Selection(1));
    assert_eq!(ctx.scope().label(), "1 selected flight");
    assert_eq!(ctx.stats().num_paths, 1);
    assert!((ctx.stats().total_distance_km - LEG_KM).abs() < 0.01);

    ctx.clear_selection();
    assert_eq!(ctx.stats().num_paths, 1);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_replay_keeps_aircraft_on_the_map() {
    let (mut ctx, dir) = load_context("replay");
    ctx.toggle_selection(1);
    let mut timeline = ctx.start_replay().expect("single timed path").with_speed(10.0);
    assert_eq!(timeline.max_time(), 180.0);

    let position = timeline.position_at(90.0);
    assert!((position.point.lon - 0.15).abs() < 1e-9);

    let viewport = ViewportSize::new(80.0, 24.0);
    let mut camera = AutoCamera::default();
    let mut view = MapView::new(timeline.position_at(0.0).point, camera.zoom());
    let t0 = Instant::now();
    timeline.play();

    let mut finished = false;
    for i in 0..40u64 {
        let now = t0 + Duration::from_secs(i);
        let outcome = timeline.tick(if i == 0 { 0.0 } else { 1.0 });
        let sample = timeline.sample();
        let screen = view.project(sample.position.point, viewport);
        for command in camera.evaluate(sample.position.point, screen, viewport, i == 0, now) {
            view.apply(command);
        }
        assert!(
            view.project(sample.position.point, viewport).is_some(),
            "aircraft off map at tick {i}"
        );
        if outcome == TickOutcome::Finished {
            finished = true;
            break;
        }
    }

    assert!(finished);
    assert_eq!(timeline.state(), PlaybackState::Paused);
    assert_eq!(timeline.progress(), 1.0);
    let update = timeline.take_trail_update();
    assert_eq!(update.range, 0..3);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_multi_selection_refuses_replay() {
    let (mut ctx, dir) = load_context("multi");
    ctx.toggle_selection(1);
    ctx.toggle_selection(2);
    let err = ctx.start_replay().unwrap_err();
    assert!(err.to_string().contains("exactly one path"));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_csv_export_of_filtered_scope() {
    let (mut ctx, dir) = load_context("export");
    ctx.set_aircraft(Criterion::parse("D-EABC"));
    let path = export_csv_to(&dir, ctx.stats(), &ctx.scope().label()).expect("export");
    let content = fs::read_to_string(&path).expect("exported file");
    assert!(content.contains("scope,Year all / Aircraft D-EABC"));
    assert!(content.contains("D-EABC,C172,Skyhawk,1,120,0h 2m"));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_flags_override_config_file() {
    let dir = temp_dir("config");
    let config_path = dir.join("replay.toml");
    fs::write(&config_path, "year = 2023\nspeed = 25.0\nzoom = 10\n").expect("config written");
    let args: Vec<String> = vec![
        "--config".to_string(),
        config_path.to_string_lossy().to_string(),
        "--zoom".to_string(),
        "14".to_string(),
    ];
    let config = parse_from(&args).expect("config parses");
    assert_eq!(config.year, "2023");
    assert_eq!(config.speed, 25.0);
    assert_eq!(config.zoom, 14);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_project_structure() {
    let expected_files = vec![
        "src/main.rs",
        "src/lib.rs",
        "src/stats.rs",
        "src/replay.rs",
        "src/camera.rs",
        "src/selection.rs",
        "Cargo.toml",
        "README.md",
    ];

    for file in expected_files {
        assert!(Path::new(file).exists(), "Expected file {} not found", file);
    }
}
