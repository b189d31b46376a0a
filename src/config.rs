use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::camera::{clamp_margin, DEFAULT_EDGE_MARGIN, MAX_ZOOM, MIN_ZOOM};
use crate::replay::{DEFAULT_SPEED, MAX_SPEED, MIN_SPEED};

pub const DEFAULT_CONFIG_FILE: &str = "flight-replay.toml";
pub const DEFAULT_DATA_FILE: &str = "flights.json";
pub const DEFAULT_DISPLAY_FILE: &str = "";
pub const DEFAULT_YEAR: &str = "all";
pub const DEFAULT_AIRCRAFT: &str = "all";
pub const DEFAULT_AUTO_ZOOM: bool = true;
pub const DEFAULT_ZOOM: u8 = 12;
pub const DEFAULT_UI_FPS: u64 = 30;
pub const MAX_UI_FPS: u64 = 120;
pub const DEFAULT_THEME: &str = "default";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_FILE: &str = "flight-replay.log";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub config_path: PathBuf,
    pub data_file: String,
    pub display_file: String,
    pub year: String,
    pub aircraft: String,
    pub speed: f64,
    pub auto_zoom: bool,
    pub zoom: u8,
    pub edge_margin: f64,
    pub ui_fps: u64,
    pub theme: String,
    pub log_enabled: bool,
    pub log_level: String,
    pub log_file: String,
}

impl Config {
    pub fn with_path(config_path: PathBuf) -> Self {
        Self {
            config_path,
            data_file: DEFAULT_DATA_FILE.to_string(),
            display_file: DEFAULT_DISPLAY_FILE.to_string(),
            year: DEFAULT_YEAR.to_string(),
            aircraft: DEFAULT_AIRCRAFT.to_string(),
            speed: DEFAULT_SPEED,
            auto_zoom: DEFAULT_AUTO_ZOOM,
            zoom: DEFAULT_ZOOM,
            edge_margin: DEFAULT_EDGE_MARGIN,
            ui_fps: DEFAULT_UI_FPS,
            theme: DEFAULT_THEME.to_string(),
            log_enabled: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_path(PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    data_file: Option<String>,
    display_file: Option<String>,
    year: Option<TextOrNumber>,
    aircraft: Option<String>,
    speed: Option<f64>,
    auto_zoom: Option<bool>,
    zoom: Option<i64>,
    edge_margin: Option<f64>,
    ui_fps: Option<u64>,
    theme: Option<String>,
    log_enabled: Option<bool>,
    log_level: Option<String>,
    log_file: Option<String>,
}

/// `year = 2024` and `year = "2024"` are both accepted.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(untagged)]
enum TextOrNumber {
    Number(i64),
    Text(String),
}

impl TextOrNumber {
    fn into_string(self) -> String {
        match self {
            TextOrNumber::Number(n) => n.to_string(),
            TextOrNumber::Text(s) => s,
        }
    }
}

pub fn parse_args() -> Result<Config> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_from(&args)
}

/// Builds the configuration from `args`: defaults, then the config file,
/// then `FLIGHT_REPLAY_*` environment variables, then the flags themselves.
pub fn parse_from(args: &[String]) -> Result<Config> {
    let mut explicit_config: Option<PathBuf> = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let value = iter
                .next()
                .ok_or_else(|| anyhow!("--config needs a value"))?;
            explicit_config = Some(PathBuf::from(value));
        }
    }

    let env_config = env::var("FLIGHT_REPLAY_CONFIG").ok().map(PathBuf::from);
    let requested = explicit_config.is_some() || env_config.is_some();
    let config_path = explicit_config
        .or(env_config)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut config = Config::with_path(config_path.clone());

    if config_path.exists() {
        if let Some(file_config) = load_file_config(&config_path)? {
            apply_file_config(&mut config, file_config);
        }
    } else if requested {
        return Err(anyhow!("Config file not found: {}", config_path.display()));
    }

    apply_env(&mut config);
    apply_cli(&mut config, args)?;
    Ok(config)
}

fn apply_env(config: &mut Config) {
    if let Ok(value) = env::var("FLIGHT_REPLAY_DATA") {
        config.data_file = value;
    }
    if let Ok(value) = env::var("FLIGHT_REPLAY_DISPLAY") {
        config.display_file = value;
    }
    if let Ok(value) = env::var("FLIGHT_REPLAY_YEAR") {
        config.year = value;
    }
    if let Ok(value) = env::var("FLIGHT_REPLAY_AIRCRAFT") {
        config.aircraft = value;
    }
    if let Ok(value) = env::var("FLIGHT_REPLAY_SPEED") {
        if let Ok(speed) = value.parse::<f64>() {
            config.speed = clamp_speed(speed);
        }
    }
    if let Ok(value) = env::var("FLIGHT_REPLAY_AUTO_ZOOM") {
        config.auto_zoom = is_truthy(&value);
    }
    if let Ok(value) = env::var("FLIGHT_REPLAY_ZOOM") {
        if let Ok(zoom) = value.parse::<i64>() {
            config.zoom = clamp_zoom(zoom);
        }
    }
    if let Ok(value) = env::var("FLIGHT_REPLAY_EDGE_MARGIN") {
        if let Ok(margin) = value.parse::<f64>() {
            config.edge_margin = clamp_margin(margin);
        }
    }
    if let Ok(value) = env::var("FLIGHT_REPLAY_UI_FPS") {
        if let Ok(fps) = value.parse::<u64>() {
            config.ui_fps = clamp_fps(fps);
        }
    }
    if let Ok(value) = env::var("FLIGHT_REPLAY_THEME") {
        config.theme = value;
    }
    if let Ok(value) = env::var("FLIGHT_REPLAY_LOG_ENABLED") {
        config.log_enabled = is_truthy(&value);
    }
    if let Ok(value) = env::var("FLIGHT_REPLAY_LOG_LEVEL") {
        config.log_level = value;
    }
    if let Ok(value) = env::var("FLIGHT_REPLAY_LOG_FILE") {
        config.log_file = value;
    }
}

fn apply_cli(config: &mut Config, args: &[String]) -> Result<()> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                iter.next();
            }
            "--data" => {
                config.data_file = iter
                    .next()
                    .ok_or_else(|| anyhow!("--data needs a value"))?
                    .to_string();
            }
            "--display" => {
                config.display_file = iter
                    .next()
                    .ok_or_else(|| anyhow!("--display needs a value"))?
                    .to_string();
            }
            "--year" => {
                config.year = iter
                    .next()
                    .ok_or_else(|| anyhow!("--year needs a value"))?
                    .to_string();
            }
            "--aircraft" => {
                config.aircraft = iter
                    .next()
                    .ok_or_else(|| anyhow!("--aircraft needs a value"))?
                    .to_string();
            }
            "--speed" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--speed needs a value"))?;
                let speed: f64 = value
                    .parse()
                    .with_context(|| format!("Invalid --speed value: {value}"))?;
                config.speed = clamp_speed(speed);
            }
            "--auto-zoom" => {
                config.auto_zoom = true;
            }
            "--no-auto-zoom" => {
                config.auto_zoom = false;
            }
            "--zoom" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--zoom needs a value"))?;
                let zoom: i64 = value
                    .parse()
                    .with_context(|| format!("Invalid --zoom value: {value}"))?;
                config.zoom = clamp_zoom(zoom);
            }
            "--edge-margin" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--edge-margin needs a value"))?;
                let margin: f64 = value
                    .parse()
                    .with_context(|| format!("Invalid --edge-margin value: {value}"))?;
                config.edge_margin = clamp_margin(margin);
            }
            "--ui-fps" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--ui-fps needs a value"))?;
                let fps: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid --ui-fps value: {value}"))?;
                config.ui_fps = clamp_fps(fps);
            }
            "--theme" => {
                config.theme = iter
                    .next()
                    .ok_or_else(|| anyhow!("--theme needs a value"))?
                    .to_string();
            }
            "--log" => {
                config.log_enabled = true;
            }
            "--no-log" => {
                config.log_enabled = false;
            }
            "--log-level" => {
                config.log_level = iter
                    .next()
                    .ok_or_else(|| anyhow!("--log-level needs a value"))?
                    .to_string();
            }
            "--log-file" => {
                config.log_file = iter
                    .next()
                    .ok_or_else(|| anyhow!("--log-file needs a value"))?
                    .to_string();
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                return Err(anyhow!("Unknown argument: {other}"));
            }
        }
    }
    Ok(())
}

fn load_file_config(path: &Path) -> Result<Option<FileConfig>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let cfg: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;
    Ok(Some(cfg))
}

fn apply_file_config(target: &mut Config, file: FileConfig) {
    if let Some(data_file) = file.data_file {
        target.data_file = data_file;
    }
    if let Some(display_file) = file.display_file {
        target.display_file = display_file;
    }
    if let Some(year) = file.year {
        target.year = year.into_string();
    }
    if let Some(aircraft) = file.aircraft {
        target.aircraft = aircraft;
    }
    if let Some(speed) = file.speed {
        target.speed = clamp_speed(speed);
    }
    if let Some(auto_zoom) = file.auto_zoom {
        target.auto_zoom = auto_zoom;
    }
    if let Some(zoom) = file.zoom {
        target.zoom = clamp_zoom(zoom);
    }
    if let Some(edge_margin) = file.edge_margin {
        target.edge_margin = clamp_margin(edge_margin);
    }
    if let Some(ui_fps) = file.ui_fps {
        target.ui_fps = clamp_fps(ui_fps);
    }
    if let Some(theme) = file.theme {
        target.theme = theme;
    }
    if let Some(log_enabled) = file.log_enabled {
        target.log_enabled = log_enabled;
    }
    if let Some(log_level) = file.log_level {
        target.log_level = log_level;
    }
    if let Some(log_file) = file.log_file {
        target.log_file = log_file;
    }
}

fn clamp_speed(speed: f64) -> f64 {
    if speed.is_finite() {
        speed.clamp(MIN_SPEED, MAX_SPEED)
    } else {
        DEFAULT_SPEED
    }
}

fn clamp_zoom(zoom: i64) -> u8 {
    zoom.clamp(MIN_ZOOM as i64, MAX_ZOOM as i64) as u8
}

fn clamp_fps(fps: u64) -> u64 {
    fps.clamp(1, MAX_UI_FPS)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn print_help() {
    println!("flight-replay");
    println!("Usage: flight-replay [--data PATH] [--display PATH] [--config PATH]");
    println!("       [--year YEAR|all] [--aircraft REG|all]");
    println!("       [--speed MULTIPLIER] [--auto-zoom] [--no-auto-zoom]");
    println!("       [--zoom LEVEL] [--edge-margin FRACTION] [--ui-fps FPS]");
    println!("       [--theme default|color|amber|ocean|mono]");
    println!("       [--log] [--no-log] [--log-level LEVEL] [--log-file PATH]");
    println!("Environment: FLIGHT_REPLAY_CONFIG overrides config path");
    println!("Environment: FLIGHT_REPLAY_DATA/DISPLAY set the dataset files");
    println!("Environment: FLIGHT_REPLAY_YEAR/AIRCRAFT set the initial filters");
    println!("Environment: FLIGHT_REPLAY_SPEED/AUTO_ZOOM/ZOOM/EDGE_MARGIN control replay");
    println!("Environment: FLIGHT_REPLAY_UI_FPS/THEME control the display");
    println!("Environment: FLIGHT_REPLAY_LOG_ENABLED/LEVEL/FILE configure logging");
    println!("Keys: q quit | up/down move | space select | c clear selection | y year | a aircraft");
    println!("      p/enter play/pause | x stop | left/right seek 30s | +/- speed");
    println!("      z auto-zoom | [ ] zoom | e export csv | E export json | t theme | ? help");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        dir.push(format!("flight-replay-config-test-{suffix}"));
        let _ = fs::create_dir_all(&dir);
        dir.push(name);
        dir
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.data_file, "flights.json");
        assert_eq!(cfg.display_file, "");
        assert_eq!(cfg.year, "all");
        assert_eq!(cfg.aircraft, "all");
        assert_eq!(cfg.speed, 50.0);
        assert!(cfg.auto_zoom);
        assert_eq!(cfg.zoom, 12);
        assert_eq!(cfg.edge_margin, 0.10);
        assert_eq!(cfg.ui_fps, 30);
        assert!(!cfg.log_enabled);
        assert_eq!(cfg.log_file, "flight-replay.log");
    }

    #[test]
    fn load_file_config_parses_values() {
        let path = temp_file("config.toml");
        let content = r#"
data_file = "logbook.json"
display_file = "logbook-lowres.json"
year = 2024
aircraft = "D-EABC"
speed = 100.0
auto_zoom = false
zoom = 10
edge_margin = 0.2
ui_fps = 60
theme = "amber"
log_enabled = true
log_level = "debug"
log_file = "replay.log"
"#;
        fs::write(&path, content).unwrap();
        let cfg = load_file_config(&path).unwrap().unwrap();
        assert_eq!(cfg.data_file.as_deref(), Some("logbook.json"));
        assert_eq!(cfg.display_file.as_deref(), Some("logbook-lowres.json"));
        assert_eq!(cfg.year, Some(TextOrNumber::Number(2024)));
        assert_eq!(cfg.aircraft.as_deref(), Some("D-EABC"));
        assert_eq!(cfg.speed, Some(100.0));
        assert_eq!(cfg.auto_zoom, Some(false));
        assert_eq!(cfg.zoom, Some(10));
        assert_eq!(cfg.edge_margin, Some(0.2));
        assert_eq!(cfg.ui_fps, Some(60));
        assert_eq!(cfg.theme.as_deref(), Some("amber"));
        assert_eq!(cfg.log_enabled, Some(true));
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
        assert_eq!(cfg.log_file.as_deref(), Some("replay.log"));
        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir(path.parent().unwrap());
    }

    #[test]
    fn apply_file_config_overrides_and_clamps() {
        let mut cfg = Config::default();
        let file = FileConfig {
            year: Some(TextOrNumber::Text("2023".to_string())),
            speed: Some(0.0),
            zoom: Some(40),
            edge_margin: Some(0.9),
            ui_fps: Some(0),
            theme: Some("ocean".to_string()),
            log_enabled: Some(true),
            log_level: Some("trace".to_string()),
            ..Default::default()
        };
        apply_file_config(&mut cfg, file);
        assert_eq!(cfg.year, "2023");
        assert_eq!(cfg.speed, MIN_SPEED);
        assert_eq!(cfg.zoom, MAX_ZOOM);
        assert_eq!(cfg.edge_margin, 0.45);
        assert_eq!(cfg.ui_fps, 1);
        assert_eq!(cfg.theme, "ocean");
        assert!(cfg.log_enabled);
        assert_eq!(cfg.log_level, "trace");
        assert_eq!(cfg.data_file, DEFAULT_DATA_FILE);
    }

    #[test]
    fn cli_flags_override_file_values() {
        let path = temp_file("flight-replay.toml");
        fs::write(&path, "speed = 10.0\nzoom = 8\nyear = \"2022\"\n").unwrap();
        let cfg = parse_from(&args(&[
            "--config",
            path.to_str().unwrap(),
            "--speed",
            "200",
            "--no-auto-zoom",
            "--data",
            "other.json",
        ]))
        .unwrap();
        assert_eq!(cfg.config_path, path);
        assert_eq!(cfg.speed, 200.0);
        assert_eq!(cfg.zoom, 8);
        assert_eq!(cfg.year, "2022");
        assert!(!cfg.auto_zoom);
        assert_eq!(cfg.data_file, "other.json");
        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir(path.parent().unwrap());
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let path = temp_file("nope.toml");
        let _ = fs::remove_file(&path);
        let err = parse_from(&args(&["--config", path.to_str().unwrap()])).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
        let _ = fs::remove_dir(path.parent().unwrap());
    }

    #[test]
    fn bad_flags_are_rejected() {
        let path = temp_file("empty.toml");
        fs::write(&path, "").unwrap();
        let config = path.to_str().unwrap();
        let err = parse_from(&args(&["--config", config, "--warp"])).unwrap_err();
        assert!(err.to_string().contains("Unknown argument: --warp"));
        let err = parse_from(&args(&["--config", config, "--speed"])).unwrap_err();
        assert!(err.to_string().contains("--speed needs a value"));
        let err = parse_from(&args(&["--config", config, "--zoom", "close"])).unwrap_err();
        assert!(err.to_string().contains("Invalid --zoom value"));
        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir(path.parent().unwrap());
    }

    #[test]
    fn truthy_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy(" Yes "));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("off"));
    }
}
