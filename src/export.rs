use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::stats::StatisticsResult;

const EXPORT_DIR: &str = "exports";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportPayload<'a> {
    scope: &'a str,
    exported_at: String,
    statistics: &'a StatisticsResult,
}

pub fn export_json(stats: &StatisticsResult, scope: &str) -> Result<String> {
    export_json_to(Path::new(EXPORT_DIR), stats, scope)
}

pub fn export_csv(stats: &StatisticsResult, scope: &str) -> Result<String> {
    export_csv_to(Path::new(EXPORT_DIR), stats, scope)
}

pub fn export_json_to(dir: &Path, stats: &StatisticsResult, scope: &str) -> Result<String> {
    let path = export_path(dir, "json")?;
    let payload = ExportPayload {
        scope,
        exported_at: Local::now().to_rfc3339(),
        statistics: stats,
    };
    let content = serde_json::to_string_pretty(&payload)?;
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path.to_string_lossy().to_string())
}

pub fn export_csv_to(dir: &Path, stats: &StatisticsResult, scope: &str) -> Result<String> {
    let path = export_path(dir, "csv")?;

    let mut lines = Vec::new();
    lines.push("metric,value".to_string());
    let mut row = |name: &str, value: String| lines.push(format!("{name},{}", csv_field(&value)));
    row("scope", scope.to_string());
    row("total_points", stats.total_points.to_string());
    row("num_paths", stats.num_paths.to_string());
    row("total_flights", stats.total_flights.to_string());
    row("airports", stats.airports.join(" "));
    row("total_distance_km", fixed(stats.total_distance_km, 2));
    row("total_distance_nm", fixed(stats.total_distance_nm, 2));
    row("average_distance_km", fixed(stats.average_distance_km, 2));
    row("average_distance_nm", fixed(stats.average_distance_nm, 2));
    row("longest_flight_km", fixed(stats.longest_flight_km, 2));
    row("longest_flight_nm", fixed(stats.longest_flight_nm, 2));
    row("min_altitude_ft", fixed(stats.min_altitude_ft, 0));
    row("max_altitude_ft", fixed(stats.max_altitude_ft, 0));
    row("total_altitude_gain_ft", fixed(stats.total_altitude_gain_ft, 0));
    row("max_groundspeed_knots", fixed(stats.max_groundspeed_knots, 1));
    row("average_groundspeed_knots", fixed(stats.average_groundspeed_knots, 1));
    row("cruise_speed_knots", fixed(stats.cruise_speed_knots, 1));
    row("most_common_cruise_altitude_ft", fixed(stats.most_common_cruise_altitude_ft, 0));
    row("total_flight_time_seconds", fixed(stats.total_flight_time_seconds, 0));
    row("total_flight_time", stats.total_flight_time.clone());

    if !stats.aircraft.is_empty() {
        lines.push(String::new());
        lines.push("registration,type,model,flights,flight_time_seconds,flight_time".to_string());
        for aircraft in &stats.aircraft {
            lines.push(format!(
                "{},{},{},{},{},{}",
                csv_field(&aircraft.registration),
                csv_field(aircraft.aircraft_type.as_deref().unwrap_or("")),
                csv_field(aircraft.model.as_deref().unwrap_or("")),
                aircraft.flights,
                fixed(aircraft.flight_time_seconds, 0),
                csv_field(&aircraft.flight_time)
            ));
        }
    }

    fs::write(&path, lines.join("\n"))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path.to_string_lossy().to_string())
}

fn fixed(value: f64, precision: usize) -> String {
    format!("{value:.precision$}")
}

fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

fn export_path(dir: &Path, ext: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let filename = format!(
        "flight-stats-{}.{ext}",
        Local::now().format("%Y%m%d-%H%M%S")
    );
    let path = dir.join(filename);
    if path.exists() {
        Ok(unique_path(&path))
    } else {
        Ok(path)
    }
}

fn unique_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("export");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let mut i = 1;
    loop {
        let name = if ext.is_empty() {
            format!("{stem}-{i}")
        } else {
            format!("{stem}-{i}.{ext}")
        };
        let candidate = parent.join(name);
        if !candidate.exists() {
            return candidate;
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::AircraftSummary;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir() -> PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("flight-replay-export-{suffix}"))
    }

    fn sample_stats() -> StatisticsResult {
        StatisticsResult {
            num_paths: 2,
            total_flights: 2,
            airports: vec!["EDDF".to_string(), "EDDM".to_string()],
            aircraft: vec![AircraftSummary {
                registration: "D-EABC".to_string(),
                aircraft_type: Some("C172".to_string()),
                model: Some("Cessna 172, Skyhawk".to_string()),
                flights: 2,
                flight_time_seconds: 5400.0,
                flight_time: "1h 30m".to_string(),
            }],
            total_distance_km: 222.39,
            ..StatisticsResult::default()
        }
    }

    #[test]
    fn json_export_never_overwrites() {
        let dir = temp_dir();
        let stats = sample_stats();
        let first = export_json_to(&dir, &stats, "All flights").unwrap();
        let second = export_json_to(&dir, &stats, "All flights").unwrap();
        assert_ne!(first, second);

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&first).unwrap()).unwrap();
        assert_eq!(value["scope"], "All flights");
        assert_eq!(value["statistics"]["numPaths"], 2);
        assert_eq!(value["statistics"]["aircraft"][0]["registration"], "D-EABC");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn csv_export_quotes_fields() {
        let dir = temp_dir();
        let path = export_csv_to(&dir, &sample_stats(), "Year 2024 / Aircraft all").unwrap();
        assert!(path.ends_with(".csv"));
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "metric,value");
        assert!(lines.contains(&"total_distance_km,222.39"));
        assert!(lines.contains(&"airports,EDDF EDDM"));
        assert!(lines.contains(&"D-EABC,C172,\"Cessna 172, Skyhawk\",2,5400,1h 30m"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn csv_fields_with_line_breaks_are_quoted() {
        assert_eq!(csv_field("Skyhawk"), "Skyhawk");
        assert_eq!(csv_field("Sky\nhawk"), "\"Sky\nhawk\"");
        assert_eq!(csv_field("Sky\r\nhawk"), "\"Sky\r\nhawk\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn unique_path_appends_counter() {
        let dir = temp_dir();
        fs::create_dir_all(&dir).unwrap();
        let base = dir.join("flight-stats-x.csv");
        fs::write(&base, "").unwrap();
        assert_eq!(unique_path(&base), dir.join("flight-stats-x-1.csv"));
        let _ = fs::remove_dir_all(&dir);
    }
}
