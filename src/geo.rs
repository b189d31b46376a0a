use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const KM_TO_NM: f64 = 0.539957;
pub const FT_TO_M: f64 = 0.3048;
pub const M_TO_FT: f64 = 3.28084;

/// `[lat, lon]` in decimal degrees, the layout used by segment coordinates.
pub type Coord = [f64; 2];

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<Coord> for GeoPoint {
    fn from(value: Coord) -> Self {
        Self {
            lat: value[0],
            lon: value[1],
        }
    }
}

/// Great-circle distance in kilometres on a sphere of radius [`EARTH_RADIUS_KM`].
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin() * EARTH_RADIUS_KM
}

/// Initial great-circle bearing from `a` towards `b`, in `[0, 360)`.
pub fn bearing_deg(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    let mut deg = y.atan2(x).to_degrees();
    if deg < 0.0 {
        deg += 360.0;
    }
    if deg >= 360.0 {
        deg -= 360.0;
    }
    deg
}

pub fn km_to_nm(km: f64) -> f64 {
    km * KM_TO_NM
}

pub fn ft_to_m(ft: f64) -> f64 {
    ft * FT_TO_M
}

pub fn m_to_ft(m: f64) -> f64 {
    m * M_TO_FT
}

/// Linear interpolation between `a` and `b` at fraction `t`.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Position of `value` within `[min, max]` as a fraction clamped to `[0, 1]`.
///
/// A degenerate span (`min == max`) uses a denominator of 1 instead of
/// dividing by zero.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    let span = if span.abs() < f64::EPSILON { 1.0 } else { span };
    ((value - min) / span).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon)
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let d = haversine_km(p(0.0, 0.0), p(0.0, 1.0));
        assert!((d - 111.19).abs() < 0.01, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (p(51.47, -0.45), p(40.64, -73.78)),
            (p(-33.94, 151.17), p(1.36, 103.99)),
            (p(0.0, 179.5), p(0.0, -179.5)),
            (p(89.9, 10.0), p(-89.9, -170.0)),
        ];
        for (a, b) in pairs {
            assert_eq!(haversine_km(a, b), haversine_km(b, a));
        }
    }

    #[test]
    fn same_point_is_zero() {
        let d = haversine_km(p(26.0, -80.0), p(26.0, -80.0));
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn cardinal_bearings() {
        assert!((bearing_deg(p(0.0, 0.0), p(1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((bearing_deg(p(0.0, 0.0), p(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((bearing_deg(p(1.0, 0.0), p(0.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((bearing_deg(p(0.0, 1.0), p(0.0, 0.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn unit_conversions_round_trip() {
        for ft in [0.0, 1.0, 1000.0, 35_000.0, 41_123.5] {
            let back = m_to_ft(ft_to_m(ft));
            assert!((back - ft).abs() <= ft.abs() * 1e-6 + 1e-9, "{ft} -> {back}");
        }
        assert!((km_to_nm(222.39) - 120.08).abs() < 0.01);
    }

    #[test]
    fn normalize_floors_degenerate_span() {
        assert_eq!(normalize(5.0, 5.0, 5.0), 0.0);
        assert_eq!(normalize(6.0, 5.0, 5.0), 1.0);
        assert!((normalize(15.0, 10.0, 20.0) - 0.5).abs() < 1e-12);
        assert_eq!(normalize(-1.0, 0.0, 10.0), 0.0);
    }
}
