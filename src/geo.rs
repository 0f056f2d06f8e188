const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance using the haversine formula.
/// Input lat/lon in degrees. Output in meters.
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Cumulative great-circle distance along `points` (lat, lon), in meters.
pub fn route_meters(points: &[(f64, f64)]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_meters(pair[0].0, pair[0].1, pair[1].0, pair[1].1))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_is_zero() {
        assert_eq!(haversine_meters(42.7, -73.7, 42.7, -73.7), 0.0);
    }

    #[test]
    fn one_degree_of_latitude() {
        // pi * R / 180
        let d = haversine_meters(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_194.93).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn route_sums_segments() {
        let points = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)];
        let expected = haversine_meters(0.0, 0.0, 1.0, 0.0) + haversine_meters(1.0, 0.0, 1.0, 1.0);
        assert_eq!(route_meters(&points), expected);
        // A detour is never shorter than the direct hop.
        assert!(route_meters(&points) > haversine_meters(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn short_routes_are_zero() {
        assert_eq!(route_meters(&[]), 0.0);
        assert_eq!(route_meters(&[(10.0, 10.0)]), 0.0);
    }
}
