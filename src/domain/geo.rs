use crate::domain::models::Coordinates;

/// Mean Earth radius (m)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle (haversine) distance in metres between two points.
pub fn distance_m(a: &Coordinates, b: &Coordinates) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    // Absolute differences keep dist(a, b) bit-identical to dist(b, a)
    let d_phi = (phi2 - phi1).abs();
    let d_lambda = (b.longitude.to_radians() - a.longitude.to_radians()).abs();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

impl Coordinates {
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        distance_m(self, other)
    }
}
