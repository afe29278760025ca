use chrono::Duration;

use crate::db_types::{Location, ShipmentType};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(from: &Location, to: &Location) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let d_phi = (to.lat - from.lat).to_radians();
    let d_lambda = (to.lng - from.lng).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// The promised delivery window for a shipment, keyed on shipment type and
/// distance bucket. Local runs are biker jobs measured in hours; intercity
/// routes ride the bus schedules.
pub fn delivery_window(shipment_type: ShipmentType, distance_km: f64) -> Duration {
    match shipment_type {
        ShipmentType::Local => {
            if distance_km < 10.0 {
                Duration::hours(2)
            } else if distance_km < 30.0 {
                Duration::hours(6)
            } else {
                Duration::hours(12)
            }
        },
        ShipmentType::Intercity => {
            if distance_km < 100.0 {
                Duration::hours(12)
            } else if distance_km < 300.0 {
                Duration::hours(24)
            } else {
                Duration::hours(48)
            }
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn loc(city: &str, lat: f64, lng: f64) -> Location {
        Location::new("", city, lat, lng)
    }

    #[test]
    fn nairobi_to_mombasa() {
        let nairobi = loc("Nairobi", -1.2864, 36.8172);
        let mombasa = loc("Mombasa", -4.0435, 39.6682);
        let d = haversine_km(&nairobi, &mombasa);
        // Straight-line distance is roughly 440 km
        assert!((d - 440.0).abs() < 10.0, "got {d}");
    }

    #[test]
    fn zero_distance() {
        let p = loc("Nakuru", -0.3031, 36.0800);
        assert!(haversine_km(&p, &p) < 1e-9);
    }

    #[test]
    fn antipodal_is_half_circumference() {
        let a = loc("A", 0.0, 0.0);
        let b = loc("B", 0.0, 180.0);
        let d = haversine_km(&a, &b);
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1.0);
    }

    #[test]
    fn delivery_window_buckets() {
        use ShipmentType::*;
        assert_eq!(delivery_window(Local, 4.0), Duration::hours(2));
        assert_eq!(delivery_window(Local, 15.0), Duration::hours(6));
        assert_eq!(delivery_window(Local, 45.0), Duration::hours(12));
        assert_eq!(delivery_window(Intercity, 80.0), Duration::hours(12));
        assert_eq!(delivery_window(Intercity, 150.0), Duration::hours(24));
        assert_eq!(delivery_window(Intercity, 440.0), Duration::hours(48));
    }
}
