//! Serialization helpers that keep responses JSON-safe.

use serde::Serializer;

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Rounded value, or `None` when it is NaN or infinite.
pub fn finite_round(value: f64, places: i32) -> Option<f64> {
    value.is_finite().then(|| round_to(value, places))
}

pub fn finite_or_null<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_none()
    }
}

pub fn rounded_2<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    finite_or_null(&round_to(*value, 2), serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Probe {
        #[serde(serialize_with = "rounded_2")]
        value: f64,
    }

    #[test]
    fn non_finite_becomes_null() {
        let v = serde_json::to_value(Probe { value: f64::NAN }).unwrap();
        assert!(v["value"].is_null());
        let v = serde_json::to_value(Probe { value: f64::INFINITY }).unwrap();
        assert!(v["value"].is_null());
    }

    #[test]
    fn rounds_to_cents() {
        let v = serde_json::to_value(Probe { value: 10.236 }).unwrap();
        assert_eq!(v["value"], 10.24);
        assert_eq!(finite_round(0.123456, 4), Some(0.1235));
        assert_eq!(finite_round(f64::NAN, 2), None);
    }
}
