//! Decoding of OpenWeatherMap geocoding responses.
//!
//! The free-text endpoint (`/geo/1.0/direct`) answers with a list, the postal
//! code endpoint (`/geo/1.0/zip`) with a single object. Both are accepted here.

use serde::Deserialize;

use crate::types::Coordinates;

#[derive(Debug, Deserialize)]
struct GeocodeHit {
    lat: f64,
    lon: f64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeocodeBody {
    Many(Vec<GeocodeHit>),
    One(GeocodeHit),
}

impl From<GeocodeHit> for Coordinates {
    fn from(hit: GeocodeHit) -> Self {
        Self {
            latitude: hit.lat,
            longitude: hit.lon,
            name: hit.name.unwrap_or_default(),
            country: hit.country.unwrap_or_default(),
        }
    }
}

/// Extract coordinates from a geocode response body.
///
/// Returns `None` for an empty body, an empty list, or anything that doesn't
/// carry a latitude and longitude. Lists use their first element.
pub fn parse_geocode_body(body: &[u8]) -> Option<Coordinates> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }

    let parsed: GeocodeBody = match serde_json::from_slice(body) {
        Ok(b) => b,
        Err(e) => {
            tracing::debug!("Geocode body did not decode: {}", e);
            return None;
        }
    };

    let hit = match parsed {
        GeocodeBody::Many(hits) => hits.into_iter().next()?,
        GeocodeBody::One(hit) => hit,
    };

    Some(hit.into())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_parse_list_uses_first_entry() {
        let body = br#"[
            {"name": "Hyderabad", "lat": 17.385, "lon": 78.4867, "country": "IN", "state": "Telangana"},
            {"name": "Hyderabad", "lat": 25.3792, "lon": 68.3683, "country": "PK"}
        ]"#;

        let coords = parse_geocode_body(body).unwrap();
        assert_eq!(coords.latitude, 17.385);
        assert_eq!(coords.longitude, 78.4867);
        assert_eq!(coords.label(), "Hyderabad, IN");
    }

    #[test]
    fn test_parse_single_object() {
        let body = br#"{"zip": "500001", "name": "Hyderabad", "lat": 17.3753, "lon": 78.4744, "country": "IN"}"#;

        let coords = parse_geocode_body(body).unwrap();
        assert_eq!(coords.name, "Hyderabad");
        assert_eq!(coords.latitude, 17.3753);
    }

    #[test]
    fn test_parse_empty_bodies() {
        assert!(parse_geocode_body(b"").is_none());
        assert!(parse_geocode_body(b"  \n").is_none());
        assert!(parse_geocode_body(b"[]").is_none());
        assert!(parse_geocode_body(b"{}").is_none());
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(parse_geocode_body(b"<html>bad gateway</html>").is_none());
    }

    #[test]
    fn test_parse_missing_name_and_country() {
        let coords = parse_geocode_body(br#"[{"lat": 1.5, "lon": -2.25, "name": null}]"#).unwrap();
        assert_eq!(coords.name, "");
        assert_eq!(coords.country, "");
    }
}
