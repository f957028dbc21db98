//! Airport identifiers and the read-only airport catalog.
//!
//! The catalog is an external collaborator: the engine only needs to know
//! which codes exist. Distances are informational and never price a flight.
use crate::constants::{EARTH_RADIUS_KM, HOME_AIRPORT};
use crate::numbers::floor_f64_to_u32;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// ICAO-style airport identifier, normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AirportCode(String);

impl AirportCode {
    #[must_use]
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_ascii_uppercase())
    }

    /// The fixed start and return airport.
    #[must_use]
    pub fn home() -> Self {
        Self(HOME_AIRPORT.to_string())
    }

    #[must_use]
    pub fn is_home(&self) -> bool {
        self.0 == HOME_AIRPORT
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for AirportCode {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<&str> for AirportCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<AirportCode> for String {
    fn from(value: AirportCode) -> Self {
        value.0
    }
}

impl fmt::Display for AirportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub icao: AirportCode,
    pub name: String,
    #[serde(default)]
    pub city: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

impl Airport {
    /// Whole kilometres (rounded down) between this airport and `other`.
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> u32 {
        floor_f64_to_u32(haversine_km((self.lat, self.lon), (other.lat, other.lon)))
    }
}

/// Great-circle distance in kilometres between two `(lat, lon)` points in degrees.
#[must_use]
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Catalog row paired with its distance from the home airport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirportListing {
    #[serde(flatten)]
    pub airport: Airport,
    pub distance_km: u32,
}

/// Read-only source of airports.
pub trait AirportCatalog {
    /// Every airport in the catalog.
    fn airports(&self) -> &[Airport];

    /// Look up an airport by code.
    fn find(&self, code: &AirportCode) -> Option<&Airport> {
        self.airports().iter().find(|airport| &airport.icao == code)
    }

    /// Whether the code names a known airport.
    fn contains(&self, code: &AirportCode) -> bool {
        self.find(code).is_some()
    }

    /// Every airport with its distance from home; home itself reports zero.
    fn listings(&self) -> Vec<AirportListing> {
        let home = self.find(&AirportCode::home());
        self.airports()
            .iter()
            .map(|airport| AirportListing {
                airport: airport.clone(),
                distance_km: home.map_or(0, |home| home.distance_km(airport)),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct AirportFile {
    airports: Vec<Airport>,
}

/// In-memory catalog backed by a JSON document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticAirports {
    airports: Vec<Airport>,
}

impl StaticAirports {
    #[must_use]
    pub const fn from_airports(airports: Vec<Airport>) -> Self {
        Self { airports }
    }

    /// Parse a catalog from a JSON document of the form `{ "airports": [...] }`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into airport entries.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: AirportFile = serde_json::from_str(json)?;
        Ok(Self::from_airports(file.airports))
    }

    /// The catalog bundled with the engine.
    ///
    /// # Panics
    ///
    /// Panics if the embedded catalog is malformed, which is a build defect.
    #[must_use]
    pub fn load_default() -> Self {
        static CATALOG: OnceLock<StaticAirports> = OnceLock::new();
        CATALOG
            .get_or_init(|| {
                Self::from_json(include_str!("../data/airports.json"))
                    .expect("valid embedded airport catalog")
            })
            .clone()
    }
}

impl AirportCatalog for StaticAirports {
    fn airports(&self) -> &[Airport] {
        &self.airports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_normalize_case_and_whitespace() {
        let code = AirportCode::new("  efhk ");
        assert_eq!(code.as_str(), "EFHK");
        assert!(code.is_home());
        assert_eq!(AirportCode::from("essa"), AirportCode::new("ESSA"));

        let parsed: AirportCode = serde_json::from_str("\"eetn\"").unwrap();
        assert_eq!(parsed.as_str(), "EETN");
    }

    #[test]
    fn default_catalog_contains_home() {
        let catalog = StaticAirports::load_default();
        assert!(catalog.contains(&AirportCode::home()));
        assert!(!catalog.contains(&AirportCode::new("ZZZZ")));
        assert!(catalog.airports().len() > 10);
    }

    #[test]
    fn listings_measure_from_home() {
        let catalog = StaticAirports::load_default();
        let listings = catalog.listings();
        let home = listings
            .iter()
            .find(|listing| listing.airport.icao.is_home())
            .unwrap();
        assert_eq!(home.distance_km, 0);

        // Helsinki to Tallinn is roughly 100 km across the gulf.
        let tallinn = listings
            .iter()
            .find(|listing| listing.airport.icao.as_str() == "EETN")
            .unwrap();
        assert!((90..=110).contains(&tallinn.distance_km));
    }

    #[test]
    fn haversine_is_symmetric() {
        let a = (60.317_222, 24.963_333);
        let b = (51.470_6, -0.461_941);
        let there = haversine_km(a, b);
        let back = haversine_km(b, a);
        assert!((there - back).abs() < 1e-6);
        assert!(there > 1_700.0 && there < 1_900.0);
    }
}
