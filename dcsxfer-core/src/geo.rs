use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aircraft::AircraftKind;

#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    #[error("Latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("Longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

/// A WGS84 position with altitude, as produced by coordinate entry or the host camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedGeoPoint")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
    pub is_agl: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Terrain elevation under the point, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_elevation_m: Option<f64>,
    /// Grid reference computed by the geodesy layer, for cockpits that take MGRS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<MgrsReference>,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64, altitude_m: f64, is_agl: bool) -> Result<Self, GeoError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::LongitudeOutOfRange(longitude));
        }

        Ok(Self {
            latitude,
            longitude,
            altitude_m,
            is_agl,
            label: None,
            ground_elevation_m: None,
            grid: None,
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_ground_elevation(mut self, elevation_m: f64) -> Self {
        self.ground_elevation_m = Some(elevation_m);
        self
    }

    pub fn with_grid(mut self, grid: MgrsReference) -> Self {
        self.grid = Some(grid);
        self
    }

    /// Altitude above mean sea level, or `None` for an AGL altitude over unknown terrain.
    pub fn msl_altitude_m(&self) -> Option<f64> {
        if self.is_agl {
            self.ground_elevation_m.map(|ground| ground + self.altitude_m)
        } else {
            Some(self.altitude_m)
        }
    }
}

/// A point as read from a file, before the range checks.
#[derive(Deserialize)]
struct UncheckedGeoPoint {
    latitude: f64,
    longitude: f64,
    altitude_m: f64,
    is_agl: bool,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    ground_elevation_m: Option<f64>,
    #[serde(default)]
    grid: Option<MgrsReference>,
}

impl TryFrom<UncheckedGeoPoint> for GeoPoint {
    type Error = GeoError;

    fn try_from(raw: UncheckedGeoPoint) -> Result<Self, Self::Error> {
        let point = GeoPoint::new(raw.latitude, raw.longitude, raw.altitude_m, raw.is_agl)?;
        Ok(GeoPoint {
            label: raw.label,
            ground_elevation_m: raw.ground_elevation_m,
            grid: raw.grid,
            ..point
        })
    }
}

/// MGRS reference as `<zone><band> <square> <easting> <northing>`.
///
/// `easting`/`northing` hold `precision` digits each (1 = 10 km, 5 = 1 m).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MgrsReference {
    pub zone: u8,
    pub band: char,
    pub square: [char; 2],
    pub easting: u32,
    pub northing: u32,
    pub precision: u8,
}

impl std::fmt::Display for MgrsReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self.precision as usize;
        write!(
            f,
            "{:02}{}{}{}{:0width$}{:0width$}",
            self.zone,
            self.band,
            self.square[0],
            self.square[1],
            self.easting,
            self.northing,
            width = width
        )
    }
}

/// The aircraft-specific part of an entry: which kind of point to create and
/// the sub-option chosen for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavPointSpec {
    pub aircraft: AircraftKind,
    pub point_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
}

impl NavPointSpec {
    pub fn new(aircraft: AircraftKind, point_type: impl Into<String>) -> Self {
        Self {
            aircraft,
            point_type: point_type.into(),
            option: None,
        }
    }

    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.option = Some(option.into());
        self
    }
}

/// One row of the point list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntry {
    pub id: usize,
    pub point: GeoPoint,
    #[serde(default)]
    pub specs: Vec<NavPointSpec>,
    #[serde(default)]
    pub transfer: bool,
}

impl DataEntry {
    pub fn new(id: usize, point: GeoPoint) -> Self {
        Self {
            id,
            point,
            specs: Vec::new(),
            transfer: true,
        }
    }

    pub fn with_spec(mut self, spec: NavPointSpec) -> Self {
        self.set_spec(spec);
        self
    }

    pub fn spec_for(&self, aircraft: AircraftKind) -> Option<&NavPointSpec> {
        self.specs.iter().find(|spec| spec.aircraft == aircraft)
    }

    /// Stores `spec`, replacing any previous one for the same aircraft.
    pub fn set_spec(&mut self, spec: NavPointSpec) {
        match self.specs.iter_mut().find(|s| s.aircraft == spec.aircraft) {
            Some(existing) => *existing = spec,
            None => self.specs.push(spec),
        }
    }
}

pub fn entries_from_json(json: &str) -> Result<Vec<DataEntry>, serde_json::Error> {
    serde_json::from_str(json)
}

pub fn entries_to_json(entries: &[DataEntry]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(entries)
}
