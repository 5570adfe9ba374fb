//! Vehicle photo filename convention.
//!
//! Photos uploaded for a vehicle must be named `YYYYMODEL_ANGLE.ext`, for
//! example `2021TB_FDS.jpg`:
//!
//! - `YYYY`: model year, 1990 through 2030
//! - `MODEL`: short model code, resolved through a [`ModelCatalog`](crate::catalog::ModelCatalog)
//! - `ANGLE`: one of the fifteen codes in [`ANGLE_ORDER`]
//!
//! Validation failures are returned as values so the upload form can tell the
//! user how to rename the file.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Earliest accepted model year.
pub const MIN_YEAR: i32 = 1990;

/// Latest accepted model year.
pub const MAX_YEAR: i32 = 2030;

/// Camera angle (or subject) of a vehicle photo.
///
/// Declaration order matches [`ANGLE_ORDER`], the order photos are shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AngleCode {
    /// Front, driver side.
    #[serde(rename = "FDS")]
    FrontDriverSide,
    /// Front, passenger side.
    #[serde(rename = "FPS")]
    FrontPassengerSide,
    /// Side, driver side.
    #[serde(rename = "SDS")]
    SideDriverSide,
    /// Side, passenger side.
    #[serde(rename = "SPS")]
    SidePassengerSide,
    /// Side rear, driver side.
    #[serde(rename = "SRDS")]
    SideRearDriverSide,
    /// Side rear, passenger side.
    #[serde(rename = "SRPS")]
    SideRearPassengerSide,
    /// Rear, driver side.
    #[serde(rename = "RDS")]
    RearDriverSide,
    /// Straight rear.
    #[serde(rename = "R")]
    Rear,
    /// Straight front.
    #[serde(rename = "F")]
    Front,
    /// Interior, front seats.
    #[serde(rename = "INT")]
    Interior,
    /// Interior, back seats.
    #[serde(rename = "INTB")]
    InteriorBack,
    /// Engine bay.
    #[serde(rename = "ENG")]
    Engine,
    /// Trunk or cargo area.
    #[serde(rename = "TRK")]
    Trunk,
    /// Odometer reading.
    #[serde(rename = "ODOM")]
    Odometer,
    /// VIN plate.
    #[serde(rename = "VIN")]
    Vin,
}

/// Display order for a vehicle's photos: exterior shots first, then
/// interior, engine, odometer and VIN.
pub const ANGLE_ORDER: [AngleCode; 15] = [
    AngleCode::FrontDriverSide,
    AngleCode::FrontPassengerSide,
    AngleCode::SideDriverSide,
    AngleCode::SidePassengerSide,
    AngleCode::SideRearDriverSide,
    AngleCode::SideRearPassengerSide,
    AngleCode::RearDriverSide,
    AngleCode::Rear,
    AngleCode::Front,
    AngleCode::Interior,
    AngleCode::InteriorBack,
    AngleCode::Engine,
    AngleCode::Trunk,
    AngleCode::Odometer,
    AngleCode::Vin,
];

impl AngleCode {
    /// The code as it appears in filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            AngleCode::FrontDriverSide => "FDS",
            AngleCode::FrontPassengerSide => "FPS",
            AngleCode::SideDriverSide => "SDS",
            AngleCode::SidePassengerSide => "SPS",
            AngleCode::SideRearDriverSide => "SRDS",
            AngleCode::SideRearPassengerSide => "SRPS",
            AngleCode::RearDriverSide => "RDS",
            AngleCode::Rear => "R",
            AngleCode::Front => "F",
            AngleCode::Interior => "INT",
            AngleCode::InteriorBack => "INTB",
            AngleCode::Engine => "ENG",
            AngleCode::Trunk => "TRK",
            AngleCode::Odometer => "ODOM",
            AngleCode::Vin => "VIN",
        }
    }

    /// Zero-based position in [`ANGLE_ORDER`].
    pub fn position(&self) -> usize {
        ANGLE_ORDER
            .iter()
            .position(|a| a == self)
            .unwrap_or(ANGLE_ORDER.len())
    }
}

impl fmt::Display for AngleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AngleCode {
    type Err = PhotoNameError;

    /// Exact, case-sensitive match against the fifteen codes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ANGLE_ORDER
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| PhotoNameError::UnknownAngle(s.to_string()))
    }
}

/// Sort key for a raw angle string.
///
/// Unknown codes get `-1`, so photos with an unrecognized angle sort ahead of
/// every recognized one.
pub fn angle_order_index(code: &str) -> isize {
    code.parse::<AngleCode>()
        .map(|a| a.position() as isize)
        .unwrap_or(-1)
}

/// Stable sort of `items` by the [`ANGLE_ORDER`] position of each item's angle.
pub fn order_by_angle<T, F>(items: &mut [T], angle: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by_key(|item| angle_order_index(angle(item)));
}

/// Why a filename does not follow the `YYYYMODEL_ANGLE.ext` convention.
///
/// The `Display` text is shown to the person uploading the file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhotoNameError {
    #[error(
        "Filename must contain exactly one underscore separating year/model from angle (e.g. 2021TB_FDS.jpg), found {0} part(s)"
    )]
    Separator(usize),

    #[error("Filename part before the underscore must be at least 5 characters: 4-digit year plus model code")]
    TooShort,

    #[error("Year '{0}' is not a number")]
    YearNotNumeric(String),

    #[error("Year {0} is out of range ({}-{})", MIN_YEAR, MAX_YEAR)]
    YearOutOfRange(i32),

    #[error("Angle '{0}' is not recognized. Valid angles: FDS, FPS, SDS, SPS, SRDS, SRPS, RDS, R, F, INT, INTB, ENG, TRK, ODOM, VIN")]
    UnknownAngle(String),
}

/// A decoded photo filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPhotoName {
    pub year: i32,
    pub model_code: String,
    pub angle: AngleCode,
}

/// Structured validation verdict returned to the uploader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilenameValidation {
    pub valid: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FilenameValidation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn failed(err: &PhotoNameError) -> Self {
        Self {
            valid: false,
            error: Some(err.to_string()),
        }
    }
}

/// Strip any directory components and the final extension.
fn file_stem(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(dot) if dot > 0 => &base[..dot],
        _ => base,
    }
}

/// Decode a photo filename.
///
/// Rules are checked in order: one `_` separator with two non-empty sides,
/// at least five characters before it, a numeric year in range, and a known
/// angle code after it.
pub fn parse_filename(name: &str) -> Result<ParsedPhotoName, PhotoNameError> {
    let stem = file_stem(name);

    let parts: Vec<&str> = stem.split('_').collect();
    let (head, angle) = match parts.as_slice() {
        [head, angle] if !head.is_empty() && !angle.is_empty() => (*head, *angle),
        _ => return Err(PhotoNameError::Separator(parts.len())),
    };

    if head.chars().count() < 5 {
        return Err(PhotoNameError::TooShort);
    }

    // char boundary of the 5th character; the length check guarantees it exists
    let split = head.char_indices().nth(4).map_or(head.len(), |(i, _)| i);
    let (year_str, model_code) = head.split_at(split);

    let year: i32 = year_str
        .parse()
        .map_err(|_| PhotoNameError::YearNotNumeric(year_str.to_string()))?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(PhotoNameError::YearOutOfRange(year));
    }

    let angle = angle.parse::<AngleCode>()?;

    Ok(ParsedPhotoName {
        year,
        model_code: model_code.to_string(),
        angle,
    })
}

/// Check a filename against the convention without failing.
pub fn validate_filename(name: &str) -> FilenameValidation {
    match parse_filename(name) {
        Ok(_) => FilenameValidation::ok(),
        Err(e) => FilenameValidation::failed(&e),
    }
}
