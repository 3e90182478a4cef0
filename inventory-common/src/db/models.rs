//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when free text does not name a variant of a closed set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Declares a closed enumeration stored and transmitted by its upper-case name
///
/// Parsing trims and upper-cases the input before matching, so `" kilograms"`
/// reads as `KILOGRAMS`; anything else is rejected.
macro_rules! closed_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_uppercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownVariant { kind: $kind, value: s.to_string() }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for &'static str {
            fn from(value: $name) -> Self {
                value.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

closed_enum!(
    /// Unit a product is sold in
    UnitOfMeasure, "unit of measure", {
        Pieces => "PIECES",
        Kilograms => "KILOGRAMS",
        Liters => "LITERS",
        Meters => "METERS",
        Boxes => "BOXES",
        Sets => "SETS",
        Packages => "PACKAGES",
    }
);

closed_enum!(
    /// Eye and hair color palette
    Color, "color", {
        Green => "GREEN",
        Red => "RED",
        Blue => "BLUE",
        Yellow => "YELLOW",
        Orange => "ORANGE",
        White => "WHITE",
        Brown => "BROWN",
        Black => "BLACK",
    }
);

closed_enum!(
    Country, "country", {
        Russia => "RUSSIA",
        UnitedKingdom => "UNITED_KINGDOM",
        China => "CHINA",
        Usa => "USA",
        Germany => "GERMANY",
        France => "FRANCE",
        Japan => "JAPAN",
        SouthKorea => "SOUTH_KOREA",
        India => "INDIA",
        Brazil => "BRAZIL",
    }
);

closed_enum!(
    /// Outcome of one import attempt
    ImportStatus, "import status", {
        Success => "SUCCESS",
        Failed => "FAILED",
    }
);

/// Named point with integer coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: i64,
    pub y: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub zip_code: String,
    pub town: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub full_name: Option<String>,
    pub annual_turnover: f64,
    pub employees_count: i64,
    pub rating: i64,
    pub official_address: Address,
    pub postal_address: Address,
    pub created_at: DateTime<Utc>,
}

/// Validated organization not yet persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrganization {
    pub name: String,
    pub full_name: Option<String>,
    pub annual_turnover: f64,
    pub employees_count: i64,
    pub rating: i64,
    pub official_address: Address,
    pub postal_address: Address,
}

impl NewOrganization {
    /// The persisted form, once the store has assigned `id`
    pub fn into_organization(self, id: i64, created_at: DateTime<Utc>) -> Organization {
        Organization {
            id,
            name: self.name,
            full_name: self.full_name,
            annual_turnover: self.annual_turnover,
            employees_count: self.employees_count,
            rating: self.rating,
            official_address: self.official_address,
            postal_address: self.postal_address,
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub eye_color: Option<Color>,
    pub hair_color: Option<Color>,
    pub nationality: Country,
    pub height: f64,
    pub location: Option<Location>,
}

/// Validated person not yet persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewPerson {
    pub name: String,
    pub eye_color: Option<Color>,
    pub hair_color: Option<Color>,
    pub nationality: Country,
    pub height: f64,
    pub location: Option<Location>,
}

impl NewPerson {
    pub fn into_person(self, id: i64) -> Person {
        Person {
            id,
            name: self.name,
            eye_color: self.eye_color,
            hair_color: self.hair_color,
            nationality: self.nationality,
            height: self.height,
            location: self.location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub coordinates: Coordinates,
    pub creation_date: DateTime<Utc>,
    pub unit_of_measure: UnitOfMeasure,
    pub manufacturer_id: i64,
    pub price: i64,
    pub manufacture_cost: Option<i64>,
    pub rating: i64,
    pub part_number: String,
    pub owner_id: Option<i64>,
}

/// Validated product not yet persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub coordinates: Coordinates,
    pub unit_of_measure: UnitOfMeasure,
    pub manufacturer_id: i64,
    pub price: i64,
    pub manufacture_cost: Option<i64>,
    pub rating: i64,
    pub part_number: String,
    pub owner_id: Option<i64>,
}

/// Audit record of one bulk import attempt, written once and never updated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOperation {
    pub id: i64,
    pub status: ImportStatus,
    pub created_count: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
