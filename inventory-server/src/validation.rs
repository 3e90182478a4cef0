//! Business rule validation
//!
//! Each validator stops at the first broken rule and reports it as
//! [`Error::InvalidInput`] with a dotted field path. `prefix` is prepended to
//! every path so the same rules serve top-level bodies (`""`) and nested import
//! fragments (`"manufacturer."`, `"owner."`, `"product."`).

use crate::dto::{AddressInput, CoordinatesInput, LocationInput, OrganizationInput, PersonInput};
use inventory_common::db::{
    Address, Coordinates, Location, NewOrganization, NewPerson, NewProduct, UnitOfMeasure,
};
use inventory_common::{Error, Result};

pub const MAX_X: f64 = 450.0;
pub const MIN_Y_EXCLUSIVE: f64 = -422.0;

/// Product fields after manufacturer and owner have been resolved to ids
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductDraft<'a> {
    pub name: Option<&'a str>,
    pub coordinates: Option<&'a CoordinatesInput>,
    pub unit_of_measure: Option<UnitOfMeasure>,
    pub manufacturer_id: Option<i64>,
    pub price: Option<i64>,
    pub manufacture_cost: Option<i64>,
    pub rating: Option<i64>,
    pub part_number: Option<&'a str>,
    pub owner_id: Option<i64>,
}

fn rule(prefix: &str, field: &str, requirement: &str) -> Error {
    let path = format!("{}{}", prefix, field);
    let message = format!("{} {}", path, requirement);
    Error::invalid(path, message)
}

/// Trimmed text, or `None` when absent or blank
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn require_text(value: Option<&str>, prefix: &str, field: &str) -> Result<String> {
    non_blank(value)
        .map(str::to_string)
        .ok_or_else(|| rule(prefix, field, "required"))
}

fn require_positive_i64(value: Option<i64>, prefix: &str, field: &str) -> Result<i64> {
    match value {
        Some(v) if v > 0 => Ok(v),
        _ => Err(rule(prefix, field, "> 0 required")),
    }
}

fn require_positive_f64(value: Option<f64>, prefix: &str, field: &str) -> Result<f64> {
    match value {
        Some(v) if v > 0.0 && v.is_finite() => Ok(v),
        _ => Err(rule(prefix, field, "> 0 required")),
    }
}

fn require_address(address: Option<&AddressInput>, prefix: &str, field: &str) -> Result<Address> {
    let address = address.ok_or_else(|| rule(prefix, field, "required"))?;
    let zip_code = require_text(
        address.zip_code.as_deref(),
        prefix,
        &format!("{}.zipCode", field),
    )?;

    let town = address
        .town
        .as_ref()
        .and_then(|t| {
            let name = non_blank(t.name.as_deref())?;
            Some(Location {
                x: t.x?,
                y: t.y?,
                name: name.to_string(),
            })
        })
        .ok_or_else(|| rule(prefix, &format!("{}.town", field), "x,y,name required"))?;

    Ok(Address { zip_code, town })
}

fn optional_location(location: Option<&LocationInput>, prefix: &str) -> Result<Option<Location>> {
    let Some(location) = location else {
        return Ok(None);
    };
    let (Some(x), Some(y)) = (location.x, location.y) else {
        return Err(rule(prefix, "location", "x,y required if present"));
    };
    let name = require_text(location.name.as_deref(), prefix, "location.name")?;
    Ok(Some(Location { x, y, name }))
}

pub fn validate_organization(input: &OrganizationInput, prefix: &str) -> Result<NewOrganization> {
    let name = require_text(input.name.as_deref(), prefix, "name")?;
    let annual_turnover = require_positive_f64(input.annual_turnover, prefix, "annualTurnover")?;
    let employees_count = require_positive_i64(input.employees_count, prefix, "employeesCount")?;
    let rating = require_positive_i64(input.rating, prefix, "rating")?;
    let official_address =
        require_address(input.official_address.as_ref(), prefix, "officialAddress")?;
    let postal_address = require_address(input.postal_address.as_ref(), prefix, "postalAddress")?;

    Ok(NewOrganization {
        name,
        full_name: non_blank(input.full_name.as_deref()).map(str::to_string),
        annual_turnover,
        employees_count,
        rating,
        official_address,
        postal_address,
    })
}

pub fn validate_person(input: &PersonInput, prefix: &str) -> Result<NewPerson> {
    let name = require_text(input.name.as_deref(), prefix, "name")?;
    let height = require_positive_f64(input.height, prefix, "height")?;
    let nationality = input
        .nationality
        .ok_or_else(|| rule(prefix, "nationality", "required"))?;
    let location = optional_location(input.location.as_ref(), prefix)?;

    Ok(NewPerson {
        name,
        eye_color: input.eye_color,
        hair_color: input.hair_color,
        nationality,
        height,
        location,
    })
}

/// Product rules
///
/// Coordinate bounds are exact: x = 450 passes, y = -422 fails.
pub fn validate_product(draft: ProductDraft<'_>, prefix: &str) -> Result<NewProduct> {
    let name = require_text(draft.name, prefix, "name")?;

    let coordinates = draft
        .coordinates
        .ok_or_else(|| rule(prefix, "coordinates", "required"))?;
    let x = coordinates
        .x
        .ok_or_else(|| rule(prefix, "coordinates.x", "required"))?;
    if !x.is_finite() || x > MAX_X {
        return Err(rule(prefix, "coordinates.x", "must be <= 450"));
    }
    let y = coordinates
        .y
        .ok_or_else(|| rule(prefix, "coordinates.y", "required"))?;
    if !y.is_finite() || y <= MIN_Y_EXCLUSIVE {
        return Err(rule(prefix, "coordinates.y", "must be > -422"));
    }

    let unit_of_measure = draft
        .unit_of_measure
        .ok_or_else(|| rule(prefix, "unitOfMeasure", "required"))?;
    let manufacturer_id = draft
        .manufacturer_id
        .ok_or_else(|| rule(prefix, "manufacturer", "required"))?;
    let price = require_positive_i64(draft.price, prefix, "price")?;
    if let Some(cost) = draft.manufacture_cost {
        if cost < 0 {
            return Err(rule(prefix, "manufactureCost", ">= 0 required"));
        }
    }
    let rating = require_positive_i64(draft.rating, prefix, "rating")?;
    let part_number = require_text(draft.part_number, prefix, "partNumber")?;

    Ok(NewProduct {
        name,
        coordinates: Coordinates { x, y },
        unit_of_measure,
        manufacturer_id,
        price,
        manufacture_cost: draft.manufacture_cost,
        rating,
        part_number,
        owner_id: draft.owner_id,
    })
}
