//! Request bodies
//!
//! Every field is optional at the wire level so a missing value reaches the
//! validator (which names the offending field) instead of failing
//! deserialization. Enumerations are the exception: an unknown name fails
//! parsing outright.

use inventory_common::db::{Color, Country, UnitOfMeasure};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInput {
    pub x: Option<i64>,
    pub y: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub zip_code: Option<String>,
    pub town: Option<LocationInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoordinatesInput {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// Organization fields, used both for CRUD bodies and nested in import records
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationInput {
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub annual_turnover: Option<f64>,
    pub employees_count: Option<i64>,
    pub rating: Option<i64>,
    pub official_address: Option<AddressInput>,
    pub postal_address: Option<AddressInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonInput {
    pub name: Option<String>,
    pub eye_color: Option<Color>,
    pub hair_color: Option<Color>,
    pub nationality: Option<Country>,
    pub height: Option<f64>,
    pub location: Option<LocationInput>,
}

/// Reference to an existing row by id
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct IdRef {
    pub id: Option<i64>,
}

/// Product create/update body; manufacturer and owner refer to existing rows
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: Option<String>,
    pub coordinates: Option<CoordinatesInput>,
    pub unit_of_measure: Option<UnitOfMeasure>,
    pub manufacturer: Option<IdRef>,
    pub price: Option<i64>,
    pub manufacture_cost: Option<i64>,
    pub rating: Option<i64>,
    pub part_number: Option<String>,
    pub owner: Option<IdRef>,
}

/// One element of a bulk import batch
///
/// Manufacturer and owner are given by value and matched to existing rows by
/// business key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImportRecord {
    pub name: Option<String>,
    pub coordinates: Option<CoordinatesInput>,
    pub unit_of_measure: Option<UnitOfMeasure>,
    pub manufacturer: Option<OrganizationInput>,
    pub price: Option<i64>,
    pub manufacture_cost: Option<i64>,
    pub rating: Option<i64>,
    pub part_number: Option<String>,
    pub owner: Option<PersonInput>,
}
