//! Import batch parsing and structural checks
//!
//! Runs before any transaction is opened. Unlike the business validators,
//! which stop at the first broken rule, these checks collect every violation
//! in the batch so the caller can fix them in one pass.

use crate::dto::ProductImportRecord;
use inventory_common::{Error, Result, Violation};
use serde_json::Value;

/// Where the batch came from; decides the field path of a whole-body parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchSource {
    Body,
    File,
}

impl BatchSource {
    fn field_path(&self) -> &'static str {
        match self {
            BatchSource::Body => "items",
            BatchSource::File => "file",
        }
    }
}

/// Parse a JSON array of import records
///
/// The array is read first and each element is decoded on its own, so an
/// element with e.g. an unknown unit of measure is reported against its index
/// while its neighbours are still checked.
pub fn parse_batch(bytes: &[u8], source: BatchSource) -> Result<Vec<ProductImportRecord>> {
    let elements: Vec<Value> = serde_json::from_slice(bytes).map_err(|e| {
        Error::Validation(vec![Violation::batch(
            source.field_path(),
            format!("Invalid JSON: {}", e),
        )])
    })?;

    let mut records = Vec::with_capacity(elements.len());
    let mut violations = Vec::new();
    for (i, element) in elements.into_iter().enumerate() {
        match serde_json::from_value::<ProductImportRecord>(element) {
            Ok(record) => records.push(record),
            Err(e) => violations.push(Violation::new(
                i as i64,
                format!("items[{}]", i),
                e.to_string(),
            )),
        }
    }

    if violations.is_empty() {
        Ok(records)
    } else {
        Err(Error::Validation(violations))
    }
}

struct Checker<'a> {
    index: i64,
    violations: &'a mut Vec<Violation>,
}

impl Checker<'_> {
    fn reject(&mut self, path: &str, message: &str) {
        self.violations.push(Violation::new(
            self.index,
            format!("items[{}].{}", self.index, path),
            message,
        ));
    }

    fn not_blank(&mut self, path: &str, value: Option<&str>) {
        if value.map_or(true, |v| v.trim().is_empty()) {
            self.reject(path, "must not be blank");
        }
    }

    fn not_null<T>(&mut self, path: &str, value: Option<&T>) {
        if value.is_none() {
            self.reject(path, "must not be null");
        }
    }

    fn positive_i64(&mut self, path: &str, value: Option<i64>) {
        if matches!(value, Some(v) if v <= 0) {
            self.reject(path, "must be greater than 0");
        }
    }

    fn positive_f64(&mut self, path: &str, value: Option<f64>) {
        if matches!(value, Some(v) if v <= 0.0 || v.is_nan()) {
            self.reject(path, "must be greater than 0");
        }
    }
}

/// Structural checks over every record; returns all violations found
pub fn precheck(records: &[ProductImportRecord]) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (i, record) in records.iter().enumerate() {
        let mut check = Checker {
            index: i as i64,
            violations: &mut violations,
        };

        check.not_blank("name", record.name.as_deref());
        check.not_null("coordinates", record.coordinates.as_ref());
        check.not_null("unitOfMeasure", record.unit_of_measure.as_ref());
        check.positive_i64("price", record.price);
        if matches!(record.manufacture_cost, Some(c) if c < 0) {
            check.reject("manufactureCost", "must be greater than or equal to 0");
        }
        check.positive_i64("rating", record.rating);
        check.not_blank("partNumber", record.part_number.as_deref());

        match &record.manufacturer {
            None => check.reject("manufacturer", "must not be null"),
            Some(m) => {
                check.not_blank("manufacturer.name", m.name.as_deref());
                check.positive_f64("manufacturer.annualTurnover", m.annual_turnover);
                check.positive_i64("manufacturer.employeesCount", m.employees_count);
                check.positive_i64("manufacturer.rating", m.rating);
                check.not_null("manufacturer.officialAddress", m.official_address.as_ref());
                check.not_null("manufacturer.postalAddress", m.postal_address.as_ref());
            }
        }

        if let Some(owner) = &record.owner {
            check.not_blank("owner.name", owner.name.as_deref());
            check.not_null("owner.nationality", owner.nationality.as_ref());
            check.not_null("owner.eyeColor", owner.eye_color.as_ref());
            check.not_null("owner.hairColor", owner.hair_color.as_ref());
            check.positive_f64("owner.height", owner.height);
        }
    }

    violations
}
