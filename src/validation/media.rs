//! Rules for `create_media`.

use super::pipeline::Pipeline;
use super::rules::{
    bound_pair, duplicates, is_compound_id, keys_outside, strictly_ordered, Entries,
};
use crate::error::Result;
use crate::external::CompoundLookup;
use crate::store::MediaEntry;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;

/// Uptake rate applied to compounds without custom bounds.
pub const DEFAULT_UPTAKE: f64 = 100.0;

/// Secretion capacity applied to compounds without custom bounds.
pub const DEFAULT_UPPER_BOUND: f64 = 100.0;

fn default_uptake() -> f64 {
    DEFAULT_UPTAKE
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaInput {
    /// Compound ids in the order they should appear in the medium.
    #[serde(default)]
    pub compounds: Vec<String>,
    /// Default lower bound is `-default_uptake`.
    #[serde(default = "default_uptake")]
    pub default_uptake: f64,
    /// Compound id to `[lower, upper]`. Left untyped so shape errors are
    /// reported as violations instead of a deserialization failure.
    #[serde(default)]
    pub custom_bounds: Entries<Value>,
    #[serde(default)]
    pub media_name: Option<String>,
}

pub fn media_rules(lookup: &dyn CompoundLookup) -> Pipeline<'_, MediaInput> {
    Pipeline::new("create_media")
        .rule("compounds.non_empty", |input: &MediaInput, report| {
            if input.compounds.is_empty() {
                report.violation("compounds must contain at least one compound id");
            }
        })
        .rule("compounds.format", |input: &MediaInput, report| {
            for id in input.compounds.iter().filter(|id| !is_compound_id(id)) {
                report.violation_with(
                    format!("'{}' is not a compound id (expected e.g. cpd00027)", id),
                    id.as_str(),
                );
            }
        })
        .rule("compounds.known", move |input: &MediaInput, report| {
            // Malformed ids are already reported by compounds.format.
            for id in input
                .compounds
                .iter()
                .filter(|id| is_compound_id(id) && !lookup.exists(id))
            {
                report.violation_with(
                    format!("compound '{}' is not in the compound database", id),
                    id.as_str(),
                );
            }
        })
        .rule("compounds.unique", |input: &MediaInput, report| {
            for id in duplicates(input.compounds.iter().map(String::as_str)) {
                report.violation_with(format!("compound '{}' is listed more than once", id), id);
            }
        })
        .rule("default_uptake.positive", |input: &MediaInput, report| {
            let uptake = input.default_uptake;
            if !(uptake.is_finite() && uptake > 0.0) {
                report.violation_with(
                    format!("default_uptake must be a positive number, got {}", uptake),
                    json!(uptake),
                );
            }
        })
        .rule("custom_bounds.keys", |input: &MediaInput, report| {
            let listed: HashSet<&str> = input.compounds.iter().map(String::as_str).collect();
            for key in keys_outside(input.custom_bounds.keys(), &listed) {
                report.violation_with(
                    format!("custom bounds given for '{}', which is not in compounds", key),
                    key,
                );
            }
        })
        .rule("custom_bounds.unique", |input: &MediaInput, report| {
            for id in duplicates(input.custom_bounds.keys()) {
                report.violation_with(format!("custom bounds for '{}' given more than once", id), id);
            }
        })
        .rule("custom_bounds.shape", |input: &MediaInput, report| {
            for (id, value) in input.custom_bounds.iter() {
                if bound_pair(value).is_none() {
                    report.violation_with(
                        format!("bounds for '{}' must be a [lower, upper] pair of numbers", id),
                        json!({ id: value }),
                    );
                }
            }
        })
        .rule("custom_bounds.order", |input: &MediaInput, report| {
            // Only well-shaped pairs; malformed ones belong to custom_bounds.shape.
            for (id, value) in input.custom_bounds.iter() {
                if let Some((lower, upper)) = bound_pair(value) {
                    if !strictly_ordered(lower, upper) {
                        report.violation_with(
                            format!(
                                "compound {}: lower bound ({}) must be less than upper bound ({})",
                                id, lower, upper
                            ),
                            json!({ id: [lower, upper] }),
                        );
                    }
                }
            }
        })
}

/// Validate the input and resolve every compound to its bounds.
pub fn validate_media(input: &MediaInput, lookup: &dyn CompoundLookup) -> Result<Vec<MediaEntry>> {
    media_rules(lookup).evaluate(input).into_result()?;

    let entries = input
        .compounds
        .iter()
        .map(|id| {
            let (lower, upper) = input
                .custom_bounds
                .get(id)
                .and_then(bound_pair)
                .unwrap_or((-input.default_uptake, DEFAULT_UPPER_BOUND));
            MediaEntry::new(id.clone(), lower, upper)
        })
        .collect();

    Ok(entries)
}
