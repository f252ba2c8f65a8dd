//! The immutable rule set shared by every pipeline component.
//!
//! [`RuleSet::default`] carries the esophageal-cohort configuration. A TOML
//! file can override any subset of fields; unspecified fields keep their
//! defaults.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RuleSetError};

/// Inclusive-exclusive numeric bounds: values `<= min` or `> max` are out of range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// BMI category cutoffs and the label attached to each bucket.
///
/// Buckets are closed-open: a value equal to a cutoff belongs to the higher bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BmiRules {
    pub underweight: f64,
    pub normal: f64,
    pub overweight: f64,
    pub underweight_label: String,
    pub normal_label: String,
    pub overweight_label: String,
    pub obese_label: String,
}

impl Default for BmiRules {
    fn default() -> Self {
        Self {
            underweight: 18.0,
            normal: 25.0,
            overweight: 30.0,
            underweight_label: "Underweight".to_string(),
            normal_label: "Normal".to_string(),
            overweight_label: "Overweight".to_string(),
            obese_label: "Obese".to_string(),
        }
    }
}

/// One weekly-consumption bucket, inclusive of its upper bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlcoholBucket {
    pub upper: f64,
    pub label: String,
}

impl AlcoholBucket {
    pub fn new(upper: f64, label: impl Into<String>) -> Self {
        Self {
            upper,
            label: label.into(),
        }
    }
}

/// Alcohol-risk buckets over total drinks per week.
///
/// The first bucket starts at 0 inclusive; each later bucket covers
/// `(previous.upper, upper]`. Totals above the last bound get `above_label`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlcoholRules {
    pub above_label: String,
    pub buckets: Vec<AlcoholBucket>,
}

impl Default for AlcoholRules {
    fn default() -> Self {
        Self {
            above_label: "Very Heavy".to_string(),
            buckets: vec![
                AlcoholBucket::new(0.0, "None"),
                AlcoholBucket::new(7.0, "Light"),
                AlcoholBucket::new(14.0, "Moderate"),
                AlcoholBucket::new(35.0, "Heavy"),
            ],
        }
    }
}

/// Source and target column names used by feature derivation and domain rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureColumns {
    pub height: String,
    pub weight: String,
    pub bmi: String,
    pub bmi_category: String,
    pub alcohol_frequency: String,
    pub alcohol_amount_per_day: String,
    pub total_drinks_per_week: String,
    pub alcohol_risk_category: String,
}

impl Default for FeatureColumns {
    fn default() -> Self {
        Self {
            height: "height".to_string(),
            weight: "weight".to_string(),
            bmi: "bmi".to_string(),
            bmi_category: "bmi_category".to_string(),
            alcohol_frequency: "frequency_of_alcohol_consumption".to_string(),
            alcohol_amount_per_day: "amount_of_alcohol_consumption_per_day".to_string(),
            total_drinks_per_week: "total_drinks_per_week".to_string(),
            alcohol_risk_category: "alcohol_risk_category".to_string(),
        }
    }
}

/// Tokens used to build reject reasons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReasonLabels {
    /// Prefix placed before the comma-joined list of null required columns.
    pub missing_fields: String,
    pub invalid_height: String,
    pub invalid_weight: String,
    /// Used when a row is invalid but no specific token applies.
    pub fallback: String,
}

impl Default for ReasonLabels {
    fn default() -> Self {
        Self {
            missing_fields: "Missing fields: ".to_string(),
            invalid_height: "Invalid height value".to_string(),
            invalid_weight: "Invalid weight value".to_string(),
            fallback: "Failed validation".to_string(),
        }
    }
}

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleSet {
    /// Maximum tolerated percentage (0–100) of nulls in a column.
    pub null_threshold: f64,
    /// Artifact columns (row-index echoes) dropped during cleaning.
    pub placeholder_columns: Vec<String>,
    /// Columns coerced to numbers before feature derivation.
    pub numeric_columns: Vec<String>,
    /// Columns that must be non-null for a row to be accepted.
    pub required_columns: Vec<String>,
    /// Published accepted-row schema, in order. The first entry is the natural key.
    pub output_columns: Vec<String>,
    /// Column appended to rejected rows.
    pub reason_column: String,
    pub height: ValueRange,
    pub weight: ValueRange,
    pub bmi: BmiRules,
    pub alcohol: AlcoholRules,
    pub features: FeatureColumns,
    pub reasons: ReasonLabels,
    /// Applied by the orchestrator before projecting onto the published schemas.
    pub renames: BTreeMap<String, String>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            null_threshold: 70.0,
            placeholder_columns: strings(&["unnamed: 0", "index"]),
            numeric_columns: strings(&["height", "weight", "total_drinks_per_week", "bmi"]),
            required_columns: strings(&[
                "patient_barcode",
                "gender",
                "height",
                "weight",
                "race_list",
                "primary_pathology_age_at_initial_pathologic_diagnosis",
                "frequency_of_alcohol_consumption",
                "amount_of_alcohol_consumption_per_day",
                "tobacco_smoking_history",
                "reflux_history",
                "barretts_esophagus",
                "primary_pathology_histological_type",
                "person_neoplasm_cancer_status",
                "vital_status",
            ]),
            output_columns: strings(&[
                "patient_barcode",
                "gender",
                "height",
                "weight",
                "bmi",
                "bmi_category",
                "race",
                "total_drinks_per_week",
                "alcohol_risk_category",
                "smoking_history",
                "reflux_history",
                "barretts_esophagus",
                "age_at_diagnosis",
                "cancer_status",
                "vital_status",
                "pathology_histological_type",
            ]),
            reason_column: "reason".to_string(),
            height: ValueRange::new(0.0, 300.0),
            weight: ValueRange::new(0.0, 500.0),
            bmi: BmiRules::default(),
            alcohol: AlcoholRules::default(),
            features: FeatureColumns::default(),
            reasons: ReasonLabels::default(),
            renames: [
                ("race_list", "race"),
                ("person_neoplasm_cancer_status", "cancer_status"),
                ("tobacco_smoking_history", "smoking_history"),
                (
                    "primary_pathology_histological_type",
                    "pathology_histological_type",
                ),
                (
                    "primary_pathology_age_at_initial_pathologic_diagnosis",
                    "age_at_diagnosis",
                ),
            ]
            .into_iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect(),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

impl RuleSet {
    /// Parse a rule set from TOML, filling unspecified fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or the resulting rules are invalid.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let rules: Self = toml::from_str(source)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Load and check a rule set from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not describe valid rules.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| RuleSetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Render the effective rule set as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Published rejected-row schema: the output columns followed by the reason column.
    pub fn reject_columns(&self) -> Vec<String> {
        let mut columns = self.output_columns.clone();
        columns.push(self.reason_column.clone());
        columns
    }

    /// Natural key the loader upserts on.
    pub fn natural_key(&self) -> Option<&str> {
        self.output_columns.first().map(String::as_str)
    }

    /// Check that the rules are internally consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RuleSetError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !self.null_threshold.is_finite() || !(0.0..=100.0).contains(&self.null_threshold) {
            return Err(RuleSetError::invalid(
                "null_threshold",
                format!("{} is not a percentage between 0 and 100", self.null_threshold),
            ));
        }
        check_range("height", self.height)?;
        check_range("weight", self.weight)?;

        let cutoffs = [self.bmi.underweight, self.bmi.normal, self.bmi.overweight];
        if cutoffs.iter().any(|v| !v.is_finite()) || !is_strictly_ascending(&cutoffs) {
            return Err(RuleSetError::invalid(
                "bmi",
                "cutoffs must be finite and strictly ascending (underweight < normal < overweight)",
            ));
        }

        let bounds: Vec<f64> = self.alcohol.buckets.iter().map(|b| b.upper).collect();
        match bounds.first() {
            None => {
                return Err(RuleSetError::invalid(
                    "alcohol.buckets",
                    "at least one bucket is required",
                ));
            }
            Some(first) if *first < 0.0 => {
                return Err(RuleSetError::invalid(
                    "alcohol.buckets",
                    "the first bucket bound must not be negative",
                ));
            }
            Some(_) => {}
        }
        if bounds.iter().any(|v| !v.is_finite()) || !is_strictly_ascending(&bounds) {
            return Err(RuleSetError::invalid(
                "alcohol.buckets",
                "bucket bounds must be finite and strictly ascending",
            ));
        }

        if self.output_columns.is_empty() {
            return Err(RuleSetError::invalid(
                "output_columns",
                "the published schema needs at least one column",
            ));
        }
        if self.reason_column.trim().is_empty() {
            return Err(RuleSetError::invalid("reason_column", "must not be empty"));
        }
        if self.output_columns.contains(&self.reason_column) {
            return Err(RuleSetError::invalid(
                "output_columns",
                format!("must not contain the reason column `{}`", self.reason_column),
            ));
        }
        let mut seen = BTreeSet::new();
        for column in &self.output_columns {
            if !seen.insert(column.as_str()) {
                return Err(RuleSetError::invalid(
                    "output_columns",
                    format!("`{column}` is listed more than once"),
                ));
            }
        }
        Ok(())
    }
}

fn check_range(field: &'static str, range: ValueRange) -> Result<()> {
    if !range.min.is_finite() || !range.max.is_finite() || range.min >= range.max {
        return Err(RuleSetError::invalid(
            field,
            format!("min ({}) must be below max ({})", range.min, range.max),
        ));
    }
    Ok(())
}

fn is_strictly_ascending(values: &[f64]) -> bool {
    values.windows(2).all(|pair| pair[0] < pair[1])
}
