//! Derived clinical features.
//!
//! Each derivation checks for its source columns first. BMI falls back to an
//! all-null column when height or weight is absent; the alcohol fields are
//! only added when both alcohol sources exist.

use polars::prelude::{DataFrame, NamedFrom, Series};
use tracing::{debug, warn};

use hdq_common::{ColumnSet, column_f64_values};
use hdq_model::{AlcoholRules, BmiRules, RuleSet};

use crate::error::Result;

/// Add `bmi`, `bmi_category` and, when possible, the alcohol fields.
///
/// # Errors
///
/// Returns a Polars error if a derived column cannot be attached.
pub fn derive_features(df: &DataFrame, rules: &RuleSet) -> Result<DataFrame> {
    let mut table = df.clone();
    add_bmi(&mut table, rules)?;
    add_bmi_category(&mut table, rules)?;
    add_alcohol_features(&mut table, rules)?;
    Ok(table)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Compute `weight / (height / 100)^2` rounded to two decimals.
///
/// Rows with a missing height or weight, or a height that is not positive,
/// get a null BMI.
pub fn add_bmi(df: &mut DataFrame, rules: &RuleSet) -> Result<()> {
    let names = &rules.features;
    let height = column_f64_values(df, &names.height);
    let weight = column_f64_values(df, &names.weight);

    let values: Vec<Option<f64>> = match (height, weight) {
        (Some(height), Some(weight)) => height
            .into_iter()
            .zip(weight)
            .map(|pair| match pair {
                (Some(h), Some(w)) if h > 0.0 => {
                    let meters = h / 100.0;
                    Some(round2(w / (meters * meters))).filter(|v| v.is_finite())
                }
                _ => None,
            })
            .collect(),
        _ => {
            warn!(
                height = %names.height,
                weight = %names.weight,
                "height or weight column missing, bmi left empty"
            );
            vec![None; df.height()]
        }
    };
    df.with_column(Series::new(names.bmi.as_str().into(), values))?;
    Ok(())
}

/// Bucket a BMI value. Cutoffs belong to the higher bucket.
pub fn bmi_category(bmi: f64, rules: &BmiRules) -> &str {
    if bmi < rules.underweight {
        &rules.underweight_label
    } else if bmi < rules.normal {
        &rules.normal_label
    } else if bmi < rules.overweight {
        &rules.overweight_label
    } else {
        &rules.obese_label
    }
}

/// Label each row's BMI. A null BMI gets a null category.
pub fn add_bmi_category(df: &mut DataFrame, rules: &RuleSet) -> Result<()> {
    let names = &rules.features;
    let values: Vec<Option<&str>> = match column_f64_values(df, &names.bmi) {
        Some(bmi) => bmi
            .into_iter()
            .map(|value| value.map(|v| bmi_category(v, &rules.bmi)))
            .collect(),
        None => vec![None; df.height()],
    };
    df.with_column(Series::new(names.bmi_category.as_str().into(), values))?;
    Ok(())
}

/// Bucket a weekly drink total.
///
/// The first bucket whose upper bound is at least `total` wins. Totals above
/// every bound get the above-label; negative and `NaN` totals have no bucket.
pub fn alcohol_risk(total: f64, rules: &AlcoholRules) -> Option<&str> {
    if total.is_nan() || total < 0.0 {
        return None;
    }
    let label = rules
        .buckets
        .iter()
        .find(|bucket| total <= bucket.upper)
        .map_or(rules.above_label.as_str(), |bucket| bucket.label.as_str());
    Some(label)
}

/// Add `total_drinks_per_week` (frequency times amount per day) and its risk label.
///
/// Nothing is added unless both source columns exist.
pub fn add_alcohol_features(df: &mut DataFrame, rules: &RuleSet) -> Result<()> {
    let names = &rules.features;
    let columns = ColumnSet::from_frame(df);
    if !columns.contains(&names.alcohol_frequency) || !columns.contains(&names.alcohol_amount_per_day)
    {
        debug!("alcohol source columns missing, alcohol features skipped");
        return Ok(());
    }
    let (Some(frequency), Some(amount)) = (
        column_f64_values(df, &names.alcohol_frequency),
        column_f64_values(df, &names.alcohol_amount_per_day),
    ) else {
        return Ok(());
    };

    let totals: Vec<Option<f64>> = frequency
        .into_iter()
        .zip(amount)
        .map(|(f, a)| Some(f? * a?).filter(|v| !v.is_nan()))
        .collect();
    let categories: Vec<Option<&str>> = totals
        .iter()
        .map(|total| total.and_then(|t| alcohol_risk(t, &rules.alcohol)))
        .collect();

    df.with_column(Series::new(names.total_drinks_per_week.as_str().into(), totals))?;
    df.with_column(Series::new(
        names.alcohol_risk_category.as_str().into(),
        categories,
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_is_half_to_even_on_scaled_value() {
        assert_eq!(round2(24.691_358), 24.69);
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(25.0), 25.0);
    }

    #[test]
    fn bmi_cutoffs_belong_to_higher_bucket() {
        let rules = BmiRules::default();
        assert_eq!(bmi_category(17.99, &rules), "Underweight");
        assert_eq!(bmi_category(18.0, &rules), "Normal");
        assert_eq!(bmi_category(25.0, &rules), "Overweight");
        assert_eq!(bmi_category(30.0, &rules), "Obese");
    }

    #[test]
    fn alcohol_buckets_are_upper_inclusive() {
        let rules = AlcoholRules::default();
        assert_eq!(alcohol_risk(0.0, &rules), Some("None"));
        assert_eq!(alcohol_risk(0.5, &rules), Some("Light"));
        assert_eq!(alcohol_risk(7.0, &rules), Some("Light"));
        assert_eq!(alcohol_risk(8.0, &rules), Some("Moderate"));
        assert_eq!(alcohol_risk(14.0, &rules), Some("Moderate"));
        assert_eq!(alcohol_risk(35.0, &rules), Some("Heavy"));
        assert_eq!(alcohol_risk(35.5, &rules), Some("Very Heavy"));
        assert_eq!(alcohol_risk(-1.0, &rules), None);
        assert_eq!(alcohol_risk(f64::NAN, &rules), None);
    }
}
