//! Tests for rule set defaults, TOML overrides and consistency checks.

use std::io::Write;

use hdq_model::{AlcoholBucket, RuleSet, RuleSetError, ValueRange};

#[test]
fn default_rules_are_valid() {
    let rules = RuleSet::default();
    rules.validate().expect("default rules validate");
    assert_eq!(rules.null_threshold, 70.0);
    assert_eq!(rules.required_columns.len(), 14);
    assert_eq!(rules.height, ValueRange::new(0.0, 300.0));
    assert_eq!(rules.weight, ValueRange::new(0.0, 500.0));
    assert_eq!(rules.natural_key(), Some("patient_barcode"));
}

#[test]
fn reject_columns_append_reason() {
    let rules = RuleSet::default();
    let reject = rules.reject_columns();
    assert_eq!(reject.len(), rules.output_columns.len() + 1);
    assert_eq!(reject.last().map(String::as_str), Some("reason"));
    assert_eq!(&reject[..rules.output_columns.len()], &rules.output_columns[..]);
}

#[test]
fn partial_toml_keeps_defaults() {
    let rules = RuleSet::from_toml_str(
        r#"
null_threshold = 50.0
required_columns = ["patient_barcode", "gender"]

[height]
min = 50.0
max = 250.0
"#,
    )
    .expect("parse partial rules");

    assert_eq!(rules.null_threshold, 50.0);
    assert_eq!(rules.required_columns, vec!["patient_barcode", "gender"]);
    assert_eq!(rules.height, ValueRange::new(50.0, 250.0));
    assert_eq!(rules.weight, RuleSet::default().weight);
    assert_eq!(rules.bmi, RuleSet::default().bmi);
    assert_eq!(rules.renames, RuleSet::default().renames);
}

#[test]
fn nested_tables_override_individual_fields() {
    let rules = RuleSet::from_toml_str(
        r#"
[bmi]
obese_label = "Obesity"

[reasons]
fallback = "Rejected"
"#,
    )
    .expect("parse nested overrides");

    assert_eq!(rules.bmi.obese_label, "Obesity");
    assert_eq!(rules.bmi.normal, 25.0);
    assert_eq!(rules.reasons.fallback, "Rejected");
    assert_eq!(rules.reasons.invalid_height, "Invalid height value");
}

#[test]
fn effective_rules_render_and_parse_back() {
    let rules = RuleSet::default();
    let rendered = rules.to_toml_string().expect("render rules");
    assert!(rendered.contains("null_threshold = 70.0"));
    let parsed = RuleSet::from_toml_str(&rendered).expect("parse rendered rules");
    assert_eq!(parsed, rules);
}

#[test]
fn unknown_fields_are_rejected() {
    let result = RuleSet::from_toml_str("null_treshold = 10.0\n");
    assert!(matches!(result, Err(RuleSetError::Parse(_))));
}

#[test]
fn inverted_range_is_invalid() {
    let rules = RuleSet {
        height: ValueRange::new(300.0, 0.0),
        ..RuleSet::default()
    };
    let err = rules.validate().unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"invalid rule `height`: min (300) must be below max (0)");
}

#[test]
fn threshold_must_be_a_percentage() {
    let rules = RuleSet {
        null_threshold: 120.0,
        ..RuleSet::default()
    };
    assert!(matches!(
        rules.validate(),
        Err(RuleSetError::Invalid {
            field: "null_threshold",
            ..
        })
    ));
}

#[test]
fn bmi_cutoffs_must_ascend() {
    let mut rules = RuleSet::default();
    rules.bmi.normal = 31.0;
    assert!(matches!(
        rules.validate(),
        Err(RuleSetError::Invalid { field: "bmi", .. })
    ));
}

#[test]
fn alcohol_buckets_must_ascend_from_zero() {
    let mut rules = RuleSet::default();
    rules.alcohol.buckets = vec![AlcoholBucket::new(7.0, "Light"), AlcoholBucket::new(7.0, "Also")];
    assert!(rules.validate().is_err());

    rules.alcohol.buckets = vec![AlcoholBucket::new(-1.0, "Negative")];
    assert!(rules.validate().is_err());

    rules.alcohol.buckets.clear();
    assert!(rules.validate().is_err());
}

#[test]
fn output_columns_may_not_hold_reason_or_duplicates() {
    let mut rules = RuleSet::default();
    rules.output_columns.push("reason".to_string());
    assert!(rules.validate().is_err());

    let mut rules = RuleSet::default();
    rules.output_columns.push("gender".to_string());
    assert!(rules.validate().is_err());
}

#[test]
fn load_reads_file_and_reports_missing_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "null_threshold = 40.0").expect("write rules");
    let rules = RuleSet::load(file.path()).expect("load rules");
    assert_eq!(rules.null_threshold, 40.0);

    let missing = file.path().with_extension("missing");
    assert!(matches!(
        RuleSet::load(&missing),
        Err(RuleSetError::Io { .. })
    ));
}
