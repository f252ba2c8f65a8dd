//! Integration tests for the pipeline module.

use std::collections::BTreeMap;
use std::fs;

use polars::prelude::{Column, DataFrame, IntoColumn, NamedFrom, Series};
use tempfile::TempDir;

use hdq_cli::pipeline::{PipelineOptions, align_output, run_pipeline, write_csv};
use hdq_model::RuleSet;

fn test_df(columns: Vec<(&str, Vec<&str>)>) -> DataFrame {
    let cols: Vec<Column> = columns
        .into_iter()
        .map(|(name, values)| {
            Series::new(
                name.into(),
                values.iter().copied().map(String::from).collect::<Vec<_>>(),
            )
            .into_column()
        })
        .collect();
    DataFrame::new(cols).unwrap()
}

fn names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

const SOURCE_CSV: &str = "\
Unnamed: 0,patient_barcode,Gender,height,weight,race_list,primary_pathology_age_at_initial_pathologic_diagnosis,frequency_of_alcohol_consumption,amount_of_alcohol_consumption_per_day,tobacco_smoking_history,reflux_history,barretts_esophagus,primary_pathology_histological_type,person_neoplasm_cancer_status,vital_status,comments
0,TCGA-01,MALE,180,80,WHITE,61,2,3,smoker,yes,no,adenocarcinoma,tumor free,alive,
1,TCGA-02,female,0,60,asian,55,1,8,never,no,no,squamous,with tumor,dead,
2,TCGA-03,,170,70,white,70,0,0,never,no,no,squamous,tumor free,alive,
3,TCGA-01,male,180,80,white,61,2,3,smoker,yes,no,adenocarcinoma,tumor free,alive,
";

fn read_records(path: &std::path::Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|record| record.unwrap().iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}

#[test]
fn test_align_output_renames_and_projects() {
    let df = test_df(vec![
        ("extra", vec!["x"]),
        ("race_list", vec!["white"]),
        ("patient_barcode", vec!["tcga-01"]),
    ]);
    let renames: BTreeMap<String, String> =
        [("race_list".to_string(), "race".to_string())].into_iter().collect();
    let columns = vec![
        "patient_barcode".to_string(),
        "race".to_string(),
        "vital_status".to_string(),
    ];

    let aligned = align_output(&df, &renames, &columns).unwrap();

    assert_eq!(names(&aligned.frame), columns);
    assert_eq!(aligned.missing, vec!["vital_status".to_string()]);
    assert_eq!(aligned.frame.column("vital_status").unwrap().null_count(), 1);
    assert_eq!(
        aligned.frame.column("race").unwrap().str().unwrap().get(0),
        Some("white")
    );
}

#[test]
fn test_align_output_first_source_wins() {
    let df = test_df(vec![("race_list", vec!["white"]), ("race", vec!["asian"])]);
    let renames: BTreeMap<String, String> =
        [("race_list".to_string(), "race".to_string())].into_iter().collect();

    let aligned = align_output(&df, &renames, &["race".to_string()]).unwrap();

    assert_eq!(
        aligned.frame.column("race").unwrap().str().unwrap().get(0),
        Some("white")
    );
}

#[test]
fn test_write_csv_header_only_for_empty_table() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.csv");
    let df = test_df(vec![("patient_barcode", vec![]), ("reason", vec![])]);

    write_csv(&df, &path).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "patient_barcode,reason\n");
}

#[test]
fn test_write_csv_formats_nulls_and_numbers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("values.csv");
    let df = DataFrame::new(vec![
        Series::new("height".into(), vec![Some(180.0f64), None]).into(),
        Series::new("bmi".into(), vec![Some(24.69f64), Some(25.0)]).into(),
        Series::new("reason".into(), vec!["Missing fields: gender, race_list", "ok"]).into(),
    ])
    .unwrap();

    write_csv(&df, &path).unwrap();

    insta::assert_snapshot!(fs::read_to_string(&path).unwrap(), @r#"
    height,bmi,reason
    180,24.69,"Missing fields: gender, race_list"
    ,25,ok
    "#);
}

#[test]
fn test_run_pipeline_end_to_end() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("Esophageal_Dataset.csv");
    fs::write(&input, SOURCE_CSV).unwrap();
    let options = PipelineOptions {
        input: input.clone(),
        output_dir: dir.path().join("output"),
        audit_path: Some(dir.path().join("logs").join("rejects.json")),
        dry_run: false,
    };
    let rules = RuleSet::default();

    let result = run_pipeline(&options, &rules).unwrap();

    assert_eq!(result.shapes[0].rows, 4);
    assert_eq!(result.shapes[1].rows, 3);
    assert_eq!(result.accepted_rows, 1);
    assert_eq!(result.rejected_rows, 2);
    assert_eq!(result.reason_counts.get("Invalid height value"), Some(&1));
    assert_eq!(result.reason_counts.get("Missing fields: gender"), Some(&1));
    assert!(result.missing_columns.is_empty());
    assert_eq!(result.natural_key.as_deref(), Some("patient_barcode"));
    assert!(result.audit_path.is_some());

    let (header, rows) = read_records(&options.output_dir.join("accepted.csv"));
    assert_eq!(header, rules.output_columns);
    assert_eq!(
        rows,
        vec![
            "tcga-01,male,180,80,24.69,Normal,white,6,Light,smoker,yes,no,61,tumor free,alive,adenocarcinoma"
                .split(',')
                .map(str::to_string)
                .collect::<Vec<_>>()
        ]
    );

    let (header, rows) = read_records(&options.output_dir.join("rejected.csv"));
    assert_eq!(header, rules.reject_columns());
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], "tcga-02");
    assert_eq!(rows[0][4], "");
    assert_eq!(rows[0].last().map(String::as_str), Some("Invalid height value"));
    assert_eq!(rows[1][0], "tcga-03");
    assert_eq!(rows[1].last().map(String::as_str), Some("Missing fields: gender"));
}

fn source_csv_with_rows(count: usize, overrides: &[(usize, &str)]) -> String {
    let mut content = SOURCE_CSV.lines().next().unwrap_or_default().to_string();
    content.push('\n');
    for idx in 0..count {
        let row = overrides
            .iter()
            .find(|(at, _)| *at == idx)
            .map(|(_, row)| (*row).to_string())
            .unwrap_or_else(|| {
                "MALE,180,80,WHITE,61,2,3,smoker,yes,no,adenocarcinoma,tumor free,alive,"
                    .to_string()
            });
        content.push_str(&format!("{idx},TCGA-{idx:03},{row}\n"));
    }
    content
}

#[test]
fn test_run_pipeline_soft_rejects_late_bad_values() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("source.csv");
    let content = source_csv_with_rows(
        160,
        &[
            (
                150,
                "MALE,unknown,80,WHITE,61,2,3,smoker,yes,no,adenocarcinoma,tumor free,alive,",
            ),
            (
                155,
                "NA,180,80,WHITE,61,2,3,smoker,yes,no,adenocarcinoma,tumor free,alive,",
            ),
        ],
    );
    fs::write(&input, content).unwrap();
    let options = PipelineOptions {
        input,
        output_dir: dir.path().join("output"),
        audit_path: None,
        dry_run: true,
    };

    let result = run_pipeline(&options, &RuleSet::default()).unwrap();

    assert_eq!(result.shapes[0].rows, 160);
    assert_eq!(result.accepted_rows, 158);
    assert_eq!(result.rejected_rows, 2);
    assert_eq!(result.reason_counts.get("Missing fields: height"), Some(&1));
    assert_eq!(result.reason_counts.get("Missing fields: gender"), Some(&1));
}

#[test]
fn test_run_pipeline_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("source.csv");
    fs::write(&input, SOURCE_CSV).unwrap();
    let audit = dir.path().join("logs").join("rejects.json");
    let options = PipelineOptions {
        input,
        output_dir: dir.path().join("output"),
        audit_path: Some(audit.clone()),
        dry_run: true,
    };

    let result = run_pipeline(&options, &RuleSet::default()).unwrap();

    assert_eq!(result.rejected_rows, 2);
    assert!(result.outputs.accepted.is_none());
    assert!(!options.output_dir.exists());
    assert!(!audit.exists());
}

#[test]
fn test_run_pipeline_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let options = PipelineOptions {
        input: dir.path().join("missing.csv"),
        output_dir: dir.path().join("output"),
        audit_path: None,
        dry_run: false,
    };

    let error = run_pipeline(&options, &RuleSet::default()).unwrap_err();

    assert!(format!("{error:#}").contains("CSV file not found"));
    assert!(!options.output_dir.exists());
}
