mod common;

use std::fs;

use common::{TestWorkspace, dataset, int_column, keyed_config, read_csv};
use csv_recon::{
    anomaly::{AnomalyDetector, UnavailableDetector, select_detector},
    config::ReconConfig,
    data::{Value, format_cell},
    error::ReconError,
    reconcile::{reconcile_datasets, run},
    report::{CsvReportWriter, ReportWriter, SUMMARY_FILE},
    result_set::Sheet,
    source::{CsvTableSource, MemoryTableSource},
    verdict::Verdict,
};

fn no_model() -> UnavailableDetector {
    UnavailableDetector::new("disabled in configuration")
}

fn scenario(workspace: &TestWorkspace) -> ReconConfig {
    workspace.write("source/sales.csv", "id,amount\n1,10\n2,20\n3,30\n");
    workspace.write("target/sales.csv", "id,amount\n1,10\n2,25\n");
    ReconConfig {
        primary_key: "id".to_string(),
        source_table: "sales".to_string(),
        target_table: "sales".to_string(),
        source_dir: Some(workspace.path().join("source")),
        target_dir: Some(workspace.path().join("target")),
        ..ReconConfig::default()
    }
}

#[test]
fn missing_row_and_changed_amount_fail_the_run() {
    let workspace = TestWorkspace::new();
    let config = scenario(&workspace);
    let source = CsvTableSource::new(config.source_dir.clone());
    let target = CsvTableSource::new(config.target_dir.clone());
    let report = run(&config, &source, &target, &no_model()).expect("run succeeds");

    assert_eq!(report.verdict, Verdict::Fail);
    let missing = report.sheet(Sheet::MissingInTarget);
    assert_eq!(missing.len(), 1);
    assert_eq!(missing.rows()[0][0], Some(Value::Integer(3)));

    let mismatches = report.sheet(Sheet::DataMismatches);
    assert_eq!(
        mismatches.rows(),
        &[vec![
            Some(Value::Integer(2)),
            Some(Value::String("amount".to_string())),
            Some(Value::Integer(20)),
            Some(Value::Integer(25)),
        ]]
    );
    assert!(report.sheet(Sheet::SourceDuplicates).is_empty());
    assert!(report.sheet(Sheet::TargetDuplicates).is_empty());
    assert!(report.sheet(Sheet::NullsSourceTarget).is_empty());
}

#[test]
fn identical_tables_pass_and_write_a_complete_report() {
    let workspace = TestWorkspace::new();
    workspace.write("a.csv", "id,name,amount\n1,alpha,1.5\n2,beta,2.5\n");
    let config = ReconConfig {
        source_table: workspace.path().join("a.csv").to_string_lossy().into_owned(),
        target_table: workspace.path().join("a.csv").to_string_lossy().into_owned(),
        ..keyed_config("id")
    };
    let loader = CsvTableSource::new(None);
    let report = run(&config, &loader, &loader, &no_model()).expect("run succeeds");
    assert_eq!(report.verdict, Verdict::Pass);

    let out = workspace.path().join("report");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("Data_Mismatches.csv"), "id,column\n9,amount\n").unwrap();
    let writer = CsvReportWriter::new(&out, "pipeline_status.csv");
    writer.write(&report).expect("report written");

    assert!(!writer.sheet_path(Sheet::DataMismatches).exists());
    for sheet in Sheet::ALL.into_iter().skip(1) {
        assert!(writer.sheet_path(sheet).exists(), "{sheet} missing");
    }
    assert_eq!(
        read_csv(&writer.sheet_path(Sheet::SourceDuplicates)),
        vec![vec!["amount", "id", "name"]]
    );
    assert_eq!(
        fs::read_to_string(writer.sheet_path(Sheet::ModelAnomalies)).unwrap(),
        ""
    );
    assert_eq!(
        read_csv(&writer.status_path()),
        vec![vec!["status"], vec!["PASS"]]
    );
    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join(SUMMARY_FILE)).unwrap()).unwrap();
    assert_eq!(summary["status"], "PASS");
    assert_eq!(summary["sheets"]["Data_Mismatches"], 0);
    assert!(summary.get("model").is_none());
}

#[test]
fn failing_report_writes_mismatch_sheet_and_status() {
    let workspace = TestWorkspace::new();
    let config = scenario(&workspace);
    let source = CsvTableSource::new(config.source_dir.clone());
    let target = CsvTableSource::new(config.target_dir.clone());
    let report = run(&config, &source, &target, &no_model()).unwrap();

    let out = workspace.path().join("validation_report");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("notes.csv"), "kept").unwrap();
    fs::write(out.join("pipeline_status.csv"), "status\nPASS\n").unwrap();
    let writer = CsvReportWriter::new(&out, "pipeline_status.csv");
    writer.write(&report).unwrap();

    assert_eq!(fs::read_to_string(out.join("notes.csv")).unwrap(), "kept");
    assert_eq!(
        read_csv(&writer.sheet_path(Sheet::DataMismatches)),
        vec![
            vec!["id", "column", "source_value", "target_value"],
            vec!["2", "amount", "20", "25"],
        ]
    );
    assert_eq!(
        read_csv(&writer.sheet_path(Sheet::MissingInTarget)),
        vec![vec!["amount", "id"], vec!["30", "3"]]
    );
    assert_eq!(
        read_csv(&writer.status_path()),
        vec![vec!["status"], vec!["FAIL"]]
    );
    let leftovers: Vec<_> = fs::read_dir(&out)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".staging"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn report_into_working_directory_keeps_user_files() {
    let workspace = TestWorkspace::new();
    let config = scenario(&workspace);
    let source = CsvTableSource::new(config.source_dir.clone());
    let target = CsvTableSource::new(config.target_dir.clone());
    let report = run(&config, &source, &target, &no_model()).unwrap();

    let writer = CsvReportWriter::new(workspace.path(), "pipeline_status.csv");
    writer.write(&report).unwrap();

    assert!(workspace.path().join("source/sales.csv").is_file());
    assert!(workspace.path().join("target/sales.csv").is_file());
    assert!(writer.sheet_path(Sheet::MissingInTarget).is_file());
    assert!(writer.sheet_path(Sheet::DataMismatches).is_file());
}

#[test]
fn stray_target_cells_are_the_only_mismatches() {
    let workspace = TestWorkspace::new();
    workspace.write(
        "source/sales.csv",
        "id,amount,placed_on\n1,10,2024-01-01\n2,20,2024-01-02\n3,30,2024-01-03\n",
    );
    workspace.write(
        "target/sales.csv",
        "id,amount,placed_on\n1,10,2024-01-01\n2,x,2024-01-02\n3,30,someday\n",
    );
    let config = ReconConfig {
        source_table: "sales".to_string(),
        target_table: "sales".to_string(),
        source_dir: Some(workspace.path().join("source")),
        target_dir: Some(workspace.path().join("target")),
        ..keyed_config("id")
    };
    let source = CsvTableSource::new(config.source_dir.clone());
    let target = CsvTableSource::new(config.target_dir.clone());
    let report = run(&config, &source, &target, &no_model()).unwrap();

    let mismatches: Vec<Vec<String>> = report
        .sheet(Sheet::DataMismatches)
        .rows()
        .iter()
        .map(|row| row.iter().map(format_cell).collect())
        .collect();
    assert_eq!(
        mismatches,
        vec![
            vec!["2", "amount", "20", "x"],
            vec!["3", "placed_on", "2024-01-03", "someday"],
        ]
    );
    assert!(report.sheet(Sheet::MissingInTarget).is_empty());
    assert_eq!(report.aligned_keys, 3);
}

#[test]
fn duplicated_keys_are_reported_but_not_compared() {
    let source = dataset(vec![
        int_column("id", &[1, 1, 2, 3]),
        int_column("qty", &[1, 9, 2, 3]),
    ]);
    let target = dataset(vec![
        int_column("id", &[1, 2, 3, 3]),
        int_column("qty", &[5, 2, 3, 3]),
    ]);
    let report = reconcile_datasets(&source, &target, &keyed_config("id"), &no_model()).unwrap();
    assert_eq!(report.sheet(Sheet::SourceDuplicates).len(), 2);
    assert_eq!(report.sheet(Sheet::TargetDuplicates).len(), 2);
    assert!(report.sheet(Sheet::DataMismatches).is_empty());
    assert!(report.sheet(Sheet::MissingInTarget).is_empty());
    assert_eq!(report.aligned_keys, 2);
    assert_eq!(report.verdict, Verdict::Fail);
}

#[test]
fn key_only_schemas_compare_nothing() {
    let source = dataset(vec![int_column("id", &[1, 2]), int_column("a", &[1, 2])]);
    let target = dataset(vec![int_column("id", &[1, 2]), int_column("b", &[1, 2])]);
    let report = reconcile_datasets(&source, &target, &keyed_config("id"), &no_model()).unwrap();
    assert_eq!(report.compared_columns, vec!["id"]);
    assert!(report.sheet(Sheet::DataMismatches).is_empty());
    assert_eq!(report.verdict, Verdict::Pass);
}

#[test]
fn missing_key_column_aborts_before_detection() {
    let source = MemoryTableSource::new().with_table(
        "source",
        dataset(vec![int_column("sale_id", &[1]), int_column("v", &[1])]),
    );
    let target = MemoryTableSource::new().with_table(
        "target",
        dataset(vec![int_column("id", &[1]), int_column("v", &[1])]),
    );
    let err = run(&keyed_config("id"), &source, &target, &no_model()).unwrap_err();
    assert!(matches!(err, ReconError::MissingKeyColumn { .. }));
    assert!(err.to_string().contains("source"));
}

#[test]
fn unknown_table_is_a_load_error() {
    let workspace = TestWorkspace::new();
    let loader = CsvTableSource::new(Some(workspace.path().to_path_buf()));
    let err = run(&keyed_config("id"), &loader, &loader, &no_model()).unwrap_err();
    assert!(matches!(err, ReconError::Load { .. }));
}

#[cfg(feature = "anomaly-model")]
#[test]
fn seeded_model_populates_statistics() {
    let ids: Vec<i64> = (1..=60).collect();
    let qty: Vec<i64> = ids.iter().map(|i| i % 4 + 1).collect();
    let price: Vec<i64> = ids.iter().map(|i| 100 + i % 5).collect();
    let data = dataset(vec![
        int_column("id", &ids),
        int_column("price", &price),
        int_column("qty", &qty),
    ]);
    let mut config = keyed_config("id");
    config.anomaly.seed = Some(3);
    config.anomaly.epochs = 20;
    let detector = select_detector(&config.anomaly);
    assert_eq!(detector.name(), "autoencoder");
    let report = reconcile_datasets(&data, &data, &config, detector.as_ref()).unwrap();
    let stats = report.model.stats().expect("model ran");
    assert_eq!(stats.scored_rows, 60);
    assert_eq!(stats.device, "CPU");
    assert_eq!(
        report.sheet(Sheet::ModelAnomalies).len(),
        stats.anomaly_count
    );
    assert_eq!(report.numeric_columns, vec!["id", "price", "qty"]);
}

#[test]
fn numeric_key_is_scored_unless_excluded() {
    let ids: Vec<i64> = (1..=30).chain([5_000]).collect();
    let amounts = vec![7; ids.len()];
    let data = dataset(vec![int_column("id", &ids), int_column("amount", &amounts)]);

    let report = reconcile_datasets(&data, &data, &keyed_config("id"), &no_model()).unwrap();
    assert_eq!(report.numeric_columns, vec!["id", "amount"]);
    assert_eq!(report.source_outlier_rows, 1);
    assert_eq!(report.sheet(Sheet::OutliersSideBySide).len(), 1);

    let config = ReconConfig {
        exclude_key_from_features: true,
        ..keyed_config("id")
    };
    let report = reconcile_datasets(&data, &data, &config, &no_model()).unwrap();
    assert_eq!(report.numeric_columns, vec!["amount"]);
    assert_eq!(report.source_outlier_rows, 0);
    assert_eq!(report.verdict, Verdict::Pass);
}
