use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use tabular_intake::ingestion::{
    ingest_from_path, CompositeObserver, FileObserver, IngestionContext, IngestionObserver,
    IngestionOptions, IngestionRequest, IngestionSeverity, IngestionStats, SourceKind,
};
use tabular_intake::types::{DataType, Field, Schema};
use tabular_intake::IngestionError;

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<IngestionStats>>,
    failures: Mutex<Vec<IngestionSeverity>>,
    alerts: Mutex<Vec<IngestionSeverity>>,
    warnings: Mutex<Vec<String>>,
}

impl IngestionObserver for RecordingObserver {
    fn on_success(&self, _ctx: &IngestionContext, stats: IngestionStats) {
        self.successes.lock().unwrap().push(stats);
    }

    fn on_failure(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &IngestionError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &IngestionError) {
        self.alerts.lock().unwrap().push(severity);
    }

    fn on_warning(&self, _ctx: &IngestionContext, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }
}

fn tmp_file(name: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("tabular-intake-{name}-{nanos}.{ext}"))
}

fn options_with(obs: &Arc<RecordingObserver>) -> IngestionOptions {
    IngestionOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: IngestionSeverity::Critical,
    }
}

#[test]
fn observer_receives_failure_and_alert_on_missing_file() {
    let obs = Arc::new(RecordingObserver::default());

    let _ = ingest_from_path("tests/fixtures/does_not_exist.csv", None, &options_with(&obs)).unwrap_err();

    assert_eq!(*obs.failures.lock().unwrap(), vec![IngestionSeverity::Critical]);
    assert_eq!(*obs.alerts.lock().unwrap(), vec![IngestionSeverity::Critical]);
    assert!(obs.successes.lock().unwrap().is_empty());
}

#[test]
fn observer_receives_failure_without_alert_for_schema_error() {
    let obs = Arc::new(RecordingObserver::default());
    let schema = Schema::new(vec![Field::new("definitely_missing", DataType::Utf8)]);

    let _ = ingest_from_path("tests/fixtures/people.csv", Some(&schema), &options_with(&obs)).unwrap_err();

    assert_eq!(*obs.failures.lock().unwrap(), vec![IngestionSeverity::Error]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn lower_threshold_alerts_on_errors() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = IngestionOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: IngestionSeverity::Error,
    };
    let schema = Schema::new(vec![Field::new("definitely_missing", DataType::Utf8)]);

    let _ = ingest_from_path("tests/fixtures/people.csv", Some(&schema), &opts).unwrap_err();
    assert_eq!(*obs.alerts.lock().unwrap(), vec![IngestionSeverity::Error]);
}

#[test]
fn observer_receives_success_stats() {
    let obs = Arc::new(RecordingObserver::default());

    ingest_from_path("tests/fixtures/people.csv", None, &options_with(&obs)).unwrap();

    assert_eq!(
        *obs.successes.lock().unwrap(),
        vec![IngestionStats { rows: 5, tables: 1 }]
    );
    assert!(obs.warnings.lock().unwrap().is_empty());
}

#[test]
fn empty_table_is_a_warning_not_a_failure() {
    let path = tmp_file("empty", "csv");
    std::fs::write(&path, "a,b\n").unwrap();
    let obs = Arc::new(RecordingObserver::default());

    let decoded = ingest_from_path(&path, None, &options_with(&obs)).unwrap();
    assert_eq!(decoded.row_count(), 0);

    let warnings = obs.warnings.lock().unwrap().clone();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("empty"), "{warnings:?}");
    assert_eq!(obs.successes.lock().unwrap().len(), 1);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn invalid_request_options_are_reported() {
    let obs = Arc::new(RecordingObserver::default());
    let request = IngestionRequest::local("/nowhere/notes.txt").with_options(options_with(&obs));

    let err = request.run().unwrap_err();
    assert!(matches!(err, IngestionError::UnsupportedFormat { .. }));
    assert_eq!(*obs.failures.lock().unwrap(), vec![IngestionSeverity::Error]);
}

#[test]
fn composite_fans_out_and_file_observer_appends_lines() {
    let log_path = tmp_file("observer", "log");
    let recording = Arc::new(RecordingObserver::default());
    let composite = CompositeObserver::new(vec![
        recording.clone() as Arc<dyn IngestionObserver>,
        Arc::new(FileObserver::new(&log_path)),
    ]);
    let opts = IngestionOptions {
        observer: Some(Arc::new(composite)),
        alert_at_or_above: IngestionSeverity::Critical,
    };

    ingest_from_path("tests/fixtures/people.csv", None, &opts).unwrap();
    let _ = ingest_from_path("tests/fixtures/does_not_exist.csv", None, &opts).unwrap_err();

    assert_eq!(recording.successes.lock().unwrap().len(), 1);
    assert_eq!(recording.alerts.lock().unwrap().len(), 1);

    let log = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 3, "{log}");
    assert!(lines[0].contains(" ok "), "{log}");
    assert!(lines[0].contains(&format!("backend={}", SourceKind::Local)), "{log}");
    assert!(lines[1].contains(" fail "), "{log}");
    assert!(lines[2].contains(" ALERT "), "{log}");

    let _ = std::fs::remove_file(&log_path);
}
