use super::*;

#[test]
fn run_log_preserves_insertion_order() {
    let mut log = RunLog::new();
    log.info("first");
    log.warn("second");
    log.info("third");

    let messages: Vec<&str> = log.entries().iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["first", "second", "third"]);
}

#[test]
fn run_log_warnings_filter_out_info() {
    let mut log = RunLog::new();
    log.info("placed habit");
    log.warn("scheduled past its deadline");
    log.error("storage failed");

    let warnings: Vec<&LogEntry> = log.warnings().collect();
    assert_eq!(warnings.len(), 2);
    assert_eq!(warnings[0].level, LogLevel::Warn);
    assert_eq!(warnings[1].level, LogLevel::Error);
}

#[test]
fn logger_writes_to_configured_dir() {
    let dir = std::env::temp_dir().join(format!(
        "planwise-log-test-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    let logger = Logger::new();
    logger.set_log_dir(&dir);
    logger.info("hello", LogTarget::FileOnly);

    let path = logger.log_path().expect("file sink should open");
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("hello"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn logger_respects_file_logging_toggle() {
    let logger = Logger::new();
    logger.set_file_logging_enabled(false);
    logger.info("nothing", LogTarget::FileOnly);
    assert!(logger.log_path().is_none());
}
