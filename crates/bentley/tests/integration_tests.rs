use bentley::*;

#[test]
fn test_basic_logging_functions() {
  // Logging functions can be called without panicking
  info("Test info message");
  warn("Test warning message");
  error("Test error message");
  debug("Test debug message");
  success("Test success message");
  verbose("Test verbose message");
}

#[test]
fn test_multiline_messages() {
  let multiline_msg = "First line\nSecond line\nThird line";
  info(multiline_msg);
  warn(multiline_msg);
  announce(multiline_msg);
}

#[test]
fn test_macros_accept_format_arguments() {
  let passages = 12;
  bentley::info!("indexed {passages} passages");
  bentley::warn!("{} of {} embeddings failed", 1, passages);
  bentley::success!("done");
}

#[cfg(feature = "journal")]
#[tokio::test]
async fn test_service_log_round_trip_through_disk() {
  use bentley::journal::ServiceLog;

  let temp_dir = tempfile::TempDir::new().unwrap();
  let path = temp_dir.path().join("service.logs.jsonl");

  let logs = ServiceLog::new_with_silent(&path, true).unwrap();
  logs.success("Index built", "startup").await;

  // A second handle on the same file sees the entry
  let reopened = ServiceLog::new_with_silent(&path, true).unwrap();
  let entries = reopened.get_logs(None, None).await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].level, "success");
  assert_eq!(entries[0].component, "startup");
}
