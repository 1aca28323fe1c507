//! 用真实子进程（sh 脚本）驱动完整流水线
#![cfg(unix)]

mod common;

use common::{put_record, Project};
use handoff_core::api::{Coordinator, EventLog, PipelinePhase, PipelineReport, RunOutcome};
use pretty_assertions::assert_eq;
use serde_json::json;

fn producer_body() -> String {
    [
        put_record("users", r#"[{"id":1,"name":"Ada"}]"#),
        put_record("projects", r#"[{"id":10,"owner":1}]"#),
        put_record("excel_processing_result", r#"{"status":"success"}"#),
        "echo produced".to_string(),
    ]
    .join("\n")
}

fn consumer_body() -> String {
    [
        "test -f \"$HANDOFF_STORE_DIR/users.json\"".to_string(),
        put_record("consumer_status", r#"{"status":"completed"}"#),
        put_record("analysis_report", r#"{"total_users":1}"#),
    ]
    .join("\n")
}

#[tokio::test]
async fn full_pipeline_with_shell_scripts() {
    let project = Project::new();
    project.script("producer.sh", &producer_body());
    project.script("consumer.sh", &consumer_body());

    let cfg = project.config("producer.sh", "consumer.sh");
    let mut coordinator = Coordinator::from_config(&cfg).unwrap();
    coordinator.store().save("leftover", &json!({"old": true}));

    assert!(coordinator.run_pipeline().await);
    assert_eq!(coordinator.phase(), PipelinePhase::ReportGenerated);

    let store = coordinator.store();
    assert!(store.get("leftover").is_none());
    let report: PipelineReport = store.load_as("final_pipeline_report").unwrap();
    assert_eq!(report.recommendations.len(), 3);
    assert_eq!(
        report.data_summary.data_files,
        vec![
            "analysis_report",
            "consumer_status",
            "excel_processing_result",
            "execution_log",
            "projects",
            "users",
        ]
    );

    let events = EventLog::load_persisted(store);
    let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(
        types,
        vec![
            "data_cleared",
            "producer_completed",
            "dependencies_ready",
            "consumer_completed",
            "pipeline_success",
        ]
    );
    assert_eq!(events[1].data["stdout"], json!("produced\n"));
    assert_eq!(events[4].data["report_saved"], json!(true));
}

#[tokio::test]
async fn failing_producer_stops_pipeline() {
    let project = Project::new();
    project.script("producer.sh", "echo 'sheet missing' >&2\nexit 3");
    project.script(
        "consumer.sh",
        &put_record("consumer_status", r#"{"status":"completed"}"#),
    );

    let cfg = project.config("producer.sh", "consumer.sh");
    let mut coordinator = Coordinator::from_config(&cfg).unwrap();

    assert!(!coordinator.run_pipeline().await);
    assert_eq!(coordinator.phase(), PipelinePhase::Failed);

    let last = coordinator.events().last().unwrap();
    assert_eq!(last.event_type, "pipeline_error");
    assert_eq!(last.data["exit_code"], json!(3));
    assert_eq!(last.data["stderr"], json!("sheet missing\n"));

    // 消费者从未运行，也没有报告
    assert!(coordinator.store().get("consumer_status").is_none());
    assert!(coordinator.store().get("final_pipeline_report").is_none());
}

#[tokio::test]
async fn producer_that_forgets_a_key_times_out() {
    let project = Project::new();
    project.script(
        "producer.sh",
        &put_record("excel_processing_result", r#"{"status":"success"}"#),
    );
    project.script("consumer.sh", "exit 0");

    let mut cfg = project.config("producer.sh", "consumer.sh");
    cfg.pipeline.key_timeout_ms = 150;
    let mut coordinator = Coordinator::from_config(&cfg).unwrap();

    assert!(!coordinator.run_pipeline().await);
    let last = coordinator.events().last().unwrap();
    assert_eq!(last.data["key"], json!("users"));
}

#[tokio::test]
async fn missing_producer_is_a_launch_failure() {
    let project = Project::new();
    let cfg = project.config("nowhere.sh", "consumer.sh");
    let mut coordinator = Coordinator::from_config(&cfg).unwrap();

    assert!(!coordinator.run_pipeline().await);
    let last = coordinator.events().last().unwrap();
    assert_eq!(last.data["stage"], json!("producer"));
    assert!(last.data.get("reason").is_some());
}

#[tokio::test]
async fn standalone_run_and_spawn() {
    let project = Project::new();
    let ok = project.script("ok.sh", "echo hi");
    let bad = project.script("bad.sh", "exit 5");
    let bg = project.script("bg.sh", "sleep 0.1");

    let cfg = project.config("ok.sh", "ok.sh");
    let mut coordinator = Coordinator::from_config(&cfg).unwrap();

    match coordinator.run_process(&ok).await {
        RunOutcome::Exited(report) => assert_eq!(report.stdout, "hi\n"),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(coordinator.run_process(&bad).await.exit_code(), Some(5));

    let mut handle = coordinator.spawn_process(&bg).await.unwrap();
    assert!(handle.pid() > 0);
    assert_eq!(handle.wait().await.unwrap(), 0);

    let types: Vec<&str> = coordinator
        .events()
        .iter()
        .map(|e| e.event_type.as_str())
        .collect();
    assert_eq!(
        types,
        vec![
            "file_execution_success",
            "file_execution_error",
            "file_execution_async"
        ]
    );
    assert_eq!(
        coordinator.events()[2].data["pid"],
        json!(handle.pid())
    );
}
