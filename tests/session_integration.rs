//! End-to-end tests driving a scan session the way the orchestrator and its
//! workers do: report pipeline events, observe the channels, finish the run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lintfleet::core::config::{LogLevel, ScanConfig, ScanResults};
use lintfleet::events::Channel;
use lintfleet::progress::ScanSession;
use lintfleet::worker::{dispatch, LintFinding, WorkerMessage, MAX_SOURCE_LENGTH};

fn verbose_session() -> ScanSession {
    ScanSession::new(
        ScanConfig::builder()
            .with_log_level(LogLevel::Verbose)
            .build()
            .expect("valid config"),
    )
}

#[tokio::test]
async fn clean_repository_completes_with_verbose_summary() {
    let session = verbose_session();
    let finals = Arc::new(Mutex::new(Vec::new()));
    {
        let finals = finals.clone();
        session
            .subscribe_tasks(move |task, is_final| {
                if is_final {
                    finals.lock().unwrap().push(task.repository.clone());
                }
            })
            .await;
    }

    session.on_task_start("org/clean").await;
    session.on_repository_clone("org/clean").await;
    session.on_lint_start("org/clean", 4).await;
    session.on_file_lint_end("org/clean", 4).await;
    session.on_lint_end("org/clean", 0).await;

    assert_eq!(session.scanned_repositories().await, 1);
    assert!(session.task_snapshot().await.is_empty());
    assert_eq!(*finals.lock().unwrap(), vec!["org/clean".to_string()]);

    let messages = session.messages().await;
    let summary = messages.last().expect("summary message");
    assert_eq!(summary.level, LogLevel::Verbose);
    assert!(summary.content.contains("org/clean"));
    assert!(summary.content.contains("0 findings"));
}

#[tokio::test]
async fn repository_with_findings_reports_at_error_level() {
    let session = ScanSession::new(
        ScanConfig::builder()
            .with_log_level(LogLevel::Error)
            .build()
            .expect("valid config"),
    );

    session.on_lint_start("org/dirty", 9).await;
    session.on_lint_end("org/dirty", 3).await;

    // Error level hides everything but the findings summary
    let messages = session.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].level, LogLevel::Error);
    assert!(messages[0].content.contains("org/dirty"));
    assert!(messages[0].content.contains('3'));
}

#[tokio::test]
async fn finish_notifies_exit_exactly_once_despite_panicking_hook() {
    let exits = Arc::new(AtomicUsize::new(0));
    let session = ScanSession::new(
        ScanConfig::builder()
            .with_on_complete(|_results| panic!("hook exploded"))
            .build()
            .expect("valid config"),
    );
    {
        let exits = exits.clone();
        session
            .subscribe_exit(move || {
                exits.fetch_add(1, Ordering::SeqCst);
            })
            .await;
    }

    session.finish(ScanResults::Null).await;
    assert!(session.is_finished().await);
    assert_eq!(exits.load(Ordering::SeqCst), 1);

    // Second finish is a no-op
    session.finish(ScanResults::Null).await;
    assert_eq!(exits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn finish_survives_hook_error_and_passes_results_through() {
    let received = Arc::new(Mutex::new(None));
    let exits = Arc::new(AtomicUsize::new(0));
    let session = {
        let received = received.clone();
        ScanSession::new(
            ScanConfig::builder()
                .with_on_complete(move |results| {
                    Box::pin(async move {
                        *received.lock().unwrap() = Some(results);
                        let error: Box<dyn std::error::Error + Send + Sync> =
                            "results upload failed".into();
                        Err(error)
                    })
                })
                .build()
                .expect("valid config"),
        )
    };
    {
        let exits = exits.clone();
        session
            .subscribe_exit(move || {
                exits.fetch_add(1, Ordering::SeqCst);
            })
            .await;
    }

    session.on_lint_end("org/a", 0).await;
    session.finish(serde_json::json!({"scanned": 1})).await;

    assert_eq!(exits.load(Ordering::SeqCst), 1);
    assert_eq!(
        received.lock().unwrap().take(),
        Some(serde_json::json!({"scanned": 1}))
    );

    // The summary landed before the hook ran
    let messages = session.messages().await;
    let summary = messages.last().expect("scan summary");
    assert!(summary.content.contains("Finished scan of 1 repositories"));
}

#[tokio::test(start_paused = true)]
async fn ci_keep_alive_ticks_until_finish_even_at_error_level() {
    let ticks = Arc::new(Mutex::new(Vec::new()));
    let session = ScanSession::new(
        ScanConfig::builder()
            .with_log_level(LogLevel::Error)
            .with_ci(true)
            .with_keep_alive_interval(Duration::from_millis(50))
            .build()
            .expect("valid config"),
    );
    {
        let ticks = ticks.clone();
        session
            .subscribe_keep_alive(move |status| {
                ticks.lock().unwrap().push(status.to_string());
            })
            .await;
    }

    session.on_lint_start("org/a", 10).await;
    session.on_file_lint_end("org/a", 2).await;

    tokio::time::sleep(Duration::from_millis(120)).await;
    let during = ticks.lock().unwrap().len();
    assert!(during >= 1, "keep-alive never fired");
    {
        let ticks = ticks.lock().unwrap();
        assert!(ticks[0].contains("[STATUS]"));
        assert!(ticks[0].contains("org/a [LINT] 2/10"));
    }

    // Error level hides task churn in CI, but not the heartbeat
    assert_eq!(session.messages().await.len(), 0);

    session.finish(ScanResults::Null).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(ticks.lock().unwrap().len(), during, "ticked after finish");
}

#[tokio::test]
async fn reporting_after_finish_is_ignored() {
    let session = verbose_session();
    session.on_lint_end("org/a", 0).await;
    session.finish(ScanResults::Null).await;

    let before = session.message_count().await;
    session.on_task_start("org/late").await;
    session.on_worker_crash("org/late", Some("1")).await;
    session.on_lint_end("org/late", 2).await;

    assert_eq!(session.message_count().await, before);
    assert_eq!(session.scanned_repositories().await, 1);
    assert!(session.task_snapshot().await.is_empty());
}

#[tokio::test]
async fn unsubscribed_listener_stops_receiving() {
    let session = verbose_session();
    let count = Arc::new(AtomicUsize::new(0));
    let id = {
        let count = count.clone();
        session
            .subscribe_messages(move |_message| {
                count.fetch_add(1, Ordering::SeqCst);
            })
            .await
    };

    session.on_clone_failure("org/a").await;
    assert!(session.unsubscribe(Channel::Message, id).await);
    session.on_clone_failure("org/b").await;

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(session.messages().await.len(), 2);
}

#[tokio::test]
async fn worker_messages_drive_the_session() {
    let session = verbose_session();
    session.on_lint_start("org/a", 3).await;

    let progressed = dispatch(
        &session,
        "org/a",
        WorkerMessage::OnProgress {
            current_file_index: 2,
        },
    )
    .await;
    assert!(progressed.is_none());
    assert_eq!(session.task_snapshot().await[0].current_file_index, Some(2));

    let long_source = "x".repeat(2 * MAX_SOURCE_LENGTH);
    let findings = dispatch(
        &session,
        "org/a",
        WorkerMessage::OnResult {
            messages: vec![LintFinding {
                rule: Some("no-eval".to_string()),
                severity: 2,
                message: "eval is evil".to_string(),
                line: Some(3),
                column: Some(1),
                source: Some(long_source),
            }],
        },
    )
    .await
    .expect("result message returns findings");

    let source = findings[0].source.as_deref().expect("source kept");
    assert_eq!(source.chars().count(), MAX_SOURCE_LENGTH + 3);
    assert!(source.ends_with("..."));

    assert_eq!(session.scanned_repositories().await, 1);
    assert!(session.task_snapshot().await.is_empty());
}

#[tokio::test]
async fn worker_crash_message_is_reported_once() {
    let session = verbose_session();
    session.on_task_start("org/a").await;

    for code in [Some("137".to_string()), Some("1".to_string()), None] {
        dispatch(
            &session,
            "org/a",
            WorkerMessage::OnCrash { error_code: code },
        )
        .await;
    }

    let messages = session.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].content.contains("org/a"));
    assert!(messages[0].content.contains("137"));
}
