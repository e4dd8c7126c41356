//! Orchestrator lifecycle tests

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use metadeploy::cache::status::StatusCache;
use metadeploy::deploy::channel::{ChannelEvent, ChannelProbe, ChannelResult};
use metadeploy::deploy::job::JobPhase;
use metadeploy::deploy::orchestrator::{Orchestrator, OrchestratorOptions, SubmitMode};
use metadeploy::deploy::poller::PollOptions;
use metadeploy::errors::DeployError;
use metadeploy::mapping::{Direction, FieldMapping, MappingBundle};
use metadeploy::models::card::TargetOption;
use metadeploy::notify::Severity;

use crate::support::{
    card, failure_snapshot, progress_snapshot, success_snapshot, MockApi, RecordingNotifier,
};

struct Harness {
    api: Arc<MockApi>,
    notifier: Arc<RecordingNotifier>,
    cache: Arc<StatusCache>,
    orchestrator: Arc<Orchestrator>,
}

fn harness(options: OrchestratorOptions) -> Harness {
    let api = Arc::new(MockApi::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let cache = Arc::new(StatusCache::new());
    let orchestrator = Orchestrator::new(
        api.clone(),
        notifier.clone(),
        cache.clone(),
        options,
    );
    Harness {
        api,
        notifier,
        cache,
        orchestrator,
    }
}

fn direct(max_attempts: u32) -> OrchestratorOptions {
    OrchestratorOptions {
        poll: PollOptions {
            max_attempts,
            ..PollOptions::default()
        },
        ..OrchestratorOptions::default()
    }
}

/// Let pending ready-to-run tasks finish their side effects
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn test_successful_deployment_end_to_end() {
    let h = harness(direct(60));
    h.api.push_detailed(Ok(progress_snapshot(3, 10)));
    h.api.push_detailed(Ok(success_snapshot(10)));
    *h.api.cards.lock().unwrap() = vec![card("Account", true)];

    let mut rx = h.orchestrator.subscribe();
    h.orchestrator.submit("Account").unwrap();
    assert_eq!(h.orchestrator.job().phase, JobPhase::Submitting);

    // First cycle: 3/10 components reported
    let mid = rx
        .wait_for(|job| job.phase == JobPhase::Polling && job.snapshot.is_some())
        .await
        .unwrap()
        .clone();
    assert_eq!(mid.component_percent(), 30);
    assert_eq!(mid.message, "Deploying: 3/10 components");

    let job = h.orchestrator.wait_terminal().await.unwrap();
    assert_eq!(job.phase, JobPhase::Succeeded);
    assert!(!job.can_retry());
    settle().await;

    let job = h.orchestrator.job();
    assert_eq!(job.attempts, 2);
    assert_eq!(job.job_id.as_deref(), Some("job-1"));
    assert!(job.source.is_some());
    assert!(job.progress_visible);
    assert_eq!(job.close_message, "Success! Closing automatically...");

    // Card cache was invalidated and refetched with the new deploy flag
    assert_eq!(h.api.stats_calls.load(Ordering::SeqCst), 1);
    let cards = h.cache.get_cards().unwrap();
    assert!(cards[0].has_deployed_artifact);

    let notifications = h.notifier.taken();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "Deployment Successful");
    assert_eq!(notifications[0].severity, Severity::Success);
    assert!(!notifications[0].persistent);

    // Progress view auto-dismisses 2s after success
    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert!(!h.orchestrator.job().progress_visible);
}

#[tokio::test(start_paused = true)]
async fn test_failed_deployment_with_conflict_marker() {
    let h = harness(direct(60));
    let mut snapshot = failure_snapshot(vec![
        "Account.Status__c: FIELD_CUSTOM_VALIDATION_EXCEPTION, date required",
    ]);
    snapshot.test_errors = 2;
    h.api.push_detailed(Ok(snapshot));

    h.orchestrator.submit("Account").unwrap();
    let job = h.orchestrator.wait_terminal().await.unwrap();
    settle().await;

    assert_eq!(job.phase, JobPhase::Failed);
    assert!(job.can_retry());
    assert_eq!(job.message, "2 test(s) failed. See details below.");

    let notifications = h.notifier.taken();
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0].title, "Validation Rule Conflict");
    assert!(notifications[0].persistent);
    assert_eq!(notifications[1].title, "Deployment Failed");
    assert!(notifications[1].persistent);

    // Failure views never auto-dismiss
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(h.orchestrator.job().progress_visible);
    assert!(!h.orchestrator.job().close_message.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_both_status_protocols_failing_fails_the_job() {
    let h = harness(direct(60));
    // No scripted status responses: both protocols fail on the first cycle.

    h.orchestrator.submit("Account").unwrap();
    let job = h.orchestrator.wait_terminal().await.unwrap();
    settle().await;

    assert_eq!(job.phase, JobPhase::Failed);
    assert!(job.can_retry());
    assert_eq!(h.api.detailed_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.api.coarse_calls.load(Ordering::SeqCst), 1);

    let notifications = h.notifier.taken();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "Status Check Error");
    assert!(notifications[0].persistent);
}

#[tokio::test(start_paused = true)]
async fn test_poll_budget_exhaustion_times_out() {
    let h = harness(direct(2));
    h.api.push_detailed(Ok(progress_snapshot(1, 10)));
    h.api.push_detailed(Ok(progress_snapshot(2, 10)));

    h.orchestrator.submit("Account").unwrap();
    let job = h.orchestrator.wait_terminal().await.unwrap();
    settle().await;

    assert_eq!(job.phase, JobPhase::TimedOut);
    assert!(job.can_retry());
    assert_eq!(job.message, "Stopped polling after 2s. Check status later.");
    assert_eq!(h.api.detailed_calls.load(Ordering::SeqCst), 2);

    let notifications = h.notifier.taken();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].severity, Severity::Warning);
    assert!(!notifications[0].persistent);
}

#[tokio::test(start_paused = true)]
async fn test_submission_error_fails_with_retry() {
    let h = harness(direct(60));
    h.api
        .push_submit(Err(DeployError::SubmissionError("no deploy access".into())));

    h.orchestrator.submit("Account").unwrap();
    let job = h.orchestrator.wait_terminal().await.unwrap();
    settle().await;

    assert_eq!(job.phase, JobPhase::Failed);
    assert_eq!(job.message, "no deploy access");
    assert!(job.job_id.is_none());

    // Retry re-enters the lifecycle with the same target
    h.api.push_detailed(Ok(success_snapshot(4)));
    h.orchestrator.retry().unwrap();
    let job = h.orchestrator.wait_terminal().await.unwrap();
    assert_eq!(job.phase, JobPhase::Succeeded);
    assert_eq!(job.target_key, "Account");

    // Nothing left to retry after success
    assert!(matches!(
        h.orchestrator.retry(),
        Err(DeployError::ValidationError(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_submit_is_single_flight_per_target() {
    let h = harness(direct(60));
    for _ in 0..10 {
        h.api.push_detailed(Ok(progress_snapshot(1, 10)));
    }

    h.orchestrator.submit("Account").unwrap();
    assert!(matches!(
        h.orchestrator.submit("Account"),
        Err(DeployError::JobInFlight(_))
    ));

    // A different target tears the running job down and starts fresh
    h.orchestrator.submit("Contact").unwrap();
    assert_eq!(h.orchestrator.job().target_key, "Contact");

    h.orchestrator.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_side_channel_submission_delivers_handle() {
    let options = OrchestratorOptions {
        submit_mode: SubmitMode::SideChannel,
        ..direct(60)
    };
    let h = harness(options);
    h.api.push_probe(Ok(ChannelProbe::default()));
    h.api.push_probe(Ok(ChannelProbe {
        closed: false,
        result: Some(ChannelResult {
            success: true,
            job_id: Some("job-9".to_string()),
            error: None,
        }),
    }));
    h.api.push_detailed(Ok(success_snapshot(4)));

    h.orchestrator.submit("Account").unwrap();
    let job = h.orchestrator.wait_terminal().await.unwrap();

    assert_eq!(job.phase, JobPhase::Succeeded);
    assert_eq!(job.job_id.as_deref(), Some("job-9"));
}

#[tokio::test(start_paused = true)]
async fn test_side_channel_wait_budget_exhaustion_times_out() {
    let options = OrchestratorOptions {
        submit_mode: SubmitMode::SideChannel,
        ..direct(60)
    };
    let h = harness(options);
    // No scripted probes: every probe comes back empty and the 30s
    // wait budget runs out without a job handle.

    h.orchestrator.submit("Account").unwrap();
    let job = h.orchestrator.wait_terminal().await.unwrap();
    settle().await;

    assert_eq!(job.phase, JobPhase::TimedOut);
    assert!(job.can_retry());
    assert!(job.job_id.is_none());

    let notifications = h.notifier.taken();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "Deployment Timed Out");
    assert_eq!(notifications[0].severity, Severity::Warning);
    assert!(!notifications[0].persistent);
}

#[tokio::test(start_paused = true)]
async fn test_side_channel_closing_without_result_fails_the_job() {
    let options = OrchestratorOptions {
        submit_mode: SubmitMode::SideChannel,
        ..direct(60)
    };
    let h = harness(options);
    h.api.push_probe(Ok(ChannelProbe {
        closed: true,
        result: None,
    }));

    h.orchestrator.submit("Account").unwrap();
    let job = h.orchestrator.wait_terminal().await.unwrap();
    settle().await;

    assert_eq!(job.phase, JobPhase::Failed);
    assert_eq!(job.message, "closed before result");
    assert!(job.can_retry());

    let notifications = h.notifier.taken();
    assert_eq!(notifications[0].title, "Deployment Failed");
    assert!(notifications[0].persistent);
}

#[tokio::test(start_paused = true)]
async fn test_inbound_complete_event_settles_the_job() {
    let h = harness(direct(60));

    // Side-channel payloads use the legacy failure-detail field names
    let event: ChannelEvent = serde_json::from_value(json!({
        "type": "complete",
        "status": {
            "done": true,
            "outcome": "Failed",
            "testErrors": 1,
            "testFailures": [{
                "name": "AccountTriggerTest",
                "outcome": "Fail",
                "message": "blocked: FIELD_CUSTOM_VALIDATION_EXCEPTION on Status__c"
            }],
            "componentFailures": []
        }
    }))
    .unwrap();

    h.orchestrator.handle_channel_event(event).await;
    settle().await;

    let job = h.orchestrator.job();
    assert_eq!(job.phase, JobPhase::Failed);

    let notifications = h.notifier.taken();
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0].title, "Validation Rule Conflict");
}

#[tokio::test(start_paused = true)]
async fn test_inbound_progress_event_updates_the_view() {
    let h = harness(direct(60));

    let event: ChannelEvent = serde_json::from_value(json!({
        "type": "progress",
        "status": { "componentsTotal": 8, "componentsDone": 2 }
    }))
    .unwrap();

    h.orchestrator.handle_channel_event(event).await;

    let job = h.orchestrator.job();
    assert_eq!(job.component_percent(), 25);
    assert_eq!(job.phase, JobPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_view_source_is_idempotent_and_non_fatal() {
    let h = harness(direct(60));
    h.api.push_source(Ok("trigger X on Account {}".to_string()));

    h.orchestrator.select_target("Account").unwrap();
    h.orchestrator.view_source().await.unwrap();
    assert_eq!(
        h.orchestrator.job().source.as_deref(),
        Some("trigger X on Account {}")
    );

    // Second call is a no-op
    h.orchestrator.view_source().await.unwrap();
    assert_eq!(h.api.source_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_view_source_failure_warns_without_changing_phase() {
    let h = harness(direct(60));
    h.api
        .push_source(Err(DeployError::NotFound("no deployed trigger".into())));

    h.orchestrator.select_target("Account").unwrap();
    let result = h.orchestrator.view_source().await;

    assert!(matches!(result, Err(DeployError::SourceFetchError(_))));
    assert_eq!(h.orchestrator.job().phase, JobPhase::Idle);
    assert!(h.orchestrator.job().source.is_none());

    let notifications = h.notifier.taken();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "Source Load Failed");
    assert_eq!(notifications[0].severity, Severity::Warning);
    assert!(!notifications[0].persistent);
}

#[tokio::test(start_paused = true)]
async fn test_load_cards_and_mappings_are_cache_first() {
    let h = harness(direct(60));
    *h.api.cards.lock().unwrap() = vec![card("Account", false)];
    *h.api.bundle.lock().unwrap() = MappingBundle {
        tree_nodes: vec![],
        mapping_details: vec![FieldMapping {
            picklist_field: "Status__c".to_string(),
            picklist_value: "Closed".to_string(),
            exit_date_field: "Closed_Date__c".to_string(),
            ..FieldMapping::default()
        }],
    };

    let cards = h.orchestrator.load_cards().await.unwrap();
    assert_eq!(cards.len(), 1);
    h.orchestrator.load_cards().await.unwrap();
    assert_eq!(h.api.stats_calls.load(Ordering::SeqCst), 1);

    let resolved = h.orchestrator.load_mappings("Account").await.unwrap();
    assert_eq!(resolved.mappings[0].direction, Direction::Exiting);
    assert_eq!(resolved.mappings[0].date_field, "Closed_Date__c");

    h.orchestrator.load_mappings("Account").await.unwrap();
    assert_eq!(h.api.mapping_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_load_targets_is_never_cached() {
    let h = harness(direct(60));
    *h.api.targets.lock().unwrap() = vec![
        TargetOption {
            key: "Account".to_string(),
            label: "Account".to_string(),
        },
        TargetOption {
            key: "Contact".to_string(),
            label: "Contact".to_string(),
        },
    ];

    let targets = h.orchestrator.load_targets().await.unwrap();
    assert_eq!(targets.len(), 2);
    assert_eq!(targets[0].key, "Account");

    // The flat listing always goes to the remote, unlike the card list
    h.orchestrator.load_targets().await.unwrap();
    assert_eq!(h.api.targets_calls.load(Ordering::SeqCst), 2);
}
