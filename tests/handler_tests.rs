mod common;

use billflow_core::constants::RETRY_LIMIT_EXCEEDED_MESSAGE;
use billflow_core::extraction::ExtractionError;
use billflow_core::messaging::JobMessage;
use billflow_core::models::{Account, FailureReason, JobType};
use billflow_core::orchestration::{Acknowledgement, HandlerOutcome};
use billflow_core::state_machine::JobState;
use chrono::NaiveDate;
use common::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_full_pipeline_produces_normalized_bill() {
    let harness = Harness::new(ScriptedModel::sample_a());
    let message = harness.enqueue(1, JobType::FullPipeline);

    let outcome = harness.deliver(&message).await;

    assert_eq!(outcome, HandlerOutcome::Succeeded);
    assert_eq!(outcome.acknowledgement(), Acknowledgement::Ack);

    let job = harness.job(1);
    assert_eq!(job.status, JobState::Succeeded);
    assert_eq!(job.attempt_count, 1);
    assert!(job.error_message.is_none());

    let artifacts = harness.store.artifacts();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(
        artifacts[0].storage_path,
        "memory://billflow-raw-bills/raw/bills/1.txt"
    );
    assert_eq!(artifacts[0].artifact_type, "raw_bill");

    let bills = harness.store.normalized_bills();
    assert_eq!(bills.len(), 1);
    assert_eq!(bills[0].customer_id, CUSTOMER_ID);
    assert_eq!(bills[0].total_amount, 106.40);
    assert_eq!(bills[0].billing_period_start, date(2025, 12, 1));
    assert_eq!(bills[0].billing_period_end, date(2025, 12, 31));
    assert_eq!(bills[0].extraction().unwrap().line_items.len(), 4);

    let rows = harness.warehouse.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].bill_period_start, date(2025, 12, 1));

    // The model saw the provider hint and the raw bill
    let prompts = harness.model.prompts();
    assert!(prompts[0].contains("Provider: MOCK_A"));
    assert!(prompts[0].contains("TOTAL DUE:                  $106.40"));
}

#[tokio::test]
async fn test_duplicate_delivery_of_succeeded_job_is_a_noop() {
    let harness = Harness::new(ScriptedModel::sample_a());
    let message = harness.enqueue(1, JobType::FullPipeline);
    harness.deliver(&message).await;
    let before = harness.job(1);

    let outcome = harness.deliver(&message).await;

    assert_eq!(outcome, HandlerOutcome::AlreadySucceeded);
    assert_eq!(outcome.acknowledgement(), Acknowledgement::Ack);
    assert_eq!(harness.job(1), before);
    assert_eq!(harness.store.artifacts().len(), 1);
    assert_eq!(harness.store.normalized_bills().len(), 1);
    assert_eq!(harness.model.call_count(), 1);
}

#[tokio::test]
async fn test_exhausted_budget_fails_without_running_stages() {
    let harness = Harness::new(ScriptedModel::sample_a());
    let message = harness.enqueue(1, JobType::FullPipeline);
    let mut job = harness.job(1);
    job.status = JobState::Failed;
    job.attempt_count = 3;
    harness.store.put_job(job);

    let outcome = harness.deliver(&message).await;

    assert_eq!(outcome, HandlerOutcome::RetryBudgetExceeded);
    assert_eq!(outcome.acknowledgement(), Acknowledgement::Ack);

    let job = harness.job(1);
    assert_eq!(job.status, JobState::Failed);
    assert_eq!(job.attempt_count, 3);
    assert_eq!(job.error_message.as_deref(), Some(RETRY_LIMIT_EXCEEDED_MESSAGE));
    assert_eq!(job.failure_reason, Some(FailureReason::RetryBudgetExceeded));

    assert_eq!(harness.model.call_count(), 0);
    assert!(harness.store.artifacts().is_empty());
    assert_eq!(harness.objects.object_count(), 0);
}

#[tokio::test]
async fn test_failing_job_is_retried_until_budget_is_spent() {
    let harness = Harness::new(ScriptedModel::failing("model unavailable"));
    let message = harness.enqueue(1, JobType::FullPipeline);

    let mut attempts = Vec::new();
    for _ in 0..3 {
        let outcome = harness.deliver(&message).await;
        assert_eq!(outcome.acknowledgement(), Acknowledgement::Nack);
        assert!(matches!(
            outcome,
            HandlerOutcome::Failed {
                reason: FailureReason::Extraction,
                retryable: true,
                ..
            }
        ));
        attempts.push(harness.job(1).attempt_count);
    }
    assert_eq!(attempts, vec![1, 2, 3]);

    let outcome = harness.deliver(&message).await;
    assert_eq!(outcome, HandlerOutcome::RetryBudgetExceeded);
    assert_eq!(harness.job(1).attempt_count, 3);
    assert_eq!(harness.model.call_count(), 3);

    // Further deliveries keep acking without work
    assert_eq!(
        harness.deliver(&message).await.acknowledgement(),
        Acknowledgement::Ack
    );
    assert_eq!(harness.model.call_count(), 3);
}

#[tokio::test]
async fn test_fallback_total_never_reaches_a_normalized_bill() {
    // The sample bill has a TOTAL DUE line the fallback would find
    let harness = Harness::new(ScriptedModel::replying("Sorry, I can't read that bill."));
    let message = harness.enqueue(1, JobType::FullPipeline);

    let outcome = harness.deliver(&message).await;

    match outcome {
        HandlerOutcome::Failed {
            reason,
            ref error_message,
            retryable,
        } => {
            assert_eq!(reason, FailureReason::Extraction);
            assert!(retryable);
            assert!(error_message.starts_with("Extraction response is not valid JSON"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(harness.job(1).status, JobState::Failed);
    assert!(harness.store.normalized_bills().is_empty());
    assert!(harness.warehouse.rows().is_empty());
    // Ingest already ran
    assert_eq!(harness.store.artifacts().len(), 1);
}

#[tokio::test]
async fn test_long_errors_are_truncated() {
    let harness = Harness::new(ScriptedModel::failing("x".repeat(800)));
    let message = harness.enqueue(1, JobType::FullPipeline);

    harness.deliver(&message).await;

    let error_message = harness.job(1).error_message.unwrap();
    assert_eq!(error_message.chars().count(), 500);
    assert!(error_message.starts_with("Extraction model call failed: xxx"));
}

#[tokio::test]
async fn test_unsupported_job_type_fails_terminally() {
    let harness = Harness::new(ScriptedModel::sample_a());
    harness.enqueue(1, JobType::IngestBill);
    let message = JobMessage {
        job_type: "REINDEX_BILLS".to_string(),
        ..JobMessage::new(1, ACCOUNT_ID, JobType::IngestBill)
    };

    let outcome = harness.deliver(&message).await;

    assert_eq!(
        outcome,
        HandlerOutcome::Failed {
            reason: FailureReason::UnsupportedJobType,
            error_message: "Unsupported job type: REINDEX_BILLS".to_string(),
            retryable: false,
        }
    );
    assert_eq!(outcome.acknowledgement(), Acknowledgement::Ack);

    let job = harness.job(1);
    assert_eq!(job.status, JobState::Failed);
    assert_eq!(job.attempt_count, 0);
    assert!(harness.store.artifacts().is_empty());
}

#[tokio::test]
async fn test_missing_job_is_dropped() {
    let harness = Harness::new(ScriptedModel::sample_a());
    let message = JobMessage::new(404, ACCOUNT_ID, JobType::FullPipeline);

    let outcome = harness.deliver(&message).await;

    assert!(matches!(outcome, HandlerOutcome::Dropped { .. }));
    assert_eq!(outcome.acknowledgement(), Acknowledgement::Ack);
    assert_eq!(harness.model.call_count(), 0);
}

#[tokio::test]
async fn test_undecodable_payload_is_dropped() {
    let harness = Harness::new(ScriptedModel::sample_a());

    let outcome = harness.handler.handle_payload(b"{\"job_id\": \"one\"}").await;

    assert!(matches!(outcome, HandlerOutcome::Dropped { .. }));
    assert_eq!(outcome.acknowledgement(), Acknowledgement::Ack);
}

#[tokio::test]
async fn test_missing_account_fails_terminally() {
    let harness = Harness::new(ScriptedModel::sample_a());
    harness.store.insert_job(1, 77, JobType::FullPipeline);
    let message = JobMessage::new(1, 77, JobType::FullPipeline);

    let outcome = harness.deliver(&message).await;

    assert!(matches!(
        outcome,
        HandlerOutcome::Failed {
            reason: FailureReason::NotFound,
            retryable: false,
            ..
        }
    ));
    assert_eq!(outcome.acknowledgement(), Acknowledgement::Ack);
    assert_eq!(harness.job(1).status, JobState::Failed);
}

#[tokio::test]
async fn test_message_customer_overrides_account() {
    let harness = Harness::new(ScriptedModel::sample_a());
    let message = harness.enqueue(1, JobType::FullPipeline).with_customer_id(42);

    harness.deliver(&message).await;

    let bills = harness.store.normalized_bills();
    assert_eq!(bills[0].customer_id, 42);
    assert_eq!(harness.warehouse.rows()[0].customer_id, 42);
}

#[tokio::test]
async fn test_parse_without_any_artifact_fails_terminally() {
    let harness = Harness::new(ScriptedModel::sample_a());
    let message = harness.enqueue(1, JobType::ParseBill);

    let outcome = harness.deliver(&message).await;

    assert!(matches!(
        outcome,
        HandlerOutcome::Failed {
            reason: FailureReason::NotFound,
            retryable: false,
            ..
        }
    ));
    assert_eq!(outcome.acknowledgement(), Acknowledgement::Ack);
    let job = harness.job(1);
    assert_eq!(job.status, JobState::Failed);
    assert_eq!(job.attempt_count, 1);
    assert_eq!(harness.model.call_count(), 0);
}

#[tokio::test]
async fn test_store_outage_defers_delivery() {
    let harness = Harness::new(ScriptedModel::sample_a());
    let message = harness.enqueue(1, JobType::FullPipeline);
    harness.store.set_unavailable(true);

    let outcome = harness.deliver(&message).await;

    assert!(matches!(outcome, HandlerOutcome::Deferred { .. }));
    assert_eq!(outcome.acknowledgement(), Acknowledgement::Nack);

    harness.store.set_unavailable(false);
    assert_eq!(harness.job(1).status, JobState::Pending);
    assert_eq!(harness.job(1).attempt_count, 0);
}

#[tokio::test]
async fn test_retry_after_failure_clears_error() {
    let model = ScriptedModel::sample_a().then(
        std::time::Duration::ZERO,
        Err(ExtractionError::model("transient")),
    );
    let harness = Harness::new(model);
    let message = harness.enqueue(1, JobType::FullPipeline);

    let first = harness.deliver(&message).await;
    assert_eq!(first.acknowledgement(), Acknowledgement::Nack);
    assert!(harness.job(1).error_message.is_some());

    let second = harness.deliver(&message).await;
    assert_eq!(second, HandlerOutcome::Succeeded);

    let job = harness.job(1);
    assert_eq!(job.status, JobState::Succeeded);
    assert_eq!(job.attempt_count, 2);
    assert!(job.error_message.is_none());
    assert!(job.failure_reason.is_none());
    // Each delivery ingested once; only the successful parse persisted
    assert_eq!(harness.store.artifacts().len(), 2);
    assert_eq!(harness.store.normalized_bills().len(), 1);
}

#[tokio::test]
async fn test_unknown_provider_uses_default_connector() {
    let harness = Harness::new(ScriptedModel::sample_a());
    harness
        .store
        .insert_account(Account::new(6, "CON_ED", CUSTOMER_ID));
    harness.store.insert_job(1, 6, JobType::FullPipeline);

    let outcome = harness
        .deliver(&JobMessage::new(1, 6, JobType::FullPipeline))
        .await;

    assert_eq!(outcome, HandlerOutcome::Succeeded);
    assert!(harness.model.prompts()[0].contains("UTILITY COMPANY A"));
}
