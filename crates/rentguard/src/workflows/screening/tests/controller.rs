use std::sync::Arc;
use std::time::Duration;

use super::common::*;
use crate::remote::TransportError;
use crate::workflows::screening::{
    ErrorKind, Language, ProgressStage, ScamLikelihood, SubmissionError, SubmissionState,
};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn submit_without_input_is_rejected_locally() {
    let backend = Arc::new(RecordingBackend::answering(result(
        ScamLikelihood::Low,
        clauses(0, 2),
    )));
    let controller = controller(backend.clone());

    match controller.submit(Language::English, false).await {
        Err(SubmissionError::Validation) => {}
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(backend.calls().is_empty());
    assert_eq!(controller.state(), SubmissionState::Idle);
}

#[tokio::test]
async fn removing_every_file_restores_the_precondition() {
    let backend = Arc::new(RecordingBackend::answering(result(
        ScamLikelihood::Low,
        clauses(0, 2),
    )));
    let controller = controller(backend.clone());

    let count = controller
        .select_files([lease("a.pdf"), lease("b.pdf"), lease("c.pdf")])
        .expect("idle controller accepts files");
    assert_eq!(count, 3);
    for _ in 0..count {
        assert!(controller.remove_file(0).expect("not uploading").is_some());
    }
    assert_eq!(controller.remove_file(0).expect("not uploading"), None);
    assert!(controller.pending_files().is_empty());

    match controller.submit(Language::English, false).await {
        Err(SubmissionError::Validation) => {}
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn dispatch_follows_file_count() {
    let backend = Arc::new(RecordingBackend::answering(result(
        ScamLikelihood::Medium,
        clauses(1, 3),
    )));
    let controller = controller(backend.clone());

    controller
        .set_address(Some("12 Harbor Road".to_string()))
        .expect("idle");
    controller
        .submit(Language::Korean, true)
        .await
        .expect("listing analysis succeeds");

    controller.select_files([lease("lease.pdf")]).expect("idle");
    controller
        .submit(Language::Korean, true)
        .await
        .expect("single upload succeeds");

    controller
        .select_files([lease("addendum.docx"), lease("photos.txt")])
        .expect("idle");
    controller
        .submit(Language::Korean, true)
        .await
        .expect("batch upload succeeds");

    let calls = backend.calls();
    assert_eq!(calls.len(), 3);
    match &calls[0] {
        AnalysisCall::Listing(fields) => {
            assert_eq!(fields.property_address.as_deref(), Some("12 Harbor Road"));
            assert_eq!(fields.language, Language::Korean);
            assert!(fields.voice_output);
        }
        other => panic!("expected listing analysis, got {other:?}"),
    }
    assert_eq!(calls[1], AnalysisCall::Document("lease.pdf".to_string()));
    assert_eq!(
        calls[2],
        AnalysisCall::Documents(vec![
            "lease.pdf".to_string(),
            "addendum.docx".to_string(),
            "photos.txt".to_string(),
        ])
    );
}

#[tokio::test(start_paused = true)]
async fn concurrent_submit_is_rejected_without_a_second_call() {
    let backend = Arc::new(
        RecordingBackend::answering(result(ScamLikelihood::Low, clauses(0, 1)))
            .delayed(Duration::from_secs(2)),
    );
    let controller = controller(backend.clone());
    controller.select_files([lease("lease.pdf")]).expect("idle");

    let (first, second) = tokio::join!(
        controller.submit(Language::English, false),
        controller.submit(Language::English, false),
    );

    assert!(first.is_ok(), "first submit failed: {first:?}");
    match second {
        Err(SubmissionError::Busy) => {}
        other => panic!("expected busy rejection, got {other:?}"),
    }
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn progress_advances_while_waiting_and_settles_at_100() {
    let backend = Arc::new(
        RecordingBackend::answering(result(ScamLikelihood::Low, clauses(0, 1)))
            .delayed(Duration::from_secs(3)),
    );
    let controller = controller(backend.clone());
    controller.select_files([lease("lease.pdf")]).expect("idle");
    let mut updates = controller.subscribe();

    let observer = async {
        tokio::time::sleep(Duration::from_millis(1600)).await;
        let observed = controller.state();
        match controller.select_files([lease("late.pdf")]) {
            Err(SubmissionError::Busy) => {}
            other => panic!("expected busy while uploading, got {other:?}"),
        }
        observed
    };
    let (outcome, mid_flight) = tokio::join!(controller.submit(Language::English, false), observer);

    assert_eq!(
        mid_flight,
        SubmissionState::Uploading {
            progress: 6,
            stage: ProgressStage::Extracting,
        }
    );
    outcome.expect("analysis succeeds");

    let settled = updates.borrow_and_update().clone();
    assert_eq!(settled.progress(), Some(100));
    assert!(settled.result().is_some());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(
        !updates.has_changed().expect("controller alive"),
        "progress ticked after the analysis settled"
    );
    assert_eq!(controller.pending_files().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn long_waits_hold_at_the_progress_cap() {
    let backend = Arc::new(
        RecordingBackend::answering(result(ScamLikelihood::Low, clauses(0, 1)))
            .delayed(Duration::from_secs(60)),
    );
    let controller = controller(backend);
    controller.select_files([lease("lease.pdf")]).expect("idle");

    let observer = async {
        tokio::time::sleep(Duration::from_secs(59)).await;
        controller.state()
    };
    let (outcome, mid_flight) = tokio::join!(controller.submit(Language::English, false), observer);

    outcome.expect("analysis succeeds");
    assert_eq!(
        mid_flight,
        SubmissionState::Uploading {
            progress: 95,
            stage: ProgressStage::Finalizing,
        }
    );
}

#[tokio::test]
async fn missing_explanation_is_a_malformed_response() {
    let mut incomplete = result(ScamLikelihood::High, clauses(2, 2));
    incomplete.explanation = "  ".to_string();
    let backend = Arc::new(RecordingBackend::answering(incomplete));
    let controller = controller(backend);
    controller.select_files([lease("lease.pdf")]).expect("idle");

    let error = controller
        .submit(Language::English, false)
        .await
        .expect_err("blank explanation rejected");
    assert_eq!(error.kind(), ErrorKind::MalformedResponse);
    assert_eq!(controller.state(), SubmissionState::Failed(error));
    assert!(controller.display_metrics().is_none());
}

#[tokio::test]
async fn server_details_are_classified() {
    let backend = Arc::new(RecordingBackend::failing(TransportError::Status {
        status: 413,
        message: "File size exceeds the 10MB limit".to_string(),
    }));
    let controller = controller(backend);
    controller.select_files([lease("scan.pdf")]).expect("idle");

    match controller.submit(Language::English, false).await {
        Err(SubmissionError::FileTooLarge(message)) => {
            assert_eq!(message, "File size exceeds the 10MB limit")
        }
        other => panic!("expected file too large, got {other:?}"),
    }
    assert_eq!(
        controller.state().error().map(SubmissionError::kind),
        Some(ErrorKind::FileTooLarge)
    );
}

#[tokio::test]
async fn reset_and_new_files_clear_a_settled_outcome() {
    let backend = Arc::new(RecordingBackend::answering(result(
        ScamLikelihood::High,
        clauses(5, 5),
    )));
    let controller = controller(backend);
    controller.select_files([lease("lease.pdf")]).expect("idle");

    controller
        .submit(Language::Spanish, false)
        .await
        .expect("analysis succeeds");
    let metrics = controller.display_metrics().expect("settled result");
    assert_eq!(metrics.score, 44);

    controller.reset().expect("settled controller resets");
    assert_eq!(controller.state(), SubmissionState::Idle);
    assert_eq!(controller.pending_files().len(), 1);

    controller
        .submit(Language::Spanish, false)
        .await
        .expect("resubmission succeeds");
    controller.select_files([lease("more.pdf")]).expect("idle");
    assert_eq!(controller.state(), SubmissionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn dropped_submission_frees_the_slot() {
    let backend = Arc::new(
        RecordingBackend::answering(result(ScamLikelihood::Low, clauses(0, 1)))
            .delayed(Duration::from_secs(30)),
    );
    let controller = controller(backend.clone());
    controller.select_files([lease("lease.pdf")]).expect("idle");

    let timed_out = tokio::time::timeout(
        Duration::from_secs(1),
        controller.submit(Language::English, false),
    )
    .await;
    assert!(timed_out.is_err());
    assert_eq!(controller.state(), SubmissionState::Idle);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(controller.state(), SubmissionState::Idle);
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test]
async fn settled_slot_must_return_to_idle_before_resubmitting() {
    let backend = Arc::new(RecordingBackend::answering(result(
        ScamLikelihood::Low,
        clauses(0, 2),
    )));
    let controller = controller(backend.clone());
    controller.select_files([lease("lease.pdf")]).expect("idle");
    controller
        .submit(Language::English, false)
        .await
        .expect("analysis succeeds");

    let mut updates = controller.subscribe();
    match controller.submit(Language::English, false).await {
        Err(SubmissionError::Settled) => {}
        other => panic!("expected settled rejection, got {other:?}"),
    }
    assert!(!updates.has_changed().expect("controller alive"));
    assert!(matches!(controller.state(), SubmissionState::Succeeded(_)));
    assert_eq!(backend.calls().len(), 1);

    controller.reset().expect("settled controller resets");
    assert!(updates.has_changed().expect("controller alive"));
    assert_eq!(*updates.borrow_and_update(), SubmissionState::Idle);

    controller
        .submit(Language::English, false)
        .await
        .expect("resubmission from idle succeeds");
    assert_eq!(backend.calls().len(), 2);
}
