use std::path::{Path, PathBuf};
use std::sync::Mutex;

use pneumoscan::api::{
    run_submission, BackendError, ChatReply, Confidence, DiagnoseReply, DiagnosisBackend,
    DiagnosisResult, SubmissionOutcome, ValidationReply, INVALID_IMAGE_NOTICE,
};
use pneumoscan::session::{ChatOutcome, ChatRole, Session, CHAT_GREETING};

/// Records every call so tests can assert on the wire protocol without a
/// running service.
#[derive(Default)]
struct StubBackend {
    valid: bool,
    validation_message: Option<String>,
    validate_unreachable: bool,
    diagnose_unreachable: bool,
    result: Option<DiagnosisResult>,
    validate_calls: Mutex<Vec<PathBuf>>,
    diagnose_calls: Mutex<Vec<(PathBuf, bool, Option<String>)>>,
}

#[async_trait::async_trait]
impl DiagnosisBackend for StubBackend {
    async fn validate_image(&self, image: &Path) -> Result<ValidationReply, BackendError> {
        self.validate_calls.lock().unwrap().push(image.to_path_buf());
        if self.validate_unreachable {
            return Err("connection refused".into());
        }
        Ok(ValidationReply {
            valid: self.valid,
            message: self.validation_message.clone(),
            confidence: None,
        })
    }

    async fn diagnose(
        &self,
        image: &Path,
        audio_wav: Option<Vec<u8>>,
        text: Option<String>,
    ) -> Result<DiagnoseReply, BackendError> {
        self.diagnose_calls
            .lock()
            .unwrap()
            .push((image.to_path_buf(), audio_wav.is_some(), text));
        if self.diagnose_unreachable {
            return Err("connection reset".into());
        }
        let result = self.result.clone().expect("stub diagnose called without a result");
        Ok(DiagnoseReply::Completed(result))
    }

    async fn chat(&self, message: &str) -> Result<ChatReply, BackendError> {
        Ok(ChatReply {
            reply: Some(format!("echo: {message}")),
        })
    }
}

fn pneumonia_result() -> DiagnosisResult {
    DiagnosisResult {
        image_prediction: "Pneumonia".into(),
        image_confidence: Confidence::Number(0.92),
        transcription: None,
        pneumonia_type: Some("Bacterial".into()),
        recommendation: Some("Physician consultation is strongly recommended.".into()),
        gradcam_image: Some("static/gradcam/xray_cam.png".into()),
        report_path: Some("reports/report_42.pdf".into()),
    }
}

#[tokio::test]
async fn rejected_validation_skips_diagnosis() {
    let backend = StubBackend {
        valid: false,
        validation_message: Some("Not a chest X-ray.".into()),
        ..Default::default()
    };

    let outcome = run_submission(&backend, PathBuf::from("/tmp/xray.png"), None, None).await;

    match outcome {
        SubmissionOutcome::Rejected(notice) => assert_eq!(notice, "Not a chest X-ray."),
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(backend.validate_calls.lock().unwrap().len(), 1);
    assert!(backend.diagnose_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rejection_without_message_uses_default_notice() {
    let backend = StubBackend {
        valid: false,
        ..Default::default()
    };

    let outcome = run_submission(&backend, PathBuf::from("/tmp/xray.png"), None, None).await;

    match outcome {
        SubmissionOutcome::Rejected(notice) => assert_eq!(notice, INVALID_IMAGE_NOTICE),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_validation_never_reaches_diagnose() {
    let backend = StubBackend {
        validate_unreachable: true,
        ..Default::default()
    };

    let outcome = run_submission(&backend, PathBuf::from("/tmp/xray.png"), None, None).await;

    assert!(matches!(outcome, SubmissionOutcome::Unreachable));
    assert!(backend.diagnose_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_diagnose_reports_failure() {
    let backend = StubBackend {
        valid: true,
        diagnose_unreachable: true,
        ..Default::default()
    };

    let outcome = run_submission(&backend, PathBuf::from("/tmp/xray.png"), None, None).await;

    assert!(matches!(outcome, SubmissionOutcome::Unreachable));
}

#[tokio::test]
async fn accepted_image_forwards_all_modalities() {
    let backend = StubBackend {
        valid: true,
        result: Some(pneumonia_result()),
        ..Default::default()
    };

    let outcome = run_submission(
        &backend,
        PathBuf::from("/tmp/xray.png"),
        Some(vec![0x52, 0x49, 0x46, 0x46]),
        Some("cough, fever".into()),
    )
    .await;

    assert!(matches!(outcome, SubmissionOutcome::Completed(_)));

    let calls = backend.diagnose_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (image, had_audio, text) = &calls[0];
    assert_eq!(image, &PathBuf::from("/tmp/xray.png"));
    assert!(had_audio);
    assert_eq!(text.as_deref(), Some("cough, fever"));
}

#[tokio::test]
async fn pneumonia_submission_updates_session_and_transcript() {
    let backend = StubBackend {
        valid: true,
        result: Some(pneumonia_result()),
        ..Default::default()
    };

    let mut session = Session::new();
    session.select_image(PathBuf::from("/tmp/xray.png"));
    session.set_text("cough, fever".into());
    session.begin_submission().unwrap();
    assert!(session.loading);

    let outcome = run_submission(
        &backend,
        session.image.clone().unwrap(),
        session.audio_wav.clone(),
        Some(session.text.clone()),
    )
    .await;

    match outcome {
        SubmissionOutcome::Completed(result) => session.apply_result(result),
        other => panic!("expected completion, got {other:?}"),
    }
    session.submission_done();

    assert!(!session.loading);
    assert!(session.show_hospital_action);

    // One bot entry was appended after the greeting, naming the prediction
    // and its confidence.
    assert_eq!(session.chat.len(), 2);
    let summary = &session.chat[1];
    assert_eq!(summary.role, ChatRole::Bot);
    assert!(summary.text.contains("Pneumonia"));
    assert!(summary.text.contains("0.92"));
}

#[tokio::test]
async fn normal_submission_leaves_hospital_action_hidden() {
    let backend = StubBackend {
        valid: true,
        result: Some(DiagnosisResult {
            image_prediction: "Normal".into(),
            image_confidence: Confidence::Number(0.97),
            transcription: None,
            pneumonia_type: None,
            recommendation: None,
            gradcam_image: None,
            report_path: None,
        }),
        ..Default::default()
    };

    let mut session = Session::new();
    session.select_image(PathBuf::from("/tmp/xray.png"));
    session.begin_submission().unwrap();

    match run_submission(&backend, session.image.clone().unwrap(), None, None).await {
        SubmissionOutcome::Completed(result) => session.apply_result(result),
        other => panic!("expected completion, got {other:?}"),
    }
    session.submission_done();

    assert!(!session.show_hospital_action);
    assert!(!session.loading);
}

#[tokio::test]
async fn chat_round_trip_appends_user_then_bot() {
    let backend = StubBackend::default();

    let mut session = Session::new();
    let message = session.begin_chat("what is pneumonia?").unwrap();
    assert_eq!(message, "what is pneumonia?");

    let outcome = match backend.chat(&message).await {
        Ok(reply) => match reply.reply {
            Some(text) if !text.is_empty() => ChatOutcome::Reply(text),
            _ => ChatOutcome::Empty,
        },
        Err(_) => ChatOutcome::Unavailable,
    };
    session.finish_chat(outcome);

    assert_eq!(session.chat.len(), 3);
    assert_eq!(session.chat[0].text, CHAT_GREETING);
    assert_eq!(session.chat[1].role, ChatRole::User);
    assert_eq!(session.chat[1].text, "what is pneumonia?");
    assert_eq!(session.chat[2].role, ChatRole::Bot);
    assert_eq!(session.chat[2].text, "echo: what is pneumonia?");
    assert!(!session.chat_loading);
}

#[tokio::test]
async fn transcription_from_audio_submission_is_stored() {
    let backend = StubBackend {
        valid: true,
        result: Some(DiagnosisResult {
            transcription: Some("I have had a dry cough for three days".into()),
            ..pneumonia_result()
        }),
        ..Default::default()
    };

    let mut session = Session::new();
    session.select_image(PathBuf::from("/tmp/xray.png"));
    session.begin_recording();
    session.finish_recording(vec![0u8; 32]);
    session.begin_submission().unwrap();

    match run_submission(
        &backend,
        session.image.clone().unwrap(),
        session.audio_wav.clone(),
        None,
    )
    .await
    {
        SubmissionOutcome::Completed(result) => session.apply_result(result),
        other => panic!("expected completion, got {other:?}"),
    }
    session.submission_done();

    assert_eq!(session.transcription, "I have had a dry cough for three days");

    // Deleting the audio afterwards also drops the transcription.
    session.delete_audio();
    assert!(session.transcription.is_empty());
}
