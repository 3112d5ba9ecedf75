use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use super::state::{AppEvent, AppState};
use crate::api::{self, DiagnosisBackend};
use crate::session::ChatOutcome;

/// Run validate-then-diagnose on the tokio runtime. The caller has already
/// moved the session into its loading state.
pub fn dispatch_submission(state: &Rc<RefCell<AppState>>) {
    let s = state.borrow();
    let Some(image) = s.session.image.clone() else {
        log::warn!("Submission dispatched without an image");
        return;
    };
    let audio = s.session.audio_wav.clone();
    let text = (!s.session.text.is_empty()).then(|| s.session.text.clone());
    let backend = s.backend.clone();
    let sender = s.events.clone();

    s.tokio_rt.spawn(async move {
        let outcome = api::run_submission(backend.as_ref(), image, audio, text).await;
        let _ = sender.send(AppEvent::SubmissionFinished(outcome)).await;
    });
}

/// Forward one chat message to the chatbot endpoint.
pub fn dispatch_chat(state: &Rc<RefCell<AppState>>, message: String) {
    let s = state.borrow();
    let backend = s.backend.clone();
    let sender = s.events.clone();

    s.tokio_rt.spawn(async move {
        let outcome = match backend.chat(&message).await {
            Ok(reply) => match reply.reply {
                Some(text) if !text.is_empty() => ChatOutcome::Reply(text),
                _ => ChatOutcome::Empty,
            },
            Err(e) => {
                log::error!("Chatbot request failed: {e}");
                ChatOutcome::Unavailable
            }
        };
        let _ = sender.send(AppEvent::ChatFinished(outcome)).await;
    });
}

/// Startup reachability check against `GET /health`.
pub fn dispatch_health(state: &Rc<RefCell<AppState>>) {
    let s = state.borrow();
    let backend = s.backend.clone();
    let sender = s.events.clone();

    s.tokio_rt.spawn(async move {
        let online = backend.health().await;
        let _ = sender.send(AppEvent::HealthChecked(online)).await;
    });
}

/// Resolve an approximate position for the hospital map search.
pub fn dispatch_location(state: &Rc<RefCell<AppState>>) {
    let s = state.borrow();
    let sender = s.events.clone();

    s.tokio_rt.spawn(async move {
        let position = match crate::geo::locate().await {
            Ok(position) => Some(position),
            Err(e) => {
                log::error!("Location lookup failed: {e}");
                None
            }
        };
        let _ = sender.send(AppEvent::LocationResolved(position)).await;
    });
}

/// Fetch the Grad-CAM image referenced by the diagnosis result.
pub fn dispatch_gradcam_fetch(state: &Rc<RefCell<AppState>>, asset_path: String) {
    let s = state.borrow();
    let backend = s.backend.clone();
    let sender = s.events.clone();

    s.tokio_rt.spawn(async move {
        let bytes = match backend.fetch_asset(&asset_path).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::warn!("Grad-CAM fetch failed: {e}");
                None
            }
        };
        let _ = sender.send(AppEvent::GradcamFetched(bytes)).await;
    });
}

/// Stream the PDF report into the user's download directory.
pub fn dispatch_report_download(state: &Rc<RefCell<AppState>>, report_path: String) {
    let s = state.borrow();
    let backend = s.backend.clone();
    let sender = s.events.clone();
    let dest = dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Diagnosis_Report.pdf");

    s.tokio_rt.spawn(async move {
        let saved = match backend.download_report(&report_path, &dest).await {
            Ok(()) => Some(dest),
            Err(e) => {
                log::error!("Report download failed: {e}");
                None
            }
        };
        let _ = sender.send(AppEvent::ReportSaved(saved)).await;
    });
}
