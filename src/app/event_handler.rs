use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use gtk4::prelude::*;
use libadwaita::prelude::*;

use super::recording::{delete_audio, start_recording, stop_recording};
use super::state::{update_status, AppEvent, AppState};
use super::submission;
use crate::api::SubmissionOutcome;
use crate::session::{ChatOutcome, RecordingPhase, SubmitBlocked};
use crate::ui;

const NO_IMAGE_NOTICE: &str = "Please choose a chest X-ray image first.";
const UNREACHABLE_NOTICE: &str = "The diagnosis service is not reachable.";
const LOCATION_NOTICE: &str =
    "Your location could not be determined. Check your network connection and try again.";

/// Handle one application event. This is the whole state machine: every
/// session mutation happens here, in event order.
pub fn handle_app_event(state: &Rc<RefCell<AppState>>, event: AppEvent) {
    match event {
        AppEvent::ImageChosen(path) => on_image_chosen(state, path),
        AppEvent::SymptomsEdited(text) => {
            state.borrow_mut().session.set_text(text);
        }
        AppEvent::StartRecording => {
            let phase = state.borrow().session.recording;
            if phase == RecordingPhase::Idle {
                start_recording(state);
            } else {
                log::info!("Ignoring record request while phase={phase:?}");
            }
        }
        AppEvent::StopRecording => {
            let phase = state.borrow().session.recording;
            if phase == RecordingPhase::Recording {
                stop_recording(state);
            } else {
                log::info!("Ignoring stop request while phase={phase:?}");
            }
        }
        AppEvent::DeleteAudio => delete_audio(state),
        AppEvent::SubmitRequested => on_submit(state),
        AppEvent::ResetRequested => on_reset(state),
        AppEvent::ChatSubmitted => on_chat_submitted(state),
        AppEvent::FindHospitals => {
            update_status(state, "Locating nearby hospitals...");
            submission::dispatch_location(state);
        }
        AppEvent::DownloadReport => on_download_report(state),
        AppEvent::HealthChecked(online) => {
            let text = if online {
                "Service online"
            } else {
                "Service offline. Start the diagnosis backend."
            };
            update_status(state, text);
        }
        AppEvent::SubmissionFinished(outcome) => on_submission_finished(state, outcome),
        AppEvent::ChatFinished(outcome) => on_chat_finished(state, outcome),
        AppEvent::LocationResolved(position) => on_location_resolved(state, position),
        AppEvent::GradcamFetched(bytes) => on_gradcam_fetched(state, bytes),
        AppEvent::ReportSaved(dest) => on_report_saved(state, dest),
        AppEvent::RecordingTick => {
            let s = state.borrow();
            if let (Some(start), Some(ref win)) = (s.recording_start, &s.window) {
                let elapsed = start.elapsed().as_secs();
                win.timer_label
                    .set_text(&format!("{:02}:{:02}", elapsed / 60, elapsed % 60));
            }
        }
        AppEvent::AudioLevel(level) => {
            let s = state.borrow();
            if let Some(ref win) = s.window {
                // Speech RMS rarely exceeds 0.25; stretch for a readable meter.
                win.level_bar.set_value((level as f64 * 4.0).clamp(0.0, 1.0));
            }
        }
    }
}

fn on_image_chosen(state: &Rc<RefCell<AppState>>, path: PathBuf) {
    log::info!("X-ray selected: {}", path.display());
    let mut s = state.borrow_mut();
    s.session.select_image(path.clone());
    if let Some(ref win) = s.window {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("selected image");
        win.image_row.set_subtitle(name);
        win.preview.set_filename(Some(&path));
        win.preview.set_visible(true);
    }
}

fn on_submit(state: &Rc<RefCell<AppState>>) {
    let started = state.borrow_mut().session.begin_submission();
    match started {
        Err(SubmitBlocked::NoImage) => {
            show_notice(state, "Image required", NO_IMAGE_NOTICE);
        }
        Err(SubmitBlocked::InFlight) => {
            log::info!("Ignoring submit while a diagnosis is in flight");
        }
        Ok(()) => {
            {
                let mut s = state.borrow_mut();
                if let Some(ref win) = s.window {
                    win.result_group.set_visible(false);
                    win.gradcam_picture.set_paintable(gtk4::gdk::Paintable::NONE);
                    win.gradcam_box.set_visible(false);
                    win.busy_spinner.set_visible(true);
                    win.busy_spinner.set_spinning(true);
                    win.diagnose_button.set_sensitive(false);
                    win.use_audio_button.set_sensitive(false);
                }
                // The old explainability image belongs to the cleared result.
                if let Some(path) = s.gradcam_preview.take() {
                    s.scratch.release(&path);
                }
            }
            update_status(state, "Submitting for diagnosis...");
            submission::dispatch_submission(state);
        }
    }
}

fn on_submission_finished(state: &Rc<RefCell<AppState>>, outcome: SubmissionOutcome) {
    state.borrow_mut().session.submission_done();
    {
        let s = state.borrow();
        if let Some(ref win) = s.window {
            win.busy_spinner.set_spinning(false);
            win.busy_spinner.set_visible(false);
            win.diagnose_button.set_sensitive(true);
            win.use_audio_button.set_sensitive(true);
        }
    }

    match outcome {
        SubmissionOutcome::Rejected(notice) => {
            update_status(state, "Image rejected");
            show_notice(state, "Validation failed", &notice);
        }
        SubmissionOutcome::Unreachable => {
            update_status(state, "Service unreachable");
            show_notice(state, "Service unreachable", UNREACHABLE_NOTICE);
        }
        SubmissionOutcome::Completed(result) => {
            log::info!(
                "Diagnosis: {} (confidence {})",
                result.image_prediction,
                result.image_confidence
            );
            state.borrow_mut().session.apply_result(result.clone());

            {
                let s = state.borrow();
                if let (Some(chat), Some(entry)) =
                    (s.chat_panel.as_ref(), s.session.chat.last())
                {
                    ui::chat::append_entry(chat, entry);
                }
                if let Some(ref win) = s.window {
                    win.prediction_label.set_text(&result.image_prediction);
                    win.confidence_label
                        .set_text(&result.image_confidence.to_string());

                    match &result.pneumonia_type {
                        Some(kind) => {
                            win.type_label.set_text(kind);
                            win.type_row.set_visible(true);
                        }
                        None => win.type_row.set_visible(false),
                    }
                    match &result.recommendation {
                        Some(recommendation) => {
                            win.recommendation_row.set_subtitle(recommendation);
                            win.recommendation_row.set_visible(true);
                        }
                        None => win.recommendation_row.set_visible(false),
                    }

                    if !s.session.transcription.is_empty() {
                        win.transcription_view
                            .buffer()
                            .set_text(&s.session.transcription);
                        win.transcription_group.set_visible(true);
                    }

                    win.hospital_button.set_visible(s.session.show_hospital_action);
                    win.report_button.set_visible(result.report_path.is_some());
                    win.result_group.set_visible(true);
                }
            }
            update_status(state, "Diagnosis complete");

            if let Some(asset) = result.gradcam_image {
                submission::dispatch_gradcam_fetch(state, asset);
            }
        }
    }
}

fn on_chat_submitted(state: &Rc<RefCell<AppState>>) {
    let input = {
        let s = state.borrow();
        match s.chat_panel {
            Some(ref chat) => chat.input.text().to_string(),
            None => return,
        }
    };

    let Some(message) = state.borrow_mut().session.begin_chat(&input) else {
        return;
    };

    {
        let s = state.borrow();
        if let Some(ref chat) = s.chat_panel {
            chat.input.set_text("");
            chat.send_button.set_sensitive(false);
            chat.thinking_label.set_visible(true);
            if let Some(entry) = s.session.chat.last() {
                ui::chat::append_entry(chat, entry);
            }
        }
    }
    submission::dispatch_chat(state, message);
}

fn on_chat_finished(state: &Rc<RefCell<AppState>>, outcome: ChatOutcome) {
    state.borrow_mut().session.finish_chat(outcome);
    let s = state.borrow();
    if let Some(ref chat) = s.chat_panel {
        chat.send_button.set_sensitive(true);
        chat.thinking_label.set_visible(false);
        if let Some(entry) = s.session.chat.last() {
            ui::chat::append_entry(chat, entry);
        }
    }
}

fn on_location_resolved(state: &Rc<RefCell<AppState>>, position: Option<(f64, f64)>) {
    match position {
        Some((lat, lon)) => {
            let url = crate::geo::hospital_search_url(lat, lon);
            log::info!("Opening map search: {url}");
            {
                let s = state.borrow();
                if let Some(ref win) = s.window {
                    gtk4::UriLauncher::new(&url).launch(
                        Some(&win.window),
                        None::<&gtk4::gio::Cancellable>,
                        |result| {
                            if let Err(e) = result {
                                log::warn!("Could not open map search: {e}");
                            }
                        },
                    );
                }
            }
            update_status(state, "Diagnosis complete");
        }
        None => {
            update_status(state, "Diagnosis complete");
            show_notice(state, "Location unavailable", LOCATION_NOTICE);
        }
    }
}

fn on_gradcam_fetched(state: &Rc<RefCell<AppState>>, bytes: Option<Vec<u8>>) {
    let Some(bytes) = bytes else {
        log::warn!("No Grad-CAM image available for this result");
        return;
    };

    let mut s = state.borrow_mut();
    match s.scratch.materialize("gradcam", "png", &bytes) {
        Ok(path) => {
            if let Some(old) = s.gradcam_preview.take() {
                s.scratch.release(&old);
            }
            if let Some(ref win) = s.window {
                win.gradcam_picture.set_filename(Some(&path));
                win.gradcam_box.set_visible(true);
            }
            s.gradcam_preview = Some(path);
        }
        Err(e) => log::warn!("Could not materialize Grad-CAM preview: {e}"),
    }
}

fn on_download_report(state: &Rc<RefCell<AppState>>) {
    let report_path = state
        .borrow()
        .session
        .result
        .as_ref()
        .and_then(|r| r.report_path.clone());
    match report_path {
        Some(path) => {
            update_status(state, "Downloading report...");
            submission::dispatch_report_download(state, path);
        }
        None => log::warn!("Report requested without a report path"),
    }
}

fn on_report_saved(state: &Rc<RefCell<AppState>>, dest: Option<PathBuf>) {
    update_status(state, "Diagnosis complete");
    match dest {
        Some(dest) => {
            let s = state.borrow();
            if let Some(ref win) = s.window {
                let toast =
                    libadwaita::Toast::new(&format!("Report saved to {}", dest.display()));
                toast.set_timeout(3);
                win.toasts.add_toast(toast);
            }
        }
        None => {
            show_notice(
                state,
                "Download failed",
                "The report could not be downloaded. Try again.",
            );
        }
    }
}

fn on_reset(state: &Rc<RefCell<AppState>>) {
    log::info!("Session reset");
    {
        let mut s = state.borrow_mut();

        // Stop any live capture first.
        if let Some(source) = s.tick_source.take() {
            source.remove();
        }
        s.capture_stream = None;
        s.recording_start = None;
        s.capture_buffer.lock().unwrap().clear();

        // Detach widgets from preview files, then release the files.
        if let Some(ref win) = s.window {
            win.audio_controls.set_media_stream(None::<&gtk4::MediaStream>);
            win.gradcam_picture.set_paintable(gtk4::gdk::Paintable::NONE);
            win.preview.set_paintable(gtk4::gdk::Paintable::NONE);
        }
        if let Some(path) = s.audio_preview.take() {
            s.scratch.release(&path);
        }
        if let Some(path) = s.gradcam_preview.take() {
            s.scratch.release(&path);
        }

        s.session.reset();

        if let Some(ref win) = s.window {
            win.image_row.set_subtitle("No file selected");
            win.preview.set_visible(false);
            win.symptoms_view.buffer().set_text("");
            win.transcription_view.buffer().set_text("");
            win.transcription_group.set_visible(false);
            win.result_group.set_visible(false);
            win.gradcam_box.set_visible(false);
            win.busy_spinner.set_spinning(false);
            win.busy_spinner.set_visible(false);
            win.diagnose_button.set_sensitive(true);
            win.use_audio_button.set_sensitive(true);
            win.record_button.set_visible(true);
            win.recording_box.set_visible(false);
            win.captured_box.set_visible(false);
            win.timer_label.set_text("00:00");
            win.level_bar.set_value(0.0);
        }
        if let Some(ref chat) = s.chat_panel {
            chat.input.set_text("");
            chat.send_button.set_sensitive(true);
            chat.thinking_label.set_visible(false);
            ui::chat::reset_transcript(chat, &s.session.chat);
        }
    }
    update_status(state, "Ready");
}

/// Blocking notice dialog over the main window.
pub(crate) fn show_notice(state: &Rc<RefCell<AppState>>, heading: &str, body: &str) {
    let s = state.borrow();
    let Some(ref win) = s.window else {
        return;
    };
    let dialog = libadwaita::AlertDialog::builder()
        .heading(heading)
        .body(body)
        .build();
    dialog.add_response("ok", "OK");
    let parent: Option<&gtk4::Widget> = Some(win.window.upcast_ref());
    dialog.choose(parent, None::<&gtk4::gio::Cancellable>, |_response| {});
}
