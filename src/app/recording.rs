use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gtk4::glib;
use gtk4::prelude::*;

use super::event_handler::show_notice;
use super::state::{AppEvent, AppState};

/// Start capturing symptoms audio from the microphone.
pub fn start_recording(state: &Rc<RefCell<AppState>>) {
    log::info!("Starting voice capture");

    {
        let s = state.borrow();
        s.capture_buffer.lock().unwrap().clear();
    }

    let buffer = state.borrow().capture_buffer.clone();
    match crate::recorder::start_capture(buffer) {
        Ok((stream, sample_rate)) => {
            let mut s = state.borrow_mut();
            s.capture_stream = Some(stream);
            s.sample_rate = sample_rate;
            s.recording_start = Some(std::time::Instant::now());
            s.session.begin_recording();

            if let Some(ref win) = s.window {
                win.record_button.set_visible(false);
                win.captured_box.set_visible(false);
                win.timer_label.set_text("00:00");
                win.level_bar.set_value(0.0);
                win.recording_box.set_visible(true);
            }
        }
        Err(e) => {
            log::error!("Could not open microphone: {e}");
            show_notice(
                state,
                "Microphone unavailable",
                &format!("Recording could not start: {e}"),
            );
            return;
        }
    }

    // 100ms tick for the level meter; timer label updates once a second.
    let sender = state.borrow().events.clone();
    let level_buffer = state.borrow().capture_buffer.clone();
    let ticks = Arc::new(AtomicUsize::new(0));

    let source = glib::timeout_add_local(std::time::Duration::from_millis(100), move || {
        let rms = compute_rms(&level_buffer);
        let _ = sender.try_send(AppEvent::AudioLevel(rms));

        if ticks.fetch_add(1, Ordering::Relaxed) % 10 == 0 {
            let _ = sender.try_send(AppEvent::RecordingTick);
        }

        glib::ControlFlow::Continue
    });
    state.borrow_mut().tick_source = Some(source);
}

/// RMS of the newest ~100ms of samples in the capture buffer.
fn compute_rms(buffer: &Arc<std::sync::Mutex<Vec<f32>>>) -> f32 {
    let buf = buffer.lock().unwrap();
    let n = buf.len().min(1600);
    if n == 0 {
        return 0.0;
    }
    let start = buf.len() - n;
    let sum_sq: f32 = buf[start..].iter().map(|&s| s * s).sum();
    (sum_sq / n as f32).sqrt()
}

/// Stop capturing and finalize the buffer into an uploadable WAV plus a
/// playback preview.
pub fn stop_recording(state: &Rc<RefCell<AppState>>) {
    log::info!("Stopping voice capture");

    if let Some(source) = state.borrow_mut().tick_source.take() {
        source.remove();
    }
    state.borrow_mut().capture_stream = None;
    state.borrow_mut().recording_start = None;

    let samples: Vec<f32> = state.borrow().capture_buffer.lock().unwrap().clone();
    let sample_rate = state.borrow().sample_rate;

    if samples.is_empty() {
        let mut s = state.borrow_mut();
        s.session.cancel_recording();
        if let Some(ref win) = s.window {
            win.recording_box.set_visible(false);
            win.record_button.set_visible(true);
            let toast = libadwaita::Toast::new("No audio was captured.");
            toast.set_timeout(2);
            win.toasts.add_toast(toast);
        }
        return;
    }

    log::info!(
        "Captured {} samples ({:.1}s at {}Hz)",
        samples.len(),
        samples.len() as f32 / sample_rate as f32,
        sample_rate
    );

    let wav = match crate::recorder::samples_to_wav(&samples, sample_rate) {
        Ok(wav) => wav,
        Err(e) => {
            log::error!("WAV encoding failed: {e}");
            {
                let mut s = state.borrow_mut();
                s.session.cancel_recording();
                if let Some(ref win) = s.window {
                    win.recording_box.set_visible(false);
                    win.record_button.set_visible(true);
                }
            }
            show_notice(
                state,
                "Recording failed",
                &format!("The capture could not be encoded: {e}"),
            );
            return;
        }
    };

    let mut s = state.borrow_mut();

    // A superseded playback preview must be released before it is replaced.
    if let Some(old) = s.audio_preview.take() {
        if let Some(ref win) = s.window {
            win.audio_controls.set_media_stream(None::<&gtk4::MediaStream>);
        }
        s.scratch.release(&old);
    }

    match s.scratch.materialize("capture", "wav", &wav) {
        Ok(path) => {
            if let Some(ref win) = s.window {
                let media = gtk4::MediaFile::for_filename(&path);
                win.audio_controls.set_media_stream(Some(&media));
            }
            s.audio_preview = Some(path);
        }
        Err(e) => log::warn!("Could not materialize playback preview: {e}"),
    }

    s.session.finish_recording(wav);
    if let Some(ref win) = s.window {
        win.recording_box.set_visible(false);
        win.captured_box.set_visible(true);
    }
}

/// Discard the captured audio and the transcription derived from it.
pub fn delete_audio(state: &Rc<RefCell<AppState>>) {
    log::info!("Deleting captured audio");

    let mut s = state.borrow_mut();
    if let Some(ref win) = s.window {
        win.audio_controls.set_media_stream(None::<&gtk4::MediaStream>);
    }
    if let Some(path) = s.audio_preview.take() {
        s.scratch.release(&path);
    }
    s.session.delete_audio();

    if let Some(ref win) = s.window {
        win.transcription_view.buffer().set_text("");
        win.transcription_group.set_visible(false);
        win.captured_box.set_visible(false);
        win.record_button.set_visible(true);
    }
}
