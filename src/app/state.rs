use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use gtk4::glib;

use crate::api::{HttpBackend, SubmissionOutcome};
use crate::config::Config;
use crate::scratch::ScratchRegistry;
use crate::session::{ChatOutcome, Session};
use crate::ui::chat::ChatWidgets;
use crate::ui::window::WindowWidgets;

/// Every interaction and every background completion becomes one of these,
/// applied in order by a single handler on the GTK main thread. Overlapping
/// network calls can resolve in any order, but their state changes cannot
/// interleave.
#[derive(Debug, Clone)]
pub enum AppEvent {
    // User interactions
    ImageChosen(PathBuf),
    SymptomsEdited(String),
    StartRecording,
    StopRecording,
    DeleteAudio,
    SubmitRequested,
    ResetRequested,
    ChatSubmitted,
    FindHospitals,
    DownloadReport,

    // Background completions
    HealthChecked(bool),
    SubmissionFinished(SubmissionOutcome),
    ChatFinished(ChatOutcome),
    LocationResolved(Option<(f64, f64)>),
    GradcamFetched(Option<Vec<u8>>),
    ReportSaved(Option<PathBuf>),
    RecordingTick,
    AudioLevel(f32),
}

/// Central application state. Lives on the GTK main thread inside Rc<RefCell<>>.
pub struct AppState {
    pub session: Session,
    pub config: Config,
    pub backend: Arc<HttpBackend>,
    pub scratch: ScratchRegistry,
    pub tokio_rt: tokio::runtime::Runtime,
    pub events: async_channel::Sender<AppEvent>,

    // Voice capture plumbing
    pub capture_buffer: Arc<Mutex<Vec<f32>>>,
    pub capture_stream: Option<cpal::Stream>,
    pub sample_rate: u32,
    pub recording_start: Option<std::time::Instant>,
    pub tick_source: Option<glib::SourceId>,

    // Live preview files; released when superseded or on reset
    pub audio_preview: Option<PathBuf>,
    pub gradcam_preview: Option<PathBuf>,

    // UI handles
    pub window: Option<WindowWidgets>,
    pub chat_panel: Option<ChatWidgets>,
}

impl AppState {
    pub fn new(events: async_channel::Sender<AppEvent>) -> Self {
        let config = Config::load();
        let backend = Arc::new(HttpBackend::new(config.backend_url.clone()));
        let tokio_rt =
            tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");

        Self {
            session: Session::new(),
            config,
            backend,
            scratch: ScratchRegistry::new(),
            tokio_rt,
            events,
            capture_buffer: Arc::new(Mutex::new(Vec::new())),
            capture_stream: None,
            sample_rate: 16_000,
            recording_start: None,
            tick_source: None,
            audio_preview: None,
            gradcam_preview: None,
            window: None,
            chat_panel: None,
        }
    }
}

/// Helper to update the service status label.
pub fn update_status(state: &std::rc::Rc<std::cell::RefCell<AppState>>, text: &str) {
    let s = state.borrow();
    if let Some(ref win) = s.window {
        win.status_label.set_text(text);
    }
}
