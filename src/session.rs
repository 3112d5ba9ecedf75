use std::path::PathBuf;

use chrono::Local;

use crate::api::DiagnosisResult;

/// Opening entry of every chat transcript.
pub const CHAT_GREETING: &str =
    "Hello! I can help you understand pneumonia, symptoms, and diagnosis results.";

/// Shown when the chatbot answers without a reply field.
pub const CHAT_NO_REPLY: &str = "No response received.";

/// Shown when the chatbot endpoint cannot be reached.
pub const CHAT_UNAVAILABLE: &str =
    "The assistant is unavailable right now. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    Bot,
    User,
}

/// One entry of the chat transcript.
#[derive(Debug, Clone)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub text: String,
    /// Local wall-clock time the entry was appended, for display only.
    pub timestamp: String,
}

impl ChatEntry {
    fn new(role: ChatRole, text: String) -> Self {
        Self {
            role,
            text,
            timestamp: Local::now().format("%H:%M").to_string(),
        }
    }
}

/// Voice capture phase. Audio may be present only in `Captured`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingPhase {
    Idle,
    Recording,
    Captured,
}

/// Why a submission could not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitBlocked {
    NoImage,
    InFlight,
}

/// Outcome of a chatbot call, applied to the transcript by `finish_chat`.
#[derive(Debug, Clone)]
pub enum ChatOutcome {
    Reply(String),
    Empty,
    Unavailable,
}

/// All user-visible state of one diagnosis attempt.
///
/// Free of any UI types; every mutation goes through a method so the
/// serialized event handler is the only writer.
pub struct Session {
    pub image: Option<PathBuf>,
    pub text: String,
    pub audio_wav: Option<Vec<u8>>,
    pub transcription: String,
    pub result: Option<DiagnosisResult>,
    pub show_hospital_action: bool,
    pub loading: bool,
    pub recording: RecordingPhase,
    pub chat: Vec<ChatEntry>,
    pub chat_loading: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            image: None,
            text: String::new(),
            audio_wav: None,
            transcription: String::new(),
            result: None,
            show_hospital_action: false,
            loading: false,
            recording: RecordingPhase::Idle,
            chat: vec![ChatEntry::new(ChatRole::Bot, CHAT_GREETING.into())],
            chat_loading: false,
        }
    }

    pub fn select_image(&mut self, path: PathBuf) {
        self.image = Some(path);
    }

    pub fn set_text(&mut self, text: String) {
        self.text = text;
    }

    pub fn begin_recording(&mut self) {
        self.recording = RecordingPhase::Recording;
    }

    /// A stop that produced no samples returns straight to `Idle`.
    pub fn cancel_recording(&mut self) {
        self.recording = RecordingPhase::Idle;
    }

    pub fn finish_recording(&mut self, wav: Vec<u8>) {
        self.audio_wav = Some(wav);
        self.recording = RecordingPhase::Captured;
    }

    /// Drops the captured audio along with any transcription derived from it.
    pub fn delete_audio(&mut self) {
        self.audio_wav = None;
        self.transcription.clear();
        self.recording = RecordingPhase::Idle;
    }

    /// Start a submission attempt. Clears the previous result so a stale
    /// prediction is never shown next to a fresh spinner.
    pub fn begin_submission(&mut self) -> Result<(), SubmitBlocked> {
        if self.loading {
            return Err(SubmitBlocked::InFlight);
        }
        if self.image.is_none() {
            return Err(SubmitBlocked::NoImage);
        }
        self.loading = true;
        self.result = None;
        self.show_hospital_action = false;
        Ok(())
    }

    /// Store a successful diagnosis. `result` and the hospital flag are only
    /// ever written together, here.
    pub fn apply_result(&mut self, result: DiagnosisResult) {
        if let Some(transcription) = &result.transcription {
            self.transcription = transcription.clone();
        }
        self.show_hospital_action = result
            .image_prediction
            .to_lowercase()
            .contains("pneumonia");
        self.push_bot(format!(
            "Diagnosis result: {} (confidence: {}).",
            result.image_prediction, result.image_confidence
        ));
        self.result = Some(result);
    }

    /// Ends the attempt on every path: success, rejection, or failure.
    pub fn submission_done(&mut self) {
        self.loading = false;
    }

    /// Append the user's question and mark the chat busy. Returns the trimmed
    /// message to send, or `None` when there is nothing to send.
    pub fn begin_chat(&mut self, input: &str) -> Option<String> {
        if self.chat_loading {
            return None;
        }
        let message = input.trim();
        if message.is_empty() {
            return None;
        }
        let message = message.to_string();
        self.push_user(message.clone());
        self.chat_loading = true;
        Some(message)
    }

    pub fn finish_chat(&mut self, outcome: ChatOutcome) {
        let text = match outcome {
            ChatOutcome::Reply(reply) => reply,
            ChatOutcome::Empty => CHAT_NO_REPLY.into(),
            ChatOutcome::Unavailable => CHAT_UNAVAILABLE.into(),
        };
        self.push_bot(text);
        self.chat_loading = false;
    }

    pub fn push_user(&mut self, text: String) {
        self.chat.push(ChatEntry::new(ChatRole::User, text));
    }

    pub fn push_bot(&mut self, text: String) {
        self.chat.push(ChatEntry::new(ChatRole::Bot, text));
    }

    /// Back to the initial state: all fields cleared, transcript reduced to
    /// the single greeting.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Confidence;

    fn result_with_prediction(prediction: &str) -> DiagnosisResult {
        DiagnosisResult {
            image_prediction: prediction.into(),
            image_confidence: Confidence::Number(0.92),
            transcription: None,
            pneumonia_type: None,
            recommendation: None,
            gradcam_image: None,
            report_path: None,
        }
    }

    #[test]
    fn new_session_has_single_greeting() {
        let session = Session::new();
        assert_eq!(session.chat.len(), 1);
        assert_eq!(session.chat[0].role, ChatRole::Bot);
        assert_eq!(session.chat[0].text, CHAT_GREETING);
    }

    #[test]
    fn submission_without_image_is_blocked() {
        let mut session = Session::new();
        assert_eq!(session.begin_submission(), Err(SubmitBlocked::NoImage));
        assert!(!session.loading);
    }

    #[test]
    fn submission_while_loading_is_blocked() {
        let mut session = Session::new();
        session.select_image(PathBuf::from("/tmp/xray.png"));
        session.begin_submission().unwrap();
        assert_eq!(session.begin_submission(), Err(SubmitBlocked::InFlight));
    }

    #[test]
    fn begin_submission_clears_previous_result() {
        let mut session = Session::new();
        session.select_image(PathBuf::from("/tmp/xray.png"));
        session.apply_result(result_with_prediction("Pneumonia"));
        assert!(session.show_hospital_action);

        session.begin_submission().unwrap();
        assert!(session.result.is_none());
        assert!(!session.show_hospital_action);
        assert!(session.loading);
    }

    #[test]
    fn bacterial_pneumonia_sets_hospital_flag() {
        let mut session = Session::new();
        session.apply_result(result_with_prediction("Bacterial Pneumonia"));
        assert!(session.show_hospital_action);
    }

    #[test]
    fn normal_prediction_leaves_hospital_flag_clear() {
        let mut session = Session::new();
        session.apply_result(result_with_prediction("Normal"));
        assert!(!session.show_hospital_action);
    }

    #[test]
    fn hospital_flag_matches_any_casing() {
        let mut session = Session::new();
        session.apply_result(result_with_prediction("PNEUMONIA"));
        assert!(session.show_hospital_action);
    }

    #[test]
    fn result_summary_lands_in_transcript() {
        let mut session = Session::new();
        session.apply_result(result_with_prediction("Pneumonia"));

        let last = session.chat.last().unwrap();
        assert_eq!(last.role, ChatRole::Bot);
        assert!(last.text.contains("Pneumonia"));
        assert!(last.text.contains("0.92"));
    }

    #[test]
    fn apply_result_stores_transcription() {
        let mut session = Session::new();
        let mut result = result_with_prediction("Normal");
        result.transcription = Some("dry cough since monday".into());
        session.apply_result(result);
        assert_eq!(session.transcription, "dry cough since monday");
    }

    #[test]
    fn submission_done_always_clears_loading() {
        let mut session = Session::new();
        session.select_image(PathBuf::from("/tmp/xray.png"));
        session.begin_submission().unwrap();
        session.submission_done();
        assert!(!session.loading);
    }

    #[test]
    fn recording_cycle_idle_to_captured_and_back() {
        let mut session = Session::new();
        assert_eq!(session.recording, RecordingPhase::Idle);

        session.begin_recording();
        assert_eq!(session.recording, RecordingPhase::Recording);

        session.finish_recording(vec![0x52, 0x49, 0x46, 0x46]);
        assert_eq!(session.recording, RecordingPhase::Captured);
        assert!(session.audio_wav.is_some());

        session.delete_audio();
        assert_eq!(session.recording, RecordingPhase::Idle);
        assert!(session.audio_wav.is_none());
    }

    #[test]
    fn deleting_audio_clears_transcription() {
        let mut session = Session::new();
        session.begin_recording();
        session.finish_recording(vec![0u8; 16]);
        session.transcription = "fever and chills".into();

        session.delete_audio();
        assert!(session.transcription.is_empty());
        assert!(session.audio_wav.is_none());
    }

    #[test]
    fn empty_stop_returns_to_idle_without_audio() {
        let mut session = Session::new();
        session.begin_recording();
        session.cancel_recording();
        assert_eq!(session.recording, RecordingPhase::Idle);
        assert!(session.audio_wav.is_none());
    }

    #[test]
    fn chat_ignores_blank_input() {
        let mut session = Session::new();
        assert!(session.begin_chat("   ").is_none());
        assert!(session.begin_chat("").is_none());
        assert_eq!(session.chat.len(), 1);
        assert!(!session.chat_loading);
    }

    #[test]
    fn chat_trims_and_appends_user_entry() {
        let mut session = Session::new();
        let sent = session.begin_chat("  what is pneumonia?  ").unwrap();
        assert_eq!(sent, "what is pneumonia?");
        assert!(session.chat_loading);

        let last = session.chat.last().unwrap();
        assert_eq!(last.role, ChatRole::User);
        assert_eq!(last.text, "what is pneumonia?");
    }

    #[test]
    fn chat_reply_appends_bot_entry_in_order() {
        let mut session = Session::new();
        session.begin_chat("what is pneumonia?").unwrap();
        session.finish_chat(ChatOutcome::Reply("An infection of the lungs.".into()));

        assert_eq!(session.chat.len(), 3);
        assert_eq!(session.chat[1].role, ChatRole::User);
        assert_eq!(session.chat[2].role, ChatRole::Bot);
        assert_eq!(session.chat[2].text, "An infection of the lungs.");
        assert!(!session.chat_loading);
    }

    #[test]
    fn missing_reply_uses_placeholder() {
        let mut session = Session::new();
        session.begin_chat("hello").unwrap();
        session.finish_chat(ChatOutcome::Empty);
        assert_eq!(session.chat.last().unwrap().text, CHAT_NO_REPLY);
    }

    #[test]
    fn unreachable_chatbot_appends_apology() {
        let mut session = Session::new();
        session.begin_chat("hello").unwrap();
        session.finish_chat(ChatOutcome::Unavailable);
        assert_eq!(session.chat.last().unwrap().text, CHAT_UNAVAILABLE);
        assert!(!session.chat_loading);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut session = Session::new();
        session.select_image(PathBuf::from("/tmp/xray.png"));
        session.set_text("cough, fever".into());
        session.begin_recording();
        session.finish_recording(vec![0u8; 8]);
        session.apply_result(result_with_prediction("Pneumonia"));
        session.begin_chat("what now?").unwrap();

        session.reset();

        assert!(session.image.is_none());
        assert!(session.text.is_empty());
        assert!(session.audio_wav.is_none());
        assert!(session.transcription.is_empty());
        assert!(session.result.is_none());
        assert!(!session.show_hospital_action);
        assert!(!session.loading);
        assert!(!session.chat_loading);
        assert_eq!(session.recording, RecordingPhase::Idle);
        assert_eq!(session.chat.len(), 1);
        assert_eq!(session.chat[0].text, CHAT_GREETING);
    }
}
