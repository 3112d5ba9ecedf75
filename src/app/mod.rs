mod event_handler;
mod recording;
mod state;
mod submission;

pub use event_handler::handle_app_event;
pub use state::{update_status, AppEvent, AppState};
pub use submission::dispatch_health;
