use std::cell::RefCell;
use std::rc::Rc;

use gtk4::prelude::*;
use libadwaita::prelude::*;

use pneumoscan::api::HttpBackend;
use pneumoscan::app::{self, AppEvent, AppState};
use pneumoscan::ui;
use pneumoscan::ui::window::WindowWidgets;

fn main() {
    env_logger::init();
    log::info!("PneumoScan starting");

    let application = libadwaita::Application::builder()
        .application_id("com.github.pneumoscan.pneumoscan")
        .build();

    application.connect_activate(on_activate);
    application.run();
}

fn on_activate(app: &libadwaita::Application) {
    // All state changes flow through this channel to one serialized handler.
    let (event_tx, event_rx) = async_channel::unbounded::<AppEvent>();

    let state = Rc::new(RefCell::new(AppState::new(event_tx.clone())));

    // Clear preview files a previous run may have leaked.
    state.borrow().scratch.sweep();

    // Build UI
    let chat = ui::chat::build_chat_panel(event_tx.clone());
    let window = ui::window::build_window(app, &chat);

    window.backend_row.set_text(&state.borrow().config.backend_url);
    ui::chat::reset_transcript(&chat, &state.borrow().session.chat);

    wire_callbacks(&state, &window, &event_tx);

    // Menu actions
    {
        let state_for_ask = state.clone();
        let quick_ask = gtk4::gio::SimpleAction::new("quick-ask", None);
        quick_ask.connect_activate(move |_, _| {
            let s = state_for_ask.borrow();
            if let Some(ref win) = s.window {
                ui::quick_ask::show_quick_ask(
                    &win.window,
                    s.backend.clone(),
                    s.tokio_rt.handle().clone(),
                );
            }
        });
        app.add_action(&quick_ask);

        let quit = gtk4::gio::SimpleAction::new("quit", None);
        let app_for_quit = app.clone();
        quit.connect_activate(move |_, _| app_for_quit.quit());
        app.add_action(&quit);
    }

    // Store UI handles in state, then show the window
    {
        let mut s = state.borrow_mut();
        s.window = Some(window);
        s.chat_panel = Some(chat);
    }
    state.borrow().window.as_ref().unwrap().window.present();

    // Attach the event handler loop
    {
        let state_for_events = state.clone();
        gtk4::glib::spawn_future_local(async move {
            while let Ok(event) = event_rx.recv().await {
                app::handle_app_event(&state_for_events, event);
            }
        });
    }

    // Startup reachability check
    app::update_status(&state, "Checking service...");
    app::dispatch_health(&state);
}

fn wire_callbacks(
    state: &Rc<RefCell<AppState>>,
    window: &WindowWidgets,
    event_tx: &async_channel::Sender<AppEvent>,
) {
    // X-ray file picker
    {
        let sender = event_tx.clone();
        let parent = window.window.clone();
        window.choose_image_button.connect_clicked(move |_| {
            let dialog = gtk4::FileDialog::builder()
                .title("Choose a chest X-ray")
                .build();

            let filter = gtk4::FileFilter::new();
            filter.add_mime_type("image/*");
            filter.set_name(Some("Images"));
            let filters = gtk4::gio::ListStore::new::<gtk4::FileFilter>();
            filters.append(&filter);
            dialog.set_filters(Some(&filters));

            let sender = sender.clone();
            dialog.open(Some(&parent), None::<&gtk4::gio::Cancellable>, move |result| {
                match result {
                    Ok(file) => {
                        if let Some(path) = file.path() {
                            let _ = sender.try_send(AppEvent::ImageChosen(path));
                        }
                    }
                    Err(e) => log::info!("Image selection dismissed: {e}"),
                }
            });
        });
    }

    // Symptoms text
    {
        let sender = event_tx.clone();
        let buffer = window.symptoms_view.buffer();
        buffer.connect_changed(move |buffer| {
            let (start, end) = buffer.bounds();
            let text = buffer.text(&start, &end, false).to_string();
            let _ = sender.try_send(AppEvent::SymptomsEdited(text));
        });
    }

    // Voice capture
    {
        let sender = event_tx.clone();
        window.record_button.connect_clicked(move |_| {
            let _ = sender.try_send(AppEvent::StartRecording);
        });
    }
    {
        let sender = event_tx.clone();
        window.stop_button.connect_clicked(move |_| {
            let _ = sender.try_send(AppEvent::StopRecording);
        });
    }
    {
        let sender = event_tx.clone();
        window.delete_audio_button.connect_clicked(move |_| {
            let _ = sender.try_send(AppEvent::DeleteAudio);
        });
    }
    {
        let sender = event_tx.clone();
        window.use_audio_button.connect_clicked(move |_| {
            let _ = sender.try_send(AppEvent::SubmitRequested);
        });
    }

    // Main actions
    {
        let sender = event_tx.clone();
        window.diagnose_button.connect_clicked(move |_| {
            let _ = sender.try_send(AppEvent::SubmitRequested);
        });
    }
    {
        let sender = event_tx.clone();
        window.reset_button.connect_clicked(move |_| {
            let _ = sender.try_send(AppEvent::ResetRequested);
        });
    }

    // Result actions
    {
        let sender = event_tx.clone();
        window.hospital_button.connect_clicked(move |_| {
            let _ = sender.try_send(AppEvent::FindHospitals);
        });
    }
    {
        let sender = event_tx.clone();
        window.report_button.connect_clicked(move |_| {
            let _ = sender.try_send(AppEvent::DownloadReport);
        });
    }

    // Service address changes take effect immediately and persist
    {
        let state_for_url = state.clone();
        window
            .backend_row
            .connect_changed(move |row: &libadwaita::EntryRow| {
                let url = row.text().to_string();
                let mut s = state_for_url.borrow_mut();
                s.config.backend_url = url.clone();
                s.backend = std::sync::Arc::new(HttpBackend::new(url));
                if let Err(e) = s.config.save() {
                    log::warn!("Failed to save config: {e}");
                }
            });
    }
}
