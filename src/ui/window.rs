use gtk4::prelude::*;
use libadwaita::prelude::*;

use super::chat::ChatWidgets;

/// Handles returned from building the main window.
pub struct WindowWidgets {
    pub window: libadwaita::ApplicationWindow,
    pub toasts: libadwaita::ToastOverlay,
    pub status_label: gtk4::Label,
    pub backend_row: libadwaita::EntryRow,

    pub image_row: libadwaita::ActionRow,
    pub choose_image_button: gtk4::Button,
    pub preview: gtk4::Picture,

    pub symptoms_view: gtk4::TextView,

    pub record_button: gtk4::Button,
    pub recording_box: gtk4::Box,
    pub stop_button: gtk4::Button,
    pub timer_label: gtk4::Label,
    pub level_bar: gtk4::LevelBar,
    pub captured_box: gtk4::Box,
    pub audio_controls: gtk4::MediaControls,
    pub use_audio_button: gtk4::Button,
    pub delete_audio_button: gtk4::Button,

    pub diagnose_button: gtk4::Button,
    pub reset_button: gtk4::Button,
    pub busy_spinner: gtk4::Spinner,

    pub transcription_group: libadwaita::PreferencesGroup,
    pub transcription_view: gtk4::TextView,

    pub result_group: libadwaita::PreferencesGroup,
    pub prediction_label: gtk4::Label,
    pub confidence_label: gtk4::Label,
    pub type_row: libadwaita::ActionRow,
    pub type_label: gtk4::Label,
    pub recommendation_row: libadwaita::ActionRow,
    pub gradcam_box: gtk4::Box,
    pub gradcam_picture: gtk4::Picture,
    pub hospital_button: gtk4::Button,
    pub report_button: gtk4::Button,
}

/// Build the main window. Callbacks are wired by the caller.
pub fn build_window(app: &libadwaita::Application, chat: &ChatWidgets) -> WindowWidgets {
    let window = libadwaita::ApplicationWindow::builder()
        .application(app)
        .title("PneumoScan")
        .default_width(560)
        .default_height(760)
        .build();

    let css_provider = gtk4::CssProvider::new();
    css_provider.load_from_string(
        r#"
        .recording-dot {
            color: #ff3b30;
            font-size: 16px;
        }
        .recording-timer {
            font-family: monospace;
        }
        "#,
    );
    gtk4::style_context_add_provider_for_display(
        &gtk4::gdk::Display::default().unwrap(),
        &css_provider,
        gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
    );

    let toast_overlay = libadwaita::ToastOverlay::new();
    let toolbar_view = libadwaita::ToolbarView::new();
    let header = libadwaita::HeaderBar::new();

    let menu_button = gtk4::MenuButton::new();
    menu_button.set_icon_name("open-menu-symbolic");

    let menu = gtk4::gio::Menu::new();
    menu.append(Some("Quick Question"), Some("app.quick-ask"));
    menu.append(Some("Quit"), Some("app.quit"));
    menu_button.set_menu_model(Some(&menu));
    header.pack_end(&menu_button);

    toolbar_view.add_top_bar(&header);

    let content = gtk4::Box::new(gtk4::Orientation::Vertical, 0);
    content.set_margin_start(16);
    content.set_margin_end(16);
    content.set_margin_top(12);
    content.set_margin_bottom(12);

    // --- Service group ---
    let service_group = libadwaita::PreferencesGroup::new();
    service_group.set_title("Diagnosis Service");

    let status_row = libadwaita::ActionRow::builder().title("Status").build();
    let status_label = gtk4::Label::new(Some("Starting..."));
    status_label.add_css_class("dim-label");
    status_row.add_suffix(&status_label);
    service_group.add(&status_row);

    let backend_row = libadwaita::EntryRow::builder()
        .title("Service address")
        .build();
    service_group.add(&backend_row);

    content.append(&service_group);

    // --- X-ray group ---
    let image_group = libadwaita::PreferencesGroup::new();
    image_group.set_title("Chest X-ray");
    image_group.set_margin_top(12);

    let image_row = libadwaita::ActionRow::builder()
        .title("Image")
        .subtitle("No file selected")
        .build();
    let choose_image_button = gtk4::Button::builder()
        .label("Choose\u{2026}")
        .valign(gtk4::Align::Center)
        .build();
    image_row.add_suffix(&choose_image_button);
    image_group.add(&image_row);

    let preview = gtk4::Picture::new();
    preview.set_can_shrink(true);
    preview.set_size_request(-1, 220);
    preview.set_margin_top(8);
    preview.set_visible(false);
    image_group.add(&preview);

    content.append(&image_group);

    // --- Symptoms group ---
    let symptoms_group = libadwaita::PreferencesGroup::new();
    symptoms_group.set_title("Symptoms");
    symptoms_group.set_description(Some(
        "Describe symptoms such as fever, cough, breathlessness...",
    ));
    symptoms_group.set_margin_top(12);

    let symptoms_view = gtk4::TextView::new();
    symptoms_view.set_wrap_mode(gtk4::WrapMode::WordChar);
    symptoms_view.set_top_margin(8);
    symptoms_view.set_bottom_margin(8);
    symptoms_view.set_left_margin(8);
    symptoms_view.set_right_margin(8);

    let symptoms_scroll = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .min_content_height(90)
        .child(&symptoms_view)
        .build();
    symptoms_scroll.add_css_class("card");
    symptoms_group.add(&symptoms_scroll);

    content.append(&symptoms_group);

    // --- Voice group ---
    let voice_group = libadwaita::PreferencesGroup::new();
    voice_group.set_title("Spoken Symptoms");
    voice_group.set_margin_top(12);

    let record_button = gtk4::Button::with_label("Start Recording");
    record_button.set_halign(gtk4::Align::Start);
    voice_group.add(&record_button);

    let recording_box = gtk4::Box::new(gtk4::Orientation::Horizontal, 10);
    recording_box.set_visible(false);

    let dot = gtk4::Label::new(Some("\u{25CF}"));
    dot.add_css_class("recording-dot");
    let recording_label = gtk4::Label::new(Some("Recording"));
    let timer_label = gtk4::Label::new(Some("00:00"));
    timer_label.add_css_class("recording-timer");
    let level_bar = gtk4::LevelBar::new();
    level_bar.set_hexpand(true);
    level_bar.set_valign(gtk4::Align::Center);
    let stop_button = gtk4::Button::with_label("Stop");
    stop_button.add_css_class("destructive-action");

    recording_box.append(&dot);
    recording_box.append(&recording_label);
    recording_box.append(&timer_label);
    recording_box.append(&level_bar);
    recording_box.append(&stop_button);
    voice_group.add(&recording_box);

    let captured_box = gtk4::Box::new(gtk4::Orientation::Horizontal, 10);
    captured_box.set_visible(false);

    let audio_controls = gtk4::MediaControls::new(None::<&gtk4::MediaStream>);
    audio_controls.set_hexpand(true);
    let use_audio_button = gtk4::Button::with_label("Use Audio");
    use_audio_button.add_css_class("suggested-action");
    let delete_audio_button = gtk4::Button::from_icon_name("user-trash-symbolic");
    delete_audio_button.set_tooltip_text(Some("Delete recording"));
    delete_audio_button.add_css_class("destructive-action");

    captured_box.append(&audio_controls);
    captured_box.append(&use_audio_button);
    captured_box.append(&delete_audio_button);
    voice_group.add(&captured_box);

    content.append(&voice_group);

    // --- Actions ---
    let actions_box = gtk4::Box::new(gtk4::Orientation::Horizontal, 10);
    actions_box.set_margin_top(16);
    actions_box.set_halign(gtk4::Align::Center);

    let diagnose_button = gtk4::Button::with_label("Diagnose");
    diagnose_button.add_css_class("suggested-action");
    diagnose_button.add_css_class("pill");
    let reset_button = gtk4::Button::with_label("Reset");
    reset_button.add_css_class("pill");
    let busy_spinner = gtk4::Spinner::new();
    busy_spinner.set_visible(false);

    actions_box.append(&diagnose_button);
    actions_box.append(&reset_button);
    actions_box.append(&busy_spinner);
    content.append(&actions_box);

    // --- Transcription ---
    let transcription_group = libadwaita::PreferencesGroup::new();
    transcription_group.set_title("Transcribed Speech");
    transcription_group.set_margin_top(12);
    transcription_group.set_visible(false);

    let transcription_view = gtk4::TextView::new();
    transcription_view.set_editable(false);
    transcription_view.set_wrap_mode(gtk4::WrapMode::WordChar);
    transcription_view.set_top_margin(8);
    transcription_view.set_bottom_margin(8);
    transcription_view.set_left_margin(8);
    transcription_view.set_right_margin(8);

    let transcription_scroll = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .min_content_height(70)
        .child(&transcription_view)
        .build();
    transcription_scroll.add_css_class("card");
    transcription_group.add(&transcription_scroll);

    content.append(&transcription_group);

    // --- Result group ---
    let result_group = libadwaita::PreferencesGroup::new();
    result_group.set_title("Diagnostic Result");
    result_group.set_margin_top(12);
    result_group.set_visible(false);

    let prediction_row = libadwaita::ActionRow::builder()
        .title("Image Prediction")
        .build();
    let prediction_label = gtk4::Label::new(None);
    prediction_label.add_css_class("heading");
    prediction_row.add_suffix(&prediction_label);
    result_group.add(&prediction_row);

    let confidence_row = libadwaita::ActionRow::builder().title("Confidence").build();
    let confidence_label = gtk4::Label::new(None);
    confidence_label.add_css_class("dim-label");
    confidence_row.add_suffix(&confidence_label);
    result_group.add(&confidence_row);

    let type_row = libadwaita::ActionRow::builder()
        .title("Pneumonia Type")
        .build();
    let type_label = gtk4::Label::new(None);
    type_label.add_css_class("dim-label");
    type_row.add_suffix(&type_label);
    type_row.set_visible(false);
    result_group.add(&type_row);

    let recommendation_row = libadwaita::ActionRow::builder()
        .title("Clinical Recommendation")
        .build();
    recommendation_row.set_visible(false);
    result_group.add(&recommendation_row);

    let gradcam_box = gtk4::Box::new(gtk4::Orientation::Vertical, 4);
    gradcam_box.set_margin_top(8);
    gradcam_box.set_visible(false);

    let gradcam_caption = gtk4::Label::new(Some("Grad-CAM Explainability"));
    gradcam_caption.add_css_class("heading");
    gradcam_caption.set_xalign(0.0);
    let gradcam_picture = gtk4::Picture::new();
    gradcam_picture.set_can_shrink(true);
    gradcam_picture.set_size_request(-1, 220);

    gradcam_box.append(&gradcam_caption);
    gradcam_box.append(&gradcam_picture);
    result_group.add(&gradcam_box);

    let result_actions = gtk4::Box::new(gtk4::Orientation::Horizontal, 10);
    result_actions.set_margin_top(10);

    let hospital_button = gtk4::Button::with_label("Show Nearby Hospitals");
    hospital_button.add_css_class("destructive-action");
    hospital_button.set_visible(false);
    let report_button = gtk4::Button::with_label("Download Report");
    report_button.set_visible(false);

    result_actions.append(&hospital_button);
    result_actions.append(&report_button);
    result_group.add(&result_actions);

    content.append(&result_group);

    // --- Assistant panel ---
    content.append(&chat.container);

    // Assemble
    let scrolled = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .child(&content)
        .build();
    toolbar_view.set_content(Some(&scrolled));
    toast_overlay.set_child(Some(&toolbar_view));
    window.set_content(Some(&toast_overlay));

    WindowWidgets {
        window,
        toasts: toast_overlay,
        status_label,
        backend_row,
        image_row,
        choose_image_button,
        preview,
        symptoms_view,
        record_button,
        recording_box,
        stop_button,
        timer_label,
        level_bar,
        captured_box,
        audio_controls,
        use_audio_button,
        delete_audio_button,
        diagnose_button,
        reset_button,
        busy_spinner,
        transcription_group,
        transcription_view,
        result_group,
        prediction_label,
        confidence_label,
        type_row,
        type_label,
        recommendation_row,
        gradcam_box,
        gradcam_picture,
        hospital_button,
        report_button,
    }
}
