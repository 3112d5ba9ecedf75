use gtk4::prelude::*;
use libadwaita::prelude::*;

use crate::app::AppEvent;
use crate::session::{ChatEntry, ChatRole};

/// Handles for the assistant panel.
pub struct ChatWidgets {
    pub container: libadwaita::PreferencesGroup,
    pub transcript: gtk4::ListBox,
    pub scroll: gtk4::ScrolledWindow,
    pub input: gtk4::Entry,
    pub send_button: gtk4::Button,
    pub thinking_label: gtk4::Label,
}

/// Build the assistant panel: transcript list, thinking indicator, input row.
pub fn build_chat_panel(events: async_channel::Sender<AppEvent>) -> ChatWidgets {
    let container = libadwaita::PreferencesGroup::new();
    container.set_title("Assistant");
    container.set_description(Some(
        "For informational purposes only. Not a medical diagnosis.",
    ));
    container.set_margin_top(12);

    let transcript = gtk4::ListBox::new();
    transcript.set_selection_mode(gtk4::SelectionMode::None);
    transcript.add_css_class("boxed-list");

    let scroll = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .min_content_height(240)
        .max_content_height(240)
        .child(&transcript)
        .build();
    container.add(&scroll);

    let thinking_label = gtk4::Label::new(Some("Thinking\u{2026}"));
    thinking_label.add_css_class("dim-label");
    thinking_label.set_xalign(0.0);
    thinking_label.set_visible(false);
    thinking_label.set_margin_top(4);
    container.add(&thinking_label);

    let input_box = gtk4::Box::new(gtk4::Orientation::Horizontal, 8);
    input_box.set_margin_top(8);

    let input = gtk4::Entry::new();
    input.set_placeholder_text(Some("Ask about your diagnosis..."));
    input.set_hexpand(true);

    let send_button = gtk4::Button::with_label("Send");
    send_button.add_css_class("suggested-action");

    input_box.append(&input);
    input_box.append(&send_button);
    container.add(&input_box);

    {
        let sender = events.clone();
        input.connect_activate(move |_| {
            let _ = sender.try_send(AppEvent::ChatSubmitted);
        });
    }
    {
        let sender = events;
        send_button.connect_clicked(move |_| {
            let _ = sender.try_send(AppEvent::ChatSubmitted);
        });
    }

    ChatWidgets {
        container,
        transcript,
        scroll,
        input,
        send_button,
        thinking_label,
    }
}

/// Append one transcript entry and keep it in view.
pub fn append_entry(widgets: &ChatWidgets, entry: &ChatEntry) {
    let row = gtk4::ListBoxRow::new();
    row.set_activatable(false);

    let vbox = gtk4::Box::new(gtk4::Orientation::Vertical, 2);
    vbox.set_margin_top(6);
    vbox.set_margin_bottom(6);
    vbox.set_margin_start(10);
    vbox.set_margin_end(10);

    let header = gtk4::Box::new(gtk4::Orientation::Horizontal, 8);
    let who = gtk4::Label::new(Some(match entry.role {
        ChatRole::Bot => "Assistant",
        ChatRole::User => "You",
    }));
    who.add_css_class("heading");
    who.set_xalign(0.0);

    let stamp = gtk4::Label::new(Some(&entry.timestamp));
    stamp.add_css_class("dim-label");
    stamp.set_hexpand(true);
    stamp.set_xalign(1.0);

    header.append(&who);
    header.append(&stamp);

    let text = gtk4::Label::new(Some(&entry.text));
    text.set_wrap(true);
    text.set_xalign(0.0);

    vbox.append(&header);
    vbox.append(&text);
    row.set_child(Some(&vbox));
    widgets.transcript.append(&row);

    let adjustment = widgets.scroll.vadjustment();
    adjustment.set_value(adjustment.upper());
}

/// Replace the rendered transcript, e.g. after a session reset.
pub fn reset_transcript(widgets: &ChatWidgets, entries: &[ChatEntry]) {
    while let Some(child) = widgets.transcript.first_child() {
        widgets.transcript.remove(&child);
    }
    for entry in entries {
        append_entry(widgets, entry);
    }
}
