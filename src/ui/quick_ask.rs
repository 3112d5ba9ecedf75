use std::sync::Arc;

use gtk4::prelude::*;
use libadwaita::prelude::*;

use crate::api::{DiagnosisBackend, HttpBackend};

/// Stand-alone single-question window. Unlike the assistant panel it keeps
/// no transcript; each answer replaces the previous one.
pub fn show_quick_ask(
    parent: &impl IsA<gtk4::Window>,
    backend: Arc<HttpBackend>,
    rt: tokio::runtime::Handle,
) {
    let window = libadwaita::Window::builder()
        .title("Quick Question")
        .default_width(420)
        .default_height(340)
        .transient_for(parent)
        .modal(true)
        .build();

    let toolbar_view = libadwaita::ToolbarView::new();
    toolbar_view.add_top_bar(&libadwaita::HeaderBar::new());

    let content = gtk4::Box::new(gtk4::Orientation::Vertical, 8);
    content.set_margin_start(16);
    content.set_margin_end(16);
    content.set_margin_top(12);
    content.set_margin_bottom(12);

    let heading = gtk4::Label::new(Some("PneumoScan Assistant"));
    heading.add_css_class("title-4");
    heading.set_xalign(0.0);
    content.append(&heading);

    let question_view = gtk4::TextView::new();
    question_view.set_wrap_mode(gtk4::WrapMode::WordChar);
    question_view.set_top_margin(8);
    question_view.set_bottom_margin(8);
    question_view.set_left_margin(8);
    question_view.set_right_margin(8);

    let question_scroll = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .min_content_height(80)
        .child(&question_view)
        .build();
    question_scroll.add_css_class("card");
    content.append(&question_scroll);

    let ask_button = gtk4::Button::with_label("Ask");
    ask_button.add_css_class("suggested-action");
    ask_button.set_halign(gtk4::Align::End);
    content.append(&ask_button);

    let reply_label = gtk4::Label::new(None);
    reply_label.set_wrap(true);
    reply_label.set_xalign(0.0);
    reply_label.set_selectable(true);
    reply_label.set_vexpand(true);
    reply_label.set_valign(gtk4::Align::Start);
    content.append(&reply_label);

    toolbar_view.set_content(Some(&content));
    window.set_content(Some(&toolbar_view));

    let (reply_tx, reply_rx) = async_channel::unbounded::<String>();

    {
        let buffer = question_view.buffer();
        ask_button.connect_clicked(move |_| {
            let (start, end) = buffer.bounds();
            let message = buffer.text(&start, &end, false).to_string();
            let backend = backend.clone();
            let reply_tx = reply_tx.clone();
            rt.spawn(async move {
                let text = match backend.chat(&message).await {
                    Ok(reply) => reply.reply.unwrap_or_default(),
                    Err(e) => {
                        log::warn!("Quick question failed: {e}");
                        "Assistant temporarily unavailable.".to_string()
                    }
                };
                let _ = reply_tx.send(text).await;
            });
        });
    }

    // Only the latest reply is shown.
    let reply_label_for_recv = reply_label.clone();
    gtk4::glib::spawn_future_local(async move {
        while let Ok(text) = reply_rx.recv().await {
            reply_label_for_recv.set_text(&text);
        }
    });

    window.present();
}
