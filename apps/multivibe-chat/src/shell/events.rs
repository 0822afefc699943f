use eframe::egui;
use mv_core::ShellEvent;
use std::sync::mpsc;
use tracing::debug;

/// Sending half handed to engine callbacks.
///
/// Every event also wakes the UI so the frame that drains the queue runs promptly.
#[derive(Clone)]
pub(crate) struct EventSink {
    sender: mpsc::Sender<ShellEvent>,
    ctx: egui::Context,
}

impl EventSink {
    pub(crate) fn emit(&self, event: ShellEvent) {
        if self.sender.send(event).is_err() {
            debug!("event dropped after the window closed");
            return;
        }
        self.ctx.request_repaint();
    }
}

pub(crate) fn event_channel(ctx: &egui::Context) -> (EventSink, mpsc::Receiver<ShellEvent>) {
    let (sender, receiver) = mpsc::channel();
    (
        EventSink {
            sender,
            ctx: ctx.clone(),
        },
        receiver,
    )
}

/// Everything queued since the last frame, in arrival order.
pub(crate) fn drain(receiver: &mpsc::Receiver<ShellEvent>) -> Vec<ShellEvent> {
    receiver.try_iter().collect()
}
