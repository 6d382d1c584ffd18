//! Deferred UI side effects: transient notifications and delayed redirects.
//!
//! The gateway and stores only enqueue events. Whoever owns the receiver
//! decides how to show them, and redirects are scheduled there so no caller
//! ever waits on the timer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub const LOGIN_ROUTE: &str = "/pages/login/index";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastIcon {
    Success,
    None,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiEvent {
    Toast { message: String, icon: ToastIcon },
    Redirect { route: String, delay: Duration },
}

/// Sending half handed to the gateway and the stores.
#[derive(Clone)]
pub struct UiEvents {
    tx: UnboundedSender<UiEvent>,
}

impl UiEvents {
    pub fn channel() -> (Self, UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn toast(&self, message: impl Into<String>, icon: ToastIcon) {
        self.send(UiEvent::Toast {
            message: message.into(),
            icon,
        });
    }

    pub fn redirect(&self, route: impl Into<String>, delay: Duration) {
        self.send(UiEvent::Redirect {
            route: route.into(),
            delay,
        });
    }

    fn send(&self, event: UiEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::debug!(event = ?e.0, "UI event dropped, no receiver");
        }
    }
}

/// The page layer the events end up in.
pub trait Navigator: Send + Sync + 'static {
    fn show_toast(&self, message: &str, icon: ToastIcon);
    fn redirect(&self, route: &str);
}

/// Navigator that only writes to the log. Used by the command-line binary.
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn show_toast(&self, message: &str, icon: ToastIcon) {
        tracing::info!(?icon, "{message}");
    }

    fn redirect(&self, route: &str) {
        tracing::info!(route, "Redirecting");
    }
}

/// Drains events until every sender is gone.
pub async fn dispatch_events(mut rx: UnboundedReceiver<UiEvent>, navigator: Arc<dyn Navigator>) {
    while let Some(event) = rx.recv().await {
        match event {
            UiEvent::Toast { message, icon } => navigator.show_toast(&message, icon),
            UiEvent::Redirect { route, delay } => {
                let navigator = navigator.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    navigator.redirect(&route);
                });
            }
        }
    }
    tracing::debug!("UI event channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl Navigator for Recorder {
        fn show_toast(&self, message: &str, _icon: ToastIcon) {
            self.seen.lock().push(format!("toast:{message}"));
        }

        fn redirect(&self, route: &str) {
            self.seen.lock().push(format!("redirect:{route}"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn redirect_fires_after_delay() {
        let (events, rx) = UiEvents::channel();
        let recorder = Arc::new(Recorder::default());
        let dispatcher = tokio::spawn(dispatch_events(rx, recorder.clone()));

        events.toast("Logged out", ToastIcon::Success);
        events.redirect(LOGIN_ROUTE, Duration::from_millis(1000));
        drop(events);
        dispatcher.await.unwrap();

        assert_eq!(recorder.seen.lock().as_slice(), ["toast:Logged out"]);

        tokio::time::sleep(Duration::from_millis(1001)).await;
        assert_eq!(
            recorder.seen.lock().as_slice(),
            ["toast:Logged out", "redirect:/pages/login/index"]
        );
    }

    #[test]
    fn sending_without_receiver_is_harmless() {
        let (events, rx) = UiEvents::channel();
        drop(rx);
        events.toast("nobody listening", ToastIcon::None);
    }
}
