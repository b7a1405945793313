//! Navigation port
//!
//! The view reports route changes here instead of reloading itself.

use chatpanel_domain::ChatRoute;
use std::sync::Mutex;

/// Receives route changes made by the view.
pub trait Navigator: Send + Sync {
    /// Replace the current route. Must not trigger a reload of the view.
    fn replace(&self, route: &ChatRoute);
}

/// Ignores navigation.
pub struct NoNavigation;

impl Navigator for NoNavigation {
    fn replace(&self, _route: &ChatRoute) {}
}

/// Remembers every route it was given, in order.
#[derive(Default)]
pub struct RecordingNavigator {
    history: Mutex<Vec<ChatRoute>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<ChatRoute> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    pub fn current(&self) -> Option<ChatRoute> {
        self.history.lock().ok().and_then(|h| h.last().cloned())
    }
}

impl Navigator for RecordingNavigator {
    fn replace(&self, route: &ChatRoute) {
        if let Ok(mut history) = self.history.lock() {
            history.push(route.clone());
        }
    }
}
