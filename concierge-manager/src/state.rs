use concierge_agent::ChatGateway;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ChatGateway>,
    /// Chat page on disk; the embedded page is served when unset
    pub ui_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(gateway: Arc<ChatGateway>) -> Self {
        Self {
            gateway,
            ui_path: None,
        }
    }

    pub fn with_ui_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ui_path = Some(path.into());
        self
    }
}
