use tracing::debug;

/// Where the table is displayed.
pub trait Viewport: Send + Sync {
    /// Smoothly scrolls back to the top of the view.
    fn scroll_to_top(&self);
}

/// Viewport for headless use; scrolling is only logged.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingViewport;

impl Viewport for LoggingViewport {
    fn scroll_to_top(&self) {
        debug!("scroll to top");
    }
}
