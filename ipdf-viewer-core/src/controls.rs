use std::future::Future;

use tracing::{debug, warn};

use crate::document::DocumentLoader;
use crate::fetch::Fetcher;
use crate::platform::Platform;
use crate::viewer::Viewer;
use crate::viewport::Theme;
use crate::visibility::IntersectionSource;

/// What a toolbar (or any other host UI) can read and do.
///
/// Controls switched off in the [`ViewerConfig`](crate::ViewerConfig) are
/// no-ops. Failed platform requests are logged and leave the state as it
/// was; the boolean results say whether the request went through.
pub trait ViewerControls {
    fn zoom(&self) -> f32;
    fn rotation(&self) -> i32;
    fn is_fullscreen(&self) -> bool;
    fn current_theme(&self) -> Theme;

    fn zoom_in(&self) -> f32;
    fn zoom_out(&self) -> f32;
    fn rotate_left(&self) -> i32;
    fn rotate_right(&self) -> i32;
    fn reset(&self);
    fn toggle_theme(&self) -> Theme;

    /// Save the original document. Returns the file name it was saved as.
    fn download(&self) -> impl Future<Output = Option<String>>;
    fn print(&self) -> bool;

    fn enter_fullscreen(&self) -> impl Future<Output = bool>;
    fn exit_fullscreen(&self) -> impl Future<Output = bool>;
    fn toggle_fullscreen(&self) -> impl Future<Output = bool>;
}

impl<L, O, P, F> ViewerControls for Viewer<L, O, P, F>
where
    L: DocumentLoader,
    O: IntersectionSource,
    P: Platform,
    F: Fetcher,
{
    fn zoom(&self) -> f32 {
        self.viewport().zoom
    }

    fn rotation(&self) -> i32 {
        self.viewport().rotation
    }

    fn is_fullscreen(&self) -> bool {
        self.viewport().is_fullscreen
    }

    fn current_theme(&self) -> Theme {
        self.viewport().theme
    }

    fn zoom_in(&self) -> f32 {
        self.controller.zoom_in()
    }

    fn zoom_out(&self) -> f32 {
        self.controller.zoom_out()
    }

    fn rotate_left(&self) -> i32 {
        if !self.config().allow_rotate {
            debug!("rotation disabled");
            return self.rotation();
        }
        self.controller.rotate_left()
    }

    fn rotate_right(&self) -> i32 {
        if !self.config().allow_rotate {
            debug!("rotation disabled");
            return self.rotation();
        }
        self.controller.rotate_right()
    }

    fn reset(&self) {
        self.controller.reset();
    }

    fn toggle_theme(&self) -> Theme {
        self.controller.toggle_theme()
    }

    async fn download(&self) -> Option<String> {
        if !self.config().allow_download {
            debug!("download disabled");
            return None;
        }
        let Some(source) = self.source() else {
            warn!("nothing to download, no document is open");
            return None;
        };
        let file_name = self.config().file_name.clone();
        match self
            .exporter
            .download(&source, file_name.as_deref(), self.platform.as_ref())
            .await
        {
            Ok(name) => Some(name),
            Err(e) => {
                warn!(source = %source.label(), error = %e, "download failed");
                None
            }
        }
    }

    fn print(&self) -> bool {
        if !self.config().allow_print {
            debug!("print disabled");
            return false;
        }
        match self.exporter.print(self.platform.as_ref()) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "print failed");
                false
            }
        }
    }

    async fn enter_fullscreen(&self) -> bool {
        if !self.config().allow_fullscreen {
            debug!("fullscreen disabled");
            return false;
        }
        self.controller.enter_fullscreen().await.is_ok()
    }

    async fn exit_fullscreen(&self) -> bool {
        self.controller.exit_fullscreen().await.is_ok()
    }

    async fn toggle_fullscreen(&self) -> bool {
        if self.is_fullscreen() {
            self.exit_fullscreen().await
        } else {
            self.enter_fullscreen().await
        }
    }
}
