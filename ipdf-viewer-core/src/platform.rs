//! Host capabilities the viewer needs but does not own: exclusive display,
//! skinning, native print and native save.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info};

use crate::error::PlatformCapabilityError;
use crate::subscription::Subscription;
use crate::viewport::Theme;

pub trait Platform {
    /// Ask for exclusive display of the viewer. May be refused.
    fn request_fullscreen(&self) -> impl Future<Output = Result<(), PlatformCapabilityError>>;

    fn exit_fullscreen(&self) -> impl Future<Output = Result<(), PlatformCapabilityError>>;

    /// What the platform currently reports, not what was last requested.
    fn is_fullscreen(&self) -> bool;

    /// Notify `listener` about fullscreen changes, including ones the user
    /// triggers outside the viewer (e.g. pressing Escape).
    fn on_fullscreen_change(&self, listener: Rc<dyn Fn(bool)>) -> Subscription;

    fn apply_theme(&self, theme: Theme);

    fn print(&self) -> Result<(), PlatformCapabilityError>;

    /// Hand a staged file to the native save action under `file_name`.
    fn save(
        &self,
        staged: &Path,
        file_name: &str,
    ) -> impl Future<Output = Result<(), PlatformCapabilityError>>;
}

/// Platform for hosts without a display: no fullscreen, no print dialog,
/// downloads land in `output_dir`.
#[derive(Debug, Clone)]
pub struct HeadlessPlatform {
    output_dir: PathBuf,
}

impl HeadlessPlatform {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl Platform for HeadlessPlatform {
    async fn request_fullscreen(&self) -> Result<(), PlatformCapabilityError> {
        Err(PlatformCapabilityError::Unsupported("fullscreen"))
    }

    async fn exit_fullscreen(&self) -> Result<(), PlatformCapabilityError> {
        Err(PlatformCapabilityError::Unsupported("fullscreen"))
    }

    fn is_fullscreen(&self) -> bool {
        false
    }

    fn on_fullscreen_change(&self, _listener: Rc<dyn Fn(bool)>) -> Subscription {
        Subscription::noop()
    }

    fn apply_theme(&self, theme: Theme) {
        debug!(?theme, "theme applied");
    }

    fn print(&self) -> Result<(), PlatformCapabilityError> {
        Err(PlatformCapabilityError::Unsupported("print"))
    }

    async fn save(&self, staged: &Path, file_name: &str) -> Result<(), PlatformCapabilityError> {
        let target = self.output_dir.join(file_name);
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| PlatformCapabilityError::Failed(e.to_string()))?;
        tokio::fs::copy(staged, &target)
            .await
            .map_err(|e| PlatformCapabilityError::Failed(e.to_string()))?;
        info!(path = %target.display(), "document saved");
        Ok(())
    }
}
