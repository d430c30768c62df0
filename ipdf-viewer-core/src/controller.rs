use std::rc::Rc;

use tracing::{debug, warn};

use crate::config::ViewerConfig;
use crate::error::PlatformCapabilityError;
use crate::platform::Platform;
use crate::subscription::Subscription;
use crate::viewport::{Theme, ViewportAction, ViewportState, ViewportStore};

/// Owns the viewport state of one viewer and the platform calls that go with
/// changing it.
pub struct ViewportController<P> {
    store: ViewportStore,
    platform: Rc<P>,
    _fullscreen_sync: Subscription,
}

impl<P: Platform> ViewportController<P> {
    pub fn new(config: &ViewerConfig, platform: Rc<P>) -> Self {
        let rules = config.viewport_rules();
        let mut initial = ViewportState::new(&rules, config.initial_rotation, config.theme);
        initial.is_fullscreen = platform.is_fullscreen();
        let store = ViewportStore::new(rules, initial);

        platform.apply_theme(initial.theme);

        let sync = store.clone();
        let fullscreen_sync = platform.on_fullscreen_change(Rc::new(move |active| {
            debug!(active, "platform fullscreen changed");
            sync.dispatch(ViewportAction::FullscreenChanged(active));
        }));

        Self {
            store,
            platform,
            _fullscreen_sync: fullscreen_sync,
        }
    }

    pub fn state(&self) -> ViewportState {
        self.store.get()
    }

    /// Shared handle for components that feed state back into the reducer.
    pub fn store(&self) -> ViewportStore {
        self.store.clone()
    }

    pub fn dispatch(&self, action: ViewportAction) -> ViewportState {
        self.store.dispatch(action)
    }

    pub fn zoom_in(&self) -> f32 {
        self.dispatch(ViewportAction::ZoomIn).zoom
    }

    pub fn zoom_out(&self) -> f32 {
        self.dispatch(ViewportAction::ZoomOut).zoom
    }

    pub fn rotate_left(&self) -> i32 {
        self.dispatch(ViewportAction::RotateLeft).rotation
    }

    pub fn rotate_right(&self) -> i32 {
        self.dispatch(ViewportAction::RotateRight).rotation
    }

    /// Zoom back to the configured initial value and rotation to 0.
    pub fn reset(&self) -> ViewportState {
        self.dispatch(ViewportAction::Reset)
    }

    pub fn toggle_theme(&self) -> Theme {
        let theme = self.dispatch(ViewportAction::ToggleTheme).theme;
        self.platform.apply_theme(theme);
        theme
    }

    pub async fn enter_fullscreen(&self) -> Result<(), PlatformCapabilityError> {
        match self.platform.request_fullscreen().await {
            Ok(()) => {
                self.sync_fullscreen();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "fullscreen request failed");
                Err(e)
            }
        }
    }

    pub async fn exit_fullscreen(&self) -> Result<(), PlatformCapabilityError> {
        match self.platform.exit_fullscreen().await {
            Ok(()) => {
                self.sync_fullscreen();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "leaving fullscreen failed");
                Err(e)
            }
        }
    }

    pub async fn toggle_fullscreen(&self) -> Result<(), PlatformCapabilityError> {
        if self.platform.is_fullscreen() {
            self.exit_fullscreen().await
        } else {
            self.enter_fullscreen().await
        }
    }

    // Trust the platform's reading over the request we just made.
    fn sync_fullscreen(&self) {
        self.dispatch(ViewportAction::FullscreenChanged(self.platform.is_fullscreen()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePlatform;
    use pretty_assertions::assert_eq;

    fn controller(config: ViewerConfig) -> (Rc<FakePlatform>, ViewportController<FakePlatform>) {
        let platform = Rc::new(FakePlatform::default());
        let controller = ViewportController::new(&config, platform.clone());
        (platform, controller)
    }

    #[test]
    fn starts_from_configured_defaults() {
        let config = ViewerConfig {
            initial_zoom: 1.5,
            initial_rotation: 90,
            theme: Theme::Dark,
            ..ViewerConfig::default()
        };
        let (platform, controller) = controller(config);
        let state = controller.state();
        assert_eq!(state.zoom, 1.5);
        assert_eq!(state.rotation, 90);
        assert_eq!(state.theme, Theme::Dark);
        assert!(!state.is_fullscreen);
        assert_eq!(platform.applied_themes(), vec![Theme::Dark]);
    }

    #[test]
    fn reset_twice_equals_reset_once() {
        let (_, controller) = controller(ViewerConfig::default());
        controller.zoom_in();
        controller.rotate_right();
        let once = controller.reset();
        let twice = controller.reset();
        assert_eq!(once, twice);
        assert_eq!(once.zoom, 1.0);
        assert_eq!(once.rotation, 0);
    }

    #[test]
    fn toggle_theme_reskins_platform() {
        let (platform, controller) = controller(ViewerConfig::default());
        assert_eq!(controller.toggle_theme(), Theme::Dark);
        assert_eq!(controller.toggle_theme(), Theme::Light);
        assert_eq!(platform.applied_themes(), vec![Theme::Light, Theme::Dark, Theme::Light]);
    }

    #[tokio::test]
    async fn fullscreen_round_trip() {
        let (_, controller) = controller(ViewerConfig::default());
        controller.enter_fullscreen().await.unwrap();
        assert!(controller.state().is_fullscreen);
        controller.exit_fullscreen().await.unwrap();
        assert!(!controller.state().is_fullscreen);
    }

    #[tokio::test]
    async fn denied_fullscreen_leaves_state_unchanged() {
        let (platform, controller) = controller(ViewerConfig::default());
        platform.deny_fullscreen();
        let before = controller.state();

        let result = controller.enter_fullscreen().await;
        assert!(matches!(result, Err(PlatformCapabilityError::Denied(_))));
        assert_eq!(controller.state(), before);
    }

    #[tokio::test]
    async fn external_exit_is_tracked() {
        let (platform, controller) = controller(ViewerConfig::default());
        controller.toggle_fullscreen().await.unwrap();
        assert!(controller.state().is_fullscreen);

        platform.user_exits_fullscreen();
        assert!(!controller.state().is_fullscreen);
    }

    #[test]
    fn dropping_controller_releases_fullscreen_listener() {
        let (platform, controller) = controller(ViewerConfig::default());
        assert_eq!(platform.fullscreen_listeners(), 1);
        drop(controller);
        assert_eq!(platform.fullscreen_listeners(), 0);
    }
}
