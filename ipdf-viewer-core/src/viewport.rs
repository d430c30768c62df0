use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Colour scheme the host skins the viewer with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Multiplicative zoom: every step scales by `step`, clamped to `[min, max]`.
///
/// This is the only zoom convention the viewer uses. It keeps each click
/// feeling the same size at 40% and at 400%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomPolicy {
    pub step: f32,
    pub min: f32,
    pub max: f32,
}

impl Default for ZoomPolicy {
    fn default() -> Self {
        Self {
            step: 1.1,
            min: 0.4,
            max: 5.0,
        }
    }
}

impl ZoomPolicy {
    /// Never panics, even for a policy that failed
    /// [`ViewerConfig::validate`](crate::ViewerConfig::validate); `max` wins
    /// over `min` when they are inverted.
    pub fn clamp(&self, zoom: f32) -> f32 {
        zoom.max(self.min).min(self.max)
    }

    pub fn zoom_in(&self, zoom: f32) -> f32 {
        self.clamp(zoom * self.step)
    }

    pub fn zoom_out(&self, zoom: f32) -> f32 {
        self.clamp(zoom / self.step)
    }
}

/// Fixed parameters the reducer needs besides the state itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportRules {
    pub zoom: ZoomPolicy,
    pub initial_zoom: f32,
}

impl Default for ViewportRules {
    fn default() -> Self {
        Self {
            zoom: ZoomPolicy::default(),
            initial_zoom: 1.0,
        }
    }
}

/// Zoom, rotation, theme, fullscreen and current page of one viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub zoom: f32,
    /// Degrees, unbounded. Interpreted modulo 360.
    pub rotation: i32,
    pub theme: Theme,
    pub is_fullscreen: bool,
    pub page_count: usize,
    /// 1-based; `None` while no pages are loaded.
    pub current_page: Option<usize>,
}

impl ViewportState {
    pub fn new(rules: &ViewportRules, rotation: i32, theme: Theme) -> Self {
        Self {
            zoom: rules.zoom.clamp(rules.initial_zoom),
            rotation,
            theme,
            is_fullscreen: false,
            page_count: 0,
            current_page: None,
        }
    }

    /// Rotation folded into `0..360`.
    pub fn normalized_rotation(&self) -> u16 {
        self.rotation.rem_euclid(360) as u16
    }

    pub fn transform(&self) -> PresentationTransform {
        PresentationTransform {
            scale: self.zoom,
            rotation: self.normalized_rotation(),
            origin: if self.zoom > LEFT_ANCHOR_ZOOM {
                TransformOrigin::TopLeft
            } else {
                TransformOrigin::TopCenter
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportAction {
    ZoomIn,
    ZoomOut,
    RotateLeft,
    RotateRight,
    Reset,
    ToggleTheme,
    FullscreenChanged(bool),
    /// The old document is gone; nothing is displayed until the next load.
    DocumentReplaced,
    DocumentLoaded { page_count: usize },
    PageVisible(usize),
}

/// The single place viewport state changes.
pub fn reduce(rules: &ViewportRules, state: ViewportState, action: ViewportAction) -> ViewportState {
    let mut next = state;
    match action {
        ViewportAction::ZoomIn => next.zoom = rules.zoom.zoom_in(state.zoom),
        ViewportAction::ZoomOut => next.zoom = rules.zoom.zoom_out(state.zoom),
        // Wrapping keeps left/right exact inverses. Past i32::MAX the mod-360
        // reading jumps by 256 degrees; that takes ~24 million turns and is accepted.
        ViewportAction::RotateLeft => next.rotation = state.rotation.wrapping_sub(90),
        ViewportAction::RotateRight => next.rotation = state.rotation.wrapping_add(90),
        ViewportAction::Reset => {
            next.zoom = rules.zoom.clamp(rules.initial_zoom);
            next.rotation = 0;
        }
        ViewportAction::ToggleTheme => next.theme = state.theme.toggled(),
        ViewportAction::FullscreenChanged(active) => next.is_fullscreen = active,
        ViewportAction::DocumentReplaced => {
            next.page_count = 0;
            next.current_page = None;
        }
        ViewportAction::DocumentLoaded { page_count } => {
            next.page_count = page_count;
            next.current_page = (page_count > 0).then_some(1);
        }
        ViewportAction::PageVisible(page) => {
            if (1..=state.page_count).contains(&page) {
                next.current_page = Some(page);
            }
        }
    }
    next
}

/// Shared handle to one viewer's viewport state.
///
/// Cloned into the fullscreen listener and the visibility tracker so that
/// platform callbacks dispatch through the same reducer as the controls.
#[derive(Debug, Clone)]
pub struct ViewportStore {
    rules: ViewportRules,
    state: Rc<Cell<ViewportState>>,
}

impl ViewportStore {
    pub fn new(rules: ViewportRules, initial: ViewportState) -> Self {
        Self {
            rules,
            state: Rc::new(Cell::new(initial)),
        }
    }

    pub fn get(&self) -> ViewportState {
        self.state.get()
    }

    pub fn rules(&self) -> &ViewportRules {
        &self.rules
    }

    pub fn dispatch(&self, action: ViewportAction) -> ViewportState {
        let next = reduce(&self.rules, self.state.get(), action);
        self.state.set(next);
        next
    }
}

/// Above this zoom the page column is anchored to the left edge so the
/// horizontal scroll range starts at the page's left margin.
pub const LEFT_ANCHOR_ZOOM: f32 = 1.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOrigin {
    TopLeft,
    TopCenter,
}

/// Visual transform applied over the rasterized surfaces at display time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresentationTransform {
    pub scale: f32,
    /// Degrees in `0..360`.
    pub rotation: u16,
    pub origin: TransformOrigin,
}

impl PresentationTransform {
    /// Bounding box of a `width` x `height` surface after scaling and rotating.
    pub fn displayed_size(&self, width: u32, height: u32) -> (f32, f32) {
        let w = width as f32 * self.scale;
        let h = height as f32 * self.scale;
        match self.rotation {
            0 | 180 => (w, h),
            90 | 270 => (h, w),
            degrees => {
                let radians = f32::from(degrees).to_radians();
                let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
                (w * cos + h * sin, w * sin + h * cos)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn initial() -> (ViewportRules, ViewportState) {
        let rules = ViewportRules::default();
        let state = ViewportState::new(&rules, 0, Theme::Light);
        (rules, state)
    }

    fn apply(rules: &ViewportRules, state: ViewportState, actions: &[ViewportAction]) -> ViewportState {
        actions.iter().fold(state, |s, a| reduce(rules, s, *a))
    }

    #[test]
    fn two_zoom_steps_from_one() {
        let (rules, state) = initial();
        let zoomed = apply(&rules, state, &[ViewportAction::ZoomIn, ViewportAction::ZoomIn]);
        assert!((zoomed.zoom - 1.21).abs() < 1e-5, "zoom was {}", zoomed.zoom);
    }

    #[test]
    fn zoom_saturates_at_bounds() {
        let (rules, state) = initial();
        let max = apply(&rules, state, &[ViewportAction::ZoomIn; 100]);
        assert_eq!(max.zoom, 5.0);
        let min = apply(&rules, state, &[ViewportAction::ZoomOut; 100]);
        assert_eq!(min.zoom, 0.4);
    }

    #[test]
    fn three_right_rotations() {
        let (rules, state) = initial();
        let rotated = apply(&rules, state, &[ViewportAction::RotateRight; 3]);
        assert_eq!(rotated.rotation, 270);
        assert_eq!(rotated.normalized_rotation(), 270);
    }

    #[test]
    fn negative_rotation_normalizes() {
        let (rules, state) = initial();
        let rotated = reduce(&rules, state, ViewportAction::RotateLeft);
        assert_eq!(rotated.rotation, -90);
        assert_eq!(rotated.normalized_rotation(), 270);
    }

    #[test]
    fn rotation_wraps_at_integer_limits() {
        let (rules, mut state) = initial();
        state.rotation = i32::MAX - 10;
        let right = reduce(&rules, state, ViewportAction::RotateRight);
        assert_eq!(right.rotation, i32::MIN + 79);
        assert!(right.normalized_rotation() < 360);
        assert_eq!(reduce(&rules, right, ViewportAction::RotateLeft).rotation, i32::MAX - 10);
    }

    #[test]
    fn inverted_policy_clamps_without_panicking() {
        let policy = ZoomPolicy {
            step: 1.1,
            min: 2.0,
            max: 0.3,
        };
        assert_eq!(policy.clamp(1.0), 0.3);
        assert_eq!(policy.clamp(f32::NAN), 0.3);

        let rules = ViewportRules {
            zoom: policy,
            initial_zoom: 1.0,
        };
        assert_eq!(ViewportState::new(&rules, 0, Theme::Light).zoom, 0.3);
    }

    #[test]
    fn reset_keeps_theme_and_fullscreen() {
        let rules = ViewportRules {
            initial_zoom: 1.5,
            ..ViewportRules::default()
        };
        let state = ViewportState::new(&rules, 0, Theme::Light);
        let changed = apply(
            &rules,
            state,
            &[
                ViewportAction::ZoomIn,
                ViewportAction::RotateRight,
                ViewportAction::ToggleTheme,
                ViewportAction::FullscreenChanged(true),
                ViewportAction::Reset,
            ],
        );
        assert_eq!(changed.zoom, 1.5);
        assert_eq!(changed.rotation, 0);
        assert_eq!(changed.theme, Theme::Dark);
        assert!(changed.is_fullscreen);
    }

    #[test]
    fn initial_zoom_outside_bounds_is_clamped() {
        let rules = ViewportRules {
            initial_zoom: 9.0,
            ..ViewportRules::default()
        };
        assert_eq!(ViewportState::new(&rules, 0, Theme::Light).zoom, 5.0);
    }

    #[test]
    fn page_tracking_follows_document() {
        let (rules, state) = initial();
        let loaded = reduce(&rules, state, ViewportAction::DocumentLoaded { page_count: 3 });
        assert_eq!(loaded.current_page, Some(1));

        let scrolled = reduce(&rules, loaded, ViewportAction::PageVisible(3));
        assert_eq!(scrolled.current_page, Some(3));

        let out_of_range = reduce(&rules, scrolled, ViewportAction::PageVisible(4));
        assert_eq!(out_of_range, scrolled);

        let replaced = reduce(&rules, scrolled, ViewportAction::DocumentReplaced);
        assert_eq!(replaced.current_page, None);
        assert_eq!(replaced.page_count, 0);
        assert_eq!(reduce(&rules, replaced, ViewportAction::PageVisible(1)).current_page, None);
    }

    #[test]
    fn empty_document_has_no_current_page() {
        let (rules, state) = initial();
        let loaded = reduce(&rules, state, ViewportAction::DocumentLoaded { page_count: 0 });
        assert_eq!(loaded.current_page, None);
    }

    #[test]
    fn store_dispatch_updates_shared_state() {
        let (rules, state) = initial();
        let store = ViewportStore::new(rules, state);
        let other = store.clone();
        store.dispatch(ViewportAction::ToggleTheme);
        assert_eq!(other.get().theme, Theme::Dark);
    }

    #[test]
    fn transform_anchors_left_when_zoomed_far() {
        let (_, mut state) = initial();
        assert_eq!(state.transform().origin, TransformOrigin::TopCenter);
        state.zoom = 2.0;
        state.rotation = 450;
        let transform = state.transform();
        assert_eq!(transform.origin, TransformOrigin::TopLeft);
        assert_eq!(transform.rotation, 90);
        assert_eq!(transform.displayed_size(100, 50), (100.0, 200.0));
    }

    fn any_action() -> impl Strategy<Value = ViewportAction> {
        prop_oneof![
            Just(ViewportAction::ZoomIn),
            Just(ViewportAction::ZoomOut),
            Just(ViewportAction::RotateLeft),
            Just(ViewportAction::RotateRight),
            Just(ViewportAction::Reset),
            Just(ViewportAction::ToggleTheme),
            any::<bool>().prop_map(ViewportAction::FullscreenChanged),
            (0usize..20).prop_map(|page_count| ViewportAction::DocumentLoaded { page_count }),
            (0usize..25).prop_map(ViewportAction::PageVisible),
            Just(ViewportAction::DocumentReplaced),
        ]
    }

    proptest! {
        #[test]
        fn zoom_stays_in_bounds(actions in prop::collection::vec(any_action(), 0..200)) {
            let (rules, state) = initial();
            let mut s = state;
            for action in actions {
                s = reduce(&rules, s, action);
                prop_assert!(s.zoom >= rules.zoom.min && s.zoom <= rules.zoom.max);
            }
        }

        #[test]
        fn current_page_stays_in_range(actions in prop::collection::vec(any_action(), 0..200)) {
            let (rules, state) = initial();
            let mut s = state;
            for action in actions {
                s = reduce(&rules, s, action);
                match s.current_page {
                    Some(page) => prop_assert!(page >= 1 && page <= s.page_count),
                    None => prop_assert!(s.page_count == 0),
                }
            }
        }

        #[test]
        fn rotate_left_then_right_restores(rotation in any::<i32>()) {
            let (rules, mut state) = initial();
            state.rotation = rotation;
            let left = reduce(&rules, state, ViewportAction::RotateLeft);
            let back = reduce(&rules, left, ViewportAction::RotateRight);
            prop_assert_eq!(back.rotation, rotation);
        }

        #[test]
        fn reset_is_idempotent(actions in prop::collection::vec(any_action(), 0..50)) {
            let (rules, state) = initial();
            let s = actions.into_iter().fold(state, |s, a| reduce(&rules, s, a));
            let once = reduce(&rules, s, ViewportAction::Reset);
            let twice = reduce(&rules, once, ViewportAction::Reset);
            prop_assert_eq!(once, twice);
        }
    }
}
