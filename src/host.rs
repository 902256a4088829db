//! Collaborator interfaces the engine is driven through.
//!
//! The engine never owns windows, surfaces or client connections. Everything it
//! needs from the rest of the display server is reached through these traits,
//! which the display implements once and passes into each call as
//! `&mut dyn InsetsHost`. All calls happen while the per-display lock is held;
//! implementations are expected to queue expensive work (IPC, compositing) and
//! run it after the lock is released.

use crate::geometry::{Insets, Point, Rect};
use crate::state::{InsetsSourceControl, InsetsState};
use crate::types::{AdapterId, AnimationKind, ControlTarget, InsetType, Leash, WindowId, WindowType, WindowingMode};
use std::sync::Arc;

/// Display-wide layout facts handed to frame providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayFrames {
    pub display_frame: Rect,
    /// Area not covered by display cutouts.
    pub safe_frame: Rect,
}

/// Snapshot of what the layout engine knows about a window after layout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowInfo {
    pub window_type: WindowType,
    pub frame: Rect,
    pub given_content_insets: Insets,
    pub given_visible_insets: Insets,
    /// The client promised insets that have not arrived yet.
    pub given_insets_pending: bool,
    pub has_surface: bool,
    /// Window has drawn its first frame since the last relayout.
    pub drawn: bool,
    pub visible: bool,
    pub visible_ignoring_policy: bool,
    pub visible_by_policy: bool,
    /// Last frame number presented by the window's client root surface.
    pub frame_number: u64,
    /// Sources the window declares it provides on its own behalf.
    pub provides_insets_types: Vec<InsetType>,
    pub windowing_mode: WindowingMode,
    pub always_on_top: bool,
    /// Stacked above the input method, or layered relative to it.
    pub above_ime: bool,
}

impl WindowInfo {
    pub fn provides(&self, inset_type: InsetType) -> bool {
        self.provides_insets_types.contains(&inset_type)
    }
}

/// Computes the frame a source reports, given the window frame as input.
pub type FrameProvider = Arc<dyn Fn(&DisplayFrames, &WindowInfo, Rect) -> Rect + Send + Sync>;

/// Surface whose pending transaction is held back by `defer_transaction_until`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferredSurface {
    Window(WindowId),
    Leash(Leash),
}

/// Geometry and stacking information from the layout engine.
pub trait WindowLayout {
    fn display_frames(&self) -> DisplayFrames;

    /// `None` once the window is gone; callers treat that as a legal state.
    fn window(&self, window: WindowId) -> Option<WindowInfo>;

    /// Windows currently visible on the display, in any order.
    fn visible_windows(&self) -> Vec<WindowId>;

    fn input_method_window(&self) -> Option<WindowId>;

    /// Target the display currently routes IME input to.
    fn input_method_target(&self) -> Option<ControlTarget>;

    /// Windows whose stacking changed during this layout pass. Draining clears
    /// the list.
    fn drain_insets_changed_windows(&mut self) -> Vec<WindowId>;

    /// Insets state frozen on a window token while it runs a fixed-rotation
    /// transform.
    fn fixed_rotation_insets_state(&self, _window: WindowId) -> Option<InsetsState> {
        None
    }

    /// Window that should actually receive IME control on behalf of `window`.
    fn ime_control_target(&self, window: WindowId) -> ControlTarget {
        ControlTarget::Window(window)
    }

    /// Visibility the target last requested for a source.
    fn requested_visibility(&self, _target: ControlTarget, inset_type: InsetType) -> bool {
        inset_type.default_visibility()
    }

    /// Marks `window` as animatable by the provider of `inset_type`, or clears
    /// the role with `None`.
    fn set_controllable_inset_provider(&mut self, window: WindowId, inset_type: Option<InsetType>);
}

/// Surface operations on the compositor's pending transaction.
///
/// Frame numbers passed to `defer_transaction_until` come from
/// [`WindowInfo::frame_number`] and must be monotonic and never reused for a
/// given surface.
pub trait SurfaceCompositor {
    /// Starts an animation on the window surface and returns the freshly
    /// created leash, if the window still has a surface.
    fn begin_animation(
        &mut self,
        window: WindowId,
        adapter: AdapterId,
        hidden: bool,
        kind: AnimationKind,
    ) -> Option<Leash>;

    /// Tears down the window's running animation and removes its leash. Does
    /// not call back into the engine.
    fn cancel_animation(&mut self, window: WindowId);

    fn set_leash_position(&mut self, leash: Leash, position: Point);

    /// Hides the leash at full alpha.
    fn hide_leash(&mut self, leash: Leash);

    fn defer_transaction_until(&mut self, surface: DeferredSurface, barrier: WindowId, frame_number: u64);

    /// One-shot request: after the next transaction commit, the display must
    /// call `InsetsStateController::on_transaction_committed` exactly once.
    fn schedule_after_commit(&mut self);
}

/// Delivery of notifications to clients. Implementations enqueue; the
/// transport runs outside the lock.
pub trait InsetsClients {
    fn notify_insets_changed(&mut self, window: WindowId);

    /// `controls` is `None` when the target controls nothing any more.
    fn notify_insets_control_changed(&mut self, target: ControlTarget, controls: Option<&[InsetsSourceControl]>);

    fn show_insets(&mut self, target: ControlTarget, inset_type: InsetType);

    fn remove_ime_surface(&mut self);

    /// Ask for a relayout and layer assignment if one is needed.
    fn request_layout(&mut self);

    fn update_system_ui_visibility(&mut self);
}

/// Everything a display provides to its insets engine.
pub trait InsetsHost: WindowLayout + SurfaceCompositor + InsetsClients {}

impl<T: WindowLayout + SurfaceCompositor + InsetsClients + ?Sized> InsetsHost for T {}
