//! Recording display used by the integration tests.
//!
//! Implements every collaborator trait over plain maps and records each call
//! the engine makes, so tests can assert on exactly what a real display would
//! have been asked to do.

#![allow(dead_code)]

use axiom_insets::geometry::{Point, Rect};
use axiom_insets::host::{
    DeferredSurface, DisplayFrames, InsetsClients, SurfaceCompositor, WindowInfo, WindowLayout,
};
use axiom_insets::state::{InsetsSourceControl, InsetsState};
use axiom_insets::types::{AdapterId, AnimationKind, ControlTarget, InsetType, Leash, WindowId, WindowType};
use axiom_insets::InsetsStateController;
use std::collections::{BTreeMap, BTreeSet};

pub const DISPLAY: Rect = Rect {
    left: 0,
    top: 0,
    right: 1080,
    bottom: 2340,
};

pub const STATUS_BAR: WindowId = WindowId(1);
pub const NAV_BAR: WindowId = WindowId(2);
pub const IME_WINDOW: WindowId = WindowId(3);
pub const APP: WindowId = WindowId(10);
pub const OTHER_APP: WindowId = WindowId(11);

pub fn target(window: WindowId) -> ControlTarget {
    ControlTarget::Window(window)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SetControllable(WindowId, Option<InsetType>),
    BeginAnimation { window: WindowId, adapter: AdapterId, hidden: bool, leash: Leash },
    CancelAnimation(WindowId),
    LeashPosition(Leash, Point),
    HideLeash(Leash),
    Defer { surface: DeferredSurface, barrier: WindowId, frame_number: u64 },
    ScheduleAfterCommit,
    InsetsChanged(WindowId),
    ControlChanged(ControlTarget, Option<Vec<InsetsSourceControl>>),
    ShowInsets(ControlTarget, InsetType),
    RemoveImeSurface,
    RequestLayout,
    UpdateSystemUi,
}

#[derive(Debug, Default)]
pub struct FakeDisplay {
    pub display_frames: DisplayFrames,
    pub windows: BTreeMap<WindowId, WindowInfo>,
    pub input_method_window: Option<WindowId>,
    pub input_method_target: Option<ControlTarget>,
    pub insets_changed_windows: Vec<WindowId>,
    pub fixed_rotation: BTreeMap<WindowId, InsetsState>,
    pub ime_redirects: BTreeMap<WindowId, ControlTarget>,
    pub requested_visibility: BTreeMap<(ControlTarget, InsetType), bool>,
    pub controllable: BTreeMap<WindowId, InsetType>,
    /// Windows with a running animation and the leash it created.
    pub animations: BTreeMap<WindowId, Leash>,
    pub next_leash: u64,
    pub events: Vec<Event>,
}

impl FakeDisplay {
    pub fn new() -> Self {
        Self {
            display_frames: DisplayFrames {
                display_frame: DISPLAY,
                safe_frame: DISPLAY,
            },
            ..Self::default()
        }
    }

    /// A laid-out, drawn, visible window with a surface.
    pub fn add_window(&mut self, id: WindowId, window_type: WindowType, frame: Rect) -> &mut WindowInfo {
        self.windows.insert(
            id,
            WindowInfo {
                window_type,
                frame,
                has_surface: true,
                drawn: true,
                visible: true,
                visible_ignoring_policy: true,
                visible_by_policy: true,
                frame_number: 1,
                ..WindowInfo::default()
            },
        );
        self.windows.get_mut(&id).unwrap()
    }

    pub fn window_mut(&mut self, id: WindowId) -> &mut WindowInfo {
        self.windows.get_mut(&id).unwrap()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|event| pred(event)).count()
    }

    pub fn schedule_count(&self) -> usize {
        self.count(|event| *event == Event::ScheduleAfterCommit)
    }

    pub fn control_notifications(&self) -> Vec<(ControlTarget, Option<Vec<InsetsSourceControl>>)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::ControlChanged(target, controls) => Some((*target, controls.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn insets_changed(&self) -> BTreeSet<WindowId> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::InsetsChanged(window) => Some(*window),
                _ => None,
            })
            .collect()
    }

    pub fn leashes_begun(&self) -> Vec<Leash> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::BeginAnimation { leash, .. } => Some(*leash),
                _ => None,
            })
            .collect()
    }

    /// Simulates the compositor committing and firing the after-commit
    /// callback, if one was requested since the last call.
    pub fn commit(&mut self, controller: &mut InsetsStateController) {
        controller.on_transaction_committed(self);
    }
}

impl WindowLayout for FakeDisplay {
    fn display_frames(&self) -> DisplayFrames {
        self.display_frames
    }

    fn window(&self, window: WindowId) -> Option<WindowInfo> {
        self.windows.get(&window).cloned()
    }

    fn visible_windows(&self) -> Vec<WindowId> {
        self.windows
            .iter()
            .filter(|(_, info)| info.visible)
            .map(|(id, _)| *id)
            .collect()
    }

    fn input_method_window(&self) -> Option<WindowId> {
        self.input_method_window
    }

    fn input_method_target(&self) -> Option<ControlTarget> {
        self.input_method_target
    }

    fn drain_insets_changed_windows(&mut self) -> Vec<WindowId> {
        std::mem::take(&mut self.insets_changed_windows)
    }

    fn fixed_rotation_insets_state(&self, window: WindowId) -> Option<InsetsState> {
        self.fixed_rotation.get(&window).cloned()
    }

    fn ime_control_target(&self, window: WindowId) -> ControlTarget {
        self.ime_redirects
            .get(&window)
            .copied()
            .unwrap_or(ControlTarget::Window(window))
    }

    fn requested_visibility(&self, target: ControlTarget, inset_type: InsetType) -> bool {
        self.requested_visibility
            .get(&(target, inset_type))
            .copied()
            .unwrap_or_else(|| inset_type.default_visibility())
    }

    fn set_controllable_inset_provider(&mut self, window: WindowId, inset_type: Option<InsetType>) {
        match inset_type {
            Some(ty) => {
                self.controllable.insert(window, ty);
            }
            None => {
                self.controllable.remove(&window);
            }
        }
        self.events.push(Event::SetControllable(window, inset_type));
    }
}

impl SurfaceCompositor for FakeDisplay {
    fn begin_animation(
        &mut self,
        window: WindowId,
        adapter: AdapterId,
        hidden: bool,
        _kind: AnimationKind,
    ) -> Option<Leash> {
        if !self.windows.get(&window)?.has_surface {
            return None;
        }
        self.next_leash += 1;
        let leash = Leash(self.next_leash);
        self.animations.insert(window, leash);
        self.events.push(Event::BeginAnimation {
            window,
            adapter,
            hidden,
            leash,
        });
        Some(leash)
    }

    fn cancel_animation(&mut self, window: WindowId) {
        self.animations.remove(&window);
        self.events.push(Event::CancelAnimation(window));
    }

    fn set_leash_position(&mut self, leash: Leash, position: Point) {
        self.events.push(Event::LeashPosition(leash, position));
    }

    fn hide_leash(&mut self, leash: Leash) {
        self.events.push(Event::HideLeash(leash));
    }

    fn defer_transaction_until(&mut self, surface: DeferredSurface, barrier: WindowId, frame_number: u64) {
        self.events.push(Event::Defer {
            surface,
            barrier,
            frame_number,
        });
    }

    fn schedule_after_commit(&mut self) {
        self.events.push(Event::ScheduleAfterCommit);
    }
}

impl InsetsClients for FakeDisplay {
    fn notify_insets_changed(&mut self, window: WindowId) {
        self.events.push(Event::InsetsChanged(window));
    }

    fn notify_insets_control_changed(&mut self, target: ControlTarget, controls: Option<&[InsetsSourceControl]>) {
        self.events
            .push(Event::ControlChanged(target, controls.map(<[InsetsSourceControl]>::to_vec)));
    }

    fn show_insets(&mut self, target: ControlTarget, inset_type: InsetType) {
        self.events.push(Event::ShowInsets(target, inset_type));
    }

    fn remove_ime_surface(&mut self) {
        self.events.push(Event::RemoveImeSurface);
    }

    fn request_layout(&mut self) {
        self.events.push(Event::RequestLayout);
    }

    fn update_system_ui_visibility(&mut self) {
        self.events.push(Event::UpdateSystemUi);
    }
}

pub fn status_bar_frame() -> Rect {
    Rect::new(0, 0, 1080, 80)
}

pub fn nav_bar_frame() -> Rect {
    Rect::new(0, 2200, 1080, 2340)
}

pub fn ime_frame() -> Rect {
    Rect::new(0, 1400, 1080, 2200)
}

/// A display with status bar, navigation bar and one app window, each bar
/// attached to its provider and laid out once. Events are cleared.
pub fn bars_display(controller: &mut InsetsStateController) -> FakeDisplay {
    let mut display = FakeDisplay::new();
    display.add_window(STATUS_BAR, WindowType::StatusBar, status_bar_frame());
    display.add_window(NAV_BAR, WindowType::NavigationBar, nav_bar_frame());
    display.add_window(APP, WindowType::Application, DISPLAY);

    controller.set_window(InsetType::StatusBar, Some(STATUS_BAR), None, None, &mut display);
    controller.set_window(InsetType::NavigationBar, Some(NAV_BAR), None, None, &mut display);
    controller.on_post_layout(&mut display);
    display.clear_events();
    display
}
