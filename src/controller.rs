//! Display-wide insets state controller
//!
//! Aggregates the per-type [`InsetsSourceProvider`]s into the display's
//! [`InsetsState`], decides which target holds control of each type, and
//! computes the filtered state every recipient window is sent.
//!
//! # Flow per layout pass
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  providers   │──►│ rebuild      │──►│ diff against │──►│ broadcast to │
//! │  post-layout │   │ merged state │   │ last dispatch│   │ visible wins │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! Control changes are not delivered immediately. Affected targets are
//! queued and delivered in one flush from
//! [`InsetsStateController::on_transaction_committed`], after every provider
//! has been told its leash transaction is on screen.
//!
//! # Usage
//!
//! ```no_run
//! use axiom_insets::{EngineConfig, InsetsStateController};
//! # fn host() -> &'static mut dyn axiom_insets::host::InsetsHost { unimplemented!() }
//! use axiom_insets::types::{ControlTarget, InsetType, WindowId};
//!
//! let config = EngineConfig::default();
//! let mut controller = InsetsStateController::new(&config.insets);
//! let host = host();
//!
//! controller.set_window(InsetType::StatusBar, Some(WindowId(1)), None, None, host);
//! controller.on_control_changed(InsetType::StatusBar, Some(ControlTarget::Window(WindowId(2))), host);
//! controller.on_post_layout(host);
//! // ...compositor commits, then:
//! controller.on_transaction_committed(host);
//! ```

use crate::batch::ControlChangeBatch;
use crate::config::{InsetsConfig, InsetsMode};
use crate::control_map::{ControlEntry, ControlRole, ControlTargetMap};
use crate::geometry::Rect;
use crate::host::{DisplayFrames, FrameProvider, InsetsHost};
use crate::provider::{InsetsSourceProvider, ProviderSnapshot};
use crate::state::{InsetsSource, InsetsSourceControl, InsetsState};
use crate::types::{AdapterId, ControlTarget, InsetType, WindowId, WindowType, WindowingMode};
use log::{debug, info, trace};
use parking_lot::Mutex;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Attributes of a window that is about to be added, used to predict the
/// insets it will see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowMetricsRequest {
    pub window_type: WindowType,
    pub provides_insets_types: Vec<InsetType>,
    pub windowing_mode: WindowingMode,
    pub always_on_top: bool,
}

pub struct InsetsStateController {
    config: InsetsConfig,
    state: InsetsState,
    last_state: InsetsState,
    providers: BTreeMap<InsetType, InsetsSourceProvider>,
    control_map: ControlTargetMap,
    pending: ControlChangeBatch,
}

/// The per-display lock. All engine mutation happens while it is held.
pub type SharedInsetsController = Arc<Mutex<InsetsStateController>>;

impl InsetsStateController {
    pub fn new(config: &InsetsConfig) -> Self {
        info!("🧩 Insets controller created (mode: {:?})", config.mode);
        Self {
            config: config.clone(),
            state: InsetsState::new(),
            last_state: InsetsState::new(),
            providers: BTreeMap::new(),
            control_map: ControlTargetMap::new(),
            pending: ControlChangeBatch::new(),
        }
    }

    pub fn shared(config: &InsetsConfig) -> SharedInsetsController {
        Arc::new(Mutex::new(Self::new(config)))
    }

    pub fn mode(&self) -> InsetsMode {
        self.config.mode
    }

    /// The provider of `inset_type`, created on first use.
    ///
    /// Mutations made directly on the returned provider are folded into the
    /// control maps at the start of the next controller operation; prefer the
    /// controller entry points, which do it immediately.
    pub fn get_source_provider(&mut self, inset_type: InsetType) -> &mut InsetsSourceProvider {
        let mode = self.config.mode;
        let state = &mut self.state;
        self.providers.entry(inset_type).or_insert_with(|| {
            debug!("creating {} provider", inset_type);
            let provider = InsetsSourceProvider::new(inset_type, mode);
            state.add_source(provider.source().clone());
            provider
        })
    }

    pub fn ime_source_provider(&mut self) -> &mut InsetsSourceProvider {
        self.get_source_provider(InsetType::Ime)
    }

    /// The provider of `inset_type`, if it exists.
    pub fn peek_source_provider(&self, inset_type: InsetType) -> Option<&InsetsSourceProvider> {
        self.providers.get(&inset_type)
    }

    pub fn raw_insets_state(&self) -> &InsetsState {
        &self.state
    }

    pub fn last_dispatched_state(&self) -> &InsetsState {
        &self.last_state
    }

    pub fn control_map(&self) -> &ControlTargetMap {
        &self.control_map
    }

    pub fn pending_control_changes(&self) -> &[ControlTarget] {
        self.pending.targets()
    }

    pub fn control_target_of(&self, inset_type: InsetType) -> Option<ControlTarget> {
        self.control_map.target_of(inset_type, ControlRole::Real)
    }

    pub fn is_fake_target(&self, inset_type: InsetType, target: ControlTarget) -> bool {
        self.control_map.target_of(inset_type, ControlRole::Fake) == Some(target)
    }

    /// Attaches `window` to the source of `inset_type`, or detaches with `None`.
    pub fn set_window(
        &mut self,
        inset_type: InsetType,
        window: Option<WindowId>,
        frame_provider: Option<FrameProvider>,
        ime_frame_provider: Option<FrameProvider>,
        host: &mut dyn InsetsHost,
    ) {
        self.reconcile_all(host);
        self.get_source_provider(inset_type)
            .set_window(window, frame_provider, ime_frame_provider, host);
        self.reconcile(inset_type, host);
        self.rebuild_state();
    }

    pub fn start_seamless_rotation(&mut self, inset_type: InsetType, host: &mut dyn InsetsHost) {
        self.reconcile_all(host);
        if let Some(provider) = self.providers.get_mut(&inset_type) {
            provider.start_seamless_rotation(host);
        }
        self.reconcile(inset_type, host);
        self.rebuild_state();
    }

    pub fn finish_seamless_rotation(&mut self, inset_type: InsetType, timed_out: bool, host: &mut dyn InsetsHost) {
        self.reconcile_all(host);
        if let Some(provider) = self.providers.get_mut(&inset_type) {
            provider.finish_seamless_rotation(timed_out, host);
        }
    }

    /// The compositor cancelled an insets-control animation on its own.
    pub fn on_animation_cancelled(&mut self, adapter: AdapterId, host: &mut dyn InsetsHost) {
        self.reconcile_all(host);
        if let Some(provider) = self.providers.get_mut(&adapter.inset_type) {
            provider.on_animation_cancelled(adapter, host);
        }
        self.reconcile(adapter.inset_type, host);
        self.rebuild_state();
    }

    /// The state `recipient` should be sent.
    pub fn get_insets_for_dispatch<'a>(&'a self, recipient: WindowId, host: &dyn InsetsHost) -> Cow<'a, InsetsState> {
        if let Some(rotated) = host.fixed_rotation_insets_state(recipient) {
            return Cow::Owned(rotated);
        }

        let own_type = self.controllable_type_of(recipient);
        let info = host.window(recipient);
        let windowing_mode = info.as_ref().map(|info| info.windowing_mode).unwrap_or_default();
        let always_on_top = info.as_ref().map(|info| info.always_on_top).unwrap_or(false);
        let above_ime = host.input_method_window().is_some()
            && info.as_ref().map(|info| info.above_ime).unwrap_or(false);

        self.insets_for_dispatch_inner(own_type, windowing_mode, always_on_top, above_ime)
    }

    /// The state a window with `request` attributes would be sent once added.
    pub fn get_insets_for_window_metrics(&self, request: &WindowMetricsRequest) -> Cow<'_, InsetsState> {
        let inset_type = inset_type_for_window(request.window_type, &request.provides_insets_types);
        self.insets_for_dispatch_inner(inset_type, request.windowing_mode, request.always_on_top, false)
    }

    fn insets_for_dispatch_inner(
        &self,
        own_type: Option<InsetType>,
        windowing_mode: WindowingMode,
        always_on_top: bool,
        above_ime: bool,
    ) -> Cow<'_, InsetsState> {
        let mut state = Cow::Borrowed(&self.state);

        if let Some(own_type) = own_type {
            let filtered = state.to_mut();
            filtered.remove_source(own_type);

            match own_type {
                // The navigation bar is not influenced by anything else.
                InsetType::NavigationBar | InsetType::ExtraNavigationBar => {
                    for ty in [
                        InsetType::Ime,
                        InsetType::StatusBar,
                        InsetType::ClimateBar,
                        InsetType::CaptionBar,
                    ] {
                        filtered.remove_source(ty);
                    }
                }
                InsetType::StatusBar | InsetType::ClimateBar => {
                    filtered.remove_source(InsetType::CaptionBar);
                }
                // The IME sometimes needs different frames, e.g. for the
                // navigation bar in gesture navigation.
                InsetType::Ime => {
                    for provider in self.providers.values().filter(|p| p.overrides_ime_frame()) {
                        let mut source = filtered
                            .source(provider.inset_type())
                            .cloned()
                            .unwrap_or_else(|| InsetsSource::new(provider.inset_type()));
                        source.frame = provider.ime_override_frame();
                        filtered.add_source(source);
                    }
                }
                _ => {}
            }
        }

        if windowing_mode.is_floating() || (windowing_mode == WindowingMode::MultiWindow && always_on_top) {
            let filtered = state.to_mut();
            filtered.remove_source(InsetType::StatusBar);
            filtered.remove_source(InsetType::NavigationBar);
        }

        if above_ime && state.is_visible(InsetType::Ime) {
            // A window above the keyboard is not covered by it.
            let hidden = InsetsSource::new(InsetType::Ime)
                .with_visible(false)
                .with_frame(Rect::EMPTY);
            state.to_mut().add_source(hidden);
        }

        state
    }

    /// Controls `target` holds, in the order it acquired them. `None` when it
    /// controls nothing.
    pub fn get_controls_for_dispatch(&self, target: ControlTarget) -> Option<Vec<InsetsSourceControl>> {
        let entries = self.control_map.entries_for(target)?;
        let controls = entries
            .iter()
            .filter_map(|(inset_type, role)| {
                let provider = self.providers.get(inset_type)?;
                match role {
                    ControlRole::Real => provider.get_control(target),
                    ControlRole::Fake => (provider.fake_control_target() == Some(target))
                        .then(|| provider.fake_control()),
                }
            })
            .collect();
        Some(controls)
    }

    /// Runs once per layout pass, after window geometry is final.
    pub fn on_post_layout(&mut self, host: &mut dyn InsetsHost) {
        self.reconcile_all(host);
        self.state.display_frame = host.display_frames().display_frame;

        let mut reissued = Vec::new();
        for provider in self.providers.values_mut() {
            if let Some(target) = provider.on_post_layout(host) {
                reissued.push(target);
            }
        }
        self.reconcile_all(host);
        for target in reissued {
            self.pending.enqueue(target, host);
        }
        self.rebuild_state();

        let restacked = host.drain_insets_changed_windows();
        if self.last_state != self.state {
            self.last_state = self.state.clone();
            self.notify_insets_changed(host);
        } else {
            // The global state is unchanged, but stacking changes can still
            // change what individual windows are sent.
            for window in restacked {
                if host.window(window).map(|info| info.visible).unwrap_or(false) {
                    host.notify_insets_changed(window);
                }
            }
        }

        if let Some(ime) = self.providers.get_mut(&InsetType::Ime) {
            ime.check_show_ime_post_layout(host);
        }
    }

    /// Visibility requests from `target`. Returns whether any source changed.
    pub fn on_insets_modified(
        &mut self,
        target: ControlTarget,
        requested: &InsetsState,
        host: &mut dyn InsetsHost,
    ) -> bool {
        self.reconcile_all(host);
        let mut changed = false;
        for source in requested.sources() {
            if let Some(provider) = self.providers.get_mut(&source.inset_type) {
                changed |= provider.on_insets_modified(target, source, host);
            }
        }
        if changed {
            debug!("{} changed requested insets visibility", target);
            self.rebuild_state();
            self.notify_insets_changed(host);
            host.update_system_ui_visibility();
        }
        changed
    }

    /// Sources that providers backed by `window` would produce if the window
    /// had `window_frame`, added to `state`.
    pub fn compute_simulated_state(
        &self,
        state: &mut InsetsState,
        window: WindowId,
        display_frames: &DisplayFrames,
        window_frame: Rect,
        host: &dyn InsetsHost,
    ) {
        for provider in self.providers.values().filter(|p| p.window() == Some(window)) {
            state.add_source(provider.create_simulated_source(display_frames, window_frame, host));
        }
    }

    /// The IME target changed. A `None` target is replaced by the built-in
    /// empty IME target so the IME leash always has an owner that keeps it
    /// hidden.
    pub fn on_ime_control_target_changed(&mut self, ime_target: Option<ControlTarget>, host: &mut dyn InsetsHost) {
        let target = match ime_target {
            Some(target) => Some(target),
            None if self.config.ime_fallback_target => Some(ControlTarget::EmptyIme),
            None => None,
        };
        debug!("ime control target -> {:?}", target);
        self.on_control_changed(InsetType::Ime, target, host);
    }

    /// The focused window able to control the system bars changed.
    pub fn on_bar_control_target_changed(
        &mut self,
        status_controlling: Option<ControlTarget>,
        fake_status_controlling: Option<ControlTarget>,
        nav_controlling: Option<ControlTarget>,
        fake_nav_controlling: Option<ControlTarget>,
        host: &mut dyn InsetsHost,
    ) {
        self.on_control_changed(InsetType::StatusBar, status_controlling, host);
        self.on_control_changed(InsetType::NavigationBar, nav_controlling, host);
        self.on_control_changed(InsetType::ClimateBar, status_controlling, host);
        self.on_control_changed(InsetType::ExtraNavigationBar, nav_controlling, host);
        self.on_control_fake_target_changed(InsetType::StatusBar, fake_status_controlling, host);
        self.on_control_fake_target_changed(InsetType::NavigationBar, fake_nav_controlling, host);
        self.on_control_fake_target_changed(InsetType::ClimateBar, fake_status_controlling, host);
        self.on_control_fake_target_changed(InsetType::ExtraNavigationBar, fake_nav_controlling, host);
    }

    /// Hands control of `inset_type` to `target`. Both the previous and the new
    /// holder are queued for notification.
    pub fn on_control_changed(
        &mut self,
        inset_type: InsetType,
        target: Option<ControlTarget>,
        host: &mut dyn InsetsHost,
    ) {
        self.reconcile_all(host);
        let previous = self.control_map.target_of(inset_type, ControlRole::Real);
        if target == previous {
            return;
        }
        let Some(provider) = self.providers.get_mut(&inset_type) else {
            return;
        };
        if !provider.is_controllable() {
            return;
        }

        provider.update_control_for_target(target, false, host);
        // The provider may have redirected the target.
        let actual = provider.control_target();
        let revoked = provider.take_revoked();

        for target in revoked {
            self.notify_control_revoked(target, inset_type);
            self.pending.enqueue(target, host);
        }
        if let Some(previous) = previous {
            self.control_map.remove_entry(previous, inset_type, ControlRole::Real);
            self.pending.enqueue(previous, host);
        }
        if let Some(actual) = actual {
            self.control_map.insert(inset_type, ControlRole::Real, actual);
            self.pending.enqueue(actual, host);
        }
        self.rebuild_state();
    }

    /// Sets the target that is told it controls `inset_type` without getting
    /// a leash.
    ///
    /// Lets an app keep believing it controls the bars while, for example,
    /// transient bars are showing, so its show/hide intentions still arrive.
    pub fn on_control_fake_target_changed(
        &mut self,
        inset_type: InsetType,
        fake_target: Option<ControlTarget>,
        host: &mut dyn InsetsHost,
    ) {
        if self.config.mode != InsetsMode::Full {
            return;
        }
        self.reconcile_all(host);
        let previous = self.control_map.target_of(inset_type, ControlRole::Fake);
        if fake_target == previous {
            return;
        }
        let Some(provider) = self.providers.get_mut(&inset_type) else {
            return;
        };
        provider.update_control_for_fake_target(fake_target);

        if let Some(previous) = previous {
            self.control_map.remove_entry(previous, inset_type, ControlRole::Fake);
            self.pending.enqueue(previous, host);
        }
        if let Some(fake_target) = fake_target {
            self.control_map.insert(inset_type, ControlRole::Fake, fake_target);
            self.pending.enqueue(fake_target, host);
        }
    }

    /// A provider revoked `target`'s control of `inset_type`. Only updates the
    /// maps; notification is up to whoever caused the revocation.
    pub fn notify_control_revoked(&mut self, target: ControlTarget, inset_type: InsetType) {
        if self.control_map.remove_entry(target, inset_type, ControlRole::Real) {
            trace!("{} unlinked from {}", target, inset_type);
        }
    }

    /// Queues `target` for the next control-changed flush.
    pub fn notify_control_changed(&mut self, target: ControlTarget, host: &mut dyn InsetsHost) {
        self.pending.enqueue(target, host);
    }

    /// After-commit callback requested through
    /// [`crate::host::SurfaceCompositor::schedule_after_commit`].
    ///
    /// Marks every leash ready, then tells each queued target once.
    pub fn on_transaction_committed(&mut self, host: &mut dyn InsetsHost) {
        if !self.pending.is_scheduled() {
            trace!("after-commit callback with nothing queued");
            return;
        }
        for provider in self.providers.values_mut() {
            provider.on_surface_transaction_applied();
        }

        let targets = self.pending.take();
        debug!("flushing insets control changes to {} target(s)", targets.len());
        for target in targets {
            let controls = self.get_controls_for_dispatch(target);
            if target == ControlTarget::EmptyIme {
                let holds_ime = controls
                    .iter()
                    .flatten()
                    .any(|control| control.inset_type == InsetType::Ime);
                if holds_ime {
                    host.remove_ime_surface();
                }
                continue;
            }
            host.notify_insets_control_changed(target, controls.as_deref());
        }
    }

    /// See [`InsetsSourceProvider::schedule_show_ime_post_layout`].
    pub fn schedule_show_ime_post_layout(&mut self, ime_target: ControlTarget, host: &mut dyn InsetsHost) {
        self.ime_source_provider().schedule_show_ime_post_layout(ime_target, host);
    }

    pub fn abort_show_ime_post_layout(&mut self) {
        if let Some(ime) = self.providers.get_mut(&InsetType::Ime) {
            ime.abort_show_ime_post_layout();
        }
    }

    /// Tells every visible window its insets changed.
    pub fn notify_insets_changed(&self, host: &mut dyn InsetsHost) {
        let windows = host.visible_windows();
        trace!("broadcasting insets change to {} window(s)", windows.len());
        for window in windows {
            host.notify_insets_changed(window);
        }
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            state: self.state.clone(),
            last_dispatched_state: self.last_state.clone(),
            controls: self.control_map.entries(),
            pending: self.pending.targets().to_vec(),
            providers: self.providers.values().map(InsetsSourceProvider::snapshot).collect(),
        }
    }

    /// Pretty JSON rendering of [`Self::snapshot`] for debug dumps.
    pub fn dump(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    /// Type of the controllable provider `window` backs, if any.
    fn controllable_type_of(&self, window: WindowId) -> Option<InsetType> {
        self.providers
            .values()
            .find(|provider| provider.is_controllable() && provider.window() == Some(window))
            .map(InsetsSourceProvider::inset_type)
    }

    /// Folds revocations and target changes made inside a provider into the
    /// control maps. Targets that lost or gained control are queued.
    fn reconcile(&mut self, inset_type: InsetType, host: &mut dyn InsetsHost) {
        let Some(provider) = self.providers.get_mut(&inset_type) else {
            return;
        };
        let revoked = provider.take_revoked();
        let actual = provider.control_target();

        for target in revoked {
            self.notify_control_revoked(target, inset_type);
            self.pending.enqueue(target, host);
        }

        let mapped = self.control_map.target_of(inset_type, ControlRole::Real);
        if mapped == actual {
            return;
        }
        if let Some(mapped) = mapped {
            self.control_map.remove(inset_type, ControlRole::Real);
            self.pending.enqueue(mapped, host);
        }
        if let Some(actual) = actual {
            self.control_map.insert(inset_type, ControlRole::Real, actual);
            self.pending.enqueue(actual, host);
        }
    }

    fn reconcile_all(&mut self, host: &mut dyn InsetsHost) {
        let types: Vec<InsetType> = self.providers.keys().copied().collect();
        for inset_type in types {
            self.reconcile(inset_type, host);
        }
    }

    /// Rebuilds the merged state from the providers' sources.
    fn rebuild_state(&mut self) {
        let mut state = InsetsState::new();
        state.display_frame = self.state.display_frame;
        for provider in self.providers.values() {
            state.add_source(provider.source().clone());
        }
        self.state = state;
    }
}

impl std::fmt::Debug for InsetsStateController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsetsStateController")
            .field("mode", &self.config.mode)
            .field("state", &self.state)
            .field("control_map", &self.control_map)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

/// Inset type a not-yet-added window will back, from its role or the bar
/// types it declares it provides.
pub fn inset_type_for_window(window_type: WindowType, provides: &[InsetType]) -> Option<InsetType> {
    match window_type {
        WindowType::StatusBar => return Some(InsetType::StatusBar),
        WindowType::NavigationBar => return Some(InsetType::NavigationBar),
        WindowType::InputMethod => return Some(InsetType::Ime),
        _ => {}
    }
    provides.iter().copied().find(|ty| ty.is_system_bar())
}

/// Serializable view of the whole controller.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerSnapshot {
    pub state: InsetsState,
    pub last_dispatched_state: InsetsState,
    pub controls: Vec<ControlEntry>,
    pub pending: Vec<ControlTarget>,
    pub providers: Vec<ProviderSnapshot>,
}
