//! Inset source providers
//!
//! One provider exists per [`InsetType`] on a display. It owns the
//! authoritative [`InsetsSource`] for that type and arbitrates who may animate
//! the source's window surface:
//!
//! ```text
//!   set_window(W) ──► backing window W ──► update_control_for_target(T)
//!                                              │
//!                       begin_animation ◄──────┘   leash minted, not ready
//!                              │
//!        after-commit flush ───┴──► leash ready, T may receive it
//! ```
//!
//! Every path that takes control away (explicit `None` target, window
//! removal, seamless rotation, compositor cancelling the animation) funnels
//! through [`InsetsSourceProvider::on_animation_cancelled`]. The revoked target
//! is parked in an outbox that the controller drains after every call, so the
//! controller's target maps never disagree with the provider for longer than
//! one controller operation.

use crate::config::InsetsMode;
use crate::geometry::{Point, Rect};
use crate::host::{DeferredSurface, DisplayFrames, FrameProvider, InsetsHost};
use crate::state::{InsetsSource, InsetsSourceControl};
use crate::types::{AdapterId, AnimationKind, ControlTarget, InsetType, WindowId};
use log::{debug, info, trace};
use serde::Serialize;

/// IME-only bookkeeping for showing the keyboard once its window has laid out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImeShowState {
    /// Target that asked the IME to show.
    target_from_ime: Option<ControlTarget>,
    /// A show request is waiting for layout.
    show_requested: bool,
    /// The IME window had drawn, without pending insets, at the last layout.
    layout_drawn: bool,
}

/// Behavior selected once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    Standard,
    Ime(ImeShowState),
}

pub struct InsetsSourceProvider {
    source: InsetsSource,
    window: Option<WindowId>,
    frame_provider: Option<FrameProvider>,
    ime_frame_provider: Option<FrameProvider>,
    ime_override_frame: Rect,

    controllable: bool,
    mode: InsetsMode,
    kind: ProviderKind,

    fake_control: InsetsSourceControl,
    control: Option<InsetsSourceControl>,
    control_target: Option<ControlTarget>,
    pending_control_target: Option<ControlTarget>,
    fake_control_target: Option<ControlTarget>,

    adapter: Option<AdapterId>,
    next_adapter_serial: u64,
    leash_ready: bool,

    /// Visibility last requested by the control target.
    client_visible: bool,
    /// Backing window is present, laid out and allowed by policy.
    server_visible: bool,
    /// Backing window declares it provides the IME source itself.
    mirrored: bool,

    seamless_rotating: bool,
    finish_seamless_rotate_frame: Option<u64>,

    /// Targets that lost control since the controller last looked.
    revoked: Vec<ControlTarget>,
}

impl InsetsSourceProvider {
    /// Create the provider for `inset_type`. The IME type gets the IME variant.
    pub fn new(inset_type: InsetType, mode: InsetsMode) -> Self {
        let kind = if inset_type == InsetType::Ime {
            ProviderKind::Ime(ImeShowState::default())
        } else {
            ProviderKind::Standard
        };

        let mut provider = Self {
            source: InsetsSource::new(inset_type),
            window: None,
            frame_provider: None,
            ime_frame_provider: None,
            ime_override_frame: Rect::EMPTY,
            controllable: mode.allows_control(inset_type),
            mode,
            kind,
            fake_control: InsetsSourceControl::new(inset_type, None, Point::default()),
            control: None,
            control_target: None,
            pending_control_target: None,
            fake_control_target: None,
            adapter: None,
            next_adapter_serial: 0,
            leash_ready: false,
            client_visible: inset_type.default_visibility(),
            server_visible: false,
            mirrored: false,
            seamless_rotating: false,
            finish_seamless_rotate_frame: None,
            revoked: Vec::new(),
        };
        provider.update_visibility();
        provider
    }

    pub fn inset_type(&self) -> InsetType {
        self.source.inset_type
    }

    pub fn source(&self) -> &InsetsSource {
        &self.source
    }

    pub fn kind(&self) -> &ProviderKind {
        &self.kind
    }

    /// Whether the configured insets mode allows controlling this source.
    pub fn is_controllable(&self) -> bool {
        self.controllable
    }

    pub fn window(&self) -> Option<WindowId> {
        self.window
    }

    pub fn has_window(&self) -> bool {
        self.window.is_some()
    }

    pub fn control_target(&self) -> Option<ControlTarget> {
        self.control_target
    }

    pub fn pending_control_target(&self) -> Option<ControlTarget> {
        self.pending_control_target
    }

    pub fn fake_control_target(&self) -> Option<ControlTarget> {
        self.fake_control_target
    }

    pub fn current_adapter(&self) -> Option<AdapterId> {
        self.adapter
    }

    pub fn is_leash_ready(&self) -> bool {
        self.leash_ready
    }

    pub fn server_visible(&self) -> bool {
        self.server_visible
    }

    pub fn is_mirrored_source(&self) -> bool {
        self.mirrored
    }

    pub fn is_seamless_rotating(&self) -> bool {
        self.seamless_rotating
    }

    /// Frame at which the deferred post-rotation reparent may apply.
    pub fn finish_seamless_rotate_frame_number(&self) -> Option<u64> {
        self.finish_seamless_rotate_frame
    }

    /// Requested visibility as clients should see it. Always true when no
    /// source is controllable.
    pub fn is_client_visible(&self) -> bool {
        self.mode == InsetsMode::None || self.client_visible
    }

    /// Whether this provider reports a different frame to the IME.
    pub fn overrides_ime_frame(&self) -> bool {
        self.ime_frame_provider.is_some()
    }

    /// Only meaningful when [`Self::overrides_ime_frame`] is true.
    pub fn ime_override_frame(&self) -> Rect {
        self.ime_override_frame
    }

    /// Targets revoked since the last call.
    pub fn take_revoked(&mut self) -> Vec<ControlTarget> {
        std::mem::take(&mut self.revoked)
    }

    /// Updates the window that currently backs this source.
    ///
    /// `frame_provider` computes the frame reported to clients from the
    /// window frame; `ime_frame_provider` computes the frame reported to the
    /// IME when it must differ.
    pub fn set_window(
        &mut self,
        window: Option<WindowId>,
        frame_provider: Option<FrameProvider>,
        ime_frame_provider: Option<FrameProvider>,
        host: &mut dyn InsetsHost,
    ) {
        if let Some(previous) = self.window {
            if self.controllable {
                host.set_controllable_inset_provider(previous, None);
            }
            // The previous window may still be animating with a leash handed
            // out to the control target. Cancelling revokes it.
            self.cancel_animation(host);
        }

        debug!("{} source window: {:?} -> {:?}", self.inset_type(), self.window, window);
        self.window = window;
        self.frame_provider = frame_provider;
        self.ime_frame_provider = ime_frame_provider;

        let Some(window) = window else {
            self.mirrored = false;
            self.set_server_visible(false);
            self.source.frame = Rect::EMPTY;
            self.source.visible_frame = None;
            return;
        };

        self.mirrored = host
            .window(window)
            .map(|info| info.provides(InsetType::Ime))
            .unwrap_or(false);
        self.update_visibility();

        if self.controllable {
            host.set_controllable_inset_provider(window, Some(self.inset_type()));
            if let Some(pending) = self.pending_control_target.take() {
                debug!("{} resolving pending control target {}", self.inset_type(), pending);
                self.update_control_for_target(Some(pending), true, host);
            }
        }
    }

    /// Recomputes the source frame from the backing window's laid-out frame.
    ///
    /// Call once per layout pass after window geometry is final, and again if
    /// the window surface moves mid-pass.
    pub fn update_source_frame(&mut self, host: &dyn InsetsHost) {
        let Some(window) = self.window else {
            return;
        };
        let Some(info) = host.window(window) else {
            return;
        };
        let display_frames = host.display_frames();

        // Only a server-visible window has a settled frame; before that the
        // frame may still reflect pending insets or a missing surface.
        let frame = if self.server_visible {
            match &self.frame_provider {
                Some(provider) => provider(&display_frames, &info, info.frame),
                None => info.frame.inset(&info.given_content_insets),
            }
        } else {
            Rect::EMPTY
        };
        self.source.frame = frame;

        if let Some(provider) = &self.ime_frame_provider {
            self.ime_override_frame = provider(&display_frames, &info, info.frame);
        }

        self.source.visible_frame = if info.given_visible_insets.is_zero() {
            None
        } else {
            Some(info.frame.inset(&info.given_visible_insets))
        };
        trace!("{} source frame {:?}", self.inset_type(), self.source.frame);
    }

    /// The source this provider would produce if its window had `window_frame`.
    ///
    /// The visible frame is not simulated.
    pub fn create_simulated_source(
        &self,
        display_frames: &DisplayFrames,
        window_frame: Rect,
        host: &dyn InsetsHost,
    ) -> InsetsSource {
        let info = self.window.and_then(|window| host.window(window));
        let frame = match (&self.frame_provider, info) {
            (Some(provider), Some(info)) => provider(display_frames, &info, window_frame),
            _ => window_frame,
        };
        InsetsSource::new(self.inset_type())
            .with_visible(self.source.visible)
            .with_frame(frame)
    }

    /// Per-provider half of a layout pass.
    ///
    /// Returns the control target that must be told about a re-issued leash,
    /// if the window moved under an existing control.
    pub fn on_post_layout(&mut self, host: &mut dyn InsetsHost) -> Option<ControlTarget> {
        let window = self.window?;
        let info = host.window(window)?;

        self.mirrored = info.provides(InsetType::Ime);
        self.set_server_visible(
            info.visible_ignoring_policy && info.visible_by_policy && !info.given_insets_pending,
        );
        self.update_source_frame(host);

        if let ProviderKind::Ime(ime) = &mut self.kind {
            ime.layout_drawn = info.drawn && !info.given_insets_pending;
        }

        let origin = info.frame.origin();
        let moved = match &mut self.control {
            Some(control) => control.set_surface_position(origin.x, origin.y),
            None => false,
        };
        if moved {
            if let Some(target) = self.control_target {
                // The leash is stale once the window moved; hand out a new one.
                debug!("{} window moved to {:?}, re-issuing leash to {}", self.inset_type(), origin, target);
                self.update_control_for_target(Some(target), true, host);
                return Some(target);
            }
        }
        None
    }

    pub fn update_control_for_fake_target(&mut self, fake_target: Option<ControlTarget>) {
        if fake_target == self.fake_control_target {
            return;
        }
        self.fake_control_target = fake_target;
    }

    /// Transfers control of this source to `target`, or revokes it with `None`.
    pub fn update_control_for_target(
        &mut self,
        target: Option<ControlTarget>,
        force: bool,
        host: &mut dyn InsetsHost,
    ) {
        if self.seamless_rotating {
            // The window is being counter-rotated against the display; nobody
            // may move its surface until the rotation finishes.
            debug!("{} control change refused during seamless rotation", self.inset_type());
            return;
        }

        let target = target.map(|target| match target.window() {
            Some(window) => host.ime_control_target(window),
            None => target,
        });

        if let Some(window) = self.window {
            let has_surface = host.window(window).map(|info| info.has_surface).unwrap_or(false);
            if !has_surface {
                self.set_window(None, None, None, host);
            }
        }

        let Some(window) = self.window else {
            self.pending_control_target = target;
            return;
        };

        if target == self.control_target && !force {
            return;
        }

        let Some(target) = target else {
            self.cancel_animation(host);
            self.set_client_visible(self.inset_type().default_visibility(), host);
            return;
        };

        let Some(info) = host.window(window) else {
            return;
        };

        if self.inset_type() == InsetType::Ime {
            let requested = host.requested_visibility(target, InsetType::Ime);
            self.set_client_visible(requested, host);
        }

        // Starting a new animation replaces the running one. The old adapter
        // is retired first, so its late cancellation is ignored.
        if self.adapter.take().is_some() {
            host.cancel_animation(window);
        }
        if let Some(previous) = self.control_target {
            if previous != target {
                self.revoked.push(previous);
            }
        }

        let adapter = self.mint_adapter();
        self.adapter = Some(adapter);
        let origin = info.frame.origin();
        let leash = host.begin_animation(window, adapter, !self.client_visible, AnimationKind::InsetsControl);
        if let Some(leash) = leash {
            if self.inset_type() == InsetType::Ime {
                host.hide_leash(leash);
            }
            host.set_leash_position(leash, origin);
        }

        // Until the transaction creating the leash is applied, a client
        // editing the leash could be overwritten by it.
        self.leash_ready = false;

        if let Some(frame_number) = self.finish_seamless_rotate_frame.take() {
            if info.has_surface {
                if let Some(leash) = leash {
                    // Hold position and crop until the client draws its first
                    // frame in the new orientation. Reparenting is invisible
                    // and goes through immediately.
                    host.defer_transaction_until(DeferredSurface::Window(window), window, frame_number);
                    host.defer_transaction_until(DeferredSurface::Leash(leash), window, frame_number);
                }
            }
        }

        self.control_target = Some(target);
        self.update_visibility();
        self.control = Some(InsetsSourceControl::new(self.inset_type(), leash, origin));
        info!("🎛️  {} control -> {} (leash {:?})", self.inset_type(), target, leash);
    }

    /// Revocation transition. Ignored unless `adapter` is the current one.
    pub fn on_animation_cancelled(&mut self, adapter: AdapterId, host: &mut dyn InsetsHost) {
        if self.adapter != Some(adapter) {
            trace!("{} ignoring cancellation of stale adapter {:?}", self.inset_type(), adapter);
            return;
        }
        if let Some(target) = self.control_target.take() {
            info!("🎛️  {} control revoked from {}", self.inset_type(), target);
            self.revoked.push(target);
        }
        self.control = None;
        self.adapter = None;
        self.set_client_visible(self.inset_type().default_visibility(), host);
    }

    pub fn start_seamless_rotation(&mut self, host: &mut dyn InsetsHost) {
        if self.seamless_rotating {
            return;
        }
        self.seamless_rotating = true;
        // Revokes the leash and clears the control target.
        self.cancel_animation(host);
    }

    pub fn finish_seamless_rotation(&mut self, timed_out: bool, host: &dyn InsetsHost) {
        if !self.seamless_rotating {
            return;
        }
        self.seamless_rotating = false;
        self.finish_seamless_rotate_frame = if timed_out {
            None
        } else {
            self.window
                .and_then(|window| host.window(window))
                .map(|info| info.frame_number)
        };
    }

    /// Applies a visibility change requested by `caller`. Returns whether
    /// anything changed.
    pub fn on_insets_modified(
        &mut self,
        caller: ControlTarget,
        modified: &InsetsSource,
        host: &mut dyn InsetsHost,
    ) -> bool {
        if self.control_target != Some(caller) || modified.visible == self.client_visible {
            return false;
        }
        self.set_client_visible(modified.visible, host);
        true
    }

    /// The compositor applied the transaction that created the current leash.
    pub fn on_surface_transaction_applied(&mut self) {
        self.leash_ready = true;
    }

    /// Control as `target` may see it, if `target` holds any.
    pub fn get_control(&self, target: ControlTarget) -> Option<InsetsSourceControl> {
        if Some(target) == self.control_target {
            return self.control.map(|control| {
                if self.leash_ready {
                    control
                } else {
                    control.without_leash()
                }
            });
        }
        if Some(target) == self.fake_control_target {
            return Some(self.fake_control);
        }
        None
    }

    /// The dedicated leash-less control given to the fake target.
    pub fn fake_control(&self) -> InsetsSourceControl {
        self.fake_control
    }

    pub fn set_server_visible(&mut self, server_visible: bool) {
        self.server_visible = server_visible;
        self.update_visibility();
    }

    /// Records that `ime_target` asked for the IME; it is shown after the next
    /// layout pass in which the IME window has drawn.
    pub fn schedule_show_ime_post_layout(&mut self, ime_target: ControlTarget, host: &mut dyn InsetsHost) {
        let ProviderKind::Ime(ime) = &mut self.kind else {
            return;
        };
        ime.target_from_ime = Some(ime_target);
        ime.show_requested = true;
        debug!("ime show scheduled for {}", ime_target);
        host.request_layout();
    }

    /// Runs a pending IME show request once layout allows it. Returns whether
    /// a pending request was consumed.
    pub fn check_show_ime_post_layout(&mut self, host: &mut dyn InsetsHost) -> bool {
        let ProviderKind::Ime(ime) = &self.kind else {
            return false;
        };
        if !ime.show_requested || !ime.layout_drawn {
            return false;
        }
        let requester = ime.target_from_ime;

        if let Some(requester) = requester {
            if self.is_requester_current_ime_target(requester, host) {
                let owner = self.control_target.unwrap_or(requester);
                info!("⌨️  showing ime on {}", owner);
                host.show_insets(owner, InsetType::Ime);
                if owner != requester {
                    host.show_insets(requester, InsetType::Ime);
                }
            }
        }
        self.abort_show_ime_post_layout();
        true
    }

    pub fn abort_show_ime_post_layout(&mut self) {
        if let ProviderKind::Ime(ime) = &mut self.kind {
            *ime = ImeShowState::default();
        }
    }

    /// Whether an IME show request is waiting for layout.
    pub fn is_ime_show_pending(&self) -> bool {
        matches!(&self.kind, ProviderKind::Ime(ime) if ime.show_requested)
    }

    fn is_requester_current_ime_target(&self, requester: ControlTarget, host: &dyn InsetsHost) -> bool {
        let Some(display_target) = host.input_method_target() else {
            return false;
        };
        if display_target == requester {
            return true;
        }
        display_target
            .window()
            .map(|window| host.ime_control_target(window) == requester)
            .unwrap_or(false)
    }

    fn cancel_animation(&mut self, host: &mut dyn InsetsHost) {
        if let Some(window) = self.window {
            host.cancel_animation(window);
        }
        if let Some(adapter) = self.adapter {
            self.on_animation_cancelled(adapter, host);
        }
    }

    fn mint_adapter(&mut self) -> AdapterId {
        self.next_adapter_serial += 1;
        AdapterId {
            inset_type: self.inset_type(),
            serial: self.next_adapter_serial,
        }
    }

    fn set_client_visible(&mut self, client_visible: bool, host: &mut dyn InsetsHost) {
        if self.client_visible == client_visible {
            return;
        }
        self.client_visible = client_visible;
        host.request_layout();
        self.update_visibility();
    }

    fn update_visibility(&mut self) {
        self.source.visible = self.server_visible && (self.mirrored || self.client_visible);
        trace!(
            "{} visibility server={} client={} mirrored={}",
            self.inset_type(),
            self.server_visible,
            self.client_visible,
            self.mirrored
        );
    }

    pub fn snapshot(&self) -> ProviderSnapshot {
        ProviderSnapshot {
            source: self.source.clone(),
            window: self.window,
            controllable: self.controllable,
            control: self.control,
            fake_control: self.fake_control,
            control_target: self.control_target,
            pending_control_target: self.pending_control_target,
            fake_control_target: self.fake_control_target,
            leash_ready: self.leash_ready,
            client_visible: self.client_visible,
            server_visible: self.server_visible,
            seamless_rotating: self.seamless_rotating,
            ime_override_frame: self.overrides_ime_frame().then_some(self.ime_override_frame),
        }
    }
}

impl std::fmt::Debug for InsetsSourceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsetsSourceProvider")
            .field("source", &self.source)
            .field("window", &self.window)
            .field("control_target", &self.control_target)
            .field("fake_control_target", &self.fake_control_target)
            .field("leash_ready", &self.leash_ready)
            .finish_non_exhaustive()
    }
}

/// Serializable view of a provider for debugging dumps.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSnapshot {
    pub source: InsetsSource,
    pub window: Option<WindowId>,
    pub controllable: bool,
    pub control: Option<InsetsSourceControl>,
    pub fake_control: InsetsSourceControl,
    pub control_target: Option<ControlTarget>,
    pub pending_control_target: Option<ControlTarget>,
    pub fake_control_target: Option<ControlTarget>,
    pub leash_ready: bool,
    pub client_visible: bool,
    pub server_visible: bool,
    pub seamless_rotating: bool,
    pub ime_override_frame: Option<Rect>,
}

