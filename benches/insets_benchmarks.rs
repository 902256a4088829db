//! Performance benchmarks for the insets engine
//!
//! These benchmarks cover the per-frame hot paths: dispatch filtering for
//! every visible window, the post-layout pass and the control flush.

use axiom_insets::config::{EngineConfig, InsetsConfig};
use axiom_insets::geometry::{Point, Rect};
use axiom_insets::host::{
    DeferredSurface, DisplayFrames, InsetsClients, SurfaceCompositor, WindowInfo, WindowLayout,
};
use axiom_insets::state::InsetsSourceControl;
use axiom_insets::types::{AdapterId, AnimationKind, ControlTarget, InsetType, Leash, WindowId, WindowingMode};
use axiom_insets::InsetsStateController;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::collections::BTreeMap;

const DISPLAY: Rect = Rect::new(0, 0, 1080, 2340);

/// Display with no side effects beyond counting deliveries.
#[derive(Default)]
struct BenchDisplay {
    windows: BTreeMap<WindowId, WindowInfo>,
    next_leash: u64,
    delivered: usize,
}

impl BenchDisplay {
    fn with_windows(count: u64) -> Self {
        let mut display = Self::default();
        let bars = [
            (WindowId(1), Rect::new(0, 0, 1080, 80)),
            (WindowId(2), Rect::new(0, 2200, 1080, 2340)),
            (WindowId(3), Rect::new(0, 1400, 1080, 2200)),
        ];
        for (id, frame) in bars {
            display.windows.insert(id, Self::window(frame, WindowingMode::Fullscreen));
        }
        for i in 0..count {
            let mode = if i % 4 == 0 {
                WindowingMode::Freeform
            } else {
                WindowingMode::Fullscreen
            };
            display.windows.insert(WindowId(100 + i), Self::window(DISPLAY, mode));
        }
        display
    }

    fn window(frame: Rect, windowing_mode: WindowingMode) -> WindowInfo {
        WindowInfo {
            frame,
            has_surface: true,
            drawn: true,
            visible: true,
            visible_ignoring_policy: true,
            visible_by_policy: true,
            windowing_mode,
            ..WindowInfo::default()
        }
    }
}

impl WindowLayout for BenchDisplay {
    fn display_frames(&self) -> DisplayFrames {
        DisplayFrames {
            display_frame: DISPLAY,
            safe_frame: DISPLAY,
        }
    }

    fn window(&self, window: WindowId) -> Option<WindowInfo> {
        self.windows.get(&window).cloned()
    }

    fn visible_windows(&self) -> Vec<WindowId> {
        self.windows.keys().copied().collect()
    }

    fn input_method_window(&self) -> Option<WindowId> {
        Some(WindowId(3))
    }

    fn input_method_target(&self) -> Option<ControlTarget> {
        None
    }

    fn drain_insets_changed_windows(&mut self) -> Vec<WindowId> {
        Vec::new()
    }

    fn set_controllable_inset_provider(&mut self, _window: WindowId, _inset_type: Option<InsetType>) {}
}

impl SurfaceCompositor for BenchDisplay {
    fn begin_animation(&mut self, _: WindowId, _: AdapterId, _: bool, _: AnimationKind) -> Option<Leash> {
        self.next_leash += 1;
        Some(Leash(self.next_leash))
    }

    fn cancel_animation(&mut self, _window: WindowId) {}

    fn set_leash_position(&mut self, _leash: Leash, _position: Point) {}

    fn hide_leash(&mut self, _leash: Leash) {}

    fn defer_transaction_until(&mut self, _: DeferredSurface, _: WindowId, _: u64) {}

    fn schedule_after_commit(&mut self) {}
}

impl InsetsClients for BenchDisplay {
    fn notify_insets_changed(&mut self, _window: WindowId) {
        self.delivered += 1;
    }

    fn notify_insets_control_changed(&mut self, _: ControlTarget, controls: Option<&[InsetsSourceControl]>) {
        self.delivered += controls.map(<[InsetsSourceControl]>::len).unwrap_or(0);
    }

    fn show_insets(&mut self, _: ControlTarget, _: InsetType) {}

    fn remove_ime_surface(&mut self) {}

    fn request_layout(&mut self) {}

    fn update_system_ui_visibility(&mut self) {}
}

fn attached_controller(display: &mut BenchDisplay) -> InsetsStateController {
    let mut controller = InsetsStateController::new(&InsetsConfig::default());
    controller.set_window(InsetType::StatusBar, Some(WindowId(1)), None, None, display);
    controller.set_window(InsetType::NavigationBar, Some(WindowId(2)), None, None, display);
    controller.set_window(InsetType::Ime, Some(WindowId(3)), None, None, display);
    controller.on_post_layout(display);
    controller
}

/// Benchmark per-window dispatch filtering
fn bench_dispatch_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_filtering");

    for window_count in [10u64, 50, 200].iter() {
        let mut display = BenchDisplay::with_windows(*window_count);
        let controller = attached_controller(&mut display);
        let recipients: Vec<WindowId> = display.windows.keys().copied().collect();

        group.bench_function(format!("dispatch_{}_windows", window_count), |b| {
            b.iter(|| {
                for window in &recipients {
                    black_box(controller.get_insets_for_dispatch(*window, &display));
                }
            });
        });
    }

    group.finish();
}

/// Benchmark a full layout pass including the broadcast
fn bench_post_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("post_layout");

    group.bench_function("moving_status_bar", |b| {
        b.iter_batched(
            || {
                let mut display = BenchDisplay::with_windows(50);
                let controller = attached_controller(&mut display);
                (display, controller)
            },
            |(mut display, mut controller)| {
                for offset in 0..10 {
                    if let Some(window) = display.windows.get_mut(&WindowId(1)) {
                        window.frame = Rect::new(0, offset, 1080, 80 + offset);
                    }
                    controller.on_post_layout(&mut display);
                }
                black_box(display.delivered);
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Benchmark control handoff followed by the after-commit flush
fn bench_control_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("control_flush");

    group.bench_function("handoff_and_flush", |b| {
        b.iter_batched(
            || {
                let mut display = BenchDisplay::with_windows(10);
                let controller = attached_controller(&mut display);
                (display, controller)
            },
            |(mut display, mut controller)| {
                for i in 0..10u64 {
                    let target = ControlTarget::Window(WindowId(100 + i));
                    controller.on_bar_control_target_changed(Some(target), None, Some(target), None, &mut display);
                    controller.on_ime_control_target_changed(Some(target), &mut display);
                    controller.on_transaction_committed(&mut display);
                }
                black_box(display.delivered);
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Benchmark configuration parsing
fn bench_configuration(c: &mut Criterion) {
    let mut group = c.benchmark_group("configuration");

    group.bench_function("toml_roundtrip", |b| {
        let config = EngineConfig::default();
        b.iter(|| {
            let toml_str = toml::to_string(&config).unwrap();
            black_box(toml::from_str::<EngineConfig>(&toml_str).unwrap());
        });
    });

    group.bench_function("dump_snapshot", |b| {
        let mut display = BenchDisplay::with_windows(10);
        let controller = attached_controller(&mut display);
        b.iter(|| black_box(controller.dump().unwrap()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_dispatch_filtering,
    bench_post_layout,
    bench_control_flush,
    bench_configuration
);

criterion_main!(benches);
