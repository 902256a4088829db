//! Identifiers and small enumerations used across the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of screen region other content must avoid.
///
/// Each type identifies one source in the insets state and at most one
/// provider in the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsetType {
    StatusBar,
    NavigationBar,
    CaptionBar,
    TopGestures,
    BottomGestures,
    LeftGestures,
    RightGestures,
    TopTappableElement,
    BottomTappableElement,
    Ime,
    ClimateBar,
    ExtraNavigationBar,
}

impl InsetType {
    pub const ALL: [InsetType; 12] = [
        InsetType::StatusBar,
        InsetType::NavigationBar,
        InsetType::CaptionBar,
        InsetType::TopGestures,
        InsetType::BottomGestures,
        InsetType::LeftGestures,
        InsetType::RightGestures,
        InsetType::TopTappableElement,
        InsetType::BottomTappableElement,
        InsetType::Ime,
        InsetType::ClimateBar,
        InsetType::ExtraNavigationBar,
    ];

    /// Platform default for the client-requested visibility of this type.
    pub fn default_visibility(self) -> bool {
        self != InsetType::Ime
    }

    /// Status, navigation, climate and extra navigation bars.
    pub fn is_system_bar(self) -> bool {
        matches!(
            self,
            InsetType::StatusBar
                | InsetType::NavigationBar
                | InsetType::ClimateBar
                | InsetType::ExtraNavigationBar
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InsetType::StatusBar => "status_bar",
            InsetType::NavigationBar => "navigation_bar",
            InsetType::CaptionBar => "caption_bar",
            InsetType::TopGestures => "top_gestures",
            InsetType::BottomGestures => "bottom_gestures",
            InsetType::LeftGestures => "left_gestures",
            InsetType::RightGestures => "right_gestures",
            InsetType::TopTappableElement => "top_tappable_element",
            InsetType::BottomTappableElement => "bottom_tappable_element",
            InsetType::Ime => "ime",
            InsetType::ClimateBar => "climate_bar",
            InsetType::ExtraNavigationBar => "extra_navigation_bar",
        }
    }
}

impl fmt::Display for InsetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Window identity as handed out by the window manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// A party that can be granted control over inset sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ControlTarget {
    /// A client window.
    Window(WindowId),
    /// The display-level remote insets controller (system UI acting for the display).
    Remote,
    /// Built-in owner of the IME leash while no window is the IME target.
    EmptyIme,
}

impl ControlTarget {
    pub fn window(self) -> Option<WindowId> {
        match self {
            ControlTarget::Window(id) => Some(id),
            ControlTarget::Remote | ControlTarget::EmptyIme => None,
        }
    }
}

impl fmt::Display for ControlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlTarget::Window(id) => write!(f, "{}", id),
            ControlTarget::Remote => f.write_str("remote-controller"),
            ControlTarget::EmptyIme => f.write_str("empty-ime-target"),
        }
    }
}

/// Animatable stand-in for a window surface, minted by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Leash(pub u64);

/// Identity of one control handoff. A cancellation only counts when it names
/// the adapter the provider currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdapterId {
    pub inset_type: InsetType,
    pub serial: u64,
}

/// Why the compositor is asked to animate a window surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationKind {
    /// The leash is handed to a control target which drives it directly.
    InsetsControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WindowingMode {
    #[default]
    Undefined,
    Fullscreen,
    Pinned,
    SplitScreenPrimary,
    SplitScreenSecondary,
    Freeform,
    MultiWindow,
}

impl WindowingMode {
    /// Pinned and freeform windows float above the layout.
    pub fn is_floating(self) -> bool {
        matches!(self, WindowingMode::Pinned | WindowingMode::Freeform)
    }
}

/// Coarse window role, used to derive the inset type of a window that has not
/// been attached to a provider yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WindowType {
    #[default]
    Application,
    StatusBar,
    NavigationBar,
    InputMethod,
    NotificationShade,
    Other,
}
