//! Theme system for the TUI.
//!
//! Semantic roles map to ratatui `Style` values. `ThemeVariant` picks the
//! Dark or Light palette and `StyleMap` resolves role names to styles at
//! render time. Level tiers get their own colours so a page of entities
//! reads at a glance.

use ratatui::style::{Color, Modifier, Style};
use std::collections::HashMap;

use crate::catalog::Tier;

// ============================================================================
// Theme Variant
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeVariant {
    Dark,
    Light,
}

impl ThemeVariant {
    /// Parse a variant name (case-insensitive).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    pub fn palette(self) -> ColorPalette {
        match self {
            Self::Dark => ColorPalette::dark(),
            Self::Light => ColorPalette::light(),
        }
    }

    /// Dark → Light → Dark.
    pub fn next(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Dark => "Dark",
            Self::Light => "Light",
        }
    }
}

// ============================================================================
// Color Palette
// ============================================================================

/// Every semantic UI role for one variant.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    // -- Entity lists --
    pub list_normal: Style,
    pub list_selected: Style,
    pub favorite_marker: Style,
    pub muted: Style,

    // -- Details / info --
    pub heading: Style,
    pub label: Style,
    pub body: Style,
    pub link: Style,

    // -- Stats --
    pub stats_bar: Style,

    // -- Navigation --
    pub nav_active: Style,
    pub nav_inactive: Style,
    pub page_current: Style,
    pub page_other: Style,
    pub search_input: Style,

    // -- Chrome --
    pub status_bar: Style,
    pub panel_border: Style,
    pub panel_border_focused: Style,
    pub warning: Style,

    /// Indexed by [`tier_slot`].
    pub tiers: [Style; 8],
}

fn tier_slot(tier: Tier) -> usize {
    match tier {
        Tier::Fresh => 0,
        Tier::InTraining => 1,
        Tier::Rookie => 2,
        Tier::Champion => 3,
        Tier::Ultimate => 4,
        Tier::Mega => 5,
        Tier::Armor => 6,
        Tier::Other => 7,
    }
}

impl ColorPalette {
    fn dark() -> Self {
        Self {
            list_normal: Style::default(),
            list_selected: Style::default().bg(Color::DarkGray).fg(Color::White),
            favorite_marker: Style::default().fg(Color::Yellow),
            muted: Style::default().fg(Color::DarkGray),

            heading: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            label: Style::default().fg(Color::Gray),
            body: Style::default(),
            link: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),

            stats_bar: Style::default().fg(Color::Cyan),

            nav_active: Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            nav_inactive: Style::default().fg(Color::Gray),
            page_current: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
            page_other: Style::default().fg(Color::Gray),
            search_input: Style::default().fg(Color::Yellow),

            status_bar: Style::default().bg(Color::DarkGray).fg(Color::White),
            panel_border: Style::default(),
            panel_border_focused: Style::default().fg(Color::Cyan),
            warning: Style::default().fg(Color::Red),

            tiers: [
                Style::default().fg(Color::LightMagenta),
                Style::default().fg(Color::Magenta),
                Style::default().fg(Color::Green),
                Style::default().fg(Color::Cyan),
                Style::default().fg(Color::Blue),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                Style::default().fg(Color::Yellow),
                Style::default().fg(Color::Gray),
            ],
        }
    }

    /// Adapted for light terminal backgrounds.
    fn light() -> Self {
        Self {
            list_normal: Style::default().fg(Color::Black),
            list_selected: Style::default().bg(Color::Blue).fg(Color::White),
            favorite_marker: Style::default().fg(Color::Magenta),
            muted: Style::default().fg(Color::DarkGray),

            heading: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            label: Style::default().fg(Color::DarkGray),
            body: Style::default().fg(Color::Black),
            link: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),

            stats_bar: Style::default().fg(Color::Blue),

            nav_active: Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            nav_inactive: Style::default().fg(Color::DarkGray),
            page_current: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
            page_other: Style::default().fg(Color::DarkGray),
            search_input: Style::default().fg(Color::Magenta),

            status_bar: Style::default().bg(Color::White).fg(Color::Black),
            panel_border: Style::default().fg(Color::DarkGray),
            panel_border_focused: Style::default().fg(Color::Blue),
            warning: Style::default().fg(Color::Red),

            tiers: [
                Style::default().fg(Color::Magenta),
                Style::default().fg(Color::Magenta),
                Style::default().fg(Color::Green),
                Style::default().fg(Color::Blue),
                Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                Style::default().fg(Color::DarkGray),
                Style::default().fg(Color::DarkGray),
            ],
        }
    }

    /// Role name / style pairs, in declaration order.
    fn roles(&self) -> [(&'static str, Style); 18] {
        [
            ("list_normal", self.list_normal),
            ("list_selected", self.list_selected),
            ("favorite_marker", self.favorite_marker),
            ("muted", self.muted),
            ("heading", self.heading),
            ("label", self.label),
            ("body", self.body),
            ("link", self.link),
            ("stats_bar", self.stats_bar),
            ("nav_active", self.nav_active),
            ("nav_inactive", self.nav_inactive),
            ("page_current", self.page_current),
            ("page_other", self.page_other),
            ("search_input", self.search_input),
            ("status_bar", self.status_bar),
            ("panel_border", self.panel_border),
            ("panel_border_focused", self.panel_border_focused),
            ("warning", self.warning),
        ]
    }
}

// ============================================================================
// Style Map
// ============================================================================

/// Role-name lookup built from a `ColorPalette`.
#[derive(Debug, Clone)]
pub struct StyleMap {
    map: HashMap<&'static str, Style>,
    tiers: [Style; 8],
}

impl StyleMap {
    pub fn from_palette(p: &ColorPalette) -> Self {
        Self {
            map: p.roles().into_iter().collect(),
            tiers: p.tiers,
        }
    }

    /// Resolve a role name. Unknown roles get `Style::default()`.
    pub fn resolve(&self, role: &str) -> Style {
        self.map.get(role).copied().unwrap_or_default()
    }

    pub fn tier(&self, tier: Tier) -> Style {
        self.tiers[tier_slot(tier)]
    }
}

// ============================================================================
// Tests
// ============================================================================
