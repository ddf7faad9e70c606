//! Pure view-state transitions and derived reads.
//!
//! Nothing here touches I/O: [`ViewState`] is mutated by user intents and
//! the free functions derive what each screen shows from the catalog.

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::{Entity, UNKNOWN_LEVEL};
use crate::util::MAX_SEARCH_TERM_LENGTH;

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Upper bound on search hits, to bound render cost.
pub const MAX_SEARCH_RESULTS: usize = 50;

/// How many page numbers the pagination bar shows.
const PAGE_WINDOW: usize = 5;

// ============================================================================
// Screens
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Details,
    Favorites,
    Search,
    Stats,
    Info,
}

impl Screen {
    /// Screens reachable from the navigation bar, in tab order.
    /// Details is only entered by selecting an entity.
    pub const NAV: [Screen; 5] = [
        Screen::Home,
        Screen::Favorites,
        Screen::Search,
        Screen::Stats,
        Screen::Info,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Screen::Home => "Home",
            Screen::Details => "Details",
            Screen::Favorites => "Favorites",
            Screen::Search => "Search",
            Screen::Stats => "Stats",
            Screen::Info => "Info",
        }
    }

    /// The next navigation-bar screen after `self`, wrapping around.
    pub fn next_tab(self) -> Screen {
        let pos = Self::NAV.iter().position(|&s| s == self).unwrap_or(0);
        Self::NAV[(pos + 1) % Self::NAV.len()]
    }

    pub fn prev_tab(self) -> Screen {
        let pos = Self::NAV.iter().position(|&s| s == self).unwrap_or(0);
        Self::NAV[(pos + Self::NAV.len() - 1) % Self::NAV.len()]
    }
}

// ============================================================================
// View State
// ============================================================================

/// What the user is looking at.
///
/// Invariants:
/// - `selected` is `Some` only while `screen == Screen::Details`
/// - `page_index >= 1`; once the catalog is loaded it stays within
///   `[1, total_pages]` because [`ViewState::go_to_page`] refuses anything else
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    screen: Screen,
    page_index: usize,
    page_size: usize,
    search_term: String,
    selected: Option<Entity>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        Self {
            screen: Screen::Home,
            page_index: 1,
            page_size: page_size.max(1),
            search_term: String::new(),
            selected: None,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn selected(&self) -> Option<&Entity> {
        self.selected.as_ref()
    }

    /// Switch screens. Leaving Details clears the selection; the page
    /// position is kept.
    pub fn navigate(&mut self, screen: Screen) {
        self.screen = screen;
        if screen != Screen::Details {
            self.selected = None;
        }
    }

    /// Show `entity` on the Details screen.
    pub fn select(&mut self, entity: Entity) {
        self.selected = Some(entity);
        self.screen = Screen::Details;
    }

    /// Replace the search term. Does not change the screen.
    ///
    /// Terms longer than [`MAX_SEARCH_TERM_LENGTH`] characters are cut.
    pub fn set_search_term(&mut self, term: &str) {
        self.search_term = term.chars().take(MAX_SEARCH_TERM_LENGTH).collect();
    }

    /// Move to page `n` if it exists.
    ///
    /// # Returns
    ///
    /// `false` (and no change) when `n` is outside `[1, total_pages]`.
    pub fn go_to_page(&mut self, n: usize, total_pages: usize) -> bool {
        if n < 1 || n > total_pages {
            return false;
        }
        self.page_index = n;
        true
    }

    pub fn next_page(&mut self, total_pages: usize) -> bool {
        self.go_to_page(self.page_index + 1, total_pages)
    }

    pub fn prev_page(&mut self, total_pages: usize) -> bool {
        self.go_to_page(self.page_index - 1, total_pages)
    }

    pub fn first_page(&mut self, total_pages: usize) -> bool {
        self.go_to_page(1, total_pages)
    }

    pub fn last_page(&mut self, total_pages: usize) -> bool {
        self.go_to_page(total_pages, total_pages)
    }

    /// Pull the page back into range after the catalog changed size.
    pub fn clamp_page(&mut self, total_pages: usize) {
        self.page_index = self.page_index.clamp(1, total_pages.max(1));
    }
}

// ============================================================================
// Derived Reads
// ============================================================================

/// Number of pages needed for `len` entities; 0 for an empty catalog.
pub fn total_pages(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1))
}

/// Entities on page `page_index` (1-based); empty past the end.
pub fn page_slice(entities: &[Entity], page_index: usize, page_size: usize) -> &[Entity] {
    let page_size = page_size.max(1);
    let start = page_index
        .saturating_sub(1)
        .saturating_mul(page_size)
        .min(entities.len());
    let end = start.saturating_add(page_size).min(entities.len());
    &entities[start..end]
}

/// Case-insensitive substring search over names and levels.
///
/// Keeps catalog order and stops at [`MAX_SEARCH_RESULTS`]. The term is
/// used as typed, whitespace included; only the empty term matches nothing.
pub fn search<'a>(entities: &'a [Entity], term: &str) -> Vec<&'a Entity> {
    let needle = term.to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    entities
        .iter()
        .filter(|e| e.matches(&needle))
        .take(MAX_SEARCH_RESULTS)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelCount {
    pub level: Arc<str>,
    pub count: usize,
}

/// Count entities per level, with absent levels under `"Unknown"`.
///
/// Sorted by count descending; equal counts keep first-seen order.
pub fn level_distribution(entities: &[Entity]) -> Vec<LevelCount> {
    let mut buckets: Vec<LevelCount> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for entity in entities {
        let label = entity.level.as_deref().unwrap_or(UNKNOWN_LEVEL);
        match positions.get(label) {
            Some(&i) => buckets[i].count += 1,
            None => {
                positions.insert(label, buckets.len());
                buckets.push(LevelCount {
                    level: Arc::from(label),
                    count: 1,
                });
            }
        }
    }

    // sort_by is stable
    buckets.sort_by(|a, b| b.count.cmp(&a.count));
    buckets
}

/// Page numbers for the pagination bar: up to five, centred on `current`
/// and shifted inward at either end.
///
/// ```
/// use digidex::app::page_window;
///
/// assert_eq!(page_window(1, 10), vec![1, 2, 3, 4, 5]);
/// assert_eq!(page_window(6, 10), vec![4, 5, 6, 7, 8]);
/// assert_eq!(page_window(10, 10), vec![6, 7, 8, 9, 10]);
/// assert_eq!(page_window(2, 3), vec![1, 2, 3]);
/// ```
pub fn page_window(current: usize, total: usize) -> Vec<usize> {
    if total == 0 {
        return Vec::new();
    }
    let half = PAGE_WINDOW / 2;
    let current = current.clamp(1, total);
    let end = (current.saturating_sub(half).max(1) + PAGE_WINDOW - 1).min(total);
    let start = end.saturating_sub(PAGE_WINDOW - 1).max(1);
    (start..=end).collect()
}
