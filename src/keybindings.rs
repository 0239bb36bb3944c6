//! Keybinding registry — an explicit table of `(action, key)` pairs.
//!
//! The presentation layer dispatches on key strings; the engine only cares
//! that the table is valid. Validation is a set-insert loop over the
//! enumerated actions: the full action set is known statically, so a key
//! bound twice is detected at configuration-load time and aborts startup.
use std::collections::HashMap;

use crate::config::ConfigError;

// ============================================================================
// Action Enum
// ============================================================================

/// All user-facing actions that can be triggered by keybindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    UpdateFeeds,
    OpenLink,
    MarkLink,
    OpenMarked,
    DeleteArticle,
    MoveUp,
    MoveDown,
    SortByDate,
    SortByFeed,
    SortByTitle,
    SortByUnread,
    MarkAllRead,
    MarkAllUnread,
    UndoLastRead,
    TogglePreview,
    SwitchWindows,
    SelectFeedWindow,
    SelectArticleWindow,
    SelectPreviewWindow,
    ToggleHelp,
}

impl Action {
    /// Every action, in help-screen order.
    pub const ALL: [Action; 21] = [
        Action::Quit,
        Action::UpdateFeeds,
        Action::OpenLink,
        Action::MarkLink,
        Action::OpenMarked,
        Action::DeleteArticle,
        Action::MoveUp,
        Action::MoveDown,
        Action::SortByDate,
        Action::SortByFeed,
        Action::SortByTitle,
        Action::SortByUnread,
        Action::MarkAllRead,
        Action::MarkAllUnread,
        Action::UndoLastRead,
        Action::TogglePreview,
        Action::SwitchWindows,
        Action::SelectFeedWindow,
        Action::SelectArticleWindow,
        Action::SelectPreviewWindow,
        Action::ToggleHelp,
    ];

    /// Name used for config-file overrides under `[keybindings]`.
    pub fn config_name(self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::UpdateFeeds => "update_feeds",
            Self::OpenLink => "open_link",
            Self::MarkLink => "mark_link",
            Self::OpenMarked => "open_marked",
            Self::DeleteArticle => "delete_article",
            Self::MoveUp => "move_up",
            Self::MoveDown => "move_down",
            Self::SortByDate => "sort_by_date",
            Self::SortByFeed => "sort_by_feed",
            Self::SortByTitle => "sort_by_title",
            Self::SortByUnread => "sort_by_unread",
            Self::MarkAllRead => "mark_all_read",
            Self::MarkAllUnread => "mark_all_unread",
            Self::UndoLastRead => "undo_last_read",
            Self::TogglePreview => "toggle_preview",
            Self::SwitchWindows => "switch_windows",
            Self::SelectFeedWindow => "select_feed_window",
            Self::SelectArticleWindow => "select_article_window",
            Self::SelectPreviewWindow => "select_preview_window",
            Self::ToggleHelp => "toggle_help",
        }
    }

    /// Human-readable description for the help screen.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Quit => "Quit application",
            Self::UpdateFeeds => "Update feeds now",
            Self::OpenLink => "Open link",
            Self::MarkLink => "Mark link for batch open",
            Self::OpenMarked => "Open marked links",
            Self::DeleteArticle => "Delete article",
            Self::MoveUp => "Move up",
            Self::MoveDown => "Move down",
            Self::SortByDate => "Sort by date",
            Self::SortByFeed => "Sort by feed",
            Self::SortByTitle => "Sort by title",
            Self::SortByUnread => "Sort by unread",
            Self::MarkAllRead => "Mark all read",
            Self::MarkAllUnread => "Mark all unread",
            Self::UndoLastRead => "Undo last read",
            Self::TogglePreview => "Toggle preview",
            Self::SwitchWindows => "Switch windows",
            Self::SelectFeedWindow => "Select feed window",
            Self::SelectArticleWindow => "Select article window",
            Self::SelectPreviewWindow => "Select preview window",
            Self::ToggleHelp => "Toggle help",
        }
    }

    fn default_key(self) -> &'static str {
        match self {
            Self::Quit => "q",
            Self::UpdateFeeds => "r",
            Self::OpenLink => "o",
            Self::MarkLink => "m",
            Self::OpenMarked => "O",
            Self::DeleteArticle => "x",
            Self::MoveUp => "k",
            Self::MoveDown => "j",
            Self::SortByDate => "d",
            Self::SortByFeed => "f",
            Self::SortByTitle => "t",
            Self::SortByUnread => "s",
            Self::MarkAllRead => "R",
            Self::MarkAllUnread => "U",
            Self::UndoLastRead => "u",
            Self::TogglePreview => "p",
            Self::SwitchWindows => "Tab",
            Self::SelectFeedWindow => "1",
            Self::SelectArticleWindow => "2",
            Self::SelectPreviewWindow => "3",
            Self::ToggleHelp => "h",
        }
    }
}

// ============================================================================
// Keybinding Table
// ============================================================================

/// Validated binding table. Lookup is O(1) via HashMap; the ordered table
/// backs help-screen enumeration.
#[derive(Debug)]
pub struct KeyBindings {
    bindings: Vec<(Action, String)>,
    lookup: HashMap<String, Action>,
}

impl KeyBindings {
    /// Build the table from defaults plus config overrides.
    ///
    /// # Errors
    ///
    /// - `ConfigError::UnknownAction` if an override names no known action
    /// - `ConfigError::DuplicateKeyBinding` if two actions share a key
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Result<Self, ConfigError> {
        for name in overrides.keys() {
            if !Action::ALL.iter().any(|a| a.config_name() == name) {
                return Err(ConfigError::UnknownAction(name.clone()));
            }
        }

        let bindings: Vec<(Action, String)> = Action::ALL
            .iter()
            .map(|&action| {
                let key = overrides
                    .get(action.config_name())
                    .cloned()
                    .unwrap_or_else(|| action.default_key().to_string());
                (action, key)
            })
            .collect();

        // Uniqueness check: plain set-insert over the enumerated table.
        let mut lookup = HashMap::new();
        for (action, key) in &bindings {
            if lookup.insert(key.clone(), *action).is_some() {
                return Err(ConfigError::DuplicateKeyBinding(key.clone()));
            }
        }

        Ok(Self { bindings, lookup })
    }

    /// Table with default bindings only.
    pub fn defaults() -> Self {
        // Defaults are statically unique; the Err arm is unreachable.
        Self::with_overrides(&HashMap::new()).unwrap_or(Self {
            bindings: Vec::new(),
            lookup: HashMap::new(),
        })
    }

    /// Action bound to a key, if any.
    pub fn action_for(&self, key: &str) -> Option<Action> {
        self.lookup.get(key).copied()
    }

    /// Key bound to an action.
    pub fn key_for(&self, action: Action) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(a, _)| *a == action)
            .map(|(_, k)| k.as_str())
    }

    /// All `(action, key)` pairs for the help screen.
    pub fn entries(&self) -> impl Iterator<Item = (Action, &str)> {
        self.bindings.iter().map(|(a, k)| (*a, k.as_str()))
    }
}
