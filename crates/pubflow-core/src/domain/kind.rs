//! Submission kinds.

use serde::{Deserialize, Serialize};

/// The category of a publish request.
///
/// The variant name doubles as the label name attached to issues and pull
/// requests, so it must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Plugin,
    Adapter,
    Bot,
}

impl Kind {
    /// Every kind, in the order classifiers test them.
    pub const ALL: [Kind; 3] = [Kind::Plugin, Kind::Adapter, Kind::Bot];

    /// Label name, also used as the issue / pull request title prefix.
    pub fn label(&self) -> &'static str {
        match self {
            Kind::Plugin => "Plugin",
            Kind::Adapter => "Adapter",
            Kind::Bot => "Bot",
        }
    }

    /// Lowercase keyword used in publish commit messages.
    pub fn keyword(&self) -> &'static str {
        match self {
            Kind::Plugin => "plugin",
            Kind::Adapter => "adapter",
            Kind::Bot => "bot",
        }
    }

    /// Exact label-name lookup.
    pub fn from_label(name: &str) -> Option<Kind> {
        Kind::ALL.into_iter().find(|k| k.label() == name)
    }

    /// Whether submissions of this kind ship a package-index distribution.
    pub fn has_package(&self) -> bool {
        !matches!(self, Kind::Bot)
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_label_is_exact() {
        assert_eq!(Kind::from_label("Plugin"), Some(Kind::Plugin));
        assert_eq!(Kind::from_label("Bot"), Some(Kind::Bot));
        assert_eq!(Kind::from_label("plugin"), None);
        assert_eq!(Kind::from_label("Plugins"), None);
    }

    #[test]
    fn only_bot_skips_package() {
        assert!(Kind::Plugin.has_package());
        assert!(Kind::Adapter.has_package());
        assert!(!Kind::Bot.has_package());
    }
}
