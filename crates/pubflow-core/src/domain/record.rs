//! Submission records and the registry entries derived from them.
//!
//! A [`SubmissionRecord`] is rebuilt from the issue body on every pass and is
//! never mutated afterwards. [`RegistryEntry`] is the same data with the kind
//! discriminator stripped, shaped for the registry JSON files.

use serde::{Deserialize, Serialize};

use super::kind::Kind;

/// A plugin submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRecord {
    /// Module import identifier.
    pub import_id: String,
    /// Package-index distribution name.
    pub package_link: String,
    pub display_name: String,
    pub description: String,
    /// Issue creator login.
    pub author: String,
    /// `owner/name` shorthand or a full URL.
    pub repo: String,
}

/// A protocol adapter submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterRecord {
    pub import_id: String,
    pub package_link: String,
    pub display_name: String,
    pub description: String,
    pub author: String,
    pub repo: String,
}

/// A bot registration. Bots have no package distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotRecord {
    pub display_name: String,
    pub description: String,
    pub author: String,
    pub repo: String,
}

/// A fully extracted submission, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SubmissionRecord {
    Plugin(PluginRecord),
    Adapter(AdapterRecord),
    Bot(BotRecord),
}

impl SubmissionRecord {
    pub fn kind(&self) -> Kind {
        match self {
            SubmissionRecord::Plugin(_) => Kind::Plugin,
            SubmissionRecord::Adapter(_) => Kind::Adapter,
            SubmissionRecord::Bot(_) => Kind::Bot,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            SubmissionRecord::Plugin(r) => &r.display_name,
            SubmissionRecord::Adapter(r) => &r.display_name,
            SubmissionRecord::Bot(r) => &r.display_name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            SubmissionRecord::Plugin(r) => &r.description,
            SubmissionRecord::Adapter(r) => &r.description,
            SubmissionRecord::Bot(r) => &r.description,
        }
    }

    pub fn author(&self) -> &str {
        match self {
            SubmissionRecord::Plugin(r) => &r.author,
            SubmissionRecord::Adapter(r) => &r.author,
            SubmissionRecord::Bot(r) => &r.author,
        }
    }

    pub fn repo(&self) -> &str {
        match self {
            SubmissionRecord::Plugin(r) => &r.repo,
            SubmissionRecord::Adapter(r) => &r.repo,
            SubmissionRecord::Bot(r) => &r.repo,
        }
    }

    pub fn import_id(&self) -> Option<&str> {
        match self {
            SubmissionRecord::Plugin(r) => Some(&r.import_id),
            SubmissionRecord::Adapter(r) => Some(&r.import_id),
            SubmissionRecord::Bot(_) => None,
        }
    }

    /// Package-index distribution name; `None` for bots.
    pub fn package_link(&self) -> Option<&str> {
        match self {
            SubmissionRecord::Plugin(r) => Some(&r.package_link),
            SubmissionRecord::Adapter(r) => Some(&r.package_link),
            SubmissionRecord::Bot(_) => None,
        }
    }

    /// Title shared by the issue and its pull request, e.g. `Plugin: 复读机`.
    pub fn title(&self) -> String {
        format!("{}: {}", self.kind(), self.display_name())
    }

    /// Strip the discriminator for the registry file.
    pub fn to_entry(&self) -> RegistryEntry {
        RegistryEntry {
            id: self.import_id().map(str::to_string),
            link: self.package_link().map(str::to_string),
            name: self.display_name().to_string(),
            desc: self.description().to_string(),
            author: self.author().to_string(),
            repo: self.repo().to_string(),
        }
    }
}

/// One element of a kind's registry array.
///
/// Field order here is the on-disk key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub name: String,
    pub desc: String,
    pub author: String,
    pub repo: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin() -> SubmissionRecord {
        SubmissionRecord::Plugin(PluginRecord {
            import_id: "nonebot_plugin_example".to_string(),
            package_link: "nonebot-plugin-example".to_string(),
            display_name: "复读机".to_string(),
            description: "复读群友的消息".to_string(),
            author: "test".to_string(),
            repo: "nonebot/nonebot2".to_string(),
        })
    }

    #[test]
    fn title_uses_kind_label() {
        assert_eq!(plugin().title(), "Plugin: 复读机");
    }

    #[test]
    fn plugin_entry_keeps_key_order() {
        let json = serde_json::to_string(&plugin().to_entry()).unwrap();
        assert_eq!(
            json,
            r#"{"id":"nonebot_plugin_example","link":"nonebot-plugin-example","name":"复读机","desc":"复读群友的消息","author":"test","repo":"nonebot/nonebot2"}"#
        );
    }

    #[test]
    fn bot_entry_omits_package_fields() {
        let bot = SubmissionRecord::Bot(BotRecord {
            display_name: "coolqbot".to_string(),
            description: "wow".to_string(),
            author: "test".to_string(),
            repo: "he0119/coolqbot".to_string(),
        });
        let value = serde_json::to_value(bot.to_entry()).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("id"));
        assert!(!obj.contains_key("link"));
        assert!(!obj.contains_key("kind"));
        assert_eq!(obj["name"], "coolqbot");
    }
}
