use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A registered tool, persisted as one JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRecord {
    pub name: String,
    /// Emoji, or a path under `icons/` produced by `copy_icon`.
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tool_root: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub output_folder: String,
    #[serde(default)]
    pub update_command: String,
    #[serde(default)]
    pub start_command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// Fields this version does not know about, kept so a save does not drop them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolRecord {
    pub fn new(name: impl Into<String>, start_command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start_command: start_command.into(),
            ..Self::default()
        }
    }

    pub fn is_runnable(&self) -> bool {
        !self.start_command.trim().is_empty()
    }

    pub fn has_icon_asset(&self) -> bool {
        self.icon.starts_with("icons/")
    }
}

/// Storage key for a tool name: everything outside `[A-Za-z0-9_-]` becomes `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_separators_and_spaces() {
        assert_eq!(sanitize_name("a/b c"), "a_b_c");
        assert_eq!(sanitize_name("..\\evil"), "___evil");
        assert_eq!(sanitize_name("Stable-Diffusion_2"), "Stable-Diffusion_2");
        assert_eq!(sanitize_name("café"), "caf_");
    }

    #[test]
    fn uses_camel_case_field_names() {
        let mut tool = ToolRecord::new("Foo", "echo hi");
        tool.tool_root = "/tmp".into();
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["startCommand"], "echo hi");
        assert_eq!(value["toolRoot"], "/tmp");
        assert!(value.get("createdAt").is_none());
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let raw = r#"{"name":"Foo","startCommand":"run","pinned":true}"#;
        let tool: ToolRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(tool.extra.get("pinned"), Some(&Value::Bool(true)));
        assert_eq!(tool.icon, "");

        let back = serde_json::to_value(&tool).unwrap();
        assert_eq!(back["pinned"], true);
    }

    #[test]
    fn runnable_needs_start_command() {
        assert!(ToolRecord::new("Foo", "echo hi").is_runnable());
        assert!(!ToolRecord::new("Foo", "   ").is_runnable());
    }

    #[test]
    fn icon_asset_detection() {
        let mut tool = ToolRecord::new("Foo", "x");
        tool.icon = "🔧".into();
        assert!(!tool.has_icon_asset());
        tool.icon = "icons/1700000000000.png".into();
        assert!(tool.has_icon_asset());
    }
}
