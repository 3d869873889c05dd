//! Tool configuration store.
//!
//! Layout under the data root:
//! - `tools/<sanitized name>.json`, one file per [`ToolRecord`]
//! - `icons/<millis>.<ext>`, icon assets copied in by [`ConfigStore::copy_icon`]

use crate::config::{ICONS_DIR, TOOLS_DIR};
use crate::error::{Error, Result};
use crate::tool::{sanitize_name, ToolRecord};
use base64::Engine;
use chrono::{SecondsFormat, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

const RECORD_EXT: &str = "json";

/// File-per-tool record store.
///
/// Names that sanitize to the same key (`a b` and `a_b`) share one file: a save
/// replaces whichever tool held it, while `get` and `delete` only act on a file
/// whose stored name matches exactly.
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.root.join(TOOLS_DIR)
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.tools_dir()
            .join(format!("{}.{}", sanitize_name(name), RECORD_EXT))
    }

    /// All records in the store, in directory order.
    ///
    /// Files that fail to read or parse are skipped with a warning.
    pub fn list(&self) -> Result<Vec<ToolRecord>> {
        let dir = self.tools_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut tools = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            match read_record(&path) {
                Ok(tool) => tools.push(tool),
                Err(e) => log::warn!("[Store] Skipping tool file {}: {}", path.display(), e),
            }
        }
        Ok(tools)
    }

    pub fn get(&self, name: &str) -> Result<Option<ToolRecord>> {
        let path = self.record_path(name);
        match read_record(&path) {
            // Distinct names can share a sanitized key; only return an exact match.
            Ok(tool) if tool.name == name => Ok(Some(tool)),
            Ok(_) => Ok(None),
            Err(Error::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Stamp and persist `record`, replacing any previous file for the same key.
    ///
    /// `createdAt` keeps the value already on disk, then the caller's value, and is
    /// only minted when neither exists. Returns the record as written.
    pub fn save(&self, mut record: ToolRecord) -> Result<ToolRecord> {
        if record.name.trim().is_empty() {
            return Err(Error::InvalidInput("tool name must not be empty".into()));
        }

        let dir = self.tools_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            log::info!("[Store] Created tools directory {}", dir.display());
        }

        let path = self.record_path(&record.name);
        let previous_created = match read_record(&path) {
            // A different tool with the same key does not lend its creation time.
            Ok(existing) if existing.name == record.name => existing.created_at,
            Ok(existing) => {
                log::warn!(
                    "[Store] '{}' replaces '{}', which shares its file {}",
                    record.name,
                    existing.name,
                    path.display()
                );
                None
            }
            Err(_) => None,
        };

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        record.created_at = previous_created
            .or(record.created_at.take())
            .or_else(|| Some(now.clone()));
        record.last_modified = Some(now);

        let contents =
            serde_json::to_string_pretty(&record).map_err(|e| Error::json(&path, e))?;
        fs::write(&path, contents)?;
        log::info!("[Store] Saved tool '{}' to {}", record.name, path.display());
        Ok(record)
    }

    /// Remove the record for `name`. Missing records are not an error, and a file
    /// holding a different tool under the same key is left alone.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.record_path(name);
        if let Ok(existing) = read_record(&path) {
            if existing.name != name {
                log::debug!(
                    "[Store] Not deleting {}: it holds '{}', not '{}'",
                    path.display(),
                    existing.name,
                    name
                );
                return Ok(());
            }
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                log::info!("[Store] Deleted tool '{}'", name);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Copy an icon file into `icons/` and return its root-relative path.
    pub fn copy_icon(&self, source: &str) -> Result<String> {
        if source.trim().is_empty() {
            return Err(Error::InvalidInput("no icon source path provided".into()));
        }
        let source = Path::new(source);
        let ext = source
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        let icons = self.root.join(ICONS_DIR);
        fs::create_dir_all(&icons)?;

        let stamp = Utc::now().timestamp_millis();
        let mut file_name = format!("{}{}", stamp, ext);
        let mut n = 1;
        while icons.join(&file_name).exists() {
            file_name = format!("{}-{}{}", stamp, n, ext);
            n += 1;
        }

        fs::copy(source, icons.join(&file_name))?;
        let relative = format!("{}/{}", ICONS_DIR, file_name);
        log::info!("[Store] Copied icon {} to {}", source.display(), relative);
        Ok(relative)
    }

    /// Read a stored icon as a `data:` URL.
    pub fn icon_data_url(&self, relative: &str) -> Result<String> {
        let path = self.resolve_icon(relative)?;
        let bytes = fs::read(&path)?;
        let mime = mime_guess::from_path(&path).first_or_octet_stream();
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(format!("data:{};base64,{}", mime.essence_str(), encoded))
    }

    fn resolve_icon(&self, relative: &str) -> Result<PathBuf> {
        let rel = Path::new(relative);
        let mut components = rel.components();
        let under_icons = matches!(components.next(), Some(Component::Normal(first)) if first == ICONS_DIR);
        let rest_normal = components.all(|c| matches!(c, Component::Normal(_)));
        if !under_icons || !rest_normal || rel.components().count() < 2 {
            return Err(Error::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

fn read_record(path: &Path) -> Result<ToolRecord> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|e| Error::json(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icon_paths_must_stay_under_icons() {
        let store = ConfigStore::new("/data");
        assert!(store.resolve_icon("icons/1.png").is_ok());
        assert!(store.resolve_icon("icons").is_err());
        assert!(store.resolve_icon("icons/../tools/Foo.json").is_err());
        assert!(store.resolve_icon("/etc/passwd").is_err());
        assert!(store.resolve_icon("tools/Foo.json").is_err());
    }

    #[test]
    fn record_path_uses_sanitized_key() {
        let store = ConfigStore::new("/data");
        assert_eq!(
            store.record_path("a/b c"),
            PathBuf::from("/data").join("tools").join("a_b_c.json")
        );
    }
}
