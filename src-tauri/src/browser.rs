use std::sync::atomic::{AtomicU32, Ordering};
use tauri::{AppHandle, WebviewUrl, WebviewWindowBuilder};

static NEXT_WINDOW: AtomicU32 = AtomicU32::new(1);

/// Result shape shared with the frontend for fire-and-forget actions
#[derive(Debug, Clone, serde::Serialize)]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionOutcome {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Open a tool's web UI in its own window
#[tauri::command]
pub async fn open_tool_window(app: AppHandle, url: String) -> ActionOutcome {
    if url.trim().is_empty() {
        return ActionOutcome::failed("No URL provided");
    }
    let parsed = match url.parse::<tauri::Url>() {
        Ok(parsed) => parsed,
        Err(e) => return ActionOutcome::failed(format!("Invalid URL: {}", e)),
    };

    let label = format!("tool-{}", NEXT_WINDOW.fetch_add(1, Ordering::Relaxed));
    let built = WebviewWindowBuilder::new(&app, &label, WebviewUrl::External(parsed))
        .title(url.as_str())
        .inner_size(1280.0, 900.0)
        .build();

    match built {
        Ok(_) => {
            log::info!("[Browser] Opened {} in window {}", url, label);
            ActionOutcome::ok()
        }
        Err(e) => {
            log::warn!("[Browser] Failed to open {}: {}", url, e);
            ActionOutcome::failed(format!("Failed to create window: {}", e))
        }
    }
}

/// Open an output folder in the system file explorer
#[tauri::command]
#[allow(deprecated)]
pub fn open_output_folder(app: AppHandle, folder_path: String) -> ActionOutcome {
    use tauri_plugin_shell::ShellExt;

    if folder_path.trim().is_empty() {
        return ActionOutcome::failed("No folder path provided");
    }
    match app.shell().open(folder_path.as_str(), None) {
        Ok(()) => ActionOutcome::ok(),
        Err(e) => {
            log::warn!("[Browser] Failed to open {}: {}", folder_path, e);
            ActionOutcome::failed(e.to_string())
        }
    }
}
