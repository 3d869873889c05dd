use launchpad::{
    KillOutcome, ProcessRegistry, SessionEvent, SessionEventSink, StartOutcome,
};
use std::sync::Arc;
use tauri::{AppHandle, Emitter, State};

pub const DATA_EVENT: &str = "tool-terminal-data";
pub const EXIT_EVENT: &str = "tool-terminal-exit";

/// Terminal text for one tool
#[derive(Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPayload {
    pub tool_name: String,
    pub data: String,
}

/// Forwards registry events to every webview.
pub struct TauriEventSink {
    app: AppHandle,
}

impl TauriEventSink {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl SessionEventSink for TauriEventSink {
    fn emit(&self, event: SessionEvent) {
        let result = match event {
            SessionEvent::Data(data) => self.app.emit(
                DATA_EVENT,
                DataPayload {
                    data: data.text(),
                    tool_name: data.tool_name,
                },
            ),
            SessionEvent::Exit(exit) => self.app.emit(EXIT_EVENT, exit),
        };
        if let Err(e) = result {
            log::warn!("[Session] Failed to emit event: {}", e);
        }
    }
}

// Tauri commands

#[tauri::command]
pub fn start_session(
    command: String,
    working_dir: String,
    name: String,
    registry: State<'_, Arc<ProcessRegistry>>,
) -> Result<StartOutcome, launchpad::Error> {
    registry.start(&command, &working_dir, &name)
}

#[tauri::command]
pub fn is_session_running(name: String, registry: State<'_, Arc<ProcessRegistry>>) -> bool {
    registry.is_running(&name)
}

#[tauri::command]
pub fn list_running_sessions(registry: State<'_, Arc<ProcessRegistry>>) -> Vec<String> {
    registry.running_tools()
}

#[tauri::command]
pub fn send_input(
    name: String,
    data: String,
    registry: State<'_, Arc<ProcessRegistry>>,
) -> Result<(), launchpad::Error> {
    registry.write(&name, data.as_bytes())
}

#[tauri::command]
pub fn resize_session(
    name: String,
    cols: u16,
    rows: u16,
    registry: State<'_, Arc<ProcessRegistry>>,
) -> Result<(), launchpad::Error> {
    registry.resize(&name, cols, rows)
}

#[tauri::command]
pub fn kill_session(
    name: String,
    registry: State<'_, Arc<ProcessRegistry>>,
) -> Result<KillOutcome, launchpad::Error> {
    registry.kill(&name)
}
