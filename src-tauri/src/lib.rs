mod browser;
mod pty;
mod tools;

use launchpad::{ConfigStore, LauncherConfig, ProcessRegistry};
use pty::TauriEventSink;
use std::sync::Arc;
use tauri::{Manager, RunEvent};

fn log_level(config: &LauncherConfig) -> log::LevelFilter {
    if cfg!(debug_assertions) {
        config.log_level_filter().max(log::LevelFilter::Debug)
    } else {
        config.log_level_filter()
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_shell::init())
        .setup(|app| {
            let data_dir = app.path().app_data_dir()?;
            let config = LauncherConfig::load(data_dir);

            app.handle().plugin(
                tauri_plugin_log::Builder::default()
                    .level(log_level(&config))
                    .build(),
            )?;
            log::info!("Data directory: {}", config.data_dir.display());

            let store = ConfigStore::new(config.data_dir.clone());
            let sink = Arc::new(TauriEventSink::new(app.handle().clone()));
            let registry = ProcessRegistry::new(&config, sink);
            log::info!("Sessions run through {}", registry.shell().program);

            app.manage(Arc::new(store));
            app.manage(Arc::new(registry));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            tools::list_tools,
            tools::save_tool,
            tools::delete_tool,
            tools::copy_icon,
            tools::get_tool_icon,
            tools::list_images_in_folder,
            tools::read_image_file,
            pty::start_session,
            pty::is_session_running,
            pty::list_running_sessions,
            pty::send_input,
            pty::resize_session,
            pty::kill_session,
            browser::open_tool_window,
            browser::open_output_folder,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app_handle, event| {
            if let RunEvent::Exit = event {
                // Clean up all tool sessions on app exit
                log::info!("App shutting down - killing tool sessions");
                if let Some(registry) = app_handle.try_state::<Arc<ProcessRegistry>>() {
                    registry.shutdown_all();
                }
            }
        });
}
