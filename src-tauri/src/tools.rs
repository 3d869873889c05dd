//! Tool record commands and output-folder image access.

use launchpad::{output, ConfigStore, ToolRecord};
use std::sync::Arc;
use tauri::State;

type Store<'a> = State<'a, Arc<ConfigStore>>;

#[tauri::command]
pub fn list_tools(store: Store<'_>) -> Result<Vec<ToolRecord>, launchpad::Error> {
    store.list()
}

#[tauri::command]
pub fn save_tool(tool: ToolRecord, store: Store<'_>) -> Result<ToolRecord, launchpad::Error> {
    store.save(tool)
}

#[tauri::command]
pub fn delete_tool(name: String, store: Store<'_>) -> Result<(), launchpad::Error> {
    store.delete(&name)
}

#[tauri::command]
pub fn copy_icon(source_path: String, store: Store<'_>) -> Result<String, launchpad::Error> {
    store.copy_icon(&source_path)
}

#[tauri::command]
pub fn get_tool_icon(path: String, store: Store<'_>) -> Result<String, launchpad::Error> {
    store.icon_data_url(&path)
}

#[tauri::command]
pub fn list_images_in_folder(folder: String) -> Vec<String> {
    output::list_images(folder)
}

#[tauri::command]
pub fn read_image_file(
    folder: String,
    file_name: String,
) -> Result<tauri::ipc::Response, launchpad::Error> {
    let bytes = output::read_image(folder, &file_name)?;
    Ok(tauri::ipc::Response::new(bytes))
}
