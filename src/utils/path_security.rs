use crate::models::MenuError;
use std::path::PathBuf;

/// Validates that a target path is absolute before it reaches a shell
/// capability. Relative paths are ambiguous at invocation time because the
/// menu session does not carry a working directory.
pub fn validate_path(path_str: &str) -> Result<PathBuf, MenuError> {
    let path = PathBuf::from(path_str);
    if !path.is_absolute() {
        return Err(MenuError::PathError(format!("Path must be absolute: {}", path_str)));
    }

    // Windows silently drops trailing dots/spaces; normalize them away so
    // the name we register matches the name the shell will resolve.
    #[cfg(target_os = "windows")]
    let path = {
        let mut path = path;
        let mut needs_update = None;
        if let Some(file_name) = path.file_name() {
            let name_str = file_name.to_string_lossy();
            let trimmed_name = name_str.trim_end_matches(['.', ' ']);
            if !trimmed_name.is_empty() && trimmed_name != name_str {
                needs_update = Some(trimmed_name.to_string());
            }
        }
        if let Some(new_name) = needs_update {
            path.set_file_name(new_name);
        }
        path
    };

    Ok(path)
}
