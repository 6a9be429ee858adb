use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Serialize)]
pub enum MenuError {
    Enumeration(String),
    Invocation(String),
    FontInstall(String),
    PathError(String),
    IoError(String),
    SystemError(String),
}

impl std::error::Error for MenuError {}

impl fmt::Display for MenuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuError::Enumeration(msg) => write!(f, "Enumeration Error: {}", msg),
            MenuError::Invocation(msg) => write!(f, "Invocation Error: {}", msg),
            MenuError::FontInstall(msg) => write!(f, "Font Install Error: {}", msg),
            MenuError::PathError(msg) => write!(f, "Path Error: {}", msg),
            MenuError::IoError(msg) => write!(f, "IO Error: {}", msg),
            MenuError::SystemError(msg) => write!(f, "System Error: {}", msg),
        }
    }
}

impl From<std::io::Error> for MenuError {
    fn from(err: std::io::Error) -> Self {
        MenuError::IoError(err.to_string())
    }
}
