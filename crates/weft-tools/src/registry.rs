use std::sync::Arc;

use weft_core::traits::Capability;

/// The fixed set of builtin capabilities, plus an explicit `Unknown` for
/// names the registry does not recognize. Unknown is a typed soft failure:
/// it instantiates to no capability and the caller logs and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    CurrentTime,
    Calculator,
    Sleep,
    FileRead,
    FileWrite,
    Shell,
    HttpRequest,
    Unknown,
}

impl BuiltinKind {
    /// Case-insensitive lookup by persisted tool name.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "current_time" => Self::CurrentTime,
            "calculator" => Self::Calculator,
            "sleep" => Self::Sleep,
            "file_read" => Self::FileRead,
            "file_write" => Self::FileWrite,
            "shell" => Self::Shell,
            "http_request" => Self::HttpRequest,
            _ => Self::Unknown,
        }
    }

    /// Instantiate the capability. `Unknown` produces none.
    pub fn instantiate(&self) -> Option<Arc<dyn Capability>> {
        match self {
            Self::CurrentTime => Some(Arc::new(crate::builtin::current_time::CurrentTimeTool)),
            Self::Calculator => Some(Arc::new(crate::builtin::calculator::CalculatorTool)),
            Self::Sleep => Some(Arc::new(crate::builtin::sleep::SleepTool)),
            Self::FileRead => Some(Arc::new(crate::builtin::file_read::FileReadTool)),
            Self::FileWrite => Some(Arc::new(crate::builtin::file_write::FileWriteTool)),
            Self::Shell => Some(Arc::new(crate::builtin::shell::ShellTool)),
            Self::HttpRequest => Some(Arc::new(crate::builtin::http_request::HttpRequestTool)),
            Self::Unknown => None,
        }
    }
}
