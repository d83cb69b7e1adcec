use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Where a saved chart goes.
pub enum OutputTarget<'a> {
    /// A filename given as plain text.
    Path(String),
    /// A filesystem path.
    StructuredPath(PathBuf),
    /// An already open writer. It is written to but never closed.
    Stream(&'a mut dyn Write),
}

impl<'a> OutputTarget<'a> {
    pub fn path(name: impl Into<String>) -> Self {
        OutputTarget::Path(name.into())
    }

    pub fn structured(path: impl Into<PathBuf>) -> Self {
        OutputTarget::StructuredPath(path.into())
    }

    pub fn stream(writer: &'a mut dyn Write) -> Self {
        OutputTarget::Stream(writer)
    }

    /// The filesystem location, if this target is one.
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            OutputTarget::Path(name) => Some(Path::new(name)),
            OutputTarget::StructuredPath(path) => Some(path.as_path()),
            OutputTarget::Stream(_) => None,
        }
    }
}

impl fmt::Debug for OutputTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Path(name) => f.debug_tuple("Path").field(name).finish(),
            OutputTarget::StructuredPath(path) => {
                f.debug_tuple("StructuredPath").field(path).finish()
            }
            OutputTarget::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl fmt::Display for OutputTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.file_path() {
            Some(path) => write!(f, "{}", path.display()),
            None => f.write_str("<stream>"),
        }
    }
}
