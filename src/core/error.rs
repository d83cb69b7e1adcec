use thiserror::Error;

/// Problems with the arguments given to a save, detected before any output
/// is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("must specify file format: ['png', 'svg', 'pdf', 'html', 'json', 'vega']")]
    MissingFormat,
    #[error("mode must be 'vega-lite', not '{0}'")]
    InvalidMode(String),
    #[error("must specify vega-lite version")]
    MissingVersion,
    #[error("Unsupported format: '{0}'")]
    UnsupportedFormat(String),
}

/// The converter answered, but not with what the requested format needs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BundleError {
    #[error("converter output has no '{0}' entry")]
    MissingEntry(String),
    #[error("converter output for '{mime}' is {found} content")]
    WrongKind { mime: String, found: &'static str },
}
