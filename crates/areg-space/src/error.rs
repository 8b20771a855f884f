use areg_types::TypeError;

/// Errors from namespace configuration and resolution.
#[derive(Debug, thiserror::Error)]
pub enum SpaceError {
    #[error(transparent)]
    InvalidName(#[from] TypeError),

    /// Two namespaces would resolve to the same name.
    #[error("namespace conflict: {0}")]
    NamespaceConflict(String),

    /// A virtual space's source is not a configured base space.
    #[error("virtual space {virtual_space} has unknown source space {source_space}")]
    UnknownSource {
        virtual_space: String,
        source_space: String,
    },

    /// A configuration entry refers to a space that does not exist.
    #[error("domain {domain} is bound to unknown space {space}")]
    UnknownBinding { domain: String, space: String },

    #[error("unknown domain: {0}")]
    UnknownDomain(String),

    #[error("unknown space: {0}")]
    UnknownSpace(String),

    #[error("editor {editor} is not trusted for domain {domain}")]
    EditorNotTrusted { domain: String, editor: String },

    #[error("invalid namespace configuration: {0}")]
    Config(String),
}

pub type SpaceResult<T> = Result<T, SpaceError>;
