use std::fmt;

/// Machine-readable error codes surfaced by the CLI and notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    NodeNotFound,
    ParentNotFound,
    CycleDetected,
    DuplicateNode,
    InvalidEnumValue,
    DragSessionActive,
    NoDragSession,
    EmptySelection,
    LastOwner,
    OperationRejected,
    StorageFailure,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::NodeNotFound => "E2001",
            Self::ParentNotFound => "E2002",
            Self::CycleDetected => "E2003",
            Self::DuplicateNode => "E2004",
            Self::InvalidEnumValue => "E2005",
            Self::DragSessionActive => "E3001",
            Self::NoDragSession => "E3002",
            Self::EmptySelection => "E3003",
            Self::LastOwner => "E4001",
            Self::OperationRejected => "E4002",
            Self::StorageFailure => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Workspace not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::NodeNotFound => "Node not found",
            Self::ParentNotFound => "Parent node not found",
            Self::CycleDetected => "Move would create a cycle",
            Self::DuplicateNode => "Node already exists",
            Self::InvalidEnumValue => "Invalid status/role value",
            Self::DragSessionActive => "A drag is already in progress",
            Self::NoDragSession => "No drag in progress",
            Self::EmptySelection => "Nothing selected to drag",
            Self::LastOwner => "Node must keep at least one owner",
            Self::OperationRejected => "Operation rejected by the store",
            Self::StorageFailure => "Storage failure",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to users.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `pt init` to initialize this directory."),
            Self::ConfigParseError => Some("Fix syntax in .pagetree/config.toml and retry."),
            Self::NodeNotFound | Self::ParentNotFound => Some("Run `pt tree` to list node ids."),
            Self::CycleDetected => Some("Pick a parent outside the moved node's subtree."),
            Self::DuplicateNode | Self::OperationRejected => None,
            Self::InvalidEnumValue => {
                Some("Use draft|in_review|approved|archived or owner|admin|edit|comment|view|restricted.")
            }
            Self::DragSessionActive => Some("Finish or cancel the current drag first."),
            Self::NoDragSession | Self::EmptySelection => Some("Start a drag on a node first."),
            Self::LastOwner => Some("Grant owner to another user before removing this one."),
            Self::StorageFailure => Some("Check disk space and permissions on .pagetree/."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
