//! Error types for query compilation.

/// Errors that abort a compilation.
///
/// Compilation either yields complete SQL text or one of these; a partially
/// assembled statement is never returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// The normalized query does not match any statement shape the
    /// generator knows how to emit.
    #[error("unsupported query shape at {node}: {shape}")]
    UnsupportedShape {
        /// Kind of the offending query node.
        node: &'static str,
        /// Clause shape of the subtree that failed to match.
        shape: String,
    },

    /// A scalar expression has no compilation rule in this position.
    #[error("unsupported expression {node}: {reason}")]
    UnsupportedExpression {
        /// Kind of the offending expression node.
        node: &'static str,
        /// Why the expression was rejected.
        reason: String,
    },

    /// An expression was referenced before any FROM source or projection
    /// registered an alias for it.
    #[error("no alias registered for {node} expression #{id}")]
    MissingAlias {
        /// Kind of the offending expression node.
        node: &'static str,
        /// Identity of the expression node.
        id: u64,
    },

    /// A join node without any join operation.
    #[error("join node has an empty join chain")]
    EmptyJoinChain,

    /// A row accessor asked for a column the row does not contain.
    #[error("unknown column: {name}")]
    UnknownColumn {
        /// The requested column name.
        name: String,
    },

    /// An INSERT or UPDATE statement without any column assignment.
    #[error("{statement} statement has no column assignments")]
    EmptyAssignments {
        /// The statement keyword.
        statement: &'static str,
    },
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;
