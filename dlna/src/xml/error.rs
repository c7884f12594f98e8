/// Result type for XML parsing and path evaluation
pub type XmlResult<T> = Result<T, XmlError>;

/// Failures of the structural parser and the path evaluator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XmlError {
    #[error("XML syntax error: {0}")]
    Syntax(String),

    #[error("unexpected end of document inside `{0}`")]
    UnexpectedEof(String),

    #[error("path not found: {0}")]
    NotFound(String),
}
