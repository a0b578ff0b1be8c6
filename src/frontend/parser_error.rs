#[derive(Debug, Clone)]
pub struct ParserError {
    pub message: String,
    pub line: usize,
}

impl ParserError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        ParserError {
            message: message.into(),
            line,
        }
    }
}

impl std::fmt::Display for ParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParserError {}
