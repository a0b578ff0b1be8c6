#[derive(Debug, Clone)]
pub enum CompileError {
    /// `print` was used with arguments the instruction set cannot print.
    /// The PRINT instruction reads its operand from the value pool, so
    /// only a single literal argument can be lowered.
    PrintArgument { line: usize },

    /// `print` appeared where a value is expected; it produces none.
    PrintAsExpression { line: usize },

    /// A number token whose lexeme does not parse as a double.
    MalformedNumber { lexeme: String, line: usize },

    /// Internal compiler invariant violation. Never expected to fire on
    /// parser output.
    Internal(String),
}

impl CompileError {
    pub fn print_argument(line: usize) -> Self {
        CompileError::PrintArgument { line }
    }

    pub fn print_as_expression(line: usize) -> Self {
        CompileError::PrintAsExpression { line }
    }

    pub fn malformed_number(lexeme: &str, line: usize) -> Self {
        CompileError::MalformedNumber {
            lexeme: lexeme.to_string(),
            line,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::Internal(message.into())
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::PrintArgument { line } => {
                write!(
                    f,
                    "compile error: line {}: print requires a single literal argument",
                    line
                )
            }
            CompileError::PrintAsExpression { line } => {
                write!(
                    f,
                    "compile error: line {}: print cannot be used as an expression",
                    line
                )
            }
            CompileError::MalformedNumber { lexeme, line } => {
                write!(
                    f,
                    "compile error: line {}: '{}' is not a valid number",
                    line, lexeme
                )
            }
            CompileError::Internal(message) => {
                write!(f, "compile error: internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for CompileError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_argument_display() {
        let err = CompileError::print_argument(4);
        let msg = err.to_string();
        assert!(msg.contains("line 4"));
        assert!(msg.contains("literal argument"));
    }

    #[test]
    fn test_malformed_number_display() {
        let err = CompileError::malformed_number("1.2.3", 2);
        let msg = err.to_string();
        assert!(msg.contains("1.2.3"));
        assert!(msg.contains("line 2"));
    }

    #[test]
    fn test_internal_display() {
        let err = CompileError::internal("operand mismatch");
        assert!(err.to_string().contains("internal error: operand mismatch"));
    }

    #[test]
    fn test_error_implements_std_error() {
        let err = CompileError::internal("test");
        let _: &dyn std::error::Error = &err;
    }
}
