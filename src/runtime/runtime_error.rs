/// Fatal error raised by the VM.
///
/// Carries the opcode mnemonic and pc of the failing instruction when
/// known; no error is recoverable from inside a running program.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub message: String,
    pub opcode: Option<&'static str>,
    pub pc: Option<usize>,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        RuntimeError {
            message: message.into(),
            opcode: None,
            pc: None,
        }
    }

    /// Attaches the opcode and pc where the failure occurred.
    pub fn at(mut self, opcode: &'static str, pc: usize) -> Self {
        self.opcode = Some(opcode);
        self.pc = Some(pc);
        self
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "runtime error: {}", self.message)?;
        if let (Some(opcode), Some(pc)) = (self.opcode, self.pc) {
            write!(f, " ({} at pc {})", opcode, pc)?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}
