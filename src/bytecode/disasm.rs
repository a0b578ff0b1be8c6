//! Debug-only disassembler. The listing format is for humans reading
//! compiler output; it is not part of the language contract.

use crate::bytecode::ir::ProgramImage;
use crate::lang::value::Value;

/// Renders a human-readable listing of a program image.
///
/// Each instruction prints on one line as `pc  MNEMONIC operands`, with
/// registry entries (functions and labels) announced on the line before
/// their entry pc.
pub fn disassemble(image: &ProgramImage) -> String {
    let mut out = String::new();

    for (pc, inst) in image.instructions().iter().enumerate() {
        if let Some(meta) = image.registry().find_by_pc(pc) {
            out.push_str(&meta.name);
            out.push_str(":\n");
        }

        out.push_str(&format!("{:04} {}", pc, inst.opcode.name()));
        for &index in &inst.operands {
            out.push(' ');
            out.push_str(&format_operand(image, index));
        }
        out.push('\n');
    }

    out
}

/// Prints the listing to stdout.
pub fn print_disasm(image: &ProgramImage) {
    print!("{}", disassemble(image));
}

fn format_operand(image: &ProgramImage, index: usize) -> String {
    match image.fetch_value(index) {
        Some(Value::Double(d)) => format!("{}", d),
        Some(Value::Str(s)) => format!("\"{}\"", s),
        Some(Value::Name(n)) => n.clone(),
        Some(Value::Unset) => "nil".to_string(),
        None => format!("<bad operand {}>", index),
    }
}
