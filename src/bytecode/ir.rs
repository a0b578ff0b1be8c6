//! The program image: the executable artifact produced by the compiler
//! and interpreted by the VM.
//!
//! An image holds a linear instruction stream, an append-only value pool,
//! and a function registry. Instructions reference pool values by index
//! only; once a value is appended its index is a stable identity. The
//! image is append-only during compilation and read-only during
//! execution.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::bytecode::compile_error::CompileError;
use crate::bytecode::op::OpCode;
use crate::lang::value::Value;

/// A single instruction: an opcode plus pool indices for its operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: OpCode,
    pub operands: Vec<usize>,
}

/// Metadata for one registered function or branch label.
///
/// A label is mechanically a function with no parameters whose entry pc
/// is the instruction index current at registration time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionMeta {
    pub name: String,
    pub entry_pc: usize,
    /// Pool indices of the parameter names, in declaration order.
    pub params: Vec<usize>,
}

/// Two-way mapping between function/label names and entry pcs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionRegistry {
    by_name: HashMap<String, FunctionMeta>,
    by_pc: HashMap<usize, String>,
}

impl FunctionRegistry {
    pub fn register(&mut self, meta: FunctionMeta) {
        // When two labels land on the same pc (nested ifs that end
        // together) the first registration keeps the pc slot.
        self.by_pc.entry(meta.entry_pc).or_insert_with(|| meta.name.clone());
        self.by_name.insert(meta.name.clone(), meta);
    }

    pub fn find_by_name(&self, name: &str) -> Option<&FunctionMeta> {
        self.by_name.get(name)
    }

    pub fn find_by_pc(&self, pc: usize) -> Option<&FunctionMeta> {
        self.by_pc.get(&pc).and_then(|name| self.by_name.get(name))
    }
}

/// The executable artifact: instructions, value pool, function registry,
/// and the counter used to mint fresh label names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramImage {
    instructions: Vec<Instruction>,
    values: Vec<Value>,
    registry: FunctionRegistry,
    label_counter: usize,
}

impl ProgramImage {
    pub fn new() -> Self {
        ProgramImage::default()
    }

    /// Appends an instruction with no operands.
    pub fn push_inst(&mut self, opcode: OpCode) -> Result<(), CompileError> {
        self.push_inst_with(opcode, Vec::new())
    }

    /// Interns `operands` in the value pool and appends an instruction
    /// referencing them.
    ///
    /// # Errors
    /// Returns an internal error when the operand count does not match
    /// the opcode's fixed arity.
    pub fn push_inst_with(
        &mut self,
        opcode: OpCode,
        operands: Vec<Value>,
    ) -> Result<(), CompileError> {
        if operands.len() != opcode.operand_count() {
            return Err(CompileError::internal(format!(
                "{} takes {} operand(s), got {}",
                opcode.name(),
                opcode.operand_count(),
                operands.len()
            )));
        }
        let indices = operands.into_iter().map(|v| self.add_value(v)).collect();
        self.instructions.push(Instruction { opcode, operands: indices });
        Ok(())
    }

    /// Appends a value to the pool and returns its index.
    pub fn add_value(&mut self, value: Value) -> usize {
        self.values.push(value);
        self.values.len() - 1
    }

    pub fn fetch_value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn fetch_inst(&self, pc: usize) -> Option<&Instruction> {
        self.instructions.get(pc)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Registers a function whose body starts at the current end of the
    /// instruction stream. `params` are pool indices of `Name` values.
    pub fn add_function(&mut self, name: &str, params: Vec<usize>) {
        self.registry.register(FunctionMeta {
            name: name.to_string(),
            entry_pc: self.instructions.len(),
            params,
        });
    }

    /// Registers a branch-target label at the current end of the
    /// instruction stream.
    pub fn add_label(&mut self, name: &str) {
        self.add_function(name, Vec::new());
    }

    /// Mints a fresh label name from the per-image counter. Uniqueness
    /// within the image is the only guaranteed property.
    pub fn next_label(&mut self) -> String {
        let label = format!("label_{}", self.label_counter);
        self.label_counter += 1;
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_pool_indices_are_stable() {
        let mut image = ProgramImage::new();
        let first = image.add_value(Value::Double(2.0));
        let second = image.add_value(Value::Double(3.0));
        assert_eq!(first, 0);
        assert_eq!(second, 1);

        image.add_value(Value::Str("more".to_string()));
        assert_eq!(image.fetch_value(first), Some(&Value::Double(2.0)));
        assert_eq!(image.fetch_value(second), Some(&Value::Double(3.0)));
    }

    #[test]
    fn test_fetch_value_out_of_range() {
        let image = ProgramImage::new();
        assert_eq!(image.fetch_value(0), None);
    }

    #[test]
    fn test_push_inst_interns_operands() {
        let mut image = ProgramImage::new();
        image
            .push_inst_with(OpCode::Push, vec![Value::Double(2.0)])
            .unwrap();
        image
            .push_inst_with(OpCode::Push, vec![Value::Double(3.0)])
            .unwrap();
        image.push_inst(OpCode::Add).unwrap();

        assert_eq!(image.instructions().len(), 3);
        assert_eq!(image.instructions()[0].operands, vec![0]);
        assert_eq!(image.instructions()[1].operands, vec![1]);
        assert!(image.instructions()[2].operands.is_empty());
        assert_eq!(image.values()[0], Value::Double(2.0));
        assert_eq!(image.values()[1], Value::Double(3.0));
    }

    #[test]
    fn test_operand_count_is_enforced() {
        let mut image = ProgramImage::new();
        assert!(image.push_inst(OpCode::Push).is_err());
        assert!(image
            .push_inst_with(OpCode::Add, vec![Value::Double(1.0)])
            .is_err());
        assert!(image
            .push_inst_with(OpCode::Branch, vec![Value::Name("l".to_string())])
            .is_err());
        assert!(image.instructions().is_empty());
    }

    #[test]
    fn test_registry_is_bijective() {
        let mut image = ProgramImage::new();
        image.add_function("main", Vec::new());
        image.push_inst(OpCode::Return).unwrap();
        image.add_function("sub", Vec::new());
        image.push_inst(OpCode::Return).unwrap();

        let main = image.registry().find_by_name("main").unwrap();
        let sub = image.registry().find_by_name("sub").unwrap();
        assert_eq!(main.entry_pc, 0);
        assert_eq!(sub.entry_pc, 1);
        assert_eq!(image.registry().find_by_pc(0).unwrap().name, "main");
        assert_eq!(image.registry().find_by_pc(1).unwrap().name, "sub");
    }

    #[test]
    fn test_label_is_a_zero_arg_function() {
        let mut image = ProgramImage::new();
        image.push_inst(OpCode::Return).unwrap();
        image.add_label("label_0");

        let label = image.registry().find_by_name("label_0").unwrap();
        assert_eq!(label.entry_pc, 1);
        assert!(label.params.is_empty());
    }

    #[test]
    fn test_next_label_is_monotonic() {
        let mut image = ProgramImage::new();
        assert_eq!(image.next_label(), "label_0");
        assert_eq!(image.next_label(), "label_1");
        assert_eq!(image.next_label(), "label_2");
    }

    #[test]
    fn test_unknown_function_lookup() {
        let image = ProgramImage::new();
        assert!(image.registry().find_by_name("missing").is_none());
        assert!(image.registry().find_by_pc(7).is_none());
    }
}
