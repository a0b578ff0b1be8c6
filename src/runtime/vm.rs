//! Stack-based virtual machine for compiled program images.
//!
//! Execution starts at the `main` entry of the image's function registry
//! and proceeds one instruction at a time over a stack of frames. Each
//! frame owns its operand stack and local variable table; a nested call
//! can only see the caller's data through argument passing. The image is
//! never mutated during execution.

use std::collections::HashMap;
use std::io::{self, Write};

use crate::bytecode::ir::{Instruction, ProgramImage};
use crate::bytecode::op::OpCode;
use crate::lang::value::Value;
use crate::runtime::runtime_error::RuntimeError;

/// Name of the function where execution starts.
pub const STARTUP_ENTRY: &str = "main";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    /// Program is loaded and instruction state is reset; ready to run.
    Initialized,
    /// The program ran to completion.
    SuccessfulTerminated,
    /// The run was aborted by a precondition failure.
    TerminatedWithError,
}

/// One function activation: operand stack, local variables, and the pc
/// to resume in the caller.
#[derive(Debug, Default)]
pub struct Frame {
    stack: Vec<Value>,
    locals: HashMap<String, Value>,
    return_pc: usize,
    /// Set on the `main` frame only. Returning from it ends the program
    /// instead of popping, so the frame stays inspectable after the run.
    is_root: bool,
}

impl Frame {
    fn root() -> Self {
        Frame {
            is_root: true,
            ..Frame::default()
        }
    }
}

pub struct Vm {
    image: ProgramImage,
    pc: usize,
    frames: Vec<Frame>,
    state: VmState,
    out: Box<dyn Write>,
}

impl Vm {
    /// Creates a VM over `image` writing `print` output to stdout.
    ///
    /// # Errors
    /// Fails when the image has no `main` function.
    pub fn new(image: ProgramImage) -> Result<Self, RuntimeError> {
        Vm::with_output(image, Box::new(io::stdout()))
    }

    /// Creates a VM with a caller-supplied output sink.
    pub fn with_output(image: ProgramImage, out: Box<dyn Write>) -> Result<Self, RuntimeError> {
        let entry = lookup_entry(&image)?;
        Ok(Vm {
            image,
            pc: entry,
            frames: vec![Frame::root()],
            state: VmState::Initialized,
            out,
        })
    }

    #[allow(dead_code)]
    pub fn state(&self) -> VmState {
        self.state
    }

    /// The current frame's binding for `name`, if any. After a normal
    /// run the current frame is the root frame, so this inspects the
    /// final state of `main`'s locals.
    #[allow(dead_code)]
    pub fn local(&self, name: &str) -> Option<&Value> {
        self.frames.last().and_then(|f| f.locals.get(name))
    }

    /// The current frame's operand stack, bottom first.
    #[allow(dead_code)]
    pub fn stack(&self) -> &[Value] {
        self.frames.last().map(|f| f.stack.as_slice()).unwrap_or(&[])
    }

    /// Runs until the program terminates or an instruction fails.
    pub fn start(&mut self) -> Result<(), RuntimeError> {
        match self.run() {
            Ok(()) => {
                self.state = VmState::SuccessfulTerminated;
                Ok(())
            }
            Err(e) => {
                self.state = VmState::TerminatedWithError;
                Err(e)
            }
        }
    }

    /// Swaps in a new image and runs it from a clean slate.
    ///
    /// # Errors
    /// Fails when called before the previous run terminated, or when the
    /// new image has no `main` function.
    pub fn restart(&mut self, image: ProgramImage) -> Result<(), RuntimeError> {
        if self.state == VmState::Initialized {
            return Err(RuntimeError::new(
                "restart is only valid from a terminated state",
            ));
        }
        let entry = lookup_entry(&image)?;
        self.image = image;
        self.pc = entry;
        self.frames = vec![Frame::root()];
        self.state = VmState::Initialized;
        self.start()
    }

    fn run(&mut self) -> Result<(), RuntimeError> {
        'run: while !self.frames.is_empty() {
            // Running past the last instruction is a normal exit.
            let Some(inst) = self.image.fetch_inst(self.pc) else {
                break;
            };
            let inst = inst.clone();
            let pc = self.pc;

            match inst.opcode {
                OpCode::Print => {
                    let value = self.literal_operand(&inst, 0, pc)?.clone();
                    writeln!(self.out, "{}", value).map_err(|e| {
                        RuntimeError::new(format!("output sink failed: {}", e))
                            .at("PRINT", pc)
                    })?;
                    self.out.flush().ok();
                    self.pc += 1;
                }

                OpCode::Push => {
                    let value = self.literal_operand(&inst, 0, pc)?.clone();
                    self.push(value)?;
                    self.pc += 1;
                }

                OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div => {
                    self.arithmetic(inst.opcode, pc)?;
                    self.pc += 1;
                }

                OpCode::Equal
                | OpCode::BangEqual
                | OpCode::Less
                | OpCode::LessEqual
                | OpCode::Greater
                | OpCode::GreaterEqual => {
                    self.comparison(inst.opcode, pc)?;
                    self.pc += 1;
                }

                OpCode::And | OpCode::Or => {
                    self.logical(inst.opcode, pc)?;
                    self.pc += 1;
                }

                OpCode::StoreLocal => {
                    let name = self.name_operand(&inst, 0, pc)?.to_string();
                    let value = self.pop(inst.opcode, pc)?;
                    self.frame_mut()?.locals.insert(name, value);
                    self.pc += 1;
                }

                OpCode::LoadLocal => {
                    let name = self.name_operand(&inst, 0, pc)?.to_string();
                    let value = self
                        .frame()?
                        .locals
                        .get(&name)
                        .cloned()
                        .ok_or_else(|| {
                            RuntimeError::new(format!("undefined variable `{}`", name))
                                .at("LOAD_LOCAL", pc)
                        })?;
                    self.push(value)?;
                    self.pc += 1;
                }

                OpCode::Call => self.call(&inst, pc)?,

                OpCode::Return => {
                    if self.ret(pc)? {
                        break 'run;
                    }
                }

                OpCode::Branch => {
                    if self.branch(&inst, pc)? {
                        break 'run;
                    }
                }
            }
        }

        Ok(())
    }

    /// Executes CALL: resolves the callee, moves its arguments from the
    /// caller's stack into the new frame (binding parameter names), and
    /// jumps to the entry pc.
    fn call(&mut self, inst: &Instruction, pc: usize) -> Result<(), RuntimeError> {
        let name = self.name_operand(inst, 0, pc)?.to_string();
        let meta = self
            .image
            .registry()
            .find_by_name(&name)
            .cloned()
            .ok_or_else(|| {
                RuntimeError::new(format!("`{}` is not defined", name)).at("CALL", pc)
            })?;

        let mut callee = Frame {
            return_pc: pc + 1,
            ..Frame::default()
        };

        // The caller pushed arguments left to right, so the last
        // parameter's value is on top and the walk goes right to left.
        for slot in (0..meta.params.len()).rev() {
            let value = self.pop(OpCode::Call, pc)?;
            let param = self
                .image
                .fetch_value(meta.params[slot])
                .and_then(Value::as_name)
                .ok_or_else(|| {
                    RuntimeError::new(
                        "argument name is not registered in the program data region",
                    )
                    .at("CALL", pc)
                })?
                .to_string();
            callee.stack.push(value.clone());
            callee.locals.insert(param, value);
        }

        self.pc = meta.entry_pc;
        self.frames.push(callee);
        Ok(())
    }

    /// Executes RETURN. Returns `true` when the program should stop
    /// (return from the root frame).
    fn ret(&mut self, pc: usize) -> Result<bool, RuntimeError> {
        if self.frame()?.is_root {
            return Ok(true);
        }

        let mut finished = self
            .frames
            .pop()
            .ok_or_else(|| RuntimeError::new("frame stack underflow").at("RETURN", pc))?;
        self.pc = finished.return_pc;

        // A non-empty operand stack yields the return value.
        if let Some(value) = finished.stack.pop() {
            self.frame_mut()?.stack.push(value);
        }
        Ok(false)
    }

    /// Executes BRANCH. Returns `true` when the resolved target lies past
    /// the end of the instruction stream (a normal exit).
    fn branch(&mut self, inst: &Instruction, pc: usize) -> Result<bool, RuntimeError> {
        let cond = self.pop_double(OpCode::Branch, pc)?;
        let when_true = self.label_operand(inst, 0, pc)?;
        let when_false = self.label_operand(inst, 1, pc)?;

        let target = if cond != 0.0 { when_true } else { when_false };
        if target >= self.image.instructions().len() {
            return Ok(true);
        }
        self.pc = target;
        Ok(false)
    }

    fn arithmetic(&mut self, opcode: OpCode, pc: usize) -> Result<(), RuntimeError> {
        let rhs = self.pop_double(opcode, pc)?;
        let lhs = self.pop_double(opcode, pc)?;
        let result = match opcode {
            OpCode::Add => lhs + rhs,
            OpCode::Sub => lhs - rhs,
            OpCode::Mul => lhs * rhs,
            OpCode::Div => lhs / rhs,
            other => {
                return Err(RuntimeError::new("not an arithmetic instruction")
                    .at(other.name(), pc));
            }
        };
        self.push(Value::Double(result))
    }

    fn comparison(&mut self, opcode: OpCode, pc: usize) -> Result<(), RuntimeError> {
        let rhs = self.pop_double(opcode, pc)?;
        let lhs = self.pop_double(opcode, pc)?;
        let result = match opcode {
            OpCode::Equal => lhs == rhs,
            OpCode::BangEqual => lhs != rhs,
            OpCode::Less => lhs < rhs,
            OpCode::LessEqual => lhs <= rhs,
            OpCode::Greater => lhs > rhs,
            OpCode::GreaterEqual => lhs >= rhs,
            other => {
                return Err(RuntimeError::new("not a comparison instruction")
                    .at(other.name(), pc));
            }
        };
        self.push(Value::Double(if result { 1.0 } else { 0.0 }))
    }

    fn logical(&mut self, opcode: OpCode, pc: usize) -> Result<(), RuntimeError> {
        let rhs = self.pop_double(opcode, pc)? != 0.0;
        let lhs = self.pop_double(opcode, pc)? != 0.0;
        let result = match opcode {
            OpCode::And => lhs && rhs,
            OpCode::Or => lhs || rhs,
            other => {
                return Err(RuntimeError::new("not a logical instruction").at(other.name(), pc));
            }
        };
        self.push(Value::Double(if result { 1.0 } else { 0.0 }))
    }

    // ------------------------------------------------------------------
    // Frame and operand access
    // ------------------------------------------------------------------

    fn frame(&self) -> Result<&Frame, RuntimeError> {
        self.frames
            .last()
            .ok_or_else(|| RuntimeError::new("frame stack underflow"))
    }

    fn frame_mut(&mut self) -> Result<&mut Frame, RuntimeError> {
        self.frames
            .last_mut()
            .ok_or_else(|| RuntimeError::new("frame stack underflow"))
    }

    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        self.frame_mut()?.stack.push(value);
        Ok(())
    }

    fn pop(&mut self, opcode: OpCode, pc: usize) -> Result<Value, RuntimeError> {
        self.frame_mut()?
            .stack
            .pop()
            .ok_or_else(|| RuntimeError::new("stack underflow").at(opcode.name(), pc))
    }

    fn pop_double(&mut self, opcode: OpCode, pc: usize) -> Result<f64, RuntimeError> {
        let value = self.pop(opcode, pc)?;
        value.as_double().ok_or_else(|| {
            RuntimeError::new(format!("expected a number, got {}", value.type_name()))
                .at(opcode.name(), pc)
        })
    }

    fn operand<'a>(
        &'a self,
        inst: &Instruction,
        slot: usize,
        pc: usize,
    ) -> Result<&'a Value, RuntimeError> {
        let index = inst.operands.get(slot).copied().ok_or_else(|| {
            RuntimeError::new("missing instruction operand").at(inst.opcode.name(), pc)
        })?;
        self.image.fetch_value(index).ok_or_else(|| {
            RuntimeError::new(format!("operand index {} is out of range", index))
                .at(inst.opcode.name(), pc)
        })
    }

    fn literal_operand<'a>(
        &'a self,
        inst: &Instruction,
        slot: usize,
        pc: usize,
    ) -> Result<&'a Value, RuntimeError> {
        let value = self.operand(inst, slot, pc)?;
        if value.is_literal() {
            Ok(value)
        } else {
            Err(RuntimeError::new("operand is not a literal").at(inst.opcode.name(), pc))
        }
    }

    fn name_operand<'a>(
        &'a self,
        inst: &Instruction,
        slot: usize,
        pc: usize,
    ) -> Result<&'a str, RuntimeError> {
        let value = self.operand(inst, slot, pc)?;
        value.as_name().ok_or_else(|| {
            RuntimeError::new(format!("operand is not a name, got {}", value.type_name()))
                .at(inst.opcode.name(), pc)
        })
    }

    fn label_operand(
        &self,
        inst: &Instruction,
        slot: usize,
        pc: usize,
    ) -> Result<usize, RuntimeError> {
        let name = self.name_operand(inst, slot, pc)?;
        self.image
            .registry()
            .find_by_name(name)
            .map(|meta| meta.entry_pc)
            .ok_or_else(|| {
                RuntimeError::new(format!("failed to find label entry `{}`", name))
                    .at("BRANCH", pc)
            })
    }
}

fn lookup_entry(image: &ProgramImage) -> Result<usize, RuntimeError> {
    image
        .registry()
        .find_by_name(STARTUP_ENTRY)
        .map(|meta| meta.entry_pc)
        .ok_or_else(|| RuntimeError::new("failed to load `main` function"))
}
