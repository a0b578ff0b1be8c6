use crate::bytecode::compile_error::CompileError;
use crate::bytecode::ir::ProgramImage;
use crate::bytecode::op::OpCode;
use crate::frontend::token::{Token, TokenKind};
use crate::lang::ast::{BinaryOp, Expr, FunctionDecl, Program, Stmt};
use crate::lang::value::Value;

/// Name of the output primitive recognized by the compiler. It is not a
/// registered function; calls to it lower to the PRINT instruction.
const PRINT_BUILTIN: &str = "print";

/// Lowers a parsed program into a `ProgramImage`.
///
/// Emission order is globals, then function declarations in source
/// order, then any bare trailing expressions (test input). Execution
/// starts at `main`'s entry pc, so global-binding instructions are never
/// reached at run time; they are kept for inspection and disassembly.
pub struct Compiler {
    image: ProgramImage,
}

impl Compiler {
    pub fn new() -> Self {
        Compiler {
            image: ProgramImage::new(),
        }
    }

    pub fn compile_program(mut self, program: &Program) -> Result<ProgramImage, CompileError> {
        for global in &program.globals {
            self.compile_stmt(global)?;
        }
        for function in &program.functions {
            self.compile_function(function)?;
        }
        for expr in &program.trailing {
            self.compile_expr(expr)?;
        }
        Ok(self.image)
    }

    fn compile_function(&mut self, decl: &FunctionDecl) -> Result<(), CompileError> {
        let params = decl
            .params
            .iter()
            .map(|p| self.image.add_value(Value::Name(p.lexeme.clone())))
            .collect();
        self.image.add_function(&decl.name.lexeme, params);

        for stmt in &decl.body {
            self.compile_stmt(stmt)?;
        }

        // Every body ends with RETURN so execution cannot fall through
        // into the next function's instructions.
        if !matches!(decl.body.last(), Some(Stmt::Return { .. })) {
            self.image.push_inst(OpCode::Return)?;
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Let { name, init } => self.compile_binding(name, init),
            Stmt::Assign { name, value } => self.compile_binding(name, value),

            Stmt::Call(expr) => match expr {
                Expr::Call { name, args } if name.lexeme == PRINT_BUILTIN => {
                    self.compile_print(name, args)
                }
                // The return value stays on the caller's stack; there is
                // no pop instruction to discard it.
                Expr::Call { .. } => self.compile_expr(expr),
                other => Err(CompileError::internal(format!(
                    "call statement without a call expression: {:?}",
                    other
                ))),
            },

            Stmt::Return { value } => {
                match value.kind {
                    TokenKind::Number => {
                        let datum = self.literal_value(value)?;
                        self.image.push_inst_with(OpCode::Push, vec![datum])?;
                    }
                    TokenKind::Identifier => {
                        self.image.push_inst_with(
                            OpCode::LoadLocal,
                            vec![Value::Name(value.lexeme.clone())],
                        )?;
                    }
                    other => {
                        return Err(CompileError::internal(format!(
                            "return operand must be a number or identifier, got {:?}",
                            other
                        )));
                    }
                }
                self.image.push_inst(OpCode::Return)
            }

            Stmt::If { cond, body } => {
                self.compile_expr(cond)?;

                let then_label = self.image.next_label();
                let end_label = self.image.next_label();
                self.image.push_inst_with(
                    OpCode::Branch,
                    vec![
                        Value::Name(then_label.clone()),
                        Value::Name(end_label.clone()),
                    ],
                )?;

                // Registered even for an empty body, so the taken branch
                // always has a target.
                self.image.add_label(&then_label);
                for stmt in body {
                    self.compile_stmt(stmt)?;
                }
                self.image.add_label(&end_label);
                Ok(())
            }
        }
    }

    /// Compiles the initializer and stores the result under `name`.
    fn compile_binding(&mut self, name: &Token, init: &Expr) -> Result<(), CompileError> {
        self.compile_expr(init)?;
        self.image
            .push_inst_with(OpCode::StoreLocal, vec![Value::Name(name.lexeme.clone())])
    }

    /// Lowers `print(arg)`. PRINT reads its operand from the value pool,
    /// so only a single literal argument can be accepted here.
    fn compile_print(&mut self, name: &Token, args: &[Expr]) -> Result<(), CompileError> {
        match args {
            [Expr::Literal(token)] => {
                let datum = self.literal_value(token)?;
                self.image.push_inst_with(OpCode::Print, vec![datum])
            }
            _ => Err(CompileError::print_argument(name.line)),
        }
    }

    fn compile_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Literal(token) => {
                let datum = self.literal_value(token)?;
                self.image.push_inst_with(OpCode::Push, vec![datum])
            }

            Expr::Variable(token) => self.image.push_inst_with(
                OpCode::LoadLocal,
                vec![Value::Name(token.lexeme.clone())],
            ),

            // The operator itself is not lowered.
            // TODO: lower unary minus once the instruction set has a
            // negate opcode.
            Expr::Unary { operand, .. } => self.compile_expr(operand),

            Expr::Binary {
                op, left, right, ..
            } => {
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                self.image.push_inst(opcode_for(*op))
            }

            Expr::Call { name, args } => {
                if name.lexeme == PRINT_BUILTIN {
                    return Err(CompileError::print_as_expression(name.line));
                }
                for arg in args {
                    self.compile_expr(arg)?;
                }
                self.image
                    .push_inst_with(OpCode::Call, vec![Value::Name(name.lexeme.clone())])
            }
        }
    }

    /// Converts a literal token into its pool value.
    fn literal_value(&self, token: &Token) -> Result<Value, CompileError> {
        match token.kind {
            TokenKind::Number => {
                let number: f64 = token
                    .lexeme
                    .parse()
                    .map_err(|_| CompileError::malformed_number(&token.lexeme, token.line))?;
                Ok(Value::Double(number))
            }
            TokenKind::Str => Ok(Value::Str(token.lexeme.clone())),
            TokenKind::True => Ok(Value::Double(1.0)),
            TokenKind::False => Ok(Value::Double(0.0)),
            TokenKind::Nil => Ok(Value::Unset),
            other => Err(CompileError::internal(format!(
                "token {:?} is not a literal",
                other
            ))),
        }
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new()
    }
}

fn opcode_for(op: BinaryOp) -> OpCode {
    match op {
        BinaryOp::Add => OpCode::Add,
        BinaryOp::Sub => OpCode::Sub,
        BinaryOp::Mul => OpCode::Mul,
        BinaryOp::Div => OpCode::Div,
        BinaryOp::Equal => OpCode::Equal,
        BinaryOp::NotEqual => OpCode::BangEqual,
        BinaryOp::Less => OpCode::Less,
        BinaryOp::LessEqual => OpCode::LessEqual,
        BinaryOp::Greater => OpCode::Greater,
        BinaryOp::GreaterEqual => OpCode::GreaterEqual,
        BinaryOp::And => OpCode::And,
        BinaryOp::Or => OpCode::Or,
    }
}
