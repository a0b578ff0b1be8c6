//! Abstract syntax tree for the flint language.
//!
//! The tree is produced by the parser and consumed by the bytecode
//! compiler. Every node keeps the token it was built from, so the
//! compiler and diagnostics can recover the lexeme and source line.
//! `render` methods reproduce a canonical text form used by the parser
//! tests: expressions render as S-expressions, bindings as `name -> expr`.

use crate::frontend::token::{Token, TokenKind};

/// Operator tag for a binary expression, one per precedence-ladder rung.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOp {
    /// Maps an operator token kind to its tag.
    pub fn from_kind(kind: TokenKind) -> Option<BinaryOp> {
        match kind {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            TokenKind::EqualEqual => Some(BinaryOp::Equal),
            TokenKind::BangEqual => Some(BinaryOp::NotEqual),
            TokenKind::Less => Some(BinaryOp::Less),
            TokenKind::LessEqual => Some(BinaryOp::LessEqual),
            TokenKind::Greater => Some(BinaryOp::Greater),
            TokenKind::GreaterEqual => Some(BinaryOp::GreaterEqual),
            TokenKind::AndAnd => Some(BinaryOp::And),
            TokenKind::BarBar => Some(BinaryOp::Or),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Two operands joined by an operator; all binary levels share this node.
    Binary {
        op: BinaryOp,
        token: Token,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `-x` or `!x`.
    Unary {
        op: UnaryOp,
        token: Token,
        operand: Box<Expr>,
    },

    /// Number, string, `true`, `false`, or `nil` leaf.
    Literal(Token),

    /// Identifier leaf referring to a local variable.
    Variable(Token),

    /// `f(a, b)`. Valid only as a statement or a binding initializer.
    Call { name: Token, args: Vec<Expr> },
}

impl Expr {
    /// Renders the expression in S-expression form: `2 + 3` → `(+ 2 3)`.
    pub fn render(&self) -> String {
        match self {
            Expr::Binary {
                token, left, right, ..
            } => format!("({} {} {})", token.lexeme, left.render(), right.render()),
            Expr::Unary { token, operand, .. } => {
                format!("({} {})", token.lexeme, operand.render())
            }
            Expr::Literal(token) | Expr::Variable(token) => token.lexeme.clone(),
            Expr::Call { name, args } => {
                let rendered: Vec<String> = args.iter().map(Expr::render).collect();
                format!("{}({})", name.lexeme, rendered.join(", "))
            }
        }
    }

}

/// Statement node.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `let name = init;` introduces a binding.
    Let { name: Token, init: Expr },

    /// `name = value;` rebinds an existing name.
    Assign { name: Token, value: Expr },

    /// A call in statement position; the payload is always `Expr::Call`.
    Call(Expr),

    /// `return x;` with a single identifier or number token as operand.
    Return { value: Token },

    /// `if (cond) { body }`; the language has no else branch.
    If { cond: Expr, body: Vec<Stmt> },
}

impl Stmt {
    pub fn render(&self) -> String {
        match self {
            Stmt::Let { name, init } => format!("{} -> {}", name.lexeme, init.render()),
            Stmt::Assign { name, value } => {
                format!("{} -> {}", name.lexeme, value.render())
            }
            Stmt::Call(expr) => expr.render(),
            Stmt::Return { value } => format!("return {}", value.lexeme),
            Stmt::If { cond, body } => {
                let mut out = format!("if ({})", cond.render());
                for stmt in body {
                    out.push_str("\n\t");
                    out.push_str(&stmt.render());
                }
                out
            }
        }
    }
}

/// One `fn name(params) { body }` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

impl FunctionDecl {
    pub fn render(&self) -> String {
        let params: Vec<&str> = self.params.iter().map(|p| p.lexeme.as_str()).collect();
        let mut out = format!("{} ({}) ->", self.name.lexeme, params.join(", "));
        for stmt in &self.body {
            out.push_str("\n    ");
            out.push_str(&stmt.render());
        }
        out
    }
}

/// Root of the AST: global bindings, function declarations, and any bare
/// trailing expressions (the latter only appear in test input).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub globals: Vec<Stmt>,
    pub functions: Vec<FunctionDecl>,
    pub trailing: Vec<Expr>,
}

impl Program {
    pub fn render(&self) -> String {
        let mut out = String::new();
        for global in &self.globals {
            out.push_str(&global.render());
            out.push('\n');
        }
        for function in &self.functions {
            out.push_str(&function.render());
            out.push('\n');
        }
        for expr in &self.trailing {
            out.push_str(&expr.render());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: TokenKind, lexeme: &str) -> Token {
        Token::new(kind, lexeme, 1)
    }

    fn number(lexeme: &str) -> Expr {
        Expr::Literal(token(TokenKind::Number, lexeme))
    }

    #[test]
    fn test_render_binary() {
        let expr = Expr::Binary {
            op: BinaryOp::Add,
            token: token(TokenKind::Plus, "+"),
            left: Box::new(number("2")),
            right: Box::new(number("3")),
        };
        assert_eq!(expr.render(), "(+ 2 3)");
    }

    #[test]
    fn test_render_nested_binary() {
        let inner = Expr::Binary {
            op: BinaryOp::Div,
            token: token(TokenKind::Slash, "/"),
            left: Box::new(number("21")),
            right: Box::new(number("21")),
        };
        let expr = Expr::Binary {
            op: BinaryOp::Add,
            token: token(TokenKind::Plus, "+"),
            left: Box::new(number("32")),
            right: Box::new(inner),
        };
        assert_eq!(expr.render(), "(+ 32 (/ 21 21))");
    }

    #[test]
    fn test_render_unary() {
        let expr = Expr::Unary {
            op: UnaryOp::Not,
            token: token(TokenKind::Bang, "!"),
            operand: Box::new(Expr::Variable(token(TokenKind::Identifier, "flag"))),
        };
        assert_eq!(expr.render(), "(! flag)");
    }

    #[test]
    fn test_render_let_statement() {
        let stmt = Stmt::Let {
            name: token(TokenKind::Identifier, "a"),
            init: number("3"),
        };
        assert_eq!(stmt.render(), "a -> 3");
    }

    #[test]
    fn test_render_function() {
        let decl = FunctionDecl {
            name: token(TokenKind::Identifier, "main"),
            params: vec![
                token(TokenKind::Identifier, "arg1"),
                token(TokenKind::Identifier, "arg2"),
            ],
            body: vec![Stmt::Let {
                name: token(TokenKind::Identifier, "a"),
                init: number("3"),
            }],
        };
        assert_eq!(decl.render(), "main (arg1, arg2) ->\n    a -> 3");
    }

    #[test]
    fn test_binary_op_from_kind() {
        assert_eq!(BinaryOp::from_kind(TokenKind::Plus), Some(BinaryOp::Add));
        assert_eq!(
            BinaryOp::from_kind(TokenKind::BangEqual),
            Some(BinaryOp::NotEqual)
        );
        assert_eq!(BinaryOp::from_kind(TokenKind::BarBar), Some(BinaryOp::Or));
        assert_eq!(BinaryOp::from_kind(TokenKind::Semicolon), None);
    }
}
