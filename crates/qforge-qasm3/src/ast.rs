//! Abstract Syntax Tree for `OpenQASM` programs.
//!
//! The tree is a closed set of node types. Passes over it are expected to
//! match [`Statement`] exhaustively so that a new variant shows up as a
//! compile error in every pass that has not been taught about it.

use serde::{Deserialize, Serialize};

/// A complete QASM program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// QASM version (e.g., "3.0").
    pub version: String,
    /// Top-level statements, in source order.
    pub statements: Vec<Statement>,
}

impl Program {
    /// Create a program from a version string and its statements.
    pub fn new(version: impl Into<String>, statements: Vec<Statement>) -> Self {
        Self {
            version: version.into(),
            statements,
        }
    }

    /// Create an `OPENQASM 3.0` program.
    pub fn v3(statements: Vec<Statement>) -> Self {
        Self::new("3.0", statements)
    }

    /// Total number of statements, counting those inside nested scopes.
    pub fn num_statements(&self) -> usize {
        fn count(stmts: &[Statement]) -> usize {
            stmts
                .iter()
                .map(|s| 1 + s.blocks().into_iter().map(count).sum::<usize>())
                .sum()
        }
        count(&self.statements)
    }

    /// Filenames of the top-level include directives, in order.
    pub fn top_level_includes(&self) -> Vec<&str> {
        self.statements
            .iter()
            .filter_map(|s| match s {
                Statement::Include(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// A statement in a QASM program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Include statement: `include "stdgates.inc";`
    Include(String),

    /// Qubit declaration: `qubit[n] name;`, `qubit name;` or `qreg name[n];`
    QubitDecl { name: String, size: Option<u32> },

    /// Classical bit declaration: `bit[n] name;`, `bit name;` or `creg name[n];`
    BitDecl { name: String, size: Option<u32> },

    /// Gate application.
    Gate(GateCall),

    /// Measurement: `measure q -> c;` or `c = measure q;`
    Measure {
        qubits: Vec<QubitRef>,
        bits: Vec<BitRef>,
    },

    /// Reset: `reset q;`
    Reset { qubits: Vec<QubitRef> },

    /// Barrier: `barrier q;`
    Barrier { qubits: Vec<QubitRef> },

    /// Delay: `delay[duration] q;`
    Delay {
        duration: Expression,
        qubits: Vec<QubitRef>,
    },

    /// If statement.
    If {
        condition: Expression,
        then_body: Vec<Statement>,
        else_body: Option<Vec<Statement>>,
    },

    /// For loop.
    For {
        variable: String,
        range: Range,
        body: Vec<Statement>,
    },

    /// Gate definition.
    GateDef {
        name: String,
        params: Vec<String>,
        qubits: Vec<String>,
        body: Vec<Statement>,
    },

    /// Classical assignment.
    Assignment {
        target: String,
        index: Option<u32>,
        value: Expression,
    },

    /// A construct the tree does not model (`while`, `def`, `input`, typed
    /// classical declarations, ...), kept as its source text.
    ///
    /// Its contents are opaque: includes or gate calls inside it are not
    /// visited by passes.
    Other(String),
}

impl Statement {
    /// Create an include directive.
    pub fn include(filename: impl Into<String>) -> Self {
        Statement::Include(filename.into())
    }

    /// Create an opaque statement from its source text.
    pub fn other(text: impl Into<String>) -> Self {
        Statement::Other(text.into())
    }

    /// Create a parameterless gate call on single-qubit references.
    pub fn gate(name: impl Into<String>, qubits: Vec<QubitRef>) -> Self {
        Statement::Gate(GateCall {
            name: name.into(),
            params: vec![],
            qubits,
            modifiers: vec![],
        })
    }

    /// Short name of the statement kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Include(_) => "include",
            Statement::QubitDecl { .. } => "qubit declaration",
            Statement::BitDecl { .. } => "bit declaration",
            Statement::Gate(_) => "gate call",
            Statement::Measure { .. } => "measure",
            Statement::Reset { .. } => "reset",
            Statement::Barrier { .. } => "barrier",
            Statement::Delay { .. } => "delay",
            Statement::If { .. } => "if",
            Statement::For { .. } => "for",
            Statement::GateDef { .. } => "gate definition",
            Statement::Assignment { .. } => "assignment",
            Statement::Other(_) => "statement",
        }
    }

    /// Nested statement blocks owned by this statement, in source order.
    pub fn blocks(&self) -> Vec<&[Statement]> {
        match self {
            Statement::If {
                then_body,
                else_body,
                ..
            } => {
                let mut blocks = vec![then_body.as_slice()];
                if let Some(else_body) = else_body {
                    blocks.push(else_body.as_slice());
                }
                blocks
            }
            Statement::For { body, .. } | Statement::GateDef { body, .. } => vec![body.as_slice()],
            Statement::Include(_)
            | Statement::QubitDecl { .. }
            | Statement::BitDecl { .. }
            | Statement::Gate(_)
            | Statement::Measure { .. }
            | Statement::Reset { .. }
            | Statement::Barrier { .. }
            | Statement::Delay { .. }
            | Statement::Assignment { .. }
            | Statement::Other(_) => vec![],
        }
    }
}

/// A gate call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateCall {
    /// Gate name.
    pub name: String,
    /// Gate parameters (angles, etc.).
    pub params: Vec<Expression>,
    /// Qubits the gate acts on.
    pub qubits: Vec<QubitRef>,
    /// Modifiers applied to the gate, outermost first.
    pub modifiers: Vec<GateModifier>,
}

/// Gate modifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateModifier {
    /// Control modifier: `ctrl @ gate`
    Ctrl(Option<u32>),
    /// Negated control: `negctrl @ gate`
    NegCtrl(Option<u32>),
    /// Inverse: `inv @ gate`
    Inv,
    /// Power: `pow(n) @ gate`
    Pow(Expression),
}

impl GateModifier {
    /// Number of extra control qubits this modifier adds to the call.
    pub fn extra_qubits(&self) -> usize {
        match self {
            GateModifier::Ctrl(n) | GateModifier::NegCtrl(n) => n.unwrap_or(1) as usize,
            GateModifier::Inv | GateModifier::Pow(_) => 0,
        }
    }
}

/// Reference to a qubit or qubit register element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QubitRef {
    /// Single qubit: `q` (entire register) or `q[i]` (single element).
    Single {
        register: String,
        index: Option<u32>,
    },
    /// Range of qubits: `q[start:end]`.
    Range {
        register: String,
        start: u32,
        end: u32,
    },
}

impl QubitRef {
    /// Create a reference to a single qubit.
    pub fn single(register: impl Into<String>, index: u32) -> Self {
        QubitRef::Single {
            register: register.into(),
            index: Some(index),
        }
    }

    /// Create a reference to an entire register.
    pub fn register(register: impl Into<String>) -> Self {
        QubitRef::Single {
            register: register.into(),
            index: None,
        }
    }

    /// Get the register name.
    pub fn register_name(&self) -> &str {
        match self {
            QubitRef::Single { register, .. } | QubitRef::Range { register, .. } => register,
        }
    }
}

/// Reference to a classical bit or bit register element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitRef {
    /// Single bit: `c` or `c[i]`.
    Single {
        register: String,
        index: Option<u32>,
    },
    /// Range of bits: `c[start:end]`.
    Range {
        register: String,
        start: u32,
        end: u32,
    },
}

impl BitRef {
    /// Create a reference to a single bit.
    pub fn single(register: impl Into<String>, index: u32) -> Self {
        BitRef::Single {
            register: register.into(),
            index: Some(index),
        }
    }

    /// Create a reference to an entire register.
    pub fn register(register: impl Into<String>) -> Self {
        BitRef::Single {
            register: register.into(),
            index: None,
        }
    }

    /// Get the register name.
    pub fn register_name(&self) -> &str {
        match self {
            BitRef::Single { register, .. } | BitRef::Range { register, .. } => register,
        }
    }
}

/// A range for iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub start: Expression,
    pub end: Expression,
    pub step: Option<Expression>,
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// Boolean literal.
    Bool(bool),
    /// Identifier.
    Identifier(String),
    /// Pi constant.
    Pi,
    /// Tau constant (2π).
    Tau,
    /// Euler's number.
    Euler,
    /// Arithmetic negation.
    Neg(Box<Expression>),
    /// Logical negation.
    Not(Box<Expression>),
    /// Binary operation.
    BinOp {
        left: Box<Expression>,
        op: BinOp,
        right: Box<Expression>,
    },
    /// Function call.
    FnCall { name: String, args: Vec<Expression> },
    /// Index expression: `arr[i]`.
    Index {
        target: Box<Expression>,
        index: Box<Expression>,
    },
    /// Parenthesized expression.
    Paren(Box<Expression>),
}

impl Expression {
    /// Try to evaluate as a constant f64.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Expression::Int(v) => Some(*v as f64),
            Expression::Float(v) => Some(*v),
            Expression::Pi => Some(std::f64::consts::PI),
            Expression::Tau => Some(std::f64::consts::TAU),
            Expression::Euler => Some(std::f64::consts::E),
            Expression::Neg(e) => e.as_f64().map(|v| -v),
            Expression::BinOp { left, op, right } => {
                let l = left.as_f64()?;
                let r = right.as_f64()?;
                Some(match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * r,
                    BinOp::Div => l / r,
                    BinOp::Pow => l.powf(r),
                    BinOp::Mod => l % r,
                    _ => return None,
                })
            }
            Expression::Paren(e) => e.as_f64(),
            _ => None,
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
}

impl BinOp {
    /// Source spelling of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Lt => "<",
            BinOp::LtEq => "<=",
            BinOp::Gt => ">",
            BinOp::GtEq => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::LShift => "<<",
            BinOp::RShift => ">>",
        }
    }
}
