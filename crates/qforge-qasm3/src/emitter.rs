//! Source emitter for syntax trees.

use crate::ast::{
    BinOp, BitRef, Expression, GateCall, GateModifier, Program, QubitRef, Range, Statement,
};
use crate::parser::op_precedence;

/// Output dialect of the emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QasmVersion {
    /// `OPENQASM 2.0`: `qreg`/`creg` declarations, `measure q -> c;`.
    V2,
    /// `OPENQASM 3.0`.
    V3,
}

impl QasmVersion {
    /// Header version string.
    pub fn header(self) -> &'static str {
        match self {
            QasmVersion::V2 => "2.0",
            QasmVersion::V3 => "3.0",
        }
    }
}

/// Emit a program as source code in the requested dialect.
///
/// The program's own version string is ignored; the header always matches
/// `version`.
pub fn emit_program(program: &Program, version: QasmVersion) -> String {
    let mut emitter = Emitter::new(version);
    emitter.emit(program);
    emitter.output
}

struct Emitter {
    version: QasmVersion,
    output: String,
    indent: usize,
}

impl Emitter {
    fn new(version: QasmVersion) -> Self {
        Self {
            version,
            output: String::new(),
            indent: 0,
        }
    }

    fn emit(&mut self, program: &Program) {
        self.writeln(&format!("OPENQASM {};", self.version.header()));
        for stmt in &program.statements {
            self.emit_statement(stmt);
        }
    }

    fn emit_block(&mut self, stmts: &[Statement]) {
        self.indent += 1;
        for stmt in stmts {
            self.emit_statement(stmt);
        }
        self.indent -= 1;
    }

    fn emit_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Include(path) => self.writeln(&format!("include \"{path}\";")),
            Statement::QubitDecl { name, size } => {
                let line = self.declaration("qubit", "qreg", name, *size);
                self.writeln(&line);
            }
            Statement::BitDecl { name, size } => {
                let line = self.declaration("bit", "creg", name, *size);
                self.writeln(&line);
            }
            Statement::Gate(call) => {
                let line = gate_call(call);
                self.writeln(&line);
            }
            Statement::Measure { qubits, bits } => {
                let line = self.measure(qubits, bits);
                self.writeln(&line);
            }
            Statement::Reset { qubits } => self.writeln(&format!("reset {};", qubit_list(qubits))),
            Statement::Barrier { qubits } => {
                if qubits.is_empty() {
                    self.writeln("barrier;");
                } else {
                    self.writeln(&format!("barrier {};", qubit_list(qubits)));
                }
            }
            Statement::Delay { duration, qubits } => self.writeln(&format!(
                "delay[{}] {};",
                expression(duration),
                qubit_list(qubits)
            )),
            Statement::If {
                condition,
                then_body,
                else_body,
            } => {
                self.writeln(&format!("if ({}) {{", expression(condition)));
                self.emit_block(then_body);
                match else_body {
                    Some(else_body) => {
                        self.writeln("} else {");
                        self.emit_block(else_body);
                        self.writeln("}");
                    }
                    None => self.writeln("}"),
                }
            }
            Statement::For {
                variable,
                range,
                body,
            } => {
                self.writeln(&format!("for {variable} in {} {{", range_expr(range)));
                self.emit_block(body);
                self.writeln("}");
            }
            Statement::GateDef {
                name,
                params,
                qubits,
                body,
            } => {
                let header = if params.is_empty() {
                    format!("gate {name} {} {{", qubits.join(", "))
                } else {
                    format!("gate {name}({}) {} {{", params.join(", "), qubits.join(", "))
                };
                self.writeln(&header);
                self.emit_block(body);
                self.writeln("}");
            }
            Statement::Assignment {
                target,
                index,
                value,
            } => {
                let target = match index {
                    Some(i) => format!("{target}[{i}]"),
                    None => target.clone(),
                };
                self.writeln(&format!("{target} = {};", expression(value)));
            }
            Statement::Other(text) => self.writeln(text),
        }
    }

    fn declaration(&self, v3_kw: &str, v2_kw: &str, name: &str, size: Option<u32>) -> String {
        match (self.version, size) {
            (QasmVersion::V2, Some(n)) => format!("{v2_kw} {name}[{n}];"),
            (QasmVersion::V2, None) => format!("{v2_kw} {name}[1];"),
            (QasmVersion::V3, Some(n)) => format!("{v3_kw}[{n}] {name};"),
            (QasmVersion::V3, None) => format!("{v3_kw} {name};"),
        }
    }

    fn measure(&self, qubits: &[QubitRef], bits: &[BitRef]) -> String {
        if bits.is_empty() {
            return format!("measure {};", qubit_list(qubits));
        }
        match self.version {
            QasmVersion::V2 => format!("measure {} -> {};", qubit_list(qubits), bit_list(bits)),
            QasmVersion::V3 => format!("{} = measure {};", bit_list(bits), qubit_list(qubits)),
        }
    }

    fn writeln(&mut self, line: &str) {
        let indent = "    ".repeat(self.indent);
        self.output.push_str(&indent);
        self.output.push_str(line);
        self.output.push('\n');
    }
}

fn gate_call(call: &GateCall) -> String {
    let mut out = String::new();
    for modifier in &call.modifiers {
        match modifier {
            GateModifier::Ctrl(None) => out.push_str("ctrl @ "),
            GateModifier::Ctrl(Some(n)) => out.push_str(&format!("ctrl({n}) @ ")),
            GateModifier::NegCtrl(None) => out.push_str("negctrl @ "),
            GateModifier::NegCtrl(Some(n)) => out.push_str(&format!("negctrl({n}) @ ")),
            GateModifier::Inv => out.push_str("inv @ "),
            GateModifier::Pow(e) => out.push_str(&format!("pow({}) @ ", expression(e))),
        }
    }
    out.push_str(&call.name);
    if !call.params.is_empty() {
        let params: Vec<String> = call.params.iter().map(expression).collect();
        out.push_str(&format!("({})", params.join(", ")));
    }
    out.push_str(&format!(" {};", qubit_list(&call.qubits)));
    out
}

fn qubit_list(qubits: &[QubitRef]) -> String {
    qubits
        .iter()
        .map(|q| match q {
            QubitRef::Single {
                register,
                index: Some(i),
            } => format!("{register}[{i}]"),
            QubitRef::Single {
                register,
                index: None,
            } => register.clone(),
            QubitRef::Range {
                register,
                start,
                end,
            } => format!("{register}[{start}:{end}]"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn bit_list(bits: &[BitRef]) -> String {
    bits.iter()
        .map(|b| match b {
            BitRef::Single {
                register,
                index: Some(i),
            } => format!("{register}[{i}]"),
            BitRef::Single {
                register,
                index: None,
            } => register.clone(),
            BitRef::Range {
                register,
                start,
                end,
            } => format!("{register}[{start}:{end}]"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn range_expr(range: &Range) -> String {
    match &range.step {
        Some(step) => format!(
            "[{}:{}:{}]",
            expression(&range.start),
            expression(&range.end),
            expression(step)
        ),
        None => format!("[{}:{}]", expression(&range.start), expression(&range.end)),
    }
}

/// Render an expression, parenthesizing binary operands only where the
/// parser would otherwise regroup them.
fn expression(expr: &Expression) -> String {
    match expr {
        Expression::Int(v) => v.to_string(),
        Expression::Float(v) => {
            let s = v.to_string();
            if s.contains('.') || s.contains('e') || s.contains("inf") || s.contains("NaN") {
                s
            } else {
                format!("{s}.0")
            }
        }
        Expression::Bool(b) => b.to_string(),
        Expression::Identifier(name) => name.clone(),
        Expression::Pi => "pi".into(),
        Expression::Tau => "tau".into(),
        Expression::Euler => "euler".into(),
        Expression::Neg(e) => format!("-{}", operand(e)),
        Expression::Not(e) => format!("!{}", operand(e)),
        Expression::BinOp { left, op, right } => {
            let prec = op_precedence(*op);
            let (left_min, right_min) = if *op == BinOp::Pow {
                (prec + 1, prec)
            } else {
                (prec, prec + 1)
            };
            let wrap = |e: &Expression, min: u8| match e {
                Expression::BinOp { op: inner, .. } if op_precedence(*inner) < min => {
                    format!("({})", expression(e))
                }
                _ => expression(e),
            };
            format!(
                "{} {} {}",
                wrap(left, left_min),
                op.symbol(),
                wrap(right, right_min)
            )
        }
        Expression::FnCall { name, args } => {
            let args: Vec<String> = args.iter().map(expression).collect();
            format!("{name}({})", args.join(", "))
        }
        Expression::Index { target, index } => {
            format!("{}[{}]", operand(target), expression(index))
        }
        Expression::Paren(e) => format!("({})", expression(e)),
    }
}

/// Render an operand of a unary or postfix operator.
fn operand(expr: &Expression) -> String {
    match expr {
        Expression::BinOp { .. } => format!("({})", expression(expr)),
        _ => expression(expr),
    }
}
