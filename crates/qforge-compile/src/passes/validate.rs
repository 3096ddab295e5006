//! Structural validation of program trees.

use rustc_hash::{FxHashMap, FxHashSet};

use qforge_qasm3::syntax::{BitRef, Program, QubitRef, Statement};

use crate::error::{CompileError, CompileResult};
use crate::location::{Block, Location};
use crate::pass::{Pass, PassKind};

/// Reject trees whose declarations or gate definitions are malformed.
///
/// Checks performed:
/// - names of registers, gates, gate arguments and include files are non-empty
/// - registers are declared at most once and never with size zero
/// - indices into declared registers are in bounds
/// - gate definitions appear only at top level, once per name, declare at
///   least one qubit argument without duplicates, and their bodies only
///   apply gates to those arguments
///
/// References to registers the program never declares are left alone.
pub struct ValidateStructure;

impl Pass for ValidateStructure {
    fn name(&self) -> &'static str {
        "ValidateStructure"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, program: Program) -> CompileResult<Program> {
        let mut checker = Checker::default();
        checker.check_block(&program.statements, Block::Top, &Location::root(), &Scope::Program)?;
        Ok(program)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegisterKind {
    Qubit,
    Bit,
}

/// Where a statement list sits.
enum Scope<'a> {
    Program,
    Nested,
    GateBody { qubits: &'a [String] },
}

/// Declarations seen so far in pre-order.
#[derive(Default)]
struct Checker {
    registers: FxHashMap<String, (RegisterKind, u32)>,
    gate_defs: FxHashSet<String>,
}

impl Checker {
    fn check_block(
        &mut self,
        statements: &[Statement],
        block: Block,
        parent: &Location,
        scope: &Scope<'_>,
    ) -> CompileResult<()> {
        for (index, stmt) in statements.iter().enumerate() {
            let location = parent.child(block, index);
            match scope {
                Scope::GateBody { qubits } => check_gate_body_statement(stmt, qubits, &location)?,
                Scope::Program | Scope::Nested => self.check_statement(stmt, scope, &location)?,
            }
        }
        Ok(())
    }

    fn check_statement(
        &mut self,
        stmt: &Statement,
        scope: &Scope<'_>,
        location: &Location,
    ) -> CompileResult<()> {
        match stmt {
            Statement::Include(filename) => require_name(filename, "include filename", location),
            Statement::QubitDecl { name, size } => {
                self.declare(name, RegisterKind::Qubit, *size, location)
            }
            Statement::BitDecl { name, size } => {
                self.declare(name, RegisterKind::Bit, *size, location)
            }
            Statement::Gate(call) => {
                require_name(&call.name, "gate name", location)?;
                self.check_qubits(&call.qubits, location)
            }
            Statement::Measure { qubits, bits } => {
                self.check_qubits(qubits, location)?;
                self.check_bits(bits, location)
            }
            Statement::Reset { qubits }
            | Statement::Barrier { qubits }
            | Statement::Delay { qubits, .. } => self.check_qubits(qubits, location),
            Statement::If {
                then_body,
                else_body,
                ..
            } => {
                self.check_block(then_body, Block::Then, location, &Scope::Nested)?;
                if let Some(else_body) = else_body {
                    self.check_block(else_body, Block::Else, location, &Scope::Nested)?;
                }
                Ok(())
            }
            Statement::For { variable, body, .. } => {
                require_name(variable, "loop variable", location)?;
                self.check_block(body, Block::Body, location, &Scope::Nested)
            }
            Statement::GateDef {
                name,
                params,
                qubits,
                body,
            } => {
                if !matches!(scope, Scope::Program) {
                    return Err(CompileError::validation(
                        location,
                        format!("gate definition '{name}' is only allowed at top level"),
                    ));
                }
                self.define_gate(name, params, qubits, location)?;
                self.check_block(body, Block::Body, location, &Scope::GateBody { qubits })
            }
            Statement::Assignment { target, .. } => {
                require_name(target, "assignment target", location)
            }
            Statement::Other(_) => Ok(()),
        }
    }

    fn declare(
        &mut self,
        name: &str,
        kind: RegisterKind,
        size: Option<u32>,
        location: &Location,
    ) -> CompileResult<()> {
        require_name(name, "register name", location)?;
        if size == Some(0) {
            return Err(CompileError::validation(
                location,
                format!("register '{name}' declared with size 0"),
            ));
        }
        if self.registers.contains_key(name) {
            return Err(CompileError::validation(
                location,
                format!("register '{name}' is already declared"),
            ));
        }
        self.registers
            .insert(name.to_string(), (kind, size.unwrap_or(1)));
        Ok(())
    }

    fn define_gate(
        &mut self,
        name: &str,
        params: &[String],
        qubits: &[String],
        location: &Location,
    ) -> CompileResult<()> {
        require_name(name, "gate name", location)?;
        if qubits.is_empty() {
            return Err(CompileError::validation(
                location,
                format!("gate definition '{name}' declares no qubit arguments"),
            ));
        }

        let mut arguments = FxHashSet::default();
        for argument in params.iter().chain(qubits) {
            require_name(argument, "gate argument", location)?;
            if !arguments.insert(argument.as_str()) {
                return Err(CompileError::validation(
                    location,
                    format!("gate definition '{name}' repeats argument '{argument}'"),
                ));
            }
        }

        if !self.gate_defs.insert(name.to_string()) {
            return Err(CompileError::validation(
                location,
                format!("gate '{name}' is already defined"),
            ));
        }
        Ok(())
    }

    fn check_qubits(&self, qubits: &[QubitRef], location: &Location) -> CompileResult<()> {
        for qubit in qubits {
            let (register, indices) = match qubit {
                QubitRef::Single { register, index } => (register, index.map(|i| (i, i))),
                QubitRef::Range {
                    register,
                    start,
                    end,
                } => (register, Some((*start, *end))),
            };
            self.check_reference(register, RegisterKind::Qubit, indices, location)?;
        }
        Ok(())
    }

    fn check_bits(&self, bits: &[BitRef], location: &Location) -> CompileResult<()> {
        for bit in bits {
            let (register, indices) = match bit {
                BitRef::Single { register, index } => (register, index.map(|i| (i, i))),
                BitRef::Range {
                    register,
                    start,
                    end,
                } => (register, Some((*start, *end))),
            };
            self.check_reference(register, RegisterKind::Bit, indices, location)?;
        }
        Ok(())
    }

    fn check_reference(
        &self,
        register: &str,
        expected: RegisterKind,
        indices: Option<(u32, u32)>,
        location: &Location,
    ) -> CompileResult<()> {
        require_name(register, "register name", location)?;
        let Some(&(kind, size)) = self.registers.get(register) else {
            return Ok(());
        };

        if kind != expected {
            let expected = match expected {
                RegisterKind::Qubit => "qubit",
                RegisterKind::Bit => "bit",
            };
            return Err(CompileError::validation(
                location,
                format!("'{register}' is not a {expected} register"),
            ));
        }

        if let Some((start, end)) = indices {
            if start > end {
                return Err(CompileError::validation(
                    location,
                    format!("empty range {register}[{start}:{end}]"),
                ));
            }
            if end >= size {
                return Err(CompileError::validation(
                    location,
                    format!("index {end} out of bounds for '{register}' of size {size}"),
                ));
            }
        }
        Ok(())
    }
}

fn check_gate_body_statement(
    stmt: &Statement,
    arguments: &[String],
    location: &Location,
) -> CompileResult<()> {
    let qubits = match stmt {
        Statement::Gate(call) => {
            require_name(&call.name, "gate name", location)?;
            &call.qubits
        }
        Statement::Barrier { qubits } => qubits,
        Statement::Include(filename) => return require_name(filename, "include filename", location),
        Statement::Other(_) => return Ok(()),
        other => {
            return Err(CompileError::validation(
                location,
                format!("{} is not allowed in a gate body", other.kind()),
            ));
        }
    };

    for qubit in qubits {
        match qubit {
            QubitRef::Single {
                register,
                index: None,
            } if arguments.contains(register) => {}
            QubitRef::Single {
                register,
                index: None,
            } => {
                return Err(CompileError::validation(
                    location,
                    format!("'{register}' is not an argument of the enclosing gate"),
                ));
            }
            QubitRef::Single { register, .. } | QubitRef::Range { register, .. } => {
                return Err(CompileError::validation(
                    location,
                    format!("gate argument '{register}' cannot be indexed"),
                ));
            }
        }
    }
    Ok(())
}

fn require_name(name: &str, what: &str, location: &Location) -> CompileResult<()> {
    if name.trim().is_empty() {
        return Err(CompileError::validation(location, format!("empty {what}")));
    }
    Ok(())
}
