//! Statement parsing.

use super::Parser;
use crate::ast::{BitRef, GateCall, GateModifier, QubitRef, Range, Statement};
use crate::error::{ParseError, ParseResult};
use crate::lexer::Token;

/// `OpenQASM` 3 keywords that open a statement the tree keeps as raw text.
const OPAQUE_KEYWORDS: &[&str] = &[
    "angle", "array", "bool", "box", "break", "cal", "case", "complex", "const", "continue",
    "def", "defcal", "defcalgrammar", "duration", "end", "extern", "float", "input", "int",
    "let", "output", "return", "stretch", "switch", "uint", "while",
];

impl Parser {
    /// Parse a statement.
    pub(super) fn parse_statement(&mut self) -> ParseResult<Statement> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| ParseError::UnexpectedEof("statement".into()))?;

        match token {
            Token::Include => self.parse_include(),
            Token::Qubit => self.parse_typed_decl(Token::Qubit),
            Token::Bit => self.parse_typed_decl(Token::Bit),
            Token::Qreg => self.parse_register_decl(Token::Qreg),
            Token::Creg => self.parse_register_decl(Token::Creg),
            Token::Measure => self.parse_measure(),
            Token::Reset => self.parse_reset(),
            Token::Barrier => self.parse_barrier(),
            Token::Delay => self.parse_delay(),
            Token::If => self.parse_if(),
            Token::For => self.parse_for(),
            Token::Gate => self.parse_gate_def(),
            Token::Ctrl | Token::NegCtrl | Token::Inv | Token::Pow => self.parse_modified_gate(),
            Token::Identifier(ref name) if OPAQUE_KEYWORDS.contains(&name.as_str()) => {
                self.parse_opaque()
            }
            Token::Identifier(_) => self.parse_identifier_statement(),
            _ => Err(self.unexpected("statement", &token)),
        }
    }

    /// Capture a statement the tree does not model, verbatim.
    ///
    /// The statement ends at the first `;` outside braces, or at the brace
    /// closing its outermost block (taking one directly following `;`).
    fn parse_opaque(&mut self) -> ParseResult<Statement> {
        let start = self.pos;
        let mut depth = 0usize;

        loop {
            let token = self
                .advance()
                .ok_or_else(|| ParseError::UnexpectedEof("end of statement".into()))?;
            match token {
                Token::LBrace => depth += 1,
                Token::RBrace if depth == 0 => {
                    self.pos -= 1;
                    return Err(self.unexpected("end of statement", &token));
                }
                Token::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.consume(&Token::Semicolon);
                        break;
                    }
                }
                Token::Semicolon if depth == 0 => break,
                _ => {}
            }
        }

        Ok(Statement::Other(self.source_text(start, self.pos)))
    }

    /// Parse include statement.
    fn parse_include(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Include)?;
        let path = match self.advance() {
            Some(Token::StringLiteral(s)) => s,
            Some(other) => {
                self.pos -= 1;
                return Err(self.unexpected("string literal", &other));
            }
            None => return Err(ParseError::UnexpectedEof("include path".into())),
        };
        self.expect(Token::Semicolon)?;
        Ok(Statement::Include(path))
    }

    /// Parse `qubit[n] name;` / `bit[n] name;`.
    fn parse_typed_decl(&mut self, keyword: Token) -> ParseResult<Statement> {
        let is_qubit = keyword == Token::Qubit;
        self.expect(keyword)?;

        let size = if self.consume(&Token::LBracket) {
            let size = self.parse_u32()?;
            self.expect(Token::RBracket)?;
            Some(size)
        } else {
            None
        };

        let name = self.parse_identifier()?;
        self.expect(Token::Semicolon)?;

        Ok(if is_qubit {
            Statement::QubitDecl { name, size }
        } else {
            Statement::BitDecl { name, size }
        })
    }

    /// Parse `qreg name[n];` / `creg name[n];`.
    fn parse_register_decl(&mut self, keyword: Token) -> ParseResult<Statement> {
        let is_qubit = keyword == Token::Qreg;
        self.expect(keyword)?;

        let name = self.parse_identifier()?;
        self.expect(Token::LBracket)?;
        let size = Some(self.parse_u32()?);
        self.expect(Token::RBracket)?;
        self.expect(Token::Semicolon)?;

        Ok(if is_qubit {
            Statement::QubitDecl { name, size }
        } else {
            Statement::BitDecl { name, size }
        })
    }

    /// Parse measure statement.
    fn parse_measure(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Measure)?;

        let qubits = self.parse_qubit_refs()?;

        // Check for arrow syntax: measure q -> c;
        let bits = if self.consume(&Token::Arrow) {
            self.parse_bit_refs()?
        } else {
            vec![]
        };

        self.expect(Token::Semicolon)?;

        Ok(Statement::Measure { qubits, bits })
    }

    /// Parse reset statement.
    fn parse_reset(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Reset)?;
        let qubits = self.parse_qubit_refs()?;
        self.expect(Token::Semicolon)?;
        Ok(Statement::Reset { qubits })
    }

    /// Parse barrier statement.
    fn parse_barrier(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Barrier)?;
        let qubits = if self.check(&Token::Semicolon) {
            vec![]
        } else {
            self.parse_qubit_refs()?
        };
        self.expect(Token::Semicolon)?;
        Ok(Statement::Barrier { qubits })
    }

    /// Parse `delay[duration] q;`.
    fn parse_delay(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Delay)?;
        self.expect(Token::LBracket)?;
        let duration = self.parse_expression()?;
        self.expect(Token::RBracket)?;
        let qubits = self.parse_qubit_refs()?;
        self.expect(Token::Semicolon)?;
        Ok(Statement::Delay { duration, qubits })
    }

    /// Parse if statement.
    fn parse_if(&mut self) -> ParseResult<Statement> {
        self.expect(Token::If)?;
        self.expect(Token::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(Token::RParen)?;

        let then_body = self.parse_block_or_statement()?;

        let else_body = if self.consume(&Token::Else) {
            Some(self.parse_block_or_statement()?)
        } else {
            None
        };

        Ok(Statement::If {
            condition,
            then_body,
            else_body,
        })
    }

    /// Parse for loop.
    fn parse_for(&mut self) -> ParseResult<Statement> {
        self.expect(Token::For)?;
        let variable = self.parse_identifier()?;
        self.expect(Token::In)?;
        self.expect(Token::LBracket)?;
        let start = self.parse_expression()?;
        self.expect(Token::Colon)?;
        let end = self.parse_expression()?;
        let step = if self.consume(&Token::Colon) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(Token::RBracket)?;

        let body = self.parse_block_or_statement()?;

        Ok(Statement::For {
            variable,
            range: Range { start, end, step },
            body,
        })
    }

    /// Parse gate definition.
    fn parse_gate_def(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Gate)?;
        let name = self.parse_identifier()?;

        let params = if self.consume(&Token::LParen) {
            let p = if self.check(&Token::RParen) {
                vec![]
            } else {
                self.parse_identifier_list()?
            };
            self.expect(Token::RParen)?;
            p
        } else {
            vec![]
        };

        let qubits = self.parse_identifier_list()?;
        let body = self.parse_block()?;

        Ok(Statement::GateDef {
            name,
            params,
            qubits,
            body,
        })
    }

    /// Parse a gate call preceded by one or more modifiers.
    fn parse_modified_gate(&mut self) -> ParseResult<Statement> {
        let mut modifiers = Vec::new();

        loop {
            let modifier = match self.peek() {
                Some(Token::Ctrl) => {
                    self.advance();
                    GateModifier::Ctrl(self.parse_modifier_count()?)
                }
                Some(Token::NegCtrl) => {
                    self.advance();
                    GateModifier::NegCtrl(self.parse_modifier_count()?)
                }
                Some(Token::Inv) => {
                    self.advance();
                    GateModifier::Inv
                }
                Some(Token::Pow) => {
                    self.advance();
                    self.expect(Token::LParen)?;
                    let exponent = self.parse_expression()?;
                    self.expect(Token::RParen)?;
                    GateModifier::Pow(exponent)
                }
                _ => break,
            };
            self.expect(Token::At)?;
            modifiers.push(modifier);
        }

        let name = self.parse_identifier()?;
        let mut call = self.parse_gate_call(name)?;
        call.modifiers = modifiers;
        Ok(Statement::Gate(call))
    }

    /// Parse the optional `(n)` after `ctrl` / `negctrl`.
    fn parse_modifier_count(&mut self) -> ParseResult<Option<u32>> {
        if self.consume(&Token::LParen) {
            let n = self.parse_u32()?;
            self.expect(Token::RParen)?;
            Ok(Some(n))
        } else {
            Ok(None)
        }
    }

    /// Parse statement starting with identifier (gate call or assignment).
    fn parse_identifier_statement(&mut self) -> ParseResult<Statement> {
        let name = self.parse_identifier()?;

        // `c = ...;` or `c[0] = ...;`. An indexed gate operand never follows
        // the gate name directly, so `[` here means an assignment target.
        if self.check(&Token::Eq) || self.check(&Token::LBracket) {
            return self.parse_assignment(name);
        }

        self.parse_gate_call(name).map(Statement::Gate)
    }

    /// Parse assignment statement.
    fn parse_assignment(&mut self, target: String) -> ParseResult<Statement> {
        let index = if self.consume(&Token::LBracket) {
            let idx = self.parse_u32()?;
            self.expect(Token::RBracket)?;
            Some(idx)
        } else {
            None
        };

        self.expect(Token::Eq)?;

        // `c = measure q;`
        if self.consume(&Token::Measure) {
            let qubits = self.parse_qubit_refs()?;
            self.expect(Token::Semicolon)?;

            let bits = if let Some(idx) = index {
                vec![BitRef::single(&target, idx)]
            } else {
                vec![BitRef::register(&target)]
            };

            return Ok(Statement::Measure { qubits, bits });
        }

        let value = self.parse_expression()?;
        self.expect(Token::Semicolon)?;

        Ok(Statement::Assignment {
            target,
            index,
            value,
        })
    }

    /// Parse gate call.
    fn parse_gate_call(&mut self, name: String) -> ParseResult<GateCall> {
        let params = if self.consume(&Token::LParen) {
            let p = self.parse_expression_list()?;
            self.expect(Token::RParen)?;
            p
        } else {
            vec![]
        };

        let qubits = self.parse_qubit_refs()?;
        self.expect(Token::Semicolon)?;

        Ok(GateCall {
            name,
            params,
            qubits,
            modifiers: vec![],
        })
    }

    /// Parse a braced block.
    fn parse_block(&mut self) -> ParseResult<Vec<Statement>> {
        self.expect(Token::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.is_eof() {
                return Err(ParseError::UnexpectedEof("'}'".into()));
            }
            stmts.push(self.parse_statement()?);
        }
        self.expect(Token::RBrace)?;
        Ok(stmts)
    }

    /// Parse a block or single statement.
    fn parse_block_or_statement(&mut self) -> ParseResult<Vec<Statement>> {
        if self.check(&Token::LBrace) {
            self.parse_block()
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    /// Parse qubit references.
    fn parse_qubit_refs(&mut self) -> ParseResult<Vec<QubitRef>> {
        let mut refs = vec![self.parse_qubit_ref()?];
        while self.consume(&Token::Comma) {
            refs.push(self.parse_qubit_ref()?);
        }
        Ok(refs)
    }

    /// Parse a single qubit reference: `q`, `q[i]` or `q[a:b]`.
    fn parse_qubit_ref(&mut self) -> ParseResult<QubitRef> {
        let register = self.parse_identifier()?;

        match self.parse_index_suffix()? {
            None => Ok(QubitRef::Single {
                register,
                index: None,
            }),
            Some((index, None)) => Ok(QubitRef::Single {
                register,
                index: Some(index),
            }),
            Some((start, Some(end))) => Ok(QubitRef::Range {
                register,
                start,
                end,
            }),
        }
    }

    /// Parse bit references.
    fn parse_bit_refs(&mut self) -> ParseResult<Vec<BitRef>> {
        let mut refs = vec![self.parse_bit_ref()?];
        while self.consume(&Token::Comma) {
            refs.push(self.parse_bit_ref()?);
        }
        Ok(refs)
    }

    /// Parse a single bit reference: `c`, `c[i]` or `c[a:b]`.
    fn parse_bit_ref(&mut self) -> ParseResult<BitRef> {
        let register = self.parse_identifier()?;

        match self.parse_index_suffix()? {
            None => Ok(BitRef::Single {
                register,
                index: None,
            }),
            Some((index, None)) => Ok(BitRef::Single {
                register,
                index: Some(index),
            }),
            Some((start, Some(end))) => Ok(BitRef::Range {
                register,
                start,
                end,
            }),
        }
    }

    /// Parse an optional `[i]` or `[a:b]` suffix.
    fn parse_index_suffix(&mut self) -> ParseResult<Option<(u32, Option<u32>)>> {
        if !self.consume(&Token::LBracket) {
            return Ok(None);
        }
        let start = self.parse_u32()?;
        let end = if self.consume(&Token::Colon) {
            Some(self.parse_u32()?)
        } else {
            None
        };
        self.expect(Token::RBracket)?;
        Ok(Some((start, end)))
    }
}
