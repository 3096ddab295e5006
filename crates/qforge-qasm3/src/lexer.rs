//! Lexer for `OpenQASM` 2 and 3.

use logos::Logos;

/// Tokens for `OpenQASM`.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/")]
pub enum Token {
    // Keywords
    #[token("OPENQASM")]
    OpenQasm,

    #[token("include")]
    Include,

    #[token("qubit")]
    Qubit,

    #[token("bit")]
    Bit,

    #[token("qreg")]
    Qreg,

    #[token("creg")]
    Creg,

    #[token("gate")]
    Gate,

    #[token("if")]
    If,

    #[token("else")]
    Else,

    #[token("for")]
    For,

    #[token("in")]
    In,

    #[token("measure")]
    Measure,

    #[token("reset")]
    Reset,

    #[token("barrier")]
    Barrier,

    #[token("delay")]
    Delay,

    // Gate modifiers
    #[token("ctrl")]
    Ctrl,

    #[token("negctrl")]
    NegCtrl,

    #[token("inv")]
    Inv,

    #[token("pow")]
    Pow,

    // Constants
    #[token("pi")]
    Pi,

    #[token("tau")]
    Tau,

    #[token("euler")]
    Euler,

    #[token("true")]
    True,

    #[token("false")]
    False,

    // Literals
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    FloatLiteral(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u64>().ok())]
    IntLiteral(u64),

    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        Some(s[1..s.len()-1].to_string())
    })]
    StringLiteral(String),

    // Identifiers
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Operators and punctuation
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("**")]
    Power,

    #[token("==")]
    EqEq,

    #[token("!=")]
    NotEq,

    #[token("<")]
    Lt,

    #[token("<=")]
    LtEq,

    #[token(">")]
    Gt,

    #[token(">=")]
    GtEq,

    #[token("&&")]
    And,

    #[token("||")]
    Or,

    #[token("!")]
    Not,

    #[token("&")]
    Ampersand,

    #[token("|")]
    Pipe,

    #[token("^")]
    Caret,

    #[token("<<")]
    LShift,

    #[token(">>")]
    RShift,

    #[token("=")]
    Eq,

    #[token("->")]
    Arrow,

    #[token("@")]
    At,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(";")]
    Semicolon,

    #[token(":")]
    Colon,

    #[token(",")]
    Comma,
}

impl Token {
    /// Fixed source spelling, for tokens that have one.
    fn lexeme(&self) -> Option<&'static str> {
        Some(match self {
            Token::OpenQasm => "OPENQASM",
            Token::Include => "include",
            Token::Qubit => "qubit",
            Token::Bit => "bit",
            Token::Qreg => "qreg",
            Token::Creg => "creg",
            Token::Gate => "gate",
            Token::If => "if",
            Token::Else => "else",
            Token::For => "for",
            Token::In => "in",
            Token::Measure => "measure",
            Token::Reset => "reset",
            Token::Barrier => "barrier",
            Token::Delay => "delay",
            Token::Ctrl => "ctrl",
            Token::NegCtrl => "negctrl",
            Token::Inv => "inv",
            Token::Pow => "pow",
            Token::Pi => "pi",
            Token::Tau => "tau",
            Token::Euler => "euler",
            Token::True => "true",
            Token::False => "false",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Power => "**",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::LtEq => "<=",
            Token::Gt => ">",
            Token::GtEq => ">=",
            Token::And => "&&",
            Token::Or => "||",
            Token::Not => "!",
            Token::Ampersand => "&",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::LShift => "<<",
            Token::RShift => ">>",
            Token::Eq => "=",
            Token::Arrow => "->",
            Token::At => "@",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Semicolon => ";",
            Token::Colon => ":",
            Token::Comma => ",",
            Token::FloatLiteral(_)
            | Token::IntLiteral(_)
            | Token::StringLiteral(_)
            | Token::Identifier(_) => return None,
        })
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(lexeme) = self.lexeme() {
            return f.write_str(lexeme);
        }
        match self {
            Token::FloatLiteral(v) => write!(f, "{v}"),
            Token::IntLiteral(v) => write!(f, "{v}"),
            Token::StringLiteral(s) => write!(f, "\"{s}\""),
            Token::Identifier(s) => f.write_str(s),
            _ => Ok(()),
        }
    }
}

/// A token with the 1-based source line it starts on and its byte range.
#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub line: usize,
    pub span: std::ops::Range<usize>,
}

/// A lexing failure: the line and a description of the offending text.
pub type LexError = (usize, String);

/// Tokenize a QASM source string.
pub fn tokenize(source: &str) -> Vec<Result<SpannedToken, LexError>> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut scanned = 0;

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        line += source[scanned..span.start].matches('\n').count();
        scanned = span.start;

        match result {
            Ok(token) => tokens.push(Ok(SpannedToken { token, line, span })),
            Err(()) => {
                let slice = &source[span];
                tokens.push(Err((line, format!("Invalid token: '{slice}'"))));
            }
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<SpannedToken> {
        tokenize(source).into_iter().filter_map(Result::ok).collect()
    }

    #[test]
    fn test_basic_tokens() {
        let tokens = lex("OPENQASM 3.0;");

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].token, Token::OpenQasm);
        assert!(matches!(tokens[1].token, Token::FloatLiteral(v) if (v - 3.0).abs() < 0.001));
        assert_eq!(tokens[2].token, Token::Semicolon);
    }

    #[test]
    fn test_include() {
        let tokens = lex(r#"include "stdgates.inc";"#);

        assert_eq!(tokens[0].token, Token::Include);
        assert_eq!(
            tokens[1].token,
            Token::StringLiteral("stdgates.inc".to_string())
        );
        assert_eq!(tokens[2].token, Token::Semicolon);
    }

    #[test]
    fn test_line_numbers() {
        let source = "OPENQASM 3.0;\n\nqubit q;\n// comment\nx q;";
        let tokens = lex(source);

        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[3].line, 3);
        assert!(matches!(tokens[6].token, Token::Identifier(ref s) if s == "x"));
        assert_eq!(tokens[6].line, 5);
    }

    #[test]
    fn test_modifiers_are_keywords() {
        let tokens = lex("ctrl @ inv @ x q;");

        assert_eq!(tokens[0].token, Token::Ctrl);
        assert_eq!(tokens[1].token, Token::At);
        assert_eq!(tokens[2].token, Token::Inv);
    }

    #[test]
    fn test_comments() {
        let source = r"
            // This is a comment
            qubit q;
            /* Multi-line
               comment */
            bit c;
        ";

        // Should only have: qubit, q, ;, bit, c, ;
        assert_eq!(lex(source).len(), 6);
    }

    #[test]
    fn test_invalid_token_reports_line() {
        let results = tokenize("qubit q;\n$");
        let err = results.into_iter().find_map(Result::err).unwrap();
        assert_eq!(err.0, 2);
        assert!(err.1.contains('$'));
    }

    #[test]
    fn test_display_round_trips_lexeme() {
        assert_eq!(Token::Arrow.to_string(), "->");
        assert_eq!(Token::Identifier("cx".into()).to_string(), "cx");
        assert_eq!(Token::StringLiteral("a.inc".into()).to_string(), "\"a.inc\"");
    }
}
