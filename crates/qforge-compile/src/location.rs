//! Statement locations inside a program tree.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which statement list a path segment indexes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Block {
    /// The program's top-level statements.
    Top,
    /// The `then` branch of an `if`.
    Then,
    /// The `else` branch of an `if`.
    Else,
    /// The body of a `for` loop or gate definition.
    Body,
}

impl Block {
    fn label(self) -> &'static str {
        match self {
            Block::Top => "statements",
            Block::Then => "then",
            Block::Else => "else",
            Block::Body => "body",
        }
    }
}

/// Path from the program root to one statement, e.g. `statements[3].then[0]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    segments: Vec<(Block, usize)>,
}

impl Location {
    /// The program root (no statement selected).
    pub fn root() -> Self {
        Self::default()
    }

    /// Location of the `index`-th statement of `block` below this one.
    #[must_use]
    pub fn child(&self, block: Block, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push((block, index));
        Self { segments }
    }

    /// Nesting depth; top-level statements have depth 1.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<program>");
        }
        for (i, (block, index)) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}[{index}]", block.label())?;
        }
        Ok(())
    }
}
