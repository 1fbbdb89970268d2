mod code;
mod position;
use once_cell::unsync::OnceCell;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
/// Line and column location of a byte offset in some source text.
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// A source buffer with lazily-computed line-break positions, used to render
/// error locations for both grammar source and interactive input lines.
pub struct Code<'c> {
    pub value: &'c [u8],
    line_breaks: OnceCell<Vec<usize>>,
}
