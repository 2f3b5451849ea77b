// error taxonomy shared by the parser, the circuit ir and the engine

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

// line/column inside a source file, both 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// what kind of symbol an undeclared reference was meant to name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Gate,
    QuantumRegister,
    ClassicalRegister,
    Parameter,
    Qubit,
    Dit,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolKind::Gate => "gate",
            SymbolKind::QuantumRegister => "quantum register",
            SymbolKind::ClassicalRegister => "classical register",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Qubit => "qubit",
            SymbolKind::Dit => "classical dit",
        };
        f.write_str(name)
    }
}

fn fmt_position(position: &Option<Position>) -> String {
    match position {
        Some(p) => format!(" at {}", p),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum QError {
    /// Malformed source text.
    #[error("parse error at {position}: {message}")]
    Parse { position: Position, message: String },

    /// Reference to a gate, register or index that was never declared.
    #[error("undeclared {kind} '{symbol}'{}", fmt_position(.position))]
    Undeclared {
        kind: SymbolKind,
        symbol: String,
        position: Option<Position>,
    },

    #[error("'{symbol}' is already defined")]
    Redefined { symbol: String },

    #[error("{what} index {index} out of range (limit {limit})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        limit: usize,
    },

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("invalid targets: {0}")]
    InvalidTargets(String),

    #[error("qubit {0} was destructively measured and no longer exists")]
    QubitMeasured(usize),

    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl QError {
    pub fn parse(position: Position, message: impl Into<String>) -> Self {
        QError::Parse {
            position,
            message: message.into(),
        }
    }

    pub fn undeclared(kind: SymbolKind, symbol: impl Into<String>, position: Option<Position>) -> Self {
        QError::Undeclared {
            kind,
            symbol: symbol.into(),
            position,
        }
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(self, QError::Parse { .. })
    }

    pub fn is_undeclared(&self) -> bool {
        matches!(self, QError::Undeclared { .. })
    }
}

pub type QResult<T> = Result<T, QError>;
