/*
	OPENQASM 2.0 FRONT END: LEXER, EXPRESSIONS AND RECURSIVE-DESCENT PARSER
*/

pub mod expr;
pub mod lexer;
mod parser;

use crate::circuit::QCircuit;
use crate::error::{QError, QResult};
use log::info;
use parser::{Context, Parser};
use std::fs;
use std::path::{Path, PathBuf};

/// Reads OpenQASM 2.0 programs into circuits.
///
/// Includes are looked up next to the including file, then relative to the
/// working directory, then in every include path. `qelib1.inc` falls back
/// to an embedded copy when no file is found.
#[derive(Debug, Clone, Default)]
pub struct QasmReader {
    include_paths: Vec<PathBuf>,
}

impl QasmReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_include_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.include_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn read_str(&self, source: &str) -> QResult<QCircuit> {
        let mut ctx = Context::new(self.include_paths.clone());
        Parser::new(source, &mut ctx, None)?.run(true)?;
        let circuit = ctx.into_circuit();
        info!(
            "parsed {} operations on {} qubits and {} classical dits",
            circuit.len(),
            circuit.nq(),
            circuit.nc()
        );
        Ok(circuit)
    }

    pub fn read_file<P: AsRef<Path>>(&self, path: P) -> QResult<QCircuit> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| QError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut ctx = Context::new(self.include_paths.clone());
        ctx.enter_file(path.canonicalize().unwrap_or_else(|_| path.to_path_buf()));
        let dir = path.parent().map(Path::to_path_buf);
        Parser::new(&source, &mut ctx, dir)?.run(true)?;
        let mut circuit = ctx.into_circuit();
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            circuit = circuit.with_name(stem);
        }
        info!(
            "parsed {}: {} operations on {} qubits and {} classical dits",
            path.display(),
            circuit.len(),
            circuit.nq(),
            circuit.nc()
        );
        Ok(circuit)
    }
}

/// Parses OpenQASM 2.0 source text.
pub fn read_from_str(source: &str) -> QResult<QCircuit> {
    QasmReader::new().read_str(source)
}

/// Parses an OpenQASM 2.0 file. Relative includes resolve against its directory.
pub fn read_from_file<P: AsRef<Path>>(path: P) -> QResult<QCircuit> {
    QasmReader::new().read_file(path)
}

/// The standard gate library, `qelib1.inc`.
pub const QELIB1: &str = r#"// Quantum Experience (QE) Standard Header
// file: qelib1.inc

// --- QE Hardware primitives ---

// 3-parameter 2-pulse single qubit gate
gate u3(theta,phi,lambda) q { U(theta,phi,lambda) q; }
// 2-parameter 1-pulse single qubit gate
gate u2(phi,lambda) q { U(pi/2,phi,lambda) q; }
// 1-parameter 0-pulse single qubit gate
gate u1(lambda) q { U(0,0,lambda) q; }
// controlled-NOT
gate cx c,t { CX c,t; }
// idle gate (identity)
gate id a { U(0,0,0) a; }
// idle gate (identity) with length gamma*sqglen
gate u0(gamma) q { U(0,0,0) q; }

// --- QE Standard Gates ---

// Pauli gate: bit-flip
gate x a { u3(pi,0,pi) a; }
// Pauli gate: bit and phase flip
gate y a { u3(pi,pi/2,pi/2) a; }
// Pauli gate: phase flip
gate z a { u1(pi) a; }
// Clifford gate: Hadamard
gate h a { u2(0,pi) a; }
// Clifford gate: sqrt(Z) phase gate
gate s a { u1(pi/2) a; }
// Clifford gate: conjugate of sqrt(Z)
gate sdg a { u1(-pi/2) a; }
// C3 gate: sqrt(S) phase gate
gate t a { u1(pi/4) a; }
// C3 gate: conjugate of sqrt(S)
gate tdg a { u1(-pi/4) a; }

// --- Standard rotations ---
// Rotation around X-axis
gate rx(theta) a { u3(theta,-pi/2,pi/2) a; }
// rotation around Y-axis
gate ry(theta) a { u3(theta,0,0) a; }
// rotation around Z axis
gate rz(phi) a { u1(phi) a; }

// --- QE Standard User-Defined Gates  ---

// controlled-Phase
gate cz a,b { h b; cx a,b; h b; }
// controlled-Y
gate cy a,b { sdg b; cx a,b; s b; }
// swap
gate swap a,b { cx a,b; cx b,a; cx a,b; }
// controlled-H
gate ch a,b {
h b; sdg b;
cx a,b;
h b; t b;
cx a,b;
t b; h b; s b; x b; s a;
}
// C3 gate: Toffoli
gate ccx a,b,c
{
  h c;
  cx b,c; tdg c;
  cx a,c; t c;
  cx b,c; tdg c;
  cx a,c; t b; t c; h c;
  cx a,b; t a; tdg b;
  cx a,b;
}
// cswap (Fredkin)
gate cswap a,b,c
{
  cx c,b;
  ccx a,b,c;
  cx c,b;
}
// controlled rx rotation
gate crx(lambda) a,b
{
  u1(pi/2) b;
  cx a,b;
  u3(-lambda/2,0,0) b;
  cx a,b;
  u3(lambda/2,-pi/2,0) b;
}
// controlled ry rotation
gate cry(lambda) a,b
{
  ry(lambda/2) b;
  cx a,b;
  ry(-lambda/2) b;
  cx a,b;
}
// controlled rz rotation
gate crz(lambda) a,b
{
  rz(lambda/2) b;
  cx a,b;
  rz(-lambda/2) b;
  cx a,b;
}
// controlled phase rotation
gate cu1(lambda) a,b
{
  u1(lambda/2) a;
  cx a,b;
  u1(-lambda/2) b;
  cx a,b;
  u1(lambda/2) b;
}
// controlled-U
gate cu3(theta,phi,lambda) c, t
{
  // implements controlled-U(theta,phi,lambda) with  target t and control c
  u1((lambda+phi)/2) c;
  u1((lambda-phi)/2) t;
  cx c,t;
  u3(-theta/2,0,-(phi+lambda)/2) t;
  cx c,t;
  u3(theta/2,phi,0) t;
}
// two-qubit XX rotation
gate rxx(theta) a,b
{
  u3(pi/2, theta, 0) a;
  h b;
  cx a,b;
  u1(-theta) b;
  cx a,b;
  h b;
  u2(-pi, pi-theta) a;
}
// two-qubit ZZ rotation
gate rzz(theta) a,b
{
  cx a,b;
  u1(theta) b;
  cx a,b;
}
"#;
