pub mod circuit; // circuit ir
pub mod config; // simulation settings
pub mod error; // error type
pub mod gates; // gate matrices
pub mod linalg; // dense linear algebra
pub mod qasm; // openqasm 2.0 front end
pub mod random; // seedable sampling
pub mod runtime; // engine and state vector
pub mod tensor; // multi-index arithmetic and dimension checks

#[cfg(test)]
mod test;

pub use circuit::QCircuit;
pub use error::{QError, QResult};
pub use qasm::{read_from_file, read_from_str, QasmReader};
pub use runtime::QEngine;
