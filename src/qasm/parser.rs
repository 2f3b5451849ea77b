use super::expr::{BinOp, Env, Expr, Func};
use super::lexer::{tokenize, Token, TokenKind};
use super::QELIB1;
use crate::circuit::{Condition, QCircuit, QUBIT_DIM};
use crate::error::{Position, QError, QResult, SymbolKind};
use crate::gates;
use crate::linalg::{self, CMat};
use itertools::Itertools;
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::mem::discriminant;
use std::path::{Path, PathBuf};

const STDLIB_NAME: &str = "qelib1.inc";

#[derive(Debug, Clone, Copy)]
struct Register {
    offset: usize,
    size: usize,
}

impl Register {
    fn indices(&self) -> Vec<usize> {
        (self.offset..self.offset + self.size).collect()
    }
}

// one statement of a gate body, qubit arguments already mapped to the
// positions of the formal arguments
#[derive(Debug, Clone)]
struct BodyOp {
    name: String,
    args: Vec<Expr>,
    qargs: Vec<usize>,
    pos: Position,
}

#[derive(Debug, Clone)]
struct GateDecl {
    params: Vec<String>,
    arity: usize,
    // None for opaque gates
    body: Option<Vec<BodyOp>>,
    // standard library gate with a built-in matrix
    mapped: bool,
}

enum Arg {
    Whole(String, Position),
    Element(String, usize, Position),
}

/// Symbol tables and the circuit under construction, shared by the parser
/// of the top-level source and the parsers of included files.
pub(crate) struct Context {
    circuit: QCircuit,
    qregs: HashMap<String, Register>,
    cregs: HashMap<String, Register>,
    gates: HashMap<String, GateDecl>,
    include_paths: Vec<PathBuf>,
    include_stack: Vec<PathBuf>,
}

impl Context {
    pub(crate) fn new(include_paths: Vec<PathBuf>) -> Self {
        Context {
            circuit: QCircuit::new(0, 0),
            qregs: HashMap::new(),
            cregs: HashMap::new(),
            gates: HashMap::new(),
            include_paths,
            include_stack: Vec::new(),
        }
    }

    pub(crate) fn enter_file(&mut self, path: PathBuf) {
        self.include_stack.push(path);
    }

    pub(crate) fn into_circuit(self) -> QCircuit {
        self.circuit
    }

    // (number of parameters, number of qubits)
    fn signature(&self, name: &str) -> Option<(usize, usize)> {
        match name {
            "U" => Some((3, 1)),
            "CX" => Some((0, 2)),
            _ => self.gates.get(name).map(|g| (g.params.len(), g.arity)),
        }
    }

    /// Unitary of `name` applied with the parameter values `args`. Gate
    /// bodies are composed from the matrices of their statements.
    fn gate_matrix(&self, name: &str, args: &[f64], pos: Position) -> QResult<CMat> {
        match (name, args) {
            ("U", [theta, phi, lambda]) => return Ok(gates::u(*theta, *phi, *lambda)),
            ("CX", []) => return Ok(gates::cnot()),
            _ => {}
        }
        let decl = self
            .gates
            .get(name)
            .ok_or_else(|| QError::undeclared(SymbolKind::Gate, name, Some(pos)))?;
        if decl.mapped {
            if let Some(m) = gates::mapped(name, args) {
                return Ok(m);
            }
        }
        let body = decl
            .body
            .as_ref()
            .ok_or_else(|| QError::parse(pos, format!("opaque gate '{}' has no definition", name)))?;
        let env: Env = decl.params.iter().cloned().zip(args.iter().copied()).collect();
        let dims = vec![QUBIT_DIM; decl.arity];
        let mut total = linalg::identity(QUBIT_DIM.pow(decl.arity as u32));
        for op in body {
            let op_args = op
                .args
                .iter()
                .map(|e| e.eval(&env))
                .collect::<QResult<Vec<f64>>>()?;
            let m = self.gate_matrix(&op.name, &op_args, op.pos)?;
            total = linalg::apply_left(&m, &op.qargs, &dims, &total)?;
        }
        Ok(total)
    }

    // finds the text of an included file: next to the including file, then
    // on the search path, then the embedded standard library
    fn load_include(&self, name: &str, dir: Option<&Path>, pos: Position) -> QResult<(String, Option<PathBuf>)> {
        let candidates = dir
            .map(|d| d.join(name))
            .into_iter()
            .chain(std::iter::once(PathBuf::from(name)))
            .chain(self.include_paths.iter().map(|p| p.join(name)));
        for candidate in candidates {
            if candidate.is_file() {
                let text = fs::read_to_string(&candidate).map_err(|source| QError::Io {
                    path: candidate.clone(),
                    source,
                })?;
                let canonical = candidate.canonicalize().unwrap_or(candidate);
                return Ok((text, Some(canonical)));
            }
        }
        if is_stdlib(name) {
            return Ok((QELIB1.to_string(), None));
        }
        debug!("include '{}' not found (line {})", name, pos.line);
        Err(QError::Io {
            path: PathBuf::from(name),
            source: io::Error::new(io::ErrorKind::NotFound, "no such include file"),
        })
    }
}

fn is_stdlib(name: &str) -> bool {
    Path::new(name).file_name().and_then(|f| f.to_str()) == Some(STDLIB_NAME)
}

fn gate_label(name: &str, args: &[f64]) -> String {
    if args.is_empty() {
        name.to_string()
    } else {
        format!("{}({})", name, args.iter().join(","))
    }
}

/// Recursive-descent parser over one source file.
pub(crate) struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    ctx: &'a mut Context,
    // directory of the file being parsed, for relative includes
    dir: Option<PathBuf>,
    stdlib: bool,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(source: &str, ctx: &'a mut Context, dir: Option<PathBuf>) -> QResult<Self> {
        Ok(Parser {
            tokens: tokenize(source)?,
            pos: 0,
            ctx,
            dir,
            stdlib: false,
        })
    }

    /// Parses every statement. Top-level sources must open with the
    /// `OPENQASM 2.0;` header, included files may omit it.
    pub(crate) fn run(&mut self, header_required: bool) -> QResult<()> {
        if self.check(&TokenKind::OpenQasm) {
            self.parse_header()?;
        } else if header_required {
            let tok = self.peek().clone();
            return Err(unexpected(&tok, "'OPENQASM 2.0;' header"));
        }
        while !self.check(&TokenKind::Eof) {
            self.parse_statement()?;
        }
        Ok(())
    }

    // ---- token helpers ----

    fn peek(&self) -> &Token {
        // the token list always ends with Eof and pos never moves past it
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        discriminant(&self.peek().kind) == discriminant(kind)
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> QResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(unexpected(self.peek(), what))
        }
    }

    fn ident(&mut self) -> QResult<(String, Position)> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Ident(name) => Ok((name, tok.pos)),
            _ => Err(unexpected(&tok, "identifier")),
        }
    }

    fn int(&mut self) -> QResult<(usize, Position)> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Int(v) => Ok((v, tok.pos)),
            _ => Err(unexpected(&tok, "integer")),
        }
    }

    fn ident_list(&mut self) -> QResult<Vec<(String, Position)>> {
        let mut list = vec![self.ident()?];
        while self.consume(&TokenKind::Comma) {
            list.push(self.ident()?);
        }
        Ok(list)
    }

    // ---- statements ----

    fn parse_header(&mut self) -> QResult<()> {
        self.advance();
        let tok = self.advance();
        let version = match tok.kind {
            TokenKind::Real(v) => v,
            TokenKind::Int(v) => v as f64,
            _ => return Err(unexpected(&tok, "version number")),
        };
        if version.trunc() != 2.0 {
            return Err(QError::parse(tok.pos, format!("unsupported OPENQASM version {}", version)));
        }
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(())
    }

    fn parse_statement(&mut self) -> QResult<()> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::OpenQasm => Err(QError::parse(
                tok.pos,
                "the OPENQASM header must be the first statement",
            )),
            TokenKind::Include => self.parse_include(),
            TokenKind::QReg => self.parse_register(true),
            TokenKind::CReg => self.parse_register(false),
            TokenKind::Gate => self.parse_gate_def(),
            TokenKind::Opaque => self.parse_opaque(),
            TokenKind::Measure => self.parse_measure(),
            TokenKind::Reset => self.parse_reset(),
            TokenKind::Barrier => self.parse_barrier(),
            TokenKind::If => self.parse_if(),
            TokenKind::U | TokenKind::CX | TokenKind::Ident(_) => self.parse_application(None),
            _ => Err(unexpected(&tok, "statement")),
        }
    }

    fn parse_include(&mut self) -> QResult<()> {
        self.advance();
        let tok = self.advance();
        let name = match tok.kind {
            TokenKind::Str(s) => s,
            _ => return Err(unexpected(&tok, "file name string")),
        };
        self.expect(TokenKind::Semicolon, "';'")?;

        let (source, path) = self.ctx.load_include(&name, self.dir.as_deref(), tok.pos)?;
        if let Some(p) = &path {
            if self.ctx.include_stack.contains(p) {
                return Err(QError::parse(tok.pos, format!("recursive include of '{}'", name)));
            }
            self.ctx.include_stack.push(p.clone());
        }
        debug!("including '{}' from {:?}", name, path);

        let dir = path.as_deref().and_then(Path::parent).map(Path::to_path_buf);
        let mut child = Parser::new(&source, &mut *self.ctx, dir)?;
        child.stdlib = is_stdlib(&name);
        child.run(false)?;

        if path.is_some() {
            self.ctx.include_stack.pop();
        }
        Ok(())
    }

    fn parse_register(&mut self, quantum: bool) -> QResult<()> {
        self.advance();
        let (name, pos) = self.ident()?;
        self.expect(TokenKind::LBracket, "'['")?;
        let (size, size_pos) = self.int()?;
        self.expect(TokenKind::RBracket, "']'")?;
        self.expect(TokenKind::Semicolon, "';'")?;

        if size == 0 {
            return Err(QError::parse(size_pos, "register size must be positive"));
        }
        if self.ctx.qregs.contains_key(&name) || self.ctx.cregs.contains_key(&name) {
            return Err(QError::parse(pos, format!("register '{}' is already declared", name)));
        }
        if quantum {
            let reg = Register {
                offset: self.ctx.circuit.nq(),
                size,
            };
            self.ctx.circuit.add_qubits(size);
            self.ctx.qregs.insert(name, reg);
        } else {
            let reg = Register {
                offset: self.ctx.circuit.nc(),
                size,
            };
            self.ctx.circuit.add_classical_registers(size);
            self.ctx.cregs.insert(name, reg);
        }
        Ok(())
    }

    // `name(p1, p2) a, b` of a gate or opaque declaration
    fn parse_gate_signature(&mut self) -> QResult<(String, Vec<String>, Vec<String>)> {
        self.advance();
        let (name, pos) = self.ident()?;
        if self.ctx.signature(&name).is_some() {
            return Err(QError::parse(pos, format!("gate '{}' is already declared", name)));
        }
        let mut params = Vec::new();
        if self.consume(&TokenKind::LParen) {
            if !self.check(&TokenKind::RParen) {
                params = self.ident_list()?;
            }
            self.expect(TokenKind::RParen, "')'")?;
        }
        let qargs = self.ident_list()?;
        if let Some((n, p)) = params.iter().chain(qargs.iter()).duplicates_by(|(n, _)| n.clone()).next() {
            return Err(QError::parse(*p, format!("duplicate argument '{}' in gate '{}'", n, name)));
        }
        debug!("gate '{}' declared at {}", name, pos);
        Ok((
            name,
            params.into_iter().map(|(n, _)| n).collect(),
            qargs.into_iter().map(|(n, _)| n).collect(),
        ))
    }

    fn parse_gate_def(&mut self) -> QResult<()> {
        let (name, params, qargs) = self.parse_gate_signature()?;
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut body = Vec::new();
        while !self.consume(&TokenKind::RBrace) {
            if let Some(op) = self.parse_body_statement(&params, &qargs)? {
                body.push(op);
            }
        }
        let mapped = self.stdlib && gates::mapped(&name, &vec![0.0; params.len()]).is_some();
        debug!(
            "gate {}({}) on {} qubits, {} body statements{}",
            name,
            params.join(","),
            qargs.len(),
            body.len(),
            if mapped { ", mapped to built-in" } else { "" }
        );
        self.ctx.gates.insert(
            name,
            GateDecl {
                params,
                arity: qargs.len(),
                body: Some(body),
                mapped,
            },
        );
        Ok(())
    }

    fn parse_opaque(&mut self) -> QResult<()> {
        let (name, params, qargs) = self.parse_gate_signature()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        self.ctx.gates.insert(
            name,
            GateDecl {
                params,
                arity: qargs.len(),
                body: None,
                mapped: false,
            },
        );
        Ok(())
    }

    // one statement of a gate body, None for barriers
    fn parse_body_statement(&mut self, params: &[String], formals: &[String]) -> QResult<Option<BodyOp>> {
        let tok = self.advance();
        let name = match &tok.kind {
            TokenKind::Barrier => {
                for (q, p) in self.ident_list()? {
                    if !formals.contains(&q) {
                        return Err(QError::undeclared(SymbolKind::Qubit, q, Some(p)));
                    }
                }
                self.expect(TokenKind::Semicolon, "';'")?;
                return Ok(None);
            }
            TokenKind::U => "U".to_string(),
            TokenKind::CX => "CX".to_string(),
            TokenKind::Ident(n) => n.clone(),
            TokenKind::Eof => return Err(unexpected(&tok, "'}'")),
            _ => return Err(unexpected(&tok, "gate statement")),
        };
        let (nparams, arity) = self
            .ctx
            .signature(&name)
            .ok_or_else(|| QError::undeclared(SymbolKind::Gate, name.clone(), Some(tok.pos)))?;

        let args = self.parse_call_args()?;
        let qargs = self.ident_list()?;
        self.expect(TokenKind::Semicolon, "';'")?;

        if args.len() != nparams {
            return Err(QError::parse(
                tok.pos,
                format!("gate '{}' takes {} parameters, got {}", name, nparams, args.len()),
            ));
        }
        if qargs.len() != arity {
            return Err(QError::parse(
                tok.pos,
                format!("gate '{}' acts on {} qubits, got {}", name, arity, qargs.len()),
            ));
        }
        if let Some((p, ppos)) = args.iter().find_map(|e| e.unbound(params)) {
            return Err(QError::undeclared(SymbolKind::Parameter, p, Some(ppos)));
        }
        let mut indices = Vec::with_capacity(qargs.len());
        for (q, qpos) in &qargs {
            let idx = formals
                .iter()
                .position(|f| f == q)
                .ok_or_else(|| QError::undeclared(SymbolKind::Qubit, q.clone(), Some(*qpos)))?;
            indices.push(idx);
        }
        if !indices.iter().all_unique() {
            return Err(QError::parse(tok.pos, format!("repeated qubit argument to '{}'", name)));
        }
        Ok(Some(BodyOp {
            name,
            args,
            qargs: indices,
            pos: tok.pos,
        }))
    }

    // optional `(e1, e2, ..)` after a gate name
    fn parse_call_args(&mut self) -> QResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.consume(&TokenKind::LParen) {
            if !self.check(&TokenKind::RParen) {
                args.push(self.parse_expr()?);
                while self.consume(&TokenKind::Comma) {
                    args.push(self.parse_expr()?);
                }
            }
            self.expect(TokenKind::RParen, "')'")?;
        }
        Ok(args)
    }

    fn parse_arg(&mut self) -> QResult<Arg> {
        let (name, pos) = self.ident()?;
        if self.consume(&TokenKind::LBracket) {
            let (idx, _) = self.int()?;
            self.expect(TokenKind::RBracket, "']'")?;
            Ok(Arg::Element(name, idx, pos))
        } else {
            Ok(Arg::Whole(name, pos))
        }
    }

    fn parse_arg_list(&mut self) -> QResult<Vec<Arg>> {
        let mut list = vec![self.parse_arg()?];
        while self.consume(&TokenKind::Comma) {
            list.push(self.parse_arg()?);
        }
        Ok(list)
    }

    fn resolve(&self, arg: &Arg, quantum: bool) -> QResult<Vec<usize>> {
        let (regs, reg_kind, elem_kind) = if quantum {
            (&self.ctx.qregs, SymbolKind::QuantumRegister, SymbolKind::Qubit)
        } else {
            (&self.ctx.cregs, SymbolKind::ClassicalRegister, SymbolKind::Dit)
        };
        let (name, pos) = match arg {
            Arg::Whole(n, p) | Arg::Element(n, _, p) => (n, *p),
        };
        let reg = regs
            .get(name)
            .ok_or_else(|| QError::undeclared(reg_kind, name.clone(), Some(pos)))?;
        match arg {
            Arg::Whole(..) => Ok(reg.indices()),
            Arg::Element(_, idx, _) if *idx < reg.size => Ok(vec![reg.offset + idx]),
            Arg::Element(_, idx, _) => Err(QError::undeclared(
                elem_kind,
                format!("{}[{}]", name, idx),
                Some(pos),
            )),
        }
    }

    fn parse_application(&mut self, condition: Option<Condition>) -> QResult<()> {
        let tok = self.advance();
        let name = match &tok.kind {
            TokenKind::U => "U".to_string(),
            TokenKind::CX => "CX".to_string(),
            TokenKind::Ident(n) => n.clone(),
            _ => return Err(unexpected(&tok, "gate name")),
        };
        let (nparams, arity) = self
            .ctx
            .signature(&name)
            .ok_or_else(|| QError::undeclared(SymbolKind::Gate, name.clone(), Some(tok.pos)))?;

        let args = self
            .parse_call_args()?
            .iter()
            .map(Expr::fold)
            .collect::<QResult<Vec<f64>>>()?;
        let qargs = self.parse_arg_list()?;
        self.expect(TokenKind::Semicolon, "';'")?;

        if args.len() != nparams {
            return Err(QError::parse(
                tok.pos,
                format!("gate '{}' takes {} parameters, got {}", name, nparams, args.len()),
            ));
        }
        if qargs.len() != arity {
            return Err(QError::parse(
                tok.pos,
                format!("gate '{}' acts on {} qubits, got {}", name, arity, qargs.len()),
            ));
        }
        let lists = qargs
            .iter()
            .map(|a| self.resolve(a, true))
            .collect::<QResult<Vec<_>>>()?;
        let applications = broadcast(&lists, tok.pos)?;
        if applications.iter().any(|targets| !targets.iter().all_unique()) {
            return Err(QError::parse(tok.pos, format!("repeated qubit argument to '{}'", name)));
        }

        let matrix = self.ctx.gate_matrix(&name, &args, tok.pos)?;
        let id = self.ctx.circuit.intern_gate(&gate_label(&name, &args), matrix)?;
        for targets in applications {
            match &condition {
                Some(c) => self.ctx.circuit.append_conditional(id, targets, c.clone())?,
                None => self.ctx.circuit.append_gate(id, targets)?,
            }
        }
        Ok(())
    }

    fn parse_measure(&mut self) -> QResult<()> {
        let tok = self.advance();
        let qarg = self.parse_arg()?;
        self.expect(TokenKind::Arrow, "'->'")?;
        let carg = self.parse_arg()?;
        self.expect(TokenKind::Semicolon, "';'")?;

        let qubits = self.resolve(&qarg, true)?;
        let dits = self.resolve(&carg, false)?;
        if qubits.len() != dits.len() {
            return Err(QError::parse(
                tok.pos,
                format!("measuring {} qubits into {} classical dits", qubits.len(), dits.len()),
            ));
        }
        for (q, c) in qubits.into_iter().zip(dits) {
            self.ctx.circuit.append_measurement(vec![q], vec![c], false)?;
        }
        Ok(())
    }

    fn parse_reset(&mut self) -> QResult<()> {
        self.advance();
        let arg = self.parse_arg()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        for q in self.resolve(&arg, true)? {
            self.ctx.circuit.append_reset(vec![q])?;
        }
        Ok(())
    }

    fn parse_barrier(&mut self) -> QResult<()> {
        self.advance();
        let args = self.parse_arg_list()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        // no effect on a simulator, the arguments still have to exist
        for arg in &args {
            self.resolve(arg, true)?;
        }
        Ok(())
    }

    fn parse_if(&mut self) -> QResult<()> {
        self.advance();
        self.expect(TokenKind::LParen, "'('")?;
        let (creg, pos) = self.ident()?;
        self.expect(TokenKind::EqEq, "'=='")?;
        let (value, _) = self.int()?;
        self.expect(TokenKind::RParen, "')'")?;

        let reg = *self
            .ctx
            .cregs
            .get(&creg)
            .ok_or_else(|| QError::undeclared(SymbolKind::ClassicalRegister, creg.clone(), Some(pos)))?;
        let condition = Condition {
            dits: reg.indices(),
            value,
        };
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::U | TokenKind::CX | TokenKind::Ident(_) => self.parse_application(Some(condition)),
            TokenKind::Measure | TokenKind::Reset => Err(QError::parse(
                tok.pos,
                "only gate applications can be classically controlled",
            )),
            _ => Err(unexpected(&tok, "gate application")),
        }
    }

    // ---- expressions ----

    fn parse_expr(&mut self) -> QResult<Expr> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_term(&mut self) -> QResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> QResult<Expr> {
        if self.consume(&TokenKind::Minus) {
            return Ok(Expr::Neg(Box::new(self.parse_unary()?)));
        }
        let base = self.parse_primary()?;
        if self.consume(&TokenKind::Caret) {
            // right associative
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> QResult<Expr> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Real(v) => Ok(Expr::Num(v)),
            TokenKind::Int(v) => Ok(Expr::Num(v as f64)),
            TokenKind::Pi => Ok(Expr::Pi),
            TokenKind::LParen => {
                let e = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(e)
            }
            TokenKind::Ident(name) => {
                if self.consume(&TokenKind::LParen) {
                    let func = Func::from_name(&name)
                        .ok_or_else(|| QError::parse(tok.pos, format!("unknown function '{}'", name)))?;
                    let arg = self.parse_expr()?;
                    self.expect(TokenKind::RParen, "')'")?;
                    Ok(Expr::Call(func, Box::new(arg)))
                } else {
                    Ok(Expr::Param(name, tok.pos))
                }
            }
            _ => Err(unexpected(&tok, "expression")),
        }
    }
}

fn unexpected(tok: &Token, expected: &str) -> QError {
    QError::parse(tok.pos, format!("expected {}, found {}", expected, tok.kind))
}

/// Expands register arguments element-wise. Single qubits are repeated,
/// whole registers must all have the same size.
fn broadcast(lists: &[Vec<usize>], pos: Position) -> QResult<Vec<Vec<usize>>> {
    let width = lists.iter().map(Vec::len).max().unwrap_or(1);
    if lists.iter().any(|l| l.len() != 1 && l.len() != width) {
        return Err(QError::parse(pos, "register arguments have different sizes"));
    }
    Ok((0..width)
        .map(|j| {
            lists
                .iter()
                .map(|l| if l.len() == 1 { l[0] } else { l[j] })
                .collect()
        })
        .collect())
}
