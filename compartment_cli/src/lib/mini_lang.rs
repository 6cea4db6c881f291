// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A deliberately tiny module-body language, just expressive enough to
//! exercise `compartment_core`'s loader/linker/live-bindings end to end from
//! real files on disk.
//!
//! `compartment_core` treats source sanitization and scope-proxy
//! construction as out of scope: the core only ever sees an opaque
//! `FunctorSource` and calls back into an [`Evaluator`]. This module *is*
//! that evaluator for the CLI: a hand-rolled recursive-descent parser over
//! a JS-shaped subset (`import`/`export`, `const`/`let`, object literals,
//! `+`, calls), not a real ECMAScript parser. Real engines reparse far
//! more; this is a host demo, not the core.

use std::collections::HashMap;
use std::rc::Rc;

use compartment_core::{
    CompartmentError, EvaluateOptions, Evaluator, FunctorContext, FunctorSource,
    LiveExportDescriptor, ModuleFunctor, ParsedModuleRecord, StaticModuleRecord, Value,
};

#[derive(Debug, Clone)]
enum Token {
    Ident(Rc<str>),
    Number(f64),
    Str(Rc<str>),
    Punct(char),
    Eof,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
        }
    }

    fn next_token(&mut self) -> Result<Token, CompartmentError> {
        loop {
            match self.chars.peek() {
                None => return Ok(Token::Eof),
                Some(c) if c.is_whitespace() => {
                    self.chars.next();
                }
                Some('/') => {
                    // `//` line comments; anything else starting with `/`
                    // is not part of this tiny grammar.
                    self.chars.next();
                    if self.chars.peek() == Some(&'/') {
                        while let Some(&c) = self.chars.peek() {
                            if c == '\n' {
                                break;
                            }
                            self.chars.next();
                        }
                    } else {
                        return Ok(Token::Punct('/'));
                    }
                }
                _ => break,
            }
        }
        match self.chars.next() {
            None => Ok(Token::Eof),
            Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                let mut ident = String::from(c);
                while let Some(&c) = self.chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                        ident.push(c);
                        self.chars.next();
                    } else {
                        break;
                    }
                }
                Ok(Token::Ident(Rc::from(ident)))
            }
            Some(c) if c.is_ascii_digit() => {
                let mut number = String::from(c);
                while let Some(&c) = self.chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        number.push(c);
                        self.chars.next();
                    } else {
                        break;
                    }
                }
                number.parse::<f64>().map(Token::Number).map_err(|_| {
                    CompartmentError::type_error("number literal", "a valid number")
                })
            }
            Some(quote @ ('"' | '\'')) => {
                let mut value = String::new();
                loop {
                    match self.chars.next() {
                        Some(c) if c == quote => break,
                        Some(c) => value.push(c),
                        None => {
                            return Err(CompartmentError::type_error(
                                "string literal",
                                "a closing quote",
                            ));
                        }
                    }
                }
                Ok(Token::Str(Rc::from(value)))
            }
            Some(c) => Ok(Token::Punct(c)),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, CompartmentError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token, Token::Eof);
            tokens.push(token);
            if is_eof {
                return Ok(tokens);
            }
        }
    }
}

#[derive(Clone)]
pub(crate) enum Expr {
    Number(f64),
    Str(Rc<str>),
    Ident(Rc<str>),
    Object(Vec<(Rc<str>, Expr)>),
    Add(Box<Expr>, Box<Expr>),
    Call(Rc<str>, Vec<Expr>),
}

#[derive(Clone)]
pub(crate) struct ImportDecl {
    pub specifier: Rc<str>,
    /// `(imported name, local name)`; a default import is represented as
    /// imported name `"default"`.
    pub bindings: Vec<(Rc<str>, Rc<str>)>,
}

#[derive(Clone)]
pub(crate) enum Stmt {
    Const { name: Rc<str>, expr: Expr },
    Let { name: Rc<str>, expr: Expr },
    ExportConst { name: Rc<str>, expr: Expr },
    ExportLet { name: Rc<str>, expr: Expr },
    ExportDefault { expr: Expr },
}

#[derive(Clone, Default)]
pub(crate) struct ModuleSource {
    pub imports: Vec<ImportDecl>,
    pub reexports: Vec<Rc<str>>,
    pub body: Vec<Stmt>,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect_punct(&mut self, c: char) -> Result<(), CompartmentError> {
        match self.advance() {
            Token::Punct(p) if p == c => Ok(()),
            other => Err(CompartmentError::type_error(
                "module source",
                format!("{c:?}, found {other:?}"),
            )),
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<(), CompartmentError> {
        match self.advance() {
            Token::Ident(ident) if ident.as_ref() == expected => Ok(()),
            other => Err(CompartmentError::type_error(
                "module source",
                format!("keyword {expected:?}, found {other:?}"),
            )),
        }
    }

    fn ident_name(&mut self) -> Result<Rc<str>, CompartmentError> {
        match self.advance() {
            Token::Ident(ident) => Ok(ident),
            other => Err(CompartmentError::type_error(
                "module source",
                format!("an identifier, found {other:?}"),
            )),
        }
    }

    fn string_literal(&mut self) -> Result<Rc<str>, CompartmentError> {
        match self.advance() {
            Token::Str(s) => Ok(s),
            other => Err(CompartmentError::type_error(
                "module source",
                format!("a string literal, found {other:?}"),
            )),
        }
    }

    fn parse_module(&mut self) -> Result<ModuleSource, CompartmentError> {
        let mut source = ModuleSource::default();
        loop {
            match self.peek().clone() {
                Token::Eof => break,
                Token::Ident(kw) if kw.as_ref() == "import" => {
                    source.imports.push(self.parse_import()?);
                }
                Token::Ident(kw) if kw.as_ref() == "export" => {
                    self.parse_export(&mut source)?;
                }
                Token::Ident(kw) if kw.as_ref() == "const" => {
                    let (name, expr) = self.parse_decl()?;
                    source.body.push(Stmt::Const { name, expr });
                }
                Token::Ident(kw) if kw.as_ref() == "let" => {
                    let (name, expr) = self.parse_decl()?;
                    source.body.push(Stmt::Let { name, expr });
                }
                Token::Punct(';') => {
                    self.advance();
                }
                other => {
                    return Err(CompartmentError::type_error(
                        "module source",
                        format!("a statement, found {other:?}"),
                    ));
                }
            }
        }
        Ok(source)
    }

    fn parse_import(&mut self) -> Result<ImportDecl, CompartmentError> {
        self.expect_ident("import")?;
        let mut bindings = Vec::new();
        match self.peek().clone() {
            Token::Punct('{') => {
                self.advance();
                loop {
                    if matches!(self.peek(), Token::Punct('}')) {
                        self.advance();
                        break;
                    }
                    let imported = self.ident_name()?;
                    let local = if matches!(self.peek(), Token::Ident(kw) if kw.as_ref() == "as") {
                        self.advance();
                        self.ident_name()?
                    } else {
                        imported.clone()
                    };
                    bindings.push((imported, local));
                    if matches!(self.peek(), Token::Punct(',')) {
                        self.advance();
                    }
                }
            }
            Token::Ident(_) => {
                let local = self.ident_name()?;
                bindings.push((Rc::from("default"), local));
            }
            other => {
                return Err(CompartmentError::type_error(
                    "import clause",
                    format!("`{{` or a default binding, found {other:?}"),
                ));
            }
        }
        self.expect_ident("from")?;
        let specifier = self.string_literal()?;
        self.expect_punct(';')?;
        Ok(ImportDecl { specifier, bindings })
    }

    fn parse_export(&mut self, source: &mut ModuleSource) -> Result<(), CompartmentError> {
        self.expect_ident("export")?;
        match self.peek().clone() {
            Token::Punct('*') => {
                self.advance();
                self.expect_ident("from")?;
                let specifier = self.string_literal()?;
                self.expect_punct(';')?;
                source.reexports.push(specifier);
            }
            Token::Ident(kw) if kw.as_ref() == "default" => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect_punct(';')?;
                source.body.push(Stmt::ExportDefault { expr });
            }
            Token::Ident(kw) if kw.as_ref() == "const" => {
                let (name, expr) = self.parse_decl()?;
                source.body.push(Stmt::ExportConst { name, expr });
            }
            Token::Ident(kw) if kw.as_ref() == "let" => {
                let (name, expr) = self.parse_decl()?;
                source.body.push(Stmt::ExportLet { name, expr });
            }
            other => {
                return Err(CompartmentError::type_error(
                    "export clause",
                    format!("`*`, `default`, `const` or `let`, found {other:?}"),
                ));
            }
        }
        Ok(())
    }

    fn parse_decl(&mut self) -> Result<(Rc<str>, Expr), CompartmentError> {
        self.advance(); // `const` or `let`
        let name = self.ident_name()?;
        self.expect_punct('=')?;
        let expr = self.parse_expr()?;
        self.expect_punct(';')?;
        Ok((name, expr))
    }

    fn parse_expr(&mut self) -> Result<Expr, CompartmentError> {
        let mut lhs = self.parse_atom()?;
        while matches!(self.peek(), Token::Punct('+')) {
            self.advance();
            let rhs = self.parse_atom()?;
            lhs = Expr::Add(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_atom(&mut self) -> Result<Expr, CompartmentError> {
        match self.advance() {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::Punct('{') => {
                let mut entries = Vec::new();
                loop {
                    if matches!(self.peek(), Token::Punct('}')) {
                        self.advance();
                        break;
                    }
                    let key = self.ident_name()?;
                    self.expect_punct(':')?;
                    let value = self.parse_expr()?;
                    entries.push((key, value));
                    if matches!(self.peek(), Token::Punct(',')) {
                        self.advance();
                    }
                }
                Ok(Expr::Object(entries))
            }
            Token::Ident(name) => {
                if matches!(self.peek(), Token::Punct('(')) {
                    self.advance();
                    let mut args = Vec::new();
                    loop {
                        if matches!(self.peek(), Token::Punct(')')) {
                            self.advance();
                            break;
                        }
                        args.push(self.parse_expr()?);
                        if matches!(self.peek(), Token::Punct(',')) {
                            self.advance();
                        }
                    }
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            other => Err(CompartmentError::type_error(
                "expression",
                format!("an atom, found {other:?}"),
            )),
        }
    }
}

pub(crate) fn parse(source: &str) -> Result<ModuleSource, CompartmentError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser { tokens, pos: 0 }.parse_module()
}

/// Builds the `StaticModuleRecord` a parsed module's declared imports and
/// exports describe, ahead of execution: `imports`, `fixedExportMap`,
/// `liveExportMap`, `reexports`.
pub fn compile_record(source: &str) -> Result<Rc<StaticModuleRecord>, CompartmentError> {
    let parsed = parse(source)?;
    let imports = parsed
        .imports
        .iter()
        .map(|decl| decl.specifier.clone())
        .collect();
    let mut fixed_export_map = HashMap::new();
    let mut live_export_map = HashMap::new();
    for stmt in &parsed.body {
        match stmt {
            Stmt::ExportConst { name, .. } => {
                fixed_export_map.insert(name.clone(), name.clone());
            }
            Stmt::ExportLet { name, .. } => {
                live_export_map.insert(
                    name.clone(),
                    LiveExportDescriptor {
                        local_name: name.clone(),
                        set_proxy_trap: true,
                    },
                );
            }
            Stmt::ExportDefault { .. } => {
                fixed_export_map.insert(Rc::from("default"), Rc::from("default"));
            }
            Stmt::Const { .. } | Stmt::Let { .. } => {}
        }
    }
    StaticModuleRecord::parsed(ParsedModuleRecord {
        imports,
        fixed_export_map,
        live_export_map,
        reexports: parsed.reexports,
        functor_source: FunctorSource::from(source),
    })
}

fn eval(expr: &Expr, scope: &HashMap<Rc<str>, Value>) -> Result<Value, CompartmentError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Str(s) => Ok(Value::String(s.clone().into())),
        Expr::Ident(name) => scope.get(name.as_ref()).cloned().ok_or_else(|| {
            CompartmentError::type_error("reference", format!("a bound name, found {name:?} unbound"))
        }),
        Expr::Object(entries) => {
            let mut built = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                built.push((key.clone().into(), eval(value, scope)?));
            }
            Ok(Value::object(built))
        }
        Expr::Add(lhs, rhs) => {
            let lhs = eval(lhs, scope)?;
            let rhs = eval(rhs, scope)?;
            match (&lhs, &rhs) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Ok(Value::String(Rc::from(format!("{}{}", display(&lhs), display(&rhs)))))
                }
                _ => Err(CompartmentError::type_error("`+` operand", "a number or string")),
            }
        }
        Expr::Call(name, args) => {
            let callee = scope.get(name.as_ref()).cloned().ok_or_else(|| {
                CompartmentError::type_error("call target", format!("a bound name, found {name:?} unbound"))
            })?;
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval(arg, scope)?);
            }
            callee.call(&values)
        }
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_string(),
        Value::Number(n) => n.to_string(),
        other => format!("{other:?}"),
    }
}

struct MiniLangFunctor {
    source: ModuleSource,
}

impl ModuleFunctor for MiniLangFunctor {
    fn call(&self, ctx: FunctorContext<'_>) -> Result<(), CompartmentError> {
        use std::cell::RefCell;

        let scope: Rc<RefCell<HashMap<Rc<str>, Value>>> = Rc::new(RefCell::new(HashMap::new()));
        let mut update_record: HashMap<Rc<str>, HashMap<Rc<str>, Vec<Rc<dyn Fn(&Value)>>>> =
            HashMap::new();
        for decl in &self.source.imports {
            let entry = update_record.entry(decl.specifier.clone()).or_default();
            for (imported, local) in &decl.bindings {
                let scope = scope.clone();
                let local = local.clone();
                let updater: Rc<dyn Fn(&Value)> = Rc::new(move |value: &Value| {
                    scope.borrow_mut().insert(local.clone(), value.clone());
                });
                entry.entry(imported.clone()).or_default().push(updater);
            }
        }
        (ctx.imports)(update_record)?;

        for stmt in &self.source.body {
            match stmt {
                Stmt::Const { name, expr } | Stmt::ExportConst { name, expr } => {
                    let value = eval(expr, &scope.borrow())?;
                    scope.borrow_mut().insert(name.clone(), value.clone());
                    if let Some(binding) = ctx.once_var.get(name) {
                        binding.init(value);
                    }
                }
                Stmt::Let { name, expr } | Stmt::ExportLet { name, expr } => {
                    let value = eval(expr, &scope.borrow())?;
                    scope.borrow_mut().insert(name.clone(), value.clone());
                    if let Some(binding) = ctx.live_var.get(name) {
                        binding.update(value);
                    }
                }
                Stmt::ExportDefault { expr } => {
                    let value = eval(expr, &scope.borrow())?;
                    if let Some(binding) = ctx.once_var.get("default") {
                        binding.init(value);
                    }
                }
            }
        }
        Ok(())
    }
}

/// The `Evaluator` this CLI hands every compartment it creates. The
/// execution functor is obtained once per instance by calling
/// `evaluate_module`.
#[derive(Default)]
pub struct MiniLangEvaluator;

impl Evaluator for MiniLangEvaluator {
    fn evaluate_module(
        &self,
        source: &FunctorSource,
        _options: &EvaluateOptions,
    ) -> Result<Rc<dyn ModuleFunctor>, CompartmentError> {
        let parsed = parse(&source.0)?;
        Ok(Rc::new(MiniLangFunctor { source: parsed }))
    }
}
