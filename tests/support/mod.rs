//! A tiny line-oriented expression language used as the interpreter under test.
//!
//! Each line is one statement: `name = expr` or a bare `expr`. Values are ints, floats,
//! strings, bools, nil, lists and maps; host functions come in as `Value::Func` bindings.
//! A program is the statements that parsed before the first bad line, so a parse error
//! still leaves a runnable partial program behind.

#![allow(dead_code)]

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use scriptcase::{value_equal, Environment, Interpreter, Parsed, Ran, ScriptError, Value};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Parser)]
#[grammar_inline = r##"
WHITESPACE = _{ " " | "\t" | "\r" }
COMMENT    = _{ "#" ~ ANY* }

line   = { SOI ~ stmt? ~ EOI }
stmt   = { assign | expr }
assign = { ident ~ "=" ~ !"=" ~ expr }

expr       = { comparison }
comparison = { sum ~ (cmp_op ~ sum)? }
cmp_op     = { "==" | "!=" | "<=" | ">=" | "<" | ">" }
sum        = { product ~ (add_op ~ product)* }
add_op     = { "+" | "-" }
product    = { unary ~ (mul_op ~ unary)* }
mul_op     = { "*" | "/" | "%" }
unary      = { neg* ~ postfix }
neg        = { "-" }
postfix    = { primary ~ (call_args | index)* }
call_args  = { "(" ~ (expr ~ ("," ~ expr)*)? ~ ")" }
index      = { "[" ~ expr ~ "]" }
primary    = _{ float | int | string | boolean | nil | list | map | ident | "(" ~ expr ~ ")" }

float   = @{ ASCII_DIGIT+ ~ "." ~ ASCII_DIGIT+ }
int     = @{ ASCII_DIGIT+ }
string  = ${ "\"" ~ inner ~ "\"" }
inner   = @{ (!("\"" | "\\") ~ ANY | "\\" ~ ANY)* }
boolean = @{ ("true" | "false") ~ !ident_char }
nil     = @{ "nil" ~ !ident_char }
list    = { "[" ~ (expr ~ ("," ~ expr)*)? ~ "]" }
map     = { "{" ~ (pair ~ ("," ~ pair)*)? ~ "}" }
pair    = { string ~ ":" ~ expr }

ident      = @{ !keyword ~ (ASCII_ALPHA | "_") ~ ident_char* }
ident_char = _{ ASCII_ALPHANUMERIC | "_" }
keyword    = _{ ("true" | "false" | "nil") ~ !ident_char }
"##]
struct CalcParser;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// ============================================================================
// AST
// ============================================================================

#[derive(Debug, Clone)]
pub enum Stmt {
    Assign(String, Expr),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    List(Vec<Expr>),
    Map(Vec<(String, Expr)>),
    Ident(String),
    Neg(Box<Expr>),
    Binary(String, Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
}

// ============================================================================
// PARSING
// ============================================================================

/// Parse line by line, stopping at the first line that does not parse.
pub fn parse_program(source: &str) -> Parsed<Vec<Stmt>> {
    let mut program = Vec::new();
    for (number, text) in source.lines().enumerate() {
        match parse_line(text) {
            Ok(Some(stmt)) => program.push(stmt),
            Ok(None) => {}
            Err(reason) => {
                let message = format!("syntax error on line {}: {}", number + 1, reason);
                return Parsed::failed(program, ScriptError::parse(message));
            }
        }
    }
    Parsed::ok(program)
}

fn parse_line(text: &str) -> Result<Option<Stmt>, String> {
    let mut pairs =
        CalcParser::parse(Rule::line, text).map_err(|_| "unexpected input".to_string())?;
    // the line rule always produces exactly one pair
    let line = pairs.next().ok_or("empty parse")?;
    match line.into_inner().find(|p| p.as_rule() == Rule::stmt) {
        Some(stmt) => build_stmt(stmt).map(Some),
        None => Ok(None),
    }
}

fn build_stmt(pair: Pair<Rule>) -> Result<Stmt, String> {
    let inner = first_inner(pair)?;
    match inner.as_rule() {
        Rule::assign => {
            let mut parts = inner.into_inner();
            let name = parts.next().ok_or("missing name")?.as_str().to_string();
            let value = build_expr(parts.next().ok_or("missing value")?)?;
            Ok(Stmt::Assign(name, value))
        }
        _ => Ok(Stmt::Expr(build_expr(inner)?)),
    }
}

fn build_expr(pair: Pair<Rule>) -> Result<Expr, String> {
    match pair.as_rule() {
        Rule::expr | Rule::stmt => build_expr(first_inner(pair)?),
        Rule::comparison | Rule::sum | Rule::product => {
            let mut parts = pair.into_inner();
            let mut lhs = build_expr(parts.next().ok_or("missing operand")?)?;
            while let Some(op) = parts.next() {
                let rhs = build_expr(parts.next().ok_or("missing operand")?)?;
                lhs = Expr::Binary(op.as_str().to_string(), Box::new(lhs), Box::new(rhs));
            }
            Ok(lhs)
        }
        Rule::unary => {
            let mut negations = 0;
            let mut operand = None;
            for part in pair.into_inner() {
                match part.as_rule() {
                    Rule::neg => negations += 1,
                    _ => operand = Some(build_expr(part)?),
                }
            }
            let mut expr = operand.ok_or("missing operand")?;
            for _ in 0..negations {
                expr = Expr::Neg(Box::new(expr));
            }
            Ok(expr)
        }
        Rule::postfix => {
            let mut parts = pair.into_inner();
            let mut expr = build_expr(parts.next().ok_or("missing operand")?)?;
            for part in parts {
                expr = match part.as_rule() {
                    Rule::call_args => {
                        let args = part.into_inner().map(build_expr).collect::<Result<_, _>>()?;
                        Expr::Call(Box::new(expr), args)
                    }
                    _ => Expr::Index(Box::new(expr), Box::new(build_expr(first_inner(part)?)?)),
                };
            }
            Ok(expr)
        }
        Rule::float => pair
            .as_str()
            .parse::<f64>()
            .map(|n| Expr::Literal(Value::Float(n)))
            .map_err(|e| e.to_string()),
        Rule::int => pair
            .as_str()
            .parse::<i64>()
            .map(|n| Expr::Literal(Value::Int(n)))
            .map_err(|_| format!("integer literal {} out of range", pair.as_str())),
        Rule::string => Ok(Expr::Literal(Value::String(unescape(first_inner(pair)?.as_str())))),
        Rule::boolean => Ok(Expr::Literal(Value::Bool(pair.as_str() == "true"))),
        Rule::nil => Ok(Expr::Literal(Value::Nil)),
        Rule::list => Ok(Expr::List(
            pair.into_inner().map(build_expr).collect::<Result<_, _>>()?,
        )),
        Rule::map => {
            let mut entries = Vec::new();
            for entry in pair.into_inner() {
                let mut parts = entry.into_inner();
                let key = unescape(first_inner(parts.next().ok_or("missing key")?)?.as_str());
                let value = build_expr(parts.next().ok_or("missing value")?)?;
                entries.push((key, value));
            }
            Ok(Expr::Map(entries))
        }
        Rule::ident => Ok(Expr::Ident(pair.as_str().to_string())),
        rule => Err(format!("unsupported rule {:?}", rule)),
    }
}

fn first_inner(pair: Pair<Rule>) -> Result<Pair<Rule>, String> {
    let rule = pair.as_rule();
    pair.into_inner()
        .next()
        .ok_or_else(|| format!("empty {:?}", rule))
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

// ============================================================================
// ENVIRONMENT
// ============================================================================

/// Counts shared between an interpreter and every environment it creates.
#[derive(Debug, Default, Clone)]
pub struct Lifecycle {
    pub created: Rc<Cell<usize>>,
    pub destroyed: Rc<Cell<usize>>,
}

#[derive(Debug)]
pub struct CalcEnv {
    vars: HashMap<String, Value>,
    types: HashMap<String, &'static str>,
    destroyed: bool,
    lifecycle: Lifecycle,
}

impl CalcEnv {
    pub fn is_defined(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn type_kind(&self, name: &str) -> Option<&'static str> {
        self.types.get(name).copied()
    }
}

impl Environment for CalcEnv {
    fn define_type(&mut self, name: &str, prototype: &Value) -> Result<(), ScriptError> {
        if prototype.is_nil() {
            return Err(ScriptError::binding("type cannot be nil"));
        }
        self.types.insert(name.to_string(), prototype.kind());
        Ok(())
    }

    fn define(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
        if name.is_empty() || name.contains(|c: char| !(c.is_ascii_alphanumeric() || c == '_')) {
            return Err(ScriptError::binding(format!("invalid name '{}'", name)));
        }
        self.vars.insert(name.to_string(), value);
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Value, ScriptError> {
        self.vars
            .get(name)
            .cloned()
            .ok_or_else(|| ScriptError::lookup(format!("undefined symbol '{}'", name)))
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.vars.clear();
        self.types.clear();
        self.lifecycle.destroyed.set(self.lifecycle.destroyed.get() + 1);
    }
}

// ============================================================================
// INTERPRETER
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct Calc {
    pub lifecycle: Lifecycle,
}

impl Calc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> usize {
        self.lifecycle.created.get()
    }

    pub fn destroyed(&self) -> usize {
        self.lifecycle.destroyed.get()
    }
}

impl Interpreter for Calc {
    type Program = Vec<Stmt>;
    type Env = CalcEnv;

    fn parse(&self, source: &str) -> Parsed<Vec<Stmt>> {
        parse_program(source)
    }

    fn new_env(&self) -> CalcEnv {
        self.lifecycle.created.set(self.lifecycle.created.get() + 1);
        CalcEnv {
            vars: HashMap::new(),
            types: HashMap::new(),
            destroyed: false,
            lifecycle: self.lifecycle.clone(),
        }
    }

    /// A failing statement leaves the value of the last completed one behind.
    fn run(&self, program: &Vec<Stmt>, env: &mut CalcEnv) -> Ran {
        let mut last = Value::Nil;
        for stmt in program {
            let result = match stmt {
                Stmt::Assign(name, expr) => eval(expr, env).map(|value| {
                    env.vars.insert(name.clone(), value.clone());
                    value
                }),
                Stmt::Expr(expr) => eval(expr, env),
            };
            match result {
                Ok(value) => last = value,
                Err(error) => return Ran::failed(last, error),
            }
        }
        Ran::ok(last)
    }
}

fn eval(expr: &Expr, env: &CalcEnv) -> Result<Value, ScriptError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::List(items) => Ok(Value::List(
            items.iter().map(|e| eval(e, env)).collect::<Result<_, _>>()?,
        )),
        Expr::Map(entries) => {
            let mut map = im::HashMap::new();
            for (key, e) in entries {
                map.insert(key.clone(), eval(e, env)?);
            }
            Ok(Value::Map(map))
        }
        Expr::Ident(name) => env
            .vars
            .get(name)
            .cloned()
            .ok_or_else(|| ScriptError::runtime(format!("undefined symbol '{}'", name))),
        Expr::Neg(inner) => match eval(inner, env)? {
            Value::Int(n) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| ScriptError::runtime("integer overflow")),
            Value::Float(n) => Ok(Value::Float(-n)),
            other => Err(invalid_unary("-", &other)),
        },
        Expr::Binary(op, lhs, rhs) => binary(op, eval(lhs, env)?, eval(rhs, env)?),
        Expr::Call(callee, args) => call(callee, args, env),
        Expr::Index(target, key) => match (eval(target, env)?, eval(key, env)?) {
            (Value::List(items), Value::Int(i)) => usize::try_from(i)
                .ok()
                .and_then(|i| items.get(i).cloned())
                .ok_or_else(|| ScriptError::runtime("index out of range")),
            (Value::Map(map), Value::String(key)) => Ok(map.get(&key).cloned().unwrap_or_default()),
            (target, key) => Err(ScriptError::runtime(format!(
                "cannot index {} with {}",
                target.kind(),
                key.kind()
            ))),
        },
    }
}

/// `make(T)` builds the zero value of a registered type; anything else must be a function.
fn call(callee: &Expr, args: &[Expr], env: &CalcEnv) -> Result<Value, ScriptError> {
    if let (Expr::Ident(name), [Expr::Ident(type_name)]) = (callee, args) {
        if name == "make" {
            let kind = env
                .type_kind(type_name)
                .ok_or_else(|| ScriptError::runtime(format!("undefined type '{}'", type_name)))?;
            return Ok(zero_value(kind));
        }
    }
    let func = match eval(callee, env)? {
        Value::Func(func) => func,
        other => {
            return Err(ScriptError::runtime(format!(
                "cannot call a value of kind {}",
                other.kind()
            )))
        }
    };
    let args = args
        .iter()
        .map(|a| eval(a, env))
        .collect::<Result<Vec<_>, _>>()?;
    func.call(&args)
}

fn zero_value(kind: &str) -> Value {
    match kind {
        "bool" => Value::Bool(false),
        "int" => Value::Int(0),
        "float" => Value::Float(0.0),
        "string" => Value::String(String::new()),
        "list" => Value::List(Vec::new()),
        "map" => Value::Map(im::HashMap::new()),
        _ => Value::Nil,
    }
}

fn binary(op: &str, lhs: Value, rhs: Value) -> Result<Value, ScriptError> {
    use Value::*;
    match (op, &lhs, &rhs) {
        ("==", _, _) => Ok(Bool(value_equal(&lhs, &rhs))),
        ("!=", _, _) => Ok(Bool(!value_equal(&lhs, &rhs))),
        ("+", String(a), String(b)) => Ok(String(format!("{}{}", a, b))),
        ("+", List(a), List(b)) => Ok(List(a.iter().chain(b.iter()).cloned().collect())),
        (_, Int(a), Int(b)) => int_op(op, *a, *b),
        (_, Int(a), Float(b)) => float_op(op, *a as f64, *b),
        (_, Float(a), Int(b)) => float_op(op, *a, *b as f64),
        (_, Float(a), Float(b)) => float_op(op, *a, *b),
        _ => Err(ScriptError::runtime(format!(
            "invalid operation: {} {} {}",
            lhs.kind(),
            op,
            rhs.kind()
        ))),
    }
}

fn int_op(op: &str, a: i64, b: i64) -> Result<Value, ScriptError> {
    let overflow = || ScriptError::runtime("integer overflow");
    match op {
        "+" => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
        "-" => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
        "*" => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
        "/" | "%" if b == 0 => Err(ScriptError::runtime("division by zero")),
        "/" => a.checked_div(b).map(Value::Int).ok_or_else(overflow),
        "%" => a.checked_rem(b).map(Value::Int).ok_or_else(overflow),
        _ => Ok(Value::Bool(compare(op, a.cmp(&b)))),
    }
}

fn float_op(op: &str, a: f64, b: f64) -> Result<Value, ScriptError> {
    match op {
        "+" => Ok(Value::Float(a + b)),
        "-" => Ok(Value::Float(a - b)),
        "*" => Ok(Value::Float(a * b)),
        "/" => Ok(Value::Float(a / b)),
        "%" => Ok(Value::Float(a % b)),
        _ => match a.partial_cmp(&b) {
            Some(ordering) => Ok(Value::Bool(compare(op, ordering))),
            None => Ok(Value::Bool(false)),
        },
    }
}

fn compare(op: &str, ordering: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match op {
        "<" => ordering == Less,
        "<=" => ordering != Greater,
        ">" => ordering == Greater,
        ">=" => ordering != Less,
        _ => false,
    }
}

fn invalid_unary(op: &str, value: &Value) -> ScriptError {
    ScriptError::runtime(format!("invalid operation: {}{}", op, value.kind()))
}
