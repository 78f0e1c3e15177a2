//! AST types for PPL
//!
//! Minimal AST representation closely following the Pest grammar. `Display`
//! renders the canonical text of an expression, which is also the default
//! column name of an un-aliased aggregation (`count()`, `sum(a)`).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub pipeline: Pipeline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub source: TableRef,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    Where { predicate: Expr },
    Stats { aggregations: Vec<AggTerm>, group_by: Vec<FieldRef> },
    Eval { assignments: Vec<Assignment> },
    Sort { keys: Vec<SortKey> },
    /// `size` is `None` when the query relies on the default head size
    Head { size: Option<u64>, offset: u64 },
    Fields { exclude: bool, fields: Vec<FieldRef> },
    Rename { renames: Vec<Rename> },
    Join(Box<JoinCommand>),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Where { .. } => "where",
            Command::Stats { .. } => "stats",
            Command::Eval { .. } => "eval",
            Command::Sort { .. } => "sort",
            Command::Head { .. } => "head",
            Command::Fields { .. } => "fields",
            Command::Rename { .. } => "rename",
            Command::Join(_) => "join",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggTerm {
    pub expr: Expr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub name: String,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: FieldRef,
    pub desc: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    pub field: FieldRef,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinCommand {
    pub join_type: Option<JoinType>,
    pub left_alias: Option<String>,
    pub right_alias: Option<String>,
    pub condition: Option<Expr>,
    pub right: JoinRight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JoinRight {
    Table(TableRef),
    SubQuery { pipeline: Box<Pipeline>, alias: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Semi,
    Anti,
    Cross,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    Field(FieldRef),
    BinaryOp { op: BinOp, left: Box<Expr>, right: Box<Expr> },
    UnaryOp { op: UnOp, expr: Box<Expr> },
    Between { expr: Box<Expr>, low: Box<Expr>, high: Box<Expr>, negated: bool },
    Like { expr: Box<Expr>, pattern: Box<Expr>, negated: bool },
    InList { expr: Box<Expr>, list: Vec<Expr>, negated: bool },
    InSubQuery { expr: Box<Expr>, subquery: Box<Pipeline>, negated: bool },
    Exists { subquery: Box<Pipeline>, negated: bool },
    IsNull { expr: Box<Expr>, negated: bool },
    FuncCall(FuncCall),
    ScalarSubQuery(Box<Pipeline>),
    Interval { value: i64, unit: IntervalUnit },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncCall {
    pub name: String,
    pub args: Vec<Expr>,
    /// `count(*)`
    #[serde(default)]
    pub wildcard: bool,
}

/// Dotted field path; the first part may be a table or subquery alias
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub parts: Vec<String>,
}

impl FieldRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { parts: vec![name.into()] }
    }

    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            parts: vec![qualifier.into(), name.into()],
        }
    }

    /// Last path segment
    pub fn name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }

    pub fn is_qualified(&self) -> bool {
        self.parts.len() > 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add, Sub, Mul, Div, Mod,
    Eq, Ne, Lt, Le, Gt, Ge,
    And, Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalUnit {
    Microsecond,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl IntervalUnit {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let unit = match keyword.to_ascii_lowercase().as_str() {
            "microsecond" => IntervalUnit::Microsecond,
            "second" => IntervalUnit::Second,
            "minute" => IntervalUnit::Minute,
            "hour" => IntervalUnit::Hour,
            "day" => IntervalUnit::Day,
            "week" => IntervalUnit::Week,
            "month" => IntervalUnit::Month,
            "quarter" => IntervalUnit::Quarter,
            "year" => IntervalUnit::Year,
            _ => return None,
        };
        Some(unit)
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self {
            IntervalUnit::Microsecond => "MICROSECOND",
            IntervalUnit::Second => "SECOND",
            IntervalUnit::Minute => "MINUTE",
            IntervalUnit::Hour => "HOUR",
            IntervalUnit::Day => "DAY",
            IntervalUnit::Week => "WEEK",
            IntervalUnit::Month => "MONTH",
            IntervalUnit::Quarter => "QUARTER",
            IntervalUnit::Year => "YEAR",
        };
        f.write_str(unit)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join("."))
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "=",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
        };
        f.write_str(op)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Float(v) => write!(f, "{v}"),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = |negated: &bool| if *negated { "not " } else { "" };
        match self {
            Expr::Literal(lit) => write!(f, "{lit}"),
            Expr::Field(field) => write!(f, "{field}"),
            Expr::BinaryOp { op, left, right } => {
                write_operand(f, left)?;
                write!(f, " {op} ")?;
                write_operand(f, right)
            }
            Expr::UnaryOp { op: UnOp::Neg, expr } => {
                write!(f, "-")?;
                write_operand(f, expr)
            }
            Expr::UnaryOp { op: UnOp::Not, expr } => {
                write!(f, "not ")?;
                write_operand(f, expr)
            }
            Expr::Between { expr, low, high, negated } => {
                write!(f, "{expr} {}between {low} and {high}", not(negated))
            }
            Expr::Like { expr, pattern, negated } => {
                write!(f, "{expr} {}like {pattern}", not(negated))
            }
            Expr::InList { expr, list, negated } => {
                let items: Vec<String> = list.iter().map(ToString::to_string).collect();
                write!(f, "{expr} {}in ({})", not(negated), items.join(", "))
            }
            Expr::InSubQuery { expr, negated, .. } => write!(f, "{expr} {}in [...]", not(negated)),
            Expr::Exists { negated, .. } => write!(f, "{}exists [...]", not(negated)),
            Expr::IsNull { expr, negated } => write!(f, "{expr} is {}null", not(negated)),
            Expr::FuncCall(call) => write!(f, "{call}"),
            Expr::ScalarSubQuery(_) => write!(f, "[...]"),
            Expr::Interval { value, unit } => write!(f, "interval {value} {unit}"),
        }
    }
}

impl fmt::Display for FuncCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wildcard {
            return write!(f, "{}(*)", self.name);
        }
        let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
        write!(f, "{}({})", self.name, args.join(", "))
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    match expr {
        Expr::BinaryOp { .. } => write!(f, "({expr})"),
        _ => write!(f, "{expr}"),
    }
}
