//! Resolved, typed expressions carried by plan nodes
//!
//! Column references are positional: `index` points into the output schema of
//! the node's input (for joins, the concatenated left ++ right schema).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::plan::LogicalPlan;
use crate::types::DataType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(String),      // ISO format
    Timestamp(String), // ISO format
    Interval { value: i64, unit: IntervalUnit },
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::Bool(_) => DataType::Bool,
            Value::Int(_) => DataType::Int64,
            Value::Float(_) => DataType::Float64,
            Value::String(_) => DataType::String,
            Value::Date(_) => DataType::Date,
            Value::Timestamp(_) => DataType::Timestamp,
            Value::Interval { .. } => DataType::Interval,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "'{s}'"),
            Value::Date(s) => write!(f, "DATE '{s}'"),
            Value::Timestamp(s) => write!(f, "TIMESTAMP '{s}'"),
            Value::Interval { value, unit } => write!(f, "INTERVAL {value} {unit}"),
        }
    }
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    // Arithmetic
    Add, Sub, Mul, Div, Mod,
    // Comparison
    Eq, Ne, Lt, Le, Gt, Ge,
    // Logical
    And, Or,
}

impl BinOp {
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
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
            BinOp::And => "AND",
            BinOp::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expr {
    Column {
        name: String,
        index: usize,
        data_type: DataType,
    },
    Literal {
        value: Value,
    },
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        data_type: DataType,
    },
    Not {
        expr: Box<Expr>,
    },
    Negative {
        expr: Box<Expr>,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    /// SQL wildcard match: `%` any run of characters, `_` exactly one
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    ScalarFunction {
        func: String,
        args: Vec<Expr>,
        return_type: DataType,
    },
    FieldAccess {
        expr: Box<Expr>,
        field: String,
        data_type: DataType,
    },
    Cast {
        expr: Box<Expr>,
        to: DataType,
    },
    /// One row, one column; the outer expression sees only the column type
    ScalarSubquery {
        subquery: Box<LogicalPlan>,
    },
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<LogicalPlan>,
        negated: bool,
    },
    Exists {
        subquery: Box<LogicalPlan>,
        negated: bool,
    },
}

impl Expr {
    pub fn column(name: impl Into<String>, index: usize, data_type: DataType) -> Self {
        Expr::Column {
            name: name.into(),
            index,
            data_type,
        }
    }

    pub fn literal(value: Value) -> Self {
        Expr::Literal { value }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Expr::Column { data_type, .. } => data_type.clone(),
            Expr::Literal { value } => value.data_type(),
            Expr::BinaryOp { data_type, .. } => data_type.clone(),
            Expr::Negative { expr } => expr.data_type(),
            Expr::ScalarFunction { return_type, .. } => return_type.clone(),
            Expr::FieldAccess { data_type, .. } => data_type.clone(),
            Expr::Cast { to, .. } => to.clone(),
            Expr::ScalarSubquery { subquery } => subquery
                .schema()
                .field(0)
                .map(|f| f.data_type.clone())
                .unwrap_or(DataType::Null),
            Expr::Not { .. }
            | Expr::Between { .. }
            | Expr::Like { .. }
            | Expr::InList { .. }
            | Expr::IsNull { .. }
            | Expr::InSubquery { .. }
            | Expr::Exists { .. } => DataType::Bool,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = |negated: &bool| if *negated { "NOT " } else { "" };
        match self {
            Expr::Column { name, index, .. } => write!(f, "{name}#{index}"),
            Expr::Literal { value } => write!(f, "{value}"),
            Expr::BinaryOp { op, left, right, .. } => {
                write!(f, "({left} {} {right})", op.symbol())
            }
            Expr::Not { expr } => write!(f, "NOT ({expr})"),
            Expr::Negative { expr } => write!(f, "-({expr})"),
            Expr::Between { expr, low, high, negated } => {
                write!(f, "{expr} {}BETWEEN {low} AND {high}", not(negated))
            }
            Expr::Like { expr, pattern, negated } => {
                write!(f, "{expr} {}LIKE {pattern}", not(negated))
            }
            Expr::InList { expr, list, negated } => {
                let items: Vec<String> = list.iter().map(ToString::to_string).collect();
                write!(f, "{expr} {}IN ({})", not(negated), items.join(", "))
            }
            Expr::IsNull { expr, negated } => write!(f, "{expr} IS {}NULL", not(negated)),
            Expr::ScalarFunction { func, args, .. } => {
                let args: Vec<String> = args.iter().map(ToString::to_string).collect();
                write!(f, "{func}({})", args.join(", "))
            }
            Expr::FieldAccess { expr, field, .. } => write!(f, "{expr}.{field}"),
            Expr::Cast { expr, to } => write!(f, "CAST({expr} AS {to})"),
            Expr::ScalarSubquery { .. } => write!(f, "<scalar subquery>"),
            Expr::InSubquery { expr, negated, .. } => {
                write!(f, "{expr} {}IN <subquery>", not(negated))
            }
            Expr::Exists { negated, .. } => write!(f, "{}EXISTS <subquery>", not(negated)),
        }
    }
}

/// Aggregate call inside an `Aggregate` node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateExpr {
    pub func: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Expr>,
    pub return_type: DataType,
}

impl fmt::Display for AggregateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
        write!(f, "{}({})", self.func, args.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortExpr {
    pub expr: Expr,
    pub asc: bool,
    pub nulls_first: bool,
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

impl JoinType {
    /// Semi and anti joins only emit the left side's columns.
    pub fn emits_right_columns(&self) -> bool {
        !matches!(self, JoinType::Semi | JoinType::Anti)
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Full => "full",
            JoinType::Semi => "semi",
            JoinType::Anti => "anti",
            JoinType::Cross => "cross",
        };
        f.write_str(name)
    }
}
