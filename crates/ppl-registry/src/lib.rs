//! Function registry: scalar and aggregate signatures with return type inference

use ppl_plan::DataType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    #[error("Type mismatch for function {func}: expected {expected}, got ({})", render_types(.actual))]
    TypeMismatch {
        func: String,
        expected: String,
        actual: Vec<DataType>,
    },
}

fn render_types(types: &[DataType]) -> String {
    types.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Accepted shape of one argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgKind {
    Exact(DataType),
    Numeric,
    /// Any integer width
    Integer,
    /// Date, timestamp, or a string holding one
    Temporal,
    Any,
}

impl ArgKind {
    /// `Null` is accepted everywhere; it carries no type of its own
    pub fn accepts(&self, actual: &DataType) -> bool {
        if *actual == DataType::Null {
            return true;
        }
        match self {
            ArgKind::Exact(expected) => expected == actual,
            ArgKind::Numeric => actual.is_numeric(),
            ArgKind::Integer => actual.is_integer(),
            ArgKind::Temporal => actual.is_temporal() || *actual == DataType::String,
            ArgKind::Any => true,
        }
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgKind::Exact(dt) => write!(f, "{dt}"),
            ArgKind::Numeric => write!(f, "numeric"),
            ArgKind::Integer => write!(f, "integer"),
            ArgKind::Temporal => write!(f, "temporal"),
            ArgKind::Any => write!(f, "any"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnKind {
    Fixed(DataType),
    /// Type of the first argument
    FirstArg,
    /// Int64 for integer input, Float64 otherwise
    Sum,
    /// Date stays Date; anything else becomes Timestamp
    Temporal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    pub args: Vec<ArgKind>,
    /// Last argument kind repeats
    pub variadic: bool,
    pub return_kind: ReturnKind,
    pub is_aggregate: bool,
}

impl FunctionSignature {
    pub fn scalar(name: &str, args: Vec<ArgKind>, return_kind: ReturnKind) -> Self {
        Self {
            name: name.to_string(),
            args,
            variadic: false,
            return_kind,
            is_aggregate: false,
        }
    }

    pub fn aggregate(name: &str, args: Vec<ArgKind>, return_kind: ReturnKind) -> Self {
        Self {
            is_aggregate: true,
            ..Self::scalar(name, args, return_kind)
        }
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn matches(&self, arg_types: &[DataType]) -> bool {
        let arity_ok = if self.variadic {
            arg_types.len() >= self.args.len()
        } else {
            arg_types.len() == self.args.len()
        };
        if !arity_ok {
            return false;
        }
        arg_types.iter().enumerate().all(|(i, actual)| {
            let kind = self.args.get(i).or_else(|| self.args.last());
            kind.is_some_and(|kind| kind.accepts(actual))
        })
    }

    /// Return type for a call whose arguments already matched this signature
    pub fn return_type(&self, arg_types: &[DataType]) -> DataType {
        let first = arg_types.first().cloned().unwrap_or(DataType::Null);
        match &self.return_kind {
            ReturnKind::Fixed(dt) => dt.clone(),
            ReturnKind::FirstArg => first,
            ReturnKind::Sum if first.is_integer() => DataType::Int64,
            ReturnKind::Sum => DataType::Float64,
            ReturnKind::Temporal if first == DataType::Date => DataType::Date,
            ReturnKind::Temporal => DataType::Timestamp,
        }
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
        let dots = if self.variadic { ", ..." } else { "" };
        write!(f, "{}({}{dots})", self.name, args.join(", "))
    }
}

#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, Vec<FunctionSignature>>,
    version: String, // Semver for plan compatibility
}

impl FunctionRegistry {
    pub fn new(version: impl Into<String>) -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
            version: version.into(),
        };
        registry.register_builtins();
        registry
    }

    fn register_builtins(&mut self) {
        use ArgKind::*;

        // Aggregates
        self.register(FunctionSignature::aggregate("count", vec![], ReturnKind::Fixed(DataType::Int64)));
        self.register(FunctionSignature::aggregate("count", vec![Any], ReturnKind::Fixed(DataType::Int64)));
        self.register(FunctionSignature::aggregate("sum", vec![Numeric], ReturnKind::Sum));
        self.register(FunctionSignature::aggregate("avg", vec![Numeric], ReturnKind::Fixed(DataType::Float64)));
        for name in ["min", "max"] {
            self.register(FunctionSignature::aggregate(name, vec![Any], ReturnKind::FirstArg));
        }
        for name in ["dc", "distinct_count"] {
            self.register(FunctionSignature::aggregate(name, vec![Any], ReturnKind::Fixed(DataType::Int64)));
        }

        // Date and time
        self.register(FunctionSignature::scalar("date", vec![Temporal], ReturnKind::Fixed(DataType::Date)));
        self.register(FunctionSignature::scalar("timestamp", vec![Temporal], ReturnKind::Fixed(DataType::Timestamp)));
        for name in ["adddate", "date_add", "subdate", "date_sub"] {
            self.register(FunctionSignature::scalar(
                name,
                vec![Temporal, Exact(DataType::Interval)],
                ReturnKind::Temporal,
            ));
        }
        // adddate(d, 3) shifts by whole days
        for name in ["adddate", "subdate"] {
            self.register(FunctionSignature::scalar(name, vec![Temporal, Integer], ReturnKind::Temporal));
        }
        self.register(FunctionSignature::scalar("now", vec![], ReturnKind::Fixed(DataType::Timestamp)));
        for name in ["year", "month", "day"] {
            self.register(FunctionSignature::scalar(name, vec![Temporal], ReturnKind::Fixed(DataType::Int32)));
        }

        // Math
        self.register(FunctionSignature::scalar("abs", vec![Numeric], ReturnKind::FirstArg));
        self.register(FunctionSignature::scalar("round", vec![Numeric], ReturnKind::FirstArg));

        // Strings
        for name in ["lower", "upper", "trim"] {
            self.register(FunctionSignature::scalar(
                name,
                vec![Exact(DataType::String)],
                ReturnKind::Fixed(DataType::String),
            ));
        }
        self.register(FunctionSignature::scalar(
            "length",
            vec![Exact(DataType::String)],
            ReturnKind::Fixed(DataType::Int32),
        ));
        self.register(
            FunctionSignature::scalar("concat", vec![Exact(DataType::String)], ReturnKind::Fixed(DataType::String))
                .variadic(),
        );

        // Null handling
        self.register(FunctionSignature::scalar("isnull", vec![Any], ReturnKind::Fixed(DataType::Bool)));
        self.register(FunctionSignature::scalar("coalesce", vec![Any], ReturnKind::FirstArg).variadic());
    }

    pub fn register(&mut self, sig: FunctionSignature) {
        self.functions
            .entry(sig.name.to_ascii_lowercase())
            .or_default()
            .push(sig);
    }

    /// Resolve an overload by name (case-insensitive) and argument types
    pub fn lookup(&self, name: &str, arg_types: &[DataType]) -> Result<&FunctionSignature, RegistryError> {
        let overloads = self
            .functions
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| RegistryError::FunctionNotFound(name.to_string()))?;

        overloads
            .iter()
            .find(|sig| sig.matches(arg_types))
            .ok_or_else(|| RegistryError::TypeMismatch {
                func: name.to_string(),
                expected: overloads
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" | "),
                actual: arg_types.to_vec(),
            })
    }

    pub fn is_aggregate(&self, name: &str) -> bool {
        self.functions
            .get(&name.to_ascii_lowercase())
            .is_some_and(|overloads| overloads.iter().any(|sig| sig.is_aggregate))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_ascii_lowercase())
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new("0.1.0")
    }
}
