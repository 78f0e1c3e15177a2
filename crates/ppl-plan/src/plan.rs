//! Logical plan tree handed to the execution engine

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::expr::{AggregateExpr, Expr, JoinType, SortExpr};
use crate::types::Schema;

/// Relational operator tree. Nodes are immutable once built; every node owns
/// its inputs and exposes its resolved output schema through [`LogicalPlan::schema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node")]
pub enum LogicalPlan {
    Scan {
        table: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
        schema: Schema,
    },
    Filter {
        predicate: Expr,
        input: Box<LogicalPlan>,
    },
    Projection {
        exprs: Vec<(Expr, String)>,
        input: Box<LogicalPlan>,
        schema: Schema,
    },
    Aggregate {
        group_exprs: Vec<Expr>,
        aggr_exprs: Vec<(AggregateExpr, String)>,
        input: Box<LogicalPlan>,
        schema: Schema,
    },
    Join {
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
        join_type: JoinType,
        #[serde(skip_serializing_if = "Option::is_none")]
        on: Option<Expr>,
        schema: Schema,
    },
    Sort {
        keys: Vec<SortExpr>,
        input: Box<LogicalPlan>,
    },
    Limit {
        skip: usize,
        fetch: usize,
        input: Box<LogicalPlan>,
    },
    SubqueryAlias {
        alias: String,
        input: Box<LogicalPlan>,
    },
}

impl LogicalPlan {
    /// Output schema of this node
    pub fn schema(&self) -> &Schema {
        match self {
            LogicalPlan::Scan { schema, .. }
            | LogicalPlan::Projection { schema, .. }
            | LogicalPlan::Aggregate { schema, .. }
            | LogicalPlan::Join { schema, .. } => schema,
            LogicalPlan::Filter { input, .. }
            | LogicalPlan::Sort { input, .. }
            | LogicalPlan::Limit { input, .. }
            | LogicalPlan::SubqueryAlias { input, .. } => input.schema(),
        }
    }

    pub fn inputs(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::Scan { .. } => vec![],
            LogicalPlan::Join { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            LogicalPlan::Filter { input, .. }
            | LogicalPlan::Projection { input, .. }
            | LogicalPlan::Aggregate { input, .. }
            | LogicalPlan::Sort { input, .. }
            | LogicalPlan::Limit { input, .. }
            | LogicalPlan::SubqueryAlias { input, .. } => vec![input.as_ref()],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LogicalPlan::Scan { .. } => "Scan",
            LogicalPlan::Filter { .. } => "Filter",
            LogicalPlan::Projection { .. } => "Projection",
            LogicalPlan::Aggregate { .. } => "Aggregate",
            LogicalPlan::Join { .. } => "Join",
            LogicalPlan::Sort { .. } => "Sort",
            LogicalPlan::Limit { .. } => "Limit",
            LogicalPlan::SubqueryAlias { .. } => "SubqueryAlias",
        }
    }

    /// Calculate fingerprint (SHA-256) for deterministic caching
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("plan should always serialize");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinOp, Value};
    use crate::types::{DataType, Field};

    fn scan() -> LogicalPlan {
        LogicalPlan::Scan {
            table: "orders".to_string(),
            alias: None,
            schema: Schema::new(vec![
                Field::nullable("status", DataType::String),
                Field::nullable("region", DataType::String),
            ]),
        }
    }

    #[test]
    fn test_filter_inherits_schema() {
        let plan = LogicalPlan::Filter {
            predicate: Expr::BinaryOp {
                op: BinOp::Eq,
                left: Box::new(Expr::column("status", 0, DataType::String)),
                right: Box::new(Expr::literal(Value::String("open".to_string()))),
                data_type: DataType::Bool,
            },
            input: Box::new(scan()),
        };
        assert_eq!(plan.schema().names(), vec!["status", "region"]);
        assert_eq!(plan.inputs().len(), 1);
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let plan1 = LogicalPlan::Limit {
            skip: 0,
            fetch: 5,
            input: Box::new(scan()),
        };
        let plan2 = plan1.clone();
        assert_eq!(plan1.fingerprint(), plan2.fingerprint());

        let plan3 = LogicalPlan::Limit {
            skip: 0,
            fetch: 6,
            input: Box::new(scan()),
        };
        assert_ne!(plan1.fingerprint(), plan3.fingerprint());
    }

    #[test]
    fn test_json_round_trip() {
        let plan = LogicalPlan::Sort {
            keys: vec![SortExpr {
                expr: Expr::column("region", 1, DataType::String),
                asc: false,
                nulls_first: false,
            }],
            input: Box::new(scan()),
        };
        let json = serde_json::to_string(&plan).unwrap();
        let parsed: LogicalPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(plan, parsed);
    }
}
