//! Semantic analysis: PPL AST + catalog + function registry -> logical plan
//!
//! Commands are applied left to right. Each step consumes the plan built so
//! far together with a [`Scope`] mirroring that plan's output schema, and
//! returns the next plan node and its scope.

use std::collections::HashSet;

use ppl_ast as ast;
use ppl_ast::{Command, FieldRef, JoinCommand, JoinRight, Pipeline, Query, TableRef};
use ppl_plan::{
    AggregateExpr, BinOp, Catalog, DataType, Expr, Field, IntervalUnit, JoinType, LogicalPlan, SortExpr,
    Value,
};
use ppl_registry::FunctionRegistry;
use tracing::debug;

use crate::coerce::{coerce, coerce_for_arith, coerce_for_compare, comparison_type, ensure_bool, validate_string_literal};
use crate::error::{AnalysisError, AnalyzeError, Result};
use crate::scope::{Scope, ScopeColumn};

pub const DEFAULT_HEAD_SIZE: u64 = 10;

/// Where an expression appears; decides which constructs it may contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Where,
    Stats,
    Eval,
    JoinOn,
}

pub struct Analyzer<'a> {
    catalog: &'a dyn Catalog,
    registry: &'a FunctionRegistry,
    default_head_size: u64,
}

impl<'a> Analyzer<'a> {
    pub fn new(catalog: &'a dyn Catalog, registry: &'a FunctionRegistry) -> Self {
        Self {
            catalog,
            registry,
            default_head_size: DEFAULT_HEAD_SIZE,
        }
    }

    /// Row count used by a bare `head`
    pub fn with_default_head_size(mut self, size: u64) -> Self {
        self.default_head_size = size;
        self
    }

    pub fn analyze(&self, query: &Query) -> Result<LogicalPlan> {
        let (plan, _) = self.analyze_pipeline(&query.pipeline)?;
        Ok(plan)
    }

    fn analyze_pipeline(&self, pipeline: &Pipeline) -> Result<(LogicalPlan, Scope)> {
        let (mut plan, mut scope) = self.analyze_source(&pipeline.source)?;
        for command in &pipeline.commands {
            debug!(command = command.name(), input_columns = scope.len(), "Analyzing command");
            (plan, scope) = self.analyze_command(command, plan, scope)?;
        }
        Ok((plan, scope))
    }

    fn analyze_source(&self, table: &TableRef) -> Result<(LogicalPlan, Scope)> {
        let schema = self.catalog.resolve_table(&table.name)?;
        let scope = Scope::from_table(&table.name, table.alias.as_deref(), &schema);
        let plan = LogicalPlan::Scan {
            table: table.name.clone(),
            alias: table.alias.clone(),
            schema,
        };
        Ok((plan, scope))
    }

    fn analyze_command(&self, command: &Command, plan: LogicalPlan, scope: Scope) -> Result<(LogicalPlan, Scope)> {
        match command {
            Command::Where { predicate } => {
                let (predicate, dt) = self.analyze_expr(predicate, &scope, Clause::Where)?;
                ensure_bool(&dt, "where predicate")?;
                let plan = LogicalPlan::Filter {
                    predicate,
                    input: Box::new(plan),
                };
                Ok((plan, scope))
            }
            Command::Stats { aggregations, group_by } => self.analyze_stats(aggregations, group_by, plan, &scope),
            Command::Eval { assignments } => self.analyze_eval(assignments, plan, scope),
            Command::Sort { keys } => {
                let mut sort_keys = Vec::with_capacity(keys.len());
                for key in keys {
                    let (expr, dt) = self.resolve_field(&key.field, &scope)?;
                    if !dt.is_orderable() {
                        return Err(AnalysisError::TypeMismatch(format!(
                            "cannot sort by {} of type {dt}",
                            key.field
                        ))
                        .into());
                    }
                    sort_keys.push(SortExpr {
                        expr,
                        asc: !key.desc,
                        nulls_first: !key.desc,
                    });
                }
                let plan = LogicalPlan::Sort {
                    keys: sort_keys,
                    input: Box::new(plan),
                };
                Ok((plan, scope))
            }
            Command::Head { size, offset } => {
                let fetch = to_usize(size.unwrap_or(self.default_head_size))?;
                let skip = to_usize(*offset)?;
                let plan = LogicalPlan::Limit {
                    skip,
                    fetch,
                    input: Box::new(plan),
                };
                Ok((plan, scope))
            }
            Command::Fields { exclude, fields } => {
                if *exclude {
                    self.analyze_fields_exclude(fields, plan, &scope)
                } else {
                    self.analyze_fields_include(fields, plan, &scope)
                }
            }
            Command::Rename { renames } => self.analyze_rename(renames, plan, scope),
            Command::Join(join) => self.analyze_join(join, plan, scope),
        }
    }

    fn analyze_stats(
        &self,
        aggregations: &[ast::AggTerm],
        group_by: &[FieldRef],
        plan: LogicalPlan,
        scope: &Scope,
    ) -> Result<(LogicalPlan, Scope)> {
        let mut group_exprs = Vec::with_capacity(group_by.len());
        let mut columns = Vec::with_capacity(group_by.len() + aggregations.len());

        for field in group_by {
            let (index, path) = scope.resolve(field)?;
            let (expr, dt) = self.field_path(scope, index, path, field)?;
            let source = scope.column(index);
            let column = if path.is_empty() {
                ScopeColumn {
                    field: Field::new(source.field.name.clone(), dt, source.field.nullable),
                    qualifiers: source.qualifiers.clone(),
                }
            } else {
                ScopeColumn::unqualified(Field::nullable(field.to_string(), dt))
            };
            group_exprs.push(expr);
            columns.push(column);
        }

        let mut aggr_exprs = Vec::with_capacity(aggregations.len());
        for term in aggregations {
            let call = match &term.expr {
                ast::Expr::FuncCall(call) if self.registry.is_aggregate(&call.name) => call,
                other => {
                    return Err(AnalysisError::InvalidAggregation(format!(
                        "stats expects an aggregate function call, found {other}"
                    ))
                    .into())
                }
            };
            let aggregate = self.analyze_aggregate(call, scope)?;
            let name = term.alias.clone().unwrap_or_else(|| term.expr.to_string());
            let nullable = !matches!(aggregate.func.as_str(), "count" | "dc" | "distinct_count");
            columns.push(ScopeColumn::unqualified(Field::new(
                name.clone(),
                aggregate.return_type.clone(),
                nullable,
            )));
            aggr_exprs.push((aggregate, name));
        }

        ensure_unique_names("stats", &columns)?;
        let scope = Scope::new(columns);
        let plan = LogicalPlan::Aggregate {
            group_exprs,
            aggr_exprs,
            input: Box::new(plan),
            schema: scope.schema(),
        };
        Ok((plan, scope))
    }

    fn analyze_aggregate(&self, call: &ast::FuncCall, scope: &Scope) -> Result<AggregateExpr> {
        let func = call.name.to_ascii_lowercase();
        if call.wildcard && func != "count" {
            return Err(AnalysisError::InvalidAggregation(format!("{func}(*) is not supported, only count(*)")).into());
        }

        let mut args = Vec::with_capacity(call.args.len());
        let mut arg_types = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            let (expr, dt) = self.analyze_expr(arg, scope, Clause::Stats)?;
            args.push(expr);
            arg_types.push(dt);
        }

        let signature = self.registry.lookup(&func, &arg_types)?;
        Ok(AggregateExpr {
            return_type: signature.return_type(&arg_types),
            func,
            args,
        })
    }

    /// Every assignment sees the columns produced by the ones before it.
    /// Assignments are batched into one projection until one reads a column
    /// computed in the current batch; that batch is then closed and the
    /// assignment starts a new projection stacked on top of it.
    fn analyze_eval(&self, assignments: &[ast::Assignment], plan: LogicalPlan, scope: Scope) -> Result<(LogicalPlan, Scope)> {
        let mut plan = plan;
        let mut current = scope;
        let mut exprs = passthrough(&current);
        let mut computed = vec![false; current.len()];

        for assignment in assignments {
            let (expr, dt) = self.analyze_expr(&assignment.expr, &current, Clause::Eval)?;
            // Indices into `current` are also indices into the closed batch's output
            if reads_any(&expr, &computed) {
                plan = projection(exprs, plan, &current);
                exprs = passthrough(&current);
                computed = vec![false; current.len()];
            }

            let field = Field::nullable(assignment.name.clone(), dt);
            match current.lookup(None, &assignment.name)? {
                Some(index) => {
                    exprs[index] = expr;
                    computed[index] = true;
                    current.replace_field(index, field);
                }
                None => {
                    exprs.push(expr);
                    computed.push(true);
                    current.push(ScopeColumn::unqualified(field));
                }
            }
        }

        let plan = projection(exprs, plan, &current);
        Ok((plan, current))
    }

    fn analyze_fields_include(&self, fields: &[FieldRef], plan: LogicalPlan, scope: &Scope) -> Result<(LogicalPlan, Scope)> {
        let mut exprs = Vec::with_capacity(fields.len());
        let mut columns = Vec::with_capacity(fields.len());
        let mut seen = HashSet::new();
        for field in fields {
            let (index, path) = scope.resolve(field)?;
            // Listing the same column twice keeps it once
            if !seen.insert((index, path)) {
                continue;
            }
            let (expr, dt) = self.field_path(scope, index, path, field)?;
            let column = if path.is_empty() {
                scope.column(index).clone()
            } else {
                ScopeColumn::unqualified(Field::nullable(field.to_string(), dt))
            };
            exprs.push((expr, column.field.name.clone()));
            columns.push(column);
        }
        ensure_unique_names("fields", &columns)?;

        let scope = Scope::new(columns);
        let plan = LogicalPlan::Projection {
            exprs,
            input: Box::new(plan),
            schema: scope.schema(),
        };
        Ok((plan, scope))
    }

    fn analyze_fields_exclude(&self, fields: &[FieldRef], plan: LogicalPlan, scope: &Scope) -> Result<(LogicalPlan, Scope)> {
        let mut excluded = HashSet::new();
        for field in fields {
            let (index, path) = scope.resolve(field)?;
            if !path.is_empty() {
                return Err(AnalyzeError::UnsupportedOperation(format!(
                    "cannot exclude nested field {field}"
                )));
            }
            excluded.insert(index);
        }
        if excluded.len() == scope.len() {
            return Err(AnalysisError::InvalidCommand {
                command: "fields",
                reason: "excluding every column leaves nothing to return".to_string(),
            }
            .into());
        }

        let kept: Vec<usize> = (0..scope.len()).filter(|i| !excluded.contains(i)).collect();
        let exprs = kept
            .iter()
            .map(|&i| (scope.column_expr(i), scope.column(i).field.name.clone()))
            .collect();
        let scope = Scope::new(kept.iter().map(|&i| scope.column(i).clone()).collect());
        let plan = LogicalPlan::Projection {
            exprs,
            input: Box::new(plan),
            schema: scope.schema(),
        };
        Ok((plan, scope))
    }

    fn analyze_rename(&self, renames: &[ast::Rename], plan: LogicalPlan, scope: Scope) -> Result<(LogicalPlan, Scope)> {
        let exprs = passthrough(&scope);
        let mut current = scope;

        for rename in renames {
            let (index, path) = current.resolve(&rename.field)?;
            if !path.is_empty() {
                return Err(AnalyzeError::UnsupportedOperation(format!(
                    "cannot rename nested field {}",
                    rename.field
                )));
            }
            let clash = current
                .columns()
                .iter()
                .enumerate()
                .any(|(i, c)| i != index && c.field.name == rename.alias);
            if clash {
                return Err(AnalysisError::InvalidCommand {
                    command: "rename",
                    reason: format!("{} as {}: a column named {} already exists", rename.field, rename.alias, rename.alias),
                }
                .into());
            }
            let field = current.column(index).field.clone().with_name(rename.alias.clone());
            current.replace_field(index, field);
        }

        let plan = projection(exprs, plan, &current);
        Ok((plan, current))
    }

    fn analyze_join(&self, join: &JoinCommand, plan: LogicalPlan, scope: Scope) -> Result<(LogicalPlan, Scope)> {
        let join_type = match join.join_type.unwrap_or(ast::JoinType::Inner) {
            ast::JoinType::Inner => JoinType::Inner,
            ast::JoinType::Left => JoinType::Left,
            ast::JoinType::Right => JoinType::Right,
            ast::JoinType::Full => JoinType::Full,
            ast::JoinType::Semi => JoinType::Semi,
            ast::JoinType::Anti => JoinType::Anti,
            ast::JoinType::Cross => JoinType::Cross,
        };

        let (right_plan, right_scope) = match &join.right {
            JoinRight::Table(table) => self.analyze_source(table)?,
            JoinRight::SubQuery { pipeline, alias } => {
                let (inner, inner_scope) = self.analyze_pipeline(pipeline)?;
                match alias {
                    Some(alias) => {
                        let plan = LogicalPlan::SubqueryAlias {
                            alias: alias.clone(),
                            input: Box::new(inner),
                        };
                        (plan, inner_scope.requalify(alias))
                    }
                    None => (inner, inner_scope.anonymous()),
                }
            }
        };

        let left_scope = match &join.left_alias {
            Some(alias) => scope.with_qualifier(alias),
            None => scope,
        };
        let right_scope = match &join.right_alias {
            Some(alias) => right_scope.with_qualifier(alias),
            None => right_scope,
        };
        let combined = Scope::join(left_scope.clone(), right_scope);

        let on = match &join.condition {
            Some(_) if join_type == JoinType::Cross => {
                return Err(AnalyzeError::UnsupportedOperation(
                    "cross join does not take an ON condition".to_string(),
                ))
            }
            Some(condition) => {
                let (expr, dt) = self.analyze_expr(condition, &combined, Clause::JoinOn)?;
                ensure_bool(&dt, "join condition")?;
                Some(expr)
            }
            None => None,
        };

        let scope = if join_type.emits_right_columns() {
            combined
        } else {
            left_scope
        };
        let plan = LogicalPlan::Join {
            left: Box::new(plan),
            right: Box::new(right_plan),
            join_type,
            on,
            schema: scope.schema(),
        };
        Ok((plan, scope))
    }

    fn resolve_field(&self, field: &FieldRef, scope: &Scope) -> Result<(Expr, DataType)> {
        let (index, path) = scope.resolve(field)?;
        self.field_path(scope, index, path, field)
    }

    /// Column `index` followed by struct member access along `path`
    fn field_path(&self, scope: &Scope, index: usize, path: &[String], field: &FieldRef) -> Result<(Expr, DataType)> {
        let mut expr = scope.column_expr(index);
        let mut dt = scope.column(index).field.data_type.clone();
        for member in path {
            let member_type = match &dt {
                DataType::Struct(fields) => fields.iter().find(|f| &f.name == member).map(|f| f.data_type.clone()),
                _ => None,
            };
            let member_type = member_type.ok_or_else(|| AnalysisError::UnresolvedColumn(field.to_string()))?;
            expr = Expr::FieldAccess {
                expr: Box::new(expr),
                field: member.clone(),
                data_type: member_type.clone(),
            };
            dt = member_type;
        }
        Ok((expr, dt))
    }

    fn analyze_subquery(&self, pipeline: &Pipeline, clause: Clause) -> Result<LogicalPlan> {
        if clause == Clause::JoinOn {
            return Err(AnalyzeError::UnsupportedOperation(
                "subqueries are not supported in join conditions".to_string(),
            ));
        }
        let (plan, _) = self.analyze_pipeline(pipeline)?;
        Ok(plan)
    }

    /// Single output column type of a subquery used as a value
    fn single_column_type(plan: &LogicalPlan, kind: &str) -> Result<DataType> {
        let schema = plan.schema();
        match schema.fields.as_slice() {
            [field] => Ok(field.data_type.clone()),
            fields => Err(AnalysisError::TypeMismatch(format!(
                "{kind} subquery must return exactly one column, got {}",
                fields.len()
            ))
            .into()),
        }
    }

    fn analyze_expr(&self, expr: &ast::Expr, scope: &Scope, clause: Clause) -> Result<(Expr, DataType)> {
        match expr {
            ast::Expr::Literal(literal) => {
                let value = match literal {
                    ast::Literal::Null => Value::Null,
                    ast::Literal::Bool(b) => Value::Bool(*b),
                    ast::Literal::Int(i) => Value::Int(*i),
                    ast::Literal::Float(f) => Value::Float(*f),
                    ast::Literal::String(s) => Value::String(s.clone()),
                };
                let dt = value.data_type();
                Ok((Expr::literal(value), dt))
            }
            ast::Expr::Field(field) => self.resolve_field(field, scope),
            ast::Expr::BinaryOp { op, left, right } => {
                let (left, ldt) = self.analyze_expr(left, scope, clause)?;
                let (right, rdt) = self.analyze_expr(right, scope, clause)?;
                let op = convert_op(*op);
                if op.is_logical() {
                    ensure_bool(&ldt, &format!("left operand of {}", op.symbol()))?;
                    ensure_bool(&rdt, &format!("right operand of {}", op.symbol()))?;
                    return Ok((binary(op, left, right, DataType::Bool), DataType::Bool));
                }
                if op.is_comparison() {
                    let (left, right) = coerce_for_compare(left, ldt, right, rdt)?;
                    return Ok((binary(op, left, right, DataType::Bool), DataType::Bool));
                }
                let (left, right, dt) = coerce_for_arith(op, left, ldt, right, rdt)?;
                Ok((binary(op, left, right, dt.clone()), dt))
            }
            ast::Expr::UnaryOp { op: ast::UnOp::Not, expr } => {
                let (expr, dt) = self.analyze_expr(expr, scope, clause)?;
                ensure_bool(&dt, "operand of not")?;
                Ok((Expr::Not { expr: Box::new(expr) }, DataType::Bool))
            }
            ast::Expr::UnaryOp { op: ast::UnOp::Neg, expr } => {
                let (expr, dt) = self.analyze_expr(expr, scope, clause)?;
                if !dt.is_numeric() && dt != DataType::Null {
                    return Err(AnalysisError::TypeMismatch(format!("cannot negate a value of type {dt}")).into());
                }
                Ok((Expr::Negative { expr: Box::new(expr) }, dt))
            }
            ast::Expr::Between { expr, low, high, negated } => {
                let (expr, dt) = self.analyze_expr(expr, scope, clause)?;
                let (low, low_dt) = self.analyze_expr(low, scope, clause)?;
                let (high, high_dt) = self.analyze_expr(high, scope, clause)?;
                let target = comparison_type(&dt, &low_dt)
                    .and_then(|t| comparison_type(&t, &high_dt))
                    .ok_or_else(|| {
                        AnalysisError::TypeMismatch(format!("cannot compare {dt} between {low_dt} and {high_dt}"))
                    })?;
                Ok((
                    Expr::Between {
                        expr: Box::new(coerce(expr, &dt, &target)?),
                        low: Box::new(coerce(low, &low_dt, &target)?),
                        high: Box::new(coerce(high, &high_dt, &target)?),
                        negated: *negated,
                    },
                    DataType::Bool,
                ))
            }
            ast::Expr::Like { expr, pattern, negated } => {
                let (expr, dt) = self.analyze_expr(expr, scope, clause)?;
                let (pattern, pattern_dt) = self.analyze_expr(pattern, scope, clause)?;
                for (what, t) in [("like operand", &dt), ("like pattern", &pattern_dt)] {
                    if !matches!(t, DataType::String | DataType::Null) {
                        return Err(AnalysisError::TypeMismatch(format!("{what} must be a string, got {t}")).into());
                    }
                }
                Ok((
                    Expr::Like {
                        expr: Box::new(expr),
                        pattern: Box::new(pattern),
                        negated: *negated,
                    },
                    DataType::Bool,
                ))
            }
            ast::Expr::InList { expr, list, negated } => {
                let (expr, dt) = self.analyze_expr(expr, scope, clause)?;
                let mut items = Vec::with_capacity(list.len());
                let mut target = dt.clone();
                for item in list {
                    let (item, item_dt) = self.analyze_expr(item, scope, clause)?;
                    target = comparison_type(&target, &item_dt).ok_or_else(|| {
                        AnalysisError::TypeMismatch(format!("cannot compare {dt} with list item of type {item_dt}"))
                    })?;
                    items.push((item, item_dt));
                }
                let list = items
                    .into_iter()
                    .map(|(item, item_dt)| coerce(item, &item_dt, &target))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok((
                    Expr::InList {
                        expr: Box::new(coerce(expr, &dt, &target)?),
                        list,
                        negated: *negated,
                    },
                    DataType::Bool,
                ))
            }
            ast::Expr::InSubQuery { expr, subquery, negated } => {
                let (expr, dt) = self.analyze_expr(expr, scope, clause)?;
                let plan = self.analyze_subquery(subquery, clause)?;
                let column_dt = Self::single_column_type(&plan, "in")?;
                let target = comparison_type(&dt, &column_dt).ok_or_else(|| {
                    AnalysisError::TypeMismatch(format!("cannot compare {dt} with subquery column of type {column_dt}"))
                })?;
                Ok((
                    Expr::InSubquery {
                        expr: Box::new(coerce(expr, &dt, &target)?),
                        subquery: Box::new(plan),
                        negated: *negated,
                    },
                    DataType::Bool,
                ))
            }
            ast::Expr::Exists { subquery, negated } => {
                let plan = self.analyze_subquery(subquery, clause)?;
                Ok((
                    Expr::Exists {
                        subquery: Box::new(plan),
                        negated: *negated,
                    },
                    DataType::Bool,
                ))
            }
            ast::Expr::IsNull { expr, negated } => {
                let (expr, _) = self.analyze_expr(expr, scope, clause)?;
                Ok((
                    Expr::IsNull {
                        expr: Box::new(expr),
                        negated: *negated,
                    },
                    DataType::Bool,
                ))
            }
            ast::Expr::FuncCall(call) => self.analyze_scalar_call(call, scope, clause),
            ast::Expr::ScalarSubQuery(subquery) => {
                let plan = self.analyze_subquery(subquery, clause)?;
                let dt = Self::single_column_type(&plan, "scalar")?;
                Ok((
                    Expr::ScalarSubquery {
                        subquery: Box::new(plan),
                    },
                    dt,
                ))
            }
            ast::Expr::Interval { value, unit } => {
                let value = Value::Interval {
                    value: *value,
                    unit: convert_unit(*unit),
                };
                Ok((Expr::literal(value), DataType::Interval))
            }
        }
    }

    fn analyze_scalar_call(&self, call: &ast::FuncCall, scope: &Scope, clause: Clause) -> Result<(Expr, DataType)> {
        if self.registry.is_aggregate(&call.name) {
            let context = if clause == Clause::Stats {
                "cannot be nested inside another aggregate"
            } else {
                "is only allowed in stats"
            };
            return Err(AnalysisError::InvalidAggregation(format!("{call} {context}")).into());
        }
        if !self.registry.contains(&call.name) {
            return Err(AnalysisError::UnknownFunction(call.name.clone()).into());
        }
        if call.wildcard {
            return Err(AnalysisError::TypeMismatch(format!("{call}: * is only valid in count(*)")).into());
        }

        let func = call.name.to_ascii_lowercase();
        let mut args = Vec::with_capacity(call.args.len());
        let mut arg_types = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            let (expr, dt) = self.analyze_expr(arg, scope, clause)?;
            args.push(expr);
            arg_types.push(dt);
        }

        // date('...') and timestamp('...') fail at analysis time on bad literals
        if let ("date" | "timestamp", [Expr::Literal { value: Value::String(text) }]) = (func.as_str(), args.as_slice()) {
            let target = if func == "date" { DataType::Date } else { DataType::Timestamp };
            validate_string_literal(text, &target)?;
        }

        let signature = self.registry.lookup(&func, &arg_types)?;
        let return_type = signature.return_type(&arg_types);
        Ok((
            Expr::ScalarFunction {
                func,
                args,
                return_type: return_type.clone(),
            },
            return_type,
        ))
    }
}

fn to_usize(value: u64) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| AnalysisError::InvalidLiteral(format!("head argument {value} is out of range")).into())
}

fn binary(op: BinOp, left: Expr, right: Expr, data_type: DataType) -> Expr {
    Expr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
        data_type,
    }
}

fn convert_op(op: ast::BinOp) -> BinOp {
    match op {
        ast::BinOp::Add => BinOp::Add,
        ast::BinOp::Sub => BinOp::Sub,
        ast::BinOp::Mul => BinOp::Mul,
        ast::BinOp::Div => BinOp::Div,
        ast::BinOp::Mod => BinOp::Mod,
        ast::BinOp::Eq => BinOp::Eq,
        ast::BinOp::Ne => BinOp::Ne,
        ast::BinOp::Lt => BinOp::Lt,
        ast::BinOp::Le => BinOp::Le,
        ast::BinOp::Gt => BinOp::Gt,
        ast::BinOp::Ge => BinOp::Ge,
        ast::BinOp::And => BinOp::And,
        ast::BinOp::Or => BinOp::Or,
    }
}

fn convert_unit(unit: ast::IntervalUnit) -> IntervalUnit {
    match unit {
        ast::IntervalUnit::Microsecond => IntervalUnit::Microsecond,
        ast::IntervalUnit::Second => IntervalUnit::Second,
        ast::IntervalUnit::Minute => IntervalUnit::Minute,
        ast::IntervalUnit::Hour => IntervalUnit::Hour,
        ast::IntervalUnit::Day => IntervalUnit::Day,
        ast::IntervalUnit::Week => IntervalUnit::Week,
        ast::IntervalUnit::Month => IntervalUnit::Month,
        ast::IntervalUnit::Quarter => IntervalUnit::Quarter,
        ast::IntervalUnit::Year => IntervalUnit::Year,
    }
}

/// Column references reading every column of `scope` unchanged
fn passthrough(scope: &Scope) -> Vec<Expr> {
    (0..scope.len()).map(|i| scope.column_expr(i)).collect()
}

/// Projection of `exprs`, named after the columns of `scope`
fn projection(exprs: Vec<Expr>, input: LogicalPlan, scope: &Scope) -> LogicalPlan {
    let named = exprs
        .into_iter()
        .zip(scope.columns())
        .map(|(expr, column)| (expr, column.field.name.clone()))
        .collect();
    LogicalPlan::Projection {
        exprs: named,
        input: Box::new(input),
        schema: scope.schema(),
    }
}

fn ensure_unique_names(command: &'static str, columns: &[ScopeColumn]) -> Result<()> {
    let mut names = HashSet::new();
    for column in columns {
        if !names.insert(column.field.name.as_str()) {
            return Err(AnalysisError::DuplicateColumn {
                command,
                name: column.field.name.clone(),
            }
            .into());
        }
    }
    Ok(())
}

/// Whether `expr` reads a column flagged in `columns`. Subquery plans have
/// their own scope and are not inspected.
fn reads_any(expr: &Expr, columns: &[bool]) -> bool {
    let reads = |e: &Expr| reads_any(e, columns);
    match expr {
        Expr::Column { index, .. } => columns.get(*index).copied().unwrap_or(false),
        Expr::Literal { .. } | Expr::ScalarSubquery { .. } | Expr::Exists { .. } => false,
        Expr::BinaryOp { left, right, .. } => reads(left) || reads(right),
        Expr::Not { expr }
        | Expr::Negative { expr }
        | Expr::IsNull { expr, .. }
        | Expr::FieldAccess { expr, .. }
        | Expr::Cast { expr, .. }
        | Expr::InSubquery { expr, .. } => reads(expr),
        Expr::Between { expr, low, high, .. } => reads(expr) || reads(low) || reads(high),
        Expr::Like { expr, pattern, .. } => reads(expr) || reads(pattern),
        Expr::InList { expr, list, .. } => reads(expr) || list.iter().any(reads),
        Expr::ScalarFunction { args, .. } => args.iter().any(reads),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppl_ast::parse;
    use ppl_plan::{InMemoryCatalog, Schema};

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new().with_table(
            "orders",
            Schema::new(vec![
                Field::nullable("status", DataType::String),
                Field::nullable("region", DataType::String),
                Field::nullable("amount", DataType::Float64),
                Field::nullable("qty", DataType::Int32),
                Field::nullable("placed", DataType::Date),
            ]),
        )
    }

    fn analyze(query: &str) -> Result<LogicalPlan> {
        let catalog = catalog();
        let registry = FunctionRegistry::default();
        Analyzer::new(&catalog, &registry).analyze(&parse(query).unwrap())
    }

    #[test]
    fn test_eval_chains_and_replaces() {
        let plan = analyze("source = orders | eval qty = qty * 2, total = amount * qty").unwrap();
        let LogicalPlan::Projection { exprs, schema, input } = &plan else {
            panic!("expected projection, got {}", plan.name());
        };
        assert_eq!(schema.names(), vec!["status", "region", "amount", "qty", "placed", "total"]);
        assert_eq!(schema.fields[3].data_type, DataType::Int64);
        // total reads the rewritten qty from the projection below
        assert_eq!(exprs[5].0.to_string(), "(amount#2 * CAST(qty#3 AS double))");

        let LogicalPlan::Projection { exprs, input, .. } = input.as_ref() else {
            panic!("expected stacked projection");
        };
        assert_eq!(exprs[3].0.to_string(), "(CAST(qty#3 AS long) * 2)");
        assert!(matches!(input.as_ref(), LogicalPlan::Scan { .. }));
    }

    #[test]
    fn test_independent_assignments_share_one_projection() {
        let plan = analyze("source = orders | eval double_amount = amount * 2, next_qty = qty + 1").unwrap();
        let LogicalPlan::Projection { input, schema, .. } = &plan else {
            panic!("expected projection");
        };
        assert_eq!(schema.len(), 7);
        assert!(matches!(input.as_ref(), LogicalPlan::Scan { .. }));
    }

    fn chained_eval(steps: usize) -> String {
        let mut assignments = vec!["a0 = amount + amount".to_string()];
        for i in 1..steps {
            assignments.push(format!("a{i} = a{prev} + a{prev}", prev = i - 1));
        }
        format!("source = orders | eval {}", assignments.join(", "))
    }

    #[test]
    fn test_chained_eval_does_not_copy_expressions() {
        let plan = analyze(&chained_eval(24)).unwrap();

        let mut depth = 0;
        let mut node = &plan;
        while let LogicalPlan::Projection { input, .. } = node {
            depth += 1;
            node = input.as_ref();
        }
        assert_eq!(depth, 24);

        let LogicalPlan::Projection { exprs, .. } = &plan else {
            panic!("expected projection");
        };
        assert_eq!(exprs.last().unwrap().0.to_string(), "(a22#27 + a22#27)");

        // Doubling the chain must not square the plan
        let short = serde_json::to_string(&analyze(&chained_eval(12)).unwrap()).unwrap().len();
        let long = serde_json::to_string(&plan).unwrap().len();
        assert!(long < 4 * short, "plan grew from {short} to {long} bytes");
    }

    #[test]
    fn test_duplicate_output_names() {
        let err = analyze("source = orders | stats count(), count()").unwrap_err();
        assert_eq!(
            err,
            AnalyzeError::Analysis(AnalysisError::DuplicateColumn {
                command: "stats",
                name: "count()".to_string(),
            })
        );

        let err = analyze("source = orders | stats count() as region by region").unwrap_err();
        assert!(matches!(
            err,
            AnalyzeError::Analysis(AnalysisError::DuplicateColumn { command: "stats", ref name }) if name == "region"
        ));

        let plan = analyze("source = orders | fields qty, qty, orders.qty").unwrap();
        assert_eq!(plan.schema().names(), vec!["qty"]);
    }

    #[test]
    fn test_head_default_and_override() {
        let catalog = catalog();
        let registry = FunctionRegistry::default();
        let query = parse("source = orders | head").unwrap();

        let plan = Analyzer::new(&catalog, &registry).analyze(&query).unwrap();
        assert!(matches!(plan, LogicalPlan::Limit { fetch: 10, skip: 0, .. }));

        let plan = Analyzer::new(&catalog, &registry)
            .with_default_head_size(3)
            .analyze(&query)
            .unwrap();
        assert!(matches!(plan, LogicalPlan::Limit { fetch: 3, .. }));
    }

    #[test]
    fn test_aggregate_outside_stats() {
        let err = analyze("source = orders | where count() > 1").unwrap_err();
        assert!(matches!(err, AnalyzeError::Analysis(AnalysisError::InvalidAggregation(_))));

        let err = analyze("source = orders | stats sum(count())").unwrap_err();
        assert!(matches!(err, AnalyzeError::Analysis(AnalysisError::InvalidAggregation(_))));

        let err = analyze("source = orders | stats amount").unwrap_err();
        assert!(matches!(err, AnalyzeError::Analysis(AnalysisError::InvalidAggregation(_))));
    }

    #[test]
    fn test_where_must_be_boolean() {
        let err = analyze("source = orders | where amount + 1").unwrap_err();
        assert!(matches!(err, AnalyzeError::Analysis(AnalysisError::TypeMismatch(_))));
    }

    #[test]
    fn test_date_literal_validation() {
        assert!(analyze("source = orders | where placed > '2024-01-31'").is_ok());
        let err = analyze("source = orders | where placed > '2024-13-01'").unwrap_err();
        assert!(matches!(err, AnalyzeError::Analysis(AnalysisError::InvalidLiteral(_))));

        let err = analyze("source = orders | where placed > date('not a date')").unwrap_err();
        assert!(matches!(err, AnalyzeError::Analysis(AnalysisError::InvalidLiteral(_))));
    }

    #[test]
    fn test_like_requires_strings() {
        assert!(analyze("source = orders | where status like 'sh%'").is_ok());
        let err = analyze("source = orders | where qty like '1%'").unwrap_err();
        assert!(matches!(err, AnalyzeError::Analysis(AnalysisError::TypeMismatch(_))));
    }

    #[test]
    fn test_unknown_function() {
        let err = analyze("source = orders | eval x = frobnicate(qty)").unwrap_err();
        assert_eq!(
            err,
            AnalyzeError::Analysis(AnalysisError::UnknownFunction("frobnicate".to_string()))
        );
    }

    #[test]
    fn test_rename_collision() {
        let err = analyze("source = orders | rename status as region").unwrap_err();
        assert!(matches!(
            err,
            AnalyzeError::Analysis(AnalysisError::InvalidCommand { command: "rename", .. })
        ));
    }
}
