//! Pest-based parser for PPL

use pest::error::LineColLocation;
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use crate::ast::*;

#[derive(Parser)]
#[grammar = "ppl.pest"]
pub struct PplParser;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Pest error: {0}")]
    Pest(Box<pest::error::Error<Rule>>),
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        ParseError::Pest(Box::new(err))
    }
}

impl ParseError {
    fn at(pair: &Pair<'_, Rule>, message: impl Into<String>) -> Self {
        let (line, column) = pair.as_span().start_pos().line_col();
        ParseError::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    /// 1-based line and column of the offending token
    pub fn position(&self) -> (usize, usize) {
        match self {
            ParseError::Syntax { line, column, .. } => (*line, *column),
            ParseError::Pest(err) => match err.line_col {
                LineColLocation::Pos(pos) => pos,
                LineColLocation::Span(start, _) => start,
            },
        }
    }
}

type ParseResult<T> = Result<T, ParseError>;

/// Inner pairs of a rule, remembering where the rule started for errors
struct Children<'i> {
    pairs: Pairs<'i, Rule>,
    line: usize,
    column: usize,
}

impl<'i> Children<'i> {
    fn of(pair: Pair<'i, Rule>) -> Self {
        let (line, column) = pair.as_span().start_pos().line_col();
        Self {
            pairs: pair.into_inner(),
            line,
            column,
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn next_child(&mut self) -> ParseResult<Pair<'i, Rule>> {
        match self.pairs.next() {
            Some(pair) => Ok(pair),
            None => Err(self.error("Unexpected end of input")),
        }
    }

    /// Next child matching `rule`; keyword pairs before it are skipped
    fn expect(&mut self, rule: Rule) -> ParseResult<Pair<'i, Rule>> {
        match self.find(rule) {
            Some(pair) => Ok(pair),
            None => Err(self.error(format!("Expected {rule:?}"))),
        }
    }

    fn find(&mut self, rule: Rule) -> Option<Pair<'i, Rule>> {
        self.pairs.find(|p| p.as_rule() == rule)
    }
}

impl<'i> Iterator for Children<'i> {
    type Item = Pair<'i, Rule>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pairs.next()
    }
}

/// Parse PPL query text into AST
pub fn parse(source: &str) -> ParseResult<Query> {
    let mut pairs = PplParser::parse(Rule::query, source)?;
    let query = pairs.next().ok_or_else(|| ParseError::Syntax {
        line: 1,
        column: 1,
        message: "Empty input".to_string(),
    })?;

    let pipeline = Children::of(query).expect(Rule::pipeline)?;
    Ok(Query {
        pipeline: parse_pipeline(pipeline)?,
    })
}

/// Parse a standalone expression, e.g. `a + b * 2 > 10`
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let mut pairs = PplParser::parse(Rule::expression, source)?;
    let expression = pairs.next().ok_or_else(|| ParseError::Syntax {
        line: 1,
        column: 1,
        message: "Empty input".to_string(),
    })?;

    parse_expr(Children::of(expression).expect(Rule::expr)?)
}

fn parse_pipeline(pair: Pair<Rule>) -> ParseResult<Pipeline> {
    let mut children = Children::of(pair);
    let source_cmd = children.expect(Rule::source_cmd)?;
    let source = parse_table_ref(Children::of(source_cmd).expect(Rule::table_ref)?)?;

    let mut commands = Vec::new();
    for command in children.filter(|p| p.as_rule() == Rule::command) {
        let body = Children::of(command).next_child()?;
        commands.push(parse_command(body)?);
    }

    Ok(Pipeline { source, commands })
}

fn parse_table_ref(pair: Pair<Rule>) -> ParseResult<TableRef> {
    let mut children = Children::of(pair);
    let name = unquote_ident(children.expect(Rule::table_name)?.as_str());
    let alias = children.find(Rule::ident).map(|p| unquote_ident(p.as_str()));
    Ok(TableRef { name, alias })
}

fn parse_subquery(pair: Pair<Rule>) -> ParseResult<Pipeline> {
    parse_pipeline(Children::of(pair).expect(Rule::pipeline)?)
}

fn parse_command(pair: Pair<Rule>) -> ParseResult<Command> {
    match pair.as_rule() {
        Rule::where_cmd => {
            let predicate = parse_expr(Children::of(pair).expect(Rule::expr)?)?;
            Ok(Command::Where { predicate })
        }
        Rule::stats_cmd => {
            let mut aggregations = Vec::new();
            let mut group_by = Vec::new();
            for child in pair.into_inner() {
                match child.as_rule() {
                    Rule::agg_term => aggregations.push(parse_agg_term(child)?),
                    Rule::field_ref => group_by.push(parse_field_ref(child)),
                    _ => {}
                }
            }
            Ok(Command::Stats {
                aggregations,
                group_by,
            })
        }
        Rule::eval_cmd => {
            let assignments = pair
                .into_inner()
                .filter(|p| p.as_rule() == Rule::assignment)
                .map(parse_assignment)
                .collect::<ParseResult<Vec<_>>>()?;
            Ok(Command::Eval { assignments })
        }
        Rule::sort_cmd => {
            let keys = pair
                .into_inner()
                .filter(|p| p.as_rule() == Rule::sort_key)
                .map(parse_sort_key)
                .collect();
            Ok(Command::Sort { keys })
        }
        Rule::head_cmd => parse_head(pair),
        Rule::fields_cmd => {
            let mut exclude = false;
            let mut fields = Vec::new();
            for child in pair.into_inner() {
                match child.as_rule() {
                    Rule::fields_sign => exclude = child.as_str() == "-",
                    Rule::field_ref => fields.push(parse_field_ref(child)),
                    _ => {}
                }
            }
            Ok(Command::Fields { exclude, fields })
        }
        Rule::rename_cmd => {
            let renames = pair
                .into_inner()
                .filter(|p| p.as_rule() == Rule::rename_pair)
                .map(parse_rename)
                .collect::<ParseResult<Vec<_>>>()?;
            Ok(Command::Rename { renames })
        }
        Rule::join_cmd => Ok(Command::Join(Box::new(parse_join(pair)?))),
        other => Err(ParseError::at(&pair, format!("Unknown command: {other:?}"))),
    }
}

fn parse_agg_term(pair: Pair<Rule>) -> ParseResult<AggTerm> {
    let mut children = Children::of(pair);
    let expr = parse_expr(children.expect(Rule::expr)?)?;
    let alias = children.find(Rule::ident).map(|p| unquote_ident(p.as_str()));
    Ok(AggTerm { expr, alias })
}

fn parse_assignment(pair: Pair<Rule>) -> ParseResult<Assignment> {
    let mut children = Children::of(pair);
    let name = unquote_ident(children.expect(Rule::ident)?.as_str());
    let expr = parse_expr(children.expect(Rule::expr)?)?;
    Ok(Assignment { name, expr })
}

fn parse_sort_key(pair: Pair<Rule>) -> SortKey {
    let mut desc = false;
    let mut field = FieldRef { parts: Vec::new() };
    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::sort_sign => desc = child.as_str() == "-",
            Rule::field_ref => field = parse_field_ref(child),
            _ => {}
        }
    }
    SortKey { field, desc }
}

fn parse_head(pair: Pair<Rule>) -> ParseResult<Command> {
    let mut size = None;
    let mut offset = 0;
    let mut after_from = false;
    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::kw_from => after_from = true,
            Rule::integer => {
                let value = child
                    .as_str()
                    .parse::<u64>()
                    .map_err(|_| ParseError::at(&child, format!("Integer out of range: {}", child.as_str())))?;
                if after_from {
                    offset = value;
                } else {
                    size = Some(value);
                }
            }
            _ => {}
        }
    }
    Ok(Command::Head { size, offset })
}

fn parse_rename(pair: Pair<Rule>) -> ParseResult<Rename> {
    let mut children = Children::of(pair);
    let field = parse_field_ref(children.expect(Rule::field_ref)?);
    let alias = unquote_ident(children.expect(Rule::ident)?.as_str());
    Ok(Rename { field, alias })
}

fn parse_join(pair: Pair<Rule>) -> ParseResult<JoinCommand> {
    let mut children = Children::of(pair);
    let mut join_type = None;
    let mut left_alias = None;
    let mut right_alias = None;
    let mut condition = None;
    let mut right = None;

    for child in children.by_ref() {
        match child.as_rule() {
            Rule::join_type => {
                if join_type.is_some() {
                    return Err(ParseError::at(&child, "Join type given twice"));
                }
                join_type = Some(parse_join_type(child)?);
            }
            Rule::side_alias => {
                let mut side = Children::of(child.clone());
                let keyword = side.next_child()?;
                let alias = unquote_ident(side.expect(Rule::ident)?.as_str());
                let slot = if keyword.as_rule() == Rule::kw_left {
                    &mut left_alias
                } else {
                    &mut right_alias
                };
                if slot.is_some() {
                    return Err(ParseError::at(&child, format!("Duplicate join side alias: {}", child.as_str())));
                }
                *slot = Some(alias);
            }
            Rule::join_condition => {
                condition = Some(parse_expr(Children::of(child).expect(Rule::expr)?)?);
            }
            Rule::join_right => right = Some(parse_join_right(child)?),
            _ => {}
        }
    }

    let right = right.ok_or_else(|| children.error("Join is missing its right side"))?;
    Ok(JoinCommand {
        join_type,
        left_alias,
        right_alias,
        condition,
        right,
    })
}

fn parse_join_type(pair: Pair<Rule>) -> ParseResult<JoinType> {
    let keywords: Vec<Rule> = pair
        .clone()
        .into_inner()
        .map(|p| p.as_rule())
        .filter(|rule| *rule != Rule::kw_outer)
        .collect();

    match keywords.as_slice() {
        [Rule::kw_inner] => Ok(JoinType::Inner),
        [Rule::kw_left] => Ok(JoinType::Left),
        [Rule::kw_right] => Ok(JoinType::Right),
        [Rule::kw_full] => Ok(JoinType::Full),
        [Rule::kw_cross] => Ok(JoinType::Cross),
        [Rule::kw_semi] | [Rule::kw_left, Rule::kw_semi] => Ok(JoinType::Semi),
        [Rule::kw_anti] | [Rule::kw_left, Rule::kw_anti] => Ok(JoinType::Anti),
        _ => Err(ParseError::at(&pair, format!("Invalid join type: {}", pair.as_str()))),
    }
}

fn parse_join_right(pair: Pair<Rule>) -> ParseResult<JoinRight> {
    let mut children = Children::of(pair);
    let first = children.next_child()?;
    match first.as_rule() {
        Rule::subquery => {
            let pipeline = parse_subquery(first)?;
            let alias = children.find(Rule::ident).map(|p| unquote_ident(p.as_str()));
            Ok(JoinRight::SubQuery {
                pipeline: Box::new(pipeline),
                alias,
            })
        }
        Rule::table_ref => Ok(JoinRight::Table(parse_table_ref(first)?)),
        other => Err(ParseError::at(&first, format!("Invalid join source: {other:?}"))),
    }
}

fn parse_expr(pair: Pair<Rule>) -> ParseResult<Expr> {
    match pair.as_rule() {
        Rule::expr => parse_expr(Children::of(pair).next_child()?),
        Rule::or_expr => fold_logical(pair, Rule::and_expr, BinOp::Or),
        Rule::and_expr => fold_logical(pair, Rule::not_expr, BinOp::And),
        Rule::not_expr => {
            let mut children = Children::of(pair);
            let first = children.next_child()?;
            if first.as_rule() == Rule::kw_not {
                match parse_expr(children.expect(Rule::not_expr)?)? {
                    Expr::Exists { subquery, negated } => Ok(Expr::Exists {
                        subquery,
                        negated: !negated,
                    }),
                    operand => Ok(Expr::UnaryOp {
                        op: UnOp::Not,
                        expr: Box::new(operand),
                    }),
                }
            } else {
                parse_expr(first)
            }
        }
        Rule::predicate => parse_predicate(pair),
        Rule::add_expr | Rule::mul_expr => parse_arithmetic(pair),
        Rule::unary_expr => {
            let mut children = Children::of(pair);
            let first = children.next_child()?;
            if first.as_rule() != Rule::neg_op {
                return parse_expr(first);
            }
            // Negative numeric literals fold into the literal itself
            match parse_expr(children.expect(Rule::unary_expr)?)? {
                Expr::Literal(Literal::Int(v)) => Ok(Expr::Literal(Literal::Int(-v))),
                Expr::Literal(Literal::Float(v)) => Ok(Expr::Literal(Literal::Float(-v))),
                operand => Ok(Expr::UnaryOp {
                    op: UnOp::Neg,
                    expr: Box::new(operand),
                }),
            }
        }
        Rule::primary => parse_primary(pair),
        other => Err(ParseError::at(&pair, format!("Cannot parse expr: {other:?}"))),
    }
}

fn fold_logical(pair: Pair<Rule>, operand: Rule, op: BinOp) -> ParseResult<Expr> {
    let mut children = Children::of(pair);
    let mut left = parse_expr(children.expect(operand)?)?;
    while let Some(next) = children.find(operand) {
        left = Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(parse_expr(next)?),
        };
    }
    Ok(left)
}

/// Pest yields a flat `term (op term)*` sequence; fold it left-associatively
fn parse_arithmetic(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut children = Children::of(pair);
    let mut left = parse_expr(children.next_child()?)?;

    while let Some(op_pair) = children.next() {
        let op = match op_pair.as_str() {
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            "%" => BinOp::Mod,
            other => return Err(ParseError::at(&op_pair, format!("Unknown operator: {other}"))),
        };
        let right = parse_expr(children.next_child()?)?;
        left = Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    }

    Ok(left)
}

fn parse_predicate(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut children = Children::of(pair);
    let left = parse_expr(children.expect(Rule::add_expr)?)?;
    match children.find(Rule::predicate_tail) {
        Some(tail) => parse_predicate_tail(left, tail),
        None => Ok(left),
    }
}

fn parse_predicate_tail(left: Expr, pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut children = Children::of(pair);
    let expr = Box::new(left);
    let mut negated = false;
    let mut comparison = None;
    let mut keyword = None;
    let mut operands = Vec::new();
    let mut subquery = None;

    for child in children.by_ref() {
        match child.as_rule() {
            Rule::negation => negated = true,
            Rule::cmp_op => comparison = Some(parse_cmp_op(&child)?),
            Rule::kw_between | Rule::kw_like | Rule::kw_in | Rule::kw_is => keyword = Some(child.as_rule()),
            Rule::add_expr | Rule::expr => operands.push(parse_expr(child)?),
            Rule::subquery => subquery = Some(Box::new(parse_subquery(child)?)),
            _ => {}
        }
    }

    if let Some(op) = comparison {
        let right = operands.pop().ok_or_else(|| children.error("Missing right operand"))?;
        return Ok(Expr::BinaryOp {
            op,
            left: expr,
            right: Box::new(right),
        });
    }

    match keyword {
        Some(Rule::kw_between) => {
            let [low, high] = <[Expr; 2]>::try_from(operands)
                .map_err(|_| children.error("BETWEEN needs a lower and an upper bound"))?;
            Ok(Expr::Between {
                expr,
                low: Box::new(low),
                high: Box::new(high),
                negated,
            })
        }
        Some(Rule::kw_like) => {
            let pattern = operands.pop().ok_or_else(|| children.error("LIKE needs a pattern"))?;
            Ok(Expr::Like {
                expr,
                pattern: Box::new(pattern),
                negated,
            })
        }
        Some(Rule::kw_in) => match subquery {
            Some(subquery) => Ok(Expr::InSubQuery {
                expr,
                subquery,
                negated,
            }),
            None => Ok(Expr::InList {
                expr,
                list: operands,
                negated,
            }),
        },
        Some(Rule::kw_is) => Ok(Expr::IsNull { expr, negated }),
        _ => Err(children.error("Invalid predicate")),
    }
}

fn parse_cmp_op(pair: &Pair<Rule>) -> ParseResult<BinOp> {
    match pair.as_str() {
        "=" | "==" => Ok(BinOp::Eq),
        "!=" | "<>" => Ok(BinOp::Ne),
        "<" => Ok(BinOp::Lt),
        "<=" => Ok(BinOp::Le),
        ">" => Ok(BinOp::Gt),
        ">=" => Ok(BinOp::Ge),
        other => Err(ParseError::at(pair, format!("Unknown comparison: {other}"))),
    }
}

fn parse_primary(pair: Pair<Rule>) -> ParseResult<Expr> {
    let inner = Children::of(pair).next_child()?;
    match inner.as_rule() {
        Rule::literal => parse_literal(inner),
        Rule::interval => parse_interval(inner),
        Rule::exists_expr => {
            let subquery = parse_subquery(Children::of(inner).expect(Rule::subquery)?)?;
            Ok(Expr::Exists {
                subquery: Box::new(subquery),
                negated: false,
            })
        }
        Rule::func_call => parse_func_call(inner),
        Rule::subquery => Ok(Expr::ScalarSubQuery(Box::new(parse_subquery(inner)?))),
        Rule::expr => parse_expr(inner),
        Rule::field_ref => Ok(Expr::Field(parse_field_ref(inner))),
        other => Err(ParseError::at(&inner, format!("Invalid primary: {other:?}"))),
    }
}

fn parse_literal(pair: Pair<Rule>) -> ParseResult<Expr> {
    let inner = Children::of(pair).next_child()?;
    let literal = match inner.as_rule() {
        Rule::integer => Literal::Int(parse_i64(&inner)?),
        Rule::decimal => Literal::Float(
            inner
                .as_str()
                .parse()
                .map_err(|_| ParseError::at(&inner, format!("Invalid decimal: {}", inner.as_str())))?,
        ),
        Rule::string => Literal::String(unescape_string(inner.as_str())),
        Rule::boolean => Literal::Bool(inner.as_str().eq_ignore_ascii_case("true")),
        Rule::null => Literal::Null,
        other => return Err(ParseError::at(&inner, format!("Invalid literal: {other:?}"))),
    };
    Ok(Expr::Literal(literal))
}

fn parse_i64(pair: &Pair<Rule>) -> ParseResult<i64> {
    pair.as_str()
        .parse()
        .map_err(|_| ParseError::at(pair, format!("Integer out of range: {}", pair.as_str())))
}

fn parse_interval(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut children = Children::of(pair);
    let value = parse_i64(&children.expect(Rule::integer)?)?;
    let unit_pair = children.expect(Rule::interval_unit)?;
    let unit = IntervalUnit::from_keyword(unit_pair.as_str())
        .ok_or_else(|| ParseError::at(&unit_pair, format!("Unknown interval unit: {}", unit_pair.as_str())))?;
    Ok(Expr::Interval { value, unit })
}

fn parse_func_call(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut children = Children::of(pair);
    let name = children.expect(Rule::func_name)?.as_str().to_string();

    let mut args = Vec::new();
    let mut wildcard = false;
    for child in children {
        match child.as_rule() {
            Rule::star => wildcard = true,
            Rule::expr => args.push(parse_expr(child)?),
            _ => {}
        }
    }

    Ok(Expr::FuncCall(FuncCall {
        name,
        args,
        wildcard,
    }))
}

fn parse_field_ref(pair: Pair<Rule>) -> FieldRef {
    let parts = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::ident)
        .map(|p| unquote_ident(p.as_str()))
        .collect();
    FieldRef { parts }
}

fn unquote_ident(text: &str) -> String {
    text.strip_prefix('`')
        .and_then(|t| t.strip_suffix('`'))
        .unwrap_or(text)
        .to_string()
}

fn unescape_string(text: &str) -> String {
    let body = &text[1..text.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> Box<Expr> {
        Box::new(Expr::Field(FieldRef::new(name)))
    }

    fn int(v: i64) -> Box<Expr> {
        Box::new(Expr::Literal(Literal::Int(v)))
    }

    #[test]
    fn test_parse_simple_query() {
        let query = parse("source = orders | where status = 'shipped' | head 5").unwrap();
        let pipeline = query.pipeline;
        assert_eq!(pipeline.source.name, "orders");
        assert_eq!(pipeline.commands.len(), 2);
        assert_eq!(
            pipeline.commands[0],
            Command::Where {
                predicate: Expr::BinaryOp {
                    op: BinOp::Eq,
                    left: field("status"),
                    right: Box::new(Expr::Literal(Literal::String("shipped".to_string()))),
                }
            }
        );
        assert_eq!(pipeline.commands[1], Command::Head { size: Some(5), offset: 0 });
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let query = parse("SEARCH SOURCE = Orders | WHERE a = 1 | HEAD").unwrap();
        assert_eq!(query.pipeline.source.name, "Orders");
        assert_eq!(query.pipeline.commands[1], Command::Head { size: None, offset: 0 });
    }

    #[test]
    fn test_parse_stats() {
        let query = parse("source = orders | stats count() as c, avg(price) by region, city").unwrap();
        match &query.pipeline.commands[0] {
            Command::Stats { aggregations, group_by } => {
                assert_eq!(aggregations.len(), 2);
                assert_eq!(aggregations[0].alias.as_deref(), Some("c"));
                assert_eq!(aggregations[0].expr.to_string(), "count()");
                assert_eq!(aggregations[1].alias, None);
                assert_eq!(aggregations[1].expr.to_string(), "avg(price)");
                assert_eq!(group_by, &vec![FieldRef::new("region"), FieldRef::new("city")]);
            }
            other => panic!("expected stats, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_count_star() {
        let query = parse("source = t | stats count(*)").unwrap();
        match &query.pipeline.commands[0] {
            Command::Stats { aggregations, .. } => match &aggregations[0].expr {
                Expr::FuncCall(call) => {
                    assert!(call.wildcard);
                    assert!(call.args.is_empty());
                }
                other => panic!("expected call, got {other:?}"),
            },
            other => panic!("expected stats, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_sort_signs() {
        let query = parse("source = t | sort - n, + m, k").unwrap();
        assert_eq!(
            query.pipeline.commands[0],
            Command::Sort {
                keys: vec![
                    SortKey { field: FieldRef::new("n"), desc: true },
                    SortKey { field: FieldRef::new("m"), desc: false },
                    SortKey { field: FieldRef::new("k"), desc: false },
                ]
            }
        );
    }

    #[test]
    fn test_parse_head_with_offset() {
        let query = parse("source = t | head 3 from 10").unwrap();
        assert_eq!(query.pipeline.commands[0], Command::Head { size: Some(3), offset: 10 });
    }

    #[test]
    fn test_parse_fields_and_rename() {
        let query = parse("source = t | fields - a, b | rename c as d, `e f` as g").unwrap();
        assert_eq!(
            query.pipeline.commands[0],
            Command::Fields {
                exclude: true,
                fields: vec![FieldRef::new("a"), FieldRef::new("b")],
            }
        );
        assert_eq!(
            query.pipeline.commands[1],
            Command::Rename {
                renames: vec![
                    Rename { field: FieldRef::new("c"), alias: "d".to_string() },
                    Rename { field: FieldRef::new("e f"), alias: "g".to_string() },
                ]
            }
        );
    }

    #[test]
    fn test_parse_eval() {
        let query = parse("source = t | eval total = price * qty, flag = true").unwrap();
        match &query.pipeline.commands[0] {
            Command::Eval { assignments } => {
                assert_eq!(assignments[0].name, "total");
                assert_eq!(
                    assignments[0].expr,
                    Expr::BinaryOp { op: BinOp::Mul, left: field("price"), right: field("qty") }
                );
                assert_eq!(assignments[1].expr, Expr::Literal(Literal::Bool(true)));
            }
            other => panic!("expected eval, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_join_with_side_aliases() {
        let query = parse(
            "source = orders as o | left join left = o right = c ON o.custkey = c.custkey customers",
        )
        .unwrap();
        assert_eq!(query.pipeline.source.alias.as_deref(), Some("o"));
        match &query.pipeline.commands[0] {
            Command::Join(join) => {
                assert_eq!(join.join_type, Some(JoinType::Left));
                assert_eq!(join.left_alias.as_deref(), Some("o"));
                assert_eq!(join.right_alias.as_deref(), Some("c"));
                assert_eq!(
                    join.condition,
                    Some(Expr::BinaryOp {
                        op: BinOp::Eq,
                        left: Box::new(Expr::Field(FieldRef::qualified("o", "custkey"))),
                        right: Box::new(Expr::Field(FieldRef::qualified("c", "custkey"))),
                    })
                );
                assert_eq!(
                    join.right,
                    JoinRight::Table(TableRef { name: "customers".to_string(), alias: None })
                );
            }
            other => panic!("expected join, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_join_subquery() {
        let query = parse("source = a | join type = x [ source = b | where y > 1 ] as s").unwrap_err();
        // `type` is not a join keyword
        assert!(matches!(query, ParseError::Pest(_)));

        let query = parse("source = a | left semi join ON a.k = s.k [ source = b | where y > 1 ] as s").unwrap();
        match &query.pipeline.commands[0] {
            Command::Join(join) => {
                assert_eq!(join.join_type, Some(JoinType::Semi));
                match &join.right {
                    JoinRight::SubQuery { pipeline, alias } => {
                        assert_eq!(pipeline.source.name, "b");
                        assert_eq!(pipeline.commands.len(), 1);
                        assert_eq!(alias.as_deref(), Some("s"));
                    }
                    other => panic!("expected subquery, got {other:?}"),
                }
            }
            other => panic!("expected join, got {other:?}"),
        }
    }

    #[test]
    fn test_join_type_after_keyword() {
        let query = parse("source = a | join inner customers").unwrap();
        match &query.pipeline.commands[0] {
            Command::Join(join) => {
                assert_eq!(join.join_type, Some(JoinType::Inner));
                assert_eq!(join.condition, None);
            }
            other => panic!("expected join, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expression("a + b * 2 > 10 and not c").unwrap();
        assert_eq!(
            expr,
            Expr::BinaryOp {
                op: BinOp::And,
                left: Box::new(Expr::BinaryOp {
                    op: BinOp::Gt,
                    left: Box::new(Expr::BinaryOp {
                        op: BinOp::Add,
                        left: field("a"),
                        right: Box::new(Expr::BinaryOp { op: BinOp::Mul, left: field("b"), right: int(2) }),
                    }),
                    right: int(10),
                }),
                right: Box::new(Expr::UnaryOp { op: UnOp::Not, expr: field("c") }),
            }
        );
    }

    #[test]
    fn test_predicates() {
        assert_eq!(
            parse_expression("x not between 1 and -5").unwrap(),
            Expr::Between { expr: field("x"), low: int(1), high: int(-5), negated: true }
        );
        assert_eq!(
            parse_expression("x in (1, 2)").unwrap(),
            Expr::InList { expr: field("x"), list: vec![*int(1), *int(2)], negated: false }
        );
        assert_eq!(
            parse_expression("x is not null").unwrap(),
            Expr::IsNull { expr: field("x"), negated: true }
        );
        assert!(matches!(
            parse_expression("name not like 'a%'").unwrap(),
            Expr::Like { negated: true, .. }
        ));
        assert!(matches!(
            parse_expression("exists [ source = t | where a = 1 ]").unwrap(),
            Expr::Exists { negated: false, .. }
        ));
        assert!(matches!(
            parse_expression("not exists [ source = t ]").unwrap(),
            Expr::Exists { negated: true, .. }
        ));
        assert!(matches!(
            parse_expression("k in [ source = t | fields k ]").unwrap(),
            Expr::InSubQuery { negated: false, .. }
        ));
    }

    #[test]
    fn test_interval_and_strings() {
        assert_eq!(
            parse_expression("interval 3 day").unwrap(),
            Expr::Interval { value: 3, unit: IntervalUnit::Day }
        );
        assert_eq!(
            parse_expression(r#""it\'s""#).unwrap(),
            Expr::Literal(Literal::String("it's".to_string()))
        );
    }

    #[test]
    fn test_keyword_prefixed_identifiers() {
        let expr = parse_expression("nullable = order_id").unwrap();
        assert_eq!(
            expr,
            Expr::BinaryOp { op: BinOp::Eq, left: field("nullable"), right: field("order_id") }
        );
    }

    #[test]
    fn test_syntax_error_position() {
        let err = parse("source = orders | wher x = 1").unwrap_err();
        let (line, column) = err.position();
        assert_eq!(line, 1);
        assert!(column >= 16, "column was {column}");

        let err = parse("source = t |\n where a = ").unwrap_err();
        assert_eq!(err.position().0, 2);
    }

    #[test]
    fn test_integer_overflow_is_reported() {
        let err = parse_expression("99999999999999999999").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { line: 1, column: 1, .. }));
    }
}
