//! Name resolution scope threaded through a pipeline
//!
//! A scope mirrors the output schema of the plan built so far, column for
//! column, and remembers which table names and aliases qualify each column.

use ppl_ast::FieldRef;
use ppl_plan::{Expr, Field, Schema};

use crate::error::AnalysisError;

#[derive(Debug, Clone)]
pub(crate) struct ScopeColumn {
    pub field: Field,
    pub qualifiers: Vec<String>,
}

impl ScopeColumn {
    pub fn unqualified(field: Field) -> Self {
        Self {
            field,
            qualifiers: Vec::new(),
        }
    }

    fn display_name(&self) -> String {
        match self.qualifiers.first() {
            Some(qualifier) => format!("{qualifier}.{}", self.field.name),
            None => self.field.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Scope {
    columns: Vec<ScopeColumn>,
}

impl Scope {
    pub fn new(columns: Vec<ScopeColumn>) -> Self {
        Self { columns }
    }

    /// Columns of a scanned table, qualified by its name and optional alias
    pub fn from_table(table: &str, alias: Option<&str>, schema: &Schema) -> Self {
        let mut qualifiers = vec![table.to_string()];
        qualifiers.extend(alias.map(str::to_string));
        let columns = schema
            .fields
            .iter()
            .map(|field| ScopeColumn {
                field: field.clone(),
                qualifiers: qualifiers.clone(),
            })
            .collect();
        Self { columns }
    }

    /// Replace every qualifier with `qualifier`
    pub fn requalify(mut self, qualifier: &str) -> Self {
        for column in &mut self.columns {
            column.qualifiers = vec![qualifier.to_string()];
        }
        self
    }

    /// Add `qualifier` next to the existing ones
    pub fn with_qualifier(mut self, qualifier: &str) -> Self {
        for column in &mut self.columns {
            if !column.qualifiers.iter().any(|q| q == qualifier) {
                column.qualifiers.push(qualifier.to_string());
            }
        }
        self
    }

    /// Drop all qualifiers
    pub fn anonymous(mut self) -> Self {
        for column in &mut self.columns {
            column.qualifiers.clear();
        }
        self
    }

    pub fn join(left: Scope, right: Scope) -> Self {
        let mut columns = left.columns;
        columns.extend(right.columns);
        Self { columns }
    }

    pub fn schema(&self) -> Schema {
        Schema::new(self.columns.iter().map(|c| c.field.clone()).collect())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ScopeColumn] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> &ScopeColumn {
        &self.columns[index]
    }

    pub fn push(&mut self, column: ScopeColumn) {
        self.columns.push(column);
    }

    pub fn replace_field(&mut self, index: usize, field: Field) {
        self.columns[index].field = field;
    }

    /// Positional reference to column `index`
    pub fn column_expr(&self, index: usize) -> Expr {
        let field = &self.columns[index].field;
        Expr::column(field.name.clone(), index, field.data_type.clone())
    }

    fn has_qualifier(&self, qualifier: &str) -> bool {
        self.columns
            .iter()
            .any(|c| c.qualifiers.iter().any(|q| q == qualifier))
    }

    /// Index of the single column called `name`, optionally restricted to one
    /// qualifier. `Ok(None)` when nothing matches.
    pub fn lookup(&self, qualifier: Option<&str>, name: &str) -> Result<Option<usize>, AnalysisError> {
        let found: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.field.name == name)
            .filter(|(_, c)| qualifier.map_or(true, |q| c.qualifiers.iter().any(|cq| cq == q)))
            .map(|(i, _)| i)
            .collect();

        match found.as_slice() {
            [] => Ok(None),
            [index] => Ok(Some(*index)),
            _ => Err(AnalysisError::AmbiguousColumn {
                name: match qualifier {
                    Some(q) => format!("{q}.{name}"),
                    None => name.to_string(),
                },
                candidates: found.iter().map(|&i| self.columns[i].display_name()).collect(),
            }),
        }
    }

    /// Resolve a dotted reference to a column index plus the nested struct
    /// path that follows it. A leading part naming a qualifier is tried first.
    pub fn resolve<'f>(&self, field: &'f FieldRef) -> Result<(usize, &'f [String]), AnalysisError> {
        let unresolved = || AnalysisError::UnresolvedColumn(field.to_string());
        let parts = field.parts.as_slice();

        if let [qualifier, name, rest @ ..] = parts {
            if self.has_qualifier(qualifier) {
                return match self.lookup(Some(qualifier), name)? {
                    Some(index) => Ok((index, rest)),
                    None => Err(unresolved()),
                };
            }
        }

        match parts {
            [name, rest @ ..] => match self.lookup(None, name)? {
                Some(index) => Ok((index, rest)),
                None => Err(unresolved()),
            },
            [] => Err(unresolved()),
        }
    }
}
