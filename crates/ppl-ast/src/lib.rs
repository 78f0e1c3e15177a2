//! PPL AST - parser and AST types

pub mod ast;
pub mod parser;

pub use ast::*;
pub use parser::{parse, parse_expression, ParseError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_serializes_to_json() {
        let query = parse("source = orders | where amount > 10 | fields region").unwrap();
        let json = serde_json::to_string(&query).unwrap();
        let back: Query = serde_json::from_str(&json).unwrap();
        assert_eq!(back, query);
    }
}
