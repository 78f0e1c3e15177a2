use ppl_engine::{EngineError, PplEngine};
use serde_json::json;
use std::process::ExitCode;

fn main() -> ExitCode {
    let query = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "source = orders | where amount * 2 > 10 | stats sum(amount) as total by region".to_string());

    let mut engine = PplEngine::default();
    let mapping = json!({
        "properties": {
            "status": { "type": "keyword" },
            "region": { "type": "keyword" },
            "amount": { "type": "double" },
            "created": { "type": "date" }
        }
    });
    if let Err(e) = engine.register_index("orders", &mapping) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let ast = match engine.parse(&query) {
        Ok(ast) => ast,
        Err(EngineError::Parse(e)) => {
            let (line, column) = e.position();
            eprintln!("{}", query.lines().nth(line.saturating_sub(1)).unwrap_or_default());
            eprintln!("{}^", " ".repeat(column.saturating_sub(1)));
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let commands: Vec<&str> = ast.pipeline.commands.iter().map(|c| c.name()).collect();
    println!("source: {}", ast.pipeline.source.name);
    println!("commands: {}", commands.join(" | "));

    match engine.compile(&query) {
        Ok(plan) => {
            println!();
            print!("{}", ppl_plan::explain(&plan));
            println!();
            println!("schema: {}", plan.schema());
            println!("fingerprint: {}", plan.fingerprint());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
