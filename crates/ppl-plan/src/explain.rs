use crate::plan::LogicalPlan;

/// Render logical plan as human-readable multiline text.
pub fn explain(plan: &LogicalPlan) -> String {
    let mut s = String::new();
    fmt_plan(plan, 0, &mut s);
    s
}

fn fmt_plan(plan: &LogicalPlan, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    match plan {
        LogicalPlan::Scan { table, alias, schema } => {
            match alias {
                Some(alias) => out.push_str(&format!("{pad}Scan table={table} alias={alias}\n")),
                None => out.push_str(&format!("{pad}Scan table={table}\n")),
            }
            out.push_str(&format!("{pad}  schema={schema}\n"));
        }
        LogicalPlan::Filter { predicate, input } => {
            out.push_str(&format!("{pad}Filter {predicate}\n"));
            fmt_plan(input, indent + 1, out);
        }
        LogicalPlan::Projection { exprs, input, .. } => {
            out.push_str(&format!("{pad}Projection\n"));
            for (e, name) in exprs {
                out.push_str(&format!("{pad}  {name} := {e}\n"));
            }
            fmt_plan(input, indent + 1, out);
        }
        LogicalPlan::Aggregate {
            group_exprs,
            aggr_exprs,
            input,
            ..
        } => {
            out.push_str(&format!("{pad}Aggregate\n"));
            out.push_str(&format!("{pad}  group_by={}\n", group_exprs.len()));
            for g in group_exprs {
                out.push_str(&format!("{pad}    {g}\n"));
            }
            out.push_str(&format!("{pad}  aggs={}\n", aggr_exprs.len()));
            for (a, name) in aggr_exprs {
                out.push_str(&format!("{pad}    {name} := {a}\n"));
            }
            fmt_plan(input, indent + 1, out);
        }
        LogicalPlan::Join {
            left,
            right,
            join_type,
            on,
            ..
        } => {
            out.push_str(&format!("{pad}Join type={join_type}\n"));
            if let Some(on) = on {
                out.push_str(&format!("{pad}  on={on}\n"));
            }
            out.push_str(&format!("{pad}  left:\n"));
            fmt_plan(left, indent + 2, out);
            out.push_str(&format!("{pad}  right:\n"));
            fmt_plan(right, indent + 2, out);
        }
        LogicalPlan::Sort { keys, input } => {
            let keys: Vec<String> = keys
                .iter()
                .map(|k| format!("{} {}", k.expr, if k.asc { "asc" } else { "desc" }))
                .collect();
            out.push_str(&format!("{pad}Sort {}\n", keys.join(", ")));
            fmt_plan(input, indent + 1, out);
        }
        LogicalPlan::Limit { skip, fetch, input } => {
            out.push_str(&format!("{pad}Limit fetch={fetch} skip={skip}\n"));
            fmt_plan(input, indent + 1, out);
        }
        LogicalPlan::SubqueryAlias { alias, input } => {
            out.push_str(&format!("{pad}SubqueryAlias {alias}\n"));
            fmt_plan(input, indent + 1, out);
        }
    }
}
