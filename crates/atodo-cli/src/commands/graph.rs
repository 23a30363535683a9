use anyhow::Result;
use atodo_core::{graph_dot, graph_edges};
use comfy_table::{Cell, Table};

pub fn run(dot: bool) -> Result<()> {
    if dot {
        print!("{}", graph_dot(None));
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["From", "To", "Kind"]);
    for edge in graph_edges() {
        table.add_row(vec![
            Cell::new(edge.from),
            Cell::new(edge.to),
            Cell::new(if edge.conditional { "routed" } else { "always" }),
        ]);
    }
    println!("{table}");
    Ok(())
}
