//! Printable route table for a registry.

use gantry_core::Registry;

/// Rows of (verb, path, target, key) for every registered lambda.
pub fn route_rows(registry: &Registry) -> Vec<[String; 4]> {
    registry
        .iter()
        .map(|entry| {
            [
                entry.descriptor.gateway.verb.to_string(),
                format!("/{}", entry.descriptor.gateway.path),
                entry.descriptor.qualified_target(),
                entry.descriptor.name.clone(),
            ]
        })
        .collect()
}

/// Print the route table, columns aligned.
pub fn print_routes(registry: &Registry) {
    let rows = route_rows(registry);
    if rows.is_empty() {
        stdio::raw("no routes registered");
        return;
    }

    let mut widths = [0usize; 4];
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    for row in &rows {
        stdio::raw(&format!(
            "{:w0$}  {:w1$}  {:w2$}  {}",
            row[0],
            row[1],
            row[2],
            row[3],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
        ));
    }
}
