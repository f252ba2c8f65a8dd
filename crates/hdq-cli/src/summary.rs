use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use hdq_cli::types::RunResult;

pub fn print_summary(result: &RunResult) {
    println!("Input: {}", result.input.display());
    if result.dry_run {
        println!("Output: dry run, nothing written");
    } else {
        println!("Output: {}", result.output_dir.display());
    }
    if let Some(path) = &result.audit_path {
        println!("Rejects audit: {}", path.display());
    }
    if let Some(key) = &result.natural_key {
        println!("Natural key: {key}");
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Stage"),
        header_cell("Rows"),
        header_cell("Columns"),
        header_cell("File"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for shape in &result.shapes {
        let file = match shape.stage {
            "accepted" => result.outputs.accepted.as_ref(),
            "rejected" => result.outputs.rejected.as_ref(),
            _ => None,
        };
        table.add_row(vec![
            stage_cell(shape.stage),
            Cell::new(shape.rows),
            Cell::new(shape.columns),
            match file {
                Some(path) => Cell::new(path.display()),
                None => dim_cell("-"),
            },
        ]);
    }
    println!("{table}");

    print_reason_table(result);

    if !result.missing_columns.is_empty() {
        eprintln!("Published columns filled with nulls:");
        for column in &result.missing_columns {
            eprintln!("- {column}");
        }
    }
}

fn print_reason_table(result: &RunResult) {
    if result.reason_counts.is_empty() {
        return;
    }
    let mut reasons: Vec<(&String, &usize)> = result.reason_counts.iter().collect();
    reasons.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let mut table = Table::new();
    table.set_header(vec![header_cell("Reason"), header_cell("Rows")]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for (reason, count) in reasons {
        table.add_row(vec![
            Cell::new(reason),
            Cell::new(count).fg(Color::Red).add_attribute(Attribute::Bold),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(result.rejected_rows).add_attribute(Attribute::Bold),
    ]);
    println!();
    println!("Rejected:");
    println!("{table}");
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn stage_cell(stage: &str) -> Cell {
    match stage {
        "accepted" => Cell::new(stage).fg(Color::Green).add_attribute(Attribute::Bold),
        "rejected" => Cell::new(stage).fg(Color::Red).add_attribute(Attribute::Bold),
        _ => Cell::new(stage).fg(Color::Blue),
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value.to_string()).fg(Color::DarkGrey)
}
