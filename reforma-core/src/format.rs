//! Display formatting of numeric cells.
//!
//! Column formats are Excel-style pattern strings (`#,##0.00`); the subset
//! implemented here covers the digit placeholders, grouping, percent and
//! literal text the stored reports use, rendered with Russian separators
//! (decimal comma, no-break-space grouping). Formatting is presentation
//! only — export paths skip it to keep raw numbers.

use serde_json::Value;

use crate::grid::{CellType, Grid};
use crate::report::ReportSpec;

#[derive(Debug, Clone, Copy)]
pub struct Locale {
    pub decimal: char,
    pub group: char,
}

pub const RU: Locale = Locale {
    decimal: ',',
    group: '\u{a0}',
};

/// Formats every data/total cell of each column that declares a format.
pub fn apply_number_format(grid: &mut Grid, spec: &ReportSpec) {
    let table = match spec.table.as_ref() {
        Some(table) => table,
        None => return,
    };

    let headers: Vec<(usize, String)> = grid
        .cells
        .iter()
        .flat_map(|row| {
            row.iter().enumerate().filter_map(|(col_idx, cell)| {
                if cell.cell_type == CellType::ColumnHeader {
                    cell.name.clone().map(|name| (col_idx, name))
                } else {
                    None
                }
            })
        })
        .collect();

    for (col_idx, name) in headers {
        let pattern = match table
            .iter()
            .find(|t| t.name == name)
            .and_then(|t| t.format.as_deref())
        {
            Some(pattern) if !pattern.is_empty() => pattern,
            _ => continue,
        };

        for row in grid.cells.iter_mut() {
            let cell = match row.get_mut(col_idx) {
                Some(cell) => cell,
                None => continue,
            };
            if !matches!(cell.cell_type, CellType::DataCell | CellType::TotalCell) {
                continue;
            }

            let value = match cell.value.as_ref() {
                Some(Value::Number(n)) => n.as_f64(),
                Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            let value = match value {
                Some(value) => value,
                None => continue,
            };

            let rendered = format_number(value, pattern, &RU);
            cell.value = Some(Value::String(rendered.trim().to_owned()));
        }
    }
}

#[derive(Debug, Default)]
struct Section {
    min_int: usize,
    decimals_min: usize,
    decimals_max: usize,
    grouped: bool,
    percent: bool,
    prefix: String,
    suffix: String,
}

fn parse_section(section: &str) -> Section {
    let mut parsed = Section::default();
    let mut in_decimals = false;
    let mut seen_digit = false;

    let mut chars = section.chars();
    while let Some(c) = chars.next() {
        match c {
            '#' | '0' => {
                seen_digit = true;
                if in_decimals {
                    parsed.decimals_max += 1;
                    if c == '0' {
                        parsed.decimals_min = parsed.decimals_max;
                    }
                } else if c == '0' {
                    parsed.min_int += 1;
                }
            }
            '.' => in_decimals = true,
            ',' if !in_decimals => parsed.grouped = true,
            '%' => {
                parsed.percent = true;
                parsed.suffix.push('%');
            }
            '"' => {
                // quoted literal runs to the closing quote
                for literal in chars.by_ref() {
                    if literal == '"' {
                        break;
                    }
                    push_literal(&mut parsed, seen_digit, literal);
                }
            }
            '\\' => {
                if let Some(escaped) = chars.next() {
                    push_literal(&mut parsed, seen_digit, escaped);
                }
            }
            other => push_literal(&mut parsed, seen_digit, other),
        }
    }

    parsed
}

fn push_literal(section: &mut Section, seen_digit: bool, c: char) {
    if seen_digit {
        section.suffix.push(c);
    } else {
        section.prefix.push(c);
    }
}

/// Renders `value` through an Excel-style format pattern. Sections are
/// `positive;negative;zero`; missing sections fall back to the first.
pub fn format_number(value: f64, pattern: &str, locale: &Locale) -> String {
    let sections: Vec<&str> = pattern.split(';').collect();

    let (section_src, value, explicit_sign) = if value < 0.0 && sections.len() > 1 {
        (sections[1], value.abs(), false)
    } else if value == 0.0 && sections.len() > 2 {
        (sections[2], value, false)
    } else {
        (sections[0], value.abs(), value < 0.0)
    };

    let section = parse_section(section_src);

    let mut v = value;
    if section.percent {
        v *= 100.0;
    }

    // One scaled integer instead of trunc/fract keeps the rounding exact.
    let scale = 10u64.pow(section.decimals_max as u32);
    let scaled = (v * scale as f64).round() as u64;

    let mut int_digits = (scaled / scale).to_string();
    while int_digits.len() < section.min_int {
        int_digits.insert(0, '0');
    }
    if section.grouped {
        int_digits = group_digits(&int_digits, locale.group);
    }

    let mut decimals = String::new();
    if section.decimals_max > 0 {
        let mut padded = format!("{:0width$}", scaled % scale, width = section.decimals_max);
        // '#' placeholders drop their trailing zeros
        while padded.len() > section.decimals_min && padded.ends_with('0') {
            padded.pop();
        }
        decimals = padded;
    }

    let mut out = String::new();
    if explicit_sign {
        out.push('-');
    }
    out.push_str(&section.prefix);
    out.push_str(&int_digits);
    if !decimals.is_empty() {
        out.push(locale.decimal);
        out.push_str(&decimals);
    }
    out.push_str(&section.suffix);
    out
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (index, c) in digits.chars().enumerate() {
        if index != 0 && (index + 3 - offset) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::Cell;
    use crate::report::{ColumnSpec, SourceType};
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn russian_grouped_decimals() {
        assert_eq!(format_number(1234.5, "#,##0.00", &RU), "1\u{a0}234,50");
        assert_eq!(format_number(0.0, "#,##0.00", &RU), "0,00");
        assert_eq!(format_number(-7.125, "0.00", &RU), "-7,13");
    }

    #[test]
    fn hash_decimals_trim_trailing_zeros() {
        assert_eq!(format_number(1234.5, "#,##0.##", &RU), "1\u{a0}234,5");
        assert_eq!(format_number(1234.0, "#,##0.##", &RU), "1\u{a0}234");
    }

    #[test]
    fn percent_scales_by_hundred() {
        assert_eq!(format_number(0.125, "0%", &RU), "13%");
    }

    #[test]
    fn negative_section_controls_sign() {
        assert_eq!(format_number(-5.0, "0.0;(0.0)", &RU), "(5,0)");
    }

    #[test]
    fn grouping_of_long_integers() {
        assert_eq!(format_number(1234567.0, "#,##0", &RU), "1\u{a0}234\u{a0}567");
    }

    #[test]
    fn cells_of_formatted_columns_are_rendered_and_trimmed() {
        let spec = ReportSpec {
            name: "fmt".into(),
            caption: None,
            caption_pattern: None,
            source_type: SourceType::Database,
            query: None,
            dimensions: HashMap::new(),
            table: Some(vec![
                ColumnSpec {
                    name: "school".into(),
                    caption: None,
                    width: None,
                    styles: None,
                    aggregate: Default::default(),
                    aggregate_non_zero: false,
                    format: None,
                    can_row_span: None,
                },
                ColumnSpec {
                    name: "total".into(),
                    caption: None,
                    width: None,
                    styles: None,
                    aggregate: Default::default(),
                    aggregate_non_zero: false,
                    format: Some("#,##0.00".into()),
                    can_row_span: None,
                },
            ]),
            cube: None,
            styles: None,
        };

        let mut grid = Grid::from_cells(vec![
            vec![
                Cell::column_header(Some("Школа".into()), "school"),
                Cell::column_header(Some("Итого".into()), "total"),
            ],
            vec![
                Cell::data(Some(json!("Школа №3"))),
                Cell::data(Some(json!(1234.5))),
            ],
            vec![Cell::data(Some(json!("Школа №9"))), Cell::data(None)],
        ]);

        apply_number_format(&mut grid, &spec);

        assert_eq!(grid.cells[1][1].value, Some(json!("1\u{a0}234,50")));
        // unformatted column and empty cells untouched
        assert_eq!(grid.cells[1][0].value, Some(json!("Школа №3")));
        assert_eq!(grid.cells[2][1].value, None);
        // header caption is not formatted
        assert_eq!(grid.cells[0][1].value, Some(json!("Итого")));
    }
}
