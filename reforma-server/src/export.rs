//! Workbook rendering of a finished grid. The grid arrives unformatted
//! (raw numbers) so the sheet's own `0.00` number format applies; captions,
//! column widths and the bordered header/cell styles mirror the on-screen
//! rendering.

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, XlsxError};
use serde_json::Value;

use reforma_core::{CellType, Grid};

const SHEET_NAME: &str = "Отчет";
const DEFAULT_WIDTH_PX: i32 = 150;

/// First grid row on the sheet; the caption sits above with a spacer row.
const FIRST_ROW: u32 = 2;

pub fn render_xlsx(grid: &Grid) -> Result<(Vec<u8>, String), XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let header_format = Format::new()
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap();
    let cell_format = Format::new()
        .set_border(FormatBorder::Thin)
        .set_num_format("0.00")
        .set_text_wrap();

    if let Some(caption) = grid.caption.as_deref() {
        sheet.write_string(0, 0, caption)?;
    }

    for (row_idx, row) in grid.cells.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            let sheet_row = FIRST_ROW + row_idx as u32;
            let sheet_col = col_idx as u16;

            let format = if cell.cell_type == CellType::ColumnHeader {
                sheet.set_column_width(
                    sheet_col,
                    pixel_width_to_excel(cell.width.unwrap_or(DEFAULT_WIDTH_PX)),
                )?;
                &header_format
            } else {
                &cell_format
            };

            match cell.value.as_ref() {
                Some(Value::Number(n)) => {
                    sheet.write_number_with_format(
                        sheet_row,
                        sheet_col,
                        n.as_f64().unwrap_or_default(),
                        format,
                    )?;
                }
                Some(Value::String(s)) => {
                    sheet.write_string_with_format(sheet_row, sheet_col, s, format)?;
                }
                Some(other) => {
                    sheet.write_string_with_format(sheet_row, sheet_col, &other.to_string(), format)?;
                }
                None => {
                    sheet.write_blank(sheet_row, sheet_col, format)?;
                }
            }
        }
    }

    let file_name = format!(
        "{}.xlsx",
        grid.base_caption.as_deref().unwrap_or(SHEET_NAME)
    );
    Ok((workbook.save_to_buffer()?, file_name))
}

fn pixel_width_to_excel(pixels: i32) -> f64 {
    let width = pixels as f64 * 0.14099;
    let correction = (width / 100.0) * -1.30;
    width - correction
}
