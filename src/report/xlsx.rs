//! Spreadsheet export.

use crate::error::ChatSqlResult;
use crate::table::{ResultTable, Value};

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};

pub const SHEET_NAME: &str = "Report";

/// Header fill shared with the corporate PDF layout.
pub const HEADER_COLOR: u32 = 0x0056B3;

/// Extra characters added to each auto-sized column.
const WIDTH_MARGIN: usize = 2;

/// Render `table` as a single-sheet workbook.
pub fn render(table: &ResultTable) -> ChatSqlResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = Format::new()
        .set_bold()
        .set_text_wrap()
        .set_align(FormatAlign::Top)
        .set_background_color(Color::RGB(HEADER_COLOR))
        .set_font_color(Color::White)
        .set_border(FormatBorder::Thin);

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        for (col, name) in table.columns().iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, name, &header)?;
        }

        for (r, row) in table.rows().iter().enumerate() {
            let r = (r + 1) as u32;
            for (col, value) in row.iter().enumerate() {
                let col = col as u16;
                match value {
                    Value::Null => {}
                    Value::Bool(b) => {
                        sheet.write_boolean(r, col, *b)?;
                    }
                    other => match other.as_f64() {
                        Some(n) => {
                            sheet.write_number(r, col, n)?;
                        }
                        None => {
                            sheet.write_string(r, col, other.to_cell_text())?;
                        }
                    },
                }
            }
        }

        for (col, width) in column_widths(table).into_iter().enumerate() {
            sheet.set_column_width(col as u16, width as f64)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Longest value or header per column, plus a margin.
pub fn column_widths(table: &ResultTable) -> Vec<usize> {
    table
        .column_widths()
        .into_iter()
        .map(|w| w + WIDTH_MARGIN)
        .collect()
}
