//! Paginated PDF export.
//!
//! Layout happens in two steps. [`plan`] decides column widths, cell text and
//! page breaks without touching printpdf, which keeps the page count known
//! before anything is drawn. [`render`] then paints the plan.

use super::PdfLayout;
use crate::error::{ChatSqlError, ChatSqlResult};
use crate::table::ResultTable;

use chrono::NaiveDateTime;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rect, Rgb,
};

// A4 portrait, in millimetres.
pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
pub const MARGIN: f32 = 20.0;

pub const RUNNING_TITLE: &str = "Data Analysis Report";
pub const HEADING: &str = "Query Results";

const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_RATIO: f32 = 0.5;

const BODY_SIZE: f32 = 8.5;
const TITLE_SIZE: f32 = 11.0;
const HEADING_SIZE: f32 = 14.0;
const NOTE_SIZE: f32 = 8.0;

const CELL_PADDING: f32 = 1.6;
const ROW_HEIGHT: f32 = 6.0;
/// Space taken on page one by heading, question and timestamp.
const INTRO_HEIGHT: f32 = 26.0;

const HEADER_FILL: (f32, f32, f32) = (0.0, 0.337, 0.702);
const STRIPE_FILL: (f32, f32, f32) = (0.949, 0.949, 0.949);
const GRID_LINE: (f32, f32, f32) = (0.867, 0.867, 0.867);
const HEADING_TEXT: (f32, f32, f32) = (0.0, 0.337, 0.702);
const MUTED_TEXT: (f32, f32, f32) = (0.333, 0.333, 0.333);
const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);
const WHITE: (f32, f32, f32) = (1.0, 1.0, 1.0);

/// A table column with its final width in millimetres.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedColumn {
    pub header: String,
    pub width: f32,
}

/// One page of table rows.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    pub number: usize,
    /// Top edge of the table header row.
    pub table_top: f32,
    /// Index of the first row on this page, within the whole table.
    pub first_row: usize,
    /// Cell text, already shortened to fit.
    pub rows: Vec<Vec<String>>,
    pub footer: Option<String>,
}

/// Everything needed to draw the document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPlan {
    pub layout: PdfLayout,
    pub running_title: Option<String>,
    pub heading: Option<String>,
    pub question: Option<String>,
    pub timestamp: Option<String>,
    pub columns: Vec<PlannedColumn>,
    pub pages: Vec<PagePlan>,
}

impl DocumentPlan {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Estimated rendered width of `text` in millimetres.
fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * PT_TO_MM * GLYPH_RATIO
}

fn glyph_width(size: f32) -> f32 {
    size * PT_TO_MM * GLYPH_RATIO
}

/// Shorten `text` so it fits in `width` millimetres.
fn fit(text: &str, width: f32, size: f32) -> String {
    let room = ((width - 2.0 * CELL_PADDING) / glyph_width(size)).floor().max(0.0) as usize;
    if text.chars().count() <= room {
        return text.to_string();
    }
    if room <= 3 {
        return text.chars().take(room).collect();
    }
    let mut short: String = text.chars().take(room - 3).collect();
    short.push_str("...");
    short
}

/// Lay out `table` for the given layout.
pub fn plan(
    table: &ResultTable,
    question: &str,
    layout: PdfLayout,
    generated_at: NaiveDateTime,
) -> DocumentPlan {
    let usable = PAGE_WIDTH - 2.0 * MARGIN;
    let natural: Vec<f32> = table
        .column_widths()
        .into_iter()
        .map(|chars| (chars as f32 + 2.0) * glyph_width(BODY_SIZE) + 2.0 * CELL_PADDING)
        .collect();
    let total: f32 = natural.iter().sum();
    // Corporate tables span the full width; simple ones only shrink when too wide.
    let scale = match layout {
        PdfLayout::Corporate if total > 0.0 => usable / total,
        PdfLayout::Simple if total > usable => usable / total,
        _ => 1.0,
    };
    let columns: Vec<PlannedColumn> = table
        .columns()
        .iter()
        .zip(&natural)
        .map(|(name, w)| PlannedColumn {
            header: fit(name, w * scale, BODY_SIZE),
            width: w * scale,
        })
        .collect();

    let corporate = layout == PdfLayout::Corporate;
    let top = PAGE_HEIGHT - MARGIN;
    let first_top = if corporate { top - INTRO_HEIGHT } else { top };
    let capacity = |table_top: f32| {
        // Header row is repeated on every page.
        (((table_top - MARGIN) / ROW_HEIGHT).floor() as usize)
            .saturating_sub(1)
            .max(1)
    };

    let mut pages = Vec::new();
    let mut next = 0;
    loop {
        let table_top = if pages.is_empty() { first_top } else { top };
        let take = capacity(table_top).min(table.len() - next);
        let rows = table.rows()[next..next + take]
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&columns)
                    .map(|(value, col)| fit(&value.to_cell_text(), col.width, BODY_SIZE))
                    .collect()
            })
            .collect();
        pages.push(PagePlan {
            number: pages.len() + 1,
            table_top,
            first_row: next,
            rows,
            footer: None,
        });
        next += take;
        if next >= table.len() {
            break;
        }
    }

    let count = pages.len();
    if corporate {
        for page in &mut pages {
            page.footer = Some(format!("Page {} of {}", page.number, count));
        }
    }

    DocumentPlan {
        layout,
        running_title: corporate.then(|| RUNNING_TITLE.to_string()),
        heading: corporate.then(|| HEADING.to_string()),
        question: corporate.then(|| format!("\" {} \"", question)),
        timestamp: corporate.then(|| {
            format!("Generated at: {}", generated_at.format("%d/%m/%Y %H:%M:%S"))
        }),
        columns,
        pages,
    }
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

fn report_err(e: printpdf::Error) -> ChatSqlError {
    ChatSqlError::Report(e.to_string())
}

fn rgb((r, g, b): (f32, f32, f32)) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

/// Paint `plan` into PDF bytes.
pub fn render(plan: &DocumentPlan) -> ChatSqlResult<Vec<u8>> {
    let title = plan.running_title.as_deref().unwrap_or(HEADING);
    let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "content");
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(report_err)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(report_err)?,
        italic: doc.add_builtin_font(BuiltinFont::HelveticaOblique).map_err(report_err)?,
    };

    for (i, page_plan) in plan.pages.iter().enumerate() {
        let current = if i == 0 {
            doc.get_page(page).get_layer(layer)
        } else {
            let (p, l) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "content");
            doc.get_page(p).get_layer(l)
        };
        draw_page(&current, plan, page_plan, &fonts);
    }

    doc.save_to_bytes().map_err(report_err)
}

fn draw_page(layer: &PdfLayerReference, plan: &DocumentPlan, page: &PagePlan, fonts: &Fonts) {
    let corporate = plan.layout == PdfLayout::Corporate;

    if let Some(title) = &plan.running_title {
        centered(layer, title, TITLE_SIZE, PAGE_HEIGHT - MARGIN / 2.0, &fonts.bold, MUTED_TEXT);
    }
    if let Some(footer) = &page.footer {
        let x = PAGE_WIDTH - MARGIN - text_width(footer, NOTE_SIZE);
        text(layer, footer, NOTE_SIZE, x, MARGIN / 2.0, &fonts.regular, BLACK);
    }

    if page.number == 1 {
        let mut y = PAGE_HEIGHT - MARGIN - 6.0;
        if let Some(heading) = &plan.heading {
            centered(layer, heading, HEADING_SIZE, y, &fonts.bold, HEADING_TEXT);
            y -= 8.0;
        }
        if let Some(question) = &plan.question {
            centered(layer, question, BODY_SIZE + 1.0, y, &fonts.italic, MUTED_TEXT);
            y -= 6.0;
        }
        if let Some(timestamp) = &plan.timestamp {
            centered(layer, timestamp, NOTE_SIZE, y, &fonts.regular, MUTED_TEXT);
        }
    }

    if plan.columns.is_empty() {
        return;
    }

    let header_fill = if corporate { Some(HEADER_FILL) } else { None };
    let header_text = if corporate { WHITE } else { BLACK };
    let border = if corporate { GRID_LINE } else { BLACK };

    let headers: Vec<&str> = plan.columns.iter().map(|c| c.header.as_str()).collect();
    draw_row(layer, plan, page.table_top, &headers, header_fill, header_text, border, &fonts.bold);

    for (offset, row) in page.rows.iter().enumerate() {
        let top = page.table_top - ROW_HEIGHT * (offset + 1) as f32;
        let striped = corporate && (page.first_row + offset) % 2 == 1;
        let fill = if striped { Some(STRIPE_FILL) } else { None };
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        draw_row(layer, plan, top, &cells, fill, BLACK, border, &fonts.regular);
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_row(
    layer: &PdfLayerReference,
    plan: &DocumentPlan,
    top: f32,
    cells: &[&str],
    fill: Option<(f32, f32, f32)>,
    text_color: (f32, f32, f32),
    border: (f32, f32, f32),
    font: &IndirectFontRef,
) {
    let bottom = top - ROW_HEIGHT;
    let mut x = MARGIN;
    for (cell, column) in cells.iter().zip(&plan.columns) {
        let right = x + column.width;
        if let Some(color) = fill {
            layer.set_fill_color(rgb(color));
            layer.add_rect(Rect::new(Mm(x), Mm(bottom), Mm(right), Mm(top)).with_mode(PaintMode::Fill));
        }
        layer.set_outline_color(rgb(border));
        layer.set_outline_thickness(0.5);
        layer.add_rect(Rect::new(Mm(x), Mm(bottom), Mm(right), Mm(top)).with_mode(PaintMode::Stroke));
        text(layer, cell, BODY_SIZE, x + CELL_PADDING, bottom + 2.0, font, text_color);
        x = right;
    }
}

fn text(
    layer: &PdfLayerReference,
    content: &str,
    size: f32,
    x: f32,
    y: f32,
    font: &IndirectFontRef,
    color: (f32, f32, f32),
) {
    layer.set_fill_color(rgb(color));
    layer.use_text(content, size, Mm(x), Mm(y), font);
}

fn centered(
    layer: &PdfLayerReference,
    content: &str,
    size: f32,
    y: f32,
    font: &IndirectFontRef,
    color: (f32, f32, f32),
) {
    let x = ((PAGE_WIDTH - text_width(content, size)) / 2.0).max(MARGIN);
    text(layer, content, size, x, y, font, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 4)
            .unwrap()
            .and_hms_opt(9, 7, 5)
            .unwrap()
    }

    fn numbers(n: i64) -> ResultTable {
        let mut table = ResultTable::new(vec!["n".into(), "label".into()]);
        for i in 0..n {
            table.push_row(vec![Value::Int(i), Value::Text(format!("row {}", i))]);
        }
        table
    }

    #[test]
    fn test_corporate_embeds_question_and_timestamp() {
        let plan = plan(&numbers(3), "Relatório de vendas", PdfLayout::Corporate, at());
        assert_eq!(plan.question.as_deref(), Some("\" Relatório de vendas \""));
        assert_eq!(plan.timestamp.as_deref(), Some("Generated at: 04/03/2026 09:07:05"));
        assert_eq!(plan.running_title.as_deref(), Some(RUNNING_TITLE));
        assert_eq!(plan.pages[0].footer.as_deref(), Some("Page 1 of 1"));
    }

    #[test]
    fn test_simple_has_no_decorations() {
        let plan = plan(&numbers(3), "q", PdfLayout::Simple, at());
        assert!(plan.running_title.is_none());
        assert!(plan.question.is_none());
        assert!(plan.timestamp.is_none());
        assert!(plan.pages.iter().all(|p| p.footer.is_none()));
    }

    #[test]
    fn test_pagination_numbers_every_page() {
        let plan = plan(&numbers(200), "q", PdfLayout::Corporate, at());
        let count = plan.page_count();
        assert!(count > 1);
        let rows: usize = plan.pages.iter().map(|p| p.rows.len()).sum();
        assert_eq!(rows, 200);
        assert_eq!(
            plan.pages.last().unwrap().footer.as_deref(),
            Some(format!("Page {} of {}", count, count).as_str())
        );
        // First page loses room to the intro block.
        assert!(plan.pages[0].rows.len() < plan.pages[1].rows.len());
        assert_eq!(plan.pages[1].first_row, plan.pages[0].rows.len());
    }

    #[test]
    fn test_corporate_spans_full_width() {
        let plan = plan(&numbers(2), "q", PdfLayout::Corporate, at());
        let total: f32 = plan.columns.iter().map(|c| c.width).sum();
        assert!((total - (PAGE_WIDTH - 2.0 * MARGIN)).abs() < 0.01);
    }

    #[test]
    fn test_long_cells_are_shortened() {
        let long = "x".repeat(500);
        let table = ResultTable::new(vec!["a".into(), "b".into()])
            .with_row([Value::Text(long.clone()), Value::Text(long)]);
        let plan = plan(&table, "q", PdfLayout::Simple, at());
        let cell = &plan.pages[0].rows[0][0];
        assert!(cell.ends_with("..."));
        assert!(text_width(cell, BODY_SIZE) <= plan.columns[0].width);
    }

    #[test]
    fn test_empty_table_is_one_page() {
        let plan = plan(&ResultTable::default(), "q", PdfLayout::Corporate, at());
        assert_eq!(plan.page_count(), 1);
        assert!(plan.columns.is_empty());
        let bytes = render(&plan).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_multi_page() {
        let plan = plan(&numbers(120), "q", PdfLayout::Corporate, at());
        let bytes = render(&plan).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
