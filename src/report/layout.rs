use super::{Column, ColumnField, Report};
use crate::attendance::aggregator::ReportRow;
use crate::model::attendance::AttendanceRow;
use crate::utils::time_fmt::format_long_date;

// A4 portrait, millimetres, y grows downwards from the top edge.
pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
pub const MARGIN_X: f32 = 10.0;
pub const TOP_MARGIN: f32 = 20.0;
pub const BOTTOM_MARGIN: f32 = 15.0;
pub const TABLE_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN_X;

pub const HEADER_ROW_HEIGHT: f32 = 8.0;
pub const ROW_HEIGHT: f32 = 7.0;
pub const SIGNATURE_GAP: f32 = 10.0;
pub const SIGNATURE_HEIGHT: f32 = 40.0;

const TITLE_SIZE: f32 = 14.0;
const SUBTITLE_SIZE: f32 = 11.0;
const CELL_SIZE: f32 = 8.0;
const SIGNATURE_SIZE: f32 = 10.0;
const SIGNATURE_X: f32 = 140.0;
const CELL_PADDING: f32 = 1.5;

const EMPTY_LABEL: &str = "Tidak ada data absensi";

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        text: String,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub ops: Vec<DrawOp>,
}

impl PageLayout {
    fn text(&mut self, x: f32, y: f32, size: f32, bold: bool, text: impl Into<String>) {
        self.ops.push(DrawOp::Text {
            x,
            y,
            size,
            bold,
            text: text.into(),
        });
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.ops.push(DrawOp::Line { x1, y1, x2, y2 });
    }

    #[cfg(test)]
    pub fn texts(&self) -> impl Iterator<Item = (&str, f32)> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, y, .. } => Some((text.as_str(), *y)),
            DrawOp::Line { .. } => None,
        })
    }
}

struct Cursor {
    pages: Vec<PageLayout>,
    page: PageLayout,
    y: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            page: PageLayout::default(),
            y: TOP_MARGIN,
        }
    }

    fn new_page(&mut self) {
        let done = std::mem::take(&mut self.page);
        self.pages.push(done);
        self.y = TOP_MARGIN;
    }

    fn finish(mut self) -> Vec<PageLayout> {
        self.pages.push(self.page);
        self.pages
    }
}

/// Lays out a report onto A4 pages.
///
/// The table header repeats on every page the table spans. The signature
/// block never splits: when it would run into the bottom margin it moves to a
/// fresh page starting at the top margin.
pub fn layout_report(report: &Report) -> Vec<PageLayout> {
    let columns = report.period.variant().columns();
    let mut cur = Cursor::new();

    cur.page.text(MARGIN_X, cur.y, TITLE_SIZE, true, &report.title);
    cur.y += 7.0;
    cur.page
        .text(MARGIN_X, cur.y, SUBTITLE_SIZE, false, report.period.subtitle());
    cur.y += 8.0;

    table_header(&mut cur, columns);

    if report.rows.is_empty() {
        full_width_row(&mut cur, EMPTY_LABEL);
    }

    let mut number = 0usize;
    for row in &report.rows {
        if cur.y + ROW_HEIGHT > PAGE_HEIGHT - BOTTOM_MARGIN {
            cur.new_page();
            table_header(&mut cur, columns);
        }
        match row {
            ReportRow::Banner { date, label } => {
                full_width_row(&mut cur, &format!("{}  {}", date, label));
            }
            ReportRow::Entry(entry) => {
                number += 1;
                data_row(&mut cur, columns, number, entry);
            }
        }
    }

    cur.y += SIGNATURE_GAP;
    if cur.y + SIGNATURE_HEIGHT > PAGE_HEIGHT - BOTTOM_MARGIN {
        cur.new_page();
    }
    signature_block(&mut cur, report);

    cur.finish()
}

fn table_header(cur: &mut Cursor, columns: &[Column]) {
    let top = cur.y;
    let bottom = top + HEADER_ROW_HEIGHT;
    cur.page.line(MARGIN_X, top, MARGIN_X + TABLE_WIDTH, top);

    let mut x = MARGIN_X;
    for column in columns {
        cur.page.text(
            x + CELL_PADDING,
            bottom - 2.5,
            CELL_SIZE,
            true,
            fit(column.title, column.width),
        );
        x += column.width;
    }
    row_rules(cur, columns, top, bottom);
    cur.y = bottom;
}

fn data_row(cur: &mut Cursor, columns: &[Column], number: usize, entry: &AttendanceRow) {
    let top = cur.y;
    let bottom = top + ROW_HEIGHT;

    let mut x = MARGIN_X;
    for column in columns {
        let value = cell_value(column.field, number, entry);
        cur.page.text(
            x + CELL_PADDING,
            bottom - 2.2,
            CELL_SIZE,
            false,
            fit(&value, column.width),
        );
        x += column.width;
    }
    row_rules(cur, columns, top, bottom);
    cur.y = bottom;
}

fn full_width_row(cur: &mut Cursor, text: &str) {
    let top = cur.y;
    let bottom = top + ROW_HEIGHT;
    cur.page.text(
        MARGIN_X + CELL_PADDING,
        bottom - 2.2,
        CELL_SIZE,
        true,
        fit(text, TABLE_WIDTH),
    );
    cur.page.line(MARGIN_X, top, MARGIN_X, bottom);
    cur.page
        .line(MARGIN_X + TABLE_WIDTH, top, MARGIN_X + TABLE_WIDTH, bottom);
    cur.page
        .line(MARGIN_X, bottom, MARGIN_X + TABLE_WIDTH, bottom);
    cur.y = bottom;
}

/// Vertical separators for every column plus the bottom rule.
fn row_rules(cur: &mut Cursor, columns: &[Column], top: f32, bottom: f32) {
    let mut x = MARGIN_X;
    cur.page.line(x, top, x, bottom);
    for column in columns {
        x += column.width;
        cur.page.line(x, top, x, bottom);
    }
    cur.page
        .line(MARGIN_X, bottom, MARGIN_X + TABLE_WIDTH, bottom);
}

fn signature_block(cur: &mut Cursor, report: &Report) {
    let sig = &report.signature;
    let top = cur.y;
    cur.page.text(
        SIGNATURE_X,
        top + 5.0,
        SIGNATURE_SIZE,
        false,
        format!("{}, {}", sig.city, format_long_date(report.printed_on)),
    );
    cur.page
        .text(SIGNATURE_X, top + 10.0, SIGNATURE_SIZE, false, &sig.title);
    cur.page
        .text(SIGNATURE_X, top + 34.0, SIGNATURE_SIZE, true, &sig.name);
    cur.page
        .line(SIGNATURE_X, top + 35.5, PAGE_WIDTH - MARGIN_X, top + 35.5);
    cur.y = top + SIGNATURE_HEIGHT;
}

fn cell_value(field: ColumnField, number: usize, entry: &AttendanceRow) -> String {
    let r = &entry.record;
    let or_dash = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("-")
            .to_string()
    };
    match field {
        ColumnField::Number => number.to_string(),
        ColumnField::Date => entry.date.clone(),
        ColumnField::Name => or_dash(&r.name),
        ColumnField::Position => or_dash(&r.position),
        ColumnField::CheckInTime => or_dash(&r.time),
        ColumnField::CheckInStatus => or_dash(&r.status),
        ColumnField::CheckOutTime => or_dash(&r.time_checkout),
        ColumnField::CheckOutStatus => or_dash(&r.status_checkout),
        ColumnField::Details => or_dash(&r.absence_details),
    }
}

/// Truncates text to what fits in a cell at the table font size. Helvetica
/// averages about half an em per glyph.
fn fit(text: &str, width: f32) -> String {
    let glyph_mm = CELL_SIZE * 0.5 * 0.3528;
    let capacity = ((width - 2.0 * CELL_PADDING) / glyph_mm).floor().max(1.0) as usize;
    if text.chars().count() <= capacity {
        return text.to_string();
    }
    let kept: String = text.chars().take(capacity.saturating_sub(2)).collect();
    format!("{}..", kept.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceRecord;
    use crate::report::{ReportPeriod, SignatureBlock};
    use crate::utils::time_fmt::parse_date_key;

    fn report(rows: usize, period: ReportPeriod) -> Report {
        let rows = (0..rows)
            .map(|i| {
                ReportRow::Entry(AttendanceRow {
                    date: "2025-03-03".into(),
                    record: AttendanceRecord {
                        uid: format!("U{}", i),
                        name: Some(format!("Pegawai {}", i)),
                        status: Some("Tepat Waktu".into()),
                        ..Default::default()
                    },
                })
            })
            .collect();
        Report {
            title: "Laporan Absensi Karyawan".into(),
            period,
            rows,
            signature: SignatureBlock {
                city: "Jakarta".into(),
                title: "Manager HRD".into(),
                name: "Sri Wahyuni".into(),
            },
            printed_on: parse_date_key("2025-03-04").unwrap(),
        }
    }

    fn daily() -> ReportPeriod {
        ReportPeriod::Single(parse_date_key("2025-03-03").unwrap())
    }

    fn rows_per_first_page() -> usize {
        let table_top = TOP_MARGIN + 15.0 + HEADER_ROW_HEIGHT;
        ((PAGE_HEIGHT - BOTTOM_MARGIN - table_top) / ROW_HEIGHT).floor() as usize
    }

    fn page_with(pages: &[PageLayout], needle: &str) -> Option<(usize, f32)> {
        pages.iter().enumerate().find_map(|(i, p)| {
            p.texts()
                .find(|(t, _)| t.contains(needle))
                .map(|(_, y)| (i, y))
        })
    }

    #[test]
    fn short_report_fits_on_one_page() {
        let pages = layout_report(&report(3, daily()));
        assert_eq!(pages.len(), 1);
        assert!(page_with(&pages, "Sri Wahyuni").is_some());
        assert!(page_with(&pages, "Pegawai 2").is_some());
    }

    #[test]
    fn signature_moves_to_new_page_when_it_would_overflow() {
        // Table ends close enough to the bottom that gap + block no longer fit.
        let rows = rows_per_first_page() - 2;
        let pages = layout_report(&report(rows, daily()));
        assert_eq!(pages.len(), 2);

        let (page, y) = page_with(&pages, "Jakarta, 04 Maret 2025").unwrap();
        assert_eq!(page, 1);
        assert!((y - (TOP_MARGIN + 5.0)).abs() < 0.01);
        assert!(page_with(&pages, &format!("Pegawai {}", rows - 1)).unwrap().0 == 0);
    }

    #[test]
    fn signature_respects_the_bottom_margin() {
        // Largest table that still leaves room for gap + block above the margin.
        let table_top = TOP_MARGIN + 15.0 + HEADER_ROW_HEIGHT;
        let fits = ((PAGE_HEIGHT - BOTTOM_MARGIN - table_top - SIGNATURE_GAP - SIGNATURE_HEIGHT)
            / ROW_HEIGHT)
            .floor() as usize;

        let pages = layout_report(&report(fits, daily()));
        assert_eq!(pages.len(), 1);
        let (_, y) = page_with(&pages, "Sri Wahyuni").unwrap();
        assert!(y <= PAGE_HEIGHT - BOTTOM_MARGIN);

        let pages = layout_report(&report(fits + 1, daily()));
        assert_eq!(pages.len(), 2);
        assert_eq!(page_with(&pages, "Sri Wahyuni").unwrap().0, 1);
        assert_eq!(page_with(&pages, &format!("Pegawai {}", fits)).unwrap().0, 0);
    }

    #[test]
    fn long_tables_repeat_the_header() {
        let pages = layout_report(&report(rows_per_first_page() + 5, daily()));
        assert!(pages.len() >= 2);
        for page in &pages[..2] {
            assert!(page.texts().any(|(t, _)| t == "Nama"));
        }
        let last_row = format!("Pegawai {}", rows_per_first_page() + 4);
        assert_eq!(page_with(&pages, &last_row).unwrap().0, 1);
    }

    #[test]
    fn rows_never_cross_the_bottom_margin() {
        let pages = layout_report(&report(120, daily()));
        assert!(pages.len() >= 4);
        for page in &pages {
            for op in &page.ops {
                if let DrawOp::Text { size, y, .. } = op {
                    if *size == CELL_SIZE {
                        assert!(*y <= PAGE_HEIGHT - BOTTOM_MARGIN);
                    }
                }
            }
        }
    }

    #[test]
    fn empty_report_prints_placeholder_and_numbers_skip_banners() {
        let pages = layout_report(&report(0, daily()));
        assert!(page_with(&pages, EMPTY_LABEL).is_some());

        let mut r = report(2, daily());
        r.rows.insert(
            1,
            ReportRow::Banner {
                date: "2025-03-02".into(),
                label: "Hari Libur (Minggu)".into(),
            },
        );
        let pages = layout_report(&r);
        let numbers: Vec<&str> = pages[0]
            .texts()
            .filter(|(t, _)| *t == "1" || *t == "2" || *t == "3")
            .map(|(t, _)| t)
            .collect();
        assert_eq!(numbers, vec!["1", "2"]);
        assert!(page_with(&pages, "2025-03-02  Hari Libur (Minggu)").is_some());
    }

    #[test]
    fn long_values_are_truncated_to_cell_width() {
        let text = "Nama Yang Sangat Panjang Sekali Untuk Sebuah Sel";
        let fitted = fit(text, 25.0);
        assert!(fitted.ends_with(".."));
        assert!(fitted.chars().count() < text.chars().count());
        assert_eq!(fit("Budi", 25.0), "Budi");
    }
}
