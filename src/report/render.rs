use super::layout::{DrawOp, PAGE_HEIGHT, PAGE_WIDTH, PageLayout};
use crate::error::AppError;
use printpdf::{BuiltinFont, Line, Mm, PdfDocument, Point};

fn render_error<E: std::fmt::Debug>(e: E) -> AppError {
    tracing::error!(error = ?e, "PDF rendering failed");
    AppError::Render(format!("{:?}", e))
}

/// Draws laid-out pages into an in-memory PDF. Nothing touches the disk, so a
/// failure leaves no partial file behind.
pub fn render_pdf(title: &str, pages: &[PageLayout]) -> Result<Vec<u8>, AppError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Halaman 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(render_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(render_error)?;

    for (index, page) in pages.iter().enumerate() {
        let (page_index, layer_index) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(
                Mm(PAGE_WIDTH),
                Mm(PAGE_HEIGHT),
                format!("Halaman {}", index + 1),
            )
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);
        layer.set_outline_thickness(0.3);

        for op in &page.ops {
            match op {
                DrawOp::Text {
                    x,
                    y,
                    size,
                    bold: is_bold,
                    text,
                } => {
                    let font = if *is_bold { &bold } else { &regular };
                    layer.use_text(text.clone(), *size, Mm(*x), Mm(PAGE_HEIGHT - *y), font);
                }
                DrawOp::Line { x1, y1, x2, y2 } => {
                    layer.add_line(Line {
                        points: vec![
                            (Point::new(Mm(*x1), Mm(PAGE_HEIGHT - *y1)), false),
                            (Point::new(Mm(*x2), Mm(PAGE_HEIGHT - *y2)), false),
                        ],
                        is_closed: false,
                    });
                }
            }
        }
    }

    doc.save_to_bytes().map_err(render_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::layout::layout_report;
    use crate::report::{Report, ReportPeriod, SignatureBlock};
    use crate::utils::time_fmt::parse_date_key;

    #[test]
    fn renders_a_pdf_document() {
        let date = parse_date_key("2025-03-01").unwrap();
        let report = Report {
            title: "Laporan Absensi Karyawan".into(),
            period: ReportPeriod::Single(date),
            rows: Vec::new(),
            signature: SignatureBlock {
                city: "Jakarta".into(),
                title: "Manager HRD".into(),
                name: "Sri Wahyuni".into(),
            },
            printed_on: date,
        };
        let bytes = render_pdf(&report.title, &layout_report(&report)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
