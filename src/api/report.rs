use crate::{
    api::attendance::{AttendanceQuery, load_selection, today},
    attendance::aggregator::{ReportRow, filter_by_search, report_rows, select_dates},
    config::Config,
    error::AppError,
    report::{REPORT_TITLE, Report, ReportPeriod, SignatureBlock},
    utils::db_utils::load_holidays,
};
use actix_web::{
    HttpResponse,
    http::header::{ContentDisposition, DispositionParam, DispositionType},
    web,
};
use sqlx::MySqlPool;
use tracing::info;

/// Keeps rest-day banners and drops entries that do not match the search.
fn apply_search(rows: Vec<ReportRow>, query: &str) -> Vec<ReportRow> {
    if query.trim().is_empty() {
        return rows;
    }

    rows.into_iter()
        .filter_map(|row| match row {
            ReportRow::Banner { .. } => Some(row),
            ReportRow::Entry(entry) => filter_by_search(vec![entry], query)
                .pop()
                .map(ReportRow::Entry),
        })
        .collect()
}

/// Lays out and draws the PDF on the blocking pool, off the worker thread.
async fn render_blocking(report: Report) -> Result<Vec<u8>, AppError> {
    web::block(move || report.to_pdf())
        .await
        .map_err(|e| AppError::Render(e.to_string()))?
}

/// Download the attendance report as PDF
#[utoipa::path(
    get,
    path = "/api/reports/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "PDF attachment", body = String, content_type = "application/pdf"),
        (status = 400, description = "Invalid date selection"),
        (status = 500, description = "Report could not be rendered")
    ),
    security(("bearer_auth" = [])),
    tag = "Report"
)]
pub async fn attendance_report(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<AttendanceQuery>,
) -> Result<HttpResponse, AppError> {
    let printed_on = today();
    let selector = query.selector(printed_on);
    let period = ReportPeriod::from_selector(&selector)?;

    let store = load_selection(pool.get_ref(), &selector).await?;
    if store.is_empty() {
        info!(selector = ?selector, "Report period has no attendance");
    }
    let holidays = load_holidays(pool.get_ref()).await?;
    let dates = select_dates(&selector, &store);
    let rows = apply_search(
        report_rows(&dates, &store, &holidays, config.rest_weekday),
        query.search(),
    );

    let report = Report {
        title: REPORT_TITLE.to_string(),
        period,
        rows,
        signature: SignatureBlock {
            city: config.report_city.clone(),
            title: config.report_signatory_title.clone(),
            name: config.report_signatory_name.clone(),
        },
        printed_on,
    };

    let filename = report.filename();
    let rows = report.rows.len();
    let pdf = render_blocking(report).await?;
    info!(filename = %filename, rows, bytes = pdf.len(), "Report rendered");

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(pdf))
}
