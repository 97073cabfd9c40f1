//! HTTP handlers for the issued-certificates report

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{ReportFormat, ReportSort};
use crate::services::access::AccessService;
use crate::services::reporting::ReportService;
use crate::AppState;

/// Query parameters for the report
#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// `ods`, `xls` or `txt`; anything else renders HTML
    pub download: Option<String>,
    pub sort: Option<String>,
    /// Current group of a grouped module
    pub group: Option<i64>,
}

fn parse_sort(sort: Option<&str>) -> ReportSort {
    match sort.map(str::trim) {
        Some("date") => ReportSort::Date,
        Some("lastname") | Some("last_name") => ReportSort::LastName,
        Some("code") => ReportSort::Code,
        _ => ReportSort::StudentName,
    }
}

/// Issued certificates of a course module
pub async fn get_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(cm_id): Path<i64>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let (ctx, definition) = AccessService::new(&state)
        .authorize(current_user.0.user_id, cm_id)
        .await?;
    ctx.permissions.require_manage()?;

    let service = ReportService::new(state.certificates.clone(), state.directory.clone());
    let rows = service
        .rows(
            &ctx.course,
            &ctx.module,
            &definition,
            parse_sort(query.sort.as_deref()),
            query.group,
        )
        .await?;

    let format = ReportFormat::from_download(query.download.as_deref());
    let document = ReportService::render(&ctx.course, &definition, format, &rows)?;

    let mut headers = vec![(header::CONTENT_TYPE, document.format.content_type().to_string())];
    if let Some(file_name) = &document.file_name {
        headers.push((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name.replace('"', "")),
        ));
    }
    let mut response = document.body.into_response();
    for (name, value) in headers {
        if let Ok(value) = value.parse() {
            response.headers_mut().insert(name, value);
        }
    }
    Ok(response)
}
