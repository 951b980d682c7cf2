use std::time::Instant;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use bytes::Bytes;

use super::middleware::RequestContext;
use super::request::{required_url, GenerateReportBody};
use super::AppState;
use crate::compression::DEFAULT_QUALITY;
use crate::error::{AppResult, ValidationError};
use crate::models::RenderRequest;
use crate::utils::trace_phase;

pub async fn health() -> &'static str {
    "OK"
}

/// `GET /generateReport/{url}`
pub async fn generate_report_from_path(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(url): Path<String>,
) -> AppResult<Response> {
    let url = required_url(Some(&url))?;
    let request = RenderRequest::new(url).with_timeout(state.default_timeout);
    render(&state, &ctx, request).await
}

/// `POST /generateReport`
pub async fn generate_report(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    payload: Result<Json<GenerateReportBody>, JsonRejection>,
) -> AppResult<Response> {
    let Json(body) = payload.map_err(|rejection| ValidationError::Malformed {
        message: rejection.body_text(),
    })?;
    let request = body.into_render_request(state.default_timeout, state.max_timeout)?;
    render(&state, &ctx, request).await
}

/// `POST /compressPdf/{dpi}`
pub async fn compress_pdf(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    dpi: Result<Path<i64>, PathRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let Path(dpi) = dpi.map_err(|rejection| ValidationError::Malformed {
        message: rejection.body_text(),
    })?;
    require_pdf_content_type(&headers)?;
    if body.is_empty() {
        return Err(ValidationError::EmptyBody.into());
    }

    trace_phase(
        &format!("开始压缩上传的 PDF ({} 字节, dpi {})", body.len(), dpi),
        ctx.received_at,
        &ctx.correlation_id,
    );
    let start = Instant::now();
    let compressed = state
        .compressor
        .compress(body, dpi, i64::from(DEFAULT_QUALITY))
        .await?;
    trace_phase(
        &format!("压缩完成 ({} 字节)", compressed.len()),
        start,
        &ctx.correlation_id,
    );
    Ok(pdf_response(compressed))
}

async fn render(state: &AppState, ctx: &RequestContext, request: RenderRequest) -> AppResult<Response> {
    let pdf = state
        .renderer
        .render_since(&request, &ctx.correlation_id, ctx.received_at)
        .await?;
    trace_phase("准备返回 PDF", ctx.received_at, &ctx.correlation_id);
    Ok(pdf_response(pdf))
}

/// 上传体必须是 PDF；未带 Content-Type 时放行
fn require_pdf_content_type(headers: &HeaderMap) -> Result<(), ValidationError> {
    let Some(value) = headers.get(header::CONTENT_TYPE) else {
        return Ok(());
    };
    let raw = value.to_str().unwrap_or_default();
    let essence = raw.split(';').next().unwrap_or_default().trim();
    if essence.eq_ignore_ascii_case("application/pdf")
        || essence.eq_ignore_ascii_case("application/octet-stream")
    {
        return Ok(());
    }
    Err(ValidationError::UnsupportedContentType {
        content_type: raw.to_string(),
    })
}

fn pdf_response(pdf: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "application/pdf")], pdf).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_content_type(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_pdf_content_types_are_accepted() {
        assert!(require_pdf_content_type(&HeaderMap::new()).is_ok());
        assert!(require_pdf_content_type(&with_content_type("application/pdf")).is_ok());
        assert!(require_pdf_content_type(&with_content_type("Application/PDF; charset=binary")).is_ok());
        assert!(require_pdf_content_type(&with_content_type("application/octet-stream")).is_ok());
    }

    #[test]
    fn test_other_content_types_are_rejected() {
        let err = require_pdf_content_type(&with_content_type("text/plain")).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnsupportedContentType {
                content_type: "text/plain".to_string()
            }
        );
        assert!(require_pdf_content_type(&with_content_type("application/json")).is_err());
    }
}
