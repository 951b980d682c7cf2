mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{FakeBrowser, FakeCompressor, FAKE_COMPRESSED, FAKE_PDF};
use ev_web_pdf::error::RenderError;
use ev_web_pdf::{CompressionSettings, CookieSpec, InterceptRule, RenderRequest, RenderService};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

fn service(browser: &FakeBrowser, compressor: &FakeCompressor) -> RenderService {
    RenderService::new(Arc::new(browser.clone()), Arc::new(compressor.clone()), 4)
}

#[tokio::test]
async fn test_steps_run_in_order_and_page_closes_once() {
    let browser = FakeBrowser::default();
    let compressor = FakeCompressor::default();
    let request = RenderRequest::new("example.com/report")
        .with_cookies(vec![CookieSpec::new("session", "abc")])
        .with_intercept(vec![InterceptRule::new("/api/x", json!({"a": 1}))])
        .with_wait_for_selector("#ready");

    let pdf = assert_ok!(service(&browser, &compressor).render(&request, "cid").await);

    assert_eq!(pdf, FAKE_PDF);
    assert_eq!(
        browser.steps(),
        vec![
            "cookies:1@http://example.com/report",
            "intercept:1",
            "navigate:http://example.com/report",
            "selector:#ready",
            "pdf",
            "close",
        ]
    );
    assert_eq!(browser.opened(), 1);
    assert_eq!(browser.closed(), 1);
    assert!(compressor.calls().is_empty());
}

#[tokio::test]
async fn test_optional_steps_are_skipped() {
    let browser = FakeBrowser::default();
    let request = RenderRequest::new("https://example.com");

    assert_ok!(
        service(&browser, &FakeCompressor::default())
            .render(&request, "cid")
            .await
    );

    assert_eq!(
        browser.steps(),
        vec!["navigate:https://example.com", "selector:body", "pdf", "close"]
    );
}

#[tokio::test]
async fn test_page_closed_when_pdf_fails_after_navigation() {
    let browser = FakeBrowser::failing_at("pdf");
    let request = RenderRequest::new("example.com");

    let err = assert_err!(
        service(&browser, &FakeCompressor::default())
            .render(&request, "cid")
            .await
    );

    assert!(matches!(err, RenderError::PrintFailed { .. }));
    let steps = browser.steps();
    assert_eq!(steps[steps.len() - 2..], ["pdf", "close"]);
    assert_eq!(browser.closed(), 1);
}

#[tokio::test]
async fn test_page_closed_when_navigation_times_out() {
    let browser = FakeBrowser::failing_at("navigate");
    let request = RenderRequest::new("example.com");

    let err = assert_err!(
        service(&browser, &FakeCompressor::default())
            .render(&request, "cid")
            .await
    );

    assert!(matches!(err, RenderError::Timeout { .. }));
    assert_eq!(browser.steps(), vec!["navigate:http://example.com", "close"]);
    assert_eq!(browser.closed(), 1);
}

#[tokio::test]
async fn test_page_closed_when_selector_never_appears() {
    let browser = FakeBrowser::failing_at("selector");

    let err = assert_err!(
        service(&browser, &FakeCompressor::default())
            .render(&RenderRequest::new("example.com"), "cid")
            .await
    );

    assert!(matches!(err, RenderError::SelectorTimeout { .. }));
    assert!(!browser.steps().contains(&"pdf".to_string()));
    assert_eq!(browser.closed(), 1);
}

#[tokio::test]
async fn test_page_closed_when_cookie_setup_fails() {
    let browser = FakeBrowser::failing_at("cookies");
    let request =
        RenderRequest::new("example.com").with_cookies(vec![CookieSpec::new("a", "1")]);

    assert_err!(
        service(&browser, &FakeCompressor::default())
            .render(&request, "cid")
            .await
    );

    assert_eq!(browser.closed(), 1);
    assert_eq!(browser.steps().last().map(String::as_str), Some("close"));
}

#[tokio::test]
async fn test_open_failure_does_not_close() {
    let browser = FakeBrowser::failing_at("open");

    let err = assert_err!(
        service(&browser, &FakeCompressor::default())
            .render(&RenderRequest::new("example.com"), "cid")
            .await
    );

    assert!(matches!(err, RenderError::PageCreationFailed { .. }));
    assert_eq!(browser.opened(), 0);
    assert_eq!(browser.closed(), 0);
}

#[tokio::test]
async fn test_exhausted_budget_times_out_and_closes() {
    let browser = FakeBrowser::default();
    let request = RenderRequest::new("example.com").with_timeout(Duration::ZERO);

    let err = assert_err!(
        service(&browser, &FakeCompressor::default())
            .render(&request, "cid")
            .await
    );

    assert!(matches!(err, RenderError::Timeout { phase: "navigation", .. }));
    assert_eq!(browser.steps(), vec!["close"]);
}

#[tokio::test]
async fn test_compression_runs_after_page_is_closed() {
    let browser = FakeBrowser::default();
    let compressor = FakeCompressor::default();
    let request = RenderRequest::new("example.com").with_compression(CompressionSettings::new(
        true,
        Some(72),
        Some(50),
    ));

    let pdf = assert_ok!(service(&browser, &compressor).render(&request, "cid").await);

    assert_eq!(pdf, FAKE_COMPRESSED);
    assert_eq!(compressor.calls(), vec![(FAKE_PDF.len(), 72, 50)]);
    assert_eq!(browser.closed(), 1);
}

#[tokio::test]
async fn test_compression_failure_is_render_failure() {
    let browser = FakeBrowser::default();
    let compressor = FakeCompressor::failing_with(1);
    let request = RenderRequest::new("example.com")
        .with_compression(CompressionSettings::new(true, None, None));

    let err = assert_err!(service(&browser, &compressor).render(&request, "cid").await);

    assert!(matches!(err, RenderError::Compression(_)));
    assert_eq!(compressor.calls(), vec![(FAKE_PDF.len(), 150, 95)]);
    assert_eq!(browser.closed(), 1);
}

#[tokio::test]
async fn test_concurrent_renders_each_close_their_page() {
    let browser = FakeBrowser::default();
    let service = Arc::new(RenderService::new(
        Arc::new(browser.clone()),
        Arc::new(FakeCompressor::default()),
        2,
    ));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .render(&RenderRequest::new(format!("example.com/{i}")), "cid")
                    .await
            })
        })
        .collect();
    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }

    assert_eq!(browser.opened(), 8);
    assert_eq!(browser.closed(), 8);
}

#[tokio::test]
async fn test_open_pages_never_exceed_limit() {
    let browser = FakeBrowser::with_navigate_delay(Duration::from_millis(20));
    let service = Arc::new(RenderService::new(
        Arc::new(browser.clone()),
        Arc::new(FakeCompressor::default()),
        2,
    ));

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .render(&RenderRequest::new(format!("example.com/{i}")), "cid")
                    .await
            })
        })
        .collect();
    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }

    assert_eq!(browser.opened(), 10);
    assert_eq!(browser.closed(), 10);
    assert_eq!(browser.peak_open(), 2);
}

#[tokio::test]
async fn test_render_since_earlier_marker() {
    let browser = FakeBrowser::default();
    let received_at = Instant::now().checked_sub(Duration::from_millis(30)).unwrap();

    let pdf = assert_ok!(
        service(&browser, &FakeCompressor::default())
            .render_since(&RenderRequest::new("example.com"), "cid", received_at)
            .await
    );

    assert_eq!(pdf, FAKE_PDF);
    assert_eq!(browser.closed(), 1);
}
