//! End-to-end fetch → extract → shape runs against a mock organizer server.

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use showroom_etl::calendar;
use showroom_etl::config::{AppConfig, FtpConfig, ShowroomConfig};
use showroom_etl::models::{
    BillingPeriod, PeriodAddressing, ROOM_SALES, TIME_CHARGE, UnitStatus,
};
use showroom_etl::pipeline::Pipeline;

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

fn test_config(server_uri: &str) -> AppConfig {
    AppConfig {
        showroom: ShowroomConfig {
            auth_cookie_string: "sr_id=abc; lang=en".into(),
            kpi_cookie_string: None,
            base_url: format!("{}/organizer", server_uri),
            timeout_secs: 5,
            user_agent: "test-agent".into(),
            login_markers: vec!["ログイン".into(), "会員登録".into()],
            floor_year: 2024,
            floor_month: 1,
        },
        ftp: FtpConfig {
            host: "ftp.invalid".into(),
            user: "u".into(),
            password: "p".into(),
            revenue_base_path: "/billing/upload".into(),
            kpi_base_path: "/billing/kpi".into(),
        },
    }
}

fn september() -> BillingPeriod {
    BillingPeriod {
        label: "2025年09月分".into(),
        year: 2025,
        month: 9,
        addressing: PeriodAddressing::Epoch(calendar::month_epoch_jst(2025, 9).unwrap()),
    }
}

fn september_range() -> BillingPeriod {
    let (from, to) = calendar::month_date_range(2025, 9).unwrap();
    BillingPeriod {
        label: "2025年09月分".into(),
        year: 2025,
        month: 9,
        addressing: PeriodAddressing::DateRange { from, to },
    }
}

// ── Revenue reports ───────────────────────────────────────────────────────────

#[tokio::test]
async fn time_charge_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organizer/show_rank_time_charge_hist_invoice_format"))
        .and(query_param("from", "1756652400"))
        // The session cookie is forwarded with the locale forced to ja.
        .and(header("cookie", "sr_id=abc; lang=ja"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("time_charge_page.html")))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(test_config(&server.uri()), true).unwrap();
    let run = pipeline.run_revenue(&september(), &[TIME_CHARGE]).await;

    assert!(run.all_succeeded());
    let outcome = &run.outcomes[0];
    match outcome.status {
        UnitStatus::Shaped { rows, .. } => assert_eq!(rows, 2),
        ref other => panic!("expected shaped outcome, got {:?}", other),
    }

    let preview = outcome.preview.as_deref().unwrap();
    let mut lines = preview.lines();
    let first = lines.next().unwrap();
    assert!(first.starts_with("1234,acct1,20"), "unexpected first line: {}", first);
    assert_eq!(lines.next().unwrap(), "980,acct2,");
}

#[tokio::test]
async fn empty_month_uploads_sentinel_row() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organizer/show_rank_time_charge_hist_invoice_format"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("empty_month_page.html")))
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(test_config(&server.uri()), true).unwrap();
    let run = pipeline.run_revenue(&september(), &[TIME_CHARGE]).await;

    assert!(run.all_succeeded());
    let preview = run.outcomes[0].preview.as_deref().unwrap();
    assert!(preview.starts_with("0,dummy,20"), "unexpected preview: {}", preview);
}

#[tokio::test]
async fn room_sales_prepends_organizer_total() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organizer/room_sales_hist_invoice_format"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("room_sales_page.html")))
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(test_config(&server.uri()), true).unwrap();
    let run = pipeline.run_revenue(&september(), &[ROOM_SALES]).await;

    assert!(run.all_succeeded());
    let preview = run.outcomes[0].preview.as_deref().unwrap();
    let mut lines = preview.lines();
    assert!(lines.next().unwrap().starts_with("1234567,MKsoul,20"));
    assert_eq!(lines.next().unwrap(), "500000,room_c,");
    assert_eq!(lines.next().unwrap(), "734567,room_d,");
}

#[tokio::test]
async fn login_page_fails_unit_without_stopping_siblings() {
    let server = MockServer::start().await;

    // Expired session: 200 with the login page for time-charge…
    Mock::given(method("GET"))
        .and(path("/organizer/show_rank_time_charge_hist_invoice_format"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("login_page.html")))
        .mount(&server)
        .await;
    // …while room-sales still answers normally.
    Mock::given(method("GET"))
        .and(path("/organizer/room_sales_hist_invoice_format"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("room_sales_page.html")))
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(test_config(&server.uri()), true).unwrap();
    let run = pipeline.run_revenue(&september(), &[TIME_CHARGE, ROOM_SALES]).await;

    assert_eq!(run.stats.units, 2);
    assert_eq!(run.stats.failed, 1);
    match &run.outcomes[0].status {
        UnitStatus::Failed { error } => assert!(error.contains("session expired"), "{}", error),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(run.outcomes[1].is_success());
}

#[tokio::test]
async fn http_error_is_surfaced_per_unit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organizer/show_rank_time_charge_hist_invoice_format"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(test_config(&server.uri()), true).unwrap();
    let run = pipeline.run_revenue(&september(), &[TIME_CHARGE]).await;

    match &run.outcomes[0].status {
        UnitStatus::Failed { error } => assert!(error.contains("503"), "{}", error),
        other => panic!("expected failure, got {:?}", other),
    }
}

// ── KPI pagination ────────────────────────────────────────────────────────────

fn kpi_row_html(index: usize) -> String {
    let mut tds = String::new();
    tds.push_str(&format!("<td>{}</td>", index + 1));
    tds.push_str(&format!("<td><a href=\"/u/{0}\">acct{0}</a></td>", index));
    tds.push_str(&format!("<td><a href=\"/room/{0}\">{0}</a></td>", 10_000 + index));
    tds.push_str(&format!("<td><span class=\"room-name\">ルーム{}</span></td>", index));
    tds.push_str(&format!("<td>2025-09-{:02} 21:00:00 (45m10s)</td>", 1 + index % 28));
    for metric in 0..18 {
        tds.push_str(&format!("<td>1,{:03}</td>", metric));
    }
    tds.push_str("<td>12.5%</td>");
    tds.push_str("<td>3</td><td>4</td><td>5</td>");
    tds.push_str("<td><a href=\"/detail\">詳細</a></td>");
    format!("<tr>{}</tr>", tds)
}

fn kpi_page_html(indices: std::ops::Range<usize>) -> String {
    let rows: String = indices.map(kpi_row_html).collect();
    format!(
        "<html><body><table><tr><th>No</th><th>アカウント</th></tr>{}</table></body></html>",
        rows
    )
}

#[tokio::test]
async fn kpi_fetches_until_short_page_and_dedupes() {
    let server = MockServer::start().await;

    // Pages 1 and 2 are full (1000 rows), page 3 is short (400 rows) and
    // repeats row 1999 from page 2; pagination must stop after page 3.
    Mock::given(method("GET"))
        .and(path("/organizer/live_kpi"))
        .and(query_param("from_date", "2025-09-01"))
        .and(query_param("to_date", "2025-09-30"))
        .and(query_param("page", "1"))
        .and(query_param("room_id", ""))
        .respond_with(ResponseTemplate::new(200).set_body_string(kpi_page_html(0..1000)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/organizer/live_kpi"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(kpi_page_html(1000..2000)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/organizer/live_kpi"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(kpi_page_html(1999..2399)))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(test_config(&server.uri()), true).unwrap();
    let run = pipeline.run_kpi(&[september_range()]).await;

    assert!(run.all_succeeded());
    match run.outcomes[0].status {
        // 2400 raw rows, one cross-page duplicate removed.
        UnitStatus::Shaped { rows, .. } => assert_eq!(rows, 2399),
        ref other => panic!("expected shaped outcome, got {:?}", other),
    }

    let preview = run.outcomes[0].preview.as_deref().unwrap();
    let mut lines = preview.lines();
    assert!(lines.next().unwrap().starts_with("アカウントID,ルームID,ルーム名,"));
    assert!(lines.next().unwrap().starts_with("acct0,10000,ルーム0,2025-09-01 21:00:00,45,"));
}

#[tokio::test]
async fn kpi_stops_on_header_only_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organizer/live_kpi"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(kpi_page_html(0..1000)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/organizer/live_kpi"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(kpi_page_html(0..0)))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(test_config(&server.uri()), true).unwrap();
    let run = pipeline.run_kpi(&[september_range()]).await;

    assert!(run.all_succeeded());
    match run.outcomes[0].status {
        UnitStatus::Shaped { rows, .. } => assert_eq!(rows, 1000),
        ref other => panic!("expected shaped outcome, got {:?}", other),
    }
}
