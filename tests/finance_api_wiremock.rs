#![cfg(feature = "source")]

use anyhow::Result;
use balancebook::ingest::{normalize_all, FinanceApiSource, PerformanceSource};
use chrono::{NaiveDate, Utc};
use secrecy::SecretString;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn source(server: &MockServer) -> FinanceApiSource {
    FinanceApiSource::new(server.uri(), 7, SecretString::from("secret-token".to_string()))
}

#[tokio::test]
async fn posts_date_range_with_bearer_token() -> Result<()> {
    let server = MockServer::start().await;

    let body = r#"{
        "data": {
            "recentTransactions": {
                "data": [
                    {
                        "date": "2024-01-03T00:00:00.000Z",
                        "startBalance": "1010.00",
                        "endBalance": "1000.00",
                        "wonCount": "0",
                        "lostCount": "2",
                        "winRate": "0.00",
                        "deposits": "0.00",
                        "withdrawals": "0.00",
                        "profit": "-10.00",
                        "growthdaily": "-0.99",
                        "growth": -0.0
                    },
                    {
                        "date": "2024-01-02",
                        "startBalance": "1000.00",
                        "endBalance": "1010.00",
                        "wonCount": 2,
                        "lostCount": 1,
                        "winRate": "66.67",
                        "deposits": "0.00",
                        "withdrawals": "0.00",
                        "profit": "10.00",
                        "growthdaily": 1.0,
                        "growth": 1.0
                    }
                ]
            }
        }
    }"#;

    Mock::given(method("POST"))
        .and(path("/daily-performance-report/7"))
        .and(header("authorization", "Bearer secret-token"))
        .and(body_json(serde_json::json!({
            "startDate": "2024-01-01",
            "endDate": "2024-01-05"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let raws = source(&server)
        .fetch_daily_performance(date("2024-01-01"), date("2024-01-05"))
        .await?;
    assert_eq!(raws.len(), 2);

    let rows = normalize_all(&raws, Utc::now())?;
    assert_eq!(rows[0].date, date("2024-01-02"));
    assert_eq!(rows[0].total_trades, 3);
    assert_eq!(rows[1].date, date("2024-01-03"));
    assert_eq!(rows[1].daily_growth, -0.99);
    assert_eq!(rows[1].realized_profit, -10.0);

    Ok(())
}

#[tokio::test]
async fn http_error_status_is_reported() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/daily-performance-report/7"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = source(&server)
        .fetch_daily_performance(date("2024-01-01"), date("2024-01-05"))
        .await;

    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("401"));
    Ok(())
}

#[tokio::test]
async fn missing_rows_array_is_empty() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/daily-performance-report/7"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"data": {"recentTransactions": {}}}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let raws = source(&server)
        .fetch_daily_performance(date("2024-01-01"), date("2024-01-05"))
        .await?;
    assert!(raws.is_empty());
    Ok(())
}
