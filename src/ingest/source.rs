//! HTTP client for the fund's daily performance report.
//!
//! The endpoint is `POST {base_url}/daily-performance-report/{account_id}` with
//! a JSON `{startDate, endDate}` body and a bearer token. Obtaining the token
//! is outside this client; it is supplied through configuration.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PerformanceSource, RawPerformanceRow};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportRequest {
    start_date: String,
    end_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportResponse {
    data: ReportData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportData {
    recent_transactions: ReportPage,
}

#[derive(Debug, Deserialize)]
struct ReportPage {
    #[serde(default)]
    data: Vec<RawPerformanceRow>,
}

/// Performance source backed by the fund dashboard API.
#[derive(Debug)]
pub struct FinanceApiSource {
    client: Client,
    base_url: String,
    account_id: u64,
    token: SecretString,
}

impl FinanceApiSource {
    pub fn new(base_url: impl Into<String>, account_id: u64, token: SecretString) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            account_id,
            token,
        }
    }

    /// Use a custom HTTP client (timeouts, proxies).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn report_url(&self) -> String {
        format!(
            "{}/daily-performance-report/{}",
            self.base_url, self.account_id
        )
    }
}

#[async_trait::async_trait]
impl PerformanceSource for FinanceApiSource {
    async fn fetch_daily_performance(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawPerformanceRow>> {
        let url = self.report_url();
        debug!(%start, %end, account_id = self.account_id, "requesting daily performance report");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.expose_secret())
            .json(&ReportRequest {
                start_date: start.to_string(),
                end_date: end.to_string(),
            })
            .send()
            .await
            .context("Daily performance request failed")?
            .error_for_status()
            .context("Daily performance fetch failed")?
            .json::<ReportResponse>()
            .await
            .context("Failed to parse daily performance response")?;

        Ok(response.data.recent_transactions.data)
    }

    fn name(&self) -> &str {
        "finance_api"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESPONSE: &str = r#"{
        "data": {
            "recentTransactions": {
                "data": [
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

    #[test]
    fn parses_report_envelope() {
        let response: ReportResponse = serde_json::from_str(SAMPLE_RESPONSE).unwrap();
        let rows = response.data.recent_transactions.data;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, "2024-01-02");
    }

    #[test]
    fn report_url_strips_trailing_slash() {
        let source = FinanceApiSource::new("https://api.example.com/", 42, SecretString::from("t".to_string()));
        assert_eq!(
            source.report_url(),
            "https://api.example.com/daily-performance-report/42"
        );
    }
}
