//! Yahoo Finance price adapter.
//!
//! Fetches daily closes from Yahoo's v8 chart API, preferring the adjusted
//! close. The API is unofficial and changes without notice; the CSV price
//! adapter is the fallback.

use crate::domain::error::MomtraderError;
use crate::domain::price_series::{PricePoint, PriceSeries};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

fn format_changed(reason: impl Into<String>) -> MomtraderError {
    MomtraderError::DataSource {
        reason: format!("unexpected Yahoo response: {}", reason.into()),
    }
}

pub struct YahooAdapter {
    client: reqwest::blocking::Client,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooAdapter {
    pub fn new() -> Result<Self, MomtraderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| MomtraderError::DataSource {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        let end_ts = end
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        let symbol = symbol.replace('^', "%5E");
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true"
        )
    }

    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<PriceSeries, MomtraderError> {
        let result = match (resp.chart.result, resp.chart.error) {
            (Some(result), _) => result,
            (None, Some(err)) if err.code == "Not Found" => {
                return Err(MomtraderError::NoData {
                    ticker: symbol.to_string(),
                })
            }
            (None, Some(err)) => {
                return Err(format_changed(format!("{}: {}", err.code, err.description)))
            }
            (None, None) => return Err(format_changed("empty result with no error")),
        };

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| format_changed("result array is empty"))?;

        // A listed symbol with no sessions in range has no timestamp array
        let Some(timestamps) = data.timestamp else {
            return Err(MomtraderError::NoData {
                ticker: symbol.to_string(),
            });
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| format_changed("no quote data"))?;
        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let mut points = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| format_changed(format!("invalid timestamp: {ts}")))?;
            let close = adj_closes
                .as_ref()
                .and_then(|v| v.get(i).copied().flatten())
                .or_else(|| quote.close.get(i).copied().flatten())
                .filter(|c| c.is_finite());
            points.push(PricePoint { date, close });
        }

        Ok(PriceSeries::new(points))
    }
}

impl DataPort for YahooAdapter {
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, MomtraderError> {
        let url = Self::chart_url(ticker, start_date, end_date);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                log::debug!("retrying {ticker} in {delay:?}");
                std::thread::sleep(delay);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(MomtraderError::NoData {
                            ticker: ticker.to_string(),
                        });
                    }
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS
                        || status.is_server_error()
                    {
                        last_error = Some(format!("HTTP {status} for {ticker}"));
                        continue;
                    }
                    if !status.is_success() {
                        return Err(MomtraderError::DataSource {
                            reason: format!("HTTP {status} for {ticker}"),
                        });
                    }

                    let chart: ChartResponse = resp.json().map_err(|e| {
                        format_changed(format!("failed to parse response for {ticker}: {e}"))
                    })?;
                    return Self::parse_response(ticker, chart);
                }
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(e.to_string());
                }
                Err(e) => {
                    return Err(MomtraderError::DataSource {
                        reason: e.to_string(),
                    })
                }
            }
        }

        Err(MomtraderError::DataSource {
            reason: last_error.unwrap_or_else(|| "max retries exceeded".into()),
        })
    }
}
