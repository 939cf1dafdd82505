//! Implements the `Sheet` trait against the Google Sheets v4 API.
//!
//! Reading and writing cell values goes through `sheets::Client`. Spreadsheet metadata, creating
//! sheets and appending rows are plain REST calls with `reqwest`, which lets us ask for exactly
//! the fields we need and send amounts as JSON numbers.

use crate::api::{A1Range, AddSheet, Sheet, SheetRange, TokenProvider};
use crate::error::Res;
use crate::Config;
use anyhow::{anyhow, bail, Context};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use sheets::types::{
    BatchUpdateValuesRequest, DateTimeRenderOption, Dimension, ValueInputOption, ValueRange,
    ValueRenderOption,
};
use sheets::ClientError;
use std::sync::Arc;
use tracing::{debug, trace};
use url::Url;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Implements the `Sheet` trait for the spreadsheet named in the `Config`. It takes a
/// `TokenProvider`, which it asks for a valid access token before each call.
pub(crate) struct GoogleSheet {
    config: Arc<Config>,
    token_provider: TokenProvider,
    http: reqwest::Client,
}

impl GoogleSheet {
    pub(crate) fn new(
        config: Arc<Config>,
        token_provider: TokenProvider,
        http: reqwest::Client,
    ) -> Self {
        Self {
            config,
            token_provider,
            http,
        }
    }

    /// Creates a sheets client with a current access token.
    async fn client(&self) -> Res<sheets::Client> {
        let access_token = self.token_provider.token().await?;

        // The sheets crate wants client_id, client_secret, redirect_uri and a refresh token too, but
        // API calls only use the access token; refreshing is handled by the `TokenProvider`.
        Ok(sheets::Client::new(
            String::new(),
            String::new(),
            String::new(),
            access_token,
            String::new(),
        ))
    }

    /// Builds `https://sheets.googleapis.com/v4/spreadsheets/{id}` plus `segments`, percent-encoding
    /// each segment.
    fn url(&self, segments: &[&str]) -> Res<Url> {
        let mut url = Url::parse(SHEETS_API).context("Invalid Sheets API URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("The Sheets API URL cannot have path segments"))?
            .push(self.config.spreadsheet_id())
            .extend(segments);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl Sheet for GoogleSheet {
    async fn titles(&mut self) -> Res<Vec<String>> {
        trace!("titles");
        let url = self.url(&[])?;
        let token = self.token_provider.token().await?;
        let response = self
            .http
            .get(url)
            .query(&[("fields", "sheets.properties.title")])
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to send the spreadsheet metadata request")?;
        let metadata: SpreadsheetMetadata = ok_or_bail(response, "Fetching sheet titles")
            .await?
            .json()
            .await
            .context("Failed to parse the spreadsheet metadata")?;
        Ok(metadata.titles())
    }

    async fn add_sheet(&mut self, title: &str) -> Res<AddSheet> {
        trace!("add_sheet {title}");
        let url = self.url(&[])?;
        let url = Url::parse(&format!("{url}:batchUpdate")).context("Invalid batchUpdate URL")?;
        let token = self.token_provider.token().await?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&json!({
                "requests": [{ "addSheet": { "properties": { "title": title } } }]
            }))
            .send()
            .await
            .with_context(|| format!("Failed to send the request to create sheet {title}"))?;

        let status = response.status();
        if status.is_success() {
            return Ok(AddSheet::Created);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response body".to_string());
        if is_duplicate_sheet_error(status, &body) {
            debug!("Sheet {title} already exists: {body}");
            return Ok(AddSheet::AlreadyExists);
        }
        bail!("Creating sheet {title} failed with status {status}: {body}")
    }

    async fn get(&mut self, range: &A1Range) -> Res<Vec<Vec<String>>> {
        trace!("get {range}");
        let client = self.client().await?;
        let response = client
            .spreadsheets()
            .values_get(
                self.config.spreadsheet_id(),
                &range.to_string(),
                DateTimeRenderOption::FormattedString,
                Dimension::Rows,
                ValueRenderOption::FormattedValue,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to fetch {range}"))?;
        Ok(response.body.values)
    }

    async fn write_ranges(&mut self, data: &[SheetRange]) -> Res<()> {
        let client = self.client().await?;
        let request = batch_update_request(data);

        client
            .spreadsheets()
            .values_batch_update(self.config.spreadsheet_id(), &request)
            .await
            .map_err(map_client_error)
            .context("Failed to write ranges")?;
        Ok(())
    }

    async fn append(&mut self, range: &A1Range, rows: &[Vec<Value>]) -> Res<()> {
        trace!("append {} row(s) to {range}", rows.len());
        let segment = format!("{range}:append");
        let url = self.url(&["values", segment.as_str()])?;
        let token = self.token_provider.token().await?;
        let response = self
            .http
            .post(url)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .bearer_auth(token)
            .json(&json!({ "range": range.to_string(), "majorDimension": "ROWS", "values": rows }))
            .send()
            .await
            .with_context(|| format!("Failed to send the append request for {range}"))?;
        ok_or_bail(response, &format!("Appending to {range}")).await?;
        Ok(())
    }
}

/// Values are written as entered (`RAW`), so nothing is parsed as a number, date or formula.
fn batch_update_request(data: &[SheetRange]) -> BatchUpdateValuesRequest {
    let value_ranges: Vec<ValueRange> = data
        .iter()
        .map(|sr| ValueRange {
            major_dimension: Some(Dimension::Rows),
            range: sr.range.to_string(),
            values: sr.values.clone(),
        })
        .collect();

    BatchUpdateValuesRequest {
        data: value_ranges,
        include_values_in_response: Some(false),
        response_date_time_render_option: None,
        response_value_render_option: None,
        value_input_option: Some(ValueInputOption::Raw),
    }
}

/// The subset of the `Spreadsheet` resource returned for `fields=sheets.properties.title`.
#[derive(Debug, Default, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct SheetMetadata {
    #[serde(default)]
    properties: Option<SheetProperties>,
}

#[derive(Debug, Default, Deserialize)]
struct SheetProperties {
    #[serde(default)]
    title: Option<String>,
}

impl SpreadsheetMetadata {
    fn titles(self) -> Vec<String> {
        self.sheets
            .into_iter()
            .filter_map(|s| s.properties.and_then(|p| p.title))
            .collect()
    }
}

/// Google answers a duplicate `addSheet` with a 400 whose message says the name already exists.
fn is_duplicate_sheet_error(status: StatusCode, body: &str) -> bool {
    status == StatusCode::BAD_REQUEST && body.contains("already exists")
}

/// Returns the response if it was successful, otherwise an error carrying the status and body.
async fn ok_or_bail(response: reqwest::Response, what: &str) -> Res<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read response body".to_string());
    bail!("{what} failed with status {status}: {body}")
}

fn map_client_error(e: ClientError) -> anyhow::Error {
    let error_name = match &e {
        ClientError::EmptyRefreshToken => "EmptyRefreshToken".to_string(),
        ClientError::FromUtf8Error(inner) => format!("FromUtf8Error {inner}"),
        ClientError::UrlParserError(inner) => format!("UrlParserError {inner}"),
        ClientError::SerdeJsonError(inner) => format!("SerdeJsonError {inner}"),
        ClientError::ReqwestError(inner) => format!("ReqwestError {inner}"),
        ClientError::InvalidHeaderValue(inner) => format!("InvalidHeaderValue {inner}"),
        ClientError::ReqwestMiddleWareError(inner) => format!("ReqwestMiddleWareError {inner}"),
        ClientError::HttpError { .. } => "HttpError".to_string(),
        ClientError::Other(_) => "Other".to_string(),
    };
    anyhow::Error::new(e).context(error_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TEST_CREDENTIALS;

    fn google_sheet() -> GoogleSheet {
        let config = Config::from_lookup(|key| match key {
            "SPREADSHEET_ID" => Some("abc123".to_string()),
            "GOOGLE_CREDENTIALS" => Some(TEST_CREDENTIALS.to_string()),
            _ => None,
        })
        .unwrap();
        let tokens = TokenProvider::new(config.credentials().clone()).unwrap();
        GoogleSheet::new(Arc::new(config), tokens, reqwest::Client::new())
    }

    #[test]
    fn test_url() {
        let sheet = google_sheet();
        assert_eq!(
            sheet.url(&[]).unwrap().as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123"
        );
        let segment = format!("{}:append", A1Range::columns("2024-03", 0, 2));
        assert_eq!(
            sheet.url(&["values", &segment]).unwrap().as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/'2024-03'!A:C:append"
        );
    }

    #[test]
    fn test_batch_update_request_is_raw() {
        let header = SheetRange {
            range: A1Range::row("2024-03", 1, 0, 2),
            values: vec![vec!["Timestamp".into(), "Description".into(), "Amount".into()]],
        };
        let request = batch_update_request(&[header]);
        assert!(matches!(
            request.value_input_option,
            Some(ValueInputOption::Raw)
        ));
        assert_eq!(request.data.len(), 1);
        assert_eq!(request.data[0].range, "'2024-03'!A1:C1");
        assert_eq!(request.data[0].values[0][2], "Amount");
    }

    #[test]
    fn test_metadata_titles() {
        let json = r#"{"sheets":[{"properties":{"title":"2024-02"}},{"properties":{"title":"2024-03"}},{}]}"#;
        let metadata: SpreadsheetMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.titles(), vec!["2024-02", "2024-03"]);
    }

    #[test]
    fn test_metadata_without_sheets() {
        let metadata: SpreadsheetMetadata = serde_json::from_str("{}").unwrap();
        assert!(metadata.titles().is_empty());
    }

    #[test]
    fn test_duplicate_sheet_error() {
        let body = r#"{"error":{"code":400,"message":"Invalid requests[0].addSheet: A sheet with the name \"2024-03\" already exists. Please enter another name.","status":"INVALID_ARGUMENT"}}"#;
        assert!(is_duplicate_sheet_error(StatusCode::BAD_REQUEST, body));
        assert!(!is_duplicate_sheet_error(StatusCode::FORBIDDEN, body));
        assert!(!is_duplicate_sheet_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"Invalid value"}}"#
        ));
    }
}
