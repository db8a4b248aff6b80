//! HTTP implementations of the disposal service traits.
//!
//! One client fulfils all four contracts against the back-office REST API:
//! asset lookup, valuation, disposal submission, and the vendor/location
//! reference lists. Transport failures map to [`ServiceError::Network`],
//! everything the backend itself rejects to [`ServiceError::Backend`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode, Url};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use disposal_core::{
    AssetDirectory, AssetId, AssetSummary, DisposalGateway, DisposalSubmission, Location,
    ReferenceDataSource, ServiceError, SubmitReceipt, Valuation, ValuationRequest,
    ValuationService, Vendor,
};

/// Client for the asset back-office REST API.
pub struct BackOfficeClient {
    http: Client,
    base_url: Url,
}

impl BackOfficeClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid back-office base URL: {base_url}"))?;
        let http = Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, base_url })
    }

    pub fn with_client(http: Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        self.base_url
            .join(path)
            .map_err(|e| ServiceError::Network(format!("invalid endpoint '{path}': {e}")))
    }
}

fn transport_error(err: reqwest::Error) -> ServiceError {
    ServiceError::Network(err.to_string())
}

/// Read a JSON body out of a response, folding non-2xx statuses into
/// backend errors.
async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(backend_error(status, &body));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ServiceError::Backend(format!("malformed response body: {e}")))
}

fn backend_error(status: StatusCode, body: &str) -> ServiceError {
    ServiceError::Backend(format!("{status}: {}", body.trim()))
}

#[derive(Debug, Serialize)]
struct AssetLookupRequest<'a> {
    ids: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct AssetDto {
    id: String,
    code: String,
    name: String,
    purchase_price: Decimal,
}

impl From<AssetDto> for AssetSummary {
    fn from(dto: AssetDto) -> Self {
        Self {
            id: AssetId::new(dto.id),
            code: dto.code,
            name: dto.name,
            purchase_price: dto.purchase_price,
        }
    }
}

#[async_trait]
impl AssetDirectory for BackOfficeClient {
    async fn fetch_assets(&self, ids: &[AssetId]) -> Result<Vec<AssetSummary>, ServiceError> {
        let url = self.endpoint("assets/lookup")?;
        let body = AssetLookupRequest {
            ids: ids.iter().map(AssetId::as_str).collect(),
        };
        debug!(count = ids.len(), "looking up assets");
        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let dtos: Vec<AssetDto> = parse_json(response).await?;
        Ok(dtos.into_iter().map(AssetSummary::from).collect())
    }
}

#[async_trait]
impl ValuationService for BackOfficeClient {
    async fn compute_valuation(
        &self,
        request: &ValuationRequest,
    ) -> Result<Valuation, ServiceError> {
        let url = self.endpoint("valuations/compute")?;
        debug!(asset_id = %request.asset_id, "requesting valuation");
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;
        parse_json(response).await
    }
}

/// The submission body without the attachment; the file rides along as a
/// separate multipart part when present.
#[derive(Debug, Serialize)]
struct SubmissionPayload<'a> {
    asset_id: &'a str,
    discard_date: NaiveDate,
    sold_value: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    vendor_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remarks: Option<&'a str>,
}

impl<'a> SubmissionPayload<'a> {
    fn from_submission(submission: &'a DisposalSubmission) -> Self {
        Self {
            asset_id: submission.asset_id.as_str(),
            discard_date: submission.discard_date,
            sold_value: submission.sold_value,
            vendor_id: submission.vendor_id,
            location_id: submission.location_id,
            remarks: submission.remarks.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    success: bool,
    #[serde(default)]
    message: String,
}

#[async_trait]
impl DisposalGateway for BackOfficeClient {
    async fn submit_disposal(
        &self,
        submission: &DisposalSubmission,
    ) -> Result<SubmitReceipt, ServiceError> {
        let url = self.endpoint("disposals")?;
        let payload = SubmissionPayload::from_submission(submission);
        let payload_json = serde_json::to_string(&payload)
            .map_err(|e| ServiceError::Backend(format!("failed to encode submission: {e}")))?;

        debug!(asset_id = %submission.asset_id, "submitting disposal");
        let request = self.http.post(url);
        let response = match &submission.attachment {
            Some(attachment) => {
                let form = Form::new().text("payload", payload_json).part(
                    "file",
                    Part::bytes(attachment.bytes.clone()).file_name(attachment.file_name.clone()),
                );
                request.multipart(form).send().await
            }
            None => {
                request
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(payload_json)
                    .send()
                    .await
            }
        }
        .map_err(transport_error)?;

        let reply: SubmitResponse = parse_json(response).await?;
        if !reply.success {
            return Err(ServiceError::Backend(reply.message));
        }
        Ok(SubmitReceipt {
            message: reply.message,
        })
    }
}

#[async_trait]
impl ReferenceDataSource for BackOfficeClient {
    async fn fetch_vendors(&self) -> Result<Vec<Vendor>, ServiceError> {
        let url = self.endpoint("vendors")?;
        let response = self.http.get(url).send().await.map_err(transport_error)?;
        parse_json(response).await
    }

    async fn fetch_locations(&self) -> Result<Vec<Location>, ServiceError> {
        let url = self.endpoint("locations")?;
        let response = self.http.get(url).send().await.map_err(transport_error)?;
        parse_json(response).await
    }
}
