//! Shared multi-court back-end ("Bedesten") adapter.
//!
//! One JSON API covers six logical court kinds selected through the
//! `itemTypeList` field; everything else in the request is identical. The
//! API requires the `AdaletApplicationName` header and mirrors it as an
//! `applicationName` body field. Document content arrives base64-encoded
//! with a mime type selecting the Markdown pipeline.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::fetcher::HttpFetcher;
use crate::markdown::{self, CleaningProfile};
use crate::{Error, Result, pdf};

const BASE_URL: &str = "https://bedesten.adalet.gov.tr";
const SEARCH_ENDPOINT: &str = "/emsal-karar/searchDocuments";
const DOCUMENT_ENDPOINT: &str = "/emsal-karar/getDocumentContent";
const APPLICATION_NAME: &str = "UyapMevzuat";

/// Logical court kinds multiplexed over the shared back-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub enum CourtKind {
    /// Court of Cassation (civil and criminal benches).
    #[serde(rename = "YARGITAYKARARI")]
    Yargitay,
    /// Council of State.
    #[serde(rename = "DANISTAYKARAR")]
    Danistay,
    /// Local civil courts of first instance.
    #[serde(rename = "YERELHUKUK")]
    YerelHukuk,
    /// Civil courts of appeals.
    #[serde(rename = "ISTINAFHUKUK")]
    IstinafHukuk,
    /// Criminal courts of appeals.
    #[serde(rename = "ISTINAFCEZA")]
    IstinafCeza,
    /// Extraordinary appeal in the interest of law.
    #[serde(rename = "KYB")]
    Kyb,
}

impl CourtKind {
    /// Wire value used inside `itemTypeList`.
    #[must_use]
    pub const fn item_type(self) -> &'static str {
        match self {
            Self::Yargitay => "YARGITAYKARARI",
            Self::Danistay => "DANISTAYKARAR",
            Self::YerelHukuk => "YERELHUKUK",
            Self::IstinafHukuk => "ISTINAFHUKUK",
            Self::IstinafCeza => "ISTINAFCEZA",
            Self::Kyb => "KYB",
        }
    }
}

/// Caller-facing search parameters, shared by all six court kinds.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Court kind to search.
    pub court_kind: CourtKind,
    /// Search phrase; wrapping in escaped double quotes requests an exact
    /// phrase match upstream.
    pub phrase: String,
    /// Optional chamber filter; only meaningful for the Yargıtay and
    /// Danıştay kinds.
    pub birim_adi: Option<String>,
    /// Decision date range start, `YYYY-MM-DDTHH:MM:SS.000Z`.
    pub karar_tarihi_start: Option<String>,
    /// Decision date range end, `YYYY-MM-DDTHH:MM:SS.000Z`.
    pub karar_tarihi_end: Option<String>,
    /// Results per page, 1..=100.
    pub page_size: u32,
    /// 1-indexed page.
    pub page_number: u32,
}

#[derive(Serialize)]
struct SearchData {
    #[serde(rename = "pageSize")]
    page_size: u32,
    #[serde(rename = "pageNumber")]
    page_number: u32,
    #[serde(rename = "itemTypeList")]
    item_type_list: Vec<&'static str>,
    phrase: String,
    #[serde(rename = "birimAdi", skip_serializing_if = "Option::is_none")]
    birim_adi: Option<String>,
    #[serde(rename = "kararTarihiStart", skip_serializing_if = "Option::is_none")]
    karar_tarihi_start: Option<String>,
    #[serde(rename = "kararTarihiEnd", skip_serializing_if = "Option::is_none")]
    karar_tarihi_end: Option<String>,
    #[serde(rename = "sortFields")]
    sort_fields: Vec<&'static str>,
    #[serde(rename = "sortDirection")]
    sort_direction: &'static str,
}

#[derive(Serialize)]
struct SearchEnvelope {
    data: SearchData,
    #[serde(rename = "applicationName")]
    application_name: &'static str,
    paging: bool,
}

#[derive(Serialize)]
struct DocumentEnvelope {
    data: DocumentRequestData,
    #[serde(rename = "applicationName")]
    application_name: &'static str,
}

#[derive(Serialize)]
struct DocumentRequestData {
    #[serde(rename = "documentId")]
    document_id: String,
}

/// Item-type descriptor echoed in every search row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemType {
    /// Wire name, e.g. `YARGITAYKARARI`.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

/// One decision row from the search response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEntry {
    /// Opaque document id used by the document endpoint.
    #[serde(rename = "documentId")]
    pub document_id: String,
    /// Item-type descriptor of the row.
    #[serde(rename = "itemType")]
    pub item_type: ItemType,
    /// Chamber id, when reported.
    #[serde(rename = "birimId", default)]
    pub birim_id: Option<String>,
    /// Chamber name, when reported.
    #[serde(rename = "birimAdi", default)]
    pub birim_adi: Option<String>,
    /// Case number year part.
    #[serde(rename = "esasNoYil", default)]
    pub esas_no_yil: Option<i64>,
    /// Case number sequence part.
    #[serde(rename = "esasNoSira", default)]
    pub esas_no_sira: Option<i64>,
    /// Decision number year part.
    #[serde(rename = "kararNoYil", default)]
    pub karar_no_yil: Option<i64>,
    /// Decision number sequence part.
    #[serde(rename = "kararNoSira", default)]
    pub karar_no_sira: Option<i64>,
    /// Decision kind label.
    #[serde(rename = "kararTuru", default)]
    pub karar_turu: Option<String>,
    /// Decision timestamp.
    #[serde(rename = "kararTarihi", default)]
    pub karar_tarihi: Option<String>,
    /// Decision date as displayed.
    #[serde(rename = "kararTarihiStr", default)]
    pub karar_tarihi_str: Option<String>,
    /// Finality status.
    #[serde(rename = "kesinlesmeDurumu", default)]
    pub kesinlesme_durumu: Option<String>,
    /// Decision number as displayed.
    #[serde(rename = "kararNo", default)]
    pub karar_no: Option<String>,
    /// Case number as displayed.
    #[serde(rename = "esasNo", default)]
    pub esas_no: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchDataResponse {
    #[serde(rename = "emsalKararList", default)]
    emsal_karar_list: Vec<DecisionEntry>,
    #[serde(default)]
    total: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Option<SearchDataResponse>,
}

#[derive(Debug, Deserialize)]
struct DocumentData {
    content: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct DocumentResponse {
    data: Option<DocumentData>,
}

/// Search result for the tool layer.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Decision rows for the requested page.
    pub decisions: Vec<DecisionEntry>,
    /// Total matching records reported by the upstream.
    pub total_records: u64,
    /// Echo of the requested page.
    pub requested_page: u32,
    /// Echo of the requested page size.
    pub page_size: u32,
}

/// A document converted to Markdown. The back-end serves complete decisions,
/// so no chunk pagination is applied.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentMarkdown {
    /// The document id the caller asked for.
    pub document_id: String,
    /// Full Markdown content, `None` on conversion failure.
    pub markdown_content: Option<String>,
    /// Source URL of the document.
    pub source_url: String,
    /// Mime type reported by the upstream.
    pub mime_type: Option<String>,
}

/// Client for the shared multi-court search service.
pub struct BedestenClient {
    fetcher: HttpFetcher,
}

impl BedestenClient {
    /// Build the client against the production host.
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    /// Build the client against an arbitrary host (tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let fetcher = HttpFetcher::builder(base_url)
            .header("Accept", "*/*")
            .header("Accept-Language", "tr-TR,tr;q=0.9,en-US;q=0.8,en;q=0.7")
            .header("AdaletApplicationName", APPLICATION_NAME)
            .header("Origin", "https://mevzuat.adalet.gov.tr")
            .header("Referer", "https://mevzuat.adalet.gov.tr/")
            .header(
                "User-Agent",
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36",
            )
            .build()?;
        Ok(Self { fetcher })
    }

    fn build_envelope(request: &SearchRequest) -> SearchEnvelope {
        SearchEnvelope {
            data: SearchData {
                page_size: request.page_size,
                page_number: request.page_number,
                item_type_list: vec![request.court_kind.item_type()],
                phrase: request.phrase.clone(),
                birim_adi: request.birim_adi.clone(),
                karar_tarihi_start: request.karar_tarihi_start.clone(),
                karar_tarihi_end: request.karar_tarihi_end.clone(),
                sort_fields: vec!["KARAR_TARIHI"],
                sort_direction: "desc",
            },
            application_name: APPLICATION_NAME,
            paging: true,
        }
    }

    /// Search one court kind.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        info!(
            kind = request.court_kind.item_type(),
            page = request.page_number,
            "bedesten search"
        );
        let envelope = Self::build_envelope(request);
        let response: SearchResponse = self
            .fetcher
            .post_json(SEARCH_ENDPOINT, &envelope)
            .await
            .inspect_err(|e| error!(source = "bedesten", path = SEARCH_ENDPOINT, error = %e))?;
        let data = response.data.unwrap_or(SearchDataResponse {
            emsal_karar_list: Vec::new(),
            total: 0,
        });
        Ok(SearchResult {
            decisions: data.emsal_karar_list,
            total_records: data.total,
            requested_page: request.page_number,
            page_size: request.page_size,
        })
    }

    /// Fetch a document, decode its base64 content and convert to Markdown
    /// according to the reported mime type.
    pub async fn get_document_markdown(&self, document_id: &str) -> Result<DocumentMarkdown> {
        info!(id = document_id, "bedesten document fetch");
        let envelope = DocumentEnvelope {
            data: DocumentRequestData {
                document_id: document_id.to_string(),
            },
            application_name: APPLICATION_NAME,
        };
        let response: DocumentResponse = self
            .fetcher
            .post_json(DOCUMENT_ENDPOINT, &envelope)
            .await
            .inspect_err(|e| error!(source = "bedesten", path = DOCUMENT_ENDPOINT, error = %e))?;
        let data = response
            .data
            .ok_or_else(|| Error::Parse("document response has no `data` object".into()))?;

        let content = BASE64
            .decode(data.content.as_bytes())
            .map_err(|e| Error::Decode(format!("document content is not valid base64: {e}")))?;

        let markdown_content = match data.mime_type.as_str() {
            "text/html" => {
                let html = String::from_utf8_lossy(&content);
                Some(markdown::html_to_markdown(&html, &CleaningProfile::default())?)
            },
            "application/pdf" => Some(pdf::pdf_to_markdown(&content)?),
            other => {
                warn!(mime = other, "unsupported bedesten mime type");
                Some(format!(
                    "Unsupported content type: {other}. Unable to convert to markdown."
                ))
            },
        };

        Ok(DocumentMarkdown {
            document_id: document_id.to_string(),
            markdown_content,
            source_url: format!("{}/document/{document_id}", self.fetcher.base_url()),
            mime_type: Some(data.mime_type),
        })
    }

    /// Close the underlying HTTP client. Idempotent.
    pub fn close(&self) {
        info!("bedesten client closed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request_body_json(request: &SearchRequest) -> Value {
        serde_json::to_value(BedestenClient::build_envelope(request)).unwrap()
    }

    fn request(kind: CourtKind) -> SearchRequest {
        SearchRequest {
            court_kind: kind,
            phrase: "\"mülkiyet kararı\"".to_string(),
            birim_adi: None,
            karar_tarihi_start: None,
            karar_tarihi_end: None,
            page_size: 10,
            page_number: 1,
        }
    }

    #[test]
    fn six_court_kinds_have_distinct_item_types() {
        let kinds = [
            CourtKind::Yargitay,
            CourtKind::Danistay,
            CourtKind::YerelHukuk,
            CourtKind::IstinafHukuk,
            CourtKind::IstinafCeza,
            CourtKind::Kyb,
        ];
        let mut names: Vec<&str> = kinds.iter().map(|k| k.item_type()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 6);
    }

    #[test]
    fn envelope_carries_application_name_and_single_item_type() {
        let body = request_body_json(&request(CourtKind::Kyb));
        assert_eq!(body["applicationName"], "UyapMevzuat");
        assert_eq!(body["paging"], true);
        assert_eq!(body["data"]["itemTypeList"], serde_json::json!(["KYB"]));
        assert_eq!(body["data"]["sortFields"], serde_json::json!(["KARAR_TARIHI"]));
        assert_eq!(body["data"]["sortDirection"], "desc");
        // Optional filters are omitted, not null.
        assert!(body["data"].get("birimAdi").is_none());
        assert!(body["data"].get("kararTarihiStart").is_none());
    }

    #[tokio::test]
    async fn search_sends_header_and_parses_rows() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emsal-karar/searchDocuments"))
            .and(header("AdaletApplicationName", "UyapMevzuat"))
            .and(body_partial_json(serde_json::json!({
                "data": {"itemTypeList": ["YARGITAYKARARI"]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"data":{"emsalKararList":[{
                    "documentId":"doc-1",
                    "itemType":{"name":"YARGITAYKARARI","description":"Yargıtay Kararı"},
                    "birimAdi":"1. Hukuk Dairesi",
                    "esasNoYil":2023,"esasNoSira":100,"kararNoYil":2024,"kararNoSira":200,
                    "kararTarihi":"2024-02-01T00:00:00.000Z","kararTarihiStr":"01.02.2024",
                    "kararNo":"2024/200","esasNo":"2023/100"
                }],"total":55,"start":0},"metadata":{}}"#,
            ))
            .mount(&server)
            .await;

        let client = BedestenClient::with_base_url(server.uri())?;
        let result = client.search(&request(CourtKind::Yargitay)).await?;
        assert_eq!(result.total_records, 55);
        assert_eq!(result.decisions.len(), 1);
        assert_eq!(result.decisions[0].document_id, "doc-1");
        assert_eq!(result.decisions[0].item_type.name, "YARGITAYKARARI");
        Ok(())
    }

    #[tokio::test]
    async fn html_document_is_decoded_and_converted() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        let html = "<html><body><p>BEDESTEN KARAR METNİ</p></body></html>";
        let encoded = BASE64.encode(html);
        Mock::given(method("POST"))
            .and(path("/emsal-karar/getDocumentContent"))
            .and(body_partial_json(serde_json::json!({
                "data": {"documentId": "doc-1"}, "applicationName": "UyapMevzuat"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"content": encoded, "mimeType": "text/html", "version": 1},
                "metadata": {}
            })))
            .mount(&server)
            .await;

        let client = BedestenClient::with_base_url(server.uri())?;
        let document = client.get_document_markdown("doc-1").await?;
        assert_eq!(document.mime_type.as_deref(), Some("text/html"));
        assert!(document.markdown_content.unwrap().contains("BEDESTEN KARAR METNİ"));
        assert_eq!(
            document.source_url,
            format!("{}/document/doc-1", server.uri())
        );
        Ok(())
    }

    #[tokio::test]
    async fn unknown_mime_type_becomes_explanatory_body() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emsal-karar/getDocumentContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"content": BASE64.encode("bytes"), "mimeType": "image/png", "version": 1},
                "metadata": {}
            })))
            .mount(&server)
            .await;

        let client = BedestenClient::with_base_url(server.uri())?;
        let document = client.get_document_markdown("doc-9").await?;
        assert!(
            document
                .markdown_content
                .unwrap()
                .contains("Unsupported content type: image/png")
        );
        Ok(())
    }

    #[tokio::test]
    async fn invalid_base64_is_a_decode_error() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emsal-karar/getDocumentContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"content": "%%%not-base64%%%", "mimeType": "text/html", "version": 1},
                "metadata": {}
            })))
            .mount(&server)
            .await;

        let client = BedestenClient::with_base_url(server.uri())?;
        let err = client.get_document_markdown("doc-2").await.unwrap_err();
        assert_eq!(err.kind(), "upstream_parse");
        Ok(())
    }
}
