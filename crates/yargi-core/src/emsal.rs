//! UYAP precedent index (Emsal) adapter.
//!
//! Same endpoint family as the Yargıtay system, but the payload carries
//! court-type keys that contain spaces (`"Bam Hukuk Mahkemeleri"`,
//! `"Hukuk Mahkemeleri"`); serde renames keep the wire spelling while the
//! API stays ordinary Rust. Selected regional chambers are joined with `+`
//! into a single field.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::fetcher::HttpFetcher;
use crate::markdown::{self, CleaningProfile};
use crate::{Error, Result};

const BASE_URL: &str = "https://emsal.uyap.gov.tr";
const DETAILED_SEARCH_ENDPOINT: &str = "/aramadetaylist";
const DOCUMENT_ENDPOINT: &str = "/getDokuman";

/// Caller-facing search parameters with friendly names.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Free keyword.
    pub keyword: Option<String>,
    /// Selected BAM civil court (maps to `"Bam Hukuk Mahkemeleri"`).
    pub selected_bam_civil_court: Option<String>,
    /// Selected civil court (maps to `"Hukuk Mahkemeleri"`).
    pub selected_civil_court: Option<String>,
    /// Selected regional civil chambers, joined with `+` on the wire.
    pub selected_regional_civil_chambers: Vec<String>,
    /// Case year.
    pub case_year_esas: Option<String>,
    /// Case sequence range start.
    pub case_start_seq_esas: Option<String>,
    /// Case sequence range end.
    pub case_end_seq_esas: Option<String>,
    /// Decision year.
    pub decision_year_karar: Option<String>,
    /// Decision sequence range start.
    pub decision_start_seq_karar: Option<String>,
    /// Decision sequence range end.
    pub decision_end_seq_karar: Option<String>,
    /// Decision date range start, `DD.MM.YYYY`.
    pub start_date: Option<String>,
    /// Decision date range end, `DD.MM.YYYY`.
    pub end_date: Option<String>,
    /// Sort criterion.
    pub sort_criteria: String,
    /// Sort direction.
    pub sort_direction: String,
    /// 1-indexed page.
    pub page_number: u32,
    /// Results per page, 1..=100.
    pub page_size: u32,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            keyword: None,
            selected_bam_civil_court: None,
            selected_civil_court: None,
            selected_regional_civil_chambers: Vec::new(),
            case_year_esas: None,
            case_start_seq_esas: None,
            case_end_seq_esas: None,
            decision_year_karar: None,
            decision_start_seq_karar: None,
            decision_end_seq_karar: None,
            start_date: None,
            end_date: None,
            sort_criteria: "1".to_string(),
            sort_direction: "desc".to_string(),
            page_number: 1,
            page_size: 10,
        }
    }
}

// Wire shape of the `data` payload. The space-containing keys are part of
// the form contract.
#[derive(Serialize)]
struct DetailedSearchData {
    #[serde(rename = "arananKelime")]
    aranan_kelime: String,
    #[serde(rename = "Bam Hukuk Mahkemeleri", skip_serializing_if = "Option::is_none")]
    bam_hukuk_mahkemeleri: Option<String>,
    #[serde(rename = "Hukuk Mahkemeleri", skip_serializing_if = "Option::is_none")]
    hukuk_mahkemeleri: Option<String>,
    #[serde(rename = "birimHukukMah")]
    birim_hukuk_mah: String,
    #[serde(rename = "esasYil")]
    esas_yil: String,
    #[serde(rename = "esasIlkSiraNo")]
    esas_ilk_sira_no: String,
    #[serde(rename = "esasSonSiraNo")]
    esas_son_sira_no: String,
    #[serde(rename = "kararYil")]
    karar_yil: String,
    #[serde(rename = "kararIlkSiraNo")]
    karar_ilk_sira_no: String,
    #[serde(rename = "kararSonSiraNo")]
    karar_son_sira_no: String,
    #[serde(rename = "baslangicTarihi")]
    baslangic_tarihi: String,
    #[serde(rename = "bitisTarihi")]
    bitis_tarihi: String,
    siralama: String,
    #[serde(rename = "siralamaDirection")]
    siralama_direction: String,
    #[serde(rename = "pageSize")]
    page_size: u32,
    #[serde(rename = "pageNumber")]
    page_number: u32,
}

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    data: T,
}

/// One decision row from the search response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEntry {
    /// Opaque system id of the decision.
    pub id: String,
    /// Court or chamber that issued the decision.
    #[serde(default)]
    pub daire: Option<String>,
    /// Case registry number.
    #[serde(rename = "esasNo", default)]
    pub esas_no: Option<String>,
    /// Decision number.
    #[serde(rename = "kararNo", default)]
    pub karar_no: Option<String>,
    /// Decision date.
    #[serde(rename = "kararTarihi", default)]
    pub karar_tarihi: Option<String>,
    /// Keyword matched by the upstream for this row.
    #[serde(rename = "arananKelime", default)]
    pub aranan_kelime: Option<String>,
    /// Finality status, e.g. `KESİNLEŞMEDİ`.
    #[serde(default)]
    pub durum: Option<String>,
    /// Full document URL, synthesized after the search call.
    #[serde(default)]
    pub document_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponseInner {
    #[serde(default)]
    data: Vec<DecisionEntry>,
    #[serde(rename = "recordsTotal", default)]
    records_total: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Option<SearchResponseInner>,
}

#[derive(Debug, Deserialize)]
struct DocumentResponse {
    data: Option<serde_json::Value>,
}

/// Canonical search result returned to the tool layer.
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

/// A decision document converted to paginated Markdown.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentMarkdown {
    /// The document id the caller asked for.
    pub id: String,
    /// Source URL of the original document.
    pub source_url: String,
    /// Requested Markdown chunk, `None` on conversion failure.
    pub markdown_chunk: Option<String>,
    /// 1-indexed chunk page.
    pub current_page: u32,
    /// Total chunk pages.
    pub total_pages: u32,
    /// Whether the content spans multiple chunks.
    pub is_paginated: bool,
    /// Error message when the Markdown pipeline failed.
    pub error_message: Option<String>,
}

/// Client for the Emsal precedent search.
pub struct EmsalClient {
    fetcher: HttpFetcher,
}

impl EmsalClient {
    /// Build the client against the production host.
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    /// Build the client against an arbitrary host (tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let fetcher = HttpFetcher::builder(base_url)
            .header("Content-Type", "application/json; charset=UTF-8")
            .header("Accept", "application/json, text/plain, */*")
            .header("X-Requested-With", "XMLHttpRequest")
            // The upstream certificate chain does not validate.
            .verify_tls(false)
            .build()?;
        Ok(Self { fetcher })
    }

    fn build_payload(request: &SearchRequest) -> DetailedSearchData {
        let unwrap = |v: &Option<String>| v.clone().unwrap_or_default();
        DetailedSearchData {
            aranan_kelime: unwrap(&request.keyword),
            bam_hukuk_mahkemeleri: request.selected_bam_civil_court.clone(),
            hukuk_mahkemeleri: request.selected_civil_court.clone(),
            birim_hukuk_mah: request.selected_regional_civil_chambers.join("+"),
            esas_yil: unwrap(&request.case_year_esas),
            esas_ilk_sira_no: unwrap(&request.case_start_seq_esas),
            esas_son_sira_no: unwrap(&request.case_end_seq_esas),
            karar_yil: unwrap(&request.decision_year_karar),
            karar_ilk_sira_no: unwrap(&request.decision_start_seq_karar),
            karar_son_sira_no: unwrap(&request.decision_end_seq_karar),
            baslangic_tarihi: unwrap(&request.start_date),
            bitis_tarihi: unwrap(&request.end_date),
            siralama: request.sort_criteria.clone(),
            siralama_direction: request.sort_direction.clone(),
            page_size: request.page_size,
            page_number: request.page_number,
        }
    }

    /// Run a detailed search.
    pub async fn search_detailed(&self, request: &SearchRequest) -> Result<SearchResult> {
        info!(page = request.page_number, "emsal detailed search");
        let payload = Envelope {
            data: Self::build_payload(request),
        };
        let response: SearchResponse = self
            .fetcher
            .post_json(DETAILED_SEARCH_ENDPOINT, &payload)
            .await
            .inspect_err(|e| error!(source = "emsal", path = DETAILED_SEARCH_ENDPOINT, error = %e))?;
        let inner = response.data.unwrap_or(SearchResponseInner {
            data: Vec::new(),
            records_total: 0,
        });
        let mut decisions = inner.data;
        for decision in &mut decisions {
            decision.document_url = Some(format!(
                "{}{DOCUMENT_ENDPOINT}?id={}",
                self.fetcher.base_url(),
                decision.id
            ));
        }
        Ok(SearchResult {
            decisions,
            total_records: inner.records_total,
            requested_page: request.page_number,
            page_size: request.page_size,
        })
    }

    /// Fetch a decision document (JSON-wrapped HTML) and return the
    /// requested Markdown chunk.
    pub async fn get_document_markdown(&self, id: &str, page_number: u32) -> Result<DocumentMarkdown> {
        let path = format!("{DOCUMENT_ENDPOINT}?id={id}");
        let source_url = format!("{}{path}", self.fetcher.base_url());
        info!(id, page = page_number, "emsal document fetch");

        let response: DocumentResponse = self
            .fetcher
            .get_json(&path, &[])
            .await
            .inspect_err(|e| error!(source = "emsal", %path, error = %e))?;
        let html = match response.data {
            Some(serde_json::Value::String(html)) if !html.trim().is_empty() => html,
            _ => {
                return Err(Error::Parse(
                    "document response `data` field is missing or not a string".into(),
                ));
            },
        };

        Ok(match markdown::html_to_markdown(&html, &CleaningProfile::default()) {
            Ok(full) => {
                let page = markdown::paginate(&full, page_number);
                DocumentMarkdown {
                    id: id.to_string(),
                    source_url,
                    markdown_chunk: page.markdown_chunk,
                    current_page: page.current_page,
                    total_pages: page.total_pages,
                    is_paginated: page.is_paginated,
                    error_message: None,
                }
            },
            Err(e) => DocumentMarkdown {
                id: id.to_string(),
                source_url,
                markdown_chunk: None,
                current_page: page_number.max(1),
                total_pages: 1,
                is_paginated: false,
                error_message: Some(e.to_string()),
            },
        })
    }

    /// Close the underlying HTTP client. Idempotent.
    pub fn close(&self) {
        info!("emsal client closed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn payload_uses_space_containing_keys() {
        let request = SearchRequest {
            keyword: Some("tapu iptali".to_string()),
            selected_bam_civil_court: Some("Ankara BAM".to_string()),
            selected_regional_civil_chambers: vec!["1. Hukuk Dairesi".to_string(), "2. Hukuk Dairesi".to_string()],
            ..Default::default()
        };
        let json = serde_json::to_value(Envelope {
            data: EmsalClient::build_payload(&request),
        })
        .unwrap();
        let data = json["data"].as_object().unwrap();
        assert_eq!(data["Bam Hukuk Mahkemeleri"], "Ankara BAM");
        assert_eq!(data["birimHukukMah"], "1. Hukuk Dairesi+2. Hukuk Dairesi");
        assert!(!data.contains_key("Hukuk Mahkemeleri"), "absent optional court key must be omitted");
        assert_eq!(data["arananKelime"], "tapu iptali");
        assert_eq!(data["esasYil"], "");
    }

    #[tokio::test]
    async fn search_round_trip() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/aramadetaylist"))
            .and(body_partial_json(serde_json::json!({
                "data": {"arananKelime": "kira", "pageNumber": 2}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"data":{"data":[{"id":"77","daire":"Ankara BAM 15. Hukuk Dairesi","durum":"KESİNLEŞMEDİ"}],"recordsTotal":31,"recordsFiltered":31}}"#,
            ))
            .mount(&server)
            .await;

        let client = EmsalClient::with_base_url(server.uri())?;
        let result = client
            .search_detailed(&SearchRequest {
                keyword: Some("kira".to_string()),
                page_number: 2,
                ..Default::default()
            })
            .await?;
        assert_eq!(result.total_records, 31);
        assert_eq!(result.requested_page, 2);
        assert_eq!(result.decisions[0].durum.as_deref(), Some("KESİNLEŞMEDİ"));
        Ok(())
    }

    #[tokio::test]
    async fn empty_document_data_is_a_parse_error() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getDokuman"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": "  "})),
            )
            .mount(&server)
            .await;

        let client = EmsalClient::with_base_url(server.uri())?;
        let err = client.get_document_markdown("5", 1).await.unwrap_err();
        assert_eq!(err.kind(), "upstream_parse");
        Ok(())
    }
}
