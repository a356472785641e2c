//! Court of Cassation (Yargıtay) official search system adapter.
//!
//! Search posts a JSON envelope to `/aramadetaylist`; the document endpoint
//! returns JSON with the decision HTML in its `data` field. Omitted optional
//! filters are sent as empty strings, the upstream rejects `null`.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::fetcher::HttpFetcher;
use crate::markdown::{self, CleaningProfile, Rule};
use crate::{Error, Result};

const BASE_URL: &str = "https://karararama.yargitay.gov.tr";
const DETAILED_SEARCH_ENDPOINT: &str = "/aramadetaylist";
const DOCUMENT_ENDPOINT: &str = "/getDokuman";

/// Closed set of chamber/board names, including the empty sentinel for
/// "all chambers". These are the exact strings the upstream form posts.
pub const CHAMBERS: &[&str] = &[
    "",
    "Hukuk Genel Kurulu",
    "1. Hukuk Dairesi",
    "2. Hukuk Dairesi",
    "3. Hukuk Dairesi",
    "4. Hukuk Dairesi",
    "5. Hukuk Dairesi",
    "6. Hukuk Dairesi",
    "7. Hukuk Dairesi",
    "8. Hukuk Dairesi",
    "9. Hukuk Dairesi",
    "10. Hukuk Dairesi",
    "11. Hukuk Dairesi",
    "12. Hukuk Dairesi",
    "13. Hukuk Dairesi",
    "14. Hukuk Dairesi",
    "15. Hukuk Dairesi",
    "16. Hukuk Dairesi",
    "17. Hukuk Dairesi",
    "18. Hukuk Dairesi",
    "19. Hukuk Dairesi",
    "20. Hukuk Dairesi",
    "21. Hukuk Dairesi",
    "22. Hukuk Dairesi",
    "23. Hukuk Dairesi",
    "Hukuk Daireleri Başkanlar Kurulu",
    "Ceza Genel Kurulu",
    "1. Ceza Dairesi",
    "2. Ceza Dairesi",
    "3. Ceza Dairesi",
    "4. Ceza Dairesi",
    "5. Ceza Dairesi",
    "6. Ceza Dairesi",
    "7. Ceza Dairesi",
    "8. Ceza Dairesi",
    "9. Ceza Dairesi",
    "10. Ceza Dairesi",
    "11. Ceza Dairesi",
    "12. Ceza Dairesi",
    "13. Ceza Dairesi",
    "14. Ceza Dairesi",
    "15. Ceza Dairesi",
    "16. Ceza Dairesi",
    "17. Ceza Dairesi",
    "18. Ceza Dairesi",
    "19. Ceza Dairesi",
    "20. Ceza Dairesi",
    "21. Ceza Dairesi",
    "22. Ceza Dairesi",
    "23. Ceza Dairesi",
    "Ceza Daireleri Başkanlar Kurulu",
    "Büyük Genel Kurulu",
];

/// The `data` object of the detailed-search payload. Field order and the
/// empty-string convention for omitted filters mirror the browser form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedSearchRequest {
    /// Free keyword; upstream grammar: space=OR, `+`=AND, quotes=phrase,
    /// `*`=wildcard, `-`=exclude. Passed through verbatim.
    #[serde(rename = "arananKelime")]
    pub aranan_kelime: String,
    /// Chamber/board name out of [`CHAMBERS`], empty for all.
    #[serde(rename = "birimYrgKurulDaire")]
    pub birim_yrg_kurul_daire: String,
    /// Legacy civil-chamber field, kept for wire fidelity.
    #[serde(rename = "birimYrgHukukDaire")]
    pub birim_yrg_hukuk_daire: String,
    /// Legacy criminal-chamber field, kept for wire fidelity.
    #[serde(rename = "birimYrgCezaDaire")]
    pub birim_yrg_ceza_daire: String,
    /// Case year (`Esas No`), `YYYY`.
    #[serde(rename = "esasYil")]
    pub esas_yil: String,
    /// Case sequence range start.
    #[serde(rename = "esasIlkSiraNo")]
    pub esas_ilk_sira_no: String,
    /// Case sequence range end.
    #[serde(rename = "esasSonSiraNo")]
    pub esas_son_sira_no: String,
    /// Decision year (`Karar No`), `YYYY`.
    #[serde(rename = "kararYil")]
    pub karar_yil: String,
    /// Decision sequence range start.
    #[serde(rename = "kararIlkSiraNo")]
    pub karar_ilk_sira_no: String,
    /// Decision sequence range end.
    #[serde(rename = "kararSonSiraNo")]
    pub karar_son_sira_no: String,
    /// Decision date range start, `DD.MM.YYYY`.
    #[serde(rename = "baslangicTarihi")]
    pub baslangic_tarihi: String,
    /// Decision date range end, `DD.MM.YYYY`.
    #[serde(rename = "bitisTarihi")]
    pub bitis_tarihi: String,
    /// Sort criterion: `1` Esas No, `2` Karar No, `3` Karar Tarihi.
    pub siralama: String,
    /// Sort direction, `asc` or `desc`.
    #[serde(rename = "siralamaDirection")]
    pub siralama_direction: String,
    /// Results per page, 1..=100.
    #[serde(rename = "pageSize")]
    pub page_size: u32,
    /// 1-indexed page.
    #[serde(rename = "pageNumber")]
    pub page_number: u32,
}

impl Default for DetailedSearchRequest {
    fn default() -> Self {
        Self {
            aranan_kelime: String::new(),
            birim_yrg_kurul_daire: String::new(),
            birim_yrg_hukuk_daire: String::new(),
            birim_yrg_ceza_daire: String::new(),
            esas_yil: String::new(),
            esas_ilk_sira_no: String::new(),
            esas_son_sira_no: String::new(),
            karar_yil: String::new(),
            karar_ilk_sira_no: String::new(),
            karar_son_sira_no: String::new(),
            baslangic_tarihi: String::new(),
            bitis_tarihi: String::new(),
            siralama: "3".to_string(),
            siralama_direction: "desc".to_string(),
            page_size: 10,
            page_number: 1,
        }
    }
}

#[derive(Serialize)]
struct SearchEnvelope<'a> {
    data: &'a DetailedSearchRequest,
}

/// One decision row from the search response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEntry {
    /// Opaque system id of the decision.
    pub id: String,
    /// Chamber that issued the decision.
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
    /// Full document URL, synthesized from the id after the search call.
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

// The decision body lives in a Word-export `WordSection1` container; keep it
// and drop navigation chrome around it.
const CLEANING: CleaningProfile = CleaningProfile {
    payload: &[Rule::Class("WordSection1"), Rule::Tag("body")],
    prune: &[],
};

/// Client for the official Yargıtay decision search.
pub struct YargitayClient {
    fetcher: HttpFetcher,
}

impl YargitayClient {
    /// Build the client against the production host.
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    /// Build the client against an arbitrary host (tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let referer = format!("{base_url}/");
        let fetcher = HttpFetcher::builder(base_url)
            .header("Content-Type", "application/json; charset=UTF-8")
            .header("Accept", "application/json, text/plain, */*")
            .header("X-Requested-With", "XMLHttpRequest")
            .header("X-KL-KIS-Ajax-Request", "Ajax_Request")
            .header("Referer", &referer)
            // The upstream certificate chain does not validate.
            .verify_tls(false)
            .build()?;
        Ok(Self { fetcher })
    }

    /// Run a detailed search and synthesize per-row document URLs.
    pub async fn search_detailed(&self, request: &DetailedSearchRequest) -> Result<SearchResult> {
        info!(
            page = request.page_number,
            page_size = request.page_size,
            chamber = %request.birim_yrg_kurul_daire,
            "yargitay detailed search"
        );
        let envelope = SearchEnvelope { data: request };
        let response: SearchResponse = self
            .fetcher
            .post_json(DETAILED_SEARCH_ENDPOINT, &envelope)
            .await
            .inspect_err(|e| error!(source = "yargitay", path = DETAILED_SEARCH_ENDPOINT, error = %e))?;

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

    /// Fetch a decision document and return the requested Markdown chunk.
    pub async fn get_document_markdown(&self, id: &str, page_number: u32) -> Result<DocumentMarkdown> {
        let path = format!("{DOCUMENT_ENDPOINT}?id={id}");
        let source_url = format!("{}{path}", self.fetcher.base_url());
        info!(id, page = page_number, "yargitay document fetch");

        let response: DocumentResponse = self
            .fetcher
            .get_json(&path, &[])
            .await
            .inspect_err(|e| error!(source = "yargitay", %path, error = %e))?;
        let html = match response.data {
            Some(serde_json::Value::String(html)) => html,
            _ => {
                return Err(Error::Parse(
                    "document response `data` field is missing or not a string".into(),
                ));
            },
        };

        Ok(match markdown::html_to_markdown(&html, &CLEANING) {
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
        info!("yargitay client closed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn chamber_set_has_fifty_two_values_with_empty_sentinel() {
        assert_eq!(CHAMBERS.len(), 52);
        assert_eq!(CHAMBERS[0], "");
        assert!(CHAMBERS.contains(&"Hukuk Genel Kurulu"));
        assert!(CHAMBERS.contains(&"23. Ceza Dairesi"));
        assert!(CHAMBERS.contains(&"Büyük Genel Kurulu"));
    }

    #[test]
    fn request_serializes_exact_wire_keys_and_empty_strings() {
        let request = DetailedSearchRequest {
            aranan_kelime: "mülkiyet".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(SearchEnvelope { data: &request }).unwrap();
        let data = &json["data"];
        assert_eq!(data["arananKelime"], "mülkiyet");
        assert_eq!(data["birimYrgKurulDaire"], "");
        assert_eq!(data["esasYil"], "");
        assert_eq!(data["siralama"], "3");
        assert_eq!(data["siralamaDirection"], "desc");
        assert_eq!(data["pageSize"], 10);
        assert_eq!(data["pageNumber"], 1);
        // Every optional is a key with an empty string, never null.
        assert!(!serde_json::to_string(&json).unwrap().contains("null"));
    }

    #[tokio::test]
    async fn search_parses_rows_and_synthesizes_document_urls() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/aramadetaylist"))
            .and(body_partial_json(serde_json::json!({
                "data": {"arananKelime": "mülkiyet", "pageSize": 10, "pageNumber": 1}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"data":{"data":[
                    {"id":"111","daire":"1. Hukuk Dairesi","esasNo":"2023/1","kararNo":"2024/2","kararTarihi":"01.02.2024"},
                    {"id":"222","daire":"2. Hukuk Dairesi"}
                ],"recordsTotal":42,"recordsFiltered":42}}"#,
            ))
            .mount(&server)
            .await;

        let client = YargitayClient::with_base_url(server.uri())?;
        let request = DetailedSearchRequest {
            aranan_kelime: "mülkiyet".to_string(),
            ..Default::default()
        };
        let result = client.search_detailed(&request).await?;

        assert_eq!(result.total_records, 42);
        assert_eq!(result.requested_page, 1);
        assert_eq!(result.decisions.len(), 2);
        for decision in &result.decisions {
            let url = decision.document_url.as_deref().unwrap();
            assert_eq!(url, &format!("{}/getDokuman?id={}", server.uri(), decision.id));
        }
        Ok(())
    }

    #[tokio::test]
    async fn document_converts_json_wrapped_html() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        let html = r#"<html><body><div class="WordSection1"><p>T.C. YARGITAY KARARI</p></div></body></html>"#;
        let body = serde_json::json!({ "data": html, "metadata": {} });
        Mock::given(method("GET"))
            .and(path("/getDokuman"))
            .and(query_param("id", "12345"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = YargitayClient::with_base_url(server.uri())?;
        let document = client.get_document_markdown("12345", 1).await?;

        assert_eq!(document.id, "12345");
        assert_eq!(document.current_page, 1);
        assert_eq!(document.total_pages, 1);
        assert!(!document.is_paginated);
        assert!(document.error_message.is_none());
        assert!(document.markdown_chunk.unwrap().contains("YARGITAY KARARI"));
        Ok(())
    }

    #[tokio::test]
    async fn document_without_data_field_is_a_parse_error() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getDokuman"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": 17})),
            )
            .mount(&server)
            .await;

        let client = YargitayClient::with_base_url(server.uri())?;
        let err = client.get_document_markdown("1", 1).await.unwrap_err();
        assert_eq!(err.kind(), "upstream_parse");
        Ok(())
    }
}
