//! Council of State (Danıştay) primary search system adapter.
//!
//! Two search modes against the same host: keyword mode posts to
//! `/aramalist` with four Boolean keyword groups, detailed mode posts to
//! `/aramadetaylist` with every key present (the upstream requires the key
//! even when empty). The document endpoint returns the decision HTML
//! directly, not JSON-wrapped.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::fetcher::HttpFetcher;
use crate::markdown::{self, CleaningProfile};
use crate::Result;

const BASE_URL: &str = "https://karararama.danistay.gov.tr";
const KEYWORD_SEARCH_ENDPOINT: &str = "/aramalist";
const DETAILED_SEARCH_ENDPOINT: &str = "/aramadetaylist";
const DOCUMENT_ENDPOINT: &str = "/getDokuman";

/// Closed set of chamber/board names, including the empty sentinel for
/// "all chambers".
pub const CHAMBERS: &[&str] = &[
    "",
    "Büyük Gen.Kur.",
    "İdare Dava Daireleri Kurulu",
    "Vergi Dava Daireleri Kurulu",
    "İçtihatları Birleştirme Kurulu",
    "İdari İşler Kurulu",
    "Başkanlar Kurulu",
    "1. Daire",
    "2. Daire",
    "3. Daire",
    "4. Daire",
    "5. Daire",
    "6. Daire",
    "7. Daire",
    "8. Daire",
    "9. Daire",
    "10. Daire",
    "11. Daire",
    "12. Daire",
    "13. Daire",
    "14. Daire",
    "15. Daire",
    "16. Daire",
    "17. Daire",
    "Askeri Yüksek İdare Mahkemesi",
    "Askeri Yüksek İdare Mahkemesi Daireler Kurulu",
    "Askeri Yüksek İdare Mahkemesi Başsavcılığı",
];

/// Caller-facing keyword search parameters.
#[derive(Debug, Clone, Default)]
pub struct KeywordSearchRequest {
    /// Keywords combined with AND.
    pub and_kelimeler: Vec<String>,
    /// Keywords combined with OR.
    pub or_kelimeler: Vec<String>,
    /// Excluded keywords, AND semantics.
    pub not_and_kelimeler: Vec<String>,
    /// Excluded keywords, OR semantics.
    pub not_or_kelimeler: Vec<String>,
    /// Results per page, 1..=100.
    pub page_size: u32,
    /// 1-indexed page.
    pub page_number: u32,
}

#[derive(Serialize)]
struct KeywordSearchData {
    #[serde(rename = "andKelimeler")]
    and_kelimeler: Vec<String>,
    #[serde(rename = "orKelimeler")]
    or_kelimeler: Vec<String>,
    #[serde(rename = "notAndKelimeler")]
    not_and_kelimeler: Vec<String>,
    #[serde(rename = "notOrKelimeler")]
    not_or_kelimeler: Vec<String>,
    #[serde(rename = "pageSize")]
    page_size: u32,
    #[serde(rename = "pageNumber")]
    page_number: u32,
}

/// Caller-facing detailed search parameters. Absent strings are coerced to
/// `""` on the wire.
#[derive(Debug, Clone)]
pub struct DetailedSearchRequest {
    /// Chamber name, e.g. `1. Daire`; empty for all.
    pub daire: Option<String>,
    /// Case year.
    pub esas_yil: Option<String>,
    /// Case sequence range start.
    pub esas_ilk_sira_no: Option<String>,
    /// Case sequence range end.
    pub esas_son_sira_no: Option<String>,
    /// Decision year.
    pub karar_yil: Option<String>,
    /// Decision sequence range start.
    pub karar_ilk_sira_no: Option<String>,
    /// Decision sequence range end.
    pub karar_son_sira_no: Option<String>,
    /// Decision date range start, `DD.MM.YYYY`.
    pub baslangic_tarihi: Option<String>,
    /// Decision date range end, `DD.MM.YYYY`.
    pub bitis_tarihi: Option<String>,
    /// Legislation number filter.
    pub mevzuat_numarasi: Option<String>,
    /// Legislation name filter.
    pub mevzuat_adi: Option<String>,
    /// Legislation article filter.
    pub madde: Option<String>,
    /// Sort criterion.
    pub siralama: String,
    /// Sort direction, `asc` or `desc`.
    pub siralama_direction: String,
    /// Results per page, 1..=100.
    pub page_size: u32,
    /// 1-indexed page.
    pub page_number: u32,
}

impl Default for DetailedSearchRequest {
    fn default() -> Self {
        Self {
            daire: None,
            esas_yil: None,
            esas_ilk_sira_no: None,
            esas_son_sira_no: None,
            karar_yil: None,
            karar_ilk_sira_no: None,
            karar_son_sira_no: None,
            baslangic_tarihi: None,
            bitis_tarihi: None,
            mevzuat_numarasi: None,
            mevzuat_adi: None,
            madde: None,
            siralama: "1".to_string(),
            siralama_direction: "desc".to_string(),
            page_size: 10,
            page_number: 1,
        }
    }
}

// Wire shape of the detailed payload: every key present, empty string for
// omitted filters.
#[derive(Serialize)]
struct DetailedSearchData {
    daire: String,
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
    #[serde(rename = "mevzuatNumarasi")]
    mevzuat_numarasi: String,
    #[serde(rename = "mevzuatAdi")]
    mevzuat_adi: String,
    madde: String,
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

/// One decision row from either search mode. Keyword responses label the
/// chamber `daire`; both are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEntry {
    /// Opaque system id of the decision.
    pub id: String,
    /// Chamber or board.
    #[serde(rename = "daire", default)]
    pub chamber: Option<String>,
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

/// Wrap every non-empty keyword in double quotes, stripping quotes the
/// caller already added. The upstream treats quoted terms as phrases.
fn quote_keywords(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .filter(|k| !k.trim().is_empty())
        .map(|k| format!("\"{}\"", k.trim().trim_matches('"')))
        .collect()
}

/// Client for the Danıştay decision search.
pub struct DanistayClient {
    fetcher: HttpFetcher,
}

impl DanistayClient {
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

    /// Keyword-mode search.
    pub async fn search_keyword(&self, request: &KeywordSearchRequest) -> Result<SearchResult> {
        info!(page = request.page_number, "danistay keyword search");
        let data = KeywordSearchData {
            and_kelimeler: quote_keywords(&request.and_kelimeler),
            or_kelimeler: quote_keywords(&request.or_kelimeler),
            not_and_kelimeler: quote_keywords(&request.not_and_kelimeler),
            not_or_kelimeler: quote_keywords(&request.not_or_kelimeler),
            page_size: request.page_size,
            page_number: request.page_number,
        };
        self.execute_search(
            KEYWORD_SEARCH_ENDPOINT,
            &Envelope { data },
            request.page_number,
            request.page_size,
        )
        .await
    }

    /// Detailed-mode search.
    pub async fn search_detailed(&self, request: &DetailedSearchRequest) -> Result<SearchResult> {
        info!(page = request.page_number, "danistay detailed search");
        let unwrap = |v: &Option<String>| v.clone().unwrap_or_default();
        let data = DetailedSearchData {
            daire: unwrap(&request.daire),
            esas_yil: unwrap(&request.esas_yil),
            esas_ilk_sira_no: unwrap(&request.esas_ilk_sira_no),
            esas_son_sira_no: unwrap(&request.esas_son_sira_no),
            karar_yil: unwrap(&request.karar_yil),
            karar_ilk_sira_no: unwrap(&request.karar_ilk_sira_no),
            karar_son_sira_no: unwrap(&request.karar_son_sira_no),
            baslangic_tarihi: unwrap(&request.baslangic_tarihi),
            bitis_tarihi: unwrap(&request.bitis_tarihi),
            mevzuat_numarasi: unwrap(&request.mevzuat_numarasi),
            mevzuat_adi: unwrap(&request.mevzuat_adi),
            madde: unwrap(&request.madde),
            siralama: request.siralama.clone(),
            siralama_direction: request.siralama_direction.clone(),
            page_size: request.page_size,
            page_number: request.page_number,
        };
        self.execute_search(
            DETAILED_SEARCH_ENDPOINT,
            &Envelope { data },
            request.page_number,
            request.page_size,
        )
        .await
    }

    async fn execute_search<T: Serialize>(
        &self,
        endpoint: &str,
        payload: &T,
        page_number: u32,
        page_size: u32,
    ) -> Result<SearchResult> {
        let response: SearchResponse = self
            .fetcher
            .post_json(endpoint, payload)
            .await
            .inspect_err(|e| error!(source = "danistay", path = endpoint, error = %e))?;
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
            requested_page: page_number,
            page_size,
        })
    }

    /// Fetch a decision document (direct HTML) and return the requested
    /// Markdown chunk.
    pub async fn get_document_markdown(&self, id: &str, page_number: u32) -> Result<DocumentMarkdown> {
        let path = format!("{DOCUMENT_ENDPOINT}?id={id}");
        let source_url = format!("{}{path}", self.fetcher.base_url());
        info!(id, page = page_number, "danistay document fetch");

        let html = self
            .fetcher
            .get_text(&path, &[])
            .await
            .inspect_err(|e| error!(source = "danistay", %path, error = %e))?;

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
        info!("danistay client closed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn chamber_set_has_twenty_seven_values_with_empty_sentinel() {
        assert_eq!(CHAMBERS.len(), 27);
        assert_eq!(CHAMBERS[0], "");
        assert!(CHAMBERS.contains(&"17. Daire"));
        assert!(CHAMBERS.contains(&"Vergi Dava Daireleri Kurulu"));
    }

    #[test]
    fn keywords_are_wrapped_in_double_quotes() {
        let quoted = quote_keywords(&[
            "idari işlem".to_string(),
            "\"zaten tırnaklı\"".to_string(),
            "  ".to_string(),
        ]);
        assert_eq!(quoted, vec!["\"idari işlem\"", "\"zaten tırnaklı\""]);
    }

    #[test]
    fn detailed_payload_keeps_every_key_present() {
        let request = DetailedSearchRequest {
            daire: Some("1. Daire".to_string()),
            ..Default::default()
        };
        let unwrap = |v: &Option<String>| v.clone().unwrap_or_default();
        let data = DetailedSearchData {
            daire: unwrap(&request.daire),
            esas_yil: unwrap(&request.esas_yil),
            esas_ilk_sira_no: unwrap(&request.esas_ilk_sira_no),
            esas_son_sira_no: unwrap(&request.esas_son_sira_no),
            karar_yil: unwrap(&request.karar_yil),
            karar_ilk_sira_no: unwrap(&request.karar_ilk_sira_no),
            karar_son_sira_no: unwrap(&request.karar_son_sira_no),
            baslangic_tarihi: unwrap(&request.baslangic_tarihi),
            bitis_tarihi: unwrap(&request.bitis_tarihi),
            mevzuat_numarasi: unwrap(&request.mevzuat_numarasi),
            mevzuat_adi: unwrap(&request.mevzuat_adi),
            madde: unwrap(&request.madde),
            siralama: request.siralama.clone(),
            siralama_direction: request.siralama_direction.clone(),
            page_size: request.page_size,
            page_number: request.page_number,
        };
        let json = serde_json::to_value(Envelope { data }).unwrap();
        let data = json["data"].as_object().unwrap();
        assert_eq!(data.len(), 16);
        assert_eq!(data["daire"], "1. Daire");
        assert_eq!(data["mevzuatAdi"], "");
        assert_eq!(data["madde"], "");
    }

    #[tokio::test]
    async fn keyword_search_posts_quoted_keywords() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/aramalist"))
            .and(body_partial_json(serde_json::json!({
                "data": {"andKelimeler": ["\"imar planı\""]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"data":{"data":[{"id":"9","daire":"6. Daire"}],"recordsTotal":1,"recordsFiltered":1}}"#,
            ))
            .mount(&server)
            .await;

        let client = DanistayClient::with_base_url(server.uri())?;
        let result = client
            .search_keyword(&KeywordSearchRequest {
                and_kelimeler: vec!["imar planı".to_string()],
                page_size: 10,
                page_number: 1,
                ..Default::default()
            })
            .await?;
        assert_eq!(result.total_records, 1);
        assert_eq!(
            result.decisions[0].document_url.as_deref().unwrap(),
            &format!("{}/getDokuman?id=9", server.uri())
        );
        Ok(())
    }

    #[tokio::test]
    async fn document_fetch_converts_direct_html() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getDokuman"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><body><p>DANIŞTAY ALTINCI DAİRE KARARI</p></body></html>",
            ))
            .mount(&server)
            .await;

        let client = DanistayClient::with_base_url(server.uri())?;
        let document = client.get_document_markdown("9", 1).await?;
        assert!(document.markdown_chunk.unwrap().contains("ALTINCI DAİRE"));
        assert_eq!(document.total_pages, 1);
        Ok(())
    }
}
