//! Competition Authority (Rekabet Kurumu) adapter.
//!
//! Search is a GET against `/tr/Kararlar` whose query string mirrors the
//! site's form field-for-field, decision type travelling as a GUID. A
//! decision's landing page either *is* the PDF or links to one; the adapter
//! downloads the full PDF, carves out the requested page and renders only
//! that page to Markdown, so one MCP page equals one PDF page.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use url::Url;

use crate::fetcher::HttpFetcher;
use crate::{Error, Result, pdf};

const BASE_URL: &str = "https://www.rekabet.gov.tr";
const SEARCH_PATH: &str = "/tr/Kararlar";
const DECISION_LANDING_PATH: &str = "/Karar";
const RESULTS_PER_PAGE: u64 = 10;

/// Friendly decision-type names shown on the site's dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub enum KararTuru {
    /// All decision types.
    #[serde(rename = "Tümü")]
    Tumu,
    /// Merger and acquisition.
    #[serde(rename = "Birleşme ve Devralma")]
    BirlesmeVeDevralma,
    /// Other.
    #[serde(rename = "Diğer")]
    Diger,
    /// Negative clearance and exemption.
    #[serde(rename = "Menfi Tespit ve Muafiyet")]
    MenfiTespitVeMuafiyet,
    /// Privatization.
    #[serde(rename = "Özelleştirme")]
    Ozellestirme,
    /// Competition infringement.
    #[serde(rename = "Rekabet İhlali")]
    RekabetIhlali,
}

impl KararTuru {
    /// GUID the website's dropdown posts for this decision type; the
    /// sentinel maps to the empty string.
    #[must_use]
    pub const fn guid(self) -> &'static str {
        match self {
            Self::Tumu => "",
            Self::BirlesmeVeDevralma => "2fff0979-9f9d-42d7-8c2e-a30705889542",
            Self::Diger => "dda8feaf-c919-405c-9da1-823f22b45ad9",
            Self::MenfiTespitVeMuafiyet => "95ccd210-5304-49c5-b9e0-8ee53c50d4e8",
            Self::Ozellestirme => "e1f14505-842b-4af5-95d1-312d6de1a541",
            Self::RekabetIhlali => "720614bf-efd1-4dca-9785-b98eb65f2677",
        }
    }
}

/// Caller-facing search parameters with the site's own field names.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Search in decision title (`sayfaAdi`).
    pub sayfa_adi: Option<String>,
    /// Publication date (`YayinlanmaTarihi`), `DD.MM.YYYY`.
    pub yayinlanma_tarihi: Option<String>,
    /// Search in decision text (`PdfText`); double quotes request an exact
    /// phrase.
    pub pdf_text: Option<String>,
    /// Decision type.
    pub karar_turu: KararTuru,
    /// Decision number (`KararSayisi`).
    pub karar_sayisi: Option<String>,
    /// Decision date (`KararTarihi`), `DD.MM.YYYY`.
    pub karar_tarihi: Option<String>,
    /// 1-indexed page of the result list.
    pub page: u32,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            sayfa_adi: None,
            yayinlanma_tarihi: None,
            pdf_text: None,
            karar_turu: KararTuru::Tumu,
            karar_sayisi: None,
            karar_tarihi: None,
            page: 1,
        }
    }
}

/// One decision summary parsed from the results list.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionSummary {
    /// Publication date.
    pub publication_date: Option<String>,
    /// Decision number.
    pub decision_number: Option<String>,
    /// Decision date.
    pub decision_date: Option<String>,
    /// Decision type as displayed.
    pub decision_type_text: Option<String>,
    /// Title line of the decision.
    pub title: Option<String>,
    /// Landing-page URL (`/Karar?kararId=…`).
    pub decision_url: Option<String>,
    /// GUID extracted from the landing-page URL.
    pub karar_id: Option<String>,
    /// Related court cases URL, when linked.
    pub related_cases_url: Option<String>,
}

/// Search result for the tool layer.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Parsed decision summaries.
    pub decisions: Vec<DecisionSummary>,
    /// Total from the `Toplam : N` label, if present.
    pub total_records_found: Option<u64>,
    /// Echo of the requested page.
    pub retrieved_page_number: u32,
    /// `ceil(total / 10)`, or a last-page-link fallback.
    pub total_pages: Option<u64>,
}

/// A decision document: one PDF page rendered to Markdown.
#[derive(Debug, Clone, Serialize)]
pub struct RekabetDocument {
    /// Landing-page URL the PDF was discovered from.
    pub source_landing_page_url: String,
    /// GUID of the decision.
    pub karar_id: String,
    /// Title found on the landing page.
    pub title_on_landing_page: Option<String>,
    /// Resolved PDF URL, when found.
    pub pdf_url: Option<String>,
    /// Markdown of exactly one PDF page, `None` on failure.
    pub markdown_chunk: Option<String>,
    /// 1-indexed PDF page of the chunk.
    pub current_page: u32,
    /// Page count of the originating PDF; 0 when it could not be read.
    pub total_pages: u32,
    /// Whether the PDF has more than one page.
    pub is_paginated: bool,
    /// Error message when retrieval or conversion failed.
    pub error_message: Option<String>,
}

static TOTAL_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"Toplam\s*:\s*(\d+)").expect("static regex")
});

fn sel(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Parse(format!("bad selector `{css}`: {e}")))
}

fn karar_id_from_href(href: &str) -> Option<String> {
    let query = href.split_once('?')?.1;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "kararId")
        .map(|(_, v)| v.into_owned())
}

/// Client for the Competition Authority decision search.
pub struct RekabetClient {
    fetcher: HttpFetcher,
}

impl RekabetClient {
    /// Build the client against the production host.
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    /// Build the client against an arbitrary host (tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let fetcher = HttpFetcher::builder(base_url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header("Accept-Language", "tr-TR,tr;q=0.9,en-US;q=0.8,en;q=0.7")
            .header(
                "User-Agent",
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            )
            .build()?;
        Ok(Self { fetcher })
    }

    fn build_query(request: &SearchRequest) -> Vec<(&'static str, String)> {
        let unwrap = |v: &Option<String>| v.clone().unwrap_or_default();
        let mut query = vec![
            ("sayfaAdi", unwrap(&request.sayfa_adi)),
            ("YayinlanmaTarihi", unwrap(&request.yayinlanma_tarihi)),
            ("PdfText", unwrap(&request.pdf_text)),
            ("KararTuruID", request.karar_turu.guid().to_string()),
            ("KararSayisi", unwrap(&request.karar_sayisi)),
            ("KararTarihi", unwrap(&request.karar_tarihi)),
        ];
        if request.page > 1 {
            query.push(("page", request.page.to_string()));
        }
        query
    }

    /// Run a search and parse the decision tables.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        info!(page = request.page, "rekabet search");
        let query = Self::build_query(request);
        let html = self
            .fetcher
            .get_text(SEARCH_PATH, &query)
            .await
            .inspect_err(|e| error!(source = "rekabet", path = SEARCH_PATH, error = %e))?;
        self.parse_search_results(&html, request.page)
    }

    fn parse_search_results(&self, html: &str, page: u32) -> Result<SearchResult> {
        let document = Html::parse_document(html);

        let mut total_records = None;
        let mut total_pages = None;
        if let Some(pagination) = document.select(&sel("div.yazi01")?).next() {
            let text: String = pagination.text().collect();
            total_records = TOTAL_RE
                .captures(&text)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<u64>().ok());
            total_pages = total_records.map(|n| n.div_ceil(RESULTS_PER_PAGE));
            if total_pages.is_none() {
                total_pages = pagination
                    .select(&sel("li.PagedList-skipToLast a")?)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .and_then(|href| {
                        let query = href.split_once('?')?.1;
                        url::form_urlencoded::parse(query.as_bytes())
                            .find(|(k, _)| k == "page")
                            .and_then(|(_, v)| v.parse().ok())
                    });
            }
        }

        let row_sel = sel("tr")?;
        let cell_sel = sel("td")?;
        let link_sel = sel("a[href]")?;

        let mut decisions = Vec::new();
        if let Some(container) = document.select(&sel("div#kararList")?).next() {
            for table in container.select(&sel("table.equalDivide")?) {
                let rows: Vec<_> = table.select(&row_sel).collect();
                if rows.len() != 3 {
                    warn!(rows = rows.len(), "skipping rekabet table with unexpected row count");
                    continue;
                }

                let text_of = |element: scraper::ElementRef<'_>| {
                    let t: String = element.text().collect::<String>().trim().to_string();
                    if t.is_empty() { None } else { Some(t) }
                };

                // Row 1: publication date, decision number, related cases.
                let r1: Vec<_> = rows[0].select(&cell_sel).collect();
                let publication_date = r1.first().copied().and_then(text_of);
                let decision_number = r1.get(1).copied().and_then(text_of);
                let (related_cases_url, karar_id_from_related) = r1
                    .get(2)
                    .and_then(|cell| cell.select(&link_sel).next())
                    .and_then(|a| a.value().attr("href"))
                    .map_or((None, None), |href| {
                        (self.absolute_url(href).ok(), karar_id_from_href(href))
                    });

                // Row 2: decision date and type.
                let r2: Vec<_> = rows[1].select(&cell_sel).collect();
                let decision_date = r2.first().copied().and_then(text_of);
                let decision_type_text = r2.get(1).copied().and_then(text_of);

                // Row 3: title and the landing-page link.
                let mut title = None;
                let mut decision_url = None;
                let mut karar_id_from_main = None;
                if let Some(link) = rows[2].select(&link_sel).next() {
                    title = text_of(link);
                    if let Some(href) = link.value().attr("href") {
                        if href.starts_with(&format!("{DECISION_LANDING_PATH}?kararId=")) {
                            decision_url = self.absolute_url(href).ok();
                            karar_id_from_main = karar_id_from_href(href);
                        }
                    }
                }

                let karar_id = karar_id_from_main.or(karar_id_from_related);
                if karar_id.is_none() {
                    warn!("skipping rekabet row without kararId");
                    continue;
                }

                decisions.push(DecisionSummary {
                    publication_date,
                    decision_number,
                    decision_date,
                    decision_type_text,
                    title,
                    decision_url,
                    karar_id,
                    related_cases_url,
                });
            }
        }

        Ok(SearchResult {
            decisions,
            total_records_found: total_records,
            retrieved_page_number: page,
            total_pages,
        })
    }

    fn absolute_url(&self, href: &str) -> Result<String> {
        let base = Url::parse(self.fetcher.base_url())
            .map_err(|e| Error::Parse(format!("bad base url: {e}")))?;
        Ok(base
            .join(href)
            .map_err(|e| Error::Parse(format!("bad href `{href}`: {e}")))?
            .to_string())
    }

    fn discover_pdf_url(&self, landing_html: &str, landing_url: &str) -> Result<Option<String>> {
        let document = Html::parse_document(landing_html);
        let join = |href: &str| {
            Url::parse(landing_url)
                .ok()
                .and_then(|base| base.join(href).ok())
                .map(|u| u.to_string())
        };

        let is_pdf_href = |href: &str| {
            let lower = href.to_lowercase();
            let path = lower.split('?').next().unwrap_or(&lower);
            path.ends_with(".pdf")
        };

        if let Some(url) = document
            .select(&sel("a[href]")?)
            .filter_map(|a| a.value().attr("href"))
            .find(|href| is_pdf_href(href))
            .and_then(join)
        {
            return Ok(Some(url));
        }
        if let Some(url) = document
            .select(&sel("iframe[src]")?)
            .filter_map(|f| f.value().attr("src"))
            .find(|src| is_pdf_href(src))
            .and_then(join)
        {
            return Ok(Some(url));
        }
        if let Some(url) = document
            .select(&sel("embed[src]")?)
            .filter_map(|e| e.value().attr("src"))
            .find(|src| is_pdf_href(src))
            .and_then(join)
        {
            return Ok(Some(url));
        }
        Ok(None)
    }

    fn landing_title(landing_html: &str) -> Option<String> {
        let document = Html::parse_document(landing_html);
        let title_sel = Selector::parse("title").ok()?;
        document
            .select(&title_sel)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Fetch one PDF page of a decision as Markdown.
    ///
    /// The landing page is probed first: a `application/pdf` content type
    /// short-circuits discovery, otherwise the page is scanned for a PDF
    /// link (anchor, then iframe, then embed).
    pub async fn get_document(&self, karar_id: &str, page_number: u32) -> Result<RekabetDocument> {
        let landing_url = format!(
            "{}{DECISION_LANDING_PATH}?kararId={karar_id}",
            self.fetcher.base_url()
        );
        info!(karar_id, page = page_number, "rekabet document fetch");

        let mut title = Some(format!("Rekabet Kurumu Kararı {karar_id}"));
        let mut pdf_url: Option<String> = None;
        let mut error_message: Option<String> = None;
        let mut pdf_bytes: Option<Vec<u8>> = None;

        let response = self
            .fetcher
            .stream(&landing_url)
            .await
            .inspect_err(|e| error!(source = "rekabet", url = %landing_url, error = %e))?;
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        let final_url = response.url().to_string();

        if content_type.contains("application/pdf") {
            pdf_url = Some(final_url);
            pdf_bytes = Some(response.bytes().await?.to_vec());
        } else if content_type.contains("text/html") {
            let landing_html = response.text().await?;
            if landing_html.trim().is_empty() {
                error_message = Some("decision landing page is empty".to_string());
            } else {
                if let Some(t) = Self::landing_title(&landing_html) {
                    title = Some(t);
                }
                match self.discover_pdf_url(&landing_html, &final_url)? {
                    Some(url) => {
                        let download = self.fetcher.stream(&url).await?;
                        pdf_bytes = Some(download.bytes().await?.to_vec());
                        pdf_url = Some(url);
                    },
                    None => {
                        error_message =
                            Some(format!("no PDF link found on landing page {final_url}"));
                    },
                }
            }
        } else {
            error_message = Some(format!("unexpected content type `{content_type}`"));
        }

        let mut markdown_chunk = None;
        let mut total_pages = 0u32;
        if let Some(bytes) = pdf_bytes {
            match pdf::extract_single_page(&bytes, page_number) {
                Ok((Some(single_page), total)) => {
                    total_pages = total;
                    match pdf::pdf_to_markdown(&single_page) {
                        Ok(markdown) => markdown_chunk = Some(markdown),
                        Err(e) => {
                            error_message = Some(format!(
                                "could not convert page {page_number} of PDF to Markdown: {e}"
                            ));
                        },
                    }
                },
                Ok((None, total)) => {
                    total_pages = total;
                    error_message = Some(format!(
                        "requested page {page_number} is out of range (1-{total})"
                    ));
                },
                Err(e) => {
                    error_message = Some(e.to_string());
                },
            }
        } else if error_message.is_none() {
            error_message = Some("PDF content could not be downloaded or identified".to_string());
        }

        let current_page = if total_pages > 0 {
            page_number.clamp(1, total_pages)
        } else {
            page_number.max(1)
        };

        Ok(RekabetDocument {
            source_landing_page_url: landing_url,
            karar_id: karar_id.to_string(),
            title_on_landing_page: title,
            pdf_url,
            markdown_chunk,
            current_page,
            total_pages,
            is_paginated: total_pages > 1,
            error_message,
        })
    }

    /// Close the underlying HTTP client. Idempotent.
    pub fn close(&self) {
        info!("rekabet client closed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn guid_map_matches_dropdown_values() {
        assert_eq!(KararTuru::Tumu.guid(), "");
        assert_eq!(
            KararTuru::BirlesmeVeDevralma.guid(),
            "2fff0979-9f9d-42d7-8c2e-a30705889542"
        );
        assert_eq!(
            KararTuru::RekabetIhlali.guid(),
            "720614bf-efd1-4dca-9785-b98eb65f2677"
        );
    }

    #[test]
    fn query_keeps_fixed_field_order_with_empty_strings() {
        let request = SearchRequest {
            pdf_text: Some("\"dikey anlaşma\"".to_string()),
            karar_turu: KararTuru::RekabetIhlali,
            ..Default::default()
        };
        let query = RekabetClient::build_query(&request);
        let keys: Vec<&str> = query.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec!["sayfaAdi", "YayinlanmaTarihi", "PdfText", "KararTuruID", "KararSayisi", "KararTarihi"]
        );
        assert_eq!(query[0].1, "");
        assert_eq!(query[3].1, KararTuru::RekabetIhlali.guid());

        let paged = RekabetClient::build_query(&SearchRequest {
            page: 4,
            ..Default::default()
        });
        assert_eq!(paged.last().unwrap(), &("page", "4".to_string()));
    }

    const RESULTS_HTML: &str = r#"
    <html><body>
      <div class="yazi01">Toplam : 25 karar</div>
      <div id="kararList">
        <table class="equalDivide">
          <tr><td>12.06.2024</td><td>24-26/615-265</td><td><a href="/KararDavalari?kararId=guid-1">Davalar</a></td></tr>
          <tr><td>06.06.2024</td><td>Rekabet İhlali</td></tr>
          <tr><td colspan="5"><a href="/Karar?kararId=guid-1">Teşebbüs birliği kararı</a></td></tr>
        </table>
        <table class="equalDivide">
          <tr><td>01.01.2024</td><td>24-01/1-1</td><td></td></tr>
          <tr><td>28.12.2023</td><td>Birleşme ve Devralma</td></tr>
          <tr><td colspan="5">bağlantısız başlık</td></tr>
        </table>
      </div>
    </body></html>"#;

    #[test]
    fn parses_three_row_tables_and_totals() {
        let client = RekabetClient::with_base_url("https://www.rekabet.gov.tr").unwrap();
        let result = client.parse_search_results(RESULTS_HTML, 1).unwrap();

        assert_eq!(result.total_records_found, Some(25));
        assert_eq!(result.total_pages, Some(3));
        // Second table has no kararId anywhere and is skipped.
        assert_eq!(result.decisions.len(), 1);
        let decision = &result.decisions[0];
        assert_eq!(decision.publication_date.as_deref(), Some("12.06.2024"));
        assert_eq!(decision.decision_number.as_deref(), Some("24-26/615-265"));
        assert_eq!(decision.decision_type_text.as_deref(), Some("Rekabet İhlali"));
        assert_eq!(decision.karar_id.as_deref(), Some("guid-1"));
        assert_eq!(
            decision.decision_url.as_deref(),
            Some("https://www.rekabet.gov.tr/Karar?kararId=guid-1")
        );
        assert_eq!(
            decision.related_cases_url.as_deref(),
            Some("https://www.rekabet.gov.tr/KararDavalari?kararId=guid-1")
        );
        assert_eq!(decision.title.as_deref(), Some("Teşebbüs birliği kararı"));
    }

    #[test]
    fn pdf_discovery_prefers_anchor_then_iframe_then_embed() {
        let client = RekabetClient::with_base_url("https://www.rekabet.gov.tr").unwrap();
        let landing = "https://www.rekabet.gov.tr/Karar?kararId=x";

        let anchor = r#"<html><body><a href="/Dosya/karar-1.pdf?v=2">Karar Metni</a></body></html>"#;
        assert_eq!(
            client.discover_pdf_url(anchor, landing).unwrap().as_deref(),
            Some("https://www.rekabet.gov.tr/Dosya/karar-1.pdf?v=2")
        );

        let iframe = r#"<html><body><iframe src="/viewer/k.PDF"></iframe></body></html>"#;
        assert_eq!(
            client.discover_pdf_url(iframe, landing).unwrap().as_deref(),
            Some("https://www.rekabet.gov.tr/viewer/k.PDF")
        );

        let none = "<html><body><p>metin</p></body></html>";
        assert!(client.discover_pdf_url(none, landing).unwrap().is_none());
    }

    #[test]
    fn karar_id_extraction_from_href() {
        assert_eq!(
            karar_id_from_href("/Karar?kararId=abc-def").as_deref(),
            Some("abc-def")
        );
        assert!(karar_id_from_href("/Karar").is_none());
    }
}
