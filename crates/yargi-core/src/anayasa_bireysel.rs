//! Constitutional Court individual-application (Bireysel Başvuru) decision
//! bulletin adapter.
//!
//! Search is a GET against `/Ara` with `KararBulteni=1` pinned; results are
//! server-rendered bulletin blocks. Documents live under `/BB/YYYY/NNNN`
//! paths and carry their metadata in a `#KararDetaylari` key/value table.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::{error, info};
use url::Url;

use crate::fetcher::HttpFetcher;
use crate::markdown::{self, CleaningProfile, Rule};
use crate::{Error, Result};

const BASE_URL: &str = "https://kararlarbilgibankasi.anayasa.gov.tr";
const SEARCH_PATH: &str = "/Ara";

/// Caller-facing report search parameters.
#[derive(Debug, Clone, Default)]
pub struct ReportSearchRequest {
    /// Keywords, all required (`KelimeAra[]`).
    pub keywords: Vec<String>,
    /// 1-indexed page to fetch.
    pub page_to_fetch: u32,
}

/// One (right, claim, outcome, redress) tuple from a decision's detail table.
#[derive(Debug, Clone, Serialize)]
pub struct ReportDecisionDetail {
    /// Right allegedly violated.
    pub hak: Option<String>,
    /// Interference claim.
    pub mudahale_iddiasi: Option<String>,
    /// Review outcome.
    pub sonuc: Option<String>,
    /// Redress decided.
    pub giderim: Option<String>,
}

/// One decision summary from the bulletin.
#[derive(Debug, Clone, Serialize)]
pub struct ReportDecisionSummary {
    /// Application title.
    pub title: Option<String>,
    /// Application number, e.g. `2019/19126`.
    pub decision_reference_no: Option<String>,
    /// Full URL of the decision page.
    pub decision_page_url: Option<String>,
    /// Decision type (application outcome).
    pub decision_type_summary: Option<String>,
    /// Deciding body (section / plenary).
    pub decision_making_body: Option<String>,
    /// Application date, `DD/MM/YYYY`.
    pub application_date_summary: Option<String>,
    /// Decision date, `DD/MM/YYYY`.
    pub decision_date_summary: Option<String>,
    /// Subject line of the application.
    pub application_subject_summary: Option<String>,
    /// Reviewed rights and outcomes.
    pub details: Vec<ReportDecisionDetail>,
}

/// Search result for the tool layer.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSearchResult {
    /// Parsed decision summaries.
    pub decisions: Vec<ReportDecisionSummary>,
    /// Total from the `N Karar Bulundu` label, if present.
    pub total_records_found: Option<u64>,
    /// Echo of the requested page.
    pub retrieved_page_number: u32,
}

/// A decision document converted to paginated Markdown with page-scraped
/// metadata.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentMarkdown {
    /// URL the content was fetched from.
    pub source_url: String,
    /// Application number scraped from the page.
    pub basvuru_no_from_page: Option<String>,
    /// Decision date scraped from the page.
    pub karar_tarihi_from_page: Option<String>,
    /// Application date scraped from the page.
    pub basvuru_tarihi_from_page: Option<String>,
    /// Deciding body scraped from the page.
    pub karari_veren_birim_from_page: Option<String>,
    /// Decision type scraped from the page.
    pub karar_turu_from_page: Option<String>,
    /// Official Gazette line scraped from the page.
    pub resmi_gazete_info_from_page: Option<String>,
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

static TOTAL_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(\d+)\s*Karar Bulundu").expect("static regex")
});
static SLASH_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(\d{1,2}/\d{1,2}/\d{4})").expect("static regex")
});
static REF_NO_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^\d+/\d+$").expect("static regex")
});
static META_BASVURU_NO_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"B\.\s*No:\s*([\d/]+)").expect("static regex")
});
static META_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(\d{1,2}/\d{1,2}/\d{4}),\s*§").expect("static regex")
});

const DOCUMENT_CLEANING: CleaningProfile = CleaningProfile {
    payload: &[
        Rule::Class("WordSection1"),
        Rule::Class("kararHtml"),
        Rule::Id("Karar"),
        Rule::Tag("body"),
    ],
    prune: &[
        Rule::Class("item"),
        Rule::Id("KararDetaylari"),
        Rule::Class("TabBaslik"),
        Rule::Class("share-button-container"),
    ],
};

fn sel(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Parse(format!("bad selector `{css}`: {e}")))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn joined_parts(element: ElementRef<'_>) -> Vec<String> {
    element
        .text()
        .map(|t| t.trim().replace('\u{a0}', " "))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("|")
        .split('|')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Client for the individual-application decision bank.
pub struct AnayasaBireyselClient {
    fetcher: HttpFetcher,
}

impl AnayasaBireyselClient {
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

    fn build_query(request: &ReportSearchRequest) -> Vec<(&'static str, String)> {
        let mut query: Vec<(&'static str, String)> = vec![("KararBulteni", "1".to_string())];
        for kw in &request.keywords {
            query.push(("KelimeAra[]", kw.clone()));
        }
        if request.page_to_fetch > 1 {
            query.push(("page", request.page_to_fetch.to_string()));
        }
        query
    }

    /// Run a decision-bulletin report search.
    pub async fn search_report(&self, request: &ReportSearchRequest) -> Result<ReportSearchResult> {
        let query = Self::build_query(request);
        info!(page = request.page_to_fetch, "anayasa bireysel report search");
        let html = self
            .fetcher
            .get_text(SEARCH_PATH, &query)
            .await
            .inspect_err(|e| error!(source = "anayasa-bireysel", path = SEARCH_PATH, error = %e))?;
        self.parse_report(&html, request.page_to_fetch)
    }

    fn parse_report(&self, html: &str, page: u32) -> Result<ReportSearchResult> {
        let document = Html::parse_document(html);

        let total_records = document
            .select(&sel("div.bulunankararsayisi")?)
            .next()
            .and_then(|div| {
                TOTAL_RE
                    .captures(&element_text(div))
                    .and_then(|c| c.get(1))
                    .and_then(|m| m.as_str().parse().ok())
            });

        let block_sel = sel("div.KararBulteniBirKarar")?;
        let title_sel = sel("h4")?;
        let header_sel = sel("div.AltiCizili")?;
        let link_sel = sel("a[href]")?;
        let plain_div_sel = sel("div")?;
        let table_sel = sel("table.table")?;
        let row_sel = sel("tbody tr")?;
        let cell_sel = sel("td")?;

        let mut decisions = Vec::new();
        for block in document.select(&block_sel) {
            let title = block.select(&title_sel).next().map(element_text);

            let mut ref_no = None;
            let mut url_path = None;
            let mut dec_type = None;
            let mut body = None;
            let mut app_date = None;
            let mut dec_date = None;

            if let Some(header) = block.select(&header_sel).next() {
                if let Some(link) = header.select(&link_sel).next() {
                    let link_text = element_text(link);
                    if !link_text.is_empty() {
                        ref_no = Some(link_text);
                    }
                    url_path = link.value().attr("href").map(str::to_string);
                }

                let mut parts = joined_parts(header);
                if let Some(ref_no) = &ref_no {
                    if parts.first().is_some_and(|p| p == ref_no) {
                        parts.remove(0);
                    }
                }
                let mut idx = 0;
                if ref_no.is_none() && parts.get(idx).is_some_and(|p| REF_NO_RE.is_match(p)) {
                    ref_no = parts.get(idx).cloned();
                    idx += 1;
                }
                dec_type = parts.get(idx).cloned();
                idx += 1;
                body = parts.get(idx).cloned();
                idx += 1;
                app_date = parts.get(idx).and_then(|raw| {
                    raw.strip_prefix("Başvuru Tarihi :")
                        .map(|s| s.trim().to_string())
                        .or_else(|| {
                            SLASH_DATE_RE
                                .captures(raw)
                                .and_then(|c| c.get(1))
                                .map(|m| m.as_str().to_string())
                        })
                });
                idx += 1;
                dec_date = parts.get(idx).and_then(|raw| {
                    raw.strip_prefix("Karar Tarihi :")
                        .map(|s| s.trim().to_string())
                        .or_else(|| {
                            SLASH_DATE_RE
                                .captures(raw)
                                .and_then(|c| c.get(1))
                                .map(|m| m.as_str().to_string())
                        })
                });
            }

            let subject = block.select(&plain_div_sel).find_map(|div| {
                let text = element_text(div);
                text.strip_prefix("BAŞVURU KONUSU :")
                    .map(|s| s.trim().to_string())
            });

            // Detail rows live in a sibling `#KararDetaylari` container.
            let mut details = Vec::new();
            let mut sibling = block.next_sibling();
            while let Some(node) = sibling {
                if let Some(element) = ElementRef::wrap(node) {
                    if element.value().id() == Some("KararDetaylari") {
                        if let Some(table) = element.select(&table_sel).next() {
                            for row in table.select(&row_sel) {
                                let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
                                if cells.len() != 4 {
                                    continue;
                                }
                                let text = |i: usize| {
                                    let t = element_text(cells[i]);
                                    if t.is_empty() { None } else { Some(t) }
                                };
                                details.push(ReportDecisionDetail {
                                    hak: text(0),
                                    mudahale_iddiasi: text(1),
                                    sonuc: text(2),
                                    giderim: text(3),
                                });
                            }
                        }
                        break;
                    }
                    if element.value().classes().any(|c| c == "KararBulteniBirKarar") {
                        break;
                    }
                }
                sibling = node.next_sibling();
            }

            let decision_page_url = url_path
                .as_deref()
                .and_then(|path| self.absolute_url(path).ok());

            decisions.push(ReportDecisionSummary {
                title,
                decision_reference_no: ref_no,
                decision_page_url,
                decision_type_summary: dec_type,
                decision_making_body: body,
                application_date_summary: app_date,
                decision_date_summary: dec_date,
                application_subject_summary: subject,
                details,
            });
        }

        Ok(ReportSearchResult {
            decisions,
            total_records_found: total_records,
            retrieved_page_number: page,
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

    /// Fetch a decision document by its `/BB/YYYY/NNNN` path and return the
    /// requested Markdown chunk plus page-scraped metadata.
    pub async fn get_document_markdown(
        &self,
        document_url_path: &str,
        page_number: u32,
    ) -> Result<DocumentMarkdown> {
        if !document_url_path.starts_with("/BB/") {
            return Err(Error::InvalidInput(
                "document_url_path must start with /BB/".into(),
            ));
        }
        let full_url = self.absolute_url(document_url_path)?;
        info!(url = %full_url, page = page_number, "anayasa bireysel document fetch");

        let html = self
            .fetcher
            .get_text(&full_url, &[])
            .await
            .inspect_err(|e| error!(source = "anayasa-bireysel", url = %full_url, error = %e))?;

        let meta = Self::scrape_document_metadata(&html)?;

        Ok(match markdown::html_to_markdown(&html, &DOCUMENT_CLEANING) {
            Ok(full) => {
                let page = markdown::paginate(&full, page_number);
                DocumentMarkdown {
                    source_url: full_url,
                    basvuru_no_from_page: meta.basvuru_no,
                    karar_tarihi_from_page: meta.karar_tarihi,
                    basvuru_tarihi_from_page: meta.basvuru_tarihi,
                    karari_veren_birim_from_page: meta.birim,
                    karar_turu_from_page: meta.karar_turu,
                    resmi_gazete_info_from_page: meta.resmi_gazete,
                    markdown_chunk: page.markdown_chunk,
                    current_page: page.current_page,
                    total_pages: page.total_pages,
                    is_paginated: page.is_paginated,
                    error_message: None,
                }
            },
            Err(e) => DocumentMarkdown {
                source_url: full_url,
                basvuru_no_from_page: meta.basvuru_no,
                karar_tarihi_from_page: meta.karar_tarihi,
                basvuru_tarihi_from_page: meta.basvuru_tarihi,
                karari_veren_birim_from_page: meta.birim,
                karar_turu_from_page: meta.karar_turu,
                resmi_gazete_info_from_page: meta.resmi_gazete,
                markdown_chunk: None,
                current_page: page_number.max(1),
                total_pages: 1,
                is_paginated: false,
                error_message: Some(e.to_string()),
            },
        })
    }

    fn scrape_document_metadata(html: &str) -> Result<DocumentMetadata> {
        let document = Html::parse_document(html);
        let mut meta = DocumentMetadata::default();

        if let Some(desc) = document
            .select(&sel("meta[name=\"description\"]")?)
            .next()
            .and_then(|m| m.value().attr("content"))
        {
            meta.basvuru_no = META_BASVURU_NO_RE
                .captures(desc)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string());
            meta.karar_tarihi = META_DATE_RE
                .captures(desc)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string());
        }

        let row_sel = sel("tr")?;
        let cell_sel = sel("td")?;
        if let Some(tab) = document.select(&sel("div#KararDetaylari")?).next() {
            if let Some(table) = tab.select(&sel("table.table")?).next() {
                for row in table.select(&row_sel) {
                    let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
                    if cells.len() != 2 {
                        continue;
                    }
                    let key = element_text(cells[0]);
                    let value = element_text(cells[1]);
                    if value.is_empty() {
                        continue;
                    }
                    if key.contains("Kararı Veren Birim") {
                        meta.birim = Some(value);
                    } else if key.contains("Karar Türü (Başvuru Sonucu)") {
                        meta.karar_turu = Some(value);
                    } else if key.contains("Başvuru No") && meta.basvuru_no.is_none() {
                        meta.basvuru_no = Some(value);
                    } else if key.contains("Başvuru Tarihi") {
                        meta.basvuru_tarihi = Some(value);
                    } else if key.contains("Karar Tarihi") && meta.karar_tarihi.is_none() {
                        meta.karar_tarihi = Some(value);
                    } else if key.contains("Resmi Gazete Tarih / Sayı") {
                        meta.resmi_gazete = Some(value);
                    }
                }
            }
        }
        Ok(meta)
    }

    /// Close the underlying HTTP client. Idempotent.
    pub fn close(&self) {
        info!("anayasa bireysel client closed");
    }
}

#[derive(Default)]
struct DocumentMetadata {
    basvuru_no: Option<String>,
    karar_tarihi: Option<String>,
    basvuru_tarihi: Option<String>,
    birim: Option<String>,
    karar_turu: Option<String>,
    resmi_gazete: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn query_pins_karar_bulteni_and_repeats_keywords() {
        let request = ReportSearchRequest {
            keywords: vec!["mülkiyet".to_string(), "adil yargılanma".to_string()],
            page_to_fetch: 2,
        };
        let query = AnayasaBireyselClient::build_query(&request);
        assert_eq!(query[0], ("KararBulteni", "1".to_string()));
        assert_eq!(query[1], ("KelimeAra[]", "mülkiyet".to_string()));
        assert_eq!(query[2], ("KelimeAra[]", "adil yargılanma".to_string()));
        assert_eq!(query[3], ("page", "2".to_string()));

        let first_page = AnayasaBireyselClient::build_query(&ReportSearchRequest {
            keywords: Vec::new(),
            page_to_fetch: 1,
        });
        assert!(!first_page.iter().any(|(k, _)| *k == "page"));
    }

    const REPORT_HTML: &str = r#"
    <html><body><div class="HaberBulteni">
      <div class="bulunankararsayisi">12 Karar Bulundu</div>
      <div class="KararBulteniBirKarar">
        <h4><strong>HASAN DURMUŞ Başvurusuna İlişkin Karar</strong></h4>
        <div class="AltiCizili">
          <a href="/BB/2019/19126">2019/19126</a>
          <span>Esas (İhlal)</span>
          <span>Genel Kurul</span>
          <span>Başvuru Tarihi : 5/6/2019</span>
          <span>Karar Tarihi : 14/9/2023</span>
        </div>
        <div>BAŞVURU KONUSU : Mülkiyet hakkının ihlal edildiği iddiası</div>
      </div>
      <div id="KararDetaylari">
        <table class="table"><tbody>
          <tr><td>Mülkiyet hakkı</td><td>Kamulaştırmasız el atma</td><td>İhlal</td><td>Yeniden yargılama</td></tr>
        </tbody></table>
      </div>
    </div></body></html>"#;

    #[test]
    fn parses_bulletin_blocks_and_detail_rows() {
        let client =
            AnayasaBireyselClient::with_base_url("https://kararlarbilgibankasi.anayasa.gov.tr")
                .unwrap();
        let result = client.parse_report(REPORT_HTML, 1).unwrap();

        assert_eq!(result.total_records_found, Some(12));
        assert_eq!(result.decisions.len(), 1);
        let decision = &result.decisions[0];
        assert_eq!(
            decision.title.as_deref(),
            Some("HASAN DURMUŞ Başvurusuna İlişkin Karar")
        );
        assert_eq!(decision.decision_reference_no.as_deref(), Some("2019/19126"));
        assert_eq!(
            decision.decision_page_url.as_deref(),
            Some("https://kararlarbilgibankasi.anayasa.gov.tr/BB/2019/19126")
        );
        assert_eq!(decision.decision_type_summary.as_deref(), Some("Esas (İhlal)"));
        assert_eq!(decision.decision_making_body.as_deref(), Some("Genel Kurul"));
        assert_eq!(decision.application_date_summary.as_deref(), Some("5/6/2019"));
        assert_eq!(decision.decision_date_summary.as_deref(), Some("14/9/2023"));
        assert_eq!(
            decision.application_subject_summary.as_deref(),
            Some("Mülkiyet hakkının ihlal edildiği iddiası")
        );
        assert_eq!(decision.details.len(), 1);
        assert_eq!(decision.details[0].hak.as_deref(), Some("Mülkiyet hakkı"));
        assert_eq!(decision.details[0].giderim.as_deref(), Some("Yeniden yargılama"));
    }

    #[test]
    fn document_path_must_be_under_bb() {
        let client =
            AnayasaBireyselClient::with_base_url("https://kararlarbilgibankasi.anayasa.gov.tr")
                .unwrap();
        let err = futures::executor::block_on(client.get_document_markdown("/ND/2024/1", 1))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn document_metadata_prefers_meta_description() {
        let html = r#"<html><head>
            <meta name="description" content="Başvuru Numarası: B. No: 2019/19126, Karar: 14/9/2023, § 12">
        </head><body>
            <div id="KararDetaylari"><table class="table"><tbody>
                <tr><td>Kararı Veren Birim</td><td>Genel Kurul</td></tr>
                <tr><td>Karar Türü (Başvuru Sonucu)</td><td>Esas (İhlal)</td></tr>
                <tr><td>Başvuru Tarihi</td><td>5/6/2019</td></tr>
                <tr><td>Resmi Gazete Tarih / Sayı</td><td>3/1/2024 - 32418</td></tr>
            </tbody></table></div>
        </body></html>"#;
        let meta = AnayasaBireyselClient::scrape_document_metadata(html).unwrap();
        assert_eq!(meta.basvuru_no.as_deref(), Some("2019/19126"));
        assert_eq!(meta.karar_tarihi.as_deref(), Some("14/9/2023"));
        assert_eq!(meta.birim.as_deref(), Some("Genel Kurul"));
        assert_eq!(meta.karar_turu.as_deref(), Some("Esas (İhlal)"));
        assert_eq!(meta.resmi_gazete.as_deref(), Some("3/1/2024 - 32418"));
    }
}
