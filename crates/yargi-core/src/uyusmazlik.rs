//! Court of Jurisdictional Disputes (Uyuşmazlık Mahkemesi) adapter.
//!
//! The upstream is a classic server-rendered form: search posts
//! `application/x-www-form-urlencoded` to `/Arama/Search` and answers with an
//! HTML fragment. Friendly enum values are translated to the form's GUIDs
//! through fixed lookup tables; documents are addressed by the full decision
//! page URL taken from the results table.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use url::Url;

use crate::fetcher::HttpFetcher;
use crate::markdown::{self, CleaningProfile};
use crate::{Error, Result};

const BASE_URL: &str = "https://kararlar.uyusmazlik.gov.tr";
const SEARCH_ENDPOINT: &str = "/Arama/Search";

/// Section (Bölüm) of the court.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub enum Bolum {
    /// All sections.
    #[serde(rename = "ALL")]
    Tumu,
    /// Criminal section.
    #[serde(rename = "Ceza Bölümü")]
    CezaBolumu,
    /// General assembly decisions.
    #[serde(rename = "Genel Kurul Kararları")]
    GenelKurulKararlari,
    /// Civil section.
    #[serde(rename = "Hukuk Bölümü")]
    HukukBolumu,
}

impl Bolum {
    /// Form GUID for the section; the sentinel maps to the empty string.
    #[must_use]
    pub const fn guid(self) -> &'static str {
        match self {
            Self::Tumu => "",
            Self::CezaBolumu => "f6b74320-f2d7-4209-ad6e-c6df180d4e7c",
            Self::GenelKurulKararlari => "e4ca658d-a75a-4719-b866-b2d2f1c3b1d9",
            Self::HukukBolumu => "96b26fc4-ef8e-4a4f-a9cc-a3de89952aa1",
        }
    }
}

/// Dispute type (Uyuşmazlık türü).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub enum UyusmazlikTuru {
    /// All types.
    #[serde(rename = "ALL")]
    Tumu,
    /// Jurisdictional dispute.
    #[serde(rename = "Görev Uyuşmazlığı")]
    GorevUyusmazligi,
    /// Judgment dispute.
    #[serde(rename = "Hüküm Uyuşmazlığı")]
    HukumUyusmazligi,
}

impl UyusmazlikTuru {
    /// Form GUID for the dispute type; the sentinel maps to the empty string.
    #[must_use]
    pub const fn guid(self) -> &'static str {
        match self {
            Self::Tumu => "",
            Self::GorevUyusmazligi => "7b1e2cd3-8f09-418a-921c-bbe501e1740c",
            Self::HukumUyusmazligi => "19b88402-172b-4c1d-8339-595c942a89f5",
        }
    }
}

/// Outcome (Karar sonucu) checkbox options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub enum KararSonucu {
    /// "No judgment dispute" outcome.
    #[serde(rename = "Hüküm Uyuşmazlığı Olmadığına Dair")]
    HukumUyusmazligiOlmadiginaDair,
    /// "Judgment dispute exists" outcome.
    #[serde(rename = "Hüküm Uyuşmazlığı Olduğuna Dair")]
    HukumUyusmazligiOldugunaDair,
}

impl KararSonucu {
    /// Form GUID of the outcome checkbox.
    #[must_use]
    pub const fn guid(self) -> &'static str {
        match self {
            Self::HukumUyusmazligiOlmadiginaDair => "6f47d87f-dcb5-412e-9878-000385dba1d9",
            Self::HukumUyusmazligiOldugunaDair => "5a01742a-c440-4c4a-ba1f-da20837cffed",
        }
    }
}

/// Caller-facing search parameters using friendly names. Every text field
/// defaults to empty; the form expects every key to be posted.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Main text search (`Icerik`).
    pub icerik: String,
    /// Section filter.
    pub bolum: Bolum,
    /// Dispute-type filter.
    pub uyusmazlik_turu: UyusmazlikTuru,
    /// Outcome checkboxes.
    pub karar_sonuclari: Vec<KararSonucu>,
    /// Case year.
    pub esas_yil: String,
    /// Case number.
    pub esas_sayisi: String,
    /// Decision year.
    pub karar_yil: String,
    /// Decision number.
    pub karar_sayisi: String,
    /// Law number.
    pub kanun_no: String,
    /// Decision date range start, `DD.MM.YYYY`.
    pub karar_date_begin: String,
    /// Decision date range end, `DD.MM.YYYY`.
    pub karar_date_end: String,
    /// Official Gazette number.
    pub resmi_gazete_sayi: String,
    /// Official Gazette date, `DD.MM.YYYY`.
    pub resmi_gazete_date: String,
    /// Exact phrase text mode (`Tumce`).
    pub tumce: String,
    /// Phrase-with-inflections text mode (`WildCard`).
    pub wild_card: String,
    /// All-of-these-words text mode (`Hepsi`).
    pub hepsi: String,
    /// Any-of-these-words text mode (`Herhangibirisi`).
    pub herhangi_birisi: String,
    /// None-of-these-words text mode (`NotHepsi`).
    pub not_hepsi: String,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            icerik: String::new(),
            bolum: Bolum::Tumu,
            uyusmazlik_turu: UyusmazlikTuru::Tumu,
            karar_sonuclari: Vec::new(),
            esas_yil: String::new(),
            esas_sayisi: String::new(),
            karar_yil: String::new(),
            karar_sayisi: String::new(),
            kanun_no: String::new(),
            karar_date_begin: String::new(),
            karar_date_end: String::new(),
            resmi_gazete_sayi: String::new(),
            resmi_gazete_date: String::new(),
            tumce: String::new(),
            wild_card: String::new(),
            hepsi: String::new(),
            herhangi_birisi: String::new(),
            not_hepsi: String::new(),
        }
    }
}

/// One decision row parsed from the results table.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionEntry {
    /// Decision number column.
    pub karar_sayisi: Option<String>,
    /// Case number column.
    pub esas_sayisi: Option<String>,
    /// Section column.
    pub bolum: Option<String>,
    /// Dispute subject column.
    pub uyusmazlik_konusu: Option<String>,
    /// Outcome column.
    pub karar_sonucu: Option<String>,
    /// Summary text from the row's popover.
    pub popover_content: Option<String>,
    /// Full URL of the decision page; doubles as the document ref.
    pub document_url: String,
    /// Direct PDF URL when the row links one.
    pub pdf_url: Option<String>,
}

/// Search result for the tool layer.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Parsed decision rows.
    pub decisions: Vec<DecisionEntry>,
    /// Total parsed from the `N adet kayıt bulundu` label, if present.
    pub total_records_found: Option<u64>,
}

/// A decision document converted to paginated Markdown.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentMarkdown {
    /// URL the content was fetched from.
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

static TOTAL_RECORDS_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(\d+)\s*adet kayıt").expect("static regex")
});

fn sel(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Parse(format!("bad selector `{css}`: {e}")))
}

/// Client for the Uyuşmazlık Mahkemesi search.
pub struct UyusmazlikClient {
    fetcher: HttpFetcher,
}

impl UyusmazlikClient {
    /// Build the client against the production host.
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    /// Build the client against an arbitrary host (tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let referer = format!("{base_url}/");
        let fetcher = HttpFetcher::builder(base_url.clone())
            .header("Accept", "*/*")
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Origin", &base_url)
            .header("Referer", &referer)
            .verify_tls(false)
            .build()?;
        Ok(Self { fetcher })
    }

    fn build_form(request: &SearchRequest) -> Vec<(&'static str, String)> {
        let mut form: Vec<(&'static str, String)> = vec![
            ("BolumId", request.bolum.guid().to_string()),
            ("UyusmazlikId", request.uyusmazlik_turu.guid().to_string()),
        ];
        for outcome in &request.karar_sonuclari {
            form.push(("KararSonucuList", outcome.guid().to_string()));
        }
        form.push(("EsasYil", request.esas_yil.clone()));
        form.push(("EsasSayisi", request.esas_sayisi.clone()));
        form.push(("KararYil", request.karar_yil.clone()));
        form.push(("KararSayisi", request.karar_sayisi.clone()));
        form.push(("KanunNo", request.kanun_no.clone()));
        form.push(("KararDateBegin", request.karar_date_begin.clone()));
        form.push(("KararDateEnd", request.karar_date_end.clone()));
        form.push(("ResmiGazeteSayi", request.resmi_gazete_sayi.clone()));
        form.push(("ResmiGazeteDate", request.resmi_gazete_date.clone()));
        form.push(("Icerik", request.icerik.clone()));
        form.push(("Tumce", request.tumce.clone()));
        form.push(("WildCard", request.wild_card.clone()));
        form.push(("Hepsi", request.hepsi.clone()));
        form.push(("Herhangibirisi", request.herhangi_birisi.clone()));
        form.push(("NotHepsi", request.not_hepsi.clone()));
        form
    }

    /// Run a search and parse the HTML results table.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        info!(bolum = ?request.bolum, "uyusmazlik search");
        let form = Self::build_form(request);
        let html = self
            .fetcher
            .post_form(SEARCH_ENDPOINT, &form)
            .await
            .inspect_err(|e| error!(source = "uyusmazlik", path = SEARCH_ENDPOINT, error = %e))?;
        self.parse_search_results(&html)
    }

    fn parse_search_results(&self, html: &str) -> Result<SearchResult> {
        let document = Html::parse_document(html);

        let total_records = document
            .select(&sel("div.pull-right.label.label-important")?)
            .next()
            .and_then(|div| {
                let text: String = div.text().collect();
                TOTAL_RECORDS_RE
                    .captures(&text)
                    .and_then(|c| c.get(1))
                    .and_then(|m| m.as_str().parse().ok())
            });

        let row_sel = sel("tr")?;
        let cell_sel = sel("td")?;
        let link_sel = sel("a")?;
        let popover_sel = sel("div[data-rel=\"popover\"]")?;

        let mut decisions = Vec::new();
        if let Some(table) = document.select(&sel("table.table-hover")?).next() {
            for row in table.select(&row_sel).skip(1) {
                let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
                if cells.len() < 5 {
                    continue;
                }
                let Some(link) = cells[0].select(&link_sel).next() else {
                    continue;
                };
                let Some(href) = link.value().attr("href") else {
                    continue;
                };
                let document_url = match self.absolute_url(href) {
                    Ok(url) => url,
                    Err(e) => {
                        warn!(error = %e, "skipping row with unparsable href");
                        continue;
                    },
                };

                let popover_content = cells[0]
                    .select(&popover_sel)
                    .next()
                    .and_then(|div| div.value().attr("data-content"))
                    .map(|raw| html_escape::decode_html_entities(raw).into_owned());

                let pdf_url = cells.get(5).and_then(|cell| {
                    cell.select(&link_sel)
                        .find(|a| {
                            a.value()
                                .attr("href")
                                .is_some_and(|h| h.to_lowercase().ends_with(".pdf"))
                        })
                        .and_then(|a| a.value().attr("href"))
                        .and_then(|h| self.absolute_url(h).ok())
                });

                let cell_text = |cell: &ElementRef<'_>| {
                    let text: String = cell.text().collect::<String>().trim().to_string();
                    if text.is_empty() { None } else { Some(text) }
                };

                decisions.push(DecisionEntry {
                    karar_sayisi: cell_text(&cells[0]),
                    esas_sayisi: cell_text(&cells[1]),
                    bolum: cell_text(&cells[2]),
                    uyusmazlik_konusu: cell_text(&cells[3]),
                    karar_sonucu: cell_text(&cells[4]),
                    popover_content,
                    document_url,
                    pdf_url,
                });
            }
        }

        Ok(SearchResult {
            decisions,
            total_records_found: total_records,
        })
    }

    fn absolute_url(&self, href: &str) -> Result<String> {
        let base = Url::parse(self.fetcher.base_url())
            .map_err(|e| Error::Parse(format!("bad base url: {e}")))?;
        let joined = base
            .join(href)
            .map_err(|e| Error::Parse(format!("bad href `{href}`: {e}")))?;
        Ok(joined.to_string())
    }

    /// Fetch a decision page by its full URL and return the requested
    /// Markdown chunk.
    pub async fn get_document_markdown(
        &self,
        document_url: &str,
        page_number: u32,
    ) -> Result<DocumentMarkdown> {
        info!(url = document_url, page = page_number, "uyusmazlik document fetch");
        let html = self
            .fetcher
            .get_text(document_url, &[])
            .await
            .inspect_err(|e| error!(source = "uyusmazlik", url = document_url, error = %e))?;

        Ok(match markdown::html_to_markdown(&html, &CleaningProfile::default()) {
            Ok(full) => {
                let page = markdown::paginate(&full, page_number);
                DocumentMarkdown {
                    source_url: document_url.to_string(),
                    markdown_chunk: page.markdown_chunk,
                    current_page: page.current_page,
                    total_pages: page.total_pages,
                    is_paginated: page.is_paginated,
                    error_message: None,
                }
            },
            Err(e) => DocumentMarkdown {
                source_url: document_url.to_string(),
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
        info!("uyusmazlik client closed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const RESULTS_HTML: &str = r##"
    <html><body>
      <div class="pull-right label label-important">23 adet kayıt bulundu</div>
      <table class="table-hover">
        <tr><th>Karar</th><th>Esas</th><th>Bölüm</th><th>Konu</th><th>Sonuç</th><th>PDF</th></tr>
        <tr>
          <td>
            <div data-rel="popover" data-content="G&#246;rev uyuşmazlığı özeti"></div>
            <a href="/Karar/Detay/abc-123">2024/55</a>
          </td>
          <td>2024/41</td>
          <td>Hukuk Bölümü</td>
          <td>görev</td>
          <td>Davanın Adli Yargıda Görülmesi</td>
          <td><a href="/pdf/2024-55.PDF">pdf</a></td>
        </tr>
        <tr><td>bozuk satır</td></tr>
      </table>
    </body></html>"##;

    #[test]
    fn guid_maps_cover_every_variant() {
        assert_eq!(Bolum::Tumu.guid(), "");
        assert_eq!(Bolum::HukukBolumu.guid(), "96b26fc4-ef8e-4a4f-a9cc-a3de89952aa1");
        assert_eq!(UyusmazlikTuru::Tumu.guid(), "");
        assert_eq!(
            UyusmazlikTuru::GorevUyusmazligi.guid(),
            "7b1e2cd3-8f09-418a-921c-bbe501e1740c"
        );
        assert_eq!(
            KararSonucu::HukumUyusmazligiOldugunaDair.guid(),
            "5a01742a-c440-4c4a-ba1f-da20837cffed"
        );
    }

    #[test]
    fn form_posts_every_key_with_guids_and_empty_strings() {
        let request = SearchRequest {
            icerik: "görev".to_string(),
            bolum: Bolum::HukukBolumu,
            karar_sonuclari: vec![KararSonucu::HukumUyusmazligiOlmadiginaDair],
            ..Default::default()
        };
        let form = UyusmazlikClient::build_form(&request);
        assert_eq!(form[0], ("BolumId", Bolum::HukukBolumu.guid().to_string()));
        assert_eq!(form[1], ("UyusmazlikId", String::new()));
        assert!(form.contains(&("KararSonucuList", KararSonucu::HukumUyusmazligiOlmadiginaDair.guid().to_string())));
        assert!(form.contains(&("Icerik", "görev".to_string())));
        assert!(form.contains(&("NotHepsi", String::new())));
        // Ordered tail: text modes come after the gazette fields.
        let keys: Vec<&str> = form.iter().map(|(k, _)| *k).collect();
        let icerik_pos = keys.iter().position(|k| *k == "Icerik").unwrap();
        let rg_pos = keys.iter().position(|k| *k == "ResmiGazeteDate").unwrap();
        assert!(rg_pos < icerik_pos);
    }

    #[test]
    fn parses_rows_totals_popover_and_pdf() {
        let client = UyusmazlikClient::with_base_url("https://kararlar.uyusmazlik.gov.tr").unwrap();
        let result = client.parse_search_results(RESULTS_HTML).unwrap();

        assert_eq!(result.total_records_found, Some(23));
        assert_eq!(result.decisions.len(), 1, "malformed rows are skipped");
        let entry = &result.decisions[0];
        assert_eq!(entry.karar_sayisi.as_deref(), Some("2024/55"));
        assert_eq!(entry.bolum.as_deref(), Some("Hukuk Bölümü"));
        assert_eq!(entry.karar_sonucu.as_deref(), Some("Davanın Adli Yargıda Görülmesi"));
        assert_eq!(
            entry.document_url,
            "https://kararlar.uyusmazlik.gov.tr/Karar/Detay/abc-123"
        );
        assert_eq!(
            entry.pdf_url.as_deref(),
            Some("https://kararlar.uyusmazlik.gov.tr/pdf/2024-55.PDF")
        );
        assert_eq!(entry.popover_content.as_deref(), Some("Görev uyuşmazlığı özeti"));
    }

    #[test]
    fn missing_total_label_yields_none() {
        let client = UyusmazlikClient::with_base_url("https://kararlar.uyusmazlik.gov.tr").unwrap();
        let result = client
            .parse_search_results("<html><body><p>sonuç yok</p></body></html>")
            .unwrap();
        assert!(result.total_records_found.is_none());
        assert!(result.decisions.is_empty());
    }
}
