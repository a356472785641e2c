//! Public Procurement Authority (KİK) adapter.
//!
//! The upstream is an ASP.NET WebForms page that only works through real
//! postbacks, so this adapter drives the shared headless browser. Every call
//! starts from the search page and transitions deterministically: select the
//! decision-type radio (a postback of its own), fill the form, submit or
//! fire the pagination postback, and for documents trigger the row's preview
//! postback and read the modal iframe. Rows have no stable upstream id, so
//! the adapter synthesizes one as `base64("{decisionType}|{decisionNumber}")`.
//!
//! Document failures are reported as a normal document with `error_message`
//! set; the tool contract requires the id and page echo even on failure.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use url::Url;

use crate::browser::{BrowserDriver, BrowserSession};
use crate::markdown::{self, CleaningProfile};
use crate::{Error, Result};

const BASE_URL: &str = "https://ekap.kik.gov.tr";
const SEARCH_PAGE_PATH: &str = "/EKAP/Vatandas/kurulkararsorgu.aspx";
const RESULTS_TABLE_ID: &str = "grdKurulKararSorguSonuc";
const SEARCH_BUTTON_ID: &str = "ctl00_ContentPlaceHolder1_btnAra";
const MODAL_CLOSE_SELECTOR: &str = "div#detayPopUp.in a#btnKapatPencere_0.close";
const DOCUMENT_IFRAME_SELECTOR: &str = "iframe#iframe_detayPopUp";
const DOCUMENT_PAGE_PREFIX: &str = "KurulKararGoster.aspx";

mod locators {
    pub const KARAR_TIPI_RADIO: &str = "input[name='ctl00$ContentPlaceHolder1$kurulKararTip']";
    pub const KARAR_NO: &str = "input[name='ctl00$ContentPlaceHolder1$txtKararNo']";
    pub const KARAR_TARIHI_BASLANGIC: &str =
        "input[name='ctl00$ContentPlaceHolder1$etKararTarihBaslangic$EkapTakvimTextBox_etKararTarihBaslangic']";
    pub const KARAR_TARIHI_BITIS: &str =
        "input[name='ctl00$ContentPlaceHolder1$etKararTarihBitis$EkapTakvimTextBox_etKararTarihBitis']";
    pub const RESMI_GAZETE_SAYISI: &str =
        "input[name='ctl00$ContentPlaceHolder1$txtResmiGazeteSayisi']";
    pub const RESMI_GAZETE_TARIHI: &str =
        "input[name='ctl00$ContentPlaceHolder1$etResmiGazeteTarihi$EkapTakvimTextBox_etResmiGazeteTarihi']";
    pub const BASVURU_KONUSU_IHALE: &str =
        "input[name='ctl00$ContentPlaceHolder1$txtBasvuruKonusuIhale']";
    pub const BASVURU_SAHIBI: &str = "input[name='ctl00$ContentPlaceHolder1$txtSikayetci']";
    pub const IHALEYI_YAPAN_IDARE: &str =
        "input[name='ctl00$ContentPlaceHolder1$txtIhaleyiYapanIdare']";
    pub const YIL: &str = "select[name='ctl00$ContentPlaceHolder1$ddlYil']";
    pub const KARAR_METNI: &str = "input[name='ctl00$ContentPlaceHolder1$txtKararMetni']";
}

/// Decision type radio buttons on the search form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub enum KararTipi {
    /// Dispute-review decisions.
    #[serde(rename = "rbUyusmazlik")]
    Uyusmazlik,
    /// Regulatory decisions.
    #[serde(rename = "rbDuzenleyici")]
    Duzenleyici,
    /// Court decisions.
    #[serde(rename = "rbMahkeme")]
    Mahkeme,
}

impl KararTipi {
    /// Radio input value / wire name.
    #[must_use]
    pub const fn value(self) -> &'static str {
        match self {
            Self::Uyusmazlik => "rbUyusmazlik",
            Self::Duzenleyici => "rbDuzenleyici",
            Self::Mahkeme => "rbMahkeme",
        }
    }

    /// Parse the wire name back into the enum.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "rbUyusmazlik" => Ok(Self::Uyusmazlik),
            "rbDuzenleyici" => Ok(Self::Duzenleyici),
            "rbMahkeme" => Ok(Self::Mahkeme),
            other => Err(Error::InvalidInput(format!("unknown decision type `{other}`"))),
        }
    }
}

/// Caller-facing search parameters.
///
/// Decision numbers may arrive with `_` in place of `/` (some MCP clients
/// cannot carry slashes in ids); the adapter converts back before filling
/// the form.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Decision type radio.
    pub karar_tipi: KararTipi,
    /// Decision number, e.g. `2024/UH.II-1766` (or with `_` for `/`).
    pub karar_no: Option<String>,
    /// Decision date range start, `DD.MM.YYYY`.
    pub karar_tarihi_baslangic: Option<String>,
    /// Decision date range end, `DD.MM.YYYY`.
    pub karar_tarihi_bitis: Option<String>,
    /// Official Gazette number.
    pub resmi_gazete_sayisi: Option<String>,
    /// Official Gazette date, `DD.MM.YYYY`.
    pub resmi_gazete_tarihi: Option<String>,
    /// Tender subject of the application.
    pub basvuru_konusu_ihale: Option<String>,
    /// Applicant.
    pub basvuru_sahibi: Option<String>,
    /// Procuring entity.
    pub ihaleyi_yapan_idare: Option<String>,
    /// Decision year for the dropdown.
    pub yil: Option<String>,
    /// Keyword or phrase in the decision text.
    pub karar_metni: Option<String>,
    /// 1-indexed results page.
    pub page: u32,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            karar_tipi: KararTipi::Uyusmazlik,
            karar_no: None,
            karar_tarihi_baslangic: None,
            karar_tarihi_bitis: None,
            resmi_gazete_sayisi: None,
            resmi_gazete_tarihi: None,
            basvuru_konusu_ihale: None,
            basvuru_sahibi: None,
            ihaleyi_yapan_idare: None,
            yil: None,
            karar_metni: None,
            page: 1,
        }
    }
}

/// One row from the results grid.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionEntry {
    /// `__doPostBack` event target of the row's preview anchor.
    pub preview_event_target: String,
    /// Decision number as displayed, e.g. `2024/UH.II-1766`.
    pub karar_no: String,
    /// Decision type the search ran with (not present in the grid HTML).
    pub karar_tipi: KararTipi,
    /// Decision date as displayed.
    pub karar_tarihi: String,
    /// Procuring entity.
    pub idare: Option<String>,
    /// Applicant.
    pub basvuru_sahibi: Option<String>,
    /// Tender subject.
    pub ihale_konusu: Option<String>,
    /// Synthetic stable id: `base64("{karar_tipi}|{karar_no}")`.
    pub karar_id: String,
}

/// Search result for the tool layer.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Parsed grid rows.
    pub decisions: Vec<DecisionEntry>,
    /// Total from the `Toplam Kayıt Sayısı:N` pager label.
    pub total_records: u64,
    /// Page reported by the pager, falling back to the requested page.
    pub current_page: u32,
}

/// A decision document with paginated Markdown, or an error echo.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentMarkdown {
    /// The base64 id this document was requested with.
    pub retrieved_with_karar_id: Option<String>,
    /// Decoded decision number.
    pub retrieved_karar_no: Option<String>,
    /// Decoded decision type.
    pub retrieved_karar_tipi: Option<KararTipi>,
    /// The upstream's internal `KararId` query parameter from the document
    /// display URL.
    pub karar_id_param_from_url: Option<String>,
    /// Requested Markdown chunk, `None` on failure.
    pub markdown_chunk: Option<String>,
    /// Source URL of the document display page.
    pub source_url: Option<String>,
    /// Failure description; set instead of a tool error.
    pub error_message: Option<String>,
    /// 1-indexed chunk page.
    pub current_page: u32,
    /// Total chunk pages.
    pub total_pages: u32,
    /// Whether the content spans multiple chunks.
    pub is_paginated: bool,
    /// Character count of the full Markdown before chunking.
    pub full_content_char_count: Option<u64>,
}

impl DocumentMarkdown {
    fn failure(karar_id: &str, page_number: u32, message: impl Into<String>) -> Self {
        Self {
            retrieved_with_karar_id: Some(karar_id.to_string()),
            retrieved_karar_no: None,
            retrieved_karar_tipi: None,
            karar_id_param_from_url: None,
            markdown_chunk: None,
            source_url: None,
            error_message: Some(message.into()),
            current_page: page_number.max(1),
            total_pages: 1,
            is_paginated: false,
            full_content_char_count: None,
        }
    }
}

/// Encode the synthetic decision id.
#[must_use]
pub fn encode_karar_id(karar_tipi: KararTipi, karar_no: &str) -> String {
    BASE64.encode(format!("{}|{karar_no}", karar_tipi.value()))
}

/// Decode a synthetic decision id back into its decision type and number.
pub fn decode_karar_id(karar_id: &str) -> Result<(KararTipi, String)> {
    let decoded = BASE64
        .decode(karar_id.as_bytes())
        .map_err(|_| Error::InvalidInput("karar_id is not valid base64".into()))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| Error::InvalidInput("karar_id does not decode to UTF-8".into()))?;
    let (tipi, no) = decoded
        .split_once('|')
        .ok_or_else(|| Error::InvalidInput("karar_id must decode to `type|number`".into()))?;
    Ok((KararTipi::parse(tipi)?, no.to_string()))
}

static POSTBACK_TARGET_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"__doPostBack\('([^']*)','([^']*)'\)").expect("static regex")
});
static TOTAL_RECORDS_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"Toplam Kayıt Sayısı:(\d+)").expect("static regex")
});

fn sel(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Parse(format!("bad selector `{css}`: {e}")))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Parse the results grid out of a full page snapshot.
fn parse_decision_entries(html: &str, search_karar_tipi: KararTipi) -> Result<Vec<DecisionEntry>> {
    let document = Html::parse_document(html);
    let table_sel = sel(&format!("table#{RESULTS_TABLE_ID}"))?;
    let row_sel = sel("tr")?;
    let cell_sel = sel("td")?;
    let preview_sel = sel("a[id$=\"btnOnizle\"]")?;
    let kno_sel = sel("span[id$=\"lblKno\"]")?;
    let ktar_sel = sel("span[id$=\"lblKtar\"]")?;
    let idare_sel = sel("span[id$=\"lblIdare\"]")?;
    let sikayetci_sel = sel("span[id$=\"lblSikayetci\"]")?;
    let ihale_sel = sel("span[id$=\"lblIhale\"]")?;

    let mut entries = Vec::new();
    let Some(table) = document.select(&table_sel).next() else {
        return Ok(entries);
    };
    // The first two rows are the header and the filter strip.
    for row in table.select(&row_sel).skip(2) {
        let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
        if cells.len() != 6 {
            continue;
        }
        let event_target = cells[0]
            .select(&preview_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| {
                POSTBACK_TARGET_RE
                    .captures(href)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
            });
        let karar_no = cells[1].select(&kno_sel).next().map(element_text);
        let karar_tarihi = cells[2].select(&ktar_sel).next().map(element_text);
        let (Some(event_target), Some(karar_no), Some(karar_tarihi)) =
            (event_target, karar_no, karar_tarihi)
        else {
            continue;
        };

        let optional = |cell: Option<&ElementRef<'_>>, selector: &Selector| {
            cell.and_then(|c| c.select(selector).next())
                .map(element_text)
                .filter(|t| !t.is_empty())
        };
        let karar_id = encode_karar_id(search_karar_tipi, &karar_no);
        entries.push(DecisionEntry {
            preview_event_target: event_target,
            karar_no,
            karar_tipi: search_karar_tipi,
            karar_tarihi,
            idare: optional(cells.get(3), &idare_sel),
            basvuru_sahibi: optional(cells.get(4), &sikayetci_sel),
            ihale_konusu: optional(cells.get(5), &ihale_sel),
            karar_id,
        });
    }
    Ok(entries)
}

fn parse_total_records(html: &str) -> u64 {
    let document = Html::parse_document(html);
    let Ok(pager_sel) = Selector::parse("div.gridToplamSayi") else {
        return 0;
    };
    document
        .select(&pager_sel)
        .next()
        .and_then(|div| {
            TOTAL_RECORDS_RE
                .captures(&element_text(div))
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
        .unwrap_or(0)
}

fn parse_current_page(html: &str) -> Option<u32> {
    let document = Html::parse_document(html);
    let pager_sel = Selector::parse("div.sayfalama span.active").ok()?;
    document
        .select(&pager_sel)
        .next()
        .and_then(|span| element_text(span).parse().ok())
}

fn page_shows_no_results(html: &str) -> bool {
    let document = Html::parse_document(html);
    if let Ok(message_sel) = Selector::parse("div#ctl00_MessageContent1") {
        if let Some(div) = document.select(&message_sel).next() {
            if element_text(div).to_lowercase().contains("kayıt bulunamamıştır") {
                return true;
            }
        }
    }
    if let Ok(validation_sel) = Selector::parse("div#ctl00_ValidationSummary1") {
        if let Some(div) = document.select(&validation_sel).next() {
            let hidden = div
                .value()
                .attr("style")
                .is_some_and(|s| s.to_lowercase().contains("display: none"));
            if !hidden && !element_text(div).is_empty() {
                return true;
            }
        }
    }
    false
}

/// Find the modal iframe's `src` in a static page snapshot; fallback path
/// when the live predicate wait times out.
fn iframe_src_from_static_dom(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let iframe_sel = Selector::parse(DOCUMENT_IFRAME_SELECTOR).ok()?;
    document
        .select(&iframe_sel)
        .next()
        .and_then(|iframe| iframe.value().attr("src"))
        .filter(|src| src.contains(DOCUMENT_PAGE_PREFIX))
        .map(str::to_string)
}

fn extract_karar_content(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let span_sel = Selector::parse("span#ctl00_ContentPlaceHolder1_lblKarar").ok()?;
    document
        .select(&span_sel)
        .next()
        .map(|span| span.inner_html())
}

/// Client for the procurement-authority decision search.
pub struct KikClient {
    driver: BrowserDriver,
    base_url: String,
}

impl KikClient {
    /// Build the client against the production host.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    /// Build the client against an arbitrary host (tests).
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            driver: BrowserDriver::new(),
            base_url: base_url.into(),
        }
    }

    fn search_page_url(&self) -> String {
        format!("{}{SEARCH_PAGE_PATH}", self.base_url)
    }

    /// Run a search. The browser is held for the whole operation.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        let mut session = self.driver.session().await?;
        self.search_on_session(&mut session, request).await
    }

    async fn search_on_session(
        &self,
        session: &mut BrowserSession<'_>,
        request: &SearchRequest,
    ) -> Result<SearchResult> {
        info!(tipi = request.karar_tipi.value(), page = request.page, "kik search");

        // State: freshSearchPage. Navigate there unless we already are.
        let search_url = self.search_page_url();
        if session.current_url().await? != search_url {
            session.navigate(&search_url).await?;
        }
        session
            .wait_for_selector(&format!("a[id='{SEARCH_BUTTON_ID}']"))
            .await?;

        // The decision-type radio triggers its own postback; switch first so
        // the later field values survive the reload.
        let radio_selector = format!(
            "{}[value='{}']",
            locators::KARAR_TIPI_RADIO,
            request.karar_tipi.value()
        );
        let radio_checked = session
            .eval_bool(&format!(
                "document.querySelector(\"{radio_selector}\") !== null && \
                 document.querySelector(\"{radio_selector}\").checked"
            ))
            .await?;
        if !radio_checked {
            let radio_target = format!("ctl00$ContentPlaceHolder1${}", request.karar_tipi.value());
            session.eval_postback(&radio_target).await?;
            session
                .wait_for_selector(&format!("a[id='{SEARCH_BUTTON_ID}']"))
                .await?;
        }

        // Callers may substitute `_` for `/` in decision numbers.
        let karar_no_for_form = request.karar_no.as_ref().map(|n| n.replace('_', "/"));

        let fills: [(&str, &Option<String>); 9] = [
            (locators::KARAR_METNI, &request.karar_metni),
            (locators::KARAR_NO, &karar_no_for_form),
            (locators::KARAR_TARIHI_BASLANGIC, &request.karar_tarihi_baslangic),
            (locators::KARAR_TARIHI_BITIS, &request.karar_tarihi_bitis),
            (locators::RESMI_GAZETE_SAYISI, &request.resmi_gazete_sayisi),
            (locators::RESMI_GAZETE_TARIHI, &request.resmi_gazete_tarihi),
            (locators::BASVURU_KONUSU_IHALE, &request.basvuru_konusu_ihale),
            (locators::BASVURU_SAHIBI, &request.basvuru_sahibi),
            (locators::IHALEYI_YAPAN_IDARE, &request.ihaleyi_yapan_idare),
        ];
        for (selector, value) in fills {
            if let Some(value) = value {
                session.fill(selector, value).await?;
            }
        }
        if let Some(yil) = &request.yil {
            session.select_value(locators::YIL, yil).await?;
        }

        // Page 1 goes through the search button; deeper pages re-fire the
        // grid pager's postback. The pager control offset is page + 2,
        // rendered two digits wide.
        if request.page == 1 {
            session.click(&format!("a[id='{SEARCH_BUTTON_ID}']")).await?;
        } else {
            let target = format!(
                "ctl00$ContentPlaceHolder1$grdKurulKararSorguSonuc$ctl14$ctl{:02}",
                request.page + 2
            );
            session.eval_postback(&target).await?;
        }
        if let Err(e) = session
            .wait_for_selector(&format!("table#{RESULTS_TABLE_ID}"))
            .await
        {
            warn!(error = %e, "results table did not appear");
        }

        let html = session.content().await?;
        if page_shows_no_results(&html) {
            return Ok(SearchResult {
                decisions: Vec::new(),
                total_records: 0,
                current_page: request.page,
            });
        }

        let decisions = parse_decision_entries(&html, request.karar_tipi)?;
        let total_records = parse_total_records(&html);
        let current_page = parse_current_page(&html).unwrap_or(request.page);
        Ok(SearchResult {
            decisions,
            total_records,
            current_page,
        })
    }

    /// Fetch a decision document by its synthetic id.
    ///
    /// Decodes the id, runs a targeted search, fires the matching row's
    /// preview postback and reads the decision out of the modal iframe. The
    /// search and the postback are one transaction on the browser mutex.
    pub async fn get_document_markdown(
        &self,
        karar_id: &str,
        page_number: u32,
    ) -> Result<DocumentMarkdown> {
        let (karar_tipi, karar_no) = match decode_karar_id(karar_id) {
            Ok(decoded) => decoded,
            Err(e) => {
                return Ok(DocumentMarkdown::failure(
                    karar_id,
                    page_number,
                    format!("invalid karar_id: {e}"),
                ));
            },
        };
        info!(karar_no = %karar_no, tipi = karar_tipi.value(), page = page_number, "kik document fetch");

        let mut session = self.driver.session().await?;

        let targeted = SearchRequest {
            karar_tipi,
            karar_no: Some(karar_no.clone()),
            page: 1,
            ..Default::default()
        };
        let search_result = match self.search_on_session(&mut session, &targeted).await {
            Ok(result) => result,
            Err(e) => {
                return Ok(DocumentMarkdown {
                    retrieved_karar_no: Some(karar_no),
                    retrieved_karar_tipi: Some(karar_tipi),
                    ..DocumentMarkdown::failure(karar_id, page_number, format!("targeted search failed: {e}"))
                });
            },
        };

        let Some(decision) = search_result
            .decisions
            .iter()
            .find(|d| d.karar_no == karar_no && d.karar_tipi == karar_tipi)
        else {
            return Ok(DocumentMarkdown {
                retrieved_karar_no: Some(karar_no.clone()),
                retrieved_karar_tipi: Some(karar_tipi),
                ..DocumentMarkdown::failure(
                    karar_id,
                    page_number,
                    format!("decision `{karar_no}` not found by targeted search"),
                )
            });
        };

        match self
            .open_document(&mut session, &decision.preview_event_target, page_number)
            .await
        {
            Ok((source_url, karar_id_param, page)) => Ok(DocumentMarkdown {
                retrieved_with_karar_id: Some(karar_id.to_string()),
                retrieved_karar_no: Some(karar_no),
                retrieved_karar_tipi: Some(karar_tipi),
                karar_id_param_from_url: karar_id_param,
                markdown_chunk: page.chunk,
                source_url: Some(source_url),
                error_message: None,
                current_page: page.current_page,
                total_pages: page.total_pages,
                is_paginated: page.is_paginated,
                full_content_char_count: Some(page.full_chars),
            }),
            Err(e) => {
                error!(source = "kik", karar_no = %karar_no, error = %e, "document retrieval failed");
                Ok(DocumentMarkdown {
                    retrieved_karar_no: Some(karar_no),
                    retrieved_karar_tipi: Some(karar_tipi),
                    ..DocumentMarkdown::failure(karar_id, page_number, e.to_string())
                })
            },
        }
    }

    async fn open_document(
        &self,
        session: &mut BrowserSession<'_>,
        preview_event_target: &str,
        page_number: u32,
    ) -> Result<(String, Option<String>, ChunkedContent)> {
        // The preview postback updates the page in place; no navigation.
        session
            .eval_unit(&format!(
                "__doPostBack('{}', '')",
                preview_event_target.replace('\'', "\\'")
            ))
            .await?;

        // State: modalOpen. Wait until the modal is visible and the iframe
        // points at the document display page.
        let predicate = format!(
            "(() => {{ \
                const modal = document.querySelector('div#detayPopUp.in'); \
                const iframe = document.querySelector('{DOCUMENT_IFRAME_SELECTOR}'); \
                return !!(modal && window.getComputedStyle(modal).display !== 'none' && \
                    iframe && iframe.getAttribute('src') && \
                    iframe.getAttribute('src').includes('{DOCUMENT_PAGE_PREFIX}')); \
            }})()"
        );
        let iframe_src = if session.wait_for_predicate(&predicate).await.is_ok() {
            session
                .eval_string(&format!(
                    "document.querySelector('{DOCUMENT_IFRAME_SELECTOR}') && \
                     document.querySelector('{DOCUMENT_IFRAME_SELECTOR}').getAttribute('src')"
                ))
                .await?
        } else {
            // Modal-open is the only state that may time out; fall back to
            // the static DOM snapshot.
            warn!("modal wait timed out, parsing static DOM for iframe src");
            iframe_src_from_static_dom(&session.content().await?)
        };
        let iframe_src = iframe_src
            .filter(|src| !src.trim().is_empty())
            .ok_or_else(|| Error::NotFound("decision content iframe URL not found".into()))?;

        let current = session.current_url().await?;
        let document_url = Url::parse(&current)
            .and_then(|base| base.join(&iframe_src))
            .map_err(|e| Error::Parse(format!("bad iframe src `{iframe_src}`: {e}")))?
            .to_string();

        let karar_id_param = Url::parse(&document_url).ok().and_then(|url| {
            url.query_pairs()
                .find(|(k, _)| k == "KararId")
                .map(|(_, v)| v.into_owned())
        });

        // The iframe target loads fine standalone; use a throwaway page so
        // the search page keeps its state.
        let document_html = session.open_child_page(&document_url).await?;
        let fragment = extract_karar_content(&document_html)
            .unwrap_or_else(|| document_html.clone());

        let full = markdown::html_to_markdown(&fragment, &CleaningProfile::default())?;
        let paged = markdown::paginate(&full, page_number);
        let chunked = ChunkedContent {
            chunk: paged.markdown_chunk,
            current_page: paged.current_page,
            total_pages: paged.total_pages,
            is_paginated: paged.is_paginated,
            full_chars: u64::try_from(full.chars().count()).unwrap_or(u64::MAX),
        };

        // Close the modal so the next call starts from a clean grid.
        if session.click(MODAL_CLOSE_SELECTOR).await.is_err() {
            warn!("modal close button not clickable, leaving modal state to next navigation");
        }

        Ok((document_url, karar_id_param, chunked))
    }

    /// Close the browser. Idempotent.
    pub async fn close(&self) {
        self.driver.close().await;
        info!("kik client closed");
    }
}

impl Default for KikClient {
    fn default() -> Self {
        Self::new()
    }
}

struct ChunkedContent {
    chunk: Option<String>,
    current_page: u32,
    total_pages: u32,
    is_paginated: bool,
    full_chars: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn karar_id_round_trips() {
        let id = encode_karar_id(KararTipi::Uyusmazlik, "2024/UH.II-1766");
        assert_eq!(id, BASE64.encode("rbUyusmazlik|2024/UH.II-1766"));
        let (tipi, no) = decode_karar_id(&id).unwrap();
        assert_eq!(tipi, KararTipi::Uyusmazlik);
        assert_eq!(no, "2024/UH.II-1766");
        assert_eq!(encode_karar_id(tipi, &no), id);
    }

    #[test]
    fn karar_id_with_underscores_is_equivalent_after_normalization() {
        // Callers substitute `_` for `/`; normalization happens before the
        // form fill, so both spellings address the same decision.
        let with_underscore = "2024_UH.II-1766".replace('_', "/");
        assert_eq!(with_underscore, "2024/UH.II-1766");
    }

    #[test]
    fn invalid_karar_id_is_rejected() {
        assert!(decode_karar_id("!!!").is_err());
        let no_pipe = BASE64.encode("rbUyusmazlik2024");
        assert!(decode_karar_id(&no_pipe).is_err());
        let bad_type = BASE64.encode("rbBilinmeyen|2024/1");
        assert!(decode_karar_id(&bad_type).is_err());
    }

    const RESULTS_HTML: &str = r#"
    <html><body>
      <div class="gridToplamSayi">Toplam Kayıt Sayısı:137</div>
      <div class="sayfalama"><span class="active">2</span></div>
      <table id="grdKurulKararSorguSonuc">
        <tr><th>header</th></tr>
        <tr><td>filter strip</td></tr>
        <tr>
          <td><a id="ctl00_x_btnOnizle" href="javascript:__doPostBack('ctl00$ContentPlaceHolder1$grdKurulKararSorguSonuc$ctl03$btnOnizle','')">Önizle</a></td>
          <td><span id="ctl00_x_lblKno">2024/UH.II-1766</span></td>
          <td><span id="ctl00_x_lblKtar">24.04.2024</span></td>
          <td><span id="ctl00_x_lblIdare">Karayolları Genel Müdürlüğü</span></td>
          <td><span id="ctl00_x_lblSikayetci">ABC İnşaat A.Ş.</span></td>
          <td><span id="ctl00_x_lblIhale">Yol yapım işi</span></td>
        </tr>
        <tr><td>eksik</td></tr>
      </table>
    </body></html>"#;

    #[test]
    fn parses_grid_rows_with_postback_targets() {
        let entries = parse_decision_entries(RESULTS_HTML, KararTipi::Uyusmazlik).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(
            entry.preview_event_target,
            "ctl00$ContentPlaceHolder1$grdKurulKararSorguSonuc$ctl03$btnOnizle"
        );
        assert_eq!(entry.karar_no, "2024/UH.II-1766");
        assert_eq!(entry.karar_tarihi, "24.04.2024");
        assert_eq!(entry.idare.as_deref(), Some("Karayolları Genel Müdürlüğü"));
        assert_eq!(entry.karar_id, encode_karar_id(KararTipi::Uyusmazlik, "2024/UH.II-1766"));
    }

    #[test]
    fn parses_pager_totals_and_current_page() {
        assert_eq!(parse_total_records(RESULTS_HTML), 137);
        assert_eq!(parse_current_page(RESULTS_HTML), Some(2));
        assert_eq!(parse_total_records("<html></html>"), 0);
        assert!(parse_current_page("<html></html>").is_none());
    }

    #[test]
    fn no_results_message_is_detected() {
        let html = r#"<div id="ctl00_MessageContent1">Arama kriterlerinize uygun kayıt bulunamamıştır.</div>"#;
        assert!(page_shows_no_results(html));
        let validation = r#"<div id="ctl00_ValidationSummary1">Karar tarihi hatalı</div>"#;
        assert!(page_shows_no_results(validation));
        let hidden = r#"<div id="ctl00_ValidationSummary1" style="display: none">x</div>"#;
        assert!(!page_shows_no_results(hidden));
        assert!(!page_shows_no_results(RESULTS_HTML));
    }

    #[test]
    fn pagination_postback_target_is_two_digits_wide() {
        let page: u32 = 2;
        let target = format!(
            "ctl00$ContentPlaceHolder1$grdKurulKararSorguSonuc$ctl14$ctl{:02}",
            page + 2
        );
        assert_eq!(
            target,
            "ctl00$ContentPlaceHolder1$grdKurulKararSorguSonuc$ctl14$ctl04"
        );
        let page: u32 = 9;
        assert!(
            format!(
                "ctl00$ContentPlaceHolder1$grdKurulKararSorguSonuc$ctl14$ctl{:02}",
                page + 2
            )
            .ends_with("ctl11")
        );
    }

    #[test]
    fn static_iframe_fallback_requires_document_page_src() {
        let html = r#"<div id="detayPopUp" class="in">
            <iframe id="iframe_detayPopUp" src="KurulKararGoster.aspx?KararId=9876"></iframe>
        </div>"#;
        assert_eq!(
            iframe_src_from_static_dom(html).as_deref(),
            Some("KurulKararGoster.aspx?KararId=9876")
        );
        let wrong = r#"<iframe id="iframe_detayPopUp" src="Baska.aspx"></iframe>"#;
        assert!(iframe_src_from_static_dom(wrong).is_none());
    }

    #[test]
    fn karar_content_span_is_extracted() {
        let html = r#"<html><body>
            <span id="ctl00_ContentPlaceHolder1_lblKarar"><p>KURUL KARARI</p></span>
        </body></html>"#;
        let fragment = extract_karar_content(html).unwrap();
        assert!(fragment.contains("KURUL KARARI"));
    }
}
