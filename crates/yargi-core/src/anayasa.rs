//! Constitutional Court norm-control (Norm Denetimi) corpus adapter.
//!
//! The search front-end is a GET form: most options travel as a flat query
//! string, but results-per-page and sort criteria are encoded as URL *path*
//! segments (`/SatirSayisi/N/Siralama/CRITERION/Ara`). Results and documents
//! are server-rendered HTML scraped with fixed selectors.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use url::Url;

use crate::fetcher::HttpFetcher;
use crate::markdown::{self, CleaningProfile, Rule};
use crate::{Error, Result};

const BASE_URL: &str = "https://normkararlarbilgibankasi.anayasa.gov.tr";
const SEARCH_PATH_SEGMENT: &str = "Ara";

/// Constitutional period selector (`Donemler_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub enum Donem {
    /// All periods.
    #[serde(rename = "ALL")]
    Tumu,
    /// 1961 constitution.
    #[serde(rename = "1")]
    Donem1961,
    /// 1982 constitution.
    #[serde(rename = "2")]
    Donem1982,
}

/// Application type (`BasvuruTurler_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub enum BasvuruTuru {
    /// All types.
    #[serde(rename = "ALL")]
    Tumu,
    /// Annulment action.
    #[serde(rename = "1")]
    Iptal,
    /// Concrete-norm objection.
    #[serde(rename = "2")]
    Itiraz,
    /// Other.
    #[serde(rename = "3")]
    Diger,
}

/// Tri-state yes/no filter used for press release, dissent and different
/// reasoning flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub enum VarYok {
    /// Not filtered.
    #[serde(rename = "ALL")]
    Tumu,
    /// Absent.
    #[serde(rename = "0")]
    Yok,
    /// Present.
    #[serde(rename = "1")]
    Var,
}

/// Reviewed norm type (`NormunTurler_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub enum NormTuru {
    /// All norm types.
    #[serde(rename = "ALL")]
    Tumu,
    /// Constitution.
    #[serde(rename = "1")]
    Anayasa,
    /// Constitution-amending statute.
    #[serde(rename = "2")]
    AnayasaDegistirenKanun,
    /// Presidential decree.
    #[serde(rename = "14")]
    CumhurbaskanligiKararnamesi,
    /// Parliamentary bylaw.
    #[serde(rename = "3")]
    Ictuzuk,
    /// Statute.
    #[serde(rename = "4")]
    Kanun,
    /// Decree with force of law.
    #[serde(rename = "5")]
    KanunHukmundeKararname,
    /// Decision.
    #[serde(rename = "6")]
    Karar,
    /// Regulation (nizamname).
    #[serde(rename = "7")]
    Nizamname,
    /// Directive.
    #[serde(rename = "8")]
    Talimatname,
    /// Tariff.
    #[serde(rename = "9")]
    Tarife,
    /// Parliament decision.
    #[serde(rename = "10")]
    TbmmKarari,
    /// Memorandum.
    #[serde(rename = "11")]
    Tezkere,
    /// Bylaw (tüzük).
    #[serde(rename = "12")]
    Tuzuk,
    /// "None" option.
    #[serde(rename = "0")]
    YokSecenegi,
    /// Regulation (yönetmelik).
    #[serde(rename = "13")]
    Yonetmelik,
}

/// Review type and outcome (`IncelemeTuruKararSonuclar_id[]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub enum IncelemeSonucu {
    /// All outcomes.
    #[serde(rename = "ALL")]
    Tumu,
    /// Merits - deemed not filed.
    #[serde(rename = "1")]
    EsasAcilmamisSayilma,
    /// Merits - annulment.
    #[serde(rename = "2")]
    EsasIptal,
    /// Merits - no ground to decide.
    #[serde(rename = "3")]
    EsasKararYerOlmadigi,
    /// Merits - rejection.
    #[serde(rename = "4")]
    EsasRet,
    /// Preliminary - deemed not filed.
    #[serde(rename = "5")]
    IlkAcilmamisSayilma,
    /// Preliminary - returned.
    #[serde(rename = "6")]
    IlkIsinGeriCevrilmesi,
    /// Preliminary - no ground to decide.
    #[serde(rename = "7")]
    IlkKararYerOlmadigi,
    /// Preliminary - rejection.
    #[serde(rename = "8")]
    IlkRet,
    /// Annulment under art. 43/4 of law 6216.
    #[serde(rename = "12")]
    Kanun6216M43Iptal,
}

/// Main reason for the final outcome (`KararSonucununGerekcesi`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub enum SonucGerekcesi {
    /// All reasons.
    #[serde(rename = "ALL")]
    Tumu,
    /// Not contrary to the constitution.
    #[serde(rename = "29")]
    AnayasayaAykiriDegil,
    /// Substantive unconstitutionality.
    #[serde(rename = "1")]
    EsasYonundenAykirilik,
    /// Substantive conformity.
    #[serde(rename = "2")]
    EsasYonundenUygunluk,
    /// Formal and substantive conformity.
    #[serde(rename = "30")]
    SekilEsasUygunluk,
    /// Formal unconstitutionality.
    #[serde(rename = "3")]
    SekilYonundenAykirilik,
    /// Formal conformity.
    #[serde(rename = "4")]
    SekilYonundenUygunluk,
    /// Referral decision.
    #[serde(rename = "5")]
    BasvuruKarari,
    /// Outside review.
    #[serde(rename = "6")]
    DenetimDisi,
    /// Lapse of the norm.
    #[serde(rename = "17")]
    NormunYururluktenKaldirilmasi,
    /// Ten-year bar.
    #[serde(rename = "18")]
    OnYilYasagi,
    /// Time limit.
    #[serde(rename = "19")]
    Sure,
    /// Competent court.
    #[serde(rename = "13")]
    GorevliMahkeme,
    /// Pending case requirement.
    #[serde(rename = "14")]
    GorulmekteOlanDava,
    /// Applicable-norm requirement.
    #[serde(rename = "21")]
    UygulanacakNorm,
    /// Jurisdiction.
    #[serde(rename = "23")]
    Yetki,
}

/// Sort criteria accepted in the `/Siralama/…` path segment.
pub const SORT_CRITERIA: &[&str] = &["KararTarihi", "YayinTarihi", "Toplam"];

/// Results-per-page values the upstream renders.
pub const RESULTS_PER_PAGE_OPTIONS: &[u32] = &[10, 20, 30, 40, 50];

fn enum_query_value<T: Serialize>(value: &T) -> Option<String> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) if s != "ALL" && !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Caller-facing search parameters for the norm-control corpus.
#[derive(Debug, Clone, Default)]
pub struct NormSearchRequest {
    /// Keywords, all required (`KelimeAra[]`).
    pub keywords_all: Vec<String>,
    /// Keywords, any may match (`HerhangiBirKelimeAra[]`).
    pub keywords_any: Vec<String>,
    /// Keywords that must not appear (`BulunmayanKelimeAra[]`).
    pub keywords_exclude: Vec<String>,
    /// Constitutional period.
    pub period: Option<Donem>,
    /// Case registry number (`EsasNo`), e.g. `2023/123`.
    pub case_number_esas: Option<String>,
    /// Decision number (`KararNo`).
    pub decision_number_karar: Option<String>,
    /// First review date range start, `DD/MM/YYYY`.
    pub first_review_date_start: Option<String>,
    /// First review date range end, `DD/MM/YYYY`.
    pub first_review_date_end: Option<String>,
    /// Decision date range start, `DD/MM/YYYY`.
    pub decision_date_start: Option<String>,
    /// Decision date range end, `DD/MM/YYYY`.
    pub decision_date_end: Option<String>,
    /// Application type.
    pub application_type: Option<BasvuruTuru>,
    /// General applicant name (`BasvuranGeneller_id`).
    pub applicant_general_name: Option<String>,
    /// Specific applicant name (`BasvuranOzeller_id`).
    pub applicant_specific_name: Option<String>,
    /// Attending member names (`Uyeler_id[]`).
    pub attending_members_names: Vec<String>,
    /// Rapporteur name (`Raportorler_id`).
    pub rapporteur_name: Option<String>,
    /// Reviewed norm type.
    pub norm_type: Option<NormTuru>,
    /// Norm number or name (`NormunNumarasiAdlar_id`).
    pub norm_id_or_name: Option<String>,
    /// Norm article number (`NormunMaddeNumarasi`).
    pub norm_article: Option<String>,
    /// Review outcomes (`IncelemeTuruKararSonuclar_id[]`).
    pub review_outcomes: Vec<IncelemeSonucu>,
    /// Reason for the final outcome.
    pub reason_for_final_outcome: Option<SonucGerekcesi>,
    /// Cited basis constitution articles (`DayanakHukmu[]`).
    pub basis_constitution_article_numbers: Vec<String>,
    /// Official Gazette date range start, `DD/MM/YYYY`.
    pub official_gazette_date_start: Option<String>,
    /// Official Gazette date range end, `DD/MM/YYYY`.
    pub official_gazette_date_end: Option<String>,
    /// Official Gazette number range start.
    pub official_gazette_number_start: Option<String>,
    /// Official Gazette number range end.
    pub official_gazette_number_end: Option<String>,
    /// Press-release flag.
    pub has_press_release: Option<VarYok>,
    /// Dissenting-opinion flag.
    pub has_dissenting_opinion: Option<VarYok>,
    /// Different-reasoning flag.
    pub has_different_reasoning: Option<VarYok>,
    /// Results per page; only non-default values become a path segment.
    pub results_per_page: Option<u32>,
    /// 1-indexed page to fetch.
    pub page_to_fetch: u32,
    /// Sort criterion; only non-default values become a path segment.
    pub sort_by_criteria: Option<String>,
}

/// One reviewed norm row from a result block's sibling table.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewedNorm {
    /// Norm name or number.
    pub norm_name_or_number: Option<String>,
    /// Reviewed article number.
    pub article_number: Option<String>,
    /// Review type and outcome text.
    pub review_type_and_outcome: Option<String>,
    /// Outcome reason text.
    pub outcome_reason: Option<String>,
    /// Cited basis constitution articles.
    pub basis_constitution_articles_cited: Vec<String>,
    /// Postponement period, if any.
    pub postponement_period: Option<String>,
}

/// One decision summary parsed from a `div.birkarar` block.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionSummary {
    /// `E. YYYY/N, K. YYYY/N` reference extracted from the heading.
    pub decision_reference_no: Option<String>,
    /// Full URL of the decision page.
    pub decision_page_url: Option<String>,
    /// Matched keyword count badge.
    pub keywords_found_count: Option<u32>,
    /// Application type from the info row.
    pub application_type_summary: Option<String>,
    /// Applicant from the info row.
    pub applicant_summary: Option<String>,
    /// Outcome from the info row.
    pub decision_outcome_summary: Option<String>,
    /// Decision date from the info row.
    pub decision_date_summary: Option<String>,
    /// Reviewed norms listed under the block.
    pub reviewed_norms: Vec<ReviewedNorm>,
}

/// Search result for the tool layer.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Parsed decision summaries.
    pub decisions: Vec<DecisionSummary>,
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
    /// `E.{}, K.{}` reference scraped from the page.
    pub decision_reference_no_from_page: Option<String>,
    /// Decision date scraped from the page.
    pub decision_date_from_page: Option<String>,
    /// Official Gazette line scraped from the page.
    pub official_gazette_info_from_page: Option<String>,
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

static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(E\.\s*\d+/\d+\s*,\s*K\.\s*\d+/\d+)").expect("static regex")
});
static TOTAL_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(\d+)\s*Karar Bulundu").expect("static regex")
});
static DATE_FALLBACK_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"Karar Tarihi\s*:\s*([\d\.]+)").expect("static regex")
});

const DOCUMENT_CLEANING: CleaningProfile = CleaningProfile {
    payload: &[
        Rule::Class("WordSection1"),
        Rule::Class("KararMetni"),
        Rule::Id("Karar"),
        Rule::Tag("body"),
    ],
    prune: &[Rule::Class("item"), Rule::Class("modal")],
};

fn sel(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Parse(format!("bad selector `{css}`: {e}")))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text fragments of an element, each trimmed, empties dropped. Stands in
/// for a `|`-separated join of the source markup.
fn text_parts(element: ElementRef<'_>) -> Vec<String> {
    element
        .text()
        .map(|t| t.trim().replace('\u{a0}', " "))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Client for the norm-control decision bank.
pub struct AnayasaNormClient {
    fetcher: HttpFetcher,
}

impl AnayasaNormClient {
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

    /// Request path with optional `SatirSayisi` / `Siralama` segments.
    fn build_request_path(request: &NormSearchRequest) -> String {
        let mut segments: Vec<String> = Vec::new();
        if let Some(per_page) = request.results_per_page {
            if per_page != 10 {
                segments.push(format!("SatirSayisi/{per_page}"));
            }
        }
        if let Some(sort) = &request.sort_by_criteria {
            if sort != "KararTarihi" {
                let encoded: String =
                    url::form_urlencoded::byte_serialize(sort.as_bytes()).collect();
                segments.push(format!("Siralama/{encoded}"));
            }
        }
        segments.push(SEARCH_PATH_SEGMENT.to_string());
        format!("/{}", segments.join("/"))
    }

    fn build_query(request: &NormSearchRequest) -> Vec<(&'static str, String)> {
        let mut query: Vec<(&'static str, String)> = Vec::new();
        for kw in &request.keywords_all {
            query.push(("KelimeAra[]", kw.clone()));
        }
        for kw in &request.keywords_any {
            query.push(("HerhangiBirKelimeAra[]", kw.clone()));
        }
        for kw in &request.keywords_exclude {
            query.push(("BulunmayanKelimeAra[]", kw.clone()));
        }
        if let Some(v) = request.period.as_ref().and_then(enum_query_value) {
            query.push(("Donemler_id", v));
        }
        if let Some(v) = &request.case_number_esas {
            query.push(("EsasNo", v.clone()));
        }
        if let Some(v) = &request.decision_number_karar {
            query.push(("KararNo", v.clone()));
        }
        if let Some(v) = &request.first_review_date_start {
            query.push(("IlkIncelemeTarihiIlk", v.clone()));
        }
        if let Some(v) = &request.first_review_date_end {
            query.push(("IlkIncelemeTarihiSon", v.clone()));
        }
        if let Some(v) = &request.decision_date_start {
            query.push(("KararTarihiIlk", v.clone()));
        }
        if let Some(v) = &request.decision_date_end {
            query.push(("KararTarihiSon", v.clone()));
        }
        if let Some(v) = request.application_type.as_ref().and_then(enum_query_value) {
            query.push(("BasvuruTurler_id", v));
        }
        if let Some(v) = &request.applicant_general_name {
            query.push(("BasvuranGeneller_id", v.clone()));
        }
        if let Some(v) = &request.applicant_specific_name {
            query.push(("BasvuranOzeller_id", v.clone()));
        }
        for name in &request.attending_members_names {
            query.push(("Uyeler_id[]", name.clone()));
        }
        if let Some(v) = &request.rapporteur_name {
            query.push(("Raportorler_id", v.clone()));
        }
        if let Some(v) = request.norm_type.as_ref().and_then(enum_query_value) {
            query.push(("NormunTurler_id", v));
        }
        if let Some(v) = &request.norm_id_or_name {
            query.push(("NormunNumarasiAdlar_id", v.clone()));
        }
        if let Some(v) = &request.norm_article {
            query.push(("NormunMaddeNumarasi", v.clone()));
        }
        for outcome in &request.review_outcomes {
            if let Some(v) = enum_query_value(outcome) {
                query.push(("IncelemeTuruKararSonuclar_id[]", v));
            }
        }
        if let Some(v) = request
            .reason_for_final_outcome
            .as_ref()
            .and_then(enum_query_value)
        {
            query.push(("KararSonucununGerekcesi", v));
        }
        for article in &request.basis_constitution_article_numbers {
            query.push(("DayanakHukmu[]", article.clone()));
        }
        if let Some(v) = &request.official_gazette_date_start {
            query.push(("ResmiGazeteTarihiIlk", v.clone()));
        }
        if let Some(v) = &request.official_gazette_date_end {
            query.push(("ResmiGazeteTarihiSon", v.clone()));
        }
        if let Some(v) = &request.official_gazette_number_start {
            query.push(("ResmiGazeteSayisiIlk", v.clone()));
        }
        if let Some(v) = &request.official_gazette_number_end {
            query.push(("ResmiGazeteSayisiSon", v.clone()));
        }
        if let Some(v) = request.has_press_release.as_ref().and_then(enum_query_value) {
            query.push(("BasinDuyurusu", v));
        }
        if let Some(v) = request
            .has_dissenting_opinion
            .as_ref()
            .and_then(enum_query_value)
        {
            query.push(("KarsiOy", v));
        }
        if let Some(v) = request
            .has_different_reasoning
            .as_ref()
            .and_then(enum_query_value)
        {
            query.push(("FarkliGerekce", v));
        }
        if request.page_to_fetch > 1 {
            query.push(("page", request.page_to_fetch.to_string()));
        }
        query
    }

    /// Run a norm-control search.
    pub async fn search(&self, request: &NormSearchRequest) -> Result<SearchResult> {
        let path = Self::build_request_path(request);
        let query = Self::build_query(request);
        info!(%path, page = request.page_to_fetch, "anayasa norm search");

        let html = self
            .fetcher
            .get_text(&path, &query)
            .await
            .inspect_err(|e| error!(source = "anayasa-norm", %path, error = %e))?;
        self.parse_search_results(&html, request.page_to_fetch)
    }

    fn parse_search_results(&self, html: &str, page: u32) -> Result<SearchResult> {
        let document = Html::parse_document(html);

        let total_records = document
            .select(&sel("div.bulunankararsayisi")?)
            .next()
            .or_else(|| {
                document
                    .select(&sel("div.bulunankararsayisiMobil").ok()?)
                    .next()
            })
            .and_then(|div| {
                TOTAL_RE
                    .captures(&element_text(div))
                    .and_then(|c| c.get(1))
                    .and_then(|m| m.as_str().parse().ok())
            });

        let block_sel = sel("div.birkarar")?;
        let link_sel = sel("a[href]")?;
        let title_sel = sel("div.bkararbaslik")?;
        let count_sel = sel("div.BulunanKelimeSayisi")?;
        let info_sel = sel("div.kararbilgileri")?;
        let table_sel = sel("table.table")?;
        let row_sel = sel("tbody tr")?;
        let cell_sel = sel("td")?;

        let mut decisions = Vec::new();
        for block in document.select(&block_sel) {
            let decision_page_url = block
                .select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| self.absolute_url(href).ok());

            let (reference, keyword_count) = block.select(&title_sel).next().map_or(
                (None, None),
                |title| {
                    let raw = element_text(title).replace('\u{a0}', " ");
                    let reference = REFERENCE_RE
                        .captures(&raw)
                        .and_then(|c| c.get(1))
                        .map(|m| m.as_str().to_string())
                        .or_else(|| {
                            raw.split("Sayılı Karar")
                                .next()
                                .map(|s| s.trim().to_string())
                        });
                    let count = title.select(&count_sel).next().and_then(|div| {
                        element_text(div)
                            .replace("Bulunan Kelime Sayısı", "")
                            .trim()
                            .parse()
                            .ok()
                    });
                    (reference, count)
                },
            );

            let info_parts: Vec<String> = block
                .select(&info_sel)
                .next()
                .map(|div| text_parts(div).join("|"))
                .unwrap_or_default()
                .split('|')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            let part = |i: usize| info_parts.get(i).cloned();
            let decision_date = part(3).map(|raw| raw.replace("Karar Tarihi:", "").trim().to_string());

            // The reviewed-norm table sits in a sibling container after the
            // decision block.
            let mut reviewed_norms = Vec::new();
            let mut sibling = block.next_sibling();
            while let Some(node) = sibling {
                if let Some(element) = ElementRef::wrap(node) {
                    let is_container = element
                        .value()
                        .classes()
                        .any(|c| c.starts_with("col-sm-12"));
                    if is_container {
                        if let Some(table) = element.select(&table_sel).next() {
                            for row in table.select(&row_sel) {
                                let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
                                if cells.len() != 6 {
                                    continue;
                                }
                                let text = |i: usize| {
                                    let t = element_text(cells[i]);
                                    if t.is_empty() { None } else { Some(t) }
                                };
                                reviewed_norms.push(ReviewedNorm {
                                    norm_name_or_number: text(0),
                                    article_number: text(1),
                                    review_type_and_outcome: text(2),
                                    outcome_reason: text(3),
                                    basis_constitution_articles_cited: element_text(cells[4])
                                        .split(',')
                                        .map(|a| a.trim().to_string())
                                        .filter(|a| !a.is_empty())
                                        .collect(),
                                    postponement_period: text(5),
                                });
                            }
                        }
                        break;
                    }
                    // Another decision block means this one has no table.
                    if element.value().classes().any(|c| c == "birkarar") {
                        break;
                    }
                }
                sibling = node.next_sibling();
            }

            decisions.push(DecisionSummary {
                decision_reference_no: reference,
                decision_page_url,
                keywords_found_count: keyword_count,
                application_type_summary: part(0),
                applicant_summary: part(1),
                decision_outcome_summary: part(2),
                decision_date_summary: decision_date,
                reviewed_norms,
            });
        }

        Ok(SearchResult {
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

    /// Fetch a decision page (path like `/ND/2024/100` or full URL) and
    /// return the requested Markdown chunk plus page-scraped metadata.
    pub async fn get_document_markdown(
        &self,
        document_url: &str,
        page_number: u32,
    ) -> Result<DocumentMarkdown> {
        let full_url = if document_url.starts_with("http") {
            document_url.to_string()
        } else {
            self.absolute_url(document_url)?
        };
        info!(url = %full_url, page = page_number, "anayasa norm document fetch");

        let html = self
            .fetcher
            .get_text(&full_url, &[])
            .await
            .inspect_err(|e| error!(source = "anayasa-norm", url = %full_url, error = %e))?;

        let (reference, date, gazette) = Self::scrape_document_metadata(&html)?;

        Ok(match markdown::html_to_markdown(&html, &DOCUMENT_CLEANING) {
            Ok(full) => {
                let page = markdown::paginate(&full, page_number);
                DocumentMarkdown {
                    source_url: full_url,
                    decision_reference_no_from_page: reference,
                    decision_date_from_page: date,
                    official_gazette_info_from_page: gazette,
                    markdown_chunk: page.markdown_chunk,
                    current_page: page.current_page,
                    total_pages: page.total_pages,
                    is_paginated: page.is_paginated,
                    error_message: None,
                }
            },
            Err(e) => DocumentMarkdown {
                source_url: full_url,
                decision_reference_no_from_page: reference,
                decision_date_from_page: date,
                official_gazette_info_from_page: gazette,
                markdown_chunk: None,
                current_page: page_number.max(1),
                total_pages: 1,
                is_paginated: false,
                error_message: Some(e.to_string()),
            },
        })
    }

    #[allow(clippy::type_complexity)]
    fn scrape_document_metadata(
        html: &str,
    ) -> Result<(Option<String>, Option<String>, Option<String>)> {
        let document = Html::parse_document(html);
        let bold_sel = sel("p b")?;
        let para_sel = sel("p")?;

        let mut esas = None;
        let mut karar = None;
        let mut date = None;
        for bold in document.select(&bold_sel) {
            let text = element_text(bold);
            if let Some(rest) = text.strip_prefix("Esas No.:") {
                esas = Some(rest.trim().to_string());
            } else if let Some(rest) = text.strip_prefix("Karar No.:") {
                karar = Some(rest.trim().to_string());
            } else if let Some(rest) = text.strip_prefix("Karar tarihi:") {
                date = Some(rest.trim().to_string());
            }
        }
        let reference = match (esas, karar) {
            (Some(e), Some(k)) => Some(format!("E.{e}, K.{k}")),
            _ => None,
        };

        if date.is_none() {
            let page_text: String = document.root_element().text().collect();
            date = DATE_FALLBACK_RE
                .captures(&page_text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string());
        }

        let gazette = document.select(&para_sel).find_map(|p| {
            let text = element_text(p);
            if text.contains("Resmî Gazete tarih ve sayısı:") {
                Some(
                    text.replace("Resmî Gazete tarih ve sayısı:", "")
                        .trim()
                        .to_string(),
                )
            } else if text.contains("Resmi Gazete tarih/sayı:") {
                Some(text.replace("Resmi Gazete tarih/sayı:", "").trim().to_string())
            } else {
                None
            }
        });

        Ok((reference, date, gazette))
    }

    /// Close the underlying HTTP client. Idempotent.
    pub fn close(&self) {
        info!("anayasa norm client closed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn path_segments_only_for_non_default_options() {
        let default_request = NormSearchRequest {
            page_to_fetch: 1,
            ..Default::default()
        };
        assert_eq!(AnayasaNormClient::build_request_path(&default_request), "/Ara");

        let tuned = NormSearchRequest {
            results_per_page: Some(40),
            sort_by_criteria: Some("Toplam".to_string()),
            ..Default::default()
        };
        assert_eq!(
            AnayasaNormClient::build_request_path(&tuned),
            "/SatirSayisi/40/Siralama/Toplam/Ara"
        );
    }

    #[test]
    fn query_encodes_arrays_and_drops_sentinels() {
        let request = NormSearchRequest {
            keywords_all: vec!["mülkiyet".to_string(), "hak".to_string()],
            period: Some(Donem::Donem1982),
            application_type: Some(BasvuruTuru::Tumu),
            case_number_esas: Some("2023/123".to_string()),
            review_outcomes: vec![IncelemeSonucu::EsasIptal, IncelemeSonucu::Tumu],
            has_press_release: Some(VarYok::Var),
            page_to_fetch: 3,
            ..Default::default()
        };
        let query = AnayasaNormClient::build_query(&request);
        assert_eq!(query[0], ("KelimeAra[]", "mülkiyet".to_string()));
        assert_eq!(query[1], ("KelimeAra[]", "hak".to_string()));
        assert!(query.contains(&("Donemler_id", "2".to_string())));
        assert!(query.contains(&("EsasNo", "2023/123".to_string())));
        assert!(query.contains(&("IncelemeTuruKararSonuclar_id[]", "2".to_string())));
        assert!(query.contains(&("BasinDuyurusu", "1".to_string())));
        assert!(query.contains(&("page", "3".to_string())));
        // Sentinels never reach the wire.
        assert!(!query.iter().any(|(k, _)| *k == "BasvuruTurler_id"));
        assert!(!query.iter().any(|(_, v)| v == "ALL"));
    }

    const RESULTS_HTML: &str = r#"
    <html><body>
      <div class="bulunankararsayisi">2 Karar Bulundu</div>
      <div class="birkarar">
        <a href="/ND/2024/100"></a>
        <div class="bkararbaslik">E. 2023/123 , K. 2024/15 Sayılı Karar
          <div class="BulunanKelimeSayisi">Bulunan Kelime Sayısı 7</div>
        </div>
        <div class="kararbilgileri">İtiraz Yoluna Başvuran|Ankara 5. İdare Mahkemesi|Esas - Ret|Karar Tarihi: 15.02.2024</div>
      </div>
      <div class="col-sm-12">
        <table class="table"><tbody>
          <tr><td>5403 sayılı Kanun</td><td>13</td><td>Esas - İptal</td><td>Anayasaya esas yönünden aykırılık</td><td>2, 35</td><td>9 ay</td></tr>
        </tbody></table>
      </div>
      <div class="birkarar">
        <a href="/ND/2022/9"></a>
        <div class="bkararbaslik">E. 2021/4 , K. 2022/1 Sayılı Karar</div>
        <div class="kararbilgileri">İptal Davası|Milletvekilleri|Esas - İptal|Karar Tarihi: 01.03.2022</div>
      </div>
    </body></html>"#;

    #[test]
    fn parses_blocks_info_rows_and_norm_tables() {
        let client =
            AnayasaNormClient::with_base_url("https://normkararlarbilgibankasi.anayasa.gov.tr")
                .unwrap();
        let result = client.parse_search_results(RESULTS_HTML, 1).unwrap();

        assert_eq!(result.total_records_found, Some(2));
        assert_eq!(result.decisions.len(), 2);

        let first = &result.decisions[0];
        assert_eq!(first.decision_reference_no.as_deref(), Some("E. 2023/123 , K. 2024/15"));
        assert_eq!(first.keywords_found_count, Some(7));
        assert_eq!(first.application_type_summary.as_deref(), Some("İtiraz Yoluna Başvuran"));
        assert_eq!(first.decision_date_summary.as_deref(), Some("15.02.2024"));
        assert_eq!(
            first.decision_page_url.as_deref(),
            Some("https://normkararlarbilgibankasi.anayasa.gov.tr/ND/2024/100")
        );
        assert_eq!(first.reviewed_norms.len(), 1);
        let norm = &first.reviewed_norms[0];
        assert_eq!(norm.norm_name_or_number.as_deref(), Some("5403 sayılı Kanun"));
        assert_eq!(norm.basis_constitution_articles_cited, vec!["2", "35"]);
        assert_eq!(norm.postponement_period.as_deref(), Some("9 ay"));

        let second = &result.decisions[1];
        assert!(second.reviewed_norms.is_empty());
        assert_eq!(second.decision_reference_no.as_deref(), Some("E. 2021/4 , K. 2022/1"));
    }

    #[test]
    fn every_reference_matches_search_regex() {
        // Mirrors the Esas-number filter property: references keep the
        // E./K. shape the search regex expects.
        let client =
            AnayasaNormClient::with_base_url("https://normkararlarbilgibankasi.anayasa.gov.tr")
                .unwrap();
        let result = client.parse_search_results(RESULTS_HTML, 1).unwrap();
        for decision in &result.decisions {
            let reference = decision.decision_reference_no.as_deref().unwrap();
            assert!(REFERENCE_RE.is_match(reference), "bad reference {reference}");
        }
    }

    #[test]
    fn document_metadata_is_scraped_from_bold_paragraphs() {
        let html = r#"<html><body><div id="Karar"><div class="KararMetni">
            <p><b>Esas No.: 2023/123</b></p>
            <p><b>Karar No.: 2024/15</b></p>
            <p>Resmî Gazete tarih ve sayısı: 12.06.2024 - 32574</p>
            <div class="WordSection1"><p>KARAR GEREKÇESİ</p></div>
        </div></div></body></html>"#;
        let (reference, _date, gazette) =
            AnayasaNormClient::scrape_document_metadata(html).unwrap();
        assert_eq!(reference.as_deref(), Some("E.2023/123, K.2024/15"));
        assert_eq!(gazette.as_deref(), Some("12.06.2024 - 32574"));
    }
}
