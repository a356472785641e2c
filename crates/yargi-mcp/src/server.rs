//! MCP server: adapter singletons plus the tool surface.
//!
//! Every adapter capability is registered as one tool with a schema derived
//! from its argument struct. Handlers validate inputs, call the adapter and
//! return its typed result as a JSON object; adapter failures become
//! structured tool errors via [`crate::error::to_tool_error`].

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use serde::{Deserialize, Serialize};
use tracing::info;

use yargi_core::anayasa::{self, AnayasaNormClient};
use yargi_core::anayasa_bireysel::AnayasaBireyselClient;
use yargi_core::bedesten::{self, BedestenClient, CourtKind};
use yargi_core::danistay::{self, DanistayClient};
use yargi_core::emsal::{self, EmsalClient};
use yargi_core::kik::{self, KikClient};
use yargi_core::rekabet::{self, RekabetClient};
use yargi_core::uyusmazlik::{self, UyusmazlikClient};
use yargi_core::yargitay::{self, YargitayClient};

use crate::error::to_tool_error;
use crate::validate;

fn ok_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_value(value)
        .map_err(|e| McpError::internal_error(format!("result serialization: {e}"), None))?;
    Ok(CallToolResult::structured(json))
}

const fn default_page() -> u32 {
    1
}
const fn default_page_size() -> u32 {
    10
}
fn default_sort_by_date() -> String {
    "3".to_string()
}
fn default_sort_by_esas() -> String {
    "1".to_string()
}
fn default_desc() -> String {
    "desc".to_string()
}

// --- Tool argument structs -------------------------------------------------

/// Arguments for `search_yargitay_detailed`.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct YargitayDetailedArgs {
    /// Keyword to search. Upstream operators: space=OR, `"…"`=exact phrase,
    /// `+`=AND, `*`=wildcard, `-`=exclude.
    #[serde(rename = "arananKelime", default)]
    pub aranan_kelime: String,
    /// Chamber/board selection; empty string for all 52 options.
    #[serde(rename = "birimYrgKurulDaire", default)]
    pub birim_yrg_kurul_daire: String,
    /// Case year for `Esas No` (YYYY).
    #[serde(rename = "esasYil", default)]
    pub esas_yil: String,
    /// Starting sequence number for `Esas No`.
    #[serde(rename = "esasIlkSiraNo", default)]
    pub esas_ilk_sira_no: String,
    /// Ending sequence number for `Esas No`.
    #[serde(rename = "esasSonSiraNo", default)]
    pub esas_son_sira_no: String,
    /// Decision year for `Karar No` (YYYY).
    #[serde(rename = "kararYil", default)]
    pub karar_yil: String,
    /// Starting sequence number for `Karar No`.
    #[serde(rename = "kararIlkSiraNo", default)]
    pub karar_ilk_sira_no: String,
    /// Ending sequence number for `Karar No`.
    #[serde(rename = "kararSonSiraNo", default)]
    pub karar_son_sira_no: String,
    /// Start date for the decision search (DD.MM.YYYY).
    #[serde(rename = "baslangicTarihi", default)]
    pub baslangic_tarihi: String,
    /// End date for the decision search (DD.MM.YYYY).
    #[serde(rename = "bitisTarihi", default)]
    pub bitis_tarihi: String,
    /// Sorting criterion: 1 Esas No, 2 Karar No, 3 Karar Tarihi.
    #[serde(default = "default_sort_by_date")]
    pub siralama: String,
    /// Sorting direction, `asc` or `desc`.
    #[serde(rename = "siralamaDirection", default = "default_desc")]
    pub siralama_direction: String,
    /// Results per page (1-100).
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: u32,
    /// Page number to retrieve (1-indexed).
    #[serde(rename = "pageNumber", default = "default_page")]
    pub page_number: u32,
}

/// Arguments for the paginated document tools keyed by an id.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DocumentByIdArgs {
    /// Document id from previous search results.
    pub id: String,
    /// 1-indexed page of the 5,000-character Markdown chunking.
    #[serde(default = "default_page")]
    pub page_number: u32,
}

/// Arguments for `search_danistay_by_keyword`.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DanistayKeywordArgs {
    /// Keywords combined with AND.
    #[serde(rename = "andKelimeler", default)]
    pub and_kelimeler: Vec<String>,
    /// Keywords combined with OR.
    #[serde(rename = "orKelimeler", default)]
    pub or_kelimeler: Vec<String>,
    /// Keywords excluded with AND semantics.
    #[serde(rename = "notAndKelimeler", default)]
    pub not_and_kelimeler: Vec<String>,
    /// Keywords excluded with OR semantics.
    #[serde(rename = "notOrKelimeler", default)]
    pub not_or_kelimeler: Vec<String>,
    /// Results per page (1-100).
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: u32,
    /// Page number to retrieve (1-indexed).
    #[serde(rename = "pageNumber", default = "default_page")]
    pub page_number: u32,
}

/// Arguments for `search_danistay_detailed`.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DanistayDetailedArgs {
    /// Chamber/board name (e.g. `1. Daire`); omit or empty for all.
    #[serde(default)]
    pub daire: Option<String>,
    /// Case year for `Esas No`.
    #[serde(rename = "esasYil", default)]
    pub esas_yil: Option<String>,
    /// Starting sequence number for `Esas No`.
    #[serde(rename = "esasIlkSiraNo", default)]
    pub esas_ilk_sira_no: Option<String>,
    /// Ending sequence number for `Esas No`.
    #[serde(rename = "esasSonSiraNo", default)]
    pub esas_son_sira_no: Option<String>,
    /// Decision year for `Karar No`.
    #[serde(rename = "kararYil", default)]
    pub karar_yil: Option<String>,
    /// Starting sequence number for `Karar No`.
    #[serde(rename = "kararIlkSiraNo", default)]
    pub karar_ilk_sira_no: Option<String>,
    /// Ending sequence number for `Karar No`.
    #[serde(rename = "kararSonSiraNo", default)]
    pub karar_son_sira_no: Option<String>,
    /// Start date for the decision (DD.MM.YYYY).
    #[serde(rename = "baslangicTarihi", default)]
    pub baslangic_tarihi: Option<String>,
    /// End date for the decision (DD.MM.YYYY).
    #[serde(rename = "bitisTarihi", default)]
    pub bitis_tarihi: Option<String>,
    /// Legislation number.
    #[serde(rename = "mevzuatNumarasi", default)]
    pub mevzuat_numarasi: Option<String>,
    /// Legislation name.
    #[serde(rename = "mevzuatAdi", default)]
    pub mevzuat_adi: Option<String>,
    /// Article number.
    #[serde(default)]
    pub madde: Option<String>,
    /// Sorting criterion.
    #[serde(default = "default_sort_by_esas")]
    pub siralama: String,
    /// Sorting direction, `asc` or `desc`.
    #[serde(rename = "siralamaDirection", default = "default_desc")]
    pub siralama_direction: String,
    /// Results per page (1-100).
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: u32,
    /// Page number to retrieve (1-indexed).
    #[serde(rename = "pageNumber", default = "default_page")]
    pub page_number: u32,
}

/// Arguments for `search_emsal_detailed_decisions`.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct EmsalDetailedArgs {
    /// Keyword to search.
    #[serde(default)]
    pub keyword: Option<String>,
    /// Selected BAM civil court.
    #[serde(default)]
    pub selected_bam_civil_court: Option<String>,
    /// Selected civil court.
    #[serde(default)]
    pub selected_civil_court: Option<String>,
    /// Selected regional civil chambers.
    #[serde(default)]
    pub selected_regional_civil_chambers: Vec<String>,
    /// Case year for `Esas No`.
    #[serde(default)]
    pub case_year_esas: Option<String>,
    /// Starting sequence for `Esas No`.
    #[serde(default)]
    pub case_start_seq_esas: Option<String>,
    /// Ending sequence for `Esas No`.
    #[serde(default)]
    pub case_end_seq_esas: Option<String>,
    /// Decision year for `Karar No`.
    #[serde(default)]
    pub decision_year_karar: Option<String>,
    /// Starting sequence for `Karar No`.
    #[serde(default)]
    pub decision_start_seq_karar: Option<String>,
    /// Ending sequence for `Karar No`.
    #[serde(default)]
    pub decision_end_seq_karar: Option<String>,
    /// Start date for the decision (DD.MM.YYYY).
    #[serde(default)]
    pub start_date: Option<String>,
    /// End date for the decision (DD.MM.YYYY).
    #[serde(default)]
    pub end_date: Option<String>,
    /// Sorting criterion.
    #[serde(default = "default_sort_by_esas")]
    pub sort_criteria: String,
    /// Sorting direction, `asc` or `desc`.
    #[serde(default = "default_desc")]
    pub sort_direction: String,
    /// Page number to retrieve (1-indexed).
    #[serde(default = "default_page")]
    pub page_number: u32,
    /// Results per page (1-100).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// Arguments for `search_uyusmazlik_decisions`.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UyusmazlikArgs {
    /// Keyword or content for the main text search.
    #[serde(default)]
    pub icerik: String,
    /// Section (Bölüm) selection.
    #[serde(default)]
    pub bolum: Option<uyusmazlik::Bolum>,
    /// Dispute-type selection.
    #[serde(default)]
    pub uyusmazlik_turu: Option<uyusmazlik::UyusmazlikTuru>,
    /// Desired outcome types.
    #[serde(default)]
    pub karar_sonuclari: Vec<uyusmazlik::KararSonucu>,
    /// Case year (`Esas Yılı`).
    #[serde(default)]
    pub esas_yil: String,
    /// Case number (`Esas Sayısı`).
    #[serde(default)]
    pub esas_sayisi: String,
    /// Decision year (`Karar Yılı`).
    #[serde(default)]
    pub karar_yil: String,
    /// Decision number (`Karar Sayısı`).
    #[serde(default)]
    pub karar_sayisi: String,
    /// Relevant law number.
    #[serde(default)]
    pub kanun_no: String,
    /// Decision start date (DD.MM.YYYY).
    #[serde(default)]
    pub karar_date_begin: String,
    /// Decision end date (DD.MM.YYYY).
    #[serde(default)]
    pub karar_date_end: String,
    /// Official Gazette number.
    #[serde(default)]
    pub resmi_gazete_sayi: String,
    /// Official Gazette date (DD.MM.YYYY).
    #[serde(default)]
    pub resmi_gazete_date: String,
    /// Exact phrase search.
    #[serde(default)]
    pub tumce: String,
    /// Phrase-with-inflections search.
    #[serde(default)]
    pub wild_card: String,
    /// All-of-these-words search.
    #[serde(default)]
    pub hepsi: String,
    /// Any-of-these-words search.
    #[serde(default)]
    pub herhangi_birisi: String,
    /// None-of-these-words search.
    #[serde(default)]
    pub not_hepsi: String,
}

/// Arguments for `get_uyusmazlik_document_markdown_from_url`.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UyusmazlikDocumentArgs {
    /// Full URL of the decision page from search results.
    pub document_url: String,
    /// 1-indexed page of the 5,000-character Markdown chunking.
    #[serde(default = "default_page")]
    pub page_number: u32,
}

/// Arguments for `search_anayasa_norm_denetimi_decisions`.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AnayasaNormArgs {
    /// Keywords, all required.
    #[serde(default)]
    pub keywords_all: Vec<String>,
    /// Keywords, any may match.
    #[serde(default)]
    pub keywords_any: Vec<String>,
    /// Keywords that must not appear.
    #[serde(default)]
    pub keywords_exclude: Vec<String>,
    /// Constitutional period.
    #[serde(default)]
    pub period: Option<anayasa::Donem>,
    /// Case registry number, e.g. `2023/123`.
    #[serde(default)]
    pub case_number_esas: Option<String>,
    /// Decision number, e.g. `2023/456`.
    #[serde(default)]
    pub decision_number_karar: Option<String>,
    /// First review start date (DD/MM/YYYY).
    #[serde(default)]
    pub first_review_date_start: Option<String>,
    /// First review end date (DD/MM/YYYY).
    #[serde(default)]
    pub first_review_date_end: Option<String>,
    /// Decision start date (DD/MM/YYYY).
    #[serde(default)]
    pub decision_date_start: Option<String>,
    /// Decision end date (DD/MM/YYYY).
    #[serde(default)]
    pub decision_date_end: Option<String>,
    /// Application type.
    #[serde(default)]
    pub application_type: Option<anayasa::BasvuruTuru>,
    /// General applicant name.
    #[serde(default)]
    pub applicant_general_name: Option<String>,
    /// Specific applicant name.
    #[serde(default)]
    pub applicant_specific_name: Option<String>,
    /// Attending members' exact names.
    #[serde(default)]
    pub attending_members_names: Vec<String>,
    /// Rapporteur's exact name.
    #[serde(default)]
    pub rapporteur_name: Option<String>,
    /// Type of the reviewed norm.
    #[serde(default)]
    pub norm_type: Option<anayasa::NormTuru>,
    /// Number or name of the norm.
    #[serde(default)]
    pub norm_id_or_name: Option<String>,
    /// Article number of the norm.
    #[serde(default)]
    pub norm_article: Option<String>,
    /// Review types and outcomes.
    #[serde(default)]
    pub review_outcomes: Vec<anayasa::IncelemeSonucu>,
    /// Main reason for the outcome.
    #[serde(default)]
    pub reason_for_final_outcome: Option<anayasa::SonucGerekcesi>,
    /// Supporting Constitution article numbers.
    #[serde(default)]
    pub basis_constitution_article_numbers: Vec<String>,
    /// Official Gazette start date (DD/MM/YYYY).
    #[serde(default)]
    pub official_gazette_date_start: Option<String>,
    /// Official Gazette end date (DD/MM/YYYY).
    #[serde(default)]
    pub official_gazette_date_end: Option<String>,
    /// Official Gazette starting number.
    #[serde(default)]
    pub official_gazette_number_start: Option<String>,
    /// Official Gazette ending number.
    #[serde(default)]
    pub official_gazette_number_end: Option<String>,
    /// Press-release flag.
    #[serde(default)]
    pub has_press_release: Option<anayasa::VarYok>,
    /// Dissenting-opinion flag.
    #[serde(default)]
    pub has_dissenting_opinion: Option<anayasa::VarYok>,
    /// Different-reasoning flag.
    #[serde(default)]
    pub has_different_reasoning: Option<anayasa::VarYok>,
    /// Results per page: 10, 20, 30, 40 or 50.
    #[serde(default)]
    pub results_per_page: Option<u32>,
    /// Page number to fetch (1-indexed).
    #[serde(default = "default_page")]
    pub page_to_fetch: u32,
    /// Sort criterion: `KararTarihi`, `YayinTarihi` or `Toplam`.
    #[serde(default)]
    pub sort_by_criteria: Option<String>,
}

/// Arguments for `get_anayasa_norm_denetimi_document_markdown`.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AnayasaNormDocumentArgs {
    /// Decision page path (`/ND/YYYY/NN`) or full URL.
    pub document_url: String,
    /// 1-indexed page of the 5,000-character Markdown chunking.
    #[serde(default = "default_page")]
    pub page_number: u32,
}

/// Arguments for `search_anayasa_bireysel_basvuru_report`.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AnayasaBireyselReportArgs {
    /// Keywords, all required.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Page number to fetch (1-indexed).
    #[serde(default = "default_page")]
    pub page_to_fetch: u32,
}

/// Arguments for `get_anayasa_bireysel_basvuru_document_markdown`.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AnayasaBireyselDocumentArgs {
    /// Decision page path; must start with `/BB/` (e.g. `/BB/2021/20295`).
    pub document_url_path: String,
    /// 1-indexed page of the 5,000-character Markdown chunking.
    #[serde(default = "default_page")]
    pub page_number: u32,
}

fn default_kik_tipi() -> kik::KararTipi {
    kik::KararTipi::Uyusmazlik
}

/// Arguments for `search_kik_decisions`.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct KikSearchArgs {
    /// Decision type: `rbUyusmazlik`, `rbDuzenleyici` or `rbMahkeme`.
    #[serde(default = "default_kik_tipi")]
    pub karar_tipi: kik::KararTipi,
    /// Decision number, e.g. `2024/UH.II-1766`; `_` may stand in for `/`.
    #[serde(default)]
    pub karar_no: Option<String>,
    /// Decision start date (DD.MM.YYYY).
    #[serde(default)]
    pub karar_tarihi_baslangic: Option<String>,
    /// Decision end date (DD.MM.YYYY).
    #[serde(default)]
    pub karar_tarihi_bitis: Option<String>,
    /// Official Gazette number.
    #[serde(default)]
    pub resmi_gazete_sayisi: Option<String>,
    /// Official Gazette date (DD.MM.YYYY).
    #[serde(default)]
    pub resmi_gazete_tarihi: Option<String>,
    /// Tender subject of the application.
    #[serde(default)]
    pub basvuru_konusu_ihale: Option<String>,
    /// Applicant.
    #[serde(default)]
    pub basvuru_sahibi: Option<String>,
    /// Procuring entity.
    #[serde(default)]
    pub ihaleyi_yapan_idare: Option<String>,
    /// Decision year.
    #[serde(default)]
    pub yil: Option<String>,
    /// Keyword or phrase in the decision text.
    #[serde(default)]
    pub karar_metni: Option<String>,
    /// Results page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: u32,
}

/// Arguments for `get_kik_document_markdown`.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct KikDocumentArgs {
    /// Base64 decision id from `search_kik_decisions` results.
    pub karar_id: String,
    /// 1-indexed page of the 5,000-character Markdown chunking.
    #[serde(default = "default_page")]
    pub page_number: u32,
}

/// Arguments for `search_rekabet_kurumu_decisions`.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RekabetSearchArgs {
    /// Search in decision title.
    #[serde(rename = "sayfaAdi", default)]
    pub sayfa_adi: Option<String>,
    /// Publication date (DD.MM.YYYY).
    #[serde(rename = "YayinlanmaTarihi", default)]
    pub yayinlanma_tarihi: Option<String>,
    /// Search in decision text; double quotes request an exact phrase.
    #[serde(rename = "PdfText", default)]
    pub pdf_text: Option<String>,
    /// Decision type by its display name (e.g. `Rekabet İhlali`).
    #[serde(rename = "KararTuru", default)]
    pub karar_turu: Option<rekabet::KararTuru>,
    /// Decision number.
    #[serde(rename = "KararSayisi", default)]
    pub karar_sayisi: Option<String>,
    /// Decision date (DD.MM.YYYY).
    #[serde(rename = "KararTarihi", default)]
    pub karar_tarihi: Option<String>,
    /// Page number of the result list (1-indexed).
    #[serde(default = "default_page")]
    pub page: u32,
}

/// Arguments for `get_rekabet_kurumu_document`.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RekabetDocumentArgs {
    /// GUID of the decision from search results.
    pub karar_id: String,
    /// 1-indexed PDF page; one call returns exactly one PDF page.
    #[serde(default = "default_page")]
    pub page_number: u32,
}

/// Arguments for the Bedesten search tools that accept a chamber filter.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct BedestenSearchArgs {
    /// Search phrase; wrap in escaped double quotes for an exact phrase.
    #[serde(default)]
    pub phrase: String,
    /// Results per page (1-100).
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: u32,
    /// Page number to retrieve (1-indexed).
    #[serde(rename = "pageNumber", default = "default_page")]
    pub page_number: u32,
    /// Chamber filter; omit for all chambers.
    #[serde(rename = "birimAdi", default)]
    pub birim_adi: Option<String>,
    /// Decision start date (YYYY-MM-DDTHH:MM:SS.000Z).
    #[serde(rename = "kararTarihiStart", default)]
    pub karar_tarihi_start: Option<String>,
    /// Decision end date (YYYY-MM-DDTHH:MM:SS.000Z).
    #[serde(rename = "kararTarihiEnd", default)]
    pub karar_tarihi_end: Option<String>,
}

/// Arguments for the Bedesten search tools without a chamber filter.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct BedestenPlainSearchArgs {
    /// Search phrase; wrap in escaped double quotes for an exact phrase.
    #[serde(default)]
    pub phrase: String,
    /// Results per page (1-100).
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: u32,
    /// Page number to retrieve (1-indexed).
    #[serde(rename = "pageNumber", default = "default_page")]
    pub page_number: u32,
    /// Decision start date (YYYY-MM-DDTHH:MM:SS.000Z).
    #[serde(rename = "kararTarihiStart", default)]
    pub karar_tarihi_start: Option<String>,
    /// Decision end date (YYYY-MM-DDTHH:MM:SS.000Z).
    #[serde(rename = "kararTarihiEnd", default)]
    pub karar_tarihi_end: Option<String>,
}

/// Arguments for the Bedesten document tools.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct BedestenDocumentArgs {
    /// Document id from Bedesten search results.
    #[serde(rename = "documentId")]
    pub document_id: String,
}

// --- Server ----------------------------------------------------------------

/// The MCP server. Holds one long-lived client per source; cloning shares
/// them, which is what the per-session service factories need.
#[derive(Clone)]
pub struct YargiMcpServer {
    yargitay: Arc<YargitayClient>,
    danistay: Arc<DanistayClient>,
    emsal: Arc<EmsalClient>,
    uyusmazlik: Arc<UyusmazlikClient>,
    anayasa_norm: Arc<AnayasaNormClient>,
    anayasa_bireysel: Arc<AnayasaBireyselClient>,
    kik: Arc<KikClient>,
    rekabet: Arc<RekabetClient>,
    bedesten: Arc<BedestenClient>,
    tool_router: ToolRouter<Self>,
}

impl YargiMcpServer {
    /// Build every adapter client and the tool router.
    pub fn new() -> yargi_core::Result<Self> {
        Ok(Self {
            yargitay: Arc::new(YargitayClient::new()?),
            danistay: Arc::new(DanistayClient::new()?),
            emsal: Arc::new(EmsalClient::new()?),
            uyusmazlik: Arc::new(UyusmazlikClient::new()?),
            anayasa_norm: Arc::new(AnayasaNormClient::new()?),
            anayasa_bireysel: Arc::new(AnayasaBireyselClient::new()?),
            kik: Arc::new(KikClient::new()),
            rekabet: Arc::new(RekabetClient::new()?),
            bedesten: Arc::new(BedestenClient::new()?),
            tool_router: Self::tool_router(),
        })
    }

    /// Names of every registered tool, for the `/status` route.
    #[must_use]
    pub fn tool_names(&self) -> Vec<String> {
        self.tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect()
    }

    /// Fan out a close signal to every adapter. Best effort and idempotent;
    /// individual failures are logged, never surfaced.
    pub async fn close_all(&self) {
        self.yargitay.close();
        self.danistay.close();
        self.emsal.close();
        self.uyusmazlik.close();
        self.anayasa_norm.close();
        self.anayasa_bireysel.close();
        self.rekabet.close();
        self.bedesten.close();
        self.kik.close().await;
        info!("all adapters closed");
    }

    #[allow(clippy::too_many_arguments)]
    async fn bedesten_search(
        &self,
        tool: &'static str,
        kind: CourtKind,
        phrase: String,
        page_size: u32,
        page_number: u32,
        birim_adi: Option<String>,
        allowed_chambers: Option<&[&str]>,
        start: Option<String>,
        end: Option<String>,
    ) -> Result<CallToolResult, McpError> {
        validate::page_size(page_size)?;
        validate::page_number(page_number)?;
        if let Some(allowed) = allowed_chambers {
            validate::optional_chamber(birim_adi.as_deref(), allowed, "birimAdi")?;
        }
        info!(tool, page = page_number, page_size, "tool invoked");

        let request = bedesten::SearchRequest {
            court_kind: kind,
            phrase,
            birim_adi: birim_adi.filter(|b| !b.is_empty()),
            karar_tarihi_start: start,
            karar_tarihi_end: end,
            page_size,
            page_number,
        };
        let result = self
            .bedesten
            .search(&request)
            .await
            .map_err(|e| to_tool_error(&e))?;
        ok_json(&result)
    }

    async fn bedesten_document(
        &self,
        tool: &'static str,
        document_id: &str,
    ) -> Result<CallToolResult, McpError> {
        validate::non_empty(document_id, "documentId")?;
        info!(tool, "tool invoked");
        let document = self
            .bedesten
            .get_document_markdown(document_id)
            .await
            .map_err(|e| to_tool_error(&e))?;
        ok_json(&document)
    }
}

#[tool_router]
impl YargiMcpServer {
    /// Searches Court of Cassation (Yargıtay) decisions with detailed
    /// criteria against the official decision bank.
    #[tool(
        description = "Searches Yargıtay (Court of Cassation) decisions using detailed criteria: keyword with operators (space=OR, +word=AND, \"phrase\"=exact, word*=wildcard, -word=exclude), chamber (52 options incl. empty for all), case/decision number ranges, date range (DD.MM.YYYY) and sorting."
    )]
    async fn search_yargitay_detailed(
        &self,
        Parameters(args): Parameters<YargitayDetailedArgs>,
    ) -> Result<CallToolResult, McpError> {
        validate::page_size(args.page_size)?;
        validate::page_number(args.page_number)?;
        validate::chamber(&args.birim_yrg_kurul_daire, yargitay::CHAMBERS, "birimYrgKurulDaire")?;
        validate::sort_criterion(&args.siralama)?;
        validate::sort_direction(&args.siralama_direction)?;
        info!(
            tool = "search_yargitay_detailed",
            page = args.page_number,
            page_size = args.page_size,
            "tool invoked"
        );

        let request = yargitay::DetailedSearchRequest {
            aranan_kelime: args.aranan_kelime,
            birim_yrg_kurul_daire: args.birim_yrg_kurul_daire,
            birim_yrg_hukuk_daire: String::new(),
            birim_yrg_ceza_daire: String::new(),
            esas_yil: args.esas_yil,
            esas_ilk_sira_no: args.esas_ilk_sira_no,
            esas_son_sira_no: args.esas_son_sira_no,
            karar_yil: args.karar_yil,
            karar_ilk_sira_no: args.karar_ilk_sira_no,
            karar_son_sira_no: args.karar_son_sira_no,
            baslangic_tarihi: args.baslangic_tarihi,
            bitis_tarihi: args.bitis_tarihi,
            siralama: args.siralama,
            siralama_direction: args.siralama_direction,
            page_size: args.page_size,
            page_number: args.page_number,
        };
        let result = self
            .yargitay
            .search_detailed(&request)
            .await
            .map_err(|e| to_tool_error(&e))?;
        ok_json(&result)
    }

    /// Retrieves a Yargıtay decision as paginated Markdown.
    #[tool(
        description = "Retrieves a specific Yargıtay decision by its id and returns its content as Markdown, chunked into 5,000-character pages. Use the id field from search_yargitay_detailed results."
    )]
    async fn get_yargitay_document_markdown(
        &self,
        Parameters(args): Parameters<DocumentByIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        validate::non_empty(&args.id, "id")?;
        validate::page_number(args.page_number)?;
        info!(tool = "get_yargitay_document_markdown", page = args.page_number, "tool invoked");
        let document = self
            .yargitay
            .get_document_markdown(&args.id, args.page_number)
            .await
            .map_err(|e| to_tool_error(&e))?;
        ok_json(&document)
    }

    /// Searches Council of State decisions with Boolean keyword groups.
    #[tool(
        description = "Searches Danıştay (Council of State) decisions by keyword groups: AND, OR, NOT-AND and NOT-OR lists. Keywords are sent as exact phrases."
    )]
    async fn search_danistay_by_keyword(
        &self,
        Parameters(args): Parameters<DanistayKeywordArgs>,
    ) -> Result<CallToolResult, McpError> {
        validate::page_size(args.page_size)?;
        validate::page_number(args.page_number)?;
        info!(
            tool = "search_danistay_by_keyword",
            page = args.page_number,
            page_size = args.page_size,
            "tool invoked"
        );
        let request = danistay::KeywordSearchRequest {
            and_kelimeler: args.and_kelimeler,
            or_kelimeler: args.or_kelimeler,
            not_and_kelimeler: args.not_and_kelimeler,
            not_or_kelimeler: args.not_or_kelimeler,
            page_size: args.page_size,
            page_number: args.page_number,
        };
        let result = self
            .danistay
            .search_keyword(&request)
            .await
            .map_err(|e| to_tool_error(&e))?;
        ok_json(&result)
    }

    /// Searches Council of State decisions with detailed filters.
    #[tool(
        description = "Searches Danıştay (Council of State) decisions using detailed criteria: chamber, case/decision number ranges, date range (DD.MM.YYYY), legislation number/name and article, with sorting."
    )]
    async fn search_danistay_detailed(
        &self,
        Parameters(args): Parameters<DanistayDetailedArgs>,
    ) -> Result<CallToolResult, McpError> {
        validate::page_size(args.page_size)?;
        validate::page_number(args.page_number)?;
        validate::optional_chamber(args.daire.as_deref(), danistay::CHAMBERS, "daire")?;
        validate::sort_criterion(&args.siralama)?;
        validate::sort_direction(&args.siralama_direction)?;
        info!(
            tool = "search_danistay_detailed",
            page = args.page_number,
            page_size = args.page_size,
            "tool invoked"
        );
        let request = danistay::DetailedSearchRequest {
            daire: args.daire,
            esas_yil: args.esas_yil,
            esas_ilk_sira_no: args.esas_ilk_sira_no,
            esas_son_sira_no: args.esas_son_sira_no,
            karar_yil: args.karar_yil,
            karar_ilk_sira_no: args.karar_ilk_sira_no,
            karar_son_sira_no: args.karar_son_sira_no,
            baslangic_tarihi: args.baslangic_tarihi,
            bitis_tarihi: args.bitis_tarihi,
            mevzuat_numarasi: args.mevzuat_numarasi,
            mevzuat_adi: args.mevzuat_adi,
            madde: args.madde,
            siralama: args.siralama,
            siralama_direction: args.siralama_direction,
            page_size: args.page_size,
            page_number: args.page_number,
        };
        let result = self
            .danistay
            .search_detailed(&request)
            .await
            .map_err(|e| to_tool_error(&e))?;
        ok_json(&result)
    }

    /// Retrieves a Danıştay decision as paginated Markdown.
    #[tool(
        description = "Retrieves a specific Danıştay decision by its id and returns its content as Markdown, chunked into 5,000-character pages. Use the id field from Danıştay search results."
    )]
    async fn get_danistay_document_markdown(
        &self,
        Parameters(args): Parameters<DocumentByIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        validate::non_empty(&args.id, "id")?;
        validate::page_number(args.page_number)?;
        info!(tool = "get_danistay_document_markdown", page = args.page_number, "tool invoked");
        let document = self
            .danistay
            .get_document_markdown(&args.id, args.page_number)
            .await
            .map_err(|e| to_tool_error(&e))?;
        ok_json(&document)
    }

    /// Searches the UYAP precedent (Emsal) index.
    #[tool(
        description = "Searches Emsal (UYAP precedent) decisions using detailed criteria: keyword, court selections, case/decision number ranges and date range (DD.MM.YYYY), with sorting."
    )]
    async fn search_emsal_detailed_decisions(
        &self,
        Parameters(args): Parameters<EmsalDetailedArgs>,
    ) -> Result<CallToolResult, McpError> {
        validate::page_size(args.page_size)?;
        validate::page_number(args.page_number)?;
        validate::sort_direction(&args.sort_direction)?;
        info!(
            tool = "search_emsal_detailed_decisions",
            page = args.page_number,
            page_size = args.page_size,
            "tool invoked"
        );
        let request = emsal::SearchRequest {
            keyword: args.keyword,
            selected_bam_civil_court: args.selected_bam_civil_court,
            selected_civil_court: args.selected_civil_court,
            selected_regional_civil_chambers: args.selected_regional_civil_chambers,
            case_year_esas: args.case_year_esas,
            case_start_seq_esas: args.case_start_seq_esas,
            case_end_seq_esas: args.case_end_seq_esas,
            decision_year_karar: args.decision_year_karar,
            decision_start_seq_karar: args.decision_start_seq_karar,
            decision_end_seq_karar: args.decision_end_seq_karar,
            start_date: args.start_date,
            end_date: args.end_date,
            sort_criteria: args.sort_criteria,
            sort_direction: args.sort_direction,
            page_number: args.page_number,
            page_size: args.page_size,
        };
        let result = self
            .emsal
            .search_detailed(&request)
            .await
            .map_err(|e| to_tool_error(&e))?;
        ok_json(&result)
    }

    /// Retrieves an Emsal decision as paginated Markdown.
    #[tool(
        description = "Retrieves a specific Emsal decision by its id and returns its content as Markdown, chunked into 5,000-character pages. Use the id field from search_emsal_detailed_decisions results."
    )]
    async fn get_emsal_document_markdown(
        &self,
        Parameters(args): Parameters<DocumentByIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        validate::non_empty(&args.id, "id")?;
        validate::page_number(args.page_number)?;
        info!(tool = "get_emsal_document_markdown", page = args.page_number, "tool invoked");
        let document = self
            .emsal
            .get_document_markdown(&args.id, args.page_number)
            .await
            .map_err(|e| to_tool_error(&e))?;
        ok_json(&document)
    }

    /// Searches Court of Jurisdictional Disputes decisions.
    #[tool(
        description = "Searches Uyuşmazlık Mahkemesi (Court of Jurisdictional Disputes) decisions: section, dispute type, outcome list, case/decision numbers, gazette fields and five Boolean text modes. Dates are DD.MM.YYYY."
    )]
    async fn search_uyusmazlik_decisions(
        &self,
        Parameters(args): Parameters<UyusmazlikArgs>,
    ) -> Result<CallToolResult, McpError> {
        info!(tool = "search_uyusmazlik_decisions", bolum = ?args.bolum, "tool invoked");
        let request = uyusmazlik::SearchRequest {
            icerik: args.icerik,
            bolum: args.bolum.unwrap_or(uyusmazlik::Bolum::Tumu),
            uyusmazlik_turu: args
                .uyusmazlik_turu
                .unwrap_or(uyusmazlik::UyusmazlikTuru::Tumu),
            karar_sonuclari: args.karar_sonuclari,
            esas_yil: args.esas_yil,
            esas_sayisi: args.esas_sayisi,
            karar_yil: args.karar_yil,
            karar_sayisi: args.karar_sayisi,
            kanun_no: args.kanun_no,
            karar_date_begin: args.karar_date_begin,
            karar_date_end: args.karar_date_end,
            resmi_gazete_sayi: args.resmi_gazete_sayi,
            resmi_gazete_date: args.resmi_gazete_date,
            tumce: args.tumce,
            wild_card: args.wild_card,
            hepsi: args.hepsi,
            herhangi_birisi: args.herhangi_birisi,
            not_hepsi: args.not_hepsi,
        };
        let result = self
            .uyusmazlik
            .search(&request)
            .await
            .map_err(|e| to_tool_error(&e))?;
        ok_json(&result)
    }

    /// Retrieves an Uyuşmazlık decision from its full URL.
    #[tool(
        description = "Retrieves an Uyuşmazlık Mahkemesi decision from its full document URL (taken from search results) and returns its content as Markdown, chunked into 5,000-character pages."
    )]
    async fn get_uyusmazlik_document_markdown_from_url(
        &self,
        Parameters(args): Parameters<UyusmazlikDocumentArgs>,
    ) -> Result<CallToolResult, McpError> {
        validate::non_empty(&args.document_url, "document_url")?;
        validate::page_number(args.page_number)?;
        info!(
            tool = "get_uyusmazlik_document_markdown_from_url",
            page = args.page_number,
            "tool invoked"
        );
        let document = self
            .uyusmazlik
            .get_document_markdown(&args.document_url, args.page_number)
            .await
            .map_err(|e| to_tool_error(&e))?;
        ok_json(&document)
    }

    /// Searches Constitutional Court norm-control decisions.
    #[tool(
        description = "Searches Anayasa Mahkemesi norm-control (Norm Denetimi) decisions: keyword groups, period, case/decision numbers, four date ranges (DD/MM/YYYY), applicant/member/rapporteur names, norm type and article, review outcomes, outcome reason and gazette filters; resultsPerPage 10-50 and sorting."
    )]
    async fn search_anayasa_norm_denetimi_decisions(
        &self,
        Parameters(args): Parameters<AnayasaNormArgs>,
    ) -> Result<CallToolResult, McpError> {
        validate::page_number(args.page_to_fetch)?;
        if let Some(per_page) = args.results_per_page {
            if !anayasa::RESULTS_PER_PAGE_OPTIONS.contains(&per_page) {
                return Err(McpError::invalid_params(
                    format!("results_per_page must be one of 10, 20, 30, 40, 50, got {per_page}"),
                    None,
                ));
            }
        }
        if let Some(sort) = args.sort_by_criteria.as_deref() {
            if !anayasa::SORT_CRITERIA.contains(&sort) {
                return Err(McpError::invalid_params(
                    format!("sort_by_criteria must be one of KararTarihi, YayinTarihi, Toplam, got `{sort}`"),
                    None,
                ));
            }
        }
        info!(
            tool = "search_anayasa_norm_denetimi_decisions",
            page = args.page_to_fetch,
            "tool invoked"
        );
        let request = anayasa::NormSearchRequest {
            keywords_all: args.keywords_all,
            keywords_any: args.keywords_any,
            keywords_exclude: args.keywords_exclude,
            period: args.period,
            case_number_esas: args.case_number_esas,
            decision_number_karar: args.decision_number_karar,
            first_review_date_start: args.first_review_date_start,
            first_review_date_end: args.first_review_date_end,
            decision_date_start: args.decision_date_start,
            decision_date_end: args.decision_date_end,
            application_type: args.application_type,
            applicant_general_name: args.applicant_general_name,
            applicant_specific_name: args.applicant_specific_name,
            attending_members_names: args.attending_members_names,
            rapporteur_name: args.rapporteur_name,
            norm_type: args.norm_type,
            norm_id_or_name: args.norm_id_or_name,
            norm_article: args.norm_article,
            review_outcomes: args.review_outcomes,
            reason_for_final_outcome: args.reason_for_final_outcome,
            basis_constitution_article_numbers: args.basis_constitution_article_numbers,
            official_gazette_date_start: args.official_gazette_date_start,
            official_gazette_date_end: args.official_gazette_date_end,
            official_gazette_number_start: args.official_gazette_number_start,
            official_gazette_number_end: args.official_gazette_number_end,
            has_press_release: args.has_press_release,
            has_dissenting_opinion: args.has_dissenting_opinion,
            has_different_reasoning: args.has_different_reasoning,
            results_per_page: args.results_per_page,
            page_to_fetch: args.page_to_fetch,
            sort_by_criteria: args.sort_by_criteria,
        };
        let result = self
            .anayasa_norm
            .search(&request)
            .await
            .map_err(|e| to_tool_error(&e))?;
        ok_json(&result)
    }

    /// Retrieves a norm-control decision as paginated Markdown.
    #[tool(
        description = "Retrieves an Anayasa Mahkemesi norm-control decision from its page path (/ND/YYYY/NN) or full URL and returns its content as Markdown, chunked into 5,000-character pages, with metadata scraped from the page."
    )]
    async fn get_anayasa_norm_denetimi_document_markdown(
        &self,
        Parameters(args): Parameters<AnayasaNormDocumentArgs>,
    ) -> Result<CallToolResult, McpError> {
        validate::non_empty(&args.document_url, "document_url")?;
        validate::page_number(args.page_number)?;
        info!(
            tool = "get_anayasa_norm_denetimi_document_markdown",
            page = args.page_number,
            "tool invoked"
        );
        let document = self
            .anayasa_norm
            .get_document_markdown(&args.document_url, args.page_number)
            .await
            .map_err(|e| to_tool_error(&e))?;
        ok_json(&document)
    }

    /// Searches the individual-application decision bulletin.
    #[tool(
        description = "Searches the Anayasa Mahkemesi individual-application (Bireysel Başvuru) decision bulletin report by keywords and page."
    )]
    async fn search_anayasa_bireysel_basvuru_report(
        &self,
        Parameters(args): Parameters<AnayasaBireyselReportArgs>,
    ) -> Result<CallToolResult, McpError> {
        validate::page_number(args.page_to_fetch)?;
        info!(
            tool = "search_anayasa_bireysel_basvuru_report",
            page = args.page_to_fetch,
            "tool invoked"
        );
        let request = yargi_core::anayasa_bireysel::ReportSearchRequest {
            keywords: args.keywords,
            page_to_fetch: args.page_to_fetch,
        };
        let result = self
            .anayasa_bireysel
            .search_report(&request)
            .await
            .map_err(|e| to_tool_error(&e))?;
        ok_json(&result)
    }

    /// Retrieves an individual-application decision as paginated Markdown.
    #[tool(
        description = "Retrieves an Anayasa Mahkemesi individual-application decision from its /BB/YYYY/NNNN page path and returns its content as Markdown, chunked into 5,000-character pages, with metadata scraped from the page."
    )]
    async fn get_anayasa_bireysel_basvuru_document_markdown(
        &self,
        Parameters(args): Parameters<AnayasaBireyselDocumentArgs>,
    ) -> Result<CallToolResult, McpError> {
        validate::non_empty(&args.document_url_path, "document_url_path")?;
        validate::page_number(args.page_number)?;
        info!(
            tool = "get_anayasa_bireysel_basvuru_document_markdown",
            page = args.page_number,
            "tool invoked"
        );
        let document = self
            .anayasa_bireysel
            .get_document_markdown(&args.document_url_path, args.page_number)
            .await
            .map_err(|e| to_tool_error(&e))?;
        ok_json(&document)
    }

    /// Searches Public Procurement Authority board decisions.
    #[tool(
        description = "Searches KİK (Public Procurement Authority) board decisions: decision type (rbUyusmazlik, rbDuzenleyici, rbMahkeme), decision number (underscores accepted for slashes), date range (DD.MM.YYYY), applicant, procuring entity, tender subject, body text, year and gazette fields."
    )]
    async fn search_kik_decisions(
        &self,
        Parameters(args): Parameters<KikSearchArgs>,
    ) -> Result<CallToolResult, McpError> {
        validate::page_number(args.page)?;
        info!(
            tool = "search_kik_decisions",
            tipi = args.karar_tipi.value(),
            page = args.page,
            "tool invoked"
        );
        let request = kik::SearchRequest {
            karar_tipi: args.karar_tipi,
            karar_no: args.karar_no,
            karar_tarihi_baslangic: args.karar_tarihi_baslangic,
            karar_tarihi_bitis: args.karar_tarihi_bitis,
            resmi_gazete_sayisi: args.resmi_gazete_sayisi,
            resmi_gazete_tarihi: args.resmi_gazete_tarihi,
            basvuru_konusu_ihale: args.basvuru_konusu_ihale,
            basvuru_sahibi: args.basvuru_sahibi,
            ihaleyi_yapan_idare: args.ihaleyi_yapan_idare,
            yil: args.yil,
            karar_metni: args.karar_metni,
            page: args.page,
        };
        let result = self
            .kik
            .search(&request)
            .await
            .map_err(|e| to_tool_error(&e))?;
        ok_json(&result)
    }

    /// Retrieves a KİK decision by its base64 composite id.
    #[tool(
        description = "Retrieves a KİK board decision by its base64 karar_id (encoding decisionType|decisionNumber) and returns its content as Markdown, chunked into 5,000-character pages. On failure the response is a document with error_message set rather than a tool error."
    )]
    async fn get_kik_document_markdown(
        &self,
        Parameters(args): Parameters<KikDocumentArgs>,
    ) -> Result<CallToolResult, McpError> {
        validate::non_empty(&args.karar_id, "karar_id")?;
        validate::page_number(args.page_number)?;
        info!(tool = "get_kik_document_markdown", page = args.page_number, "tool invoked");
        let document = self
            .kik
            .get_document_markdown(&args.karar_id, args.page_number)
            .await
            .map_err(|e| to_tool_error(&e))?;
        ok_json(&document)
    }

    /// Searches Competition Authority decisions.
    #[tool(
        description = "Searches Rekabet Kurumu (Competition Authority) decisions by title, publication date, decision text (double quotes for exact phrases), decision type display name, decision number and decision date (DD.MM.YYYY)."
    )]
    async fn search_rekabet_kurumu_decisions(
        &self,
        Parameters(args): Parameters<RekabetSearchArgs>,
    ) -> Result<CallToolResult, McpError> {
        validate::page_number(args.page)?;
        info!(tool = "search_rekabet_kurumu_decisions", page = args.page, "tool invoked");
        let request = rekabet::SearchRequest {
            sayfa_adi: args.sayfa_adi,
            yayinlanma_tarihi: args.yayinlanma_tarihi,
            pdf_text: args.pdf_text,
            karar_turu: args.karar_turu.unwrap_or(rekabet::KararTuru::Tumu),
            karar_sayisi: args.karar_sayisi,
            karar_tarihi: args.karar_tarihi,
            page: args.page,
        };
        let result = self
            .rekabet
            .search(&request)
            .await
            .map_err(|e| to_tool_error(&e))?;
        ok_json(&result)
    }

    /// Retrieves one PDF page of a Competition Authority decision.
    #[tool(
        description = "Retrieves a Rekabet Kurumu decision by its GUID karar_id. The decision PDF is located via the landing page; page_number selects one PDF page, which is returned as Markdown. total_pages equals the PDF's page count."
    )]
    async fn get_rekabet_kurumu_document(
        &self,
        Parameters(args): Parameters<RekabetDocumentArgs>,
    ) -> Result<CallToolResult, McpError> {
        validate::non_empty(&args.karar_id, "karar_id")?;
        validate::page_number(args.page_number)?;
        info!(tool = "get_rekabet_kurumu_document", page = args.page_number, "tool invoked");
        let document = self
            .rekabet
            .get_document(&args.karar_id, args.page_number)
            .await
            .map_err(|e| to_tool_error(&e))?;
        ok_json(&document)
    }

    /// Searches Yargıtay decisions through the shared Bedesten back-end.
    #[tool(
        description = "Searches Yargıtay decisions using the Bedesten back-end (alternative source, complements search_yargitay_detailed). Supports exact phrases via escaped double quotes, an optional chamber filter and ISO-8601-Z date range."
    )]
    async fn search_yargitay_bedesten(
        &self,
        Parameters(args): Parameters<BedestenSearchArgs>,
    ) -> Result<CallToolResult, McpError> {
        self.bedesten_search(
            "search_yargitay_bedesten",
            CourtKind::Yargitay,
            args.phrase,
            args.page_size,
            args.page_number,
            args.birim_adi,
            Some(yargitay::CHAMBERS),
            args.karar_tarihi_start,
            args.karar_tarihi_end,
        )
        .await
    }

    /// Retrieves a Yargıtay document from the Bedesten back-end.
    #[tool(
        description = "Retrieves a Yargıtay decision document from the Bedesten back-end and converts it to Markdown. Handles both HTML and PDF content. Use documentId from search_yargitay_bedesten results."
    )]
    async fn get_yargitay_bedesten_document_markdown(
        &self,
        Parameters(args): Parameters<BedestenDocumentArgs>,
    ) -> Result<CallToolResult, McpError> {
        self.bedesten_document("get_yargitay_bedesten_document_markdown", &args.document_id)
            .await
    }

    /// Searches Danıştay decisions through the shared Bedesten back-end.
    #[tool(
        description = "Searches Danıştay decisions using the Bedesten back-end (alternative source, complements the other Danıştay search tools). Supports exact phrases via escaped double quotes, an optional chamber filter and ISO-8601-Z date range."
    )]
    async fn search_danistay_bedesten(
        &self,
        Parameters(args): Parameters<BedestenSearchArgs>,
    ) -> Result<CallToolResult, McpError> {
        self.bedesten_search(
            "search_danistay_bedesten",
            CourtKind::Danistay,
            args.phrase,
            args.page_size,
            args.page_number,
            args.birim_adi,
            Some(danistay::CHAMBERS),
            args.karar_tarihi_start,
            args.karar_tarihi_end,
        )
        .await
    }

    /// Retrieves a Danıştay document from the Bedesten back-end.
    #[tool(
        description = "Retrieves a Danıştay decision document from the Bedesten back-end and converts it to Markdown. Handles both HTML and PDF content. Use documentId from search_danistay_bedesten results."
    )]
    async fn get_danistay_bedesten_document_markdown(
        &self,
        Parameters(args): Parameters<BedestenDocumentArgs>,
    ) -> Result<CallToolResult, McpError> {
        self.bedesten_document("get_danistay_bedesten_document_markdown", &args.document_id)
            .await
    }

    /// Searches local civil court decisions.
    #[tool(
        description = "Searches Yerel Hukuk Mahkemesi (local civil court) decisions using the Bedesten back-end, the only source for first-instance civil decisions. Supports exact phrases via escaped double quotes and ISO-8601-Z date range."
    )]
    async fn search_yerel_hukuk_bedesten(
        &self,
        Parameters(args): Parameters<BedestenPlainSearchArgs>,
    ) -> Result<CallToolResult, McpError> {
        self.bedesten_search(
            "search_yerel_hukuk_bedesten",
            CourtKind::YerelHukuk,
            args.phrase,
            args.page_size,
            args.page_number,
            None,
            None,
            args.karar_tarihi_start,
            args.karar_tarihi_end,
        )
        .await
    }

    /// Retrieves a local civil court document from the Bedesten back-end.
    #[tool(
        description = "Retrieves a Yerel Hukuk Mahkemesi decision document from the Bedesten back-end and converts it to Markdown. Use documentId from search_yerel_hukuk_bedesten results."
    )]
    async fn get_yerel_hukuk_bedesten_document_markdown(
        &self,
        Parameters(args): Parameters<BedestenDocumentArgs>,
    ) -> Result<CallToolResult, McpError> {
        self.bedesten_document(
            "get_yerel_hukuk_bedesten_document_markdown",
            &args.document_id,
        )
        .await
    }

    /// Searches civil appellate court decisions.
    #[tool(
        description = "Searches İstinaf Hukuk Mahkemesi (civil court of appeals) decisions using the Bedesten back-end. Supports exact phrases via escaped double quotes and ISO-8601-Z date range."
    )]
    async fn search_istinaf_hukuk_bedesten(
        &self,
        Parameters(args): Parameters<BedestenPlainSearchArgs>,
    ) -> Result<CallToolResult, McpError> {
        self.bedesten_search(
            "search_istinaf_hukuk_bedesten",
            CourtKind::IstinafHukuk,
            args.phrase,
            args.page_size,
            args.page_number,
            None,
            None,
            args.karar_tarihi_start,
            args.karar_tarihi_end,
        )
        .await
    }

    /// Retrieves a civil appellate document from the Bedesten back-end.
    #[tool(
        description = "Retrieves an İstinaf Hukuk Mahkemesi decision document from the Bedesten back-end and converts it to Markdown. Use documentId from search_istinaf_hukuk_bedesten results."
    )]
    async fn get_istinaf_hukuk_bedesten_document_markdown(
        &self,
        Parameters(args): Parameters<BedestenDocumentArgs>,
    ) -> Result<CallToolResult, McpError> {
        self.bedesten_document(
            "get_istinaf_hukuk_bedesten_document_markdown",
            &args.document_id,
        )
        .await
    }

    /// Searches criminal appellate court decisions.
    #[tool(
        description = "Searches İstinaf Ceza Mahkemesi (criminal court of appeals) decisions using the Bedesten back-end. Supports exact phrases via escaped double quotes and ISO-8601-Z date range."
    )]
    async fn search_istinaf_ceza_bedesten(
        &self,
        Parameters(args): Parameters<BedestenPlainSearchArgs>,
    ) -> Result<CallToolResult, McpError> {
        self.bedesten_search(
            "search_istinaf_ceza_bedesten",
            CourtKind::IstinafCeza,
            args.phrase,
            args.page_size,
            args.page_number,
            None,
            None,
            args.karar_tarihi_start,
            args.karar_tarihi_end,
        )
        .await
    }

    /// Retrieves a criminal appellate document from the Bedesten back-end.
    #[tool(
        description = "Retrieves an İstinaf Ceza Mahkemesi decision document from the Bedesten back-end and converts it to Markdown. Use documentId from search_istinaf_ceza_bedesten results."
    )]
    async fn get_istinaf_ceza_bedesten_document_markdown(
        &self,
        Parameters(args): Parameters<BedestenDocumentArgs>,
    ) -> Result<CallToolResult, McpError> {
        self.bedesten_document(
            "get_istinaf_ceza_bedesten_document_markdown",
            &args.document_id,
        )
        .await
    }

    /// Searches extraordinary-appeal decisions.
    #[tool(
        description = "Searches Kanun Yararına Bozma (KYB, extraordinary appeal in the interest of law) decisions using the Bedesten back-end, the only source for KYB decisions. Supports exact phrases via escaped double quotes and ISO-8601-Z date range."
    )]
    async fn search_kyb_bedesten(
        &self,
        Parameters(args): Parameters<BedestenPlainSearchArgs>,
    ) -> Result<CallToolResult, McpError> {
        self.bedesten_search(
            "search_kyb_bedesten",
            CourtKind::Kyb,
            args.phrase,
            args.page_size,
            args.page_number,
            None,
            None,
            args.karar_tarihi_start,
            args.karar_tarihi_end,
        )
        .await
    }

    /// Retrieves a KYB document from the Bedesten back-end.
    #[tool(
        description = "Retrieves a Kanun Yararına Bozma (KYB) decision document from the Bedesten back-end and converts it to Markdown. Use documentId from search_kyb_bedesten results."
    )]
    async fn get_kyb_bedesten_document_markdown(
        &self,
        Parameters(args): Parameters<BedestenDocumentArgs>,
    ) -> Result<CallToolResult, McpError> {
        self.bedesten_document("get_kyb_bedesten_document_markdown", &args.document_id)
            .await
    }
}

#[tool_handler]
impl ServerHandler for YargiMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "yargi-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "MCP server for Turkish legal databases (Yargıtay, Danıştay, Emsal, \
                 Uyuşmazlık, Anayasa Mahkemesi norm control and individual application, \
                 KİK, Rekabet Kurumu, Bedesten)."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn server() -> YargiMcpServer {
        YargiMcpServer::new().unwrap()
    }

    #[test]
    fn every_spec_tool_is_registered() {
        let names = server().tool_names();
        let expected = [
            "search_yargitay_detailed",
            "get_yargitay_document_markdown",
            "search_danistay_by_keyword",
            "search_danistay_detailed",
            "get_danistay_document_markdown",
            "search_emsal_detailed_decisions",
            "get_emsal_document_markdown",
            "search_uyusmazlik_decisions",
            "get_uyusmazlik_document_markdown_from_url",
            "search_anayasa_norm_denetimi_decisions",
            "get_anayasa_norm_denetimi_document_markdown",
            "search_anayasa_bireysel_basvuru_report",
            "get_anayasa_bireysel_basvuru_document_markdown",
            "search_kik_decisions",
            "get_kik_document_markdown",
            "search_rekabet_kurumu_decisions",
            "get_rekabet_kurumu_document",
            "search_yargitay_bedesten",
            "get_yargitay_bedesten_document_markdown",
            "search_danistay_bedesten",
            "get_danistay_bedesten_document_markdown",
            "search_yerel_hukuk_bedesten",
            "get_yerel_hukuk_bedesten_document_markdown",
            "search_istinaf_hukuk_bedesten",
            "get_istinaf_hukuk_bedesten_document_markdown",
            "search_istinaf_ceza_bedesten",
            "get_istinaf_ceza_bedesten_document_markdown",
            "search_kyb_bedesten",
            "get_kyb_bedesten_document_markdown",
        ];
        for tool in expected {
            assert!(names.iter().any(|n| n == tool), "missing tool {tool}");
        }
        assert_eq!(names.len(), expected.len());
    }

    #[test]
    fn args_deserialize_with_defaults() {
        let args: YargitayDetailedArgs = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(args.page_number, 1);
        assert_eq!(args.page_size, 10);
        assert_eq!(args.siralama, "3");
        assert_eq!(args.siralama_direction, "desc");
        assert_eq!(args.birim_yrg_kurul_daire, "");

        let args: BedestenSearchArgs = serde_json::from_value(serde_json::json!({
            "phrase": "\"mülkiyet\"",
            "birimAdi": "1. Hukuk Dairesi"
        }))
        .unwrap();
        assert_eq!(args.page_size, 10);
        assert_eq!(args.birim_adi.as_deref(), Some("1. Hukuk Dairesi"));
    }

    #[tokio::test]
    async fn page_size_101_is_rejected_before_any_network_call() {
        let server = server();
        let args: YargitayDetailedArgs = serde_json::from_value(serde_json::json!({
            "pageSize": 101
        }))
        .unwrap();
        let err = server
            .search_yargitay_detailed(Parameters(args))
            .await
            .unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unknown_chamber_is_rejected() {
        let server = server();
        let args: YargitayDetailedArgs = serde_json::from_value(serde_json::json!({
            "birimYrgKurulDaire": "42. Uzay Dairesi"
        }))
        .unwrap();
        let err = server
            .search_yargitay_detailed(Parameters(args))
            .await
            .unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("42. Uzay Dairesi"));
    }

    #[tokio::test]
    async fn bedesten_chamber_validation_uses_the_right_set() {
        let server = server();
        // A Danıştay chamber is not valid for the Yargıtay kind.
        let args: BedestenSearchArgs = serde_json::from_value(serde_json::json!({
            "phrase": "test",
            "birimAdi": "17. Daire"
        }))
        .unwrap();
        let err = server
            .search_yargitay_bedesten(Parameters(args))
            .await
            .unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn empty_document_id_is_rejected() {
        let server = server();
        let args: DocumentByIdArgs =
            serde_json::from_value(serde_json::json!({"id": "  "})).unwrap();
        let err = server
            .get_yargitay_document_markdown(Parameters(args))
            .await
            .unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn get_info_reports_tool_capability() {
        let info = server().get_info();
        assert_eq!(info.server_info.name, "yargi-mcp");
        assert!(info.capabilities.tools.is_some());
    }
}
