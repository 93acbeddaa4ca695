//! Reads a SAJ process page.
//!
//! Pure functions over the HTML body so the decision logic can be tested
//! without the portal.

use crate::{EscalationReason, PrimaryOutcome};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use shared::text::{clean_respondent_name, contains_ci, normalize_ws};
use shared::{Field, Resolution, Sentinel};
use std::sync::LazyLock;

const TRANSFER_PHRASE: &str = "processo transferido para o projudi";
const NO_MOVEMENTS_PHRASE: &str = "não há movimentações";

const PASSIVE_ROLES: &[&str] = &["executado", "embargante", "requerido", "réu"];
const ACTIVE_ROLES: &[&str] = &["exequente", "embargado", "requerente"];

static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}/\d{2}/\d{4}").expect("valid date pattern"));

struct Selectors {
    parties: Selector,
    party_row: Selector,
    role: Selector,
    party_name: Selector,
    all_movements: Selector,
    recent_movements: Selector,
    movement_row: Selector,
    movement_date: Selector,
    movement_description: Selector,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(|| Selectors {
    parties: selector("table#tablePartesPrincipais"),
    party_row: selector("tr"),
    role: selector("span.tipoDeParticipacao"),
    party_name: selector("td.nomeParteEAdvogado"),
    all_movements: selector("table#tabelaTodasMovimentacoes"),
    recent_movements: selector("tbody#tabelaUltimasMovimentacoes"),
    movement_row: selector("tr.fundoClaro, tr.fundoEscuro"),
    movement_date: selector("td.dataMovimentacao"),
    movement_description: selector("td.descricaoMovimentacao"),
});

/// Decides whether a SAJ page answers the lookup or the secondary tier must be consulted.
pub fn inspect_page(html: &str) -> PrimaryOutcome {
    let document = Html::parse_document(html);
    let respondent = Field::from_option(find_respondent(&document), Sentinel::NotAvailable);

    if let Some(row) = first_movement_row(&document) {
        let date = row
            .select(&SELECTORS.movement_date)
            .next()
            .and_then(|cell| DATE.find(&text_of(cell)).map(|m| m.as_str().to_string()));
        let description = row
            .select(&SELECTORS.movement_description)
            .next()
            .map(text_of);

        let description = Field::from_option(description, Sentinel::DescriptionNotFound);
        if description
            .value()
            .is_some_and(|d| contains_ci(d, TRANSFER_PHRASE))
        {
            return PrimaryOutcome::Escalate(EscalationReason::Transferred);
        }

        return PrimaryOutcome::Terminal(Resolution::found(
            Field::from_option(date, Sentinel::DateNotFound),
            description,
            respondent,
        ));
    }

    let page_text = document.root_element().text().collect::<String>();
    if contains_ci(&page_text, TRANSFER_PHRASE) {
        PrimaryOutcome::Escalate(EscalationReason::Transferred)
    } else if contains_ci(&page_text, NO_MOVEMENTS_PHRASE) {
        PrimaryOutcome::Escalate(EscalationReason::NoMovements)
    } else {
        PrimaryOutcome::Escalate(EscalationReason::MovementsUnavailable)
    }
}

fn first_movement_row(document: &Html) -> Option<ElementRef<'_>> {
    let table = document
        .select(&SELECTORS.all_movements)
        .next()
        .or_else(|| document.select(&SELECTORS.recent_movements).next())?;
    table.select(&SELECTORS.movement_row).next()
}

// First party whose role is passive and not also active.
fn find_respondent(document: &Html) -> Option<String> {
    let parties = document.select(&SELECTORS.parties).next()?;
    parties.select(&SELECTORS.party_row).find_map(|row| {
        let role = text_of(row.select(&SELECTORS.role).next()?).to_lowercase();
        let passive = PASSIVE_ROLES.iter().any(|term| role.contains(term));
        let active = ACTIVE_ROLES.iter().any(|term| role.contains(term));
        if !passive || active {
            return None;
        }
        let name = clean_respondent_name(&text_of(row.select(&SELECTORS.party_name).next()?));
        (!name.is_empty()).then_some(name)
    })
}

fn text_of(element: ElementRef<'_>) -> String {
    normalize_ws(&element.text().collect::<Vec<_>>().join(" "))
}
