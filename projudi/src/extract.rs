//! Pure readers over HTML captured from PROJUDI pages.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use shared::text::{clean_respondent_name, normalize_ws};
use shared::{Field, Sentinel};
use std::sync::LazyLock;

pub const CONFIDENTIAL_MARKER: &str = "SEGREDO DE JUSTIÇA";

const RESPONDENT_LABELS: &[&str] = &["Requerido", "Executado", "Réu", "Embargante"];

static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}/\d{2}/\d{4}").expect("valid date pattern"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static TR: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static TD: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static LI: LazyLock<Selector> = LazyLock::new(|| selector("li"));
static UL_LI: LazyLock<Selector> = LazyLock::new(|| selector("ul li"));
static FORM_TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table.form"));
static FONT: LazyLock<Selector> = LazyLock::new(|| selector("font"));
static BOLD: LazyLock<Selector> = LazyLock::new(|| selector("b"));

/// What the search result row says about the process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RowSummary {
    pub respondent: Option<String>,
    pub confidential: bool,
}

/// The most recent entry of a movements table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Movement {
    pub date: Field,
    pub description: Field,
}

type RespondentStrategy = fn(ElementRef<'_>) -> Option<String>;

/// Tried in order; the first name found wins.
const RESPONDENT_STRATEGIES: &[RespondentStrategy] = &[labelled_form_block, label_scan];

/// Reads a search result row given as its `<tr>` outer HTML.
///
/// A confidentiality marker in any cell withholds the respondent.
pub fn summarize_row(row_html: &str) -> RowSummary {
    let fragment = Html::parse_fragment(&format!("<table><tbody>{row_html}</tbody></table>"));
    let Some(row) = fragment.select(&TR).next() else {
        return RowSummary::default();
    };

    if row
        .select(&TD)
        .any(|cell| text_of(cell).contains(CONFIDENTIAL_MARKER))
    {
        return RowSummary {
            respondent: None,
            confidential: true,
        };
    }

    let respondent = RESPONDENT_STRATEGIES
        .iter()
        .filter_map(|strategy| strategy(row))
        .map(|name| clean_respondent_name(&name))
        .find(|name| !name.is_empty());

    RowSummary {
        respondent,
        confidential: false,
    }
}

/// Reads the first row of a movements table given as its `<tbody>` outer HTML.
///
/// Returns `None` when the table has no rows.
pub fn first_movement(tbody_html: &str) -> Option<Movement> {
    let fragment = Html::parse_fragment(&format!("<table>{tbody_html}</table>"));
    let row = fragment.select(&TR).next()?;
    let cells: Vec<_> = row.select(&TD).collect();

    let date = cells
        .get(2)
        .and_then(|cell| DATE.find(&text_of(*cell)).map(|m| m.as_str().to_string()));

    let description = match cells.get(3) {
        Some(cell) => {
            let text = cell
                .select(&BOLD)
                .next()
                .map(text_of)
                .filter(|bold| !bold.is_empty())
                .unwrap_or_else(|| text_of(*cell));
            Field::from_text(text, Sentinel::DescriptionNotFound)
        }
        None => Field::Missing(Sentinel::MovementNotFound),
    };

    Some(Movement {
        date: Field::from_option(date, Sentinel::DateNotFound),
        description,
    })
}

// The parties column holds a nested form table whose "Requerido:" label sits in
// one cell and the name list in the next.
fn labelled_form_block(row: ElementRef<'_>) -> Option<String> {
    let parties = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "td")
        .nth(2)?;
    let form = parties.select(&FORM_TABLE).next()?;
    let label = form
        .select(&FONT)
        .find(|font| text_of(*font).contains("Requerido:"))?;
    let label_cell = parent_element(label)?;
    let label_row = parent_element(label_cell)?;
    let name_cell = label_row.select(&TD).nth(1)?;
    first_item(name_cell, &LI)
}

// Any cell mentioning a respondent label, with the name list in the following cell.
fn label_scan(row: ElementRef<'_>) -> Option<String> {
    let cells: Vec<_> = row.select(&TD).collect();
    cells.iter().enumerate().find_map(|(i, cell)| {
        let text = text_of(*cell);
        if !RESPONDENT_LABELS.iter().any(|label| text.contains(label)) {
            return None;
        }
        first_item(*cells.get(i + 1)?, &UL_LI)
    })
}

fn first_item(cell: ElementRef<'_>, items: &Selector) -> Option<String> {
    let item = text_of(cell.select(items).next()?);
    (!item.is_empty()).then_some(item)
}

fn parent_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.parent().and_then(ElementRef::wrap)
}

fn text_of(element: ElementRef<'_>) -> String {
    normalize_ws(&element.text().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORM_ROW: &str = r#"
        <tr>
          <td><a href="processo.do?id=1">0000123-45.2020.8.04.0001</a></td>
          <td>Execução de Título Extrajudicial</td>
          <td>
            <table class="form">
              <tr><td><font>Requerente:</font></td><td><ul><li>Banco Credor S/A</li></ul></td></tr>
              <tr><td><font>Requerido:</font></td><td><ul><li>João  da Silva Advogado: Fulano</li><li>Outro</li></ul></td></tr>
            </table>
          </td>
          <td>12/03/2024</td>
        </tr>"#;

    #[test]
    fn test_form_block_strategy() {
        assert_eq!(
            summarize_row(FORM_ROW),
            RowSummary {
                respondent: Some("João da Silva".into()),
                confidential: false,
            }
        );
    }

    #[test]
    fn test_label_scan_strategy() {
        let row = r#"
            <tr>
              <td>0000123-45.2020.8.04.0001</td>
              <td>Executado:</td>
              <td><ul><li>(Parte Executada): Comércio Exemplo Ltda</li></ul></td>
            </tr>"#;
        assert_eq!(
            summarize_row(row).respondent.as_deref(),
            Some("Comércio Exemplo Ltda")
        );
    }

    #[test]
    fn test_confidential_row_withholds_respondent() {
        let row = r#"
            <tr>
              <td>0000123-45.2020.8.04.0001</td>
              <td>SEGREDO DE JUSTIÇA</td>
              <td>Requerido:</td>
              <td><ul><li>Nome Sigiloso</li></ul></td>
            </tr>"#;
        assert_eq!(
            summarize_row(row),
            RowSummary {
                respondent: None,
                confidential: true,
            }
        );
    }

    #[test]
    fn test_row_without_respondent() {
        let row = "<tr><td>0000123-45.2020.8.04.0001</td><td>Procedimento Comum</td></tr>";
        assert_eq!(summarize_row(row), RowSummary::default());
    }

    #[test]
    fn test_first_movement_prefers_bold_text() {
        let tbody = r#"
            <tbody>
              <tr>
                <td>3</td><td></td>
                <td>Data: 12/03/2024 10:15</td>
                <td><b>Juntada de Petição</b> <br/> detalhes da juntada</td>
              </tr>
              <tr><td>2</td><td></td><td>01/02/2024</td><td><b>Distribuição</b></td></tr>
            </tbody>"#;
        assert_eq!(
            first_movement(tbody),
            Some(Movement {
                date: Field::Value("12/03/2024".into()),
                description: Field::Value("Juntada de Petição".into()),
            })
        );
    }

    #[test]
    fn test_first_movement_falls_back_to_cell_text() {
        let tbody = "<tbody><tr><td>1</td><td></td><td>sem data</td><td> Conclusos  para decisão </td></tr></tbody>";
        assert_eq!(
            first_movement(tbody),
            Some(Movement {
                date: Field::Missing(Sentinel::DateNotFound),
                description: Field::Value("Conclusos para decisão".into()),
            })
        );
    }

    #[test]
    fn test_first_movement_short_row() {
        let tbody = "<tbody><tr><td>1</td><td>12/03/2024</td></tr></tbody>";
        assert_eq!(
            first_movement(tbody),
            Some(Movement {
                date: Field::Missing(Sentinel::DateNotFound),
                description: Field::Missing(Sentinel::MovementNotFound),
            })
        );
    }

    #[test]
    fn test_first_movement_empty_table() {
        assert_eq!(first_movement("<tbody></tbody>"), None);
    }
}
