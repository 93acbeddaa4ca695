//! Delimited-text input and output (CSV, semicolon-separated or TSV).

use shared::{MovementResult, ProcessNumber};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::mem::take;
use std::path::Path;

/// Header of the input column holding process numbers. Matched case-insensitively.
pub const PROCESS_COLUMN: &str = "PROCESSO";

pub const OUTPUT_HEADER: [&str; 4] = [
    "PROCESSO",
    "DATA MOVIMENTAÇÃO",
    "DESCRIÇÃO MOVIMENTAÇÃO",
    "REQUERIDO/EXECUTADO",
];

const DELIMITERS: [char; 3] = [',', ';', '\t'];
const BOM: char = '\u{feff}';

#[derive(thiserror::Error, Debug)]
pub enum TabularError {
    #[error("could not access tabular file: {0}")]
    Io(#[from] io::Error),
    #[error("input has no header row")]
    Empty,
    #[error("no `PROCESSO` column in the input header")]
    MissingColumn,
}

/* ---------------- Parsing ---------------- */

/// Picks the delimiter occurring most often outside quotes in the header line.
/// Defaults to a comma.
pub fn sniff_delimiter(header_line: &str) -> char {
    let mut counts = [0usize; DELIMITERS.len()];
    let mut in_quotes = false;
    for ch in header_line.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if !in_quotes {
            if let Some(i) = DELIMITERS.iter().position(|d| *d == ch) {
                counts[i] += 1;
            }
        }
    }
    let mut best = (',', 0);
    for (delimiter, count) in DELIMITERS.into_iter().zip(counts) {
        if count > best.1 {
            best = (delimiter, count);
        }
    }
    best.0
}

/// Minimal delimited-text parser (quotes + CRLF tolerant). Blank lines are dropped.
pub fn parse_rows(text: &str, sep: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if matches!(chars.peek(), Some('"')) {
                        chars.next(); // escaped quote
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            c if c == sep && !in_quotes => {
                row.push(take(&mut field));
            }
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                push_row(&mut rows, take(&mut row));
            }
            _ => field.push(ch),
        }
    }

    // Flush a trailing row even if quotes were left open.
    row.push(field);
    push_row(&mut rows, row);

    rows
}

fn push_row(rows: &mut Vec<Vec<String>>, row: Vec<String>) {
    if row.iter().any(|cell| !cell.trim().is_empty()) {
        rows.push(row);
    }
}

/// Reads the process-number column, one entry per non-blank data row, in order.
pub fn parse_process_numbers(text: &str) -> Result<Vec<ProcessNumber>, TabularError> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let header_line = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .ok_or(TabularError::Empty)?;
    let sep = sniff_delimiter(header_line);

    let mut rows = parse_rows(text, sep).into_iter();
    let header = rows.next().ok_or(TabularError::Empty)?;
    let column = header
        .iter()
        .position(|name| name.trim().eq_ignore_ascii_case(PROCESS_COLUMN))
        .ok_or(TabularError::MissingColumn)?;

    Ok(rows
        .map(|row| ProcessNumber::new(row.get(column).map_or("", |cell| cell.as_str())))
        .collect())
}

pub fn read_process_numbers(path: &Path) -> Result<Vec<ProcessNumber>, TabularError> {
    parse_process_numbers(&fs::read_to_string(path)?)
}

/* ---------------- Writing ---------------- */

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single delimited row to any writer.
pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S], sep: char) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{sep}")?;
        }
        let cell = cell.as_ref();
        if needs_quotes(cell, sep) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{cell}")?;
        }
    }
    writeln!(w)
}

/// Header plus one row per result, in the given order.
pub fn write_results<W: Write>(mut w: W, results: &[MovementResult], sep: char) -> io::Result<()> {
    write_row(&mut w, &OUTPUT_HEADER, sep)?;
    for result in results {
        write_row(&mut w, &result.to_row(), sep)?;
    }
    Ok(())
}

/// Writes `.tsv` files tab-separated and everything else comma-separated,
/// with a byte-order mark so spreadsheet tools detect UTF-8.
pub fn write_results_file(path: &Path, results: &[MovementResult]) -> Result<(), TabularError> {
    let sep = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => '\t',
        _ => ',',
    };
    let mut w = BufWriter::new(fs::File::create(path)?);
    write!(w, "{BOM}")?;
    write_results(&mut w, results, sep)?;
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Field, Resolution, Sentinel, Tier};

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("PROCESSO;VARA;COMARCA"), ';');
        assert_eq!(sniff_delimiter("Processo\tVara"), '\t');
        assert_eq!(sniff_delimiter("\"A;B\",PROCESSO"), ',');
        assert_eq!(sniff_delimiter("PROCESSO"), ',');
    }

    #[test]
    fn test_parse_rows_quotes_and_crlf() {
        let rows = parse_rows("a,\"b,\"\"c\"\"\"\r\n\r\n1,2\n", ',');
        assert_eq!(
            rows,
            vec![
                vec!["a".to_string(), "b,\"c\"".to_string()],
                vec!["1".to_string(), "2".to_string()],
            ]
        );
    }

    #[test]
    fn test_parse_process_numbers() {
        let text = "\u{feff}Vara;processo\r\n1ª Vara;0000123-45.2020.8.04.0001\r\n;\r\n2ª Vara;123\r\n3ª Vara\r\n";
        let numbers = parse_process_numbers(text).unwrap();
        assert_eq!(
            numbers,
            vec![
                ProcessNumber::new("0000123-45.2020.8.04.0001"),
                ProcessNumber::new("123"),
                ProcessNumber::new(""),
            ]
        );
    }

    #[test]
    fn test_leading_blank_lines_before_header() {
        let text = "\r\n  \nVara;PROCESSO\n1ª Vara;0000123-45.2020.8.04.0001\n";
        assert_eq!(
            parse_process_numbers(text).unwrap(),
            vec![ProcessNumber::new("0000123-45.2020.8.04.0001")]
        );
    }

    #[test]
    fn test_missing_column() {
        assert!(matches!(
            parse_process_numbers("Numero,Vara\n1,2\n"),
            Err(TabularError::MissingColumn)
        ));
        assert!(matches!(parse_process_numbers(""), Err(TabularError::Empty)));
    }

    #[test]
    fn test_write_results() {
        let results = vec![
            MovementResult::from_resolution(
                ProcessNumber::new("0000123-45.2020.8.04.0001"),
                Tier::Primary,
                Resolution::found(
                    Field::Value("12/03/2024".into()),
                    Field::Value("Juntada de petição, com \"anexos\"".into()),
                    Field::Value("João da Silva".into()),
                ),
            ),
            MovementResult::invalid(ProcessNumber::new("123")),
        ];

        let mut out = Vec::new();
        write_results(&mut out, &results, ',').unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "PROCESSO,DATA MOVIMENTAÇÃO,DESCRIÇÃO MOVIMENTAÇÃO,REQUERIDO/EXECUTADO\n\
             0000123-45.2020.8.04.0001,12/03/2024,\"Juntada de petição, com \"\"anexos\"\"\",João da Silva\n\
             123,[NÃO DISPONÍVEL],[NÚMERO DE PROCESSO INVÁLIDO],[NÃO DISPONÍVEL]\n"
        );
    }

    #[test]
    fn test_results_file_round_trips_process_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saida.tsv");
        let results = vec![MovementResult::unresolved(
            ProcessNumber::new("0000123-45.2020.8.04.0001"),
            Sentinel::Cancelled,
        )];

        write_results_file(&path, &results).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with('\u{feff}'));
        assert!(written.contains("\t[CONSULTA CANCELADA]\t"));
        assert_eq!(
            read_process_numbers(&path).unwrap(),
            vec![ProcessNumber::new("0000123-45.2020.8.04.0001")]
        );
    }
}
