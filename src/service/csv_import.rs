//! Financial-entry import from loosely formatted delimited text.
//!
//! Parsing is pure (`parse_import`); `import_lancamentos` then inserts the
//! attempted rows one by one. The batch is not transactional: a failed insert
//! is counted and the rest keep going.

use crate::db::Storage;
use crate::db::categorias::nome_key;
use crate::error::RdoError;
use crate::types::payloads::LancamentoInput;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_DESCRIPTION: &str = "Importado via CSV";

/// Aggregate outcome of one import.
/// `success_count + error_count + skipped_count == total_rows` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub total_rows: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub skipped_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Date,
    Description,
    Amount,
    Category,
    Supplier,
    PaymentMethod,
    Notes,
}

const HEADER_ALIASES: &[(Column, &[&str])] = &[
    (
        Column::Date,
        &["data", "data gasto", "data do gasto", "data pagamento", "date", "vencimento"],
    ),
    (
        Column::Description,
        &["descricao", "historico", "description", "desc"],
    ),
    (
        Column::Amount,
        &["valor", "valor r", "valor total", "pagamentos", "amount", "total"],
    ),
    (Column::Category, &["categoria", "category"]),
    (Column::Supplier, &["fornecedor", "favorecido", "supplier"]),
    (
        Column::PaymentMethod,
        &["forma de pagamento", "forma pagamento", "pagamento", "payment"],
    ),
    (Column::Notes, &["observacoes", "observacao", "obs", "notes"]),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ColumnMap {
    date: Option<usize>,
    description: Option<usize>,
    amount: Option<usize>,
    category: Option<usize>,
    supplier: Option<usize>,
    payment_method: Option<usize>,
    notes: Option<usize>,
}

impl ColumnMap {
    /// Columns for headerless input: date, description, amount, category.
    fn positional() -> Self {
        Self {
            date: Some(0),
            description: Some(1),
            amount: Some(2),
            category: Some(3),
            ..Self::default()
        }
    }

    fn from_headers(record: &StringRecord) -> Self {
        let mut map = Self::default();
        for (idx, raw) in record.iter().enumerate() {
            let Some(column) = column_for_header(raw) else {
                continue;
            };
            // first matching column wins
            let slot = match column {
                Column::Date => &mut map.date,
                Column::Description => &mut map.description,
                Column::Amount => &mut map.amount,
                Column::Category => &mut map.category,
                Column::Supplier => &mut map.supplier,
                Column::PaymentMethod => &mut map.payment_method,
                Column::Notes => &mut map.notes,
            };
            slot.get_or_insert(idx);
        }
        map
    }

    fn looks_like_header(&self) -> bool {
        self.date.is_some() || self.amount.is_some()
    }
}

/// A row in canonical shape, ready to become a financial entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub data_gasto: NaiveDate,
    pub descricao: String,
    pub valor: f64,
    pub categoria: Option<String>,
    pub fornecedor: Option<String>,
    pub forma_pagamento: Option<String>,
    pub observacoes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Valid(NormalizedRow),
    Skipped { line: u64, reason: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedImport {
    pub delimiter: u8,
    pub has_header: bool,
    pub rows: Vec<RowOutcome>,
}

impl ParsedImport {
    pub fn valid_rows(&self) -> impl Iterator<Item = &NormalizedRow> {
        self.rows.iter().filter_map(|r| match r {
            RowOutcome::Valid(row) => Some(row),
            RowOutcome::Skipped { .. } => None,
        })
    }

    pub fn skipped(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| matches!(r, RowOutcome::Skipped { .. }))
            .count()
    }
}

/// Pick the most frequent of `;`, tab and `,` on the first non-blank line.
/// Ties resolve in that order; no candidate at all means `,`.
pub fn detect_delimiter(text: &str) -> u8 {
    let Some(line) = text.lines().find(|l| !l.trim().is_empty()) else {
        return b',';
    };
    let mut best = (b',', 0usize);
    for candidate in [b';', b'\t', b','] {
        let count = line.bytes().filter(|b| *b == candidate).count();
        if count > best.1 {
            best = (candidate, count);
        }
    }
    best.0
}

fn strip_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        other => other,
    }
}

/// Lowercase, accent-free, punctuation-free, single-spaced.
pub fn normalize_header(raw: &str) -> String {
    let cleaned: String = raw
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .chars()
        .map(strip_accent)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn column_for_header(raw: &str) -> Option<Column> {
    let header = normalize_header(raw);
    HEADER_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&header.as_str()))
        .map(|(column, _)| *column)
}

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d"];

/// Accepts `dd/mm/yyyy`, `dd-mm-yyyy`, `dd/mm/yy`, `yyyy-mm-dd`; a trailing time is ignored.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim().split(['T', ' ']).next()?.trim();
    if value.is_empty() {
        return None;
    }
    let mut segments = value.split(['/', '-', '.']);
    let first_len = segments.next().map_or(0, str::len);
    let last_len = segments.last().map_or(0, str::len);
    if first_len <= 2 && last_len == 2 {
        // two-digit years: 00..=68 map to 20xx, 69..=99 to 19xx
        return NaiveDate::parse_from_str(&value.replace(['-', '.'], "/"), "%d/%m/%y").ok();
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// Parses Brazilian (`1.500,00`, `R$ 1.500,00`) and plain (`1500.00`) amounts.
/// Parentheses or a leading `-` mark a negative value.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let mut value: String = raw
        .trim()
        .replace("R$", "")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    if value.is_empty() {
        return None;
    }

    let mut negative = false;
    if value.starts_with('(') && value.ends_with(')') {
        negative = true;
        value = value[1..value.len() - 1].to_string();
    }
    if let Some(rest) = value.strip_prefix('-') {
        negative = !negative;
        value = rest.to_string();
    }

    let last_comma = value.rfind(',');
    let last_dot = value.rfind('.');
    let canonical = match (last_comma, last_dot) {
        (Some(c), Some(d)) if c > d => value.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => value.replace(',', ""),
        (Some(_), None) if value.matches(',').count() > 1 => value.replace(',', ""),
        (Some(_), None) => value.replace(',', "."),
        (None, Some(d)) => {
            let decimals = value.len() - d - 1;
            if value.matches('.').count() > 1 || decimals == 3 {
                value.replace('.', "")
            } else {
                value
            }
        }
        (None, None) => value,
    };

    let parsed: f64 = canonical.parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    Some(if negative { -parsed } else { parsed })
}

fn cell<'a>(record: &'a StringRecord, idx: Option<usize>) -> Option<&'a str> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn normalize_row(record: &StringRecord, map: &ColumnMap) -> Result<NormalizedRow, &'static str> {
    let data_gasto = cell(record, map.date)
        .and_then(parse_date)
        .ok_or("missing or invalid date")?;
    let descricao = cell(record, map.description);
    let valor = match cell(record, map.amount) {
        Some(raw) => Some(parse_amount(raw).ok_or("invalid amount")?),
        None => None,
    };
    if descricao.is_none() && valor.is_none() {
        return Err("missing description and amount");
    }

    Ok(NormalizedRow {
        data_gasto,
        descricao: descricao.unwrap_or(DEFAULT_DESCRIPTION).to_string(),
        valor: valor.map(f64::abs).unwrap_or(0.0),
        categoria: cell(record, map.category).map(str::to_string),
        fornecedor: cell(record, map.supplier).map(str::to_string),
        forma_pagamento: cell(record, map.payment_method).map(str::to_string),
        observacoes: cell(record, map.notes).map(str::to_string),
    })
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|f| f.trim().is_empty())
}

/// Parse raw delimited text into normalized rows without touching storage.
pub fn parse_import(text: &str) -> Result<ParsedImport, RdoError> {
    let text = text.trim_start_matches('\u{feff}');
    let delimiter = detect_delimiter(text);
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let mut pending_first = None;
    let mut map = ColumnMap::positional();
    let mut has_header = false;

    for first in records.by_ref() {
        let first = first?;
        if is_blank(&first) {
            continue;
        }
        let headers = ColumnMap::from_headers(&first);
        if headers.looks_like_header() {
            map = headers;
            has_header = true;
        } else {
            pending_first = Some(first);
        }
        break;
    }

    let mut rows = Vec::new();
    for record in pending_first.into_iter().map(Ok).chain(records) {
        let record = record?;
        if is_blank(&record) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        rows.push(match normalize_row(&record, &map) {
            Ok(row) => RowOutcome::Valid(row),
            Err(reason) => RowOutcome::Skipped { line, reason },
        });
    }

    Ok(ParsedImport {
        delimiter,
        has_header,
        rows,
    })
}

/// Parse `text` and insert every valid row as an entry of `obra_id`.
pub async fn import_lancamentos(
    storage: &Storage,
    user_id: Uuid,
    obra_id: Uuid,
    text: &str,
) -> Result<ImportSummary, RdoError> {
    storage.get_obra(user_id, obra_id).await?;
    let parsed = parse_import(text)?;

    let mut summary = ImportSummary {
        total_rows: parsed.rows.len(),
        skipped_count: parsed.skipped(),
        ..ImportSummary::default()
    };
    for outcome in &parsed.rows {
        if let RowOutcome::Skipped { line, reason } = outcome {
            debug!(line, reason, "import row skipped");
        }
    }

    let mut categories: HashMap<String, Uuid> = HashMap::new();
    for row in parsed.valid_rows() {
        let categoria_id = match row.categoria.as_deref() {
            Some(nome) => {
                let key = nome_key(nome);
                match categories.get(&key) {
                    Some(id) => Some(*id),
                    None => match storage.find_or_create_categoria(user_id, nome).await {
                        Ok(cat) => {
                            categories.insert(key, cat.id);
                            Some(cat.id)
                        }
                        Err(e) => {
                            warn!(categoria = nome, error = %e, "import could not resolve category");
                            summary.error_count += 1;
                            continue;
                        }
                    },
                }
            }
            None => None,
        };

        let input = LancamentoInput {
            obra_id,
            descricao: row.descricao.clone(),
            valor: row.valor,
            data_gasto: row.data_gasto,
            categoria_id,
            fornecedor: row.fornecedor.clone(),
            forma_pagamento: row.forma_pagamento.clone(),
            observacoes: row.observacoes.clone(),
        };
        match storage.insert_lancamento(user_id, input).await {
            Ok(_) => summary.success_count += 1,
            Err(e) => {
                warn!(error = %e, "import row insert failed");
                summary.error_count += 1;
            }
        }
    }

    info!(
        %user_id,
        %obra_id,
        delimiter = %(parsed.delimiter as char).escape_default(),
        has_header = parsed.has_header,
        total = summary.total_rows,
        success = summary.success_count,
        errors = summary.error_count,
        skipped = summary.skipped_count,
        "csv import finished"
    );
    Ok(summary)
}
