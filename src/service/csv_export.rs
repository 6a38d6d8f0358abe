use crate::db::models::{Categoria, Diario, Lancamento, Obra};
use crate::error::RdoError;
use csv::WriterBuilder;
use std::collections::HashMap;
use uuid::Uuid;

/// Semicolon-separated with comma decimals, the layout Brazilian spreadsheets open
/// directly and the importer reads back.
const DELIMITER: u8 = b';';

pub fn export_lancamentos(
    entries: &[Lancamento],
    obras: &[Obra],
    categorias: &[Categoria],
) -> Result<String, RdoError> {
    let obra_names: HashMap<Uuid, &str> = obras.iter().map(|o| (o.id, o.nome.as_str())).collect();
    let cat_names: HashMap<Uuid, &str> =
        categorias.iter().map(|c| (c.id, c.nome.as_str())).collect();

    let mut wtr = WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_writer(vec![]);
    wtr.write_record([
        "Data",
        "Obra",
        "Descrição",
        "Categoria",
        "Valor",
        "Fornecedor",
        "Forma de Pagamento",
        "Observações",
    ])?;

    for entry in entries {
        wtr.write_record([
            entry.data_gasto.format("%d/%m/%Y").to_string(),
            obra_names
                .get(&entry.obra_id)
                .copied()
                .unwrap_or_default()
                .to_string(),
            entry.descricao.clone(),
            entry
                .categoria_id
                .and_then(|id| cat_names.get(&id).copied())
                .unwrap_or_default()
                .to_string(),
            format_brl(entry.valor),
            entry.fornecedor.clone().unwrap_or_default(),
            entry.forma_pagamento.clone().unwrap_or_default(),
            entry.observacoes.clone().unwrap_or_default(),
        ])?;
    }

    finish(wtr)
}

/// One line per activity across the given reports.
pub fn export_atividades(diarios: &[Diario], obras: &[Obra]) -> Result<String, RdoError> {
    let obra_names: HashMap<Uuid, &str> = obras.iter().map(|o| (o.id, o.nome.as_str())).collect();

    let mut wtr = WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_writer(vec![]);
    wtr.write_record(["Data", "Obra", "Atividade", "Status", "Progresso (%)"])?;

    for diario in diarios {
        let obra = obra_names
            .get(&diario.obra_id)
            .copied()
            .unwrap_or_default();
        for atividade in diario.atividades.iter() {
            wtr.write_record([
                diario.data.format("%d/%m/%Y").to_string(),
                obra.to_string(),
                atividade.descricao.clone(),
                atividade.status.label().to_string(),
                atividade.progresso.to_string(),
            ])?;
        }
    }

    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, RdoError> {
    let data = wtr.into_inner().map_err(|e| RdoError::Io(e.into_error()))?;
    String::from_utf8(data)
        .map_err(|e| RdoError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

fn format_brl(valor: f64) -> String {
    format!("{valor:.2}").replace('.', ",")
}
