//! Pure aggregations over already-fetched rows: dashboard totals, financial
//! analytics and RDO report metrics.

use crate::db::models::{AtividadeStatus, Categoria, Diario, Lancamento, Obra, ObraStatus};
use crate::service::category_migration::DEFAULT_CATEGORY;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    /// `YYYY-MM`
    pub month: String,
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub categoria_id: Option<Uuid>,
    pub nome: String,
    pub total: f64,
    pub count: usize,
    pub share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierTotal {
    pub fornecedor: String,
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetUsage {
    pub obra_id: Uuid,
    pub nome: String,
    pub orcamento: f64,
    pub gasto: f64,
    pub saldo: f64,
    /// `None` when the obra has no budget set.
    pub percentual: Option<f64>,
}

pub fn total_spent(entries: &[Lancamento]) -> f64 {
    entries.iter().map(|e| e.valor).sum()
}

/// Group by the `YYYY-MM` prefix of `data_gasto`, oldest month first.
pub fn monthly_totals(entries: &[Lancamento]) -> Vec<MonthlyTotal> {
    let mut buckets: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for entry in entries {
        let bucket = buckets
            .entry(entry.data_gasto.format("%Y-%m").to_string())
            .or_default();
        bucket.0 += entry.valor;
        bucket.1 += 1;
    }
    buckets
        .into_iter()
        .map(|(month, (total, count))| MonthlyTotal {
            month,
            total,
            count,
        })
        .collect()
}

/// Spend per category, largest first. Entries without a category, or whose
/// category is unknown, share one bucket.
/// Entries without a known category share a bucket with the default category.
pub fn category_totals(entries: &[Lancamento], categorias: &[Categoria]) -> Vec<CategoryTotal> {
    let names: HashMap<Uuid, &str> = categorias.iter().map(|c| (c.id, c.nome.as_str())).collect();
    let default_id = categorias
        .iter()
        .find(|c| c.nome.eq_ignore_ascii_case(DEFAULT_CATEGORY))
        .map(|c| c.id);
    let mut buckets: HashMap<Option<Uuid>, (f64, usize)> = HashMap::new();
    for entry in entries {
        let key = entry
            .categoria_id
            .filter(|id| names.contains_key(id))
            .or(default_id);
        let bucket = buckets.entry(key).or_default();
        bucket.0 += entry.valor;
        bucket.1 += 1;
    }

    let overall = total_spent(entries);
    let mut totals: Vec<CategoryTotal> = buckets
        .into_iter()
        .map(|(categoria_id, (total, count))| CategoryTotal {
            categoria_id,
            nome: categoria_id
                .and_then(|id| names.get(&id).copied())
                .unwrap_or(DEFAULT_CATEGORY)
                .to_string(),
            total,
            count,
            share_pct: percent(total, overall).unwrap_or(0.0),
        })
        .collect();
    totals.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.nome.cmp(&b.nome)));
    totals
}

pub fn top_suppliers(entries: &[Lancamento], limit: usize) -> Vec<SupplierTotal> {
    let mut buckets: HashMap<String, (f64, usize)> = HashMap::new();
    for entry in entries {
        let Some(fornecedor) = entry.fornecedor.as_deref().map(str::trim) else {
            continue;
        };
        if fornecedor.is_empty() {
            continue;
        }
        let bucket = buckets.entry(fornecedor.to_string()).or_default();
        bucket.0 += entry.valor;
        bucket.1 += 1;
    }
    let mut totals: Vec<SupplierTotal> = buckets
        .into_iter()
        .map(|(fornecedor, (total, count))| SupplierTotal {
            fornecedor,
            total,
            count,
        })
        .collect();
    totals.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.fornecedor.cmp(&b.fornecedor))
    });
    totals.truncate(limit);
    totals
}

pub fn budget_usage(obras: &[Obra], entries: &[Lancamento]) -> Vec<BudgetUsage> {
    let mut spent: HashMap<Uuid, f64> = HashMap::new();
    for entry in entries {
        *spent.entry(entry.obra_id).or_default() += entry.valor;
    }
    obras
        .iter()
        .map(|obra| {
            let gasto = spent.get(&obra.id).copied().unwrap_or(0.0);
            BudgetUsage {
                obra_id: obra.id,
                nome: obra.nome.clone(),
                orcamento: obra.orcamento,
                gasto,
                saldo: obra.orcamento - gasto,
                percentual: percent(gasto, obra.orcamento),
            }
        })
        .collect()
}

fn percent(part: f64, whole: f64) -> Option<f64> {
    (whole > 0.0).then(|| part / whole * 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialAnalytics {
    pub total_spent: f64,
    pub average_monthly: f64,
    pub entry_count: usize,
    pub monthly: Vec<MonthlyTotal>,
    pub by_category: Vec<CategoryTotal>,
    pub top_suppliers: Vec<SupplierTotal>,
    pub budget: Vec<BudgetUsage>,
}

pub fn financial_analytics(
    obras: &[Obra],
    entries: &[Lancamento],
    categorias: &[Categoria],
) -> FinancialAnalytics {
    let monthly = monthly_totals(entries);
    let total = total_spent(entries);
    let average_monthly = if monthly.is_empty() {
        0.0
    } else {
        total / monthly.len() as f64
    };
    FinancialAnalytics {
        total_spent: total,
        average_monthly,
        entry_count: entries.len(),
        by_category: category_totals(entries, categorias),
        top_suppliers: top_suppliers(entries, 5),
        budget: budget_usage(obras, entries),
        monthly,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub total_obras: usize,
    pub obras_em_andamento: usize,
    pub obras_concluidas: usize,
    pub orcamento_total: f64,
    pub gasto_total: f64,
    pub saldo: f64,
    pub gasto_mes_atual: f64,
    pub total_lancamentos: usize,
    pub total_diarios: usize,
    pub ultimos_lancamentos: Vec<Lancamento>,
}

/// `entries` is expected newest first, as storage returns them.
pub fn dashboard_metrics(
    obras: &[Obra],
    entries: &[Lancamento],
    total_diarios: usize,
    today: NaiveDate,
) -> DashboardMetrics {
    let orcamento_total: f64 = obras.iter().map(|o| o.orcamento).sum();
    let gasto_total = total_spent(entries);
    let gasto_mes_atual = entries
        .iter()
        .filter(|e| e.data_gasto.year() == today.year() && e.data_gasto.month() == today.month())
        .map(|e| e.valor)
        .sum();
    DashboardMetrics {
        total_obras: obras.len(),
        obras_em_andamento: obras
            .iter()
            .filter(|o| o.status == ObraStatus::EmAndamento)
            .count(),
        obras_concluidas: obras
            .iter()
            .filter(|o| o.status == ObraStatus::Concluida)
            .count(),
        orcamento_total,
        gasto_total,
        saldo: orcamento_total - gasto_total,
        gasto_mes_atual,
        total_lancamentos: entries.len(),
        total_diarios,
        ultimos_lancamentos: entries.iter().take(5).cloned().collect(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RdoMetrics {
    pub total_relatorios: usize,
    pub primeiro_dia: Option<NaiveDate>,
    pub ultimo_dia: Option<NaiveDate>,
    pub dias_por_clima: BTreeMap<String, usize>,
    /// Sum of headcount over every report.
    pub homem_dia: u64,
    pub horas_mao_de_obra: f64,
    pub horas_equipamento: f64,
    pub atividades_por_status: BTreeMap<AtividadeStatus, usize>,
    pub itens_material: usize,
    pub workforce_por_funcao: BTreeMap<String, u64>,
}

pub fn rdo_metrics(diarios: &[Diario]) -> RdoMetrics {
    let mut metrics = RdoMetrics {
        total_relatorios: diarios.len(),
        primeiro_dia: diarios.iter().map(|d| d.data).min(),
        ultimo_dia: diarios.iter().map(|d| d.data).max(),
        ..RdoMetrics::default()
    };
    for diario in diarios {
        let clima = diario
            .clima
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("não informado")
            .to_lowercase();
        *metrics.dias_por_clima.entry(clima).or_default() += 1;

        for mao in diario.mao_de_obra.iter() {
            metrics.homem_dia += u64::from(mao.quantidade);
            metrics.horas_mao_de_obra += f64::from(mao.quantidade) * mao.horas;
            *metrics
                .workforce_por_funcao
                .entry(mao.funcao.clone())
                .or_default() += u64::from(mao.quantidade);
        }
        metrics.horas_equipamento += diario
            .equipamentos
            .iter()
            .map(|e| f64::from(e.quantidade) * e.horas)
            .sum::<f64>();
        for atividade in diario.atividades.iter() {
            *metrics
                .atividades_por_status
                .entry(atividade.status)
                .or_default() += 1;
        }
        metrics.itens_material += diario.materiais.len();
    }
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Atividade, Equipamento, MaoDeObra};
    use chrono::Utc;
    use sqlx::types::Json;

    fn entry(obra_id: Uuid, date: &str, valor: f64, cat: Option<Uuid>, forn: Option<&str>) -> Lancamento {
        Lancamento {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            obra_id,
            descricao: "x".to_string(),
            valor,
            data_gasto: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            categoria_id: cat,
            fornecedor: forn.map(str::to_string),
            forma_pagamento: None,
            observacoes: None,
            created_at: Utc::now(),
        }
    }

    fn obra(orcamento: f64, status: ObraStatus) -> Obra {
        Obra {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            nome: "Residencial Aurora".to_string(),
            endereco: None,
            cliente: None,
            orcamento,
            status,
            data_inicio: None,
            data_previsao_fim: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn monthly_buckets_sum_to_total() {
        let o = Uuid::new_v4();
        let entries = vec![
            entry(o, "2024-01-05", 100.0, None, None),
            entry(o, "2024-01-31", 50.5, None, None),
            entry(o, "2024-02-01", 20.25, None, None),
            entry(o, "2023-12-31", 10.0, None, None),
        ];
        let monthly = monthly_totals(&entries);
        let months: Vec<_> = monthly.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, ["2023-12", "2024-01", "2024-02"]);
        assert_eq!(monthly[1].count, 2);
        assert!((monthly[1].total - 150.5).abs() < 1e-9);
        let sum: f64 = monthly.iter().map(|m| m.total).sum();
        assert!((sum - total_spent(&entries)).abs() < 1e-9);
    }

    #[test]
    fn categories_include_uncategorized_bucket() {
        let o = Uuid::new_v4();
        let cat = Categoria {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            nome: "Materiais".to_string(),
            cor: None,
            created_at: Utc::now(),
        };
        let entries = vec![
            entry(o, "2024-01-05", 300.0, Some(cat.id), None),
            entry(o, "2024-01-06", 100.0, None, None),
            entry(o, "2024-01-07", 100.0, Some(Uuid::new_v4()), None),
        ];
        let totals = category_totals(&entries, std::slice::from_ref(&cat));
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].nome, "Materiais");
        assert!((totals[0].share_pct - 60.0).abs() < 1e-9);
        assert_eq!(totals[1].nome, DEFAULT_CATEGORY);
        assert_eq!(totals[1].categoria_id, None);
        assert_eq!(totals[1].count, 2);
    }

    #[test]
    fn uncategorized_entries_merge_into_default_category() {
        let o = Uuid::new_v4();
        let default = Categoria {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            nome: DEFAULT_CATEGORY.to_string(),
            cor: None,
            created_at: Utc::now(),
        };
        let entries = vec![
            entry(o, "2024-01-05", 80.0, Some(default.id), None),
            entry(o, "2024-01-06", 20.0, None, None),
        ];
        let totals = category_totals(&entries, std::slice::from_ref(&default));
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].categoria_id, Some(default.id));
        assert_eq!(totals[0].nome, DEFAULT_CATEGORY);
        assert_eq!(totals[0].count, 2);
        assert!((totals[0].share_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn suppliers_are_ranked_and_truncated() {
        let o = Uuid::new_v4();
        let entries = vec![
            entry(o, "2024-01-05", 10.0, None, Some("A")),
            entry(o, "2024-01-05", 30.0, None, Some("B")),
            entry(o, "2024-01-05", 25.0, None, Some("A")),
            entry(o, "2024-01-05", 5.0, None, Some(" ")),
            entry(o, "2024-01-05", 1.0, None, Some("C")),
        ];
        let top = top_suppliers(&entries, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].fornecedor, "A");
        assert_eq!(top[0].count, 2);
        assert_eq!(top[1].fornecedor, "B");
    }

    #[test]
    fn budget_usage_handles_zero_budget() {
        let a = obra(1000.0, ObraStatus::EmAndamento);
        let b = obra(0.0, ObraStatus::Planejamento);
        let entries = vec![entry(a.id, "2024-01-01", 250.0, None, None)];
        let usage = budget_usage(&[a, b], &entries);
        assert_eq!(usage[0].percentual, Some(25.0));
        assert_eq!(usage[0].saldo, 750.0);
        assert_eq!(usage[1].percentual, None);
    }

    #[test]
    fn dashboard_counts_current_month() {
        let a = obra(1000.0, ObraStatus::EmAndamento);
        let entries = vec![
            entry(a.id, "2024-03-10", 200.0, None, None),
            entry(a.id, "2024-02-10", 100.0, None, None),
        ];
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let m = dashboard_metrics(&[a], &entries, 4, today);
        assert_eq!(m.total_obras, 1);
        assert_eq!(m.obras_em_andamento, 1);
        assert_eq!(m.gasto_total, 300.0);
        assert_eq!(m.gasto_mes_atual, 200.0);
        assert_eq!(m.saldo, 700.0);
        assert_eq!(m.total_diarios, 4);
    }

    #[test]
    fn rdo_metrics_aggregate_nested_collections() {
        let diario = |data: &str, clima: Option<&str>| Diario {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            obra_id: Uuid::nil(),
            data: NaiveDate::parse_from_str(data, "%Y-%m-%d").unwrap(),
            clima: clima.map(str::to_string),
            observacoes: None,
            mao_de_obra: Json(vec![MaoDeObra {
                funcao: "Pedreiro".to_string(),
                quantidade: 3,
                horas: 8.0,
            }]),
            equipamentos: Json(vec![Equipamento {
                nome: "Betoneira".to_string(),
                quantidade: 1,
                horas: 4.0,
            }]),
            materiais: Json(vec![]),
            atividades: Json(vec![Atividade {
                descricao: "Alvenaria".to_string(),
                status: AtividadeStatus::EmAndamento,
                progresso: 40,
            }]),
            created_at: Utc::now(),
        };
        let rows = vec![
            diario("2024-01-02", Some("Ensolarado")),
            diario("2024-01-03", Some("ensolarado")),
            diario("2024-01-01", None),
        ];
        let m = rdo_metrics(&rows);
        assert_eq!(m.total_relatorios, 3);
        assert_eq!(m.primeiro_dia, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(m.dias_por_clima.get("ensolarado"), Some(&2));
        assert_eq!(m.dias_por_clima.get("não informado"), Some(&1));
        assert_eq!(m.homem_dia, 9);
        assert_eq!(m.horas_mao_de_obra, 72.0);
        assert_eq!(m.horas_equipamento, 12.0);
        assert_eq!(
            m.atividades_por_status.get(&AtividadeStatus::EmAndamento),
            Some(&3)
        );
        assert_eq!(m.workforce_por_funcao.get("Pedreiro"), Some(&9));
    }
}
