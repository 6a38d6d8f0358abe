//! Declarative report layouts. The client turns a `ReportDocument` into a PDF;
//! this side only decides what goes on the page and in which order.

use crate::db::models::{Diario, Obra, Profile};
use crate::service::metrics::{FinancialAnalytics, RdoMetrics};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    pub title: String,
    pub header: Vec<Field>,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Section {
    Fields { title: String, rows: Vec<Field> },
    Table {
        title: String,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Text { title: String, body: String },
}

fn field(label: &str, value: impl Into<String>) -> Field {
    Field {
        label: label.to_string(),
        value: value.into(),
    }
}

fn table(title: &str, columns: &[&str], rows: Vec<Vec<String>>) -> Section {
    Section::Table {
        title: title.to_string(),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
    }
}

fn brl(valor: f64) -> String {
    let cents = (valor.abs() * 100.0).round() as u64;
    let reais = (cents / 100).to_string();
    let mut grouped = String::with_capacity(reais.len() + reais.len() / 3);
    for (i, ch) in reais.chars().enumerate() {
        if i > 0 && (reais.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if valor < 0.0 { "-" } else { "" };
    format!("{sign}R$ {grouped},{:02}", cents % 100)
}

fn company_header(profile: &Profile, obra: &Obra) -> Vec<Field> {
    let mut header = Vec::with_capacity(4);
    if let Some(empresa) = profile.empresa.as_deref() {
        header.push(field("Empresa", empresa));
    }
    header.push(field("Obra", obra.nome.clone()));
    if let Some(cliente) = obra.cliente.as_deref() {
        header.push(field("Cliente", cliente));
    }
    if let Some(endereco) = obra.endereco.as_deref() {
        header.push(field("Endereço", endereco));
    }
    header
}

/// Layout of one daily report. Empty collections produce no section.
pub fn diario_report(profile: &Profile, obra: &Obra, diario: &Diario) -> ReportDocument {
    let mut header = company_header(profile, obra);
    header.push(field("Data", diario.data.format("%d/%m/%Y").to_string()));
    header.push(field(
        "Clima",
        diario.clima.clone().unwrap_or_else(|| "Não informado".to_string()),
    ));

    let mut sections = Vec::new();
    if !diario.mao_de_obra.is_empty() {
        sections.push(table(
            "Mão de obra",
            &["Função", "Quantidade", "Horas"],
            diario
                .mao_de_obra
                .iter()
                .map(|m| vec![m.funcao.clone(), m.quantidade.to_string(), m.horas.to_string()])
                .collect(),
        ));
    }
    if !diario.equipamentos.is_empty() {
        sections.push(table(
            "Equipamentos",
            &["Equipamento", "Quantidade", "Horas"],
            diario
                .equipamentos
                .iter()
                .map(|e| vec![e.nome.clone(), e.quantidade.to_string(), e.horas.to_string()])
                .collect(),
        ));
    }
    if !diario.materiais.is_empty() {
        sections.push(table(
            "Materiais utilizados",
            &["Material", "Quantidade", "Unidade"],
            diario
                .materiais
                .iter()
                .map(|m| {
                    vec![
                        m.nome.clone(),
                        m.quantidade.to_string(),
                        m.unidade.clone().unwrap_or_default(),
                    ]
                })
                .collect(),
        ));
    }
    if !diario.atividades.is_empty() {
        sections.push(table(
            "Atividades",
            &["Atividade", "Status", "Progresso"],
            diario
                .atividades
                .iter()
                .map(|a| {
                    vec![
                        a.descricao.clone(),
                        a.status.label().to_string(),
                        format!("{}%", a.progresso),
                    ]
                })
                .collect(),
        ));
    }
    if let Some(obs) = diario.observacoes.as_deref().filter(|o| !o.trim().is_empty()) {
        sections.push(Section::Text {
            title: "Observações".to_string(),
            body: obs.to_string(),
        });
    }

    ReportDocument {
        title: "Relatório Diário de Obra".to_string(),
        header,
        sections,
    }
}

/// Financial summary of one obra, built from its analytics and RDO metrics.
pub fn financial_report(
    profile: &Profile,
    obra: &Obra,
    analytics: &FinancialAnalytics,
    rdo: &RdoMetrics,
) -> ReportDocument {
    let mut summary = vec![
        field("Orçamento", brl(obra.orcamento)),
        field("Total gasto", brl(analytics.total_spent)),
        field("Saldo", brl(obra.orcamento - analytics.total_spent)),
        field("Lançamentos", analytics.entry_count.to_string()),
        field("Média mensal", brl(analytics.average_monthly)),
    ];
    if let Some(pct) = analytics
        .budget
        .iter()
        .find(|b| b.obra_id == obra.id)
        .and_then(|b| b.percentual)
    {
        summary.push(field("Orçamento utilizado", format!("{pct:.1}%")));
    }

    let mut sections = vec![Section::Fields {
        title: "Resumo".to_string(),
        rows: summary,
    }];
    sections.push(table(
        "Gastos por mês",
        &["Mês", "Lançamentos", "Total"],
        analytics
            .monthly
            .iter()
            .map(|m| vec![m.month.clone(), m.count.to_string(), brl(m.total)])
            .collect(),
    ));
    sections.push(table(
        "Gastos por categoria",
        &["Categoria", "Total", "Participação"],
        analytics
            .by_category
            .iter()
            .map(|c| vec![c.nome.clone(), brl(c.total), format!("{:.1}%", c.share_pct)])
            .collect(),
    ));
    if !analytics.top_suppliers.is_empty() {
        sections.push(table(
            "Principais fornecedores",
            &["Fornecedor", "Lançamentos", "Total"],
            analytics
                .top_suppliers
                .iter()
                .map(|s| vec![s.fornecedor.clone(), s.count.to_string(), brl(s.total)])
                .collect(),
        ));
    }
    sections.push(Section::Fields {
        title: "Diários de obra".to_string(),
        rows: vec![
            field("Relatórios", rdo.total_relatorios.to_string()),
            field("Homem-dia", rdo.homem_dia.to_string()),
            field("Horas de mão de obra", format!("{:.1}", rdo.horas_mao_de_obra)),
            field("Horas de equipamento", format!("{:.1}", rdo.horas_equipamento)),
        ],
    });

    ReportDocument {
        title: format!("Resumo Financeiro - {}", obra.nome),
        header: company_header(profile, obra),
        sections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{
        Atividade, AtividadeStatus, MaoDeObra, ObraStatus, Plano, Role, SubscriptionStatus,
    };
    use crate::service::metrics;
    use chrono::{NaiveDate, Utc};
    use sqlx::types::Json;
    use uuid::Uuid;

    fn profile() -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: "eng@obra.com".to_string(),
            nome: None,
            empresa: Some("Construtora Alfa".to_string()),
            role: Role::User,
            plano: Plano::Free,
            subscription_status: SubscriptionStatus::Inactive,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            current_period_end: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn obra() -> Obra {
        Obra {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            nome: "Galpão Norte".to_string(),
            endereco: Some("Rua A, 10".to_string()),
            cliente: None,
            orcamento: 1_234_567.891,
            status: ObraStatus::EmAndamento,
            data_inicio: None,
            data_previsao_fim: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn formats_currency() {
        assert_eq!(brl(1_234_567.891), "R$ 1.234.567,89");
        assert_eq!(brl(0.5), "R$ 0,50");
        assert_eq!(brl(-12.0), "-R$ 12,00");
        assert_eq!(brl(100.0), "R$ 100,00");
    }

    #[test]
    fn diario_layout_skips_empty_sections() {
        let o = obra();
        let d = Diario {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            obra_id: o.id,
            data: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            clima: Some("Chuvoso".to_string()),
            observacoes: Some("  ".to_string()),
            mao_de_obra: Json(vec![MaoDeObra {
                funcao: "Servente".to_string(),
                quantidade: 2,
                horas: 8.0,
            }]),
            equipamentos: Json(vec![]),
            materiais: Json(vec![]),
            atividades: Json(vec![Atividade {
                descricao: "Reboco".to_string(),
                status: AtividadeStatus::NaoIniciada,
                progresso: 0,
            }]),
            created_at: Utc::now(),
        };
        let doc = diario_report(&profile(), &o, &d);
        assert_eq!(doc.sections.len(), 2);
        assert!(doc.header.iter().any(|f| f.label == "Data" && f.value == "02/05/2024"));
        assert!(doc.header.iter().any(|f| f.value == "Construtora Alfa"));

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["sections"][0]["kind"], "table");
        assert_eq!(json["sections"][1]["rows"][0][1], "Não iniciada");
    }

    #[test]
    fn financial_layout_has_summary_first() {
        let o = obra();
        let analytics = metrics::financial_analytics(std::slice::from_ref(&o), &[], &[]);
        let doc = financial_report(&profile(), &o, &analytics, &RdoMetrics::default());
        assert!(doc.title.ends_with("Galpão Norte"));
        match &doc.sections[0] {
            Section::Fields { title, rows } => {
                assert_eq!(title, "Resumo");
                assert_eq!(rows[0].value, "R$ 1.234.567,89");
            }
            other => panic!("unexpected first section: {other:?}"),
        }
    }
}
