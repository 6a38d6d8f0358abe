use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Plano {
    Free,
    Pro,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Inactive,
    Active,
    PastDue,
    Canceled,
}

impl SubscriptionStatus {
    /// Maps the payment provider's subscription status onto ours.
    pub fn from_provider(status: &str) -> Self {
        match status {
            "active" | "trialing" => Self::Active,
            "past_due" | "unpaid" => Self::PastDue,
            "canceled" | "incomplete_expired" => Self::Canceled,
            _ => Self::Inactive,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub nome: Option<String>,
    pub empresa: Option<String>,
    pub role: Role,
    pub plano: Plano,
    pub subscription_status: SubscriptionStatus,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ObraStatus {
    Planejamento,
    EmAndamento,
    Pausada,
    Concluida,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Obra {
    pub id: Uuid,
    pub user_id: Uuid,
    pub nome: String,
    pub endereco: Option<String>,
    pub cliente: Option<String>,
    pub orcamento: f64,
    pub status: ObraStatus,
    pub data_inicio: Option<NaiveDate>,
    pub data_previsao_fim: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Categoria {
    pub id: Uuid,
    pub user_id: Uuid,
    pub nome: String,
    pub cor: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Lancamento {
    pub id: Uuid,
    pub user_id: Uuid,
    pub obra_id: Uuid,
    pub descricao: String,
    pub valor: f64,
    pub data_gasto: NaiveDate,
    pub categoria_id: Option<Uuid>,
    pub fornecedor: Option<String>,
    pub forma_pagamento: Option<String>,
    pub observacoes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaoDeObra {
    pub funcao: String,
    pub quantidade: u32,
    #[serde(default)]
    pub horas: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Equipamento {
    pub nome: String,
    #[serde(default = "one")]
    pub quantidade: u32,
    #[serde(default)]
    pub horas: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialUsado {
    pub nome: String,
    pub quantidade: f64,
    #[serde(default)]
    pub unidade: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AtividadeStatus {
    NaoIniciada,
    EmAndamento,
    Concluida,
    Paralisada,
}

impl AtividadeStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::NaoIniciada => "Não iniciada",
            Self::EmAndamento => "Em andamento",
            Self::Concluida => "Concluída",
            Self::Paralisada => "Paralisada",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Atividade {
    pub descricao: String,
    pub status: AtividadeStatus,
    /// Percent complete, 0..=100.
    #[serde(default)]
    pub progresso: u8,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Diario {
    pub id: Uuid,
    pub user_id: Uuid,
    pub obra_id: Uuid,
    pub data: NaiveDate,
    pub clima: Option<String>,
    pub observacoes: Option<String>,
    pub mao_de_obra: Json<Vec<MaoDeObra>>,
    pub equipamentos: Json<Vec<Equipamento>>,
    pub materiais: Json<Vec<MaterialUsado>>,
    pub atividades: Json<Vec<Atividade>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    DocumentosObra,
    DocumentosFinanceiros,
    CompanyAssets,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [
        Bucket::DocumentosObra,
        Bucket::DocumentosFinanceiros,
        Bucket::CompanyAssets,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DocumentosObra => "documentos_obra",
            Self::DocumentosFinanceiros => "documentos_financeiros",
            Self::CompanyAssets => "company_assets",
        }
    }

    /// Buckets whose paths carry an obra segment.
    pub fn is_obra_scoped(self) -> bool {
        !matches!(self, Self::CompanyAssets)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Documento {
    pub id: Uuid,
    pub user_id: Uuid,
    pub obra_id: Option<Uuid>,
    pub bucket: Bucket,
    pub folder: String,
    pub nome: String,
    pub path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Aberto,
    EmAndamento,
    Resolvido,
    Fechado,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Prioridade {
    Baixa,
    Media,
    Alta,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct SupportTicket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub assunto: String,
    pub status: TicketStatus,
    pub prioridade: Prioridade,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct SupportMessage {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub sender_id: Uuid,
    pub from_admin: bool,
    pub conteudo: String,
    pub lido: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct ConfiguracaoGlobal {
    pub chave: String,
    pub valor: Json<Value>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct RecebimentoMaterial {
    pub id: Uuid,
    pub user_id: Uuid,
    pub obra_id: Uuid,
    pub material: String,
    pub quantidade: f64,
    pub unidade: Option<String>,
    pub fornecedor: Option<String>,
    pub data_recebimento: NaiveDate,
    pub nota_fiscal: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Cargo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub nome: String,
    pub valor_diaria: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Maquina {
    pub id: Uuid,
    pub user_id: Uuid,
    pub nome: String,
    pub valor_hora: Option<f64>,
    pub created_at: DateTime<Utc>,
}
