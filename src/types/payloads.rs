//! Request bodies accepted by the HTTP layer and handed down to storage.

use crate::db::models::{
    Atividade, Bucket, Equipamento, MaoDeObra, MaterialUsado, ObraStatus, Prioridade, Role,
    TicketStatus,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct IssueTokenRequest {
    pub email: String,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueTokenResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub nome: Option<String>,
    pub empresa: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObraInput {
    pub nome: String,
    #[serde(default)]
    pub endereco: Option<String>,
    #[serde(default)]
    pub cliente: Option<String>,
    #[serde(default)]
    pub orcamento: f64,
    #[serde(default)]
    pub status: Option<ObraStatus>,
    #[serde(default)]
    pub data_inicio: Option<NaiveDate>,
    #[serde(default)]
    pub data_previsao_fim: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoriaInput {
    pub nome: String,
    #[serde(default)]
    pub cor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LancamentoInput {
    pub obra_id: Uuid,
    pub descricao: String,
    pub valor: f64,
    pub data_gasto: NaiveDate,
    #[serde(default)]
    pub categoria_id: Option<Uuid>,
    #[serde(default)]
    pub fornecedor: Option<String>,
    #[serde(default)]
    pub forma_pagamento: Option<String>,
    #[serde(default)]
    pub observacoes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LancamentoFilter {
    pub obra_id: Option<Uuid>,
    pub categoria_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkCategoryRequest {
    pub ids: Vec<Uuid>,
    pub categoria_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportRequest {
    pub obra_id: Uuid,
    /// Raw pasted or uploaded delimited text.
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiarioInput {
    pub obra_id: Uuid,
    pub data: NaiveDate,
    #[serde(default)]
    pub clima: Option<String>,
    #[serde(default)]
    pub observacoes: Option<String>,
    #[serde(default)]
    pub mao_de_obra: Vec<MaoDeObra>,
    #[serde(default)]
    pub equipamentos: Vec<Equipamento>,
    #[serde(default)]
    pub materiais: Vec<MaterialUsado>,
    #[serde(default)]
    pub atividades: Vec<Atividade>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    pub bucket: Bucket,
    #[serde(default)]
    pub obra_id: Option<Uuid>,
    pub folder: String,
    pub filename: String,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Standard base64 of the file bytes.
    pub content_base64: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTicket {
    pub assunto: String,
    pub mensagem: String,
    #[serde(default)]
    pub prioridade: Option<Prioridade>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMessage {
    pub conteudo: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketStatusUpdate {
    pub status: TicketStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupportNotificationRequest {
    pub ticket_id: Uuid,
    #[serde(default)]
    pub mensagem: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CargoInput {
    pub nome: String,
    #[serde(default)]
    pub valor_diaria: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaquinaInput {
    pub nome: String,
    #[serde(default)]
    pub valor_hora: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecebimentoInput {
    pub obra_id: Uuid,
    pub material: String,
    pub quantidade: f64,
    #[serde(default)]
    pub unidade: Option<String>,
    #[serde(default)]
    pub fornecedor: Option<String>,
    pub data_recebimento: NaiveDate,
    #[serde(default)]
    pub nota_fiscal: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfiguracaoInput {
    pub valor: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObraQuery {
    pub obra_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub obra_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Database-webhook payload sent after an obra row is deleted.
#[derive(Debug, Clone, Deserialize)]
pub struct ObraDeletedHook {
    #[serde(rename = "type")]
    pub kind: String,
    pub table: String,
    pub old_record: DeletedRecord,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeletedRecord {
    pub id: Uuid,
    pub user_id: Uuid,
}
