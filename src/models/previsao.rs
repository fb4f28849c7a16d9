// src/models/previsao.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Classificações heurísticas do consumo ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Tendencia {
    Crescente,
    Estavel,
    Decrescente,
}

impl Tendencia {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tendencia::Crescente => "crescente",
            Tendencia::Estavel => "estavel",
            Tendencia::Decrescente => "decrescente",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Variabilidade {
    Baixa,
    Media,
    Alta,
}

impl Variabilidade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variabilidade::Baixa => "baixa",
            Variabilidade::Media => "media",
            Variabilidade::Alta => "alta",
        }
    }
}

// --- 2. Previsão de reposição (derivada, calculada sob demanda) ---
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrevisaoReposicao {
    pub produto_id: Uuid,
    pub sku: String,
    pub nome: String,

    pub quantidade_atual: i32,
    pub estoque_minimo: i32,

    pub dias_analise: i64,
    pub total_saidas: i64,
    pub total_entradas: i64,
    pub consumo_medio_diario: f64,

    pub tendencia: Tendencia,
    pub variabilidade: Variabilidade,

    /// `None` = consumo zero no período, o estoque "nunca" esgota.
    pub dias_para_esgotar: Option<f64>,

    pub quantidade_sugerida: i32,
    pub data_reposicao_sugerida: Option<NaiveDate>,

    /// 0–100. Vem do consultor quando disponível; senão, valor fixo de fallback.
    pub confianca: u8,
    pub insights: String,
    pub recomendacoes: Vec<String>,
}

// --- 3. Contrato do consultor externo (opcional) ---

/// Retrato compacto do produto + estatísticas recentes enviado ao consultor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotConsumo {
    pub sku: String,
    pub nome: String,
    pub quantidade_atual: i32,
    pub estoque_minimo: i32,
    pub dias_analise: i64,
    pub total_saidas: i64,
    pub total_entradas: i64,
    pub consumo_medio_diario: f64,
    pub tendencia: String,
    pub variabilidade: String,
}

/// Resposta do consultor. Todos os campos são opcionais: o motor numérico
/// nunca depende de nenhum deles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParecerReposicao {
    pub insights: Option<String>,
    pub tendencia: Option<String>,
    pub sazonalidade: Option<String>,
    pub variabilidade: Option<String>,
    #[serde(default)]
    pub recomendacoes: Vec<String>,
    pub quantidade_sugerida: Option<i32>,
    pub confianca: Option<u8>,
}
