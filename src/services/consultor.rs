// src/services/consultor.rs

use async_trait::async_trait;

use crate::{
    common::error::AppError,
    models::previsao::{ParecerReposicao, SnapshotConsumo},
};

// ---
// Consultor de reposição (colaborador OPCIONAL)
// ---
// Um provedor externo (ex.: um modelo de linguagem) que enriquece a
// previsão com insights qualitativos. O motor numérico nunca depende dele:
// ausência, erro ou timeout apenas acionam o fallback do PrevisaoService.
#[async_trait]
pub trait ConsultorReposicao: Send + Sync {
    async fn analisar(&self, snapshot: &SnapshotConsumo) -> Result<ParecerReposicao, AppError>;
}

/// Implementação padrão: não opina. O PrevisaoService preenche os campos
/// vazios com os fallbacks fixos.
pub struct ConsultorPadrao;

#[async_trait]
impl ConsultorReposicao for ConsultorPadrao {
    async fn analisar(&self, _snapshot: &SnapshotConsumo) -> Result<ParecerReposicao, AppError> {
        Ok(ParecerReposicao::default())
    }
}
