// src/db/depara_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::depara::{MapeamentoDePara, NovoMapeamento},
};

// ---
// O contrato da tabela DE/PARA.
// ---
#[async_trait]
pub trait DeParaStore: Send + Sync {
    /// Violação da unicidade parcial (sku_pedido ativo) vira `MapeamentoJaExiste`.
    async fn criar(
        &self,
        tenant_id: Uuid,
        novo: NovoMapeamento,
    ) -> Result<MapeamentoDePara, AppError>;

    /// Mapeamentos ATIVOS do SKU, mais recente primeiro. Mais de um resultado
    /// é violação de integridade que o resolver trata (e avisa).
    async fn buscar_ativos(
        &self,
        tenant_id: Uuid,
        sku_pedido: &str,
    ) -> Result<Vec<MapeamentoDePara>, AppError>;

    /// Dentre `skus`, quais já têm mapeamento ativo (pré-checagem da importação).
    async fn skus_ativos_entre(
        &self,
        tenant_id: Uuid,
        skus: &[String],
    ) -> Result<Vec<String>, AppError>;

    async fn listar(
        &self,
        tenant_id: Uuid,
        apenas_ativos: bool,
    ) -> Result<Vec<MapeamentoDePara>, AppError>;

    /// Desativa (nunca apaga) o mapeamento ativo do SKU.
    async fn desativar(&self, tenant_id: Uuid, sku_pedido: &str) -> Result<bool, AppError>;
}

// ---
// Implementação Postgres
// ---
#[derive(Clone)]
pub struct PgDeParaRepository {
    pool: PgPool,
}

impl PgDeParaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeParaStore for PgDeParaRepository {
    async fn criar(
        &self,
        tenant_id: Uuid,
        novo: NovoMapeamento,
    ) -> Result<MapeamentoDePara, AppError> {
        sqlx::query_as::<_, MapeamentoDePara>(
            r#"
            INSERT INTO mapeamentos_depara
                (tenant_id, sku_pedido, sku_correspondente, sku_simples,
                 quantidade, prioridade, observacoes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&novo.sku_pedido)
        .bind(&novo.sku_correspondente)
        .bind(&novo.sku_simples)
        .bind(novo.quantidade)
        .bind(novo.prioridade)
        .bind(&novo.observacoes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::MapeamentoJaExiste(novo.sku_pedido.clone());
                }
            }
            e.into()
        })
    }

    async fn buscar_ativos(
        &self,
        tenant_id: Uuid,
        sku_pedido: &str,
    ) -> Result<Vec<MapeamentoDePara>, AppError> {
        let mapeamentos = sqlx::query_as::<_, MapeamentoDePara>(
            r#"
            SELECT * FROM mapeamentos_depara
            WHERE tenant_id = $1 AND sku_pedido = $2 AND ativo
            ORDER BY atualizado_em DESC
            "#,
        )
        .bind(tenant_id)
        .bind(sku_pedido)
        .fetch_all(&self.pool)
        .await?;
        Ok(mapeamentos)
    }

    async fn skus_ativos_entre(
        &self,
        tenant_id: Uuid,
        skus: &[String],
    ) -> Result<Vec<String>, AppError> {
        let linhas: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT sku_pedido FROM mapeamentos_depara
            WHERE tenant_id = $1 AND ativo AND sku_pedido = ANY($2)
            "#,
        )
        .bind(tenant_id)
        .bind(skus)
        .fetch_all(&self.pool)
        .await?;
        Ok(linhas.into_iter().map(|(sku,)| sku).collect())
    }

    async fn listar(
        &self,
        tenant_id: Uuid,
        apenas_ativos: bool,
    ) -> Result<Vec<MapeamentoDePara>, AppError> {
        let mapeamentos = sqlx::query_as::<_, MapeamentoDePara>(
            r#"
            SELECT * FROM mapeamentos_depara
            WHERE tenant_id = $1 AND ($2 = false OR ativo)
            ORDER BY sku_pedido ASC
            "#,
        )
        .bind(tenant_id)
        .bind(apenas_ativos)
        .fetch_all(&self.pool)
        .await?;
        Ok(mapeamentos)
    }

    async fn desativar(&self, tenant_id: Uuid, sku_pedido: &str) -> Result<bool, AppError> {
        let resultado = sqlx::query(
            r#"
            UPDATE mapeamentos_depara
            SET ativo = false, atualizado_em = now()
            WHERE tenant_id = $1 AND sku_pedido = $2 AND ativo
            "#,
        )
        .bind(tenant_id)
        .bind(sku_pedido)
        .execute(&self.pool)
        .await?;
        Ok(resultado.rows_affected() > 0)
    }
}
