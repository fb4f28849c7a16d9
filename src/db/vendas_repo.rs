// src/db/vendas_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::vendas::{FiltroVendas, NovoRegistroVenda, RegistroVenda, StatusVenda},
};

// ---
// O contrato do histórico de vendas (append + estorno marcado).
// ---
// A constraint única (tenant, numero_pedido, sku_pedido) é a guarda de
// idempotência do processamento em lote.
#[async_trait]
pub trait HistoricoVendasStore: Send + Sync {
    async fn existe(
        &self,
        tenant_id: Uuid,
        numero_pedido: &str,
        sku_pedido: &str,
    ) -> Result<bool, AppError>;

    async fn inserir(
        &self,
        tenant_id: Uuid,
        novo: NovoRegistroVenda,
    ) -> Result<RegistroVenda, AppError>;

    async fn buscar(
        &self,
        tenant_id: Uuid,
        venda_id: Uuid,
    ) -> Result<Option<RegistroVenda>, AppError>;

    async fn listar(
        &self,
        tenant_id: Uuid,
        filtro: FiltroVendas,
    ) -> Result<Vec<RegistroVenda>, AppError>;

    /// Transição registrada -> estornada. `false` quando a venda já estava
    /// estornada — é a guarda contra estorno duplo.
    async fn marcar_estornada(&self, tenant_id: Uuid, venda_id: Uuid) -> Result<bool, AppError>;

    /// Transição inversa, estornada -> registrada. Desfaz a marcação quando
    /// o crédito de estoque do estorno falha, para a venda continuar
    /// estornável.
    async fn reabrir(&self, tenant_id: Uuid, venda_id: Uuid) -> Result<bool, AppError>;
}

// ---
// Implementação Postgres
// ---
#[derive(Clone)]
pub struct PgVendasRepository {
    pool: PgPool,
}

impl PgVendasRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoricoVendasStore for PgVendasRepository {
    async fn existe(
        &self,
        tenant_id: Uuid,
        numero_pedido: &str,
        sku_pedido: &str,
    ) -> Result<bool, AppError> {
        let linha: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT 1 FROM historico_vendas
            WHERE tenant_id = $1 AND numero_pedido = $2 AND sku_pedido = $3
            "#,
        )
        .bind(tenant_id)
        .bind(numero_pedido)
        .bind(sku_pedido)
        .fetch_optional(&self.pool)
        .await?;
        Ok(linha.is_some())
    }

    async fn inserir(
        &self,
        tenant_id: Uuid,
        novo: NovoRegistroVenda,
    ) -> Result<RegistroVenda, AppError> {
        let valor_total = novo
            .valor_unitario
            .map(|v| v * rust_decimal::Decimal::from(novo.quantidade));

        sqlx::query_as::<_, RegistroVenda>(
            r#"
            INSERT INTO historico_vendas
                (tenant_id, numero_pedido, sku_pedido, sku_estoque, nome_produto,
                 quantidade, quantidade_baixada, valor_unitario, valor_total,
                 cliente_nome, cliente_documento, movimentacao_id, observacoes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&novo.numero_pedido)
        .bind(&novo.sku_pedido)
        .bind(&novo.sku_estoque)
        .bind(&novo.nome_produto)
        .bind(novo.quantidade)
        .bind(novo.quantidade_baixada)
        .bind(novo.valor_unitario)
        .bind(valor_total)
        .bind(&novo.cliente_nome)
        .bind(&novo.cliente_documento)
        .bind(novo.movimentacao_id)
        .bind(&novo.observacoes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    // Corrida entre a pré-checagem e o insert: o chamador
                    // trata como item já processado.
                    return AppError::VendaJaRegistrada;
                }
            }
            e.into()
        })
    }

    async fn buscar(
        &self,
        tenant_id: Uuid,
        venda_id: Uuid,
    ) -> Result<Option<RegistroVenda>, AppError> {
        let venda = sqlx::query_as::<_, RegistroVenda>(
            "SELECT * FROM historico_vendas WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(venda_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(venda)
    }

    async fn listar(
        &self,
        tenant_id: Uuid,
        filtro: FiltroVendas,
    ) -> Result<Vec<RegistroVenda>, AppError> {
        let vendas = sqlx::query_as::<_, RegistroVenda>(
            r#"
            SELECT * FROM historico_vendas
            WHERE tenant_id = $1
              AND ($2::text IS NULL OR numero_pedido = $2)
              AND ($3::status_venda IS NULL OR status = $3)
            ORDER BY data_venda DESC
            "#,
        )
        .bind(tenant_id)
        .bind(filtro.numero_pedido)
        .bind(filtro.status)
        .fetch_all(&self.pool)
        .await?;
        Ok(vendas)
    }

    async fn marcar_estornada(&self, tenant_id: Uuid, venda_id: Uuid) -> Result<bool, AppError> {
        let resultado = sqlx::query(
            r#"
            UPDATE historico_vendas
            SET status = $3
            WHERE tenant_id = $1 AND id = $2 AND status = $4
            "#,
        )
        .bind(tenant_id)
        .bind(venda_id)
        .bind(StatusVenda::Estornada)
        .bind(StatusVenda::Registrada)
        .execute(&self.pool)
        .await?;
        Ok(resultado.rows_affected() > 0)
    }

    async fn reabrir(&self, tenant_id: Uuid, venda_id: Uuid) -> Result<bool, AppError> {
        let resultado = sqlx::query(
            r#"
            UPDATE historico_vendas
            SET status = $3
            WHERE tenant_id = $1 AND id = $2 AND status = $4
            "#,
        )
        .bind(tenant_id)
        .bind(venda_id)
        .bind(StatusVenda::Registrada)
        .bind(StatusVenda::Estornada)
        .execute(&self.pool)
        .await?;
        Ok(resultado.rows_affected() > 0)
    }
}
