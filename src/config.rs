// src/config.rs

use std::{env, sync::Arc, time::Duration};

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    db::{
        AtividadeStore, BancoMemoria, DeParaStore, EstoqueStore, HistoricoVendasStore,
        PgAtividadeRepository, PgDeParaRepository, PgEstoqueRepository, PgVendasRepository,
    },
    services::{
        ConsultorPadrao, DeParaService, EstoqueService, NotificadorLog, ParametrosPrevisao,
        PrevisaoService, ProcessamentoService, VendasService,
    },
};

#[derive(Clone)]
pub struct AppState {
    /// `None` no modo demonstração em memória (REISTOQ_MODO=memoria).
    pub db_pool: Option<PgPool>,
    pub estoque_service: EstoqueService,
    pub depara_service: DeParaService,
    pub processamento_service: ProcessamentoService,
    pub previsao_service: PrevisaoService,
    pub vendas_service: VendasService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        // Modo demonstração: sobe tudo em memória, sem Postgres.
        if env::var("REISTOQ_MODO").as_deref() == Ok("memoria") {
            tracing::warn!("⚠️ REISTOQ_MODO=memoria: dados voláteis, uso apenas em demonstração");
            return Ok(Self::em_memoria());
        }

        let database_url = env::var("DATABASE_URL")?;

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let estoque: Arc<dyn EstoqueStore> = Arc::new(PgEstoqueRepository::new(db_pool.clone()));
        let depara: Arc<dyn DeParaStore> = Arc::new(PgDeParaRepository::new(db_pool.clone()));
        let historico: Arc<dyn HistoricoVendasStore> =
            Arc::new(PgVendasRepository::new(db_pool.clone()));
        let atividade: Arc<dyn AtividadeStore> =
            Arc::new(PgAtividadeRepository::new(db_pool.clone()));

        Ok(Self::montar(
            Some(db_pool),
            estoque,
            depara,
            historico,
            atividade,
        ))
    }

    /// Estado inteiro sobre o banco em memória (demonstração e testes).
    pub fn em_memoria() -> Self {
        let banco = Arc::new(BancoMemoria::new());
        Self::montar(None, banco.clone(), banco.clone(), banco.clone(), banco)
    }

    // --- Monta o gráfico de dependências ---
    fn montar(
        db_pool: Option<PgPool>,
        estoque: Arc<dyn EstoqueStore>,
        depara: Arc<dyn DeParaStore>,
        historico: Arc<dyn HistoricoVendasStore>,
        atividade: Arc<dyn AtividadeStore>,
    ) -> Self {
        let depara_service = DeParaService::new(depara);
        let estoque_service = EstoqueService::new(estoque.clone(), atividade.clone());
        let processamento_service = ProcessamentoService::new(
            depara_service.clone(),
            estoque.clone(),
            historico.clone(),
            atividade.clone(),
            Arc::new(NotificadorLog),
        );
        let previsao_service = PrevisaoService::new(
            estoque.clone(),
            Arc::new(ConsultorPadrao),
            ParametrosPrevisao::do_ambiente(),
        );
        let vendas_service = VendasService::new(historico, estoque, atividade);

        Self {
            db_pool,
            estoque_service,
            depara_service,
            processamento_service,
            previsao_service,
            vendas_service,
        }
    }
}
