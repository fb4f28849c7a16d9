// src/services/previsao_service.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::EstoqueStore,
    models::{
        estoque::TipoMovimentacao,
        previsao::{PrevisaoReposicao, SnapshotConsumo, Tendencia, Variabilidade},
    },
    services::ConsultorReposicao,
};

// ---
// Parâmetros do motor de previsão.
// ---
// Passados explicitamente na construção do service (nada de globais
// mutáveis): os testes injetam os valores que quiserem.
#[derive(Debug, Clone)]
pub struct ParametrosPrevisao {
    /// Janela de análise padrão, em dias.
    pub dias_analise: i64,
    /// Dias entre disparar a reposição e o estoque chegar.
    pub lead_time_dias: i64,
    /// Margens de segurança por variabilidade do consumo.
    pub margem_alta: f64,
    pub margem_media: f64,
    pub margem_baixa: f64,
    /// Tempo máximo dado ao consultor externo.
    pub timeout_consultor: Duration,
}

impl Default for ParametrosPrevisao {
    fn default() -> Self {
        Self {
            dias_analise: 30,
            lead_time_dias: 7,
            margem_alta: 2.0,
            margem_media: 1.5,
            margem_baixa: 1.2,
            timeout_consultor: Duration::from_secs(5),
        }
    }
}

impl ParametrosPrevisao {
    /// Lê os parâmetros do ambiente, caindo nos padrões campo a campo.
    pub fn do_ambiente() -> Self {
        fn ler<T: std::str::FromStr>(chave: &str, padrao: T) -> T {
            std::env::var(chave)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(padrao)
        }

        let padrao = Self::default();
        Self {
            dias_analise: ler("PREVISAO_DIAS_ANALISE", padrao.dias_analise),
            lead_time_dias: ler("PREVISAO_LEAD_TIME_DIAS", padrao.lead_time_dias),
            margem_alta: ler("PREVISAO_MARGEM_ALTA", padrao.margem_alta),
            margem_media: ler("PREVISAO_MARGEM_MEDIA", padrao.margem_media),
            margem_baixa: ler("PREVISAO_MARGEM_BAIXA", padrao.margem_baixa),
            timeout_consultor: Duration::from_secs(ler(
                "PREVISAO_TIMEOUT_CONSULTOR_SEGUNDOS",
                padrao.timeout_consultor.as_secs(),
            )),
        }
    }
}

// ---
// Motor de previsão de reposição.
// ---
// O caminho numérico (consumo, tendência, variabilidade, quantidade e data
// sugeridas) é autossuficiente. O consultor externo só enriquece o texto e
// a confiança; se falhar ou demorar, a previsão sai do mesmo jeito.
#[derive(Clone)]
pub struct PrevisaoService {
    estoque: Arc<dyn EstoqueStore>,
    consultor: Arc<dyn ConsultorReposicao>,
    parametros: ParametrosPrevisao,
}

impl PrevisaoService {
    pub fn new(
        estoque: Arc<dyn EstoqueStore>,
        consultor: Arc<dyn ConsultorReposicao>,
        parametros: ParametrosPrevisao,
    ) -> Self {
        Self {
            estoque,
            consultor,
            parametros,
        }
    }

    pub async fn prever(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
        dias_analise: Option<i64>,
    ) -> Result<PrevisaoReposicao, AppError> {
        let produto = self
            .estoque
            .buscar_produto(tenant_id, produto_id)
            .await?
            .ok_or(AppError::ProdutoNaoEncontrado)?;

        let dias = dias_analise.unwrap_or(self.parametros.dias_analise).max(1);
        let inicio = Utc::now() - chrono::Duration::days(dias);
        let movimentacoes = self
            .estoque
            .movimentacoes_desde(tenant_id, produto_id, inicio)
            .await?;

        // Ordem cronológica (garantida pelo store); as saídas formam a série
        // de consumo.
        let saidas: Vec<i32> = movimentacoes
            .iter()
            .filter(|m| m.tipo == TipoMovimentacao::Saida)
            .map(|m| m.quantidade)
            .collect();
        let total_saidas: i64 = saidas.iter().map(|&q| q as i64).sum();
        let total_entradas: i64 = movimentacoes
            .iter()
            .filter(|m| m.tipo == TipoMovimentacao::Entrada)
            .map(|m| m.quantidade as i64)
            .sum();

        let consumo_medio_diario = total_saidas as f64 / dias as f64;
        let tendencia = classificar_tendencia(&saidas);
        let variabilidade = classificar_variabilidade(&saidas, consumo_medio_diario);

        let dias_para_esgotar = if consumo_medio_diario > 0.0 {
            Some(produto.quantidade_atual as f64 / consumo_medio_diario)
        } else {
            None
        };

        let margem = match variabilidade {
            Variabilidade::Alta => self.parametros.margem_alta,
            Variabilidade::Media => self.parametros.margem_media,
            Variabilidade::Baixa => self.parametros.margem_baixa,
        };
        let quantidade_sugerida = ((consumo_medio_diario
            * self.parametros.lead_time_dias as f64
            * margem)
            .ceil() as i32)
            .max(produto.estoque_minimo);

        let data_reposicao_sugerida = dias_para_esgotar.map(|d| {
            let espera = (d - self.parametros.lead_time_dias as f64 - 2.0).max(0.0);
            Utc::now().date_naive() + chrono::Duration::days(espera.floor() as i64)
        });

        // Enriquecimento opcional. Nunca bloqueia nem derruba a previsão.
        let snapshot = SnapshotConsumo {
            sku: produto.sku.clone(),
            nome: produto.nome.clone(),
            quantidade_atual: produto.quantidade_atual,
            estoque_minimo: produto.estoque_minimo,
            dias_analise: dias,
            total_saidas,
            total_entradas,
            consumo_medio_diario,
            tendencia: tendencia.as_str().to_string(),
            variabilidade: variabilidade.as_str().to_string(),
        };
        let parecer = match tokio::time::timeout(
            self.parametros.timeout_consultor,
            self.consultor.analisar(&snapshot),
        )
        .await
        {
            Ok(Ok(parecer)) => parecer,
            Ok(Err(e)) => {
                tracing::warn!(sku = %produto.sku, erro = %e, "Consultor de reposição falhou; usando fallback");
                Default::default()
            }
            Err(_) => {
                tracing::warn!(sku = %produto.sku, "Consultor de reposição estourou o tempo limite; usando fallback");
                Default::default()
            }
        };

        let confianca = parecer
            .confianca
            .unwrap_or(if saidas.is_empty() { 60 } else { 70 })
            .min(100);
        let insights = parecer.insights.unwrap_or_else(|| {
            if saidas.is_empty() {
                format!(
                    "Sem saídas nos últimos {dias} dias; com o consumo atual o estoque não esgota."
                )
            } else {
                format!(
                    "Consumo médio de {consumo_medio_diario:.1} un./dia nos últimos {dias} dias, tendência {}.",
                    tendencia.as_str()
                )
            }
        });
        let quantidade_sugerida = parecer
            .quantidade_sugerida
            .filter(|&q| q > 0)
            .unwrap_or(quantidade_sugerida);

        let mut recomendacoes = parecer.recomendacoes;
        if recomendacoes.is_empty() {
            recomendacoes.push(match tendencia {
                Tendencia::Crescente => {
                    "Consumo em alta: considere antecipar a próxima reposição.".to_string()
                }
                Tendencia::Decrescente => {
                    "Consumo em queda: reveja a quantidade sugerida antes de comprar.".to_string()
                }
                Tendencia::Estavel => {
                    "Consumo estável: reposição pode seguir o ritmo habitual.".to_string()
                }
            });
        }
        if let Some(d) = dias_para_esgotar {
            if d < 7.0 {
                recomendacoes.insert(
                    0,
                    format!("URGENTE: estoque esgota em aproximadamente {} dia(s).", d.ceil() as i64),
                );
            } else if d < 14.0 {
                recomendacoes.insert(
                    0,
                    format!("ATENÇÃO: estoque esgota em aproximadamente {} dia(s).", d.ceil() as i64),
                );
            }
        }

        Ok(PrevisaoReposicao {
            produto_id: produto.id,
            sku: produto.sku,
            nome: produto.nome,
            quantidade_atual: produto.quantidade_atual,
            estoque_minimo: produto.estoque_minimo,
            dias_analise: dias,
            total_saidas,
            total_entradas,
            consumo_medio_diario,
            tendencia,
            variabilidade,
            dias_para_esgotar,
            quantidade_sugerida,
            data_reposicao_sugerida,
            confianca,
            insights,
            recomendacoes,
        })
    }
}

/// Compara a média de saída da metade recente com a da metade antiga.
/// Recente > antiga × 1.1 → crescente; recente < antiga × 0.9 → decrescente.
fn classificar_tendencia(saidas: &[i32]) -> Tendencia {
    if saidas.len() < 2 {
        return Tendencia::Estavel;
    }
    let meio = saidas.len() / 2;
    let media = |fatia: &[i32]| {
        fatia.iter().map(|&q| q as f64).sum::<f64>() / fatia.len() as f64
    };
    let antiga = media(&saidas[..meio]);
    let recente = media(&saidas[meio..]);

    if recente > antiga * 1.1 {
        Tendencia::Crescente
    } else if recente < antiga * 0.9 {
        Tendencia::Decrescente
    } else {
        Tendencia::Estavel
    }
}

/// Coeficiente = desvio absoluto médio das saídas em relação ao consumo
/// médio diário. > 0.5 → alta; < 0.2 → baixa; sem consumo → média.
fn classificar_variabilidade(saidas: &[i32], consumo_medio_diario: f64) -> Variabilidade {
    if saidas.is_empty() || consumo_medio_diario <= 0.0 {
        return Variabilidade::Media;
    }
    let desvio = saidas
        .iter()
        .map(|&q| (q as f64 - consumo_medio_diario).abs())
        .sum::<f64>()
        / saidas.len() as f64;
    let coeficiente = desvio / consumo_medio_diario;

    if coeficiente > 0.5 {
        Variabilidade::Alta
    } else if coeficiente < 0.2 {
        Variabilidade::Baixa
    } else {
        Variabilidade::Media
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::BancoMemoria;
    use crate::models::estoque::NovoProduto;
    use crate::models::previsao::ParecerReposicao;
    use crate::services::ConsultorPadrao;
    use async_trait::async_trait;

    fn novo_produto(sku: &str, quantidade: i32, minimo: i32) -> NovoProduto {
        NovoProduto {
            sku: sku.to_string(),
            nome: format!("Produto {sku}"),
            categoria: None,
            quantidade_inicial: quantidade,
            estoque_minimo: minimo,
            estoque_maximo: 100,
            preco_custo: None,
            preco_venda: None,
            codigo_barras: None,
        }
    }

    fn servico(
        banco: Arc<BancoMemoria>,
        consultor: Arc<dyn ConsultorReposicao>,
    ) -> PrevisaoService {
        PrevisaoService::new(banco, consultor, ParametrosPrevisao::default())
    }

    /// Uma saída por dia, da mais antiga para a mais recente.
    async fn saidas_diarias(banco: &BancoMemoria, tenant: Uuid, produto: Uuid, quantidades: &[i32]) {
        let hoje = Utc::now();
        let total = quantidades.len() as i64;
        for (i, &q) in quantidades.iter().enumerate() {
            banco
                .inserir_movimentacao_retroativa(
                    tenant,
                    produto,
                    TipoMovimentacao::Saida,
                    q,
                    hoje - chrono::Duration::days(total - 1 - i as i64),
                )
                .await;
        }
    }

    #[test]
    fn tendencia_compara_as_duas_metades() {
        // 15 dias a 2/dia seguidos de 15 dias a 3/dia: 3 > 2 × 1.1.
        let mut saidas = vec![2; 15];
        saidas.extend(vec![3; 15]);
        assert_eq!(classificar_tendencia(&saidas), Tendencia::Crescente);

        let mut saidas = vec![3; 15];
        saidas.extend(vec![2; 15]);
        assert_eq!(classificar_tendencia(&saidas), Tendencia::Decrescente);

        assert_eq!(classificar_tendencia(&[2; 30]), Tendencia::Estavel);
        assert_eq!(classificar_tendencia(&[]), Tendencia::Estavel);
        assert_eq!(classificar_tendencia(&[5]), Tendencia::Estavel);
    }

    #[test]
    fn variabilidade_usa_o_desvio_absoluto_medio() {
        // Saídas idênticas ao consumo médio: coeficiente zero.
        assert_eq!(classificar_variabilidade(&[2; 30], 2.0), Variabilidade::Baixa);
        // Saídas muito acima da média diária: coeficiente alto.
        assert_eq!(classificar_variabilidade(&[10, 1, 10, 1], 2.0), Variabilidade::Alta);
        // Sem consumo não há o que medir.
        assert_eq!(classificar_variabilidade(&[], 0.0), Variabilidade::Media);
    }

    // Produto sem nenhuma saída na janela: nada de divisão por zero, o
    // estoque "nunca" esgota e a confiança cai para o piso.
    #[tokio::test]
    async fn sem_historico_a_previsao_sai_com_confianca_baixa() {
        let banco = Arc::new(BancoMemoria::new());
        let servico = servico(banco.clone(), Arc::new(ConsultorPadrao));
        let tenant = Uuid::new_v4();
        let produto = banco
            .criar_produto(tenant, novo_produto("SKU-1", 0, 5))
            .await
            .unwrap();

        let previsao = servico.prever(tenant, produto.id, None).await.unwrap();

        assert_eq!(previsao.consumo_medio_diario, 0.0);
        assert_eq!(previsao.tendencia, Tendencia::Estavel);
        assert_eq!(previsao.variabilidade, Variabilidade::Media);
        assert!(previsao.dias_para_esgotar.is_none());
        assert!(previsao.data_reposicao_sugerida.is_none());
        assert_eq!(previsao.confianca, 60);
        // Sem consumo, a sugestão cai no estoque mínimo.
        assert_eq!(previsao.quantidade_sugerida, 5);
    }

    #[tokio::test]
    async fn consumo_crescente_e_classificado_como_crescente() {
        let banco = Arc::new(BancoMemoria::new());
        let servico = servico(banco.clone(), Arc::new(ConsultorPadrao));
        let tenant = Uuid::new_v4();
        let produto = banco
            .criar_produto(tenant, novo_produto("SKU-1", 100, 5))
            .await
            .unwrap();

        let mut quantidades = vec![2; 15];
        quantidades.extend(vec![3; 15]);
        saidas_diarias(&banco, tenant, produto.id, &quantidades).await;

        let previsao = servico.prever(tenant, produto.id, Some(30)).await.unwrap();

        assert_eq!(previsao.total_saidas, 75);
        assert_eq!(previsao.consumo_medio_diario, 2.5);
        assert_eq!(previsao.tendencia, Tendencia::Crescente);
        assert_eq!(previsao.confianca, 70);
        // 100 / 2.5 = 40 dias até esgotar.
        assert_eq!(previsao.dias_para_esgotar, Some(40.0));
        // 40 - 7 - 2 = 31 dias de folga até disparar a compra.
        assert_eq!(
            previsao.data_reposicao_sugerida,
            Some(Utc::now().date_naive() + chrono::Duration::days(31))
        );
    }

    #[tokio::test]
    async fn consumo_constante_sugere_pela_margem_baixa() {
        let banco = Arc::new(BancoMemoria::new());
        let servico = servico(banco.clone(), Arc::new(ConsultorPadrao));
        let tenant = Uuid::new_v4();
        let produto = banco
            .criar_produto(tenant, novo_produto("SKU-1", 10, 5))
            .await
            .unwrap();

        saidas_diarias(&banco, tenant, produto.id, &[2; 30]).await;

        let previsao = servico.prever(tenant, produto.id, Some(30)).await.unwrap();

        assert_eq!(previsao.variabilidade, Variabilidade::Baixa);
        // ceil(2.0 × 7 × 1.2) = 17 > mínimo 5.
        assert_eq!(previsao.quantidade_sugerida, 17);
        // 10 / 2 = 5 dias: sinalização de urgência na frente das demais.
        assert_eq!(previsao.dias_para_esgotar, Some(5.0));
        assert!(previsao.recomendacoes[0].starts_with("URGENTE"));
        // 5 - 7 - 2 < 0: repor imediatamente.
        assert_eq!(
            previsao.data_reposicao_sugerida,
            Some(Utc::now().date_naive())
        );
    }

    #[tokio::test]
    async fn esgotamento_entre_sete_e_quatorze_dias_vira_atencao() {
        let banco = Arc::new(BancoMemoria::new());
        let servico = servico(banco.clone(), Arc::new(ConsultorPadrao));
        let tenant = Uuid::new_v4();
        let produto = banco
            .criar_produto(tenant, novo_produto("SKU-1", 20, 5))
            .await
            .unwrap();

        saidas_diarias(&banco, tenant, produto.id, &[2; 30]).await;

        let previsao = servico.prever(tenant, produto.id, Some(30)).await.unwrap();
        assert_eq!(previsao.dias_para_esgotar, Some(10.0));
        assert!(previsao.recomendacoes[0].starts_with("ATENÇÃO"));
    }

    // O parecer do consultor, quando chega, enriquece a previsão.
    #[tokio::test]
    async fn parecer_do_consultor_enriquece_a_previsao() {
        struct ConsultorFixo;

        #[async_trait]
        impl ConsultorReposicao for ConsultorFixo {
            async fn analisar(
                &self,
                _snapshot: &SnapshotConsumo,
            ) -> Result<ParecerReposicao, AppError> {
                Ok(ParecerReposicao {
                    insights: Some("Pico sazonal esperado.".to_string()),
                    recomendacoes: vec!["Negociar lote maior com o fornecedor.".to_string()],
                    quantidade_sugerida: Some(50),
                    confianca: Some(92),
                    ..Default::default()
                })
            }
        }

        let banco = Arc::new(BancoMemoria::new());
        let servico = servico(banco.clone(), Arc::new(ConsultorFixo));
        let tenant = Uuid::new_v4();
        let produto = banco
            .criar_produto(tenant, novo_produto("SKU-1", 100, 5))
            .await
            .unwrap();
        saidas_diarias(&banco, tenant, produto.id, &[2; 10]).await;

        let previsao = servico.prever(tenant, produto.id, Some(30)).await.unwrap();
        assert_eq!(previsao.confianca, 92);
        assert_eq!(previsao.quantidade_sugerida, 50);
        assert_eq!(previsao.insights, "Pico sazonal esperado.");
        assert_eq!(
            previsao.recomendacoes,
            vec!["Negociar lote maior com o fornecedor.".to_string()]
        );
    }

    // Consultor quebrado ou lento: a parte numérica sai intacta.
    #[tokio::test]
    async fn consultor_com_erro_cai_no_fallback() {
        struct ConsultorQuebrado;

        #[async_trait]
        impl ConsultorReposicao for ConsultorQuebrado {
            async fn analisar(
                &self,
                _snapshot: &SnapshotConsumo,
            ) -> Result<ParecerReposicao, AppError> {
                Err(anyhow::anyhow!("provedor fora do ar").into())
            }
        }

        let banco = Arc::new(BancoMemoria::new());
        let servico = servico(banco.clone(), Arc::new(ConsultorQuebrado));
        let tenant = Uuid::new_v4();
        let produto = banco
            .criar_produto(tenant, novo_produto("SKU-1", 100, 5))
            .await
            .unwrap();
        saidas_diarias(&banco, tenant, produto.id, &[2; 10]).await;

        let previsao = servico.prever(tenant, produto.id, Some(30)).await.unwrap();
        assert_eq!(previsao.confianca, 70);
        assert!(!previsao.insights.is_empty());
        assert!(previsao.total_saidas > 0);
    }

    #[tokio::test]
    async fn consultor_lento_nao_bloqueia_a_previsao() {
        struct ConsultorLento;

        #[async_trait]
        impl ConsultorReposicao for ConsultorLento {
            async fn analisar(
                &self,
                _snapshot: &SnapshotConsumo,
            ) -> Result<ParecerReposicao, AppError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Default::default())
            }
        }

        tokio::time::pause();

        let banco = Arc::new(BancoMemoria::new());
        let servico = servico(banco.clone(), Arc::new(ConsultorLento));
        let tenant = Uuid::new_v4();
        let produto = banco
            .criar_produto(tenant, novo_produto("SKU-1", 100, 5))
            .await
            .unwrap();

        let previsao = servico.prever(tenant, produto.id, None).await.unwrap();
        assert_eq!(previsao.confianca, 60);
    }

    #[tokio::test]
    async fn produto_inexistente_e_404() {
        let banco = Arc::new(BancoMemoria::new());
        let servico = servico(banco.clone(), Arc::new(ConsultorPadrao));
        let erro = servico
            .prever(Uuid::new_v4(), Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert!(matches!(erro, AppError::ProdutoNaoEncontrado));
    }
}
