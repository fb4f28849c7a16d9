// src/services/depara_service.rs

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::DeParaStore,
    models::depara::{
        ErroLinha, LinhaImportacao, MapeamentoDePara, NovoMapeamento, Prioridade, RejeicaoLote,
        ResolucaoSku, ResultadoImportacao,
    },
};

// Colunas obrigatórias e opcionais da planilha DE/PARA.
const COLUNA_SKU_PEDIDO: &str = "SKU Do Pedido";
const COLUNA_SKU_CORRETO: &str = "SKU Correto Do Pedido";
const COLUNA_SKU_UNITARIO: &str = "SKU Unitario";
const COLUNA_QUANTIDADE_KIT: &str = "Quantidade Do Kit";
const COLUNA_OBSERVACOES: &str = "Observacoes";

#[derive(Clone)]
pub struct DeParaService {
    store: Arc<dyn DeParaStore>,
}

impl DeParaService {
    pub fn new(store: Arc<dyn DeParaStore>) -> Self {
        Self { store }
    }

    // --- RESOLVER ---
    /// Traduz um SKU de pedido para o SKU interno + multiplicador de kit.
    /// `None` = sem mapeamento ativo; é resultado esperado, quem chama decide
    /// o que fazer. Mais de um mapeamento ativo é violação de integridade:
    /// escolhemos deterministicamente o mais recente e avisamos no log.
    pub async fn resolver(
        &self,
        tenant_id: Uuid,
        sku_pedido: &str,
    ) -> Result<Option<ResolucaoSku>, AppError> {
        let sku_pedido = sku_pedido.trim();
        if sku_pedido.is_empty() {
            return Ok(None);
        }

        let ativos = self.store.buscar_ativos(tenant_id, sku_pedido).await?;

        if ativos.len() > 1 {
            tracing::warn!(
                %tenant_id,
                sku_pedido,
                quantidade = ativos.len(),
                "⚠️ Mais de um mapeamento DE/PARA ativo para o mesmo SKU; usando o mais recente"
            );
        }

        Ok(ativos.into_iter().next().map(|m| ResolucaoSku {
            sku_estoque: m.sku_correspondente,
            quantidade_multiplicador: m.quantidade,
            prioridade: m.prioridade,
        }))
    }

    // --- CRUD ---

    pub async fn criar(
        &self,
        tenant_id: Uuid,
        novo: NovoMapeamento,
    ) -> Result<MapeamentoDePara, AppError> {
        self.store.criar(tenant_id, novo).await
    }

    pub async fn listar(
        &self,
        tenant_id: Uuid,
        apenas_ativos: bool,
    ) -> Result<Vec<MapeamentoDePara>, AppError> {
        self.store.listar(tenant_id, apenas_ativos).await
    }

    pub async fn desativar(&self, tenant_id: Uuid, sku_pedido: &str) -> Result<(), AppError> {
        if self.store.desativar(tenant_id, sku_pedido).await? {
            Ok(())
        } else {
            Err(AppError::MapeamentoNaoEncontrado)
        }
    }

    // --- IMPORTAÇÃO EM LOTE ---

    /// Extrai as linhas de uma planilha CSV com colunas nomeadas. Linha sem
    /// algum dos dois SKUs obrigatórios vira erro de linha (pulada), não
    /// aborta a planilha.
    pub fn ler_planilha(texto_csv: &str) -> Result<(Vec<LinhaImportacao>, Vec<ErroLinha>), AppError> {
        let mut leitor = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(texto_csv.as_bytes());

        let cabecalho = leitor
            .headers()
            .map_err(|e| anyhow::anyhow!("Planilha ilegível: {e}"))?
            .clone();
        let indice = |nome: &str| cabecalho.iter().position(|c| c.eq_ignore_ascii_case(nome));

        let (Some(col_pedido), Some(col_correto)) =
            (indice(COLUNA_SKU_PEDIDO), indice(COLUNA_SKU_CORRETO))
        else {
            return Err(anyhow::anyhow!(
                "Planilha sem as colunas obrigatórias '{COLUNA_SKU_PEDIDO}' e '{COLUNA_SKU_CORRETO}'"
            )
            .into());
        };
        let col_unitario = indice(COLUNA_SKU_UNITARIO);
        let col_quantidade = indice(COLUNA_QUANTIDADE_KIT);
        let col_observacoes = indice(COLUNA_OBSERVACOES);

        let mut linhas = Vec::new();
        let mut erros = Vec::new();

        for (i, registro) in leitor.records().enumerate() {
            // +2: o cabeçalho é a linha 1 da planilha.
            let numero_linha = i + 2;

            let registro = match registro {
                Ok(r) => r,
                Err(e) => {
                    erros.push(ErroLinha {
                        numero_linha,
                        motivo: format!("Linha ilegível: {e}"),
                    });
                    continue;
                }
            };

            let celula = |col: Option<usize>| {
                col.and_then(|c| registro.get(c))
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            };

            let sku_pedido = celula(Some(col_pedido));
            let sku_correspondente = celula(Some(col_correto));

            if sku_pedido.is_none() || sku_correspondente.is_none() {
                erros.push(ErroLinha {
                    numero_linha,
                    motivo: "SKU do pedido e SKU correto são obrigatórios".to_string(),
                });
                continue;
            }

            let quantidade = match celula(col_quantidade) {
                // Sem quantidade informada: kit de 1 unidade.
                None => Some(1),
                Some(texto) => match texto.parse::<i32>() {
                    Ok(q) if q > 0 => Some(q),
                    _ => {
                        erros.push(ErroLinha {
                            numero_linha,
                            motivo: format!("Quantidade do kit inválida: '{texto}'"),
                        });
                        continue;
                    }
                },
            };

            linhas.push(LinhaImportacao {
                numero_linha,
                sku_pedido,
                sku_correspondente,
                sku_simples: celula(col_unitario),
                quantidade,
                observacoes: celula(col_observacoes),
            });
        }

        Ok((linhas, erros))
    }

    /// Pré-checagem do lote INTEIRO: SKU repetido dentro da planilha ou já
    /// mapeado no tenant rejeita tudo, com as listas de ofensores. Nenhuma
    /// linha é importada nesse caso (diferente dos erros por linha, que são
    /// tolerados).
    pub async fn validar_lote(
        &self,
        tenant_id: Uuid,
        linhas: &[LinhaImportacao],
    ) -> Result<(), AppError> {
        let mut contagem: HashMap<&str, usize> = HashMap::new();
        for linha in linhas {
            if let Some(sku) = linha.sku_pedido.as_deref() {
                *contagem.entry(sku).or_default() += 1;
            }
        }

        let mut duplicados_no_lote: Vec<String> = contagem
            .iter()
            .filter(|(_, n)| **n > 1)
            .map(|(sku, _)| sku.to_string())
            .collect();
        duplicados_no_lote.sort();

        let skus: Vec<String> = contagem.keys().map(|s| s.to_string()).collect();
        let mut ja_mapeados = self.store.skus_ativos_entre(tenant_id, &skus).await?;
        ja_mapeados.sort();

        if duplicados_no_lote.is_empty() && ja_mapeados.is_empty() {
            Ok(())
        } else {
            Err(AppError::LoteRejeitado(RejeicaoLote {
                duplicados_no_lote,
                ja_mapeados,
            }))
        }
    }

    /// Importa uma planilha CSV completa: extração, pré-checagem do lote e
    /// inserção linha a linha (tolerante a erro por linha).
    pub async fn importar_planilha(
        &self,
        tenant_id: Uuid,
        texto_csv: &str,
    ) -> Result<ResultadoImportacao, AppError> {
        let (linhas, mut erros) = Self::ler_planilha(texto_csv)?;

        self.validar_lote(tenant_id, &linhas).await?;

        let mut importados = 0;
        for linha in linhas {
            let (Some(sku_pedido), Some(sku_correspondente), Some(quantidade)) = (
                linha.sku_pedido.clone(),
                linha.sku_correspondente.clone(),
                linha.quantidade,
            ) else {
                // ler_planilha já garantiu os campos; por via das dúvidas.
                continue;
            };

            let novo = NovoMapeamento {
                sku_pedido,
                sku_correspondente,
                sku_simples: linha.sku_simples.clone(),
                quantidade,
                prioridade: Prioridade::Normal,
                observacoes: linha.observacoes.clone(),
            };

            match self.store.criar(tenant_id, novo).await {
                Ok(_) => importados += 1,
                Err(e) => {
                    tracing::warn!(
                        %tenant_id,
                        numero_linha = linha.numero_linha,
                        erro = %e,
                        "Linha da planilha DE/PARA não importada"
                    );
                    erros.push(ErroLinha {
                        numero_linha: linha.numero_linha,
                        motivo: e.to_string(),
                    });
                }
            }
        }

        Ok(ResultadoImportacao { importados, erros })
    }
}
