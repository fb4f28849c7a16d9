// src/db/memoria.rs
//
// Implementação em memória dos quatro gateways. Usada pelos testes e pelo
// modo demonstração (REISTOQ_MODO=memoria), onde não há Postgres.
// Um único Mutex guarda todo o estado: é o equivalente da fronteira
// transacional do Postgres — a sequência lê-checa-escreve roda inteira
// com o lock em mãos.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        depara::{MapeamentoDePara, NovoMapeamento},
        estoque::{MovimentacaoEstoque, NovoProduto, Produto, TipoMovimentacao},
        vendas::{FiltroVendas, NovoRegistroVenda, RegistroVenda, StatusVenda},
    },
};

use super::{AtividadeStore, DeParaStore, EstoqueStore, HistoricoVendasStore};

#[derive(Debug, Clone)]
pub struct AtividadeRegistrada {
    pub tenant_id: Uuid,
    pub tipo: String,
    pub descricao: String,
    pub detalhes: serde_json::Value,
}

#[derive(Default)]
struct Estado {
    produtos: HashMap<Uuid, Produto>,
    movimentacoes: Vec<MovimentacaoEstoque>,
    mapeamentos: Vec<MapeamentoDePara>,
    vendas: Vec<RegistroVenda>,
    atividades: Vec<AtividadeRegistrada>,
}

#[derive(Clone, Default)]
pub struct BancoMemoria {
    estado: Arc<Mutex<Estado>>,
}

impl BancoMemoria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acesso de teste: atividades registradas até agora.
    pub async fn atividades(&self) -> Vec<AtividadeRegistrada> {
        self.estado.lock().await.atividades.clone()
    }

    /// Acesso de teste: todas as movimentações do produto, em ordem.
    pub async fn movimentacoes_do_produto(&self, produto_id: Uuid) -> Vec<MovimentacaoEstoque> {
        self.estado
            .lock()
            .await
            .movimentacoes
            .iter()
            .filter(|m| m.produto_id == produto_id)
            .cloned()
            .collect()
    }

    /// Acesso de teste: insere um mapeamento SEM a checagem de unicidade,
    /// simulando a violação de integridade que o resolver precisa tolerar.
    pub async fn inserir_mapeamento_bruto(&self, mapeamento: MapeamentoDePara) {
        self.estado.lock().await.mapeamentos.push(mapeamento);
    }

    /// Insere uma movimentação com data retroativa (montagem de cenários de
    /// previsão nos testes). Não altera o saldo do produto.
    pub async fn inserir_movimentacao_retroativa(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
        tipo: TipoMovimentacao,
        quantidade: i32,
        criado_em: DateTime<Utc>,
    ) {
        let mut estado = self.estado.lock().await;
        estado.movimentacoes.push(MovimentacaoEstoque {
            id: Uuid::new_v4(),
            tenant_id,
            produto_id,
            tipo,
            quantidade,
            quantidade_anterior: 0,
            quantidade_nova: 0,
            motivo: "Histórico de teste".to_string(),
            observacoes: None,
            criado_em,
        });
    }
}

// ---
// EstoqueStore
// ---
#[async_trait]
impl EstoqueStore for BancoMemoria {
    async fn criar_produto(&self, tenant_id: Uuid, novo: NovoProduto) -> Result<Produto, AppError> {
        let mut estado = self.estado.lock().await;

        let sku_em_uso = estado
            .produtos
            .values()
            .any(|p| p.tenant_id == tenant_id && p.sku == novo.sku);
        if sku_em_uso {
            return Err(AppError::SkuJaExiste);
        }

        let agora = Utc::now();
        let produto = Produto {
            id: Uuid::new_v4(),
            tenant_id,
            sku: novo.sku,
            nome: novo.nome,
            categoria: novo.categoria,
            quantidade_atual: novo.quantidade_inicial,
            estoque_minimo: novo.estoque_minimo,
            estoque_maximo: novo.estoque_maximo,
            preco_custo: novo.preco_custo,
            preco_venda: novo.preco_venda,
            codigo_barras: novo.codigo_barras,
            ativo: true,
            ultima_movimentacao: None,
            criado_em: agora,
            atualizado_em: agora,
        };

        if novo.quantidade_inicial > 0 {
            estado.movimentacoes.push(MovimentacaoEstoque {
                id: Uuid::new_v4(),
                tenant_id,
                produto_id: produto.id,
                tipo: TipoMovimentacao::Entrada,
                quantidade: novo.quantidade_inicial,
                quantidade_anterior: 0,
                quantidade_nova: novo.quantidade_inicial,
                motivo: "Estoque inicial".to_string(),
                observacoes: None,
                criado_em: agora,
            });
        }

        estado.produtos.insert(produto.id, produto.clone());
        Ok(produto)
    }

    async fn buscar_produto(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
    ) -> Result<Option<Produto>, AppError> {
        let estado = self.estado.lock().await;
        Ok(estado
            .produtos
            .get(&produto_id)
            .filter(|p| p.tenant_id == tenant_id)
            .cloned())
    }

    async fn buscar_por_sku(
        &self,
        tenant_id: Uuid,
        sku: &str,
    ) -> Result<Option<Produto>, AppError> {
        let estado = self.estado.lock().await;
        Ok(estado
            .produtos
            .values()
            .find(|p| p.tenant_id == tenant_id && p.sku == sku)
            .cloned())
    }

    async fn listar_produtos(
        &self,
        tenant_id: Uuid,
        apenas_ativos: bool,
    ) -> Result<Vec<Produto>, AppError> {
        let estado = self.estado.lock().await;
        let mut produtos: Vec<Produto> = estado
            .produtos
            .values()
            .filter(|p| p.tenant_id == tenant_id && (!apenas_ativos || p.ativo))
            .cloned()
            .collect();
        produtos.sort_by(|a, b| a.nome.cmp(&b.nome));
        Ok(produtos)
    }

    async fn desativar_produto(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
    ) -> Result<bool, AppError> {
        let mut estado = self.estado.lock().await;
        match estado
            .produtos
            .get_mut(&produto_id)
            .filter(|p| p.tenant_id == tenant_id && p.ativo)
        {
            Some(produto) => {
                produto.ativo = false;
                produto.atualizado_em = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn baixa_condicional(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
        quantidade: i32,
        motivo: &str,
        observacoes: Option<&str>,
    ) -> Result<Option<MovimentacaoEstoque>, AppError> {
        let mut estado = self.estado.lock().await;
        let agora = Utc::now();

        let Some(produto) = estado
            .produtos
            .get_mut(&produto_id)
            .filter(|p| p.tenant_id == tenant_id && p.ativo && p.quantidade_atual >= quantidade)
        else {
            return Ok(None);
        };

        let anterior = produto.quantidade_atual;
        produto.quantidade_atual -= quantidade;
        produto.ultima_movimentacao = Some(agora);
        produto.atualizado_em = agora;
        let nova = produto.quantidade_atual;

        let movimentacao = MovimentacaoEstoque {
            id: Uuid::new_v4(),
            tenant_id,
            produto_id,
            tipo: TipoMovimentacao::Saida,
            quantidade,
            quantidade_anterior: anterior,
            quantidade_nova: nova,
            motivo: motivo.to_string(),
            observacoes: observacoes.map(str::to_string),
            criado_em: agora,
        };
        estado.movimentacoes.push(movimentacao.clone());
        Ok(Some(movimentacao))
    }

    async fn registrar_entrada(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
        quantidade: i32,
        motivo: &str,
        observacoes: Option<&str>,
    ) -> Result<MovimentacaoEstoque, AppError> {
        let mut estado = self.estado.lock().await;
        let agora = Utc::now();

        let produto = estado
            .produtos
            .get_mut(&produto_id)
            .filter(|p| p.tenant_id == tenant_id)
            .ok_or(AppError::ProdutoNaoEncontrado)?;

        let anterior = produto.quantidade_atual;
        produto.quantidade_atual += quantidade;
        produto.ultima_movimentacao = Some(agora);
        produto.atualizado_em = agora;
        let nova = produto.quantidade_atual;

        let movimentacao = MovimentacaoEstoque {
            id: Uuid::new_v4(),
            tenant_id,
            produto_id,
            tipo: TipoMovimentacao::Entrada,
            quantidade,
            quantidade_anterior: anterior,
            quantidade_nova: nova,
            motivo: motivo.to_string(),
            observacoes: observacoes.map(str::to_string),
            criado_em: agora,
        };
        estado.movimentacoes.push(movimentacao.clone());
        Ok(movimentacao)
    }

    async fn movimentacoes_desde(
        &self,
        tenant_id: Uuid,
        produto_id: Uuid,
        inicio: DateTime<Utc>,
    ) -> Result<Vec<MovimentacaoEstoque>, AppError> {
        let estado = self.estado.lock().await;
        let mut movimentacoes: Vec<MovimentacaoEstoque> = estado
            .movimentacoes
            .iter()
            .filter(|m| {
                m.tenant_id == tenant_id && m.produto_id == produto_id && m.criado_em >= inicio
            })
            .cloned()
            .collect();
        movimentacoes.sort_by_key(|m| m.criado_em);
        Ok(movimentacoes)
    }

    async fn buscar_movimentacao(
        &self,
        tenant_id: Uuid,
        movimentacao_id: Uuid,
    ) -> Result<Option<MovimentacaoEstoque>, AppError> {
        let estado = self.estado.lock().await;
        Ok(estado
            .movimentacoes
            .iter()
            .find(|m| m.tenant_id == tenant_id && m.id == movimentacao_id)
            .cloned())
    }
}

// ---
// DeParaStore
// ---
#[async_trait]
impl DeParaStore for BancoMemoria {
    async fn criar(
        &self,
        tenant_id: Uuid,
        novo: NovoMapeamento,
    ) -> Result<MapeamentoDePara, AppError> {
        let mut estado = self.estado.lock().await;

        let ja_existe = estado
            .mapeamentos
            .iter()
            .any(|m| m.tenant_id == tenant_id && m.ativo && m.sku_pedido == novo.sku_pedido);
        if ja_existe {
            return Err(AppError::MapeamentoJaExiste(novo.sku_pedido));
        }

        let agora = Utc::now();
        let mapeamento = MapeamentoDePara {
            id: Uuid::new_v4(),
            tenant_id,
            sku_pedido: novo.sku_pedido,
            sku_correspondente: novo.sku_correspondente,
            sku_simples: novo.sku_simples,
            quantidade: novo.quantidade,
            prioridade: novo.prioridade,
            ativo: true,
            observacoes: novo.observacoes,
            criado_em: agora,
            atualizado_em: agora,
        };
        estado.mapeamentos.push(mapeamento.clone());
        Ok(mapeamento)
    }

    async fn buscar_ativos(
        &self,
        tenant_id: Uuid,
        sku_pedido: &str,
    ) -> Result<Vec<MapeamentoDePara>, AppError> {
        let estado = self.estado.lock().await;
        let mut mapeamentos: Vec<MapeamentoDePara> = estado
            .mapeamentos
            .iter()
            .filter(|m| m.tenant_id == tenant_id && m.ativo && m.sku_pedido == sku_pedido)
            .cloned()
            .collect();
        // Mais recente primeiro, como no ORDER BY do Postgres.
        mapeamentos.sort_by(|a, b| b.atualizado_em.cmp(&a.atualizado_em));
        Ok(mapeamentos)
    }

    async fn skus_ativos_entre(
        &self,
        tenant_id: Uuid,
        skus: &[String],
    ) -> Result<Vec<String>, AppError> {
        let estado = self.estado.lock().await;
        Ok(estado
            .mapeamentos
            .iter()
            .filter(|m| m.tenant_id == tenant_id && m.ativo && skus.contains(&m.sku_pedido))
            .map(|m| m.sku_pedido.clone())
            .collect())
    }

    async fn listar(
        &self,
        tenant_id: Uuid,
        apenas_ativos: bool,
    ) -> Result<Vec<MapeamentoDePara>, AppError> {
        let estado = self.estado.lock().await;
        let mut mapeamentos: Vec<MapeamentoDePara> = estado
            .mapeamentos
            .iter()
            .filter(|m| m.tenant_id == tenant_id && (!apenas_ativos || m.ativo))
            .cloned()
            .collect();
        mapeamentos.sort_by(|a, b| a.sku_pedido.cmp(&b.sku_pedido));
        Ok(mapeamentos)
    }

    async fn desativar(&self, tenant_id: Uuid, sku_pedido: &str) -> Result<bool, AppError> {
        let mut estado = self.estado.lock().await;
        let mut desativou = false;
        for mapeamento in estado
            .mapeamentos
            .iter_mut()
            .filter(|m| m.tenant_id == tenant_id && m.ativo && m.sku_pedido == sku_pedido)
        {
            mapeamento.ativo = false;
            mapeamento.atualizado_em = Utc::now();
            desativou = true;
        }
        Ok(desativou)
    }
}

// ---
// HistoricoVendasStore
// ---
#[async_trait]
impl HistoricoVendasStore for BancoMemoria {
    async fn existe(
        &self,
        tenant_id: Uuid,
        numero_pedido: &str,
        sku_pedido: &str,
    ) -> Result<bool, AppError> {
        let estado = self.estado.lock().await;
        Ok(estado.vendas.iter().any(|v| {
            v.tenant_id == tenant_id
                && v.numero_pedido == numero_pedido
                && v.sku_pedido == sku_pedido
        }))
    }

    async fn inserir(
        &self,
        tenant_id: Uuid,
        novo: NovoRegistroVenda,
    ) -> Result<RegistroVenda, AppError> {
        let mut estado = self.estado.lock().await;

        let duplicada = estado.vendas.iter().any(|v| {
            v.tenant_id == tenant_id
                && v.numero_pedido == novo.numero_pedido
                && v.sku_pedido == novo.sku_pedido
        });
        if duplicada {
            return Err(AppError::VendaJaRegistrada);
        }

        let agora = Utc::now();
        let venda = RegistroVenda {
            id: Uuid::new_v4(),
            tenant_id,
            numero_pedido: novo.numero_pedido,
            sku_pedido: novo.sku_pedido,
            sku_estoque: novo.sku_estoque,
            nome_produto: novo.nome_produto,
            quantidade: novo.quantidade,
            quantidade_baixada: novo.quantidade_baixada,
            valor_unitario: novo.valor_unitario,
            valor_total: novo
                .valor_unitario
                .map(|v| v * rust_decimal::Decimal::from(novo.quantidade)),
            cliente_nome: novo.cliente_nome,
            cliente_documento: novo.cliente_documento,
            status: StatusVenda::Registrada,
            movimentacao_id: novo.movimentacao_id,
            observacoes: novo.observacoes,
            data_venda: agora,
            criado_em: agora,
        };
        estado.vendas.push(venda.clone());
        Ok(venda)
    }

    async fn buscar(
        &self,
        tenant_id: Uuid,
        venda_id: Uuid,
    ) -> Result<Option<RegistroVenda>, AppError> {
        let estado = self.estado.lock().await;
        Ok(estado
            .vendas
            .iter()
            .find(|v| v.tenant_id == tenant_id && v.id == venda_id)
            .cloned())
    }

    async fn listar(
        &self,
        tenant_id: Uuid,
        filtro: FiltroVendas,
    ) -> Result<Vec<RegistroVenda>, AppError> {
        let estado = self.estado.lock().await;
        let mut vendas: Vec<RegistroVenda> = estado
            .vendas
            .iter()
            .filter(|v| {
                v.tenant_id == tenant_id
                    && filtro
                        .numero_pedido
                        .as_ref()
                        .is_none_or(|n| &v.numero_pedido == n)
                    && filtro.status.is_none_or(|s| v.status == s)
            })
            .cloned()
            .collect();
        vendas.sort_by(|a, b| b.data_venda.cmp(&a.data_venda));
        Ok(vendas)
    }

    async fn marcar_estornada(&self, tenant_id: Uuid, venda_id: Uuid) -> Result<bool, AppError> {
        let mut estado = self.estado.lock().await;
        match estado
            .vendas
            .iter_mut()
            .find(|v| v.tenant_id == tenant_id && v.id == venda_id)
        {
            Some(venda) if venda.status == StatusVenda::Registrada => {
                venda.status = StatusVenda::Estornada;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reabrir(&self, tenant_id: Uuid, venda_id: Uuid) -> Result<bool, AppError> {
        let mut estado = self.estado.lock().await;
        match estado
            .vendas
            .iter_mut()
            .find(|v| v.tenant_id == tenant_id && v.id == venda_id)
        {
            Some(venda) if venda.status == StatusVenda::Estornada => {
                venda.status = StatusVenda::Registrada;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ---
// AtividadeStore
// ---
#[async_trait]
impl AtividadeStore for BancoMemoria {
    async fn registrar(
        &self,
        tenant_id: Uuid,
        tipo: &str,
        descricao: &str,
        detalhes: serde_json::Value,
    ) -> Result<(), AppError> {
        let mut estado = self.estado.lock().await;
        estado.atividades.push(AtividadeRegistrada {
            tenant_id,
            tipo: tipo.to_string(),
            descricao: descricao.to_string(),
            detalhes,
        });
        Ok(())
    }
}
