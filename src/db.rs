// src/db.rs
//
// Gateways de dados. Cada preocupação tem um trait estreito (o resto do
// código nunca sabe COMO o acesso é feito) e duas implementações: Postgres
// (produção) e memória (testes e modo demonstração).

pub mod atividade_repo;
pub mod depara_repo;
pub mod estoque_repo;
pub mod memoria;
pub mod vendas_repo;

pub use atividade_repo::{AtividadeStore, PgAtividadeRepository};
pub use depara_repo::{DeParaStore, PgDeParaRepository};
pub use estoque_repo::{EstoqueStore, PgEstoqueRepository};
pub use memoria::BancoMemoria;
pub use vendas_repo::{HistoricoVendasStore, PgVendasRepository};
