pub mod consultor;
pub mod depara_service;
pub mod estoque_service;
pub mod notificacao;
pub mod previsao_service;
pub mod processamento_service;
pub mod vendas_service;

pub use consultor::{ConsultorPadrao, ConsultorReposicao};
pub use depara_service::DeParaService;
pub use estoque_service::EstoqueService;
pub use notificacao::{Notificador, NotificadorLog};
pub use previsao_service::{ParametrosPrevisao, PrevisaoService};
pub use processamento_service::ProcessamentoService;
pub use vendas_service::VendasService;
