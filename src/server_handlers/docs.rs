use actix_web::{HttpResponse, Responder};
use serde_json::json;

use crate::charts::ChartKind;
use crate::filter::{TODAS, TODOS};
use crate::models::{COLUNAS_CATEGORICAS, COLUNAS_NUMERICAS, COL_ESTADOS, COL_POPULACAO};
use crate::view::{Page, MAX_CATEGORIAS_DEFAULT, MAX_CATEGORIAS_MAX, MAX_CATEGORIAS_MIN};

pub async fn help_handler() -> impl Responder {
    let paginas: Vec<_> = Page::TODAS
        .iter()
        .map(|p| json!({"slug": p.slug(), "nome": p.label(), "html": format!("/pagina/{}", p.slug()), "json": format!("/api/pagina/{}", p.slug())}))
        .collect();
    let graficos: Vec<&str> = ChartKind::TODOS.iter().map(|k| k.label()).collect();

    let help = json!({
        "description": "Painel de população por município. Cada página se renderiza de novo a cada mudança dos widgets (query string). A tabela é carregada na página 'carregar' e fica guardada na sessão (cookie 'popdash_sessao').",
        "paginas": paginas,
        "widgets": {
            "ano": {"padrao": "ano mais recente", "todos": TODOS},
            "estado": {"padrao": TODOS},
            "regiao": {"padrao": TODAS},
            "ride": {"padrao": false, "valores": ["on", "true", "1"]},
            "graficos": {"opcoes": graficos, "padrao": "todos", "nota": "repetir o parâmetro para cada tipo; um valor vazio sozinho = nenhum"},
            "eixo_x": {"opcoes": COLUNAS_CATEGORICAS, "padrao": COL_ESTADOS},
            "eixo_y": {"opcoes": COLUNAS_NUMERICAS, "padrao": COL_POPULACAO},
            "max_categorias": {"min": MAX_CATEGORIAS_MIN, "max": MAX_CATEGORIAS_MAX, "padrao": MAX_CATEGORIAS_DEFAULT},
            "busca_municipio": {"padrao": ""},
            "municipio_selecionado": {"padrao": "primeira sugestão"}
        },
        "get_example_query": "/pagina/visualizacao?ano=2021&estado=Todos&regiao=Todas&graficos=Barra&graficos=Mapa&max_categorias=10",
        "cache": "POST /api/cache/invalidar descarta a tabela memorizada"
    });

    HttpResponse::Ok().json(help)
}
