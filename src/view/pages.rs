use polars::prelude::{DataFrame, PolarsError};

use crate::charts::{self, ChartKind, ChartOutput, AVISO_SEM_DADOS};
use crate::data::DatasetProvider;
use crate::filter::{filter_data, FilterOptions, FilterSelection};
use crate::models::{
    column_names, concat_distinct, nlargest, rows_of, COLUNAS_CATEGORICAS, COLUNAS_NUMERICAS, COL_ESTADOS, COL_POPULACAO,
};
use crate::stats::describe_column;
use crate::suggest::{linhas_do_municipio, sugerir_municipios, LIMITE_SUGESTOES};

use super::{
    Element, Page, SessionContext, UiTree, Widget, WidgetValues, MAX_CATEGORIAS_MAX, MAX_CATEGORIAS_MIN,
};

pub const AVISO_CARREGAR_PRIMEIRO: &str = "Carregue os dados na página 'Carregar Dados' primeiro.";
pub const AVISO_NENHUM_DADO_CARREGADO: &str = "Nenhum dado foi carregado.";

/// Renderiza la página completa para los valores actuales de los widgets.
/// Sólo la página de carga modifica la sesión (guarda la tabla cargada).
pub fn render_page(
    page: Page,
    session: &mut SessionContext,
    widgets: &WidgetValues,
    provider: &dyn DatasetProvider,
    preview_rows: usize,
) -> UiTree {
    let mut ui = UiTree::new(page);
    match page {
        Page::Carregar => carregar_dados(&mut ui, session, provider, preview_rows),
        Page::Estatisticas => exibir_estatisticas(&mut ui, session, widgets),
        Page::Visualizacao => exibir_visualizacao(&mut ui, session, widgets),
    }
    ui
}

// Un fallo de polars se muestra en la página en lugar de cortar la respuesta
fn erro_de_dados(ui: &mut UiTree, e: PolarsError) {
    tracing::warn!(error = %e, "fallo al procesar la tabla");
    ui.body.push(Element::Error { text: format!("Erro ao processar os dados: {}", e) });
}

fn carregar_dados(ui: &mut UiTree, session: &mut SessionContext, provider: &dyn DatasetProvider, preview_rows: usize) {
    let outcome = provider.load();
    if let Some(msg) = outcome.error {
        ui.body.push(Element::Error { text: msg });
    }
    if outcome.dataset.height() == 0 {
        ui.body.push(Element::Warning { text: AVISO_NENHUM_DADO_CARREGADO.to_string() });
        return;
    }

    let head = outcome.dataset.head(Some(preview_rows));
    let rows = match rows_of(&head) {
        Ok(rows) => rows,
        Err(e) => return erro_de_dados(ui, e),
    };
    let mut msg = format!("{} registros carregados.", outcome.dataset.height());
    if let Some(ts) = outcome.loaded_at {
        msg.push_str(&format!(" ({})", ts.format("%Y-%m-%d %H:%M:%S UTC")));
    }
    ui.body.push(Element::Success { text: msg });
    ui.body.push(Element::Table { columns: column_names(&head), rows });
    session.store(outcome.dataset);
}

/// Widgets de filtro comunes a Estatísticas y Visualização. Devuelve la
/// selección resuelta, o `None` si la tabla no tiene años.
fn filtros_barra_lateral(ui: &mut UiTree, df: &DataFrame, widgets: &WidgetValues) -> Option<FilterSelection> {
    let opts = FilterOptions::from_dataset(df);
    let sel = opts.resolve(
        widgets.ano.as_deref(),
        widgets.estado.as_deref(),
        widgets.regiao.as_deref(),
        widgets.somente_ride(),
    )?;

    ui.sidebar.push(Widget::Select {
        key: "ano".into(),
        label: "Ano da Pesquisa".into(),
        options: opts.anos.clone(),
        selected: sel.ano.clone(),
    });
    ui.sidebar.push(Widget::Select {
        key: "estado".into(),
        label: "Estado".into(),
        options: opts.estados.clone(),
        selected: sel.estado.clone(),
    });
    ui.sidebar.push(Widget::Select {
        key: "regiao".into(),
        label: "Região".into(),
        options: opts.regioes.clone(),
        selected: sel.regiao.clone(),
    });
    ui.sidebar.push(Widget::Checkbox {
        key: "ride".into(),
        label: "Somente RIDE Brasília".into(),
        checked: sel.somente_ride,
    });
    Some(sel)
}

fn exibir_estatisticas(ui: &mut UiTree, session: &SessionContext, widgets: &WidgetValues) {
    let Some(df) = session.dataset() else {
        ui.body.push(Element::Info { text: AVISO_CARREGAR_PRIMEIRO.to_string() });
        return;
    };
    let Some(sel) = filtros_barra_lateral(ui, df, widgets) else {
        ui.body.push(Element::Warning { text: AVISO_SEM_DADOS.to_string() });
        return;
    };

    let filtrado = match filter_data(df, &sel) {
        Ok(f) => f,
        Err(e) => return erro_de_dados(ui, e),
    };
    if filtrado.height() == 0 {
        ui.body.push(Element::Warning { text: AVISO_SEM_DADOS.to_string() });
        return;
    }
    let describe = match describe_column(&filtrado, COL_POPULACAO) {
        Ok(d) => d,
        Err(e) => return erro_de_dados(ui, e),
    };
    ui.body.push(Element::Text { text: "Estatísticas Descritivas para População:".to_string() });
    ui.body.push(Element::Stats { column: COL_POPULACAO.to_string(), describe });
}

fn select_column(ui: &mut UiTree, key: &str, label: &str, options: &[&str], wanted: Option<&str>, default: &str) -> String {
    let selected = match wanted {
        Some(w) if options.contains(&w) => w.to_string(),
        _ => default.to_string(),
    };
    ui.sidebar.push(Widget::Select {
        key: key.into(),
        label: label.into(),
        options: options.iter().map(|s| s.to_string()).collect(),
        selected: selected.clone(),
    });
    selected
}

fn exibir_visualizacao(ui: &mut UiTree, session: &SessionContext, widgets: &WidgetValues) {
    let Some(df) = session.dataset() else {
        ui.body.push(Element::Info { text: AVISO_CARREGAR_PRIMEIRO.to_string() });
        return;
    };
    let sel = filtros_barra_lateral(ui, df, widgets);
    let filtrado = match &sel {
        Some(s) => match filter_data(df, s) {
            Ok(f) => f,
            Err(e) => return erro_de_dados(ui, e),
        },
        None => df.clear(),
    };

    let kinds = widgets.chart_kinds();
    ui.sidebar.push(Widget::MultiSelect {
        key: "graficos".into(),
        label: "Escolha os gráficos para exibir:".into(),
        options: ChartKind::TODOS.iter().map(|k| k.label().to_string()).collect(),
        selected: kinds.iter().map(|k| k.label().to_string()).collect(),
    });

    let x_col = select_column(ui, "eixo_x", "Selecione a coluna X (categórica):", &COLUNAS_CATEGORICAS, widgets.eixo_x.as_deref(), COL_ESTADOS);
    let y_col = select_column(ui, "eixo_y", "Selecione a coluna Y (numérica):", &COLUNAS_NUMERICAS, widgets.eixo_y.as_deref(), COL_POPULACAO);

    // Barra y Pizza muestran sólo las N categorías mayores (+ el municipio buscado)
    let usa_top_n = kinds.contains(&ChartKind::Barra) || kinds.contains(&ChartKind::Pizza);
    let mut top_n = filtrado.clone();
    if usa_top_n {
        let max_categorias = widgets.max_categorias();
        ui.sidebar.push(Widget::Slider {
            key: "max_categorias".into(),
            label: "Número máximo de categorias a exibir".into(),
            min: MAX_CATEGORIAS_MIN,
            max: MAX_CATEGORIAS_MAX,
            value: max_categorias,
        });
        let busca = widgets.busca_municipio.clone().unwrap_or_default();
        ui.sidebar.push(Widget::TextInput {
            key: "busca_municipio".into(),
            label: "Buscar uma categoria específica (Município)".into(),
            value: busca.clone(),
        });

        top_n = match nlargest(&filtrado, max_categorias, &y_col) {
            Ok(t) => t,
            Err(e) => return erro_de_dados(ui, e),
        };

        let sugestoes = sugerir_municipios(&busca, df, LIMITE_SUGESTOES);
        if !sugestoes.is_empty() {
            ui.body.push(Element::Info { text: format!("Você quis dizer: {}?", sugestoes.join(", ")) });
            let escolhido = match widgets.municipio_selecionado.as_deref() {
                Some(m) if sugestoes.iter().any(|s| s == m) => m.to_string(),
                _ => sugestoes[0].clone(),
            };
            ui.sidebar.push(Widget::Select {
                key: "municipio_selecionado".into(),
                label: "Selecione um município sugerido".into(),
                options: sugestoes.clone(),
                selected: escolhido.clone(),
            });
            let combinado = linhas_do_municipio(&filtrado, &escolhido).and_then(|linhas| concat_distinct(&top_n, &linhas));
            top_n = match combinado {
                Ok(t) => t,
                Err(e) => return erro_de_dados(ui, e),
            };
        }
    }

    let mut saidas = Vec::new();
    let top_kinds: Vec<ChartKind> = kinds.iter().copied().filter(|k| matches!(k, ChartKind::Barra | ChartKind::Pizza)).collect();
    saidas.extend(charts::render(&top_n, &x_col, &y_col, &top_kinds));
    if kinds.contains(&ChartKind::Linha) {
        saidas.extend(charts::render(&filtrado, &x_col, &y_col, &[ChartKind::Linha]));
    }
    if kinds.contains(&ChartKind::Mapa) {
        saidas.push(charts::render_map(&filtrado));
    }

    for s in saidas {
        ui.body.push(match s {
            ChartOutput::Chart { kind, title, svg } => Element::Chart { kind, title, svg },
            ChartOutput::Notice { message, .. } => Element::Warning { text: message },
            ChartOutput::Error { message, .. } => Element::Error { text: message },
        });
    }
}
