//! Controlador de vistas: tres páginas (Carregar Dados, Estatísticas,
//! Visualização) renderizadas desde cero en cada interacción.
//!
//! `render_page(page, session, widgets, provider)` devuelve el árbol de UI
//! completo para los valores actuales de los widgets. El único estado que
//! sobrevive entre interacciones es el `SessionContext` de cada usuario.

pub mod html;
mod pages;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::charts::ChartKind;
use polars::prelude::DataFrame;
use crate::stats::Describe;

pub use pages::render_page;

pub const TITULO: &str = "Análise de Dados Populacionais";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Carregar,
    Estatisticas,
    Visualizacao,
}

impl Page {
    pub const TODAS: [Page; 3] = [Page::Carregar, Page::Estatisticas, Page::Visualizacao];

    /// Identificador usado en las rutas (`/pagina/{slug}`).
    pub fn slug(self) -> &'static str {
        match self {
            Page::Carregar => "carregar",
            Page::Estatisticas => "estatisticas",
            Page::Visualizacao => "visualizacao",
        }
    }

    /// Nombre mostrado en el menú.
    pub fn label(self) -> &'static str {
        match self {
            Page::Carregar => "Carregar Dados",
            Page::Estatisticas => "Estatísticas",
            Page::Visualizacao => "Visualização",
        }
    }

    /// Página por slug o nombre de menú; lo desconocido cae en `Carregar`.
    pub fn from_slug(s: &str) -> Page {
        Page::TODAS
            .into_iter()
            .find(|p| p.slug() == s || p.label() == s)
            .unwrap_or(Page::Carregar)
    }
}

/// Estado privado de una sesión: la tabla cargada, si la hay.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    dataset: Option<Arc<DataFrame>>,
}

/// `NoData -> Loaded` tras una carga exitosa; no hay vuelta atrás dentro de la sesión.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    NoData,
    Loaded,
}

impl SessionContext {
    pub fn new() -> Self {
        SessionContext::default()
    }

    pub fn state(&self) -> SessionState {
        if self.dataset.is_some() { SessionState::Loaded } else { SessionState::NoData }
    }

    pub fn dataset(&self) -> Option<&Arc<DataFrame>> {
        self.dataset.as_ref()
    }

    pub(crate) fn store(&mut self, dataset: Arc<DataFrame>) {
        self.dataset = Some(dataset);
    }
}

/// Valores actuales de los widgets (vienen de la query string).
/// Los ausentes o inválidos toman el valor por defecto del widget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetValues {
    pub ano: Option<String>,
    pub estado: Option<String>,
    pub regiao: Option<String>,
    /// Casilla "Somente RIDE Brasília" (`true`, `on`, `1`).
    pub ride: Option<String>,
    /// Tipos de gráfico separados por comas; ausente = todos.
    pub graficos: Option<String>,
    pub eixo_x: Option<String>,
    pub eixo_y: Option<String>,
    pub max_categorias: Option<String>,
    pub busca_municipio: Option<String>,
    pub municipio_selecionado: Option<String>,
}

pub const MAX_CATEGORIAS_MIN: usize = 5;
pub const MAX_CATEGORIAS_MAX: usize = 20;
pub const MAX_CATEGORIAS_DEFAULT: usize = 10;

impl WidgetValues {
    /// Construye los valores a partir de pares clave/valor de un formulario.
    /// `graficos` puede repetirse (un par por casilla marcada); los valores se unen.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut w = WidgetValues::default();
        let mut graficos: Option<Vec<String>> = None;
        for (k, v) in pairs {
            match k.as_str() {
                "ano" => w.ano = Some(v),
                "estado" => w.estado = Some(v),
                "regiao" => w.regiao = Some(v),
                "ride" => w.ride = Some(v),
                "graficos" => graficos.get_or_insert_with(Vec::new).push(v),
                "eixo_x" => w.eixo_x = Some(v),
                "eixo_y" => w.eixo_y = Some(v),
                "max_categorias" => w.max_categorias = Some(v),
                "busca_municipio" => w.busca_municipio = Some(v),
                "municipio_selecionado" => w.municipio_selecionado = Some(v),
                _ => {}
            }
        }
        w.graficos = graficos.map(|g| g.join(","));
        w
    }

    pub fn somente_ride(&self) -> bool {
        matches!(self.ride.as_deref().map(str::trim), Some("true" | "on" | "1" | "sim"))
    }

    /// Tipos elegidos en el multiselect. Sin valor: los cuatro. Los nombres
    /// desconocidos se ignoran.
    pub fn chart_kinds(&self) -> Vec<ChartKind> {
        match &self.graficos {
            None => ChartKind::TODOS.to_vec(),
            Some(s) => {
                let mut kinds: Vec<ChartKind> = s
                    .split(',')
                    .filter(|p| !p.trim().is_empty())
                    .filter_map(|p| p.parse().ok())
                    .collect();
                kinds.sort();
                kinds.dedup();
                kinds
            }
        }
    }

    /// Valor del slider, limitado a 5..=20.
    pub fn max_categorias(&self) -> usize {
        self.max_categorias
            .as_deref()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .map(|n| n.clamp(MAX_CATEGORIAS_MIN, MAX_CATEGORIAS_MAX))
            .unwrap_or(MAX_CATEGORIAS_DEFAULT)
    }
}

/// Control de la barra lateral o del cuerpo de la página.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum Widget {
    Select { key: String, label: String, options: Vec<String>, selected: String },
    MultiSelect { key: String, label: String, options: Vec<String>, selected: Vec<String> },
    Checkbox { key: String, label: String, checked: bool },
    Slider { key: String, label: String, min: usize, max: usize, value: usize },
    TextInput { key: String, label: String, value: String },
}

/// Elemento del cuerpo de la página.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tipo", rename_all = "snake_case")]
pub enum Element {
    Heading { text: String },
    Text { text: String },
    Info { text: String },
    Success { text: String },
    Warning { text: String },
    Error { text: String },
    Table { columns: Vec<String>, rows: Vec<Vec<crate::models::Value>> },
    Stats { column: String, describe: Describe },
    Chart { kind: ChartKind, title: String, svg: String },
}

/// Árbol de UI completo de una página.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiTree {
    pub title: String,
    pub page: Page,
    pub menu: Widget,
    pub sidebar: Vec<Widget>,
    pub body: Vec<Element>,
}

impl UiTree {
    fn new(page: Page) -> Self {
        UiTree {
            title: TITULO.to_string(),
            page,
            menu: Widget::Select {
                key: "menu".into(),
                label: "Menu".into(),
                options: Page::TODAS.iter().map(|p| p.label().to_string()).collect(),
                selected: page.label().to_string(),
            },
            sidebar: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn charts(&self) -> impl Iterator<Item = &Element> {
        self.body.iter().filter(|e| matches!(e, Element::Chart { .. }))
    }
}
