//! Renderizado de gráficos (barra, pizza, línea) y del mapa de burbujas.
//!
//! Cada tipo pedido produce exactamente una salida: el gráfico en SVG, un aviso
//! de "sin datos" o un error visible. Nunca se devuelve un gráfico vacío.

mod svg;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::str::FromStr;

use crate::models::{has_column, numeric_column, text_column, tipo_numerico, COL_ESTADOS, COL_LATITUDE, COL_LONGITUDE};

pub const AVISO_SEM_DADOS: &str = "Nenhum dado disponível para os filtros selecionados.";
pub const AVISO_SEM_COORDENADAS: &str = "Dados de latitude e longitude não disponíveis.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChartKind {
    Barra,
    Pizza,
    Linha,
    Mapa,
}

impl ChartKind {
    /// Opciones del multiselect, en orden; por defecto se eligen todas.
    pub const TODOS: [ChartKind; 4] = [ChartKind::Barra, ChartKind::Pizza, ChartKind::Linha, ChartKind::Mapa];

    pub fn label(self) -> &'static str {
        match self {
            ChartKind::Barra => "Barra",
            ChartKind::Pizza => "Pizza",
            ChartKind::Linha => "Linha",
            ChartKind::Mapa => "Mapa",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartKind::TODOS
            .into_iter()
            .find(|k| k.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("tipo de gráfico desconocido: {}", s))
    }
}

/// Resultado de renderizar un tipo de gráfico.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tipo", rename_all = "snake_case")]
pub enum ChartOutput {
    Chart { kind: ChartKind, title: String, svg: String },
    Notice { kind: ChartKind, message: String },
    Error { kind: ChartKind, message: String },
}

impl ChartOutput {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartOutput::Chart { kind, .. } | ChartOutput::Notice { kind, .. } | ChartOutput::Error { kind, .. } => *kind,
        }
    }

    pub fn is_chart(&self) -> bool {
        matches!(self, ChartOutput::Chart { .. })
    }
}

type Desenho = fn(&DataFrame, &str, &str, &str) -> Result<String, Box<dyn Error>>;

// Título y función de dibujo de los gráficos de ejes; el mapa va aparte
fn plano(kind: ChartKind, x_col: &str, y_col: &str) -> Option<(String, Desenho)> {
    match kind {
        ChartKind::Barra => Some((format!("{} por {}", y_col, x_col), svg::bar_chart as Desenho)),
        ChartKind::Pizza => Some((format!("Distribuição de {} por {}", y_col, x_col), svg::pie_chart as Desenho)),
        ChartKind::Linha => Some((format!("{} ao longo de {}", y_col, x_col), svg::line_chart as Desenho)),
        ChartKind::Mapa => None,
    }
}

/// Renderiza cada tipo de `kinds` entre Barra, Pizza y Línea (en ese orden).
/// `Mapa` se ignora aquí; ver [`render_map`].
pub fn render(df: &DataFrame, x_col: &str, y_col: &str, kinds: &[ChartKind]) -> Vec<ChartOutput> {
    ChartKind::TODOS
        .into_iter()
        .filter(|k| kinds.contains(k))
        .filter_map(|kind| plano(kind, x_col, y_col).map(|(title, desenho)| render_one(df, x_col, y_col, kind, title, desenho)))
        .collect()
}

fn render_one(df: &DataFrame, x_col: &str, y_col: &str, kind: ChartKind, title: String, desenho: Desenho) -> ChartOutput {
    if df.height() == 0 {
        return ChartOutput::Notice { kind, message: AVISO_SEM_DADOS.to_string() };
    }
    if !is_numeric_column(df, y_col) {
        return ChartOutput::Error {
            kind,
            message: format!("Erro: A coluna '{}' precisa ser numérica para este gráfico.", y_col),
        };
    }
    if !has_column(df, x_col) {
        return ChartOutput::Error { kind, message: format!("Erro ao exibir o gráfico: coluna '{}' inexistente", x_col) };
    }

    match desenho(df, x_col, y_col, &title) {
        Ok(svg) => ChartOutput::Chart { kind, title, svg },
        Err(e) => {
            tracing::warn!(error = %e, %kind, "fallo al dibujar el gráfico");
            ChartOutput::Error { kind, message: format!("Erro ao exibir o gráfico: {}", e) }
        }
    }
}

/// Mapa de burbujas (tamaño = población, color = estado). Requiere filas y
/// ambas columnas de coordenadas; si no, devuelve el aviso correspondiente.
pub fn render_map(df: &DataFrame) -> ChartOutput {
    let kind = ChartKind::Mapa;
    if df.height() == 0 || !has_column(df, COL_LATITUDE) || !has_column(df, COL_LONGITUDE) {
        return ChartOutput::Notice { kind, message: AVISO_SEM_COORDENADAS.to_string() };
    }
    let title = "Distribuição Populacional".to_string();
    match svg::bubble_map(df, &title) {
        Ok(svg) => ChartOutput::Chart { kind, title, svg },
        Err(e) => {
            tracing::warn!(error = %e, "fallo al dibujar el mapa");
            ChartOutput::Error { kind, message: format!("Erro ao exibir o gráfico: {}", e) }
        }
    }
}

/// Una columna es numérica si existe y su tipo es entero o flotante.
pub fn is_numeric_column(df: &DataFrame, col: &str) -> bool {
    df.column(col).map(|c| tipo_numerico(c.dtype())).unwrap_or(false)
}

// Clave de agrupación como texto; nulos como ""
fn chave(df: &DataFrame, coluna: &str, alias: &str) -> Expr {
    if has_column(df, coluna) {
        col(coluna).cast(DataType::String).fill_null(lit("")).alias(alias)
    } else {
        lit("").alias(alias)
    }
}

/// Categorías en orden de aparición y, para cada estado (color), la suma de `y`
/// por categoría. Los nulos no suman.
pub(crate) struct Grouped {
    pub categories: Vec<String>,
    pub series: Vec<(String, Vec<Option<f64>>)>,
}

pub(crate) fn group_by_state(df: &DataFrame, x_col: &str, y_col: &str) -> PolarsResult<Grouped> {
    let somas = df
        .clone()
        .lazy()
        .with_columns([chave(df, x_col, "__x"), chave(df, COL_ESTADOS, "__estado")])
        .group_by_stable([col("__x"), col("__estado")])
        .agg([
            col(y_col).cast(DataType::Float64).sum().alias("__y"),
            col(y_col).cast(DataType::Float64).count().alias("__n"),
        ])
        .collect()?;

    let xs = text_column(&somas, "__x")?;
    let estados = text_column(&somas, "__estado")?;
    let ys = numeric_column(&somas, "__y")?;
    let ns = numeric_column(&somas, "__n")?;

    let mut categories: Vec<String> = Vec::new();
    let mut series: Vec<(String, Vec<Option<f64>>)> = Vec::new();
    for i in 0..somas.height() {
        let x = xs[i].clone().unwrap_or_default();
        let state = estados[i].clone().unwrap_or_default();
        let ci = match categories.iter().position(|c| *c == x) {
            Some(ci) => ci,
            None => {
                categories.push(x);
                for (_, vals) in series.iter_mut() {
                    vals.push(None);
                }
                categories.len() - 1
            }
        };
        let si = match series.iter().position(|(s, _)| *s == state) {
            Some(si) => si,
            None => {
                series.push((state, vec![None; categories.len()]));
                series.len() - 1
            }
        };
        // grupo sin ningún valor: la barra no se dibuja
        if ns[i].unwrap_or(0.0) > 0.0 {
            series[si].1[ci] = ys[i];
        }
    }
    Ok(Grouped { categories, series })
}

/// Suma de `y` por categoría de `x`, en orden de aparición.
pub(crate) fn sum_by(df: &DataFrame, x_col: &str, y_col: &str) -> PolarsResult<Vec<(String, f64)>> {
    let somas = df
        .clone()
        .lazy()
        .with_columns([chave(df, x_col, "__x")])
        .group_by_stable([col("__x")])
        .agg([col(y_col).cast(DataType::Float64).sum().alias("__y")])
        .collect()?;
    let xs = text_column(&somas, "__x")?;
    let ys = numeric_column(&somas, "__y")?;
    Ok(xs.into_iter().zip(ys).map(|(x, y)| (x.unwrap_or_default(), y.unwrap_or(0.0))).collect())
}
