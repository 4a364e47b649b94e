//! Sugerencias de municipios para la búsqueda por nombre.

use polars::prelude::*;
use strsim::jaro_winkler;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::{distinct_text, has_column, text_column, COL_MUNICIPIO};

/// Límite de sugerencias mostradas.
pub const LIMITE_SUGESTOES: usize = 5;

/// Quita acentos (NFD sin marcas combinantes) y pasa a minúsculas.
pub fn remover_acentos_e_lower(texto: &str) -> String {
    texto.nfd().filter(|c| !is_combining_mark(*c)).collect::<String>().to_lowercase()
}

// Puntaje 0..=1; contener el texto buscado cuenta como coincidencia completa
fn pontuacao(query: &str, candidate: &str) -> f64 {
    if !query.is_empty() && candidate.contains(query) {
        1.0
    } else {
        jaro_winkler(query, candidate)
    }
}

/// Municipios (nombres originales) más parecidos a `digitado`, mejor primero.
pub fn sugerir_municipios(digitado: &str, df: &DataFrame, limite: usize) -> Vec<String> {
    let query = remover_acentos_e_lower(digitado.trim());
    if query.is_empty() {
        return Vec::new();
    }

    let mut candidatos: Vec<(f64, String)> = distinct_text(df, COL_MUNICIPIO)
        .into_iter()
        .map(|m| (pontuacao(&query, &remover_acentos_e_lower(&m)), m))
        .collect();
    // distinct_text ya viene ordenado: los empates quedan en orden alfabético
    candidatos.sort_by(|a, b| b.0.total_cmp(&a.0));
    candidatos.into_iter().take(limite).map(|(_, m)| m).collect()
}

/// Filas de `df` cuyo municipio coincide (sin acentos ni mayúsculas) con `municipio`.
pub fn linhas_do_municipio(df: &DataFrame, municipio: &str) -> PolarsResult<DataFrame> {
    if !has_column(df, COL_MUNICIPIO) {
        return Ok(df.clear());
    }
    let alvo = remover_acentos_e_lower(municipio);
    let mascara: BooleanChunked = text_column(df, COL_MUNICIPIO)?
        .iter()
        .map(|m| m.as_deref().is_some_and(|m| remover_acentos_e_lower(m) == alvo))
        .collect();
    df.filter(&mascara)
}
