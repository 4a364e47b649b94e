//! Motor de filtros sobre la tabla de población.
//!
//! Conjunción de igualdades: año obligatorio, estado y región opcionales
//! (centinelas "Todos"/"Todas") y la marca de pertenencia a la RIDE Brasília.
//! El resultado es siempre una tabla nueva; la de entrada no se modifica.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{distinct_text, has_column, COL_ANO, COL_ESTADOS, COL_REGIOES, COL_RIDE};

/// Centinela "sin filtro" para estados.
pub const TODOS: &str = "Todos";
/// Centinela "sin filtro" para regiones.
pub const TODAS: &str = "Todas";

/// Valores elegidos por el usuario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub ano: String,
    pub estado: String,
    pub regiao: String,
    pub somente_ride: bool,
}

impl FilterSelection {
    /// Selección que sólo restringe el año.
    pub fn por_ano(ano: impl Into<String>) -> Self {
        FilterSelection { ano: ano.into(), estado: TODOS.to_string(), regiao: TODAS.to_string(), somente_ride: false }
    }
}

// Igualdad de texto: el año llega como texto y los nulos nunca coinciden
fn igual_texto(coluna: &str, valor: &str) -> Expr {
    col(coluna).cast(DataType::String).eq(lit(valor.to_string()))
}

/// Filtra la tabla. Una restricción sobre una columna ausente excluye todas las
/// filas; los centinelas nunca consultan la columna.
pub fn filter_data(df: &DataFrame, sel: &FilterSelection) -> PolarsResult<DataFrame> {
    let mut restricoes = vec![(COL_ANO, igual_texto(COL_ANO, &sel.ano))];
    if sel.estado != TODOS {
        restricoes.push((COL_ESTADOS, igual_texto(COL_ESTADOS, &sel.estado)));
    }
    if sel.regiao != TODAS {
        restricoes.push((COL_REGIOES, igual_texto(COL_REGIOES, &sel.regiao)));
    }
    if sel.somente_ride {
        restricoes.push((COL_RIDE, col(COL_RIDE).eq(lit(true))));
    }

    if restricoes.iter().any(|(coluna, _)| !has_column(df, coluna)) {
        return Ok(df.clear());
    }
    match restricoes.into_iter().map(|(_, expr)| expr).reduce(|a, b| a.and(b)) {
        Some(predicado) => df.clone().lazy().filter(predicado).collect(),
        None => Ok(df.clone()),
    }
}

/// Opciones de los selectores, calculadas sobre la tabla sin filtrar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    /// Años en orden descendente.
    pub anos: Vec<String>,
    /// `TODOS` seguido de los estados en orden ascendente.
    pub estados: Vec<String>,
    /// `TODAS` seguido de las regiones en orden ascendente.
    pub regioes: Vec<String>,
}

impl FilterOptions {
    pub fn from_dataset(df: &DataFrame) -> Self {
        let mut anos = distinct_text(df, COL_ANO);
        anos.reverse();

        let mut estados = vec![TODOS.to_string()];
        estados.extend(distinct_text(df, COL_ESTADOS));

        let mut regioes = vec![TODAS.to_string()];
        regioes.extend(distinct_text(df, COL_REGIOES));

        FilterOptions { anos, estados, regioes }
    }

    /// Resuelve la selección como lo haría un selectbox: un valor que no está entre
    /// las opciones cae al primero (año más reciente, "Todos", "Todas").
    pub fn resolve(&self, ano: Option<&str>, estado: Option<&str>, regiao: Option<&str>, somente_ride: bool) -> Option<FilterSelection> {
        let ano = pick(&self.anos, ano)?;
        let estado = pick(&self.estados, estado)?;
        let regiao = pick(&self.regioes, regiao)?;
        Some(FilterSelection { ano, estado, regiao, somente_ride })
    }
}

fn pick(options: &[String], wanted: Option<&str>) -> Option<String> {
    match wanted {
        Some(w) if options.iter().any(|o| o == w) => Some(w.to_string()),
        _ => options.first().cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::text_column;

    fn tabela() -> DataFrame {
        df!(
            "Ano" => ["2020", "2020", "2021", "2021"],
            "Estados" => ["SP", "DF", "GO", "SP"],
            "Regiões" => ["Sudeste", "Centro-Oeste", "Centro-Oeste", "Sudeste"],
            "RIDE Brasília" => [false, true, true, false],
            "População" => [100.0, 50.0, 70.0, 110.0]
        )
        .unwrap()
    }

    fn estados(df: &DataFrame) -> Vec<String> {
        text_column(df, "Estados").unwrap().into_iter().flatten().collect()
    }

    #[test]
    fn test_sentinelas_so_filtram_por_ano() {
        let out = filter_data(&tabela(), &FilterSelection::por_ano("2020")).unwrap();
        assert!(out.equals_missing(&tabela().head(Some(2))));
    }

    #[test]
    fn test_somente_ride() {
        let sel = FilterSelection { somente_ride: true, ..FilterSelection::por_ano("2020") };
        let out = filter_data(&tabela(), &sel).unwrap();
        assert_eq!(estados(&out), vec!["DF"]);
    }

    #[test]
    fn test_estado_e_regiao() {
        let df = tabela();
        let sel = FilterSelection { estado: "GO".into(), regiao: "Centro-Oeste".into(), ..FilterSelection::por_ano("2021") };
        assert_eq!(filter_data(&df, &sel).unwrap().height(), 1);
        let sel = FilterSelection { estado: "GO".into(), regiao: "Sudeste".into(), ..FilterSelection::por_ano("2021") };
        assert_eq!(filter_data(&df, &sel).unwrap().height(), 0);
    }

    #[test]
    fn test_nao_modifica_a_entrada() {
        let df = tabela();
        let antes = df.clone();
        let _ = filter_data(&df, &FilterSelection { somente_ride: true, ..FilterSelection::por_ano("2021") }).unwrap();
        assert!(df.equals_missing(&antes));
    }

    #[test]
    fn test_ano_nulo_nunca_coincide() {
        let df = df!("Ano" => [Some("2020"), None]).unwrap();
        assert_eq!(filter_data(&df, &FilterSelection::por_ano("2020")).unwrap().height(), 1);
    }

    #[test]
    fn test_coluna_ausente_exclui() {
        let df = df!("Ano" => ["2020"]).unwrap();
        assert_eq!(filter_data(&df, &FilterSelection::por_ano("2020")).unwrap().height(), 1);
        let sel = FilterSelection { estado: "SP".into(), ..FilterSelection::por_ano("2020") };
        let out = filter_data(&df, &sel).unwrap();
        assert_eq!(out.height(), 0);
        assert_eq!(out.width(), 1);
    }

    #[test]
    fn test_opcoes() {
        let opts = FilterOptions::from_dataset(&tabela());
        assert_eq!(opts.anos, vec!["2021", "2020"]);
        assert_eq!(opts.estados, vec!["Todos", "DF", "GO", "SP"]);
        assert_eq!(opts.regioes, vec!["Todas", "Centro-Oeste", "Sudeste"]);

        let sel = opts.resolve(Some("1999"), Some("GO"), None, true).unwrap();
        assert_eq!(sel.ano, "2021");
        assert_eq!(sel.estado, "GO");
        assert_eq!(sel.regiao, "Todas");
        assert!(sel.somente_ride);
    }

    #[test]
    fn test_sem_anos_nao_ha_selecao() {
        let opts = FilterOptions::from_dataset(&DataFrame::empty());
        assert!(opts.resolve(None, None, None, false).is_none());
    }
}
