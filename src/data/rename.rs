//! Renombrado de columnas crudas a etiquetas visibles.

use polars::prelude::*;

use crate::models::{self, has_column};

/// Mapeo columna cruda -> etiqueta usada por la consulta fija.
pub const MAPEAMENTO_COLUNAS: [(&str, &str); 9] = [
    ("ano_pesquisa", models::COL_ANO),
    ("numero_habitantes", models::COL_POPULACAO),
    ("faixa_populacao", models::COL_FAIXA),
    ("nome_municipio", models::COL_MUNICIPIO),
    ("nome_uf", models::COL_ESTADOS),
    ("nome_regiao", models::COL_REGIOES),
    ("latitude", models::COL_LATITUDE),
    ("longitude", models::COL_LONGITUDE),
    ("ride_brasilia", models::COL_RIDE),
];

/// Renombra las columnas presentes en `mapping`; las claves ausentes se ignoran
/// y las columnas fuera del mapeo quedan igual.
pub fn rename_columns(df: &DataFrame, mapping: &[(&str, &str)]) -> PolarsResult<DataFrame> {
    let mut out = df.clone();
    for (raw, label) in mapping {
        if has_column(&out, raw) {
            out.rename(raw, (*label).into())?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{column_names, text_column};

    fn cru() -> DataFrame {
        df!(
            "ano_pesquisa" => [2020i64],
            "nome_uf" => ["SP"],
            "extra" => [None::<i64>]
        )
        .unwrap()
    }

    #[test]
    fn test_renomeia_e_conserva_o_resto() {
        let df = rename_columns(&cru(), &MAPEAMENTO_COLUNAS).unwrap();
        assert_eq!(column_names(&df), vec!["Ano", "Estados", "extra"]);
        assert_eq!(text_column(&df, "Ano").unwrap(), vec![Some("2020".to_string())]);
    }

    #[test]
    fn test_idempotente() {
        let uma = rename_columns(&cru(), &MAPEAMENTO_COLUNAS).unwrap();
        let duas = rename_columns(&uma, &MAPEAMENTO_COLUNAS).unwrap();
        assert!(uma.equals_missing(&duas));
    }

    #[test]
    fn test_mapeamento_vazio() {
        assert_eq!(column_names(&rename_columns(&cru(), &[]).unwrap()), column_names(&cru()));
    }
}
