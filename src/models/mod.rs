// Estructuras de datos principales: la tabla de población es un `DataFrame`
// de polars; `Value` sólo representa celdas sueltas (ingesta y vista).

use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

// Nombres de columna visibles (después del renombrado)
pub const COL_ANO: &str = "Ano";
pub const COL_POPULACAO: &str = "População";
pub const COL_FAIXA: &str = "Faixa de População";
pub const COL_MUNICIPIO: &str = "Município";
pub const COL_ESTADOS: &str = "Estados";
pub const COL_REGIOES: &str = "Regiões";
pub const COL_LATITUDE: &str = "Latitude";
pub const COL_LONGITUDE: &str = "Longitude";
pub const COL_RIDE: &str = "RIDE Brasília";

/// Columnas que pueden usarse como eje X de los gráficos.
pub const COLUNAS_CATEGORICAS: [&str; 4] = [COL_MUNICIPIO, COL_ANO, COL_ESTADOS, COL_REGIOES];
/// Columnas que pueden usarse como eje Y (valores).
pub const COLUNAS_NUMERICAS: [&str; 1] = [COL_POPULACAO];

/// Valor de una celda. Se serializa sin etiqueta (`null`, `true`, `12`, `"SP"`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Valor numérico de la celda, si lo tiene. Los booleanos no cuentan como número.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) if !f.is_nan() => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            // 2020.0 se muestra como "2020"
            Value::Float(x) if x.fract() == 0.0 && x.is_finite() && x.abs() < 1e15 => write!(f, "{}", *x as i64),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Celda de polars a `Value`.
pub fn cell_value(av: &AnyValue) -> Value {
    match av {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(*b),
        AnyValue::String(s) => Value::Text(s.to_string()),
        AnyValue::StringOwned(s) => Value::Text(s.to_string()),
        AnyValue::Float32(f) => Value::Float(*f as f64),
        AnyValue::Float64(f) => Value::Float(*f),
        AnyValue::Int8(_)
        | AnyValue::Int16(_)
        | AnyValue::Int32(_)
        | AnyValue::Int64(_)
        | AnyValue::UInt8(_)
        | AnyValue::UInt16(_)
        | AnyValue::UInt32(_)
        | AnyValue::UInt64(_) => av.extract::<i64>().map(Value::Int).unwrap_or(Value::Null),
        other => Value::Text(other.to_string()),
    }
}

// Tipo de la columna según sus celdas no nulas: bool, entero, número o texto
fn series_from_values(name: &str, values: Vec<Value>) -> Series {
    let mut no_nulos = values.iter().filter(|v| !v.is_null()).peekable();
    if no_nulos.peek().is_none() {
        return Series::new_null(name.into(), values.len());
    }
    let todos = |pred: fn(&Value) -> bool| values.iter().filter(|v| !v.is_null()).all(pred);

    if todos(|v| matches!(v, Value::Bool(_))) {
        let col: Vec<Option<bool>> = values.iter().map(|v| if let Value::Bool(b) = v { Some(*b) } else { None }).collect();
        Series::new(name.into(), col)
    } else if todos(|v| matches!(v, Value::Int(_))) {
        let col: Vec<Option<i64>> = values.iter().map(|v| if let Value::Int(i) = v { Some(*i) } else { None }).collect();
        Series::new(name.into(), col)
    } else if todos(|v| matches!(v, Value::Int(_) | Value::Float(_))) {
        let col: Vec<Option<f64>> = values.iter().map(Value::as_f64).collect();
        Series::new(name.into(), col)
    } else {
        let col: Vec<Option<String>> = values.iter().map(|v| if v.is_null() { None } else { Some(v.to_string()) }).collect();
        Series::new(name.into(), col)
    }
}

/// Construye el `DataFrame` a partir de filas (resultado de una consulta).
/// Las filas más cortas que el encabezado se rellenan con nulos y las más largas se recortan.
pub fn frame_from_rows(columns: &[String], rows: Vec<Vec<Value>>) -> PolarsResult<DataFrame> {
    let width = columns.len();
    let mut por_coluna: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); width];
    for mut row in rows {
        row.resize(width, Value::Null);
        for (i, v) in row.into_iter().enumerate() {
            por_coluna[i].push(v);
        }
    }
    let cols: Vec<Column> = columns
        .iter()
        .zip(por_coluna)
        .map(|(name, values)| series_from_values(name, values).into())
        .collect();
    DataFrame::new(cols)
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().into_iter().map(|c| c.to_string()).collect()
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Enteros, flotantes y columnas sólo-nulas cuentan como numéricos.
pub fn tipo_numerico(dt: &DataType) -> bool {
    matches!(
        dt,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
            | DataType::Null
    )
}

/// Filas como celdas serializables (para la vista).
pub fn rows_of(df: &DataFrame) -> PolarsResult<Vec<Vec<Value>>> {
    let cols = df.get_columns();
    (0..df.height())
        .map(|i| cols.iter().map(|c| c.get(i).map(|av| cell_value(&av))).collect())
        .collect()
}

/// Columna como texto (cast a `String`).
pub fn text_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let s = df.column(name)?.as_materialized_series().cast(&DataType::String)?;
    Ok(s.str()?.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Columna como números; lo que no convierte queda `None`.
pub fn numeric_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let s = df.column(name)?.as_materialized_series().cast(&DataType::Float64)?;
    Ok(s.f64()?.into_iter().collect())
}

/// Valores distintos (como texto, sin nulos) de la columna, ordenados ascendentemente.
/// Una columna ausente no tiene valores.
pub fn distinct_text(df: &DataFrame, name: &str) -> Vec<String> {
    if !has_column(df, name) {
        return Vec::new();
    }
    match text_column(df, name) {
        Ok(vals) => vals.into_iter().flatten().collect::<BTreeSet<String>>().into_iter().collect(),
        Err(e) => {
            tracing::warn!(error = %e, columna = name, "no se pudo leer la columna como texto");
            Vec::new()
        }
    }
}

/// Las `n` filas con mayor valor en `column` (orden descendente, empates en
/// orden original). Las filas sin valor se descartan.
pub fn nlargest(df: &DataFrame, n: usize, column: &str) -> PolarsResult<DataFrame> {
    if !has_column(df, column) {
        return Ok(df.clear());
    }
    df.clone()
        .lazy()
        .filter(col(column).is_not_null())
        .sort(
            [column],
            SortMultipleOptions::default().with_order_descending(true).with_maintain_order(true),
        )
        .limit(n as IdxSize)
        .collect()
}

/// Agrega al final las filas de `other` que aún no están en `df`.
/// Si los encabezados difieren, devuelve `df` sin cambios.
pub fn concat_distinct(df: &DataFrame, other: &DataFrame) -> PolarsResult<DataFrame> {
    if column_names(df) != column_names(other) {
        return Ok(df.clone());
    }
    let mut vistas = rows_of(df)?;
    let mut novas = Vec::with_capacity(other.height());
    for row in rows_of(other)? {
        let e_nova = !vistas.contains(&row);
        if e_nova {
            vistas.push(row);
        }
        novas.push(e_nova);
    }
    let mask: BooleanChunked = novas.into_iter().collect();
    df.vstack(&other.filter(&mask)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tabela() -> DataFrame {
        df!(
            "Município" => ["A", "B", "C", "D"],
            "População" => [Some(10.0), None, Some(30.0), Some(20.0)]
        )
        .unwrap()
    }

    fn municipios(df: &DataFrame) -> Vec<String> {
        text_column(df, "Município").unwrap().into_iter().flatten().collect()
    }

    #[test]
    fn test_nlargest_descarta_nulos() {
        let top = nlargest(&tabela(), 2, "População").unwrap();
        assert_eq!(municipios(&top), vec!["C", "D"]);
        assert_eq!(nlargest(&tabela(), 10, "População").unwrap().height(), 3);
        assert_eq!(nlargest(&tabela(), 3, "Ausente").unwrap().height(), 0);
    }

    #[test]
    fn test_concat_distinct() {
        let t = tabela();
        let top = nlargest(&t, 1, "População").unwrap();
        let extra = t.head(Some(3));
        let combinada = concat_distinct(&top, &extra).unwrap();
        assert_eq!(municipios(&combinada), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_frame_from_rows_infere_tipos() {
        let df = frame_from_rows(
            &["ano".to_string(), "pop".to_string(), "ride".to_string(), "nome".to_string(), "vazio".to_string()],
            vec![
                vec![Value::Int(2020), Value::Float(1.5), Value::Bool(true), Value::Text("Goiás".into())],
                vec![Value::Int(2021), Value::Int(3), Value::Null, Value::Text("DF".into()), Value::Null],
            ],
        )
        .unwrap();
        assert_eq!(df.column("ano").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("pop").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("ride").unwrap().dtype(), &DataType::Boolean);
        assert_eq!(df.column("nome").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("vazio").unwrap().null_count(), 2);
        assert_eq!(rows_of(&df).unwrap()[1][1], Value::Float(3.0));
    }

    #[test]
    fn test_float_inteiro_e_exibido_sem_decimais() {
        assert_eq!(Value::Float(2020.0).to_string(), "2020");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::Null.to_string(), "");
    }

    #[test]
    fn test_distinct_text_ordenado() {
        let df = df!("Estados" => [Some("SP"), None, Some("DF"), Some("SP")]).unwrap();
        assert_eq!(distinct_text(&df, "Estados"), vec!["DF", "SP"]);
        assert!(distinct_text(&df, "Regiões").is_empty());
    }
}
