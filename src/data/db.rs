use postgres::types::Type;
use postgres::{Client, NoTls};
use polars::prelude::DataFrame;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use super::LoadError;
use crate::config::DbTarget;
use crate::models::{frame_from_rows, Value};

/// Consulta fija: une población, municipio, pertenencia a la RIDE, UF y región.
/// Año y habitantes salen como texto para que cualquier tipo numérico del
/// servidor (NUMERIC, DECIMAL, REAL) llegue intacto a la conversión de tipos.
pub const CONSULTA_POPULACAO: &str = "SELECT
        CAST(p.ano_pesquisa AS TEXT) AS ano_pesquisa,
        CAST(p.numero_habitantes AS TEXT) AS numero_habitantes,
        p.faixa_populacao,
        m.nome_municipio,
        u.nome_uf,
        r.nome_regiao,
        CAST(m.latitude AS DOUBLE PRECISION) AS latitude,
        CAST(m.longitude AS DOUBLE PRECISION) AS longitude,
        rb.ride_brasilia
    FROM populacao p
    JOIN municipio m ON p.codigo_municipio_dv = m.codigo_municipio_dv
    JOIN municipio_ride_brasilia rb ON m.codigo_municipio_dv = rb.codigo_municipio_dv
    JOIN unidade_federacao u ON m.cd_uf = u.cd_uf
    JOIN regiao r ON u.cd_regiao = r.cd_regiao";

/// Ejecuta la consulta fija contra el destino configurado y devuelve la tabla
/// con los nombres de columna crudos. La conexión se cierra al terminar.
pub fn fetch_raw(target: &DbTarget) -> Result<DataFrame, LoadError> {
    match target {
        DbTarget::Sqlite(path) => fetch_sqlite(path),
        DbTarget::Postgres(conn_str) => {
            // El cliente síncrono de postgres levanta su propio runtime; se ejecuta
            // en un hilo dedicado para no chocar con el runtime de actix.
            let conn_str = conn_str.clone();
            let handle = std::thread::spawn(move || fetch_postgres(&conn_str));
            match handle.join() {
                Ok(res) => res,
                Err(e) => Err(LoadError::Worker(format!("thread join error: {:?}", e))),
            }
        }
    }
}

fn fetch_sqlite(path: &str) -> Result<DataFrame, LoadError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    let mut stmt = conn.prepare(CONSULTA_POPULACAO)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let ncols = columns.len();

    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(ncols);
        for i in 0..ncols {
            let cell = match row.get_ref(i)? {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(n) => Value::Int(n),
                ValueRef::Real(f) => Value::Float(f),
                ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
                ValueRef::Blob(_) => Value::Null,
            };
            cells.push(cell);
        }
        out.push(cells);
    }
    Ok(frame_from_rows(&columns, out)?)
}

fn fetch_postgres(conn_str: &str) -> Result<DataFrame, LoadError> {
    let mut client = Client::connect(conn_str, NoTls)?;
    let rows = client.query(CONSULTA_POPULACAO, &[])?;

    let columns: Vec<String> = match rows.first() {
        Some(r) => r.columns().iter().map(|c| c.name().to_string()).collect(),
        None => {
            // Sin filas: los nombres salen de la sentencia preparada
            let stmt = client.prepare(CONSULTA_POPULACAO)?;
            stmt.columns().iter().map(|c| c.name().to_string()).collect()
        }
    };

    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut cells = Vec::with_capacity(columns.len());
        for (i, col) in row.columns().iter().enumerate() {
            cells.push(pg_cell(row, i, col.type_())?);
        }
        out.push(cells);
    }
    // `client` se cierra al salir del ámbito
    Ok(frame_from_rows(&columns, out)?)
}

fn pg_cell(row: &postgres::Row, i: usize, ty: &Type) -> Result<Value, LoadError> {
    let v = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(i)?.map(Value::Bool)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(i)?.map(|n| Value::Int(n as i64))
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(i)?.map(|n| Value::Int(n as i64))
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(i)?.map(Value::Int)
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(i)?.map(|f| Value::Float(f as f64))
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(i)?.map(Value::Float)
    } else {
        // TEXT, VARCHAR, BPCHAR, NAME...; un tipo sin conversión es un error de carga
        row.try_get::<_, Option<String>>(i)?.map(Value::Text)
    };
    Ok(v.unwrap_or(Value::Null))
}
