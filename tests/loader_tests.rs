use popdash::config::{parse_database_url, DbTarget};
use popdash::data::{self, DatasetCache};
use popdash::filter::{filter_data, FilterOptions, FilterSelection};
use popdash::models::{column_names, distinct_text, numeric_column, text_column, COL_ANO, COL_ESTADOS, COL_MUNICIPIO, COL_POPULACAO, COL_RIDE};
use polars::prelude::DataType;
use rusqlite::Connection;
use tempfile::TempDir;

// Base mínima con las cinco tablas de la consulta.
// Campinas no está en municipio_ride_brasilia: el join interno la descarta.
fn criar_base(dir: &TempDir) -> String {
    let path = dir.path().join("populacao.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE regiao (cd_regiao INTEGER PRIMARY KEY, nome_regiao TEXT);
         CREATE TABLE unidade_federacao (cd_uf INTEGER PRIMARY KEY, nome_uf TEXT, cd_regiao INTEGER);
         CREATE TABLE municipio (codigo_municipio_dv INTEGER PRIMARY KEY, nome_municipio TEXT, cd_uf INTEGER,
                                 latitude TEXT, longitude TEXT);
         CREATE TABLE municipio_ride_brasilia (codigo_municipio_dv INTEGER PRIMARY KEY, ride_brasilia INTEGER);
         CREATE TABLE populacao (codigo_municipio_dv INTEGER, ano_pesquisa INTEGER,
                                 numero_habitantes TEXT, faixa_populacao TEXT);

         INSERT INTO regiao VALUES (3, 'Sudeste'), (5, 'Centro-Oeste');
         INSERT INTO unidade_federacao VALUES (35, 'São Paulo', 3), (52, 'Goiás', 5), (53, 'Distrito Federal', 5);
         INSERT INTO municipio VALUES
            (5300108, 'Brasília', 53, '-15.7795', '-47.9297'),
            (5208707, 'Goiânia', 52, '-16.6864', '-49.2643'),
            (5200258, 'Águas Lindas de Goiás', 52, '-15.7617', '-48.2816'),
            (3550308, 'São Paulo', 35, '-23.5329', '-46.6395'),
            (3509502, 'Campinas', 35, '-22.9053', '-47.0659');
         INSERT INTO municipio_ride_brasilia VALUES (5300108, 1), (5208707, 0), (5200258, 1), (3550308, 0);
         INSERT INTO populacao VALUES
            (5300108, 2020, '3055149', 'Mais de 500000'),
            (5300108, 2021, '3094325', 'Mais de 500000'),
            (5208707, 2020, '1536097', 'Mais de 500000'),
            (5208707, 2021, '1555626', 'Mais de 500000'),
            (5200258, 2020, '217698', '100001 a 500000'),
            (5200258, 2021, 'n/d', '100001 a 500000'),
            (3550308, 2020, '12325232', 'Mais de 500000'),
            (3550308, 2021, '12396372', 'Mais de 500000'),
            (3509502, 2021, '1223237', 'Mais de 500000');",
    )
    .unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_carga_renomeia_e_une() {
    let dir = TempDir::new().unwrap();
    let path = criar_base(&dir);
    let df = data::try_load(&DbTarget::Sqlite(path)).unwrap();

    assert_eq!(
        column_names(&df),
        [
            "Ano",
            "População",
            "Faixa de População",
            "Município",
            "Estados",
            "Regiões",
            "Latitude",
            "Longitude",
            "RIDE Brasília"
        ]
        .map(String::from)
    );
    // 9 filas de población, menos Campinas
    assert_eq!(df.height(), 8);
    assert!(!distinct_text(&df, COL_MUNICIPIO).contains(&"Campinas".to_string()));
}

#[test]
fn test_carga_converte_tipos() {
    let dir = TempDir::new().unwrap();
    let df = data::try_load(&DbTarget::Sqlite(criar_base(&dir))).unwrap();

    assert_eq!(df.column(COL_ANO).unwrap().dtype(), &DataType::String);
    assert_eq!(distinct_text(&df, COL_ANO), vec!["2020", "2021"]);
    assert_eq!(df.column(COL_RIDE).unwrap().dtype(), &DataType::Boolean);
    assert_eq!(df.column(COL_RIDE).unwrap().null_count(), 0);
    assert_eq!(df.column(COL_POPULACAO).unwrap().dtype(), &DataType::Float64);
    // 'n/d' no es número
    assert_eq!(df.column(COL_POPULACAO).unwrap().null_count(), 1);
    // latitud casteada a número
    assert_eq!(numeric_column(&df, "Latitude").unwrap()[0].map(|x| x < 0.0), Some(true));
}

#[test]
fn test_colunas_numericas_nao_inteiras_chegam_intactas() {
    // año y habitantes guardados como REAL (p. ej. NUMERIC exportado)
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reais.db");
    Connection::open(&path)
        .unwrap()
        .execute_batch(
            "CREATE TABLE regiao (cd_regiao INTEGER, nome_regiao TEXT);
             CREATE TABLE unidade_federacao (cd_uf INTEGER, nome_uf TEXT, cd_regiao INTEGER);
             CREATE TABLE municipio (codigo_municipio_dv INTEGER, nome_municipio TEXT, cd_uf INTEGER, latitude REAL, longitude REAL);
             CREATE TABLE municipio_ride_brasilia (codigo_municipio_dv INTEGER, ride_brasilia TEXT);
             CREATE TABLE populacao (codigo_municipio_dv INTEGER, ano_pesquisa REAL, numero_habitantes REAL, faixa_populacao TEXT);
             INSERT INTO regiao VALUES (5, 'Centro-Oeste');
             INSERT INTO unidade_federacao VALUES (53, 'Distrito Federal', 5);
             INSERT INTO municipio VALUES (5300108, 'Brasília', 53, -15.78, -47.93);
             INSERT INTO municipio_ride_brasilia VALUES (5300108, 'sim');
             INSERT INTO populacao VALUES (5300108, 2021.0, 3094325.5, 'Mais de 500000');",
        )
        .unwrap();
    let df = data::try_load(&DbTarget::Sqlite(path.to_string_lossy().into_owned())).unwrap();
    assert_eq!(text_column(&df, COL_ANO).unwrap(), vec![Some("2021".to_string())]);
    assert_eq!(numeric_column(&df, COL_POPULACAO).unwrap(), vec![Some(3094325.5)]);
    assert_eq!(df.column(COL_RIDE).unwrap().as_materialized_series().bool().unwrap().get(0), Some(true));
}

#[test]
fn test_filtro_sobre_a_tabela_carregada() {
    let dir = TempDir::new().unwrap();
    let df = data::try_load(&DbTarget::Sqlite(criar_base(&dir))).unwrap();

    let opcoes = FilterOptions::from_dataset(&df);
    assert_eq!(opcoes.anos, vec!["2021", "2020"]);
    assert_eq!(opcoes.estados[0], "Todos");
    assert_eq!(opcoes.regioes, vec!["Todas", "Centro-Oeste", "Sudeste"]);

    // valores por defecto: año más reciente, sin otras restricciones
    let sel = opcoes.resolve(None, None, None, false).unwrap();
    assert_eq!(sel, FilterSelection::por_ano("2021"));
    assert_eq!(filter_data(&df, &sel).unwrap().height(), 4);

    let ride = opcoes.resolve(None, None, None, true).unwrap();
    let somente_ride = filter_data(&df, &ride).unwrap();
    assert_eq!(distinct_text(&somente_ride, COL_MUNICIPIO), vec!["Brasília", "Águas Lindas de Goiás"]);

    let goias = opcoes.resolve(Some("2020"), Some("Goiás"), Some("Centro-Oeste"), false).unwrap();
    let filtrado = filter_data(&df, &goias).unwrap();
    assert_eq!(filtrado.height(), 2);
    assert!(text_column(&filtrado, COL_ESTADOS).unwrap().iter().all(|v| v.as_deref() == Some("Goiás")));
}

#[test]
fn test_falha_de_conexao_devolve_tabela_vazia() {
    let dir = TempDir::new().unwrap();
    let inexistente = dir.path().join("no_existe.db").to_string_lossy().into_owned();
    let out = data::load(&DbTarget::Sqlite(inexistente));
    assert_eq!(out.dataset.height(), 0);
    assert!(out.loaded_at.is_none());
    assert!(out.error.unwrap().starts_with("Erro ao carregar os dados:"));
}

#[test]
fn test_base_sem_tabelas_e_um_erro() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vacia.db");
    Connection::open(&path).unwrap().execute_batch("CREATE TABLE otra (x INTEGER);").unwrap();
    assert!(data::try_load(&DbTarget::Sqlite(path.to_string_lossy().into_owned())).is_err());
}

#[test]
fn test_cache_memoriza_a_carga() {
    let dir = TempDir::new().unwrap();
    let target = parse_database_url(&format!("sqlite://{}", criar_base(&dir))).unwrap();
    let cache = DatasetCache::new();

    let primeira = cache.get_or_load(|| data::try_load(&target)).unwrap();
    // la base desaparece: la segunda llamada no vuelve a consultarla
    drop(dir);
    let segunda = cache.get_or_load(|| data::try_load(&target)).unwrap();
    assert!(std::sync::Arc::ptr_eq(&primeira, &segunda));

    assert!(cache.invalidate());
    assert!(cache.get_or_load(|| data::try_load(&target)).is_err());
    assert!(cache.get().is_none());
}
