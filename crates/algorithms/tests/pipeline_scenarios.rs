//! End-to-end scenarios over small synthetic layers in Pará.
//!
//! Municipalities are 1° × 1° cells along lat -4..-3; deforestation patches
//! are 0.05° to 0.1° squares placed inside, across or outside them.

use approx::assert_relative_eq;
use desmat_algorithms::pipeline::{
    build_bronze, build_silver, LoadStatus, OutputPaths, Pipeline, PipelineConfig, Stage,
};
use desmat_algorithms::vector::Reprojector;
use desmat_core::crs::graticule_area;
use desmat_core::io::{read_bronze, read_layer_from_str, read_silver};
use desmat_core::{BronzeTable, MunicipalityCode, CRS};
use geo::{LineString, MultiPolygon, Polygon};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

const INDICATOR_HEADER: &str = "Código IBGE,Município,UF,Área (km²),PIB per capita 2021,\
Índice de Progresso Social,Necessidades Humanas Básicas,Fundamentos do Bem-estar,Oportunidades";

fn ring(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<[f64; 2]> {
    vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]
}

fn polygon_json(ring: &[[f64; 2]]) -> Value {
    json!({ "type": "Polygon", "coordinates": [ring] })
}

fn collection(crs: &str, features: Vec<Value>) -> String {
    json!({
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": crs } },
        "features": features,
    })
    .to_string()
}

fn patch(uuid: &str, year: i32, state: &str, ring: &[[f64; 2]]) -> Value {
    json!({
        "type": "Feature",
        "properties": { "uuid": uuid, "year": year, "state": state, "area_km": 1.0 },
        "geometry": polygon_json(ring),
    })
}

fn municipality(code: &str, name: &str, ring: &[[f64; 2]]) -> Value {
    json!({
        "type": "Feature",
        "properties": { "CD_MUN": code, "NM_MUN": name },
        "geometry": polygon_json(ring),
    })
}

fn code(i: usize) -> String {
    format!("15000{}0", i)
}

/// Cell `i` spans lon [-56 + i, -55 + i]
fn cell(i: usize) -> Vec<[f64; 2]> {
    let x0 = -56.0 + i as f64;
    ring(x0, -4.0, x0 + 1.0, -3.0)
}

fn municipalities(n: usize) -> String {
    let features = (0..n)
        .map(|i| municipality(&code(i), &format!("Município {}", i), &cell(i)))
        .collect();
    collection("EPSG:4674", features)
}

/// Cell `i` holds `i + 1` patches spread over three years
fn patches(n: usize) -> Vec<Value> {
    let mut out = Vec::new();
    for i in 0..n {
        let x0 = -56.0 + i as f64;
        for k in 0..=i {
            let x = x0 + 0.1 + 0.12 * k as f64;
            out.push(patch(
                &format!("p{}-{}", i, k),
                2019 + (k % 3) as i32,
                "PA",
                &ring(x, -3.6, x + 0.05, -3.55),
            ));
        }
    }
    out
}

fn km2(lat_a: f64, lat_b: f64, dlon: f64) -> f64 {
    graticule_area(lat_a, lat_b, dlon) / 1.0e6
}

fn write_indicators(path: &Path, n: usize) {
    let mut text = String::from(INDICATOR_HEADER);
    for i in 0..n {
        let f = i as f64;
        text.push_str(&format!(
            "\n{},Município {},PA,{},{},{},{},{},{}",
            code(i),
            i,
            12000.0 + 500.0 * f,
            9000.0 + 1500.0 * f + 300.0 * (f * 1.7).sin(),
            62.0 - 1.5 * f + (f * 0.8).cos(),
            70.0 - f + 0.5 * (f * 2.1).sin(),
            55.0 - 0.7 * f * f / 3.0,
            40.0 + 2.0 * (f * 1.3).cos(),
        ));
    }
    fs::write(path, text).unwrap();
}

fn bronze_of(deforestation: &str, municipalities: &str) -> BronzeTable {
    build_bronze(
        read_layer_from_str(deforestation).unwrap(),
        read_layer_from_str(municipalities).unwrap(),
        &PipelineConfig::default(),
    )
    .unwrap()
    .table
}

fn row_area(table: &BronzeTable, code: &str, year: i32) -> f64 {
    let key = MunicipalityCode::new(code);
    table
        .rows()
        .iter()
        .find(|r| r.code == key)
        .map(|r| r.area(year))
        .unwrap_or_default()
}

#[test]
fn test_two_patches_in_one_year_sum_into_one_row() {
    let patches = vec![
        patch("a", 2020, "PA", &ring(-55.9, -3.9, -55.8, -3.8)),
        patch("b", 2020, "PA", &ring(-55.6, -3.7, -55.55, -3.65)),
    ];
    let bronze = bronze_of(&collection("EPSG:4674", patches), &municipalities(1));

    assert_eq!(bronze.len(), 1);
    assert_eq!(bronze.years(), &[2020]);
    let expected = km2(-3.9, -3.8, 0.1) + km2(-3.7, -3.65, 0.05);
    let row = &bronze.rows()[0];
    assert_relative_eq!(row.area(2020), expected, max_relative = 1e-3);
    assert_relative_eq!(row.total_km2(), row.area(2020), epsilon = 1e-12);
}

#[test]
fn test_patch_outside_every_municipality_contributes_nothing() {
    let inside = ring(-55.9, -3.9, -55.8, -3.8);
    let with_outlier = vec![
        patch("a", 2020, "PA", &inside),
        patch("far", 2021, "PA", &ring(-40.0, -10.0, -39.9, -9.9)),
    ];
    let bronze = bronze_of(&collection("EPSG:4674", with_outlier), &municipalities(2));
    let alone = bronze_of(
        &collection("EPSG:4674", vec![patch("a", 2020, "PA", &inside)]),
        &municipalities(2),
    );

    assert_eq!(bronze.len(), 1);
    assert_eq!(bronze.years(), &[2020]);
    assert_relative_eq!(
        bronze.rows()[0].total_km2(),
        alone.rows()[0].total_km2(),
        epsilon = 1e-12
    );
}

#[test]
fn test_patch_across_a_border_is_split() {
    // cells 0 and 1 meet at lon -55
    let across = vec![patch("x", 2021, "PA", &ring(-55.05, -3.5, -54.95, -3.4))];
    let bronze = bronze_of(&collection("EPSG:4674", across), &municipalities(2));

    assert_eq!(bronze.len(), 2);
    let left = row_area(&bronze, &code(0), 2021);
    let right = row_area(&bronze, &code(1), 2021);
    assert_relative_eq!(left, right, max_relative = 1e-3);
    assert_relative_eq!(left + right, km2(-3.5, -3.4, 0.1), max_relative = 1e-3);
}

#[test]
fn test_other_regions_are_filtered() {
    let features = vec![
        patch("pa", 2020, "PA", &ring(-55.9, -3.9, -55.8, -3.8)),
        patch("am", 2020, "AM", &ring(-55.5, -3.9, -55.4, -3.8)),
    ];
    let out = build_bronze(
        read_layer_from_str(&collection("EPSG:4674", features)).unwrap(),
        read_layer_from_str(&municipalities(1)).unwrap(),
        &PipelineConfig::default(),
    )
    .unwrap();
    assert_eq!(out.harmonize.region_filtered, 1);
    assert_eq!(out.intersections.len(), 1);
    assert_eq!(out.intersections[0].deforestation_id, "pa");
}

#[test]
fn test_bronze_total_is_row_sum() {
    let bronze = bronze_of(&collection("EPSG:4674", patches(5)), &municipalities(5));
    assert_eq!(bronze.len(), 5);
    assert_eq!(bronze.years(), &[2019, 2020, 2021]);
    for row in bronze.rows() {
        let sum: f64 = bronze.years().iter().map(|&y| row.area(y)).sum();
        assert_relative_eq!(row.total_km2(), sum, epsilon = 1e-12);
        assert!(row.areas.values().all(|&a| a >= 0.0));
    }
}

/// Ring vertices carried from SIRGAS 2000 into SIRGAS 2000 / UTM 22S
fn utm_ring(ring: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let to_utm = Reprojector::new(&CRS::from_epsg(4674), &CRS::from_epsg(31982)).unwrap();
    let exterior: LineString<f64> = ring.iter().map(|c| (c[0], c[1])).collect::<Vec<_>>().into();
    let mp = to_utm.transform(&MultiPolygon(vec![Polygon::new(exterior, vec![])]));
    mp.0[0].exterior().coords().map(|c| [c.x, c.y]).collect()
}

fn utm_municipalities(n: usize) -> String {
    let features = (0..n)
        .map(|i| municipality(&code(i), &format!("Município {}", i), &utm_ring(&cell(i))))
        .collect();
    collection("EPSG:31982", features)
}

/// Same patches as [`patches`], with every ring in UTM 22S
fn utm_patches(n: usize) -> Vec<Value> {
    patches(n)
        .into_iter()
        .map(|mut f| {
            let ring: Vec<[f64; 2]> =
                serde_json::from_value(f["geometry"]["coordinates"][0].clone()).unwrap();
            f["geometry"] = polygon_json(&utm_ring(&ring));
            f
        })
        .collect()
}

fn assert_same_totals(a: &BronzeTable, b: &BronzeTable) {
    assert_eq!(a.len(), b.len());
    assert_eq!(a.years(), b.years());
    for (x, y) in a.rows().iter().zip(b.rows()) {
        assert_eq!(x.code, y.code);
        for &year in a.years() {
            assert_relative_eq!(x.area(year), y.area(year), max_relative = 1e-3);
        }
        assert_relative_eq!(x.total_km2(), y.total_km2(), max_relative = 1e-3);
    }
}

#[test]
fn test_municipal_crs_does_not_change_areas() {
    let bronze_geo = bronze_of(&collection("EPSG:4674", patches(3)), &municipalities(3));
    // municipalities are reprojected back into the deforestation CRS
    let bronze_utm = bronze_of(&collection("EPSG:4674", patches(3)), &utm_municipalities(3));
    assert_same_totals(&bronze_geo, &bronze_utm);
}

#[test]
fn test_projected_working_crs_gives_same_areas() {
    let bronze_geo = bronze_of(&collection("EPSG:4674", patches(3)), &municipalities(3));

    let out = build_bronze(
        read_layer_from_str(&collection("EPSG:31982", utm_patches(3))).unwrap(),
        read_layer_from_str(&utm_municipalities(3)).unwrap(),
        &PipelineConfig::default(),
    )
    .unwrap();
    // overlay ran on UTM metres
    assert!(out.crs.as_ref().unwrap().is_equivalent(&CRS::from_epsg(31982)));
    assert_eq!(out.intersections.len(), 6);
    assert!(out.intersections.iter().all(|r| r.area_km2 > 0.0));
    assert_same_totals(&bronze_geo, &out.table);
}

#[test]
fn test_silver_is_a_left_join_of_bronze() {
    let dir = tempfile::tempdir().unwrap();
    let indicators = dir.path().join("ips.csv");
    // cell 1 has a zero area, cell 2 is missing from the table
    fs::write(
        &indicators,
        format!(
            "{}\n{},Município 0,PA,12000,9000,60,70,55,40\n{},Município 1,PA,0,9500,61,71,54,41",
            INDICATOR_HEADER,
            code(0),
            code(1)
        ),
    )
    .unwrap();

    let bronze = bronze_of(&collection("EPSG:4674", patches(3)), &municipalities(3));
    let silver = build_silver(&bronze, &indicators, &PipelineConfig::default()).unwrap();

    assert_eq!(silver.len(), bronze.len());
    for (s, b) in silver.rows().iter().zip(bronze.rows()) {
        assert_eq!(s.municipality.code, b.code);
    }
    let proportion = silver.numeric_column("desmat_prop").unwrap();
    let ips = silver.numeric_column("Índice de Progresso Social").unwrap();
    assert!(proportion[0].is_some());
    assert!(proportion[1].is_none());
    assert!(proportion[2].is_none());
    assert_eq!(ips[1], Some(61.0));
    assert!(ips[2].is_none());
}

fn config_in(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        inputs: desmat_algorithms::pipeline::InputPaths {
            deforestation: dir.join("raw/deforestation.geojson"),
            municipalities: dir.join("raw/municipalities.geojson"),
            indicators: dir.join("raw/ips.csv"),
        },
        outputs: OutputPaths {
            dir: dir.join("out"),
            pca: Some("silver/pca.csv".into()),
            feed: Some("gold/feed.json".into()),
            intersections: Some("bronze/intersections.geojson".into()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn write_inputs(dir: &Path, n: usize) {
    fs::create_dir_all(dir.join("raw")).unwrap();
    fs::write(dir.join("raw/deforestation.geojson"), collection("EPSG:4674", patches(n))).unwrap();
    fs::write(dir.join("raw/municipalities.geojson"), municipalities(n)).unwrap();
    write_indicators(&dir.join("raw/ips.csv"), n);
}

#[test]
fn test_full_run_writes_every_tier() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path(), 6);
    let config = config_in(dir.path());
    let outcome = Pipeline::new(config.clone()).run().unwrap();

    assert_eq!(outcome.report.deforestation, Some(LoadStatus::Loaded));
    assert_eq!(outcome.report.bronze_rows, 6);
    assert_eq!(outcome.report.silver_rows, 6);
    assert_eq!(outcome.report.written.len(), 6);
    for path in &outcome.report.written {
        assert!(path.exists(), "{} missing", path.display());
    }

    let bronze = read_bronze(config.bronze_path()).unwrap();
    assert_eq!(bronze.len(), outcome.bronze.len());
    assert_eq!(bronze.years(), outcome.bronze.years());
    let silver = read_silver(config.silver_path()).unwrap();
    assert_eq!(silver.len(), 6);
    assert!(silver.has_column("Oportunidades"));

    // every row is complete, so PCA keeps all of them
    assert_eq!(outcome.summary.pca.n_rows(), 6);
    assert_eq!(outcome.summary.pca.scores.ncols(), 2);

    let corr = &outcome.summary.correlation;
    let n = corr.labels.len();
    assert_eq!(n, 6);
    for i in 0..n {
        assert_relative_eq!(corr.values[[i, i]], 1.0, epsilon = 1e-12);
        for j in 0..n {
            let v = corr.values[[i, j]];
            assert!((-1.0..=1.0).contains(&v));
            assert_relative_eq!(v, corr.values[[j, i]], epsilon = 1e-12);
        }
    }

    assert_eq!(outcome.feed.municipalities, 6);
    assert_eq!(outcome.feed.annual_series.len(), 3);
    let feed: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("out/gold/feed.json")).unwrap())
            .unwrap();
    assert_eq!(feed["pairs"].as_array().map(Vec::len), Some(5));
}

#[test]
fn test_corrupt_boundaries_give_empty_bronze() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path(), 3);
    fs::write(
        dir.path().join("raw/municipalities.geojson"),
        r#"{"type": "FeatureCollection", "features": [{"type": "Feature", "geom"#,
    )
    .unwrap();

    let outcome = Pipeline::new(config_in(dir.path())).run().unwrap();
    assert!(matches!(
        outcome.report.municipalities,
        Some(LoadStatus::Substituted(_))
    ));
    assert_eq!(outcome.report.intersections, 0);
    assert!(outcome.bronze.is_empty());
    assert!(outcome.silver.is_empty());
    assert_eq!(outcome.summary.pca.n_rows(), 0);
}

#[test]
fn test_missing_indicator_table_stops_in_join() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path(), 2);
    fs::remove_file(dir.path().join("raw/ips.csv")).unwrap();

    let err = Pipeline::new(config_in(dir.path())).run().unwrap_err();
    assert_eq!(err.stage, Stage::Join);
    // bronze was already persisted
    assert!(config_in(dir.path()).bronze_path().exists());
}
