//! Deterministic attribute-table generators.
//!
//! Rows mimic the attribute tables a GeoServer layer exports: a geometry
//! column, a couple of identifier columns and a mix of numeric, date and
//! categorical attributes.

use serde_json::{json, Map, Value};

/// One attribute-table row.
pub type Row = Map<String, Value>;

const MUNICIPIOS: [&str; 8] = [
    "Pachuca",
    "Tulancingo",
    "Tula",
    "Huejutla",
    "Ixmiquilpan",
    "Actopan",
    "Apan",
    "Zimapán",
];

const CULTIVOS: [&str; 4] = ["Maíz", "Frijol", "Cebada", "Alfalfa"];

/// Build a row from `(column, value)` pairs.
pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Creates `count` rows of a parcel table.
///
/// Columns:
/// - `fid`, `id_parcela`, `the_geom`: technical columns
/// - `superficie_ha`: numeric, unique per row (`10.5 + 2.25 * i`)
/// - `produccion`: numeric, unique per row (`2 * superficie_ha + 1`)
/// - `fecha_registro`: ISO date within January 2024
/// - `cultivo`: one of 4 categories, cycling
/// - `municipio`: one of 8 categories, cycling
pub fn parcel_rows(count: usize) -> Vec<Row> {
    (0..count)
        .map(|i| {
            let superficie = 10.5 + 2.25 * i as f64;
            row(&[
                ("fid", json!(i + 1)),
                ("id_parcela", json!(format!("P-{:04}", i))),
                ("the_geom", json!({"type": "Point", "coordinates": [-98.9, 20.1]})),
                ("superficie_ha", json!(superficie)),
                ("produccion", json!(superficie * 2.0 + 1.0)),
                ("fecha_registro", json!(format!("2024-01-{:02}", i % 28 + 1))),
                ("cultivo", json!(CULTIVOS[i % CULTIVOS.len()])),
                ("municipio", json!(MUNICIPIOS[i % MUNICIPIOS.len()])),
            ])
        })
        .collect()
}

/// Numeric values `start, start + step, ...` as a single-column table.
pub fn numeric_column(name: &str, start: f64, step: f64, count: usize) -> Vec<Row> {
    (0..count)
        .map(|i| row(&[(name, json!(start + step * i as f64))]))
        .collect()
}

/// A single-column table with the given string values.
pub fn string_column(name: &str, values: &[&str]) -> Vec<Row> {
    values.iter().map(|v| row(&[(name, json!(v))])).collect()
}
