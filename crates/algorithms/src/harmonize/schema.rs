//! Projection of loosely-typed features onto typed records

use super::{FieldNames, HarmonizeReport};
use desmat_core::records::{DeforestationRecord, MunicipalityRecord};
use desmat_core::vector::{Feature, VectorLayer};
use desmat_core::{Error, MunicipalityCode, Result};
use geo::{Geometry, MultiPolygon};
use std::collections::HashSet;
use tracing::warn;

const DEFORESTATION: &str = "deforestation layer";
const MUNICIPALITIES: &str = "municipal layer";

/// Polygonal part of a geometry; `None` for points and lines.
///
/// Collections qualify when every member is polygonal.
pub fn to_multi_polygon(geom: Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geom {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p])),
        Geometry::MultiPolygon(mp) => Some(mp),
        Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Some(MultiPolygon::new(vec![t.to_polygon()])),
        Geometry::GeometryCollection(gc) => {
            let mut polys = Vec::new();
            for g in gc {
                polys.extend(to_multi_polygon(g)?);
            }
            Some(MultiPolygon::new(polys))
        }
        _ => None,
    }
}

fn require(layer: &VectorLayer, dataset: &str, field: &str) -> Result<()> {
    if layer.has_column(field) {
        Ok(())
    } else {
        Err(Error::missing_column(dataset, field))
    }
}

/// Reduce deforestation features to (id, year, source area, geometry).
///
/// Identifier and year are required columns. Individual features with an
/// unusable value or non-polygonal geometry are dropped and counted.
pub fn deforestation_records(
    layer: VectorLayer,
    fields: &FieldNames,
    report: &mut HarmonizeReport,
) -> Result<Vec<DeforestationRecord>> {
    if layer.is_empty() {
        return Ok(Vec::new());
    }
    require(&layer, DEFORESTATION, &fields.id)?;
    require(&layer, DEFORESTATION, &fields.year)?;
    let has_area = layer.has_column(&fields.area);
    if !has_area {
        warn!("{}: no '{}' column, source areas left empty", DEFORESTATION, fields.area);
    }

    let mut records = Vec::with_capacity(layer.len());
    for feature in layer {
        let Some(id) = feature.get_property(&fields.id).and_then(|v| v.as_key()) else {
            report.dropped_missing_id += 1;
            continue;
        };
        let Some(year) = feature
            .get_property(&fields.year)
            .and_then(|v| v.as_i64())
            .and_then(|y| i32::try_from(y).ok())
        else {
            report.dropped_missing_year += 1;
            continue;
        };
        let source_area_km2 = feature.get_property(&fields.area).and_then(|v| v.as_f64());
        let Some(geometry) = polygonal(feature) else {
            report.dropped_non_polygonal += 1;
            continue;
        };
        records.push(DeforestationRecord {
            id,
            year,
            source_area_km2,
            geometry,
        });
    }
    Ok(records)
}

/// Reduce municipal features to (code, name, geometry).
///
/// Codes are opaque strings and must be unique.
pub fn municipality_records(
    layer: VectorLayer,
    fields: &FieldNames,
    report: &mut HarmonizeReport,
) -> Result<Vec<MunicipalityRecord>> {
    if layer.is_empty() {
        return Ok(Vec::new());
    }
    require(&layer, MUNICIPALITIES, &fields.code)?;
    require(&layer, MUNICIPALITIES, &fields.name)?;

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(layer.len());
    for feature in layer {
        let Some(code) = feature.get_property(&fields.code).and_then(|v| v.as_key()) else {
            report.dropped_missing_code += 1;
            continue;
        };
        let code = MunicipalityCode::new(code);
        if !seen.insert(code.clone()) {
            return Err(Error::duplicate_key(MUNICIPALITIES, code.as_str()));
        }
        let name = feature
            .get_property(&fields.name)
            .map(|v| v.to_string())
            .unwrap_or_default();
        let Some(geometry) = polygonal(feature) else {
            report.dropped_non_polygonal += 1;
            continue;
        };
        records.push(MunicipalityRecord {
            code,
            name,
            geometry,
        });
    }
    Ok(records)
}

fn polygonal(feature: Feature) -> Option<MultiPolygon<f64>> {
    feature.geometry.and_then(to_multi_polygon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use desmat_core::AttributeValue;
    use geo::{point, polygon, GeometryCollection};

    fn fields() -> FieldNames {
        FieldNames::default()
    }

    fn square() -> Geometry<f64> {
        Geometry::Polygon(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)])
    }

    #[test]
    fn test_polygonal_collections() {
        let gc = Geometry::GeometryCollection(GeometryCollection::new_from(vec![square(), square()]));
        assert_eq!(to_multi_polygon(gc).unwrap().0.len(), 2);
        let mixed = Geometry::GeometryCollection(GeometryCollection::new_from(vec![
            square(),
            Geometry::Point(point!(x: 0.0, y: 0.0)),
        ]));
        assert!(to_multi_polygon(mixed).is_none());
    }

    #[test]
    fn test_deforestation_drops_are_counted() {
        let mut layer = VectorLayer::new(None);
        layer.push(
            Feature::new(square())
                .with_property("id_desmat", AttributeValue::String("a".into()))
                .with_property("year", AttributeValue::Float(2019.0))
                .with_property("area_km", AttributeValue::Float(0.4)),
        );
        layer.push(
            Feature::new(square())
                .with_property("id_desmat", AttributeValue::String("b".into()))
                .with_property("year", AttributeValue::Null),
        );
        layer.push(
            Feature::new(Geometry::Point(point!(x: 0.0, y: 0.0)))
                .with_property("id_desmat", AttributeValue::String("c".into()))
                .with_property("year", AttributeValue::Int(2020)),
        );

        let mut report = HarmonizeReport::default();
        let records = deforestation_records(layer, &fields(), &mut report).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].year, 2019);
        assert_eq!(records[0].source_area_km2, Some(0.4));
        assert_eq!(report.dropped_missing_year, 1);
        assert_eq!(report.dropped_non_polygonal, 1);
    }

    #[test]
    fn test_missing_year_column_is_fatal() {
        let mut layer = VectorLayer::new(None);
        layer.push(Feature::new(square()).with_property("id_desmat", AttributeValue::Int(1)));
        let err = deforestation_records(layer, &fields(), &mut HarmonizeReport::default())
            .unwrap_err();
        assert!(matches!(err, Error::MissingColumn { ref column, .. } if column == "year"));
    }

    #[test]
    fn test_municipality_codes_are_strings() {
        let mut layer = VectorLayer::new(None);
        layer.push(
            Feature::new(square())
                .with_property("CD_MUN", AttributeValue::Float(1500107.0))
                .with_property("NM_MUN", AttributeValue::String("Abaetetuba".into())),
        );
        layer.push(
            Feature::new(square())
                .with_property("CD_MUN", AttributeValue::String("0150010".into()))
                .with_property("NM_MUN", AttributeValue::String("Belém".into())),
        );
        let records =
            municipality_records(layer, &fields(), &mut HarmonizeReport::default()).unwrap();
        assert_eq!(records[0].code.as_str(), "1500107");
        assert_eq!(records[1].code.as_str(), "0150010");
    }

    #[test]
    fn test_duplicate_municipality_code() {
        let mut layer = VectorLayer::new(None);
        for _ in 0..2 {
            layer.push(
                Feature::new(square())
                    .with_property("CD_MUN", AttributeValue::String("1".into()))
                    .with_property("NM_MUN", AttributeValue::String("X".into())),
            );
        }
        let err = municipality_records(layer, &fields(), &mut HarmonizeReport::default())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { .. }));
    }
}
