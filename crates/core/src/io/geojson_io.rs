//! GeoJSON layer reading and intersection export

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::records::IntersectionRecord;
use crate::vector::{AttributeValue, Feature, VectorLayer};
use geojson::feature::Id;
use geojson::{FeatureCollection, GeoJson, JsonObject, JsonValue};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read a GeoJSON file into a vector layer
pub fn read_layer<P: AsRef<Path>>(path: P) -> Result<VectorLayer> {
    let path = path.as_ref();
    debug!(?path, "reading geojson");
    let contents = fs::read_to_string(path)?;
    let layer = read_layer_from_str(&contents)?;
    debug!(?path, features = layer.len(), "parsed geojson");
    Ok(layer)
}

/// Parse GeoJSON text into a vector layer.
///
/// The CRS comes from the legacy `crs` member; without one the layer is
/// WGS84 as RFC 7946 mandates.
pub fn read_layer_from_str(contents: &str) -> Result<VectorLayer> {
    let geojson: GeoJson = contents.parse()?;

    let (features, foreign) = match geojson {
        GeoJson::FeatureCollection(fc) => (fc.features, fc.foreign_members),
        GeoJson::Feature(f) => (vec![f], None),
        GeoJson::Geometry(g) => (vec![geojson::Feature::from(g)], None),
    };

    let crs = match foreign.as_ref().and_then(crs_name) {
        Some(name) => CRS::from_user_input(&name)?,
        None => CRS::wgs84(),
    };

    let mut layer = VectorLayer::new(Some(crs));
    for f in features {
        let mut feature = match f.geometry {
            Some(g) => Feature::new(geo_types::Geometry::<f64>::try_from(g)?),
            None => Feature::empty(),
        };
        feature.id = f.id.map(|id| match id {
            Id::String(s) => s,
            Id::Number(n) => n.to_string(),
        });
        for (key, value) in f.properties.unwrap_or_default() {
            feature.set_property(key, AttributeValue::from(value));
        }
        layer.push(feature);
    }
    Ok(layer)
}

/// `{"crs": {"type": "name", "properties": {"name": "EPSG:4674"}}}`
fn crs_name(foreign: &JsonObject) -> Option<String> {
    foreign
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

/// Write intersection records as a GeoJSON FeatureCollection
pub fn write_intersections<P: AsRef<Path>>(
    records: &[IntersectionRecord],
    crs: Option<&CRS>,
    path: P,
) -> Result<()> {
    let features = records
        .iter()
        .map(|r| {
            let mut props = JsonObject::new();
            props.insert("id_desmat".into(), JsonValue::from(r.deforestation_id.clone()));
            props.insert("year".into(), JsonValue::from(r.year));
            props.insert("CD_MUN".into(), JsonValue::from(r.code.as_str()));
            props.insert("NM_MUN".into(), JsonValue::from(r.name.clone()));
            props.insert("area_km2".into(), JsonValue::from(r.area_km2));
            let geometry = geojson::Geometry::new(geojson::Value::from(&r.geometry));
            geojson::Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: Some(props),
                foreign_members: None,
            }
        })
        .collect();

    let foreign_members = crs.map(|crs| {
        let mut m = JsonObject::new();
        m.insert(
            "crs".into(),
            serde_json::json!({ "type": "name", "properties": { "name": crs.identifier() } }),
        );
        m
    });

    let fc = FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    };
    fs::write(path, GeoJson::from(fc).to_string()).map_err(Error::from)
}
