//! Coordinate Reference System handling

mod projection;

pub use projection::{graticule_area, Albers, AlbersParams, Projection};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// PROJ definition of South America Albers Equal Area Conic (ESRI:102033).
pub const SOUTH_AMERICA_ALBERS: &str =
    "+proj=aea +lat_0=-32 +lon_0=-60 +lat_1=-5 +lat_2=-42 +x_0=0 +y_0=0 +ellps=GRS80 +units=m";

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation (primary)
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            proj: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
            proj: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
        }
    }

    /// Parse the CRS notations found in layer files and configuration:
    /// `EPSG:4674`, `urn:ogc:def:crs:EPSG::4674`, `urn:ogc:def:crs:OGC:1.3:CRS84`,
    /// `ESRI:102033`, PROJ strings and WKT.
    pub fn from_user_input(input: &str) -> Result<Self> {
        let s = input.trim();
        let upper = s.to_ascii_uppercase();

        if upper.ends_with("CRS84") {
            return Ok(Self::wgs84());
        }
        if upper == "ESRI:102033" {
            return Ok(Self::south_america_albers());
        }
        if let Some(code) = upper.strip_prefix("EPSG:") {
            return parse_code(code, s).map(Self::from_epsg);
        }
        if upper.starts_with("URN:OGC:DEF:CRS:EPSG:") {
            let code = upper.rsplit(':').next().unwrap_or_default();
            return parse_code(code, s).map(Self::from_epsg);
        }
        if s.starts_with("+proj") {
            return Ok(Self::from_proj(s));
        }
        if ["GEOGCS", "PROJCS", "GEOGCRS", "PROJCRS"]
            .iter()
            .any(|p| upper.starts_with(p))
        {
            return Ok(Self::from_wkt(s));
        }
        Err(Error::UnsupportedCrs(s.to_string()))
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// SIRGAS 2000 geographic CRS (EPSG:4674), the datum of IBGE boundaries
    pub fn sirgas2000() -> Self {
        Self::from_epsg(4674)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    /// South America Albers Equal Area Conic, the default measurement CRS
    pub fn south_america_albers() -> Self {
        Self::from_proj(SOUTH_AMERICA_ALBERS)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Get PROJ string
    pub fn proj(&self) -> Option<&str> {
        self.proj.as_deref()
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }

        // Textual comparison; imperfect for WKT and PROJ
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }

        if let (Some(a), Some(b)) = (&self.proj, &other.proj) {
            return normalize_proj(a) == normalize_proj(b);
        }

        false
    }

    /// Resolve the map projection this CRS describes.
    pub fn projection(&self) -> Result<Projection> {
        if let Some(code) = self.epsg {
            return Projection::from_epsg(code);
        }
        if let Some(proj) = &self.proj {
            return Projection::from_proj_str(proj);
        }
        Err(Error::UnsupportedCrs(self.identifier()))
    }

    /// Whether area measured in this CRS equals ground area
    pub fn is_equal_area(&self) -> bool {
        self.projection().map(|p| p.is_equal_area()).unwrap_or(false)
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            let end = wkt
                .char_indices()
                .nth(50)
                .map(|(i, _)| i)
                .unwrap_or(wkt.len());
            return format!("WKT:{}", &wkt[..end]);
        }
        "Unknown".to_string()
    }
}

fn parse_code(code: &str, original: &str) -> Result<u32> {
    code.trim()
        .parse()
        .map_err(|_| Error::UnsupportedCrs(original.to_string()))
}

fn normalize_proj(s: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = s.split_whitespace().collect();
    parts.sort_unstable();
    parts
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(4326);
        assert_eq!(crs.epsg(), Some(4326));
        assert_eq!(crs.identifier(), "EPSG:4326");
    }

    #[test]
    fn test_crs_equivalence() {
        let a = CRS::from_epsg(4326);
        let b = CRS::wgs84();
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&CRS::sirgas2000()));
    }

    #[test]
    fn test_proj_equivalence_ignores_token_order() {
        let a = CRS::from_proj("+proj=utm +zone=22 +south");
        let b = CRS::from_proj("+proj=utm +south +zone=22");
        assert!(a.is_equivalent(&b));
    }

    #[test]
    fn test_user_input_notations() {
        assert_eq!(CRS::from_user_input("EPSG:4674").unwrap().epsg(), Some(4674));
        assert_eq!(
            CRS::from_user_input("urn:ogc:def:crs:EPSG::31982").unwrap().epsg(),
            Some(31982)
        );
        assert_eq!(
            CRS::from_user_input("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap().epsg(),
            Some(4326)
        );
        assert!(CRS::from_user_input("ESRI:102033").unwrap().is_equal_area());
        assert!(CRS::from_user_input("EPSG:abc").is_err());
        assert!(CRS::from_user_input("nonsense").is_err());
    }

    #[test]
    fn test_equal_area_flags() {
        assert!(CRS::south_america_albers().is_equal_area());
        assert!(!CRS::wgs84().is_equal_area());
        assert!(!CRS::web_mercator().is_equal_area());
    }
}
