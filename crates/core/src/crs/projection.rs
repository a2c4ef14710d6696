//! Pure-Rust map projections (Snyder 1987, USGS Prof. Paper 1395).
//!
//! Every projection converts to and from geographic longitude/latitude in
//! degrees on the WGS84 ellipsoid. SIRGAS 2000 and GRS80 are treated as
//! coincident with WGS84 (sub-millimetre difference in the semi-minor axis).
//! No libproj, so the whole pipeline stays a pure Rust build.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

// ── WGS84 ellipsoid constants ────────────────────────────────────────────

const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563; // flattening
const E2: f64 = 2.0 * F - F * F; // eccentricity squared
const E_PRIME2: f64 = E2 / (1.0 - E2); // second eccentricity squared
const K0: f64 = 0.9996; // UTM scale factor
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// A supported map projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Longitude/latitude in degrees
    Geographic,
    /// Spherical (Web) Mercator
    WebMercator,
    /// Universal Transverse Mercator
    Utm { zone: u32, north: bool },
    /// Albers Equal Area Conic
    Albers(Albers),
}

impl Projection {
    /// Resolve an EPSG code.
    ///
    /// - 4326, 4674 → geographic
    /// - 3857, 900913 → Web Mercator
    /// - 326xx / 327xx → WGS84 UTM
    /// - 31965..=31976 / 31977..=31985 → SIRGAS 2000 UTM 11N–22N / 17S–25S
    pub fn from_epsg(code: u32) -> Result<Self> {
        match code {
            4326 | 4674 => Ok(Projection::Geographic),
            3857 | 900913 => Ok(Projection::WebMercator),
            32601..=32660 => Ok(Projection::Utm { zone: code - 32600, north: true }),
            32701..=32760 => Ok(Projection::Utm { zone: code - 32700, north: false }),
            31965..=31976 => Ok(Projection::Utm { zone: code - 31954, north: true }),
            31977..=31985 => Ok(Projection::Utm { zone: code - 31960, north: false }),
            _ => Err(Error::UnsupportedCrs(format!("EPSG:{}", code))),
        }
    }

    /// Parse a PROJ string (`+proj=aea|utm|longlat|latlong|merc`).
    pub fn from_proj_str(proj: &str) -> Result<Self> {
        let params: HashMap<&str, Option<&str>> = proj
            .split_whitespace()
            .filter_map(|tok| tok.strip_prefix('+'))
            .map(|tok| match tok.split_once('=') {
                Some((k, v)) => (k, Some(v)),
                None => (tok, None),
            })
            .collect();

        let unsupported = || Error::UnsupportedCrs(proj.to_string());
        let number = |key: &str, default: f64| -> Result<f64> {
            match params.get(key).copied().flatten() {
                Some(v) => v.parse().map_err(|_| unsupported()),
                None => Ok(default),
            }
        };

        match params.get("proj").copied().flatten() {
            Some("longlat") | Some("latlong") => Ok(Projection::Geographic),
            Some("merc") => Ok(Projection::WebMercator),
            Some("utm") => {
                let zone = number("zone", f64::NAN)?;
                if !(1.0..=60.0).contains(&zone) || zone.fract() != 0.0 {
                    return Err(unsupported());
                }
                Ok(Projection::Utm {
                    zone: zone as u32,
                    north: !params.contains_key("south"),
                })
            }
            Some("aea") => {
                let p = AlbersParams {
                    lat_1: number("lat_1", f64::NAN)?,
                    lat_2: number("lat_2", f64::NAN)?,
                    lat_0: number("lat_0", 0.0)?,
                    lon_0: number("lon_0", 0.0)?,
                    x_0: number("x_0", 0.0)?,
                    y_0: number("y_0", 0.0)?,
                };
                Albers::new(p).map(Projection::Albers)
            }
            _ => Err(unsupported()),
        }
    }

    /// Whether planar area in this projection equals ellipsoidal area
    pub fn is_equal_area(&self) -> bool {
        matches!(self, Projection::Albers(_))
    }

    /// Project geographic (lon, lat) degrees into this projection.
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Projection::Geographic => (lon, lat),
            Projection::WebMercator => {
                let x = A * lon.to_radians();
                let y = A * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
                (x, y)
            }
            Projection::Utm { zone, north } => utm_forward(lon, lat, *zone, *north),
            Projection::Albers(albers) => albers.forward(lon, lat),
        }
    }

    /// Unproject planar coordinates back to geographic (lon, lat) degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::Geographic => (x, y),
            Projection::WebMercator => {
                let lon = (x / A).to_degrees();
                let lat = (2.0 * (y / A).exp().atan() - FRAC_PI_2).to_degrees();
                (lon, lat)
            }
            Projection::Utm { zone, north } => utm_inverse(x, y, *zone, *north),
            Projection::Albers(albers) => albers.inverse(x, y),
        }
    }
}

// ── Transverse Mercator (Snyder pp. 61-64) ───────────────────────────────

fn central_meridian(zone: u32) -> f64 {
    ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
}

fn utm_forward(lon_deg: f64, lat_deg: f64, zone: u32, north: bool) -> (f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let lon0 = central_meridian(zone);

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a_coeff = cos_lat * (lon - lon0);
    let m = meridional_arc(lat);

    let a2 = a_coeff * a_coeff;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    let easting = K0 * n
        * (a_coeff
            + (1.0 - t + c) * a2 * a_coeff / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a_coeff / 120.0)
        + FALSE_EASTING;

    let northing = K0
        * (m + n
            * tan_lat
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0));

    let northing = if north {
        northing
    } else {
        northing + FALSE_NORTHING_SOUTH
    };

    (easting, northing)
}

fn utm_inverse(easting: f64, northing: f64, zone: u32, north: bool) -> (f64, f64) {
    let x = easting - FALSE_EASTING;
    let y = if north {
        northing
    } else {
        northing - FALSE_NORTHING_SOUTH
    };

    let e4 = E2 * E2;
    let e6 = e4 * E2;
    let m = y / K0;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

    let sq = (1.0 - E2).sqrt();
    let e1 = (1.0 - sq) / (1.0 + sq);
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let sin1 = phi1.sin();
    let cos1 = phi1.cos();
    let tan1 = phi1.tan();
    let c1 = E_PRIME2 * cos1 * cos1;
    let t1 = tan1 * tan1;
    let w = 1.0 - E2 * sin1 * sin1;
    let n1 = A / w.sqrt();
    let r1 = A * (1.0 - E2) / w.powf(1.5);
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d4 = d2 * d2;
    let d6 = d4 * d2;

    let lat = phi1
        - (n1 * tan1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                    - 252.0 * E_PRIME2
                    - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    let lon = central_meridian(zone)
        + (d - (1.0 + 2.0 * t1 + c1) * d2 * d / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1)
                * d4
                * d
                / 120.0)
            / cos1;

    (lon.to_degrees(), lat.to_degrees())
}

/// Meridional arc from equator to latitude `lat` (radians). Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e4 = E2 * E2;
    let e6 = e4 * E2;

    A * ((1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * E2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

// ── Albers Equal Area Conic (Snyder pp. 98-103) ──────────────────────────

/// Defining parameters of an Albers projection, in degrees and metres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlbersParams {
    pub lat_1: f64,
    pub lat_2: f64,
    pub lat_0: f64,
    pub lon_0: f64,
    pub x_0: f64,
    pub y_0: f64,
}

/// Albers Equal Area Conic with its derived constants precomputed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Albers {
    params: AlbersParams,
    n: f64,
    c: f64,
    rho0: f64,
}

impl Albers {
    pub fn new(params: AlbersParams) -> Result<Self> {
        let AlbersParams { lat_1, lat_2, lat_0, .. } = params;
        if !lat_1.is_finite() || !lat_2.is_finite() || (lat_1 + lat_2).abs() < 1e-10 {
            return Err(Error::InvalidParameter {
                name: "lat_1/lat_2",
                value: format!("{}/{}", lat_1, lat_2),
                reason: "standard parallels must be finite and not symmetric about the equator"
                    .into(),
            });
        }

        let (phi1, phi2, phi0) = (lat_1.to_radians(), lat_2.to_radians(), lat_0.to_radians());
        let m1 = m_fn(phi1);
        let m2 = m_fn(phi2);
        let q1 = q_fn(phi1);
        let q2 = q_fn(phi2);
        let q0 = q_fn(phi0);

        let n = if (phi1 - phi2).abs() < 1e-10 {
            phi1.sin()
        } else {
            (m1 * m1 - m2 * m2) / (q2 - q1)
        };
        let c = m1 * m1 + n * q1;
        let rho0 = A * (c - n * q0).sqrt() / n;

        Ok(Self { params, n, c, rho0 })
    }

    pub fn params(&self) -> &AlbersParams {
        &self.params
    }

    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let q = q_fn(lat.to_radians());
        let rho = A * (self.c - self.n * q).max(0.0).sqrt() / self.n;
        let theta = self.n * (lon - self.params.lon_0).to_radians();
        let x = rho * theta.sin() + self.params.x_0;
        let y = self.rho0 - rho * theta.cos() + self.params.y_0;
        (x, y)
    }

    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let x = x - self.params.x_0;
        let dy = self.rho0 - (y - self.params.y_0);

        let rho = (x * x + dy * dy).sqrt().copysign(self.n);
        let theta = if self.n < 0.0 {
            (-x).atan2(-dy)
        } else {
            x.atan2(dy)
        };
        let q = (self.c - rho * rho * self.n * self.n / (A * A)) / self.n;

        let lon = self.params.lon_0 + (theta / self.n).to_degrees();
        (lon, phi_from_q(q).to_degrees())
    }
}

fn m_fn(phi: f64) -> f64 {
    phi.cos() / (1.0 - E2 * phi.sin().powi(2)).sqrt()
}

fn q_fn(phi: f64) -> f64 {
    let e = E2.sqrt();
    let s = phi.sin();
    (1.0 - E2) * (s / (1.0 - E2 * s * s) - (1.0 / (2.0 * e)) * ((1.0 - e * s) / (1.0 + e * s)).ln())
}

/// Invert `q_fn` by fixed-point iteration (Snyder eq. 3-16).
fn phi_from_q(q: f64) -> f64 {
    let e = E2.sqrt();
    let mut phi = (q / 2.0).clamp(-1.0, 1.0).asin();
    for _ in 0..25 {
        let s = phi.sin();
        let w = 1.0 - E2 * s * s;
        let cos = phi.cos();
        if cos.abs() < 1e-12 {
            break;
        }
        let delta = w * w / (2.0 * cos)
            * (q / (1.0 - E2) - s / w + (1.0 / (2.0 * e)) * ((1.0 - e * s) / (1.0 + e * s)).ln());
        phi += delta;
        if delta.abs() < 1e-14 {
            break;
        }
    }
    phi
}

/// Ellipsoidal area (m²) of the band between two parallels spanning `dlon`
/// degrees of longitude. Used as ground truth for equal-area checks.
pub fn graticule_area(lat_a: f64, lat_b: f64, dlon: f64) -> f64 {
    (A * A / 2.0) * dlon.to_radians() * (q_fn(lat_b.to_radians()) - q_fn(lat_a.to_radians())).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::SOUTH_AMERICA_ALBERS;

    #[test]
    fn test_utm_roundtrip_southern_hemisphere() {
        let p = Projection::from_epsg(31982).unwrap();
        assert_eq!(p, Projection::Utm { zone: 22, north: false });
        let (x, y) = p.forward(-51.5, -3.2);
        let (lon, lat) = p.inverse(x, y);
        assert!((lon + 51.5).abs() < 1e-7, "lon {}", lon);
        assert!((lat + 3.2).abs() < 1e-7, "lat {}", lat);
    }

    #[test]
    fn test_utm_central_meridian_easting() {
        let p = Projection::Utm { zone: 22, north: false };
        let (x, _) = p.forward(-51.0, -5.0);
        assert!((x - FALSE_EASTING).abs() < 1e-6);
    }

    #[test]
    fn test_web_mercator_roundtrip() {
        let p = Projection::WebMercator;
        let (x, y) = p.forward(-48.5, -1.45);
        let (lon, lat) = p.inverse(x, y);
        assert!((lon + 48.5).abs() < 1e-9);
        assert!((lat + 1.45).abs() < 1e-9);
    }

    #[test]
    fn test_albers_roundtrip() {
        let p = Projection::from_proj_str(SOUTH_AMERICA_ALBERS).unwrap();
        for &(lon, lat) in &[(-60.0, -32.0), (-48.5, -1.45), (-55.0, -10.0), (-70.0, 2.0)] {
            let (x, y) = p.forward(lon, lat);
            let (lon2, lat2) = p.inverse(x, y);
            assert!((lon - lon2).abs() < 1e-8, "{} vs {}", lon, lon2);
            assert!((lat - lat2).abs() < 1e-8, "{} vs {}", lat, lat2);
        }
    }

    #[test]
    fn test_albers_origin() {
        let p = Projection::from_proj_str(SOUTH_AMERICA_ALBERS).unwrap();
        let (x, y) = p.forward(-60.0, -32.0);
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6, "({}, {})", x, y);
    }

    #[test]
    fn test_albers_preserves_area() {
        let p = Projection::from_proj_str(SOUTH_AMERICA_ALBERS).unwrap();
        let (lon, lat, d) = (-52.0, -4.0, 0.01);
        let corners = [
            p.forward(lon, lat),
            p.forward(lon + d, lat),
            p.forward(lon + d, lat + d),
            p.forward(lon, lat + d),
        ];
        let mut twice = 0.0;
        for i in 0..4 {
            let (x1, y1) = corners[i];
            let (x2, y2) = corners[(i + 1) % 4];
            twice += x1 * y2 - x2 * y1;
        }
        let planar = twice.abs() / 2.0;
        let truth = graticule_area(lat, lat + d, d);
        assert!(((planar - truth) / truth).abs() < 1e-4, "{} vs {}", planar, truth);
    }

    #[test]
    fn test_unsupported() {
        assert!(Projection::from_epsg(5880).is_err());
        assert!(Projection::from_proj_str("+proj=poly +lat_0=0").is_err());
        assert!(Projection::from_proj_str("+proj=utm +zone=99").is_err());
    }
}
