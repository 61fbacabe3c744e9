//! Crystal structure model.
//!
//! Mirrors the parts of a pymatgen `Structure` dict the report needs: a lattice
//! matrix, ordered sites with species occupancies, and the symmetry block the
//! Materials Project attaches to each material.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::periodic::{electronegativity, element_symbol};

/// Lattice as three row vectors a, b, c (Å).
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    pub matrix: [[f64; 3]; 3],
}

fn norm(v: [f64; 3]) -> f64 {
    (v[0].powi(2) + v[1].powi(2) + v[2].powi(2)).sqrt()
}

fn dot(u: [f64; 3], v: [f64; 3]) -> f64 {
    u.iter().zip(v.iter()).map(|(x, y)| x * y).sum()
}

fn angle_deg(u: [f64; 3], v: [f64; 3]) -> f64 {
    let cos = (dot(u, v) / (norm(u) * norm(v))).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

impl Lattice {
    pub fn from_vectors(matrix: [[f64; 3]; 3]) -> Self {
        Lattice { matrix }
    }

    /// Build from (a, b, c, alpha, beta, gamma), angles in degrees.
    pub fn from_parameters(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        let (cos_alpha, cos_beta) = (alpha.to_radians().cos(), beta.to_radians().cos());
        let (sin_gamma, cos_gamma) = gamma.to_radians().sin_cos();

        let c1 = c * cos_beta;
        let c2 = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let c3 = (c * c - c1 * c1 - c2 * c2).sqrt();

        Lattice {
            matrix: [
                [a, 0.0, 0.0],
                [b * cos_gamma, b * sin_gamma, 0.0],
                [c1, c2, c3],
            ],
        }
    }

    pub fn a(&self) -> f64 {
        norm(self.matrix[0])
    }

    pub fn b(&self) -> f64 {
        norm(self.matrix[1])
    }

    pub fn c(&self) -> f64 {
        norm(self.matrix[2])
    }

    pub fn alpha(&self) -> f64 {
        angle_deg(self.matrix[1], self.matrix[2])
    }

    pub fn beta(&self) -> f64 {
        angle_deg(self.matrix[0], self.matrix[2])
    }

    pub fn gamma(&self) -> f64 {
        angle_deg(self.matrix[0], self.matrix[1])
    }

    /// Unit-cell volume (Å³), always positive.
    pub fn volume(&self) -> f64 {
        let [a, b, c] = self.matrix;
        (a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
            + a[2] * (b[0] * c[1] - b[1] * c[0]))
            .abs()
    }

    /// Fractional -> Cartesian coordinates.
    pub fn cartesian(&self, abc: [f64; 3]) -> [f64; 3] {
        let m = &self.matrix;
        [0, 1, 2].map(|j| abc[0] * m[0][j] + abc[1] * m[1][j] + abc[2] * m[2][j])
    }
}

/// One species on a site with its occupancy.
#[derive(Debug, Clone, PartialEq)]
pub struct Specie {
    pub symbol: String,
    pub occu: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub species: Vec<Specie>,
    /// Cartesian coordinates (Å).
    pub xyz: [f64; 3],
    /// Fractional coordinates.
    pub abc: [f64; 3],
}

impl Site {
    pub fn new(symbol: impl Into<String>, xyz: [f64; 3], abc: [f64; 3]) -> Self {
        Site {
            species: vec![Specie {
                symbol: symbol.into(),
                occu: 1.0,
            }],
            xyz,
            abc,
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.species.len() == 1 && (self.species[0].occu - 1.0).abs() < 1e-8
    }

    /// `Pt` for an ordered site, `Au:0.500, Pt:0.500` for a disordered one.
    pub fn species_label(&self) -> String {
        if self.is_ordered() {
            return self.species[0].symbol.clone();
        }
        let mut parts: Vec<&Specie> = self.species.iter().collect();
        parts.sort_by(|x, y| x.symbol.cmp(&y.symbol));
        parts
            .iter()
            .map(|s| format!("{}:{:.3}", s.symbol, s.occu))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Space-group block attached to Materials Project documents.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Symmetry {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub crystal_system: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub lattice: Lattice,
    pub sites: Vec<Site>,
    pub symmetry: Option<Symmetry>,
}

impl Structure {
    pub fn new(lattice: Lattice, sites: Vec<Site>) -> Self {
        Structure {
            lattice,
            sites,
            symmetry: None,
        }
    }

    pub fn with_symmetry(mut self, symmetry: Symmetry) -> Self {
        self.symmetry = Some(symmetry);
        self
    }

    pub fn composition(&self) -> Composition {
        Composition::from_pairs(
            self.sites
                .iter()
                .flat_map(|site| site.species.iter())
                .map(|sp| (element_symbol(&sp.symbol), sp.occu)),
        )
    }

    /// Space-group (symbol, number).
    ///
    /// Fails on degenerate cells and when no symmetry data came with the
    /// structure.
    pub fn space_group_info(&self) -> Result<(String, u32)> {
        if self.sites.is_empty() {
            return Err(Error::SpaceGroupUnavailable("structure has no sites".into()));
        }
        if self.lattice.volume() < 1e-6 {
            return Err(Error::SpaceGroupUnavailable("degenerate lattice".into()));
        }
        let sym = self
            .symmetry
            .as_ref()
            .ok_or_else(|| Error::SpaceGroupUnavailable("no symmetry data".into()))?;
        match (&sym.symbol, sym.number) {
            (Some(symbol), Some(number)) if (1..=230).contains(&number) => {
                Ok((symbol.clone(), number))
            }
            _ => Err(Error::SpaceGroupUnavailable("incomplete symmetry data".into())),
        }
    }
}

/// Element amounts in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition {
    amounts: Vec<(String, f64)>,
}

const AMOUNT_TOL: f64 = 1e-8;

// Reduced formulas pymatgen rewrites for molecular species.
const SPECIAL_FORMULAS: [(&str, &str); 11] = [
    ("LiO", "LiO2"),
    ("NaO", "NaO2"),
    ("KO", "KO2"),
    ("HO", "H2O2"),
    ("CsO", "CsO2"),
    ("RbO", "RbO2"),
    ("O", "O2"),
    ("N", "N2"),
    ("F", "F2"),
    ("Cl", "Cl2"),
    ("H", "H2"),
];

impl Composition {
    pub fn add(&mut self, symbol: &str, amount: f64) {
        match self.amounts.iter_mut().find(|(s, _)| s == symbol) {
            Some((_, a)) => *a += amount,
            None => self.amounts.push((symbol.to_string(), amount)),
        }
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        let mut comp = Composition::default();
        for (s, a) in pairs {
            comp.add(s, a);
        }
        comp
    }

    /// Distinct element symbols in first-appearance order.
    pub fn elements(&self) -> Vec<&str> {
        self.amounts
            .iter()
            .filter(|(_, a)| a.abs() > AMOUNT_TOL)
            .map(|(s, _)| s.as_str())
            .collect()
    }

    /// Reduced formula, elements ordered by electronegativity (`NaCl`, `Fe2O3`).
    pub fn reduced_formula(&self) -> String {
        let mut amounts: Vec<(&str, f64)> = self
            .amounts
            .iter()
            .filter(|(_, a)| a.abs() > AMOUNT_TOL)
            .map(|(s, a)| (s.as_str(), *a))
            .collect();
        if amounts.is_empty() {
            return String::new();
        }

        let all_int = amounts
            .iter()
            .all(|(_, a)| (a - a.round()).abs() < AMOUNT_TOL);
        if all_int {
            let factor = amounts
                .iter()
                .map(|(_, a)| a.round() as u64)
                .fold(0, gcd)
                .max(1);
            for (_, a) in amounts.iter_mut() {
                *a = (a.round() as u64 / factor) as f64;
            }
        }

        amounts.sort_by(|(s1, _), (s2, _)| {
            let x1 = electronegativity(s1).unwrap_or(f64::INFINITY);
            let x2 = electronegativity(s2).unwrap_or(f64::INFINITY);
            x1.total_cmp(&x2).then_with(|| s1.cmp(s2))
        });

        let formula: String = amounts
            .iter()
            .map(|(s, a)| format!("{s}{}", format_amount(*a)))
            .collect();

        SPECIAL_FORMULAS
            .iter()
            .find(|(k, _)| *k == formula)
            .map(|(_, v)| v.to_string())
            .unwrap_or(formula)
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

fn format_amount(a: f64) -> String {
    if (a - 1.0).abs() < AMOUNT_TOL {
        String::new()
    } else if (a - a.round()).abs() < AMOUNT_TOL {
        format!("{}", a.round() as i64)
    } else {
        let s = format!("{a:.8}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

// ---------------------------------------------------------------------------
// pymatgen dict layout
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawLattice {
    matrix: [[f64; 3]; 3],
}

#[derive(Debug, Deserialize)]
struct RawSpecie {
    element: String,
    #[serde(default = "one")]
    occu: f64,
}

fn one() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
struct RawSite {
    species: Vec<RawSpecie>,
    abc: [f64; 3],
    #[serde(default)]
    xyz: Option<[f64; 3]>,
}

/// Serialized pymatgen structure (`Structure.as_dict()`).
#[derive(Debug, Deserialize)]
pub struct RawStructure {
    lattice: RawLattice,
    sites: Vec<RawSite>,
}

impl TryFrom<RawStructure> for Structure {
    type Error = Error;

    fn try_from(raw: RawStructure) -> Result<Self> {
        let lattice = Lattice::from_vectors(raw.lattice.matrix);
        let mut sites = Vec::with_capacity(raw.sites.len());
        for (i, s) in raw.sites.into_iter().enumerate() {
            if s.species.is_empty() {
                return Err(Error::InvalidResponse(format!("site {i} has no species")));
            }
            let xyz = s.xyz.unwrap_or_else(|| lattice.cartesian(s.abc));
            sites.push(Site {
                species: s
                    .species
                    .into_iter()
                    .map(|sp| Specie {
                        symbol: sp.element,
                        occu: sp.occu,
                    })
                    .collect(),
                xyz,
                abc: s.abc,
            });
        }
        Ok(Structure::new(lattice, sites))
    }
}
