//! Body-size estimation from age via the von Bertalanffy growth model.
//!
//! Length follows `L(t) = L_inf * (1 - exp(-K * (t - t0)))` with species
//! parameters from an embedded table (genus-level fallback, then generic
//! defaults). Weight follows the allometric relation `W = a * L^b` with
//! length in centimetres and weight in grams.

/// Von Bertalanffy growth parameters.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct VonBertalanffyParams {
    /// Asymptotic length, centimetres.
    pub l_inf_cm: f32,
    /// Growth rate coefficient, per growth period.
    pub k: f32,
    /// Theoretical age at zero length.
    pub t0: f32,
}

/// Allometric length-weight parameters.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct AllometricParams {
    pub a: f32,
    pub b: f32,
}

/// Configuration for size estimation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SizeConfig {
    /// Parameters used when no species entry matches.
    pub default_growth: VonBertalanffyParams,
    pub allometric: AllometricParams,
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self {
            default_growth: VonBertalanffyParams {
                l_inf_cm: 50.0,
                k: 0.3,
                t0: -0.5,
            },
            allometric: AllometricParams { a: 0.01, b: 3.0 },
        }
    }
}

/// Expected body size for the estimated age.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SizeEstimate {
    pub length_cm: f32,
    pub weight_g: f32,
    /// Growth parameters the estimate was computed with.
    pub params: VonBertalanffyParams,
    /// False when the species hint was missing or unrecognized and the
    /// generic defaults were used.
    pub species_matched: bool,
}

/// Embedded growth parameters, keyed by (genus, species).
///
/// Values are representative fishery-assessment figures; per-stock
/// parameter sets belong to the caller's configuration, not this table.
const SPECIES_TABLE: &[(&str, &str, VonBertalanffyParams)] = &[
    ("gadus", "morhua", VonBertalanffyParams { l_inf_cm: 120.0, k: 0.12, t0: -0.3 }),
    ("gadus", "chalcogrammus", VonBertalanffyParams { l_inf_cm: 65.0, k: 0.20, t0: -0.4 }),
    ("clupea", "harengus", VonBertalanffyParams { l_inf_cm: 34.0, k: 0.35, t0: -0.6 }),
    ("salmo", "salar", VonBertalanffyParams { l_inf_cm: 95.0, k: 0.25, t0: -0.2 }),
    ("oncorhynchus", "mykiss", VonBertalanffyParams { l_inf_cm: 70.0, k: 0.30, t0: -0.1 }),
    ("thunnus", "thynnus", VonBertalanffyParams { l_inf_cm: 310.0, k: 0.09, t0: -1.0 }),
    ("sebastes", "norvegicus", VonBertalanffyParams { l_inf_cm: 47.0, k: 0.11, t0: -0.9 }),
    ("lutjanus", "campechanus", VonBertalanffyParams { l_inf_cm: 86.0, k: 0.19, t0: -0.4 }),
];

/// Look up growth parameters for a free-text scientific name.
///
/// Exact binomial match first, then any entry of the same genus.
fn lookup_species(hint: &str) -> Option<VonBertalanffyParams> {
    let normalized = hint.trim().to_lowercase();
    let mut parts = normalized.split_whitespace();
    let genus = parts.next()?;
    let species = parts.next();

    if let Some(species) = species {
        if let Some((_, _, params)) = SPECIES_TABLE
            .iter()
            .find(|(g, s, _)| *g == genus && *s == species)
        {
            return Some(*params);
        }
    }
    SPECIES_TABLE
        .iter()
        .find(|(g, _, _)| *g == genus)
        .map(|(_, _, params)| *params)
}

/// Estimate expected length and weight for an age.
///
/// Never fails: an unrecognized species falls back to the configured
/// defaults with `species_matched = false`.
pub fn estimate_size(age: f32, species_hint: Option<&str>, config: &SizeConfig) -> SizeEstimate {
    let looked_up = species_hint.and_then(lookup_species);
    let species_matched = looked_up.is_some();
    let params = looked_up.unwrap_or(config.default_growth);

    let age = age.max(0.0);
    let length_cm = (params.l_inf_cm * (1.0 - (-params.k * (age - params.t0)).exp())).max(0.0);
    let weight_g = (config.allometric.a * length_cm.powf(config.allometric.b)).max(0.0);

    SizeEstimate {
        length_cm,
        weight_g,
        params,
        species_matched,
    }
}
