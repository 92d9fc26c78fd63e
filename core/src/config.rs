use crate::{
    error::{SimError, SimResult},
    types::Seed,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Seed the reference pre-period dataset was generated with.
pub const DEFAULT_POPULATION_SEED: Seed = 0xF8B4_1CFE_AD41_1E05_506D_1AEB_F534_34A8;
/// Seed the reference experiment was randomized with.
pub const DEFAULT_EXPERIMENT_SEED: Seed = 0x4E1C_2A9F_DB83_7C50_A691_B4D2_E8F6_A3C7;
/// Experiment pool: "same generator, different seed".
pub const DEFAULT_POOL_SEED: Seed = 0x5D27_90B3_C1E8_4F06_9A3B_72D1_0C4E_E815;

pub const DEFAULT_POPULATION_SIZE: usize = 2000;
pub const DEFAULT_SAMPLE_SIZE: usize = 2772 * 2;
pub const DEFAULT_POOL_SIZE: usize = DEFAULT_SAMPLE_SIZE * 2;

pub const DEFAULT_EFFECT_DECAY_THRESHOLD: f64 = 150.0;
pub const DEFAULT_EFFECT_DECAY_RATE: f64 = 0.04;
pub const DEFAULT_TREATMENT_EFFECT: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    pub size: usize,
    #[serde(deserialize_with = "deserialize_seed", serialize_with = "serialize_seed")]
    pub seed: Seed,
}

/// Shape of the decaying lift. See `treatment::lift`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreatmentParams {
    pub effect_decay_threshold: f64,
    pub effect_decay_rate: f64,
    pub treatment_effect: f64,
}

impl Default for TreatmentParams {
    fn default() -> Self {
        Self {
            effect_decay_threshold: DEFAULT_EFFECT_DECAY_THRESHOLD,
            effect_decay_rate: DEFAULT_EFFECT_DECAY_RATE,
            treatment_effect: DEFAULT_TREATMENT_EFFECT,
        }
    }
}

impl TreatmentParams {
    /// Lift is one-sided: a negative effect or a negative decay rate is
    /// outside the model and rejected.
    pub fn validate(&self) -> SimResult<()> {
        let Self { effect_decay_threshold, effect_decay_rate, treatment_effect } = *self;
        if !effect_decay_threshold.is_finite() {
            return Err(SimError::invalid(format!(
                "effect_decay_threshold must be finite, got {effect_decay_threshold}"
            )));
        }
        if !(effect_decay_rate.is_finite() && effect_decay_rate >= 0.0) {
            return Err(SimError::invalid(format!(
                "effect_decay_rate must be finite and >= 0, got {effect_decay_rate}"
            )));
        }
        if !(treatment_effect.is_finite() && treatment_effect >= 0.0) {
            return Err(SimError::invalid(format!(
                "treatment_effect must be finite and >= 0, got {treatment_effect}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub sample_size: usize,
    #[serde(deserialize_with = "deserialize_seed", serialize_with = "serialize_seed")]
    pub seed: Seed,
    #[serde(default)]
    pub treatment: TreatmentParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Pre-period dataset (historical covariates).
    pub population: PopulationConfig,
    /// Fresh population the experiment samples from.
    pub experiment_pool: PopulationConfig,
    pub experiment: ExperimentConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            population: PopulationConfig {
                size: DEFAULT_POPULATION_SIZE,
                seed: DEFAULT_POPULATION_SEED,
            },
            experiment_pool: PopulationConfig {
                size: DEFAULT_POOL_SIZE,
                seed: DEFAULT_POOL_SEED,
            },
            experiment: ExperimentConfig {
                sample_size: DEFAULT_SAMPLE_SIZE,
                seed: DEFAULT_EXPERIMENT_SEED,
                treatment: TreatmentParams::default(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct SimConfigFile {
    population: Option<PopulationConfig>,
    experiment_pool: Option<PopulationConfig>,
    experiment: Option<ExperimentConfig>,
}

impl SimConfig {
    /// Load from a JSON file. Sections left out keep their defaults.
    /// In tests, use SimConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let file: SimConfigFile = serde_json::from_str(content)?;
        let defaults = Self::default();
        let config = Self {
            population: file.population.unwrap_or(defaults.population),
            experiment_pool: file.experiment_pool.unwrap_or(defaults.experiment_pool),
            experiment: file.experiment.unwrap_or(defaults.experiment),
        };
        config.experiment.treatment.validate()?;
        Ok(config)
    }

    /// Small, fast config with hardcoded seeds for unit tests.
    pub fn default_test() -> Self {
        Self {
            population: PopulationConfig { size: 200, seed: 42 },
            experiment_pool: PopulationConfig { size: 500, seed: 43 },
            experiment: ExperimentConfig {
                sample_size: 300,
                seed: 44,
                treatment: TreatmentParams::default(),
            },
        }
    }
}

/// Parse a seed given as decimal or `0x`-prefixed hex.
pub fn parse_seed(text: &str) -> Result<Seed, String> {
    let t = text.trim().replace('_', "");
    let parsed = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        Some(hex) => Seed::from_str_radix(hex, 16),
        None => t.parse::<Seed>(),
    };
    parsed.map_err(|e| format!("invalid seed {text:?}: {e}"))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedRepr {
    Number(u64),
    Text(String),
}

fn deserialize_seed<'de, D: Deserializer<'de>>(d: D) -> Result<Seed, D::Error> {
    match SeedRepr::deserialize(d)? {
        SeedRepr::Number(n) => Ok(n as Seed),
        SeedRepr::Text(s) => parse_seed(&s).map_err(serde::de::Error::custom),
    }
}

fn serialize_seed<S: serde::Serializer>(seed: &Seed, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{seed:#x}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_run() {
        let c = SimConfig::default();
        assert_eq!(c.population.size, 2000);
        assert_eq!(c.experiment.sample_size, 5544);
        assert_eq!(c.experiment.treatment.effect_decay_threshold, 150.0);
        assert_eq!(c.experiment.treatment.effect_decay_rate, 0.04);
        assert_eq!(c.experiment.treatment.treatment_effect, 0.05);
        assert!(c.experiment_pool.size >= c.experiment.sample_size);
    }

    #[test]
    fn seeds_parse_as_hex_or_decimal() {
        assert_eq!(parse_seed("0xF8B41CFEAD411E05506D1AEBF53434A8").unwrap(), DEFAULT_POPULATION_SEED);
        assert_eq!(parse_seed("1234").unwrap(), 1234);
        assert!(parse_seed("0xZZ").is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{
            "experiment": {
                "sample_size": 100,
                "seed": "0x10",
                "treatment": { "effect_decay_threshold": 80.0, "effect_decay_rate": 0.1, "treatment_effect": 0.2 }
            }
        }"#;
        let c = SimConfig::from_json(json).unwrap();
        assert_eq!(c.experiment.sample_size, 100);
        assert_eq!(c.experiment.seed, 16);
        assert_eq!(c.experiment.treatment.effect_decay_threshold, 80.0);
        assert_eq!(c.population, SimConfig::default().population);
    }

    #[test]
    fn negative_effect_is_rejected() {
        let p = TreatmentParams { treatment_effect: -0.1, ..TreatmentParams::default() };
        assert!(matches!(p.validate(), Err(SimError::InvalidArgument(_))));
        let json = r#"{ "experiment": { "sample_size": 10, "seed": 1,
            "treatment": { "effect_decay_threshold": 150.0, "effect_decay_rate": 0.04, "treatment_effect": -0.5 } } }"#;
        assert!(SimConfig::from_json(json).is_err());
    }
}
