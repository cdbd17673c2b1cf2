//! Loading and validation of settings.
//!
//! Values defined in the configuration file can be overridden by environment variables with the
//! prefix `SECAGG` and the separator `__`, e.g. `SECAGG_MASK__PRECISION=4`. An example of a
//! configuration file can be found in the `configs/` directory located in the repository root.

use std::{convert::TryFrom, fmt, path::Path};

use config::{Config, ConfigError, Environment};
use num::bigint::BigUint;
use serde::{
    de::{self, Deserializer, Visitor},
    Deserialize,
};
use thiserror::Error;
use tracing_subscriber::filter::EnvFilter;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    crypto::{GroupParameters, InvalidGroupError},
    mask::MaskConfig,
};

#[derive(Error, Debug)]
/// An error related to loading and validation of settings.
pub enum SettingsError {
    #[error("configuration loading failed: {0}")]
    Loading(#[from] ConfigError),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

#[derive(Debug, Validate, Deserialize)]
/// The combined settings.
///
/// Each section in the configuration file corresponds to the identically named settings field.
pub struct Settings {
    #[validate]
    pub group: GroupSettings,
    #[validate]
    pub mask: MaskSettings,
    pub log: LoggingSettings,
}

impl Settings {
    /// Loads and validates the settings via a configuration file.
    ///
    /// # Errors
    /// Fails when the loading of the configuration file or its validation failed.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let settings: Settings = Self::load(path)?;
        settings.validate()?;
        Ok(settings)
    }

    fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Config::new();
        config.merge(config::File::from(path.as_ref()))?;
        config.merge(Environment::with_prefix("secagg").separator("__"))?;
        config.try_into()
    }
}

#[derive(Debug, Validate, Deserialize, Clone)]
#[validate(schema(function = "validate_group"))]
/// Discrete-log group settings.
///
/// Both values are big integers and may be given as decimal strings.
pub struct GroupSettings {
    /// The generator of the group.
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [group]
    /// generator = "3"
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// SECAGG_GROUP__GENERATOR=3
    /// ```
    #[serde(deserialize_with = "deserialize_biguint")]
    pub generator: BigUint,

    /// The prime modulus of the group. It must be greater than the generator.
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [group]
    /// modulus = "100103"
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// SECAGG_GROUP__MODULUS=100103
    /// ```
    #[serde(deserialize_with = "deserialize_biguint")]
    pub modulus: BigUint,
}

impl TryFrom<GroupSettings> for GroupParameters {
    type Error = InvalidGroupError;

    fn try_from(settings: GroupSettings) -> Result<Self, Self::Error> {
        GroupParameters::new(settings.generator, settings.modulus)
    }
}

/// A wrapper for validate derive.
fn validate_group(s: &GroupSettings) -> Result<(), ValidationError> {
    GroupParameters::try_from(s.clone())
        .map(|_| ())
        .map_err(|_| ValidationError::new("modulus > generator > 1 is violated"))
}

fn deserialize_biguint<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
where
    D: Deserializer<'de>,
{
    struct BigUintVisitor;

    impl<'de> Visitor<'de> for BigUintVisitor {
        type Value = BigUint;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "a non-negative integer or a string of decimal digits")
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(BigUint::from(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u64::try_from(value)
                .map(BigUint::from)
                .map_err(|_| de::Error::invalid_value(de::Unexpected::Signed(value), &self))
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            value
                .trim()
                .parse::<BigUint>()
                .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(value), &self))
        }
    }

    deserializer.deserialize_any(BigUintVisitor)
}

#[derive(Debug, Validate, Deserialize, Clone, Copy)]
/// Masking settings.
///
/// Every participant and the coordinator of a session must use identical values.
pub struct MaskSettings {
    /// The number of decimal digits of a tensor value which survive the masking, at most
    /// [`MAX_PRECISION`].
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [mask]
    /// precision = 6
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// SECAGG_MASK__PRECISION=6
    /// ```
    ///
    /// [`MAX_PRECISION`]: crate::mask::MAX_PRECISION
    #[validate(range(max = 18))]
    pub precision: u32,

    /// The absolute bound of tensor values. Larger values are clamped.
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [mask]
    /// bound = 100
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// SECAGG_MASK__BOUND=100
    /// ```
    #[validate(range(min = 1))]
    pub bound: u64,

    /// The maximal number of participants whose masked tensors may be aggregated.
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [mask]
    /// max_participants = 1000
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// SECAGG_MASK__MAX_PARTICIPANTS=1000
    /// ```
    #[validate(range(min = 1))]
    pub max_participants: u64,
}

impl From<MaskSettings> for MaskConfig {
    fn from(
        MaskSettings {
            precision,
            bound,
            max_participants,
        }: MaskSettings,
    ) -> MaskConfig {
        MaskConfig {
            precision,
            bound,
            max_participants,
        }
    }
}

#[derive(Debug, Deserialize)]
/// Logging settings.
pub struct LoggingSettings {
    /// A comma-separated list of logging directives. More information about logging directives
    /// can be found [here].
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [log]
    /// filter = "info"
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// SECAGG_LOG__FILTER=info
    /// ```
    ///
    /// [here]: https://docs.rs/tracing-subscriber/0.2.15/tracing_subscriber/filter/struct.EnvFilter.html#directives
    #[serde(deserialize_with = "deserialize_env_filter")]
    pub filter: EnvFilter,
}

fn deserialize_env_filter<'de, D>(deserializer: D) -> Result<EnvFilter, D::Error>
where
    D: Deserializer<'de>,
{
    struct EnvFilterVisitor;

    impl<'de> Visitor<'de> for EnvFilterVisitor {
        type Value = EnvFilter;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "a valid tracing filter directive: https://docs.rs/tracing-subscriber/0.2.15/tracing_subscriber/filter/struct.EnvFilter.html#directives")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            EnvFilter::try_new(value)
                .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(value), &self))
        }
    }

    deserializer.deserialize_str(EnvFilterVisitor)
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    impl Settings {
        fn load_from_str(string: &str) -> Result<Self, ConfigError> {
            let mut config = Config::new();
            config.merge(config::File::from_str(string, config::FileFormat::Toml))?;
            config.merge(Environment::with_prefix("secagg").separator("__"))?;
            config.try_into()
        }
    }

    const CONFIG: &str = r#"
        [group]
        generator = "3"
        modulus = "100103"

        [mask]
        precision = 6
        bound = 100
        max_participants = 1000

        [log]
        filter = "info"
    "#;

    #[test]
    #[serial]
    fn test_settings_new() {
        assert!(Settings::new("configs/config.toml").is_ok());
        assert!(Settings::new("").is_err());
    }

    #[test]
    #[serial]
    fn test_load_from_str() {
        let settings = Settings::load_from_str(CONFIG).unwrap();
        assert!(settings.validate().is_ok());
        assert_eq!(
            GroupParameters::try_from(settings.group).unwrap(),
            GroupParameters::default(),
        );
        assert_eq!(MaskConfig::from(settings.mask), MaskConfig::default());
    }

    #[test]
    #[serial]
    fn test_big_integers() {
        let config = CONFIG.replace(
            r#"modulus = "100103""#,
            r#"modulus = "340282366920938463463374607431768211507""#,
        );
        let settings = Settings::load_from_str(&config).unwrap();
        assert_eq!(
            settings.group.modulus,
            "340282366920938463463374607431768211507"
                .parse::<BigUint>()
                .unwrap(),
        );

        let config = CONFIG.replace(r#"generator = "3""#, "generator = 5");
        let settings = Settings::load_from_str(&config).unwrap();
        assert_eq!(settings.group.generator, BigUint::from(5_u8));

        let config = CONFIG.replace(r#"generator = "3""#, r#"generator = "three""#);
        assert!(Settings::load_from_str(&config).is_err());
    }

    #[test]
    #[serial]
    fn test_validate_group() {
        let config = CONFIG.replace(r#"generator = "3""#, r#"generator = "100103""#);
        let settings = Settings::load_from_str(&config).unwrap();
        assert!(settings.validate().is_err());

        let config = CONFIG.replace(r#"generator = "3""#, r#"generator = "1""#);
        let settings = Settings::load_from_str(&config).unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_validate_mask() {
        let config = CONFIG.replace("precision = 6", "precision = 19");
        let settings = Settings::load_from_str(&config).unwrap();
        assert!(settings.validate().is_err());

        let config = CONFIG.replace("bound = 100", "bound = 0");
        let settings = Settings::load_from_str(&config).unwrap();
        assert!(settings.validate().is_err());

        let config = CONFIG.replace("max_participants = 1000", "max_participants = 0");
        let settings = Settings::load_from_str(&config).unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_invalid_log_filter() {
        let config = CONFIG.replace(r#"filter = "info""#, r#"filter = "secagg_client=notalevel""#);
        assert!(Settings::load_from_str(&config).is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides_toml() {
        std::env::set_var("SECAGG_MASK__PRECISION", "4");
        std::env::set_var("SECAGG_GROUP__MODULUS", "100255");
        let settings = Settings::load_from_str(CONFIG);
        std::env::remove_var("SECAGG_MASK__PRECISION");
        std::env::remove_var("SECAGG_GROUP__MODULUS");

        let settings = settings.unwrap();
        assert_eq!(settings.mask.precision, 4);
        assert_eq!(settings.group.modulus, BigUint::from(100_255_u32));
    }
}
