use crate::core::gate::GatePolicy;
use crate::core::meal_clock::MealSchedule;
use crate::domain::model::TokenBalance;
use crate::utils::error::{AdmitError, Result};
use crate::utils::validation::{
    validate_meal_hours, validate_non_empty_string, validate_positive_number, validate_range,
    Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CanteenConfig {
    pub canteen: CanteenSection,
    pub meals: MealsConfig,
    pub store: StoreConfig,
    pub roster: RosterConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanteenSection {
    pub name: String,
    /// Local time offset from UTC used for meal slots and day boundaries.
    pub utc_offset_minutes: i32,
}

impl Default for CanteenSection {
    fn default() -> Self {
        Self {
            name: "Canteen".to_string(),
            utc_offset_minutes: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MealsConfig {
    pub breakfast_start_hour: u32,
    pub lunch_start_hour: u32,
    pub dinner_start_hour: u32,
}

impl Default for MealsConfig {
    fn default() -> Self {
        Self {
            breakfast_start_hour: 6,
            lunch_start_hour: 11,
            dinner_start_hour: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub operation_timeout_ms: u64,
    pub lock_timeout_ms: u64,
    pub max_conflict_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            operation_timeout_ms: 2000,
            lock_timeout_ms: 5000,
            max_conflict_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    pub default_tokens: TokenBalance,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            default_tokens: TokenBalance::uniform(30),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl CanteenConfig {
    /// Loads and parses a TOML file; see `from_toml_str`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AdmitError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// Replaces `${VAR_NAME}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| AdmitError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn meal_schedule(&self) -> Result<MealSchedule> {
        MealSchedule::new(
            self.meals.breakfast_start_hour,
            self.meals.lunch_start_hour,
            self.meals.dinner_start_hour,
            self.canteen.utc_offset_minutes,
        )
    }

    pub fn gate_policy(&self) -> GatePolicy {
        GatePolicy {
            operation_timeout: Duration::from_millis(self.store.operation_timeout_ms),
            lock_timeout: Duration::from_millis(self.store.lock_timeout_ms),
            max_conflict_retries: self.store.max_conflict_retries,
        }
    }
}

impl Validate for CanteenConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("canteen.name", &self.canteen.name)?;
        validate_range(
            "canteen.utc_offset_minutes",
            self.canteen.utc_offset_minutes,
            -12 * 60,
            14 * 60,
        )?;
        validate_meal_hours(
            self.meals.breakfast_start_hour,
            self.meals.lunch_start_hour,
            self.meals.dinner_start_hour,
        )?;
        validate_positive_number("store.operation_timeout_ms", self.store.operation_timeout_ms, 1)?;
        validate_positive_number("store.lock_timeout_ms", self.store.lock_timeout_ms, 1)?;

        let levels = ["trace", "debug", "info", "warn", "error"];
        if !levels.contains(&self.monitoring.log_level.as_str()) {
            return Err(AdmitError::InvalidConfigValueError {
                field: "monitoring.log_level".to_string(),
                value: self.monitoring.log_level.clone(),
                reason: format!("Valid levels: {}", levels.join(", ")),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = CanteenConfig::from_toml_str("").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.meals.lunch_start_hour, 11);
        assert_eq!(config.roster.default_tokens, TokenBalance::uniform(30));
        assert_eq!(config.gate_policy().operation_timeout, Duration::from_millis(2000));
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[canteen]
name = "North Hall Mess"
utc_offset_minutes = 330

[meals]
breakfast_start_hour = 7
lunch_start_hour = 12
dinner_start_hour = 19

[store]
operation_timeout_ms = 750
max_conflict_retries = 5

[roster]
default_tokens = { breakfast = 20, lunch = 25, dinner = 25 }

[monitoring]
log_level = "debug"
json_logs = true
"#;

        let config = CanteenConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.canteen.name, "North Hall Mess");
        assert_eq!(config.store.lock_timeout_ms, 5000);
        assert_eq!(config.gate_policy().max_conflict_retries, 5);
        assert_eq!(config.roster.default_tokens, TokenBalance::new(20, 25, 25));
        assert!(config.monitoring.json_logs);
        assert!(config.meal_schedule().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CANTEEN_TEST_NAME", "South Block Mess");

        let config =
            CanteenConfig::from_toml_str("[canteen]\nname = \"${CANTEEN_TEST_NAME}\"\n").unwrap();
        assert_eq!(config.canteen.name, "South Block Mess");

        std::env::remove_var("CANTEEN_TEST_NAME");
    }

    #[test]
    fn test_config_validation() {
        let config = CanteenConfig::from_toml_str(
            "[meals]\nbreakfast_start_hour = 12\nlunch_start_hour = 11\n",
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config =
            CanteenConfig::from_toml_str("[store]\noperation_timeout_ms = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[canteen]\nname = \"file-test\"\n")
            .unwrap();

        let config = CanteenConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.canteen.name, "file-test");
    }
}
