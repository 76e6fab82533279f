use crate::domain::model::MealSlot;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, Validate};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "canteen-attendance")]
#[command(about = "Admit students to canteen meals and keep their token balances")]
pub struct CliConfig {
    /// Path to TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<String>,

    /// Roster CSV loaded into the record store at startup
    #[arg(long)]
    pub roster: String,

    /// Captured labels to admit, in order (comma separated or repeated)
    #[arg(long, value_delimiter = ',')]
    pub label: Vec<String>,

    /// Meal slot override; otherwise derived from the local time of day
    #[arg(long)]
    pub meal: Option<MealSlot>,

    /// Print outcomes as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Print today's attendance summary after processing captures
    #[arg(long)]
    pub summary: bool,

    /// Queue a reminder for students who missed this meal today
    #[arg(long)]
    pub notify_missed: Option<MealSlot>,

    /// Write the updated roster to this CSV path
    #[arg(long)]
    pub export: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("roster", &self.roster)?;
        if let Some(config) = &self.config {
            validate_path("config", config)?;
        }
        if let Some(export) = &self.export {
            validate_path("export", export)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels_and_meal() {
        let cli = CliConfig::parse_from([
            "canteen-attendance",
            "--roster",
            "students.csv",
            "--label",
            "CS2021001,CS2021002",
            "--label",
            "ME2022004",
            "--meal",
            "lunch",
            "--notify-missed",
            "breakfast",
        ]);
        assert_eq!(cli.label, vec!["CS2021001", "CS2021002", "ME2022004"]);
        assert_eq!(cli.meal, Some(MealSlot::Lunch));
        assert_eq!(cli.notify_missed, Some(MealSlot::Breakfast));
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_meal() {
        let parsed = CliConfig::try_parse_from([
            "canteen-attendance",
            "--roster",
            "students.csv",
            "--meal",
            "supper",
        ]);
        assert!(parsed.is_err());
    }
}
