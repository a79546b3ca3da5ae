use crate::config::toml_config::HousesConfig;
use crate::domain::model::{Projection, YearRange};
use crate::utils::error::Result;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "chicago-houses")]
#[command(about = "List houses inside Chicago community areas, optionally with assessor photos")]
pub struct CliConfig {
    #[arg(long, help = "TOML configuration file; flags below override it")]
    pub config: Option<String>,

    #[arg(long, value_delimiter = ',', help = "Community areas, e.g. \"Hyde Park,Kenwood\"")]
    pub areas: Vec<String>,

    #[arg(long, num_args = 2, value_names = ["FROM", "TO"], help = "Inclusive build year range")]
    pub year_range: Option<Vec<i32>>,

    #[arg(long, help = "Row cap for the records API")]
    pub limit: Option<usize>,

    #[arg(long, help = "Return every assessor row instead of one per address")]
    pub raw: bool,

    #[arg(long, help = "Download assessor photos for every result")]
    pub images: bool,

    #[arg(long, help = "Render map.png of the areas and results")]
    pub map: bool,

    #[arg(long, help = "Bundle outputs into a zip archive")]
    pub archive: bool,

    #[arg(long)]
    pub output_path: Option<String>,

    #[arg(long, help = "Emit JSON log lines")]
    pub json_logs: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// Load the file named by `--config` (or defaults) and apply the flags on top.
    pub fn into_config(self) -> Result<HousesConfig> {
        let mut config = match &self.config {
            Some(path) => HousesConfig::from_file(path)?,
            None => HousesConfig::default(),
        };

        if !self.areas.is_empty() {
            config.query.areas = self.areas;
        }
        if let Some(range) = self.year_range {
            if let [from, to] = range.as_slice() {
                config.query.year_range = Some(YearRange::new(*from, *to)?);
            }
        }
        if self.limit.is_some() {
            config.query.results_limit = self.limit;
        }
        if self.raw {
            config.query.projection = Projection::Raw;
        }
        if self.images {
            config.images.enabled = true;
        }
        if self.map {
            config.output.map = true;
        }
        if self.archive {
            config.output.archive = true;
        }
        if let Some(output_path) = self.output_path {
            config.output.output_path = output_path;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_build_config() {
        let cli = CliConfig::parse_from([
            "chicago-houses",
            "--areas",
            "Hyde Park,Kenwood",
            "--year-range",
            "1890",
            "1920",
            "--limit",
            "50",
            "--raw",
            "--map",
        ]);
        let config = cli.into_config().unwrap();

        assert_eq!(config.query.areas, vec!["Hyde Park", "Kenwood"]);
        assert_eq!(config.query.year_range, Some(YearRange::new(1890, 1920).unwrap()));
        assert_eq!(config.query.results_limit, Some(50));
        assert_eq!(config.query.projection, Projection::Raw);
        assert!(config.output.map);
        assert!(!config.images.enabled);
    }

    #[test]
    fn test_inverted_year_range_flag_is_error() {
        let cli = CliConfig::parse_from(["chicago-houses", "--areas", "Loop", "--year-range", "1920", "1890"]);
        assert!(cli.into_config().is_err());
    }
}
