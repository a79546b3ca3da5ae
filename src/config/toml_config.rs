use crate::adapters::http::{ASSESSOR_RECORDS_ENDPOINT, CITY_BOUNDARIES_ENDPOINT};
use crate::domain::model::{Projection, YearRange};
use crate::images::{
    DelayPolicy, ImageEndpoint, DEFAULT_IMAGE_BASE_URL, DEFAULT_IMAGE_EXTENSION,
    DEFAULT_IMAGE_SUFFIX,
};
use crate::spatial::boundary::DEFAULT_AREA_NAME_FIELD;
use crate::spatial::query::{HouseQuery, DEFAULT_REFERENCE_YEAR};
use crate::utils::error::{HousesError, Result};
use crate::utils::validation::{self, Validate};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HousesConfig {
    pub query: QueryConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub areas: Vec<String>,
    pub year_range: Option<YearRange>,
    #[serde(default = "default_results_limit")]
    pub results_limit: Option<usize>,
    #[serde(default)]
    pub projection: Projection,
    #[serde(default = "default_reference_year")]
    pub reference_year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_boundaries_endpoint")]
    pub boundaries_endpoint: String,
    #[serde(default = "default_records_endpoint")]
    pub records_endpoint: String,
    #[serde(default = "default_area_name_field")]
    pub area_name_field: String,
    pub app_token: Option<String>,
    #[serde(default = "default_source_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_image_base_url")]
    pub base_url: String,
    #[serde(default = "default_image_suffix")]
    pub suffix: String,
    #[serde(default = "default_image_extension")]
    pub extension: String,
    #[serde(default = "default_image_dir")]
    pub output_dir: String,
    #[serde(default = "default_image_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_min_delay")]
    pub min_delay_seconds: f64,
    #[serde(default = "default_max_delay")]
    pub max_delay_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub output_path: String,
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
    #[serde(default)]
    pub map: bool,
    #[serde(default = "default_map_size")]
    pub map_size: u32,
    #[serde(default)]
    pub archive: bool,
}

fn default_results_limit() -> Option<usize> {
    Some(100_000)
}
fn default_reference_year() -> i32 {
    DEFAULT_REFERENCE_YEAR
}
fn default_boundaries_endpoint() -> String {
    CITY_BOUNDARIES_ENDPOINT.to_string()
}
fn default_records_endpoint() -> String {
    ASSESSOR_RECORDS_ENDPOINT.to_string()
}
fn default_area_name_field() -> String {
    DEFAULT_AREA_NAME_FIELD.to_string()
}
fn default_source_timeout() -> u64 {
    120
}
fn default_image_base_url() -> String {
    DEFAULT_IMAGE_BASE_URL.to_string()
}
fn default_image_suffix() -> String {
    DEFAULT_IMAGE_SUFFIX.to_string()
}
fn default_image_extension() -> String {
    DEFAULT_IMAGE_EXTENSION.to_string()
}
fn default_image_dir() -> String {
    "img".to_string()
}
fn default_image_timeout() -> u64 {
    120
}
fn default_min_delay() -> f64 {
    5.0
}
fn default_max_delay() -> f64 {
    10.0
}
fn default_output_path() -> String {
    "./output".to_string()
}
fn default_formats() -> Vec<String> {
    vec!["csv".to_string(), "geojson".to_string()]
}
fn default_map_size() -> u32 {
    1000
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            areas: Vec::new(),
            year_range: None,
            results_limit: default_results_limit(),
            projection: Projection::default(),
            reference_year: default_reference_year(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            boundaries_endpoint: default_boundaries_endpoint(),
            records_endpoint: default_records_endpoint(),
            area_name_field: default_area_name_field(),
            app_token: None,
            timeout_seconds: default_source_timeout(),
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_image_base_url(),
            suffix: default_image_suffix(),
            extension: default_image_extension(),
            output_dir: default_image_dir(),
            timeout_seconds: default_image_timeout(),
            min_delay_seconds: default_min_delay(),
            max_delay_seconds: default_max_delay(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            formats: default_formats(),
            map: false,
            map_size: default_map_size(),
            archive: false,
        }
    }
}

impl HousesConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(HousesError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| HousesError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SOCRATA_APP_TOKEN})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| HousesError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn house_query(&self) -> HouseQuery {
        HouseQuery {
            year_range: self.query.year_range,
            limit: self.query.results_limit,
            projection: self.query.projection,
        }
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.images.timeout_seconds)
    }

    pub fn delay_policy(&self) -> DelayPolicy {
        DelayPolicy::new(
            Duration::try_from_secs_f64(self.images.min_delay_seconds).unwrap_or_default(),
            Duration::try_from_secs_f64(self.images.max_delay_seconds).unwrap_or_default(),
        )
    }

    pub fn image_endpoint(&self) -> ImageEndpoint {
        ImageEndpoint {
            base_url: self.images.base_url.clone(),
            suffix: self.images.suffix.clone(),
            extension: self.images.extension.clone(),
        }
    }

    pub fn wants_format(&self, format: &str) -> bool {
        self.output.formats.iter().any(|f| f == format)
    }
}

pub const SUPPORTED_FORMATS: [&str; 2] = ["csv", "geojson"];

impl Validate for HousesConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_area_names("query.areas", &self.query.areas)?;
        if let Some(range) = self.query.year_range {
            validation::validate_year_range("query.year_range", range, chrono::Utc::now().year())?;
        }
        if let Some(limit) = self.query.results_limit {
            validation::validate_at_least("query.results_limit", limit as u64, 1)?;
        }

        validation::validate_endpoint("source.boundaries_endpoint", &self.source.boundaries_endpoint)?;
        validation::validate_endpoint("source.records_endpoint", &self.source.records_endpoint)?;
        validation::validate_field_name("source.area_name_field", &self.source.area_name_field)?;
        validation::validate_at_least("source.timeout_seconds", self.source.timeout_seconds, 1)?;

        if self.images.enabled {
            validation::validate_endpoint("images.base_url", &self.images.base_url)?;
            validation::validate_path("images.output_dir", &self.images.output_dir)?;
            validation::validate_at_least("images.timeout_seconds", self.images.timeout_seconds, 1)?;
            validation::validate_delay_range(
                "images.max_delay_seconds",
                self.images.min_delay_seconds,
                self.images.max_delay_seconds,
            )?;
        }

        validation::validate_path("output.output_path", &self.output.output_path)?;
        validation::validate_formats("output.formats", &self.output.formats, &SUPPORTED_FORMATS)?;
        if self.output.map {
            validation::validate_within("output.map_size", self.output.map_size, 16, 8192)?;
        }

        Ok(())
    }
}
