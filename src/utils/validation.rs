use crate::domain::model::YearRange;
use crate::utils::error::{HousesError, Result};
use std::collections::HashSet;
use url::Url;

/// 最早可查的建造年份
pub const EARLIEST_BUILD_YEAR: i32 = 1800;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> HousesError {
    HousesError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Remote data endpoints must be absolute http(s) URLs with a host.
pub fn validate_endpoint(field: &str, endpoint: &str) -> Result<()> {
    let url = Url::parse(endpoint).map_err(|e| invalid(field, endpoint, format!("Invalid URL format: {}", e)))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(()),
        "http" | "https" => Err(invalid(field, endpoint, "URL has no host")),
        scheme => Err(invalid(field, endpoint, format!("Unsupported URL scheme: {}", scheme))),
    }
}

/// Area names compare case-insensitively, so "Loop" and "LOOP " are the same area.
pub fn validate_area_names(field: &str, names: &[String]) -> Result<()> {
    if names.is_empty() {
        return Err(HousesError::MissingConfigError {
            field: field.to_string(),
        });
    }

    let mut seen = HashSet::new();
    for name in names {
        let normalized = name.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(invalid(field, name, "Area name cannot be blank"));
        }
        if !seen.insert(normalized) {
            return Err(invalid(field, name, "Area listed more than once"));
        }
    }
    Ok(())
}

pub fn validate_year_range(field: &str, range: YearRange, current_year: i32) -> Result<()> {
    if range.min() < EARLIEST_BUILD_YEAR || range.max() > current_year {
        return Err(invalid(
            field,
            format!("[{}, {}]", range.min(), range.max()),
            format!("Years must lie within {}..={}", EARLIEST_BUILD_YEAR, current_year),
        ));
    }
    Ok(())
}

pub fn validate_delay_range(field: &str, min_seconds: f64, max_seconds: f64) -> Result<()> {
    if !(min_seconds >= 0.0 && max_seconds >= min_seconds && max_seconds.is_finite()) {
        return Err(invalid(
            field,
            format!("{}..{}", min_seconds, max_seconds),
            "Delays must be non-negative with min <= max",
        ));
    }
    Ok(())
}

pub fn validate_at_least(field: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(invalid(field, value, format!("Value must be at least {}", min_value)));
    }
    Ok(())
}

pub fn validate_within<T: PartialOrd + std::fmt::Display + Copy>(
    field: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(field, value, format!("Value must be between {} and {}", min, max)));
    }
    Ok(())
}

pub fn validate_path(field: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(invalid(field, path, "Path cannot be empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field, path, "Path contains null bytes"));
    }
    Ok(())
}

pub fn validate_formats(field: &str, formats: &[String], supported: &[&str]) -> Result<()> {
    match formats.iter().find(|f| !supported.contains(&f.as_str())) {
        Some(format) => Err(invalid(
            field,
            format,
            format!("Unsupported format. Valid formats: {}", supported.join(", ")),
        )),
        None => Ok(()),
    }
}

pub fn validate_field_name(field: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(invalid(field, name, "Property name cannot be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_validate_endpoint() {
        assert!(validate_endpoint("source.records_endpoint", "https://datacatalog.cookcountyil.gov/resource/x.json").is_ok());
        assert!(validate_endpoint("source.records_endpoint", "http://127.0.0.1:8080/rows").is_ok());
        assert!(validate_endpoint("source.records_endpoint", "").is_err());
        assert!(validate_endpoint("source.records_endpoint", "ftp://example.com").is_err());
        assert!(validate_endpoint("source.records_endpoint", "http:/").is_err());
    }

    #[test]
    fn test_validate_area_names() {
        assert!(validate_area_names("query.areas", &names(&["Hyde Park", "Kenwood"])).is_ok());
        assert!(matches!(
            validate_area_names("query.areas", &[]),
            Err(HousesError::MissingConfigError { .. })
        ));
        assert!(validate_area_names("query.areas", &names(&["Loop", "  "])).is_err());
        assert!(validate_area_names("query.areas", &names(&["Loop", "LOOP "])).is_err());
    }

    #[test]
    fn test_validate_year_range() {
        let range = YearRange::new(1890, 1920).unwrap();
        assert!(validate_year_range("query.year_range", range, 2026).is_ok());
        assert!(validate_year_range("query.year_range", YearRange::new(1700, 1900).unwrap(), 2026).is_err());
        assert!(validate_year_range("query.year_range", YearRange::new(1900, 2030).unwrap(), 2026).is_err());
    }

    #[test]
    fn test_validate_delay_range() {
        assert!(validate_delay_range("images.delay", 5.0, 10.0).is_ok());
        assert!(validate_delay_range("images.delay", 0.0, 0.0).is_ok());
        assert!(validate_delay_range("images.delay", -1.0, 2.0).is_err());
        assert!(validate_delay_range("images.delay", 3.0, 2.0).is_err());
        assert!(validate_delay_range("images.delay", 1.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_formats() {
        let supported = ["csv", "geojson"];
        assert!(validate_formats("output.formats", &names(&["csv"]), &supported).is_ok());
        let err = validate_formats("output.formats", &names(&["csv", "xlsx"]), &supported).unwrap_err();
        assert!(err.to_string().contains("xlsx"));
    }

    #[test]
    fn test_numeric_bounds() {
        assert!(validate_at_least("query.results_limit", 5, 1).is_ok());
        assert!(validate_at_least("query.results_limit", 0, 1).is_err());
        assert!(validate_within("output.map_size", 800, 16, 8192).is_ok());
        assert!(validate_within("output.map_size", 8, 16, 8192).is_err());
    }
}
