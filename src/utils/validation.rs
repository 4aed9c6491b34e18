use crate::utils::error::{Result, SatLinkError};
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::fmt::Write;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(SatLinkError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(SatLinkError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: i64, min_value: i64) -> Result<()> {
    if value < min_value {
        return Err(SatLinkError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_file_extensions(
    field_name: &str,
    files: &[String],
    allowed_extensions: &[&str],
) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    for file in files {
        if let Some(extension) = std::path::Path::new(file)
            .extension()
            .and_then(|ext| ext.to_str())
        {
            if !allowed_set.contains(extension) {
                return Err(SatLinkError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: file.clone(),
                    reason: format!(
                        "Unsupported file extension: {}. Allowed extensions: {}",
                        extension,
                        allowed_extensions.join(", ")
                    ),
                });
            }
        } else {
            return Err(SatLinkError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: file.clone(),
                reason: "File has no extension or invalid filename".to_string(),
            });
        }
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SatLinkError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(SatLinkError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// Rejects strftime patterns that chrono cannot render for a naive timestamp,
/// including offset specifiers such as `%z` and `%Z`.
pub fn validate_datetime_format(field_name: &str, pattern: &str) -> Result<()> {
    validate_non_empty_string(field_name, pattern)?;
    let invalid = |reason: &str| SatLinkError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: pattern.to_string(),
        reason: reason.to_string(),
    };

    let items: Vec<Item> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(invalid("Not a valid strftime pattern"));
    }

    let mut sample = String::new();
    write!(
        sample,
        "{}",
        NaiveDateTime::default().format_with_items(items.iter())
    )
    .map_err(|_| invalid("Pattern needs a time zone, timestamps here have none"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("resolver.time_step_ms", 5, 1).is_ok());
        assert!(validate_positive_number("resolver.time_step_ms", 0, 1).is_err());
    }

    #[test]
    fn test_validate_file_extensions() {
        let files = vec!["results.zip".to_string(), "bundle.jar".to_string()];
        assert!(validate_file_extensions("output.archive.filename", &files, &["zip", "jar"]).is_ok());

        let invalid_files = vec!["results.tar".to_string()];
        assert!(
            validate_file_extensions("output.archive.filename", &invalid_files, &["zip"]).is_err()
        );
    }

    #[test]
    fn test_validate_datetime_format() {
        assert!(validate_datetime_format("input.date_time_format", "%-d %b %Y %H:%M:%S%.3f").is_ok());
        assert!(validate_datetime_format("input.date_time_format", "%Y-%m-%d %Q").is_err());
        assert!(validate_datetime_format("input.date_time_format", "  ").is_err());
    }

    #[test]
    fn test_validate_datetime_format_rejects_offsets() {
        for pattern in ["%Y-%m-%d %z", "%H:%M %:z", "%d %b %Y %Z"] {
            let err = validate_datetime_format("output.statistics_date_time_format", pattern)
                .unwrap_err();
            assert!(matches!(err, SatLinkError::InvalidConfigValueError { .. }), "{}", pattern);
        }
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("satellites.fleet_split", 50usize, 0, 10_000).is_ok());
        assert!(validate_range("transmit_ratio", 0i64, 1, 1024).is_err());
    }
}
