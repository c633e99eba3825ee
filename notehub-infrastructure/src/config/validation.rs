use anyhow::{anyhow, Result};

pub fn validate_millis(field: &str, value: u64, max: u64) -> Result<()> {
    if value == 0 {
        return Err(anyhow!("{} must be greater than 0", field));
    }
    if value > max {
        return Err(anyhow!("{} must be at most {}", field, max));
    }
    Ok(())
}

pub fn validate_log_format(value: &str) -> Result<()> {
    match value {
        "text" | "json" => Ok(()),
        other => Err(anyhow!("log_format must be 'text' or 'json', got '{}'", other)),
    }
}
