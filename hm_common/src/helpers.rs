use std::str::FromStr;

/// Interprets an on/off setting. Unset or unrecognised values give `default`.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    value
        .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

/// Parses a setting that must be strictly greater than zero, such as a count or a number of seconds.
pub fn parse_positive<T>(value: &str) -> Result<T, String>
where
    T: FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let v = value.trim().parse::<T>().map_err(|e| format!("'{value}' is not valid. {e}"))?;
    if v > T::default() {
        Ok(v)
    } else {
        Err(format!("'{value}' must be greater than zero"))
    }
}
