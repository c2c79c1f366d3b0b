use crate::error::{Error, Result};

/// Default key expression prefix for all regbridge telemetry.
pub const KEY_PREFIX: &str = "regbridge/modbus";

/// Builder for constructing regbridge key expressions.
///
/// Key expressions follow the pattern:
/// `<prefix>/<source>/<group>/<metric>`
#[derive(Debug, Clone)]
pub struct KeyExprBuilder {
    prefix: String,
}

impl Default for KeyExprBuilder {
    fn default() -> Self {
        Self {
            prefix: KEY_PREFIX.to_string(),
        }
    }
}

impl KeyExprBuilder {
    /// Create a builder with a custom prefix.
    ///
    /// The prefix must be non-empty and free of wildcards.
    pub fn new(prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        let prefix = prefix.trim_end_matches('/').to_string();

        if prefix.is_empty() {
            return Err(Error::KeyExpr("prefix cannot be empty".to_string()));
        }
        if prefix.contains(['*', '$', '?', '#']) {
            return Err(Error::KeyExpr(format!(
                "prefix '{}' contains reserved characters",
                prefix
            )));
        }
        if prefix.split('/').any(str::is_empty) {
            return Err(Error::KeyExpr(format!(
                "prefix '{}' contains an empty chunk",
                prefix
            )));
        }

        Ok(Self { prefix })
    }

    /// The prefix all keys are built under.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Build a key expression for a measurement.
    ///
    /// Each of `source`, `group` and `metric` becomes exactly one chunk.
    ///
    /// # Example
    /// ```
    /// use regbridge_common::keyexpr::KeyExprBuilder;
    ///
    /// let builder = KeyExprBuilder::default();
    /// let key = builder.build("fx30", "datalogger", "Sp Cond(224)");
    /// assert_eq!(key, "regbridge/modbus/fx30/datalogger/Sp_Cond(224)");
    /// ```
    pub fn build(&self, source: &str, group: &str, metric: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.prefix,
            sanitize_chunk(source),
            sanitize_chunk(group),
            sanitize_chunk(metric)
        )
    }

    /// Build a wildcard key expression for all measurements from a source.
    ///
    /// # Example
    /// ```
    /// use regbridge_common::keyexpr::KeyExprBuilder;
    ///
    /// let builder = KeyExprBuilder::default();
    /// assert_eq!(builder.source_wildcard("fx30"), "regbridge/modbus/fx30/**");
    /// ```
    pub fn source_wildcard(&self, source: &str) -> String {
        format!("{}/{}/**", self.prefix, sanitize_chunk(source))
    }

    /// Build a wildcard key expression for everything under the prefix.
    pub fn all_wildcard(&self) -> String {
        format!("{}/**", self.prefix)
    }

    /// Build a key expression for bridge status.
    ///
    /// # Example
    /// ```
    /// use regbridge_common::keyexpr::KeyExprBuilder;
    ///
    /// let builder = KeyExprBuilder::default();
    /// assert_eq!(builder.status_key(), "regbridge/modbus/@/status");
    /// ```
    pub fn status_key(&self) -> String {
        format!("{}/@/status", self.prefix)
    }
}

/// Make a string usable as a single key expression chunk.
///
/// Separators, wildcards, reserved characters and whitespace become `_`.
/// An empty input becomes `_` so the chunk is never empty.
pub fn sanitize_chunk(chunk: &str) -> String {
    if chunk.is_empty() {
        return "_".to_string();
    }

    chunk
        .chars()
        .map(|c| match c {
            '/' | '*' | '$' | '?' | '#' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

/// Parse a key expression built under `prefix` into source, group and metric.
///
/// Returns `None` if the key does not live under the prefix or does not have
/// exactly three chunks after it.
pub fn parse_key_expr<'a>(prefix: &str, key: &'a str) -> Option<ParsedKeyExpr<'a>> {
    let prefix = prefix.trim_end_matches('/');
    let rest = key.strip_prefix(prefix)?.strip_prefix('/')?;

    let parts: Vec<&str> = rest.split('/').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) || parts[0] == "@" {
        return None;
    }

    Some(ParsedKeyExpr {
        source: parts[0],
        group: parts[1],
        metric: parts[2],
    })
}

/// Parsed components of a regbridge key expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKeyExpr<'a> {
    pub source: &'a str,
    pub group: &'a str,
    pub metric: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_builder() {
        let builder = KeyExprBuilder::new("plant/north/").unwrap();

        assert_eq!(builder.prefix(), "plant/north");
        assert_eq!(
            builder.build("fx30", "datalogger", "Temp(200)"),
            "plant/north/fx30/datalogger/Temp(200)"
        );
        assert_eq!(builder.source_wildcard("fx30"), "plant/north/fx30/**");
        assert_eq!(builder.all_wildcard(), "plant/north/**");
        assert_eq!(builder.status_key(), "plant/north/@/status");
    }

    #[test]
    fn test_invalid_prefix() {
        assert!(KeyExprBuilder::new("").is_err());
        assert!(KeyExprBuilder::new("a/*/b").is_err());
        assert!(KeyExprBuilder::new("a//b").is_err());
    }

    #[test]
    fn test_sanitize_chunk() {
        assert_eq!(sanitize_chunk("Sp Cond(224)"), "Sp_Cond(224)");
        assert_eq!(sanitize_chunk("a/b"), "a_b");
        assert_eq!(sanitize_chunk("DO(212)"), "DO(212)");
        assert_eq!(sanitize_chunk(""), "_");
    }

    #[test]
    fn test_parse_key_expr() {
        let parsed =
            parse_key_expr(KEY_PREFIX, "regbridge/modbus/fx30/datalogger/Level(236)").unwrap();

        assert_eq!(parsed.source, "fx30");
        assert_eq!(parsed.group, "datalogger");
        assert_eq!(parsed.metric, "Level(236)");
    }

    #[test]
    fn test_parse_invalid_key() {
        assert!(parse_key_expr(KEY_PREFIX, "invalid/key").is_none());
        assert!(parse_key_expr(KEY_PREFIX, "regbridge/modbus/fx30/datalogger").is_none());
        assert!(parse_key_expr(KEY_PREFIX, "regbridge/modbus/@/status/x").is_none());
        assert!(parse_key_expr(KEY_PREFIX, "regbridge/modbusx/a/b/c").is_none());
    }
}
