//! Environment variable validation with typo suggestions
//!
//! Invalid values never abort a run: the override is ignored and a
//! warning names the closest valid value.

use super::loader::ConfigWarning;

/// Validator for one enumerated environment variable
pub struct EnvVarValidator<'a> {
    var_name: &'a str,
    valid_values: &'a [&'a str],
}

impl<'a> EnvVarValidator<'a> {
    pub fn new(var_name: &'a str, valid_values: &'a [&'a str]) -> Self {
        Self {
            var_name,
            valid_values,
        }
    }

    /// Parse a value; an unparseable one becomes a warning.
    pub fn parse<T, F>(&self, value: &str, parser: F) -> Result<T, ConfigWarning>
    where
        F: Fn(&str) -> Option<T>,
    {
        parser(value.trim()).ok_or_else(|| ConfigWarning::InvalidEnv {
            var: self.var_name.to_string(),
            value: value.to_string(),
            suggestion: self.suggest(value),
            valid_values: self.valid_values.iter().map(|v| v.to_string()).collect(),
        })
    }

    /// Closest valid value within two edits.
    fn suggest(&self, value: &str) -> Option<String> {
        closest(&value.trim().to_lowercase(), self.valid_values)
    }
}

/// Closest candidate within two edits (exact matches excluded).
pub fn closest(input: &str, candidates: &[&str]) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &candidate in candidates {
        let dist = levenshtein(input, candidate);
        match best {
            None => best = Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => best = Some((candidate, dist)),
            _ => {}
        }
    }

    match best {
        Some((suggested, dist)) if dist <= 2 && dist > 0 => Some(suggested.to_string()),
        _ => None,
    }
}

/// Simple Levenshtein distance for typo detection
pub fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let a_len = a_bytes.len();
    let b_len = b_bytes.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row: Vec<usize> = vec![0; b_len + 1];

    for (i, a_char) in a_bytes.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, b_char) in b_bytes.iter().enumerate() {
            let cost = if a_char == b_char { 0 } else { 1 };
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("local", "local"), 0);
    }

    #[test]
    fn test_levenshtein_typos() {
        assert_eq!(levenshtein("jurnal", "journal"), 1);
        assert_eq!(levenshtein("allways", "always"), 1);
        assert_eq!(levenshtein("", "s3"), 2);
    }

    #[test]
    fn test_env_validator_valid_value() {
        let validator = EnvVarValidator::new("EDGEPUSH_TEST", &["foo", "bar"]);
        let result = validator.parse(" foo ", |s| (s == "foo").then_some(1));
        assert_eq!(result.unwrap(), 1);
    }

    #[test]
    fn test_env_validator_suggests_correction() {
        let validator = EnvVarValidator::new("EDGEPUSH_STORE_BACKEND", &["local", "memory", "s3"]);
        let warning = validator.parse("loacl", |_| None::<()>).unwrap_err();

        let msg = warning.to_string();
        assert!(msg.contains("EDGEPUSH_STORE_BACKEND"), "{}", msg);
        assert!(msg.contains("did you mean 'local'?"), "{}", msg);
        assert!(msg.contains("local, memory, s3"), "{}", msg);
    }

    #[test]
    fn test_env_validator_no_suggestion_for_distant_value() {
        let validator = EnvVarValidator::new("EDGEPUSH_COLOR", &["auto", "always", "never"]);
        let warning = validator
            .parse("something_completely_different", |_| None::<()>)
            .unwrap_err();
        assert!(!warning.to_string().contains("did you mean"));
    }
}
