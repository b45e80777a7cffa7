use serde::{Deserialize, Serialize};

/// Unit used to measure batch budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeMetric {
    /// Unicode scalar values.
    #[default]
    Characters,
    /// Rough model-token estimate: one token per CJK ideograph plus 1.3 per latin word.
    EstimatedTokens,
}

impl SizeMetric {
    pub fn measure(&self, text: &str) -> usize {
        match self {
            SizeMetric::Characters => text.chars().count(),
            SizeMetric::EstimatedTokens => estimate_tokens(text),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeMetric::Characters => "characters",
            SizeMetric::EstimatedTokens => "tokens",
        }
    }
}

impl std::fmt::Display for SizeMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SizeMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "characters" | "chars" => Ok(SizeMetric::Characters),
            "tokens" | "estimated_tokens" => Ok(SizeMetric::EstimatedTokens),
            other => Err(format!(
                "unknown size metric '{}', expected 'characters' or 'tokens'",
                other
            )),
        }
    }
}

fn is_cjk_ideograph(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// CJK ideographs + floor(1.3 * latin words).
pub fn estimate_tokens(text: &str) -> usize {
    let mut ideographs = 0usize;
    let mut words = 0usize;
    let mut in_word = false;

    for c in text.chars() {
        if is_cjk_ideograph(c) {
            ideographs += 1;
        }
        if c.is_ascii_alphabetic() {
            if !in_word {
                words += 1;
            }
            in_word = true;
        } else {
            in_word = false;
        }
    }

    ideographs + words * 13 / 10
}
