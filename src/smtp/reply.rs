use std::fmt;

/// A complete, possibly multi-line, SMTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl SmtpReply {
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_positive_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }

    pub fn message(&self) -> String {
        self.lines.join(" ")
    }

    /// Whether an EHLO reply advertises `cap` (case-insensitive keyword match).
    pub fn has_capability(&self, cap: &str) -> bool {
        self.capability_params(cap).is_some()
    }

    /// Parameters following an advertised EHLO keyword, e.g. the mechanisms of
    /// `AUTH PLAIN LOGIN`. The first line is the server greeting and is skipped.
    pub fn capability_params(&self, cap: &str) -> Option<Vec<&str>> {
        self.lines.iter().skip(1).find_map(|line| {
            let mut tokens = line.split_whitespace();
            let keyword = tokens.next()?;
            keyword
                .eq_ignore_ascii_case(cap)
                .then(|| tokens.collect())
        })
    }
}

impl fmt::Display for SmtpReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message())
    }
}
