use chrono::{DateTime, Duration, Utc};
use nh_core::{Candidate, RejectReason, Result};
use regex::{Regex, RegexBuilder};

pub const MIN_CONTENT_CHARS: usize = 100;
pub const MIN_TITLE_CHARS: usize = 10;

/// Phrases that mark promotional or boilerplate pages.
pub const DEFAULT_SPAM_PATTERNS: &[&str] = &[
    r"click here to (?:subscribe|sign up|download)",
    r"sponsored content",
    r"advertisement feature",
    r"buy now",
    r"limited time offer",
    r"promo code",
    r"sign up for our newsletter",
    r"^\s*https?://\S+\s*$",
];

#[derive(Debug, Clone)]
pub struct Validator {
    pub min_content_chars: usize,
    /// `None` when the site does not enforce a title length
    pub min_title_chars: Option<usize>,
    pub recency_window: Duration,
    spam: Vec<Regex>,
}

impl Validator {
    pub fn new(recency_window: Duration, min_title_chars: Option<usize>, spam_patterns: &[&str]) -> Result<Self> {
        let spam = spam_patterns
            .iter()
            .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            min_content_chars: MIN_CONTENT_CHARS,
            min_title_chars,
            recency_window,
            spam,
        })
    }

    pub fn with_defaults(recency_window: Duration) -> Result<Self> {
        Self::new(recency_window, Some(MIN_TITLE_CHARS), DEFAULT_SPAM_PATTERNS)
    }

    pub fn validate(&self, candidate: &Candidate) -> std::result::Result<(), RejectReason> {
        self.validate_at(candidate, Utc::now())
    }

    /// All rules must pass; the first failing one is reported.
    pub fn validate_at(&self, candidate: &Candidate, now: DateTime<Utc>) -> std::result::Result<(), RejectReason> {
        let title = candidate.title.trim();
        let content = candidate.content.trim();

        if title.is_empty() {
            return Err(RejectReason::MissingTitle);
        }
        if content.is_empty() {
            return Err(RejectReason::MissingContent);
        }

        let content_len = content.chars().count();
        if content_len < self.min_content_chars {
            return Err(RejectReason::ContentTooShort {
                len: content_len,
                min: self.min_content_chars,
            });
        }
        if let Some(min) = self.min_title_chars {
            let title_len = title.chars().count();
            if title_len < min {
                return Err(RejectReason::TitleTooShort { len: title_len, min });
            }
        }

        let title = title.to_lowercase();
        let content = content.to_lowercase();
        if let Some(pattern) = self
            .spam
            .iter()
            .find(|re| re.is_match(&title) || re.is_match(&content))
        {
            return Err(RejectReason::Spam(pattern.as_str().to_string()));
        }

        let Some(published) = candidate.published_at else {
            return Err(RejectReason::MissingDate);
        };
        let cutoff = now - self.recency_window;
        if published < cutoff {
            return Err(RejectReason::TooOld {
                published: published.to_rfc3339(),
                cutoff: cutoff.to_rfc3339(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn candidate(content_len: usize, published_at: Option<DateTime<Utc>>) -> Candidate {
        Candidate {
            url: "https://news.test/a".into(),
            title: "A perfectly fine headline".into(),
            content: "a".repeat(content_len),
            published_at,
        }
    }

    fn validator() -> Validator {
        Validator::with_defaults(Duration::hours(48)).unwrap()
    }

    #[test]
    fn test_content_length_boundary() {
        let v = validator();
        assert_eq!(
            v.validate_at(&candidate(99, Some(now())), now()),
            Err(RejectReason::ContentTooShort { len: 99, min: 100 })
        );
        assert_eq!(v.validate_at(&candidate(100, Some(now())), now()), Ok(()));
    }

    #[test]
    fn test_title_length_boundary() {
        let v = validator();
        let mut c = candidate(150, Some(now()));
        c.title = "Ninechars".into();
        assert_eq!(
            v.validate_at(&c, now()),
            Err(RejectReason::TitleTooShort { len: 9, min: 10 })
        );
        c.title = "Tenletters".into();
        assert_eq!(v.validate_at(&c, now()), Ok(()));
    }

    #[test]
    fn test_recency_boundary() {
        let v = validator();
        let cutoff = now() - Duration::hours(48);
        assert_eq!(v.validate_at(&candidate(150, Some(cutoff)), now()), Ok(()));

        let too_old = cutoff - Duration::microseconds(1);
        assert!(matches!(
            v.validate_at(&candidate(150, Some(too_old)), now()),
            Err(RejectReason::TooOld { .. })
        ));
    }

    #[test]
    fn test_missing_fields() {
        let v = validator();
        assert_eq!(
            v.validate_at(&candidate(150, None), now()),
            Err(RejectReason::MissingDate)
        );
        let mut no_title = candidate(150, Some(now()));
        no_title.title = "   ".into();
        assert_eq!(v.validate_at(&no_title, now()), Err(RejectReason::MissingTitle));
    }

    #[test]
    fn test_title_length_only_when_enforced() {
        let mut short_title = candidate(150, Some(now()));
        short_title.title = "Short".into();
        assert!(matches!(
            validator().validate_at(&short_title, now()),
            Err(RejectReason::TitleTooShort { len: 5, min: 10 })
        ));

        let lenient = Validator::new(Duration::hours(48), None, DEFAULT_SPAM_PATTERNS).unwrap();
        assert_eq!(lenient.validate_at(&short_title, now()), Ok(()));
    }

    #[test]
    fn test_spam_is_case_insensitive() {
        let mut spam = candidate(150, Some(now()));
        spam.content = format!("{} Use PROMO CODE SAVE20 today", "word ".repeat(30));
        assert!(matches!(
            validator().validate_at(&spam, now()),
            Err(RejectReason::Spam(_))
        ));
    }
}
