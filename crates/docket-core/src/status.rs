//! Business-status classification.
//!
//! The remote service stores a matter's status as free text ("Case Filed",
//! "RFE Received", "Pending Interview", ...). Reporting needs semantic flags
//! instead, so [`classify`] maps a label onto a fixed-shape [`Classification`].
//!
//! Rules are evaluated in a fixed order into one accumulator. Later rules may
//! add orthogonal flags or gate on what earlier rules decided (the pending
//! rules only fire when nothing earlier marked the matter completed), so the
//! order of [`RULES`] is part of the contract.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Coarse category tag of a classified status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Closed,
    Filed,
    Approved,
    Denied,
    Drafting,
    Rfe,
    RfeFiled,
    Pending,
    #[default]
    Unknown,
}

impl StatusCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCategory::Closed => "closed",
            StatusCategory::Filed => "filed",
            StatusCategory::Approved => "approved",
            StatusCategory::Denied => "denied",
            StatusCategory::Drafting => "drafting",
            StatusCategory::Rfe => "rfe",
            StatusCategory::RfeFiled => "rfe_filed",
            StatusCategory::Pending => "pending",
            StatusCategory::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Semantic flags derived from a status label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Classification {
    pub is_filed: bool,
    pub is_approved: bool,
    pub is_denied: bool,
    pub is_rfe: bool,
    pub is_rfe_filed: bool,
    pub is_pending: bool,
    pub is_drafting: bool,
    pub is_closed: bool,
    pub is_active: bool,
    pub is_completed: bool,
    pub category: StatusCategory,
}

impl Classification {
    /// Marks the matter finished with the given category.
    fn complete(&mut self, category: StatusCategory) {
        self.is_completed = true;
        self.is_active = false;
        self.category = category;
    }

    /// True for the terminal outcomes that can never be overdue.
    pub fn is_resolved(&self) -> bool {
        self.is_closed || self.is_approved || self.is_denied
    }
}

/// One classification rule: a predicate over the normalized label and the
/// accumulator so far, and the change it applies when it holds.
struct Rule {
    matches: fn(&str, &Classification) -> bool,
    apply: fn(&mut Classification, &str),
}

fn contains_any(label: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| label.contains(k))
}

fn mentions_rfe(label: &str) -> bool {
    label.contains("request for evidence") || label.contains("rfe")
}

const RULES: &[Rule] = &[
    // Closed
    Rule {
        matches: |label, _| {
            label == "open"
                || contains_any(label, &["closed", "card received", "beneficiary arrived"])
        },
        apply: |c, _| {
            c.is_closed = true;
            c.complete(StatusCategory::Closed);
        },
    },
    // Filed
    Rule {
        matches: |label, _| {
            contains_any(
                label,
                &["filed", "case filed", "submitted", "request has been submitted"],
            )
        },
        apply: |c, _| {
            c.is_filed = true;
            c.complete(StatusCategory::Filed);
        },
    },
    // Approved
    Rule {
        matches: |label, _| {
            contains_any(
                label,
                &[
                    "approved",
                    "granted",
                    "case approved",
                    "visa granted",
                    "immigrant visa approved",
                    "certificate received",
                ],
            )
        },
        apply: |c, _| {
            c.is_approved = true;
            c.complete(StatusCategory::Approved);
        },
    },
    // Denied
    Rule {
        matches: |label, _| contains_any(label, &["denied", "case denied", "rejected"]),
        apply: |c, _| {
            c.is_denied = true;
            c.complete(StatusCategory::Denied);
        },
    },
    // Drafting; applied independently of earlier outcomes.
    Rule {
        matches: |label, _| {
            contains_any(
                label,
                &[
                    "drafting",
                    "preparing",
                    "prepare",
                    "document collection",
                    "case evaluation",
                ],
            )
        },
        apply: |c, _| {
            c.is_drafting = true;
            c.is_active = true;
            c.category = StatusCategory::Drafting;
        },
    },
    // Request for evidence: received keeps the matter active, a filed
    // response completes it.
    Rule {
        matches: |label, _| mentions_rfe(label),
        apply: |c, label| {
            if label.contains("received") {
                c.is_rfe = true;
                c.is_active = true;
                c.category = StatusCategory::Rfe;
            }
            if label.contains("filed") && label.contains("response") {
                c.is_rfe = true;
                c.is_rfe_filed = true;
                c.complete(StatusCategory::RfeFiled);
            }
        },
    },
    // Waiting states
    Rule {
        matches: |label, c| {
            !c.is_completed && contains_any(label, &["pending", "waiting", "scheduled"])
        },
        apply: |c, _| {
            c.is_pending = true;
            c.is_active = true;
            c.category = StatusCategory::Pending;
        },
    },
    // Government-side processing
    Rule {
        matches: |label, c| {
            !c.is_completed
                && contains_any(label, &["nvc processing", "interview", "hearing", "processing"])
        },
        apply: |c, _| {
            c.is_pending = true;
            c.is_active = true;
            c.category = StatusCategory::Pending;
        },
    },
];

/// Classifies a free-text status label.
///
/// Matching is case-insensitive on the trimmed label. A missing or
/// unrecognized label yields [`StatusCategory::Unknown`] with every flag
/// false.
///
/// # Examples
///
/// ```
/// use docket_core::status::{StatusCategory, classify};
///
/// let c = classify(Some("RFE Received"));
/// assert!(c.is_rfe && c.is_active && !c.is_completed);
///
/// let c = classify(Some("Case Approved"));
/// assert!(c.is_approved && c.is_completed && !c.is_active);
///
/// assert_eq!(classify(None).category, StatusCategory::Unknown);
/// ```
pub fn classify(label: Option<&str>) -> Classification {
    let mut classification = Classification::default();
    let Some(label) = label else {
        return classification;
    };

    let normalized = label.trim().to_lowercase();
    if normalized.is_empty() {
        return classification;
    }

    for rule in RULES {
        if (rule.matches)(&normalized, &classification) {
            (rule.apply)(&mut classification, &normalized);
        }
    }

    classification
}

/// Returns true when `last_updated` lies more than `stale_days` whole days
/// before `now`. A matter that was never updated is not considered stale.
pub fn is_stale_at(last_updated: Option<DateTime<Utc>>, stale_days: i64, now: DateTime<Utc>) -> bool {
    last_updated.is_some_and(|ts| (now - ts).num_days() > stale_days)
}

/// [`is_stale_at`] evaluated against the current time.
pub fn is_stale(last_updated: Option<DateTime<Utc>>, stale_days: i64) -> bool {
    is_stale_at(last_updated, stale_days, Utc::now())
}

/// Returns true when the deadline is strictly before `today` and the status
/// is not closed, approved or denied.
pub fn is_overdue_on(deadline: Option<NaiveDate>, status_label: Option<&str>, today: NaiveDate) -> bool {
    match deadline {
        Some(deadline) if deadline < today => !classify(status_label).is_resolved(),
        _ => false,
    }
}

/// [`is_overdue_on`] evaluated against today's UTC date.
pub fn is_overdue(deadline: Option<NaiveDate>, status_label: Option<&str>) -> bool {
    is_overdue_on(deadline, status_label, Utc::now().date_naive())
}
