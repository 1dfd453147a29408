//! Build the OData query for the messages endpoint from search criteria.
//!
//! Every criterion is independent and optional; an absent field contributes
//! no clause. Clauses are AND'd in a fixed order so identical criteria
//! always produce a byte-identical `$filter` string:
//!
//! 1. date range
//! 2. free-text OR-group over subject/body
//! 3. exclusion terms
//! 4. sender address
//! 5. recipient address
//! 6. importance
//! 7. attachment flag
//! 8. minimum size
//! 9. maximum size

use chrono::{DateTime, Utc};
use clap::ValueEnum;

/// Fields requested per message. Everything the export needs, nothing more.
const SELECT_FIELDS: &str =
    "subject,body,receivedDateTime,sender,toRecipients,hasAttachments,attachments,importance,size";

/// Newest messages first.
const ORDER_BY: &str = "receivedDateTime desc";

/// Importance level as the API understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Importance {
    High,
    Normal,
    Low,
}

impl Importance {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

/// Optional, independent search criteria. Each `None`/empty field imposes
/// no constraint. When a date range is present, start ≤ end is the
/// caller's responsibility.
#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    /// Comma-separated free-text terms, OR'd across subject and body.
    pub terms: Option<String>,
    /// Terms that must appear in neither subject nor body.
    pub exclude_terms: Vec<String>,
    /// Inclusive received-time window.
    pub date_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Substring of the sender address.
    pub from_address: Option<String>,
    /// Substring matched against any entry of the recipient list.
    pub to_address: Option<String>,
    pub importance: Option<Importance>,
    pub has_attachments: Option<bool>,
    /// Minimum message size in bytes.
    pub min_size: Option<u64>,
    /// Maximum message size in bytes.
    pub max_size: Option<u64>,
}

/// The assembled query: filter expression plus the fixed ordering,
/// field-selection, and page-size directives. Built once per run,
/// immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Combined `$filter` expression, `None` when no criteria were given.
    pub filter: Option<String>,
    pub order_by: &'static str,
    pub select: &'static str,
    /// Page size for `$top`.
    pub top: usize,
}

impl Query {
    /// Query parameters for the first page request. Subsequent pages follow
    /// the continuation link verbatim and must not resend these.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("$select", self.select.to_string()),
            ("$orderby", self.order_by.to_string()),
            ("$top", self.top.to_string()),
        ];
        if let Some(filter) = &self.filter {
            params.push(("$filter", filter.clone()));
        }
        params
    }
}

/// Translate criteria into the query sent to the messages endpoint.
pub fn build_query(criteria: &SearchCriteria, page_size: usize) -> Query {
    let mut clauses: Vec<String> = Vec::new();

    if let Some((start, end)) = &criteria.date_range {
        clauses.push(format!(
            "receivedDateTime ge {} and receivedDateTime le {}",
            format_timestamp(start),
            format_timestamp(end)
        ));
    }

    let terms = split_terms(criteria.terms.as_deref().unwrap_or(""));
    if !terms.is_empty() {
        let group = terms
            .iter()
            .map(|term| {
                let t = escape_literal(term);
                format!("contains(subject,'{t}') or contains(body/content,'{t}')")
            })
            .collect::<Vec<_>>()
            .join(" or ");
        clauses.push(format!("({group})"));
    }

    for term in &criteria.exclude_terms {
        let term = term.trim();
        if term.is_empty() {
            continue;
        }
        let t = escape_literal(term);
        clauses.push(format!(
            "not contains(subject,'{t}') and not contains(body/content,'{t}')"
        ));
    }

    if let Some(addr) = nonempty(criteria.from_address.as_deref()) {
        clauses.push(format!(
            "contains(from/emailAddress/address,'{}')",
            escape_literal(addr)
        ));
    }

    if let Some(addr) = nonempty(criteria.to_address.as_deref()) {
        clauses.push(format!(
            "toRecipients/any(r:contains(r/emailAddress/address,'{}'))",
            escape_literal(addr)
        ));
    }

    if let Some(importance) = criteria.importance {
        clauses.push(format!("importance eq '{}'", importance.as_str()));
    }

    if let Some(flag) = criteria.has_attachments {
        clauses.push(format!("hasAttachments eq {flag}"));
    }

    if let Some(min) = criteria.min_size {
        clauses.push(format!("size ge {min}"));
    }

    if let Some(max) = criteria.max_size {
        clauses.push(format!("size le {max}"));
    }

    Query {
        filter: if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" and "))
        },
        order_by: ORDER_BY,
        select: SELECT_FIELDS,
        top: page_size,
    }
}

/// Split a comma-separated term list, trimming each and dropping empties.
fn split_terms(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Double embedded single quotes per OData string-literal rules, so a
/// quote inside a user term cannot truncate the expression.
fn escape_literal(term: &str) -> String {
    term.replace('\'', "''")
}

fn nonempty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Timestamps in the filter use second precision with a `Z` suffix.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).expect("valid ts").with_timezone(&Utc)
    }

    #[test]
    fn test_empty_criteria_has_no_filter() {
        let query = build_query(&SearchCriteria::default(), 50);
        assert_eq!(query.filter, None);
        assert_eq!(query.order_by, "receivedDateTime desc");
        assert_eq!(query.top, 50);
        assert!(query.select.contains("receivedDateTime"));
    }

    #[test]
    fn test_identical_criteria_are_deterministic() {
        let criteria = SearchCriteria {
            terms: Some("invoice, budget".into()),
            exclude_terms: vec!["spam".into()],
            date_range: Some((ts("2024-01-01T00:00:00Z"), ts("2024-06-30T23:59:59Z"))),
            from_address: Some("finance@".into()),
            to_address: Some("me@contoso.com".into()),
            importance: Some(Importance::High),
            has_attachments: Some(true),
            min_size: Some(1024),
            max_size: Some(1048576),
        };
        let a = build_query(&criteria, 50);
        let b = build_query(&criteria, 50);
        assert_eq!(a.filter, b.filter);
        assert_eq!(a.params(), b.params());
    }

    #[test]
    fn test_comma_terms_form_one_or_group() {
        let criteria = SearchCriteria {
            terms: Some("foo, bar".into()),
            has_attachments: Some(true),
            ..Default::default()
        };
        let filter = build_query(&criteria, 50).filter.expect("filter");
        assert!(filter.starts_with('('));
        assert!(filter.contains("contains(subject,'foo') or contains(body/content,'foo')"));
        assert!(filter.contains("contains(subject,'bar') or contains(body/content,'bar')"));
        // Single group: both terms inside the same parenthesized clause.
        let group = &filter[..filter.rfind(") and").expect("group close") + 1];
        assert!(group.contains("'foo'") && group.contains("'bar'"));
        assert!(filter.ends_with("and hasAttachments eq true"));
    }

    #[test]
    fn test_exclusion_terms_are_and_not() {
        let criteria = SearchCriteria {
            exclude_terms: vec!["newsletter".into(), " ".into()],
            ..Default::default()
        };
        let filter = build_query(&criteria, 50).filter.expect("filter");
        assert_eq!(
            filter,
            "not contains(subject,'newsletter') and not contains(body/content,'newsletter')"
        );
    }

    #[test]
    fn test_sender_and_recipient_clauses() {
        let criteria = SearchCriteria {
            from_address: Some("alice@contoso.com".into()),
            to_address: Some("bob".into()),
            ..Default::default()
        };
        let filter = build_query(&criteria, 50).filter.expect("filter");
        assert_eq!(
            filter,
            "contains(from/emailAddress/address,'alice@contoso.com') and \
             toRecipients/any(r:contains(r/emailAddress/address,'bob'))"
        );
    }

    #[test]
    fn test_date_range_clause_comes_first() {
        let criteria = SearchCriteria {
            terms: Some("report".into()),
            date_range: Some((ts("2024-01-01T00:00:00Z"), ts("2024-01-31T23:59:59Z"))),
            ..Default::default()
        };
        let filter = build_query(&criteria, 50).filter.expect("filter");
        assert!(filter.starts_with(
            "receivedDateTime ge 2024-01-01T00:00:00Z and receivedDateTime le 2024-01-31T23:59:59Z and "
        ));
    }

    #[test]
    fn test_size_and_importance_clauses() {
        let criteria = SearchCriteria {
            importance: Some(Importance::Low),
            min_size: Some(100),
            max_size: Some(2000),
            ..Default::default()
        };
        let filter = build_query(&criteria, 50).filter.expect("filter");
        assert_eq!(filter, "importance eq 'low' and size ge 100 and size le 2000");
    }

    #[test]
    fn test_quotes_in_terms_are_doubled() {
        let criteria = SearchCriteria {
            terms: Some("o'brien".into()),
            ..Default::default()
        };
        let filter = build_query(&criteria, 50).filter.expect("filter");
        assert!(filter.contains("contains(subject,'o''brien')"));
    }

    #[test]
    fn test_blank_terms_contribute_nothing() {
        let criteria = SearchCriteria {
            terms: Some(" , ,, ".into()),
            from_address: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(build_query(&criteria, 50).filter, None);
    }

    #[test]
    fn test_params_omit_filter_when_empty() {
        let query = build_query(&SearchCriteria::default(), 25);
        let params = query.params();
        assert_eq!(params.len(), 3);
        assert!(params.iter().any(|(k, v)| *k == "$top" && v == "25"));
        assert!(!params.iter().any(|(k, _)| *k == "$filter"));
    }

    #[test]
    fn test_params_include_filter_when_present() {
        let criteria = SearchCriteria {
            has_attachments: Some(false),
            ..Default::default()
        };
        let params = build_query(&criteria, 50).params();
        assert!(params
            .iter()
            .any(|(k, v)| *k == "$filter" && v == "hasAttachments eq false"));
    }
}
