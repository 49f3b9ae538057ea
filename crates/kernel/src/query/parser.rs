//! Query-string token parsing.
//!
//! Turns raw `field:op=value`, `sort:field=direction`, `offset` and `limit`
//! query parameters into a validated [`QueryParams`]. Anything that does not
//! validate against the resource's [`AllowList`] is dropped and recorded as a
//! [`Rejection`]; parsing itself never fails.

use super::types::{
    AllowList, DEFAULT_LIMIT, DEFAULT_MAX_LIMIT, FilterExpression, FilterOperator, QueryParams,
    Rejection, SortDirection, SortExpression, TypedValue,
};

/// Prefix marking a sort parameter key.
const SORT_PREFIX: &str = "sort:";

/// Page-size policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// Limit used when none (or an invalid one) is supplied.
    pub default_limit: u64,

    /// Larger limits are clamped to this.
    pub max_limit: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

/// Result of parsing: the accepted parameters plus what was dropped.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub params: QueryParams,
    pub rejections: Vec<Rejection>,
}

/// Incremental builder fed one raw token at a time.
pub struct QueryParamsBuilder<'a> {
    allow: &'a AllowList,
    limits: PageLimits,
    params: QueryParams,
    rejections: Vec<Rejection>,
}

impl<'a> QueryParamsBuilder<'a> {
    pub fn new(allow: &'a AllowList, limits: PageLimits) -> Self {
        Self {
            allow,
            limits,
            params: QueryParams {
                limit: limits.default_limit,
                ..Default::default()
            },
            rejections: Vec::new(),
        }
    }

    /// Add a filter from a `field:op=value` token.
    pub fn add_filter(&mut self, token: &str) -> &mut Self {
        match self.parse_filter(token) {
            Ok(filter) => self.params.filters.push(filter),
            Err(rejection) => self.rejections.push(rejection),
        }
        self
    }

    /// Add a sort on `field` with a raw `asc`/`desc` direction.
    pub fn add_order_by(&mut self, field: &str, direction: &str) -> &mut Self {
        let Some(allowed) = self.allow.sort(field) else {
            self.rejections
                .push(Rejection::UnknownSortField(field.to_string()));
            return self;
        };

        let Some(direction_parsed) = SortDirection::parse(direction) else {
            self.rejections.push(Rejection::InvalidDirection {
                field: field.to_string(),
                direction: direction.to_string(),
            });
            return self;
        };

        // A field sorted twice would only repeat itself in ORDER BY.
        if !self.params.sorts.iter().any(|s| s.field == allowed.field) {
            self.params.sorts.push(SortExpression {
                field: allowed.field.to_string(),
                direction: direction_parsed,
            });
        }
        self
    }

    /// Set the offset from its raw query value.
    ///
    /// Offsets must fit a Postgres `BIGINT`.
    pub fn set_offset(&mut self, raw: &str) -> &mut Self {
        match parse_bigint(raw) {
            Some(offset) => self.params.offset = offset,
            None => self.rejections.push(Rejection::InvalidPagination {
                name: "offset".to_string(),
                value: raw.to_string(),
            }),
        }
        self
    }

    /// Set the limit from its raw query value, clamped to the maximum.
    pub fn set_limit(&mut self, raw: &str) -> &mut Self {
        match parse_bigint(raw).map(|limit| limit.min(self.limits.max_limit)) {
            Some(0) | None => self.rejections.push(Rejection::InvalidPagination {
                name: "limit".to_string(),
                value: raw.to_string(),
            }),
            Some(limit) => self.params.limit = limit,
        }
        self
    }

    /// Dispatch one decoded query-string pair.
    pub fn add_pair(&mut self, key: &str, value: &str) -> &mut Self {
        match key {
            "offset" => self.set_offset(value),
            "limit" => self.set_limit(value),
            _ => {
                if let Some(field) = key.strip_prefix(SORT_PREFIX) {
                    self.add_order_by(field, value)
                } else {
                    self.add_filter(&format!("{key}={value}"))
                }
            }
        }
    }

    pub fn finish(self) -> Parsed {
        Parsed {
            params: self.params,
            rejections: self.rejections,
        }
    }

    fn parse_filter(&self, token: &str) -> Result<FilterExpression, Rejection> {
        let malformed = || Rejection::MalformedToken(token.to_string());

        let (lhs, raw_value) = token.split_once('=').ok_or_else(malformed)?;
        let mut segments = lhs.split(':');
        let (Some(field), Some(op_name), None) = (segments.next(), segments.next(), segments.next())
        else {
            return Err(malformed());
        };
        if field.is_empty() || op_name.is_empty() {
            return Err(malformed());
        }

        let allowed = self
            .allow
            .filter(field)
            .ok_or_else(|| Rejection::UnknownField(field.to_string()))?;

        let operator = FilterOperator::parse(op_name)
            .ok_or_else(|| Rejection::UnknownOperator(op_name.to_string()))?;

        if !allowed.permits(operator) {
            return Err(Rejection::OperatorNotAllowed {
                field: field.to_string(),
                operator,
            });
        }

        let invalid = || Rejection::InvalidValue {
            field: field.to_string(),
            value: raw_value.to_string(),
        };

        let values: Vec<TypedValue> = if operator.is_list() {
            let items = split_list(raw_value);
            if items.is_empty() {
                return Err(invalid());
            }
            items
                .into_iter()
                .map(|item| allowed.kind.convert(item))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(invalid)?
        } else {
            vec![allowed.kind.convert(raw_value).ok_or_else(invalid)?]
        };

        Ok(FilterExpression {
            field: allowed.field.to_string(),
            operator,
            values,
        })
    }
}

/// Split an `in`/`nin` value. Accepts both `a,b,c` and `(a,b,c)`.
fn split_list(raw: &str) -> Vec<&str> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(trimmed);
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse decoded query-string pairs in order.
pub fn parse_query_pairs<K, V>(
    pairs: impl IntoIterator<Item = (K, V)>,
    allow: &AllowList,
    limits: PageLimits,
) -> Parsed
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut builder = QueryParamsBuilder::new(allow, limits);
    for (key, value) in pairs {
        builder.add_pair(key.as_ref(), value.as_ref());
    }
    builder.finish()
}

/// A non-negative pagination value that binds as `BIGINT`.
fn parse_bigint(raw: &str) -> Option<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|value| i64::try_from(*value).is_ok())
}
