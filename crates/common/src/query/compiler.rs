//! Filter compiler
//!
//! Maps parsed query parameters onto a listing `Predicate` and an optional
//! `SortSpec`. Parameters that are absent, empty or fail numeric coercion
//! never produce a constraint.

use super::filter::{Constraint, Field, Predicate, SortField, SortSpec, Value};
use super::params::QueryParams;
use crate::config::{ListingsConfig, RelatedPolicy, StatusField};
use crate::listing::Listing;
use serde::Serialize;
use tracing::debug;

/// Sort orders accepted by the `sort` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortKey {
    Popular,
    Newest,
    LowestPrice,
    HighestPrice,
}

impl SortKey {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "popular" => Some(SortKey::Popular),
            "newest" => Some(SortKey::Newest),
            "lowestPrice" => Some(SortKey::LowestPrice),
            "highestPrice" => Some(SortKey::HighestPrice),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Popular => "popular",
            SortKey::Newest => "newest",
            SortKey::LowestPrice => "lowestPrice",
            SortKey::HighestPrice => "highestPrice",
        }
    }

    /// Store ordering for this key. Listings carry no popularity signal, so
    /// `Popular` keeps store order.
    pub fn spec(&self) -> Option<SortSpec> {
        match self {
            SortKey::Popular => None,
            SortKey::Newest => Some(SortSpec::descending(SortField::CreatedAt)),
            SortKey::LowestPrice => Some(SortSpec::ascending(SortField::Price)),
            SortKey::HighestPrice => Some(SortSpec::descending(SortField::Price)),
        }
    }
}

/// Output of the compiler
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub predicate: Predicate,
    pub sort: Option<SortSpec>,
    pub sort_key: Option<SortKey>,
}

const MAX_OFFSET: u64 = i64::MAX as u64;

/// Page window requested by the client, already clamped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    /// Read `page` and `limit`. Non-numeric or non-positive values fall back
    /// to the defaults; `limit` is capped at `max_limit`.
    pub fn from_params(params: &QueryParams, config: &ListingsConfig) -> Self {
        let page = params
            .scalar("page")
            .and_then(parse_positive)
            .unwrap_or(1);
        let limit = params
            .scalar("limit")
            .and_then(parse_positive)
            .unwrap_or(config.default_limit)
            .min(config.max_limit);

        Self { page, limit }
    }

    /// Rows to skip, capped at `i64::MAX` so the value binds as a SQL BIGINT
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit)
            .min(MAX_OFFSET)
    }
}

fn parse_positive(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().filter(|n| *n >= 1)
}

/// Translates query parameters into a predicate under the configured
/// policies
#[derive(Debug, Clone)]
pub struct FilterCompiler<'a> {
    config: &'a ListingsConfig,
}

impl<'a> FilterCompiler<'a> {
    pub fn new(config: &'a ListingsConfig) -> Self {
        Self { config }
    }

    pub fn compile(&self, params: &QueryParams) -> CompiledQuery {
        let mut predicate = Predicate::new();

        let status_field = match self.config.status_field {
            StatusField::Status => Field::Status,
            StatusField::SubPurpose => Field::SubPurposeId,
        };

        for (param, field) in [
            ("purpose", Field::PurposeId),
            ("status", status_field),
            ("type", Field::TypeId),
            ("subType", Field::SubTypeId),
        ] {
            if let Some(constraint) = text_constraint(params, param) {
                predicate.insert(field, constraint);
            }
        }

        if let Some(constraint) = self.location_constraint(params) {
            predicate.insert(Field::Location, constraint);
        }

        for (param, field) in [("bed", Field::Bed), ("bath", Field::Bath)] {
            if let Some(constraint) = numeric_constraint(params, param) {
                predicate.insert(field, constraint);
            }
        }

        if let Some(constraint) = range_constraint(params, "priceMin", "priceMax") {
            predicate.insert(Field::Price, constraint);
        }

        if let Some(constraint) = range_constraint(params, "areaMin", "areaMax") {
            predicate.insert(Field::Size, constraint);
        }

        if let Some(constraint) = text_constraint(params, "keyword") {
            predicate.insert(Field::Keywords, constraint);
        }

        if params.scalar("tour") == Some("video") {
            predicate.insert(Field::Video, Constraint::NotNull);
        }

        let pruned = predicate.prune();
        if !pruned.is_empty() {
            debug!(fields = ?pruned, "Dropped unresolved filter constraints");
        }

        let sort_key = params.scalar("sort").and_then(SortKey::parse);
        if sort_key == Some(SortKey::Popular) {
            debug!("Popular sort has no ranking signal, keeping store order");
        }

        CompiledQuery {
            predicate,
            sort: sort_key.and_then(|key| key.spec()),
            sort_key,
        }
    }

    fn location_constraint(&self, params: &QueryParams) -> Option<Constraint> {
        let values = params.values("location")?;
        let wildcard = values.iter().any(|value| {
            self.config
                .location_wildcards
                .iter()
                .any(|wildcard| wildcard.eq_ignore_ascii_case(value))
        });
        if wildcard {
            return None;
        }
        text_constraint(params, "location")
    }
}

/// Scalar → equality, list → membership. Membership lists are sorted and
/// deduplicated so the predicate does not depend on parameter order.
fn text_constraint(params: &QueryParams, param: &str) -> Option<Constraint> {
    let mut values = params.values(param)?;
    if params.get(param)?.is_list() {
        values.sort_unstable();
        values.dedup();
        Some(Constraint::In(values.into_iter().map(Value::from).collect()))
    } else {
        values.first().map(|value| Constraint::Eq(Value::from(*value)))
    }
}

/// Like `text_constraint`, with numeric coercion. Non-numeric list entries
/// are dropped; a non-numeric scalar yields an invalid constraint that
/// `Predicate::prune` removes.
fn numeric_constraint(params: &QueryParams, param: &str) -> Option<Constraint> {
    let values = params.values(param)?;
    if params.get(param)?.is_list() {
        let mut numbers: Vec<f64> = values
            .into_iter()
            .map(parse_number)
            .filter(|number| number.is_finite())
            .collect();
        numbers.sort_by(f64::total_cmp);
        numbers.dedup();
        Some(Constraint::In(numbers.into_iter().map(Value::Number).collect()))
    } else {
        values.first().map(|value| Constraint::Eq(coerce_number(value)))
    }
}

/// Both bounds must be present; either failing coercion invalidates the range
fn range_constraint(params: &QueryParams, min_param: &str, max_param: &str) -> Option<Constraint> {
    let min = params.scalar(min_param)?;
    let max = params.scalar(max_param)?;
    Some(Constraint::Range {
        min: parse_number(min),
        max: parse_number(max),
    })
}

fn coerce_number(value: &str) -> Value {
    Value::Number(parse_number(value))
}

fn parse_number(value: &str) -> f64 {
    value.trim().parse::<f64>().unwrap_or(f64::NAN)
}

impl RelatedPolicy {
    /// Predicate selecting listings related to `listing`, never including it
    pub fn predicate_for(&self, listing: &Listing) -> Predicate {
        let mut predicate = Predicate::new();
        predicate.insert(Field::Id, Constraint::Ne(Value::Id(listing.id)));

        if self.match_type {
            predicate.insert(Field::TypeId, Constraint::Eq(listing.property_type.id.as_str().into()));
        }
        if self.match_sub_type {
            predicate.insert(Field::SubTypeId, Constraint::Eq(listing.sub_type.id.as_str().into()));
        }
        if self.match_location {
            predicate.insert(Field::Location, Constraint::Eq(listing.address.location.as_str().into()));
        }
        if self.match_purpose {
            predicate.insert(Field::PurposeId, Constraint::Eq(listing.purpose.purpose.id.as_str().into()));
        }

        predicate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;

    fn compile(query: &str) -> CompiledQuery {
        let config = ListingsConfig::default();
        FilterCompiler::new(&config).compile(&QueryParams::parse(Some(query)))
    }

    #[test]
    fn test_no_params_no_constraints() {
        let compiled = compile("");
        assert!(compiled.predicate.is_empty());
        assert_eq!(compiled.sort, None);
    }

    #[test]
    fn test_unknown_params_are_ignored() {
        let compiled = compile("utm_source=ad&page=3&limit=5&foo[]=bar");
        assert!(compiled.predicate.is_empty());
    }

    #[test]
    fn test_only_supplied_fields_are_constrained() {
        let compiled = compile("purpose=sale&type=residential&bed=3");
        assert_eq!(
            compiled.predicate.fields(),
            vec![Field::PurposeId, Field::TypeId, Field::Bed]
        );
        assert_eq!(
            compiled.predicate.get(Field::Bed),
            Some(&Constraint::Eq(Value::Number(3.0)))
        );
    }

    #[test]
    fn test_price_range_requires_both_bounds() {
        assert!(!compile("priceMin=100").predicate.contains(Field::Price));
        assert!(!compile("priceMax=100").predicate.contains(Field::Price));
        assert!(!compile("priceMin=abc&priceMax=100").predicate.contains(Field::Price));
        assert_eq!(
            compile("priceMin=100&priceMax=500").predicate.get(Field::Price),
            Some(&Constraint::Range { min: 100.0, max: 500.0 })
        );
    }

    #[test]
    fn test_area_range_requires_both_bounds() {
        assert!(!compile("areaMin=800").predicate.contains(Field::Size));
        assert!(!compile("areaMin=800&areaMax=").predicate.contains(Field::Size));
        assert_eq!(
            compile("areaMin=800&areaMax=1200").predicate.get(Field::Size),
            Some(&Constraint::Range { min: 800.0, max: 1200.0 })
        );
    }

    #[test]
    fn test_numeric_coercion_rejects_non_numbers() {
        assert!(!compile("bed=three").predicate.contains(Field::Bed));
        assert!(!compile("bath[]=x&bath[]=y").predicate.contains(Field::Bath));
        assert_eq!(
            compile("bed=2&bed=x&bed=4").predicate.get(Field::Bed),
            Some(&Constraint::In(vec![Value::Number(2.0), Value::Number(4.0)]))
        );
    }

    #[test]
    fn test_location_and_keyword_accept_both_forms() {
        assert_eq!(
            compile("location=Gulshan").predicate.get(Field::Location),
            Some(&Constraint::Eq("Gulshan".into()))
        );
        assert_eq!(
            compile("location[]=Gulshan&location[]=Banani").predicate.get(Field::Location),
            Some(&Constraint::In(vec!["Banani".into(), "Gulshan".into()]))
        );
        assert_eq!(
            compile("keyword=lake").predicate.get(Field::Keywords),
            Some(&Constraint::Eq("lake".into()))
        );
        assert_eq!(
            compile("keyword=lake&keyword=gym").predicate.get(Field::Keywords),
            Some(&Constraint::In(vec!["gym".into(), "lake".into()]))
        );
    }

    #[test]
    fn test_tour_video_only() {
        assert_eq!(
            compile("tour=video").predicate.get(Field::Video),
            Some(&Constraint::NotNull)
        );
        assert!(!compile("tour=virtual").predicate.contains(Field::Video));
        assert!(!compile("").predicate.contains(Field::Video));
    }

    #[test]
    fn test_status_policy() {
        assert!(compile("status=ready").predicate.contains(Field::Status));

        let config = ListingsConfig {
            status_field: StatusField::SubPurpose,
            ..ListingsConfig::default()
        };
        let compiled = FilterCompiler::new(&config).compile(&QueryParams::parse(Some("status=ready")));
        assert!(!compiled.predicate.contains(Field::Status));
        assert_eq!(
            compiled.predicate.get(Field::SubPurposeId),
            Some(&Constraint::Eq("ready".into()))
        );
    }

    #[test]
    fn test_location_wildcard_disables_filter() {
        let config = ListingsConfig {
            location_wildcards: vec!["Dhaka".to_string()],
            ..ListingsConfig::default()
        };
        let compiler = FilterCompiler::new(&config);
        assert!(!compiler
            .compile(&QueryParams::parse(Some("location=dhaka")))
            .predicate
            .contains(Field::Location));
        assert!(compiler
            .compile(&QueryParams::parse(Some("location=Gulshan")))
            .predicate
            .contains(Field::Location));
    }

    #[test]
    fn test_sort_keys() {
        assert_eq!(compile("sort=newest").sort, Some(SortSpec::descending(SortField::CreatedAt)));
        assert_eq!(compile("sort=lowestPrice").sort, Some(SortSpec::ascending(SortField::Price)));
        assert_eq!(compile("sort=highestPrice").sort, Some(SortSpec::descending(SortField::Price)));

        let popular = compile("sort=popular");
        assert_eq!(popular.sort, None);
        assert_eq!(popular.sort_key, Some(SortKey::Popular));

        let unknown = compile("sort=cheapest");
        assert_eq!(unknown.sort, None);
        assert_eq!(unknown.sort_key, None);
    }

    #[test]
    fn test_predicate_is_independent_of_parameter_order() {
        let mut pairs = vec![
            "purpose=rent",
            "status=ready",
            "location[]=Gulshan",
            "location[]=Banani",
            "type=commercial",
            "subType=office",
            "bath=2",
            "bed=4",
            "bed=1",
            "priceMin=1000",
            "priceMax=9000",
            "areaMin=100",
            "areaMax=400",
            "keyword=parking",
            "tour=video",
            "sort=newest",
        ];
        let expected = compile(&pairs.join("&"));
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            pairs.shuffle(&mut rng);
            assert_eq!(compile(&pairs.join("&")), expected);
        }
    }

    #[test]
    fn test_pagination_defaults_and_clamping() {
        let config = ListingsConfig::default();
        let page = |q: &str| Pagination::from_params(&QueryParams::parse(Some(q)), &config);

        assert_eq!(page(""), Pagination { page: 1, limit: 20 });
        assert_eq!(page("page=2&limit=10"), Pagination { page: 2, limit: 10 });
        assert_eq!(page("page=abc&limit=xyz"), Pagination { page: 1, limit: 20 });
        assert_eq!(page("page=0&limit=0"), Pagination { page: 1, limit: 20 });
        assert_eq!(page("page=-3"), Pagination { page: 1, limit: 20 });
        assert_eq!(page("limit=5000"), Pagination { page: 1, limit: 100 });
        assert_eq!(page("page=3&limit=10").offset(), 20);
    }

    #[test]
    fn test_huge_page_offset_fits_bigint() {
        let config = ListingsConfig::default();
        let params = QueryParams::parse(Some("page=184467440737095516&limit=100"));
        let pagination = Pagination::from_params(&params, &config);

        assert_eq!(pagination.page, 184_467_440_737_095_516);
        assert_eq!(pagination.offset(), i64::MAX as u64);
        assert_eq!(Pagination { page: u64::MAX, limit: 1 }.offset(), i64::MAX as u64);
    }

    #[test]
    fn test_related_predicate_excludes_original() {
        let listing: Listing = serde_json::from_value(serde_json::json!({
            "id": "6f1c1a2e-8d7b-4e51-9a43-2f3f4b5c6d7e",
            "referenceNo": "BDP-1",
            "title": "Office floor",
            "purpose": {"purpose": {"id": "rent", "name": "Rent"}},
            "status": "ready",
            "address": {"location": "Motijheel"},
            "type": {"id": "commercial", "name": "Commercial"},
            "subType": {"id": "office", "name": "Office"},
            "bed": 0,
            "bath": 2,
            "price": 90000.0,
            "size": 2400.0,
            "createdAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        let predicate = RelatedPolicy::default().predicate_for(&listing);
        assert_eq!(
            predicate.fields(),
            vec![Field::Id, Field::TypeId, Field::SubTypeId]
        );
        assert_eq!(predicate.get(Field::Id), Some(&Constraint::Ne(Value::Id(listing.id))));

        let wide = RelatedPolicy {
            match_location: true,
            match_purpose: true,
            ..RelatedPolicy::default()
        };
        assert!(wide.predicate_for(&listing).contains(Field::Location));
        assert!(wide.predicate_for(&listing).contains(Field::PurposeId));
    }
}
