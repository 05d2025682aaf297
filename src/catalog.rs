//! Product filtering and ordering.
//!
//! Filters are compiled to a SeaORM [`Condition`] and evaluated by the
//! database; ordering is applied to the fetched page in memory, so ties keep
//! storage order.

use std::cmp::Ordering;

use sea_orm::{
    ColumnTrait, Condition,
    sea_query::{Expr, extension::postgres::PgExpr},
};

use crate::{
    dto::products::FilterRequest,
    entity::products::Column,
    error::{AppError, AppResult},
    models::Product,
    routes::params::ProductQuery,
};

pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub search: Option<String>,
    pub brand: Option<String>,
    pub min_rating: Option<f64>,
    pub in_stock: bool,
    pub active_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    PriceLow,
    PriceHigh,
    Name,
    Rating,
    Newest,
}

impl SortKey {
    /// Unknown keys yield `None`, which leaves the listing in storage order.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "price-low" => Some(SortKey::PriceLow),
            "price-high" => Some(SortKey::PriceHigh),
            "name" => Some(SortKey::Name),
            "rating" => Some(SortKey::Rating),
            "newest" => Some(SortKey::Newest),
            _ => None,
        }
    }

    pub fn apply(self, products: &mut [Product]) {
        match self {
            SortKey::PriceLow => products.sort_by(|a, b| a.price.cmp(&b.price)),
            SortKey::PriceHigh => products.sort_by(|a, b| b.price.cmp(&a.price)),
            SortKey::Name => products.sort_by(|a, b| compare_names(&a.name, &b.name)),
            SortKey::Rating => products.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
            SortKey::Newest => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
    }
}

// Case-insensitive first, so "binding" sorts next to "Binding".
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

impl ProductFilter {
    pub fn from_query(query: &ProductQuery) -> AppResult<(Self, Option<SortKey>)> {
        let filter = Self {
            category: category(query.category.as_deref()),
            min_price: present(query.min_price.as_deref())
                .map(|raw| parse_price("minPrice", raw, Bound::Lower))
                .transpose()?,
            max_price: present(query.max_price.as_deref())
                .map(|raw| parse_price("maxPrice", raw, Bound::Upper))
                .transpose()?,
            search: present(query.search.as_deref()).map(str::to_owned),
            brand: present(query.brand.as_deref()).map(str::to_owned),
            min_rating: present(query.min_rating.as_deref())
                .map(|raw| parse_rating("minRating", raw))
                .transpose()?,
            in_stock: present(query.in_stock.as_deref())
                .map(|raw| parse_flag("inStock", raw))
                .transpose()?
                .unwrap_or(false),
            active_only: false,
        };
        filter.check_range()?;

        let sort = present(query.sort_by.as_deref()).and_then(SortKey::parse);
        Ok((filter, sort))
    }

    pub fn from_request(request: &FilterRequest) -> AppResult<Self> {
        let nonzero = |v: Option<f64>| v.filter(|v| *v != 0.0);
        let filter = Self {
            category: category(request.category.as_deref()),
            min_price: nonzero(request.min_price)
                .map(|v| price_bound("minPrice", v, Bound::Lower))
                .transpose()?,
            max_price: nonzero(request.max_price)
                .map(|v| price_bound("maxPrice", v, Bound::Upper))
                .transpose()?,
            brand: present(request.brand.as_deref()).map(str::to_owned),
            min_rating: nonzero(request.rating)
                .map(|v| rating_bound("rating", v))
                .transpose()?,
            active_only: true,
            ..Self::default()
        };
        filter.check_range()?;
        Ok(filter)
    }

    pub fn text_search(text: &str) -> Self {
        Self {
            search: present(Some(text)).map(str::to_owned),
            active_only: true,
            ..Self::default()
        }
    }

    fn check_range(&self) -> AppResult<()> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(AppError::InvalidArgument(
                    "minPrice must not exceed maxPrice".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn condition(&self) -> Condition {
        let mut condition = Condition::all();

        if let Some(category) = &self.category {
            condition = condition.add(Column::Category.eq(category.clone()));
        }
        if let Some(min_price) = self.min_price {
            condition = condition.add(Column::Price.gte(min_price));
        }
        if let Some(max_price) = self.max_price {
            condition = condition.add(Column::Price.lte(max_price));
        }
        if let Some(search) = &self.search {
            let pattern = contains_pattern(search);
            condition = condition.add(
                Condition::any()
                    .add(Expr::col(Column::Name).ilike(pattern.clone()))
                    .add(Expr::col(Column::Brand).ilike(pattern.clone()))
                    .add(Expr::col(Column::Description).ilike(pattern)),
            );
        }
        if let Some(brand) = &self.brand {
            condition = condition.add(Expr::col(Column::Brand).ilike(contains_pattern(brand)));
        }
        if let Some(min_rating) = self.min_rating {
            condition = condition.add(Column::Rating.gte(min_rating));
        }
        if self.in_stock {
            condition = condition.add(Column::Stock.gt(0));
        }
        if self.active_only {
            condition = condition.add(Column::IsActive.eq(true));
        }

        condition
    }
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn category(raw: Option<&str>) -> Option<String> {
    present(raw)
        .filter(|c| *c != ALL_CATEGORIES)
        .map(str::to_owned)
}

/// `%needle%` with LIKE wildcards in the needle matched literally.
pub fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Lower,
    Upper,
}

fn parse_number(name: &str, raw: &str) -> AppResult<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::InvalidArgument(format!("{name} must be a number, got '{raw}'")))
}

fn parse_price(name: &str, raw: &str, bound: Bound) -> AppResult<i64> {
    price_bound(name, parse_number(name, raw)?, bound)
}

// Prices are whole rupees: a fractional lower bound rounds up, an upper one down.
fn price_bound(name: &str, value: f64, bound: Bound) -> AppResult<i64> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::InvalidArgument(format!(
            "{name} must be a non-negative number"
        )));
    }
    let rounded = match bound {
        Bound::Lower => value.ceil(),
        Bound::Upper => value.floor(),
    };
    if rounded > i64::MAX as f64 {
        return Err(AppError::InvalidArgument(format!("{name} is too large")));
    }
    Ok(rounded as i64)
}

fn parse_rating(name: &str, raw: &str) -> AppResult<f64> {
    rating_bound(name, parse_number(name, raw)?)
}

fn rating_bound(name: &str, value: f64) -> AppResult<f64> {
    if !(0.0..=5.0).contains(&value) {
        return Err(AppError::InvalidArgument(format!(
            "{name} must be between 0 and 5"
        )));
    }
    Ok(value)
}

fn parse_flag(name: &str, raw: &str) -> AppResult<bool> {
    match raw {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(AppError::InvalidArgument(format!(
            "{name} must be true or false, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entity::Products,
        models::{Category, Specifications, Unit},
    };
    use chrono::{Duration, Utc};
    use sea_orm::{EntityTrait, QueryFilter, QueryTrait, sea_query::PostgresQueryBuilder};
    use uuid::Uuid;

    fn query() -> ProductQuery {
        ProductQuery::default()
    }

    fn sql(filter: &ProductFilter) -> String {
        Products::find()
            .filter(filter.condition())
            .into_query()
            .to_string(PostgresQueryBuilder)
    }

    fn product(name: &str, price: i64, rating: f64, age_days: i64) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            brand: "Sri Saravana Textile".to_string(),
            price,
            original_price: price + 40,
            images: vec![],
            category: Category::Tapes,
            description: String::new(),
            specifications: Specifications::default(),
            features: vec![],
            stock: 10,
            unit: Unit::Kg,
            minimum_order: 1,
            rating,
            reviews: vec![],
            is_active: true,
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    #[test]
    fn empty_query_has_no_constraints() {
        let (filter, sort) = ProductFilter::from_query(&query()).unwrap();
        assert_eq!(filter, ProductFilter::default());
        assert_eq!(sort, None);
        assert!(!sql(&filter).contains("WHERE"));
    }

    #[test]
    fn all_category_is_skipped() {
        let (filter, _) = ProductFilter::from_query(&ProductQuery {
            category: Some("All".into()),
            ..query()
        })
        .unwrap();
        assert_eq!(filter.category, None);
    }

    #[test]
    fn category_and_min_price_are_combined() {
        let (filter, _) = ProductFilter::from_query(&ProductQuery {
            category: Some("Cotton Wicks".into()),
            min_price: Some("200".into()),
            ..query()
        })
        .unwrap();
        assert_eq!(filter.category.as_deref(), Some("Cotton Wicks"));
        assert_eq!(filter.min_price, Some(200));

        let sql = sql(&filter);
        assert!(sql.contains(r#""category" = 'Cotton Wicks'"#), "{sql}");
        assert!(sql.contains(r#""price" >= 200"#), "{sql}");
        assert!(sql.contains(" AND "), "{sql}");
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        for (min, max, rating) in [
            (Some("abc"), None, None),
            (None, Some("12x"), None),
            (Some("NaN"), None, None),
            (None, Some("inf"), None),
            (Some("-5"), None, None),
            (None, None, Some("six")),
            (None, None, Some("7")),
        ] {
            let result = ProductFilter::from_query(&ProductQuery {
                min_price: min.map(Into::into),
                max_price: max.map(Into::into),
                min_rating: rating.map(Into::into),
                ..query()
            });
            assert!(
                matches!(result, Err(AppError::InvalidArgument(_))),
                "{min:?} {max:?} {rating:?}"
            );
        }
    }

    #[test]
    fn empty_numeric_params_are_ignored() {
        let (filter, _) = ProductFilter::from_query(&ProductQuery {
            min_price: Some("".into()),
            max_price: Some("  ".into()),
            ..query()
        })
        .unwrap();
        assert_eq!(filter.min_price, None);
        assert_eq!(filter.max_price, None);
    }

    #[test]
    fn fractional_bounds_round_inward() {
        let (filter, _) = ProductFilter::from_query(&ProductQuery {
            min_price: Some("199.5".into()),
            max_price: Some("250.9".into()),
            ..query()
        })
        .unwrap();
        assert_eq!(filter.min_price, Some(200));
        assert_eq!(filter.max_price, Some(250));
    }

    #[test]
    fn inverted_price_range_is_rejected() {
        let result = ProductFilter::from_query(&ProductQuery {
            min_price: Some("300".into()),
            max_price: Some("100".into()),
            ..query()
        });
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn in_stock_flag_must_be_boolean() {
        let (filter, _) = ProductFilter::from_query(&ProductQuery {
            in_stock: Some("true".into()),
            ..query()
        })
        .unwrap();
        assert!(filter.in_stock);
        assert!(sql(&filter).contains(r#""stock" > 0"#));

        let result = ProductFilter::from_query(&ProductQuery {
            in_stock: Some("yes".into()),
            ..query()
        });
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn search_matches_name_brand_and_description() {
        let filter = ProductFilter::text_search("cotton");
        let sql = sql(&filter);
        assert!(sql.contains("ILIKE '%cotton%'"), "{sql}");
        assert!(sql.contains(r#""brand""#), "{sql}");
        assert!(sql.contains(r#""description""#), "{sql}");
        assert!(sql.contains(" OR "), "{sql}");
        assert!(filter.active_only);
    }

    #[test]
    fn wildcards_in_search_text_are_literal() {
        assert_eq!(contains_pattern("50%_off"), r"%50\%\_off%");
        assert_eq!(contains_pattern(r"a\b"), r"%a\\b%");
    }

    #[test]
    fn filter_request_treats_zero_as_unset() {
        let filter = ProductFilter::from_request(&FilterRequest {
            category: Some("Elastic Tapes".into()),
            min_price: Some(0.0),
            max_price: Some(250.0),
            brand: Some("saravana".into()),
            rating: Some(0.0),
        })
        .unwrap();
        assert_eq!(filter.min_price, None);
        assert_eq!(filter.max_price, Some(250));
        assert_eq!(filter.min_rating, None);
        assert_eq!(filter.brand.as_deref(), Some("saravana"));
        assert!(filter.active_only);
    }

    #[test]
    fn unknown_sort_key_is_ignored() {
        let (_, sort) = ProductFilter::from_query(&ProductQuery {
            sort_by: Some("popularity".into()),
            ..query()
        })
        .unwrap();
        assert_eq!(sort, None);
    }

    #[test]
    fn sort_keys_order_products() {
        let mut products = vec![
            product("twill tape", 195, 4.8, 3),
            product("Binding Tape", 180, 4.7, 1),
            product("Elastic Tape", 240, 4.9, 2),
        ];
        let names = |ps: &[Product]| ps.iter().map(|p| p.name.clone()).collect::<Vec<_>>();

        SortKey::PriceLow.apply(&mut products);
        assert_eq!(names(&products), ["Binding Tape", "twill tape", "Elastic Tape"]);

        SortKey::PriceHigh.apply(&mut products);
        assert_eq!(names(&products), ["Elastic Tape", "twill tape", "Binding Tape"]);

        SortKey::Name.apply(&mut products);
        assert_eq!(names(&products), ["Binding Tape", "Elastic Tape", "twill tape"]);

        SortKey::Rating.apply(&mut products);
        assert_eq!(names(&products), ["Elastic Tape", "twill tape", "Binding Tape"]);

        SortKey::Newest.apply(&mut products);
        assert_eq!(names(&products), ["Binding Tape", "Elastic Tape", "twill tape"]);
    }

    #[test]
    fn equal_keys_keep_storage_order() {
        let mut products = vec![
            product("first", 100, 4.0, 0),
            product("second", 100, 4.0, 0),
            product("third", 100, 4.0, 0),
        ];
        SortKey::PriceLow.apply(&mut products);
        assert_eq!(products[0].name, "first");
        assert_eq!(products[2].name, "third");
    }
}
