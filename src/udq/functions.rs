//! The UDQ function table.
//!
//! Functions come in two shapes: elementwise unary functions applied
//! member by member, and aggregations that reduce an indexed set to a
//! field value. Both are looked up by their deck name.

use crate::udq::set::UdqSet;

/// Looks up an elementwise unary function by deck name.
#[must_use]
pub fn unary(name: &str) -> Option<fn(f64) -> Option<f64>> {
    match name {
        "ABS" => Some(|x| Some(x.abs())),
        "CEIL" => Some(|x| Some(x.ceil())),
        "FLOOR" => Some(|x| Some(x.floor())),
        "EXP" => Some(|x| Some(x.exp())),
        "LN" => Some(|x| if x > 0.0 { Some(x.ln()) } else { None }),
        "LOG" => Some(|x| if x > 0.0 { Some(x.log10()) } else { None }),
        "NINT" => Some(|x| Some(x.round())),
        "SQRT" => Some(|x| if x >= 0.0 { Some(x.sqrt()) } else { None }),
        "SIN" => Some(|x| Some(x.sin())),
        "COS" => Some(|x| Some(x.cos())),
        "TAN" => Some(|x| Some(x.tan())),
        _ => None,
    }
}

/// True if `name` is an aggregation function.
#[must_use]
pub fn is_aggregate(name: &str) -> bool {
    matches!(
        name,
        "SUM" | "PROD" | "MAX" | "MIN" | "AVEA" | "NORM1" | "NORM2" | "NORMI"
    )
}

/// Applies an aggregation over the defined members of a set, producing
/// a field value. An aggregation over zero defined members is
/// undefined, except SUM and NORM1 which are zero.
#[must_use]
pub fn aggregate(name: &str, set: &UdqSet) -> Option<Option<f64>> {
    let defined: Vec<f64> = set.iter().filter_map(|v| v.value).collect();
    let result = match name {
        "SUM" => Some(defined.iter().sum()),
        "NORM1" => Some(defined.iter().map(|x| x.abs()).sum()),
        "PROD" => non_empty(&defined, defined.iter().product()),
        "MAX" => defined.iter().copied().fold(None, fold_max),
        "MIN" => defined.iter().copied().fold(None, fold_min),
        "AVEA" => {
            if defined.is_empty() {
                None
            } else {
                Some(defined.iter().sum::<f64>() / defined.len() as f64)
            }
        }
        "NORM2" => non_empty(&defined, defined.iter().map(|x| x * x).sum::<f64>().sqrt()),
        "NORMI" => defined.iter().map(|x| x.abs()).fold(None, fold_max),
        _ => return None,
    };
    Some(result)
}

fn non_empty(defined: &[f64], value: f64) -> Option<f64> {
    if defined.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn fold_max(acc: Option<f64>, x: f64) -> Option<f64> {
    Some(acc.map_or(x, |a| a.max(x)))
}

fn fold_min(acc: Option<f64>, x: f64) -> Option<f64> {
    Some(acc.map_or(x, |a| a.min(x)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn well_set(values: &[(&str, Option<f64>)]) -> UdqSet {
        let names: Vec<String> = values.iter().map(|(n, _)| (*n).to_string()).collect();
        let mut set = UdqSet::wells("WUTEST", &names);
        for (name, value) in values {
            set.assign(name, *value);
        }
        set
    }

    #[test]
    fn unary_lookups() {
        assert_eq!(unary("ABS").unwrap()(-3.0), Some(3.0));
        assert_eq!(unary("NINT").unwrap()(2.6), Some(3.0));
        assert_eq!(unary("SQRT").unwrap()(-1.0), None);
        assert_eq!(unary("LN").unwrap()(0.0), None);
        assert!(unary("BOGUS").is_none());
    }

    #[test]
    fn aggregates_skip_undefined_members() {
        let set = well_set(&[("W1", Some(2.0)), ("W2", None), ("W3", Some(4.0))]);
        assert_eq!(aggregate("SUM", &set), Some(Some(6.0)));
        assert_eq!(aggregate("MAX", &set), Some(Some(4.0)));
        assert_eq!(aggregate("MIN", &set), Some(Some(2.0)));
        assert_eq!(aggregate("AVEA", &set), Some(Some(3.0)));
        assert_eq!(aggregate("PROD", &set), Some(Some(8.0)));
    }

    #[test]
    fn norms() {
        let set = well_set(&[("W1", Some(-3.0)), ("W2", Some(4.0))]);
        assert_eq!(aggregate("NORM1", &set), Some(Some(7.0)));
        assert_eq!(aggregate("NORM2", &set), Some(Some(5.0)));
        assert_eq!(aggregate("NORMI", &set), Some(Some(4.0)));
    }

    #[test]
    fn empty_aggregations() {
        let set = well_set(&[("W1", None), ("W2", None)]);
        assert_eq!(aggregate("SUM", &set), Some(Some(0.0)));
        assert_eq!(aggregate("MAX", &set), Some(None));
        assert_eq!(aggregate("AVEA", &set), Some(None));
        assert_eq!(aggregate("XXX", &set), None);
    }
}
