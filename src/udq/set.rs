//! Typed, optionally-undefined UDQ value sets.
//!
//! A [`UdqSet`] is the result of evaluating a user-defined quantity:
//! one value per well or group, or a single value for field and scalar
//! quantities. Members are individually undefined when their inputs
//! were missing, and every arithmetic operation propagates that
//! undefinedness member by member.

use serde::{Deserialize, Serialize};

use crate::error::{SchedError, SchedResult};

/// Target type of a user-defined quantity, derived from the leading
/// letters of its name (WU*, GU*, FU*).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UdqVarType {
    /// One value per well.
    Well,
    /// One value per group.
    Group,
    /// One value for the whole field.
    Field,
    /// A bare scalar, used for intermediate results.
    Scalar,
}

impl UdqVarType {
    /// Target type from a UDQ name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.as_bytes().first() {
            Some(b'W') => Self::Well,
            Some(b'G') => Self::Group,
            Some(b'F') => Self::Field,
            _ => Self::Scalar,
        }
    }
}

/// One member of a [`UdqSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UdqScalar {
    /// Well or group name; empty for field/scalar members.
    pub name: String,
    /// The value; `None` when undefined.
    pub value: Option<f64>,
}

impl UdqScalar {
    /// True when the member has a value.
    #[must_use]
    pub const fn defined(&self) -> bool {
        self.value.is_some()
    }
}

/// A named, typed vector of optionally-undefined values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UdqSet {
    name: String,
    var_type: UdqVarType,
    values: Vec<UdqScalar>,
}

impl UdqSet {
    /// A defined scalar set.
    #[must_use]
    pub fn scalar(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            var_type: UdqVarType::Scalar,
            values: vec![UdqScalar {
                name: String::new(),
                value: Some(value),
            }],
        }
    }

    /// An undefined scalar set.
    #[must_use]
    pub fn empty_scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            var_type: UdqVarType::Scalar,
            values: vec![UdqScalar {
                name: String::new(),
                value: None,
            }],
        }
    }

    /// A field set holding one value.
    #[must_use]
    pub fn field(name: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            name: name.into(),
            var_type: UdqVarType::Field,
            values: vec![UdqScalar {
                name: String::new(),
                value,
            }],
        }
    }

    /// A well-indexed set with every member undefined.
    #[must_use]
    pub fn wells(name: impl Into<String>, well_names: &[String]) -> Self {
        Self::indexed(name, UdqVarType::Well, well_names)
    }

    /// A group-indexed set with every member undefined.
    #[must_use]
    pub fn groups(name: impl Into<String>, group_names: &[String]) -> Self {
        Self::indexed(name, UdqVarType::Group, group_names)
    }

    fn indexed(name: impl Into<String>, var_type: UdqVarType, members: &[String]) -> Self {
        Self {
            name: name.into(),
            var_type,
            values: members
                .iter()
                .map(|member| UdqScalar {
                    name: member.clone(),
                    value: None,
                })
                .collect(),
        }
    }

    /// The set's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The set's target type.
    #[must_use]
    pub const fn var_type(&self) -> UdqVarType {
        self.var_type
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for a zero-member set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of defined members.
    #[must_use]
    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.defined()).count()
    }

    /// Members in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, UdqScalar> {
        self.values.iter()
    }

    /// Value of a named member.
    #[must_use]
    pub fn get(&self, member: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|v| v.name == member)
            .and_then(|v| v.value)
    }

    /// Value of a scalar or field set.
    #[must_use]
    pub fn scalar_value(&self) -> Option<f64> {
        match self.var_type {
            UdqVarType::Scalar | UdqVarType::Field => {
                self.values.first().and_then(|v| v.value)
            }
            _ => None,
        }
    }

    /// Assigns a named member's value.
    pub fn assign(&mut self, member: &str, value: Option<f64>) {
        if let Some(slot) = self.values.iter_mut().find(|v| v.name == member) {
            slot.value = value;
        }
    }

    /// Assigns every member.
    pub fn assign_all(&mut self, value: Option<f64>) {
        for slot in &mut self.values {
            slot.value = value;
        }
    }

    /// Applies a unary function elementwise; undefined stays undefined
    /// and the function may itself report undefined (e.g. sqrt of a
    /// negative number).
    #[must_use]
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> Option<f64>,
    {
        Self {
            name: self.name.clone(),
            var_type: self.var_type,
            values: self
                .values
                .iter()
                .map(|v| UdqScalar {
                    name: v.name.clone(),
                    value: v.value.and_then(&f),
                })
                .collect(),
        }
    }

    /// Combines two sets elementwise. A scalar or field operand is
    /// broadcast across an indexed operand; two indexed operands must
    /// agree on type and member names.
    ///
    /// # Errors
    ///
    /// Fails on a type/size mismatch between two indexed sets.
    pub fn zip_with<F>(&self, other: &Self, f: F) -> SchedResult<Self>
    where
        F: Fn(f64, f64) -> Option<f64>,
    {
        if self.is_broadcastable() && !other.is_broadcastable() {
            let lhs = self.scalar_like();
            return Ok(Self {
                name: other.name.clone(),
                var_type: other.var_type,
                values: other
                    .values
                    .iter()
                    .map(|v| UdqScalar {
                        name: v.name.clone(),
                        value: match (lhs, v.value) {
                            (Some(a), Some(b)) => f(a, b),
                            _ => None,
                        },
                    })
                    .collect(),
            });
        }
        if other.is_broadcastable() && !self.is_broadcastable() {
            let rhs = other.scalar_like();
            return Ok(Self {
                name: self.name.clone(),
                var_type: self.var_type,
                values: self
                    .values
                    .iter()
                    .map(|v| UdqScalar {
                        name: v.name.clone(),
                        value: match (v.value, rhs) {
                            (Some(a), Some(b)) => f(a, b),
                            _ => None,
                        },
                    })
                    .collect(),
            });
        }
        if self.var_type != other.var_type || self.values.len() != other.values.len() {
            return Err(SchedError::internal(format!(
                "UDQ set mismatch: '{}' has {} members, '{}' has {}",
                self.name,
                self.values.len(),
                other.name,
                other.values.len()
            )));
        }
        Ok(Self {
            name: self.name.clone(),
            var_type: self.var_type,
            values: self
                .values
                .iter()
                .zip(other.values.iter())
                .map(|(a, b)| UdqScalar {
                    name: a.name.clone(),
                    value: match (a.value, b.value) {
                        (Some(a), Some(b)) => f(a, b),
                        _ => None,
                    },
                })
                .collect(),
        })
    }

    const fn is_broadcastable(&self) -> bool {
        matches!(self.var_type, UdqVarType::Scalar | UdqVarType::Field)
    }

    fn scalar_like(&self) -> Option<f64> {
        self.values.first().and_then(|v| v.value)
    }

    /// Renames the set, used when a definition's result is stored.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Retypes a broadcast result to the requested target type, keeping
    /// the single value. Indexed sets are returned unchanged.
    #[must_use]
    pub fn cast(self, target: UdqVarType, members: &[String]) -> Self {
        if !self.is_broadcastable() || matches!(target, UdqVarType::Scalar | UdqVarType::Field) {
            let mut set = self;
            if set.is_broadcastable() {
                set.var_type = target;
            }
            return set;
        }
        let value = self.scalar_like();
        let mut set = Self::indexed(self.name, target, members);
        set.assign_all(value);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn var_type_from_name() {
        assert_eq!(UdqVarType::from_name("WUOPRL"), UdqVarType::Well);
        assert_eq!(UdqVarType::from_name("GUINJ"), UdqVarType::Group);
        assert_eq!(UdqVarType::from_name("FULIQ"), UdqVarType::Field);
        assert_eq!(UdqVarType::from_name("XU"), UdqVarType::Scalar);
    }

    #[test]
    fn undefined_propagates_through_zip() {
        let wells = names(&["W1", "W2"]);
        let mut a = UdqSet::wells("WUA", &wells);
        a.assign("W1", Some(2.0));
        let mut b = UdqSet::wells("WUB", &wells);
        b.assign("W1", Some(3.0));
        b.assign("W2", Some(4.0));

        let sum = a.zip_with(&b, |x, y| Some(x + y)).unwrap();
        assert_eq!(sum.get("W1"), Some(5.0));
        assert_eq!(sum.get("W2"), None);
        assert_eq!(sum.defined_count(), 1);
    }

    #[test]
    fn scalar_broadcasts_over_indexed() {
        let wells = names(&["W1", "W2"]);
        let mut set = UdqSet::wells("WUA", &wells);
        set.assign_all(Some(10.0));
        let two = UdqSet::scalar("2", 2.0);

        let scaled = set.zip_with(&two, |x, y| Some(x * y)).unwrap();
        assert_eq!(scaled.get("W1"), Some(20.0));
        assert_eq!(scaled.var_type(), UdqVarType::Well);

        let flipped = two.zip_with(&set, |x, y| Some(x - y)).unwrap();
        assert_eq!(flipped.get("W2"), Some(-8.0));
    }

    #[test]
    fn indexed_mismatch_is_an_error() {
        let a = UdqSet::wells("WUA", &names(&["W1"]));
        let b = UdqSet::wells("WUB", &names(&["W1", "W2"]));
        assert!(a.zip_with(&b, |x, y| Some(x + y)).is_err());
    }

    #[test]
    fn map_keeps_undefined_and_may_undefine() {
        let wells = names(&["W1", "W2"]);
        let mut set = UdqSet::wells("WUA", &wells);
        set.assign("W1", Some(-4.0));
        let roots = set.map(|x| if x < 0.0 { None } else { Some(x.sqrt()) });
        assert_eq!(roots.get("W1"), None);
        assert_eq!(roots.get("W2"), None);
    }

    #[test]
    fn cast_broadcast_to_wells() {
        let value = UdqSet::scalar("0.5", 0.5);
        let wells = names(&["W1", "W2"]);
        let cast = value.cast(UdqVarType::Well, &wells);
        assert_eq!(cast.var_type(), UdqVarType::Well);
        assert_eq!(cast.len(), 2);
        assert_eq!(cast.get("W2"), Some(0.5));
    }
}
