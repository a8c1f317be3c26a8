//! Attribute values and the mergeable-attribute operator (spec §3, §9).
//!
//! `AttributeMap` is an `indexmap::IndexMap` to preserve insertion order, per
//! spec §3 ("Attributes are an ordered mapping from string to typed value").

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single attribute value. A closed, serializable variant set covering the
/// "bool, int, float, string, nested set, …" enumeration from spec §3.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Set(Vec<AttrValue>),
    Null,
}

impl AttrValue {
    fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    fn is_empty_value(&self) -> bool {
        match self {
            AttrValue::Null => true,
            AttrValue::String(s) => s.is_empty(),
            AttrValue::Set(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Numeric addition used by `Sum`/`EnableUpcast`: same-type pairs always
    /// add (`Int + Int -> Int`, `Float + Float -> Float`); a mixed
    /// `Int`/`Float` pair only adds when `allow_upcast` is set, promoting to
    /// `Float`, and otherwise isn't numeric addition at all.
    fn add_numeric(&self, other: &AttrValue, allow_upcast: bool) -> Option<AttrValue> {
        match (self, other) {
            (AttrValue::Int(a), AttrValue::Int(b)) => Some(AttrValue::Int(a.wrapping_add(*b))),
            (AttrValue::Int(a), AttrValue::Float(b)) if allow_upcast => Some(AttrValue::Float(*a as f64 + b)),
            (AttrValue::Float(a), AttrValue::Int(b)) if allow_upcast => Some(AttrValue::Float(a + *b as f64)),
            (AttrValue::Float(a), AttrValue::Float(b)) => Some(AttrValue::Float(a + b)),
            _ => None,
        }
    }
}

pub type AttributeMap = IndexMap<String, AttrValue>;

/// How `SetAttributes`/`TestAndSetAttributes` merge a new attribute set into
/// a tracker's working attributes (spec §4.2, §9).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeBehavior {
    /// Overwrite existing keys, add new ones.
    AddAndUpdate,
    /// Only add keys that do not already exist; existing keys are untouched.
    AddNewItems,
    /// Same-type numeric keys are summed (`Int+Int`, `Float+Float`); a
    /// mixed `Int`/`Float` pair and non-numeric keys fall back to
    /// `AddAndUpdate`. Use `EnableUpcast` to sum across `Int`/`Float`.
    Sum,
    /// `Set`-valued keys are concatenated; other keys fall back to `AddAndUpdate`.
    AppendLists,
    /// Keys whose incoming value is `Null` are removed from the target instead of set.
    RemoveNull,
    /// Keys whose incoming value is empty (`Null`, `""`, or an empty `Set`) are removed.
    RemoveEmpty,
    /// Like `Sum`, but a mixed `Int`/`Float` pair is also summed, promoting
    /// the result to `Float` instead of falling back to `AddAndUpdate`.
    EnableUpcast,
    /// No merge is performed; attributes are left untouched.
    None,
}

/// Apply `incoming` onto `target` according to `behavior`. Total: every
/// recognized `MergeBehavior` has defined behavior for every attribute
/// value, per spec §9's "small, total operator" design note.
pub fn merge_attributes(target: &mut AttributeMap, incoming: &AttributeMap, behavior: MergeBehavior) {
    match behavior {
        MergeBehavior::None => {}
        MergeBehavior::AddAndUpdate => {
            for (k, v) in incoming {
                target.insert(k.clone(), v.clone());
            }
        }
        MergeBehavior::AddNewItems => {
            for (k, v) in incoming {
                target.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
        MergeBehavior::Sum | MergeBehavior::EnableUpcast => {
            let allow_upcast = behavior == MergeBehavior::EnableUpcast;
            for (k, v) in incoming {
                match target.get(k).and_then(|existing| existing.add_numeric(v, allow_upcast)) {
                    Some(summed) => {
                        target.insert(k.clone(), summed);
                    }
                    None => {
                        target.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        MergeBehavior::AppendLists => {
            for (k, v) in incoming {
                let appended = match (target.get(k), v) {
                    (Some(AttrValue::Set(existing)), AttrValue::Set(new_items)) => {
                        let mut combined = existing.clone();
                        combined.extend(new_items.clone());
                        Some(AttrValue::Set(combined))
                    }
                    _ => None,
                };
                match appended {
                    Some(merged) => {
                        target.insert(k.clone(), merged);
                    }
                    None => {
                        target.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        MergeBehavior::RemoveNull => {
            for (k, v) in incoming {
                if v.is_null() {
                    target.shift_remove(k);
                } else {
                    target.insert(k.clone(), v.clone());
                }
            }
        }
        MergeBehavior::RemoveEmpty => {
            for (k, v) in incoming {
                if v.is_empty_value() {
                    target.shift_remove(k);
                } else {
                    target.insert(k.clone(), v.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn map(pairs: &[(&str, AttrValue)]) -> AttributeMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn add_and_update_overwrites() {
        let mut target = map(&[("Slot", AttrValue::Int(1))]);
        let incoming = map(&[("Slot", AttrValue::Int(3))]);
        merge_attributes(&mut target, &incoming, MergeBehavior::AddAndUpdate);
        assert_eq!(target.get("Slot"), Some(&AttrValue::Int(3)));
    }

    #[test]
    fn add_new_items_preserves_existing() {
        let mut target = map(&[("Slot", AttrValue::Int(1))]);
        let incoming = map(&[("Slot", AttrValue::Int(99)), ("Color", AttrValue::String("red".into()))]);
        merge_attributes(&mut target, &incoming, MergeBehavior::AddNewItems);
        assert_eq!(target.get("Slot"), Some(&AttrValue::Int(1)));
        assert_eq!(target.get("Color"), Some(&AttrValue::String("red".into())));
    }

    #[test]
    fn add_object_idempotent_under_add_new_items() {
        let mut target = AttributeMap::new();
        let incoming = map(&[("Slot", AttrValue::Int(3))]);
        for _ in 0..5 {
            merge_attributes(&mut target, &incoming, MergeBehavior::AddNewItems);
        }
        assert_eq!(target.len(), 1);
        assert_eq!(target.get("Slot"), Some(&AttrValue::Int(3)));
    }

    #[test]
    fn sum_adds_same_type_numerics() {
        let mut target = map(&[("Value", AttrValue::Int(10))]);
        let incoming = map(&[("Value", AttrValue::Int(5))]);
        merge_attributes(&mut target, &incoming, MergeBehavior::Sum);
        assert_eq!(target.get("Value"), Some(&AttrValue::Int(15)));
    }

    #[test]
    fn sum_falls_back_to_overwrite_on_mixed_int_float() {
        let mut target = map(&[("Value", AttrValue::Int(10))]);
        let incoming = map(&[("Value", AttrValue::Float(1.5))]);
        merge_attributes(&mut target, &incoming, MergeBehavior::Sum);
        assert_eq!(target.get("Value"), Some(&AttrValue::Float(1.5)));
    }

    #[test]
    fn enable_upcast_sums_mixed_int_and_float() {
        let mut target = map(&[("Value", AttrValue::Int(10))]);
        let incoming = map(&[("Value", AttrValue::Float(1.5))]);
        merge_attributes(&mut target, &incoming, MergeBehavior::EnableUpcast);
        assert_eq!(target.get("Value"), Some(&AttrValue::Float(11.5)));
    }

    #[test]
    fn append_lists_concatenates() {
        let mut target = map(&[("Tags", AttrValue::Set(vec![AttrValue::String("a".into())]))]);
        let incoming = map(&[("Tags", AttrValue::Set(vec![AttrValue::String("b".into())]))]);
        merge_attributes(&mut target, &incoming, MergeBehavior::AppendLists);
        assert_eq!(
            target.get("Tags"),
            Some(&AttrValue::Set(vec![
                AttrValue::String("a".into()),
                AttrValue::String("b".into())
            ]))
        );
    }

    #[test]
    fn remove_null_deletes_key() {
        let mut target = map(&[("Slot", AttrValue::Int(1))]);
        let incoming = map(&[("Slot", AttrValue::Null)]);
        merge_attributes(&mut target, &incoming, MergeBehavior::RemoveNull);
        assert!(!target.contains_key("Slot"));
    }

    #[test]
    fn remove_empty_deletes_empty_string_and_set() {
        let mut target = map(&[
            ("Name", AttrValue::String("x".into())),
            ("Tags", AttrValue::Set(vec![AttrValue::Int(1)])),
        ]);
        let incoming = map(&[
            ("Name", AttrValue::String(String::new())),
            ("Tags", AttrValue::Set(vec![])),
        ]);
        merge_attributes(&mut target, &incoming, MergeBehavior::RemoveEmpty);
        assert!(!target.contains_key("Name"));
        assert!(!target.contains_key("Tags"));
    }

    proptest::proptest! {
        /// Plain `Sum` never upcasts a mixed `Int`/`Float` pair; it overwrites
        /// instead, for any finite pair.
        #[test]
        fn sum_overwrites_any_mixed_int_and_finite_float(a in any::<i64>(), b in -1e12f64..1e12f64) {
            let mut target = map(&[("Value", AttrValue::Int(a))]);
            let incoming = map(&[("Value", AttrValue::Float(b))]);
            merge_attributes(&mut target, &incoming, MergeBehavior::Sum);
            prop_assert_eq!(target.get("Value"), Some(&AttrValue::Float(b)));
        }

        /// `EnableUpcast` always upcasts `Int + Float` to `Float`, for any
        /// finite pair.
        #[test]
        fn enable_upcast_sums_any_int_and_finite_float(a in any::<i64>(), b in -1e12f64..1e12f64) {
            let mut target = map(&[("Value", AttrValue::Int(a))]);
            let incoming = map(&[("Value", AttrValue::Float(b))]);
            merge_attributes(&mut target, &incoming, MergeBehavior::EnableUpcast);
            match target.get("Value") {
                Some(AttrValue::Float(sum)) => prop_assert!((*sum - (a as f64 + b)).abs() < 1.0),
                other => prop_assert!(false, "expected upcasted Float, got {:?}", other),
            }
        }

        /// `Sum` on two `Int`s never upcasts and never panics, even on overflow.
        #[test]
        fn sum_of_two_ints_stays_int_without_panic(a in any::<i64>(), b in any::<i64>()) {
            let mut target = map(&[("Value", AttrValue::Int(a))]);
            let incoming = map(&[("Value", AttrValue::Int(b))]);
            merge_attributes(&mut target, &incoming, MergeBehavior::Sum);
            prop_assert!(matches!(target.get("Value"), Some(AttrValue::Int(_))));
        }
    }
}
