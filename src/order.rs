use core::cmp::Ordering;
use core::fmt;

/// A total order over keys, injected into a [`BTree`](crate::BTree) at construction.
///
/// Returning [`Ordering::Equal`] means both arguments address the same entry. The
/// comparator must be consistent for the lifetime of the tree: a comparator whose
/// answers change while keys are stored is a logic error, and the results of later
/// operations are unspecified (but memory-safe).
///
/// # Examples
///
/// ```
/// use core::cmp::Ordering;
/// use termos_btree::{BTree, Comparator, Config};
///
/// struct ByLength;
///
/// impl Comparator<String> for ByLength {
///     fn compare(&self, a: &String, b: &String) -> Ordering {
///         a.len().cmp(&b.len())
///     }
/// }
///
/// let mut tree = BTree::with_config(Config::new(2, ByLength).unwrap());
/// tree.insert("ccc".to_string(), 3);
/// tree.insert("a".to_string(), 1);
/// assert_eq!(tree.first_entry(), Some((Some(&"a".to_string()), &1)));
/// ```
pub trait Comparator<K: ?Sized> {
    /// Compares two keys.
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Orders keys by their [`Ord`] implementation. This is the default comparator.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct NaturalOrder;

impl<K: ?Sized + Ord> Comparator<K> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// Orders keys by the reverse of their [`Ord`] implementation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct ReverseOrder;

impl<K: ?Sized + Ord> Comparator<K> for ReverseOrder {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        b.cmp(a)
    }
}

/// Adapts a closure into a [`Comparator`]. Created by [`order_by`].
#[derive(Clone, Copy)]
pub struct OrderFn<F>(F);

impl<K: ?Sized, F> Comparator<K> for OrderFn<F>
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        (self.0)(a, b)
    }
}

impl<F> fmt::Debug for OrderFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OrderFn")
    }
}

/// Builds a comparator from a closure.
///
/// ```
/// use termos_btree::{BTree, Config, order_by};
///
/// let config = Config::new(3, order_by(|a: &i32, b: &i32| a.abs().cmp(&b.abs()))).unwrap();
/// let mut tree = BTree::with_config(config);
/// tree.insert(-5, "minus five");
/// tree.insert(2, "two");
/// assert_eq!(tree.get(Some(&5)), Some(&"minus five"));
/// ```
pub const fn order_by<K: ?Sized, F>(f: F) -> OrderFn<F>
where
    F: Fn(&K, &K) -> Ordering,
{
    OrderFn(f)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn natural_and_reverse_are_mirrors(a in any::<i64>(), b in any::<i64>()) {
            prop_assert_eq!(NaturalOrder.compare(&a, &b), a.cmp(&b));
            prop_assert_eq!(ReverseOrder.compare(&a, &b), a.cmp(&b).reverse());
        }
    }

    #[test]
    fn closure_comparator() {
        let by_abs = order_by(|a: &i32, b: &i32| a.abs().cmp(&b.abs()));
        assert_eq!(by_abs.compare(&-3, &3), Ordering::Equal);
        assert_eq!(by_abs.compare(&-4, &3), Ordering::Greater);
    }
}
