use ndarray::{ArrayBase, Data, Dimension, IntoDimension, Ix};

/// Compares two "things" with approximate equality.
///
/// # Examples
///
/// This can be used to compare two floating point numbers:
///
/// ```
/// use test_utils::assert_approx_eq;
/// assert_approx_eq!(f32, 0.15039155, 0.1503916, ulps = 3);
/// ```
///
/// Or sequential containers and ndarray arrays of such, in any combination:
///
/// ```
/// use ndarray::arr2;
/// use test_utils::assert_approx_eq;
/// assert_approx_eq!(f32, &[[1.0, 2.], [3., 4.]], vec![[1.0, 2.], [3., 4.]]);
/// assert_approx_eq!(f32, arr2(&[[1.0, 2.], [3., 4.]]), [[1.0, 2.], [3., 4.]]);
/// ```
///
/// The number of `ulps` defaults to `2` and the `epsilon` defaults to `0` if not specified. Two
/// NaN values are considered to be approximately equal.
#[macro_export]
macro_rules! assert_approx_eq {
    ($t:ty, $left:expr, $right:expr $(,)?) => {
        $crate::assert_approx_eq!($t, $left, $right, epsilon = 0., ulps = 2)
    };
    ($t:ty, $left:expr, $right:expr, ulps = $ulps:expr $(,)?) => {
        $crate::assert_approx_eq!($t, $left, $right, epsilon = 0., ulps = $ulps)
    };
    ($t:ty, $left:expr, $right:expr, epsilon = $epsilon:expr $(,)?) => {
        $crate::assert_approx_eq!($t, $left, $right, epsilon = $epsilon, ulps = 2)
    };
    ($t:ty, $left:expr, $right:expr, epsilon = $epsilon:expr, ulps = $ulps:expr $(,)?) => {{
        let left = $crate::Flatten::flatten(&$left);
        let right = $crate::Flatten::flatten(&$right);
        std::assert_eq!(
            left.iter().map(|(idx, _)| idx).collect::<Vec<_>>(),
            right.iter().map(|(idx, _)| idx).collect::<Vec<_>>(),
            "shape mismatch when flattening in logical order",
        );
        for ((idx, lv), (_, rv)) in left.into_iter().zip(right) {
            if !(lv.is_nan() && rv.is_nan()) {
                std::assert!(
                    $crate::approx_eq!($t, lv, rv, epsilon = $epsilon, ulps = $ulps),
                    "approximated equal assertion failed (ulps={:?}, epsilon={:?}) at index {:?}: {:?} == {:?}",
                    $ulps,
                    $epsilon,
                    idx,
                    lv,
                    rv,
                );
            }
        }
    }};
}

/// Flattens a "thing" into its indexed leaf values in logical order.
///
/// Only meant to be used by [`assert_approx_eq!`].
pub trait Flatten {
    /// Pushes all leaf values with their full index onto `leaves`.
    fn flatten_into(&self, prefix: &mut Vec<Ix>, leaves: &mut Vec<(Vec<Ix>, f32)>);

    /// Collects all leaf values with their full index.
    fn flatten(&self) -> Vec<(Vec<Ix>, f32)> {
        let mut leaves = Vec::new();
        self.flatten_into(&mut Vec::new(), &mut leaves);
        leaves
    }
}

impl Flatten for f32 {
    fn flatten_into(&self, prefix: &mut Vec<Ix>, leaves: &mut Vec<(Vec<Ix>, f32)>) {
        leaves.push((prefix.clone(), *self));
    }
}

impl<T> Flatten for &T
where
    T: Flatten + ?Sized,
{
    fn flatten_into(&self, prefix: &mut Vec<Ix>, leaves: &mut Vec<(Vec<Ix>, f32)>) {
        (**self).flatten_into(prefix, leaves);
    }
}

impl<T> Flatten for [T]
where
    T: Flatten,
{
    fn flatten_into(&self, prefix: &mut Vec<Ix>, leaves: &mut Vec<(Vec<Ix>, f32)>) {
        for (idx, element) in self.iter().enumerate() {
            prefix.push(idx);
            element.flatten_into(prefix, leaves);
            prefix.pop();
        }
    }
}

impl<T, const N: usize> Flatten for [T; N]
where
    T: Flatten,
{
    fn flatten_into(&self, prefix: &mut Vec<Ix>, leaves: &mut Vec<(Vec<Ix>, f32)>) {
        self[..].flatten_into(prefix, leaves);
    }
}

impl<T> Flatten for Vec<T>
where
    T: Flatten,
{
    fn flatten_into(&self, prefix: &mut Vec<Ix>, leaves: &mut Vec<(Vec<Ix>, f32)>) {
        self.as_slice().flatten_into(prefix, leaves);
    }
}

impl<S, D> Flatten for ArrayBase<S, D>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    fn flatten_into(&self, prefix: &mut Vec<Ix>, leaves: &mut Vec<(Vec<Ix>, f32)>) {
        leaves.extend(self.indexed_iter().map(|(idx, value)| {
            let mut idx_full = prefix.clone();
            idx_full.extend(idx.into_dimension().as_array_view().iter());
            (idx_full, *value)
        }));
    }
}
