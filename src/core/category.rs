//! Categories and multi-category indices
//!
//! A `Category` is a finite, enumerable axis of a population, e.g. the infection state or the
//! age group. Tuples of categories implement `MultiIndex`, which maps every combination of
//! category values onto a row-major flat index. All shape information is carried by the types,
//! so the size of an indexed array is known at compile time.

use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::fmt;

/// A finite axis with `COUNT` values indexed `0..COUNT`.
///
/// Fieldless enums can derive this trait with `#[derive(Category)]`, variants are numbered in
/// declaration order.
pub trait Category: Copy + fmt::Debug + PartialEq + 'static {
    const COUNT: usize;

    fn index(&self) -> usize;

    fn from_index(index: usize) -> Self;
}

/// Iterate over all values of a category in index order.
pub fn categories<C: Category>() -> impl Iterator<Item = C> {
    (0..C::COUNT).map(C::from_index)
}

/// Age stratification with `N` groups.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgeGroup<const N: usize>(pub usize);

impl<const N: usize> Category for AgeGroup<N> {
    const COUNT: usize = N;

    #[inline]
    fn index(&self) -> usize {
        self.0
    }

    fn from_index(index: usize) -> Self {
        AgeGroup(index)
    }
}

impl<const N: usize> fmt::Display for AgeGroup<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tuple of categories addressing one cell of a `CustomIndexArray`.
pub trait MultiIndex: Copy + fmt::Debug + PartialEq + 'static {
    /// Number of categories in the tuple.
    const RANK: usize;

    /// Product of all category cardinalities.
    const SIZE: usize;

    /// Cardinality of each category, outermost first.
    fn dimensions() -> Vec<usize>;

    fn category_ids() -> Vec<TypeId>;

    /// Row-major flat index, the last category varies fastest.
    fn flat_index(&self) -> usize;

    fn from_flat_index(flat_index: usize) -> Self;

    /// Position of the category `C` in the tuple.
    ///
    /// If the category appears more than once, the first position is returned.
    fn axis_of<C: Category>() -> usize {
        Self::category_ids()
            .iter()
            .position(|id| *id == TypeId::of::<C>())
            .unwrap_or_else(|| {
                panic!(
                    "Category {} is not part of the index {}",
                    std::any::type_name::<C>(),
                    std::any::type_name::<Self>()
                )
            })
    }
}

macro_rules! impl_multi_index {
    ($rank:expr; $( $category:ident : $position:tt ),+) => {
        impl<$( $category: Category ),+> MultiIndex for ($( $category, )+) {
            const RANK: usize = $rank;
            const SIZE: usize = 1 $( * $category::COUNT )+;

            fn dimensions() -> Vec<usize> {
                vec![$( $category::COUNT ),+]
            }

            fn category_ids() -> Vec<TypeId> {
                vec![$( TypeId::of::<$category>() ),+]
            }

            #[inline]
            fn flat_index(&self) -> usize {
                let mut flat_index = 0;
                $(
                    debug_assert!(
                        self.$position.index() < $category::COUNT,
                        "Index {} out of range for category {}",
                        self.$position.index(),
                        std::any::type_name::<$category>()
                    );
                    flat_index = flat_index * $category::COUNT + self.$position.index();
                )+
                flat_index
            }

            fn from_flat_index(flat_index: usize) -> Self {
                $(
                    debug_assert!(
                        $category::COUNT > 0,
                        "Category {} has no values",
                        std::any::type_name::<$category>()
                    );
                )+
                debug_assert!(flat_index < Self::SIZE, "Flat index {flat_index} out of range");
                let mut stride = Self::SIZE;
                ($(
                    {
                        stride /= $category::COUNT;
                        $category::from_index((flat_index / stride) % $category::COUNT)
                    },
                )+)
            }
        }
    };
}

impl_multi_index!(1; A: 0);
impl_multi_index!(2; A: 0, B: 1);
impl_multi_index!(3; A: 0, B: 1, C: 2);
impl_multi_index!(4; A: 0, B: 1, C: 2, D: 3);

/// Flat indices of all cells whose category at `axis` equals `value`.
///
/// The other categories are free, the indices are produced in ascending order.
pub fn slice_indices(
    dimensions: &[usize],
    axis: usize,
    value: usize,
) -> impl Iterator<Item = usize> + use<> {
    debug_assert!(axis < dimensions.len());
    debug_assert!(value < dimensions[axis]);
    let stride: usize = dimensions[axis + 1..].iter().product();
    let outer: usize = dimensions[..axis].iter().product();
    let block = dimensions[axis] * stride;
    (0..outer).flat_map(move |outer_index| {
        let start = outer_index * block + value * stride;
        start..start + stride
    })
}
