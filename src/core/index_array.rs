//! Fixed-shape arrays indexed by tuples of categories.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use super::category::{Category, MultiIndex, slice_indices};

/// A dense array with one cell per combination of the categories in `I`.
///
/// Cells are stored in row-major order of `I`, see `MultiIndex::flat_index`. The array can be
/// addressed by typed index tuples (`get`, `set`) or by flat index (`array[flat_index]`).
#[derive(Clone, Debug, PartialEq)]
pub struct CustomIndexArray<T, I: MultiIndex> {
    values: Vec<T>,
    index: PhantomData<I>,
}

impl<T: Clone, I: MultiIndex> CustomIndexArray<T, I> {
    /// Create an array with every cell set to `value`.
    pub fn new(value: T) -> Self {
        Self {
            values: vec![value; I::SIZE],
            index: PhantomData,
        }
    }
}

impl<T: Clone + Default, I: MultiIndex> Default for CustomIndexArray<T, I> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T, I: MultiIndex> CustomIndexArray<T, I> {
    /// Create an array from values in flat index order.
    ///
    /// Returns `None` if the number of values does not match the array size.
    pub fn from_values(values: Vec<T>) -> Option<Self> {
        if values.len() != I::SIZE {
            return None;
        }
        Some(Self {
            values,
            index: PhantomData,
        })
    }

    /// Number of cells, the product of all category cardinalities.
    pub const fn size() -> usize {
        I::SIZE
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dimensions() -> Vec<usize> {
        I::dimensions()
    }

    #[inline]
    pub fn get_flat_index(index: I) -> usize {
        index.flat_index()
    }

    #[inline]
    pub fn get(&self, index: I) -> &T {
        &self.values[index.flat_index()]
    }

    #[inline]
    pub fn get_mut(&mut self, index: I) -> &mut T {
        &mut self.values[index.flat_index()]
    }

    pub fn set(&mut self, index: I, value: impl Into<T>) {
        self.values[index.flat_index()] = value.into();
    }

    /// Read the cell of `index` from an external buffer with the same layout.
    ///
    /// Derivative functions use this to address the integrator's temporary state vectors with
    /// the same typed indices as the model's own populations.
    #[inline]
    pub fn get_from<B>(buffer: &B, index: I) -> &B::Output
    where
        B: Index<usize> + ?Sized,
    {
        &buffer[index.flat_index()]
    }

    /// Flat indices of all cells belonging to one value of category `C`.
    pub fn slice_indices<C: Category>(value: C) -> impl Iterator<Item = usize> {
        slice_indices(&I::dimensions(), I::axis_of::<C>(), value.index())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.values.iter_mut()
    }

    /// Iterate over typed indices and values.
    pub fn indexed_iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.values
            .iter()
            .enumerate()
            .map(|(flat_index, value)| (I::from_flat_index(flat_index), value))
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.values
    }
}

impl<T, I: MultiIndex> Index<usize> for CustomIndexArray<T, I> {
    type Output = T;

    fn index(&self, flat_index: usize) -> &Self::Output {
        &self.values[flat_index]
    }
}

impl<T, I: MultiIndex> IndexMut<usize> for CustomIndexArray<T, I> {
    fn index_mut(&mut self, flat_index: usize) -> &mut Self::Output {
        &mut self.values[flat_index]
    }
}

impl<'a, T, I: MultiIndex> IntoIterator for &'a CustomIndexArray<T, I> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
