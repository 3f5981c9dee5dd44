use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// A range of `T` elements measured in bytes from the start of a region.
///
/// Unlike [`RelativeSpan`](crate::RelativeSpan), a base span doesn't move with its container. It
/// is only meaningful together with the base it was measured from, which has to be passed in
/// explicitly, either through [`Region::dereference`](crate::Region::dereference) or
/// [`resolve_at`](Self::resolve_at). In return it is plain data and can be copied freely.
///
/// Trailing bytes that don't make up a whole element are never part of the span: [`len`],
/// [`resolve_at`] and [`Region::dereference`](crate::Region::dereference) all count whole
/// elements only.
///
/// [`len`]: Self::len
/// [`resolve_at`]: Self::resolve_at
///
/// ```text
/// +-------+--------------------------+
/// | Bytes | Field                    |
/// +-------+--------------------------+
/// |     8 | start: u64, byte offset  |
/// +-------+--------------------------+
/// |     8 | end: u64, byte offset    |
/// +-------+--------------------------+
/// ```
#[repr(C)]
#[derive(FromBytes, Immutable, KnownLayout)]
pub struct BaseSpan<T> {
    start: u64,
    end: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> BaseSpan<T> {
    /// The empty span at the start of a region
    pub const NULL: Self = Self::new(0, 0);

    /// Create a span from byte offsets.
    pub const fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            _marker: PhantomData,
        }
    }

    /// Measure `elements` from `base`.
    pub fn from_slice(base: *const u8, elements: &[T]) -> Self {
        let start = elements.as_ptr().addr().wrapping_sub(base.addr());
        let end = start.wrapping_add(size_of_val(elements));
        Self::new(start as u64, end as u64)
    }

    /// Byte offset of the first element
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Byte offset one past the last element
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Size in bytes. An inverted range has size 0.
    pub fn size(&self) -> usize {
        self.end.saturating_sub(self.start) as usize
    }

    /// Number of whole elements in the range
    pub fn len(&self) -> usize {
        self.size().checked_div(size_of::<T>()).unwrap_or(0)
    }

    /// Returns true if the range contains no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve the span against `base` without any checks.
    pub fn resolve_at(&self, base: *const u8) -> *mut [T] {
        let data = base.cast_mut().wrapping_add(self.start as usize).cast::<T>();
        ptr::slice_from_raw_parts_mut(data, self.len())
    }
}

impl<T> Clone for BaseSpan<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for BaseSpan<T> {}

impl<T> PartialEq for BaseSpan<T> {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end
    }
}

impl<T> Eq for BaseSpan<T> {}

impl<T> Default for BaseSpan<T> {
    fn default() -> Self {
        Self::NULL
    }
}

impl<T> fmt::Debug for BaseSpan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseSpan")
            .field("start", &self.start())
            .field("end", &self.end())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[allow(unused_imports)]
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn derives() {
        let span = BaseSpan::<u32>::new(0, 8);
        let span2 = span;
        assert_eq!(span, span2);
        println!("{span2:?}");
        assert_eq!(BaseSpan::<u32>::default(), BaseSpan::NULL);
    }

    #[test]
    fn no_panic_invalid_size() {
        let invalid = BaseSpan::<u8>::new(100, 0);
        assert_eq!(invalid.size(), 0);
        assert!(invalid.is_empty());
    }

    #[test]
    fn element_count() {
        let span = BaseSpan::<u32>::new(8, 24);
        assert_eq!(span.size(), 16);
        assert_eq!(span.len(), 4);

        // Trailing partial elements are not counted
        let span = BaseSpan::<u32>::new(8, 26);
        assert_eq!(span.len(), 4);

        let unit = BaseSpan::<()>::new(0, 16);
        assert_eq!(unit.len(), 0);
    }

    #[test]
    fn from_slice_and_resolve() {
        let buffer = [10u32, 11, 12, 13, 14];
        let base = buffer.as_ptr().cast::<u8>();
        let span = BaseSpan::from_slice(base, &buffer[1..4]);
        assert_eq!(span.start(), 4);
        assert_eq!(span.end(), 16);

        let copy = buffer;
        let resolved = span.resolve_at(copy.as_ptr().cast());
        assert_eq!(unsafe { &*resolved }, &[11, 12, 13]);
    }
}
