use crate::pointer::RelativePointer;
use std::fmt;
use std::mem::MaybeUninit;
use std::ops::Range;
use std::ptr;
use std::slice;
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// A view of `len` contiguous elements whose base is a [`RelativePointer`].
///
/// Like a slice, a span doesn't own its elements. Unlike a slice, it stays valid when the memory
/// holding both the span and its elements is relocated.
///
/// ```text
/// +-------+-----------------------------------+
/// | Bytes | Field                             |
/// +-------+-----------------------------------+
/// |     8 | data: RelativePointer<T>          |
/// +-------+-----------------------------------+
/// |     8 | len: u64, number of elements      |
/// +-------+-----------------------------------+
/// ```
///
/// The length is stored as `u64` on every platform to keep the layout identical across files.
///
/// # Examples
///
/// ```
/// use relative_ptr::RelativeSpan;
///
/// #[repr(C)]
/// struct Table {
///     values: RelativeSpan<i32>,
///     data: [i32; 4],
/// }
///
/// let mut table = Table {
///     values: RelativeSpan::new(),
///     data: [1, 2, 3, 4],
/// };
/// table.values.set_slice(&table.data);
///
/// let moved = Box::new(table);
/// // The box is new memory, expose it before reading through the span
/// let _ = (&raw const *moved).expose_provenance();
/// assert_eq!(unsafe { moved.values.as_slice() }, &[1, 2, 3, 4]);
/// assert_eq!(moved.values.data().cast_const(), moved.data.as_ptr());
/// ```
#[repr(C)]
#[derive(FromBytes, Immutable, KnownLayout)]
pub struct RelativeSpan<T> {
    data: RelativePointer<T>,
    len: u64,
}

const _: () = assert!(size_of::<RelativeSpan<u64>>() == 16);

impl<T> RelativeSpan<T> {
    /// Create an empty span with a null base
    #[inline]
    pub const fn new() -> Self {
        Self {
            data: RelativePointer::null(),
            len: 0,
        }
    }

    /// Initialize `slot` with a span of `len` elements starting at `data`.
    pub fn init_raw(slot: &mut MaybeUninit<Self>, data: *const T, len: usize) -> &mut Self {
        // SAFETY: a `&mut MaybeUninit` is valid for writes and aligned, and both fields are
        // initialized by `emplace`
        unsafe {
            Self::emplace(data, len, slot.as_mut_ptr());
            slot.assume_init_mut()
        }
    }

    /// Initialize `slot` with a span over the contiguous elements of `range`.
    pub fn init<'s, R: AsRef<[T]> + ?Sized>(
        slot: &'s mut MaybeUninit<Self>,
        range: &R,
    ) -> &'s mut Self {
        let elements = range.as_ref();
        Self::init_raw(slot, elements.as_ptr(), elements.len())
    }

    /// Write a span of `len` elements starting at `data` into `out`.
    ///
    /// # Safety
    ///
    /// `out` must be valid for writes and properly aligned.
    pub unsafe fn emplace(data: *const T, len: usize, out: *mut Self) {
        // SAFETY: `out` is valid for writes per the contract of this function
        unsafe {
            RelativePointer::emplace(data, &raw mut (*out).data);
            (&raw mut (*out).len).write(len as u64);
        }
    }

    /// Replace the span with `len` elements starting at `data`.
    #[inline]
    pub fn set(&mut self, data: *const T, len: usize) {
        self.data.set(data);
        self.len = len as u64;
    }

    /// Replace the span with the contiguous elements of `range`.
    pub fn set_slice<R: AsRef<[T]> + ?Sized>(&mut self, range: &R) {
        let elements = range.as_ref();
        self.set(elements.as_ptr(), elements.len());
    }

    /// Span the same elements as `other`, re-encoded relative to `self`.
    #[inline]
    pub fn assign(&mut self, other: &RelativeSpan<T>) {
        self.data.assign(&other.data);
        self.len = other.len;
    }

    /// The resolved address of the first element
    #[inline]
    pub fn data(&self) -> *mut T {
        self.data.get()
    }

    /// The number of elements.
    ///
    /// On 32-bit targets a stored length above `usize::MAX` is truncated. Use
    /// [`raw_len`](Self::raw_len) or [`Region::resolve_span`](crate::Region::resolve_span) for
    /// lengths read from untrusted data.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// The length as stored in memory
    #[inline]
    pub fn raw_len(&self) -> u64 {
        self.len
    }

    /// Returns true if the span has no elements, whatever its base
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The half-open range of element addresses, like `<[T]>::as_ptr_range`.
    pub fn as_ptr_range(&self) -> Range<*mut T> {
        let start = self.data();
        start..start.wrapping_add(self.len())
    }

    /// The span as a raw slice pointer
    pub fn as_raw_slice(&self) -> *mut [T] {
        ptr::slice_from_raw_parts_mut(self.data(), self.len())
    }

    /// View the elements as a slice. An empty span always yields an empty slice.
    ///
    /// # Safety
    ///
    /// A non-empty span must resolve to `len` valid, initialized elements that are not mutated
    /// for the lifetime of the returned slice.
    pub unsafe fn as_slice(&self) -> &[T] {
        if self.is_empty() {
            &[]
        } else {
            // SAFETY: see the contract of this function
            unsafe { slice::from_raw_parts(self.data(), self.len()) }
        }
    }

    /// View the elements as a mutable slice. An empty span always yields an empty slice.
    ///
    /// # Safety
    ///
    /// A non-empty span must resolve to `len` valid, initialized elements that are not aliased
    /// for the lifetime of the returned slice.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [T] {
        if self.is_empty() {
            &mut []
        } else {
            // SAFETY: see the contract of this function
            unsafe { slice::from_raw_parts_mut(self.data(), self.len()) }
        }
    }

    /// Iterate over the elements in order.
    ///
    /// # Safety
    ///
    /// Same as [`as_slice`](Self::as_slice).
    pub unsafe fn iter(&self) -> slice::Iter<'_, T> {
        // SAFETY: see the contract of this function
        unsafe { self.as_slice() }.iter()
    }

    /// The elements from `offset` to the end.
    ///
    /// # Safety
    ///
    /// Same as [`as_slice`](Self::as_slice), and `offset` must not exceed the length.
    pub unsafe fn subspan(&self, offset: usize) -> &[T] {
        debug_assert!(offset <= self.len(), "subspan offset out of range");
        // SAFETY: see the contract of this function
        unsafe { self.as_slice().get_unchecked(offset..) }
    }

    /// The element at `index`, without any bounds check.
    ///
    /// # Safety
    ///
    /// `index` must be less than the length and the span must resolve to valid elements.
    #[inline]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(index < self.len(), "span index out of range");
        // SAFETY: see the contract of this function
        unsafe { &*self.data().add(index) }
    }

    /// The mutable element at `index`, without any bounds check.
    ///
    /// # Safety
    ///
    /// `index` must be less than the length, the span must resolve to valid elements and the
    /// element must not be aliased for the lifetime of the returned reference.
    #[inline]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(index < self.len(), "span index out of range");
        // SAFETY: see the contract of this function
        unsafe { &mut *self.data().add(index) }
    }

    /// The first element.
    ///
    /// # Safety
    ///
    /// The span must be non-empty and resolve to valid elements.
    #[inline]
    pub unsafe fn front(&self) -> &T {
        // SAFETY: see the contract of this function
        unsafe { self.get_unchecked(0) }
    }

    /// The last element.
    ///
    /// # Safety
    ///
    /// The span must be non-empty and resolve to valid elements.
    #[inline]
    pub unsafe fn back(&self) -> &T {
        debug_assert!(!self.is_empty(), "back of an empty span");
        // SAFETY: see the contract of this function
        unsafe { self.get_unchecked(self.len().wrapping_sub(1)) }
    }

    /// The stored base pointer
    #[inline]
    pub fn pointer(&self) -> &RelativePointer<T> {
        &self.data
    }
}

impl<T> Default for RelativeSpan<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for RelativeSpan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelativeSpan")
            .field("data", &self.data())
            .field("len", &self.len)
            .finish()
    }
}
