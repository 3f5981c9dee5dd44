use std::fmt;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ptr;
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// The stored offset that marks a [`RelativePointer`] as null.
///
/// An offset of zero is a valid pointer to the pointer itself, so null is encoded as a target one
/// byte past the pointer's own address. A non-null target at exactly that address cannot be
/// represented; debug builds assert against it in [`RelativePointer::set`].
pub const NULL_OFFSET: i64 = 1;

/// A pointer to a `T` stored as a signed byte offset from its own address.
///
/// The target address is recomputed from the current location of the pointer on every access.
/// Copying or mapping the memory that holds both the pointer and its target to a different
/// address keeps the pointer valid without any fixup.
///
/// ```text
/// +-------+--------------------------------------------+
/// | Bytes | Field                                      |
/// +-------+--------------------------------------------+
/// |     8 | offset: i64, target address - self address |
/// +-------+--------------------------------------------+
/// ```
///
/// The offset [`NULL_OFFSET`] is reserved for null. An offset of `0` points at the pointer itself.
///
/// # Provenance
///
/// Setting a pointer exposes the provenance of its target, and resolving it picks up exposed
/// provenance at the computed address. Memory that was filled by a byte copy has not been exposed
/// by anyone: call `expose_provenance` on a pointer to the new memory before dereferencing into it
/// through the unsafe accessors. [`Region`](crate::Region) does this for every buffer it holds.
///
/// # Examples
///
/// ```
/// use relative_ptr::RelativePointer;
///
/// struct Node {
///     this: RelativePointer<Node>,
/// }
///
/// let mut node = Node {
///     this: RelativePointer::null(),
/// };
/// let addr = &raw const node;
/// node.this.set(addr);
///
/// // Moving the node moves its self-reference along with it
/// let moved = Box::new(node);
/// assert!(moved.this == &raw const *moved);
/// ```
#[repr(transparent)]
#[derive(FromBytes, Immutable, KnownLayout)]
pub struct RelativePointer<T> {
    offset: i64,
    _marker: PhantomData<*mut T>,
}

const _: () = assert!(size_of::<RelativePointer<u64>>() == 8);
const _: () = assert!(align_of::<RelativePointer<u8>>() == align_of::<i64>());

// SAFETY: a relative pointer has the same sharing rules as a `&T`
unsafe impl<T: Sync> Send for RelativePointer<T> {}
unsafe impl<T: Sync> Sync for RelativePointer<T> {}

impl<T> RelativePointer<T> {
    /// Create a null pointer. Null is position independent and survives any move.
    #[inline]
    pub const fn null() -> Self {
        Self::from_offset(NULL_OFFSET)
    }

    /// Create a pointer from an already encoded offset.
    ///
    /// This is useful when laying out data at known positions, where the offset is
    /// `target_position - pointer_position`.
    #[inline]
    pub const fn from_offset(offset: i64) -> Self {
        Self {
            offset,
            _marker: PhantomData,
        }
    }

    /// Initialize `slot` to point at `target` and return the initialized pointer.
    ///
    /// The offset is computed relative to the address of `slot`, which is where the pointer lives
    /// from now on.
    pub fn init(slot: &mut MaybeUninit<Self>, target: *const T) -> &mut Self {
        let offset = encode(slot.as_ptr(), target);
        slot.write(Self::from_offset(offset))
    }

    /// Write a pointer to `target` into `out`.
    ///
    /// # Safety
    ///
    /// `out` must be valid for writes and properly aligned.
    pub unsafe fn emplace(target: *const T, out: *mut Self) {
        let offset = encode(out, target);
        // SAFETY: `out` is valid for writes per the contract of this function
        unsafe { out.write(Self::from_offset(offset)) };
    }

    /// The raw offset as stored in memory
    #[inline]
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Returns true if this pointer doesn't point anywhere.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.offset == NULL_OFFSET
    }

    /// Resolve the pointer relative to its current address.
    ///
    /// Returns a null pointer if the pointer is null. On 32-bit targets an offset outside of the
    /// `isize` range wraps around the address space; [`Region::resolve`](crate::Region::resolve)
    /// rejects such offsets instead.
    #[inline]
    pub fn get(&self) -> *mut T {
        if self.is_null() {
            ptr::null_mut()
        } else {
            let addr = ptr::from_ref(self)
                .addr()
                .wrapping_add_signed(self.offset as isize);
            ptr::with_exposed_provenance_mut(addr)
        }
    }

    /// Point at `target`, or at nothing if `target` is null.
    ///
    /// # Panics
    ///
    /// In debug builds, if `target` is exactly one byte past this pointer, which would encode as
    /// [`NULL_OFFSET`].
    #[inline]
    pub fn set(&mut self, target: *const T) {
        self.offset = encode(ptr::from_mut(self), target);
    }

    /// Point at the same address as `other`.
    ///
    /// The offset is re-encoded relative to `self`, so this is the way to copy a relative pointer
    /// to a different location.
    #[inline]
    pub fn assign(&mut self, other: &RelativePointer<T>) {
        self.set(other.get());
    }

    /// Returns a shared reference to the target, or `None` if the pointer is null.
    ///
    /// # Safety
    ///
    /// A non-null pointer must resolve to a valid, initialized `T` that is not mutated for the
    /// lifetime of the returned reference.
    #[inline]
    pub unsafe fn as_ref(&self) -> Option<&T> {
        // SAFETY: see the contract of this function
        unsafe { self.get().as_ref() }
    }

    /// Returns a mutable reference to the target, or `None` if the pointer is null.
    ///
    /// # Safety
    ///
    /// A non-null pointer must resolve to a valid, initialized `T` that is not aliased for the
    /// lifetime of the returned reference.
    #[inline]
    pub unsafe fn as_mut(&mut self) -> Option<&mut T> {
        // SAFETY: see the contract of this function
        unsafe { self.get().as_mut() }
    }

    /// Index the target like an array, without any bounds check.
    ///
    /// # Safety
    ///
    /// The pointer must be non-null and `index` must be in bounds of the array it points into.
    #[inline]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(!self.is_null(), "indexing a null relative pointer");
        // SAFETY: see the contract of this function
        unsafe { &*self.get().add(index) }
    }

    /// Mutably index the target like an array, without any bounds check.
    ///
    /// # Safety
    ///
    /// The pointer must be non-null, `index` must be in bounds of the array it points into and
    /// the element must not be aliased for the lifetime of the returned reference.
    #[inline]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(!self.is_null(), "indexing a null relative pointer");
        // SAFETY: see the contract of this function
        unsafe { &mut *self.get().add(index) }
    }
}

/// Encode `target` relative to `slot`
fn encode<S, T>(slot: *const S, target: *const T) -> i64 {
    if target.is_null() {
        return NULL_OFFSET;
    }

    let offset = (target.expose_provenance() as i64).wrapping_sub(slot.addr() as i64);
    debug_assert_ne!(
        offset, NULL_OFFSET,
        "target one byte past a relative pointer can't be distinguished from null"
    );
    offset
}

impl<T> Default for RelativePointer<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> PartialEq for RelativePointer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl<T> Eq for RelativePointer<T> {}

impl<T> PartialEq<*const T> for RelativePointer<T> {
    fn eq(&self, other: &*const T) -> bool {
        self.get().cast_const() == *other
    }
}

impl<T> PartialEq<*mut T> for RelativePointer<T> {
    fn eq(&self, other: &*mut T) -> bool {
        self.get() == *other
    }
}

impl<T> fmt::Debug for RelativePointer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelativePointer")
            .field("offset", &self.offset)
            .field("target", &self.get())
            .finish()
    }
}
