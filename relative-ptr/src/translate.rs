use crate::pointer::RelativePointer;
use crate::span::RelativeSpan;
use std::ptr;

/// Compute where a resolved address would be if its region were placed at another base.
///
/// Self-relative resolution needs no help when a pointer moves together with its target. This is
/// the other case: the resolved address belongs to a region that was copied or mapped elsewhere
/// *without* the pointer, for example an index kept outside of a file that has been reloaded at
/// a new address.
///
/// Translation is a pure computation. It doesn't modify the pointer and doesn't dereference
/// anything.
///
/// # Examples
///
/// ```
/// use relative_ptr::{RelativePointer, Translate};
///
/// let old = [1u32, 2, 3];
/// let new = [1u32, 2, 3];
///
/// let mut pointer = RelativePointer::<u32>::null();
/// pointer.set(&old[2]);
///
/// let translated = pointer.translate(old.as_ptr().cast(), new.as_ptr().cast());
/// assert_eq!(translated.cast_const(), &raw const new[2]);
/// ```
pub trait Translate {
    /// The resolved pointer type
    type Output;

    /// Resolve, then move the result from `src_base` to `dst_base`.
    fn translate(&self, src_base: *const u8, dst_base: *const u8) -> Self::Output;
}

/// Move `ptr` from `src_base` to `dst_base`, keeping its distance from the base.
///
/// A null pointer stays null.
pub fn translate_ptr<T>(ptr: *mut T, src_base: *const u8, dst_base: *const u8) -> *mut T {
    if ptr.is_null() {
        return ptr;
    }

    let distance = ptr.addr().wrapping_sub(src_base.addr());
    dst_base.cast_mut().wrapping_add(distance).cast()
}

impl<T> Translate for RelativePointer<T> {
    type Output = *mut T;

    fn translate(&self, src_base: *const u8, dst_base: *const u8) -> *mut T {
        translate_ptr(self.get(), src_base, dst_base)
    }
}

impl<T> Translate for RelativeSpan<T> {
    type Output = *mut [T];

    fn translate(&self, src_base: *const u8, dst_base: *const u8) -> *mut [T] {
        ptr::slice_from_raw_parts_mut(translate_ptr(self.data(), src_base, dst_base), self.len())
    }
}
