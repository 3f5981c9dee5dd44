use crate::base::BaseSpan;
use crate::error::{Error, Result};
use crate::pointer::RelativePointer;
use crate::span::RelativeSpan;
use log::{debug, trace};
use std::fmt;
use std::io::Read;
use std::mem::MaybeUninit;
use std::path::Path;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// The alignment every region base is guaranteed to have
pub const REGION_ALIGN: usize = align_of::<u64>();

/// Heap bytes with the alignment of `u64`
pub(crate) struct AlignedBytes {
    words: Vec<u64>,
    len: usize,
}

impl AlignedBytes {
    fn zeroed(len: usize) -> Self {
        let mut words = vec![0; len.div_ceil(size_of::<u64>())];
        // Relative pointers into the buffer resolve through its exposed provenance
        let _ = words.as_mut_ptr().expose_provenance();
        Self { words, len }
    }

    fn copy_from(bytes: &[u8]) -> Self {
        let mut this = Self::zeroed(bytes.len());
        this.as_mut_bytes().copy_from_slice(bytes);
        this
    }

    fn as_bytes(&self) -> &[u8] {
        &self.words.as_bytes()[..self.len]
    }

    fn as_mut_bytes(&mut self) -> &mut [u8] {
        let len = self.len;
        &mut self.words.as_mut_bytes()[..len]
    }
}

pub(crate) enum Data<'a> {
    Owned(AlignedBytes),
    Borrowed(&'a [u8]),
    #[cfg(feature = "mmap")]
    Mmap(memmap2::Mmap),
}

impl AsRef<[u8]> for Data<'_> {
    fn as_ref(&self) -> &[u8] {
        match self {
            Data::Owned(bytes) => bytes.as_bytes(),
            Data::Borrowed(bytes) => *bytes,
            #[cfg(feature = "mmap")]
            Data::Mmap(mmap) => mmap.as_ref(),
        }
    }
}

/// A block of bytes placed at some base address.
///
/// Relative pointers and spans stored inside a region stay valid however the bytes got there: a
/// copy, a file read, or a memory map. The base is always aligned to [`REGION_ALIGN`].
///
/// Typed access is checked: reading a value past the end of the region returns
/// [`Error::DataOffset`] and reading it from a misaligned offset returns
/// [`Error::DataAlignment`]. The `resolve` methods apply the same checks to the targets of
/// relative pointers, which makes them suitable for data from untrusted files.
///
/// Every region exposes the provenance of its buffer when it is created, so the unsafe accessors
/// of pointers and spans stored inside it may be used on the region's contents.
///
/// # Examples
///
/// Write a region to disk and load it back
///
/// ```
/// use relative_ptr::{Region, RelativePointer};
///
/// let mut region = Region::zeroed(16);
/// region.slice_mut::<u32>(8, 1).unwrap()[0] = 0xC0FFEE;
/// let target = region.base().wrapping_add(8).cast::<u32>();
/// let slot = unsafe { region.slot_mut::<RelativePointer<u32>>(0).unwrap() };
/// RelativePointer::init(slot, target);
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("region.bin");
/// region.write_to_file(&path).unwrap();
///
/// let loaded = Region::from_file(&path).unwrap();
/// let pointer = loaded.get::<RelativePointer<u32>>(0).unwrap();
/// assert_eq!(loaded.resolve(pointer).unwrap(), Some(&0xC0FFEE));
/// ```
pub struct Region<'a> {
    data: Data<'a>,
}

impl<'a> Region<'a> {
    /// Create a writable region of `len` zero bytes
    pub fn zeroed(len: usize) -> Self {
        Self {
            data: Data::Owned(AlignedBytes::zeroed(len)),
        }
    }

    /// Copy `bytes` into a new writable region
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: Data::Owned(AlignedBytes::copy_from(bytes)),
        }
    }

    /// Use `bytes` in place as a read-only region.
    ///
    /// Returns [`Error::DataAlignment`] if `bytes` doesn't start at a multiple of
    /// [`REGION_ALIGN`].
    pub fn borrowed(bytes: &'a [u8]) -> Result<Self> {
        if bytes.as_ptr().addr() % REGION_ALIGN != 0 {
            return Err(Error::DataAlignment);
        }

        let _ = bytes.as_ptr().expose_provenance();
        Ok(Self {
            data: Data::Borrowed(bytes),
        })
    }

    /// Read a file into a new writable region
    pub fn from_file(filename: &Path) -> Result<Self> {
        let mut file =
            std::fs::File::open(filename).map_err(Error::from_io_with_filename(filename))?;
        let len = file
            .metadata()
            .map_err(Error::from_io_with_filename(filename))?
            .len();
        let mut data = AlignedBytes::zeroed(usize::try_from(len)?);
        file.read_exact(data.as_mut_bytes())
            .map_err(Error::from_io_with_filename(filename))?;

        debug!("Read {} bytes from '{}'", len, filename.display());
        Ok(Self {
            data: Data::Owned(data),
        })
    }

    /// Open a file and `mmap` it into memory as a read-only region.
    ///
    /// # Safety
    ///
    /// This is marked unsafe as the file could be modified on-disk while the mmap is active.
    /// This will cause undefined behavior. You must make sure to employ your own locking and to
    /// reload the file yourself when any modification occurs.
    #[cfg(feature = "mmap")]
    pub unsafe fn from_file_mmap(filename: &Path) -> Result<Self> {
        let file = std::fs::File::open(filename).map_err(Error::from_io_with_filename(filename))?;
        // SAFETY: see the contract of this function
        let mmap = unsafe { memmap2::Mmap::map(&file) }
            .map_err(Error::from_io_with_filename(filename))?;
        let _ = mmap.as_ptr().expose_provenance();

        debug!(
            "Mapped {} bytes of '{}' at {:p}",
            mmap.len(),
            filename.display(),
            mmap.as_ptr()
        );
        Ok(Self {
            data: Data::Mmap(mmap),
        })
    }

    /// Write the contents of the region to a file
    pub fn write_to_file(&self, filename: &Path) -> Result<()> {
        std::fs::write(filename, self.as_bytes())
            .map_err(Error::from_io_with_filename(filename))?;
        debug!("Wrote {} bytes to '{}'", self.len(), filename.display());
        Ok(())
    }

    /// Copy the contents into a new writable region at a different address
    pub fn relocated(&self) -> Region<'static> {
        Region::from_bytes(self.as_bytes())
    }

    /// The contents of the region
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// The contents of the region for writing.
    ///
    /// Returns [`Error::ReadOnly`] for borrowed and memory-mapped regions.
    pub fn as_mut_bytes(&mut self) -> Result<&mut [u8]> {
        match &mut self.data {
            Data::Owned(bytes) => Ok(bytes.as_mut_bytes()),
            _ => Err(Error::ReadOnly),
        }
    }

    /// Returns true if the contents can be modified
    pub fn is_writable(&self) -> bool {
        matches!(self.data, Data::Owned(_))
    }

    /// Size of the region in bytes
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns true if the region has no bytes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The address of the first byte
    pub fn base(&self) -> *const u8 {
        self.as_bytes().as_ptr()
    }

    /// The byte offset of `ptr` from the base. The end of the region is a valid offset.
    pub fn offset_of<T>(&self, ptr: *const T) -> Result<usize> {
        ptr.addr()
            .checked_sub(self.base().addr())
            .filter(|offset| *offset <= self.len())
            .ok_or_else(|| {
                trace!("{:p} is outside of the region at {:p}", ptr, self.base());
                Error::DataOffset
            })
    }

    /// Read a `T` at `offset`
    pub fn get<T: FromBytes + KnownLayout + Immutable>(&self, offset: usize) -> Result<&T> {
        let bytes = self.as_bytes().get(offset..).ok_or(Error::DataOffset)?;
        let (value, _) = T::ref_from_prefix(bytes)?;
        Ok(value)
    }

    /// Read `count` elements of `T` starting at `offset`
    pub fn slice<T: FromBytes + Immutable>(&self, offset: usize, count: usize) -> Result<&[T]> {
        let bytes = self.as_bytes().get(offset..).ok_or(Error::DataOffset)?;
        let (elements, _) = <[T]>::ref_from_prefix_with_elems(bytes, count)?;
        Ok(elements)
    }

    /// Mutable access to `count` elements of `T` starting at `offset`
    pub fn slice_mut<T: FromBytes + IntoBytes>(
        &mut self,
        offset: usize,
        count: usize,
    ) -> Result<&mut [T]> {
        let bytes = self
            .as_mut_bytes()?
            .get_mut(offset..)
            .ok_or(Error::DataOffset)?;
        let (elements, _) = <[T]>::mut_from_prefix_with_elems(bytes, count)?;
        Ok(elements)
    }

    /// Uninitialized storage for a `T` at `offset`, to build values in place.
    ///
    /// Relative pointers and spans must be written where they will live, so this is how they get
    /// into a region: `RelativePointer::init(region.slot_mut(offset)?, target)`.
    ///
    /// # Safety
    ///
    /// The value written to the slot must not contain padding or other uninitialized bytes, as
    /// they would become readable through [`as_bytes`](Self::as_bytes).
    pub unsafe fn slot_mut<T>(&mut self, offset: usize) -> Result<&mut MaybeUninit<T>> {
        let end = offset
            .checked_add(size_of::<T>())
            .ok_or(Error::DataOffset)?;
        let bytes = self
            .as_mut_bytes()?
            .get_mut(offset..end)
            .ok_or(Error::DataOffset)?;
        let slot = bytes.as_mut_ptr().cast::<MaybeUninit<T>>();
        if !slot.is_aligned() {
            return Err(Error::DataAlignment);
        }

        // SAFETY: the slot is in bounds and aligned, and any bytes are a valid `MaybeUninit`
        Ok(unsafe { &mut *slot })
    }

    /// The offset of the target of a non-null `pointer` inside the region
    fn target_offset<T>(&self, pointer: &RelativePointer<T>) -> Result<usize> {
        // Offsets outside of the address space would wrap when resolved
        if isize::try_from(pointer.offset()).is_err() {
            trace!("Offset {} doesn't fit the address space", pointer.offset());
            return Err(Error::DataOffset);
        }

        self.offset_of(pointer.get())
    }

    /// Resolve `pointer` and check that its target lies entirely inside the region.
    ///
    /// Returns `Ok(None)` for a null pointer.
    pub fn resolve<T: FromBytes + KnownLayout + Immutable>(
        &self,
        pointer: &RelativePointer<T>,
    ) -> Result<Option<&T>> {
        if pointer.is_null() {
            return Ok(None);
        }

        let offset = self.target_offset(pointer)?;
        self.get(offset).map(Some)
    }

    /// Resolve `span` and check that all of its elements lie inside the region.
    ///
    /// An empty span resolves to an empty slice, whatever its base.
    pub fn resolve_span<T: FromBytes + Immutable>(&self, span: &RelativeSpan<T>) -> Result<&[T]> {
        if span.is_empty() {
            return Ok(&[]);
        }

        let len = usize::try_from(span.raw_len())?;
        let offset = self.target_offset(span.pointer())?;
        self.slice(offset, len)
    }

    /// Dereference a base-relative span against the start of this region.
    ///
    /// Trailing bytes that don't make up a whole element are ignored, like in
    /// [`BaseSpan::len`].
    pub fn dereference<T: FromBytes + Immutable>(&self, span: &BaseSpan<T>) -> Result<&[T]> {
        let start = usize::try_from(span.start())?;
        let end = usize::try_from(span.end())?;

        if start > end {
            Err(Error::DataOffset)
        } else {
            let bytes = self.as_bytes().get(start..end).ok_or(Error::DataOffset)?;
            let count = bytes.len().checked_div(size_of::<T>()).unwrap_or(0);
            let (elements, _) = <[T]>::ref_from_prefix_with_elems(bytes, count)?;
            Ok(elements)
        }
    }

    /// Measure `elements` from the start of this region
    pub fn base_span<T>(&self, elements: &[T]) -> BaseSpan<T> {
        BaseSpan::from_slice(self.base(), elements)
    }
}

impl fmt::Debug for Region<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("base", &self.base())
            .field("len", &self.len())
            .field("writable", &self.is_writable())
            .finish()
    }
}
