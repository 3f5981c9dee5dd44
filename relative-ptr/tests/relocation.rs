use matches::assert_matches;
use pretty_assertions::assert_eq;
use rand::prelude::*;
use relative_ptr::{BaseSpan, Error, Region, RelativePointer, RelativeSpan, REGION_ALIGN};
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// A linked list node laid out without padding
#[repr(C)]
#[derive(FromBytes, Immutable, KnownLayout)]
struct Node {
    value: u32,
    flags: u32,
    next: RelativePointer<Node>,
}

/// The root of a small file: a list of nodes and a span of names
#[repr(C)]
#[derive(FromBytes, Immutable, KnownLayout)]
struct Header {
    head: RelativePointer<Node>,
    names: RelativeSpan<u8>,
    words: BaseSpan<u32>,
}

const HEADER_SIZE: usize = size_of::<Header>();
const NODE_SIZE: usize = size_of::<Node>();
const NODE_COUNT: usize = 5;
const NAMES: &[u8] = b"relocatable";
const WORDS: [u32; 3] = [0xDEAD, 0xBEEF, 0xCAFE];

fn nodes_offset() -> usize {
    HEADER_SIZE
}

fn names_offset() -> usize {
    nodes_offset() + NODE_COUNT * NODE_SIZE
}

fn words_offset() -> usize {
    (names_offset() + NAMES.len()).next_multiple_of(REGION_ALIGN)
}

fn build_region() -> Region<'static> {
    let len = words_offset() + size_of_val(&WORDS);
    let mut region = Region::zeroed(len);

    region
        .slice_mut::<u8>(names_offset(), NAMES.len())
        .unwrap()
        .copy_from_slice(NAMES);
    region
        .slice_mut::<u32>(words_offset(), WORDS.len())
        .unwrap()
        .copy_from_slice(&WORDS);

    let base = region.base();
    let node_at = |index: usize| base.wrapping_add(nodes_offset() + index * NODE_SIZE).cast();
    let names = base.wrapping_add(names_offset());
    let words = BaseSpan::new(
        words_offset() as u64,
        (words_offset() + size_of_val(&WORDS)) as u64,
    );

    for index in 0..NODE_COUNT {
        let slot = unsafe {
            region
                .slot_mut::<Node>(nodes_offset() + index * NODE_SIZE)
                .unwrap()
        };
        let node = slot.write(Node {
            value: index as u32 * 10,
            flags: 0,
            next: RelativePointer::null(),
        });
        if index + 1 < NODE_COUNT {
            node.next.set(node_at(index + 1));
        }
    }

    let slot = unsafe { region.slot_mut::<Header>(0).unwrap() };
    let header = slot.write(Header {
        head: RelativePointer::null(),
        names: RelativeSpan::new(),
        words,
    });
    header.head.set(node_at(0));
    header.names.set(names, NAMES.len());

    region
}

fn assert_region_contents(region: &Region<'_>) {
    let header = region.get::<Header>(0).unwrap();

    let mut values = Vec::new();
    let mut next = region.resolve(&header.head).unwrap();
    while let Some(node) = next {
        values.push(node.value);
        next = region.resolve(&node.next).unwrap();
    }
    assert_eq!(values, vec![0, 10, 20, 30, 40]);

    assert_eq!(region.resolve_span(&header.names).unwrap(), NAMES);
    assert_eq!(region.dereference(&header.words).unwrap(), &WORDS);

    // The unchecked accessors agree with the checked ones
    let names = unsafe { header.names.as_slice() };
    assert_eq!(names, NAMES);
    assert_eq!(
        unsafe { header.head.as_ref() }.unwrap().value,
        region.resolve(&header.head).unwrap().unwrap().value
    );
}

#[test]
fn build_and_read() {
    let region = build_region();
    assert_region_contents(&region);
}

#[test]
fn relocate_by_copy() {
    let region = build_region();
    let copy = region.relocated();
    assert_ne!(copy.base(), region.base());
    assert_region_contents(&copy);

    // The stored offsets are unchanged, only the base moved
    assert_eq!(copy.as_bytes(), region.as_bytes());
}

#[test]
fn relocate_to_random_offsets() {
    let region = build_region();
    let len = region.len();
    let mut rng = rand::rng();

    for _ in 0..32 {
        let shift = rng.random_range(0..512usize) * REGION_ALIGN;
        let mut host = Region::zeroed(shift + len + 64);
        host.as_mut_bytes().unwrap()[shift..shift + len].copy_from_slice(region.as_bytes());

        let view = Region::borrowed(&host.as_bytes()[shift..shift + len]).unwrap();
        assert_region_contents(&view);
    }
}

#[test]
fn relocate_through_file() {
    let region = build_region();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("list.bin");
    region.write_to_file(&path).unwrap();

    let loaded = Region::from_file(&path).unwrap();
    assert_region_contents(&loaded);
}

#[cfg(feature = "mmap")]
#[test]
fn relocate_through_mmap() {
    let region = build_region();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("list.bin");
    region.write_to_file(&path).unwrap();

    let mapped = unsafe { Region::from_file_mmap(&path).unwrap() };
    assert_region_contents(&mapped);
}

#[test]
fn truncated_region() {
    let region = build_region();
    // Cut off the last node and everything after it
    let cut = nodes_offset() + (NODE_COUNT - 1) * NODE_SIZE;
    let truncated = Region::from_bytes(&region.as_bytes()[..cut]);

    let header = truncated.get::<Header>(0).unwrap();
    assert_matches!(truncated.resolve_span(&header.names), Err(Error::DataOffset));
    assert_matches!(truncated.dereference(&header.words), Err(Error::DataOffset));

    let mut next = truncated.resolve(&header.head).unwrap();
    let mut seen = 0;
    let err = loop {
        match next {
            Some(node) => {
                seen += 1;
                match truncated.resolve(&node.next) {
                    Ok(node) => next = node,
                    Err(err) => break err,
                }
            }
            None => panic!("list ended before the cut"),
        }
    };
    assert_eq!(seen, NODE_COUNT - 1);
    assert_matches!(err, Error::DataOffset);
}

#[test]
fn self_referencing_struct_moves_freely() {
    struct Cycle {
        value: u64,
        this: RelativePointer<Cycle>,
    }

    let mut cycle = Cycle {
        value: 9,
        this: RelativePointer::null(),
    };
    let addr = &raw const cycle;
    cycle.this.set(addr);

    let mut boxed = Box::new(cycle);
    assert!(boxed.this == &raw const *boxed);

    let moved = std::mem::replace(
        &mut *boxed,
        Cycle {
            value: 0,
            this: RelativePointer::null(),
        },
    );
    let moved = vec![moved];
    let _ = moved.as_ptr().expose_provenance();
    assert!(moved[0].this == &raw const moved[0]);
    assert_eq!(unsafe { moved[0].this.as_ref() }.unwrap().value, 9);
}
