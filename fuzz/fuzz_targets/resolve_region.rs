#![no_main]

use libfuzzer_sys::{fuzz_target, Corpus};
use relative_ptr::{BaseSpan, Region, RelativePointer, RelativeSpan};

/// Follow a chain of pointers stored at the start of the region
fn fuzz_pointer_chain(region: &Region<'_>, limit: usize) -> bool {
    let Ok(mut pointer) = region.get::<RelativePointer<RelativePointer<u8>>>(0) else {
        return false;
    };

    let mut keep = false;
    for _ in 0..limit {
        match region.resolve(pointer) {
            Ok(Some(next)) => {
                keep = true;
                let _ = region.resolve(next);
                // Reinterpret the target as another link of the chain
                let Ok(offset) = region.offset_of(std::ptr::from_ref(next)) else {
                    break;
                };
                let Ok(link) = region.get(offset) else {
                    break;
                };
                pointer = link;
            }
            Ok(None) | Err(_) => break,
        }
    }

    keep
}

fuzz_target!(|data: &[u8]| -> Corpus {
    let region = Region::from_bytes(data);
    let mut keep = false;

    if let Ok(span) = region.get::<RelativeSpan<u32>>(0) {
        if let Ok(values) = region.resolve_span(span) {
            std::hint::black_box(values.iter().fold(0u32, |acc, v| acc.wrapping_add(*v)));
            keep |= !values.is_empty();
        }
    }

    if let Ok(span) = region.get::<BaseSpan<u64>>(0) {
        keep |= region.dereference(span).is_ok();
    }

    keep |= fuzz_pointer_chain(&region, 8);

    if keep {
        Corpus::Keep
    } else {
        Corpus::Reject
    }
});
