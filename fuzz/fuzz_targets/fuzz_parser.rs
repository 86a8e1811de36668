#![no_main]

use jsonpb::{DynamicMessageSink, Parser, ParserOptions};
use libfuzzer_sys::fuzz_target;
use prost_reflect::MessageDescriptor;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn parser(data: &[u8]) {
    if data.len() < 6 {
        return;
    }

    let flags = data[0];
    let split_seed = u32::from_le_bytes(data[1..5].try_into().unwrap()) as u64;
    let target_index = data[5];
    let data = &data[6..];
    if data.is_empty() {
        return;
    }

    let targets = jsonpb::fuzzing::fuzz_targets();
    let target: &MessageDescriptor = &targets[target_index as usize % targets.len()];

    let options = ParserOptions::default()
        .with_ignore_unknown_fields(flags & 1 != 0)
        .with_accept_proto_field_names(flags & 2 != 0)
        .with_max_depth(if flags & 4 != 0 { 4 } else { 100 });

    let mut parser = Parser::new(target.clone(), DynamicMessageSink::new(), options);
    for chunk in split_into_safe_chunks(data, split_seed) {
        if parser.feed(chunk).is_err() {
            return;
        }
    }
    let _ = parser.finish();
}

fuzz_target!(|data: &[u8]| parser(data));

/// Splits a byte slice into a pseudo-random sequence of non-empty chunks, so
/// the same input exercises many different chunk-boundary placements across
/// fuzzing runs instead of only ever being fed in one piece.
fn split_into_safe_chunks(data: &[u8], split_seed: u64) -> Vec<&[u8]> {
    let mut rng = SmallRng::seed_from_u64(split_seed);
    let mut chunks = Vec::new();
    let mut start = 0;
    let len = data.len();
    while start < len {
        let remaining = len - start;
        let size = rng.random_range(1..=remaining);
        chunks.push(&data[start..start + size]);
        start += size;
    }
    chunks
}
