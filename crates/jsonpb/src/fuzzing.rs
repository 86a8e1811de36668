//! Internals exposed only for the `fuzz/` crate: a descriptor pool built
//! from the same test schema the unit tests use, so a fuzz target can drive
//! [`crate::Parser`] against real field kinds (nested messages, maps,
//! well-known types) instead of a single trivial message shape.

use prost_reflect::{DescriptorPool, MessageDescriptor};

fn pool() -> DescriptorPool {
    let bytes = include_bytes!(concat!(env!("OUT_DIR"), "/test_messages.bin"));
    DescriptorPool::decode(bytes.as_ref()).expect("embedded test descriptor set is well-formed")
}

/// Descriptors of every top-level test message, for a fuzz target to pick
/// from at random.
#[must_use]
pub fn fuzz_targets() -> Vec<MessageDescriptor> {
    let pool = pool();
    [
        "jsonpb.test.Scalars",
        "jsonpb.test.WithMap",
        "jsonpb.test.WithWellKnown",
        "jsonpb.test.WithNested",
        "jsonpb.test.WithWrappers",
    ]
    .iter()
    .map(|name| {
        pool.get_message_by_name(name)
            .unwrap_or_else(|| panic!("missing test message {name}"))
    })
    .collect()
}
