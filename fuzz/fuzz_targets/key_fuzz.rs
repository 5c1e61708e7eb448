//! Fuzz test for the sequence key builder
//!
//! Checks that any (graph id, sequence id) pair survives a build/parse
//! round trip and that parsing arbitrary text never panics.
//!
//! Run with: cargo +nightly fuzz run key_fuzz -- -max_total_time=60

#![no_main]

use graphcache_storage::SequenceKeyBuilder;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let keys = SequenceKeyBuilder::default();
    let _ = keys.parse(input);

    // A NUL splits the input into the two ids
    let (graph_id, sequence_id) = input.split_once('\0').unwrap_or(("", input));
    let key = keys.sequence_key(graph_id, sequence_id);
    assert_eq!(keys.parse(&key), Some((graph_id, sequence_id)));
});
