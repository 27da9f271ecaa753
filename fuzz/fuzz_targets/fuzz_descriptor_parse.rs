#![no_main]

use clickhouse_harness::client::redact;
use clickhouse_harness::Descriptor;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(descriptor) = Descriptor::parse(s) {
            assert!(!descriptor.primary.is_empty());
            let _ = descriptor.hosts().count();
        }
        let _ = redact(s);
    }
});
