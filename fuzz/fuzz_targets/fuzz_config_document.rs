//! Fuzz target: `ConfigDocument::parse`
//!
//! Arbitrary text is either rejected or yields a document whose every
//! domain has a name, its own gpio, a duration in (0, 60] and a
//! non-empty schedule if any.
//!
//! cargo fuzz run fuzz_config_document

#![no_main]

use irrigation::ConfigDocument;
use irrigation::config::{MAX_RUN_SECS, is_valid_domain_name};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(doc) = ConfigDocument::parse(text) else {
        return;
    };

    assert!(!doc.name.is_empty());
    for (i, d) in doc.domains.iter().enumerate() {
        assert!(is_valid_domain_name(&d.name));
        assert!(d.duration_secs > 0.0 && d.duration_secs <= MAX_RUN_SECS);
        if let Some(table) = &d.schedule {
            assert!(!table.is_empty());
        }
        assert!(
            doc.domains[..i].iter().all(|o| o.name != d.name),
            "duplicate domain accepted"
        );
        assert!(
            doc.domains[..i].iter().all(|o| o.actuator_id != d.actuator_id),
            "shared gpio accepted"
        );
    }
});
