//! Fuzz target: `Command::parse`
//!
//! Any line must parse or be refused without panicking.  Accepted
//! `water` overrides always sit inside the configured bound.
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use irrigation::Command;
use libfuzzer_sys::fuzz_target;

const MAX_SECS: f32 = 60.0;

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);
    match Command::parse(&line, MAX_SECS) {
        Ok(Command::Water {
            domain,
            duration_secs,
        }) => {
            assert!(!domain.is_empty());
            if let Some(secs) = duration_secs {
                assert!(secs > 0.0 && secs <= MAX_SECS, "duration {secs} accepted");
            }
        }
        Ok(Command::UpdateConfig(doc)) => assert!(!doc.is_empty()),
        Ok(_) | Err(_) => {}
    }
});
