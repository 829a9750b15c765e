//! Fuzz target: `LineDecoder::feed`
//!
//! Drives arbitrary bytes into the terminal line decoder and asserts that
//! every yielded line is terminator-free and bounded, that an overlong
//! line only reports its first word, and that splitting the input never
//! changes the result.
//!
//! cargo fuzz run fuzz_line_decoder

#![no_main]

use irrigation::terminal::codec::{Line, LineDecoder, MAX_LINE_LEN};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut whole = LineDecoder::new();
    let lines = whole.feed(data);
    for line in &lines {
        let text = match line {
            Line::Text(text) => text,
            Line::Overflow { keyword } => {
                assert!(!keyword.contains(char::is_whitespace), "keyword spans words");
                keyword
            }
        };
        // Lossy UTF-8 replacement can grow a byte to three.
        assert!(text.len() <= MAX_LINE_LEN * 3, "line exceeds bound");
        assert!(!text.contains(['\r', '\n']), "terminator leaked into line");
    }

    let mid = data.len() / 2;
    let mut split = LineDecoder::new();
    let mut again = split.feed(&data[..mid]);
    again.extend(split.feed(&data[mid..]));
    assert_eq!(again, lines, "chunking changed the decoded lines");
});
