//! Command processor and terminal sessions end to end.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;

use irrigation::terminal::tcp::TcpLineServer;
use irrigation::terminal::{PROMPT, ScriptedTransport, Session, SessionEnd, SessionOptions};
use irrigation::{CommandProcessor, HELP_TEXT, Reply};

use crate::mock_hw::{
    CONFIG_PATH, HERBS_AND_SUCCULENTS, HERBS_ONLY, Harness, ScaledDelay, configured, harness,
};

fn processor(h: &Harness) -> CommandProcessor<ScaledDelay> {
    CommandProcessor::new(h.system.clone(), 60.0)
}

fn text(reply: Reply) -> String {
    match reply {
        Reply::Text(t) => t,
        Reply::Close => panic!("unexpected close"),
    }
}

// ── Processor ─────────────────────────────────────────────────

#[test]
fn update_then_info_then_print_config() {
    let h = configured(HERBS_ONLY);
    let p = processor(&h);

    let reply = text(p.handle_line(&format!("update_config {HERBS_AND_SUCCULENTS}")));
    assert_eq!(reply, format!("Successfully updated configuration and saved to {CONFIG_PATH}"));

    let info = text(p.handle_line("info"));
    assert!(info.contains("There are 2 watering domains configured:"), "{info}");
    assert!(info.contains(
        " * Domain \"succulents\" is using GPIO 1 and has a watering duration of 2 seconds"
    ));

    assert_eq!(text(p.handle_line("print_config")), HERBS_AND_SUCCULENTS);
}

#[test]
fn info_report_layout() {
    let h = configured(
        r#"{"name":"Garden","domains":[{"name":"herbs","gpio":0,"duration":5,
        "schedule":[{"weekday":"SUN","times":["15:34","06:00"]},{"weekday":"MON","times":["07:15"]}]}]}"#,
    );
    let p = processor(&h);
    p.handle_line("water herbs 1");
    assert_eq!(
        text(p.handle_line("info")),
        "Name: Garden\n\
         Configuration file: config.json\n\
         There are 1 watering domains configured:\n \
         * Domain \"herbs\" is using GPIO 0 and has a watering duration of 5 seconds\n  \
         * Last watered: SUN 10-18-2026 @ 15:34\n  \
         * Watering Schedule\n   \
         * MON @ 07:15\n   \
         * SUN @ 06:00,15:34"
    );
}

#[test]
fn water_duration_out_of_range_never_actuates() {
    let h = configured(HERBS_AND_SUCCULENTS);
    let p = processor(&h);
    assert_eq!(
        text(p.handle_line("water herbs 61")),
        "Error: watering duration must be between 0 and 60 seconds"
    );
    assert!(h.relays.calls().is_empty());
    assert!(h.system.domain("herbs").unwrap().last_fired().is_none());
}

#[test]
fn water_with_duration_confirms_and_honours_it() {
    let h = configured(HERBS_AND_SUCCULENTS);
    let p = processor(&h);
    let reply = text(p.handle_line("water herbs 5"));
    assert!(reply.contains("herbs"));
    assert_eq!(reply, "Watered domain \"herbs\" on SUN 10-18-2026 @ 15:34");
    assert_eq!(h.delay.total_ms(), 5_000);
    assert_eq!(h.relays.calls(), vec![(0, true), (0, false)]);
}

#[test]
fn bad_input_falls_through_to_invalid_command() {
    let h = configured(HERBS_AND_SUCCULENTS);
    let p = processor(&h);
    for line in [
        "WATER herbs",
        "water",
        "water her/bs",
        "water herbs five",
        "water herbs 5 6",
        "info now",
        "update_time 13/01/2026 10:00",
        "update_time 02/30/2026 10:00",
        "update_time 1/1/2026 1:00",
        "update_config",
        "dance",
    ] {
        assert_eq!(text(p.handle_line(line)), "Invalid command, try again", "{line}");
    }
    assert!(h.relays.calls().is_empty());
}

#[test]
fn unconfigured_views() {
    let h = harness();
    let p = processor(&h);
    let not_configured = "Watering system is not configured yet.  Please run update_config.";
    assert_eq!(text(p.handle_line("info")), not_configured);
    assert_eq!(text(p.handle_line("print_config")), not_configured);
    assert_eq!(
        text(p.handle_line("water herbs")),
        "There is no domain \"herbs\" defined in the watering system"
    );
}

#[test]
fn failed_update_reports_generic_failure() {
    let h = configured(HERBS_ONLY);
    let p = processor(&h);
    assert_eq!(
        text(p.handle_line(r#"update_config {"name":"","domains":[]}"#)),
        "Failed to update configuration"
    );
    assert_eq!(text(p.handle_line("print_config")), HERBS_ONLY);
}

#[test]
fn time_commands() {
    let h = configured(HERBS_ONLY);
    let p = processor(&h);
    assert_eq!(text(p.handle_line("print_time")), "Current Time: SUN Oct 18, 2026 15:34");
    assert_eq!(
        text(p.handle_line("update_time 02/29/2028 07:05")),
        "Time updated to: TUE Feb 29, 2028 07:05"
    );
    assert_eq!(text(p.handle_line("print_time")), "Current Time: TUE Feb 29, 2028 07:05");
}

#[test]
fn history_lists_runs_oldest_first() {
    let h = configured(HERBS_AND_SUCCULENTS);
    let p = processor(&h);
    assert_eq!(text(p.handle_line("history")), "No watering history recorded yet");
    p.handle_line("water herbs 1");
    h.clock.set_to(2026, 10, 18, 15, 40);
    p.handle_line("water succulents");
    assert_eq!(
        text(p.handle_line("history")),
        "Watered domain \"herbs\" on SUN 10-18-2026 @ 15:34\n\
         Watered domain \"succulents\" on SUN 10-18-2026 @ 15:40"
    );
}

#[test]
fn help_and_quit() {
    let h = harness();
    let p = processor(&h);
    assert_eq!(text(p.handle_line("help")), HELP_TEXT);
    assert_eq!(p.handle_line("quit"), Reply::Close);
    assert_eq!(p.handle_line("  quit  "), Reply::Close);
}

// ── Sessions ──────────────────────────────────────────────────

#[test]
fn scripted_session_end_to_end() {
    let h = configured(HERBS_ONLY);
    let script = format!(
        "update_config {HERBS_AND_SUCCULENTS}\r\ninfo\r\nprint_config\r\nwater herbs 61\r\nquit\r\nwater herbs\r\n"
    );
    let opts = SessionOptions {
        version: "2.1.0".into(),
        ..SessionOptions::default()
    };
    let mut session = Session::new(ScriptedTransport::new([script]), processor(&h), opts);
    assert_eq!(session.run().unwrap(), SessionEnd::Quit);

    let out = session.into_transport().output_text();
    let after_prompt = out.split_once(&format!("{PROMPT}\n")).unwrap().1;
    let lines: Vec<&str> = after_prompt.lines().collect();
    assert_eq!(lines[0], "Successfully updated configuration and saved to config.json");
    assert!(lines.iter().any(|l| l.contains("Domain \"succulents\"")));
    assert!(lines.contains(&HERBS_AND_SUCCULENTS));
    assert_eq!(
        lines.last(),
        Some(&"Error: watering duration must be between 0 and 60 seconds")
    );
    // Nothing after quit was executed.
    assert!(h.relays.calls().is_empty());
}

#[test]
fn tcp_clients_share_one_system() {
    let h = configured(HERBS_AND_SUCCULENTS);
    let opts = SessionOptions {
        version: "test".into(),
        ..SessionOptions::default()
    };
    let server = TcpLineServer::bind_addr("127.0.0.1:0", processor(&h), opts).unwrap();
    let addr = server.local_addr().unwrap();

    let client = |cmd: &'static str| {
        std::thread::spawn(move || {
            let stream = TcpStream::connect(addr).unwrap();
            let mut writer = stream.try_clone().unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            while !line.starts_with("Enter a command") {
                line.clear();
                reader.read_line(&mut line).unwrap();
            }
            writer.write_all(format!("{cmd}\nquit\n").as_bytes()).unwrap();
            line.clear();
            reader.read_line(&mut line).unwrap();
            line.trim_end().to_string()
        })
    };

    let a = client("water herbs 10");
    let first = server.accept_one().unwrap().unwrap();
    let b = client("water herbs 10");
    let second = server.accept_one().unwrap().unwrap();

    for reply in [a.join().unwrap(), b.join().unwrap()] {
        assert!(reply.starts_with("Watered domain \"herbs\""), "{reply}");
    }
    first.join().unwrap();
    second.join().unwrap();
    assert!(!h.relays.overlapped());
    assert_eq!(h.system.history().len(), 2);
}
