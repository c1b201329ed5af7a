// tests/matching_properties.rs
use std::time::Duration;

use proptest::prelude::*;

use procset::supervisor::ProcessInfo;
use procset::types::{parse_duration, Action};

fn process(cmdline: String, name: String) -> ProcessInfo {
    ProcessInfo {
        pid: 42,
        name,
        cmdline,
        start_time: 0,
    }
}

proptest! {
    /// Any command line that embeds the pattern matches, wherever it sits.
    #[test]
    fn embedded_pattern_always_matches(
        prefix in "[ -~]{0,20}",
        pattern in "[a-z][a-z-]{0,15}",
        suffix in "[ -~]{0,20}",
    ) {
        let info = process(format!("{prefix}{pattern}{suffix}"), "sh".to_string());
        prop_assert!(info.matches(&pattern));
    }

    /// A readable command line wins over the process name.
    #[test]
    fn name_is_ignored_when_command_line_is_known(
        cmdline in "[a-z ]{1,20}",
        name in "[A-Z]{1,10}",
    ) {
        let info = process(cmdline.clone(), name.clone());
        prop_assert!(!info.matches(&name));
        prop_assert_eq!(info.label(), cmdline.as_str());
    }

    #[test]
    fn name_is_matched_when_command_line_is_empty(name in "[a-z-]{1,15}") {
        let info = process(String::new(), name.clone());
        prop_assert!(info.matches(&name));
        prop_assert_eq!(info.label(), name.as_str());
    }

    #[test]
    fn durations_parse_for_every_unit(value in 0u64..100_000) {
        prop_assert_eq!(parse_duration(&format!("{value}ms")), Ok(Duration::from_millis(value)));
        prop_assert_eq!(parse_duration(&format!("{value}s")), Ok(Duration::from_secs(value)));
        prop_assert_eq!(parse_duration(&format!("{value}m")), Ok(Duration::from_secs(value * 60)));
        prop_assert_eq!(parse_duration(&format!(" {value}h ")), Ok(Duration::from_secs(value * 3600)));
    }

    #[test]
    fn bare_numbers_are_rejected(value in 0u64..1_000_000) {
        let err = parse_duration(&value.to_string()).unwrap_err();
        prop_assert!(err.contains("unit"));
    }

    /// Only `start` and `stop` are actions; everything else is a no-op mode.
    #[test]
    fn only_two_modes_are_recognised(mode in "[a-zA-Z]{0,12}") {
        let expected = match mode.to_lowercase().as_str() {
            "start" => Some(Action::Start),
            "stop" => Some(Action::Stop),
            _ => None,
        };
        prop_assert_eq!(Action::parse(&mode), expected);
    }
}
