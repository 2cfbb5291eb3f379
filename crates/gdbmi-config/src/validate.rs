use crate::config::Config;
use crate::error::ConfigError;

const SHUTDOWN_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=300;
const EVENT_CAPACITY_RANGE: std::ops::RangeInclusive<usize> = 1..=65536;

/// Validate a [`Config`], returning every violation found.
pub fn validate(config: &Config) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.debugger.program.trim().is_empty() {
        errors.push(ConfigError::invalid("debugger.program", "must not be empty"));
    }

    if !selects_mi_interpreter(&config.debugger.args) {
        errors.push(ConfigError::invalid(
            "debugger.args",
            "must select an MI interpreter (--interpreter=mi or -i mi)",
        ));
    }

    let timeout = config.debugger.shutdown_timeout_secs;
    if !SHUTDOWN_TIMEOUT_RANGE.contains(&timeout) {
        errors.push(ConfigError::invalid(
            "debugger.shutdown_timeout_secs",
            format!("must be 1\u{2013}300, got {timeout}"),
        ));
    }

    let capacity = config.session.event_capacity;
    if !EVENT_CAPACITY_RANGE.contains(&capacity) {
        errors.push(ConfigError::invalid(
            "session.event_capacity",
            format!("must be 1\u{2013}65536, got {capacity}"),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Whether `args` contains `--interpreter=mi*`, `--interpreter mi*` or `-i mi*`.
fn selects_mi_interpreter(args: &[String]) -> bool {
    args.iter().enumerate().any(|(i, arg)| {
        if let Some(name) = arg.strip_prefix("--interpreter=") {
            return name.starts_with("mi");
        }
        if arg == "-i" || arg == "--interpreter" {
            return args.get(i + 1).is_some_and(|name| name.starts_with("mi"));
        }
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn valid_default_config_passes() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn empty_program_rejected() {
        let mut cfg = Config::default();
        cfg.debugger.program = "  ".into();
        let errs = validate(&cfg).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(errs[0].to_string().contains("debugger.program"));
    }

    #[test]
    fn interpreter_forms_accepted() {
        assert!(selects_mi_interpreter(&args(&["--interpreter=mi2"])));
        assert!(selects_mi_interpreter(&args(&["-q", "-i", "mi"])));
        assert!(selects_mi_interpreter(&args(&["--interpreter", "mi3"])));
    }

    #[test]
    fn missing_interpreter_rejected() {
        assert!(!selects_mi_interpreter(&args(&["--quiet"])));
        assert!(!selects_mi_interpreter(&args(&["--interpreter=console"])));
        assert!(!selects_mi_interpreter(&args(&["-i"])));

        let mut cfg = Config::default();
        cfg.debugger.args = args(&["--nx"]);
        let errs = validate(&cfg).unwrap_err();
        assert!(errs[0].to_string().contains("debugger.args"));
    }

    #[test]
    fn shutdown_timeout_bounds() {
        let mut cfg = Config::default();
        cfg.debugger.shutdown_timeout_secs = 0;
        assert!(validate(&cfg).is_err());
        cfg.debugger.shutdown_timeout_secs = 301;
        assert!(validate(&cfg).is_err());
        cfg.debugger.shutdown_timeout_secs = 300;
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn event_capacity_bounds() {
        let mut cfg = Config::default();
        cfg.session.event_capacity = 0;
        let errs = validate(&cfg).unwrap_err();
        assert!(errs[0].to_string().contains("session.event_capacity"));
        cfg.session.event_capacity = 65536;
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn multiple_errors_returned() {
        let mut cfg = Config::default();
        cfg.debugger.program = String::new();
        cfg.debugger.args.clear();
        cfg.debugger.shutdown_timeout_secs = 0;
        cfg.session.event_capacity = 0;
        assert_eq!(validate(&cfg).unwrap_err().len(), 4);
    }
}
