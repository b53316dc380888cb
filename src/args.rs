use crate::app;
use clap::{Arg, Command};

pub const VERBOSITY: &str = "verbosity";
pub const LOG_LEVEL: &str = "log-level";
pub const INSTANCE_NAME: &str = "instance-name";
pub const HTTP_BIND_ADDRESS: &str = "bind-address-http";
pub const MEMBER_JSON_PATH: &str = "member-json-path";
pub const MEMBER_HTTP_URL: &str = "member-http-url";

#[derive(Debug, PartialEq, Eq, strum_macros::EnumString, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
#[allow(non_camel_case_types)]
pub enum LogLevelType {
    error,
    warn,
    info,
    debug,
    trace,
}

pub(crate) fn clap_app() -> Command<'static> {
    Command::new(app::NAME)
        .version(app::VERSION)
        .long_version(app::long_version())
        .about("Resolves application members into authentication principals")
        .author("The memberauth team")
        .arg(
            Arg::new(VERBOSITY)
                .short('v')
                .multiple_occurrences(true)
                .help("verbosity level"),
        )
        .arg(
            Arg::new(LOG_LEVEL)
                .long(LOG_LEVEL)
                .value_name("LEVEL")
                .help("Sets the minimum log level. Overrides the -v flag")
                .possible_values(["error", "warn", "info", "debug", "trace"])
                .env("MEMBERAUTH_LOG_LEVEL")
                .takes_value(true),
        )
        .arg(
            Arg::new(INSTANCE_NAME)
                .long(INSTANCE_NAME)
                .value_name("NAME")
                .help("Gives a user friendly name to this instance. It is added to every log record")
                .default_value(app::NAME)
                .env("MEMBERAUTH_INSTANCE_NAME")
                .takes_value(true),
        )
        .arg(
            Arg::new(HTTP_BIND_ADDRESS)
                .long(HTTP_BIND_ADDRESS)
                .value_name("HOST_PORT")
                .help("Sets the host and port for the HTTP server serving principal lookups, health checks and metrics")
                .default_value("0.0.0.0:8080")
                .env("MEMBERAUTH_HTTP_ADDRESS")
                .takes_value(true),
        )
        .arg(
            Arg::new(MEMBER_JSON_PATH)
                .long(MEMBER_JSON_PATH)
                .value_name("PATH")
                .help("Path to a JSON file with member accounts. The file may be gzipped or gzipped and base64 encoded")
                .env("MEMBERAUTH_MEMBER_JSON_PATH")
                .takes_value(true),
        )
        .arg(
            Arg::new(MEMBER_HTTP_URL)
                .long(MEMBER_HTTP_URL)
                .value_name("URL")
                .help("Base URL of an HTTP member service. The username is appended as the last path segment")
                .env("MEMBERAUTH_MEMBER_HTTP_URL")
                .takes_value(true),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn verify_cli() {
        clap_app().debug_assert();
    }

    #[test]
    fn defaults_apply() {
        let m = clap_app().get_matches_from(vec![app::NAME, "--member-json-path", "/etc/members.json"]);
        assert_eq!(m.value_of(HTTP_BIND_ADDRESS), Some("0.0.0.0:8080"));
        assert_eq!(m.value_of(INSTANCE_NAME), Some(app::NAME));
        assert_eq!(m.value_of(MEMBER_JSON_PATH), Some("/etc/members.json"));
        assert_eq!(m.occurrences_of(VERBOSITY), 0);
    }

    #[test]
    fn log_levels_parse() {
        assert_eq!("debug".parse::<LogLevelType>().unwrap(), LogLevelType::debug);
        assert!("loud".parse::<LogLevelType>().is_err());
    }
}
