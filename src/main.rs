#[macro_use]
extern crate lazy_static;

mod app;
mod args;
mod auth;
mod domain;
mod envelope;
mod http;
mod infra;
mod logging;
mod metrics;

use auth::{MemberUserDetailsService, UserDetailsService};
use clap::ArgMatches;
use domain::member::MemberService;
use infra::{HttpMemberService, JsonMemberService};
use slog::*;
use std::{process, result::Result, sync::Arc};

fn make_member_service(
    log: &Logger,
    m: &ArgMatches,
) -> Result<Arc<dyn MemberService + Send + Sync + 'static>, String> {
    match (m.value_of(args::MEMBER_JSON_PATH), m.value_of(args::MEMBER_HTTP_URL)) {
        (Some(path), None) => {
            let service = JsonMemberService::from_file(path)?;
            info!(log, "Loaded members from JSON file"; "path" => path, "members" => service.member_count());
            Ok(Arc::new(service))
        }
        (None, Some(url)) => {
            info!(log, "Looking up members over HTTP"; "url" => url);
            Ok(Arc::new(HttpMemberService::new(url)?))
        }
        (Some(_), Some(_)) => Err(format!(
            "please specify either '--{}' or '--{}' but not both",
            args::MEMBER_JSON_PATH,
            args::MEMBER_HTTP_URL
        )),
        (None, None) => Err(format!(
            "a member source is required: specify '--{}' or '--{}'",
            args::MEMBER_JSON_PATH,
            args::MEMBER_HTTP_URL
        )),
    }
}

fn make_user_details(log: &Logger, m: &ArgMatches) -> Result<Arc<dyn UserDetailsService>, String> {
    let member_service = make_member_service(log, m)?;
    Ok(Arc::new(MemberUserDetailsService::new(member_service, log)))
}

#[derive(PartialEq)]
struct ExitSignal(pub &'static str);

async fn listen_for_signals() -> Result<ExitSignal, String> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term_sig =
            signal(SignalKind::terminate()).map_err(|e| format!("could not listen for TERM signals: {}", e))?;
        let mut int_sig =
            signal(SignalKind::interrupt()).map_err(|e| format!("Could not listen for INT signal: {}", e))?;
        let mut hup_sig = signal(SignalKind::hangup()).map_err(|e| format!("Could not listen for HUP signal: {}", e))?;

        let sig_name = tokio::select! {
            Some(_signal) = term_sig.recv() => {
                "SIG_TERM"
            },
            Some(_signal) = int_sig.recv() => {
                "SIG_INT"
            },
            Some(_signal) = hup_sig.recv() => {
                "SIG_HUP"
            },
        };
        Ok(ExitSignal(sig_name))
    }

    #[cfg(windows)]
    {
        use tokio::signal;
        signal::ctrl_c()
            .await
            .map_err(|e| format!("could not listen for ctrl-c: {}", e))?;
        Ok(ExitSignal("CTRL-C"))
    }
}

// Builds every component from the arguments, serves until a signal arrives and waits for the HTTP
// server to wind down. Called again on SIGHUP, which reloads the member source.
async fn main_task(arg_matches: &ArgMatches, log: &Logger) -> Result<ExitSignal, String> {
    let (shutdown_sender, http_receiver) = tokio::sync::broadcast::channel(1);
    let (http_done_sender, mut shutdown_done_received) = tokio::sync::mpsc::channel(1);

    let user_details = make_user_details(log, arg_matches)?;

    let addr = arg_matches
        .value_of(args::HTTP_BIND_ADDRESS)
        .ok_or_else(|| format!("--{} is required", args::HTTP_BIND_ADDRESS))?
        .to_string();
    let http_log = log.clone();
    tokio::spawn(async move {
        if let Err(e) = http::start(&http_log, &addr, user_details, http_receiver, http_done_sender).await {
            error!(http_log, "HTTP Server error: {}", e)
        }
    });

    let signal = listen_for_signals().await?;
    info!(log, "Received signal {}, shutting down...", signal.0);

    drop(shutdown_sender);

    // When every sender has gone out of scope, the recv call
    // will return with an error. We ignore the error.
    let _ = shutdown_done_received.recv().await;

    Ok(signal)
}

async fn run(arg_matches: ArgMatches) -> Result<(), String> {
    let root_logger = logging::create_logger(&arg_matches)?;
    let log = root_logger.new(o!("module" => "main"));

    info!(log, "Starting {}.", app::NAME;
        "version" => app::VERSION,
        "http-address" => arg_matches.value_of(args::HTTP_BIND_ADDRESS),
        "member-json-path" => arg_matches.value_of(args::MEMBER_JSON_PATH),
        "member-http-url" => arg_matches.value_of(args::MEMBER_HTTP_URL),
    );

    // We wait for a signal (HUP, INT, TERM). If the signal is a HUP,
    // we restart, otherwise we exit the loop and the program ends.
    while main_task(&arg_matches, &log).await? == ExitSignal("SIG_HUP") {
        info!(log, "Received SIG_HUP, restarting");
    }
    info!(log, "Exiting...");
    Ok(())
}

#[tokio::main]
async fn main() {
    #[cfg(feature = "tokio_console")]
    {
        console_subscriber::ConsoleLayer::builder()
            .server_addr(([127, 0, 0, 1], 6669))
            .init();
    }

    let arg_matches = args::clap_app().get_matches();
    if let Err(e) = run(arg_matches).await {
        eprintln!("\nError: {}", e);
        process::exit(1);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(argv: &[&str]) -> ArgMatches {
        let mut full = vec![app::NAME];
        full.extend_from_slice(argv);
        args::clap_app().get_matches_from(full)
    }

    fn discard() -> Logger {
        Logger::root(slog::Discard, o!())
    }

    #[test]
    fn member_source_is_required() {
        let err = make_member_service(&discard(), &matches(&[])).unwrap_err();
        assert!(err.starts_with("a member source is required"));
    }

    #[test]
    fn member_sources_are_mutually_exclusive() {
        let m = matches(&["--member-json-path", "/tmp/m.json", "--member-http-url", "http://localhost/"]);
        let err = make_member_service(&discard(), &m).unwrap_err();
        assert!(err.contains("but not both"));
    }

    #[test]
    fn http_member_source_needs_a_valid_url() {
        let m = matches(&["--member-http-url", "::not-a-url::"]);
        assert!(make_member_service(&discard(), &m).is_err());
    }

    #[tokio::test]
    async fn json_member_source_feeds_the_adapter() {
        let path = std::env::temp_dir().join(format!("memberauth-main-{}.json", process::id()));
        std::fs::write(&path, r#"[{"id": 11, "username": "frank", "authorities": ["ROLE_MEMBER"]}]"#).unwrap();

        let m = matches(&["--member-json-path", path.to_str().unwrap()]);
        let user_details = make_user_details(&discard(), &m).unwrap();
        let user = user_details.load_user_by_username("frank").await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(user.id, 11);
        assert_eq!(user.name, "frank");
        assert_eq!(user.password, "");
        assert!(user_details.load_user_by_username("ghost").await.unwrap_err().is_not_found());
    }
}
