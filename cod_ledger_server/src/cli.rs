use std::env;

/// Non-secret settings, in the order the help text lists them. `COD_JWT_SECRET` is deliberately absent.
const DISPLAY_ENVS: [&str; 11] = [
    "RUST_LOG",
    "COD_HOST",
    "COD_PORT",
    "COD_DATABASE_URL",
    "COD_DB_MAX_CONNECTIONS",
    "COD_RUN_MIGRATIONS",
    "COD_SUBMISSION_ALLOCATION",
    "COD_TX_MAX_ATTEMPTS",
    "COD_TX_RETRY_BACKOFF_MS",
    "COD_OTP_TTL_MINUTES",
    "COD_OTP_MAX_RESENDS",
];

/// The server is configured from the environment only. Any argument at all prints the help text and the current
/// settings, and returns `true` so that `main` exits instead of starting the server.
pub fn handle_command_line_args() -> bool {
    if env::args_os().len() <= 1 {
        return false;
    }
    println!("\n{}\n", include_str!("./cli-help.txt"));
    println!("Current environment values (EXCLUDING variables that contain secrets):");
    for name in DISPLAY_ENVS {
        println!("  {name:<35} {:<15}", describe_env(name));
    }
    true
}

fn describe_env(name: &str) -> String {
    match env::var_os(name) {
        None => "Not set".into(),
        Some(value) => match value.into_string() {
            Ok(s) => s,
            Err(raw) => format!("Invalid value: {}", raw.to_string_lossy()),
        },
    }
}
