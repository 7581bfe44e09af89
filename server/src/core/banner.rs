//! Startup banner

use super::constants::APP_NAME;

/// Print the startup banner with the API URL and store details
pub fn print_banner(host: &str, port: u16, backend: &str, notifications: &str) {
    let display_host = if host == "0.0.0.0" || host == "::" {
        "localhost"
    } else {
        host
    };

    // Label width: "Notifications:" is 14 chars, pad to 16 for alignment
    const W: usize = 16;

    println!();
    println!(
        "  \x1b[1m\x1b[36m{}\x1b[0m \x1b[90mv{}\x1b[0m",
        APP_NAME,
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!(
        "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m \x1b[36mhttp://{}:{}/api/v1\x1b[0m",
        "API:", display_host, port
    );
    println!(
        "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m \x1b[36mhttp://{}:{}/api/openapi.json\x1b[0m",
        "OpenAPI:", display_host, port
    );
    println!("  \x1b[90m➜  {:<W$} {}\x1b[0m", "Store:", backend);
    println!("  \x1b[90m➜  {:<W$} {}\x1b[0m", "Notifications:", notifications);
    println!();
}
