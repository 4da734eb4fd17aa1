use std::{env, env::VarError};

/// The server has no options. Any argument prints the help text and the current configuration.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    const DISPLAY_ENVS: [&str; 14] = [
        "RUST_LOG",
        "MKT_HOST",
        "MKT_PORT",
        "MKT_DATABASE_URL",
        "MKT_STRIPE_API_BASE",
        "MKT_STRIPE_ONBOARD_REFRESH_URL",
        "MKT_STRIPE_ONBOARD_RETURN_URL",
        "MKT_CHECKOUT_SUCCESS_URL",
        "MKT_CHECKOUT_CANCEL_URL",
        "MKT_PROVIDER_TIMEOUT",
        "MKT_WEBHOOK_TOLERANCE",
        "MKT_COMMISSION_PERCENT",
        "MKT_ENABLED_PROVIDERS",
        "MKT_STRIPE_SECRET_KEY",
    ];

    // Secrets are only reported as being set or not
    const SECRET_ENVS: [&str; 1] = ["MKT_STRIPE_SECRET_KEY"];

    println!("Current environment values (secrets are not shown):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) if SECRET_ENVS.contains(&name) && !s.trim().is_empty() => "(set)".into(),
            Ok(_) if SECRET_ENVS.contains(&name) => "Not set".into(),
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
