//! Command-line flag helpers shared by the binaries.

/// Value following `name` (e.g. `--port 50052`).
pub fn arg_value(name: &str) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    value_in(&args, name)
}

pub fn has_flag(name: &str) -> bool {
    std::env::args().any(|a| a == name)
}

/// `--env` / `-e`, defaulting to `dev`.
pub fn get_env() -> String {
    arg_value("--env")
        .or_else(|| arg_value("-e"))
        .unwrap_or_else(|| "dev".to_string())
}

pub fn get_port_override() -> Option<u16> {
    arg_value("--port").and_then(|p| p.parse().ok())
}

fn value_in(args: &[String], name: &str) -> Option<String> {
    args.windows(2).find(|w| w[0] == name).map(|w| w[1].clone())
}
