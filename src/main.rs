fn is_robot_mode_args() -> bool {
    std::env::args().any(|arg| arg == "--json" || arg == "--robot")
}

fn report_error(err: &artpick::CliError) {
    if is_robot_mode_args() {
        let payload = serde_json::json!({
            "error": {
                "code": err.code,
                "kind": err.kind,
                "message": err.message,
                "hint": err.hint,
                "retryable": err.retryable,
            }
        });
        eprintln!("{payload}");
    } else {
        eprintln!("{}", err.message);
        if let Some(hint) = &err.hint {
            eprintln!("hint: {hint}");
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Load .env early; ignore if missing.
    dotenvy::dotenv().ok();

    let raw_args: Vec<String> = std::env::args().collect();
    let parsed = match artpick::parse_cli(raw_args) {
        Ok(parsed) => parsed,
        Err(err) if err.is_informational() => {
            print!("{}", err.message);
            return Ok(());
        }
        Err(err) => {
            report_error(&err);
            std::process::exit(err.code);
        }
    };

    // One-shot commands run on the current thread; the interactive session
    // runs bulk selections in the background and gets a worker pool.
    let one_shot = matches!(
        parsed.cli.command,
        Some(artpick::Commands::Page { .. } | artpick::Commands::SelectFirst { .. })
    );
    let runtime = if one_shot {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?
    } else {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
    };

    let result = runtime.block_on(artpick::run_with_parsed(parsed));
    // A pending stdin read would otherwise keep the runtime alive after `quit`.
    runtime.shutdown_timeout(std::time::Duration::from_millis(250));

    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            report_error(&err);
            std::process::exit(err.code);
        }
    }
}
