use kobo_highlights::app;
use kobo_highlights::config::Config;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut input = std::io::stdin().lock();
    let mut output = std::io::stdout().lock();

    if let Err(e) = app::run(&config, &mut input, &mut output) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
