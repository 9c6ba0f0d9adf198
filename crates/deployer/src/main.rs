use {clap::Parser, std::process::ExitCode};

#[tokio::main]
async fn main() -> ExitCode {
    let args = deployer::arguments::Arguments::parse();
    observe::tracing::initialize(
        &observe::Config::new(&args.log_filter, args.log_json)
            .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr())),
    );
    tracing::info!("running deployer with validated arguments:\n{}", args);

    match deployer::start(args).await {
        Ok(deployment) => {
            println!("{deployment}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}
