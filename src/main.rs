use registry_sync::cli::{Args, Runner};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse_args().from_env();

    let runner = match Runner::new(args) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    match runner.run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            runner.output().error(&e.to_string());
            ExitCode::from(e.exit_code())
        }
    }
}
