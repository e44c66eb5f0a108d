use clap::Parser;
use miette::Result;
use qct::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    // Install miette's fancy error handler for beautiful diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    if let Err(e) = qct::telemetry::init(global.verbose) {
        eprintln!("warning: logging disabled: {}", e);
    }

    match cli.command {
        Commands::Init(args) => qct::cli::commands::init::run(args),
        Commands::Point(cmd) => qct::cli::commands::point::run(cmd, &global),
        Commands::Check(cmd) => qct::cli::commands::check::run(cmd, &global),
        Commands::Alert(cmd) => qct::cli::commands::alert::run(cmd, &global),
        Commands::Stage(cmd) => qct::cli::commands::stage::run(cmd, &global),
        Commands::Run(args) => qct::cli::commands::run::run(args, &global),
        Commands::Stats(args) => qct::cli::commands::stats::run(args, &global),
        Commands::Report(args) => qct::cli::commands::report::run(args, &global),
        Commands::Import(cmd) => qct::cli::commands::import::run(cmd, &global),
        Commands::Validate(args) => qct::cli::commands::validate::run(args, &global),
        Commands::Completions(args) => qct::cli::commands::completions::run(args),
    }
}
