//! snap-autostart: register snap_tool to start at login
//!
//! Installs a LaunchAgent on macOS or a Startup folder shortcut on Windows.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use snap_autostart::{
    config::InstallerConfig,
    error::InstallError,
    interpreter::locate_interpreter,
    launchd::{LaunchAgent, LaunchAgentConfig, Launchctl, agent_status, uninstall_agent},
    model::{
        AgentInstallReport, AgentStatusReport, AgentUninstallReport, LaunchAgentStatus, Platform,
        ShortcutReport,
    },
    shortcut::StartupShortcut,
    util::detect::{detect_platform, process_env},
};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "snap-autostart")]
#[command(version)]
#[command(about = "Register the snap_tool screenshot utility to start at login")]
struct Cli {
    /// snap_tools directory (defaults to the current directory)
    #[arg(long, global = true)]
    install_dir: Option<PathBuf>,

    /// Configuration file (defaults to <install-dir>/snap-autostart.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Target platform: macos or windows (defaults to the running OS)
    #[arg(long, global = true)]
    platform: Option<Platform>,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the login item (LaunchAgent or Startup shortcut)
    Install {
        /// Python interpreter substituted for __PYTHON_PATH__ (relative to the current directory)
        #[arg(long)]
        python: Option<PathBuf>,
        /// LaunchAgent property-list template (relative to the current directory)
        #[arg(long)]
        template: Option<PathBuf>,
    },
    /// Remove the login item
    Uninstall,
    /// Show whether the login item is installed
    Status,
    /// Print the rendered LaunchAgent property list without installing it
    Render {
        /// Python interpreter substituted for __PYTHON_PATH__ (relative to the current directory)
        #[arg(long)]
        python: Option<PathBuf>,
        /// LaunchAgent property-list template (relative to the current directory)
        #[arg(long)]
        template: Option<PathBuf>,
    },
    /// Show the Python interpreter the LaunchAgent would use
    Python {
        /// Python interpreter to inspect instead of searching
        #[arg(long)]
        python: Option<PathBuf>,
    },
}

/// Shared state for every subcommand
struct Context {
    install_dir: PathBuf,
    config:      InstallerConfig,
    platform:    Platform,
    json:        bool,
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so `render` and `--json` output stay clean.
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("snap_autostart=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(err) = run(Cli::parse()).await {
        eprintln!("error: {err}");
        if let Some(install_err) = err.downcast_ref::<InstallError>() {
            eprintln!("hint: {}", install_err.remediation_hint());
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let install_dir = match cli.install_dir {
        Some(dir) => std::path::absolute(dir)?,
        None => std::env::current_dir()?,
    };
    let platform = cli.platform.unwrap_or_else(|| detect_platform().platform);
    debug!("Install dir {}, platform {}", install_dir.display(), platform);

    let (mut config, config_path) = InstallerConfig::load(cli.config.as_deref(), &install_dir)?;
    if let Some(path) = config_path {
        info!("Using configuration {}", path.display());
    }

    let cwd = std::env::current_dir()?;
    match &cli.command {
        Commands::Install { python, template } | Commands::Render { python, template } => {
            config.apply_overrides(python.clone(), template.clone(), &cwd);
        }
        Commands::Python { python } => config.apply_overrides(python.clone(), None, &cwd),
        Commands::Uninstall | Commands::Status => {}
    }

    let ctx = Context {
        install_dir,
        config,
        platform,
        json: cli.json,
    };

    match cli.command {
        Commands::Install { .. } => install(&ctx).await,
        Commands::Uninstall => uninstall(&ctx).await,
        Commands::Status => status(&ctx).await,
        Commands::Render { .. } => render(&ctx),
        Commands::Python { .. } => python_info(&ctx),
    }
}

fn launch_agent_config(ctx: &Context) -> Result<LaunchAgentConfig> {
    Ok(ctx.config.launch_agent_config(&ctx.install_dir, &process_env)?)
}

fn launch_agent(ctx: &Context) -> Result<LaunchAgent> {
    let agent_config = launch_agent_config(ctx)?;
    let interpreter = locate_interpreter(
        &ctx.install_dir,
        agent_config.python.as_deref(),
        &process_env,
    )?;
    Ok(LaunchAgent::new(agent_config, interpreter))
}

fn startup_shortcut(ctx: &Context) -> Result<StartupShortcut> {
    let shortcut_config = ctx
        .config
        .startup_shortcut_config(&ctx.install_dir, &process_env)?;
    Ok(StartupShortcut::new(shortcut_config))
}

fn unsupported(platform: Platform) -> anyhow::Error {
    InstallError::UnsupportedPlatform { platform }.into()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn install(ctx: &Context) -> Result<()> {
    match ctx.platform {
        Platform::MacOS => {
            let agent = launch_agent(ctx)?;
            if agent.uses_bundled_template()? {
                info!("Using the bundled LaunchAgent template");
            }
            let report = agent.install(&Launchctl::new()).await?;
            if ctx.json {
                return print_json(&report);
            }
            print_agent_install(&report, &agent);
            Ok(())
        }
        Platform::Windows => {
            let report = startup_shortcut(ctx)?.create()?;
            if ctx.json {
                return print_json(&report);
            }
            println!("✓ Startup shortcut created");
            print_shortcut(&report);
            Ok(())
        }
        Platform::None => Err(unsupported(ctx.platform)),
    }
}

async fn uninstall(ctx: &Context) -> Result<()> {
    match ctx.platform {
        Platform::MacOS => {
            let report = uninstall_agent(&launch_agent_config(ctx)?, &Launchctl::new()).await?;
            if ctx.json {
                return print_json(&report);
            }
            print_agent_uninstall(&report);
            Ok(())
        }
        Platform::Windows => {
            let report = startup_shortcut(ctx)?.remove()?;
            if ctx.json {
                return print_json(&report);
            }
            println!("✓ Startup shortcut removed ({})", report.path.display());
            Ok(())
        }
        Platform::None => Err(unsupported(ctx.platform)),
    }
}

async fn status(ctx: &Context) -> Result<()> {
    match ctx.platform {
        Platform::MacOS => {
            let report = agent_status(&launch_agent_config(ctx)?, &Launchctl::new()).await?;
            if ctx.json {
                return print_json(&report);
            }
            print_agent_status(&report);
            Ok(())
        }
        Platform::Windows => {
            let report = startup_shortcut(ctx)?.status()?;
            if ctx.json {
                return print_json(&report);
            }
            print_shortcut(&report);
            Ok(())
        }
        Platform::None => Err(unsupported(ctx.platform)),
    }
}

fn render(ctx: &Context) -> Result<()> {
    let rendered = launch_agent(ctx)?.render()?;
    print!("{rendered}");
    Ok(())
}

fn python_info(ctx: &Context) -> Result<()> {
    let agent = launch_agent(ctx)?;
    let interpreter = agent.interpreter();
    if ctx.json {
        return print_json(interpreter);
    }

    println!("Interpreter: {}", interpreter.invocation.display());
    match &interpreter.resolved {
        Some(real) => println!("Resolves to: {}", real.display()),
        None => println!("Resolves to: (unresolved)"),
    }
    println!("Found via:   {:?}", interpreter.source);
    println!();
    for line in interpreter.permission_guidance() {
        println!("{line}");
    }
    Ok(())
}

fn print_agent_install(report: &AgentInstallReport, agent: &LaunchAgent) {
    if report.replaced_previous {
        println!("✓ LaunchAgent reinstalled: {}", report.label);
    } else {
        println!("✓ LaunchAgent installed: {}", report.label);
    }
    println!("  Plist:  {}", report.plist_path.display());
    println!("  Python: {}", report.python_path.display());
    println!();
    println!("snap_tool will start automatically at login.");
    println!("Logs: /tmp/snaptool.out.log, /tmp/snaptool.err.log");
    println!();
    for line in agent.interpreter().permission_guidance() {
        println!("{line}");
    }
    println!();
    println!("To uninstall: snap-autostart uninstall");
}

fn print_agent_uninstall(report: &AgentUninstallReport) {
    if report.removed {
        println!("✓ LaunchAgent removed: {}", report.label);
    } else {
        println!("LaunchAgent {} was not installed", report.label);
    }
    println!("  Plist: {}", report.plist_path.display());
}

fn print_agent_status(report: &AgentStatusReport) {
    println!("LaunchAgent: {}", report.label);
    println!(
        "  Plist:  {} ({})",
        report.plist_path.display(),
        if report.plist_exists { "present" } else { "missing" }
    );
    match report.status {
        LaunchAgentStatus::NotLoaded => println!("  State:  not loaded"),
        LaunchAgentStatus::Loaded {
            pid,
            last_exit_status,
        } => {
            let pid = pid.map_or_else(|| "not running".to_string(), |p| format!("pid {p}"));
            let exit = last_exit_status
                .map_or_else(|| "n/a".to_string(), |code| code.to_string());
            println!("  State:  loaded, {pid}, last exit {exit}");
        }
    }
}

fn print_shortcut(report: &ShortcutReport) {
    println!("Startup shortcut: {}", report.path.display());
    if !report.exists {
        println!("  (not installed)");
        return;
    }
    if let Some(target) = &report.target {
        println!("  Target:      {target}");
    }
    if let Some(dir) = &report.working_dir {
        println!("  Start in:    {dir}");
    }
    if let Some(style) = report.window_style {
        println!("  Window:      {style}");
    }
}
