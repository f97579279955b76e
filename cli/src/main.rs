//! TradeDeck CLI - drives the trade-platform access-control core

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use console::Style;
use std::sync::Arc;
use tradedeck_core::{
    default_config, get_config_path, load_config, process_audit_logs, save_config, AuditLogger,
    Config, MockProvider, NavigationOutcome, Page, PageGate, Permission, PermissionMatrix, Role,
    SessionResolver, UserDirectory,
};
use tracing_subscriber::EnvFilter;

const TRADEDECK_LOGO: &str = r#"
 _____              _     ____            _
|_   _| __ __ _  __| | __|  _ \  ___  ___| | __
  | || '__/ _` |/ _` |/ _ \ | | |/ _ \/ __| |/ /
  | || | | (_| | (_| |  __/ |_| |  __/ (__|   <
  |_||_|  \__,_|\__,_|\___|____/ \___|\___|_|\_\
"#;

/// TradeDeck - role-based trade platform dashboard
#[derive(Parser, Debug)]
#[command(name = "tradedeck")]
#[command(version)]
#[command(about = "TradeDeck - role-based trade platform dashboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the current session and reachable pages
    Status,

    /// Log in as a platform user
    Login {
        /// User id (e.g. exp-001, adm-001)
        #[arg(short, long)]
        user: String,
        /// Remember this user for silent login on the next start
        #[arg(short, long)]
        remember: bool,
    },

    /// Log out and forget the remembered user
    Logout,

    /// Register a new user and log them in
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        /// Role name (exporter, buyer, logistics, agent, admin, ...)
        #[arg(short, long)]
        role: String,
    },

    /// List every page with the session's access decision
    Pages,

    /// Attempt to navigate the remembered session to a page
    Navigate {
        /// Page name (e.g. orders, role_management)
        page: String,
    },

    /// Inspect or edit the permission matrix
    Matrix {
        #[command(subcommand)]
        matrix_cmd: MatrixCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },

    /// Walk a scripted live-propagation scenario
    Demo,
}

#[derive(Subcommand, Debug)]
enum MatrixCommands {
    /// Print the matrix, optionally for a single role
    Show {
        #[arg(short, long)]
        role: Option<String>,
    },

    /// Toggle a permission for a role (in-memory, resets next run)
    Toggle {
        #[arg(short, long)]
        role: String,
        #[arg(short, long)]
        permission: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write a default config file
    Init,

    /// Print the active configuration
    Show,
}

struct App {
    config: Config,
    matrix: PermissionMatrix,
    resolver: SessionResolver,
    gate: PageGate,
}

async fn build_app() -> Result<App> {
    let config = match load_config().await {
        Ok(config) => config,
        Err(_) => default_config(),
    };

    let (audit, audit_rx) = AuditLogger::new();
    tokio::spawn(process_audit_logs(audit_rx));

    let matrix = PermissionMatrix::new(audit.clone());
    if !config.matrix.is_empty() {
        config.matrix.apply(&matrix).await?;
    }

    let resolver = SessionResolver::new(UserDirectory::new(), matrix.clone(), audit.clone())
        .with_provider(Arc::new(MockProvider::from_millis(config.auth.login_delay_ms)));
    let gate = PageGate::with_landing(resolver.clone(), audit, config.platform.default_page);

    Ok(App {
        config,
        matrix,
        resolver,
        gate,
    })
}

fn parse_role(name: &str) -> Result<Role> {
    Role::from_str(name).ok_or_else(|| {
        let valid: Vec<&str> = Role::ALL.iter().map(|r| r.as_str()).collect();
        anyhow!("unknown role '{}', expected one of: {}", name, valid.join(", "))
    })
}

fn parse_page(name: &str) -> Result<Page> {
    Page::from_str(name).ok_or_else(|| {
        let valid: Vec<&str> = Page::ALL.iter().map(|p| p.as_str()).collect();
        anyhow!("unknown page '{}', expected one of: {}", name, valid.join(", "))
    })
}

async fn print_session(app: &App) {
    let green = Style::new().green();
    let dim = Style::new().dim();
    match app.resolver.current().await {
        Some(session) => {
            println!(
                "{} {} ({}) role={}",
                green.apply_to("Logged in:"),
                session.user.name,
                session.user.id,
                session.user.role
            );
            let mut tokens: Vec<String> = session
                .permissions
                .iter()
                .map(|p| p.as_str().to_string())
                .collect();
            tokens.sort();
            println!("{} {}", dim.apply_to("Permissions:"), tokens.join(", "));
        }
        None => println!("{}", dim.apply_to("Not logged in")),
    }
}

async fn print_pages(app: &App) {
    let green = Style::new().green();
    let red = Style::new().red();
    for page in Page::ALL {
        let allowed = app.gate.can_navigate(page).await;
        let mark = if allowed {
            green.apply_to("allowed")
        } else {
            red.apply_to("denied ")
        };
        let requirement = page
            .required_permission()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {}  {:<16} requires {}", mark, page.title(), requirement);
    }
}

async fn print_matrix_row(app: &App, role: Role) {
    let perms = app.matrix.get(role).await;
    let tokens: Vec<&str> = perms.iter().map(|p| p.as_str()).collect();
    println!("  {:<16} {}", role.as_str(), tokens.join(", "));
}

async fn run(cli: Cli) -> Result<()> {
    let app = build_app().await?;
    let bold = Style::new().bold();
    let green = Style::new().green();
    let red = Style::new().red();

    match cli.command {
        Commands::Status => {
            if app.resolver.try_auto_login().await.is_some() {
                app.gate.enter_default().await;
            }
            print_session(&app).await;
            if app.resolver.is_authenticated().await {
                if let Some(page) = app.gate.current_page().await {
                    println!("Current page: {}", page.title());
                }
                println!();
                print_pages(&app).await;
            }
        }

        Commands::Login { user, remember } => {
            let remember = remember || app.config.auth.remember_by_default;
            app.resolver.login(&user, remember).await?;
            app.gate.enter_default().await;
            print_session(&app).await;
            println!();
            print_pages(&app).await;
        }

        Commands::Logout => {
            app.resolver.try_auto_login().await;
            app.resolver.logout().await;
            app.gate.reset().await;
            println!("Logged out");
        }

        Commands::Register { name, email, role } => {
            let role = parse_role(&role)?;
            app.resolver.register(&name, &email, role).await?;
            app.gate.enter_default().await;
            print_session(&app).await;
        }

        Commands::Pages => {
            app.resolver.try_auto_login().await;
            print_pages(&app).await;
        }

        Commands::Navigate { page } => {
            let page = parse_page(&page)?;
            if app.resolver.try_auto_login().await.is_none() {
                println!("{}", red.apply_to("Not logged in, run `tradedeck login` first"));
                return Ok(());
            }
            app.gate.enter_default().await;
            match app.gate.navigate(page).await {
                NavigationOutcome::Moved(page) => {
                    println!("{} {}", green.apply_to("Now on:"), page.title());
                }
                NavigationOutcome::AlreadyThere(page) => {
                    println!("Already on {}", page.title());
                }
                NavigationOutcome::Denied { page, missing } => {
                    println!(
                        "{} {} requires {}",
                        red.apply_to("Denied:"),
                        page.title(),
                        missing
                    );
                }
                NavigationOutcome::Unauthenticated => {
                    println!("{}", red.apply_to("Not logged in"));
                }
            }
        }

        Commands::Matrix { matrix_cmd } => match matrix_cmd {
            MatrixCommands::Show { role } => {
                println!("{}", bold.apply_to("Permission matrix"));
                match role {
                    Some(name) => print_matrix_row(&app, parse_role(&name)?).await,
                    None => {
                        for role in Role::ALL {
                            print_matrix_row(&app, role).await;
                        }
                    }
                }
            }
            MatrixCommands::Toggle { role, permission } => {
                let role = parse_role(&role)?;
                let permission = Permission::parse(permission)
                    .map_err(|e| anyhow!("{}", e))?;
                let granted = app.matrix.toggle(role, permission.clone()).await;
                let verb = if granted { "granted to" } else { "revoked from" };
                println!("{} {} {}", permission, verb, role);
                print_matrix_row(&app, role).await;
            }
        },

        Commands::Config { config_cmd } => match config_cmd {
            ConfigCommands::Init => {
                save_config(&app.config).await?;
                println!("Config written to {}", get_config_path().display());
            }
            ConfigCommands::Show => {
                println!("{}", serde_json::to_string_pretty(&app.config)?);
            }
        },

        Commands::Demo => {
            println!("{}", bold.apply_to(TRADEDECK_LOGO));
            run_demo(&app).await?;
        }
    }

    Ok(())
}

/// Scripted scenario: an agent session watches a permission arrive live
async fn run_demo(app: &App) -> Result<()> {
    let bold = Style::new().bold();
    let green = Style::new().green();
    let red = Style::new().red();

    println!("{}", bold.apply_to("1. Agent logs in"));
    app.resolver.login("agt-001", false).await?;
    app.gate.enter_default().await;
    print_session(app).await;

    println!();
    println!("{}", bold.apply_to("2. Agent tries User Management"));
    match app.gate.navigate(Page::UserManagement).await {
        NavigationOutcome::Denied { missing, .. } => {
            println!("{} missing {}", red.apply_to("Denied:"), missing);
        }
        outcome => println!("Unexpected outcome: {:?}", outcome),
    }

    println!();
    println!("{}", bold.apply_to("3. Admin grants admin:user:manage to agents"));
    let permission = Permission::parse("admin:user:manage").map_err(|e| anyhow!("{}", e))?;
    app.matrix.toggle(Role::Agent, permission).await;

    println!();
    println!("{}", bold.apply_to("4. The live agent session retries, no re-login"));
    match app.gate.navigate(Page::UserManagement).await {
        NavigationOutcome::Moved(page) => {
            println!("{} {}", green.apply_to("Now on:"), page.title());
        }
        outcome => println!("Unexpected outcome: {:?}", outcome),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    run(Cli::parse()).await
}
