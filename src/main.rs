use clap::{Parser, Subcommand, ValueEnum};
use dotenvy::dotenv;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use leadhub::actions::{AuthActions, CompanyActions, ConnectionActions, LeadActions, TemplateActions, UserActions};
use leadhub::app_state::AppState;
use leadhub::config::Config;
use leadhub::errors::AppError;
use leadhub::models::{Company, LeadInput, NewConnection, NewValidationList, RecordStatus, Template, User, UserRole};
use leadhub::router::Route;
use leadhub::services::notifier::LogNotifier;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
/// Command line front end for the lead management webhooks.
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Logs in and stores the session locally.
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Ends the stored session.
    Logout,
    /// Prints the stored user and company.
    Whoami,
    /// Checks the stored session with the backend.
    Verify,
    Companies {
        #[command(subcommand)]
        command: CompanyCommand,
    },
    Connections {
        #[command(subcommand)]
        command: ConnectionCommand,
    },
    /// Lead validation lists.
    Lists {
        #[command(subcommand)]
        command: ListCommand,
    },
    Templates {
        #[command(subcommand)]
        command: TemplateCommand,
    },
    Users {
        #[command(subcommand)]
        command: UserCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CompanyCommand {
    List,
    Get {
        id: i64,
    },
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(long, default_value = "")]
        cnpj: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    Update {
        id: i64,
        #[arg(short, long)]
        name: String,
        #[arg(long, default_value = "")]
        cnpj: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        inactive: bool,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
enum ConnectionCommand {
    /// Lists connections with the company they belong to.
    List,
    /// Lists the raw company/connection links.
    Links,
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        company_id: Option<i64>,
    },
    /// Links a connection to a company.
    Link {
        connection_id: i64,
        company_id: i64,
    },
    /// Requests pairing material for an instance.
    Connect {
        name: String,
    },
    State {
        name: String,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
enum ListCommand {
    List,
    /// Leads of every stored list.
    Leads,
    /// Checks numbers and optionally stores them as a new list.
    Check {
        /// Lead as `name=number`; repeatable.
        #[arg(short, long = "lead", required = true)]
        leads: Vec<String>,
        /// Saves the checked leads under this list name.
        #[arg(long)]
        save_as: Option<String>,
        #[arg(long)]
        company_id: Option<i64>,
    },
    /// Runs the server side validation of a stored list again.
    Revalidate {
        id: i64,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    List,
    /// Creates a template from a JSON file.
    Create {
        file: PathBuf,
    },
    /// Updates a template from a JSON file; the file must carry the id.
    Update {
        file: PathBuf,
    },
    Delete {
        id: i64,
    },
    /// Sends a stored template to its list.
    Execute {
        id: i64,
    },
    /// Approved business templates of a connection.
    Business {
        connection: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    Admin,
    User,
}

impl From<RoleArg> for UserRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => UserRole::Admin,
            RoleArg::User => UserRole::User,
        }
    }
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    List,
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long, value_enum, default_value = "user")]
        role: RoleArg,
        #[arg(short, long)]
        password: Option<String>,
        #[arg(short, long)]
        company_id: Option<i64>,
    },
    Update {
        id: i64,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long, value_enum, default_value = "user")]
        role: RoleArg,
        #[arg(short, long)]
        company_id: Option<i64>,
        #[arg(long)]
        inactive: bool,
    },
    Delete {
        id: i64,
    },
    ResetPassword {
        id: i64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            log::error!("{} [{}]", err, err.code());
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<bool, AppError> {
    let config = Config::from_env()?;
    let state = AppState::from_config(&config, Arc::new(LogNotifier))?;
    let auth = AuthActions::new(&state);

    match cli.command {
        Commands::Login { email, password } => Ok(auth.login(&email, &password).await),
        Commands::Logout => {
            auth.logout().await;
            Ok(true)
        }
        Commands::Whoami => {
            print_json(&serde_json::json!({
                "authenticated": auth.is_authenticated(),
                "user": auth.user(),
                "company": auth.company(),
            }))?;
            Ok(true)
        }
        Commands::Verify => Ok(auth.verify().await),
        Commands::Companies { command } => {
            if !allowed(&auth, Route::Companies) {
                return Ok(false);
            }
            companies(CompanyActions::new(&state), command).await
        }
        Commands::Connections { command } => {
            if !allowed(&auth, Route::Connections) {
                return Ok(false);
            }
            connections(ConnectionActions::new(&state), command).await
        }
        Commands::Lists { command } => {
            if !allowed(&auth, Route::Leads) {
                return Ok(false);
            }
            lists(LeadActions::new(&state), command).await
        }
        Commands::Templates { command } => {
            if !allowed(&auth, Route::Home) {
                return Ok(false);
            }
            let lists = LeadActions::new(&state);
            templates(TemplateActions::new(&state), &lists, command).await
        }
        Commands::Users { command } => {
            if !allowed(&auth, Route::Users) {
                return Ok(false);
            }
            users(UserActions::new(&state), command).await
        }
    }
}

fn allowed(auth: &AuthActions, route: Route) -> bool {
    let reached = auth.navigate(route);
    if reached != route {
        log::error!("Access to {} denied, redirected to {}", route, reached);
        return false;
    }
    true
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn status(inactive: bool) -> RecordStatus {
    if inactive { RecordStatus::Inactive } else { RecordStatus::Active }
}

async fn companies(actions: CompanyActions, command: CompanyCommand) -> Result<bool, AppError> {
    match command {
        CompanyCommand::List => {
            let loaded = actions.fetch().await;
            print_json(&actions.companies())?;
            Ok(loaded)
        }
        CompanyCommand::Get { id } => match actions.fetch_one(id).await {
            Some(company) => {
                print_json(&company)?;
                Ok(true)
            }
            None => Ok(false),
        },
        CompanyCommand::Create { name, cnpj, email, phone } => Ok(actions
            .create(&Company {
                id: None,
                name,
                cnpj,
                email,
                phone,
                status: RecordStatus::Active,
            })
            .await),
        CompanyCommand::Update {
            id,
            name,
            cnpj,
            email,
            phone,
            inactive,
        } => Ok(actions
            .update(&Company {
                id: Some(id),
                name,
                cnpj,
                email,
                phone,
                status: status(inactive),
            })
            .await),
        CompanyCommand::Delete { id } => Ok(actions.delete(id).await),
    }
}

async fn connections(actions: ConnectionActions, command: ConnectionCommand) -> Result<bool, AppError> {
    match command {
        ConnectionCommand::List => {
            let loaded = actions.fetch().await;
            print_json(&actions.connections())?;
            Ok(loaded)
        }
        ConnectionCommand::Links => {
            let loaded = actions.fetch_links().await;
            print_json(&actions.links())?;
            Ok(loaded)
        }
        ConnectionCommand::Create { name, company_id } => {
            Ok(actions.create(&NewConnection { name, company_id }).await)
        }
        ConnectionCommand::Link {
            connection_id,
            company_id,
        } => {
            // linking checks the connection against the loaded collection
            if !actions.fetch().await {
                return Ok(false);
            }
            Ok(actions.link_company(connection_id, company_id).await)
        }
        ConnectionCommand::Connect { name } => match actions.connect(&name).await {
            Some(payload) => {
                print_json(&payload)?;
                Ok(true)
            }
            None => Ok(false),
        },
        ConnectionCommand::State { name } => match actions.state(&name).await {
            Some(state) => {
                print_json(&state)?;
                Ok(true)
            }
            None => Ok(false),
        },
        ConnectionCommand::Delete { id } => Ok(actions.delete(id).await),
    }
}

fn parse_lead(raw: &str) -> Result<LeadInput, AppError> {
    let (name, number) = raw
        .split_once('=')
        .ok_or_else(|| AppError::InvalidInput(format!("lead '{}' must look like name=number", raw)))?;
    Ok(LeadInput {
        name: name.trim().to_string(),
        number: number.trim().to_string(),
    })
}

async fn lists(actions: LeadActions, command: ListCommand) -> Result<bool, AppError> {
    match command {
        ListCommand::List => {
            let loaded = actions.fetch_validation_lists().await;
            print_json(&actions.validation_lists())?;
            Ok(loaded)
        }
        ListCommand::Leads => {
            let loaded = actions.fetch_validation_lists().await;
            print_json(&actions.leads())?;
            Ok(loaded)
        }
        ListCommand::Check {
            leads,
            save_as,
            company_id,
        } => {
            let input = leads.iter().map(|raw| parse_lead(raw)).collect::<Result<Vec<_>, _>>()?;
            let Some(checked) = actions.validate_leads(&input).await else {
                return Ok(false);
            };
            print_json(&checked)?;
            match save_as {
                Some(name) => Ok(actions
                    .save_validation_list(&NewValidationList {
                        name,
                        leads: checked,
                        company_id,
                    })
                    .await),
                None => Ok(true),
            }
        }
        ListCommand::Revalidate { id } => Ok(actions.validate_list(id).await),
        ListCommand::Delete { id } => Ok(actions.delete_validation_list(id).await),
    }
}

fn read_template(path: &Path) -> Result<Template, AppError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

async fn templates(actions: TemplateActions, lists: &LeadActions, command: TemplateCommand) -> Result<bool, AppError> {
    match command {
        TemplateCommand::List => {
            let loaded = actions.fetch().await;
            print_json(&actions.templates())?;
            Ok(loaded)
        }
        TemplateCommand::Create { file } => Ok(actions.create(&read_template(&file)?).await),
        TemplateCommand::Update { file } => Ok(actions.update(&read_template(&file)?).await),
        TemplateCommand::Delete { id } => Ok(actions.delete(id).await),
        TemplateCommand::Execute { id } => {
            if !(actions.fetch().await & lists.fetch_validation_lists().await) {
                return Ok(false);
            }
            let Some(template) = actions.templates().into_iter().find(|t| t.id == Some(id)) else {
                return Err(AppError::NotFound(format!("Template {} not found", id)));
            };
            match actions.execute(&template).await {
                Some(body) => {
                    print_json(&body)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
        TemplateCommand::Business { connection } => match actions.fetch_business_templates(&connection).await {
            Some(templates) => {
                print_json(&templates)?;
                Ok(true)
            }
            None => Ok(false),
        },
    }
}

async fn users(actions: UserActions, command: UserCommand) -> Result<bool, AppError> {
    match command {
        UserCommand::List => {
            let loaded = actions.fetch().await;
            print_json(&actions.users())?;
            Ok(loaded)
        }
        UserCommand::Create {
            name,
            email,
            role,
            password,
            company_id,
        } => Ok(actions
            .create(&User {
                id: None,
                name,
                email,
                role: role.into(),
                status: RecordStatus::Active,
                company_id,
                password,
            })
            .await),
        UserCommand::Update {
            id,
            name,
            email,
            role,
            company_id,
            inactive,
        } => Ok(actions
            .update(&User {
                id: Some(id),
                name,
                email,
                role: role.into(),
                status: status(inactive),
                company_id,
                password: None,
            })
            .await),
        UserCommand::Delete { id } => Ok(actions.delete(id).await),
        UserCommand::ResetPassword { id } => Ok(actions.reset_password(id).await),
    }
}
