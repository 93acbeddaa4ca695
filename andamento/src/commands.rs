use crate::config::{Config, CredentialsConfig};
use crate::progress::LogProgress;
use clap::Subcommand;
use projudi::Projudi;
use projudi::webdriver::WebDriverError;
use reconciler::{
    BatchRunner, CredentialError, CredentialStore, EnvCredentialStore, FallbackCredentialStore,
    FileCredentialStore, Reconciler, TabularError, read_process_numbers, write_results_file,
};
use saj::{SajClient, SajError};
use serde::Serialize;
use shared::{Credentials, MovementResult, ProcessNumber, Tier};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look up every process number listed in a delimited file
    Run {
        #[arg(long, short)]
        input: PathBuf,
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Look up a single process number
    Lookup {
        number: String,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check process numbers without looking them up
    Validate {
        #[arg(required = true)]
        numbers: Vec<String>,
    },
    /// Manage the stored PROJUDI credentials
    Credentials {
        #[command(subcommand)]
        action: CredentialsCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum CredentialsCommand {
    /// Persist credentials through the store chain
    Set {
        #[arg(long)]
        username: String,
        /// Read from the configured password variable when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Show which store supplies the credentials
    Show,
}

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Saj(#[from] SajError),
    #[error("could not start the WebDriver client: {0}")]
    WebDriver(#[from] WebDriverError),
    #[error(transparent)]
    Tabular(#[from] TabularError),
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error("could not encode result: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no password given and {0} is not set")]
    MissingPassword(String),
}

pub async fn dispatch(command: Command, config: Config) -> Result<ExitCode, CliError> {
    match command {
        Command::Run { input, output } => run_batch(&config, input, output).await,
        Command::Lookup { number, json } => lookup(&config, ProcessNumber::new(number), json).await,
        Command::Validate { numbers } => Ok(validate(&numbers)),
        Command::Credentials { action } => credentials(&config.credentials, action),
    }
}

fn credential_store(config: &CredentialsConfig) -> FallbackCredentialStore {
    let file = config
        .file
        .clone()
        .unwrap_or_else(FileCredentialStore::default_path);
    FallbackCredentialStore::new(
        Box::new(EnvCredentialStore::new(
            config.username_var.as_str(),
            config.password_var.as_str(),
        )),
        Box::new(FileCredentialStore::new(file)),
    )
}

fn load_credentials(config: &CredentialsConfig) -> Option<Credentials> {
    match credential_store(config).locate() {
        Ok(Some((source, credentials))) => {
            info!(source, "PROJUDI credentials loaded");
            Some(credentials)
        }
        Ok(None) => {
            warn!("no PROJUDI credentials configured, escalated lookups will not open a browser");
            None
        }
        Err(e) => {
            warn!(error = %e, "could not load PROJUDI credentials");
            None
        }
    }
}

fn build_reconciler(config: &Config) -> Result<Reconciler<SajClient, Projudi>, CliError> {
    let primary = SajClient::new(&config.saj)?;
    let secondary = Projudi::new(config.projudi.clone())?;
    Ok(Reconciler::new(primary, secondary))
}

async fn run_batch(config: &Config, input: PathBuf, output: PathBuf) -> Result<ExitCode, CliError> {
    // Fails on a missing column before anything is looked up.
    let numbers = read_process_numbers(&input)?;
    let credentials = load_credentials(&config.credentials);
    let runner = BatchRunner::new(build_reconciler(config)?, &config.batch);

    let cancelled = runner.cancel_flag();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, remaining process numbers will be marked as cancelled");
            cancelled.store(true, Ordering::SeqCst);
        }
    });

    let report = runner
        .run(numbers, credentials.as_ref(), &mut LogProgress)
        .await;
    ctrl_c.abort();

    write_results_file(&output, &report.results)?;
    info!(path = %output.display(), rows = report.results.len(), "results written");

    let summary = &report.summary;
    println!(
        "{} processed: {} by SAJ, {} by PROJUDI, {} invalid, {} failed, {} cancelled",
        summary.total,
        summary.primary,
        summary.secondary,
        summary.invalid,
        summary.failed,
        summary.cancelled
    );

    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
struct LookupOutput {
    process_number: String,
    date: String,
    description: String,
    respondent: String,
    tier: Option<Tier>,
}

impl From<&MovementResult> for LookupOutput {
    fn from(result: &MovementResult) -> Self {
        let [process_number, date, description, respondent] = result.to_row();
        LookupOutput {
            process_number,
            date,
            description,
            respondent,
            tier: result.tier,
        }
    }
}

async fn lookup(config: &Config, number: ProcessNumber, json: bool) -> Result<ExitCode, CliError> {
    let credentials = if number.is_valid() {
        load_credentials(&config.credentials)
    } else {
        None
    };
    let result = build_reconciler(config)?
        .resolve(&number, credentials.as_ref())
        .await;

    let output = LookupOutput::from(&result);
    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("PROCESSO:             {}", output.process_number);
        println!("DATA MOVIMENTAÇÃO:    {}", output.date);
        println!("DESCRIÇÃO:            {}", output.description);
        println!("REQUERIDO/EXECUTADO:  {}", output.respondent);
    }

    Ok(if result.is_failure() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

fn validate(numbers: &[String]) -> ExitCode {
    let mut all_valid = true;
    for raw in numbers {
        let number = ProcessNumber::new(raw.as_str());
        let valid = number.is_valid();
        all_valid &= valid;
        println!(
            "{}\t{} ({} digits)",
            number,
            if valid { "valid" } else { "invalid" },
            number.digits().len()
        );
    }

    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn credentials(config: &CredentialsConfig, action: CredentialsCommand) -> Result<ExitCode, CliError> {
    let store = credential_store(config);
    match action {
        CredentialsCommand::Set { username, password } => {
            let password = match password {
                Some(password) => password,
                None => std::env::var(&config.password_var)
                    .map_err(|_| CliError::MissingPassword(config.password_var.clone()))?,
            };
            store.store(&Credentials::new(username, password))?;
            println!("credentials saved");
        }
        CredentialsCommand::Show => match store.locate()? {
            Some((source, credentials)) => {
                println!("username: {}", credentials.username);
                println!("source:   {source}");
                if !credentials.is_complete() {
                    println!("incomplete: PROJUDI lookups will be skipped");
                }
            }
            None => println!("no credentials stored"),
        },
    }

    Ok(ExitCode::SUCCESS)
}
