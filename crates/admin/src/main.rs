mod api;
mod board;
mod interactive;

use std::str::FromStr;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use db::models::lead::{CreateLead, LeadStatus};
use services::services::{leads::LeadQuery, proposal_email::ProposalEmail};
use uuid::Uuid;

use crate::{api::AdminClient, board::LeadDraft};

#[derive(Parser, Debug)]
#[command(name = "leads-admin", author, version, about = "Staff console for property leads")]
struct Cli {
    /// Base URL of the leads server
    #[arg(long, env = "LEADS_API_URL", default_value = "http://127.0.0.1:3001")]
    api_url: String,

    /// Admin bearer token
    #[arg(long, env = "ADMIN_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Browse and edit leads interactively (default)
    Board,
    /// Print one page of leads
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, value_parser = parse_status)]
        status: Option<LeadStatus>,
    },
    /// Print a single lead
    Show { id: Uuid },
    /// Update proposals and/or status of a lead
    Edit {
        id: Uuid,
        #[arg(long)]
        proposal_1: Option<String>,
        #[arg(long)]
        proposal_2: Option<String>,
        #[arg(long)]
        proposal_3: Option<String>,
        #[arg(long, value_parser = parse_status)]
        status: Option<LeadStatus>,
    },
    /// Submit a lead through the public intake endpoint
    Submit {
        #[arg(long)]
        property_link: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
    },
    /// Send a proposal email directly
    SendEmail {
        #[arg(long)]
        to: String,
        #[arg(long)]
        first_name: String,
        #[arg(long, default_value = "")]
        proposal_1: String,
        #[arg(long, default_value = "")]
        proposal_2: String,
        #[arg(long, default_value = "")]
        proposal_3: String,
    },
}

fn parse_status(s: &str) -> Result<LeadStatus, String> {
    LeadStatus::from_str(s)
        .map_err(|_| format!("unknown status '{s}' (expected 'new lead' or 'proposals complete')"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    utils::logging::init(Some(if cli.verbose { "debug" } else { "warn" }));

    let client = AdminClient::new(&cli.api_url, cli.token).context("Failed to build API client")?;

    match cli.command.unwrap_or(Command::Board) {
        Command::Board => interactive::run(&client).await?,
        Command::List { page, status } => {
            let result = client
                .list(&LeadQuery {
                    page: Some(page),
                    status,
                })
                .await?;
            for lead in &result.leads {
                println!(
                    "{}  {:<24} {:<32} {}",
                    lead.id,
                    lead.full_name(),
                    lead.email,
                    lead.status
                );
            }
            if result.total_pages > 0 {
                println!(
                    "Page {} of {} ({} leads)",
                    result.page, result.total_pages, result.total_count
                );
            } else {
                println!("No leads.");
            }
        }
        Command::Show { id } => {
            let lead = client.get(id).await?;
            println!("{}", serde_json::to_string_pretty(&lead)?);
        }
        Command::Edit {
            id,
            proposal_1,
            proposal_2,
            proposal_3,
            status,
        } => {
            let lead = client.get(id).await?;
            let mut draft = LeadDraft::from_lead(&lead);
            for (slot, value) in draft.proposals.iter_mut().zip([proposal_1, proposal_2, proposal_3]) {
                if let Some(value) = value {
                    *slot = value;
                }
            }
            if let Some(status) = status {
                draft.status = status;
            }

            let saved = match client.save(id, &draft.to_save()).await {
                Ok(saved) => saved,
                Err(e) => {
                    interactive::report_notification(e.notification());
                    if e.is_conflict() {
                        bail!("lead {id} was modified concurrently, retry the edit");
                    }
                    return Err(e.into());
                }
            };
            println!("Saved {} (version {})", saved.lead.full_name(), saved.lead.version);
            interactive::report_notification(saved.notification.as_ref());
        }
        Command::Submit {
            property_link,
            first_name,
            last_name,
            email,
        } => {
            let lead = client
                .submit(&CreateLead {
                    property_link,
                    first_name,
                    last_name,
                    email,
                })
                .await?;
            println!("Created lead {}", lead.id);
        }
        Command::SendEmail {
            to,
            first_name,
            proposal_1,
            proposal_2,
            proposal_3,
        } => {
            client
                .send_proposal_email(&ProposalEmail {
                    to,
                    first_name,
                    proposal_1,
                    proposal_2,
                    proposal_3,
                })
                .await?;
            println!("Email sent");
        }
    }

    Ok(())
}
