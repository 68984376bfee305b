//! Terminal rendition of the lead board.

use std::time::Duration;

use anyhow::Result;
use db::models::lead::LeadStatus;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};
use services::services::leads::NotificationStatus;

use crate::{
    api::AdminClient,
    board::{FetchTicket, LeadBoard, SaveFollowUp},
};

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

async fn fetch(client: &AdminClient, board: &mut LeadBoard, ticket: FetchTicket) {
    let pb = spinner("Loading leads...");
    let result = client.list(&ticket.query()).await;
    pb.finish_and_clear();
    board.apply(ticket, result);
}

fn filter_label(status: Option<LeadStatus>) -> String {
    status.map_or_else(|| "all".to_string(), |s| s.to_string())
}

fn render(board: &LeadBoard) {
    println!();
    println!("Leads (status: {})", filter_label(board.status()));
    if let Some(banner) = board.error() {
        println!("  ! {banner}");
    }

    if board.leads().is_empty() {
        println!("  No leads.");
    }
    for (i, lead) in board.leads().iter().enumerate() {
        println!(
            "  {:>2}. {:<24} {:<32} {:<20} {}",
            i + 1,
            lead.full_name(),
            lead.email,
            lead.status,
            lead.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    if board.show_pagination() {
        println!(
            "  Page {} of {} ({} leads)",
            board.page(),
            board.total_pages(),
            board.total_count()
        );
    }
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Edit,
    Next,
    Previous,
    First,
    Jump,
    Filter,
    Refresh,
    Quit,
}

impl Action {
    fn label(self) -> &'static str {
        match self {
            Action::Edit => "Edit a lead",
            Action::Next => "Next page",
            Action::Previous => "Previous page",
            Action::First => "First page",
            Action::Jump => "Go to page",
            Action::Filter => "Filter by status",
            Action::Refresh => "Refresh",
            Action::Quit => "Quit",
        }
    }
}

fn available_actions(board: &LeadBoard) -> Vec<Action> {
    let mut actions = Vec::new();
    if !board.leads().is_empty() {
        actions.push(Action::Edit);
    }
    if board.page() < board.total_pages() {
        actions.push(Action::Next);
    }
    if board.page() > 1 {
        actions.push(Action::Previous);
        actions.push(Action::First);
    }
    if board.total_pages() > 1 {
        actions.push(Action::Jump);
    }
    actions.extend([Action::Filter, Action::Refresh, Action::Quit]);
    actions
}

/// Run the board until the user quits.
pub async fn run(client: &AdminClient) -> Result<()> {
    let theme = ColorfulTheme::default();
    let mut board = LeadBoard::new();
    let ticket = board.refresh();
    fetch(client, &mut board, ticket).await;

    loop {
        render(&board);

        let actions = available_actions(&board);
        let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
        let choice = Select::with_theme(&theme)
            .with_prompt("Action")
            .items(&labels)
            .default(0)
            .interact()?;

        let ticket = match actions[choice] {
            Action::Edit => edit(client, &mut board, &theme).await?,
            Action::Next => board.next_page(),
            Action::Previous => board.previous_page(),
            Action::First => Some(board.first_page()),
            Action::Jump => {
                let page: u32 = Input::with_theme(&theme)
                    .with_prompt(format!("Page (1-{})", board.total_pages()))
                    .interact_text()?;
                let ticket = board.go_to_page(page);
                if ticket.is_none() {
                    println!("No such page.");
                }
                ticket
            }
            Action::Filter => {
                let options = [None, Some(LeadStatus::NewLead), Some(LeadStatus::ProposalsComplete)];
                let labels: Vec<String> = options.iter().map(|s| filter_label(*s)).collect();
                let picked = Select::with_theme(&theme)
                    .with_prompt("Status")
                    .items(&labels)
                    .default(0)
                    .interact()?;
                Some(board.set_filter(options[picked]))
            }
            Action::Refresh => Some(board.refresh()),
            Action::Quit => return Ok(()),
        };

        if let Some(ticket) = ticket {
            fetch(client, &mut board, ticket).await;
        }
    }
}

async fn edit(
    client: &AdminClient,
    board: &mut LeadBoard,
    theme: &ColorfulTheme,
) -> Result<Option<FetchTicket>> {
    let labels: Vec<String> = board.leads().iter().map(|l| l.full_name()).collect();
    let index = Select::with_theme(theme)
        .with_prompt("Lead")
        .items(&labels)
        .default(0)
        .interact()?;
    if board.select(index).is_none() {
        return Ok(None);
    }

    loop {
        let Some(draft) = board.draft_mut() else {
            return Ok(None);
        };
        println!("Editing {} <{}>", draft.first_name, draft.email);

        for (i, proposal) in draft.proposals.iter_mut().enumerate() {
            *proposal = Input::with_theme(theme)
                .with_prompt(format!("Proposal {}", i + 1))
                .with_initial_text(proposal.clone())
                .allow_empty(true)
                .interact_text()?;
        }

        let statuses = [LeadStatus::NewLead, LeadStatus::ProposalsComplete];
        let labels: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
        let current = statuses.iter().position(|s| *s == draft.status).unwrap_or(0);
        let picked = Select::with_theme(theme)
            .with_prompt("Status")
            .items(&labels)
            .default(current)
            .interact()?;
        draft.status = statuses[picked];

        if !Confirm::with_theme(theme)
            .with_prompt("Save changes?")
            .default(true)
            .interact()?
        {
            board.close_draft();
            return Ok(None);
        }

        let (id, save) = (draft.id, draft.to_save());
        let pb = spinner("Saving...");
        let result = client.save(id, &save).await;
        pb.finish_and_clear();

        let already_notified = match &result {
            Ok(saved) => {
                report_notification(saved.notification.as_ref());
                false
            }
            Err(e) => {
                if e.is_conflict() {
                    println!("This lead was changed elsewhere.");
                } else {
                    println!("Save failed: {e}");
                }
                report_notification(e.notification());
                matches!(e.notification(), Some(NotificationStatus::Sent { .. }))
            }
        };

        match board.finish_save(result) {
            SaveFollowUp::Refresh(ticket) => return Ok(Some(ticket)),
            SaveFollowUp::Reload(id) => match client.get(id).await {
                Ok(fresh) => {
                    board.rebase_draft(&fresh);
                    println!(
                        "Your edits were kept on top of the latest version (stored status: {}).",
                        fresh.status
                    );
                    if already_notified && fresh.status != LeadStatus::ProposalsComplete {
                        println!("Saving as proposals complete again will email the lead again.");
                    }
                }
                Err(e) => {
                    println!("Could not reload the lead: {e}");
                    board.close_draft();
                    return Ok(Some(board.refresh()));
                }
            },
            SaveFollowUp::Retry => {}
        }

        if !Confirm::with_theme(theme)
            .with_prompt("Keep editing?")
            .default(true)
            .interact()?
        {
            board.close_draft();
            return Ok(Some(board.refresh()));
        }
    }
}

pub fn report_notification(notification: Option<&NotificationStatus>) {
    match notification {
        Some(NotificationStatus::Sent { id }) => println!("Proposal email sent ({id})."),
        Some(NotificationStatus::Failed { message }) => {
            println!("Proposal email failed: {message}")
        }
        None => {}
    }
}
