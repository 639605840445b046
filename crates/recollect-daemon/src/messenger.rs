//! Console messaging collaborator
//!
//! Renders review deliveries as text lines. The daemon writes them to
//! stdout; tests write them to a buffer.

use std::io::{self, Write};
use std::sync::Mutex;

use async_trait::async_trait;
use colored::Colorize;
use recollect_core::{Delivery, DeliveryError, Messenger, ReviewCard};

/// Writes each delivery as one or more lines
pub struct ConsoleMessenger<W> {
    out: Mutex<W>,
}

impl ConsoleMessenger<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleMessenger<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Text for one delivery addressed to `channel_id`
pub fn render(channel_id: i64, delivery: &Delivery) -> String {
    let prefix = format!("[channel {channel_id}]").dimmed();
    match delivery {
        Delivery::SessionStarted { due, .. } => {
            let noun = if *due == 1 { "memory" } else { "memories" };
            format!("{prefix} {} {due} {noun} due", "Review time:".cyan().bold())
        }
        Delivery::Review(card) => format!("{prefix} {}", render_card(card)),
        Delivery::Remaining { count, .. } => {
            format!("{prefix} {}", format!("...and {count} more waiting").dimmed())
        }
        Delivery::SessionFinished { delivered, .. } => {
            format!("{prefix} {}", format!("Session complete: {delivered} reviewed").green())
        }
    }
}

fn render_card(card: &ReviewCard) -> String {
    let memory = &card.memory;
    let mut line = memory.content.white().bold().to_string();
    if card.urgent {
        line = format!("{} {line}", "URGENT".red().bold());
    }
    format!(
        "{line}\n  saved {} ({}), {}, retention {:.0}%, next review {}",
        memory.created_at.format("%Y-%m-%d"),
        memory.encoding_context().describe(),
        card.emotion,
        card.retention * 100.0,
        card.next_review,
    )
}

#[async_trait]
impl<W: Write + Send> Messenger for ConsoleMessenger<W> {
    async fn deliver(&self, channel_id: i64, delivery: &Delivery) -> Result<(), DeliveryError> {
        let text = render(channel_id, delivery);
        let mut out = self
            .out
            .lock()
            .map_err(|_| DeliveryError::Failed("Console writer poisoned".into()))?;
        writeln!(out, "{text}")
            .and_then(|_| out.flush())
            .map_err(|e| DeliveryError::Failed(e.to_string()))
    }
}
