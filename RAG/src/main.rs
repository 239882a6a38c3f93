// Terminal chat client for the intake assistant backend.

use anyhow::Result;
use intake_rag::chat::{ChatSession, HttpQueryClient};
use intake_rag::config::chat_backend_url;
use intake_rag::models::{ChatMessage, Role};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

fn render(message: &ChatMessage) {
    match message.role {
        // Typed input is already on screen.
        Role::User => {}
        Role::Assistant => println!("assistant> {}\n", message.content),
    }
}

fn prompt() -> Result<()> {
    print!("you> ");
    std::io::stdout().flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let backend = chat_backend_url();
    let client = HttpQueryClient::new(&backend);
    let mut session = ChatSession::new();

    println!("Pursuit Assistant");
    println!("Ask about pursuits. Backend: {}. Type /quit to leave.\n", backend);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await? {
        if line.trim() == "/quit" {
            break;
        }
        session.submit(&client, &line, render).await;
        prompt()?;
    }

    log::info!("Chat session ended after {} messages", session.history().len());
    Ok(())
}
