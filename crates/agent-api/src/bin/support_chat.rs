//! Customer support chat on stdin/stdout, backed by long-term memory.

use agent_api::bootstrap;
use agent_core::support::{FAREWELL, GREETING};
use agent_core::{is_exit_command, AgentConfiguration, SupportDeps, SupportSession};
use agent_llm::{load_chat_model, ProviderSettings};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), bootstrap::BoxError> {
    dotenvy::dotenv().ok();
    bootstrap::init_tracing();

    let config = AgentConfiguration::from_env()?;
    let model = load_chat_model(&config.model, &ProviderSettings::from_env())?;
    let session = SupportSession::new(SupportDeps {
        model,
        memory: bootstrap::memory_from_env(),
        user_id: config.memory_user_id.clone(),
    })?;

    println!("{}", GREETING);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            println!();
            println!("Customer Support: {}", FAREWELL);
            break;
        };
        if is_exit_command(&line) {
            println!("Customer Support: {}", FAREWELL);
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        match session.respond(line.trim()).await {
            Ok(reply) => println!("Customer Support: {}", reply),
            Err(e) => {
                tracing::error!(error = %e, "turn failed");
                println!("Customer Support: Sorry, something went wrong. Please try again.");
            }
        }
    }
    Ok(())
}
