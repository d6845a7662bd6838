//! Control Review - 交互式对话入口
//!
//! 读取 .env 与配置，加载控制项库，进入 `You:` 对话循环；exit / quit 退出。

use std::io::{self, BufRead, Write};

use anyhow::Context;
use control_review::{load_config, observability, ControlReviewAgent};

fn print_help() {
    println!("Commands: /history, /prompt <5W|OE|DE|METHODS>, /prompts, exit");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    observability::init();

    let cfg = load_config(None).context("Failed to load configuration")?;
    let mut agent = ControlReviewAgent::from_config(&cfg);
    if agent.uses_mock_llm() && cfg.llm.provider != "mock" {
        eprintln!(
            "Warning: no API key found for provider '{}'. Running with the mock LLM.",
            cfg.llm.provider
        );
    }
    println!(
        "Control review agent ready ({} controls loaded). Type 'exit' to quit.",
        agent.store().len()
    );
    print_help();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("\nYou: ");
        io::stdout().flush().context("Failed to flush stdout")?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read input")?;
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        match input {
            "/help" => print_help(),
            "/history" => {
                for entry in agent.transcript().entries() {
                    println!(
                        "[{}] {}: {}",
                        entry.at.format("%H:%M:%S"),
                        entry.message.role.speaker(),
                        entry.message.content
                    );
                }
            }
            "/prompts" => {
                for (key, text) in agent.prompts().snapshot() {
                    println!("--- {key} ---\n{}", text.trim());
                }
            }
            cmd if cmd.starts_with("/prompt ") => {
                let key = cmd.trim_start_matches("/prompt ").trim();
                match agent.prompts().get(key) {
                    Some(template) => println!("{}", template.as_str().trim()),
                    None => println!("Unknown prompt key '{key}' (expected 5W, OE, DE or METHODS)"),
                }
            }
            _ => match agent.run(input).await {
                Ok(reply) => println!("\nAssistant: {reply}"),
                Err(e) => {
                    tracing::error!(error = %e, "Turn failed");
                    println!("\nError: {e}");
                }
            },
        }
    }

    println!("Goodbye.");
    Ok(())
}
