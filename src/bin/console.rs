//! Interactive console
//!
//! Menu-driven front-end for exercising one in-process room agent:
//! configure, start, stop, run the interaction routines, and take
//! screenshots, one operation at a time.

use room_agent_backend::agent::Agent;
use room_agent_backend::config::Config;
use room_agent_backend::state::{AgentConfig, StatusCell};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{stdin, AsyncBufReadExt, BufReader, Lines};

type Input = Lines<BufReader<tokio::io::Stdin>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let config = Config::from_env();
    let mut input = BufReader::new(stdin()).lines();
    let mut agent: Option<Agent> = None;

    println!("Room agent console. Configure an agent, then drive it.");
    loop {
        print_menu();
        let Some(line) = input.next_line().await? else {
            break;
        };
        match line.trim() {
            "1" => {
                if let Some(mut old) = agent.take() {
                    old.stop().await;
                }
                match configure(&mut input, &config).await? {
                    Some(new_agent) => {
                        println!("Agent configured.");
                        agent = Some(new_agent);
                    }
                    None => println!("Warning: invalid configuration, agent not created."),
                }
            }
            "2" => match agent.as_mut() {
                Some(a) => match a.start().await {
                    Ok(()) => println!("Agent running."),
                    Err(e) => println!("Error: start failed: {}", e),
                },
                None => println!("Warning: configure an agent first."),
            },
            "3" => match agent.as_mut() {
                Some(a) => {
                    a.stop().await;
                    println!("Agent stopped.");
                }
                None => println!("Warning: configure an agent first."),
            },
            "4" => match agent.as_ref() {
                Some(a) => println!("Status: {}", a.status()),
                None => println!("No agent configured."),
            },
            "5" => match agent.as_ref() {
                Some(a) => match a.list_participants().await {
                    Some(participants) => {
                        println!("{} participant(s):", participants.len());
                        for p in participants {
                            println!(
                                "  {} [video {}] [audio {}]",
                                p.name,
                                if p.video_muted { "muted" } else { "on" },
                                if p.audio_muted { "muted" } else { "on" },
                            );
                        }
                    }
                    None => println!("Warning: could not read the participants pane."),
                },
                None => println!("Warning: configure an agent first."),
            },
            "6" => match agent.as_ref() {
                Some(a) => match a.click_share_link().await {
                    Some(link) => println!("Invite link: {}", link),
                    None => println!("Warning: could not obtain an invite link."),
                },
                None => println!("Warning: configure an agent first."),
            },
            "7" => match agent.as_ref() {
                Some(a) => match a.meeting_duration().await {
                    Some(duration) => println!("Meeting duration: {}", duration),
                    None => println!("Warning: meeting timer not found."),
                },
                None => println!("Warning: configure an agent first."),
            },
            "8" => match agent.as_ref() {
                Some(a) => match a.screenshot().await {
                    Some(bytes) => {
                        let path = "screenshot.png";
                        match std::fs::write(path, &bytes) {
                            Ok(()) => println!("Saved {} ({} bytes)", path, bytes.len()),
                            Err(e) => println!("Error: could not write {}: {}", path, e),
                        }
                    }
                    None => println!("Warning: no live page to capture."),
                },
                None => println!("Warning: configure an agent first."),
            },
            "9" => {
                println!("Running cold start...");
                if Agent::cold_start(&config.automation).await {
                    println!("Cold start OK.");
                } else {
                    println!("Error: cold start failed.");
                }
            }
            "0" | "q" | "quit" => break,
            "" => {}
            other => println!("Unknown option: {}", other),
        }
    }

    if let Some(mut a) = agent.take() {
        a.stop().await;
    }
    println!("Bye.");
    Ok(())
}

fn print_menu() {
    println!();
    println!("  1) configure agent");
    println!("  2) start");
    println!("  3) stop");
    println!("  4) status");
    println!("  5) list participants");
    println!("  6) copy invite link");
    println!("  7) meeting duration");
    println!("  8) screenshot");
    println!("  9) cold start check");
    println!("  0) quit");
    print!("> ");
    let _ = std::io::stdout().flush();
}

async fn configure(input: &mut Input, config: &Config) -> anyhow::Result<Option<Agent>> {
    let url = prompt(input, "Room URL: ").await?;
    let headless = prompt_bool(input, "Headless? [Y/n]: ", true).await?;
    let mute_audio = prompt_bool(input, "Mute audio? [Y/n]: ", true).await?;

    let mut agent_config = AgentConfig::new(url);
    agent_config.name = "console".to_string();
    agent_config.headless = headless;
    agent_config.mute_audio = mute_audio;
    if agent_config.validate().is_err() {
        return Ok(None);
    }

    Ok(Some(Agent::new(
        "console".to_string(),
        agent_config,
        config.automation.clone(),
        config.conference.invite_host.clone(),
        Arc::new(StatusCell::default()),
    )))
}

async fn prompt(input: &mut Input, label: &str) -> anyhow::Result<String> {
    print!("{}", label);
    let _ = std::io::stdout().flush();
    Ok(input.next_line().await?.unwrap_or_default().trim().to_string())
}

async fn prompt_bool(input: &mut Input, label: &str, default: bool) -> anyhow::Result<bool> {
    let answer = prompt(input, label).await?;
    Ok(match answer.to_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    })
}
