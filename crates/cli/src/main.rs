use std::collections::VecDeque;
use std::io::{self, Write};

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use mausam_agents::WeatherAssistant;
use mausam_core::{
    AssistantReply, CommodityRequest, Language, RegionSelector, RequestContext, WeatherRequest,
};
use mausam_observability::{init_tracing, AppMetrics};

/// Turns of conversation carried into the next chat prompt.
const CONTEXT_TURNS: usize = 6;

#[derive(Debug, Parser)]
#[command(name = "mausam")]
#[command(about = "Weather, mandi prices and farm chat for Indian districts")]
struct Cli {
    /// Reply language: en, hi, ta, te, kn, ml, mr, gu or bn.
    #[arg(long, short, global = true, env = "MAUSAM_LANGUAGE", default_value = "en")]
    language: String,

    /// Print the whole reply as JSON instead of just the text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Classify a free-text question and answer it as weather, prices or chat,
    /// like `/v1/process-text`.
    Ask {
        #[arg(required = true)]
        text: Vec<String>,
    },
    Weather {
        #[arg(long)]
        district: String,
        #[arg(long)]
        state: Option<String>,
    },
    Prices {
        #[arg(long)]
        district: Option<String>,
        #[arg(long)]
        state: Option<String>,
        /// Arrival date, YYYY-MM-DD.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Interactive session; earlier turns are sent as context.
    Chat,
    /// List states, or the districts of one state.
    Regions {
        #[arg(long)]
        state: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("mausam_cli");
    let cli = Cli::parse();

    let language = Language::from_optional_str(Some(&cli.language))?;
    let (assistant, _) = WeatherAssistant::from_env(AppMetrics::shared())?;

    match cli.command {
        Command::Ask { text } => {
            let reply = assistant
                .handle_text(RequestContext::new(text.join(" "), language))
                .await?;
            print_reply(&reply, cli.json)?;
        }
        Command::Weather { district, state } => {
            let reply = assistant
                .weather(WeatherRequest {
                    region: RegionSelector {
                        state,
                        district: Some(district),
                    },
                    language,
                })
                .await?;
            print_reply(&reply, cli.json)?;
        }
        Command::Prices {
            district,
            state,
            date,
        } => {
            let reply = assistant
                .commodity_prices(CommodityRequest {
                    region: RegionSelector { state, district },
                    date,
                    language,
                })
                .await?;
            print_reply(&reply, cli.json)?;
        }
        Command::Chat => run_chat(&assistant, language).await?,
        Command::Regions { state } => {
            let listing = assistant.regions(state.as_deref())?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                for name in listing.names {
                    println!("{name}");
                }
            }
        }
    }

    Ok(())
}

fn print_reply(reply: &AssistantReply, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(reply)?);
    } else {
        println!("{}", reply.text);
        if reply.translation_degraded {
            eprintln!("(translation unavailable, showing English)");
        }
    }
    Ok(())
}

async fn run_chat(assistant: &WeatherAssistant, language: Language) -> Result<()> {
    let mut transcript = Transcript::new(CONTEXT_TURNS);

    println!(
        "Mausam chat ({}). Ask about weather, mandi prices or farming. type 'exit' to quit.",
        language.display_name()
    );

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }
        if message.is_empty() {
            continue;
        }

        let ctx = RequestContext::new(message, language).with_context(transcript.render());
        match assistant.handle_text(ctx).await {
            Ok(reply) => {
                println!("\n{}\n", reply.text);
                transcript.push(message, &reply.text);
            }
            Err(err) => eprintln!("\n{err}\n"),
        }
    }

    Ok(())
}

/// Bounded "User:/Assistant:" history.
#[derive(Debug)]
struct Transcript {
    turns: VecDeque<(String, String)>,
    max_turns: usize,
}

impl Transcript {
    fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns,
        }
    }

    fn push(&mut self, user: &str, assistant: &str) {
        if self.turns.len() == self.max_turns {
            self.turns.pop_front();
        }
        self.turns.push_back((user.to_string(), assistant.to_string()));
    }

    fn render(&self) -> Option<String> {
        if self.turns.is_empty() {
            return None;
        }
        Some(
            self.turns
                .iter()
                .map(|(user, assistant)| format!("User: {user}\nAssistant: {assistant}"))
                .collect::<Vec<_>>()
                .join("\n\n"),
        )
    }
}
