use log::{debug, warn};
use serde_json::json;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use vecviz::flow::Pacing;
use vecviz::render::{format_score, format_vector, heat_strip};
use vecviz::{generate, Config, FlowEvent, FlowObserver, FlowStep, Walkthrough};

const COMMANDS: &str = "add, search, embed, get, list, count, export, pace";

/// Documents loaded by `vecviz demo`
const DEMO_DOCUMENTS: [&str; 4] = [
    "The cat sat on the mat",
    "Vector databases store embeddings",
    "A sunny day at the beach",
    "Rust makes systems programming safe",
];
const DEMO_QUERY: &str = "a sunny day at the beach";

#[derive(Debug, PartialEq)]
pub enum Command {
    Add { text: String },
    Search { text: String, k_top: Option<usize> },
    Embed { text: String },
    Get { id: u64 },
    List,
    Count,
    Export,
    Pace { pacing: Pacing },
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CommandError {
    #[error("No command provided. Use: {commands}", commands = COMMANDS)]
    Missing,
    #[error("Unknown command: {0}. Available: {commands}", commands = COMMANDS)]
    Unknown(String),
    #[error("'{command}' command requires {what}. Usage: {usage}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
        usage: &'static str,
    },
    #[error("Invalid {what}: '{value}'. {expected}")]
    InvalidValue {
        what: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Parse a command from a provided argument vector
/// args[0] is the program name, the remaining words form one command line
pub fn parse_command_from_args(args: &[String]) -> Result<Command, CommandError> {
    if args.len() < 2 {
        return Err(CommandError::Missing);
    }

    parse_command(&args[1..].join(" "))
}

/// Parse one command line, as typed in the REPL
/// Text arguments are kept verbatim apart from surrounding whitespace
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(CommandError::Missing);
    }

    let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    match name {
        "add" => parse_add(rest),
        "search" => parse_search(rest),
        "embed" => Ok(Command::Embed { text: rest.to_string() }),
        "get" => parse_get(rest),
        "list" => parse_bare(rest, "list", Command::List),
        "count" => parse_bare(rest, "count", Command::Count),
        "export" => parse_bare(rest, "export", Command::Export),
        "pace" => parse_pace(rest),
        _ => Err(CommandError::Unknown(name.to_string())),
    }
}

/// Parse the 'add' command
/// Usage: add <text>
fn parse_add(rest: &str) -> Result<Command, CommandError> {
    if rest.is_empty() {
        return Err(CommandError::MissingArgument {
            command: "add",
            what: "a document",
            usage: "add <text>",
        });
    }

    Ok(Command::Add { text: rest.to_string() })
}

/// Parse the 'search' command
/// Usage: search <text> [--k_top <number>]
fn parse_search(rest: &str) -> Result<Command, CommandError> {
    let missing = CommandError::MissingArgument {
        command: "search",
        what: "a query",
        usage: "search <text> [--k_top <number>]",
    };

    let mut text = rest;
    let mut k_top = None;

    // Check if the line ends with --k_top and a single value
    if let Some((head, tail)) = rest.rsplit_once("--k_top") {
        let value = tail.trim();
        if !value.is_empty() && !value.contains(char::is_whitespace) {
            let k = value.parse::<i64>().map_err(|_| CommandError::InvalidValue {
                what: "--k_top value",
                value: value.to_string(),
                expected: "Must be an integer.",
            })?;
            // zero or negative asks for nothing
            k_top = Some(usize::try_from(k).unwrap_or(0));
            text = head.trim_end();
        }
    }

    if text.is_empty() {
        return Err(missing);
    }

    Ok(Command::Search { text: text.to_string(), k_top })
}

/// Parse the 'get' command
/// Usage: get <id>
fn parse_get(rest: &str) -> Result<Command, CommandError> {
    if rest.is_empty() {
        return Err(CommandError::MissingArgument {
            command: "get",
            what: "an ID",
            usage: "get <id>",
        });
    }

    let id = rest.parse::<u64>().map_err(|_| CommandError::InvalidValue {
        what: "ID",
        value: rest.to_string(),
        expected: "Must be a positive integer.",
    })?;

    Ok(Command::Get { id })
}

/// Parse the 'pace' command
/// Usage: pace <factor>
fn parse_pace(rest: &str) -> Result<Command, CommandError> {
    if rest.is_empty() {
        return Err(CommandError::MissingArgument {
            command: "pace",
            what: "a factor",
            usage: "pace <factor>",
        });
    }

    rest.parse::<f64>()
        .ok()
        .and_then(Pacing::new)
        .map(|pacing| Command::Pace { pacing })
        .ok_or_else(|| CommandError::InvalidValue {
            what: "pace factor",
            value: rest.to_string(),
            expected: "Must be a number >= 0 (0 skips all delays).",
        })
}

/// Commands that take no arguments
fn parse_bare(rest: &str, name: &str, command: Command) -> Result<Command, CommandError> {
    if !rest.is_empty() {
        warn!("'{}' command takes no arguments, ignoring extras", name);
    }

    Ok(command)
}

/// Prints the walkthrough as it is played
pub struct ConsoleNarrator {
    color: bool,
    last_step: Option<FlowStep>,
}

impl ConsoleNarrator {
    pub fn new(color: bool) -> ConsoleNarrator {
        ConsoleNarrator { color, last_step: None }
    }
}

impl FlowObserver for ConsoleNarrator {
    fn on_event(&mut self, event: &FlowEvent) {
        match event {
            FlowEvent::Step(step) => {
                // one compare step per item, narrate it once
                if self.last_step != Some(*step) {
                    println!("Status: {}", step.narration());
                    self.last_step = Some(*step);
                }
            }
            FlowEvent::Tokens(tokens) => {
                let shown: Vec<String> = tokens.iter().map(|token| format!("[{}]", token)).collect();
                println!("  tokens: {}", shown.join(" "));
            }
            FlowEvent::VectorReady(vector) => {
                println!("  vector: {}", heat_strip(vector, self.color));
                println!("          {}", format_vector(vector));
            }
            FlowEvent::Stored(item) => println!("  stored as #{}", item.id()),
            FlowEvent::Comparing { id, similarity } => {
                println!("  comparing with #{}: similarity {}", id, format_score(*similarity));
            }
            FlowEvent::Results(results) => {
                if results.is_empty() {
                    println!("No results found");
                } else {
                    println!("Top {} results:", results.len());
                    for (rank, scored) in results.iter().enumerate() {
                        println!("{}. ID: {}, Score: {}, Text: {}",
                            rank + 1, scored.item.id(), format_score(scored.similarity), scored.item.text());
                    }
                }
            }
        }
    }
}

/// REPL mode - interactive session, documents live until exit
pub async fn run_repl(walkthrough: &mut Walkthrough, config: &Config) -> vecviz::Result<()> {
    println!("vecviz - Vector Database Walkthrough");
    println!("Type 'help' for commands, 'exit' or 'quit' to quit\n");
    println!("Status: {}", FlowStep::Idle.narration());

    let mut narrator = ConsoleNarrator::new(config.color);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("vecviz> ");
        io::stdout().flush()?;

        let Some(input) = lines.next_line().await? else {
            println!();
            break;
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if input == "exit" || input == "quit" {
            println!("Goodbye!");
            break;
        }

        if input == "help" {
            print_help();
            continue;
        }

        let command = match parse_command(input) {
            Ok(cmd) => cmd,
            Err(error) => {
                eprintln!("Error: {}", error);
                continue;
            }
        };

        if let Err(error) = execute_command(walkthrough, command, &mut narrator).await {
            eprintln!("Error: {}", error);
        }
    }

    Ok(())
}

/// Single-command mode - run one command against a fresh session
/// Usage: vecviz <command> [args...]
pub async fn run_single_command(args: &[String], config: &Config) {
    let command = match parse_command_from_args(args) {
        Ok(cmd) => cmd,
        Err(error) => {
            eprintln!("Error: {}", error);
            std::process::exit(1);
        }
    };

    let mut walkthrough = Walkthrough::from_config(config);
    let mut narrator = ConsoleNarrator::new(config.color);
    if let Err(error) = execute_command(&mut walkthrough, command, &mut narrator).await {
        eprintln!("Error: {}", error);
        std::process::exit(1);
    }
}

/// Demo mode - narrate a small corpus being stored, then one query
pub async fn run_demo(config: &Config) -> vecviz::Result<()> {
    let mut walkthrough = Walkthrough::from_config(config);
    let mut narrator = ConsoleNarrator::new(config.color);

    for text in DEMO_DOCUMENTS {
        println!("\n> add {}", text);
        execute_command(&mut walkthrough, Command::Add { text: text.to_string() }, &mut narrator).await?;
    }

    println!("\n> search {}", DEMO_QUERY);
    let search = Command::Search { text: DEMO_QUERY.to_string(), k_top: None };
    execute_command(&mut walkthrough, search, &mut narrator).await
}

async fn execute_command(
    walkthrough: &mut Walkthrough,
    command: Command,
    narrator: &mut ConsoleNarrator,
) -> vecviz::Result<()> {
    match command {
        Command::Add { text } => {
            let timeline = walkthrough.submit_document(&text)?;
            walkthrough.play(timeline, narrator).await?;
        }

        Command::Search { text, k_top } => {
            let timeline = walkthrough.submit_query(&text, k_top)?;
            walkthrough.play(timeline, narrator).await?;
        }

        Command::Embed { text } => {
            let vector = generate(&text);
            println!("{}", serde_json::to_string(&json!({ "text": text, "vector": vector }))?);
        }

        Command::Get { id } => {
            match walkthrough.store().get(id) {
                Some(item) => {
                    println!("Document #{}: {}", item.id(), item.text());
                    println!("  {}", heat_strip(item.vector(), narrator.color));
                    println!("  {}", format_vector(item.vector()));
                }
                None => eprintln!("Error: Document #{} not found", id),
            }
        }

        Command::List => {
            let items = walkthrough.store().items();
            if items.is_empty() {
                println!("Database is empty");
            } else {
                println!("Stored documents:");
                for item in items {
                    println!("  #{} {} {}", item.id(), heat_strip(item.vector(), narrator.color), item.text());
                }
                println!("Total: {} documents", items.len());
            }
        }

        Command::Count => println!("{}", walkthrough.store().count()),

        Command::Export => {
            println!("{}", serde_json::to_string_pretty(walkthrough.store().items())?);
        }

        Command::Pace { pacing } => {
            debug!("pacing {} -> {}", walkthrough.pacing().factor(), pacing.factor());
            walkthrough.set_pacing(pacing);
            println!("Pacing set to {}x", pacing.factor());
        }
    }

    Ok(())
}

fn print_help() {
    println!("Available commands:");
    println!("  add <text>                     - Embed and store a document");
    println!("  search <text> [--k_top N]      - Search for similar documents (default k from VECVIZ_TOP_K, 3)");
    println!("  embed <text>                   - Print a text's vector as JSON without storing it");
    println!("  get <id>                       - Show a stored document");
    println!("  list                           - List all documents");
    println!("  count                          - Show document count");
    println!("  export                         - Print all documents as JSON");
    println!("  pace <factor>                  - Scale walkthrough delays (0 = instant)");
    println!("  help                           - Show this help");
    println!("  exit, quit                     - Exit the program");
}
