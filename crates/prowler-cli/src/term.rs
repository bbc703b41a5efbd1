use std::fs;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::PathBuf;

use miette::IntoDiagnostic;
use rustyline::error::ReadlineError;
use rustyline::{Editor, Helper, Highlighter, Hinter, Validator};

use prowler_server::{Client, CmdKind};

const PROMPT: &str = "(prowler) ";
const HISTORY_DIR: &str = ".explore";
const HISTORY_FILE: &str = ".exp_history";

struct Command {
    aliases: &'static [&'static str],
    help: &'static str,
}

const COMMANDS: &[Command] = &[
    Command {
        aliases: &["help", "h"],
        help: "Prints the help message.",
    },
    Command {
        aliases: &["get", "g"],
        help: "retrieve variable, constant, or function information of the target process.",
    },
    Command {
        aliases: &["set", "s"],
        help: "modify the corresponding variable of the target process.",
    },
    Command {
        aliases: &["list", "ls"],
        help: "list variable and constant names matching a pattern; use get for details.",
    },
    Command {
        aliases: &["exit", "quit", "q"],
        help: "exit the prompt",
    },
];

#[derive(Helper, Hinter, Highlighter, Validator)]
struct PromptHelper;

impl rustyline::completion::Completer for PromptHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let prefix = &line[..pos];
        let candidates = COMMANDS
            .iter()
            .flat_map(|c| c.aliases.iter())
            .filter(|alias| alias.starts_with(prefix))
            .map(|alias| alias.to_string())
            .collect();
        Ok((0, candidates))
    }
}

/// Interactive prompt over a connected client.
pub async fn run(client: Client) -> miette::Result<()> {
    let mut rl: Editor<PromptHelper, rustyline::history::DefaultHistory> =
        Editor::new().into_diagnostic()?;
    rl.set_helper(Some(PromptHelper));

    let history = history_path()?;
    let _ = rl.load_history(&history);

    println!("Type 'help' for list of commands.");

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line).into_diagnostic()?;

                let (cmd, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
                match cmd {
                    "help" | "h" => print_help(),
                    "get" | "g" => send(&client, CmdKind::Get, rest).await,
                    "set" | "s" => send(&client, CmdKind::Set, rest).await,
                    "list" | "ls" => send(&client, CmdKind::List, rest).await,
                    "exit" | "quit" | "q" => break,
                    _ => {
                        eprintln!("Command failed: command not available");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("exit");
                break;
            }
            Err(e) => {
                eprintln!("Prompt for input failed: {e}");
                break;
            }
        }
    }

    rl.save_history(&history).into_diagnostic()?;
    Ok(())
}

async fn send(client: &Client, kind: CmdKind, args: &str) {
    match client.send_expr(kind, args).await {
        Ok(out) => println!("{out}"),
        Err(e) => eprintln!("Command failed: {e}"),
    }
}

fn print_help() {
    println!("The following commands are available:");

    let width = COMMANDS
        .iter()
        .map(|c| c.aliases[0].len())
        .max()
        .unwrap_or(8);

    for cmd in COMMANDS {
        if cmd.aliases.len() > 1 {
            println!(
                "    {:width$} (alias: {}) - {}",
                cmd.aliases[0],
                cmd.aliases[1..].join(" | "),
                cmd.help,
            );
        } else {
            println!("    {:width$} - {}", cmd.aliases[0], cmd.help);
        }
    }
    println!();
}

/// `$HOME/.explore/.exp_history`, file mode 0600 inside a 0755 directory.
fn history_path() -> miette::Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let dir = home.join(HISTORY_DIR);
    if !dir.exists() {
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o755)
            .create(&dir)
            .into_diagnostic()?;
    }

    let path = dir.join(HISTORY_FILE);
    if !path.exists() {
        fs::OpenOptions::new()
            .create(true)
            .write(true)
            .mode(0o600)
            .open(&path)
            .into_diagnostic()?;
    }

    Ok(path)
}
