use super::ChatState;
use super::{fs, shell};
use crate::cli::render_config;
use crate::ux::{ChatMessageType, GenerationSpinner, format_footer_metrics, style_chat_text};
use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use futures::StreamExt;
use pilot_core::completion::{Completion, CompletionMetrics, CompletionSettings, SenderType};
use pilot_core::config::save_config;
use pilot_core::get_chat_model;
use pilot_core::mode::{ALL_MODES, Mode};
use pilot_core::model::{ENV_SCAN_ORDER, models_for};
use rustyline::completion::{Candidate, Completer};
use rustyline::error::ReadlineError;
use rustyline::hint::Hinter;
use rustyline::{CompletionType, Editor, Helper, Highlighter, Validator};
use std::env;
use std::io::Write as _;
use tracing::debug;

// -------------
// REPL commands
// -------------
#[derive(Parser, Debug)]
#[command(multicall = true)]
struct CliCommand {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clear chat history
    Clear,
    /// Show or update configuration. E.g. /config temperature=0.7
    Config {
        /// A key=value assignment, or nothing to view the configuration.
        assignment: Option<String>,
    },
    /// Show API key status for every provider
    Env,
    /// Read a file and add it to the conversation
    Read {
        /// File path, relative to the workspace.
        path: String,
    },
    /// Write content to a file
    Write {
        /// File path, relative to the workspace.
        path: String,
        /// Content to write.
        content: Vec<String>,
    },
    /// List a directory
    Ls {
        /// Directory path, defaults to the workspace.
        path: Option<String>,
    },
    /// List models available for the configured provider
    Models,
    /// List the available chat modes
    Modes,
    /// Show or switch the chat mode. E.g. /mode code
    #[command(alias = "m")]
    Mode {
        /// Mode name to switch to.
        name: Option<String>,
    },
    /// List MCP tools, or invoke one with JSON parameters
    Mcp {
        /// Tool name to invoke.
        tool: Option<String>,
        /// JSON object with the tool parameters.
        params: Option<String>,
    },
    /// Exit the chat session
    #[command(alias = "q", alias = "quit")]
    Exit,
}

impl Command {
    /// Executes a REPL command.
    ///
    /// Returns `Ok(false)` if the REPL should exit.
    pub async fn execute(self, state: &mut ChatState) -> Result<bool> {
        match self {
            Command::Clear => {
                state.session.clear_history();
                println!("Chat history cleared");
            }
            Command::Config { assignment } => match assignment.as_deref() {
                Some("reset") => {
                    state.config.reset();
                    state.session.set_mode(state.config.mode);
                    persist_config(state);
                    println!("Configuration reset to defaults");
                }
                Some(assignment) => {
                    let Some((key, value)) = assignment.split_once('=') else {
                        print_error(&format!("Expected key=value, got '{assignment}'"));
                        return Ok(true);
                    };
                    match state.config.set(key.trim(), value.trim()) {
                        Ok(()) => {
                            // Keep the session mode in lockstep with the config.
                            state.session.set_mode(state.config.mode);
                            persist_config(state);
                            println!("Updated {}", key.trim());
                        }
                        Err(e) => print_error(&e.to_string()),
                    }
                }
                None => print!("{}", render_config(&state.config)),
            },
            Command::Env => {
                for provider in ENV_SCAN_ORDER {
                    let active = *provider == state.config.api_provider;
                    println!("{}", env_status_line(*provider, active));
                }
            }
            Command::Read { path } => {
                match fs::read_file(&path, &state.config.workspace_path) {
                    Ok((content, history)) => {
                        println!("{content}");
                        state.session.add_message(SenderType::User, &history);
                    }
                    Err(e) => print_error(&e.to_string()),
                }
            }
            Command::Write { path, content } => {
                let content = content.join(" ");
                match fs::write_file(&path, &content, &state.config.workspace_path) {
                    Ok(history) => {
                        println!("{history}");
                        state.session.add_message(SenderType::User, &history);
                    }
                    Err(e) => print_error(&e.to_string()),
                }
            }
            Command::Ls { path } => {
                match fs::list_dir(path.as_deref(), &state.config.workspace_path) {
                    Ok((display, history)) => {
                        if display.is_empty() {
                            println!("(empty)");
                        } else {
                            println!("{display}");
                        }
                        state.session.add_message(SenderType::User, &history);
                    }
                    Err(e) => print_error(&e.to_string()),
                }
            }
            Command::Models => {
                for model in models_for(state.config.api_provider) {
                    let marker = if model.id == state.config.model { "*" } else { " " };
                    println!("{marker} {model}");
                }
                println!("Switch with /config model=<id>");
            }
            Command::Modes => {
                for mode in ALL_MODES {
                    let marker = if *mode == state.session.mode() { "*" } else { " " };
                    println!("{marker} {:<10} {}", mode.as_str(), mode.description());
                }
            }
            Command::Mode { name } => match name {
                Some(name) => match name.parse::<Mode>() {
                    Ok(mode) => {
                        state.session.set_mode(mode);
                        state.config.mode = mode;
                        persist_config(state);
                        println!("Mode switched to: {mode}");
                    }
                    Err(e) => print_error(&e),
                },
                None => println!("Current mode: {}", state.session.mode()),
            },
            Command::Mcp { tool, params } => match tool {
                Some(tool) => {
                    let params = params.unwrap_or_else(|| "{}".to_string());
                    let params: serde_json::Value = match serde_json::from_str(&params) {
                        Ok(value) => value,
                        Err(e) => {
                            print_error(&format!("Invalid JSON parameters: {e}"));
                            return Ok(true);
                        }
                    };
                    match state.mcp.call_tool(&tool, &params).await {
                        Ok(result) => match serde_json::to_string_pretty(&result) {
                            Ok(pretty) => println!("{pretty}"),
                            Err(_) => println!("{result}"),
                        },
                        Err(e) => print_error(&e.to_string()),
                    }
                }
                None => match state.mcp.list_tools().await {
                    Ok(tools) if tools.is_empty() => {
                        println!("MCP server has no tools.");
                    }
                    Ok(tools) => {
                        for tool in tools {
                            println!("{:<20} {}", tool.name, tool.description);
                        }
                    }
                    Err(e) => print_error(&e.to_string()),
                },
            },
            Command::Exit => {
                println!("Bye!");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn print_error(message: &str) {
    eprintln!("{}", style_chat_text(message, ChatMessageType::Error));
}

/// Writes the config to disk. A write failure is reported and the session
/// keeps going with the in-memory value.
fn persist_config(state: &ChatState) {
    if let Err(e) = save_config(&state.config, state.config_path.clone()) {
        print_error(&format!("Failed to save configuration: {e}"));
    }
}

/// One `/env` table row: display name, key variable and its status.
fn env_status_line(provider: pilot_core::model::Provider, active: bool) -> String {
    let key_set = env::var(provider.env_var())
        .map(|v| !v.is_empty())
        .unwrap_or(false);
    let status = if key_set { "set" } else { "not set" };
    let active = if active { " (active)" } else { "" };
    format!(
        "{:<20} {:<22} {status}{active}",
        provider.display_name(),
        provider.env_var()
    )
}

// Mode command completion
fn mode_compl(
    line: &str,
    pos: usize,
    mode_names: &[String],
) -> Result<(usize, Vec<CompletionCandidate>), ReadlineError> {
    let line_to_pos = &line[..pos];
    if let Some(space_pos) = line_to_pos.rfind(' ') {
        let mode_prefix_start = space_pos + 1;
        if mode_prefix_start <= line_to_pos.len() {
            let mode_prefix = &line_to_pos[mode_prefix_start..];
            let candidates = mode_names
                .iter()
                .filter(|name| name.starts_with(mode_prefix))
                .map(|name| CompletionCandidate::new(name))
                .collect();
            return Ok((mode_prefix_start, candidates));
        }
    }
    Ok((0, Vec::new()))
}

// -------------
// REPL completion
// -------------
#[derive(Helper, Validator, Highlighter)]
struct Repl {
    pub command_names: Vec<String>,
    pub mode_names: Vec<String>,
}

#[derive(Debug)]
struct CompletionCandidate {
    text: String,
    display_string: String,
}

impl CompletionCandidate {
    pub fn new(text: &str) -> Self {
        let display_string = style_chat_text(text, ChatMessageType::Footer).to_string();
        Self {
            text: text.to_owned(),
            display_string,
        }
    }
}

impl Candidate for CompletionCandidate {
    fn display(&self) -> &str {
        &self.display_string
    }

    fn replacement(&self) -> &str {
        &self.text
    }
}

impl Completer for Repl {
    type Candidate = CompletionCandidate;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> Result<(usize, Vec<Self::Candidate>), ReadlineError> {
        if !line.starts_with('/') {
            return Ok((0, Vec::new()));
        }

        let args = shlex::split(line).unwrap_or_default();
        if let Ok(cli_command) = CliCommand::try_parse_from(&args) {
            return match cli_command.command {
                Command::Mode { .. } => mode_compl(line, pos, &self.mode_names),
                _ => Ok((0, Vec::new())),
            };
        }

        let candidates = self
            .command_names
            .iter()
            .filter(|name| name.starts_with(line))
            .map(|name| CompletionCandidate::new(name))
            .collect();

        Ok((0, candidates))
    }
}

impl Hinter for Repl {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if line.is_empty() || pos < line.len() {
            return None;
        }
        if line.starts_with('/') {
            // Suggest command completions
            self.command_names
                .iter()
                .find(|&cmd_name| cmd_name.starts_with(line))
                .map(|cmd_name| cmd_name[line.len()..].into())
        } else {
            None
        }
    }
}

/// Runs the interactive REPL for the chat session.
pub async fn run(mut state: ChatState) -> Result<()> {
    println!("Welcome to pilot! Type '/help' for commands, '/q' to exit.");

    let config = rustyline::Config::builder()
        .history_ignore_dups(true)?
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();

    let command_names = CliCommand::command()
        .get_subcommands()
        .flat_map(|c| c.get_name_and_visible_aliases())
        .map(|s| format!("/{s}"))
        .collect::<Vec<_>>();
    let mode_names = ALL_MODES
        .iter()
        .map(|m| m.as_str().to_string())
        .collect::<Vec<_>>();

    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(Repl {
        command_names,
        mode_names,
    }));

    loop {
        let prompt_meta = format!(
            "[{}/{} | {}]",
            state.config.api_provider, state.config.model, state.session.mode()
        );
        let prompt = format!(
            "\n{}\n{}",
            style_chat_text(&prompt_meta, ChatMessageType::Prompt),
            style_chat_text("> ", ChatMessageType::Prompt)
        );

        let readline = rl.readline(&prompt);
        match readline {
            Ok(line) => {
                rl.add_history_entry(&line)?;
                let trimmed_line = line.trim();

                if trimmed_line.is_empty() {
                    continue;
                }

                if trimmed_line.starts_with('/') {
                    let args = shlex::split(trimmed_line).unwrap_or_default();
                    match CliCommand::try_parse_from(args) {
                        Ok(cli_command) => {
                            if !cli_command.command.execute(&mut state).await? {
                                return Ok(()); // Exit REPL
                            }
                        }
                        Err(e) => {
                            e.print()?;
                        }
                    }
                } else {
                    process_message(&mut state, trimmed_line).await?;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Type /exit to quit.");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nBye!");
                return Ok(());
            }
            Err(err) => {
                return Err(err.into());
            }
        }
    }
}

/// Sends a user message to the configured provider and prints the reply.
///
/// The adapter is rebuilt from the current config on every turn, so provider
/// or model switches apply immediately. On any provider error the user
/// message stays in history and no assistant message is appended.
async fn process_message(state: &mut ChatState, line: &str) -> Result<()> {
    state.session.add_message(SenderType::User, line);

    let model = match get_chat_model(&state.config) {
        Ok(model) => model,
        Err(e) => {
            print_error(&e.to_string());
            return Ok(());
        }
    };
    let settings = CompletionSettings {
        temperature: state.config.temperature,
        max_tokens: state.config.max_tokens,
    };
    let conversation = state.session.conversation();

    let spinner = GenerationSpinner::new("Thinking...".to_string());
    let mut stream = model.complete(&conversation, &settings).await;

    let mut text = String::new();
    let mut finish_reason: Option<String> = None;
    let mut metrics = CompletionMetrics::default();

    // In-flight requests are not cancellable; Ctrl-C just prints a hint and
    // the stream is awaited to completion.
    let mut ctrl_c = Box::pin(tokio::signal::ctrl_c());
    loop {
        let next = tokio::select! {
            _ = &mut ctrl_c => {
                println!("Waiting for the response to finish. Type /exit to quit afterwards.");
                ctrl_c = Box::pin(tokio::signal::ctrl_c());
                continue;
            }
            next = stream.next() => next,
        };
        match next {
            Some(Ok(Completion::Response(chunk))) => {
                text.push_str(&chunk.text);
                if let Some(reason) = chunk.finish_reason {
                    finish_reason = Some(reason);
                }
            }
            Some(Ok(Completion::Metrics(m))) => {
                metrics = m;
            }
            Some(Err(e)) => {
                spinner.clear();
                print_error(&e.to_string());
                return Ok(());
            }
            None => break,
        }
    }
    spinner.clear();
    debug!("completion finished, reason: {finish_reason:?}");

    println!("{text}");
    println!();
    println!("{}", format_footer_metrics(&metrics, finish_reason.as_deref()));

    state.session.add_message(SenderType::Assistant, &text);
    offer_shell_commands(state, &text);
    Ok(())
}

/// Offers extracted shell commands for confirmation, runs the chosen one and
/// records command plus output in the conversation history.
fn offer_shell_commands(state: &mut ChatState, reply: &str) {
    let candidates = shell::extract_commands(reply);
    if candidates.is_empty() {
        return;
    }

    let selected = match prompt_selection(&candidates) {
        Ok(selected) => selected,
        Err(e) => {
            print_error(&e.to_string());
            return;
        }
    };
    let Some(command) = selected else {
        return;
    };

    println!("$ {command}");
    match shell::run_command(&command, &state.config.workspace_path) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            let entry = shell::format_history_entry(&command, &output);
            state.session.add_message(SenderType::User, &entry);
        }
        Err(e) => print_error(&e.to_string()),
    }
}

/// Asks the user which extracted command to run, if any.
fn prompt_selection(candidates: &[String]) -> Result<Option<String>> {
    if candidates.len() == 1 {
        print!("Run `{}`? [y/N] ", candidates[0]);
    } else {
        println!("Found {} commands:", candidates.len());
        for (i, candidate) in candidates.iter().enumerate() {
            println!("  {}. {candidate}", i + 1);
        }
        print!("Run which command? [1-{}, empty to skip] ", candidates.len());
    }
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(parse_selection(input.trim(), candidates.len())
        .map(|i| candidates[i].clone()))
}

/// Maps a confirmation reply to a candidate index. A single candidate takes
/// y/yes; several take a 1-based number.
fn parse_selection(input: &str, candidate_count: usize) -> Option<usize> {
    if candidate_count == 1 {
        return matches!(input.to_lowercase().as_str(), "y" | "yes").then_some(0);
    }
    input
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=candidate_count).contains(n))
        .map(|n| n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilot_core::config::Config;
    use pilot_core::model::Provider;
    use tempfile::{TempDir, tempdir};

    fn test_state() -> (ChatState, TempDir) {
        let dir = tempdir().unwrap();
        let config = Config {
            api_provider: Provider::Test,
            model: "test-model".to_string(),
            workspace_path: dir.path().to_path_buf(),
            ..Config::default()
        };
        let state = ChatState::new(config, Some(dir.path().join("pilot.json"))).unwrap();
        (state, dir)
    }

    #[test]
    fn test_mode_command_completion() {
        use rustyline::history::DefaultHistory;

        let history = DefaultHistory::new();
        let repl = Repl {
            command_names: vec![],
            mode_names: vec!["assistant".to_string(), "code".to_string()],
        };

        // Simulate user typing "/mode co"
        let line = "/mode co";
        let (start, candidates) = repl
            .complete(line, line.len(), &rustyline::Context::new(&history))
            .unwrap();

        assert_eq!(start, 6); // "/mode ".len() is 6
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].replacement(), "code");
    }

    #[test]
    fn test_command_name_completion() {
        use rustyline::history::DefaultHistory;

        let history = DefaultHistory::new();
        let repl = Repl {
            command_names: vec!["/models".to_string(), "/modes".to_string()],
            mode_names: vec![],
        };

        let line = "/mod";
        let (start, candidates) = repl
            .complete(line, line.len(), &rustyline::Context::new(&history))
            .unwrap();
        assert_eq!(start, 0);
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("y", 1), Some(0));
        assert_eq!(parse_selection("YES", 1), Some(0));
        assert_eq!(parse_selection("n", 1), None);
        assert_eq!(parse_selection("", 1), None);

        assert_eq!(parse_selection("2", 3), Some(1));
        assert_eq!(parse_selection("0", 3), None);
        assert_eq!(parse_selection("4", 3), None);
        assert_eq!(parse_selection("", 3), None);
    }

    #[test]
    fn test_unknown_command_fails_to_parse() {
        assert!(CliCommand::try_parse_from(["/bogus"]).is_err());
    }

    #[tokio::test]
    async fn test_clear_command_empties_history() {
        let (mut state, _dir) = test_state();
        state.session.add_message(SenderType::User, "hello");

        let keep_going = Command::Clear.execute(&mut state).await.unwrap();
        assert!(keep_going);
        assert!(state.session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_exit_command_stops_the_repl() {
        let (mut state, _dir) = test_state();
        let keep_going = Command::Exit.execute(&mut state).await.unwrap();
        assert!(!keep_going);
    }

    #[tokio::test]
    async fn test_ls_appends_one_history_entry() {
        let (mut state, dir) = test_state();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        Command::Ls { path: None }.execute(&mut state).await.unwrap();

        assert_eq!(state.session.messages().len(), 1);
        let entry = &state.session.messages()[0];
        assert_eq!(entry.sender, SenderType::User);
        assert!(entry.text.contains("[DIR] sub"));
        assert!(entry.text.contains("[FILE] a.txt"));
    }

    #[tokio::test]
    async fn test_mode_command_switches_session_and_persists() {
        let (mut state, dir) = test_state();

        Command::Mode {
            name: Some("code".to_string()),
        }
        .execute(&mut state)
        .await
        .unwrap();

        assert_eq!(state.session.mode(), Mode::Code);
        assert_eq!(state.config.mode, Mode::Code);
        let saved = std::fs::read_to_string(dir.path().join("pilot.json")).unwrap();
        assert!(saved.contains("\"mode\": \"code\""));
    }

    #[tokio::test]
    async fn test_config_save_failure_keeps_the_repl_alive() {
        let (mut state, dir) = test_state();
        // Make the config path unwritable: its parent is a regular file.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        state.config_path = Some(blocker.join("pilot.json"));

        let keep_going = Command::Config {
            assignment: Some("maxTokens=2048".to_string()),
        }
        .execute(&mut state)
        .await
        .unwrap();

        assert!(keep_going);
        // The in-memory update survives the failed write.
        assert_eq!(state.config.max_tokens, 2048);
    }

    #[tokio::test]
    async fn test_config_reset_restores_defaults_and_persists() {
        let (mut state, dir) = test_state();
        state.config.set("temperature", "0.9").unwrap();
        state.config.set("mode", "code").unwrap();
        state.session.set_mode(Mode::Code);

        let keep_going = Command::Config {
            assignment: Some("reset".to_string()),
        }
        .execute(&mut state)
        .await
        .unwrap();

        assert!(keep_going);
        assert_eq!(state.config.temperature, Config::default().temperature);
        assert_eq!(state.config.mode, Mode::Assistant);
        assert_eq!(state.session.mode(), Mode::Assistant);
        assert!(dir.path().join("pilot.json").exists());
    }

    #[test]
    fn test_env_status_lines_align() {
        for provider in pilot_core::model::ENV_SCAN_ORDER {
            let line = env_status_line(*provider, false);
            assert!(line.starts_with(provider.display_name()));
            // The key variable starts at a fixed column for every provider.
            assert_eq!(line.find(provider.env_var()), Some(21));
        }
    }

    #[tokio::test]
    async fn test_process_message_appends_assistant_reply() {
        let (mut state, _dir) = test_state();

        process_message(&mut state, "hi").await.unwrap();

        let messages = state.session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, SenderType::User);
        assert_eq!(messages[1].sender, SenderType::Assistant);
        assert_eq!(messages[1].text, "Hello world");
    }

    #[tokio::test]
    async fn test_process_message_keeps_user_message_on_provider_error() {
        let (mut state, _dir) = test_state();
        state.config.model = "test-model-error".to_string();

        process_message(&mut state, "hi").await.unwrap();

        let messages = state.session.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, SenderType::User);
    }
}
