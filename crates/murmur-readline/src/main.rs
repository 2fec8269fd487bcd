mod commands;
mod logging;

use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use rustyline::Editor;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use tokio::sync::broadcast;

use commands::{COMMANDS, Command};
use murmur_application::{SessionCollaborators, SessionFacade};
use murmur_core::chat::PersistencePort;
use murmur_core::event::SessionNotice;
use murmur_core::message::{Attachment, Message, Sender};
use murmur_infrastructure::{ConfigService, InMemoryChatRepository, MurmurPaths, TomlChatRepository};

#[derive(Parser, Debug)]
#[command(name = "murmur", version, about = "Chat session REPL with simulated OTP sign-in")]
struct Args {
    /// Directory for config.toml, chat_state.toml and logs (default: ~/.config/murmur)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Keep rooms and messages in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return Ok((0, vec![]));
        }

        let candidates = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd.clone(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let paths = MurmurPaths::new(args.data_dir)?;
    let (_log_guard, mut log_rx) = logging::init_logging(&paths.logs_dir(), &args.log_level)?;

    let config = ConfigService::new(&paths).get_config()?;
    let persistence: Arc<dyn PersistencePort> = if args.ephemeral {
        Arc::new(InMemoryChatRepository::new())
    } else {
        Arc::new(TomlChatRepository::at(&paths))
    };
    let collaborators = SessionCollaborators::simulated(&config);
    let facade = Arc::new(SessionFacade::bootstrap(config, persistence, collaborators).await?);

    // Background output: notices and forwarded warnings print as they arrive
    let notice_printer = tokio::spawn(print_notices(facade.subscribe_notices()));
    let log_printer = tokio::spawn(async move {
        while let Some(entry) = log_rx.recv().await {
            eprintln!(
                "{}",
                format!("[{} {}] {}", entry.level, entry.target, entry.message).yellow()
            );
        }
    });

    let mut rl: Editor<CliHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== Murmur ===".bright_magenta().bold());
    println!(
        "{}",
        "Type '/help' for commands, plain text to chat, or 'quit' to exit.".bright_black()
    );
    print_rooms(&facade);
    println!();

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                match commands::parse(trimmed) {
                    Ok(Command::Quit) => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    Ok(command) => {
                        if let Err(e) = run_command(&facade, command).await {
                            eprintln!("{}", format!("Error: {e}").red());
                        }
                    }
                    Err(usage) => println!("{}", usage.bright_black()),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        }
    }

    facade.shutdown().await?;
    notice_printer.abort();
    log_printer.abort();
    Ok(())
}

async fn run_command(facade: &SessionFacade, command: Command) -> Result<()> {
    match command {
        Command::Login {
            phone,
            country_code,
        } => {
            let country_code =
                country_code.unwrap_or_else(|| facade.config().auth.default_country_code.clone());
            facade.submit_credentials(&phone, &country_code).await?;
            println!("{}", format!("Credentials set for {country_code} {phone}. Send a code with /otp.").green());
        }
        Command::SendOtp => {
            println!("{}", "Sending OTP...".bright_black());
            facade.send_otp().await?;
            print_auth_status(facade);
        }
        Command::Verify(code) => {
            println!("{}", "Verifying...".bright_black());
            facade.verify_otp(&code).await?;
            print_auth_status(facade);
        }
        Command::Logout => {
            facade.logout().await;
            println!("{}", "Signed out.".green());
        }
        Command::Country(query) => match facade.search_country_codes(&query).await? {
            Some(options) if options.is_empty() => println!("{}", "No matching countries.".bright_black()),
            Some(options) => {
                for option in options {
                    println!("  {}", option.label.cyan());
                }
            }
            None => {}
        },
        Command::NewRoom(title) => {
            let room = facade.create_room(title.as_deref()).await?;
            println!("{}", format!("Now chatting in '{}'", room.title).green());
        }
        Command::Rooms => print_rooms(facade),
        Command::Use(reference) => {
            let room = find_room(facade, &reference)?;
            facade.select_room(&room.id).await;
            println!("{}", format!("Now chatting in '{}'", room.title).green());
            for message in facade.visible_messages(&room.id).await {
                print_message(&message);
            }
        }
        Command::Delete(reference) => {
            let room = find_room(facade, &reference)?;
            facade.delete_room(&room.id).await?;
        }
        Command::Rename { room, title } => {
            let room = find_room(facade, &room)?;
            facade.rename_room(&room.id, &title).await?;
            println!("{}", format!("Renamed '{}' to '{}'", room.title, title.trim()).green());
        }
        Command::Search(query) => {
            let found = facade.search_rooms(&query).await;
            if found.is_empty() {
                println!("{}", "No matching rooms.".bright_black());
            }
            for room in found {
                println!("  {} {}", short_id(&room.id).bright_black(), room.title);
            }
        }
        Command::Older => {
            let room_id = active_room(facade)?;
            if facade.load_older_messages(&room_id).await {
                println!("{}", "Loading older messages...".bright_black());
            } else {
                println!("{}", "No older messages.".bright_black());
            }
        }
        Command::Image { path, caption } => {
            let room_id = active_room(facade)?;
            let mime_type = commands::guess_image_mime(&path)
                .ok_or_else(|| anyhow::anyhow!("Please upload an image file"))?;
            let data = tokio::fs::read(&path).await?;
            facade
                .send_message(&room_id, caption, Some(Attachment::new(mime_type, data)))
                .await?;
        }
        Command::State => {
            let snapshot = facade.chat_snapshot();
            let summary = serde_json::json!({
                "auth": facade.auth_view(),
                "active_room_id": snapshot.active_room_id,
                "rooms": snapshot.rooms.len(),
                "typing": snapshot.typing_by_room,
                "pages": snapshot.page_by_room,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Help => print_help(),
        Command::Say(text) => {
            let room_id = active_room(facade)?;
            facade.send_message(&room_id, Some(text), None).await?;
        }
        Command::Quit => {}
    }
    Ok(())
}

async fn print_notices(mut notices: broadcast::Receiver<SessionNotice>) {
    loop {
        match notices.recv().await {
            Ok(SessionNotice::OtpIssued { code, .. }) => {
                println!("{}", format!("(demo) Your OTP is {code}").bright_yellow());
            }
            Ok(SessionNotice::RoomCreated { .. }) => {}
            Ok(SessionNotice::RoomDeleted { room_id }) => {
                println!("{}", format!("Room {} deleted", short_id(&room_id)).yellow());
            }
            Ok(SessionNotice::MessageAppended { message }) => print_message(&message),
            Ok(SessionNotice::OlderMessagesRevealed { page, .. }) => {
                println!("{}", format!("Showing page {page}").bright_black());
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Notice printer fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_message(message: &Message) {
    let mut body = message.text.clone().unwrap_or_default();
    if let Some(attachment) = &message.attachment {
        let tag = format!("[{} {} bytes]", attachment.mime_type, attachment.data.len());
        body = if body.is_empty() { tag } else { format!("{tag} {body}") };
    }
    match message.sender {
        Sender::User => println!("{}", format!("> {body}").green()),
        Sender::Assistant => {
            for line in body.lines() {
                println!("{}", line.bright_blue());
            }
        }
    }
}

fn print_auth_status(facade: &SessionFacade) {
    let view = facade.auth_view();
    if let Some(error) = &view.error {
        println!("{}", error.red());
    } else if let Some(success) = &view.success {
        println!("{}", success.green());
    }
    if view.is_authenticated {
        println!("{}", format!("Signed in as {} {}", view.country_code, view.phone).bright_green());
    }
}

fn print_rooms(facade: &SessionFacade) {
    let snapshot = facade.chat_snapshot();
    if snapshot.rooms.is_empty() {
        println!("{}", "No rooms yet. Start one with /new.".bright_black());
        return;
    }
    for (index, room) in snapshot.rooms.iter().enumerate() {
        let marker = if snapshot.active_room_id.as_deref() == Some(room.id.as_str()) {
            "*"
        } else {
            " "
        };
        let typing = if snapshot.is_typing(&room.id) { " (typing...)" } else { "" };
        println!(
            "{} {:>2}. {} {} [{} messages]{}",
            marker.bright_green(),
            index + 1,
            short_id(&room.id).bright_black(),
            room.title,
            snapshot.messages(&room.id).len(),
            typing.bright_black()
        );
    }
}

fn print_help() {
    let lines = [
        ("/login <phone> [code]", "set phone number and country code"),
        ("/otp", "send (or resend) a one-time passcode"),
        ("/verify <code>", "verify the passcode"),
        ("/logout", "sign out"),
        ("/country <query>", "look up dial codes"),
        ("/new [title]", "create a room"),
        ("/rooms", "list rooms"),
        ("/use <room>", "switch room (number or id prefix)"),
        ("/delete <room>", "delete a room"),
        ("/rename <room> <title>", "rename a room"),
        ("/search <query>", "filter rooms by title"),
        ("/older", "reveal older messages in the active room"),
        ("/image <path> [caption]", "send an image"),
        ("/state", "dump session state"),
    ];
    for (usage, description) in lines {
        println!("  {:<26} {}", usage.bright_cyan(), description.bright_black());
    }
}

fn find_room(facade: &SessionFacade, reference: &str) -> Result<murmur_core::room::ChatRoom> {
    let snapshot = facade.chat_snapshot();
    commands::resolve_room(&snapshot.rooms, reference)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("No room matches '{reference}'"))
}

fn active_room(facade: &SessionFacade) -> Result<String> {
    facade
        .chat_snapshot()
        .active_room_id
        .ok_or_else(|| anyhow::anyhow!("No active room. Start one with /new."))
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
