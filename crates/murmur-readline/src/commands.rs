//! REPL input parsing.

use murmur_core::room::ChatRoom;

/// Slash commands offered for completion and hints.
pub const COMMANDS: &[&str] = &[
    "/login", "/otp", "/verify", "/logout", "/country", "/new", "/rooms", "/use", "/delete",
    "/rename", "/search", "/older", "/image", "/state", "/help",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login {
        phone: String,
        country_code: Option<String>,
    },
    SendOtp,
    Verify(String),
    Logout,
    Country(String),
    NewRoom(Option<String>),
    Rooms,
    Use(String),
    Delete(String),
    Rename {
        room: String,
        title: String,
    },
    Search(String),
    Older,
    Image {
        path: String,
        caption: Option<String>,
    },
    State,
    Help,
    Quit,
    /// Plain text for the active room.
    Say(String),
}

/// Parses one trimmed, non-empty input line.
///
/// The error is a usage line for the offending command.
pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    if line == "quit" || line == "exit" {
        return Ok(Command::Quit);
    }
    if !line.starts_with('/') {
        return Ok(Command::Say(line.to_string()));
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    let rest_opt = (!rest.is_empty()).then(|| rest.to_string());

    match name {
        "/login" => {
            let mut parts = rest.split_whitespace();
            let phone = parts
                .next()
                .ok_or_else(|| "usage: /login <phone> [country code]".to_string())?;
            Ok(Command::Login {
                phone: phone.to_string(),
                country_code: parts.next().map(str::to_string),
            })
        }
        "/otp" => Ok(Command::SendOtp),
        "/verify" => rest_opt
            .map(Command::Verify)
            .ok_or_else(|| "usage: /verify <code>".to_string()),
        "/logout" => Ok(Command::Logout),
        "/country" => Ok(Command::Country(rest.to_string())),
        "/new" => Ok(Command::NewRoom(rest_opt)),
        "/rooms" => Ok(Command::Rooms),
        "/use" => rest_opt
            .map(Command::Use)
            .ok_or_else(|| "usage: /use <room>".to_string()),
        "/delete" => rest_opt
            .map(Command::Delete)
            .ok_or_else(|| "usage: /delete <room>".to_string()),
        "/rename" => match rest.split_once(char::is_whitespace) {
            Some((room, title)) if !title.trim().is_empty() => Ok(Command::Rename {
                room: room.to_string(),
                title: title.trim().to_string(),
            }),
            _ => Err("usage: /rename <room> <title>".to_string()),
        },
        "/search" => Ok(Command::Search(rest.to_string())),
        "/older" => Ok(Command::Older),
        "/image" => {
            if rest.is_empty() {
                return Err("usage: /image <path> [caption]".to_string());
            }
            let (path, caption) = match rest.split_once(char::is_whitespace) {
                Some((path, caption)) => (path, Some(caption.trim().to_string())),
                None => (rest, None),
            };
            Ok(Command::Image {
                path: path.to_string(),
                caption,
            })
        }
        "/state" => Ok(Command::State),
        "/help" => Ok(Command::Help),
        other => Err(format!("Unknown command: {other} (try /help)")),
    }
}

/// Resolves a room reference typed by the user: a 1-based position in the
/// room list or a unique id prefix.
pub fn resolve_room<'a>(rooms: &'a [ChatRoom], reference: &str) -> Option<&'a ChatRoom> {
    if let Ok(position) = reference.parse::<usize>() {
        return position.checked_sub(1).and_then(|index| rooms.get(index));
    }

    let mut matches = rooms.iter().filter(|room| room.id.starts_with(reference));
    match (matches.next(), matches.next()) {
        (Some(room), None) => Some(room),
        _ => None,
    }
}

/// MIME type for an image path, judged by extension.
pub fn guess_image_mime(path: &str) -> Option<&'static str> {
    let extension = path.rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}
