//! Interactive session: the terminal counterpart of the single-page UI.
//!
//! Status changes are printed as they arrive, so a reset while loading
//! returns to the upload prompt immediately.

use crate::actions::ResultActions;
use crate::engine::{EngineError, EngineHandle};
use anyhow::Result;
use insight_core::render::render_status;
use insight_core::{upload, Phase, ResultAction, Status};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
commands:
  upload <path>   analyze a face photo (dropping a file onto the terminal works too)
  status          show the current state
  reset           discard the current photo and result
  copy            copy the result to the clipboard
  share           share the result through the host share command
  kakao           share the result to KakaoTalk
  download        save the result as ai_face_analysis.txt
  help            show this help
  quit            exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload(PathBuf),
    Status,
    Reset,
    Action(ResultAction),
    Help,
    Quit,
    Unknown(String),
}

/// Parse one input line. A bare path (as pasted by drag-and-drop) is an upload;
/// a lone word that does not look like a path is an unknown command.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let command = match word.to_ascii_lowercase().as_str() {
        "upload" | "u" if rest.is_empty() => Command::Help,
        "upload" | "u" => Command::Upload(upload::normalize_dropped_path(rest)),
        "status" | "s" => Command::Status,
        "reset" | "r" => Command::Reset,
        "copy" | "c" => Command::Action(ResultAction::Copy),
        "share" => Command::Action(ResultAction::Share),
        "kakao" | "k" => Command::Action(ResultAction::ChatShare),
        "download" | "d" => Command::Action(ResultAction::Download),
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        _ => {
            let path = upload::normalize_dropped_path(line);
            if looks_like_path(&path) {
                Command::Upload(path)
            } else {
                Command::Unknown(word.to_string())
            }
        }
    };
    Some(command)
}

fn looks_like_path(path: &Path) -> bool {
    path.extension().is_some() || path.components().count() > 1
}

fn print_status(status: &Status, actions: &ResultActions) {
    print!("{}", render_status(status, &actions.capabilities()));
}

async fn run_action(action: ResultAction, status: &Status, actions: &ResultActions) {
    let Some(result) = status.result() else {
        println!("no analysis result yet");
        return;
    };
    let text = result.text.as_str();
    match action {
        ResultAction::Copy => match actions.copy(text).await {
            Ok(()) => println!("copied!"),
            Err(err) => println!("오류: {err}"),
        },
        ResultAction::Share => match actions.share(text).await {
            Ok(true) => println!("shared"),
            Ok(false) => {}
            Err(err) => println!("오류: {err}"),
        },
        ResultAction::ChatShare => match actions.chat_share(text).await {
            Ok(()) => println!("sent to KakaoTalk"),
            Err(err) => println!("오류: {err}"),
        },
        ResultAction::Download => match actions.download(text) {
            Ok(path) => println!("saved {}", path.display()),
            Err(err) => println!("오류: {err}"),
        },
    }
}

/// Run the session until `quit` or end of input.
pub async fn run(engine: EngineHandle, actions: ResultActions) -> Result<()> {
    println!("{HELP}");
    print_status(&engine.status(), &actions);

    // Print every settled or in-flight transition without waiting for input.
    let mut updates = engine.subscribe();
    let watcher_caps = actions.capabilities();
    let watcher = tokio::spawn(async move {
        let mut last_phase = updates.borrow_and_update().phase();
        while updates.changed().await.is_ok() {
            let status = updates.borrow_and_update().clone();
            let phase = status.phase();
            let visible = matches!(phase, Phase::Loading | Phase::Success | Phase::Error);
            if visible && phase != last_phase {
                print!("{}", render_status(&status, &watcher_caps));
            }
            last_phase = phase;
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse_command(&line) else {
            continue;
        };
        match command {
            Command::Upload(path) => {
                let image = upload::select(path, None);
                match engine.upload(image).await {
                    Ok(cycle) => tracing::debug!(%cycle, "upload accepted"),
                    Err(EngineError::Upload(err)) => println!("오류: {err}"),
                    Err(err) => return Err(err.into()),
                }
            }
            Command::Status => print_status(&engine.status(), &actions),
            Command::Reset => {
                engine.reset().await?;
                print_status(&engine.status(), &actions);
            }
            Command::Action(action) => run_action(action, &engine.status(), &actions).await,
            Command::Help => println!("{HELP}"),
            Command::Unknown(word) => println!("unknown command: {word}\n{HELP}"),
            Command::Quit => break,
        }
    }

    watcher.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("   "), None);
        assert_eq!(parse_command("status"), Some(Command::Status));
        assert_eq!(parse_command("RESET"), Some(Command::Reset));
        assert_eq!(parse_command("copy"), Some(Command::Action(ResultAction::Copy)));
        assert_eq!(parse_command("k"), Some(Command::Action(ResultAction::ChatShare)));
        assert_eq!(parse_command("download"), Some(Command::Action(ResultAction::Download)));
        assert_eq!(parse_command("quit"), Some(Command::Quit));
    }

    #[test]
    fn test_parse_upload() {
        assert_eq!(
            parse_command("upload '/tmp/my face.png'"),
            Some(Command::Upload(PathBuf::from("/tmp/my face.png")))
        );
    }

    #[test]
    fn test_bare_path_is_upload() {
        assert_eq!(
            parse_command("/home/u/My\\ Photos/face.jpg "),
            Some(Command::Upload(PathBuf::from("/home/u/My Photos/face.jpg")))
        );
        assert_eq!(
            parse_command("photo.png"),
            Some(Command::Upload(PathBuf::from("photo.png")))
        );
    }

    #[test]
    fn test_typo_is_unknown_command() {
        assert_eq!(parse_command("shar"), Some(Command::Unknown("shar".into())));
        assert_eq!(
            parse_command("what now"),
            Some(Command::Unknown("what".into()))
        );
        assert_eq!(
            parse_command("./selfie"),
            Some(Command::Upload(PathBuf::from("./selfie")))
        );
    }

    #[test]
    fn test_upload_without_path_shows_help() {
        assert_eq!(parse_command("upload"), Some(Command::Help));
    }
}
