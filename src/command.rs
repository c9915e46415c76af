//! Parsing of session command lines.

use crate::protocol::command;

/// One parsed client command.
///
/// Arguments are whitespace separated tokens; missing arguments are `None`
/// and extra tokens are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login {
        user: Option<String>,
        password: Option<String>,
    },
    List,
    Upload(Option<String>),
    Download(Option<String>),
    Delete(Option<String>),
    Exit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let mut tokens = line.split_whitespace();
        let name = tokens.next().unwrap_or("");
        let mut arg = || tokens.next().map(str::to_string);
        match name {
            command::LOGIN => {
                let user = arg();
                let password = arg();
                Command::Login { user, password }
            }
            command::LIST => Command::List,
            command::UPLOAD => Command::Upload(arg()),
            command::DOWNLOAD => Command::Download(arg()),
            command::DELETE => Command::Delete(arg()),
            command::EXIT => Command::Exit,
            other => Command::Unknown(other.to_string()),
        }
    }

    /// Renders the command as a wire line (without the newline).
    pub fn to_line(&self) -> String {
        fn with_arg(cmd: &str, arg: &Option<String>) -> String {
            match arg {
                Some(a) => format!("{cmd} {a}"),
                None => cmd.to_string(),
            }
        }
        match self {
            Command::Login { user, password } => {
                let mut line = command::LOGIN.to_string();
                for part in [user, password].into_iter().flatten() {
                    line.push(' ');
                    line.push_str(part);
                }
                line
            }
            Command::List => command::LIST.to_string(),
            Command::Upload(name) => with_arg(command::UPLOAD, name),
            Command::Download(name) => with_arg(command::DOWNLOAD, name),
            Command::Delete(name) => with_arg(command::DELETE, name),
            Command::Exit => command::EXIT.to_string(),
            Command::Unknown(raw) => raw.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(
            Command::parse("LOGIN user1 pass1"),
            Command::Login {
                user: Some("user1".into()),
                password: Some("pass1".into())
            }
        );
        assert_eq!(Command::parse("LIST"), Command::List);
        assert_eq!(
            Command::parse("UPLOAD report.txt"),
            Command::Upload(Some("report.txt".into()))
        );
        assert_eq!(
            Command::parse("  DOWNLOAD   report.txt  "),
            Command::Download(Some("report.txt".into()))
        );
        assert_eq!(
            Command::parse("DELETE report.txt extra"),
            Command::Delete(Some("report.txt".into()))
        );
        assert_eq!(Command::parse("EXIT"), Command::Exit);
    }

    #[test]
    fn missing_arguments_are_none() {
        assert_eq!(
            Command::parse("LOGIN user1"),
            Command::Login {
                user: Some("user1".into()),
                password: None
            }
        );
        assert_eq!(Command::parse("UPLOAD"), Command::Upload(None));
        assert_eq!(Command::parse("DELETE"), Command::Delete(None));
    }

    #[test]
    fn commands_are_case_sensitive() {
        assert_eq!(Command::parse("list"), Command::Unknown("list".into()));
        assert_eq!(Command::parse(""), Command::Unknown(String::new()));
        assert_eq!(Command::parse("HELLO there"), Command::Unknown("HELLO".into()));
    }

    #[test]
    fn to_line_matches_parse() {
        for line in [
            "LOGIN user1 pass1",
            "LIST",
            "UPLOAD a.bin",
            "DOWNLOAD a.bin",
            "DELETE a.bin",
            "EXIT",
        ] {
            assert_eq!(Command::parse(line).to_line(), line);
        }
    }
}
