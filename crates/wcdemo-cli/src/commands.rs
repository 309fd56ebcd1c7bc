//! Interactive commands read from stdin.

use std::fmt;
use std::str::FromStr;

pub const HELP: &str = "\
Commands:
  click                      press the button as currently shown
  connect                    start a pairing
  disconnect                 end the current session
  status                     print the button again
  wallet pair <address> [uri]  approve from the wallet side (uri defaults to the open modal)
  wallet reject [uri]        refuse the pairing from the wallet side
  wallet delete              end the session from the wallet side
  help                       show this help
  quit                       exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Click,
    Connect,
    Disconnect,
    Status,
    WalletPair { address: String, uri: Option<String> },
    WalletReject { uri: Option<String> },
    WalletDelete,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCommandError(String);

impl fmt::Display for ParseCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (type `help` for commands)", self.0)
    }
}

impl std::error::Error for ParseCommandError {}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let command = match words.as_slice() {
            ["click"] => Self::Click,
            ["connect"] => Self::Connect,
            ["disconnect"] => Self::Disconnect,
            ["status"] => Self::Status,
            ["help"] | ["?"] => Self::Help,
            ["quit"] | ["exit"] => Self::Quit,
            ["wallet", "pair", address] => Self::WalletPair {
                address: address.to_string(),
                uri: None,
            },
            ["wallet", "pair", address, uri] => Self::WalletPair {
                address: address.to_string(),
                uri: Some(uri.to_string()),
            },
            ["wallet", "pair", ..] => {
                return Err(ParseCommandError(
                    "usage: wallet pair <address> [uri]".to_string(),
                ))
            }
            ["wallet", "reject"] => Self::WalletReject { uri: None },
            ["wallet", "reject", uri] => Self::WalletReject {
                uri: Some(uri.to_string()),
            },
            ["wallet", "delete"] => Self::WalletDelete,
            [] => return Err(ParseCommandError("empty command".to_string())),
            _ => return Err(ParseCommandError(format!("unknown command: {}", line.trim()))),
        };
        Ok(command)
    }
}
